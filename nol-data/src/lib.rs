pub mod loader;

pub use loader::{VintageLoader, VintageLoaderError, VintageRecord};
