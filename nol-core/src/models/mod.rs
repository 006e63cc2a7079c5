mod alert;
mod carryback;
mod jurisdiction;
mod schedule;
mod usage;
mod vintage;

pub use alert::{AlertSeverity, NewExpirationAlert, NolExpirationAlert};
pub use carryback::{NewNolCarryback, NolCarryback, PriorYearReturn, RefundStatus};
pub use jurisdiction::{EntityType, Jurisdiction};
pub use schedule::{NewNolSchedule, NolSchedule};
pub use usage::{NewNolUsage, NolUsage, SelectionMethod};
pub use vintage::{NewNolVintage, NolVintage, VintageDetail};
