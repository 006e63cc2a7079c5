use serde::{Deserialize, Serialize};

/// Taxing jurisdiction level for an NOL vintage.
///
/// Sub-federal vintages (state and municipal) carry an apportioned share of
/// the federal loss; federal vintages carry the full loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Jurisdiction {
    Federal,
    State,
    Municipal,
}

impl Jurisdiction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Federal => "FED",
            Self::State => "ST",
            Self::Municipal => "MUN",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "FED" => Some(Self::Federal),
            "ST" => Some(Self::State),
            "MUN" => Some(Self::Municipal),
            _ => None,
        }
    }

    /// Whether an apportionment percentage applies when creating a vintage.
    pub fn is_sub_federal(&self) -> bool {
        !matches!(self, Self::Federal)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityType {
    CCorporation,
    SCorporation,
    Partnership,
    SoleProprietorship,
    Llc,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CCorporation => "C",
            Self::SCorporation => "S",
            Self::Partnership => "P",
            Self::SoleProprietorship => "SP",
            Self::Llc => "LLC",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "C" => Some(Self::CCorporation),
            "S" => Some(Self::SCorporation),
            "P" => Some(Self::Partnership),
            "SP" => Some(Self::SoleProprietorship),
            "LLC" => Some(Self::Llc),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn jurisdiction_round_trips_through_str() {
        for j in [
            Jurisdiction::Federal,
            Jurisdiction::State,
            Jurisdiction::Municipal,
        ] {
            assert_eq!(Jurisdiction::parse(j.as_str()), Some(j));
        }
    }

    #[test]
    fn jurisdiction_parse_rejects_unknown_code() {
        assert_eq!(Jurisdiction::parse("XX"), None);
    }

    #[test]
    fn only_federal_is_not_sub_federal() {
        assert!(!Jurisdiction::Federal.is_sub_federal());
        assert!(Jurisdiction::State.is_sub_federal());
        assert!(Jurisdiction::Municipal.is_sub_federal());
    }

    #[test]
    fn entity_type_round_trips_through_str() {
        for e in [
            EntityType::CCorporation,
            EntityType::SCorporation,
            EntityType::Partnership,
            EntityType::SoleProprietorship,
            EntityType::Llc,
        ] {
            assert_eq!(EntityType::parse(e.as_str()), Some(e));
        }
    }
}
