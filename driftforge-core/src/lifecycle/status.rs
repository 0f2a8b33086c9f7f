//! Raw provider status to [`Condition`] mapping.

use crate::model::Condition;

/// Per-kind table mapping the provider's raw status string to a [`Condition`].
///
/// Matching is exact and case-sensitive. Lists are checked in the order
/// available, creating, deleting, unavailable; anything unlisted maps to
/// `otherwise`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTable {
    pub available: &'static [&'static str],
    pub creating: &'static [&'static str],
    pub deleting: &'static [&'static str],
    pub unavailable: &'static [&'static str],
    pub otherwise: Condition,
}

impl StatusTable {
    /// A table that reports every status as `condition`.
    pub const fn constant(condition: Condition) -> Self {
        Self {
            available: &[],
            creating: &[],
            deleting: &[],
            unavailable: &[],
            otherwise: condition,
        }
    }

    pub fn condition(&self, raw: &str) -> Condition {
        if self.available.contains(&raw) {
            Condition::Available
        } else if self.creating.contains(&raw) {
            Condition::Creating
        } else if self.deleting.contains(&raw) {
            Condition::Deleting
        } else if self.unavailable.contains(&raw) {
            Condition::Unavailable
        } else {
            self.otherwise
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: StatusTable = StatusTable {
        available: &["ACTIVE", "DOWN"],
        creating: &[],
        deleting: &[],
        unavailable: &["ERROR"],
        otherwise: Condition::Creating,
    };

    #[test]
    fn test_listed_statuses() {
        assert_eq!(TABLE.condition("ACTIVE"), Condition::Available);
        assert_eq!(TABLE.condition("DOWN"), Condition::Available);
        assert_eq!(TABLE.condition("ERROR"), Condition::Unavailable);
    }

    #[test]
    fn test_unlisted_status_falls_through() {
        assert_eq!(TABLE.condition("PENDING_CREATE"), Condition::Creating);
        assert_eq!(TABLE.condition(""), Condition::Creating);
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        assert_eq!(TABLE.condition("active"), Condition::Creating);
    }

    #[test]
    fn test_constant_table() {
        let table = StatusTable::constant(Condition::Available);
        assert_eq!(table.condition("anything"), Condition::Available);
    }
}
