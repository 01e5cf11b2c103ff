//! Bot staff allowlists

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use ticket_model::UserId;

/// Bot admins and helpers, from configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffAllowlist {
    admins: HashSet<UserId>,
    helpers: HashSet<UserId>,
}

impl StaffAllowlist {
    /// Build from id lists
    #[must_use]
    pub fn new(
        admins: impl IntoIterator<Item = UserId>,
        helpers: impl IntoIterator<Item = UserId>,
    ) -> Self {
        Self {
            admins: admins.into_iter().collect(),
            helpers: helpers.into_iter().collect(),
        }
    }

    /// Bot admin
    #[must_use]
    pub fn is_admin(&self, user: UserId) -> bool {
        self.admins.contains(&user)
    }

    /// Bot helper; admins count as helpers
    #[must_use]
    pub fn is_helper(&self, user: UserId) -> bool {
        self.is_admin(user) || self.helpers.contains(&user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admins_are_helpers() {
        let staff = StaffAllowlist::new([UserId(1)], [UserId(2)]);
        assert!(staff.is_admin(UserId(1)));
        assert!(staff.is_helper(UserId(1)));
        assert!(staff.is_helper(UserId(2)));
        assert!(!staff.is_admin(UserId(2)));
        assert!(!staff.is_helper(UserId(3)));
    }
}
