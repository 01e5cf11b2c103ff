//! Ordered authorization scales
//!
//! Both scales default to their most restrictive value so that an
//! unresolved fact can never grant more than the actor actually holds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Permission level of an actor within a guild
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PermissionLevel {
    /// Regular member
    #[default]
    Everyone = 0,
    /// Support staff
    Support = 1,
    /// Guild administrator
    Admin = 2,
}

impl PermissionLevel {
    /// Numeric value (0-2)
    #[inline]
    #[must_use]
    pub const fn value(self) -> u8 {
        self as u8
    }

    /// Whether this level belongs to guild staff
    #[inline]
    #[must_use]
    pub fn is_staff(self) -> bool {
        self > Self::Everyone
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Everyone => "everyone",
            Self::Support => "support",
            Self::Admin => "admin",
        };
        f.write_str(s)
    }
}

/// Premium subscription tier of a guild
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PremiumTier {
    /// No subscription
    #[default]
    None = 0,
    /// Premium subscription
    Premium = 1,
    /// Whitelabel subscription
    Whitelabel = 2,
}

impl PremiumTier {
    /// Whether any paid tier is active
    #[inline]
    #[must_use]
    pub fn is_premium(self) -> bool {
        self > Self::None
    }
}

impl fmt::Display for PremiumTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Premium => "premium",
            Self::Whitelabel => "whitelabel",
        };
        f.write_str(s)
    }
}

/// Authorization facts resolved for one invocation
///
/// `Default` is the fail-closed value `{Everyone, None}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AuthorizationFacts {
    /// Actor's permission level in the invoking guild
    pub permission_level: PermissionLevel,
    /// Invoking guild's premium tier
    pub premium_tier: PremiumTier,
}

impl AuthorizationFacts {
    /// Create facts from both values
    #[inline]
    #[must_use]
    pub const fn new(permission_level: PermissionLevel, premium_tier: PremiumTier) -> Self {
        Self {
            permission_level,
            premium_tier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_ordering() {
        assert!(PermissionLevel::Everyone < PermissionLevel::Support);
        assert!(PermissionLevel::Support < PermissionLevel::Admin);
        assert_eq!(PermissionLevel::Admin.value(), 2);
    }

    #[test]
    fn defaults_are_most_restrictive() {
        assert_eq!(PermissionLevel::default(), PermissionLevel::Everyone);
        assert_eq!(PremiumTier::default(), PremiumTier::None);
        assert!(!PermissionLevel::default().is_staff());
        assert!(!PremiumTier::default().is_premium());
        assert_eq!(
            AuthorizationFacts::default(),
            AuthorizationFacts::new(PermissionLevel::Everyone, PremiumTier::None)
        );
    }

    #[test]
    fn whitelabel_counts_as_premium() {
        assert!(PremiumTier::Whitelabel.is_premium());
        assert!(PremiumTier::Premium.is_premium());
    }
}
