//! Snowflake identifier newtypes

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! snowflake {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Raw snowflake value
            #[inline]
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

snowflake!(
    /// Guild (server) identifier
    GuildId
);
snowflake!(
    /// User identifier
    UserId
);
snowflake!(
    /// Guild role identifier
    RoleId
);
snowflake!(
    /// Platform-assigned application command identifier
    CommandId
);

/// Support team identifier (database key, not a snowflake)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamId(pub i32);

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "team-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_trimmed_snowflake() {
        let id: GuildId = " 508392876359680000 ".parse().unwrap();
        assert_eq!(id.get(), 508_392_876_359_680_000);
    }

    #[test]
    fn rejects_non_numeric() {
        assert!("abc".parse::<UserId>().is_err());
    }

    #[test]
    fn serializes_transparently() {
        let json = serde_json::to_string(&RoleId(42)).unwrap();
        assert_eq!(json, "42");
    }
}
