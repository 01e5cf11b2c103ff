//! Binding option-tree leaves to declared arguments

use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use ticket_model::{CommandOption, OptionValue, RoleId, UserId};

/// Declared type of an argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgumentKind {
    /// Free text
    String,
    /// Integer
    Integer,
    /// Number (integers are accepted)
    Number,
    /// Boolean
    Boolean,
    /// User mention
    User,
    /// Role mention
    Role,
    /// Channel mention
    Channel,
}

impl ArgumentKind {
    fn accepts(self, value: &OptionValue) -> bool {
        matches!(
            (self, value),
            (Self::String, OptionValue::String(_))
                | (Self::Integer, OptionValue::Integer(_))
                | (Self::Number, OptionValue::Number(_) | OptionValue::Integer(_))
                | (Self::Boolean, OptionValue::Boolean(_))
                | (Self::User, OptionValue::User(_))
                | (Self::Role, OptionValue::Role(_))
                | (Self::Channel, OptionValue::Channel(_))
        )
    }
}

impl fmt::Display for ArgumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::User => "user",
            Self::Role => "role",
            Self::Channel => "channel",
        };
        f.write_str(s)
    }
}

/// One declared argument
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArgumentSpec {
    /// Option name
    pub name: String,
    /// Expected type
    pub kind: ArgumentKind,
    /// Must be present
    pub required: bool,
}

impl ArgumentSpec {
    /// Required argument
    #[must_use]
    pub fn required(name: impl Into<String>, kind: ArgumentKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
        }
    }

    /// Optional argument
    #[must_use]
    pub fn optional(name: impl Into<String>, kind: ArgumentKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
        }
    }
}

/// Argument binding failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArgumentError {
    /// A required argument was absent
    #[error("argument is missing: {name}")]
    Missing {
        /// Argument name
        name: String,
    },

    /// An argument had the wrong type
    #[error("argument {name} expected {expected}, got {found}")]
    TypeMismatch {
        /// Argument name
        name: String,
        /// Declared type
        expected: ArgumentKind,
        /// Received type
        found: &'static str,
    },
}

/// Arguments bound for one invocation, in declaration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundArguments {
    values: IndexMap<String, OptionValue>,
}

impl BoundArguments {
    /// Raw value
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.values.get(name)
    }

    /// Text argument
    #[must_use]
    pub fn string(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            OptionValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Integer argument
    #[must_use]
    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            OptionValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Number argument, widening integers
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn number(&self, name: &str) -> Option<f64> {
        match self.get(name)? {
            OptionValue::Number(n) => Some(*n),
            OptionValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Boolean argument
    #[must_use]
    pub fn boolean(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            OptionValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// User argument
    #[must_use]
    pub fn user(&self, name: &str) -> Option<UserId> {
        match self.get(name)? {
            OptionValue::User(id) => Some(*id),
            _ => None,
        }
    }

    /// Role argument
    #[must_use]
    pub fn role(&self, name: &str) -> Option<RoleId> {
        match self.get(name)? {
            OptionValue::Role(id) => Some(*id),
            _ => None,
        }
    }

    /// Number of bound arguments
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// No arguments bound
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Bind leaf options against the declared arguments
///
/// Options that are not declared are ignored.
///
/// # Errors
///
/// [`ArgumentError::Missing`] for an absent required argument,
/// [`ArgumentError::TypeMismatch`] for a value of the wrong type.
pub fn bind_arguments(
    specs: &[ArgumentSpec],
    options: &[CommandOption],
) -> Result<BoundArguments, ArgumentError> {
    let mut values = IndexMap::with_capacity(specs.len());

    for spec in specs {
        let value = options
            .iter()
            .find(|opt| opt.name == spec.name)
            .and_then(|opt| opt.value.as_ref());

        match value {
            Some(value) if spec.kind.accepts(value) => {
                values.insert(spec.name.clone(), value.clone());
            }
            Some(value) => {
                return Err(ArgumentError::TypeMismatch {
                    name: spec.name.clone(),
                    expected: spec.kind,
                    found: value.type_name(),
                });
            }
            None if spec.required => {
                return Err(ArgumentError::Missing {
                    name: spec.name.clone(),
                });
            }
            None => {}
        }
    }

    Ok(BoundArguments { values })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn specs() -> Vec<ArgumentSpec> {
        vec![
            ArgumentSpec::required("guild_id", ArgumentKind::String),
            ArgumentSpec::optional("reason", ArgumentKind::String),
            ArgumentSpec::optional("real_owner", ArgumentKind::User),
        ]
    }

    #[test]
    fn binds_present_arguments() {
        let options = vec![
            CommandOption::value("guild_id", OptionValue::String("123".into())),
            CommandOption::value("real_owner", OptionValue::User(UserId(9))),
            CommandOption::value("unused", OptionValue::Boolean(true)),
        ];

        let args = bind_arguments(&specs(), &options).unwrap();
        assert_eq!(args.string("guild_id"), Some("123"));
        assert_eq!(args.string("reason"), None);
        assert_eq!(args.user("real_owner"), Some(UserId(9)));
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn missing_required_argument() {
        let err = bind_arguments(&specs(), &[]).unwrap_err();
        assert_eq!(
            err,
            ArgumentError::Missing {
                name: "guild_id".into()
            }
        );
    }

    #[test]
    fn type_mismatch() {
        let options = vec![CommandOption::value("guild_id", OptionValue::Integer(5))];
        let err = bind_arguments(&specs(), &options).unwrap_err();
        assert!(matches!(
            err,
            ArgumentError::TypeMismatch { expected: ArgumentKind::String, found: "integer", .. }
        ));
    }

    #[test]
    fn number_accepts_integer() {
        let specs = vec![ArgumentSpec::required("amount", ArgumentKind::Number)];
        let options = vec![CommandOption::value("amount", OptionValue::Integer(3))];
        let args = bind_arguments(&specs, &options).unwrap();
        assert_eq!(args.number("amount"), Some(3.0));
        assert_eq!(args.integer("amount"), Some(3));
    }
}
