pub mod rules;
pub mod template;

use thiserror::Error;

/// Raised when a stored enum tag does not match any known variant.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unsupported {kind} value `{value}`")]
pub struct EnumParseError {
    pub kind: &'static str,
    pub value: String,
}
