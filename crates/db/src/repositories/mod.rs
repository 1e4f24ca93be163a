pub mod memory;
pub mod rules;
pub mod templates;

pub use memory::{InMemoryRuleRepository, InMemoryTemplateRepository};
pub use rules::SqlRuleRepository;
pub use templates::SqlTemplateRepository;

use std::str::FromStr;

use craftquote_core::domain::EnumParseError;
use craftquote_core::repository::RepositoryError;

pub(crate) fn db_error(error: sqlx::Error) -> RepositoryError {
    RepositoryError::Unavailable { reason: format!("database error: {error}") }
}

pub(crate) fn decode_error(reason: impl Into<String>) -> RepositoryError {
    RepositoryError::Decode { reason: reason.into() }
}

pub(crate) fn parse_tag<T>(value: &str) -> Result<T, RepositoryError>
where
    T: FromStr<Err = EnumParseError>,
{
    value.parse().map_err(|error: EnumParseError| decode_error(error.to_string()))
}

pub(crate) fn parse_optional_tag<T>(value: Option<String>) -> Result<Option<T>, RepositoryError>
where
    T: FromStr<Err = EnumParseError>,
{
    value.map(|value| parse_tag(&value)).transpose()
}
