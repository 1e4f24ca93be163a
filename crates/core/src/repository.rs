use async_trait::async_trait;
use thiserror::Error;

use crate::domain::rules::RuleSet;
use crate::domain::template::{ProductTemplate, TemplateId};
use crate::pricing::scope::ScopeKey;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("repository unavailable: {reason}")]
    Unavailable { reason: String },
    #[error("repository decode failure: {reason}")]
    Decode { reason: String },
}

/// Source of rule snapshots for the pricing engine.
///
/// Implementations return only active rules whose scope matches `scope`
/// (exact template/product-type match or the null wildcard). Empty vectors,
/// never an error, signal "no rules configured".
#[async_trait]
pub trait RuleRepository: Send + Sync {
    async fn get_applicable_rules(&self, scope: &ScopeKey) -> Result<RuleSet, RepositoryError>;
}

#[async_trait]
pub trait TemplateRepository: Send + Sync {
    async fn find_by_id(
        &self,
        id: &TemplateId,
    ) -> Result<Option<ProductTemplate>, RepositoryError>;
}

#[async_trait]
impl<T> RuleRepository for std::sync::Arc<T>
where
    T: RuleRepository + ?Sized,
{
    async fn get_applicable_rules(&self, scope: &ScopeKey) -> Result<RuleSet, RepositoryError> {
        (**self).get_applicable_rules(scope).await
    }
}

#[async_trait]
impl<T> TemplateRepository for std::sync::Arc<T>
where
    T: TemplateRepository + ?Sized,
{
    async fn find_by_id(
        &self,
        id: &TemplateId,
    ) -> Result<Option<ProductTemplate>, RepositoryError> {
        (**self).find_by_id(id).await
    }
}
