pub mod cache;
pub mod config;
pub mod domain;
pub mod errors;
pub mod pricing;
pub mod repository;

pub use cache::RuleSnapshotCache;
pub use domain::rules::{
    MaterialGroup, MaterialSurcharge, PriceLevel, PricingRule, QuantityTier, RuleCondition,
    RuleId, RuleSet, SizeThreshold, SurchargeScope, ThresholdAction,
};
pub use domain::template::{
    DimensionKind, Dimensions, MaterialId, ProductTemplate, ProductType, TemplateId,
};
pub use errors::PricingError;
pub use pricing::scope::ScopeKey;
pub use pricing::{
    AppliedRules, AppliedSizeRule, DeterministicPricingEngine, EvaluationRequest, PriceResult,
    PricingEngine, PricingTraceStep,
};
pub use repository::{RepositoryError, RuleRepository, TemplateRepository};
