pub mod material;
pub mod quantity;
pub mod scope;
pub mod size;
pub mod threshold;
pub mod validation;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::rules::{MaterialGroup, PriceLevel, RuleId, SurchargeScope};
use crate::domain::template::{Dimensions, MaterialId, TemplateId};
use crate::errors::PricingError;
use crate::repository::{RuleRepository, TemplateRepository};

pub use size::AppliedSizeRule;
pub use validation::ConfigWarning;

use self::scope::ScopeKey;

/// One quote line to price: which template, how it deviates from the template
/// (dimensions, material), and how many units at which price level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRequest {
    pub template_id: TemplateId,
    pub requested_dimensions: Dimensions,
    pub selected_material_id: MaterialId,
    /// Group of the selected material, matched against
    /// `PricingRule::material_modifier`. Callers that do not track material
    /// groups leave this unset and modifier-gated rules simply do not apply.
    #[serde(default)]
    pub material_group: Option<MaterialGroup>,
    pub quantity: u32,
    pub price_level: PriceLevel,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTraceStep {
    pub stage: String,
    pub detail: String,
    pub amount: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedRules {
    pub size_rules: Vec<AppliedSizeRule>,
    pub material_rule: Option<RuleId>,
    pub quantity_tier: Option<RuleId>,
    pub thresholds: Vec<RuleId>,
}

/// Final line price plus the full breakdown of how it was reached. Surcharge
/// fields are per unit; `subtotal_before_discount` onward are line totals.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceResult {
    pub template_id: TemplateId,
    pub base_price: i64,
    pub size_surcharge: i64,
    pub material_surcharge: i64,
    pub threshold_surcharge: i64,
    pub unit_price: i64,
    pub quantity: u32,
    pub subtotal_before_discount: i64,
    pub discount_percent: Decimal,
    pub discount_amount: i64,
    pub final_price: i64,
    pub warnings: Vec<String>,
    pub applied: AppliedRules,
    pub trace: Vec<PricingTraceStep>,
}

#[async_trait]
pub trait PricingEngine: Send + Sync {
    async fn evaluate(&self, request: &EvaluationRequest) -> Result<PriceResult, PricingError>;
}

/// Default engine: a fixed linear pipeline over an immutable rule snapshot.
///
/// load rules → check blocking thresholds → size surcharge → material
/// surcharge → soft thresholds → quantity discount → finalize. Evaluations
/// share no mutable state and may run concurrently.
pub struct DeterministicPricingEngine<T, R> {
    templates: T,
    rules: R,
}

impl<T, R> DeterministicPricingEngine<T, R> {
    pub fn new(templates: T, rules: R) -> Self {
        Self { templates, rules }
    }
}

#[async_trait]
impl<T, R> PricingEngine for DeterministicPricingEngine<T, R>
where
    T: TemplateRepository,
    R: RuleRepository,
{
    async fn evaluate(&self, request: &EvaluationRequest) -> Result<PriceResult, PricingError> {
        if request.quantity == 0 {
            return Err(PricingError::InvalidConfiguration {
                rule_id: None,
                reason: "evaluation quantity must be positive".to_string(),
            });
        }

        let template = self
            .templates
            .find_by_id(&request.template_id)
            .await?
            .filter(|template| template.is_active)
            .ok_or_else(|| PricingError::UnknownTemplate {
                template_id: request.template_id.clone(),
            })?;

        let scope = ScopeKey::for_template(&template);
        let raw = self.rules.get_applicable_rules(&scope).await?;
        let validated = validation::sanitize(raw);
        let rules = &validated.rules;

        threshold::check_blocking(&request.requested_dimensions, &rules.size_thresholds)?;

        let size_outcome = size::resolve(
            &template.base_dimensions,
            &request.requested_dimensions,
            request.material_group.as_ref(),
            &rules.pricing_rules,
        );
        let material_outcome = material::resolve(
            &template.default_material_id,
            &request.selected_material_id,
            SurchargeScope::FullItem,
            &rules.material_surcharges,
        );
        let threshold_outcome =
            threshold::resolve_soft(&request.requested_dimensions, &rules.size_thresholds);

        let unit_price = template.base_price
            + size_outcome.total
            + material_outcome.amount
            + threshold_outcome.surcharge;
        let subtotal_before_discount = unit_price * i64::from(request.quantity);

        let discount =
            quantity::resolve(request.quantity, request.price_level, &rules.quantity_tiers);
        let final_price = quantity::apply_discount(subtotal_before_discount, discount.percent);
        let discount_amount = subtotal_before_discount - final_price;

        let mut warnings: Vec<String> =
            validated.warnings.iter().map(ToString::to_string).collect();
        warnings.extend(threshold_outcome.warnings.clone());

        let trace = build_trace(
            &template.id,
            template.base_price,
            &size_outcome,
            &material_outcome,
            &threshold_outcome,
            request.quantity,
            subtotal_before_discount,
            discount.percent,
            final_price,
        );

        debug!(
            event_name = "pricing.evaluate.completed",
            template_id = %template.id.0,
            final_price,
            warning_count = warnings.len(),
            "pricing evaluation completed"
        );

        Ok(PriceResult {
            template_id: template.id,
            base_price: template.base_price,
            size_surcharge: size_outcome.total,
            material_surcharge: material_outcome.amount,
            threshold_surcharge: threshold_outcome.surcharge,
            unit_price,
            quantity: request.quantity,
            subtotal_before_discount,
            discount_percent: discount.percent,
            discount_amount,
            final_price,
            warnings,
            applied: AppliedRules {
                size_rules: size_outcome.applied,
                material_rule: material_outcome.applied_rule_id,
                quantity_tier: discount.applied_tier_id,
                thresholds: threshold_outcome.applied,
            },
            trace,
        })
    }
}

#[allow(clippy::too_many_arguments)]
fn build_trace(
    template_id: &TemplateId,
    base_price: i64,
    size: &size::SizeSurchargeOutcome,
    material: &material::MaterialSurchargeOutcome,
    thresholds: &threshold::ThresholdOutcome,
    quantity: u32,
    subtotal: i64,
    discount_percent: Decimal,
    final_price: i64,
) -> Vec<PricingTraceStep> {
    let mut trace = vec![PricingTraceStep {
        stage: "base_price".to_string(),
        detail: format!("template {}", template_id.0),
        amount: base_price,
    }];

    if !size.applied.is_empty() {
        trace.push(PricingTraceStep {
            stage: "size_surcharge".to_string(),
            detail: format!("{} size rule(s) stacked", size.applied.len()),
            amount: size.total,
        });
    }
    if let Some(rule_id) = &material.applied_rule_id {
        trace.push(PricingTraceStep {
            stage: "material_surcharge".to_string(),
            detail: format!("substitution priced by {}", rule_id.0),
            amount: material.amount,
        });
    }
    if thresholds.surcharge > 0 {
        trace.push(PricingTraceStep {
            stage: "threshold_surcharge".to_string(),
            detail: format!("{} threshold(s) exceeded", thresholds.applied.len()),
            amount: thresholds.surcharge,
        });
    }
    trace.push(PricingTraceStep {
        stage: "line_subtotal".to_string(),
        detail: format!("unit price x {quantity}"),
        amount: subtotal,
    });
    if discount_percent > Decimal::ZERO {
        trace.push(PricingTraceStep {
            stage: "quantity_discount".to_string(),
            detail: format!("{discount_percent}% off, rounded half-up"),
            amount: final_price - subtotal,
        });
    }
    trace.push(PricingTraceStep {
        stage: "final_price".to_string(),
        detail: "line total".to_string(),
        amount: final_price,
    });

    trace
}
