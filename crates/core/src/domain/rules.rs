use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::template::{DimensionKind, MaterialId, ProductType, TemplateId};
use super::EnumParseError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RuleId(pub String);

/// Material-group tag used by `PricingRule::material_modifier`, e.g. a rule
/// that only applies to hardwood builds.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MaterialGroup(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCondition {
    SizeIncrement,
}

impl RuleCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SizeIncrement => "size_increment",
        }
    }
}

impl std::str::FromStr for RuleCondition {
    type Err = EnumParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "size_increment" => Ok(Self::SizeIncrement),
            other => Err(EnumParseError { kind: "rule condition", value: other.to_string() }),
        }
    }
}

/// Additive surcharge that accrues every `increment_unit_cm` a dimension grows
/// beyond the template's base size.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricingRule {
    pub id: RuleId,
    pub template_id: Option<TemplateId>,
    pub product_type: Option<ProductType>,
    pub condition: RuleCondition,
    pub dimension: DimensionKind,
    pub increment_unit_cm: u32,
    pub surcharge_amount: i64,
    pub material_modifier: Option<MaterialGroup>,
    pub priority: u32,
    pub is_active: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurchargeScope {
    FullItem,
    Component,
}

impl SurchargeScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FullItem => "full_item",
            Self::Component => "component",
        }
    }
}

impl std::str::FromStr for SurchargeScope {
    type Err = EnumParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "full_item" => Ok(Self::FullItem),
            "component" => Ok(Self::Component),
            other => Err(EnumParseError { kind: "surcharge scope", value: other.to_string() }),
        }
    }
}

/// Flat surcharge for substituting `target_material_id` where the template
/// assumes `source_material_id`. Directional: swapping the two ids is a
/// different configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaterialSurcharge {
    pub id: RuleId,
    pub source_material_id: MaterialId,
    pub target_material_id: MaterialId,
    pub scope: SurchargeScope,
    pub surcharge_amount: i64,
    pub template_id: Option<TemplateId>,
    pub product_type: Option<ProductType>,
    pub is_active: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceLevel {
    Retail,
    Wholesale,
    Contract,
}

impl PriceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Retail => "retail",
            Self::Wholesale => "wholesale",
            Self::Contract => "contract",
        }
    }
}

impl std::str::FromStr for PriceLevel {
    type Err = EnumParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "retail" => Ok(Self::Retail),
            "wholesale" => Ok(Self::Wholesale),
            "contract" => Ok(Self::Contract),
            other => Err(EnumParseError { kind: "price level", value: other.to_string() }),
        }
    }
}

impl fmt::Display for PriceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quantity band mapped to a discount percentage. `max_quantity: None` means
/// the band is unbounded above.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuantityTier {
    pub id: RuleId,
    pub template_id: Option<TemplateId>,
    pub product_type: Option<ProductType>,
    pub min_quantity: u32,
    pub max_quantity: Option<u32>,
    pub discount_percent: Decimal,
    pub price_level: PriceLevel,
    pub is_active: bool,
}

impl QuantityTier {
    pub fn contains(&self, quantity: u32) -> bool {
        quantity >= self.min_quantity
            && self.max_quantity.map_or(true, |max| quantity <= max)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdAction {
    Warning,
    Block,
    AutoSurcharge,
}

impl ThresholdAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Block => "block",
            Self::AutoSurcharge => "auto_surcharge",
        }
    }
}

impl std::str::FromStr for ThresholdAction {
    type Err = EnumParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "warning" => Ok(Self::Warning),
            "block" => Ok(Self::Block),
            "auto_surcharge" => Ok(Self::AutoSurcharge),
            other => Err(EnumParseError { kind: "threshold action", value: other.to_string() }),
        }
    }
}

/// Hard dimensional limit. Exceeding it warns, blocks the quote line, or adds
/// a flat surcharge depending on `action`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SizeThreshold {
    pub id: RuleId,
    pub product_type: Option<ProductType>,
    pub dimension: DimensionKind,
    pub threshold_cm: Decimal,
    pub action: ThresholdAction,
    pub surcharge_amount: Option<i64>,
    pub message: Option<String>,
    pub is_active: bool,
}

/// One scope's worth of active rules, fetched as an immutable snapshot for a
/// single evaluation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    pub pricing_rules: Vec<PricingRule>,
    pub material_surcharges: Vec<MaterialSurcharge>,
    pub quantity_tiers: Vec<QuantityTier>,
    pub size_thresholds: Vec<SizeThreshold>,
}

impl RuleSet {
    pub fn is_empty(&self) -> bool {
        self.pricing_rules.is_empty()
            && self.material_surcharges.is_empty()
            && self.quantity_tiers.is_empty()
            && self.size_thresholds.is_empty()
    }
}
