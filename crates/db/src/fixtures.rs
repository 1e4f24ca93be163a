use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use craftquote_core::domain::rules::{
    MaterialGroup, MaterialSurcharge, PriceLevel, PricingRule, QuantityTier, RuleCondition,
    RuleId, SizeThreshold, SurchargeScope, ThresholdAction,
};
use craftquote_core::domain::template::{
    DimensionKind, MaterialId, ProductTemplate, ProductType, TemplateId,
};
use craftquote_core::repository::RepositoryError;

use crate::repositories::{SqlRuleRepository, SqlTemplateRepository};
use crate::DbPool;

/// Deterministic demo dataset: two templates plus a representative rule of
/// every kind, enough to exercise the full evaluation pipeline end to end.
pub struct DemoSeedDataset;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SeedResult {
    pub templates: usize,
    pub pricing_rules: usize,
    pub material_surcharges: usize,
    pub quantity_tiers: usize,
    pub size_thresholds: usize,
}

impl DemoSeedDataset {
    pub const TEMPLATE_DINING_TABLE: &'static str = "tpl-dining-table";
    pub const TEMPLATE_OAK_CHAIR: &'static str = "tpl-oak-chair";

    pub fn templates() -> Vec<ProductTemplate> {
        vec![
            ProductTemplate {
                id: TemplateId(Self::TEMPLATE_DINING_TABLE.to_string()),
                name: "Dining table 200x100".to_string(),
                product_type: ProductType::Table,
                base_price: 4_500_000,
                base_dimensions: BTreeMap::from([
                    (DimensionKind::Width, Decimal::from(100)),
                    (DimensionKind::Length, Decimal::from(200)),
                    (DimensionKind::Height, Decimal::from(75)),
                ]),
                default_material_id: MaterialId("oak".to_string()),
                is_active: true,
            },
            ProductTemplate {
                id: TemplateId(Self::TEMPLATE_OAK_CHAIR.to_string()),
                name: "Oak side chair".to_string(),
                product_type: ProductType::Chair,
                base_price: 1_200_000,
                base_dimensions: BTreeMap::from([
                    (DimensionKind::Width, Decimal::from(45)),
                    (DimensionKind::Height, Decimal::from(90)),
                ]),
                default_material_id: MaterialId("oak".to_string()),
                is_active: true,
            },
        ]
    }

    pub fn pricing_rules() -> Vec<PricingRule> {
        vec![
            PricingRule {
                id: RuleId("rule-table-width".to_string()),
                template_id: None,
                product_type: Some(ProductType::Table),
                condition: RuleCondition::SizeIncrement,
                dimension: DimensionKind::Width,
                increment_unit_cm: 10,
                surcharge_amount: 250_000,
                material_modifier: None,
                priority: 20,
                is_active: true,
            },
            PricingRule {
                id: RuleId("rule-table-length".to_string()),
                template_id: None,
                product_type: Some(ProductType::Table),
                condition: RuleCondition::SizeIncrement,
                dimension: DimensionKind::Length,
                increment_unit_cm: 20,
                surcharge_amount: 400_000,
                material_modifier: None,
                priority: 10,
                is_active: true,
            },
            PricingRule {
                id: RuleId("rule-hardwood-width".to_string()),
                template_id: None,
                product_type: Some(ProductType::Table),
                condition: RuleCondition::SizeIncrement,
                dimension: DimensionKind::Width,
                increment_unit_cm: 10,
                surcharge_amount: 120_000,
                material_modifier: Some(MaterialGroup("hardwood".to_string())),
                priority: 30,
                is_active: true,
            },
        ]
    }

    pub fn material_surcharges() -> Vec<MaterialSurcharge> {
        vec![
            MaterialSurcharge {
                id: RuleId("ms-oak-walnut".to_string()),
                source_material_id: MaterialId("oak".to_string()),
                target_material_id: MaterialId("walnut".to_string()),
                scope: SurchargeScope::FullItem,
                surcharge_amount: 800_000,
                template_id: None,
                product_type: None,
                is_active: true,
            },
            MaterialSurcharge {
                id: RuleId("ms-oak-walnut-dining".to_string()),
                source_material_id: MaterialId("oak".to_string()),
                target_material_id: MaterialId("walnut".to_string()),
                scope: SurchargeScope::FullItem,
                surcharge_amount: 650_000,
                template_id: Some(TemplateId(Self::TEMPLATE_DINING_TABLE.to_string())),
                product_type: Some(ProductType::Table),
                is_active: true,
            },
            MaterialSurcharge {
                id: RuleId("ms-oak-ash".to_string()),
                source_material_id: MaterialId("oak".to_string()),
                target_material_id: MaterialId("ash".to_string()),
                scope: SurchargeScope::FullItem,
                surcharge_amount: 300_000,
                template_id: None,
                product_type: None,
                is_active: true,
            },
        ]
    }

    pub fn quantity_tiers() -> Vec<QuantityTier> {
        vec![
            QuantityTier {
                id: RuleId("tier-retail-10".to_string()),
                template_id: None,
                product_type: None,
                min_quantity: 10,
                max_quantity: Some(19),
                discount_percent: Decimal::from(5),
                price_level: PriceLevel::Retail,
                is_active: true,
            },
            QuantityTier {
                id: RuleId("tier-retail-20".to_string()),
                template_id: None,
                product_type: None,
                min_quantity: 20,
                max_quantity: None,
                discount_percent: Decimal::from(8),
                price_level: PriceLevel::Retail,
                is_active: true,
            },
            QuantityTier {
                id: RuleId("tier-wholesale-10".to_string()),
                template_id: None,
                product_type: None,
                min_quantity: 10,
                max_quantity: None,
                discount_percent: Decimal::from(12),
                price_level: PriceLevel::Wholesale,
                is_active: true,
            },
        ]
    }

    pub fn size_thresholds() -> Vec<SizeThreshold> {
        vec![
            SizeThreshold {
                id: RuleId("thr-table-width-warn".to_string()),
                product_type: Some(ProductType::Table),
                dimension: DimensionKind::Width,
                threshold_cm: Decimal::from(200),
                action: ThresholdAction::Warning,
                surcharge_amount: None,
                message: Some("extra-wide tables extend lead time".to_string()),
                is_active: true,
            },
            SizeThreshold {
                id: RuleId("thr-table-width-block".to_string()),
                product_type: Some(ProductType::Table),
                dimension: DimensionKind::Width,
                threshold_cm: Decimal::from(280),
                action: ThresholdAction::Block,
                surcharge_amount: None,
                message: Some("width exceeds the production line limit".to_string()),
                is_active: true,
            },
            SizeThreshold {
                id: RuleId("thr-table-length-auto".to_string()),
                product_type: Some(ProductType::Table),
                dimension: DimensionKind::Length,
                threshold_cm: Decimal::from(300),
                action: ThresholdAction::AutoSurcharge,
                surcharge_amount: Some(500_000),
                message: Some("oversize lengths require reinforced framing".to_string()),
                is_active: true,
            },
        ]
    }

    /// Load the dataset. Upsert semantics make repeated seeding idempotent.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let templates = SqlTemplateRepository::new(pool.clone());
        let rules = SqlRuleRepository::new(pool.clone());

        let template_fixtures = Self::templates();
        for template in &template_fixtures {
            templates.save(template).await?;
        }
        let rule_fixtures = Self::pricing_rules();
        for rule in &rule_fixtures {
            rules.save_pricing_rule(rule).await?;
        }
        let surcharge_fixtures = Self::material_surcharges();
        for surcharge in &surcharge_fixtures {
            rules.save_material_surcharge(surcharge).await?;
        }
        let tier_fixtures = Self::quantity_tiers();
        for tier in &tier_fixtures {
            rules.save_quantity_tier(tier).await?;
        }
        let threshold_fixtures = Self::size_thresholds();
        for threshold in &threshold_fixtures {
            rules.save_size_threshold(threshold).await?;
        }

        Ok(SeedResult {
            templates: template_fixtures.len(),
            pricing_rules: rule_fixtures.len(),
            material_surcharges: surcharge_fixtures.len(),
            quantity_tiers: tier_fixtures.len(),
            size_thresholds: threshold_fixtures.len(),
        })
    }
}
