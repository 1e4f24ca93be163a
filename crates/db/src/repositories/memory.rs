use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use craftquote_core::domain::rules::{
    MaterialSurcharge, PricingRule, QuantityTier, RuleSet, SizeThreshold,
};
use craftquote_core::domain::template::{ProductTemplate, TemplateId};
use craftquote_core::pricing::scope::{self, ScopeKey};
use craftquote_core::repository::{
    RepositoryError, RuleRepository, TemplateRepository,
};

/// In-memory rule store for tests and examples. Scope filtering matches the
/// SQL repository so the two are interchangeable behind the trait.
#[derive(Default)]
pub struct InMemoryRuleRepository {
    rules: RwLock<RuleSet>,
}

impl InMemoryRuleRepository {
    pub async fn add_pricing_rule(&self, rule: PricingRule) {
        self.rules.write().await.pricing_rules.push(rule);
    }

    pub async fn add_material_surcharge(&self, surcharge: MaterialSurcharge) {
        self.rules.write().await.material_surcharges.push(surcharge);
    }

    pub async fn add_quantity_tier(&self, tier: QuantityTier) {
        self.rules.write().await.quantity_tiers.push(tier);
    }

    pub async fn add_size_threshold(&self, threshold: SizeThreshold) {
        self.rules.write().await.size_thresholds.push(threshold);
    }
}

#[async_trait]
impl RuleRepository for InMemoryRuleRepository {
    async fn get_applicable_rules(&self, key: &ScopeKey) -> Result<RuleSet, RepositoryError> {
        let rules = self.rules.read().await;
        Ok(RuleSet {
            pricing_rules: rules
                .pricing_rules
                .iter()
                .filter(|rule| {
                    rule.is_active
                        && scope::matches(rule.template_id.as_ref(), rule.product_type, key)
                })
                .cloned()
                .collect(),
            material_surcharges: rules
                .material_surcharges
                .iter()
                .filter(|surcharge| {
                    surcharge.is_active
                        && scope::matches(
                            surcharge.template_id.as_ref(),
                            surcharge.product_type,
                            key,
                        )
                })
                .cloned()
                .collect(),
            quantity_tiers: rules
                .quantity_tiers
                .iter()
                .filter(|tier| {
                    tier.is_active
                        && scope::matches(tier.template_id.as_ref(), tier.product_type, key)
                })
                .cloned()
                .collect(),
            size_thresholds: rules
                .size_thresholds
                .iter()
                .filter(|threshold| {
                    threshold.is_active && scope::matches(None, threshold.product_type, key)
                })
                .cloned()
                .collect(),
        })
    }
}

#[derive(Default)]
pub struct InMemoryTemplateRepository {
    templates: RwLock<HashMap<String, ProductTemplate>>,
}

impl InMemoryTemplateRepository {
    pub async fn save(&self, template: ProductTemplate) {
        self.templates.write().await.insert(template.id.0.clone(), template);
    }
}

#[async_trait]
impl TemplateRepository for InMemoryTemplateRepository {
    async fn find_by_id(
        &self,
        id: &TemplateId,
    ) -> Result<Option<ProductTemplate>, RepositoryError> {
        let templates = self.templates.read().await;
        Ok(templates.get(&id.0).cloned())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rust_decimal::Decimal;

    use craftquote_core::domain::rules::{PricingRule, RuleCondition, RuleId};
    use craftquote_core::domain::template::{
        DimensionKind, MaterialId, ProductTemplate, ProductType, TemplateId,
    };
    use craftquote_core::pricing::scope::ScopeKey;
    use craftquote_core::repository::{RuleRepository, TemplateRepository};

    use super::{InMemoryRuleRepository, InMemoryTemplateRepository};

    #[tokio::test]
    async fn in_memory_rule_repo_filters_scope_and_activity() {
        let repo = InMemoryRuleRepository::default();
        repo.add_pricing_rule(PricingRule {
            id: RuleId("rule-table".to_string()),
            template_id: None,
            product_type: Some(ProductType::Table),
            condition: RuleCondition::SizeIncrement,
            dimension: DimensionKind::Width,
            increment_unit_cm: 10,
            surcharge_amount: 250_000,
            material_modifier: None,
            priority: 10,
            is_active: true,
        })
        .await;
        repo.add_pricing_rule(PricingRule {
            id: RuleId("rule-inactive".to_string()),
            template_id: None,
            product_type: None,
            condition: RuleCondition::SizeIncrement,
            dimension: DimensionKind::Width,
            increment_unit_cm: 10,
            surcharge_amount: 250_000,
            material_modifier: None,
            priority: 10,
            is_active: false,
        })
        .await;

        let table_scope = ScopeKey {
            template_id: Some(TemplateId("tpl-dining".to_string())),
            product_type: Some(ProductType::Table),
        };
        let chair_scope = ScopeKey {
            template_id: Some(TemplateId("tpl-chair".to_string())),
            product_type: Some(ProductType::Chair),
        };

        let table_rules = repo.get_applicable_rules(&table_scope).await.expect("table rules");
        assert_eq!(table_rules.pricing_rules.len(), 1);
        assert_eq!(table_rules.pricing_rules[0].id.0, "rule-table");

        let chair_rules = repo.get_applicable_rules(&chair_scope).await.expect("chair rules");
        assert!(chair_rules.pricing_rules.is_empty());
    }

    #[tokio::test]
    async fn in_memory_template_repo_round_trip() {
        let repo = InMemoryTemplateRepository::default();
        let template = ProductTemplate {
            id: TemplateId("tpl-dining".to_string()),
            name: "Dining table".to_string(),
            product_type: ProductType::Table,
            base_price: 4_500_000,
            base_dimensions: BTreeMap::from([(DimensionKind::Width, Decimal::from(100))]),
            default_material_id: MaterialId("oak".to_string()),
            is_active: true,
        };

        repo.save(template.clone()).await;
        let found = repo.find_by_id(&template.id).await.expect("find template");
        assert_eq!(found, Some(template));
    }
}
