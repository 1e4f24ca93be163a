use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::rules::{RuleId, RuleSet, ThresholdAction};

/// A rule that was excluded or adjusted during load-time sanitization. One bad
/// rule must never abort evaluation for unrelated scopes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub rule_id: RuleId,
    pub reason: String,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rule {}: {}", self.rule_id.0, self.reason)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValidatedRules {
    pub rules: RuleSet,
    pub warnings: Vec<ConfigWarning>,
}

/// Sanitize a fetched rule set before evaluation.
///
/// Malformed rules are dropped with a recorded warning; recoverable issues
/// (out-of-range discount percent, zero priority) are adjusted in place. The
/// resolvers may assume the returned set upholds every structural invariant.
pub fn sanitize(raw: RuleSet) -> ValidatedRules {
    let mut warnings = Vec::new();
    let mut rules = RuleSet::default();

    for mut rule in raw.pricing_rules {
        if rule.increment_unit_cm == 0 {
            exclude(&mut warnings, &rule.id, "increment unit must be a positive number of cm");
            continue;
        }
        if rule.surcharge_amount < 0 {
            exclude(&mut warnings, &rule.id, "surcharge amount must not be negative");
            continue;
        }
        if rule.priority == 0 {
            adjust(&mut warnings, &rule.id, "priority 0 treated as lowest priority 1");
            rule.priority = 1;
        }
        rules.pricing_rules.push(rule);
    }

    for surcharge in raw.material_surcharges {
        if surcharge.source_material_id == surcharge.target_material_id {
            exclude(
                &mut warnings,
                &surcharge.id,
                "source and target material must differ",
            );
            continue;
        }
        if surcharge.surcharge_amount < 0 {
            exclude(&mut warnings, &surcharge.id, "surcharge amount must not be negative");
            continue;
        }
        rules.material_surcharges.push(surcharge);
    }

    for mut tier in raw.quantity_tiers {
        if tier.min_quantity == 0 {
            exclude(&mut warnings, &tier.id, "minimum quantity must be positive");
            continue;
        }
        if let Some(max) = tier.max_quantity {
            if max < tier.min_quantity {
                exclude(&mut warnings, &tier.id, "maximum quantity is below minimum quantity");
                continue;
            }
        }
        if tier.discount_percent < Decimal::ZERO {
            adjust(&mut warnings, &tier.id, "negative discount percent clamped to 0");
            tier.discount_percent = Decimal::ZERO;
        } else if tier.discount_percent > Decimal::ONE_HUNDRED {
            adjust(&mut warnings, &tier.id, "discount percent above 100 clamped to 100");
            tier.discount_percent = Decimal::ONE_HUNDRED;
        }
        rules.quantity_tiers.push(tier);
    }

    for threshold in raw.size_thresholds {
        if threshold.threshold_cm <= Decimal::ZERO {
            exclude(&mut warnings, &threshold.id, "threshold value must be positive");
            continue;
        }
        match threshold.action {
            ThresholdAction::AutoSurcharge if threshold.surcharge_amount.is_none() => {
                exclude(
                    &mut warnings,
                    &threshold.id,
                    "auto-surcharge threshold is missing a surcharge amount",
                );
                continue;
            }
            ThresholdAction::AutoSurcharge
                if threshold.surcharge_amount.is_some_and(|amount| amount < 0) =>
            {
                exclude(&mut warnings, &threshold.id, "surcharge amount must not be negative");
                continue;
            }
            _ => {}
        }
        rules.size_thresholds.push(threshold);
    }

    warn_overlapping_tiers(&rules, &mut warnings);

    ValidatedRules { rules, warnings }
}

/// Overlapping active tiers for the same price level are kept (the resolver
/// picks the highest discount) but flagged so an administrator can fix the
/// configuration.
fn warn_overlapping_tiers(rules: &RuleSet, warnings: &mut Vec<ConfigWarning>) {
    let tiers = &rules.quantity_tiers;
    for (index, left) in tiers.iter().enumerate() {
        for right in &tiers[index + 1..] {
            if left.price_level != right.price_level {
                continue;
            }
            let left_max = left.max_quantity.unwrap_or(u32::MAX);
            let right_max = right.max_quantity.unwrap_or(u32::MAX);
            if left.min_quantity <= right_max && right.min_quantity <= left_max {
                let warning = ConfigWarning {
                    rule_id: left.id.clone(),
                    reason: format!(
                        "quantity range overlaps tier {} for price level {}",
                        right.id.0, left.price_level
                    ),
                };
                warn!(
                    event_name = "pricing.validation.tier_overlap",
                    tier_id = %left.id.0,
                    other_tier_id = %right.id.0,
                    "{warning}"
                );
                warnings.push(warning);
            }
        }
    }
}

fn exclude(warnings: &mut Vec<ConfigWarning>, rule_id: &RuleId, reason: &str) {
    warn!(
        event_name = "pricing.validation.rule_excluded",
        rule_id = %rule_id.0,
        reason,
        "excluded malformed pricing rule"
    );
    warnings.push(ConfigWarning { rule_id: rule_id.clone(), reason: reason.to_string() });
}

fn adjust(warnings: &mut Vec<ConfigWarning>, rule_id: &RuleId, reason: &str) {
    warn!(
        event_name = "pricing.validation.rule_adjusted",
        rule_id = %rule_id.0,
        reason,
        "adjusted pricing rule during sanitization"
    );
    warnings.push(ConfigWarning { rule_id: rule_id.clone(), reason: reason.to_string() });
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::domain::rules::{
        MaterialSurcharge, PriceLevel, PricingRule, QuantityTier, RuleCondition, RuleId,
        RuleSet, SizeThreshold, SurchargeScope, ThresholdAction,
    };
    use crate::domain::template::{DimensionKind, MaterialId};

    use super::sanitize;

    fn size_rule(id: &str, increment: u32) -> PricingRule {
        PricingRule {
            id: RuleId(id.to_string()),
            template_id: None,
            product_type: None,
            condition: RuleCondition::SizeIncrement,
            dimension: DimensionKind::Width,
            increment_unit_cm: increment,
            surcharge_amount: 5_000,
            material_modifier: None,
            priority: 10,
            is_active: true,
        }
    }

    fn tier(id: &str, min: u32, max: Option<u32>, percent: Decimal) -> QuantityTier {
        QuantityTier {
            id: RuleId(id.to_string()),
            template_id: None,
            product_type: None,
            min_quantity: min,
            max_quantity: max,
            discount_percent: percent,
            price_level: PriceLevel::Retail,
            is_active: true,
        }
    }

    #[test]
    fn zero_increment_rule_is_excluded_with_warning() {
        let raw = RuleSet {
            pricing_rules: vec![size_rule("rule-bad", 0), size_rule("rule-good", 10)],
            ..RuleSet::default()
        };

        let validated = sanitize(raw);
        assert_eq!(validated.rules.pricing_rules.len(), 1);
        assert_eq!(validated.rules.pricing_rules[0].id.0, "rule-good");
        assert_eq!(validated.warnings.len(), 1);
        assert_eq!(validated.warnings[0].rule_id.0, "rule-bad");
    }

    #[test]
    fn self_referential_material_surcharge_is_excluded() {
        let raw = RuleSet {
            material_surcharges: vec![MaterialSurcharge {
                id: RuleId("ms-self".to_string()),
                source_material_id: MaterialId("oak".to_string()),
                target_material_id: MaterialId("oak".to_string()),
                scope: SurchargeScope::FullItem,
                surcharge_amount: 10_000,
                template_id: None,
                product_type: None,
                is_active: true,
            }],
            ..RuleSet::default()
        };

        let validated = sanitize(raw);
        assert!(validated.rules.material_surcharges.is_empty());
        assert_eq!(validated.warnings.len(), 1);
    }

    #[test]
    fn inverted_tier_range_is_excluded() {
        let raw = RuleSet {
            quantity_tiers: vec![tier("tier-bad", 20, Some(10), Decimal::new(5, 0))],
            ..RuleSet::default()
        };

        let validated = sanitize(raw);
        assert!(validated.rules.quantity_tiers.is_empty());
        assert_eq!(validated.warnings[0].rule_id.0, "tier-bad");
    }

    #[test]
    fn discount_percent_is_clamped_into_range() {
        let raw = RuleSet {
            quantity_tiers: vec![
                tier("tier-high", 1, Some(4), Decimal::new(150, 0)),
                tier("tier-low", 5, Some(9), Decimal::new(-10, 0)),
            ],
            ..RuleSet::default()
        };

        let validated = sanitize(raw);
        assert_eq!(validated.rules.quantity_tiers[0].discount_percent, Decimal::ONE_HUNDRED);
        assert_eq!(validated.rules.quantity_tiers[1].discount_percent, Decimal::ZERO);
        assert_eq!(validated.warnings.len(), 2);
    }

    #[test]
    fn overlapping_tiers_are_kept_but_flagged() {
        let raw = RuleSet {
            quantity_tiers: vec![
                tier("tier-a", 10, Some(20), Decimal::new(5, 0)),
                tier("tier-b", 15, None, Decimal::new(8, 0)),
            ],
            ..RuleSet::default()
        };

        let validated = sanitize(raw);
        assert_eq!(validated.rules.quantity_tiers.len(), 2);
        assert_eq!(validated.warnings.len(), 1);
        assert!(validated.warnings[0].reason.contains("tier-b"));
    }

    #[test]
    fn auto_surcharge_threshold_without_amount_is_excluded() {
        let raw = RuleSet {
            size_thresholds: vec![SizeThreshold {
                id: RuleId("thr-bad".to_string()),
                product_type: None,
                dimension: DimensionKind::Width,
                threshold_cm: Decimal::new(200, 0),
                action: ThresholdAction::AutoSurcharge,
                surcharge_amount: None,
                message: None,
                is_active: true,
            }],
            ..RuleSet::default()
        };

        let validated = sanitize(raw);
        assert!(validated.rules.size_thresholds.is_empty());
        assert_eq!(validated.warnings.len(), 1);
    }

    #[test]
    fn clean_rule_set_passes_through_unchanged() {
        let raw = RuleSet {
            pricing_rules: vec![size_rule("rule-1", 10)],
            quantity_tiers: vec![tier("tier-1", 10, Some(20), Decimal::new(5, 0))],
            ..RuleSet::default()
        };

        let validated = sanitize(raw.clone());
        assert_eq!(validated.rules, raw);
        assert!(validated.warnings.is_empty());
    }
}
