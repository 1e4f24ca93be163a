use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::rules::{MaterialGroup, PricingRule, RuleCondition, RuleId};
use crate::domain::template::Dimensions;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedSizeRule {
    pub rule_id: RuleId,
    pub steps: i64,
    pub amount: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SizeSurchargeOutcome {
    pub total: i64,
    pub applied: Vec<AppliedSizeRule>,
}

/// Compute the graduated size surcharge.
///
/// Every matching rule contributes `floor((requested - base) / increment) *
/// amount` independently; contributions stack. A rule only participates when
/// both the template base and the request carry its dimension, and when its
/// material modifier (if any) matches the selected material's group. The
/// applied list is ordered priority descending then id ascending, which fixes
/// the reporting order without affecting the sum.
pub fn resolve(
    base_dimensions: &Dimensions,
    requested_dimensions: &Dimensions,
    material_group: Option<&MaterialGroup>,
    rules: &[PricingRule],
) -> SizeSurchargeOutcome {
    let mut matched: Vec<(&PricingRule, i64, i64)> = Vec::new();

    for rule in rules {
        let RuleCondition::SizeIncrement = rule.condition;
        if rule.increment_unit_cm == 0 {
            // sanitization drops these; a raw rule set must still not divide by zero
            continue;
        }
        if let Some(required_group) = &rule.material_modifier {
            if material_group != Some(required_group) {
                continue;
            }
        }
        let (Some(base), Some(requested)) = (
            base_dimensions.get(&rule.dimension),
            requested_dimensions.get(&rule.dimension),
        ) else {
            continue;
        };
        let growth = requested - base;
        if growth <= Decimal::ZERO {
            continue;
        }

        let steps = (growth / Decimal::from(rule.increment_unit_cm))
            .floor()
            .to_i64()
            .unwrap_or(0);
        if steps == 0 {
            continue;
        }
        matched.push((rule, steps, steps * rule.surcharge_amount));
    }

    matched.sort_by(|(a, _, _), (b, _, _)| {
        b.priority.cmp(&a.priority).then_with(|| a.id.cmp(&b.id))
    });

    let total = matched.iter().map(|(_, _, amount)| amount).sum();
    let applied = matched
        .into_iter()
        .map(|(rule, steps, amount)| AppliedSizeRule { rule_id: rule.id.clone(), steps, amount })
        .collect();

    SizeSurchargeOutcome { total, applied }
}
