use std::cmp::Ordering;

use crate::domain::rules::{MaterialSurcharge, RuleId, SurchargeScope};
use crate::domain::template::MaterialId;
use crate::pricing::scope;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MaterialSurchargeOutcome {
    pub amount: i64,
    pub applied_rule_id: Option<RuleId>,
}

/// Resolve the surcharge for substituting the template's default material.
///
/// The match is directional: an entry prices the swap from its source material
/// to its target material, never the reverse. When several entries match, a
/// template-scoped entry wins over a global one; a remaining tie goes to the
/// larger surcharge, then the lowest id. Keeping the default material, or
/// substituting a material no entry prices, yields a zero surcharge — an
/// unconfigured substitution is not an error.
pub fn resolve(
    default_material: &MaterialId,
    selected_material: &MaterialId,
    surcharge_scope: SurchargeScope,
    entries: &[MaterialSurcharge],
) -> MaterialSurchargeOutcome {
    if default_material == selected_material {
        return MaterialSurchargeOutcome::default();
    }

    let mut candidates: Vec<&MaterialSurcharge> = entries
        .iter()
        .filter(|entry| {
            entry.scope == surcharge_scope
                && &entry.source_material_id == default_material
                && &entry.target_material_id == selected_material
        })
        .collect();

    candidates.sort_by(|a, b| {
        let rank_a = scope::specificity(a.template_id.as_ref(), a.product_type);
        let rank_b = scope::specificity(b.template_id.as_ref(), b.product_type);
        match rank_b.cmp(&rank_a) {
            Ordering::Equal => b
                .surcharge_amount
                .cmp(&a.surcharge_amount)
                .then_with(|| a.id.cmp(&b.id)),
            other => other,
        }
    });

    match candidates.first() {
        Some(winner) => MaterialSurchargeOutcome {
            amount: winner.surcharge_amount,
            applied_rule_id: Some(winner.id.clone()),
        },
        None => MaterialSurchargeOutcome::default(),
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::rules::{MaterialSurcharge, RuleId, SurchargeScope};
    use crate::domain::template::{MaterialId, TemplateId};

    use super::resolve;

    fn entry(id: &str, source: &str, target: &str, amount: i64) -> MaterialSurcharge {
        MaterialSurcharge {
            id: RuleId(id.to_string()),
            source_material_id: MaterialId(source.to_string()),
            target_material_id: MaterialId(target.to_string()),
            scope: SurchargeScope::FullItem,
            surcharge_amount: amount,
            template_id: None,
            product_type: None,
            is_active: true,
        }
    }

    #[test]
    fn keeping_default_material_costs_nothing() {
        let oak = MaterialId("oak".to_string());
        let entries = vec![entry("ms-1", "oak", "walnut", 40_000)];

        let outcome = resolve(&oak, &oak, SurchargeScope::FullItem, &entries);
        assert_eq!(outcome.amount, 0);
        assert!(outcome.applied_rule_id.is_none());
    }

    #[test]
    fn directional_match_selects_exact_substitution() {
        let oak = MaterialId("oak".to_string());
        let walnut = MaterialId("walnut".to_string());
        let entries = vec![
            entry("ms-forward", "oak", "walnut", 40_000),
            entry("ms-reverse", "walnut", "oak", 10_000),
        ];

        let outcome = resolve(&oak, &walnut, SurchargeScope::FullItem, &entries);
        assert_eq!(outcome.amount, 40_000);
        assert_eq!(outcome.applied_rule_id, Some(RuleId("ms-forward".to_string())));
    }

    #[test]
    fn unconfigured_substitution_is_free_not_an_error() {
        let oak = MaterialId("oak".to_string());
        let bamboo = MaterialId("bamboo".to_string());
        let entries = vec![entry("ms-1", "oak", "walnut", 40_000)];

        let outcome = resolve(&oak, &bamboo, SurchargeScope::FullItem, &entries);
        assert_eq!(outcome.amount, 0);
        assert!(outcome.applied_rule_id.is_none());
    }

    #[test]
    fn template_scoped_entry_beats_global_entry() {
        let oak = MaterialId("oak".to_string());
        let walnut = MaterialId("walnut".to_string());
        let mut scoped = entry("ms-scoped", "oak", "walnut", 25_000);
        scoped.template_id = Some(TemplateId("tpl-dining".to_string()));
        let entries = vec![entry("ms-global", "oak", "walnut", 40_000), scoped];

        let outcome = resolve(&oak, &walnut, SurchargeScope::FullItem, &entries);
        assert_eq!(outcome.applied_rule_id, Some(RuleId("ms-scoped".to_string())));
        assert_eq!(outcome.amount, 25_000);
    }

    #[test]
    fn equal_specificity_prefers_larger_surcharge() {
        let oak = MaterialId("oak".to_string());
        let walnut = MaterialId("walnut".to_string());
        let entries = vec![
            entry("ms-low", "oak", "walnut", 20_000),
            entry("ms-high", "oak", "walnut", 40_000),
        ];

        let outcome = resolve(&oak, &walnut, SurchargeScope::FullItem, &entries);
        assert_eq!(outcome.applied_rule_id, Some(RuleId("ms-high".to_string())));
        assert_eq!(outcome.amount, 40_000);
    }

    #[test]
    fn component_scope_entries_do_not_price_full_item_swaps() {
        let oak = MaterialId("oak".to_string());
        let walnut = MaterialId("walnut".to_string());
        let mut component = entry("ms-component", "oak", "walnut", 15_000);
        component.scope = SurchargeScope::Component;

        let outcome = resolve(&oak, &walnut, SurchargeScope::FullItem, &[component]);
        assert_eq!(outcome.amount, 0);
    }
}
