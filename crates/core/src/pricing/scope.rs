use serde::{Deserialize, Serialize};

use crate::domain::template::{ProductTemplate, ProductType, TemplateId};

/// The template/product-type combination a rule applies to. `None` in a field
/// is a wildcard; narrower scope is more specific.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeKey {
    pub template_id: Option<TemplateId>,
    pub product_type: Option<ProductType>,
}

impl ScopeKey {
    pub fn global() -> Self {
        Self { template_id: None, product_type: None }
    }

    pub fn for_template(template: &ProductTemplate) -> Self {
        Self {
            template_id: Some(template.id.clone()),
            product_type: Some(template.product_type),
        }
    }
}

/// Whether a rule scoped to `(rule_template, rule_product_type)` applies under
/// `scope`. A rule wildcard always matches; a concrete rule field only matches
/// the same concrete scope field.
pub fn matches(
    rule_template: Option<&TemplateId>,
    rule_product_type: Option<ProductType>,
    scope: &ScopeKey,
) -> bool {
    let template_ok = match rule_template {
        None => true,
        Some(rule_template) => scope.template_id.as_ref() == Some(rule_template),
    };
    let product_type_ok = match rule_product_type {
        None => true,
        Some(rule_product_type) => scope.product_type == Some(rule_product_type),
    };
    template_ok && product_type_ok
}

/// Specificity ranking: template-scoped (2) beats product-type-scoped (1)
/// beats global (0); a rule carrying both ranks highest (3). Kept as a
/// standalone function so the ordering policy can change without touching
/// resolver internals.
pub fn specificity(
    rule_template: Option<&TemplateId>,
    rule_product_type: Option<ProductType>,
) -> u8 {
    let mut rank = 0;
    if rule_template.is_some() {
        rank += 2;
    }
    if rule_product_type.is_some() {
        rank += 1;
    }
    rank
}

#[cfg(test)]
mod tests {
    use crate::domain::template::{ProductType, TemplateId};

    use super::{matches, specificity, ScopeKey};

    fn scope(template: Option<&str>, product_type: Option<ProductType>) -> ScopeKey {
        ScopeKey {
            template_id: template.map(|id| TemplateId(id.to_string())),
            product_type,
        }
    }

    #[test]
    fn wildcard_rule_matches_any_scope() {
        let concrete = scope(Some("tpl-dining"), Some(ProductType::Table));
        assert!(matches(None, None, &concrete));
        assert!(matches(None, None, &ScopeKey::global()));
    }

    #[test]
    fn concrete_rule_requires_matching_scope_field() {
        let dining = TemplateId("tpl-dining".to_string());
        let concrete = scope(Some("tpl-dining"), Some(ProductType::Table));

        assert!(matches(Some(&dining), None, &concrete));
        assert!(matches(None, Some(ProductType::Table), &concrete));
        assert!(!matches(None, Some(ProductType::Chair), &concrete));
        assert!(!matches(
            Some(&TemplateId("tpl-other".to_string())),
            None,
            &concrete
        ));
    }

    #[test]
    fn concrete_rule_never_matches_global_scope() {
        let dining = TemplateId("tpl-dining".to_string());
        assert!(!matches(Some(&dining), None, &ScopeKey::global()));
        assert!(!matches(None, Some(ProductType::Table), &ScopeKey::global()));
    }

    #[test]
    fn specificity_ranks_template_over_product_type_over_global() {
        let dining = TemplateId("tpl-dining".to_string());
        let global = specificity(None, None);
        let typed = specificity(None, Some(ProductType::Table));
        let templated = specificity(Some(&dining), None);
        let both = specificity(Some(&dining), Some(ProductType::Table));

        assert!(global < typed);
        assert!(typed < templated);
        assert!(templated < both);
    }
}
