use crate::domain::rules::{RuleId, SizeThreshold, ThresholdAction};
use crate::domain::template::Dimensions;
use crate::errors::PricingError;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ThresholdOutcome {
    pub surcharge: i64,
    pub warnings: Vec<String>,
    pub applied: Vec<RuleId>,
}

/// Check every blocking threshold before any price is computed. Blocks are
/// processed first and in a fixed order (dimension, then id) so an evaluation
/// that is going to fail produces no partial side effects.
pub fn check_blocking(
    dimensions: &Dimensions,
    thresholds: &[SizeThreshold],
) -> Result<(), PricingError> {
    for threshold in ordered(thresholds) {
        if threshold.action == ThresholdAction::Block && exceeded(dimensions, threshold) {
            return Err(PricingError::ThresholdExceeded {
                threshold_id: threshold.id.clone(),
                message: message_for(threshold),
            });
        }
    }
    Ok(())
}

/// Apply warning and auto-surcharge thresholds. All exceeded thresholds
/// accumulate: warnings append, auto-surcharges sum. Blocking thresholds are
/// not consulted here; `check_blocking` has already run.
pub fn resolve_soft(dimensions: &Dimensions, thresholds: &[SizeThreshold]) -> ThresholdOutcome {
    let mut outcome = ThresholdOutcome::default();

    for threshold in ordered(thresholds) {
        if !exceeded(dimensions, threshold) {
            continue;
        }
        match threshold.action {
            ThresholdAction::Block => {}
            ThresholdAction::Warning => {
                outcome.warnings.push(message_for(threshold));
                outcome.applied.push(threshold.id.clone());
            }
            ThresholdAction::AutoSurcharge => {
                let amount = threshold.surcharge_amount.unwrap_or(0);
                outcome.surcharge += amount;
                outcome.warnings.push(format!(
                    "{} (surcharge {} applied)",
                    message_for(threshold),
                    amount
                ));
                outcome.applied.push(threshold.id.clone());
            }
        }
    }

    outcome
}

fn ordered(thresholds: &[SizeThreshold]) -> Vec<&SizeThreshold> {
    let mut sorted: Vec<&SizeThreshold> = thresholds.iter().collect();
    sorted.sort_by(|a, b| a.dimension.cmp(&b.dimension).then_with(|| a.id.cmp(&b.id)));
    sorted
}

fn exceeded(dimensions: &Dimensions, threshold: &SizeThreshold) -> bool {
    dimensions
        .get(&threshold.dimension)
        .is_some_and(|value| *value > threshold.threshold_cm)
}

fn message_for(threshold: &SizeThreshold) -> String {
    match &threshold.message {
        Some(message) if !message.trim().is_empty() => message.clone(),
        _ => format!(
            "{} exceeds the configured limit of {}cm",
            threshold.dimension, threshold.threshold_cm
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rust_decimal::Decimal;

    use crate::domain::rules::{RuleId, SizeThreshold, ThresholdAction};
    use crate::domain::template::{DimensionKind, Dimensions};
    use crate::errors::PricingError;

    use super::{check_blocking, resolve_soft};

    fn dims(entries: &[(DimensionKind, i64)]) -> Dimensions {
        entries.iter().map(|(kind, value)| (*kind, Decimal::from(*value))).collect::<BTreeMap<_, _>>()
    }

    fn threshold(
        id: &str,
        dimension: DimensionKind,
        limit: i64,
        action: ThresholdAction,
        amount: Option<i64>,
    ) -> SizeThreshold {
        SizeThreshold {
            id: RuleId(id.to_string()),
            product_type: None,
            dimension,
            threshold_cm: Decimal::from(limit),
            action,
            surcharge_amount: amount,
            message: None,
            is_active: true,
        }
    }

    #[test]
    fn block_threshold_fails_before_any_pricing() {
        let thresholds =
            vec![threshold("thr-block", DimensionKind::Width, 200, ThresholdAction::Block, None)];
        let error = check_blocking(&dims(&[(DimensionKind::Width, 210)]), &thresholds)
            .expect_err("width 210 over 200 limit");

        assert!(matches!(
            error,
            PricingError::ThresholdExceeded { threshold_id: RuleId(id), .. } if id == "thr-block"
        ));
    }

    #[test]
    fn value_at_limit_does_not_trigger() {
        let thresholds =
            vec![threshold("thr-block", DimensionKind::Width, 200, ThresholdAction::Block, None)];
        check_blocking(&dims(&[(DimensionKind::Width, 200)]), &thresholds)
            .expect("exactly at the limit is allowed");
    }

    #[test]
    fn blocks_are_checked_in_dimension_then_id_order() {
        let thresholds = vec![
            threshold("thr-z", DimensionKind::Width, 200, ThresholdAction::Block, None),
            threshold("thr-a", DimensionKind::Width, 190, ThresholdAction::Block, None),
        ];
        let error = check_blocking(&dims(&[(DimensionKind::Width, 210)]), &thresholds)
            .expect_err("both thresholds exceeded");

        assert!(matches!(
            error,
            PricingError::ThresholdExceeded { threshold_id: RuleId(id), .. } if id == "thr-a"
        ));
    }

    #[test]
    fn custom_message_is_surfaced() {
        let mut blocked =
            threshold("thr-block", DimensionKind::Width, 200, ThresholdAction::Block, None);
        blocked.message = Some("too wide for the spray booth".to_string());

        let error = check_blocking(&dims(&[(DimensionKind::Width, 210)]), &[blocked])
            .expect_err("blocked");
        let PricingError::ThresholdExceeded { message, .. } = error else {
            panic!("expected threshold error");
        };
        assert_eq!(message, "too wide for the spray booth");
    }

    #[test]
    fn soft_thresholds_accumulate_across_dimensions() {
        let thresholds = vec![
            threshold("thr-warn", DimensionKind::Width, 150, ThresholdAction::Warning, None),
            threshold(
                "thr-auto",
                DimensionKind::Height,
                100,
                ThresholdAction::AutoSurcharge,
                Some(20_000),
            ),
        ];
        let outcome = resolve_soft(
            &dims(&[(DimensionKind::Width, 160), (DimensionKind::Height, 120)]),
            &thresholds,
        );

        assert_eq!(outcome.surcharge, 20_000);
        assert_eq!(outcome.warnings.len(), 2);
        assert_eq!(outcome.applied.len(), 2);
    }

    #[test]
    fn soft_resolution_ignores_block_thresholds() {
        let thresholds =
            vec![threshold("thr-block", DimensionKind::Width, 200, ThresholdAction::Block, None)];
        let outcome = resolve_soft(&dims(&[(DimensionKind::Width, 210)]), &thresholds);
        assert_eq!(outcome, super::ThresholdOutcome::default());
    }

    #[test]
    fn missing_dimension_never_triggers() {
        let thresholds =
            vec![threshold("thr-depth", DimensionKind::Depth, 50, ThresholdAction::Warning, None)];
        let outcome = resolve_soft(&dims(&[(DimensionKind::Width, 210)]), &thresholds);
        assert!(outcome.warnings.is_empty());
    }
}
