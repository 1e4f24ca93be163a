use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::domain::rules::{PriceLevel, QuantityTier, RuleId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuantityDiscountOutcome {
    pub percent: Decimal,
    pub applied_tier_id: Option<RuleId>,
}

impl Default for QuantityDiscountOutcome {
    fn default() -> Self {
        Self { percent: Decimal::ZERO, applied_tier_id: None }
    }
}

/// Select the discount tier for a quantity and price level.
///
/// Ranges should not overlap, but the configuration is not trusted: when more
/// than one tier matches, the highest discount wins, then the lowest id.
pub fn resolve(
    quantity: u32,
    price_level: PriceLevel,
    tiers: &[QuantityTier],
) -> QuantityDiscountOutcome {
    let mut best: Option<&QuantityTier> = None;

    for tier in tiers {
        if tier.price_level != price_level || !tier.contains(quantity) {
            continue;
        }
        best = match best {
            None => Some(tier),
            Some(current) => {
                let wins = tier.discount_percent > current.discount_percent
                    || (tier.discount_percent == current.discount_percent
                        && tier.id < current.id);
                if wins {
                    Some(tier)
                } else {
                    Some(current)
                }
            }
        };
    }

    match best {
        Some(tier) => QuantityDiscountOutcome {
            percent: tier.discount_percent,
            applied_tier_id: Some(tier.id.clone()),
        },
        None => QuantityDiscountOutcome::default(),
    }
}

/// Apply a percentage discount to an integer subtotal, rounding half-up to a
/// whole currency unit.
pub fn apply_discount(subtotal: i64, percent: Decimal) -> i64 {
    if percent <= Decimal::ZERO {
        return subtotal;
    }
    let factor = (Decimal::ONE_HUNDRED - percent) / Decimal::ONE_HUNDRED;
    let net = (Decimal::from(subtotal) * factor)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    // net is bounded by the subtotal, the conversion cannot lose value
    net.to_i64().unwrap_or(subtotal)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::domain::rules::{PriceLevel, QuantityTier, RuleId};

    use super::{apply_discount, resolve};

    fn tier(id: &str, min: u32, max: Option<u32>, percent: i64, level: PriceLevel) -> QuantityTier {
        QuantityTier {
            id: RuleId(id.to_string()),
            template_id: None,
            product_type: None,
            min_quantity: min,
            max_quantity: max,
            discount_percent: Decimal::from(percent),
            price_level: level,
            is_active: true,
        }
    }

    #[test]
    fn quantity_outside_all_bands_gets_no_discount() {
        let tiers = vec![tier("tier-1", 10, Some(20), 5, PriceLevel::Retail)];
        let outcome = resolve(9, PriceLevel::Retail, &tiers);
        assert_eq!(outcome.percent, Decimal::ZERO);
        assert!(outcome.applied_tier_id.is_none());
    }

    #[test]
    fn matching_band_and_level_selects_tier() {
        let tiers = vec![
            tier("tier-retail", 10, Some(20), 5, PriceLevel::Retail),
            tier("tier-wholesale", 10, Some(20), 12, PriceLevel::Wholesale),
        ];

        let outcome = resolve(12, PriceLevel::Retail, &tiers);
        assert_eq!(outcome.applied_tier_id, Some(RuleId("tier-retail".to_string())));
        assert_eq!(outcome.percent, Decimal::from(5));
    }

    #[test]
    fn overlap_resolves_to_highest_discount() {
        let tiers = vec![
            tier("tier-a", 10, Some(30), 5, PriceLevel::Retail),
            tier("tier-b", 20, Some(40), 8, PriceLevel::Retail),
        ];

        let outcome = resolve(25, PriceLevel::Retail, &tiers);
        assert_eq!(outcome.applied_tier_id, Some(RuleId("tier-b".to_string())));
    }

    #[test]
    fn five_percent_discount_rounds_half_up() {
        assert_eq!(apply_discount(200_000, Decimal::from(5)), 190_000);
        // 1.5% of 99 = 97.515 -> 98
        assert_eq!(apply_discount(99, Decimal::new(15, 1)), 98);
    }

    #[test]
    fn zero_and_full_discount_bounds() {
        assert_eq!(apply_discount(200_000, Decimal::ZERO), 200_000);
        assert_eq!(apply_discount(200_000, Decimal::ONE_HUNDRED), 0);
    }

    #[test]
    fn discount_never_exceeds_subtotal_or_goes_negative() {
        for percent in [0i64, 1, 33, 50, 99, 100] {
            let net = apply_discount(123_457, Decimal::from(percent));
            assert!(net >= 0);
            assert!(net <= 123_457);
        }
    }
}
