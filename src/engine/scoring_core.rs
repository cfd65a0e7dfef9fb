// ==========================================
// Pharmaflow - pure scoring computations
// ==========================================
// No I/O here: every function takes loaded rules and returns points.
// The engines load data through the repositories and delegate the math to
// this module so it stays unit-testable.
// ==========================================

use crate::domain::scoring::BonusTier;
use crate::domain::stage::{ActivityScoreRule, ProductionRule, ScoringConfig};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

/// First day of the month a timestamp falls in; ledger entries group by it.
pub fn month_ref_for(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date)
}

/// Pick the activity rule for a quantity. Rules bound to a product type win
/// over generic ones; among those, the narrowest band wins.
pub fn pick_activity_rule<'a>(
    rules: &'a [ActivityScoreRule],
    product_type_id: Option<&str>,
    quantity: i64,
) -> Option<&'a ActivityScoreRule> {
    rules
        .iter()
        .filter(|r| r.active && r.contains(quantity))
        .filter(|r| match (&r.product_type_id, product_type_id) {
            (Some(rule_pt), Some(pt)) => rule_pt == pt,
            (Some(_), None) => false,
            (None, _) => true,
        })
        .min_by_key(|r| (r.product_type_id.is_none(), r.band_max - r.band_min))
}

/// Production scoring: quantity x per-unit + band fixed points.
pub fn production_points(rule: &ProductionRule, quantity: i64) -> Decimal {
    Decimal::from(quantity) * rule.points_per_unit + rule.fixed_points
}

/// Checklist-config scoring: fixed + per-check x marked, clamped to
/// [min_points, max_points].
pub fn checklist_points(config: &ScoringConfig, marked_count: i64) -> Decimal {
    let raw = config.fixed_points + config.per_check_points * Decimal::from(marked_count);
    let mut points = raw.max(config.min_points);
    if let Some(max) = config.max_points {
        points = points.min(max);
    }
    points
}

/// Active tier whose band contains the monthly total.
pub fn pick_bonus_tier(tiers: &[BonusTier], points: Decimal) -> Option<&BonusTier> {
    tiers
        .iter()
        .filter(|t| t.active)
        .find(|t| t.contains(points))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use rust_decimal_macros::dec;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 10)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn activity_rule(
        product_type_id: Option<&str>,
        band_min: i64,
        band_max: i64,
        points: Decimal,
    ) -> ActivityScoreRule {
        ActivityScoreRule {
            rule_id: format!("r-{band_min}-{band_max}"),
            stage_id: "stage-1".to_string(),
            product_type_id: product_type_id.map(String::from),
            activity: crate::domain::types::ActivityKind::Encapsulation,
            band_min,
            band_max,
            points,
            active: true,
            created_at: ts(),
            updated_at: ts(),
        }
    }

    #[test]
    fn month_ref_is_first_day() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 17).unwrap();
        assert_eq!(
            month_ref_for(date),
            NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
        );
    }

    #[test]
    fn activity_rule_band_lookup() {
        let rules = vec![
            activity_rule(None, 0, 60, dec!(1)),
            activity_rule(None, 61, 120, dec!(2)),
        ];
        let picked = pick_activity_rule(&rules, None, 90).unwrap();
        assert_eq!(picked.points, dec!(2));
        assert!(pick_activity_rule(&rules, None, 500).is_none());
    }

    #[test]
    fn product_specific_rule_wins_over_generic() {
        let rules = vec![
            activity_rule(None, 0, 100, dec!(1)),
            activity_rule(Some("pt-capsule"), 0, 100, dec!(3)),
        ];
        let picked = pick_activity_rule(&rules, Some("pt-capsule"), 50).unwrap();
        assert_eq!(picked.points, dec!(3));
        // Without a product type only the generic rule applies.
        let picked = pick_activity_rule(&rules, None, 50).unwrap();
        assert_eq!(picked.points, dec!(1));
    }

    #[test]
    fn inactive_rules_are_skipped() {
        let mut rule = activity_rule(None, 0, 100, dec!(5));
        rule.active = false;
        assert!(pick_activity_rule(std::slice::from_ref(&rule), None, 10).is_none());
    }

    #[test]
    fn production_points_scale_with_quantity() {
        let rule = ProductionRule {
            rule_id: "pr-1".to_string(),
            stage_id: "stage-1".to_string(),
            band_min: 0,
            band_max: 1000,
            points_per_unit: dec!(0.05),
            fixed_points: dec!(2),
            active: true,
            version: "v1".to_string(),
            created_at: ts(),
            updated_at: ts(),
        };
        assert_eq!(production_points(&rule, 100), dec!(7.00));
    }

    #[test]
    fn checklist_points_clamped() {
        let config = ScoringConfig {
            config_id: "sc-1".to_string(),
            stage_id: "stage-1".to_string(),
            fixed_points: dec!(1),
            per_check_points: dec!(2),
            min_points: dec!(3),
            max_points: Some(dec!(8)),
            active: true,
            version: "v1".to_string(),
            created_at: ts(),
            updated_at: ts(),
        };
        // below the floor
        assert_eq!(checklist_points(&config, 0), dec!(3));
        // within range: 1 + 2*2 = 5
        assert_eq!(checklist_points(&config, 2), dec!(5));
        // above the cap: 1 + 2*10 = 21 -> 8
        assert_eq!(checklist_points(&config, 10), dec!(8));
    }

    #[test]
    fn bonus_tier_open_ended_top_band() {
        let tiers = vec![
            BonusTier {
                tier_id: "t1".to_string(),
                band_min: dec!(0),
                band_max: Some(dec!(400)),
                amount: dec!(0),
                active: true,
                created_at: ts(),
                updated_at: ts(),
            },
            BonusTier {
                tier_id: "t2".to_string(),
                band_min: dec!(401),
                band_max: Some(dec!(600)),
                amount: dec!(150),
                active: true,
                created_at: ts(),
                updated_at: ts(),
            },
            BonusTier {
                tier_id: "t3".to_string(),
                band_min: dec!(601),
                band_max: None,
                amount: dec!(350),
                active: true,
                created_at: ts(),
                updated_at: ts(),
            },
        ];
        assert_eq!(pick_bonus_tier(&tiers, dec!(250)).unwrap().amount, dec!(0));
        assert_eq!(
            pick_bonus_tier(&tiers, dec!(500)).unwrap().amount,
            dec!(150)
        );
        assert_eq!(
            pick_bonus_tier(&tiers, dec!(9000)).unwrap().amount,
            dec!(350)
        );
    }
}
