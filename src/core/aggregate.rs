use super::categorise::AssetCategory;
use super::entity::EntityType;
use super::events::{CgtEvent, EventKind};
use super::money::{apply_rate, round_money};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::ops::Add;

/// Gross gains and losses for one asset category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotals {
    pub event_count: usize,
    pub gains: Decimal,
    pub losses: Decimal,
}

/// Losses carried in from earlier income years
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PriorLosses {
    pub general: Decimal,
    pub collectable: Decimal,
}

/// Net capital gain position after quarantining, netting and discount
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GainLossPosition {
    pub collectable: CategoryTotals,
    pub personal_use: CategoryTotals,
    pub other: CategoryTotals,
    pub total_gains: Decimal,
    pub total_losses: Decimal,
    /// Gains and losses on pre-CGT assets, outside the regime entirely
    pub pre_regime_gains_disregarded: Decimal,
    pub pre_regime_losses_disregarded: Decimal,
    /// Personal-use losses never offset anything and are never carried forward
    pub personal_use_losses_disregarded: Decimal,
    pub prior_collectable_losses: Decimal,
    pub collectable_losses_applied: Decimal,
    pub collectable_carry_forward: Decimal,
    pub net_collectable_gain: Decimal,
    pub general_pool: Decimal,
    pub prior_year_losses: Decimal,
    pub available_losses: Decimal,
    pub losses_applied: Decimal,
    pub carry_forward_losses: Decimal,
    pub pre_discount_net_gain: Decimal,
    /// Part of the pre-discount net gain that came from discount-eligible events
    pub discountable_gain: Decimal,
    pub discount_rate: Option<Decimal>,
    pub discount_amount: Decimal,
    /// Net capital gain after the discount
    pub net_gain: Decimal,
}

/// Gains split by whether the originating event qualifies for the discount
#[derive(Debug, Clone, Copy, Default)]
struct GainSplit {
    eligible: Decimal,
    ineligible: Decimal,
}

impl GainSplit {
    fn total(self) -> Decimal {
        self.eligible + self.ineligible
    }

    /// Apply losses, absorbing non-discountable gains first
    fn absorb(self, losses: Decimal) -> GainSplit {
        let from_ineligible = losses.min(self.ineligible);
        let from_eligible = (losses - from_ineligible).min(self.eligible);
        GainSplit {
            eligible: self.eligible - from_eligible,
            ineligible: self.ineligible - from_ineligible,
        }
    }
}

impl Add for GainSplit {
    type Output = GainSplit;

    fn add(self, rhs: GainSplit) -> GainSplit {
        GainSplit {
            eligible: self.eligible + rhs.eligible,
            ineligible: self.ineligible + rhs.ineligible,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Bucket {
    count: usize,
    gains: GainSplit,
    losses: Decimal,
}

impl Bucket {
    fn push(&mut self, event: &CgtEvent) {
        self.count += 1;
        if event.discount_eligible {
            self.gains.eligible += event.gain;
        } else {
            self.gains.ineligible += event.gain;
        }
        self.losses += event.loss;
    }

    fn totals(&self) -> CategoryTotals {
        CategoryTotals {
            event_count: self.count,
            gains: round_money(self.gains.total()),
            losses: round_money(self.losses),
        }
    }
}

/// Quarantine, net and discount the period's events.
///
/// `discount_rate` is the rate for this entity type (see [`EntityType::discount_rate`]).
///
/// The discount applies to the discount-eligible remainder of the pool, not to the
/// whole pre-discount net gain: losses absorb gains on assets held under 12 months
/// first, and whatever short-held gain survives stays undiscounted. When every gain
/// is eligible the two bases coincide.
pub fn aggregate(
    events: &[CgtEvent],
    entity_type: EntityType,
    discount_rate: Option<Decimal>,
    prior: PriorLosses,
) -> GainLossPosition {
    let mut collectable = Bucket::default();
    let mut personal_use = Bucket::default();
    let mut other = Bucket::default();
    let mut pre_regime_gains = Decimal::ZERO;
    let mut pre_regime_losses = Decimal::ZERO;

    for event in events {
        if event.kind == EventKind::PreRegime {
            pre_regime_gains += event.gain;
            pre_regime_losses += event.loss;
            continue;
        }
        match event.category {
            AssetCategory::Collectable => collectable.push(event),
            AssetCategory::PersonalUse => personal_use.push(event),
            AssetCategory::Other => other.push(event),
        }
    }

    // Collectable losses only ever offset collectable gains
    let collectable_losses = collectable.losses + prior.collectable;
    let collectable_gains = collectable.gains.total();
    let collectable_applied = collectable_losses.min(collectable_gains);
    let collectable_carry_forward = collectable_losses - collectable_applied;
    let collectable_net = collectable.gains.absorb(collectable_applied);

    // Personal-use gains join the pool; personal-use losses do not
    let pool = collectable_net + other.gains + personal_use.gains;
    let general_pool = pool.total();
    let available_losses = other.losses + prior.general;
    let losses_applied = available_losses.min(general_pool);
    let carry_forward_losses = available_losses - losses_applied;
    let remaining = pool.absorb(losses_applied);

    let pre_discount_net_gain = remaining.total().max(Decimal::ZERO);
    let discount_rate = discount_rate.filter(|_| entity_type.is_discount_eligible());
    let (discountable_gain, discount_amount) = match discount_rate {
        Some(rate) => (remaining.eligible, apply_rate(remaining.eligible, rate)),
        None => (Decimal::ZERO, Decimal::ZERO),
    };
    let net_gain = pre_discount_net_gain - discount_amount;

    log::debug!(
        "pool={} applied={} carry_forward={} collectable_cf={} pre_discount={} discount={}",
        general_pool,
        losses_applied,
        carry_forward_losses,
        collectable_carry_forward,
        pre_discount_net_gain,
        discount_amount
    );

    GainLossPosition {
        total_gains: round_money(collectable_gains + other.gains.total() + personal_use.gains.total()),
        total_losses: round_money(collectable.losses + other.losses + personal_use.losses),
        collectable: collectable.totals(),
        personal_use: personal_use.totals(),
        other: other.totals(),
        pre_regime_gains_disregarded: round_money(pre_regime_gains),
        pre_regime_losses_disregarded: round_money(pre_regime_losses),
        personal_use_losses_disregarded: round_money(personal_use.losses),
        prior_collectable_losses: round_money(prior.collectable),
        collectable_losses_applied: round_money(collectable_applied),
        collectable_carry_forward: round_money(collectable_carry_forward),
        net_collectable_gain: round_money(collectable_net.total()),
        general_pool: round_money(general_pool),
        prior_year_losses: round_money(prior.general),
        available_losses: round_money(available_losses),
        losses_applied: round_money(losses_applied),
        carry_forward_losses: round_money(carry_forward_losses),
        pre_discount_net_gain: round_money(pre_discount_net_gain),
        discountable_gain: round_money(discountable_gain),
        discount_rate,
        discount_amount: round_money(discount_amount),
        net_gain: round_money(net_gain),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn ev(category: AssetCategory, net: Decimal, eligible: bool) -> CgtEvent {
        let (gain, loss) = if net >= Decimal::ZERO {
            (net, Decimal::ZERO)
        } else {
            (Decimal::ZERO, -net)
        };
        CgtEvent {
            source_transaction_id: "tx".to_string(),
            kind: EventKind::Disposal,
            asset: "asset".to_string(),
            acquisition_date: None,
            disposal_date: NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(),
            holding_months: if eligible { 24 } else { 3 },
            gain,
            loss,
            discount_eligible: eligible,
            discounted_gain: gain,
            category,
            category_reason: String::new(),
            confidence: 90,
            cost_base_warning: None,
            statute_warning: None,
        }
    }

    fn individual(events: &[CgtEvent], prior: PriorLosses) -> GainLossPosition {
        aggregate(events, EntityType::Individual, Some(dec!(0.5)), prior)
    }

    #[test]
    fn collectable_losses_are_quarantined() {
        let events = vec![
            ev(AssetCategory::Collectable, dec!(-5000), true),
            ev(AssetCategory::Collectable, dec!(3000), true),
            ev(AssetCategory::Other, dec!(10000), true),
        ];
        let p = individual(&events, PriorLosses::default());
        assert_eq!(p.collectable_losses_applied, dec!(3000));
        assert_eq!(p.collectable_carry_forward, dec!(2000));
        assert_eq!(p.net_collectable_gain, dec!(0));
        assert_eq!(p.general_pool, dec!(10000));
        assert_eq!(p.losses_applied, dec!(0));
        assert_eq!(p.pre_discount_net_gain, dec!(10000));
        assert_eq!(p.carry_forward_losses, dec!(0));
    }

    #[test]
    fn personal_use_losses_are_disregarded() {
        let events = vec![
            ev(AssetCategory::PersonalUse, dec!(-7000), true),
            ev(AssetCategory::PersonalUse, dec!(2000), true),
            ev(AssetCategory::Other, dec!(1000), true),
        ];
        let p = individual(&events, PriorLosses::default());
        assert_eq!(p.personal_use_losses_disregarded, dec!(7000));
        assert_eq!(p.general_pool, dec!(3000));
        assert_eq!(p.losses_applied, dec!(0));
        assert_eq!(p.carry_forward_losses, dec!(0));
        assert_eq!(p.collectable_carry_forward, dec!(0));
        assert_eq!(p.pre_discount_net_gain, dec!(3000));
    }

    #[test]
    fn other_losses_and_prior_losses_offset_pool() {
        let events = vec![
            ev(AssetCategory::Other, dec!(10000), true),
            ev(AssetCategory::Other, dec!(-4000), true),
        ];
        let prior = PriorLosses {
            general: dec!(9000),
            collectable: Decimal::ZERO,
        };
        let p = individual(&events, prior);
        assert_eq!(p.available_losses, dec!(13000));
        assert_eq!(p.losses_applied, dec!(10000));
        assert_eq!(p.carry_forward_losses, dec!(3000));
        assert_eq!(p.pre_discount_net_gain, dec!(0));
        assert_eq!(p.discount_amount, dec!(0));
        assert_eq!(p.net_gain, dec!(0));
    }

    #[test]
    fn prior_collectable_losses_stay_in_collectable_pool() {
        let events = vec![
            ev(AssetCategory::Collectable, dec!(1000), true),
            ev(AssetCategory::Other, dec!(5000), true),
        ];
        let prior = PriorLosses {
            general: Decimal::ZERO,
            collectable: dec!(1500),
        };
        let p = individual(&events, prior);
        assert_eq!(p.collectable_losses_applied, dec!(1000));
        assert_eq!(p.collectable_carry_forward, dec!(500));
        assert_eq!(p.general_pool, dec!(5000));
    }

    #[test]
    fn discount_rates_by_entity() {
        let events = vec![ev(AssetCategory::Other, dec!(120000), true)];
        let p = individual(&events, PriorLosses::default());
        assert_eq!(p.discount_amount, dec!(60000));
        assert_eq!(p.net_gain, dec!(60000));

        let events = vec![ev(AssetCategory::Other, dec!(1000), true)];
        let rate = EntityType::SuperannuationFund.discount_rate(dec!(0.5));
        let p = aggregate(&events, EntityType::SuperannuationFund, rate, PriorLosses::default());
        assert_eq!(p.discount_amount, dec!(333.33));
        assert_eq!(p.net_gain, dec!(666.67));

        let p = aggregate(&events, EntityType::Company, Some(dec!(0.5)), PriorLosses::default());
        assert_eq!(p.discount_rate, None);
        assert_eq!(p.discount_amount, dec!(0));
        assert_eq!(p.net_gain, dec!(1000));
    }

    #[test]
    fn losses_absorb_non_discountable_gains_first() {
        let events = vec![
            ev(AssetCategory::Other, dec!(4000), false),
            ev(AssetCategory::Other, dec!(10000), true),
            ev(AssetCategory::Other, dec!(-5000), true),
        ];
        let p = individual(&events, PriorLosses::default());
        assert_eq!(p.pre_discount_net_gain, dec!(9000));
        assert_eq!(p.discountable_gain, dec!(9000));
        assert_eq!(p.discount_amount, dec!(4500));
        assert_eq!(p.net_gain, dec!(4500));
    }

    #[test]
    fn short_held_gains_are_not_discounted() {
        let events = vec![
            ev(AssetCategory::Other, dec!(6000), false),
            ev(AssetCategory::Other, dec!(2000), true),
        ];
        let p = individual(&events, PriorLosses::default());
        assert_eq!(p.discountable_gain, dec!(2000));
        assert_eq!(p.discount_amount, dec!(1000));
        assert_eq!(p.net_gain, dec!(7000));
    }

    #[test]
    fn pre_regime_events_are_outside_the_pools() {
        let mut pre = ev(AssetCategory::Other, dec!(80000), true);
        pre.kind = EventKind::PreRegime;
        let events = vec![pre, ev(AssetCategory::Other, dec!(1000), true)];
        let p = individual(&events, PriorLosses::default());
        assert_eq!(p.pre_regime_gains_disregarded, dec!(80000));
        assert_eq!(p.general_pool, dec!(1000));
        assert_eq!(p.total_gains, dec!(1000));
    }

    #[test]
    fn collectable_losses_never_reach_general_pool() {
        let events = vec![
            ev(AssetCategory::Collectable, dec!(-50000), true),
            ev(AssetCategory::Other, dec!(20000), true),
            ev(AssetCategory::Other, dec!(-1000), true),
        ];
        let p = individual(&events, PriorLosses::default());
        assert_eq!(p.losses_applied, dec!(1000));
        assert_eq!(p.pre_discount_net_gain, dec!(19000));
        assert_eq!(p.collectable_carry_forward, dec!(50000));
    }

    #[test]
    fn prior_losses_are_monotone() {
        let events = vec![
            ev(AssetCategory::Other, dec!(30000), true),
            ev(AssetCategory::Other, dec!(5000), false),
            ev(AssetCategory::Collectable, dec!(2500), true),
            ev(AssetCategory::Other, dec!(-3000), true),
        ];
        let mut previous: Option<Decimal> = None;
        for prior in [0, 1000, 5000, 20000, 34500, 40000, 100000] {
            let p = individual(
                &events,
                PriorLosses {
                    general: Decimal::from(prior),
                    collectable: Decimal::ZERO,
                },
            );
            assert!(p.net_gain >= Decimal::ZERO);
            if let Some(prev) = previous {
                assert!(p.net_gain <= prev, "prior={prior}");
            }
            previous = Some(p.net_gain);
        }
        assert_eq!(previous, Some(Decimal::ZERO));
    }
}
