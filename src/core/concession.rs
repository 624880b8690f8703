//! Small business CGT concessions (Division 152).
//!
//! Three eligibility tests decide whether the basic conditions are met. Four
//! pathways are then evaluated independently and [`select_concessions`] picks
//! the combination that is applied.

use super::entity::{EntityFacts, Relationship};
use super::money::{apply_rate, format_aud, round_money};
use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Aggregated turnover must be below this
pub const TURNOVER_THRESHOLD: Decimal = dec!(2000000);
/// Maximum net asset value, inclusive
pub const NET_ASSET_THRESHOLD: Decimal = dec!(6000000);
/// Fraction of the net asset threshold from which the cliff-edge warning fires
pub const CLIFF_EDGE_FRACTION: Decimal = dec!(0.9);
/// Minimum active-use percentage
pub const ACTIVE_ASSET_MINIMUM: Decimal = dec!(80);
pub const LONG_HOLDING_YEARS: u32 = 15;
pub const REDUCTION_RATE: Decimal = dec!(0.5);
/// Lifetime retirement exemption limit
pub const RETIREMENT_CAP: Decimal = dec!(500000);
pub const ROLLOVER_WINDOW_MONTHS: u32 = 24;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnoverTest {
    pub met: bool,
    pub aggregated_turnover: Option<Decimal>,
    pub threshold: Decimal,
    pub note: String,
}

/// One related party's contribution to the aggregated net asset value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetAssetContribution {
    pub name: String,
    pub relationship: Relationship,
    pub net_assets: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetAssetTest {
    pub met: bool,
    pub own_net_assets: Option<Decimal>,
    pub connected: Vec<NetAssetContribution>,
    pub connected_total: Decimal,
    pub aggregated_net_assets: Option<Decimal>,
    pub threshold: Decimal,
    pub cliff_edge_warning: Option<String>,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveAssetTest {
    pub met: bool,
    pub active_percentage: Option<Decimal>,
    pub minimum: Decimal,
    pub note: String,
}

/// A relief mechanism available once the basic conditions are met
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pathway {
    /// 15-year exemption: the whole gain is exempt
    LongHoldingExemption,
    /// 50% active asset reduction
    PercentageReduction,
    /// Retirement exemption up to the lifetime cap
    RetirementExemption,
    /// Replacement asset rollover (deferral, not reduction)
    Rollover,
}

impl Pathway {
    pub fn display(self) -> &'static str {
        match self {
            Pathway::LongHoldingExemption => "15-year exemption",
            Pathway::PercentageReduction => "50% active asset reduction",
            Pathway::RetirementExemption => "retirement exemption",
            Pathway::Rollover => "replacement asset rollover",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathwayResult {
    pub pathway: Pathway,
    pub available: bool,
    /// Amount the pathway would exempt, reduce or defer on its own terms
    pub amount: Decimal,
    pub note: String,
}

impl PathwayResult {
    fn unavailable(pathway: Pathway, note: impl Into<String>) -> Self {
        PathwayResult {
            pathway,
            available: false,
            amount: round_money(Decimal::ZERO),
            note: note.into(),
        }
    }
}

/// The combination of pathways actually applied to the net gain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConcessionSelection {
    None,
    LongHoldingExemption {
        amount: Decimal,
    },
    ReductionAndRetirement {
        reduction: Decimal,
        retirement: Decimal,
    },
}

impl ConcessionSelection {
    pub fn total(&self) -> Decimal {
        match self {
            ConcessionSelection::None => Decimal::ZERO,
            ConcessionSelection::LongHoldingExemption { amount } => *amount,
            ConcessionSelection::ReductionAndRetirement {
                reduction,
                retirement,
            } => reduction + retirement,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcessionAnalysis {
    /// Net capital gain (after discount) the concessions are measured against
    pub net_gain: Decimal,
    pub turnover_test: TurnoverTest,
    pub net_asset_test: NetAssetTest,
    pub active_asset_test: ActiveAssetTest,
    pub basic_conditions_met: bool,
    pub pathways: Vec<PathwayResult>,
    pub selection: ConcessionSelection,
    pub total_concession: Decimal,
    /// Prior retirement exemption usage was not supplied; full cap assumed
    pub retirement_cap_ambiguous: bool,
    pub rollover_deadline: Option<NaiveDate>,
    pub requires_professional_review: bool,
}

impl ConcessionAnalysis {
    pub fn pathway(&self, pathway: Pathway) -> Option<&PathwayResult> {
        self.pathways.iter().find(|p| p.pathway == pathway)
    }
}

pub fn turnover_test(facts: &EntityFacts) -> TurnoverTest {
    let (met, note) = match facts.aggregated_turnover {
        None => (false, "Aggregated turnover not supplied; test treated as not met".to_string()),
        Some(t) if t < TURNOVER_THRESHOLD => (
            true,
            format!("Aggregated turnover {} is below {}", format_aud(t), format_aud(TURNOVER_THRESHOLD)),
        ),
        Some(t) => (
            false,
            format!("Aggregated turnover {} is not below {}", format_aud(t), format_aud(TURNOVER_THRESHOLD)),
        ),
    };
    TurnoverTest {
        met,
        aggregated_turnover: facts.aggregated_turnover,
        threshold: TURNOVER_THRESHOLD,
        note,
    }
}

pub fn net_asset_test(facts: &EntityFacts) -> NetAssetTest {
    let connected: Vec<NetAssetContribution> = facts
        .connected_entities
        .iter()
        .map(|c| NetAssetContribution {
            name: c.name.clone(),
            relationship: c.relationship,
            net_assets: round_money(c.net_assets),
        })
        .collect();
    let connected_total = round_money(connected.iter().map(|c| c.net_assets).sum());
    let aggregated = facts.net_assets.map(|own| round_money(own + connected_total));

    let cliff_edge_warning = aggregated
        .filter(|a| *a >= NET_ASSET_THRESHOLD * CLIFF_EDGE_FRACTION && *a < NET_ASSET_THRESHOLD)
        .map(|a| {
            format!(
                "Aggregated net assets of {} are within 10% of the {} threshold; a small change in valuations could remove eligibility",
                format_aud(a),
                format_aud(NET_ASSET_THRESHOLD)
            )
        });

    let (met, note) = match aggregated {
        None => (
            false,
            "Own net asset value not supplied; test treated as not met".to_string(),
        ),
        Some(a) if a <= NET_ASSET_THRESHOLD => (
            true,
            format!(
                "Aggregated net assets {} ({} connected/affiliated) do not exceed {}",
                format_aud(a),
                connected.len(),
                format_aud(NET_ASSET_THRESHOLD)
            ),
        ),
        Some(a) => (
            false,
            format!(
                "Aggregated net assets {} ({} connected/affiliated) exceed {}",
                format_aud(a),
                connected.len(),
                format_aud(NET_ASSET_THRESHOLD)
            ),
        ),
    };

    NetAssetTest {
        met,
        own_net_assets: facts.net_assets,
        connected,
        connected_total,
        aggregated_net_assets: aggregated,
        threshold: NET_ASSET_THRESHOLD,
        cliff_edge_warning,
        note,
    }
}

pub fn active_asset_test(facts: &EntityFacts) -> ActiveAssetTest {
    let (met, note) = match facts.active_asset_percentage {
        None => (
            false,
            "Active asset percentage not supplied; test treated as not met".to_string(),
        ),
        Some(p) if p < Decimal::ZERO || p > Decimal::ONE_HUNDRED => (
            false,
            format!("Active asset percentage {p} is outside 0-100; test treated as not met"),
        ),
        Some(p) if p >= ACTIVE_ASSET_MINIMUM => {
            (true, format!("Asset active for {p}% of ownership (minimum {ACTIVE_ASSET_MINIMUM}%)"))
        }
        Some(p) => (
            false,
            format!("Asset active for {p}% of ownership, below the {ACTIVE_ASSET_MINIMUM}% minimum"),
        ),
    };
    ActiveAssetTest {
        met,
        active_percentage: facts.active_asset_percentage,
        minimum: ACTIVE_ASSET_MINIMUM,
        note,
    }
}

/// Size tests are alternatives; the activity test is mandatory
pub fn basic_conditions_met(turnover: &TurnoverTest, net_assets: &NetAssetTest, active: &ActiveAssetTest) -> bool {
    (turnover.met || net_assets.met) && active.met
}

fn long_holding(net_gain: Decimal, facts: &EntityFacts) -> PathwayResult {
    match facts.years_held {
        None => PathwayResult::unavailable(
            Pathway::LongHoldingExemption,
            "Years of ownership not supplied; exemption not assumed",
        ),
        Some(years) if years >= LONG_HOLDING_YEARS => PathwayResult {
            pathway: Pathway::LongHoldingExemption,
            available: true,
            amount: net_gain,
            note: format!("Held {years} years (at least {LONG_HOLDING_YEARS}); entire gain exempt"),
        },
        Some(years) => PathwayResult::unavailable(
            Pathway::LongHoldingExemption,
            format!("Held {years} years, fewer than {LONG_HOLDING_YEARS}"),
        ),
    }
}

fn percentage_reduction(net_gain: Decimal) -> PathwayResult {
    let amount = apply_rate(net_gain, REDUCTION_RATE);
    PathwayResult {
        pathway: Pathway::PercentageReduction,
        available: true,
        amount,
        note: format!("50% of {} reduced", format_aud(net_gain)),
    }
}

/// Retirement exemption on the remainder after the percentage reduction.
/// Returns whether the cap had to be assumed.
fn retirement(remainder: Decimal, facts: &EntityFacts) -> (PathwayResult, bool) {
    let (cap_available, ambiguous) = match facts.prior_retirement_exemption_used {
        Some(used) => ((RETIREMENT_CAP - used).max(Decimal::ZERO), false),
        None => (RETIREMENT_CAP, true),
    };
    let amount = round_money(remainder.min(cap_available));
    let mut note = format!(
        "{} of {} lifetime cap available",
        format_aud(cap_available),
        format_aud(RETIREMENT_CAP)
    );
    if ambiguous {
        note.push_str("; prior usage unknown, full cap assumed");
    }
    let result = PathwayResult {
        pathway: Pathway::RetirementExemption,
        available: amount > Decimal::ZERO,
        amount,
        note,
    };
    (result, ambiguous)
}

fn rollover(remainder: Decimal, facts: &EntityFacts, last_disposal: Option<NaiveDate>) -> (PathwayResult, Option<NaiveDate>) {
    let deadline = last_disposal.and_then(|d| d.checked_add_months(Months::new(ROLLOVER_WINDOW_MONTHS)));
    match facts.replacement_asset_planned {
        None => (
            PathwayResult::unavailable(
                Pathway::Rollover,
                "Replacement asset intention not supplied; rollover not assumed",
            ),
            None,
        ),
        Some(false) => (
            PathwayResult::unavailable(Pathway::Rollover, "No replacement asset planned"),
            None,
        ),
        Some(true) => {
            let by = deadline
                .map(|d| format!(" by {d}"))
                .unwrap_or_default();
            (
                PathwayResult {
                    pathway: Pathway::Rollover,
                    available: true,
                    amount: remainder,
                    note: format!(
                        "Defers {} if a replacement asset is acquired{by}; alternative to the retirement exemption, does not reduce the gain now",
                        format_aud(remainder)
                    ),
                },
                deadline,
            )
        }
    }
}

/// Pick the most beneficial combination: the 15-year exemption alone when it
/// applies, otherwise the percentage reduction followed by the retirement
/// exemption on the remainder. Rollover is never combined.
pub fn select_concessions(pathways: &[PathwayResult]) -> ConcessionSelection {
    let available = |p: Pathway| pathways.iter().find(|r| r.pathway == p && r.available);

    if let Some(exemption) = available(Pathway::LongHoldingExemption) {
        return ConcessionSelection::LongHoldingExemption {
            amount: exemption.amount,
        };
    }

    let amount_of = |p: Pathway| round_money(available(p).map_or(Decimal::ZERO, |r| r.amount));
    let reduction = amount_of(Pathway::PercentageReduction);
    let retirement = amount_of(Pathway::RetirementExemption);
    if reduction.is_zero() && retirement.is_zero() {
        ConcessionSelection::None
    } else {
        ConcessionSelection::ReductionAndRetirement {
            reduction,
            retirement,
        }
    }
}

/// Evaluate the concessions for a net gain.
///
/// Returns `None` when there is no net gain or no concession facts were supplied.
pub fn evaluate(net_gain: Decimal, facts: &EntityFacts, last_disposal: Option<NaiveDate>) -> Option<ConcessionAnalysis> {
    if net_gain <= Decimal::ZERO || !facts.has_concession_facts() {
        return None;
    }

    let turnover = turnover_test(facts);
    let net_assets = net_asset_test(facts);
    let active = active_asset_test(facts);
    let basic = basic_conditions_met(&turnover, &net_assets, &active);

    let mut retirement_cap_ambiguous = false;
    let mut rollover_deadline = None;
    let pathways = if basic {
        let reduction = percentage_reduction(net_gain);
        let remainder = net_gain - reduction.amount;
        let (retirement, ambiguous) = retirement(remainder, facts);
        let (rollover, deadline) = rollover(remainder, facts, last_disposal);
        retirement_cap_ambiguous = ambiguous;
        rollover_deadline = deadline;
        vec![long_holding(net_gain, facts), reduction, retirement, rollover]
    } else {
        let note = "Basic conditions not met";
        vec![
            PathwayResult::unavailable(Pathway::LongHoldingExemption, note),
            PathwayResult::unavailable(Pathway::PercentageReduction, note),
            PathwayResult::unavailable(Pathway::RetirementExemption, note),
            PathwayResult::unavailable(Pathway::Rollover, note),
        ]
    };

    let selection = select_concessions(&pathways);
    let total_concession = round_money(selection.total());
    log::info!(
        "concessions: basic_conditions={} selection={:?} total={}",
        basic,
        selection,
        total_concession
    );

    Some(ConcessionAnalysis {
        net_gain,
        turnover_test: turnover,
        net_asset_test: net_assets,
        active_asset_test: active,
        basic_conditions_met: basic,
        pathways,
        selection,
        total_concession,
        retirement_cap_ambiguous,
        rollover_deadline,
        requires_professional_review: true,
    })
}
