use super::categorise::{categorise, AssetCategory};
use super::entity::EntityType;
use super::fy::FinancialYear;
use super::money::round_money;
use super::transaction::RawTransaction;
use super::warnings::ExclusionReason;
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Description/category vocabulary that marks a transaction as a possible CGT event
const CGT_VOCABULARY: &[&str] = &[
    "asset",
    "capital",
    "disposal",
    "sale of",
    "capital gain",
    "capital loss",
];

/// Average days per month used to turn a day count into whole months
const DAYS_PER_MONTH: Decimal = dec!(30.44);

/// Minimum holding period for the CGT discount
pub const DISCOUNT_HOLDING_MONTHS: u32 = 12;

/// Events below this confidence are flagged for review
pub const LOW_CONFIDENCE: u8 = 60;

/// CGT commenced on 20 September 1985; assets acquired earlier are pre-CGT
fn cgt_commencement() -> NaiveDate {
    NaiveDate::from_ymd_opt(1985, 9, 20).expect("valid date")
}

/// Kind of CGT event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Disposal of a CGT asset (A1)
    Disposal,
    /// Loss, destruction, cancellation or surrender (C1/C2)
    Cancellation,
    /// Creating contractual or other rights (D1)
    RightsCreation,
    /// Compensation or forfeited deposit received
    Receipt,
    /// Asset acquired before CGT commenced
    PreRegime,
    Other,
}

impl EventKind {
    /// Whether an earlier event of this kind can change the cost base of a later one
    pub fn modifies_cost_base(self) -> bool {
        matches!(
            self,
            EventKind::Disposal
                | EventKind::Cancellation
                | EventKind::RightsCreation
                | EventKind::Receipt
        )
    }

    pub fn display(self) -> &'static str {
        match self {
            EventKind::Disposal => "disposal",
            EventKind::Cancellation => "cancellation",
            EventKind::RightsCreation => "rights creation",
            EventKind::Receipt => "receipt",
            EventKind::PreRegime => "pre-CGT",
            EventKind::Other => "other",
        }
    }

    fn base_confidence(self) -> u8 {
        match self {
            EventKind::Disposal => 90,
            EventKind::PreRegime => 85,
            EventKind::Cancellation => 80,
            EventKind::RightsCreation => 75,
            EventKind::Receipt => 70,
            EventKind::Other => 50,
        }
    }
}

/// Ordered rules: the first kind with a matching keyword wins
const KIND_RULES: &[(EventKind, &[&str])] = &[
    (EventKind::Disposal, &["disposal", "sold"]),
    (EventKind::Cancellation, &["cancel", "surrender"]),
    (EventKind::RightsCreation, &["right", "contract"]),
    (EventKind::Receipt, &["compensation", "receipt", "forfeit"]),
];

fn kind_from_keywords(search_text: &str) -> EventKind {
    KIND_RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| search_text.contains(k)))
        .map(|(kind, _)| *kind)
        .unwrap_or(EventKind::Other)
}

/// A classified CGT event derived from one transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CgtEvent {
    pub source_transaction_id: String,
    pub kind: EventKind,
    /// Asset description as recorded on the transaction
    pub asset: String,
    pub acquisition_date: Option<NaiveDate>,
    pub disposal_date: NaiveDate,
    pub holding_months: u32,
    pub gain: Decimal,
    pub loss: Decimal,
    pub discount_eligible: bool,
    /// Gain after the entity's discount, or the full gain when not eligible
    pub discounted_gain: Decimal,
    pub category: AssetCategory,
    pub category_reason: String,
    /// Classification confidence, 0-100
    pub confidence: u8,
    pub cost_base_warning: Option<String>,
    pub statute_warning: Option<String>,
}

impl CgtEvent {
    pub fn is_low_confidence(&self) -> bool {
        self.confidence < LOW_CONFIDENCE
    }
}

/// Outcome of classifying a single transaction
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// Not a capital gains transaction
    NotCgt,
    /// Looked like a CGT event but the amount was unusable
    Excluded(ExclusionReason),
    Event(CgtEvent),
}

/// Context shared by every classification in a run
#[derive(Debug, Clone, Copy)]
pub struct ClassifyContext {
    pub entity_type: EntityType,
    /// Discount rate for this entity type; `None` when the entity gets no discount
    pub discount_rate: Option<Decimal>,
    /// Date the analysis is performed, used for amendment-period checks
    pub as_at: NaiveDate,
}

/// Whole months between acquisition and disposal; zero when acquisition is unknown
pub fn holding_period_months(acquired: Option<NaiveDate>, disposed: NaiveDate) -> u32 {
    let Some(acquired) = acquired else {
        return 0;
    };
    let days = (disposed - acquired).num_days();
    if days <= 0 {
        return 0;
    }
    (Decimal::from(days) / DAYS_PER_MONTH)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u32()
        .unwrap_or(0)
}

/// Classify one transaction. Pure: reads nothing but its arguments.
pub fn classify(tx: &RawTransaction, ctx: &ClassifyContext) -> Classification {
    let text = tx.search_text();
    if !CGT_VOCABULARY.iter().any(|k| text.contains(k)) {
        return Classification::NotCgt;
    }

    let amount = match tx.amount {
        None => return Classification::Excluded(ExclusionReason::MalformedAmount),
        Some(a) if a.is_zero() => return Classification::Excluded(ExclusionReason::ZeroAmount),
        Some(a) => round_money(a),
    };
    if amount.is_zero() {
        return Classification::Excluded(ExclusionReason::ZeroAmount);
    }

    let gain = round_money(amount.max(Decimal::ZERO));
    let loss = round_money((-amount).max(Decimal::ZERO));

    let kind = match tx.acquisition_date {
        Some(acquired) if acquired < cgt_commencement() => EventKind::PreRegime,
        _ => kind_from_keywords(&text),
    };

    let holding_months = holding_period_months(tx.acquisition_date, tx.date);
    let discount_eligible =
        holding_months >= DISCOUNT_HOLDING_MONTHS && ctx.entity_type.is_discount_eligible();
    let discounted_gain = match ctx.discount_rate {
        Some(rate) if discount_eligible => gain - round_money(gain * rate),
        _ => gain,
    };

    let mut confidence = kind.base_confidence();
    if tx.acquisition_date.is_none() {
        confidence = confidence.saturating_sub(20);
    }

    let categorisation = categorise(&text);
    if let Some(keyword) = categorisation.matched_keyword {
        log::trace!("{}: category keyword '{}'", tx.id, keyword);
    }

    let event = CgtEvent {
        source_transaction_id: tx.id.clone(),
        kind,
        asset: tx.description.clone(),
        acquisition_date: tx.acquisition_date,
        disposal_date: tx.date,
        holding_months,
        gain,
        loss,
        discount_eligible,
        discounted_gain,
        category: categorisation.category,
        category_reason: categorisation.justification,
        confidence,
        cost_base_warning: None,
        statute_warning: statute_warning(tx.date, ctx),
    };

    log::debug!(
        "{}: {} {} gain={} loss={} months={} category={:?}",
        event.source_transaction_id,
        event.kind.display(),
        event.asset,
        event.gain,
        event.loss,
        event.holding_months,
        event.category
    );

    Classification::Event(event)
}

fn statute_warning(disposal: NaiveDate, ctx: &ClassifyContext) -> Option<String> {
    let year = FinancialYear::from_date(disposal);
    let period = ctx.entity_type.amendment_period_years();
    let deadline = year.amendment_deadline(period);
    (ctx.as_at > deadline).then(|| {
        format!(
            "Disposal falls in {year}; the {period}-year amendment period ended {deadline}, so the assessment may no longer be amendable"
        )
    })
}
