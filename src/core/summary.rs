//! Summary assembly: runs the whole pipeline for one entity and income year.

use super::aggregate::{aggregate, GainLossPosition, PriorLosses};
use super::concession::{self, ConcessionAnalysis};
use super::entity::{EntityFacts, EntityType};
use super::events::{classify, CgtEvent, Classification, ClassifyContext};
use super::fy::FinancialYear;
use super::interactions::detect_cost_base_interactions;
use super::money::round_money;
use super::rates::{resolve_rate, RateProvider, RateStamp};
use super::recommend::{recommendations, MATERIALITY_THRESHOLD};
use super::transaction::{RawTransaction, SourceError, TransactionSource};
use super::warnings::Warning;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("failed to encode input for digest: {0}")]
    Digest(#[from] serde_json::Error),
}

/// What to analyse
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub entity_id: String,
    pub period: FinancialYear,
    pub facts: EntityFacts,
    /// Date the analysis is taken to be performed on
    pub as_at: NaiveDate,
}

/// Complete capital gains position for an entity and income year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub entity_id: String,
    pub entity_type: EntityType,
    pub period: FinancialYear,
    pub as_at: NaiveDate,
    /// SHA-256 of the transactions and entity facts the summary was built from
    pub input_digest: String,
    pub discount_rate: RateStamp,
    pub events: Vec<CgtEvent>,
    pub warnings: Vec<Warning>,
    pub position: GainLossPosition,
    pub concession: Option<ConcessionAnalysis>,
    /// Net capital gain less any concessions applied
    pub taxable_gain: Decimal,
    pub recommendations: Vec<String>,
    pub requires_professional_review: bool,
}

/// Fetch the period's transactions, resolve the discount rate and assemble the summary.
///
/// A transaction source failure is fatal; an unavailable rate provider is not.
pub fn analyse(
    request: &AnalysisRequest,
    source: &dyn TransactionSource,
    rates: &dyn RateProvider,
) -> Result<Summary, EngineError> {
    let transactions = source.transactions(&request.entity_id, request.period)?;
    log::info!(
        "analysing {} transaction(s) for {} in {}",
        transactions.len(),
        request.entity_id,
        request.period
    );
    let (stamp, rate_warning) = resolve_rate(rates, request.as_at);
    let mut summary = assemble(request, &transactions, stamp)?;
    if let Some(warning) = rate_warning {
        summary.warnings.insert(0, warning);
    }
    Ok(summary)
}

/// Classify the transactions into events, one [`Classification`] per transaction
pub fn classify_all(
    transactions: &[RawTransaction],
    ctx: &ClassifyContext,
) -> (Vec<CgtEvent>, Vec<Warning>) {
    let mut events = Vec::new();
    let mut warnings = Vec::new();
    for tx in transactions {
        match classify(tx, ctx) {
            Classification::NotCgt => {}
            Classification::Excluded(reason) => {
                log::warn!("transaction {} excluded: {:?}", tx.id, reason);
                warnings.push(Warning::ExcludedTransaction {
                    transaction_id: tx.id.clone(),
                    reason,
                });
            }
            Classification::Event(event) => events.push(event),
        }
    }
    (detect_cost_base_interactions(events), warnings)
}

/// Build the summary from already fetched inputs. Pure.
pub fn assemble(
    request: &AnalysisRequest,
    transactions: &[RawTransaction],
    stamp: RateStamp,
) -> Result<Summary, EngineError> {
    let facts = &request.facts;
    let discount_rate = facts.entity_type.discount_rate(stamp.rate);
    let ctx = ClassifyContext {
        entity_type: facts.entity_type,
        discount_rate,
        as_at: request.as_at,
    };

    let (events, warnings) = classify_all(transactions, &ctx);
    let prior = PriorLosses {
        general: round_money(facts.prior_year_losses),
        collectable: round_money(facts.prior_collectable_losses),
    };
    let position = aggregate(&events, facts.entity_type, discount_rate, prior);

    let last_disposal = events.iter().map(|e| e.disposal_date).max();
    let concession = concession::evaluate(position.net_gain, facts, last_disposal);
    let concession_total = concession
        .as_ref()
        .map_or(Decimal::ZERO, |c| c.total_concession);
    let taxable_gain = round_money((position.net_gain - concession_total).max(Decimal::ZERO));

    let recommendations = recommendations(&position, concession.as_ref(), &events, taxable_gain);
    let requires_professional_review = taxable_gain > MATERIALITY_THRESHOLD
        || concession.is_some()
        || events
            .iter()
            .any(|e| e.cost_base_warning.is_some() || e.is_low_confidence());

    let input_digest = input_digest(&request.entity_id, request.period, transactions, facts)?;

    log::info!(
        "{} event(s), net gain {}, taxable gain {}",
        events.len(),
        position.net_gain,
        taxable_gain
    );

    Ok(Summary {
        entity_id: request.entity_id.clone(),
        entity_type: facts.entity_type,
        period: request.period,
        as_at: request.as_at,
        input_digest,
        discount_rate: stamp,
        events,
        warnings,
        position,
        concession,
        taxable_gain,
        recommendations,
        requires_professional_review,
    })
}

#[derive(Serialize)]
struct DigestInput<'a> {
    entity_id: &'a str,
    period: FinancialYear,
    transactions: &'a [RawTransaction],
    facts: &'a EntityFacts,
}

fn input_digest(
    entity_id: &str,
    period: FinancialYear,
    transactions: &[RawTransaction],
    facts: &EntityFacts,
) -> Result<String, serde_json::Error> {
    let bytes = serde_json::to_vec(&DigestInput {
        entity_id,
        period,
        transactions,
        facts,
    })?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::concession::ConcessionSelection;
    use crate::core::events::EventKind;
    use crate::core::rates::{RateError, RateQuote, StaticRateProvider, FALLBACK_SOURCE};
    use rust_decimal_macros::dec;

    struct VecSource(Vec<RawTransaction>);

    impl TransactionSource for VecSource {
        fn transactions(&self, _: &str, period: FinancialYear) -> Result<Vec<RawTransaction>, SourceError> {
            Ok(self.0.iter().filter(|t| period.contains(t.date)).cloned().collect())
        }
    }

    struct BrokenSource;

    impl TransactionSource for BrokenSource {
        fn transactions(&self, _: &str, _: FinancialYear) -> Result<Vec<RawTransaction>, SourceError> {
            Err(SourceError::DuplicateTransactionId("t1".to_string()))
        }
    }

    struct Offline;

    impl RateProvider for Offline {
        fn discount_rate(&self) -> Result<RateQuote, RateError> {
            Err(RateError::OutOfRange(dec!(0)))
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn tx(id: &str, amount: Decimal, description: &str, category: &str, on: &str, acquired: Option<&str>) -> RawTransaction {
        RawTransaction {
            id: id.to_string(),
            amount: Some(amount),
            description: description.to_string(),
            category: category.to_string(),
            date: date(on),
            acquisition_date: acquired.map(date),
        }
    }

    fn request(facts: EntityFacts) -> AnalysisRequest {
        AnalysisRequest {
            entity_id: "acme".to_string(),
            period: FinancialYear(2025),
            facts,
            as_at: date("2025-08-01"),
        }
    }

    fn run(facts: EntityFacts, transactions: Vec<RawTransaction>) -> Summary {
        analyse(&request(facts), &VecSource(transactions), &StaticRateProvider::statutory()).unwrap()
    }

    #[test]
    fn single_long_held_gain_for_individual() {
        let summary = run(
            EntityFacts::new(EntityType::Individual),
            vec![tx(
                "t1",
                dec!(120000),
                "Disposal of investment property",
                "Capital gain",
                "2024-08-15",
                Some("2023-07-01"),
            )],
        );
        assert_eq!(summary.events.len(), 1);
        let event = &summary.events[0];
        assert_eq!(event.kind, EventKind::Disposal);
        assert!(event.holding_months >= 13);
        assert!(event.discount_eligible);
        assert_eq!(event.discounted_gain, dec!(60000));
        assert_eq!(summary.position.pre_discount_net_gain, dec!(120000));
        assert_eq!(summary.position.discount_amount, dec!(60000));
        assert_eq!(summary.position.net_gain, dec!(60000));
        assert!(summary.concession.is_none());
        assert_eq!(summary.taxable_gain, dec!(60000));
        assert!(summary.requires_professional_review);
        assert!(summary.warnings.is_empty());
        assert_eq!(summary.recommendations[0].chars().next(), Some('1'));
    }

    #[test]
    fn money_serializes_with_two_decimal_places() {
        let summary = run(
            EntityFacts::new(EntityType::Individual),
            vec![tx("t1", dec!(120000), "Disposal of land", "Capital gain", "2024-08-15", Some("2020-01-01"))],
        );
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["events"][0]["gain"], "120000.00");
        assert_eq!(json["events"][0]["loss"], "0.00");
        assert_eq!(json["position"]["discount_amount"], "60000.00");
        assert_eq!(json["position"]["carry_forward_losses"], "0.00");
        assert_eq!(json["taxable_gain"], "60000.00");
    }

    #[test]
    fn earlier_cancellation_flags_later_disposal() {
        let summary = run(
            EntityFacts::new(EntityType::Company),
            vec![
                tx("t1", dec!(10000), "Warehouse lease", "Capital: lease surrender", "2024-09-01", Some("2020-01-01")),
                tx("t2", dec!(5000), "Warehouse lease", "Capital disposal", "2024-12-01", Some("2020-01-01")),
            ],
        );
        assert_eq!(summary.events[0].kind, EventKind::Cancellation);
        assert!(summary.events[0].cost_base_warning.is_none());
        let warning = summary.events[1].cost_base_warning.as_ref().unwrap();
        assert!(warning.contains("cancellation on 2024-09-01"));
        // companies get no discount
        assert_eq!(summary.position.net_gain, dec!(15000));
        assert!(summary.requires_professional_review);
        assert!(summary.recommendations.iter().any(|r| r.contains("cost bases")));
    }

    #[test]
    fn concession_reduces_taxable_gain() {
        let facts = EntityFacts {
            aggregated_turnover: Some(dec!(900000)),
            active_asset_percentage: Some(dec!(100)),
            years_held: Some(16),
            ..EntityFacts::new(EntityType::Individual)
        };
        let summary = run(
            facts,
            vec![tx("t1", dec!(400000), "Sale of business premises", "Capital disposal", "2025-03-01", Some("2009-01-01"))],
        );
        let concession = summary.concession.as_ref().unwrap();
        assert_eq!(concession.total_concession, summary.position.net_gain);
        assert!(matches!(concession.selection, ConcessionSelection::LongHoldingExemption { .. }));
        assert_eq!(summary.taxable_gain, dec!(0));
        assert!(summary.requires_professional_review);
    }

    #[test]
    fn excluded_and_out_of_scope_transactions() {
        let mut malformed = tx("t3", dec!(0), "Asset disposal", "", "2024-10-01", None);
        malformed.amount = None;
        let summary = run(
            EntityFacts::new(EntityType::Individual),
            vec![
                tx("t1", dec!(250), "Office supplies", "Expenses", "2024-10-01", None),
                tx("t2", dec!(0), "Asset disposal", "", "2024-10-01", None),
                malformed,
                tx("t4", dec!(99), "Asset disposal", "", "2023-10-01", None),
            ],
        );
        assert!(summary.events.is_empty());
        assert_eq!(summary.warnings.len(), 2);
        assert_eq!(summary.position.net_gain, dec!(0));
        assert!(!summary.requires_professional_review);
    }

    #[test]
    fn rate_provider_outage_is_not_fatal() {
        let summary = analyse(
            &request(EntityFacts::new(EntityType::Individual)),
            &VecSource(vec![tx("t1", dec!(1000), "Asset disposal", "", "2024-10-01", Some("2020-01-01"))]),
            &Offline,
        )
        .unwrap();
        assert!(summary.discount_rate.fallback);
        assert_eq!(summary.discount_rate.source_id, FALLBACK_SOURCE);
        assert!(matches!(summary.warnings[0], Warning::RateFallback { .. }));
        assert_eq!(summary.position.net_gain, dec!(500));
    }

    #[test]
    fn source_failure_is_fatal() {
        let err = analyse(
            &request(EntityFacts::new(EntityType::Individual)),
            &BrokenSource,
            &StaticRateProvider::statutory(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Source(_)));
    }

    #[test]
    fn repeated_runs_are_identical() {
        let transactions = vec![
            tx("t1", dec!(33333.33), "Antique clock", "Capital gain", "2024-11-11", Some("2010-05-05")),
            tx("t2", dec!(-1234.56), "Shares in X", "Capital loss", "2025-01-20", None),
        ];
        let facts = EntityFacts {
            net_assets: Some(dec!(5500000)),
            ..EntityFacts::new(EntityType::SuperannuationFund)
        };
        let a = run(facts.clone(), transactions.clone());
        let b = run(facts, transactions);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
        assert_eq!(a.input_digest.len(), 64);
    }

    #[test]
    fn digest_changes_with_facts() {
        let transactions = vec![tx("t1", dec!(100), "Asset disposal", "", "2024-10-01", None)];
        let a = run(EntityFacts::new(EntityType::Individual), transactions.clone());
        let b = run(EntityFacts::new(EntityType::Trust), transactions);
        assert_ne!(a.input_digest, b.input_digest);
    }
}
