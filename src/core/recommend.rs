use super::aggregate::GainLossPosition;
use super::concession::{ConcessionAnalysis, Pathway};
use super::events::CgtEvent;
use super::money::{format_aud, format_percent};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Taxable gains above this warrant professional review
pub const MATERIALITY_THRESHOLD: Decimal = dec!(50000);

/// Advisory notes for the summary, in a fixed order
pub fn recommendations(
    position: &GainLossPosition,
    concession: Option<&ConcessionAnalysis>,
    events: &[CgtEvent],
    taxable_gain: Decimal,
) -> Vec<String> {
    let mut notes = Vec::new();

    notes.push(format!(
        "{} CGT event(s): gains {}, losses {}, net capital gain after discount {}",
        events.len(),
        format_aud(position.total_gains),
        format_aud(position.total_losses),
        format_aud(position.net_gain)
    ));

    if position.personal_use_losses_disregarded > Decimal::ZERO {
        notes.push(format!(
            "Personal-use asset losses of {} are disregarded and cannot offset gains",
            format_aud(position.personal_use_losses_disregarded)
        ));
    }
    if position.pre_regime_gains_disregarded > Decimal::ZERO
        || position.pre_regime_losses_disregarded > Decimal::ZERO
    {
        notes.push(format!(
            "Pre-CGT assets disregarded: gains {}, losses {}",
            format_aud(position.pre_regime_gains_disregarded),
            format_aud(position.pre_regime_losses_disregarded)
        ));
    }
    if position.collectable_carry_forward > Decimal::ZERO {
        notes.push(format!(
            "Collectable losses of {} carry forward and may only offset future collectable gains",
            format_aud(position.collectable_carry_forward)
        ));
    }
    if position.carry_forward_losses > Decimal::ZERO {
        notes.push(format!(
            "Net capital losses of {} carry forward to future income years",
            format_aud(position.carry_forward_losses)
        ));
    }
    if let Some(rate) = position.discount_rate.filter(|_| position.discount_amount > Decimal::ZERO) {
        notes.push(format!(
            "CGT discount of {} applied to {} of gains held at least 12 months, reducing the gain by {}",
            format_percent(rate),
            format_aud(position.discountable_gain),
            format_aud(position.discount_amount)
        ));
    }

    let interactions = events.iter().filter(|e| e.cost_base_warning.is_some()).count();
    if interactions > 0 {
        notes.push(format!(
            "{interactions} event(s) may have cost bases affected by earlier events on the same asset; confirm cost base calculations"
        ));
    }
    let low_confidence = events.iter().filter(|e| e.is_low_confidence()).count();
    if low_confidence > 0 {
        notes.push(format!(
            "{low_confidence} event(s) were classified with low confidence; review their classification"
        ));
    }
    let statute = events.iter().filter(|e| e.statute_warning.is_some()).count();
    if statute > 0 {
        notes.push(format!(
            "{statute} event(s) fall outside the amendment period; prior assessments may not be amendable"
        ));
    }

    if let Some(analysis) = concession {
        if let Some(warning) = &analysis.net_asset_test.cliff_edge_warning {
            notes.push(warning.clone());
        }
        if analysis.retirement_cap_ambiguous {
            notes.push(
                "Prior retirement exemption usage unknown; the full lifetime cap was assumed".to_string(),
            );
        }
        if let Some(rollover) = analysis.pathway(Pathway::Rollover).filter(|p| p.available) {
            let deadline = analysis
                .rollover_deadline
                .map(|d| format!(" (replacement asset by {d})"))
                .unwrap_or_default();
            notes.push(format!(
                "Replacement asset rollover could defer {} instead of the retirement exemption{deadline}",
                format_aud(rollover.amount)
            ));
        }
    }

    if taxable_gain > MATERIALITY_THRESHOLD || concession.is_some() {
        notes.push(
            "Seek professional review before lodging: the position is material or relies on small business concessions"
                .to_string(),
        );
    }

    notes
}
