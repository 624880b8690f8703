//! Analyse command - full capital gains position with concession analysis

use super::events::{event_rows, print_table};
use super::{run_analysis, EntityArgs, InputArgs};
use crate::core::{
    format_aud, format_percent, ConcessionAnalysis, ConcessionSelection, GainLossPosition, Summary,
};
use clap::Args;

#[derive(Args, Debug)]
pub struct AnalyseCommand {
    #[command(flatten)]
    input: InputArgs,

    #[command(flatten)]
    entity: EntityArgs,

    /// Output the summary as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

impl AnalyseCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let summary = run_analysis(&self.input, &self.entity)?;
        if self.json {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            print_summary(&summary);
        }
        Ok(())
    }
}

fn print_summary(summary: &Summary) {
    let rate = &summary.discount_rate;
    println!();
    println!("CGT SUMMARY ({}, {})", summary.entity_id, summary.period);
    println!(
        "  Entity type: {} | As at {} | Discount rate {} ({}{})",
        summary.entity_type.display(),
        summary.as_at,
        format_percent(rate.rate),
        rate.source_id,
        if rate.fallback { ", fallback" } else { "" }
    );
    println!();

    println!("EVENTS");
    print_table(&event_rows(&summary.events));
    println!();

    print_position(&summary.position);

    if let Some(concession) = &summary.concession {
        print_concession(concession);
    }

    println!("RESULT");
    println!("  Taxable capital gain: {}", format_aud(summary.taxable_gain));
    println!(
        "  Professional review: {}",
        if summary.requires_professional_review {
            "required"
        } else {
            "not required"
        }
    );
    println!();

    println!("RECOMMENDATIONS");
    for (i, note) in summary.recommendations.iter().enumerate() {
        println!("  {}. {}", i + 1, note);
    }

    if !summary.warnings.is_empty() {
        println!();
        println!("WARNINGS");
        for warning in &summary.warnings {
            println!("  - {}", warning);
        }
    }
    println!();
}

fn print_position(p: &GainLossPosition) {
    println!("POSITION");
    println!(
        "  Collectables: gains {} | losses {} | carried forward {}",
        format_aud(p.collectable.gains),
        format_aud(p.collectable.losses),
        format_aud(p.collectable_carry_forward)
    );
    println!(
        "  Personal use: gains {} | losses disregarded {}",
        format_aud(p.personal_use.gains),
        format_aud(p.personal_use_losses_disregarded)
    );
    println!(
        "  Other: gains {} | losses {}",
        format_aud(p.other.gains),
        format_aud(p.other.losses)
    );
    if !p.pre_regime_gains_disregarded.is_zero() || !p.pre_regime_losses_disregarded.is_zero() {
        println!(
            "  Pre-CGT (disregarded): gains {} | losses {}",
            format_aud(p.pre_regime_gains_disregarded),
            format_aud(p.pre_regime_losses_disregarded)
        );
    }
    println!(
        "  Prior-year losses {} | applied {} | carried forward {}",
        format_aud(p.prior_year_losses),
        format_aud(p.losses_applied),
        format_aud(p.carry_forward_losses)
    );
    println!(
        "  Net before discount {} | Discount {} | Net capital gain {}",
        format_aud(p.pre_discount_net_gain),
        format_aud(p.discount_amount),
        format_aud(p.net_gain)
    );
    println!();
}

fn print_concession(c: &ConcessionAnalysis) {
    let met = |m: bool| if m { "met" } else { "not met" };
    println!("SMALL BUSINESS CONCESSIONS");
    println!("  Turnover test: {} ({})", met(c.turnover_test.met), c.turnover_test.note);
    println!("  Net asset test: {} ({})", met(c.net_asset_test.met), c.net_asset_test.note);
    for connected in &c.net_asset_test.connected {
        println!("    + {} {}", connected.name, format_aud(connected.net_assets));
    }
    println!(
        "  Active asset test: {} ({})",
        met(c.active_asset_test.met),
        c.active_asset_test.note
    );
    println!("  Basic conditions: {}", met(c.basic_conditions_met));
    for pathway in &c.pathways {
        println!(
            "  - {}: {} {} ({})",
            pathway.pathway.display(),
            if pathway.available { "available" } else { "unavailable" },
            format_aud(pathway.amount),
            pathway.note
        );
    }
    let selected = match &c.selection {
        ConcessionSelection::None => "none".to_string(),
        ConcessionSelection::LongHoldingExemption { amount } => {
            format!("15-year exemption {}", format_aud(*amount))
        }
        ConcessionSelection::ReductionAndRetirement {
            reduction,
            retirement,
        } => format!(
            "50% reduction {} + retirement exemption {}",
            format_aud(*reduction),
            format_aud(*retirement)
        ),
    };
    println!("  Selected: {} | Total {}", selected, format_aud(c.total_concession));
    println!();
}
