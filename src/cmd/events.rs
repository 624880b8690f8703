//! Events command - classified CGT events for a financial year

use super::{run_analysis, EntityArgs, InputArgs};
use crate::core::{format_aud, CgtEvent};
use clap::Args;
use std::io;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct EventsCommand {
    #[command(flatten)]
    input: InputArgs,

    #[command(flatten)]
    entity: EntityArgs,

    /// Output as CSV instead of formatted table
    #[arg(long)]
    csv: bool,
}

impl EventsCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let summary = run_analysis(&self.input, &self.entity)?;
        let rows = event_rows(&summary.events);
        if self.csv {
            write_csv(&rows)
        } else {
            print_table(&rows);
            Ok(())
        }
    }
}

/// Row for the events table output
#[derive(Debug, Clone, Tabled, serde::Serialize)]
pub struct EventRow {
    #[tabled(rename = "Id")]
    pub id: String,
    #[tabled(rename = "Date")]
    pub date: String,
    #[tabled(rename = "Type")]
    pub kind: String,
    #[tabled(rename = "Asset")]
    pub asset: String,
    #[tabled(rename = "Category")]
    pub category: String,
    #[tabled(rename = "Months")]
    pub holding_months: u32,
    #[tabled(rename = "Gain")]
    pub gain: String,
    #[tabled(rename = "Loss")]
    pub loss: String,
    #[tabled(rename = "Discounted")]
    pub discounted_gain: String,
    #[tabled(rename = "Conf.")]
    pub confidence: u8,
    #[tabled(rename = "Flags")]
    pub flags: String,
}

pub fn event_rows(events: &[CgtEvent]) -> Vec<EventRow> {
    events
        .iter()
        .map(|e| {
            let mut flags = Vec::new();
            if e.cost_base_warning.is_some() {
                flags.push("cost-base");
            }
            if e.statute_warning.is_some() {
                flags.push("amendment");
            }
            if e.is_low_confidence() {
                flags.push("low-confidence");
            }
            EventRow {
                id: e.source_transaction_id.clone(),
                date: e.disposal_date.format("%Y-%m-%d").to_string(),
                kind: e.kind.display().to_string(),
                asset: e.asset.clone(),
                category: e.category.display().to_string(),
                holding_months: e.holding_months,
                gain: format_amount(e.gain),
                loss: format_amount(e.loss),
                discounted_gain: if e.discount_eligible {
                    format_aud(e.discounted_gain)
                } else {
                    "-".to_string()
                },
                confidence: e.confidence,
                flags: flags.join(", "),
            }
        })
        .collect()
}

fn format_amount(amount: rust_decimal::Decimal) -> String {
    if amount.is_zero() {
        "-".to_string()
    } else {
        format_aud(amount)
    }
}

pub fn print_table(rows: &[EventRow]) {
    if rows.is_empty() {
        println!("No CGT events found");
        return;
    }
    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{}", table);
}

fn write_csv(rows: &[EventRow]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_writer(io::stdout());
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}
