pub mod analyse;
pub mod events;
pub mod schema;
pub mod validate;

use crate::config::Config;
use crate::core::{
    analyse, read_transactions_json, AnalysisRequest, EntityFacts, EntityType, FinancialYear,
    JsonFileSource, Summary, TransactionInput,
};
use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, ValueEnum};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

/// Transaction feed selection shared by every command that reads one
#[derive(Args, Debug)]
pub struct InputArgs {
    /// JSON file containing the transaction feed ("-" reads stdin)
    #[arg(short, long)]
    pub transactions: PathBuf,

    /// Financial year (e.g., FY2024-25, 2024-25 or 2025)
    #[arg(short = 'y', long)]
    pub year: FinancialYear,

    /// Reporting entity id (defaults to the feed's entity_id)
    #[arg(long)]
    pub entity: Option<String>,
}

/// Entity facts and run settings
#[derive(Args, Debug)]
pub struct EntityArgs {
    /// JSON file containing entity facts
    #[arg(short, long)]
    pub facts: Option<PathBuf>,

    /// Entity type (overrides the facts file)
    #[arg(long, value_enum)]
    pub entity_type: Option<EntityTypeArg>,

    /// Date the analysis is performed on (defaults to today)
    #[arg(long)]
    pub as_at: Option<NaiveDate>,

    /// Discount rate endpoint (overrides CGTC_RATE_URL)
    #[arg(long)]
    pub rate_url: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum EntityTypeArg {
    Individual,
    Trust,
    Partnership,
    Company,
    SuperFund,
}

impl From<EntityTypeArg> for EntityType {
    fn from(arg: EntityTypeArg) -> Self {
        match arg {
            EntityTypeArg::Individual => EntityType::Individual,
            EntityTypeArg::Trust => EntityType::Trust,
            EntityTypeArg::Partnership => EntityType::Partnership,
            EntityTypeArg::Company => EntityType::Company,
            EntityTypeArg::SuperFund => EntityType::SuperannuationFund,
        }
    }
}

impl EntityArgs {
    /// Facts from the file, or bare facts for `--entity-type`. One of the two is required.
    pub fn facts(&self) -> anyhow::Result<EntityFacts> {
        let mut facts = match (&self.facts, self.entity_type) {
            (Some(path), _) => read_facts(path)?,
            (None, Some(entity_type)) => EntityFacts::new(entity_type.into()),
            (None, None) => anyhow::bail!("entity type required: pass --facts or --entity-type"),
        };
        if let Some(entity_type) = self.entity_type {
            facts.entity_type = entity_type.into();
        }
        Ok(facts)
    }

    pub fn as_at(&self) -> NaiveDate {
        self.as_at
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}

/// Read the feed and facts, then run the engine
pub fn run_analysis(input: &InputArgs, entity: &EntityArgs) -> anyhow::Result<Summary> {
    let feed = read_input(&input.transactions)?;
    let entity_id = input
        .entity
        .clone()
        .unwrap_or_else(|| feed.entity_id.clone());
    let config = Config::from_env()?.with_rate_url(entity.rate_url.clone());
    let rates = config.rate_provider();

    let request = AnalysisRequest {
        entity_id,
        period: input.year,
        facts: entity.facts()?,
        as_at: entity.as_at(),
    };
    Ok(analyse(&request, &feed, rates.as_ref())?)
}

/// Read a transaction feed (JSON) from a file or stdin with "-"
pub fn read_input(path: &Path) -> anyhow::Result<TransactionInput> {
    if path.as_os_str() == "-" {
        read_from_stdin()
    } else {
        Ok(JsonFileSource::new(path).read_input()?)
    }
}

fn read_from_stdin() -> anyhow::Result<TransactionInput> {
    let stdin = io::stdin();
    let mut reader = BufReader::new(stdin.lock());

    let mut buffer = Vec::new();
    reader.read_to_end(&mut buffer)?;

    if buffer.is_empty() {
        anyhow::bail!("No input received. Provide a file or pipe data to stdin.");
    }

    Ok(read_transactions_json(io::Cursor::new(buffer))?)
}

fn read_facts(path: &Path) -> anyhow::Result<EntityFacts> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let facts = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("invalid entity facts in {}", path.display()))?;
    Ok(facts)
}
