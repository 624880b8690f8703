//! Schema command - print expected input formats

use crate::core::{EntityFacts, TransactionInput};
use clap::Args;
use schemars::schema_for;

#[derive(Args, Debug)]
pub struct SchemaCommand {
    /// Which input to describe
    #[arg(value_enum, default_value = "transactions")]
    input: SchemaInput,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum SchemaInput {
    /// Transaction feed passed with --transactions
    Transactions,
    /// Entity facts passed with --facts
    Facts,
}

impl SchemaCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let schema = match self.input {
            SchemaInput::Transactions => schema_for!(TransactionInput),
            SchemaInput::Facts => schema_for!(EntityFacts),
        };
        println!("{}", serde_json::to_string_pretty(&schema)?);
        Ok(())
    }
}
