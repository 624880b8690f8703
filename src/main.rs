mod cmd;
mod config;
mod core;

use clap::{Parser, Subcommand};

/// Australian capital gains tax event engine
#[derive(Parser, Debug)]
#[command(name = "cgtc", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Full capital gains position, including small business concessions
    Analyse(cmd::analyse::AnalyseCommand),
    /// List classified CGT events
    Events(cmd::events::EventsCommand),
    /// Report excluded transactions and event warnings
    Validate(cmd::validate::ValidateCommand),
    /// Print the JSON Schema of an input file
    Schema(cmd::schema::SchemaCommand),
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Analyse(analyse) => analyse.exec(),
        Command::Events(events) => events.exec(),
        Command::Validate(validate) => validate.exec(),
        Command::Schema(schema) => schema.exec(),
    }
}
