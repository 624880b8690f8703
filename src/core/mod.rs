pub mod aggregate;
pub mod categorise;
pub mod concession;
pub mod entity;
pub mod events;
pub mod fy;
pub mod interactions;
pub mod money;
pub mod rates;
pub mod recommend;
pub mod summary;
pub mod transaction;
pub mod warnings;

// Flat public surface used by the commands and config.
pub use aggregate::GainLossPosition;
pub use concession::{ConcessionAnalysis, ConcessionSelection};
pub use entity::{EntityFacts, EntityType};
pub use events::CgtEvent;
pub use fy::FinancialYear;
pub use money::{format_aud, format_percent};
pub use rates::{CachedRateProvider, HttpRateProvider, RateProvider, StaticRateProvider};
pub use summary::{analyse, AnalysisRequest, Summary};
pub use transaction::{read_transactions_json, JsonFileSource, TransactionInput};
pub use warnings::Warning;
