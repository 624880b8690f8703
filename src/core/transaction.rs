use super::fy::FinancialYear;
use chrono::{DateTime, NaiveDate};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read transactions from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse transactions: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("transaction feed belongs to entity '{found}', expected '{expected}'")]
    EntityMismatch { expected: String, found: String },
    #[error("duplicate transaction id: {0}")]
    DuplicateTransactionId(String),
}

/// Input root for the transaction feed JSON
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TransactionInput {
    /// Reporting entity the feed belongs to
    pub entity_id: String,
    pub transactions: Vec<RawTransaction>,
}

/// Normalized accounting entry supplied by the ingestion layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RawTransaction {
    /// Identifier of the source accounting entry
    pub id: String,
    /// Signed amount (positive = gain, negative = loss). Null when the source value was malformed.
    #[serde(default, deserialize_with = "deserialize_amount")]
    #[schemars(with = "Option<f64>")]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub description: String,
    /// Account or category label from the ledger
    #[serde(default)]
    pub category: String,
    /// Transaction (disposal) date; YYYY-MM-DD or RFC3339
    #[serde(deserialize_with = "deserialize_date")]
    #[schemars(with = "String")]
    pub date: NaiveDate,
    /// Date the underlying asset was acquired, when known
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    #[schemars(with = "Option<String>")]
    pub acquisition_date: Option<NaiveDate>,
}

impl RawTransaction {
    /// Lowercased description and category, used for keyword matching
    pub fn search_text(&self) -> String {
        format!("{} {}", self.description, self.category).to_lowercase()
    }
}

/// Supplier of the transaction set for an entity and income year
pub trait TransactionSource: Send + Sync {
    fn transactions(
        &self,
        entity_id: &str,
        period: FinancialYear,
    ) -> Result<Vec<RawTransaction>, SourceError>;
}

/// Transaction feed read from a JSON file ("-" reads stdin)
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileSource { path: path.into() }
    }

    pub fn read_input(&self) -> Result<TransactionInput, SourceError> {
        if self.path.as_os_str() == "-" {
            let stdin = std::io::stdin();
            return read_transactions_json(stdin.lock());
        }
        let file = File::open(&self.path).map_err(|source| SourceError::Io {
            path: self.path.clone(),
            source,
        })?;
        read_transactions_json(BufReader::new(file))
    }
}

/// An already loaded feed, e.g. one read from stdin
impl TransactionSource for TransactionInput {
    fn transactions(
        &self,
        entity_id: &str,
        period: FinancialYear,
    ) -> Result<Vec<RawTransaction>, SourceError> {
        if self.entity_id != entity_id {
            return Err(SourceError::EntityMismatch {
                expected: entity_id.to_string(),
                found: self.entity_id.clone(),
            });
        }
        let transactions: Vec<_> = self
            .transactions
            .iter()
            .filter(|t| period.contains(t.date))
            .cloned()
            .collect();
        log::info!(
            "{} of {} transactions fall within {}",
            transactions.len(),
            self.transactions.len(),
            period
        );
        Ok(transactions)
    }
}

impl TransactionSource for JsonFileSource {
    fn transactions(
        &self,
        entity_id: &str,
        period: FinancialYear,
    ) -> Result<Vec<RawTransaction>, SourceError> {
        self.read_input()?.transactions(entity_id, period)
    }
}

/// Read a transaction feed, rejecting duplicate ids and ordering by date
pub fn read_transactions_json<R: Read>(reader: R) -> Result<TransactionInput, SourceError> {
    let mut input: TransactionInput = serde_json::from_reader(reader)?;
    let mut seen = std::collections::HashSet::new();
    for tx in &input.transactions {
        if !seen.insert(tx.id.as_str()) {
            return Err(SourceError::DuplicateTransactionId(tx.id.clone()));
        }
    }
    // stable: same-day entries keep feed order
    input.transactions.sort_by_key(|t| t.date);
    Ok(input)
}

/// Accept a JSON number or a string such as "-1,250.00" or "$300"; anything else is malformed
fn deserialize_amount<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let parsed = match value {
        serde_json::Value::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok(),
        serde_json::Value::String(s) => {
            let cleaned: String = s
                .trim()
                .chars()
                .filter(|c| *c != ',' && *c != '$')
                .collect();
            Decimal::from_str(&cleaned).ok()
        }
        _ => None,
    };
    Ok(parsed)
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.date_naive())
        .map_err(|_| format!("invalid date: {s}"))
}

fn deserialize_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_date(s.trim()).map_err(serde::de::Error::custom)
}

fn deserialize_optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => parse_date(s).map(Some).map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn parse(json: &str) -> Result<TransactionInput, SourceError> {
        read_transactions_json(json.as_bytes())
    }

    #[test]
    fn amounts_accept_numbers_and_strings() {
        let input = parse(
            r#"{"entity_id": "e1", "transactions": [
                {"id": "a", "amount": 1500.25, "description": "Sale of asset", "date": "2024-08-01"},
                {"id": "b", "amount": "-$1,250.00", "description": "Capital loss", "date": "2024-08-02"},
                {"id": "c", "amount": "n/a", "description": "Asset sale", "date": "2024-08-03"},
                {"id": "d", "description": "Asset sale", "date": "2024-08-04"}
            ]}"#,
        )
        .unwrap();
        let amounts: Vec<_> = input.transactions.iter().map(|t| t.amount).collect();
        assert_eq!(amounts, vec![Some(dec!(1500.25)), Some(dec!(-1250)), None, None]);
    }

    #[test]
    fn dates_accept_rfc3339_and_blank_acquisition() {
        let input = parse(
            r#"{"entity_id": "e1", "transactions": [
                {"id": "a", "amount": 1, "description": "x", "date": "2024-08-01T10:00:00+10:00", "acquisition_date": ""},
                {"id": "b", "amount": 1, "description": "x", "date": "2024-08-02", "acquisition_date": "2020-01-31"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(input.transactions[0].date, NaiveDate::from_ymd_opt(2024, 8, 1).unwrap());
        assert_eq!(input.transactions[0].acquisition_date, None);
        assert_eq!(
            input.transactions[1].acquisition_date,
            NaiveDate::from_ymd_opt(2020, 1, 31)
        );
    }

    #[test]
    fn invalid_date_is_a_parse_error() {
        let result = parse(
            r#"{"entity_id": "e1", "transactions": [
                {"id": "a", "amount": 1, "description": "x", "date": "31/01/2024"}
            ]}"#,
        );
        assert!(matches!(result, Err(SourceError::Parse(_))));
    }

    #[test]
    fn duplicate_ids_rejected() {
        let result = parse(
            r#"{"entity_id": "e1", "transactions": [
                {"id": "a", "amount": 1, "description": "x", "date": "2024-08-01"},
                {"id": "a", "amount": 2, "description": "y", "date": "2024-08-02"}
            ]}"#,
        );
        assert!(matches!(result, Err(SourceError::DuplicateTransactionId(id)) if id == "a"));
    }

    #[test]
    fn transactions_sorted_by_date() {
        let input = parse(
            r#"{"entity_id": "e1", "transactions": [
                {"id": "late", "amount": 1, "description": "x", "date": "2024-09-01"},
                {"id": "early", "amount": 1, "description": "x", "date": "2024-08-01"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(input.transactions[0].id, "early");
    }

    #[test]
    fn source_filters_by_period_and_entity() {
        let input = parse(
            r#"{"entity_id": "e1", "transactions": [
                {"id": "before", "amount": 1, "description": "x", "date": "2024-06-30"},
                {"id": "first", "amount": 1, "description": "x", "date": "2024-07-01"},
                {"id": "last", "amount": 1, "description": "x", "date": "2025-06-30"},
                {"id": "after", "amount": 1, "description": "x", "date": "2025-07-01"}
            ]}"#,
        )
        .unwrap();
        let ids: Vec<_> = input
            .transactions("e1", FinancialYear(2025))
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec!["first", "last"]);
        assert!(matches!(
            input.transactions("e2", FinancialYear(2025)),
            Err(SourceError::EntityMismatch { .. })
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let source = JsonFileSource::new("does/not/exist.json");
        let err = source.transactions("e1", FinancialYear(2025)).unwrap_err();
        assert!(matches!(err, SourceError::Io { .. }));
        assert!(err.to_string().contains("does/not/exist.json"));
    }
}
