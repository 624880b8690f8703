use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FinancialYearError {
    #[error("invalid financial year '{0}': expected FY2024-25, 2024-25 or 2025")]
    Invalid(String),
    #[error("financial year {0} is not consecutive")]
    NotConsecutive(String),
}

/// Australian income year (runs 1 July to 30 June)
/// The year value represents the end year (e.g., 2025 = FY2024-25)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FinancialYear(pub i32);

impl FinancialYear {
    /// Financial year containing a date
    pub fn from_date(date: NaiveDate) -> Self {
        if date.month() >= 7 {
            FinancialYear(date.year() + 1)
        } else {
            FinancialYear(date.year())
        }
    }

    /// 1 July of the previous calendar year
    pub fn start_date(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.0 - 1, 7, 1).expect("1 July is always a valid date")
    }

    /// 30 June of the end year
    pub fn end_date(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.0, 6, 30).expect("30 June is always a valid date")
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date() && date <= self.end_date()
    }

    /// Last day on which an assessment for this year can still be amended
    pub fn amendment_deadline(&self, period_years: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.0 + period_years, 6, 30).expect("30 June is always a valid date")
    }

    /// Display as "FY2024-25" format
    pub fn display(&self) -> String {
        format!("FY{}-{:02}", self.0 - 1, self.0 % 100)
    }
}

impl fmt::Display for FinancialYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

impl FromStr for FinancialYear {
    type Err = FinancialYearError;

    /// Accepts "FY2024-25", "FY24-25", "2024-25", "2024-2025" or a bare end year "2025"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let body = trimmed
            .strip_prefix("FY")
            .or_else(|| trimmed.strip_prefix("fy"))
            .unwrap_or(trimmed);

        let invalid = || FinancialYearError::Invalid(s.to_string());

        match body.split_once('-') {
            None => {
                let year: i32 = body.parse().map_err(|_| invalid())?;
                if body.len() != 4 {
                    return Err(invalid());
                }
                Ok(FinancialYear(year))
            }
            Some((start, end)) => {
                let start_year = expand_year(start).ok_or_else(invalid)?;
                let end_year = match end.len() {
                    2 => {
                        let suffix: i32 = end.parse().map_err(|_| invalid())?;
                        let candidate = (start_year / 100) * 100 + suffix;
                        if candidate <= start_year {
                            candidate + 100
                        } else {
                            candidate
                        }
                    }
                    4 => end.parse().map_err(|_| invalid())?,
                    _ => return Err(invalid()),
                };
                if end_year != start_year + 1 {
                    return Err(FinancialYearError::NotConsecutive(s.to_string()));
                }
                Ok(FinancialYear(end_year))
            }
        }
    }
}

fn expand_year(part: &str) -> Option<i32> {
    let value: i32 = part.parse().ok()?;
    match part.len() {
        2 => Some(2000 + value),
        4 => Some(value),
        _ => None,
    }
}

impl TryFrom<String> for FinancialYear {
    type Error = FinancialYearError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FinancialYear> for String {
    fn from(year: FinancialYear) -> Self {
        year.display()
    }
}
