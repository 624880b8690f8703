//! CGT discount rate providers.
//!
//! The engine asks for the rate once per run through [`resolve_rate`], which never
//! fails: any provider error or out-of-range rate falls back to the statutory
//! default and the fallback is recorded in the provenance stamp.

use super::warnings::Warning;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

/// General CGT discount for individuals and trusts
pub const DEFAULT_DISCOUNT_RATE: Decimal = dec!(0.5);
pub const STATIC_SOURCE: &str = "static:statutory-default";
pub const FALLBACK_SOURCE: &str = "fallback:statutory-default";

#[derive(Debug, thiserror::Error)]
pub enum RateError {
    #[error("rate request failed: {0}")]
    Request(#[from] Box<ureq::Error>),
    #[error("invalid rate response: {0}")]
    Response(#[from] std::io::Error),
    #[error("rate {0} is outside (0, 1]")]
    OutOfRange(Decimal),
}

/// A discount rate and where it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateQuote {
    pub rate: Decimal,
    pub source_id: String,
}

/// Supplies the general discount percentage
pub trait RateProvider: Send + Sync {
    fn discount_rate(&self) -> Result<RateQuote, RateError>;
}

/// Fixed rate, no I/O
#[derive(Debug, Clone)]
pub struct StaticRateProvider {
    quote: RateQuote,
}

impl StaticRateProvider {
    pub fn new(rate: Decimal, source_id: impl Into<String>) -> Self {
        StaticRateProvider {
            quote: RateQuote {
                rate,
                source_id: source_id.into(),
            },
        }
    }

    pub fn statutory() -> Self {
        Self::new(DEFAULT_DISCOUNT_RATE, STATIC_SOURCE)
    }
}

impl RateProvider for StaticRateProvider {
    fn discount_rate(&self) -> Result<RateQuote, RateError> {
        Ok(self.quote.clone())
    }
}

/// Fetches `{ "rate": "0.5", "source_id": "..." }` from a URL
pub struct HttpRateProvider {
    agent: ureq::Agent,
    url: String,
}

impl HttpRateProvider {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        HttpRateProvider {
            agent,
            url: url.into(),
        }
    }
}

impl RateProvider for HttpRateProvider {
    fn discount_rate(&self) -> Result<RateQuote, RateError> {
        let response = self.agent.get(&self.url).call().map_err(Box::new)?;
        let quote: RateQuote = response.into_json()?;
        log::info!("discount rate {} fetched from {}", quote.rate, quote.source_id);
        Ok(quote)
    }
}

/// Caches a successful quote for `ttl`. Errors are not cached.
pub struct CachedRateProvider<P> {
    inner: P,
    ttl: Duration,
    cache: RwLock<Option<(Instant, RateQuote)>>,
}

impl<P: RateProvider> CachedRateProvider<P> {
    pub fn new(inner: P, ttl: Duration) -> Self {
        CachedRateProvider {
            inner,
            ttl,
            cache: RwLock::new(None),
        }
    }

    fn cached(&self) -> Option<RateQuote> {
        let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
        cache
            .as_ref()
            .filter(|(fetched, _)| fetched.elapsed() < self.ttl)
            .map(|(_, quote)| quote.clone())
    }
}

impl<P: RateProvider> RateProvider for CachedRateProvider<P> {
    fn discount_rate(&self) -> Result<RateQuote, RateError> {
        if let Some(quote) = self.cached() {
            log::debug!("discount rate served from cache");
            return Ok(quote);
        }
        let quote = self.inner.discount_rate()?;
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        *cache = Some((Instant::now(), quote.clone()));
        Ok(quote)
    }
}

/// Rate used for a run, with provenance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateStamp {
    pub rate: Decimal,
    pub source_id: String,
    /// The statutory default was substituted for an unavailable provider
    pub fallback: bool,
    pub as_at: NaiveDate,
}

impl RateStamp {
    pub fn fallback(as_at: NaiveDate) -> Self {
        RateStamp {
            rate: DEFAULT_DISCOUNT_RATE,
            source_id: FALLBACK_SOURCE.to_string(),
            fallback: true,
            as_at,
        }
    }
}

fn validate(quote: RateQuote) -> Result<RateQuote, RateError> {
    if quote.rate > Decimal::ZERO && quote.rate <= Decimal::ONE {
        Ok(quote)
    } else {
        Err(RateError::OutOfRange(quote.rate))
    }
}

/// Ask the provider once; fall back to the default on any failure
pub fn resolve_rate(provider: &dyn RateProvider, as_at: NaiveDate) -> (RateStamp, Option<Warning>) {
    match provider.discount_rate().and_then(validate) {
        Ok(quote) => (
            RateStamp {
                rate: quote.rate,
                source_id: quote.source_id,
                fallback: false,
                as_at,
            },
            None,
        ),
        Err(err) => {
            log::warn!("discount rate unavailable, using {}: {}", DEFAULT_DISCOUNT_RATE, err);
            (
                RateStamp::fallback(as_at),
                Some(Warning::RateFallback {
                    error: err.to_string(),
                }),
            )
        }
    }
}
