use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Legal form of the reporting entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Individual,
    Trust,
    Partnership,
    Company,
    SuperannuationFund,
}

impl EntityType {
    /// Companies never receive the CGT discount
    pub fn is_discount_eligible(self) -> bool {
        !matches!(self, EntityType::Company)
    }

    /// Discount rate for this entity type given the general rate.
    ///
    /// Superannuation funds get exactly one third regardless of the general rate.
    pub fn discount_rate(self, general_rate: Decimal) -> Option<Decimal> {
        match self {
            EntityType::Company => None,
            EntityType::SuperannuationFund => Some(Decimal::ONE / dec!(3)),
            _ => Some(general_rate),
        }
    }

    /// Years after the end of the income year in which an assessment can be amended
    pub fn amendment_period_years(self) -> i32 {
        match self {
            EntityType::Individual => 2,
            _ => 4,
        }
    }

    pub fn display(self) -> &'static str {
        match self {
            EntityType::Individual => "individual",
            EntityType::Trust => "trust",
            EntityType::Partnership => "partnership",
            EntityType::Company => "company",
            EntityType::SuperannuationFund => "superannuation fund",
        }
    }
}

/// How a related party is connected to the reporting entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Relationship {
    ConnectedEntity,
    Affiliate,
}

/// Related party whose net assets count towards the maximum net asset value test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ConnectedEntity {
    pub name: String,
    #[schemars(with = "f64")]
    pub net_assets: Decimal,
    pub relationship: Relationship,
}

/// Caller-supplied facts about the reporting entity. Only `entity_type` is required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EntityFacts {
    pub entity_type: EntityType,
    /// Aggregated turnover for the income year
    #[serde(default)]
    #[schemars(with = "Option<f64>")]
    pub aggregated_turnover: Option<Decimal>,
    /// Net value of the entity's own CGT assets
    #[serde(default)]
    #[schemars(with = "Option<f64>")]
    pub net_assets: Option<Decimal>,
    #[serde(default)]
    pub connected_entities: Vec<ConnectedEntity>,
    /// Percentage of ownership period the asset was active (0-100)
    #[serde(default)]
    #[schemars(with = "Option<f64>")]
    pub active_asset_percentage: Option<Decimal>,
    /// Whole years the asset has been continuously owned
    #[serde(default)]
    pub years_held: Option<u32>,
    /// Retirement exemption already used over the entity's lifetime
    #[serde(default)]
    #[schemars(with = "Option<f64>")]
    pub prior_retirement_exemption_used: Option<Decimal>,
    /// Net capital losses carried forward from earlier years
    #[serde(default)]
    #[schemars(with = "f64")]
    pub prior_year_losses: Decimal,
    /// Collectable losses carried forward from earlier years
    #[serde(default)]
    #[schemars(with = "f64")]
    pub prior_collectable_losses: Decimal,
    /// Whether a replacement asset will be acquired within the rollover window
    #[serde(default)]
    pub replacement_asset_planned: Option<bool>,
}

impl EntityFacts {
    /// Facts carrying only the entity type
    pub fn new(entity_type: EntityType) -> Self {
        EntityFacts {
            entity_type,
            aggregated_turnover: None,
            net_assets: None,
            connected_entities: Vec::new(),
            active_asset_percentage: None,
            years_held: None,
            prior_retirement_exemption_used: None,
            prior_year_losses: Decimal::ZERO,
            prior_collectable_losses: Decimal::ZERO,
            replacement_asset_planned: None,
        }
    }

    /// Whether any fact relevant to the small business concessions was supplied
    pub fn has_concession_facts(&self) -> bool {
        self.aggregated_turnover.is_some()
            || self.net_assets.is_some()
            || !self.connected_entities.is_empty()
            || self.active_asset_percentage.is_some()
            || self.years_held.is_some()
    }
}
