//! Loss-quarantine categories.
//!
//! Collectable keywords are tested before personal-use keywords, so an item
//! matching both lists (an antique car, a wine fridge) is a collectable.
//! Keywords match whole words (a trailing plural "s" is allowed), so "carbon"
//! is not a car and "part of" is not art.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Asset category for loss quarantining
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AssetCategory {
    Collectable,
    PersonalUse,
    #[default]
    Other,
}

impl AssetCategory {
    pub fn display(self) -> &'static str {
        match self {
            AssetCategory::Collectable => "Collectable",
            AssetCategory::PersonalUse => "Personal use",
            AssetCategory::Other => "Other",
        }
    }
}

const COLLECTABLE_KEYWORDS: &[&str] = &[
    "artwork",
    "art",
    "painting",
    "sculpture",
    "jewellery",
    "jewelry",
    "antique",
    "rare coin",
    "coin collection",
    "stamp",
    "rare book",
    "rare folio",
    "manuscript",
    "wine",
    "collectable",
    "collectible",
];

const PERSONAL_USE_KEYWORDS: &[&str] = &[
    "boat",
    "yacht",
    "furniture",
    "household",
    "personal use",
    "car",
    "vehicle",
    "caravan",
    "electrical",
    "appliance",
];

/// Ordered rules; the first list with a matching keyword decides the category
const RULES: &[(AssetCategory, &[&str])] = &[
    (AssetCategory::Collectable, COLLECTABLE_KEYWORDS),
    (AssetCategory::PersonalUse, PERSONAL_USE_KEYWORDS),
];

/// Category together with the reason it was chosen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Categorisation {
    pub category: AssetCategory,
    pub matched_keyword: Option<&'static str>,
    pub justification: String,
}

fn words(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect()
}

fn word_matches(word: &str, keyword: &str) -> bool {
    word == keyword || word.strip_suffix('s') == Some(keyword)
}

/// Whether the keyword (one or more space-separated words) appears as a run of whole words
fn contains_keyword(words: &[&str], keyword: &str) -> bool {
    let wanted: Vec<&str> = keyword.split(' ').collect();
    words.windows(wanted.len()).any(|run| {
        run.iter()
            .zip(&wanted)
            .all(|(word, part)| word_matches(word, part))
    })
}

/// Categorise from lowercased description+category text
pub fn categorise(search_text: &str) -> Categorisation {
    let words = words(search_text);
    for (category, keywords) in RULES {
        if let Some(keyword) = keywords.iter().find(|k| contains_keyword(&words, k)) {
            return Categorisation {
                category: *category,
                matched_keyword: Some(*keyword),
                justification: format!(
                    "{} asset: matched keyword '{}'",
                    category.display(),
                    keyword
                ),
            };
        }
    }
    Categorisation {
        category: AssetCategory::Other,
        matched_keyword: None,
        justification: "Other asset: no collectable or personal-use keyword matched".to_string(),
    }
}
