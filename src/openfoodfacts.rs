use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use reqwest::header::USER_AGENT;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::UpstreamError;

const CLIENT_USER_AGENT: &str = "Gluca - Web - MVP - https://example.com - scan";
const MAX_PARSED_INGREDIENTS: usize = 7;

static BARCODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4,20}$").unwrap());
static LANGUAGE_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z]{2}:").unwrap());
static PARENTHESISED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(.*?\)").unwrap());
static QUANTITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+(\.\d+)?%?").unwrap());

pub fn is_valid_barcode(barcode: &str) -> bool {
    BARCODE.is_match(barcode)
}

#[derive(Debug, Deserialize)]
struct ProductEnvelope {
    #[serde(default)]
    status: i64,
    product: Option<RawProduct>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawProduct {
    pub product_name: Option<String>,
    pub brands: Option<String>,
    pub image_front_url: Option<String>,
    pub ingredients_text: Option<String>,
    pub ingredients_tags: Option<Vec<String>>,
    pub nutriments: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub barcode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingredients_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingredients_tags: Option<Vec<String>>,
    pub parsed_ingredients: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nutriments: Option<Value>,
}

impl Product {
    pub fn from_raw(barcode: &str, raw: RawProduct) -> Product {
        let parsed_ingredients = parse_ingredients(&raw);
        Product {
            barcode: barcode.to_string(),
            name: raw.product_name,
            brand: raw.brands,
            image: raw.image_front_url,
            ingredients_text: raw.ingredients_text,
            ingredients_tags: raw.ingredients_tags,
            parsed_ingredients,
            nutriments: raw.nutriments,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductLookup {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<Product>,
}

impl ProductLookup {
    pub fn not_found(barcode: &str) -> ProductLookup {
        ProductLookup {
            found: false,
            barcode: Some(barcode.to_string()),
            product: None,
        }
    }

    pub fn found(product: Product) -> ProductLookup {
        ProductLookup {
            found: true,
            barcode: None,
            product: Some(product),
        }
    }
}

/// Ingredient keywords usable as a recipe search filter.
///
/// Structured tags win over free text. Keywords shorter than 2 or longer than
/// 39 characters are dropped and at most 7 are kept.
pub fn parse_ingredients(raw: &RawProduct) -> Vec<String> {
    let keep = |s: &String| (2..40).contains(&s.chars().count());

    if let Some(tags) = raw.ingredients_tags.as_ref().filter(|t| !t.is_empty()) {
        return tags
            .iter()
            .map(|tag| LANGUAGE_PREFIX.replace(tag, "").replace('-', " ").trim().to_string())
            .filter(keep)
            .take(MAX_PARSED_INGREDIENTS)
            .collect();
    }

    match raw.ingredients_text.as_deref() {
        Some(text) if !text.is_empty() => text
            .split(',')
            .map(|part| {
                let part = PARENTHESISED.replace_all(part, "");
                QUANTITY.replace_all(&part, "").trim().to_lowercase()
            })
            .filter(keep)
            .take(MAX_PARSED_INGREDIENTS)
            .collect(),
        _ => Vec::new(),
    }
}

#[derive(Debug, Clone)]
pub struct OpenFoodFactsClient {
    base_url: String,
    client: Client,
}

impl OpenFoodFactsClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Looks a barcode up. Unknown products and non-success statuses are
    /// reported as not found; only transport failures are errors.
    pub async fn lookup(&self, barcode: &str) -> Result<ProductLookup, UpstreamError> {
        let url = format!("{}/api/v2/product/{}.json", self.base_url, barcode);
        tracing::debug!("GET {url}");

        let response = self
            .client
            .get(&url)
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::info!("product {barcode} not available: {}", response.status());
            return Ok(ProductLookup::not_found(barcode));
        }

        let envelope: ProductEnvelope = response.json().await?;
        match envelope.product {
            Some(raw) if envelope.status == 1 => {
                Ok(ProductLookup::found(Product::from_raw(barcode, raw)))
            }
            _ => Ok(ProductLookup::not_found(barcode)),
        }
    }
}
