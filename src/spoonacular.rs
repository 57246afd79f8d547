use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::UpstreamError;

pub type Result<T> = std::result::Result<T, UpstreamError>;

/// Parameters of a `complexSearch` call as issued by `/spoon` and `/byname`.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub query: String,
    pub number: u32,
    pub meal_type: Option<String>,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>, number: u32) -> SearchQuery {
        SearchQuery {
            query: query.into(),
            number,
            meal_type: None,
        }
    }

    pub fn with_type(mut self, meal_type: Option<String>) -> SearchQuery {
        self.meal_type = meal_type;
        self
    }

    /// `type` is only sent when one was given.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("query", self.query.clone()),
            ("number", self.number.to_string()),
        ];
        if let Some(meal_type) = &self.meal_type {
            params.push(("type", meal_type.clone()));
        }
        params
    }
}

/// `results` may be absent or `null` upstream; both read as no hits.
#[derive(Debug, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    results: Option<Vec<SearchResult>>,
}

impl SearchPage {
    pub fn into_results(self) -> Vec<SearchResult> {
        self.results.unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResult {
    pub id: u64,
}

#[derive(Debug, Clone)]
pub struct SpoonacularClient {
    base_url: String,
    api_key: String,
    client: Client,
}

impl SpoonacularClient {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Raw `complexSearch` payload, untouched.
    pub async fn search(&self, query: &SearchQuery) -> Result<Value> {
        self.complex_search(&query.to_params()).await
    }

    /// Same call as [`search`](Self::search), decoded down to the result ids.
    pub async fn search_page(&self, query: &SearchQuery) -> Result<SearchPage> {
        self.get_json("/recipes/complexSearch", &query.to_params())
            .await
    }

    /// `complexSearch` with an arbitrary parameter set.
    pub async fn complex_search(&self, params: &[(&str, String)]) -> Result<Value> {
        self.get_json("/recipes/complexSearch", params).await
    }

    /// Full recipe information. Nutrition is always included.
    pub async fn recipe_information(&self, id: u64) -> Result<Value> {
        let path = format!("/recipes/{}/information", id);
        self.get_json(&path, &[("includeNutrition", "true".to_string())])
            .await
    }

    /// Pre-computed nutrition summary (`nutritionWidget.json`).
    pub async fn nutrition_widget(&self, id: u64) -> Result<Value> {
        let path = format!("/recipes/{}/nutritionWidget.json", id);
        self.get_json(&path, &[]).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("GET {url} {:?}", params);

        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("apiKey", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }
}
