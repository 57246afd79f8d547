use serde::Serialize;
use serde_json::Value;

use crate::error::UpstreamError;
use crate::spoonacular::SpoonacularClient;

/// Anything that can run a `complexSearch` with a given parameter set.
pub trait RecipeSearch {
    fn complex_search(
        &self,
        params: &[(&str, String)],
    ) -> impl Future<Output = Result<Value, UpstreamError>> + Send;
}

impl RecipeSearch for SpoonacularClient {
    async fn complex_search(&self, params: &[(&str, String)]) -> Result<Value, UpstreamError> {
        SpoonacularClient::complex_search(self, params).await
    }
}

pub const HIGH_THRESHOLD: f64 = 8.0;
pub const LOW_THRESHOLD: f64 = 4.0;

pub const MAX_CARBS_HIGH: u32 = 35;
pub const MAX_CARBS_RANGE: u32 = 55;
pub const MAX_CARBS_LOW: u32 = 80;

pub const SUGGESTION_COUNT: u32 = 12;

pub const COMMON_KITCHEN_INGREDIENTS: [&str; 10] = [
    "onion",
    "garlic",
    "potato",
    "carrot",
    "olive oil",
    "salt",
    "black pepper",
    "rice",
    "pasta",
    "egg",
];

const CARB_RELAXED_MESSAGE: &str =
    "Could not find recipes within the carb target. Showing best matches instead.";
const FALLBACK_RELAXED_MESSAGE: &str =
    "Could not find recipes using this item. Showing related recipes instead.";

/// Blood glucose reading bucket, in mmol/L.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlucoseBand {
    High,
    InRange,
    Low,
}

impl GlucoseBand {
    pub fn from_mmol(value: f64) -> GlucoseBand {
        if value >= HIGH_THRESHOLD {
            GlucoseBand::High
        } else if value <= LOW_THRESHOLD {
            GlucoseBand::Low
        } else {
            GlucoseBand::InRange
        }
    }

    pub fn max_carbs(self) -> u32 {
        match self {
            GlucoseBand::High => MAX_CARBS_HIGH,
            GlucoseBand::InRange => MAX_CARBS_RANGE,
            GlucoseBand::Low => MAX_CARBS_LOW,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GlucoseBand::High => "High",
            GlucoseBand::InRange => "In Range",
            GlucoseBand::Low => "Low",
        }
    }
}

/// Spoonacular dish type for a meal of the day, if there is one.
pub fn dish_type(meal_type: &str) -> Option<&'static str> {
    match meal_type.trim().to_lowercase().as_str() {
        "breakfast" => Some("breakfast"),
        "lunch" | "dinner" => Some("main course"),
        "snack" => Some("snack"),
        _ => None,
    }
}

/// Splits a comma separated list, dropping blanks.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Lowercased, deduplicated union of scanned and selected ingredients,
/// optionally followed by the common kitchen staples. First occurrence wins.
pub fn merge_ingredients(
    scanned: &[String],
    selected: &[String],
    include_kitchen_staples: bool,
) -> Vec<String> {
    let staples: &[&str] = if include_kitchen_staples {
        &COMMON_KITCHEN_INGREDIENTS
    } else {
        &[]
    };

    let mut merged: Vec<String> = Vec::new();
    let candidates = scanned
        .iter()
        .map(String::as_str)
        .chain(selected.iter().map(String::as_str))
        .chain(staples.iter().copied());

    for item in candidates {
        let key = item.trim().to_lowercase();
        if !key.is_empty() && !merged.contains(&key) {
            merged.push(key);
        }
    }
    merged
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SuggestionRequest {
    pub meal_type: Option<String>,
    pub glucose: Option<f64>,
    pub query: Option<String>,
    pub ingredients: Vec<String>,
    pub diet: Option<String>,
    pub intolerances: Option<String>,
    pub exclude_ingredients: Option<String>,
}

impl SuggestionRequest {
    pub fn glucose_band(&self) -> Option<GlucoseBand> {
        self.glucose.map(GlucoseBand::from_mmol)
    }

    pub fn max_carbs(&self) -> Option<u32> {
        self.glucose_band().map(GlucoseBand::max_carbs)
    }

    fn dish_type(&self) -> Option<&'static str> {
        self.meal_type.as_deref().and_then(dish_type)
    }

    /// Full filter set for the first attempt.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = base_params();

        if let Some(query) = &self.query {
            params.push(("query", query.clone()));
        }
        if !self.ingredients.is_empty() {
            params.push(("includeIngredients", self.ingredients.join(",")));
        }
        if let Some(dish) = self.dish_type() {
            params.push(("type", dish.to_string()));
        }
        if let Some(max_carbs) = self.max_carbs() {
            params.push(("maxCarbs", max_carbs.to_string()));
        }
        if let Some(diet) = &self.diet {
            params.push(("diet", diet.clone()));
        }
        if let Some(intolerances) = &self.intolerances {
            params.push(("intolerances", intolerances.clone()));
        }
        if let Some(exclude) = &self.exclude_ingredients {
            params.push(("excludeIngredients", exclude.clone()));
        }

        // recipes that use more of the given ingredients rank first
        params.push(("sort", "max-used-ingredients".to_string()));
        params.push(("sortDirection", "desc".to_string()));
        params
    }

    /// Minimal parameters for the last-resort search by `query`.
    pub fn fallback_params(&self) -> Option<Vec<(&'static str, String)>> {
        let query = self.query.as_ref()?;
        let mut params = base_params();
        params.push(("query", query.clone()));
        if let Some(dish) = self.dish_type() {
            params.push(("type", dish.to_string()));
        }
        Some(params)
    }
}

fn base_params() -> Vec<(&'static str, String)> {
    vec![
        ("number", SUGGESTION_COUNT.to_string()),
        ("addRecipeInformation", "true".to_string()),
        ("instructionsRequired", "true".to_string()),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeSummary {
    pub id: Value,
    pub title: Value,
    pub image: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ready_in_minutes: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub servings: Option<Value>,
}

impl RecipeSummary {
    fn from_hit(hit: &Value) -> RecipeSummary {
        let field = |name: &str| hit.get(name).cloned().unwrap_or(Value::Null);
        let optional = |name: &str| hit.get(name).filter(|v| !v.is_null()).cloned();
        RecipeSummary {
            id: field("id"),
            title: field("title"),
            image: field("image"),
            ready_in_minutes: optional("readyInMinutes"),
            servings: optional("servings"),
        }
    }
}

fn summaries(payload: &Value) -> Vec<RecipeSummary> {
    payload
        .get("results")
        .and_then(Value::as_array)
        .map(|hits| hits.iter().map(RecipeSummary::from_hit).collect())
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestions {
    pub results: Vec<RecipeSummary>,
    pub max_carbs: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub glucose_label: Option<&'static str>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub relaxed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relaxed_message: Option<&'static str>,
}

/// Runs the suggestion search, loosening filters when nothing matches.
///
/// 1. every filter;
/// 2. without `maxCarbs`, if a carb limit was applied;
/// 3. by `query` alone, if one was given.
///
/// Attempts 2 and 3 only count when they return hits; otherwise the
/// (empty) result of the last attempt made is returned.
pub async fn suggest<S: RecipeSearch>(
    client: &S,
    request: &SuggestionRequest,
) -> Result<Suggestions, UpstreamError> {
    let max_carbs = request.max_carbs();
    let glucose_label = request.glucose_band().map(GlucoseBand::label);
    let params = request.to_params();

    let mut results = summaries(&client.complex_search(&params).await?);

    if results.is_empty() && max_carbs.is_some() {
        let relaxed: Vec<_> = params
            .iter()
            .filter(|(key, _)| *key != "maxCarbs")
            .cloned()
            .collect();
        tracing::info!("no suggestions within {max_carbs:?}g carbs, retrying without limit");
        results = summaries(&client.complex_search(&relaxed).await?);
        if !results.is_empty() {
            return Ok(Suggestions {
                results,
                max_carbs,
                glucose_label,
                relaxed: true,
                relaxed_message: Some(CARB_RELAXED_MESSAGE),
            });
        }
    }

    if results.is_empty() {
        if let Some(fallback) = request.fallback_params() {
            tracing::info!("no suggestions for ingredients, falling back to query search");
            let fallback_results = summaries(&client.complex_search(&fallback).await?);
            if !fallback_results.is_empty() {
                return Ok(Suggestions {
                    results: fallback_results,
                    max_carbs,
                    glucose_label,
                    relaxed: true,
                    relaxed_message: Some(FALLBACK_RELAXED_MESSAGE),
                });
            }
        }
    }

    Ok(Suggestions {
        results,
        max_carbs,
        glucose_label,
        relaxed: false,
        relaxed_message: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned payloads and records the parameters of every call.
    struct ScriptedSearch {
        payloads: Mutex<VecDeque<Value>>,
        calls: Mutex<Vec<Vec<(String, String)>>>,
    }

    impl ScriptedSearch {
        fn new(payloads: Vec<Value>) -> ScriptedSearch {
            ScriptedSearch {
                payloads: Mutex::new(payloads.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<Vec<(String, String)>> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl RecipeSearch for ScriptedSearch {
        async fn complex_search(
            &self,
            params: &[(&str, String)],
        ) -> Result<Value, UpstreamError> {
            self.calls.lock().unwrap().push(
                params
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect(),
            );
            let next = self.payloads.lock().unwrap().pop_front();
            match next {
                Some(payload) => Ok(payload),
                None => Err(UpstreamError::Status {
                    status: 402,
                    body: "quota".to_string(),
                }),
            }
        }
    }

    fn has_key(call: &[(String, String)], key: &str) -> bool {
        call.iter().any(|(k, _)| k == key)
    }

    fn empty() -> Value {
        json!({"results": []})
    }

    fn one_hit() -> Value {
        json!({"results": [{"id": 42, "title": "Hash browns", "image": "hb.jpg"}]})
    }

    #[tokio::test]
    async fn first_attempt_hits_are_not_relaxed() {
        let search = ScriptedSearch::new(vec![one_hit()]);
        let request = SuggestionRequest {
            glucose: Some(9.0),
            ..Default::default()
        };

        let suggestions = suggest(&search, &request).await.unwrap();

        assert_eq!(suggestions.results.len(), 1);
        assert_eq!(suggestions.max_carbs, Some(35));
        assert_eq!(suggestions.glucose_label, Some("High"));
        assert!(!suggestions.relaxed);
        assert_eq!(search.calls().len(), 1);
        assert!(has_key(&search.calls()[0], "maxCarbs"));
    }

    #[tokio::test]
    async fn empty_carb_search_retries_without_limit() {
        let search = ScriptedSearch::new(vec![empty(), one_hit()]);
        let request = SuggestionRequest {
            glucose: Some(9.0),
            ingredients: vec!["potato".to_string()],
            ..Default::default()
        };

        let suggestions = suggest(&search, &request).await.unwrap();
        let calls = search.calls();

        assert_eq!(calls.len(), 2);
        assert!(has_key(&calls[0], "maxCarbs"));
        assert!(!has_key(&calls[1], "maxCarbs"));
        assert!(has_key(&calls[1], "includeIngredients"));
        assert!(suggestions.relaxed);
        assert_eq!(suggestions.relaxed_message, Some(CARB_RELAXED_MESSAGE));
        assert_eq!(suggestions.max_carbs, Some(35));
    }

    #[tokio::test]
    async fn falls_back_to_query_search() {
        let search = ScriptedSearch::new(vec![empty(), empty(), one_hit()]);
        let request = SuggestionRequest {
            glucose: Some(5.5),
            query: Some("crisps".to_string()),
            ingredients: vec!["potato".to_string()],
            ..Default::default()
        };

        let suggestions = suggest(&search, &request).await.unwrap();
        let calls = search.calls();

        assert_eq!(calls.len(), 3);
        assert!(!has_key(&calls[2], "includeIngredients"));
        assert!(!has_key(&calls[2], "sort"));
        assert_eq!(suggestions.relaxed_message, Some(FALLBACK_RELAXED_MESSAGE));
    }

    #[tokio::test]
    async fn nothing_found_anywhere_is_an_empty_answer() {
        let search = ScriptedSearch::new(vec![empty()]);
        let request = SuggestionRequest::default();

        let suggestions = suggest(&search, &request).await.unwrap();

        assert!(suggestions.results.is_empty());
        assert_eq!(suggestions.max_carbs, None);
        assert!(!suggestions.relaxed);
        assert_eq!(
            serde_json::to_value(&suggestions).unwrap(),
            json!({"results": [], "maxCarbs": null})
        );
    }

    #[tokio::test]
    async fn upstream_errors_propagate() {
        let search = ScriptedSearch::new(vec![]);
        let err = suggest(&search, &SuggestionRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(402));
    }

    fn param<'a>(params: &'a [(&'static str, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn glucose_bands_map_to_carb_limits() {
        assert_eq!(GlucoseBand::from_mmol(9.0).max_carbs(), 35);
        assert_eq!(GlucoseBand::from_mmol(8.0).max_carbs(), 35);
        assert_eq!(GlucoseBand::from_mmol(6.5).max_carbs(), 55);
        assert_eq!(GlucoseBand::from_mmol(4.0).max_carbs(), 80);
        assert_eq!(GlucoseBand::from_mmol(3.1).label(), "Low");
        assert_eq!(GlucoseBand::from_mmol(7.9).label(), "In Range");
    }

    #[test]
    fn meal_types_map_to_dish_types() {
        assert_eq!(dish_type("Breakfast"), Some("breakfast"));
        assert_eq!(dish_type("lunch"), Some("main course"));
        assert_eq!(dish_type("DINNER"), Some("main course"));
        assert_eq!(dish_type("snack"), Some("snack"));
        assert_eq!(dish_type("brunch"), None);
    }

    #[test]
    fn merge_dedupes_case_insensitively_in_order() {
        let scanned = vec!["Potato".to_string(), "wheat flour".to_string()];
        let selected = vec!["potato ".to_string(), "Leek".to_string(), "".to_string()];

        assert_eq!(
            merge_ingredients(&scanned, &selected, false),
            vec!["potato", "wheat flour", "leek"]
        );

        let with_staples = merge_ingredients(&scanned, &selected, true);
        assert_eq!(with_staples[..3], ["potato", "wheat flour", "leek"]);
        // potato is already present, so only nine staples are appended
        assert_eq!(with_staples.len(), 3 + 9);
    }

    #[test]
    fn split_list_trims_and_drops_blanks() {
        assert_eq!(
            split_list(" potato, onion,, ,garlic "),
            vec!["potato", "onion", "garlic"]
        );
    }

    #[test]
    fn params_carry_every_filter() {
        let request = SuggestionRequest {
            meal_type: Some("Lunch".to_string()),
            glucose: Some(9.2),
            query: Some("crisps".to_string()),
            ingredients: vec!["potato".to_string(), "onion".to_string()],
            diet: Some("vegetarian".to_string()),
            intolerances: None,
            exclude_ingredients: Some("peanut".to_string()),
        };
        let params = request.to_params();

        assert_eq!(param(&params, "number"), Some("12"));
        assert_eq!(param(&params, "addRecipeInformation"), Some("true"));
        assert_eq!(param(&params, "instructionsRequired"), Some("true"));
        assert_eq!(param(&params, "query"), Some("crisps"));
        assert_eq!(param(&params, "includeIngredients"), Some("potato,onion"));
        assert_eq!(param(&params, "type"), Some("main course"));
        assert_eq!(param(&params, "maxCarbs"), Some("35"));
        assert_eq!(param(&params, "diet"), Some("vegetarian"));
        assert_eq!(param(&params, "intolerances"), None);
        assert_eq!(param(&params, "excludeIngredients"), Some("peanut"));
        assert_eq!(param(&params, "sort"), Some("max-used-ingredients"));
        assert_eq!(param(&params, "sortDirection"), Some("desc"));
    }

    #[test]
    fn fallback_needs_a_query() {
        let mut request = SuggestionRequest {
            meal_type: Some("snack".to_string()),
            glucose: Some(5.0),
            ..Default::default()
        };
        assert!(request.fallback_params().is_none());

        request.query = Some("crisps".to_string());
        let params = request.fallback_params().unwrap();
        assert_eq!(param(&params, "query"), Some("crisps"));
        assert_eq!(param(&params, "type"), Some("snack"));
        assert_eq!(param(&params, "maxCarbs"), None);
        assert_eq!(param(&params, "sort"), None);
    }

    #[test]
    fn summaries_project_search_hits() {
        let payload = json!({
            "results": [
                {"id": 7, "title": "Soup", "image": "soup.jpg", "readyInMinutes": 20, "extra": true},
                {"id": 8, "title": "Salad"}
            ]
        });
        let projected = summaries(&payload);

        assert_eq!(
            serde_json::to_value(&projected).unwrap(),
            json!([
                {"id": 7, "title": "Soup", "image": "soup.jpg", "readyInMinutes": 20},
                {"id": 8, "title": "Salad", "image": null}
            ])
        );
        assert!(summaries(&json!({})).is_empty());
    }
}
