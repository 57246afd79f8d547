use serde::Deserialize;

use crate::error::ApiError;
use crate::suggestions::{SuggestionRequest, merge_ingredients, split_list};

pub const DEFAULT_SEARCH_NUMBER: u32 = 5;

/// Query string of `/spoon/{query}`. Values are kept as text so malformed
/// numbers turn into validation errors instead of extractor rejections.
#[derive(Debug, Default, Deserialize)]
pub struct SpoonParams {
    #[serde(rename = "type")]
    pub meal_type: Option<String>,
    pub number: Option<String>,
}

impl SpoonParams {
    pub fn number(&self) -> Result<u32, ApiError> {
        match self.number.as_deref().map(str::trim) {
            None | Some("") => Ok(DEFAULT_SEARCH_NUMBER),
            Some(raw) => raw.parse().map_err(|_| {
                ApiError::Validation(format!("number must be a non-negative integer, got {raw:?}"))
            }),
        }
    }

    /// Forwarded exactly as given; only blank values are dropped.
    pub fn meal_type(&self) -> Option<String> {
        non_empty(self.meal_type.clone())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionParams {
    pub meal_type: Option<String>,
    pub glucose: Option<String>,
    pub query: Option<String>,
    /// Ingredients read from a scanned product.
    pub ingredients: Option<String>,
    /// Ingredients ticked by the user.
    pub selected: Option<String>,
    /// Append common kitchen staples to the ingredient list.
    pub staples: Option<String>,
    pub diet: Option<String>,
    pub intolerances: Option<String>,
    pub exclude_ingredients: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn flag(name: &str, value: Option<String>) -> Result<bool, ApiError> {
    match non_empty(value) {
        None => Ok(false),
        Some(raw) => match raw.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ApiError::Validation(format!(
                "{name} must be true or false, got {raw:?}"
            ))),
        },
    }
}

fn list(value: Option<String>) -> Vec<String> {
    value.as_deref().map(split_list).unwrap_or_default()
}

impl TryFrom<SuggestionParams> for SuggestionRequest {
    type Error = ApiError;

    fn try_from(params: SuggestionParams) -> Result<Self, Self::Error> {
        let glucose = match non_empty(params.glucose) {
            None => None,
            Some(raw) => {
                let value: f64 = raw.trim().parse().map_err(|_| {
                    ApiError::Validation(format!("glucose must be a number, got {raw:?}"))
                })?;
                if !value.is_finite() {
                    return Err(ApiError::Validation(format!(
                        "glucose must be a finite number, got {raw:?}"
                    )));
                }
                Some(value)
            }
        };

        let staples = flag("staples", params.staples)?;

        Ok(SuggestionRequest {
            meal_type: non_empty(params.meal_type),
            glucose,
            query: non_empty(params.query),
            ingredients: merge_ingredients(
                &list(params.ingredients),
                &list(params.selected),
                staples,
            ),
            diet: non_empty(params.diet),
            intolerances: non_empty(params.intolerances),
            exclude_ingredients: non_empty(params.exclude_ingredients),
        })
    }
}
