use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::error::UpstreamError;
use crate::spoonacular::SpoonacularClient;

const SUMMARY_MAX_CHARS: usize = 500;

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
static SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.\s+").unwrap());
static LEADING_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?").unwrap());

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeIngredient {
    pub name: String,
    pub amount: f64,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeStep {
    pub number: i64,
    pub step: String,
}

/// Rounded per-serving values.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Nutrition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calories: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carbs: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protein: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fat: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fiber: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sugar: Option<i64>,
}

impl Nutrition {
    /// Reads the `nutrition.nutrients` list of a recipe information payload.
    pub fn from_information(info: &Value) -> Nutrition {
        let nutrients = info
            .pointer("/nutrition/nutrients")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let find = |name: &str| {
            nutrients
                .iter()
                .find(|n| {
                    n.get("name")
                        .and_then(Value::as_str)
                        .is_some_and(|n| n.eq_ignore_ascii_case(name))
                })
                .and_then(|n| n.get("amount"))
                .and_then(Value::as_f64)
                .map(round)
        };

        Nutrition {
            calories: find("Calories"),
            carbs: find("Carbohydrates"),
            protein: find("Protein"),
            fat: find("Fat"),
            fiber: find("Fiber"),
            sugar: find("Sugar"),
        }
    }

    /// Fills calories, carbs, protein and fat from a nutrition widget where
    /// they are still missing.
    pub fn fill_from_widget(&mut self, widget: &Value) {
        let read = |key: &str| widget.get(key).and_then(widget_number);
        self.calories = self.calories.or_else(|| read("calories"));
        self.carbs = self.carbs.or_else(|| read("carbs"));
        self.protein = self.protein.or_else(|| read("protein"));
        self.fat = self.fat.or_else(|| read("fat"));
    }
}

fn round(value: f64) -> i64 {
    value.round() as i64
}

/// Widget values come as numbers or as strings like `"49g"`. A string that
/// rounds to zero or has no leading number counts as missing.
fn widget_number(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_f64().map(round),
        Value::String(s) => LEADING_NUMBER
            .find(s)
            .and_then(|m| m.as_str().trim().parse::<f64>().ok())
            .map(round)
            .filter(|n| *n != 0),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FullRecipe {
    pub id: Value,
    pub title: String,
    pub image: String,
    pub ready_in_minutes: Value,
    pub servings: Value,
    pub summary: String,
    pub ingredients: Vec<RecipeIngredient>,
    pub steps: Vec<RecipeStep>,
    pub nutrition: Nutrition,
}

impl FullRecipe {
    pub fn from_information(info: &Value) -> FullRecipe {
        let text = |key: &str, default: &str| {
            info.get(key)
                .and_then(Value::as_str)
                .unwrap_or(default)
                .to_string()
        };
        let count = |key: &str| {
            info.get(key)
                .filter(|v| !v.is_null())
                .cloned()
                .unwrap_or(Value::from(0))
        };

        FullRecipe {
            id: info.get("id").cloned().unwrap_or(Value::Null),
            title: text("title", "Untitled"),
            image: text("image", ""),
            ready_in_minutes: count("readyInMinutes"),
            servings: count("servings"),
            summary: summary(info),
            ingredients: ingredients(info),
            steps: steps(info),
            nutrition: Nutrition::from_information(info),
        }
    }
}

pub fn strip_html(html: &str) -> String {
    HTML_TAG.replace_all(html, "").into_owned()
}

fn summary(info: &Value) -> String {
    info.get("summary")
        .and_then(Value::as_str)
        .map(|s| strip_html(s).chars().take(SUMMARY_MAX_CHARS).collect())
        .unwrap_or_default()
}

fn ingredients(info: &Value) -> Vec<RecipeIngredient> {
    let Some(list) = info.get("extendedIngredients").and_then(Value::as_array) else {
        return Vec::new();
    };

    list.iter()
        .map(|i| RecipeIngredient {
            name: i
                .get("name")
                .and_then(Value::as_str)
                .or_else(|| i.get("originalName").and_then(Value::as_str))
                .unwrap_or_default()
                .to_string(),
            amount: i.get("amount").and_then(Value::as_f64).unwrap_or(0.0),
            unit: i
                .get("unit")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        })
        .collect()
}

/// Steps of the first analyzed instruction block, or the plain `instructions`
/// text split into sentences when there are none.
fn steps(info: &Value) -> Vec<RecipeStep> {
    let analyzed: Vec<RecipeStep> = info
        .pointer("/analyzedInstructions/0/steps")
        .and_then(Value::as_array)
        .map(|steps| {
            steps
                .iter()
                .map(|s| RecipeStep {
                    number: s.get("number").and_then(Value::as_i64).unwrap_or(0),
                    step: s
                        .get("step")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                })
                .collect()
        })
        .unwrap_or_default();

    if !analyzed.is_empty() {
        return analyzed;
    }

    match info.get("instructions").and_then(Value::as_str) {
        Some(raw) => split_sentences(&strip_html(raw))
            .into_iter()
            .enumerate()
            .map(|(i, step)| RecipeStep {
                number: i as i64 + 1,
                step,
            })
            .collect(),
        None => Vec::new(),
    }
}

/// Splits after every period that is followed by whitespace.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for m in SENTENCE_END.find_iter(text) {
        // keep the period with its sentence
        sentences.push(&text[start..m.start() + 1]);
        start = m.end();
    }
    sentences.push(&text[start..]);

    sentences
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Recipe information normalized for display. When the nutrient list has no
/// carbohydrates, the nutrition widget is consulted; its failure is logged and
/// ignored.
pub async fn full_recipe(
    client: &SpoonacularClient,
    id: u64,
) -> Result<FullRecipe, UpstreamError> {
    let info = client.recipe_information(id).await?;
    let mut recipe = FullRecipe::from_information(&info);

    if recipe.nutrition.carbs.is_none() {
        match client.nutrition_widget(id).await {
            Ok(widget) => recipe.nutrition.fill_from_widget(&widget),
            Err(e) => log::warn!("nutrition widget for recipe {id} unavailable: {:#}", e),
        }
    }

    Ok(recipe)
}
