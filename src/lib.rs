pub mod aggregator;
pub mod api;
pub mod config;
pub mod error;
pub mod full_recipe;
pub mod openfoodfacts;
pub mod spoonacular;
pub mod suggestions;
