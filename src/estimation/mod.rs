//! Nutrition estimation against an OpenAI-compatible chat-completions
//! provider. The provider is asked for a single JSON object describing
//! the meal; everything it returns is validated field by field before
//! it is allowed anywhere near the confirmation flow.

mod groq;
mod parse;
mod prompt;

pub use groq::GroqEstimator;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::nutrients::NutrientTotals;

/// Per-item line of the provider's breakdown. Display-only, never
/// persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FoodItemBreakdown {
    pub name: String,
    pub amount: String,
    pub calories: f64,
}

/// Structured output of a successful estimation. A strict superset of
/// what gets persisted: `items` and `analysis_notes` are shown to the
/// user during confirmation and then dropped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NutritionalData {
    pub food_item_name: String,
    pub calories: f64,
    pub total_fat: f64,
    pub saturated_fat: f64,
    pub trans_fat: f64,
    pub cholesterol: f64,
    pub sodium: f64,
    pub total_carbohydrates: f64,
    pub dietary_fiber: f64,
    pub total_sugars: f64,
    pub protein: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<FoodItemBreakdown>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_notes: Option<String>,
}

impl NutritionalData {
    pub fn totals(&self) -> NutrientTotals {
        NutrientTotals {
            calories: self.calories,
            total_fat: self.total_fat,
            saturated_fat: self.saturated_fat,
            trans_fat: self.trans_fat,
            cholesterol: self.cholesterol,
            sodium: self.sodium,
            total_carbohydrates: self.total_carbohydrates,
            dietary_fiber: self.dietary_fiber,
            total_sugars: self.total_sugars,
            protein: self.protein,
        }
    }
}

#[derive(Debug, Error)]
pub enum EstimationError {
    #[error("estimation provider is not configured")]
    Configuration,
    #[error("provider request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("AI returned empty response")]
    EmptyResponse,
    #[error("provider returned malformed JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("input was not recognized as food")]
    NotFood,
    #[error("Missing or invalid nutritional data: {field}")]
    FieldValidation { field: &'static str },
}

impl EstimationError {
    /// Message shown to the user. NotFood gets its own wording so the
    /// user knows to revise the input rather than retry it.
    pub fn user_message(&self) -> String {
        match self {
            EstimationError::Configuration => {
                "Groq API key is not configured. Please add GROQ_API_KEY to your .env file."
                    .to_string()
            }
            EstimationError::NotFood => {
                "The item you entered does not appear to be food. Please enter a valid food description."
                    .to_string()
            }
            EstimationError::Request(_) => "Failed to analyze meal. Please try again.".to_string(),
            other => other.to_string(),
        }
    }
}

/// External estimation collaborator. Exactly one outbound call per
/// `analyze` invocation; retry policy belongs to the caller.
#[async_trait]
pub trait NutritionEstimator: Send + Sync {
    async fn analyze(&self, description: &str) -> Result<NutritionalData, EstimationError>;
}
