use serde_json::Value;

use super::{EstimationError, FoodItemBreakdown, NutritionalData};

/// Providers occasionally wrap the JSON in a markdown code fence
/// despite being told not to; strip it before parsing.
fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

fn require_number(value: &Value, field: &'static str) -> Result<f64, EstimationError> {
    value
        .get(field)
        .and_then(Value::as_f64)
        .ok_or(EstimationError::FieldValidation { field })
}

/// Validate the raw completion text into `NutritionalData`. Fails
/// closed: a missing or mistyped nutrient is an error, never a zero.
pub(super) fn parse_response(text: &str) -> Result<NutritionalData, EstimationError> {
    let clean = strip_code_fences(text);
    if clean.is_empty() {
        return Err(EstimationError::EmptyResponse);
    }

    let value: Value = serde_json::from_str(&clean)?;

    if !value.get("isFood").and_then(Value::as_bool).unwrap_or(false) {
        return Err(EstimationError::NotFood);
    }

    let food_item_name = value
        .get("food_item_name")
        .and_then(Value::as_str)
        .ok_or(EstimationError::FieldValidation {
            field: "food_item_name",
        })?
        .to_string();

    let items = value
        .get("items")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| {
                    Some(FoodItemBreakdown {
                        name: entry.get("name")?.as_str()?.to_string(),
                        amount: entry.get("amount")?.as_str()?.to_string(),
                        calories: entry.get("calories")?.as_f64()?,
                    })
                })
                .collect::<Vec<_>>()
        })
        .filter(|items| !items.is_empty());

    let analysis_notes = value
        .get("analysis_notes")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|notes| !notes.is_empty())
        .map(str::to_string);

    Ok(NutritionalData {
        food_item_name,
        calories: require_number(&value, "calories")?,
        total_fat: require_number(&value, "total_fat")?,
        saturated_fat: require_number(&value, "saturated_fat")?,
        trans_fat: require_number(&value, "trans_fat")?,
        cholesterol: require_number(&value, "cholesterol")?,
        sodium: require_number(&value, "sodium")?,
        total_carbohydrates: require_number(&value, "total_carbohydrates")?,
        dietary_fiber: require_number(&value, "dietary_fiber")?,
        total_sugars: require_number(&value, "total_sugars")?,
        protein: require_number(&value, "protein")?,
        items,
        analysis_notes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPLETE: &str = r#"{
        "isFood": true,
        "food_item_name": "Scrambled eggs with toast",
        "items": [
            {"name": "Scrambled eggs", "amount": "2 eggs", "calories": 180},
            {"name": "Toast", "amount": "1 slice", "calories": 80}
        ],
        "calories": 260,
        "total_fat": 14.5,
        "saturated_fat": 4.2,
        "trans_fat": 0,
        "cholesterol": 370,
        "sodium": 340,
        "total_carbohydrates": 15,
        "dietary_fiber": 1.2,
        "total_sugars": 2.1,
        "protein": 16.4,
        "analysis_notes": "Skipped mystery sauce: could not identify"
    }"#;

    #[test]
    fn parses_a_complete_response() {
        let data = parse_response(COMPLETE).expect("complete response should parse");
        assert_eq!(data.food_item_name, "Scrambled eggs with toast");
        assert_eq!(data.calories, 260.0);
        assert_eq!(data.items.as_ref().map(Vec::len), Some(2));
        assert_eq!(
            data.analysis_notes.as_deref(),
            Some("Skipped mystery sauce: could not identify")
        );
    }

    #[test]
    fn strips_markdown_fences() {
        let fenced = format!("```json\n{COMPLETE}\n```");
        let data = parse_response(&fenced).expect("fenced response should parse");
        assert_eq!(data.calories, 260.0);
    }

    #[test]
    fn not_food_wins_even_when_nutrients_are_present() {
        let text = COMPLETE.replacen("\"isFood\": true", "\"isFood\": false", 1);
        assert!(matches!(
            parse_response(&text),
            Err(EstimationError::NotFood)
        ));
    }

    #[test]
    fn missing_is_food_flag_is_not_food() {
        let text = r#"{"food_item_name": "thing", "calories": 1}"#;
        assert!(matches!(parse_response(text), Err(EstimationError::NotFood)));
    }

    #[test]
    fn missing_protein_names_the_field_and_never_defaults() {
        let text = COMPLETE.replacen("\"protein\": 16.4,", "", 1);
        match parse_response(&text) {
            Err(EstimationError::FieldValidation { field }) => assert_eq!(field, "protein"),
            other => panic!("expected field validation failure, got {other:?}"),
        }
    }

    #[test]
    fn mistyped_nutrient_fails_validation() {
        let text = COMPLETE.replacen("\"sodium\": 340", "\"sodium\": \"lots\"", 1);
        match parse_response(&text) {
            Err(EstimationError::FieldValidation { field }) => assert_eq!(field, "sodium"),
            other => panic!("expected field validation failure, got {other:?}"),
        }
    }

    #[test]
    fn non_string_summary_name_fails_validation() {
        let text = COMPLETE.replacen(
            "\"food_item_name\": \"Scrambled eggs with toast\"",
            "\"food_item_name\": 42",
            1,
        );
        match parse_response(&text) {
            Err(EstimationError::FieldValidation { field }) => {
                assert_eq!(field, "food_item_name");
            }
            other => panic!("expected field validation failure, got {other:?}"),
        }
    }

    #[test]
    fn empty_response_is_its_own_error() {
        assert!(matches!(
            parse_response("   "),
            Err(EstimationError::EmptyResponse)
        ));
        assert!(matches!(
            parse_response("```json\n```"),
            Err(EstimationError::EmptyResponse)
        ));
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(matches!(
            parse_response("not json at all"),
            Err(EstimationError::Parse(_))
        ));
    }

    #[test]
    fn empty_notes_and_items_are_omitted() {
        let text = COMPLETE
            .replacen(
                "\"analysis_notes\": \"Skipped mystery sauce: could not identify\"",
                "\"analysis_notes\": \"\"",
                1,
            )
            .replacen(
                r#""items": [
            {"name": "Scrambled eggs", "amount": "2 eggs", "calories": 180},
            {"name": "Toast", "amount": "1 slice", "calories": 80}
        ],"#,
                "\"items\": [],",
                1,
            );
        let data = parse_response(&text).expect("should still parse");
        assert!(data.analysis_notes.is_none());
        assert!(data.items.is_none());
    }
}
