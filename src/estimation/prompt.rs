//! The prompt contract sent with every analysis request. The five
//! numbered rules are load-bearing: vague amounts are estimated rather
//! than rejected, every item is summed into one total, unidentifiable
//! items are skipped into `analysis_notes` instead of failing the
//! request, a per-item breakdown accompanies the total, and the output
//! is one raw JSON object.

const RULES: &str = r#"You are an expert nutritionist AI. Analyze the user's text, which may contain multiple food items and vague portions (e.g., "handful", "a little bit", "bowl").

STRICT RULES:
Rule 1: If the user gives vague amounts like "handful", "splash", "a bit", or "piece", YOU MUST ESTIMATE standard serving sizes (e.g., handful = 30g). Do NOT fail.
Rule 2: Process EVERY item in the list. Sum their individual nutrients together for the total.
Rule 3: If a specific item is impossible to identify, do not fail the whole request. Instead, ignore that item and add a message to the "analysis_notes" field saying "Skipped [item name]: could not identify".
Rule 4: Break down each food item with its estimated amount and individual calories in the "items" array.
Rule 5: Return the JSON with the breakdown so users can validate your interpretation."#;

const OUTPUT_CONTRACT: &str = r#"If this IS food, respond ONLY with a valid JSON object in this exact format (no additional text):
{
  "isFood": true,
  "food_item_name": "<summary string of the meal>",
  "items": [
    {"name": "<food name>", "amount": "<amount with unit>", "calories": <number>},
    {"name": "<food name>", "amount": "<amount with unit>", "calories": <number>}
  ],
  "calories": <total number>,
  "total_fat": <number in grams>,
  "saturated_fat": <number in grams>,
  "trans_fat": <number in grams>,
  "cholesterol": <number in milligrams>,
  "sodium": <number in milligrams>,
  "total_carbohydrates": <number in grams>,
  "dietary_fiber": <number in grams>,
  "total_sugars": <number in grams>,
  "protein": <number in grams>,
  "analysis_notes": <string or omit if no notes>
}

If this IS NOT food, respond ONLY with:
{
  "isFood": false
}

Important:
- Provide realistic estimates based on typical portion sizes
- All values should be numbers (decimals are fine)
- For multiple items, sum up ALL nutritional values into ONE total
- The "items" array should contain each food item's breakdown
- The "calories" field in each item is that item's individual calorie count
- If any items were skipped, include analysis_notes explaining what was skipped
- Do not include any explanatory text, only the JSON object

Output must be raw JSON only. No markdown formatting."#;

pub(super) fn analysis_prompt(description: &str) -> String {
    format!("{RULES}\n\nFood description: \"{description}\"\n\n{OUTPUT_CONTRACT}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_the_description_and_contract() {
        let prompt = analysis_prompt("2 eggs and toast");
        assert!(prompt.contains("Food description: \"2 eggs and toast\""));
        assert!(prompt.contains("\"isFood\": false"));
        assert!(prompt.contains("analysis_notes"));
        assert!(prompt.contains("Rule 5"));
    }
}
