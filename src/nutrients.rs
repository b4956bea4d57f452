use serde::{Deserialize, Serialize};

/// One of the ten tracked nutrient fields. The unit is fixed per field
/// (kcal, grams or milligrams) and carried by `unit()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Nutrient {
    Calories,
    TotalFat,
    SaturatedFat,
    TransFat,
    Cholesterol,
    Sodium,
    TotalCarbohydrates,
    DietaryFiber,
    TotalSugars,
    Protein,
}

impl Nutrient {
    pub const ALL: [Nutrient; 10] = [
        Nutrient::Calories,
        Nutrient::TotalFat,
        Nutrient::SaturatedFat,
        Nutrient::TransFat,
        Nutrient::Cholesterol,
        Nutrient::Sodium,
        Nutrient::TotalCarbohydrates,
        Nutrient::DietaryFiber,
        Nutrient::TotalSugars,
        Nutrient::Protein,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Nutrient::Calories => "Calories",
            Nutrient::TotalFat => "Total Fat",
            Nutrient::SaturatedFat => "Saturated Fat",
            Nutrient::TransFat => "Trans Fat",
            Nutrient::Cholesterol => "Cholesterol",
            Nutrient::Sodium => "Sodium",
            Nutrient::TotalCarbohydrates => "Total Carbohydrates",
            Nutrient::DietaryFiber => "Dietary Fiber",
            Nutrient::TotalSugars => "Total Sugars",
            Nutrient::Protein => "Protein",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Nutrient::Calories => "kcal",
            Nutrient::Cholesterol | Nutrient::Sodium => "mg",
            _ => "g",
        }
    }
}

/// Reference thresholds used only for percentage-of-limit display,
/// never for blocking input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitWindow {
    Daily,
    Weekly,
}

impl LimitWindow {
    /// FDA reference limits for a single day / a seven-day week.
    pub fn limit(self, nutrient: Nutrient) -> f64 {
        match self {
            LimitWindow::Daily => match nutrient {
                Nutrient::Calories => 2000.0,
                Nutrient::TotalFat => 78.0,
                Nutrient::SaturatedFat => 20.0,
                Nutrient::TransFat => 2.0,
                Nutrient::Cholesterol => 300.0,
                Nutrient::Sodium => 2300.0,
                Nutrient::TotalCarbohydrates => 275.0,
                Nutrient::DietaryFiber => 28.0,
                Nutrient::TotalSugars => 50.0,
                Nutrient::Protein => 50.0,
            },
            LimitWindow::Weekly => match nutrient {
                Nutrient::Calories => 14000.0,
                Nutrient::TotalFat => 546.0,
                Nutrient::SaturatedFat => 140.0,
                Nutrient::TransFat => 14.0,
                Nutrient::Cholesterol => 2100.0,
                Nutrient::Sodium => 16100.0,
                Nutrient::TotalCarbohydrates => 1925.0,
                Nutrient::DietaryFiber => 196.0,
                Nutrient::TotalSugars => 350.0,
                Nutrient::Protein => 350.0,
            },
        }
    }
}

/// Sums of the ten nutrient fields over some set of meals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NutrientTotals {
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
}

impl NutrientTotals {
    pub fn get(&self, nutrient: Nutrient) -> f64 {
        match nutrient {
            Nutrient::Calories => self.calories,
            Nutrient::TotalFat => self.total_fat,
            Nutrient::SaturatedFat => self.saturated_fat,
            Nutrient::TransFat => self.trans_fat,
            Nutrient::Cholesterol => self.cholesterol,
            Nutrient::Sodium => self.sodium,
            Nutrient::TotalCarbohydrates => self.total_carbohydrates,
            Nutrient::DietaryFiber => self.dietary_fiber,
            Nutrient::TotalSugars => self.total_sugars,
            Nutrient::Protein => self.protein,
        }
    }

    /// Field-wise accumulation, left to right.
    pub fn add(&mut self, other: &NutrientTotals) {
        self.calories += other.calories;
        self.total_fat += other.total_fat;
        self.saturated_fat += other.saturated_fat;
        self.trans_fat += other.trans_fat;
        self.cholesterol += other.cholesterol;
        self.sodium += other.sodium;
        self.total_carbohydrates += other.total_carbohydrates;
        self.dietary_fiber += other.dietary_fiber;
        self.total_sugars += other.total_sugars;
        self.protein += other.protein;
    }
}

/// Display percentage of a limit, clamped at 100. The raw total is
/// never clamped, only this derived figure.
pub fn percent_of_limit(total: f64, limit: f64) -> f64 {
    if limit <= 0.0 {
        return 0.0;
    }
    (total / limit * 100.0).min(100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_is_clamped_at_100() {
        assert_eq!(percent_of_limit(4000.0, 2000.0), 100.0);
        assert_eq!(percent_of_limit(500.0, 2000.0), 25.0);
    }

    #[test]
    fn units_match_field_kind() {
        assert_eq!(Nutrient::Calories.unit(), "kcal");
        assert_eq!(Nutrient::Sodium.unit(), "mg");
        assert_eq!(Nutrient::Cholesterol.unit(), "mg");
        assert_eq!(Nutrient::Protein.unit(), "g");
    }

    #[test]
    fn weekly_limits_are_daily_scaled() {
        assert_eq!(LimitWindow::Weekly.limit(Nutrient::Calories), 14000.0);
        assert_eq!(LimitWindow::Daily.limit(Nutrient::Calories), 2000.0);
    }
}
