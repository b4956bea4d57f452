//! Pure rollups over persisted meal and water records. Nothing here
//! touches the database or holds state; callers fetch, we fold.

use serde::Serialize;
use time::Date;

use crate::meals::repo::{MealRecord, WaterLog};
use crate::nutrients::{percent_of_limit, LimitWindow, Nutrient, NutrientTotals};

pub const WATER_DAILY_GOAL: i32 = 8;

/// Days in the reporting window. The water average always divides by
/// this, not by the number of days actually logged.
pub const WEEK_DAYS: f64 = 7.0;

fn sum_meals<'a>(meals: impl Iterator<Item = &'a MealRecord>) -> NutrientTotals {
    let mut totals = NutrientTotals::default();
    for meal in meals {
        totals.add(&meal.nutrients());
    }
    totals
}

/// Totals for meals whose `meal_date` equals `date`. An empty filtered
/// set yields all-zero totals.
pub fn daily_totals(meals: &[MealRecord], date: Date) -> NutrientTotals {
    sum_meals(meals.iter().filter(|m| m.meal_date == date))
}

/// Totals for meals whose `meal_date` falls on or after `window_start`.
pub fn weekly_totals(meals: &[MealRecord], window_start: Date) -> NutrientTotals {
    sum_meals(meals.iter().filter(|m| m.meal_date >= window_start))
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProgressRow {
    pub nutrient: Nutrient,
    pub label: &'static str,
    pub unit: &'static str,
    pub total: f64,
    pub limit: f64,
    pub percent: f64,
}

/// One display row per nutrient against the given limit table.
pub fn progress_rows(totals: &NutrientTotals, window: LimitWindow) -> Vec<ProgressRow> {
    Nutrient::ALL
        .iter()
        .map(|&nutrient| {
            let total = totals.get(nutrient);
            let limit = window.limit(nutrient);
            ProgressRow {
                nutrient,
                label: nutrient.label(),
                unit: nutrient.unit(),
                total,
                limit,
                percent: percent_of_limit(total, limit),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct WaterStats {
    pub total_glasses: i64,
    pub daily_average: f64,
    pub goals_met: usize,
}

/// Weekly water rollup. `daily_average` divides the total by the fixed
/// seven-day window size even when fewer days were logged.
pub fn water_stats(logs: &[WaterLog]) -> WaterStats {
    let total_glasses: i64 = logs.iter().map(|log| i64::from(log.glasses)).sum();
    WaterStats {
        total_glasses,
        daily_average: total_glasses as f64 / WEEK_DAYS,
        goals_met: logs
            .iter()
            .filter(|log| log.glasses >= WATER_DAILY_GOAL)
            .count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};
    use uuid::Uuid;

    fn meal(meal_date: Date, calories: f64, protein: f64) -> MealRecord {
        MealRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            meal_description: "test meal".into(),
            meal_date,
            calories,
            total_fat: 1.0,
            saturated_fat: 0.5,
            trans_fat: 0.0,
            cholesterol: 10.0,
            sodium: 100.0,
            total_carbohydrates: 20.0,
            dietary_fiber: 2.0,
            total_sugars: 5.0,
            protein,
            created_at: datetime!(2025-03-10 12:00 UTC),
        }
    }

    fn water(log_date: Date, glasses: i32) -> WaterLog {
        WaterLog {
            user_id: Uuid::new_v4(),
            log_date,
            glasses,
        }
    }

    #[test]
    fn empty_set_yields_zero_totals() {
        let totals = daily_totals(&[], date!(2025 - 03 - 10));
        assert_eq!(totals, NutrientTotals::default());
    }

    #[test]
    fn daily_totals_filter_by_exact_date() {
        let meals = vec![
            meal(date!(2025 - 03 - 10), 500.0, 20.0),
            meal(date!(2025 - 03 - 10), 300.0, 10.0),
            meal(date!(2025 - 03 - 09), 900.0, 40.0),
        ];
        let totals = daily_totals(&meals, date!(2025 - 03 - 10));
        assert_eq!(totals.calories, 800.0);
        assert_eq!(totals.protein, 30.0);
    }

    #[test]
    fn weekly_window_is_inclusive_of_start() {
        let meals = vec![
            meal(date!(2025 - 03 - 03), 500.0, 20.0),
            meal(date!(2025 - 03 - 02), 400.0, 15.0),
        ];
        let totals = weekly_totals(&meals, date!(2025 - 03 - 03));
        assert_eq!(totals.calories, 500.0);
    }

    #[test]
    fn totals_are_additive_over_date_partitions() {
        let meals = vec![
            meal(date!(2025 - 03 - 08), 200.0, 8.0),
            meal(date!(2025 - 03 - 09), 350.0, 12.0),
            meal(date!(2025 - 03 - 09), 150.0, 6.0),
            meal(date!(2025 - 03 - 10), 600.0, 25.0),
        ];
        let whole = weekly_totals(&meals, date!(2025 - 03 - 01));

        let mut by_day = NutrientTotals::default();
        for day in [
            date!(2025 - 03 - 08),
            date!(2025 - 03 - 09),
            date!(2025 - 03 - 10),
        ] {
            by_day.add(&daily_totals(&meals, day));
        }
        assert_eq!(whole, by_day);
    }

    #[test]
    fn repeated_aggregation_is_deterministic() {
        let meals = vec![
            meal(date!(2025 - 03 - 09), 333.33, 11.11),
            meal(date!(2025 - 03 - 10), 666.67, 22.22),
        ];
        let first = weekly_totals(&meals, date!(2025 - 03 - 01));
        let second = weekly_totals(&meals, date!(2025 - 03 - 01));
        assert_eq!(first, second);
    }

    #[test]
    fn water_average_divides_by_seven_regardless_of_days_logged() {
        let logs = vec![water(date!(2025 - 03 - 09), 3), water(date!(2025 - 03 - 10), 5)];
        let stats = water_stats(&logs);
        assert_eq!(stats.total_glasses, 8);
        assert!((stats.daily_average - 8.0 / 7.0).abs() < 1e-12);
        assert_eq!(stats.goals_met, 0);
    }

    #[test]
    fn goals_met_counts_days_at_or_above_goal() {
        let logs = vec![
            water(date!(2025 - 03 - 08), 8),
            water(date!(2025 - 03 - 09), 9),
            water(date!(2025 - 03 - 10), 7),
        ];
        assert_eq!(water_stats(&logs).goals_met, 2);
    }

    #[test]
    fn progress_rows_clamp_percent_but_not_total() {
        let mut totals = NutrientTotals::default();
        totals.calories = 5000.0;
        let rows = progress_rows(&totals, LimitWindow::Daily);
        let calories = rows
            .iter()
            .find(|r| r.nutrient == Nutrient::Calories)
            .unwrap();
        assert_eq!(calories.total, 5000.0);
        assert_eq!(calories.percent, 100.0);
        assert_eq!(calories.unit, "kcal");
    }
}
