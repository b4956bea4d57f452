use serde::{Deserialize, Serialize};
use time::Date;

use super::entry::{EntrySession, EntryState, FoodItem, InputMode};
use crate::aggregate::{ProgressRow, WaterStats, WATER_DAILY_GOAL};
use crate::estimation::NutritionalData;
use crate::nutrients::percent_of_limit;

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Idle,
    Submitting,
    AwaitingConfirmation,
    Failed,
}

#[derive(Debug, Serialize)]
pub struct PendingView {
    pub description: String,
    #[serde(with = "crate::dates::iso_date")]
    pub meal_date: Date,
    pub nutrition: NutritionalData,
}

/// Snapshot of the entry session for the client.
#[derive(Debug, Serialize)]
pub struct EntryView {
    pub mode: InputMode,
    pub free_text: String,
    pub items: Vec<FoodItem>,
    #[serde(with = "crate::dates::iso_date")]
    pub meal_date: Date,
    pub status: EntryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending: Option<PendingView>,
}

impl EntryView {
    pub fn from_session(session: &EntrySession) -> Self {
        let (status, error, pending) = match session.state() {
            EntryState::Idle => (EntryStatus::Idle, None, None),
            EntryState::Submitting => (EntryStatus::Submitting, None, None),
            EntryState::AwaitingConfirmation(p) => (
                EntryStatus::AwaitingConfirmation,
                None,
                Some(PendingView {
                    description: p.description.clone(),
                    meal_date: p.meal_date,
                    nutrition: p.data.clone(),
                }),
            ),
            EntryState::Failed(message) => (EntryStatus::Failed, Some(message.clone()), None),
        };
        Self {
            mode: session.mode(),
            free_text: session.free_text().to_string(),
            items: session.items().to_vec(),
            meal_date: session.meal_date(),
            status,
            error,
            pending,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SetModeRequest {
    pub mode: InputMode,
}

#[derive(Debug, Deserialize)]
pub struct FreeTextRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct MealDateRequest {
    #[serde(with = "crate::dates::iso_date")]
    pub meal_date: Date,
}

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub name: String,
    pub amount: f64,
    pub unit: String,
}

#[derive(Debug, Deserialize)]
pub struct WaterQuery {
    #[serde(with = "crate::dates::iso_date")]
    pub date: Date,
}

#[derive(Debug, Serialize)]
pub struct WaterView {
    #[serde(with = "crate::dates::iso_date")]
    pub date: Date,
    pub glasses: i32,
    pub goal: i32,
    pub percent: f64,
    pub goal_achieved: bool,
    pub message: String,
}

impl WaterView {
    pub fn new(date: Date, glasses: i32) -> Self {
        let goal_achieved = glasses >= WATER_DAILY_GOAL;
        let message = if goal_achieved {
            "Goal achieved!".to_string()
        } else {
            format!("{} more to reach your goal", WATER_DAILY_GOAL - glasses)
        };
        Self {
            date,
            glasses,
            goal: WATER_DAILY_GOAL,
            percent: percent_of_limit(f64::from(glasses), f64::from(WATER_DAILY_GOAL)),
            goal_achieved,
            message,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DailyProgressView {
    #[serde(with = "crate::dates::iso_date")]
    pub date: Date,
    pub rows: Vec<ProgressRow>,
}

#[derive(Debug, Serialize)]
pub struct CalorieSummary {
    pub total: f64,
    pub daily_average: f64,
}

#[derive(Debug, Serialize)]
pub struct WeeklyProgressView {
    #[serde(with = "crate::dates::iso_date")]
    pub window_start: Date,
    pub rows: Vec<ProgressRow>,
    pub calorie_summary: CalorieSummary,
    pub water: WaterStats,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn water_view_messages_track_the_goal() {
        let view = WaterView::new(date!(2025 - 03 - 10), 5);
        assert!(!view.goal_achieved);
        assert_eq!(view.message, "3 more to reach your goal");
        assert_eq!(view.percent, 62.5);

        let done = WaterView::new(date!(2025 - 03 - 10), 9);
        assert!(done.goal_achieved);
        assert_eq!(done.message, "Goal achieved!");
        assert_eq!(done.percent, 100.0);
    }

    #[test]
    fn idle_entry_view_omits_error_and_pending() {
        let session = EntrySession::new(date!(2025 - 03 - 10));
        let view = EntryView::from_session(&session);
        assert_eq!(view.status, EntryStatus::Idle);
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("error").is_none());
        assert!(json.get("pending").is_none());
        assert_eq!(json["meal_date"], "2025-03-10");
    }
}
