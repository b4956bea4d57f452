//! Meal entry session: the state machine that walks a draft through
//! estimation and an explicit confirmation before anything is
//! persisted. One session per user; at most one pending analysis at a
//! time.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::Date;
use tracing::{info, warn};
use uuid::Uuid;

use super::repo::{MealRecord, MealStore, NewMeal, StorageError, WaterStore};
use crate::estimation::{NutritionEstimator, NutritionalData};

/// Units offered by the itemized builder.
pub const UNITS: [&str; 12] = [
    "Grams (g)",
    "Ounces (oz)",
    "Cups",
    "Tbsp",
    "Tsp",
    "Slice",
    "Piece",
    "Whole",
    "Handful",
    "Small Bowl",
    "Large Bowl",
    "Serving",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    FreeText,
    Builder,
    Water,
}

/// Builder draft line. Serialized into natural language before
/// estimation, never persisted as-is.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FoodItem {
    pub id: Uuid,
    pub name: String,
    pub amount: f64,
    pub unit: String,
}

/// An estimation result awaiting explicit user confirmation.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAnalysis {
    pub description: String,
    pub meal_date: Date,
    pub data: NutritionalData,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryState {
    Idle,
    Submitting,
    AwaitingConfirmation(PendingAnalysis),
    Failed(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum EntryError {
    #[error("a meal analysis is already in progress")]
    SubmissionInFlight,
    #[error("nothing to analyze yet")]
    EmptyDraft,
    #[error("water intake is tracked directly, not analyzed")]
    WaterMode,
    #[error("meal date must be within the last 7 days")]
    DateOutOfRange,
    #[error("Please enter a valid food name and amount")]
    InvalidItem,
    #[error("unit must be one of the supported units")]
    UnknownUnit,
}

#[derive(Debug, Error)]
pub enum ConfirmError {
    #[error("no analysis is awaiting confirmation")]
    NothingPending,
    #[error("the meal is already being saved")]
    PersistInFlight,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub struct EntrySession {
    mode: InputMode,
    free_text: String,
    items: Vec<FoodItem>,
    meal_date: Date,
    state: EntryState,
    persisting: bool,
}

impl EntrySession {
    pub fn new(today: Date) -> Self {
        Self {
            mode: InputMode::FreeText,
            free_text: String::new(),
            items: Vec::new(),
            meal_date: today,
            state: EntryState::Idle,
            persisting: false,
        }
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn free_text(&self) -> &str {
        &self.free_text
    }

    pub fn items(&self) -> &[FoodItem] {
        &self.items
    }

    pub fn meal_date(&self) -> Date {
        self.meal_date
    }

    pub fn state(&self) -> &EntryState {
        &self.state
    }

    /// Switching modes discards the other modes' drafts without
    /// confirmation. A held pending analysis is unaffected.
    pub fn set_mode(&mut self, mode: InputMode) {
        if self.mode != mode {
            self.free_text.clear();
            self.items.clear();
            self.mode = mode;
        }
    }

    pub fn set_free_text(&mut self, text: String) {
        self.free_text = text;
    }

    /// Meals may be logged for today or up to six days back.
    pub fn set_meal_date(&mut self, date: Date, today: Date) -> Result<(), EntryError> {
        if date > today || date < crate::dates::earliest_loggable(today) {
            return Err(EntryError::DateOutOfRange);
        }
        self.meal_date = date;
        Ok(())
    }

    pub fn add_item(&mut self, name: &str, amount: f64, unit: &str) -> Result<Uuid, EntryError> {
        let name = name.trim();
        if name.is_empty() || !amount.is_finite() || amount <= 0.0 {
            return Err(EntryError::InvalidItem);
        }
        if !UNITS.contains(&unit) {
            return Err(EntryError::UnknownUnit);
        }
        let id = Uuid::new_v4();
        self.items.push(FoodItem {
            id,
            name: name.to_string(),
            amount,
            unit: unit.to_string(),
        });
        Ok(id)
    }

    pub fn remove_item(&mut self, id: Uuid) {
        self.items.retain(|item| item.id != id);
    }

    /// One combined request for the whole builder draft; the provider
    /// sums the items, not us.
    fn builder_description(&self) -> String {
        self.items
            .iter()
            .map(|item| format!("{} {} of {}", item.amount, item.unit, item.name))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Run the draft through estimation. On success the draft is
    /// cleared and the result held for confirmation; on failure the
    /// draft is preserved so the user can retry or edit it.
    pub async fn submit(
        &mut self,
        estimator: &dyn NutritionEstimator,
    ) -> Result<(), EntryError> {
        if matches!(self.state, EntryState::Submitting) {
            return Err(EntryError::SubmissionInFlight);
        }

        let description = match self.mode {
            InputMode::FreeText => {
                let text = self.free_text.trim();
                if text.is_empty() {
                    return Err(EntryError::EmptyDraft);
                }
                text.to_string()
            }
            InputMode::Builder => {
                if self.items.is_empty() {
                    return Err(EntryError::EmptyDraft);
                }
                self.builder_description()
            }
            InputMode::Water => return Err(EntryError::WaterMode),
        };

        self.state = EntryState::Submitting;
        match estimator.analyze(&description).await {
            Ok(data) => {
                match self.mode {
                    InputMode::FreeText => self.free_text.clear(),
                    InputMode::Builder => self.items.clear(),
                    InputMode::Water => {}
                }
                info!(food = %data.food_item_name, "meal analysis ready for confirmation");
                self.state = EntryState::AwaitingConfirmation(PendingAnalysis {
                    description,
                    meal_date: self.meal_date,
                    data,
                });
            }
            Err(err) => {
                warn!(error = %err, "meal analysis failed");
                self.state = EntryState::Failed(err.user_message());
            }
        }
        Ok(())
    }

    /// Persist the pending analysis. On storage failure the pending
    /// state is kept so the user can retry without re-estimating.
    pub async fn confirm(
        &mut self,
        store: &dyn MealStore,
        user_id: Uuid,
    ) -> Result<MealRecord, ConfirmError> {
        let pending = match &self.state {
            EntryState::AwaitingConfirmation(pending) => pending.clone(),
            _ => return Err(ConfirmError::NothingPending),
        };
        if self.persisting {
            return Err(ConfirmError::PersistInFlight);
        }

        self.persisting = true;
        let meal = NewMeal::from_analysis(
            user_id,
            &pending.description,
            pending.meal_date,
            &pending.data,
        );
        let result = store.insert_meal(&meal).await;
        self.persisting = false;

        match result {
            Ok(record) => {
                info!(meal_id = %record.id, %user_id, "meal confirmed and saved");
                self.state = EntryState::Idle;
                Ok(record)
            }
            Err(err) => {
                warn!(error = %err, %user_id, "saving confirmed meal failed");
                Err(ConfirmError::Storage(err))
            }
        }
    }

    /// Discard the pending analysis. Idempotent; nothing is persisted.
    pub fn cancel(&mut self) {
        if matches!(self.state, EntryState::AwaitingConfirmation(_)) {
            self.state = EntryState::Idle;
        }
    }
}

/// Read-modify-upsert water increment. Callers serialize consecutive
/// mutations per user through the session lock.
pub async fn increment_water(
    store: &dyn WaterStore,
    user_id: Uuid,
    date: Date,
) -> Result<i32, StorageError> {
    let next = store.glasses_for(user_id, date).await? + 1;
    store.upsert_glasses(user_id, date, next).await?;
    Ok(next)
}

/// Decrement with a floor at zero: at zero this is a no-op and no
/// upsert is issued.
pub async fn decrement_water(
    store: &dyn WaterStore,
    user_id: Uuid,
    date: Date,
) -> Result<i32, StorageError> {
    let current = store.glasses_for(user_id, date).await?;
    if current == 0 {
        return Ok(0);
    }
    let next = current - 1;
    store.upsert_glasses(user_id, date, next).await?;
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimation::EstimationError;
    use crate::meals::repo::WaterLog;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use time::macros::date;
    use time::OffsetDateTime;

    fn sample_data() -> NutritionalData {
        NutritionalData {
            food_item_name: "Eggs and toast".into(),
            calories: 260.0,
            total_fat: 14.5,
            saturated_fat: 4.2,
            trans_fat: 0.0,
            cholesterol: 370.0,
            sodium: 340.0,
            total_carbohydrates: 15.0,
            dietary_fiber: 1.2,
            total_sugars: 2.1,
            protein: 16.4,
            items: Some(vec![crate::estimation::FoodItemBreakdown {
                name: "Eggs".into(),
                amount: "2 eggs".into(),
                calories: 180.0,
            }]),
            analysis_notes: Some("Skipped garnish: could not identify".into()),
        }
    }

    struct FixedEstimator(NutritionalData);

    #[async_trait]
    impl NutritionEstimator for FixedEstimator {
        async fn analyze(&self, _description: &str) -> Result<NutritionalData, EstimationError> {
            Ok(self.0.clone())
        }
    }

    struct NotFoodEstimator;

    #[async_trait]
    impl NutritionEstimator for NotFoodEstimator {
        async fn analyze(&self, _description: &str) -> Result<NutritionalData, EstimationError> {
            Err(EstimationError::NotFood)
        }
    }

    #[derive(Default)]
    struct MemoryMealStore {
        meals: Mutex<Vec<MealRecord>>,
        quota_hit: bool,
    }

    #[async_trait]
    impl MealStore for MemoryMealStore {
        async fn insert_meal(&self, meal: &NewMeal) -> Result<MealRecord, StorageError> {
            if self.quota_hit {
                return Err(StorageError::QuotaExceeded(
                    "You have reached the maximum limit of 10 meals per day".into(),
                ));
            }
            let n = &meal.nutrients;
            let record = MealRecord {
                id: Uuid::new_v4(),
                user_id: meal.user_id,
                meal_description: meal.meal_description.clone(),
                meal_date: meal.meal_date,
                calories: n.calories,
                total_fat: n.total_fat,
                saturated_fat: n.saturated_fat,
                trans_fat: n.trans_fat,
                cholesterol: n.cholesterol,
                sodium: n.sodium,
                total_carbohydrates: n.total_carbohydrates,
                dietary_fiber: n.dietary_fiber,
                total_sugars: n.total_sugars,
                protein: n.protein,
                created_at: OffsetDateTime::now_utc(),
            };
            self.meals.lock().unwrap().push(record.clone());
            Ok(record)
        }

        async fn list_meals(&self, _user_id: Uuid) -> Result<Vec<MealRecord>, StorageError> {
            Ok(self.meals.lock().unwrap().clone())
        }

        async fn list_meals_since(
            &self,
            _user_id: Uuid,
            _start: Date,
        ) -> Result<Vec<MealRecord>, StorageError> {
            Ok(self.meals.lock().unwrap().clone())
        }

        async fn update_meal(
            &self,
            _user_id: Uuid,
            _id: Uuid,
            _edit: &super::super::records::MealEdit,
        ) -> Result<MealRecord, StorageError> {
            Err(StorageError::Database(sqlx::Error::RowNotFound))
        }

        async fn delete_meal(&self, _user_id: Uuid, _id: Uuid) -> Result<(), StorageError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemoryWaterStore {
        logs: Mutex<HashMap<Date, i32>>,
        upserts: AtomicUsize,
    }

    #[async_trait]
    impl WaterStore for MemoryWaterStore {
        async fn glasses_for(&self, _user_id: Uuid, date: Date) -> Result<i32, StorageError> {
            Ok(*self.logs.lock().unwrap().get(&date).unwrap_or(&0))
        }

        async fn upsert_glasses(
            &self,
            _user_id: Uuid,
            date: Date,
            glasses: i32,
        ) -> Result<(), StorageError> {
            self.upserts.fetch_add(1, Ordering::SeqCst);
            self.logs.lock().unwrap().insert(date, glasses);
            Ok(())
        }

        async fn logs_since(
            &self,
            _user_id: Uuid,
            _start: Date,
        ) -> Result<Vec<WaterLog>, StorageError> {
            Ok(Vec::new())
        }
    }

    const TODAY: Date = date!(2025 - 03 - 10);

    #[tokio::test]
    async fn free_text_happy_path_reaches_confirmation_and_persists() {
        let mut session = EntrySession::new(TODAY);
        session.set_free_text("2 eggs and toast".into());
        session.submit(&FixedEstimator(sample_data())).await.unwrap();

        let pending = match session.state() {
            EntryState::AwaitingConfirmation(p) => p.clone(),
            other => panic!("expected pending analysis, got {other:?}"),
        };
        assert_eq!(pending.description, "2 eggs and toast");
        assert_eq!(pending.meal_date, TODAY);
        assert!(session.free_text().is_empty());

        let store = MemoryMealStore::default();
        let record = session.confirm(&store, Uuid::new_v4()).await.unwrap();
        assert_eq!(record.meal_description, "2 eggs and toast");
        assert_eq!(record.meal_date, TODAY);
        assert!(matches!(session.state(), EntryState::Idle));
    }

    #[tokio::test]
    async fn confirmed_record_carries_exactly_the_ten_nutrients() {
        let data = sample_data();
        let mut session = EntrySession::new(TODAY);
        session.set_free_text("eggs".into());
        session.submit(&FixedEstimator(data.clone())).await.unwrap();

        let store = MemoryMealStore::default();
        let record = session.confirm(&store, Uuid::new_v4()).await.unwrap();
        assert_eq!(record.nutrients(), data.totals());
        // items and analysis_notes have no column to land in
        assert_eq!(record.meal_description, "eggs");
    }

    #[tokio::test]
    async fn empty_submissions_are_rejected_locally() {
        let mut session = EntrySession::new(TODAY);
        session.set_free_text("   ".into());
        assert_eq!(
            session.submit(&FixedEstimator(sample_data())).await,
            Err(EntryError::EmptyDraft)
        );

        session.set_mode(InputMode::Builder);
        assert_eq!(
            session.submit(&FixedEstimator(sample_data())).await,
            Err(EntryError::EmptyDraft)
        );
    }

    #[tokio::test]
    async fn failed_estimation_preserves_the_draft() {
        let mut session = EntrySession::new(TODAY);
        session.set_free_text("a rock".into());
        session.submit(&NotFoodEstimator).await.unwrap();

        match session.state() {
            EntryState::Failed(message) => {
                assert!(message.contains("does not appear to be food"))
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(session.free_text(), "a rock");
    }

    #[tokio::test]
    async fn builder_items_serialize_into_one_description() {
        let mut session = EntrySession::new(TODAY);
        session.set_mode(InputMode::Builder);
        session.add_item("Rice", 100.0, "Grams (g)").unwrap();
        session.add_item("Chicken", 1.0, "Piece").unwrap();
        assert_eq!(
            session.builder_description(),
            "100 Grams (g) of Rice, 1 Piece of Chicken"
        );

        session.submit(&FixedEstimator(sample_data())).await.unwrap();
        match session.state() {
            EntryState::AwaitingConfirmation(pending) => {
                assert_eq!(
                    pending.description,
                    "100 Grams (g) of Rice, 1 Piece of Chicken"
                );
            }
            other => panic!("expected pending analysis, got {other:?}"),
        }
        assert!(session.items().is_empty());
    }

    #[test]
    fn switching_modes_discards_drafts() {
        let mut session = EntrySession::new(TODAY);
        session.set_free_text("leftover draft".into());
        session.set_mode(InputMode::Builder);
        assert!(session.free_text().is_empty());

        session.add_item("Yogurt", 1.0, "Small Bowl").unwrap();
        session.set_mode(InputMode::Water);
        assert!(session.items().is_empty());
    }

    #[test]
    fn item_validation_rejects_bad_input() {
        let mut session = EntrySession::new(TODAY);
        session.set_mode(InputMode::Builder);
        assert_eq!(
            session.add_item("  ", 1.0, "Cups"),
            Err(EntryError::InvalidItem)
        );
        assert_eq!(
            session.add_item("Rice", 0.0, "Cups"),
            Err(EntryError::InvalidItem)
        );
        assert_eq!(
            session.add_item("Rice", 1.0, "Bucket"),
            Err(EntryError::UnknownUnit)
        );
    }

    #[test]
    fn meal_date_window_is_seven_days_including_today() {
        let mut session = EntrySession::new(TODAY);
        assert!(session.set_meal_date(date!(2025 - 03 - 04), TODAY).is_ok());
        assert_eq!(
            session.set_meal_date(date!(2025 - 03 - 03), TODAY),
            Err(EntryError::DateOutOfRange)
        );
        assert_eq!(
            session.set_meal_date(date!(2025 - 03 - 11), TODAY),
            Err(EntryError::DateOutOfRange)
        );
    }

    #[tokio::test]
    async fn quota_failure_keeps_pending_for_retry() {
        let mut session = EntrySession::new(TODAY);
        session.set_free_text("eggs".into());
        session.submit(&FixedEstimator(sample_data())).await.unwrap();

        let store = MemoryMealStore {
            quota_hit: true,
            ..Default::default()
        };
        match session.confirm(&store, Uuid::new_v4()).await {
            Err(ConfirmError::Storage(StorageError::QuotaExceeded(message))) => {
                assert!(message.contains("maximum limit of 10 meals"));
            }
            other => panic!("expected quota failure, got {other:?}"),
        }
        // pending survives so confirm can be retried without re-analysis
        assert!(matches!(
            session.state(),
            EntryState::AwaitingConfirmation(_)
        ));

        let ok_store = MemoryMealStore::default();
        session.confirm(&ok_store, Uuid::new_v4()).await.unwrap();
        assert!(matches!(session.state(), EntryState::Idle));
    }

    #[tokio::test]
    async fn confirm_without_pending_is_rejected() {
        let mut session = EntrySession::new(TODAY);
        let store = MemoryMealStore::default();
        assert!(matches!(
            session.confirm(&store, Uuid::new_v4()).await,
            Err(ConfirmError::NothingPending)
        ));
    }

    #[tokio::test]
    async fn cancel_discards_pending_and_is_idempotent() {
        let mut session = EntrySession::new(TODAY);
        session.set_free_text("eggs".into());
        session.submit(&FixedEstimator(sample_data())).await.unwrap();

        session.cancel();
        assert!(matches!(session.state(), EntryState::Idle));
        session.cancel();
        assert!(matches!(session.state(), EntryState::Idle));

        let store = MemoryMealStore::default();
        assert!(store.list_meals(Uuid::new_v4()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn water_increment_and_floor_semantics() {
        let store = MemoryWaterStore::default();
        let user = Uuid::new_v4();

        for expected in 1..=7 {
            let glasses = increment_water(&store, user, TODAY).await.unwrap();
            assert_eq!(glasses, expected);
        }
        assert_eq!(store.upserts.load(Ordering::SeqCst), 7);

        // 7 of 8: goal not yet reached
        assert!(store.glasses_for(user, TODAY).await.unwrap() < 8);
    }

    #[tokio::test]
    async fn water_decrement_at_zero_issues_no_upsert() {
        let store = MemoryWaterStore::default();
        let user = Uuid::new_v4();

        let glasses = decrement_water(&store, user, TODAY).await.unwrap();
        assert_eq!(glasses, 0);
        assert_eq!(store.upserts.load(Ordering::SeqCst), 0);

        increment_water(&store, user, TODAY).await.unwrap();
        let glasses = decrement_water(&store, user, TODAY).await.unwrap();
        assert_eq!(glasses, 0);
        assert_eq!(store.upserts.load(Ordering::SeqCst), 2);
    }
}
