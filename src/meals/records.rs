//! Saved-meal lifecycle: the user's meal collection plus the edit and
//! two-step delete flows over it. Local state changes only after
//! storage succeeds.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use super::repo::{MealRecord, MealStore, StorageError};

/// The editable subset of a saved meal. Everything else stays as the
/// analysis produced it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MealEdit {
    pub meal_description: String,
    pub calories: f64,
    pub protein: f64,
    pub total_carbohydrates: f64,
    pub total_fat: f64,
}

impl MealEdit {
    pub fn from_record(record: &MealRecord) -> Self {
        Self {
            meal_description: record.meal_description.clone(),
            calories: record.calories,
            protein: record.protein,
            total_carbohydrates: record.total_carbohydrates,
            total_fat: record.total_fat,
        }
    }
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("no deletion was requested")]
    NothingRequested,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// In-memory view of a user's saved meals, kept in submission order
/// (newest date first, then newest creation first).
#[derive(Default)]
pub struct RecordLifecycle {
    meals: Vec<MealRecord>,
    pending_delete: Option<Uuid>,
}

impl RecordLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn meals(&self) -> &[MealRecord] {
        &self.meals
    }

    pub fn replace_all(&mut self, meals: Vec<MealRecord>) {
        self.meals = meals;
    }

    /// Start an edit from the stored values, never from a blank form.
    pub fn edit(&self, id: Uuid) -> Option<MealEdit> {
        self.meals
            .iter()
            .find(|meal| meal.id == id)
            .map(MealEdit::from_record)
    }

    /// Persist an edit; the local copy is patched only once storage
    /// confirms it.
    pub async fn save(
        &mut self,
        store: &dyn MealStore,
        user_id: Uuid,
        id: Uuid,
        edit: &MealEdit,
    ) -> Result<MealRecord, StorageError> {
        match store.update_meal(user_id, id, edit).await {
            Ok(updated) => {
                if let Some(slot) = self.meals.iter_mut().find(|meal| meal.id == id) {
                    *slot = updated.clone();
                }
                info!(meal_id = %id, %user_id, "meal updated");
                Ok(updated)
            }
            Err(err) => {
                warn!(meal_id = %id, error = %err, "meal update failed");
                Err(err)
            }
        }
    }

    /// Mark a meal for deletion. Nothing is removed until the request
    /// is confirmed.
    pub fn request_delete(&mut self, id: Uuid) {
        self.pending_delete = Some(id);
    }

    pub fn pending_delete(&self) -> Option<Uuid> {
        self.pending_delete
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    pub async fn confirm_delete(
        &mut self,
        store: &dyn MealStore,
        user_id: Uuid,
    ) -> Result<Uuid, LifecycleError> {
        let id = self
            .pending_delete
            .take()
            .ok_or(LifecycleError::NothingRequested)?;
        match store.delete_meal(user_id, id).await {
            Ok(()) => {
                self.meals.retain(|meal| meal.id != id);
                info!(meal_id = %id, %user_id, "meal deleted");
                Ok(id)
            }
            Err(err) => {
                warn!(meal_id = %id, error = %err, "meal deletion failed");
                Err(LifecycleError::Storage(err))
            }
        }
    }
}
