use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use thiserror::Error;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::records::MealEdit;
use crate::estimation::NutritionalData;
use crate::nutrients::NutrientTotals;

/// Server-side cap mirrored by the `meals_daily_quota` trigger.
pub const DAILY_MEAL_QUOTA: usize = 10;

const QUOTA_MESSAGE_MARKER: &str = "maximum limit of 10 meals";

#[derive(Debug, Error)]
pub enum StorageError {
    /// The per-user per-day meal cap was hit. Carries the database's
    /// own message, which the UI shows verbatim.
    #[error("{0}")]
    QuotaExceeded(String),
    #[error(transparent)]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.message().contains(QUOTA_MESSAGE_MARKER) {
                return StorageError::QuotaExceeded(db_err.message().to_string());
            }
        }
        StorageError::Database(err)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct MealRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub meal_description: String,
    #[serde(with = "crate::dates::iso_date")]
    pub meal_date: Date,
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
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl MealRecord {
    pub fn nutrients(&self) -> NutrientTotals {
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

/// Insertable meal row. Only the ten nutrient totals plus description
/// and date survive confirmation; the analysis breakdown and notes do
/// not.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMeal {
    pub user_id: Uuid,
    pub meal_description: String,
    pub meal_date: Date,
    pub nutrients: NutrientTotals,
}

impl NewMeal {
    pub fn from_analysis(
        user_id: Uuid,
        description: &str,
        meal_date: Date,
        data: &NutritionalData,
    ) -> Self {
        Self {
            user_id,
            meal_description: description.to_string(),
            meal_date,
            nutrients: data.totals(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct WaterLog {
    pub user_id: Uuid,
    #[serde(with = "crate::dates::iso_date")]
    pub log_date: Date,
    pub glasses: i32,
}

/// Row-level meal storage, user-scoped on every operation.
#[async_trait]
pub trait MealStore: Send + Sync {
    async fn insert_meal(&self, meal: &NewMeal) -> Result<MealRecord, StorageError>;
    async fn list_meals(&self, user_id: Uuid) -> Result<Vec<MealRecord>, StorageError>;
    async fn list_meals_since(
        &self,
        user_id: Uuid,
        start: Date,
    ) -> Result<Vec<MealRecord>, StorageError>;
    async fn update_meal(
        &self,
        user_id: Uuid,
        id: Uuid,
        edit: &MealEdit,
    ) -> Result<MealRecord, StorageError>;
    async fn delete_meal(&self, user_id: Uuid, id: Uuid) -> Result<(), StorageError>;
}

/// Per-day water counters with upsert semantics on (user, date).
#[async_trait]
pub trait WaterStore: Send + Sync {
    async fn glasses_for(&self, user_id: Uuid, date: Date) -> Result<i32, StorageError>;
    async fn upsert_glasses(
        &self,
        user_id: Uuid,
        date: Date,
        glasses: i32,
    ) -> Result<(), StorageError>;
    async fn logs_since(&self, user_id: Uuid, start: Date) -> Result<Vec<WaterLog>, StorageError>;
}

const MEAL_COLUMNS: &str = "id, user_id, meal_description, meal_date, calories, total_fat, \
     saturated_fat, trans_fat, cholesterol, sodium, total_carbohydrates, dietary_fiber, \
     total_sugars, protein, created_at";

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MealStore for PgStore {
    async fn insert_meal(&self, meal: &NewMeal) -> Result<MealRecord, StorageError> {
        let n = &meal.nutrients;
        let record = sqlx::query_as::<_, MealRecord>(&format!(
            r#"
            INSERT INTO meals (user_id, meal_description, meal_date, calories, total_fat,
                               saturated_fat, trans_fat, cholesterol, sodium,
                               total_carbohydrates, dietary_fiber, total_sugars, protein)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {MEAL_COLUMNS}
            "#
        ))
        .bind(meal.user_id)
        .bind(&meal.meal_description)
        .bind(meal.meal_date)
        .bind(n.calories)
        .bind(n.total_fat)
        .bind(n.saturated_fat)
        .bind(n.trans_fat)
        .bind(n.cholesterol)
        .bind(n.sodium)
        .bind(n.total_carbohydrates)
        .bind(n.dietary_fiber)
        .bind(n.total_sugars)
        .bind(n.protein)
        .fetch_one(&self.db)
        .await?;
        Ok(record)
    }

    async fn list_meals(&self, user_id: Uuid) -> Result<Vec<MealRecord>, StorageError> {
        let rows = sqlx::query_as::<_, MealRecord>(&format!(
            r#"
            SELECT {MEAL_COLUMNS}
            FROM meals
            WHERE user_id = $1
            ORDER BY meal_date DESC, created_at DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn list_meals_since(
        &self,
        user_id: Uuid,
        start: Date,
    ) -> Result<Vec<MealRecord>, StorageError> {
        let rows = sqlx::query_as::<_, MealRecord>(&format!(
            r#"
            SELECT {MEAL_COLUMNS}
            FROM meals
            WHERE user_id = $1 AND meal_date >= $2
            ORDER BY meal_date DESC, created_at DESC
            "#
        ))
        .bind(user_id)
        .bind(start)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn update_meal(
        &self,
        user_id: Uuid,
        id: Uuid,
        edit: &MealEdit,
    ) -> Result<MealRecord, StorageError> {
        let record = sqlx::query_as::<_, MealRecord>(&format!(
            r#"
            UPDATE meals
            SET meal_description = $3, calories = $4, protein = $5,
                total_carbohydrates = $6, total_fat = $7
            WHERE id = $2 AND user_id = $1
            RETURNING {MEAL_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(id)
        .bind(&edit.meal_description)
        .bind(edit.calories)
        .bind(edit.protein)
        .bind(edit.total_carbohydrates)
        .bind(edit.total_fat)
        .fetch_one(&self.db)
        .await?;
        Ok(record)
    }

    async fn delete_meal(&self, user_id: Uuid, id: Uuid) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM meals WHERE id = $2 AND user_id = $1")
            .bind(user_id)
            .bind(id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::Database(sqlx::Error::RowNotFound));
        }
        Ok(())
    }
}

#[async_trait]
impl WaterStore for PgStore {
    async fn glasses_for(&self, user_id: Uuid, date: Date) -> Result<i32, StorageError> {
        let glasses: Option<(i32,)> = sqlx::query_as(
            "SELECT glasses FROM water_logs WHERE user_id = $1 AND log_date = $2",
        )
        .bind(user_id)
        .bind(date)
        .fetch_optional(&self.db)
        .await?;
        Ok(glasses.map(|(g,)| g).unwrap_or(0))
    }

    async fn upsert_glasses(
        &self,
        user_id: Uuid,
        date: Date,
        glasses: i32,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO water_logs (user_id, log_date, glasses)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, log_date) DO UPDATE SET glasses = EXCLUDED.glasses
            "#,
        )
        .bind(user_id)
        .bind(date)
        .bind(glasses)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn logs_since(&self, user_id: Uuid, start: Date) -> Result<Vec<WaterLog>, StorageError> {
        let rows = sqlx::query_as::<_, WaterLog>(
            r#"
            SELECT user_id, log_date, glasses
            FROM water_logs
            WHERE user_id = $1 AND log_date >= $2
            ORDER BY log_date DESC
            "#,
        )
        .bind(user_id)
        .bind(start)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_marker_matches_the_cap() {
        assert!(QUOTA_MESSAGE_MARKER.contains(&DAILY_MEAL_QUOTA.to_string()));
    }

    #[test]
    fn plain_database_errors_stay_database_errors() {
        let err: StorageError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, StorageError::Database(_)));
    }
}
