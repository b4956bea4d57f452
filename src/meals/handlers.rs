use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{
    AddItemRequest, CalorieSummary, DailyProgressView, EntryView, FreeTextRequest,
    MealDateRequest, SetModeRequest, WaterQuery, WaterView, WeeklyProgressView,
};
use super::entry::{self, ConfirmError, EntryError};
use super::records::{LifecycleError, MealEdit};
use super::repo::{MealRecord, StorageError};
use crate::aggregate::{
    daily_totals, progress_rows, water_stats, weekly_totals, WEEK_DAYS,
};
use crate::auth::AuthUser;
use crate::dates;
use crate::events::DataChanged;
use crate::nutrients::LimitWindow;
use crate::state::AppState;

type HandlerError = (StatusCode, String);

fn entry_error(err: EntryError) -> HandlerError {
    let status = match err {
        EntryError::SubmissionInFlight => StatusCode::CONFLICT,
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    };
    (status, err.to_string())
}

fn storage_error(err: StorageError, fallback: &str) -> HandlerError {
    match err {
        StorageError::QuotaExceeded(message) => (StatusCode::UNPROCESSABLE_ENTITY, message),
        StorageError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, fallback.to_string()),
    }
}

pub fn entry_routes() -> Router<AppState> {
    Router::new()
        .route("/entry", get(get_entry))
        .route("/entry/mode", put(set_mode))
        .route("/entry/text", put(set_free_text))
        .route("/entry/date", put(set_meal_date))
        .route("/entry/items", post(add_item))
        .route("/entry/items/:id", delete(remove_item))
        .route("/entry/submit", post(submit))
        .route("/entry/confirm", post(confirm))
        .route("/entry/cancel", post(cancel))
}

pub fn record_routes() -> Router<AppState> {
    Router::new()
        .route("/meals", get(list_meals))
        .route("/meals/:id", patch(update_meal))
        .route("/meals/:id", delete(delete_meal))
}

pub fn water_routes() -> Router<AppState> {
    Router::new()
        .route("/water", get(get_water))
        .route("/water/increment", post(increment_water))
        .route("/water/decrement", post(decrement_water))
}

pub fn progress_routes() -> Router<AppState> {
    Router::new()
        .route("/progress/daily", get(daily_progress))
        .route("/progress/weekly", get(weekly_progress))
}

#[instrument(skip(state))]
async fn get_entry(State(state): State<AppState>, user: AuthUser) -> Json<EntryView> {
    let session = state.sessions.for_user(user.id).await;
    let session = session.lock().await;
    Json(EntryView::from_session(&session.entry))
}

#[instrument(skip(state))]
async fn set_mode(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<SetModeRequest>,
) -> Json<EntryView> {
    let session = state.sessions.for_user(user.id).await;
    let mut session = session.lock().await;
    session.entry.set_mode(request.mode);
    Json(EntryView::from_session(&session.entry))
}

#[instrument(skip(state, request))]
async fn set_free_text(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<FreeTextRequest>,
) -> Json<EntryView> {
    let session = state.sessions.for_user(user.id).await;
    let mut session = session.lock().await;
    session.entry.set_free_text(request.text);
    Json(EntryView::from_session(&session.entry))
}

#[instrument(skip(state))]
async fn set_meal_date(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<MealDateRequest>,
) -> Result<Json<EntryView>, HandlerError> {
    let session = state.sessions.for_user(user.id).await;
    let mut session = session.lock().await;
    session
        .entry
        .set_meal_date(request.meal_date, dates::today())
        .map_err(entry_error)?;
    Ok(Json(EntryView::from_session(&session.entry)))
}

#[instrument(skip(state, request))]
async fn add_item(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<AddItemRequest>,
) -> Result<Json<EntryView>, HandlerError> {
    let session = state.sessions.for_user(user.id).await;
    let mut session = session.lock().await;
    session
        .entry
        .add_item(&request.name, request.amount, &request.unit)
        .map_err(entry_error)?;
    Ok(Json(EntryView::from_session(&session.entry)))
}

#[instrument(skip(state))]
async fn remove_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Json<EntryView> {
    let session = state.sessions.for_user(user.id).await;
    let mut session = session.lock().await;
    session.entry.remove_item(id);
    Json(EntryView::from_session(&session.entry))
}

/// Runs the draft through analysis. Estimation failures come back as
/// 422 with the user-facing message; the draft is preserved for retry.
#[instrument(skip(state))]
async fn submit(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<EntryView>, HandlerError> {
    let session = state.sessions.for_user(user.id).await;
    let mut session = session.lock().await;
    session
        .entry
        .submit(state.estimator.as_ref())
        .await
        .map_err(entry_error)?;
    if let super::entry::EntryState::Failed(message) = session.entry.state() {
        return Err((StatusCode::UNPROCESSABLE_ENTITY, message.clone()));
    }
    Ok(Json(EntryView::from_session(&session.entry)))
}

#[instrument(skip(state))]
async fn confirm(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<(StatusCode, Json<MealRecord>), HandlerError> {
    let session = state.sessions.for_user(user.id).await;
    let mut session = session.lock().await;
    let record = session
        .entry
        .confirm(state.meals.as_ref(), user.id)
        .await
        .map_err(|err| match err {
            ConfirmError::NothingPending => {
                (StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
            }
            ConfirmError::PersistInFlight => (StatusCode::CONFLICT, err.to_string()),
            ConfirmError::Storage(storage) => {
                storage_error(storage, "Failed to save meal. Please try again.")
            }
        })?;
    let _ = state.changes.send(DataChanged::Meals);
    Ok((StatusCode::CREATED, Json(record)))
}

#[instrument(skip(state))]
async fn cancel(State(state): State<AppState>, user: AuthUser) -> StatusCode {
    let session = state.sessions.for_user(user.id).await;
    let mut session = session.lock().await;
    session.entry.cancel();
    StatusCode::NO_CONTENT
}

#[instrument(skip(state))]
async fn list_meals(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<MealRecord>>, HandlerError> {
    let meals = state
        .meals
        .list_meals(user.id)
        .await
        .map_err(|err| storage_error(err, "Failed to load meals. Please try again."))?;
    let session = state.sessions.for_user(user.id).await;
    let mut session = session.lock().await;
    session.records.replace_all(meals.clone());
    Ok(Json(meals))
}

#[instrument(skip(state, edit))]
async fn update_meal(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(edit): Json<MealEdit>,
) -> Result<Json<MealRecord>, HandlerError> {
    let session = state.sessions.for_user(user.id).await;
    let mut session = session.lock().await;
    let updated = session
        .records
        .save(state.meals.as_ref(), user.id, id, &edit)
        .await
        .map_err(|err| storage_error(err, "Failed to update meal. Please try again."))?;
    let _ = state.changes.send(DataChanged::Meals);
    Ok(Json(updated))
}

#[instrument(skip(state))]
async fn delete_meal(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HandlerError> {
    let session = state.sessions.for_user(user.id).await;
    let mut session = session.lock().await;
    session.records.request_delete(id);
    session
        .records
        .confirm_delete(state.meals.as_ref(), user.id)
        .await
        .map_err(|err| match err {
            LifecycleError::NothingRequested => {
                (StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
            }
            LifecycleError::Storage(storage) => {
                storage_error(storage, "Failed to delete meal. Please try again.")
            }
        })?;
    let _ = state.changes.send(DataChanged::Meals);
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
async fn get_water(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<WaterQuery>,
) -> Result<Json<WaterView>, HandlerError> {
    let glasses = state
        .water
        .glasses_for(user.id, query.date)
        .await
        .map_err(|err| storage_error(err, "Failed to load water intake. Please try again."))?;
    Ok(Json(WaterView::new(query.date, glasses)))
}

/// Water mutations run under the session lock so rapid taps apply one
/// at a time.
#[instrument(skip(state))]
async fn increment_water(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<WaterQuery>,
) -> Result<Json<WaterView>, HandlerError> {
    let session = state.sessions.for_user(user.id).await;
    let _session = session.lock().await;
    let glasses = entry::increment_water(state.water.as_ref(), user.id, query.date)
        .await
        .map_err(|err| storage_error(err, "Failed to update water intake. Please try again."))?;
    let _ = state.changes.send(DataChanged::Water);
    Ok(Json(WaterView::new(query.date, glasses)))
}

#[instrument(skip(state))]
async fn decrement_water(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<WaterQuery>,
) -> Result<Json<WaterView>, HandlerError> {
    let session = state.sessions.for_user(user.id).await;
    let _session = session.lock().await;
    let glasses = entry::decrement_water(state.water.as_ref(), user.id, query.date)
        .await
        .map_err(|err| storage_error(err, "Failed to update water intake. Please try again."))?;
    let _ = state.changes.send(DataChanged::Water);
    Ok(Json(WaterView::new(query.date, glasses)))
}

/// Progress views always re-fetch from storage; they never trust a
/// session's cached collection.
#[instrument(skip(state))]
async fn daily_progress(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<WaterQuery>,
) -> Result<Json<DailyProgressView>, HandlerError> {
    let meals = state
        .meals
        .list_meals_since(user.id, query.date)
        .await
        .map_err(|err| storage_error(err, "Failed to load progress. Please try again."))?;
    let totals = daily_totals(&meals, query.date);
    Ok(Json(DailyProgressView {
        date: query.date,
        rows: progress_rows(&totals, LimitWindow::Daily),
    }))
}

#[instrument(skip(state))]
async fn weekly_progress(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<WeeklyProgressView>, HandlerError> {
    let window_start = dates::trailing_week_start(dates::today());
    let meals = state
        .meals
        .list_meals_since(user.id, window_start)
        .await
        .map_err(|err| storage_error(err, "Failed to load progress. Please try again."))?;
    let water_logs = state
        .water
        .logs_since(user.id, window_start)
        .await
        .map_err(|err| storage_error(err, "Failed to load progress. Please try again."))?;

    let totals = weekly_totals(&meals, window_start);
    let calorie_summary = CalorieSummary {
        total: totals.calories,
        daily_average: totals.calories / WEEK_DAYS,
    };
    Ok(Json(WeeklyProgressView {
        window_start,
        rows: progress_rows(&totals, LimitWindow::Weekly),
        calorie_summary,
        water: water_stats(&water_logs),
    }))
}
