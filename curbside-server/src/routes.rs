//! Read-only query surface over the classifier and week aggregator.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use curbside_core::model::{DayClassification, WeekStatus};
use curbside_core::service::CurbsideService;
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

use crate::error::{AppError, QueryParam};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) service: CurbsideService,
}

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/pickup-type", get(pickup_type))
        .route("/api/week-status", get(week_status))
        .route("/api/relevant-week-pickup-status", get(week_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct PickupTypeQuery {
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WeekStatusQuery {
    current_date: Option<String>,
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "calendarVersion": state.service.calendar().version(),
    }))
}

/// GET /api/pickup-type?date=YYYY-MM-DD
async fn pickup_type(
    State(state): State<AppState>,
    Query(query): Query<PickupTypeQuery>,
) -> Result<Json<DayClassification>, AppError> {
    let date = required(query.date, QueryParam::Date)?;
    state
        .service
        .pickup_type(&date)
        .map(Json)
        .map_err(|source| AppError::InvalidDate {
            param: QueryParam::Date,
            source,
        })
}

/// GET /api/week-status?currentDate=YYYY-MM-DD
async fn week_status(
    State(state): State<AppState>,
    Query(query): Query<WeekStatusQuery>,
) -> Result<Json<WeekStatus>, AppError> {
    let date = required(query.current_date, QueryParam::CurrentDate)?;
    state
        .service
        .week_status(&date)
        .map(Json)
        .map_err(|source| AppError::InvalidDate {
            param: QueryParam::CurrentDate,
            source,
        })
}

fn required(value: Option<String>, param: QueryParam) -> Result<String, AppError> {
    value
        .filter(|value| !value.trim().is_empty())
        .ok_or(AppError::MissingParameter(param))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;

    async fn get_json(uri: &str) -> (StatusCode, Value) {
        let app = router(AppState {
            service: CurbsideService::default(),
        });
        let response = app
            .oneshot(Request::get(uri).body(Body::empty()).expect("valid request"))
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("readable body")
            .to_bytes();
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn pickup_type_returns_the_classification() {
        let (status, body) = get_json("/api/pickup-type?date=2025-05-05").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "date": "2025-05-05", "pickupType": "recycling" }));

        let (_, body) = get_json("/api/pickup-type?date=2025-05-10").await;
        assert_eq!(body["pickupType"], "yard_waste");
    }

    #[tokio::test]
    async fn pickup_type_rejects_bad_input() {
        let (status, body) = get_json("/api/pickup-type?date=2025-02-30").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Date parameter must be in YYYY-MM-DD format." }));

        let (status, body) = get_json("/api/pickup-type").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Date parameter is required." }));
    }

    #[tokio::test]
    async fn week_status_returns_the_reported_week() {
        let (status, body) = get_json("/api/week-status?currentDate=2025-04-29").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "reportedWeek": { "startDate": "2025-04-28", "endDate": "2025-05-02" },
                "weekStatus": "recycling_week",
                "specialPickupDayInWeek": "2025-05-02",
                "specialPickupTypeOnDate": "recycling",
            })
        );
    }

    #[tokio::test]
    async fn legacy_week_status_path_is_an_alias() {
        let (status, body) =
            get_json("/api/relevant-week-pickup-status?currentDate=2025-05-10").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["weekStatus"], "yard_waste_week");
        assert_eq!(body["reportedWeek"]["startDate"], "2025-05-12");
    }

    #[tokio::test]
    async fn week_status_rejects_bad_input() {
        let (status, body) = get_json("/api/week-status?currentDate=").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "currentDate parameter is required." }));

        let (status, body) = get_json("/api/week-status?currentDate=04/29/2025").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({ "error": "currentDate parameter must be in YYYY-MM-DD format." })
        );
    }

    #[tokio::test]
    async fn health_reports_the_calendar_version() {
        let (status, body) = get_json("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert!(body["calendarVersion"].is_string());
    }
}
