//! Classification provider that queries a remote Curbside deployment.
//!
//! The scheduler can classify pickup dates against a running query surface instead of the
//! bundled calendar, the way a mobile client talks to its backend.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;

use curbside_core::{
    dates::format_civil_date,
    model::{DayClassification, PickupType, WeekStatus},
    ports::{ClassificationPort, PortError},
};

const PICKUP_TYPE_PATH: &str = "/api/pickup-type";
const WEEK_STATUS_PATH: &str = "/api/week-status";

/// HTTP client for the pickup-type and week-status endpoints.
#[derive(Debug, Clone)]
pub struct HttpClassificationClient {
    client: Client,
    base_url: String,
}

impl HttpClassificationClient {
    /// Create a client for the deployment at `base_url`, e.g. `http://localhost:8080`.
    #[must_use]
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    /// Deployment root without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Classification of a single date.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Network`] on transport failures and
    /// [`PortError::ClassificationUnavailable`] on non-success responses.
    pub async fn day_classification(&self, date: NaiveDate) -> Result<DayClassification, PortError> {
        let req = self
            .client
            .get(format!("{}{PICKUP_TYPE_PATH}", self.base_url))
            .query(&[("date", format_civil_date(date))]);
        fetch_json(req).await
    }

    /// Status of the week reported for a date.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Network`] on transport failures and
    /// [`PortError::ClassificationUnavailable`] on non-success responses.
    pub async fn week_status(&self, date: NaiveDate) -> Result<WeekStatus, PortError> {
        let req = self
            .client
            .get(format!("{}{WEEK_STATUS_PATH}", self.base_url))
            .query(&[("currentDate", format_civil_date(date))]);
        fetch_json(req).await
    }
}

#[async_trait]
impl ClassificationPort for HttpClassificationClient {
    async fn classify_date(&self, date: NaiveDate) -> Result<PickupType, PortError> {
        let classification = self.day_classification(date).await?;
        debug!(%date, pickup_type = %classification.pickup_type, "Remote classification");
        Ok(classification.pickup_type)
    }
}

// Decode JSON on success; keep status and body of anything else.
async fn fetch_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, PortError> {
    let resp = req.send().await.map_err(PortError::from)?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(PortError::ClassificationUnavailable(format!(
            "{status}: {}",
            body.trim()
        )));
    }
    resp.json().await.map_err(PortError::from)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use curbside_core::model::WeekStatusKind;
    use curbside_core::service::CurbsideService;
    use tokio::net::TcpListener;

    use super::*;

    async fn pickup_type_handler(
        Query(params): Query<HashMap<String, String>>,
    ) -> Result<Json<DayClassification>, StatusCode> {
        let date = params.get("date").ok_or(StatusCode::BAD_REQUEST)?;
        CurbsideService::default()
            .pickup_type(date)
            .map(Json)
            .map_err(|_err| StatusCode::BAD_REQUEST)
    }

    async fn week_status_handler(
        Query(params): Query<HashMap<String, String>>,
    ) -> Result<Json<WeekStatus>, StatusCode> {
        let date = params.get("currentDate").ok_or(StatusCode::BAD_REQUEST)?;
        CurbsideService::default()
            .week_status(date)
            .map(Json)
            .map_err(|_err| StatusCode::BAD_REQUEST)
    }

    async fn spawn(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local address");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("test server runs");
        });
        format!("http://{addr}/")
    }

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    fn healthy_router() -> Router {
        Router::new()
            .route(PICKUP_TYPE_PATH, get(pickup_type_handler))
            .route(WEEK_STATUS_PATH, get(week_status_handler))
    }

    #[tokio::test]
    async fn classifies_through_the_query_surface() {
        let base_url = spawn(healthy_router()).await;
        let client = HttpClassificationClient::new(Client::new(), base_url);
        assert!(!client.base_url().ends_with('/'));

        let classification = client
            .day_classification(date(2025, 5, 10))
            .await
            .expect("remote classification");
        assert_eq!(classification.date, date(2025, 5, 10));
        assert_eq!(classification.pickup_type, PickupType::YardWaste);

        let via_port = ClassificationPort::classify_date(&client, date(2025, 5, 5))
            .await
            .expect("remote classification");
        assert_eq!(via_port, PickupType::Recycling);
    }

    #[tokio::test]
    async fn fetches_week_status() {
        let base_url = spawn(healthy_router()).await;
        let client = HttpClassificationClient::new(Client::new(), base_url);
        let status = client.week_status(date(2025, 4, 29)).await.expect("remote status");
        assert_eq!(status.week_status, WeekStatusKind::RecyclingWeek);
        assert_eq!(status.special_pickup_day_in_week, Some(date(2025, 5, 2)));
    }

    #[tokio::test]
    async fn error_status_becomes_classification_unavailable() {
        let router = Router::new().route(
            PICKUP_TYPE_PATH,
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }),
        );
        let base_url = spawn(router).await;
        let client = HttpClassificationClient::new(Client::new(), base_url);
        match client.day_classification(date(2025, 5, 5)).await {
            Err(PortError::ClassificationUnavailable(message)) => {
                assert!(message.contains("503"), "{message}");
                assert!(message.contains("maintenance"), "{message}");
            }
            other => panic!("expected ClassificationUnavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_server_is_a_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local address");
        drop(listener);

        let client = HttpClassificationClient::new(Client::new(), format!("http://{addr}"));
        assert!(matches!(
            client.day_classification(date(2025, 5, 5)).await,
            Err(PortError::Network(_))
        ));
    }
}
