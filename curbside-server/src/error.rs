//! HTTP error responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use curbside_core::dates::InvalidDateFormat;
use serde_json::json;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Query parameter a request was missing or got wrong.
pub(crate) enum QueryParam {
    Date,
    CurrentDate,
}

impl QueryParam {
    fn label(self) -> &'static str {
        match self {
            QueryParam::Date => "Date",
            QueryParam::CurrentDate => "currentDate",
        }
    }
}

#[derive(Debug)]
/// Errors returned by the query handlers, rendered as `{ "error": message }`.
pub(crate) enum AppError {
    MissingParameter(QueryParam),
    InvalidDate {
        param: QueryParam,
        source: InvalidDateFormat,
    },
}

impl AppError {
    fn message(&self) -> String {
        match self {
            AppError::MissingParameter(param) => format!("{} parameter is required.", param.label()),
            AppError::InvalidDate { param, .. } => {
                format!("{} parameter must be in YYYY-MM-DD format.", param.label())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::InvalidDate { source, .. } = &self {
            debug!(input = %source.input, "Rejected date parameter");
        }
        (StatusCode::BAD_REQUEST, Json(json!({ "error": self.message() }))).into_response()
    }
}
