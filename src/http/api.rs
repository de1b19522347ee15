//! REST API handlers
//!
//! Every response body carries `success` and `message`; successful reads and
//! writes add `data`.

use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, RawQuery, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::error::{Error, ErrorCategory};
use crate::geo;
use crate::models::{RankedSchool, School};
use crate::validation::{body_to_object, parse_new_school, parse_query_coordinate, ValidationError};

use super::server::AppState;

/// Largest accepted request body, in bytes
pub const MAX_BODY_BYTES: usize = 64 * 1024;

// ============================================================================
// API Response Types
// ============================================================================

/// Generic API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

/// Response with a message and no payload
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self.category() {
            ErrorCategory::Validation => {
                tracing::debug!(error = %self, "Rejected request");
            }
            _ => {
                tracing::error!(error = %self, "Request failed");
            }
        }

        (
            self.status_code(),
            Json(MessageResponse::error(self.public_message())),
        )
            .into_response()
    }
}

// ============================================================================
// API Routes
// ============================================================================

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_check))
        .route("/api/addSchool", post(add_school))
        .route("/api/listSchools", get(list_schools))
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

// ============================================================================
// Service Handlers
// ============================================================================

/// Root handler - lists the API routes
async fn root_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "success": true,
        "message": "School Management API",
        "endpoints": {
            "addSchool": "POST /api/addSchool",
            "listSchools": "GET /api/listSchools?latitude=<lat>&longitude=<lng>",
            "healthCheck": "GET /health"
        }
    }))
}

/// Health check endpoint
async fn health_check() -> Json<MessageResponse> {
    Json(MessageResponse::ok("Server is running"))
}

async fn not_found() -> (StatusCode, Json<MessageResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(MessageResponse::error("Route not found")),
    )
}

async fn method_not_allowed() -> (StatusCode, Json<MessageResponse>) {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(MessageResponse::error("Method not allowed")),
    )
}

fn body_rejection(rejection: BytesRejection) -> ValidationError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ValidationError::BodyTooLarge {
            limit: MAX_BODY_BYTES,
        }
    } else {
        ValidationError::MalformedBody
    }
}

// ============================================================================
// School Handlers
// ============================================================================

/// Add a school
///
/// Accepts JSON or urlencoded form bodies.
async fn add_school(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<(StatusCode, Json<ApiResponse<School>>), Error> {
    let body = body.map_err(body_rejection)?;
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());

    let fields = body_to_object(content_type, &body)?;
    let new_school = parse_new_school(&fields)?;

    let id = state.store.insert(&new_school).await?;
    tracing::info!(id, name = %new_school.name, "School added");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            "School added successfully",
            new_school.into_school(id),
        )),
    ))
}

/// List all schools ordered by distance from the query coordinate
async fn list_schools(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Json<ApiResponse<Vec<RankedSchool>>>, Error> {
    let params: HashMap<String, String> =
        url::form_urlencoded::parse(query.as_deref().unwrap_or_default().as_bytes())
            .into_owned()
            .collect();

    let origin = parse_query_coordinate(
        params.get("latitude").map(String::as_str),
        params.get("longitude").map(String::as_str),
    )?;

    let schools = state.store.list_all().await?;

    if schools.is_empty() {
        return Ok(Json(ApiResponse::success("No schools found", Vec::new())));
    }

    let ranked = geo::rank(origin, &schools);
    tracing::debug!(
        count = ranked.len(),
        latitude = origin.latitude(),
        longitude = origin.longitude(),
        "Schools ranked"
    );

    Ok(Json(ApiResponse::success(
        "Schools retrieved and sorted by proximity",
        ranked,
    )))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_response_success() {
        let response = ApiResponse::success("done", vec![1, 2]);
        assert!(response.success);
        assert_eq!(response.message, "done");
        assert_eq!(response.data, Some(vec![1, 2]));
    }

    #[test]
    fn test_message_response_shape() {
        let json = serde_json::to_value(MessageResponse::error("nope")).unwrap();
        assert_eq!(json, serde_json::json!({ "success": false, "message": "nope" }));
    }

    #[test]
    fn test_error_into_response_status() {
        use crate::validation::ValidationError;

        let response = Error::from(ValidationError::OutOfRange).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = Error::from(crate::storage::StoreError::LockPoisoned).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
