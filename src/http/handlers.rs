//! Verification endpoints for the checkout UI.
//!
//! A `pending` answer is a normal 200 response with a neutral message: the
//! webhook usually just hasn't run yet, so the UI should offer a status check
//! rather than show an error.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::http::error::ApiError;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::verification::{PurchaseKey, VerificationOutcome};

pub const CONFIRMED_MESSAGE: &str = "Purchase confirmed.";
pub const PENDING_MESSAGE: &str =
    "We're confirming your purchase. Check your order status shortly, or contact support if this persists.";
pub const CANCELLED_MESSAGE: &str =
    "Confirmation was interrupted. Check your order status shortly.";

#[derive(Debug, Deserialize)]
pub struct VerifyItemRequest {
    pub item_id: String,
    pub payment_intent_id: String,
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyPurchaseRequest {
    pub product_id: String,
    pub payment_intent_id: String,
    pub buyer_id: String,
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ItemStatusQuery {
    pub payment_intent_id: String,
}

#[derive(Debug, Deserialize)]
pub struct PurchaseStatusQuery {
    pub product_id: String,
    pub payment_intent_id: String,
    pub buyer_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Confirmed,
    Pending,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResponse {
    pub status: VerificationStatus,
    pub attempts: u32,
    pub message: String,
}

impl VerificationResponse {
    fn from_outcome(outcome: VerificationOutcome) -> (StatusCode, Self) {
        let (code, status, message) = match outcome {
            VerificationOutcome::Confirmed { .. } => {
                (StatusCode::OK, VerificationStatus::Confirmed, CONFIRMED_MESSAGE)
            }
            VerificationOutcome::NotYetConfirmed { .. } => {
                (StatusCode::OK, VerificationStatus::Pending, PENDING_MESSAGE)
            }
            VerificationOutcome::Cancelled { .. } => (
                StatusCode::SERVICE_UNAVAILABLE,
                VerificationStatus::Cancelled,
                CANCELLED_MESSAGE,
            ),
        };

        (
            code,
            Self {
                status,
                attempts: outcome.attempts(),
                message: message.to_string(),
            },
        )
    }

    fn from_check(confirmed: bool) -> (StatusCode, Self) {
        let outcome = if confirmed {
            VerificationOutcome::Confirmed { attempts: 1 }
        } else {
            VerificationOutcome::NotYetConfirmed { attempts: 1 }
        };
        Self::from_outcome(outcome)
    }
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn verify_item(State(state): State<AppState>, Json(req): Json<VerifyItemRequest>) -> Response {
    let verifier = state.verifier();
    let result = verifier
        .verify_item_state_transition(
            &req.item_id,
            &req.payment_intent_id,
            req.max_attempts,
            state.cancellation(),
        )
        .await
        .map(VerificationResponse::from_outcome)
        .map_err(ApiError::from);

    reply("verify_item", result)
}

pub async fn verify_purchase(
    State(state): State<AppState>,
    Json(req): Json<VerifyPurchaseRequest>,
) -> Response {
    let key = PurchaseKey::new(req.product_id, req.payment_intent_id, req.buyer_id);
    let verifier = state.verifier();
    let result = verifier
        .verify_record_exists(&key, req.max_attempts, state.cancellation())
        .await
        .map(VerificationResponse::from_outcome)
        .map_err(ApiError::from);

    reply("verify_purchase", result)
}

pub async fn item_status(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
    Query(query): Query<ItemStatusQuery>,
) -> Response {
    let result = state
        .verifier()
        .check_item_state(&item_id, &query.payment_intent_id)
        .await
        .map(VerificationResponse::from_check)
        .map_err(ApiError::from);

    reply("item_status", result)
}

pub async fn purchase_status(
    State(state): State<AppState>,
    Query(query): Query<PurchaseStatusQuery>,
) -> Response {
    let key = PurchaseKey::new(query.product_id, query.payment_intent_id, query.buyer_id);
    let result = state
        .verifier()
        .check_record_exists(&key)
        .await
        .map(VerificationResponse::from_check)
        .map_err(ApiError::from);

    reply("purchase_status", result)
}

fn reply(route: &'static str, result: Result<(StatusCode, VerificationResponse), ApiError>) -> Response {
    let response = match result {
        Ok((code, body)) => (code, Json(body)).into_response(),
        Err(e) => {
            tracing::warn!(route, error = %e, "Verification request rejected");
            e.into_response()
        }
    };
    metrics::record_request(route, response.status().as_u16());
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_is_not_an_error_status() {
        let (code, body) = VerificationResponse::from_outcome(VerificationOutcome::NotYetConfirmed { attempts: 10 });
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body.status, VerificationStatus::Pending);
        assert_eq!(body.attempts, 10);
        assert_eq!(body.message, PENDING_MESSAGE);
    }

    #[test]
    fn test_cancelled_maps_to_unavailable() {
        let (code, body) = VerificationResponse::from_outcome(VerificationOutcome::Cancelled { attempts: 2 });
        assert_eq!(code, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.status, VerificationStatus::Cancelled);
    }

    #[test]
    fn test_single_check_counts_one_attempt() {
        let (_, body) = VerificationResponse::from_check(true);
        assert_eq!(body.status, VerificationStatus::Confirmed);
        assert_eq!(body.attempts, 1);
    }
}
