//! Verification inputs, outcomes and errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::resilience::PollOutcome;
use crate::store::StoreError;

/// Store field names written by the payment webhook.
pub mod fields {
    pub const SOLD: &str = "sold";
    pub const PAYMENT_INTENT_ID: &str = "paymentIntentId";
    pub const PRODUCT_ID: &str = "productId";
    pub const BUYER_ID: &str = "buyerId";
}

/// Composite key of a purchase record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PurchaseKey {
    pub product_id: String,
    pub payment_intent_id: String,
    pub buyer_id: String,
}

impl PurchaseKey {
    pub fn new(
        product_id: impl Into<String>,
        payment_intent_id: impl Into<String>,
        buyer_id: impl Into<String>,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            payment_intent_id: payment_intent_id.into(),
            buyer_id: buyer_id.into(),
        }
    }

    /// Reject empty identifiers before any store access.
    pub fn validate(&self) -> Result<(), VerificationError> {
        require_identifier("product_id", &self.product_id)?;
        require_identifier("payment_intent_id", &self.payment_intent_id)?;
        require_identifier("buyer_id", &self.buyer_id)
    }
}

/// Result of a verification call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VerificationOutcome {
    /// The webhook's write was observed.
    Confirmed { attempts: u32 },
    /// No match within the attempt budget; the webhook may still land later.
    NotYetConfirmed { attempts: u32 },
    /// The caller abandoned the verification.
    Cancelled { attempts: u32 },
}

impl VerificationOutcome {
    /// True only when the purchase was observed.
    pub fn is_confirmed(&self) -> bool {
        matches!(self, VerificationOutcome::Confirmed { .. })
    }

    pub fn attempts(&self) -> u32 {
        match *self {
            VerificationOutcome::Confirmed { attempts }
            | VerificationOutcome::NotYetConfirmed { attempts }
            | VerificationOutcome::Cancelled { attempts } => attempts,
        }
    }

    /// Label used in logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            VerificationOutcome::Confirmed { .. } => "confirmed",
            VerificationOutcome::NotYetConfirmed { .. } => "not_yet_confirmed",
            VerificationOutcome::Cancelled { .. } => "cancelled",
        }
    }
}

impl From<PollOutcome> for VerificationOutcome {
    fn from(outcome: PollOutcome) -> Self {
        match outcome {
            PollOutcome::Matched { attempts } => VerificationOutcome::Confirmed { attempts },
            PollOutcome::Exhausted { attempts } => VerificationOutcome::NotYetConfirmed { attempts },
            PollOutcome::Cancelled { attempts } => VerificationOutcome::Cancelled { attempts },
        }
    }
}

/// Errors a verification call can raise.
///
/// Not-yet-confirmed is an outcome, not an error, and store failures during
/// polling are retried silently.
#[derive(Debug, Error)]
pub enum VerificationError {
    /// An identifier or the attempt ceiling is unusable.
    #[error("malformed input: {field} {reason}")]
    MalformedInput { field: &'static str, reason: &'static str },

    /// A single-shot status check could not reach the store.
    #[error("status check failed: {0}")]
    Store(#[from] StoreError),
}

/// Result type for verification operations.
pub type VerificationResult<T> = Result<T, VerificationError>;

/// Identifiers must be non-empty and not whitespace-only.
pub fn require_identifier(field: &'static str, value: &str) -> Result<(), VerificationError> {
    if value.trim().is_empty() {
        return Err(VerificationError::MalformedInput {
            field,
            reason: "must not be empty",
        });
    }
    Ok(())
}

/// Document IDs are path segments in the store and cannot contain `/`.
pub fn require_document_id(field: &'static str, value: &str) -> Result<(), VerificationError> {
    require_identifier(field, value)?;
    if value.contains('/') {
        return Err(VerificationError::MalformedInput {
            field,
            reason: "must not contain '/'",
        });
    }
    Ok(())
}

/// A per-call attempt ceiling must allow at least one attempt and stay within
/// the configured ceiling, which the request timeout is sized for.
pub fn require_attempts(max_attempts: u32, configured: u32) -> Result<(), VerificationError> {
    if max_attempts == 0 {
        return Err(VerificationError::MalformedInput {
            field: "max_attempts",
            reason: "must be at least 1",
        });
    }
    if max_attempts > configured {
        return Err(VerificationError::MalformedInput {
            field: "max_attempts",
            reason: "must not exceed the configured attempt ceiling",
        });
    }
    Ok(())
}
