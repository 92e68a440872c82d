//! Purchase verification against the document store.
//!
//! The payment webhook is the only writer. After the checkout UI sees a
//! successful authorization it asks the verifier whether the webhook's write
//! has landed, and only reveals success on `Confirmed`.
//!
//! Two confirmation signals exist because two entity shapes exist:
//! - unique items flip `{sold: false}` → `{sold: true, paymentIntentId}`
//! - multi-unit products get a purchase record keyed by
//!   (productId, paymentIntentId, buyerId)

use std::sync::Arc;
use std::time::Instant;

use crate::config::schema::{CollectionsConfig, VerifierConfig};
use crate::observability::metrics;
use crate::resilience::timeouts::{run_with_timeout, AttemptFailure};
use crate::resilience::{poll_until, Cancellation, PollPolicy};
use crate::store::{Document, DocumentStore, FieldFilter, StoreError, StoreResult};
use crate::verification::types::{
    fields, require_attempts, require_document_id, require_identifier, PurchaseKey, VerificationOutcome,
    VerificationResult,
};

const ITEM_KIND: &str = "item_state";
const RECORD_KIND: &str = "purchase_record";

/// Read-only observer of webhook side effects.
#[derive(Clone)]
pub struct PurchaseVerifier {
    store: Arc<dyn DocumentStore>,
    collections: CollectionsConfig,
    policy: PollPolicy,
}

impl PurchaseVerifier {
    pub fn new(store: Arc<dyn DocumentStore>, collections: CollectionsConfig, policy: PollPolicy) -> Self {
        Self {
            store,
            collections,
            policy,
        }
    }

    /// Build a verifier using the polling and collection sections of `config`.
    pub fn from_config(store: Arc<dyn DocumentStore>, config: &VerifierConfig) -> Self {
        Self::new(store, config.collections.clone(), config.polling.policy())
    }

    /// Default poll policy applied when a call does not override the ceiling.
    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    pub fn collections(&self) -> &CollectionsConfig {
        &self.collections
    }

    /// Shared store handle.
    pub fn store(&self) -> Arc<dyn DocumentStore> {
        Arc::clone(&self.store)
    }

    /// Poll until the item is marked sold to `expected_payment_intent_id`.
    ///
    /// `max_attempts` lowers the configured ceiling. Store failures count
    /// as misses; only malformed input is an error.
    pub async fn verify_item_state_transition(
        &self,
        item_id: &str,
        expected_payment_intent_id: &str,
        max_attempts: Option<u32>,
        cancel: Cancellation,
    ) -> VerificationResult<VerificationOutcome> {
        require_document_id("item_id", item_id)?;
        require_identifier("payment_intent_id", expected_payment_intent_id)?;
        let policy = self.policy_for(max_attempts)?;

        let started = Instant::now();
        let outcome: VerificationOutcome = poll_until(ITEM_KIND, &policy, cancel, |_| {
            self.item_matches(item_id, expected_payment_intent_id)
        })
        .await
        .into();

        tracing::info!(
            item_id,
            payment_intent_id = expected_payment_intent_id,
            outcome = outcome.label(),
            attempts = outcome.attempts(),
            "Item verification finished"
        );
        metrics::record_verification(ITEM_KIND, outcome.label(), started);
        Ok(outcome)
    }

    /// Poll until a purchase record matching all three keys exists.
    pub async fn verify_record_exists(
        &self,
        key: &PurchaseKey,
        max_attempts: Option<u32>,
        cancel: Cancellation,
    ) -> VerificationResult<VerificationOutcome> {
        key.validate()?;
        let policy = self.policy_for(max_attempts)?;

        let started = Instant::now();
        let outcome: VerificationOutcome = poll_until(RECORD_KIND, &policy, cancel, |_| self.record_exists(key))
            .await
            .into();

        tracing::info!(
            product_id = %key.product_id,
            payment_intent_id = %key.payment_intent_id,
            buyer_id = %key.buyer_id,
            outcome = outcome.label(),
            attempts = outcome.attempts(),
            "Purchase record verification finished"
        );
        metrics::record_verification(RECORD_KIND, outcome.label(), started);
        Ok(outcome)
    }

    /// One look at the item, no polling. Backs the manual "check order
    /// status" fallback, so store failures are reported.
    pub async fn check_item_state(&self, item_id: &str, expected_payment_intent_id: &str) -> VerificationResult<bool> {
        require_document_id("item_id", item_id)?;
        require_identifier("payment_intent_id", expected_payment_intent_id)?;
        self.single_shot(self.item_matches(item_id, expected_payment_intent_id))
            .await
    }

    /// One look for the purchase record, no polling.
    pub async fn check_record_exists(&self, key: &PurchaseKey) -> VerificationResult<bool> {
        key.validate()?;
        self.single_shot(self.record_exists(key)).await
    }

    fn policy_for(&self, max_attempts: Option<u32>) -> VerificationResult<PollPolicy> {
        let attempts = max_attempts.unwrap_or(self.policy.max_attempts);
        require_attempts(attempts, self.policy.max_attempts)?;
        Ok(self.policy.clone().with_max_attempts(attempts))
    }

    async fn single_shot<F>(&self, probe: F) -> VerificationResult<bool>
    where
        F: std::future::Future<Output = StoreResult<bool>>,
    {
        match run_with_timeout(self.policy.attempt_timeout, probe).await {
            Ok(matched) => Ok(matched),
            Err(AttemptFailure::Error(e)) => Err(e.into()),
            Err(AttemptFailure::TimedOut(limit)) => Err(StoreError::Timeout(limit).into()),
        }
    }

    async fn item_matches(&self, item_id: &str, expected_payment_intent_id: &str) -> StoreResult<bool> {
        let document = self.store.get(&self.collections.items, item_id).await?;
        Ok(document.is_some_and(|doc| is_sold_to(&doc, expected_payment_intent_id)))
    }

    async fn record_exists(&self, key: &PurchaseKey) -> StoreResult<bool> {
        let records = self
            .store
            .query_eq(&self.collections.purchases, &purchase_filters(key))
            .await?;
        Ok(!records.is_empty())
    }
}

impl std::fmt::Debug for PurchaseVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PurchaseVerifier")
            .field("collections", &self.collections)
            .field("policy", &self.policy)
            .finish()
    }
}

/// `sold` is exactly `true` and `paymentIntentId` equals `expected`.
pub fn is_sold_to(item: &Document, expected_payment_intent_id: &str) -> bool {
    item.get_bool(fields::SOLD) == Some(true)
        && item.get_str(fields::PAYMENT_INTENT_ID) == Some(expected_payment_intent_id)
}

/// Equality filters identifying a purchase record.
pub fn purchase_filters(key: &PurchaseKey) -> [FieldFilter; 3] {
    [
        FieldFilter::eq(fields::PRODUCT_ID, key.product_id.as_str()),
        FieldFilter::eq(fields::PAYMENT_INTENT_ID, key.payment_intent_id.as_str()),
        FieldFilter::eq(fields::BUYER_ID, key.buyer_id.as_str()),
    ]
}
