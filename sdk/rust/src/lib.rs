//! Rust client for the Purchase Verifier HTTP API.

pub mod client;

pub use client::{
    HealthResponse, VerificationResponse, VerificationStatus, VerifierClient, VerifyItemRequest,
    VerifyPurchaseRequest,
};
