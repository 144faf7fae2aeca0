//! INK Proof Core - Pure verification logic.
//!
//! This crate contains the logic shared by the server that does not touch
//! the network:
//! - [`classify`] - Decide whether an order carries INK Premium Delivery
//! - [`signature`] - HMAC-SHA256 webhook signature verification
//! - [`hash`] - SHA-256 content hashing for photo artifacts
//! - [`verification`] - Verification status values and the `ink` metafield set
//!
//! # Architecture
//!
//! No I/O, no HTTP clients, no async. Everything here is a pure function over
//! bytes or deserialized webhook payloads, which keeps the interesting logic
//! testable without a Shopify store or the NFS backend.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod classify;
pub mod hash;
pub mod signature;
pub mod verification;
