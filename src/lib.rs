//! # Quote Arbiter
//!
//! Finds the best-price token swap for a pair and amount by asking two
//! independent sources at once and recommending the better answer, together
//! with the unsigned calldata needed to execute it.
//!
//! ## Overview
//!
//! - **Primary**: a multi-provider aggregator (0x, KyberSwap, Odos, LI.FI,
//!   Relay, Velora) queried concurrently under a deadline, with a fallback simulating
//!   account when the caller's sender yields nothing.
//! - **Secondary**: the Curve Router NG on Ethereum, backed by pools loaded
//!   once from the Curve factories.
//! - **Comparison**: runs both plus a gas price lookup, tolerates partial
//!   failure and explains its recommendation.
//!
//! Nothing here signs or sends transactions.
//!
//! ## Architecture
//!
//! ### Registry Layer
//! Chain table, per-chain RPC clients and ERC-20 metadata, all memoized for
//! the process lifetime and owned by an explicit [`registry::Registry`].
//!
//! ### Source Layer
//! [`primary::PrimaryAdapter`] over an [`aggregator::QuoteEngine`] and
//! [`curve::SecondaryAdapter`] over a [`curve::CurveRouter`].
//!
//! ### Service Layer
//! [`comparison::ComparisonEngine`] and the axum [`server`].

// Core Types
/// Chain registry
pub mod chains;
/// Error taxonomy
pub mod errors;
/// Layered settings
pub mod settings;
/// Quote and transaction types
pub mod types;
/// Amount and address helpers
pub mod units;
/// Request validation
pub mod request;

// Chain Access
/// ABI bindings
pub mod contracts;
/// Multicall3 batching
pub mod multicall;
/// Per-chain RPC client cache
pub mod client_cache;
/// ERC-20 metadata cache
pub mod token_metadata;
/// Owner of the process-wide caches
pub mod registry;

// Quote Sources
/// Multi-provider aggregator engine
pub mod aggregator;
/// Aggregator-backed primary source
pub mod primary;
/// Curve secondary source
pub mod curve;

// Service
/// Side-by-side comparison and recommendation
pub mod comparison;
/// Crash collector interface
pub mod reporter;
/// HTTP surface
pub mod server;
