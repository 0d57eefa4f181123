//! Evaluation of quadrangular arbitrage cycles on best-of-book quotes.
//!
//! The [`evaluator`] is pure: it takes four [`quote::Quote`]s and a [`cycle::CycleConfig`] and
//! returns a [`result::CycleResult`]. Fetching quotes ([`source`]) and recording results
//! ([`sink`]) live behind traits so the evaluator never depends on them.

pub mod config;
pub mod cycle;
pub mod error;
pub mod evaluator;
pub mod quote;
pub mod result;
pub mod sink;
pub mod source;
