use std::fmt::{self, Display};

use thiserror::Error;

/// Which side of the book a price came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Bid,
    Ask,
}

impl Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Bid => write!(f, "best bid"),
            Side::Ask => write!(f, "best ask"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidQuoteReason {
    #[error("{0} must be positive")]
    NonPositive(Side),

    #[error("{0} must be finite")]
    NonFinite(Side),

    #[error("quote supplied for leg expecting {expected}")]
    SymbolMismatch { expected: String },

    #[error("leg amount overflowed")]
    Overflow,
}

/// A quote that cannot take part in an evaluation. The cycle must be dropped.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid quote for {symbol}: {reason}")]
pub struct InvalidQuote {
    pub symbol: String,
    pub reason: InvalidQuoteReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown cycle variant `{name}`")]
pub struct UnknownVariant {
    pub name: String,
}

/// Raised by a [`crate::source::QuoteSource`] when the best prices for a symbol could not be
/// fetched or parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("quote for {symbol} unavailable: {reason}")]
pub struct QuoteUnavailable {
    pub symbol: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid configuration for cycle variant `{variant}`: {reason}")]
pub struct InvalidCycleConfig {
    pub variant: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    #[error(transparent)]
    InvalidQuote(#[from] InvalidQuote),
}
