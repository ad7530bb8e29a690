//! Error kinds for the entropy pipeline and DRBG.
//!
//! No `thiserror` — a hand-written `Display` + `std::error::Error` impl,
//! matching the style of small, dependency-light error enums elsewhere in
//! the RustCrypto/DRBG ecosystem this crate draws from.

use std::fmt;

/// Errors surfaced by the entropy pipeline, DRBG, and RNG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AleaMarisError {
    /// The configured video/camera source could not be opened.
    SourceUnavailable(String),
    /// Boot found no entropy and OS fallback is disabled.
    NoEntropySource,
    /// Fewer than 32 bytes of seed material were available to initialise the DRBG.
    InsufficientSeed { got: usize },
    /// The conditioner's video source became permanently unreadable before
    /// `bytes_total` bytes were produced.
    EntropyExhausted,
    /// `randint(a, b)` called with `a > b`.
    InvalidRange,
    /// Missing or incorrect `X-API-Key` on an authenticated endpoint.
    Unauthorized,
}

impl fmt::Display for AleaMarisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceUnavailable(detail) => write!(f, "video source unavailable: {detail}"),
            Self::NoEntropySource => write!(f, "no entropy source available at boot"),
            Self::InsufficientSeed { got } => {
                write!(f, "insufficient seed material: got {got} bytes, need >= 32")
            }
            Self::EntropyExhausted => write!(f, "conditioner exhausted its video source"),
            Self::InvalidRange => write!(f, "invalid range: min must be <= max"),
            Self::Unauthorized => write!(f, "unauthorized"),
        }
    }
}

impl std::error::Error for AleaMarisError {}

pub type Result<T> = std::result::Result<T, AleaMarisError>;
