//! Auth types shared across Marche services.
//!
//! Provides session-token issuing and validation, the session cookie builder,
//! and the `IdentityHeaders` extractor.

pub mod cookie;
pub mod identity;
pub mod token;
