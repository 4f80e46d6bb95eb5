//! Pipeline stages for filing-to-PDF conversion.
//!
//! Each submodule implements one step and can be tested on its own.
//!
//! ## Data Flow
//!
//! ```text
//! index ──▶ resolve ──▶ filings ──▶ url ──▶ batch (probe ──▶ render)
//! (tickers)  (name→CIK)  (CIK→10-K)  (link)   (gated, N at a time)
//! ```
//!
//! 1. [`index`]: fetch and validate the registry's ticker/title index
//! 2. [`resolve`]: exact, then whole-word, then fuzzy name matching
//!    ([`similarity`] supplies the fuzzy score)
//! 3. [`filings`]: submissions fetch with 429 backoff and post-call throttle
//! 4. [`url`]: archive URL for a filing's primary document
//! 5. [`batch`]: admission gate over [`probe`] + [`render`]; one unit's
//!    failure never cancels another

pub mod batch;
pub mod filings;
pub mod index;
pub mod probe;
pub mod render;
pub mod resolve;
pub mod similarity;
pub mod url;
