//! # Palisade Validation
//!
//! Issuer validation for security tokens, with results that defer their
//! errors until someone reads them.
//!
//! ## Design Philosophy
//!
//! 1. **Validation reports, it does not raise.** A failed match is a result
//!    with a failure type, not an `Err`
//! 2. **Errors are described, then built on demand.** Formatting and call-site
//!    capture cost nothing on paths whose error is never read
//! 3. **Failure types are cheap and always set.** Use them for control flow;
//!    reserve the error for diagnostics
//! 4. **Matching is exact.** Ordinal, case-sensitive, first match wins
//! 5. **Untrusted values are bounded** before they reach a message
//!
//! ## Two Error Channels
//!
//! - Missing `parameters` or `token`: `Err(ArgumentNullError)`, immediately
//! - Missing issuer, no trust source, mismatch: reported on the
//!   [`IssuerValidationResult`]; the [`TokenError`] is materialized on first
//!   read of [`error`](ValidationOutcome::error)
//!
//! A factory table that cannot build the requested error is a third, fatal
//! class ([`MaterializeError`]); `error()` panics on it and `try_error()`
//! returns it.
//!
//! ## Quick Start
//!
//! ```rust
//! use palisade_validation::{
//!     validate_issuer, SecurityToken, ValidationFailureType, ValidationOutcome,
//!     ValidationParameters,
//! };
//!
//! struct Jwt {
//!     iss: String,
//! }
//!
//! impl SecurityToken for Jwt {
//!     fn issuer(&self) -> Option<&str> {
//!         Some(&self.iss)
//!     }
//! }
//!
//! # let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! # runtime.block_on(async {
//! let token = Jwt { iss: "evil-issuer".into() };
//! let params = ValidationParameters::new()
//!     .with_valid_issuer("good-issuer")
//!     .with_valid_issuers(["a", "", "b"]);
//!
//! let result = validate_issuer(Some("evil-issuer"), Some(&token), Some(&params))
//!     .await
//!     .unwrap();
//!
//! assert!(!result.is_valid());
//! assert_eq!(result.failure_type(), ValidationFailureType::IssuerValidationFailed);
//!
//! // Built now, on first read.
//! let error = result.error().unwrap();
//! assert!(error.message().contains("a,b"));
//! assert_eq!(error.as_invalid_issuer().unwrap().invalid_issuer(), Some("evil-issuer"));
//! # });
//! ```
//!
//! ## Logging
//!
//! Validation records [`LogDetails`] on the result. Set a sink with
//! [`ValidationParameters::with_log_sink`] to have them written before
//! `validate_issuer` returns, or call
//! [`emit_logs`](ValidationOutcome::emit_logs) later. [`TracingSink`]
//! forwards to `tracing`; [`RingBufferSink`] keeps the last N lines in memory.
//!
//! ## Features
//!
//! - `serde`: `Serialize`/`Deserialize` for [`TrustedIssuers`] and [`TrustedConfiguration`]
//! - `tokio`: enforce [`ValidationParameters::with_configuration_timeout`] with `tokio::time`
//! - `async_std`: same, with `async_std::future::timeout` (used when `tokio` is off)

#![warn(clippy::all)]

pub mod codes;
pub mod context;
pub mod convenience;
pub mod definitions;
pub mod error;
pub mod issuer;
pub mod logging;
pub mod message;
pub mod parameters;
pub mod result;
pub mod ring_buffer;

pub use codes::*;
pub use context::*;
pub use convenience::*;
pub use definitions::*;
pub use error::*;
pub use issuer::*;
pub use logging::*;
pub use message::*;
pub use parameters::*;
pub use result::*;
pub use ring_buffer::*;
