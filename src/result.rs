//! Validation outcomes with deferred errors.
//!
//! A validation step returns a result, never an error. The result carries a
//! cheap classification ([`ValidationFailureType`]) and, on failure, an
//! [`ExceptionDetails`] describing the error that *would* be raised. The
//! concrete [`TokenError`] is built the first time someone asks for it and
//! cached on the result.
//!
//! Reading [`is_valid`](ValidationOutcome::is_valid) or
//! [`error`](ValidationOutcome::error) marks the result as observed, so a
//! pipeline can detect results nobody looked at.
//!
//! # Ownership
//!
//! A result belongs to one validation flow. The observed flag and the error
//! cache use atomics and `OnceLock` so a result can be handed across threads,
//! but two racing first reads may each materialize; only one value is kept.

use crate::{
    CallSite, ExceptionDetails, LogDetails, LogSink, MaterializeError, TokenError,
};
use smallvec::SmallVec;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Source tag stamped on errors materialized by this crate.
pub const SOURCE_TAG: &str = "palisade_validation";

/// Coarse classification of a validation outcome. Always set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum ValidationFailureType {
    /// Sentinel for a result no step has written to.
    #[default]
    ValidationNotEvaluated,
    ValidationSucceeded,
    /// A required input was null or blank.
    NullArgument,
    IssuerValidationFailed,
    AudienceValidationFailed,
    LifetimeValidationFailed,
    SignatureValidationFailed,
    TokenTypeValidationFailed,
}

impl ValidationFailureType {
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ValidationNotEvaluated => "ValidationNotEvaluated",
            Self::ValidationSucceeded => "ValidationSucceeded",
            Self::NullArgument => "NullArgument",
            Self::IssuerValidationFailed => "IssuerValidationFailed",
            Self::AudienceValidationFailed => "AudienceValidationFailed",
            Self::LifetimeValidationFailed => "LifetimeValidationFailed",
            Self::SignatureValidationFailed => "SignatureValidationFailed",
            Self::TokenTypeValidationFailed => "TokenTypeValidationFailed",
        }
    }
}

impl fmt::Display for ValidationFailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Shared Surface
// ============================================================================

/// Behavior common to every validation step's result.
///
/// Implementors supply [`base`](Self::base) and, when they can build errors
/// from details, [`try_error`](Self::try_error).
pub trait ValidationOutcome {
    /// The shared result state.
    fn base(&self) -> &ValidationResult;

    /// The error for this outcome, materializing it on first call.
    ///
    /// Marks the result observed.
    fn try_error(&self) -> Result<Option<&TokenError>, MaterializeError>;

    /// Like [`try_error`](Self::try_error), but a broken factory table panics.
    ///
    /// # Panics
    ///
    /// Panics if the error cannot be constructed. That is a wiring defect in
    /// the host, not a validation failure.
    fn error(&self) -> Option<&TokenError> {
        match self.try_error() {
            Ok(error) => error,
            Err(e) => panic!("validation error materialization failed: {}", e),
        }
    }

    /// Whether validation succeeded. Marks the result observed.
    #[inline]
    fn is_valid(&self) -> bool {
        self.base().is_valid()
    }

    #[inline]
    fn failure_type(&self) -> ValidationFailureType {
        self.base().failure_type()
    }

    #[inline]
    fn has_been_observed(&self) -> bool {
        self.base().has_been_observed()
    }

    #[inline]
    fn logs(&self) -> &[LogDetails] {
        self.base().logs()
    }

    #[inline]
    fn exception_details(&self) -> Option<&ExceptionDetails> {
        self.base().exception_details()
    }

    /// Write recorded logs to `sink`. Returns how many were written.
    #[inline]
    fn emit_logs(&self, sink: &dyn LogSink) -> usize {
        self.base().emit_logs(sink)
    }
}

// ============================================================================
// ValidationResult
// ============================================================================

/// Base result shared by all validation steps.
///
/// Defaults to invalid and [`ValidationFailureType::ValidationNotEvaluated`].
#[derive(Debug, Default)]
pub struct ValidationResult {
    is_valid: bool,
    failure_type: ValidationFailureType,
    observed: AtomicBool,
    logs: SmallVec<[LogDetails; 2]>,
    details: Option<Arc<ExceptionDetails>>,
    error: OnceLock<TokenError>,
}

impl ValidationResult {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn mark_observed(&self) {
        self.observed.store(true, Ordering::Relaxed);
    }

    /// Whether validation succeeded. Marks the result observed.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.mark_observed();
        self.is_valid
    }

    #[inline]
    pub fn set_valid(&mut self, is_valid: bool) {
        self.is_valid = is_valid;
    }

    #[inline]
    pub fn failure_type(&self) -> ValidationFailureType {
        self.failure_type
    }

    /// Plain write; consistency with `is_valid` is the caller's job.
    #[inline]
    pub fn set_failure_type(&mut self, failure_type: ValidationFailureType) {
        self.failure_type = failure_type;
    }

    #[inline]
    pub fn has_been_observed(&self) -> bool {
        self.observed.load(Ordering::Relaxed)
    }

    /// Recorded logs in emission order.
    #[inline]
    pub fn logs(&self) -> &[LogDetails] {
        &self.logs
    }

    #[inline]
    pub fn push_log(&mut self, log: LogDetails) {
        self.logs.push(log);
    }

    #[inline]
    pub fn exception_details(&self) -> Option<&ExceptionDetails> {
        self.details.as_deref()
    }

    #[inline]
    pub fn set_exception_details(&mut self, details: ExceptionDetails) {
        self.details = Some(Arc::new(details));
    }

    /// Append a frame to the attached details.
    ///
    /// Returns `false` when there are no details. The details are shared
    /// with any error already materialized from them, so its trace gains
    /// the frame too.
    pub fn add_stack_frame(&self, frame: CallSite) -> bool {
        match self.details.as_deref() {
            Some(details) => {
                details.add_frame(frame);
                true
            }
            None => false,
        }
    }

    /// The directly-set error, if any. Marks the result observed.
    ///
    /// The base result never materializes from details.
    #[inline]
    pub fn error(&self) -> Option<&TokenError> {
        self.mark_observed();
        self.error.get()
    }

    /// Set the error directly, replacing any cached one.
    #[inline]
    pub fn set_error(&mut self, error: TokenError) {
        self.error = OnceLock::from(error);
    }

    /// Write recorded logs to `sink` in order. Returns how many were written.
    pub fn emit_logs(&self, sink: &dyn LogSink) -> usize {
        self.logs.iter().filter(|log| log.emit(sink)).count()
    }
}

impl ValidationOutcome for ValidationResult {
    #[inline]
    fn base(&self) -> &ValidationResult {
        self
    }

    #[inline]
    fn try_error(&self) -> Result<Option<&TokenError>, MaterializeError> {
        Ok(ValidationResult::error(self))
    }
}

// ============================================================================
// IssuerValidationResult
// ============================================================================

/// Result of issuer validation.
///
/// On first error read, details are materialized and an
/// [`InvalidIssuerError`](crate::InvalidIssuerError) gets the rejected
/// issuer, the details and [`SOURCE_TAG`] filled in.
#[derive(Debug, Default)]
pub struct IssuerValidationResult {
    base: ValidationResult,
    issuer: Option<String>,
}

impl IssuerValidationResult {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn succeeded(issuer: &str, logs: SmallVec<[LogDetails; 2]>) -> Self {
        let mut result = Self::new();
        result.base.set_valid(true);
        result.base.set_failure_type(ValidationFailureType::ValidationSucceeded);
        result.base.logs = logs;
        result.issuer = Some(issuer.to_owned());
        result
    }

    pub(crate) fn failed(
        failure_type: ValidationFailureType,
        details: Option<ExceptionDetails>,
        logs: SmallVec<[LogDetails; 2]>,
    ) -> Self {
        let mut result = Self::new();
        result.base.set_failure_type(failure_type);
        result.base.details = details.map(Arc::new);
        result.base.logs = logs;
        result
    }

    /// The validated (or rejected) issuer. Unset when the issuer was blank.
    #[inline]
    pub fn issuer(&self) -> Option<&str> {
        self.issuer.as_deref()
    }

    #[inline]
    pub fn set_issuer(&mut self, issuer: Option<String>) {
        self.issuer = issuer;
    }

    #[inline]
    pub fn base_mut(&mut self) -> &mut ValidationResult {
        &mut self.base
    }

    /// Re-report this failure from another call site.
    #[inline]
    pub fn add_stack_frame(&self, frame: CallSite) -> bool {
        self.base.add_stack_frame(frame)
    }
}

impl ValidationOutcome for IssuerValidationResult {
    #[inline]
    fn base(&self) -> &ValidationResult {
        &self.base
    }

    fn try_error(&self) -> Result<Option<&TokenError>, MaterializeError> {
        self.base.mark_observed();

        if let Some(error) = self.base.error.get() {
            return Ok(Some(error));
        }

        let Some(details) = self.base.details.as_ref() else {
            return Ok(None);
        };

        let mut error = details.get_exception()?;
        if let Some(issuer_error) = error.as_invalid_issuer_mut() {
            issuer_error.set_invalid_issuer(self.issuer.clone());
            issuer_error.attach_details(Arc::clone(details));
            issuer_error.set_source_tag(SOURCE_TAG);
        }

        Ok(Some(self.base.error.get_or_init(|| error)))
    }
}
