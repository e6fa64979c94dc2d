//! Concrete error types produced by validation.
//!
//! These are what a caller sees after materialization. Validators never
//! build them directly; they attach an [`ExceptionDetails`] and let the
//! result construct the error on first access.
//!
//! [`ArgumentNullError`] is the exception: a missing required argument is a
//! contract violation reported synchronously through `Err`, not a validation
//! outcome.

use crate::{ErrorKind, ExceptionDetails, MessageArg, MessageDetails, definitions};
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use zeroize::Zeroize;

/// Shared, thread-safe cause of a validation error.
pub type InnerError = Arc<dyn Error + Send + Sync + 'static>;

// ============================================================================
// SecurityTokenValidationError
// ============================================================================

/// Generic token validation failure.
#[derive(Debug, Clone)]
pub struct SecurityTokenValidationError {
    message: String,
    inner: Option<InnerError>,
    source_tag: Option<&'static str>,
}

impl SecurityTokenValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            inner: None,
            source_tag: None,
        }
    }

    pub fn with_inner(message: impl Into<String>, inner: InnerError) -> Self {
        Self {
            message: message.into(),
            inner: Some(inner),
            source_tag: None,
        }
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[inline]
    pub fn inner_error(&self) -> Option<&InnerError> {
        self.inner.as_ref()
    }

    #[inline]
    pub fn source_tag(&self) -> Option<&'static str> {
        self.source_tag
    }

    #[inline]
    pub fn set_source_tag(&mut self, tag: &'static str) {
        self.source_tag = Some(tag);
    }
}

impl fmt::Display for SecurityTokenValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for SecurityTokenValidationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.inner.as_deref().map(|e| e as &(dyn Error + 'static))
    }
}

impl Drop for SecurityTokenValidationError {
    fn drop(&mut self) {
        self.message.zeroize();
    }
}

// ============================================================================
// InvalidIssuerError
// ============================================================================

/// The token's issuer was missing or not trusted.
///
/// When produced by a validation result, the rejected issuer, the originating
/// [`ExceptionDetails`] and a source tag are filled in after construction.
#[derive(Debug, Clone)]
pub struct InvalidIssuerError {
    message: String,
    inner: Option<InnerError>,
    invalid_issuer: Option<String>,
    details: Option<Arc<ExceptionDetails>>,
    source_tag: Option<&'static str>,
}

impl InvalidIssuerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            inner: None,
            invalid_issuer: None,
            details: None,
            source_tag: None,
        }
    }

    pub fn with_inner(message: impl Into<String>, inner: InnerError) -> Self {
        let mut error = Self::new(message);
        error.inner = Some(inner);
        error
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[inline]
    pub fn inner_error(&self) -> Option<&InnerError> {
        self.inner.as_ref()
    }

    /// The issuer value that was rejected, if known.
    #[inline]
    pub fn invalid_issuer(&self) -> Option<&str> {
        self.invalid_issuer.as_deref()
    }

    pub fn set_invalid_issuer(&mut self, issuer: Option<String>) {
        if let Some(previous) = self.invalid_issuer.as_mut() {
            previous.zeroize();
        }
        self.invalid_issuer = issuer;
    }

    /// The description this error was built from.
    #[inline]
    pub fn exception_details(&self) -> Option<&Arc<ExceptionDetails>> {
        self.details.as_ref()
    }

    /// Attach the originating description.
    pub fn attach_details(&mut self, details: Arc<ExceptionDetails>) {
        self.details = Some(details);
    }

    #[inline]
    pub fn source_tag(&self) -> Option<&'static str> {
        self.source_tag
    }

    #[inline]
    pub fn set_source_tag(&mut self, tag: &'static str) {
        self.source_tag = Some(tag);
    }

    /// Call-site trace from the attached details, including frames added
    /// after this error was built.
    ///
    /// `None` when no details are attached.
    pub fn stack_trace(&self) -> Option<String> {
        self.details.as_ref().map(|details| details.stack_trace())
    }
}

impl fmt::Display for InvalidIssuerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for InvalidIssuerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.inner.as_deref().map(|e| e as &(dyn Error + 'static))
    }
}

impl Drop for InvalidIssuerError {
    fn drop(&mut self) {
        self.message.zeroize();
        if let Some(issuer) = self.invalid_issuer.as_mut() {
            issuer.zeroize();
        }
    }
}

// ============================================================================
// TokenError
// ============================================================================

/// Any error a validation result can materialize.
#[derive(Debug, Clone)]
pub enum TokenError {
    SecurityTokenValidation(SecurityTokenValidationError),
    InvalidIssuer(InvalidIssuerError),
}

impl TokenError {
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SecurityTokenValidation(_) => ErrorKind::SecurityTokenValidation,
            Self::InvalidIssuer(_) => ErrorKind::InvalidIssuer,
        }
    }

    #[inline]
    pub fn message(&self) -> &str {
        match self {
            Self::SecurityTokenValidation(e) => e.message(),
            Self::InvalidIssuer(e) => e.message(),
        }
    }

    #[inline]
    pub fn source_tag(&self) -> Option<&'static str> {
        match self {
            Self::SecurityTokenValidation(e) => e.source_tag(),
            Self::InvalidIssuer(e) => e.source_tag(),
        }
    }

    #[inline]
    pub fn set_source_tag(&mut self, tag: &'static str) {
        match self {
            Self::SecurityTokenValidation(e) => e.set_source_tag(tag),
            Self::InvalidIssuer(e) => e.set_source_tag(tag),
        }
    }

    #[inline]
    pub fn inner_error(&self) -> Option<&InnerError> {
        match self {
            Self::SecurityTokenValidation(e) => e.inner_error(),
            Self::InvalidIssuer(e) => e.inner_error(),
        }
    }

    #[inline]
    pub fn as_invalid_issuer(&self) -> Option<&InvalidIssuerError> {
        match self {
            Self::InvalidIssuer(e) => Some(e),
            _ => None,
        }
    }

    #[inline]
    pub fn as_invalid_issuer_mut(&mut self) -> Option<&mut InvalidIssuerError> {
        match self {
            Self::InvalidIssuer(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SecurityTokenValidation(e) => fmt::Display::fmt(e, f),
            Self::InvalidIssuer(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl Error for TokenError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::SecurityTokenValidation(e) => e.source(),
            Self::InvalidIssuer(e) => e.source(),
        }
    }
}

// ============================================================================
// ArgumentNullError
// ============================================================================

/// A required argument was absent.
///
/// ```rust
/// use palisade_validation::ArgumentNullError;
///
/// let err = ArgumentNullError::new("validation_parameters");
/// assert_eq!(err.parameter(), "validation_parameters");
/// assert!(err.to_string().contains("'validation_parameters'"));
/// ```
#[derive(Debug, Clone)]
pub struct ArgumentNullError {
    parameter: &'static str,
    message: MessageDetails,
}

impl ArgumentNullError {
    pub fn new(parameter: &'static str) -> Self {
        Self {
            parameter,
            message: MessageDetails::new(&definitions::IDX10000, [MessageArg::text(parameter)]),
        }
    }

    /// Name of the missing parameter.
    #[inline]
    pub fn parameter(&self) -> &'static str {
        self.parameter
    }
}

impl PartialEq for ArgumentNullError {
    fn eq(&self, other: &Self) -> bool {
        self.parameter == other.parameter
    }
}

impl Eq for ArgumentNullError {}

impl fmt::Display for ArgumentNullError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message.render())
    }
}

impl Error for ArgumentNullError {}
