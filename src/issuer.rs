//! Issuer validation.
//!
//! Decides whether a token's issuer is trusted and returns an
//! [`IssuerValidationResult`]. Failures are described, not raised: the result
//! carries an [`ExceptionDetails`] and the error is built only if a caller
//! reads it. The only `Err` this module returns is [`ArgumentNullError`], for
//! missing parameters or token.
//!
//! # Matching Rules
//!
//! - Comparison is exact, ordinal and case-sensitive. No trimming, no
//!   prefix or substring matching
//! - The configuration issuer is checked first, then the single static
//!   issuer, then the list in order
//! - Empty list entries are skipped with an informational log
//!
//! # Configuration Failures
//!
//! A provider error does not abort validation. It is logged as a warning and
//! validation continues without a configuration issuer. If the issuer then
//! fails to match, the provider error becomes the inner error of the
//! mismatch.

use crate::convenience::{join_issuers, sanitize};
use crate::{
    ArgumentNullError, ErrorKind, ExceptionDetails, InnerError, IssuerValidationResult,
    LogDetails, LogLevel, MessageArg, MessageDetails, TrustedConfiguration, ValidationFailureType,
    ValidationOutcome, ValidationParameters, call_site, definitions,
};
use smallvec::SmallVec;
use std::sync::Arc;

type Logs = SmallVec<[LogDetails; 2]>;

/// A token whose issuer can be validated.
pub trait SecurityToken: Send + Sync {
    /// The issuer claim, if present.
    fn issuer(&self) -> Option<&str>;
}

/// Validate `issuer` against the trust sources in `parameters`.
///
/// A blank issuer fails with [`ValidationFailureType::NullArgument`] before
/// the other arguments are checked. Missing `parameters` or `token` is a
/// precondition violation and returns `Err`.
///
/// The only suspension point is configuration retrieval. Dropping the
/// returned future cancels it.
///
/// # Example
///
/// ```rust
/// use palisade_validation::{
///     validate_issuer, SecurityToken, ValidationFailureType, ValidationOutcome,
///     ValidationParameters,
/// };
///
/// struct Token;
/// impl SecurityToken for Token {
///     fn issuer(&self) -> Option<&str> {
///         Some("https://login.example")
///     }
/// }
///
/// # tokio_test_block_on(async {
/// let params = ValidationParameters::new().with_valid_issuer("https://login.example");
/// let result = validate_issuer(Some("https://login.example"), Some(&Token), Some(&params))
///     .await
///     .unwrap();
///
/// assert!(result.is_valid());
/// assert_eq!(result.failure_type(), ValidationFailureType::ValidationSucceeded);
/// assert!(result.error().is_none());
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
pub async fn validate_issuer(
    issuer: Option<&str>,
    token: Option<&dyn SecurityToken>,
    parameters: Option<&ValidationParameters>,
) -> Result<IssuerValidationResult, ArgumentNullError> {
    let Some(issuer) = issuer.filter(|issuer| !is_blank(issuer)) else {
        return Ok(IssuerValidationResult::failed(
            ValidationFailureType::NullArgument,
            Some(ExceptionDetails::new(
                MessageDetails::bare(&definitions::IDX10211),
                ErrorKind::InvalidIssuer,
                call_site!(),
            )),
            Logs::new(),
        ));
    };

    let parameters = parameters.ok_or_else(|| ArgumentNullError::new("validation_parameters"))?;
    if token.is_none() {
        return Err(ArgumentNullError::new("security_token"));
    }

    let mut logs = Logs::new();
    let mut retrieval_error: Option<InnerError> = None;

    let configuration = match parameters.fetch_configuration().await {
        Some(Ok(configuration)) => Some(configuration),
        Some(Err(error)) => {
            logs.push(LogDetails::new(
                MessageDetails::new(&definitions::IDX10270, [MessageArg::text(error.to_string())]),
                LogLevel::Warning,
            ));
            retrieval_error = Some(Arc::new(error));
            None
        }
        None => None,
    };
    let configuration_issuer = configuration
        .as_ref()
        .and_then(TrustedConfiguration::issuer)
        .filter(|issuer| !is_blank(issuer));

    if parameters.valid_issuer().is_none_or(is_blank)
        && parameters.valid_issuers().is_empty()
        && configuration_issuer.is_none()
    {
        logs.push(LogDetails::new(
            MessageDetails::bare(&definitions::IDX10204),
            LogLevel::Warning,
        ));
        return Ok(flush(
            IssuerValidationResult::failed(ValidationFailureType::IssuerValidationFailed, None, logs),
            parameters,
        ));
    }

    if configuration_issuer == Some(issuer) {
        return Ok(flush(validated(issuer, logs), parameters));
    }

    if parameters.valid_issuer() == Some(issuer) {
        return Ok(flush(validated(issuer, logs), parameters));
    }

    for candidate in parameters.valid_issuers() {
        if candidate.is_empty() {
            logs.push(LogDetails::new(
                MessageDetails::bare(&definitions::IDX10262),
                LogLevel::Informational,
            ));
            continue;
        }

        if candidate == issuer {
            return Ok(flush(validated(issuer, logs), parameters));
        }
    }

    let message = MessageDetails::new(
        &definitions::IDX10205,
        [
            MessageArg::text(sanitize(issuer).into_owned()),
            MessageArg::optional(parameters.valid_issuer().map(|v| sanitize(v).into_owned())),
            MessageArg::text(join_issuers(parameters.valid_issuers())),
            MessageArg::optional(configuration_issuer.map(|c| sanitize(c).into_owned())),
        ],
    );
    let details = match retrieval_error {
        Some(inner) => {
            ExceptionDetails::with_inner(message, ErrorKind::InvalidIssuer, call_site!(), inner)
        }
        None => ExceptionDetails::new(message, ErrorKind::InvalidIssuer, call_site!()),
    };

    let mut result = IssuerValidationResult::failed(
        ValidationFailureType::IssuerValidationFailed,
        Some(details),
        logs,
    );
    result.set_issuer(Some(issuer.to_owned()));
    Ok(flush(result, parameters))
}

/// Validate the issuer claim carried by `token`.
pub async fn validate_token_issuer(
    token: &dyn SecurityToken,
    parameters: &ValidationParameters,
) -> Result<IssuerValidationResult, ArgumentNullError> {
    validate_issuer(token.issuer(), Some(token), Some(parameters)).await
}

#[inline]
fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn validated(issuer: &str, mut logs: Logs) -> IssuerValidationResult {
    logs.push(LogDetails::new(
        MessageDetails::new(
            &definitions::IDX10236,
            [MessageArg::text(sanitize(issuer).into_owned())],
        ),
        LogLevel::Informational,
    ));
    IssuerValidationResult::succeeded(issuer, logs)
}

fn flush(result: IssuerValidationResult, parameters: &ValidationParameters) -> IssuerValidationResult {
    if let Some(sink) = parameters.log_sink() {
        result.emit_logs(sink.as_ref());
    }
    result
}
