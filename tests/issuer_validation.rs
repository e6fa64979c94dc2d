//! Integration tests for issuer validation and deferred error materialization.

use async_trait::async_trait;
use palisade_validation::{
    ConfigurationError, ConfigurationProvider, IssuerValidationResult, LogLevel, RingBufferSink,
    SOURCE_TAG, SecurityToken, StaticConfigurationProvider, TrustedConfiguration,
    ValidationFailureType, ValidationOutcome, ValidationParameters, call_site, validate_issuer,
    validate_token_issuer,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

// ============================================================================
// Fixtures
// ============================================================================

struct Jwt {
    iss: Option<String>,
}

impl Jwt {
    fn issued_by(iss: &str) -> Self {
        Self {
            iss: Some(iss.to_string()),
        }
    }
}

impl SecurityToken for Jwt {
    fn issuer(&self) -> Option<&str> {
        self.iss.as_deref()
    }
}

/// Provider that fails every call.
struct FailingProvider;

#[async_trait]
impl ConfigurationProvider for FailingProvider {
    async fn trusted_configuration(&self) -> Result<TrustedConfiguration, ConfigurationError> {
        Err(ConfigurationError::retrieval_with_source(
            "metadata endpoint returned 503",
            Arc::new(std::io::Error::other("service unavailable")),
        ))
    }
}

/// Provider that never answers. Records when its in-flight call is dropped.
struct HangingProvider {
    started: Arc<AtomicUsize>,
    dropped: Arc<AtomicBool>,
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConfigurationProvider for HangingProvider {
    async fn trusted_configuration(&self) -> Result<TrustedConfiguration, ConfigurationError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        let _flag = DropFlag(Arc::clone(&self.dropped));
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(TrustedConfiguration::new("too-late"))
    }
}

async fn validate(issuer: &str, params: &ValidationParameters) -> IssuerValidationResult {
    let token = Jwt::issued_by(issuer);
    validate_issuer(Some(issuer), Some(&token), Some(params))
        .await
        .expect("arguments are present")
}

// ============================================================================
// Success Paths
// ============================================================================

#[tokio::test]
async fn matches_configuration_issuer() {
    let params = ValidationParameters::new().with_configuration_provider(Arc::new(
        StaticConfigurationProvider::new("https://metadata.example"),
    ));

    let result = validate("https://metadata.example", &params).await;
    assert!(result.is_valid());
    assert_eq!(result.failure_type(), ValidationFailureType::ValidationSucceeded);
    assert_eq!(result.issuer(), Some("https://metadata.example"));
    assert!(result.error().is_none());
}

#[tokio::test]
async fn matches_single_issuer() {
    let params = ValidationParameters::new().with_valid_issuer("https://login.example");

    let result = validate("https://login.example", &params).await;
    assert!(result.is_valid());
    assert_eq!(result.issuer(), Some("https://login.example"));
    assert!(result.error().is_none());
}

#[tokio::test]
async fn matches_list_entry_after_skipping_empty() {
    let params = ValidationParameters::new().with_valid_issuers(["a", "", "b"]);

    let result = validate("b", &params).await;
    assert!(result.is_valid());
    assert_eq!(result.failure_type(), ValidationFailureType::ValidationSucceeded);

    // One skip notice, then the success log.
    let codes: Vec<u32> = result.logs().iter().map(|l| l.message().template().code()).collect();
    assert_eq!(codes, vec![10262, 10236]);
}

#[tokio::test]
async fn first_list_match_short_circuits() {
    let params = ValidationParameters::new().with_valid_issuers(["x", "", "x"]);

    let result = validate("x", &params).await;
    assert!(result.is_valid());
    // The second empty-entry skip is never reached.
    assert_eq!(result.logs().len(), 1);
}

#[tokio::test]
async fn validate_token_issuer_reads_claim() {
    let params = ValidationParameters::new().with_valid_issuer("iss");
    let result = validate_token_issuer(&Jwt::issued_by("iss"), &params).await.unwrap();
    assert!(result.is_valid());

    let missing = validate_token_issuer(&Jwt { iss: None }, &params).await.unwrap();
    assert_eq!(missing.failure_type(), ValidationFailureType::NullArgument);
}

// ============================================================================
// Failure Paths
// ============================================================================

#[tokio::test]
async fn matching_is_case_sensitive() {
    let params = ValidationParameters::new().with_valid_issuer("Example");

    let result = validate("example", &params).await;
    assert!(!result.is_valid());
    assert_eq!(result.failure_type(), ValidationFailureType::IssuerValidationFailed);
}

#[tokio::test]
async fn no_partial_matching() {
    let params = ValidationParameters::new()
        .with_valid_issuer("https://login.example")
        .with_valid_issuers(["https://login.example/tenant"]);

    for candidate in ["https://login.example/", "https://login", " https://login.example"] {
        let result = validate(candidate, &params).await;
        assert!(!result.is_valid(), "{candidate:?} must not match");
    }
}

#[tokio::test]
async fn blank_issuer_is_null_argument_even_when_trusted_issuers_exist() {
    let params = ValidationParameters::new()
        .with_valid_issuer("good")
        .with_valid_issuers(["a"]);
    let token = Jwt::issued_by("good");

    for blank in ["", " ", "\t\n"] {
        let result = validate_issuer(Some(blank), Some(&token), Some(&params)).await.unwrap();
        assert!(!result.is_valid());
        assert_eq!(result.failure_type(), ValidationFailureType::NullArgument);
        assert!(result.issuer().is_none());
        assert!(result.error().unwrap().message().starts_with("IDX10211:"));
    }

    let result = validate_issuer(None, Some(&token), Some(&params)).await.unwrap();
    assert_eq!(result.failure_type(), ValidationFailureType::NullArgument);
}

#[tokio::test]
async fn no_trust_source_fails_without_details() {
    let params = ValidationParameters::new();

    let result = validate("anything", &params).await;
    assert!(!result.is_valid());
    assert_eq!(result.failure_type(), ValidationFailureType::IssuerValidationFailed);
    assert!(result.exception_details().is_none());
    assert!(result.error().is_none());

    // The cause is still recorded.
    assert_eq!(result.logs().len(), 1);
    assert_eq!(result.logs()[0].level(), LogLevel::Warning);
    assert_eq!(result.logs()[0].message().template().code(), 10204);
}

#[tokio::test]
async fn mismatch_materializes_invalid_issuer_error() {
    let params = ValidationParameters::new()
        .with_valid_issuer("good-issuer")
        .with_valid_issuers(["a", "", "b"]);

    let result = validate("evil-issuer", &params).await;
    assert!(!result.is_valid());
    assert_eq!(result.failure_type(), ValidationFailureType::IssuerValidationFailed);
    assert_eq!(result.issuer(), Some("evil-issuer"));

    let details = result.exception_details().unwrap();
    assert!(!details.message().is_rendered());

    let error = result.error().unwrap();
    let issuer_error = error.as_invalid_issuer().unwrap();
    assert_eq!(issuer_error.invalid_issuer(), Some("evil-issuer"));
    assert_eq!(issuer_error.source_tag(), Some(SOURCE_TAG));
    assert!(issuer_error.message().contains("evil-issuer"));
    assert!(issuer_error.message().contains("good-issuer"));
    assert!(issuer_error.message().contains("a,b"));
    assert!(std::error::Error::source(error).is_none());

    let trace = issuer_error.stack_trace().unwrap();
    assert!(trace.contains("issuer.rs"));
}

#[tokio::test]
async fn mismatch_without_single_issuer_renders_null() {
    let params = ValidationParameters::new().with_valid_issuers(["a"]);

    let result = validate("z", &params).await;
    let message = result.error().unwrap().message().to_string();
    assert!(message.contains("valid_issuer: 'null'"));
    assert!(message.contains("valid_issuers: 'a'"));
}

#[tokio::test]
async fn error_is_materialized_once() {
    let params = ValidationParameters::new().with_valid_issuer("good");
    let result = validate("bad", &params).await;

    let first = result.error().unwrap();
    let second = result.error().unwrap();
    assert!(std::ptr::eq(first, second));
}

#[tokio::test]
async fn re_reported_failure_carries_extra_frame() {
    let params = ValidationParameters::new().with_valid_issuer("good");
    let result = validate("bad", &params).await;

    assert!(result.add_stack_frame(call_site!()));

    let trace = result.error().unwrap().as_invalid_issuer().unwrap().stack_trace().unwrap();
    let lines: Vec<&str> = trace.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("issuer.rs"));
    assert!(lines[1].contains("issuer_validation.rs"));
}

#[tokio::test]
async fn frame_added_after_error_is_read_shows_in_its_trace() {
    let params = ValidationParameters::new().with_valid_issuer("good");
    let result = validate("bad", &params).await;

    let error = result.error().unwrap().as_invalid_issuer().unwrap();
    assert_eq!(error.stack_trace().unwrap().lines().count(), 1);

    assert!(result.add_stack_frame(call_site!()));
    assert!(result.add_stack_frame(call_site!()));

    let trace = error.stack_trace().unwrap();
    let lines: Vec<&str> = trace.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains("issuer.rs"));
    assert!(lines[2].contains("issuer_validation.rs"));
    assert_eq!(result.exception_details().unwrap().frame_count(), 3);
}

// ============================================================================
// Observation Tracking
// ============================================================================

#[tokio::test]
async fn unread_result_is_unobserved() {
    let params = ValidationParameters::new().with_valid_issuer("good");
    let result = validate("bad", &params).await;

    assert!(!result.has_been_observed());
    let _ = result.failure_type();
    let _ = result.issuer();
    assert!(!result.has_been_observed());

    assert!(!result.is_valid());
    assert!(result.has_been_observed());
}

#[tokio::test]
async fn reading_error_alone_marks_observed() {
    let params = ValidationParameters::new().with_valid_issuer("good");
    let result = validate("good", &params).await;

    assert!(result.error().is_none());
    assert!(result.has_been_observed());
}

// ============================================================================
// Preconditions
// ============================================================================

#[tokio::test]
async fn missing_parameters_or_token_is_an_error() {
    let token = Jwt::issued_by("iss");
    let err = validate_issuer(Some("iss"), Some(&token), None).await.unwrap_err();
    assert_eq!(err.parameter(), "validation_parameters");
    assert!(err.to_string().starts_with("IDX10000:"));

    let params = ValidationParameters::new().with_valid_issuer("iss");
    let err = validate_issuer(Some("iss"), None, Some(&params)).await.unwrap_err();
    assert_eq!(err.parameter(), "security_token");
}

// ============================================================================
// Configuration Retrieval
// ============================================================================

#[tokio::test]
async fn configuration_issuer_is_authoritative_over_static() {
    let params = ValidationParameters::new()
        .with_valid_issuer("static")
        .with_configuration_provider(Arc::new(StaticConfigurationProvider::new("meta")));

    assert!(validate("meta", &params).await.is_valid());
    assert!(validate("static", &params).await.is_valid());
    assert!(!validate("other", &params).await.is_valid());
}

#[tokio::test]
async fn empty_configuration_issuer_is_no_trust() {
    let params = ValidationParameters::new().with_configuration_provider(Arc::new(
        StaticConfigurationProvider::from_configuration(TrustedConfiguration::default()),
    ));

    let result = validate("x", &params).await;
    assert_eq!(result.failure_type(), ValidationFailureType::IssuerValidationFailed);
    assert!(result.error().is_none());
}

#[tokio::test]
async fn retrieval_failure_falls_back_to_static_trust() {
    let params = ValidationParameters::new()
        .with_valid_issuer("good")
        .with_configuration_provider(Arc::new(FailingProvider));

    let result = validate("good", &params).await;
    assert!(result.is_valid());
    assert_eq!(result.logs()[0].level(), LogLevel::Warning);
    assert!(result.logs()[0].message().render().contains("503"));
}

#[tokio::test]
async fn retrieval_failure_becomes_inner_error_of_mismatch() {
    let params = ValidationParameters::new()
        .with_valid_issuer("good")
        .with_configuration_provider(Arc::new(FailingProvider));

    let result = validate("bad", &params).await;
    let error = result.error().unwrap();
    assert!(error.as_invalid_issuer().is_some());

    let inner = std::error::Error::source(error).unwrap();
    assert!(inner.to_string().contains("metadata endpoint returned 503"));
    assert_eq!(inner.source().unwrap().to_string(), "service unavailable");
}

/// The provider receives no cancellation token. Dropping the validation
/// future is what cancels the in-flight retrieval.
#[tokio::test(start_paused = true)]
async fn dropping_the_future_cancels_retrieval() {
    let started = Arc::new(AtomicUsize::new(0));
    let dropped = Arc::new(AtomicBool::new(false));
    let params = ValidationParameters::new()
        .with_valid_issuer("good")
        .with_configuration_provider(Arc::new(HangingProvider {
            started: Arc::clone(&started),
            dropped: Arc::clone(&dropped),
        }));
    let token = Jwt::issued_by("good");

    let outcome = tokio::time::timeout(
        Duration::from_millis(50),
        validate_issuer(Some("good"), Some(&token), Some(&params)),
    )
    .await;

    assert!(outcome.is_err());
    assert_eq!(started.load(Ordering::SeqCst), 1);
    assert!(dropped.load(Ordering::SeqCst));
}

#[cfg(feature = "tokio")]
#[tokio::test(start_paused = true)]
async fn configured_timeout_bounds_retrieval() {
    let started = Arc::new(AtomicUsize::new(0));
    let dropped = Arc::new(AtomicBool::new(false));
    let params = ValidationParameters::new()
        .with_valid_issuer("good")
        .with_configuration_timeout(Duration::from_millis(100))
        .with_configuration_provider(Arc::new(HangingProvider {
            started: Arc::clone(&started),
            dropped: Arc::clone(&dropped),
        }));

    let result = validate("bad", &params).await;
    assert!(dropped.load(Ordering::SeqCst));
    assert!(result.logs()[0].message().render().contains("timed out"));

    let inner = std::error::Error::source(result.error().unwrap()).unwrap();
    assert!(inner.to_string().contains("timed out after 100ms"));
}

// ============================================================================
// Logging
// ============================================================================

#[tokio::test]
async fn logs_are_flushed_to_configured_sink() {
    let sink = RingBufferSink::new(16, 512, LogLevel::Verbose);
    let params = ValidationParameters::new()
        .with_valid_issuers(["", "iss"])
        .with_log_sink(Arc::new(sink.clone()));

    let result = validate("iss", &params).await;
    assert!(result.is_valid());

    let entries = sink.get_all();
    assert_eq!(entries.len(), 2);
    assert!(entries[0].message.starts_with("IDX10262:"));
    assert_eq!(entries[1].message.as_ref(), "IDX10236: Issuer Validated.Issuer: 'iss'");
}

#[tokio::test]
async fn sink_level_filters_before_rendering() {
    let sink = RingBufferSink::new(16, 512, LogLevel::Warning);
    let params = ValidationParameters::new()
        .with_valid_issuer("iss")
        .with_log_sink(Arc::new(sink.clone()));

    let result = validate("iss", &params).await;
    assert!(sink.is_empty());
    assert!(!result.logs()[0].message().is_rendered());
}

#[tokio::test]
async fn logs_can_be_emitted_later() {
    let params = ValidationParameters::new();
    let result = validate("x", &params).await;

    let sink = RingBufferSink::new(4, 512, LogLevel::Informational);
    assert_eq!(result.emit_logs(&sink), 1);
    assert_eq!(sink.get_recent(1)[0].level, LogLevel::Warning);
}

// ============================================================================
// Serde
// ============================================================================

#[cfg(feature = "serde")]
mod serde_config {
    use super::*;
    use palisade_validation::TrustedIssuers;

    #[tokio::test]
    async fn trusted_issuers_load_from_json() {
        let trusted: TrustedIssuers = serde_json::from_str(
            r#"{ "valid_issuer": "https://login.example", "valid_issuers": ["a", "b"] }"#,
        )
        .unwrap();

        let params = ValidationParameters::from(trusted);
        assert!(validate("b", &params).await.is_valid());
    }

    #[test]
    fn missing_fields_default() {
        let trusted: TrustedIssuers = serde_json::from_str("{}").unwrap();
        assert_eq!(trusted, TrustedIssuers::default());

        let config: TrustedConfiguration = serde_json::from_str("{}").unwrap();
        assert_eq!(config.issuer(), None);
    }
}
