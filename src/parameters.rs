//! Validation inputs: trusted issuers, configuration source and log sink.
//!
//! Trust comes from up to three places, consulted in this order:
//!
//! 1. the issuer advertised by a [`ConfigurationProvider`] (usually remote
//!    metadata, retrieved asynchronously)
//! 2. a single static issuer
//! 3. a static issuer list
//!
//! Static trust can be loaded from configuration files through
//! [`TrustedIssuers`] when the `serde` feature is enabled.
//!
//! # Retrieval Timeout
//!
//! With the `tokio` feature (preferred) or `async_std`, a timeout set through
//! [`ValidationParameters::with_configuration_timeout`] bounds the provider
//! call. Without either feature the timeout is ignored and the provider runs
//! to completion. Dropping the validation future drops the retrieval in
//! every case.

use crate::{InnerError, LogSink};
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Configuration Provider
// ============================================================================

/// Trust data published by a configuration source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrustedConfiguration {
    /// Issuer advertised by the source. Missing or empty means no trust.
    #[cfg_attr(feature = "serde", serde(default))]
    pub issuer: Option<String>,
}

impl TrustedConfiguration {
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: Some(issuer.into()),
        }
    }

    /// Advertised issuer, `None` when absent or empty.
    #[inline]
    pub fn issuer(&self) -> Option<&str> {
        self.issuer.as_deref().filter(|issuer| !issuer.is_empty())
    }
}

/// Why trusted configuration could not be obtained.
#[derive(Debug, Clone)]
pub enum ConfigurationError {
    /// The source failed (network, parse, ...).
    Retrieval {
        message: String,
        source: Option<InnerError>,
    },
    /// The source did not answer within the configured bound.
    TimedOut(Duration),
}

impl ConfigurationError {
    pub fn retrieval(message: impl Into<String>) -> Self {
        Self::Retrieval {
            message: message.into(),
            source: None,
        }
    }

    pub fn retrieval_with_source(message: impl Into<String>, source: InnerError) -> Self {
        Self::Retrieval {
            message: message.into(),
            source: Some(source),
        }
    }
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Retrieval { message, .. } => {
                write!(f, "configuration retrieval failed: {}", message)
            }
            Self::TimedOut(limit) => {
                write!(f, "configuration retrieval timed out after {:?}", limit)
            }
        }
    }
}

impl std::error::Error for ConfigurationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Retrieval {
                source: Some(source),
                ..
            } => Some(source.as_ref() as &(dyn std::error::Error + 'static)),
            _ => None,
        }
    }
}

/// Source of trusted configuration, typically backed by remote metadata.
///
/// Implementations may perform network I/O. They receive no cancellation
/// token; the validator cancels by dropping the returned future.
#[async_trait]
pub trait ConfigurationProvider: Send + Sync {
    async fn trusted_configuration(&self) -> Result<TrustedConfiguration, ConfigurationError>;
}

/// Provider that always returns the same configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticConfigurationProvider {
    configuration: TrustedConfiguration,
}

impl StaticConfigurationProvider {
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            configuration: TrustedConfiguration::new(issuer),
        }
    }

    pub fn from_configuration(configuration: TrustedConfiguration) -> Self {
        Self { configuration }
    }
}

#[async_trait]
impl ConfigurationProvider for StaticConfigurationProvider {
    async fn trusted_configuration(&self) -> Result<TrustedConfiguration, ConfigurationError> {
        Ok(self.configuration.clone())
    }
}

// ============================================================================
// Static Trust
// ============================================================================

/// Statically configured issuers, loadable from config files.
///
/// ```rust
/// use palisade_validation::{TrustedIssuers, ValidationParameters};
///
/// let trusted = TrustedIssuers {
///     valid_issuer: Some("https://login.example".into()),
///     valid_issuers: vec!["https://a.example".into()],
/// };
/// let params = ValidationParameters::from(trusted);
/// assert_eq!(params.valid_issuer(), Some("https://login.example"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TrustedIssuers {
    pub valid_issuer: Option<String>,
    pub valid_issuers: Vec<String>,
}

// ============================================================================
// ValidationParameters
// ============================================================================

/// Everything issuer validation consults.
///
/// ```rust
/// use palisade_validation::{StaticConfigurationProvider, ValidationParameters};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let params = ValidationParameters::new()
///     .with_valid_issuer("https://login.example")
///     .with_valid_issuers(["https://a.example", "https://b.example"])
///     .with_configuration_provider(Arc::new(StaticConfigurationProvider::new(
///         "https://metadata.example",
///     )))
///     .with_configuration_timeout(Duration::from_secs(2));
///
/// assert_eq!(params.valid_issuers().len(), 2);
/// assert!(params.configuration_provider().is_some());
/// ```
#[derive(Clone, Default)]
pub struct ValidationParameters {
    valid_issuer: Option<String>,
    valid_issuers: Vec<String>,
    configuration_provider: Option<Arc<dyn ConfigurationProvider>>,
    log_sink: Option<Arc<dyn LogSink>>,
    configuration_timeout: Option<Duration>,
}

impl ValidationParameters {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_valid_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.valid_issuer = Some(issuer.into());
        self
    }

    /// Replace the issuer list. Order is the match order.
    pub fn with_valid_issuers<I, S>(mut self, issuers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.valid_issuers = issuers.into_iter().map(Into::into).collect();
        self
    }

    pub fn add_valid_issuer(&mut self, issuer: impl Into<String>) {
        self.valid_issuers.push(issuer.into());
    }

    pub fn with_configuration_provider(mut self, provider: Arc<dyn ConfigurationProvider>) -> Self {
        self.configuration_provider = Some(provider);
        self
    }

    /// Sink that receives the result's logs before `validate_issuer` returns.
    pub fn with_log_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.log_sink = Some(sink);
        self
    }

    pub fn with_configuration_timeout(mut self, timeout: Duration) -> Self {
        self.configuration_timeout = Some(timeout);
        self
    }

    #[inline]
    pub fn valid_issuer(&self) -> Option<&str> {
        self.valid_issuer.as_deref()
    }

    #[inline]
    pub fn valid_issuers(&self) -> &[String] {
        &self.valid_issuers
    }

    #[inline]
    pub fn configuration_provider(&self) -> Option<&Arc<dyn ConfigurationProvider>> {
        self.configuration_provider.as_ref()
    }

    #[inline]
    pub fn log_sink(&self) -> Option<&Arc<dyn LogSink>> {
        self.log_sink.as_ref()
    }

    #[inline]
    pub fn configuration_timeout(&self) -> Option<Duration> {
        self.configuration_timeout
    }

    /// Retrieve trusted configuration, if a provider is set.
    ///
    /// This is the only suspension point of issuer validation.
    pub(crate) async fn fetch_configuration(
        &self,
    ) -> Option<Result<TrustedConfiguration, ConfigurationError>> {
        let provider = self.configuration_provider.as_ref()?;
        let retrieval = provider.trusted_configuration();
        Some(match self.configuration_timeout {
            Some(limit) => bounded(retrieval, limit).await,
            None => retrieval.await,
        })
    }
}

impl fmt::Debug for ValidationParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationParameters")
            .field("valid_issuer", &self.valid_issuer)
            .field("valid_issuers", &self.valid_issuers)
            .field("configuration_provider", &self.configuration_provider.is_some())
            .field("log_sink", &self.log_sink.is_some())
            .field("configuration_timeout", &self.configuration_timeout)
            .finish()
    }
}

impl From<TrustedIssuers> for ValidationParameters {
    fn from(trusted: TrustedIssuers) -> Self {
        Self {
            valid_issuer: trusted.valid_issuer,
            valid_issuers: trusted.valid_issuers,
            ..Self::default()
        }
    }
}

/// Run `retrieval` with an upper bound on wall time.
async fn bounded<F>(retrieval: F, limit: Duration) -> Result<TrustedConfiguration, ConfigurationError>
where
    F: Future<Output = Result<TrustedConfiguration, ConfigurationError>>,
{
    #[cfg(feature = "tokio")]
    {
        tokio::time::timeout(limit, retrieval)
            .await
            .unwrap_or(Err(ConfigurationError::TimedOut(limit)))
    }

    #[cfg(all(feature = "async_std", not(feature = "tokio")))]
    {
        async_std::future::timeout(limit, retrieval)
            .await
            .unwrap_or(Err(ConfigurationError::TimedOut(limit)))
    }

    #[cfg(not(any(feature = "tokio", feature = "async_std")))]
    {
        let _ = limit;
        retrieval.await
    }
}
