//! Failure descriptions that build their error on demand.
//!
//! An [`ExceptionDetails`] is everything needed to construct a [`TokenError`]
//! later: which kind of error, the (unrendered) message, an optional cause and
//! the call sites that reported the failure. Validators attach one to a failed
//! result instead of building the error. Construction happens in
//! [`ExceptionDetails::get_exception`], usually because a caller read
//! `result.error()`.
//!
//! # Construction Table
//!
//! Error kinds are mapped to constructors by an [`ErrorFactories`] table, not
//! by runtime type inspection. Each [`ErrorFactory`] may provide a
//! message-only constructor, a message-and-cause constructor, or both. Asking
//! for a shape the table does not have is a [`MaterializeError`]: a wiring
//! defect in the host, never a validation outcome.
//!
//! The process-wide table defaults to [`ErrorFactories::builtin`] and can be
//! replaced once, at startup, with [`ErrorFactories::install`].
//!
//! # Call Sites
//!
//! Frames are explicit [`CallSite`] records captured with [`call_site!`].
//! They are independent of the runtime stack, so an error materialized far
//! from the fault still reports where the fault was detected. A failure that
//! is re-reported from another place appends a frame; the combined trace
//! lists frames in append order.
//!
//! # Example
//!
//! ```rust
//! use palisade_validation::{
//!     call_site, definitions, ErrorKind, ExceptionDetails, MessageArg, MessageDetails,
//! };
//!
//! let details = ExceptionDetails::new(
//!     MessageDetails::new(
//!         &definitions::IDX10205,
//!         [
//!             MessageArg::text("evil"),
//!             MessageArg::text("good"),
//!             MessageArg::text("empty"),
//!             MessageArg::Null,
//!         ],
//!     ),
//!     ErrorKind::InvalidIssuer,
//!     call_site!(),
//! );
//! details.add_frame(call_site!());
//! assert_eq!(details.frames().len(), 2);
//!
//! let error = details.get_exception().unwrap();
//! assert!(error.to_string().starts_with("IDX10205:"));
//! ```

use crate::{
    InnerError, InvalidIssuerError, MessageDetails, SecurityTokenValidationError, TokenError,
};
use smallvec::SmallVec;
use std::fmt;
use std::panic::Location;
use std::sync::{Arc, OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

// ============================================================================
// Call Sites
// ============================================================================

/// A lightweight source location recorded when a failure is detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallSite {
    function: &'static str,
    file: &'static str,
    line: u32,
    column: u32,
}

impl CallSite {
    /// Explicit location. Prefer [`call_site!`].
    #[inline]
    pub const fn new(function: &'static str, file: &'static str, line: u32, column: u32) -> Self {
        Self {
            function,
            file,
            line,
            column,
        }
    }

    /// Record the caller's location, labelled with `function`.
    #[track_caller]
    #[inline]
    pub fn capture(function: &'static str) -> Self {
        let location = Location::caller();
        Self::new(function, location.file(), location.line(), location.column())
    }

    #[inline]
    pub const fn function(&self) -> &'static str {
        self.function
    }

    #[inline]
    pub const fn file(&self) -> &'static str {
        self.file
    }

    #[inline]
    pub const fn line(&self) -> u32 {
        self.line
    }

    #[inline]
    pub const fn column(&self) -> u32 {
        self.column
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at {} in {}:line {}", self.function, self.file, self.line)
    }
}

/// Capture the current source location as a [`CallSite`].
///
/// ```rust
/// let site = palisade_validation::call_site!();
/// assert!(site.file().ends_with(".rs"));
/// ```
#[macro_export]
macro_rules! call_site {
    () => {
        $crate::CallSite::capture(module_path!())
    };
}

// ============================================================================
// Error Kinds and Constructors
// ============================================================================

/// Identity of a constructible error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Generic token validation failure.
    SecurityTokenValidation,
    /// The token's issuer was missing or not trusted.
    InvalidIssuer,
}

impl ErrorKind {
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SecurityTokenValidation => "SecurityTokenValidation",
            Self::InvalidIssuer => "InvalidIssuer",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds an error from a rendered message.
pub type MessageConstructor = fn(String) -> TokenError;

/// Builds an error from a rendered message and its cause.
pub type InnerConstructor = fn(String, InnerError) -> TokenError;

/// Constructor shape requested during materialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstructorShape {
    Message,
    MessageAndInner,
}

impl fmt::Display for ConstructorShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message => f.write_str("(message)"),
            Self::MessageAndInner => f.write_str("(message, inner)"),
        }
    }
}

/// Constructors registered for one [`ErrorKind`].
#[derive(Clone, Copy)]
pub struct ErrorFactory {
    message: Option<MessageConstructor>,
    message_and_inner: Option<InnerConstructor>,
}

impl ErrorFactory {
    /// Factory supporting both constructor shapes.
    #[inline]
    pub const fn new(message: MessageConstructor, message_and_inner: InnerConstructor) -> Self {
        Self {
            message: Some(message),
            message_and_inner: Some(message_and_inner),
        }
    }

    /// Factory that cannot wrap a cause.
    #[inline]
    pub const fn message_only(message: MessageConstructor) -> Self {
        Self {
            message: Some(message),
            message_and_inner: None,
        }
    }

    /// Factory that requires a cause.
    #[inline]
    pub const fn inner_only(message_and_inner: InnerConstructor) -> Self {
        Self {
            message: None,
            message_and_inner: Some(message_and_inner),
        }
    }

    #[inline]
    pub const fn supports(&self, shape: ConstructorShape) -> bool {
        match shape {
            ConstructorShape::Message => self.message.is_some(),
            ConstructorShape::MessageAndInner => self.message_and_inner.is_some(),
        }
    }
}

impl fmt::Debug for ErrorFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorFactory")
            .field("message", &self.message.is_some())
            .field("message_and_inner", &self.message_and_inner.is_some())
            .finish()
    }
}

/// Materialization failed: the factory table cannot build the requested error.
///
/// This is a programming or wiring defect, not a validation result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaterializeError {
    /// No factory is registered for the kind.
    UnregisteredKind { kind: ErrorKind },
    /// A factory exists but lacks the needed constructor shape.
    MissingConstructor {
        kind: ErrorKind,
        shape: ConstructorShape,
    },
}

impl fmt::Display for MaterializeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnregisteredKind { kind } => {
                write!(f, "no error factory registered for kind '{}'", kind)
            }
            Self::MissingConstructor { kind, shape } => {
                write!(f, "error kind '{}' has no {} constructor", kind, shape)
            }
        }
    }
}

impl std::error::Error for MaterializeError {}

static INSTALLED_FACTORIES: OnceLock<ErrorFactories> = OnceLock::new();

/// Table from [`ErrorKind`] to [`ErrorFactory`].
#[derive(Debug, Clone, Default)]
pub struct ErrorFactories {
    entries: SmallVec<[(ErrorKind, ErrorFactory); 4]>,
}

impl ErrorFactories {
    /// Empty table.
    #[inline]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Table with the crate's error kinds registered.
    pub fn builtin() -> Self {
        Self::empty()
            .register(
                ErrorKind::SecurityTokenValidation,
                ErrorFactory::new(
                    |message| {
                        TokenError::SecurityTokenValidation(SecurityTokenValidationError::new(
                            message,
                        ))
                    },
                    |message, inner| {
                        TokenError::SecurityTokenValidation(
                            SecurityTokenValidationError::with_inner(message, inner),
                        )
                    },
                ),
            )
            .register(
                ErrorKind::InvalidIssuer,
                ErrorFactory::new(
                    |message| TokenError::InvalidIssuer(InvalidIssuerError::new(message)),
                    |message, inner| {
                        TokenError::InvalidIssuer(InvalidIssuerError::with_inner(message, inner))
                    },
                ),
            )
    }

    /// Register (or replace) the factory for `kind`.
    pub fn register(mut self, kind: ErrorKind, factory: ErrorFactory) -> Self {
        match self.entries.iter().position(|(k, _)| *k == kind) {
            Some(index) => self.entries[index].1 = factory,
            None => self.entries.push((kind, factory)),
        }
        self
    }

    #[inline]
    pub fn get(&self, kind: ErrorKind) -> Option<&ErrorFactory> {
        self.entries.iter().find(|(k, _)| *k == kind).map(|(_, f)| f)
    }

    /// Install this table process-wide.
    ///
    /// Succeeds only once, and only before the first materialization.
    /// On failure the rejected table is handed back.
    pub fn install(self) -> Result<(), ErrorFactories> {
        INSTALLED_FACTORIES.set(self)
    }

    /// The process-wide table; [`ErrorFactories::builtin`] unless one was installed.
    pub fn global() -> &'static ErrorFactories {
        INSTALLED_FACTORIES.get_or_init(Self::builtin)
    }

    /// Build the error described by `details`.
    ///
    /// The constructor is resolved before the message is rendered, so a
    /// wiring defect costs no formatting.
    pub fn materialize(&self, details: &ExceptionDetails) -> Result<TokenError, MaterializeError> {
        let kind = details.kind();
        let factory = self
            .get(kind)
            .ok_or(MaterializeError::UnregisteredKind { kind })?;

        match details.inner_error() {
            Some(inner) => {
                let construct = factory.message_and_inner.ok_or(
                    MaterializeError::MissingConstructor {
                        kind,
                        shape: ConstructorShape::MessageAndInner,
                    },
                )?;
                Ok(construct(details.message().render().to_owned(), Arc::clone(inner)))
            }
            None => {
                let construct = factory.message.ok_or(MaterializeError::MissingConstructor {
                    kind,
                    shape: ConstructorShape::Message,
                })?;
                Ok(construct(details.message().render().to_owned()))
            }
        }
    }
}

// ============================================================================
// Exception Details
// ============================================================================

/// Description of an error that may need to exist.
///
/// Shared behind an `Arc` by the result that recorded it and by the error
/// built from it, so frames appended later are seen by both.
pub struct ExceptionDetails {
    kind: ErrorKind,
    message: MessageDetails,
    inner: Option<InnerError>,
    /// Never empty: holds at least the originating call site.
    frames: RwLock<SmallVec<[CallSite; 2]>>,
}

impl ExceptionDetails {
    /// Describe an error of `kind` detected at `frame`.
    pub fn new(message: MessageDetails, kind: ErrorKind, frame: CallSite) -> Self {
        let mut frames = SmallVec::new();
        frames.push(frame);
        Self {
            kind,
            message,
            inner: None,
            frames: RwLock::new(frames),
        }
    }

    /// Describe an error of `kind` caused by `inner`.
    pub fn with_inner(
        message: MessageDetails,
        kind: ErrorKind,
        frame: CallSite,
        inner: InnerError,
    ) -> Self {
        let mut details = Self::new(message, kind, frame);
        details.inner = Some(inner);
        details
    }

    #[inline]
    fn read_frames(&self) -> RwLockReadGuard<'_, SmallVec<[CallSite; 2]>> {
        match self.frames.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[inline]
    fn write_frames(&self) -> RwLockWriteGuard<'_, SmallVec<[CallSite; 2]>> {
        match self.frames.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[inline]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[inline]
    pub const fn message(&self) -> &MessageDetails {
        &self.message
    }

    #[inline]
    pub fn inner_error(&self) -> Option<&InnerError> {
        self.inner.as_ref()
    }

    /// Snapshot of the captured frames, originating site first.
    pub fn frames(&self) -> SmallVec<[CallSite; 2]> {
        self.read_frames().clone()
    }

    #[inline]
    pub fn frame_count(&self) -> usize {
        self.read_frames().len()
    }

    /// Record another site that re-reported this failure.
    ///
    /// Visible to every holder of these details, including an error
    /// already built from them.
    #[inline]
    pub fn add_frame(&self, frame: CallSite) {
        self.write_frames().push(frame);
    }

    /// Combined trace, one `   at ...` line per frame in append order.
    pub fn stack_trace(&self) -> String {
        let frames = self.read_frames();
        let mut trace = String::with_capacity(frames.len() * 64);
        for frame in frames.iter() {
            trace.push_str("   ");
            trace.push_str(&frame.to_string());
            trace.push('\n');
        }
        trace
    }

    /// Build the error using the process-wide factory table.
    #[inline]
    pub fn get_exception(&self) -> Result<TokenError, MaterializeError> {
        self.get_exception_with(ErrorFactories::global())
    }

    /// Build the error using `factories`.
    #[inline]
    pub fn get_exception_with(
        &self,
        factories: &ErrorFactories,
    ) -> Result<TokenError, MaterializeError> {
        factories.materialize(self)
    }
}

impl Clone for ExceptionDetails {
    /// Deep copy; the clone's frames grow independently.
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            inner: self.inner.clone(),
            frames: RwLock::new(self.frames()),
        }
    }
}

impl fmt::Debug for ExceptionDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExceptionDetails")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .field("inner", &self.inner.as_ref().map(|e| e.to_string()))
            .field("frames", &*self.read_frames())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
