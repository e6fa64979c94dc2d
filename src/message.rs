//! Deferred message rendering.
//!
//! A [`MessageDetails`] binds a catalog template to its positional arguments.
//! Nothing is formatted at construction: the text is produced the first time
//! [`MessageDetails::render`] is called and cached for every later call. Most
//! validation messages are never read (successful validations, callers that
//! only check `is_valid`), so the hot path pays for an argument vector and
//! nothing else.
//!
//! # Formatting Rules
//!
//! - `{n}` is replaced by argument `n`
//! - `{{` and `}}` are literal braces
//! - A placeholder without a matching argument is kept verbatim
//! - Rendering is invariant: arguments are already strings, no culture applies
//!
//! # Memory
//!
//! Owned argument text and the cached rendering are zeroized on drop.

use crate::MessageTemplate;
use smallvec::SmallVec;
use std::borrow::Cow;
use std::fmt;
use std::sync::OnceLock;
use zeroize::Zeroize;

/// Marker rendered in place of a PII argument.
pub const PII_REDACTED: &str = "[PII is hidden]";

/// Text rendered for an absent argument.
pub const NULL_ARGUMENT: &str = "null";

#[cfg(test)]
thread_local! {
    static RENDER_COUNT: std::cell::Cell<usize> = const { std::cell::Cell::new(0) };
}

/// Capability token for reading raw PII arguments.
///
/// Holding one is a statement that the caller is allowed to see personal data.
/// Not a security boundary; it makes access explicit and greppable.
pub struct PiiAccess(());

impl PiiAccess {
    /// Acquire PII access. Call only from contexts authorized to see PII.
    #[inline]
    pub fn acquire() -> Self {
        Self(())
    }
}

/// A positional message argument.
#[derive(Clone)]
pub enum MessageArg {
    /// Value safe to render in logs and error messages.
    Text(Cow<'static, str>),
    /// Personal data. Rendered as [`PII_REDACTED`].
    Pii(Cow<'static, str>),
    /// Missing value. Rendered as [`NULL_ARGUMENT`].
    Null,
}

impl MessageArg {
    /// Non-PII text argument.
    #[inline]
    pub fn text(value: impl Into<Cow<'static, str>>) -> Self {
        Self::Text(value.into())
    }

    /// PII argument; never rendered in clear.
    #[inline]
    pub fn pii(value: impl Into<Cow<'static, str>>) -> Self {
        Self::Pii(value.into())
    }

    /// Text argument, or `Null` when absent.
    #[inline]
    pub fn optional(value: Option<impl Into<Cow<'static, str>>>) -> Self {
        value.map_or(Self::Null, Self::text)
    }

    /// The text this argument contributes to a rendered message.
    #[inline]
    pub fn rendered(&self) -> &str {
        match self {
            Self::Text(value) => value.as_ref(),
            Self::Pii(_) => PII_REDACTED,
            Self::Null => NULL_ARGUMENT,
        }
    }

    /// Raw PII value, if this argument is PII.
    #[inline]
    pub fn expose_pii(&self, _access: &PiiAccess) -> Option<&str> {
        match self {
            Self::Pii(value) => Some(value.as_ref()),
            _ => None,
        }
    }
}

impl fmt::Debug for MessageArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(value) => f.debug_tuple("Text").field(value).finish(),
            Self::Pii(_) => f.debug_tuple("Pii").field(&"<REDACTED>").finish(),
            Self::Null => f.write_str("Null"),
        }
    }
}

impl Zeroize for MessageArg {
    fn zeroize(&mut self) {
        match self {
            Self::Text(Cow::Owned(s)) | Self::Pii(Cow::Owned(s)) => s.zeroize(),
            _ => {}
        }
    }
}

impl Drop for MessageArg {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// A message template bound to arguments, rendered on first use.
///
/// # Example
///
/// ```rust
/// use palisade_validation::{definitions, MessageArg, MessageDetails};
///
/// let details = MessageDetails::new(
///     &definitions::IDX10236,
///     [MessageArg::text("https://issuer.example")],
/// );
/// assert!(!details.is_rendered());
/// assert_eq!(
///     details.render(),
///     "IDX10236: Issuer Validated.Issuer: 'https://issuer.example'"
/// );
/// assert!(details.is_rendered());
/// ```
#[derive(Clone)]
pub struct MessageDetails {
    template: &'static MessageTemplate,
    arguments: SmallVec<[MessageArg; 4]>,
    rendered: OnceLock<String>,
}

impl MessageDetails {
    /// Bind `template` to `arguments`. Performs no formatting.
    #[inline]
    pub fn new(
        template: &'static MessageTemplate,
        arguments: impl IntoIterator<Item = MessageArg>,
    ) -> Self {
        Self {
            template,
            arguments: arguments.into_iter().collect(),
            rendered: OnceLock::new(),
        }
    }

    /// Template with no arguments.
    #[inline]
    pub fn bare(template: &'static MessageTemplate) -> Self {
        Self::new(template, [])
    }

    /// The template this message renders.
    #[inline]
    pub const fn template(&self) -> &'static MessageTemplate {
        self.template
    }

    /// Positional arguments in order.
    #[inline]
    pub fn arguments(&self) -> &[MessageArg] {
        &self.arguments
    }

    /// Whether the text has been produced yet.
    #[inline]
    pub fn is_rendered(&self) -> bool {
        self.rendered.get().is_some()
    }

    /// Render the message, formatting at most once per instance.
    pub fn render(&self) -> &str {
        self.rendered
            .get_or_init(|| format_invariant(self.template.format(), &self.arguments))
    }
}

impl fmt::Debug for MessageDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageDetails")
            .field("template", &format_args!("{}", self.template))
            .field("arguments", &self.arguments)
            .field("rendered", &self.is_rendered())
            .finish()
    }
}

impl fmt::Display for MessageDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.render())
    }
}

impl Drop for MessageDetails {
    fn drop(&mut self) {
        if let Some(text) = self.rendered.get_mut() {
            text.zeroize();
        }
    }
}

/// Expand a composite format string with positional arguments.
fn format_invariant(format: &str, arguments: &[MessageArg]) -> String {
    #[cfg(test)]
    RENDER_COUNT.with(|count| count.set(count.get() + 1));

    let extra: usize = arguments.iter().map(|a| a.rendered().len()).sum();
    let mut out = String::with_capacity(format.len() + extra);
    let mut rest = format;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") || tail.starts_with("}}") {
            out.push_str(&tail[..1]);
            rest = &tail[2..];
            continue;
        }

        if tail.starts_with('{') {
            if let Some(close) = tail.find('}') {
                let inner = &tail[1..close];
                if let Some(arg) = inner.parse::<usize>().ok().and_then(|i| arguments.get(i)) {
                    out.push_str(arg.rendered());
                    rest = &tail[close + 1..];
                    continue;
                }
            }
        }

        // Unmatched brace or unknown index: keep the character as written.
        out.push_str(&tail[..1]);
        rest = &tail[1..];
    }

    out.push_str(rest);
    out
}
