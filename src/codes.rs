//! Message template identity - the keys of the message catalog.
//!
//! Every message the validators can produce (failure descriptions, informational
//! logs, precondition errors) is a `MessageTemplate`: a frozen numeric identifier
//! paired with an invariant composite format string such as
//! `"IDX10236: Issuer Validated.Issuer: '{0}'"`.
//!
//! # Identity Rules
//!
//! - Templates exist only as `const` items produced by [`define_message_templates!`]
//! - The numeric code is validated at compile time (`10000..=99999`)
//! - The code, not the wording, is what callers and tests should match on
//!
//! Rendering is not performed here. A template is inert until a
//! [`MessageDetails`](crate::MessageDetails) binds arguments to it and someone
//! asks for the text.
//!
//! # Example
//!
//! ```rust
//! use palisade_validation::{define_message_templates, MessageTemplate};
//!
//! define_message_templates! {
//!     IDX19001 = (19001, "IDX19001: Custom step failed for '{0}'."),
//! }
//!
//! assert_eq!(IDX19001.to_string(), "IDX19001");
//! assert_eq!(IDX19001.code(), 19001);
//! ```

use std::fmt;

/// Prefix shared by every identifier in the catalog.
pub const MESSAGE_PREFIX: &str = "IDX";

/// Frozen message identity plus its invariant format string.
///
/// # No-Clone Semantics
///
/// Templates do not implement `Clone`; identity is the numeric code. Catalog
/// entries are `pub const` items, so each use gets its own copy and two
/// references to the same template need not share an address. Compare by
/// value or by [`code`](Self::code), never with `std::ptr::eq`.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct MessageTemplate {
    code: u32,
    format: &'static str,
}

impl MessageTemplate {
    /// Create a template with compile-time validation.
    ///
    /// # Panics
    ///
    /// Panics (at compile time in const contexts) if the code is outside
    /// `10000..=99999` or the format string is empty.
    #[inline]
    pub const fn const_new(code: u32, format: &'static str) -> Self {
        assert!(
            code >= 10000 && code <= 99999,
            "Message code must be 10000-99999"
        );
        assert!(!format.is_empty(), "Message format must not be empty");
        Self { code, format }
    }

    /// Numeric identifier (e.g. `10205`).
    #[inline]
    pub const fn code(&self) -> u32 {
        self.code
    }

    /// Invariant composite format string with `{n}` placeholders.
    #[inline]
    pub const fn format(&self) -> &'static str {
        self.format
    }

    /// Number of distinct positional placeholders the format expects.
    ///
    /// Escaped braces (`{{`, `}}`) are not counted.
    pub fn arity(&self) -> usize {
        let mut highest: Option<usize> = None;
        let bytes = self.format.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'{' if bytes.get(i + 1) == Some(&b'{') => i += 2,
                b'{' => {
                    let start = i + 1;
                    let mut end = start;
                    while end < bytes.len() && bytes[end].is_ascii_digit() {
                        end += 1;
                    }
                    if end > start && bytes.get(end) == Some(&b'}') {
                        if let Ok(index) = self.format[start..end].parse::<usize>() {
                            highest = Some(highest.map_or(index, |h| h.max(index)));
                        }
                    }
                    i = end.max(i + 1);
                }
                _ => i += 1,
            }
        }
        highest.map_or(0, |h| h + 1)
    }
}

impl fmt::Display for MessageTemplate {
    /// Writes the bare identifier, e.g. `IDX10205`. Zero allocation.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:05}", MESSAGE_PREFIX, self.code)
    }
}

/// Define a single message template as a `pub const`.
///
/// ```rust
/// # use palisade_validation::define_message_template;
/// define_message_template!(IDX19002, 19002, "IDX19002: Nothing to see.");
/// assert_eq!(IDX19002.code(), 19002);
/// ```
#[macro_export]
macro_rules! define_message_template {
    ($name:ident, $code:expr, $format:expr) => {
        pub const $name: $crate::MessageTemplate = $crate::MessageTemplate::const_new($code, $format);
    };
}

/// Define multiple message templates at once.
///
/// ```rust
/// # use palisade_validation::define_message_templates;
/// define_message_templates! {
///     IDX19003 = (19003, "IDX19003: first '{0}'."),
///     IDX19004 = (19004, "IDX19004: second."),
/// }
/// assert_eq!(IDX19004.arity(), 0);
/// ```
#[macro_export]
macro_rules! define_message_templates {
    ($( $name:ident = ($code:expr, $format:expr) ),+ $(,)?) => {
        $(
            $crate::define_message_template!($name, $code, $format);
        )+
    };
}
