//! Built-in message catalog.
//!
//! # Taxonomy
//!
//! Identifiers are grouped in numeric ranges so a reader can tell from the
//! code alone which part of the pipeline produced a message:
//!
//! - **10000-10199** | argument contracts and shared plumbing
//! - **10200-10299** | issuer validation
//!
//! Formats are invariant (no culture-specific number or date formatting) and
//! use positional `{n}` placeholders. Every format begins with its own
//! identifier so a rendered message can be traced back without the template.
//!
//! # Governance
//!
//! Range membership is checked by the `tests` module at the bottom of this
//! file. A template added outside its range fails the build.

use crate::{MessageTemplate, define_message_templates};

/// Numeric range constants for catalog governance.
/// Checked for consistency in `tests` module.
pub mod ranges {
    pub const GENERAL_START: u32 = 10000; pub const GENERAL_END: u32 = 10199;
    pub const ISSUER_START:  u32 = 10200; pub const ISSUER_END:  u32 = 10299;
}

// -----------------------------------------------------------------------------
// GENERAL (10000-10199) - Argument contracts
// -----------------------------------------------------------------------------
define_message_templates! {
    IDX10000 = (10000, "IDX10000: The parameter '{0}' cannot be a 'null' or an empty object."),
}

// -----------------------------------------------------------------------------
// ISSUER (10200-10299) - Issuer validation
// -----------------------------------------------------------------------------
define_message_templates! {
    IDX10204 = (10204, "IDX10204: Unable to validate issuer. valid_issuer is null or whitespace AND valid_issuers is empty AND no configuration issuer is available."),
    IDX10205 = (10205, "IDX10205: Issuer validation failed. Issuer: '{0}'. Did not match: valid_issuer: '{1}' or valid_issuers: '{2}' or configuration issuer: '{3}'."),
    IDX10211 = (10211, "IDX10211: Unable to validate issuer. The 'issuer' parameter is null or whitespace."),
    IDX10236 = (10236, "IDX10236: Issuer Validated.Issuer: '{0}'"),
    IDX10262 = (10262, "IDX10262: One of the issuers in valid_issuers was null or an empty string."),
    IDX10270 = (10270, "IDX10270: Unable to retrieve the trusted configuration; issuer validation continues without a configuration issuer. Reason: '{0}'."),
}

/// Every template in the catalog, ordered by code.
pub static CATALOG: &[&MessageTemplate] = &[
    &IDX10000, &IDX10204, &IDX10205, &IDX10211, &IDX10236, &IDX10262, &IDX10270,
];

/// Look up a template by its numeric identifier.
///
/// ```rust
/// use palisade_validation::definitions;
///
/// let template = definitions::lookup(10205).unwrap();
/// assert!(template.format().starts_with("IDX10205:"));
/// assert!(definitions::lookup(12345).is_none());
/// ```
pub fn lookup(code: u32) -> Option<&'static MessageTemplate> {
    CATALOG
        .binary_search_by_key(&code, |t| t.code())
        .ok()
        .map(|index| CATALOG[index])
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Enforce that all defined templates fall within their assigned ranges.
    #[test]
    fn enforce_catalog_ranges() {
        assert!(IDX10000.code() >= ranges::GENERAL_START && IDX10000.code() <= ranges::GENERAL_END);

        for template in [&IDX10204, &IDX10205, &IDX10211, &IDX10236, &IDX10262, &IDX10270] {
            assert!(template.code() >= ranges::ISSUER_START);
            assert!(template.code() <= ranges::ISSUER_END);
        }

        assert!(ranges::GENERAL_END < ranges::ISSUER_START);
    }

    #[test]
    fn catalog_is_sorted_and_unique() {
        for pair in CATALOG.windows(2) {
            assert!(pair[0].code() < pair[1].code());
        }
    }

    #[test]
    fn formats_lead_with_their_identifier() {
        for template in CATALOG {
            assert!(template.format().starts_with(&format!("{}:", template)));
        }
    }

    #[test]
    fn mismatch_template_takes_four_arguments() {
        assert_eq!(IDX10205.arity(), 4);
        assert_eq!(IDX10211.arity(), 0);
        assert_eq!(IDX10236.arity(), 1);
    }

    #[test]
    fn lookup_finds_every_entry() {
        for template in CATALOG {
            assert_eq!(lookup(template.code()), Some(*template));
        }
    }
}
