//! Per-mapping capability flags.

/// A feature class that may consult a mapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    Basic,
    Diagnostic,
    Formatting,
    References,
    Rename,
    Completion,
}

/// Which feature classes may trust a mapping.
///
/// The sets in use are fixed per emission site; see the associated constants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Capabilities {
    pub basic: bool,
    pub diagnostic: bool,
    pub formatting: bool,
    pub references: bool,
    pub rename: bool,
    pub completion: bool,
}

impl Capabilities {
    /// Every feature class.
    pub const ALL: Self = Self {
        basic: true,
        diagnostic: true,
        formatting: true,
        references: true,
        rename: true,
        completion: true,
    };

    /// Everything except formatting.
    pub const NO_FORMATTING: Self = Self {
        basic: true,
        diagnostic: true,
        formatting: false,
        references: true,
        rename: true,
        completion: true,
    };

    /// The mapped value only contributes to error checking and completion.
    pub const DIAGNOSTIC_ONLY: Self = Self {
        basic: false,
        diagnostic: true,
        formatting: false,
        references: false,
        rename: false,
        completion: true,
    };

    /// Tag and attribute names: navigable and renamable, never formatted or completed.
    pub const HTML_TAG_OR_ATTR: Self = Self {
        basic: true,
        diagnostic: true,
        formatting: false,
        references: true,
        rename: true,
        completion: false,
    };

    /// Only visible to find-references.
    pub const REFERENCES_ONLY: Self = Self {
        basic: false,
        diagnostic: false,
        formatting: false,
        references: true,
        rename: false,
        completion: false,
    };

    /// Whether a consumer of the given feature class may use the mapping.
    #[inline]
    pub const fn allows(self, capability: Capability) -> bool {
        match capability {
            Capability::Basic => self.basic,
            Capability::Diagnostic => self.diagnostic,
            Capability::Formatting => self.formatting,
            Capability::References => self.references,
            Capability::Rename => self.rename,
            Capability::Completion => self.completion,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_sets() {
        assert!(Capabilities::ALL.allows(Capability::Formatting));
        assert!(!Capabilities::NO_FORMATTING.allows(Capability::Formatting));
        assert!(Capabilities::NO_FORMATTING.allows(Capability::Completion));

        let diag = Capabilities::DIAGNOSTIC_ONLY;
        assert!(diag.allows(Capability::Diagnostic));
        assert!(diag.allows(Capability::Completion));
        assert!(!diag.allows(Capability::Basic));
        assert!(!diag.allows(Capability::References));
        assert!(!diag.allows(Capability::Rename));

        let tag = Capabilities::HTML_TAG_OR_ATTR;
        assert!(tag.allows(Capability::Rename));
        assert!(!tag.allows(Capability::Formatting));
        assert!(!tag.allows(Capability::Completion));

        assert_eq!(
            Capabilities::REFERENCES_ONLY,
            Capabilities {
                references: true,
                ..Capabilities::default()
            }
        );
    }
}
