//! Cache keys: pattern bytes plus case mode.

use std::fmt;
use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

/// Whether a pattern is compiled with case folding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CaseMode {
    #[default]
    Sensitive,
    Insensitive,
}

impl CaseMode {
    /// Returns `true` for [`CaseMode::Insensitive`].
    #[inline]
    pub fn is_caseless(self) -> bool {
        matches!(self, CaseMode::Insensitive)
    }
}

/// Immutable copy of a pattern's source bytes and its case mode.
///
/// Two patterns are equal only when both the bytes and the case mode match;
/// a case-sensitive and a case-insensitive compile of the same text are
/// distinct cache entries.
#[derive(Clone)]
pub struct Pattern {
    bytes: Box<[u8]>,
    case: CaseMode,
    fingerprint: u64,
}

impl Pattern {
    pub fn new(bytes: &[u8], case: CaseMode) -> Self {
        Self {
            bytes: bytes.into(),
            case,
            fingerprint: fingerprint(bytes, case),
        }
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn case(&self) -> CaseMode {
        self.case
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[inline]
    pub(crate) fn key(&self) -> PatternKey<'_> {
        PatternKey {
            bytes: &self.bytes,
            case: self.case,
            fingerprint: self.fingerprint,
        }
    }

    /// Compares against a borrowed key whose fingerprint is already known.
    #[inline]
    pub(crate) fn matches_key(&self, key: &PatternKey<'_>) -> bool {
        self.fingerprint == key.fingerprint && self.case == key.case && *self.bytes == *key.bytes
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.fingerprint == other.fingerprint
            && self.case == other.case
            && self.bytes == other.bytes
    }
}

impl Eq for Pattern {}

impl Hash for Pattern {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.fingerprint);
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pattern")
            .field("bytes", &String::from_utf8_lossy(&self.bytes))
            .field("case", &self.case)
            .finish()
    }
}

/// Borrowed lookup key; lets `find` probe without copying the pattern.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PatternKey<'a> {
    pub(crate) bytes: &'a [u8],
    pub(crate) case: CaseMode,
    pub(crate) fingerprint: u64,
}

impl<'a> PatternKey<'a> {
    pub(crate) fn new(bytes: &'a [u8], case: CaseMode) -> Self {
        Self {
            bytes,
            case,
            fingerprint: fingerprint(bytes, case),
        }
    }
}

fn fingerprint(bytes: &[u8], case: CaseMode) -> u64 {
    let mut hasher = FxHasher::default();
    bytes.hash(&mut hasher);
    case.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_requires_bytes_and_case() {
        let a = Pattern::new(b"abc", CaseMode::Sensitive);
        let b = Pattern::new(b"abc", CaseMode::Sensitive);
        let c = Pattern::new(b"abc", CaseMode::Insensitive);
        let d = Pattern::new(b"abd", CaseMode::Sensitive);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn key_matches_only_same_mode() {
        let p = Pattern::new(b"^x", CaseMode::Insensitive);
        assert!(p.matches_key(&PatternKey::new(b"^x", CaseMode::Insensitive)));
        assert!(!p.matches_key(&PatternKey::new(b"^x", CaseMode::Sensitive)));
        assert!(!p.matches_key(&PatternKey::new(b"^X", CaseMode::Insensitive)));
    }

    #[test]
    fn debug_renders_lossy_text() {
        let p = Pattern::new(b"a\xffb", CaseMode::Sensitive);
        let dbg = format!("{p:?}");
        assert!(dbg.contains("a\u{fffd}b"));
        assert_eq!(p.len(), 3);
        assert!(!p.is_empty());
    }
}
