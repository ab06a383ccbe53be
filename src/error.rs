//! Error types for the regexkit library.
//!
//! ## Key Components
//!
//! - [`RegexpError`]: Returned by lookups and matches. Every variant renders a
//!   descriptive message; raw engine codes are only exposed through
//!   [`RegexpError::code`].
//! - [`ConfigError`]: Returned when cache configuration parameters are invalid
//!   (e.g. zero capacity, JIT stack start larger than its maximum).
//! - [`InvariantError`]: Returned by `check_invariants` when the slot ring or
//!   entry bookkeeping is inconsistent.
//!
//! ## Example Usage
//!
//! ```
//! use regexkit::prelude::*;
//!
//! let mut cache = PatternCache::new(AutomataEngine::new());
//! let err = cache
//!     .matches(b"[a", CaseMode::Sensitive, b"abc")
//!     .unwrap_err();
//! assert!(matches!(err, RegexpError::CompileSyntaxError { .. }));
//! assert!(err.to_string().starts_with("regexp: error compiling pattern '[a'"));
//! ```

use thiserror::Error;

// ---------------------------------------------------------------------------
// RegexpError
// ---------------------------------------------------------------------------

/// Errors surfaced by pattern lookup, compilation and matching.
///
/// Pattern and subject text embedded in messages is already truncated to the
/// cache's configured display length.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegexpError {
    /// An allocation failed, or the host could not materialize an argument.
    #[error("regexp: out of memory")]
    AllocationFailure,

    /// The pattern failed to parse.
    #[error("regexp: error compiling pattern '{pattern}' at offset {offset}: {message}")]
    CompileSyntaxError {
        pattern: String,
        offset: usize,
        message: String,
    },

    /// The engine reported an error it could not classify further.
    #[error("regexp: {context}: {message}")]
    EngineInternalError {
        context: String,
        code: i32,
        message: String,
    },

    /// A compiled program or the JIT scratch exceeded its configured limit.
    #[error("regexp: {context}: {message}")]
    OversizedResource { context: String, message: String },

    /// Wrong arity, wrong argument kind, or an unknown introspection key.
    #[error("regexp: {0}")]
    InvalidArgument(String),
}

impl RegexpError {
    /// Returns a stable numeric code for the error class, plus the engine
    /// code for [`RegexpError::EngineInternalError`].
    pub fn code(&self) -> i32 {
        match self {
            RegexpError::AllocationFailure => 7,
            RegexpError::CompileSyntaxError { .. } => 1,
            RegexpError::EngineInternalError { code, .. } => *code,
            RegexpError::OversizedResource { .. } => 18,
            RegexpError::InvalidArgument(_) => 25,
        }
    }

    /// Returns the byte offset of a syntax error, if this is one.
    pub fn offset(&self) -> Option<usize> {
        match self {
            RegexpError::CompileSyntaxError { offset, .. } => Some(*offset),
            _ => None,
        }
    }

    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        RegexpError::InvalidArgument(msg.into())
    }
}

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// A broken structural rule found while auditing a cache.
///
/// [`PatternCache::check_invariants`](crate::cache::PatternCache::check_invariants)
/// reports an active slot behind an empty one, a pattern resident twice, a
/// JIT-active entry with no scratch, or a resident count that drifted.
/// [`SlotRing::check_invariants`](crate::ds::SlotRing::check_invariants)
/// reports links that do not point back at each other.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct InvariantError(String);

impl InvariantError {
    #[inline]
    pub(crate) fn new(rule: impl Into<String>) -> Self {
        Self(rule.into())
    }

    /// The violated rule, with the slot it was found at when known.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Rejection from [`CacheConfig::validate`](crate::builder::CacheConfig::validate).
///
/// Raised for a capacity outside `1..=MAX_CAPACITY` and for a JIT stack
/// whose start size is zero or above its maximum. Both
/// [`CacheBuilder::try_build`](crate::builder::CacheBuilder::try_build) and
/// [`PatternCache::with_config`](crate::cache::PatternCache::with_config)
/// surface it before any slot is allocated.
///
/// ```
/// use regexkit::builder::CacheBuilder;
/// use regexkit::engine::AutomataEngine;
///
/// let err = CacheBuilder::new(0).try_build(AutomataEngine::new()).unwrap_err();
/// assert!(err.message().contains("capacity"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ConfigError(String);

impl ConfigError {
    #[inline]
    pub(crate) fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }

    /// Which parameter was rejected, and why.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- RegexpError ------------------------------------------------------

    #[test]
    fn compile_error_display_matches_host_format() {
        let err = RegexpError::CompileSyntaxError {
            pattern: "[a".into(),
            offset: 2,
            message: "missing terminating ] for character class".into(),
        };
        assert_eq!(
            err.to_string(),
            "regexp: error compiling pattern '[a' at offset 2: \
             missing terminating ] for character class"
        );
        assert_eq!(err.offset(), Some(2));
    }

    #[test]
    fn engine_error_keeps_structured_code() {
        let err = RegexpError::EngineInternalError {
            context: "error matching regex: 'a' against subject: 'b'".into(),
            code: -44,
            message: "internal error".into(),
        };
        assert_eq!(err.code(), -44);
        assert_eq!(
            err.to_string(),
            "regexp: error matching regex: 'a' against subject: 'b': internal error"
        );
        assert_eq!(err.offset(), None);
    }

    #[test]
    fn invalid_argument_display() {
        let err = RegexpError::invalid_argument("NULL regex pattern");
        assert_eq!(err.to_string(), "regexp: NULL regex pattern");
    }

    #[test]
    fn regexp_error_implements_std_error() {
        fn assert_error<T: std::error::Error + Send + Sync + 'static>() {}
        assert_error::<RegexpError>();
    }

    // -- InvariantError ---------------------------------------------------

    #[test]
    fn invariant_display_shows_message() {
        let err = InvariantError::new("ring does not close");
        assert_eq!(err.to_string(), "ring does not close");
        assert_eq!(err.message(), "ring does not close");
    }

    #[test]
    fn invariant_clone_and_eq() {
        let a = InvariantError::new("x");
        let b = a.clone();
        assert_eq!(a, b);
    }

    // -- ConfigError ------------------------------------------------------

    #[test]
    fn config_display_shows_message() {
        let err = ConfigError::new("capacity must be > 0");
        assert_eq!(err.to_string(), "capacity must be > 0");
    }

    #[test]
    fn config_error_comes_from_validate() {
        use crate::builder::CacheBuilder;

        let builder = CacheBuilder::new(4).jit_stack_size(64, 32);
        let err = builder.config().validate().unwrap_err();
        assert!(err.message().contains("exceeds max"), "{err}");
        assert_eq!(err.to_string(), err.message());
    }

    #[test]
    fn config_implements_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<ConfigError>();
    }
}
