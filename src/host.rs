//! Host-facing `REGEXP` / `IREGEXP` functions.
//!
//! The query engine hands each call a slice of loosely typed [`Value`]s. This
//! module applies the calling convention (arity, NULL handling, numeric
//! coercion) and forwards to a per-connection [`PatternCache`].
//!
//! ## Argument Handling
//!
//! | Argument          | Value                   | Result                          |
//! |-------------------|-------------------------|---------------------------------|
//! | count != 2        | any                     | `InvalidArgument`               |
//! | pattern           | `Null`                  | `InvalidArgument`               |
//! | subject           | `Null`                  | `false`                         |
//! | pattern           | empty text              | `true` (cache untouched)        |
//! | either            | `Unavailable`           | `AllocationFailure`             |
//! | either            | `Integer` / `Real`      | matched as its text rendering   |
//! | either            | `Blob`                  | matched as raw bytes            |
//!
//! ## Introspection
//!
//! [`RegexpFunctions::regexp_stats`] answers the keys listed on [`StatKey`].

use std::borrow::Cow;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use crate::cache::PatternCache;
use crate::engine::RegexEngine;
use crate::error::RegexpError;
use crate::pattern::CaseMode;
use crate::pin::Lease;

/// One argument as delivered by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'a> {
    Null,
    Integer(i64),
    Real(f64),
    Text(&'a [u8]),
    Blob(&'a [u8]),
    /// The host failed to materialize the value (typically out of memory).
    Unavailable,
}

impl<'a> Value<'a> {
    /// Bytes to match against, or `None` for `Null`.
    pub fn to_bytes(&self) -> Result<Option<Cow<'a, [u8]>>, RegexpError> {
        match *self {
            Value::Null => Ok(None),
            Value::Integer(i) => Ok(Some(Cow::Owned(i.to_string().into_bytes()))),
            Value::Real(r) => Ok(Some(Cow::Owned(render_real(r).into_bytes()))),
            Value::Text(bytes) | Value::Blob(bytes) => Ok(Some(Cow::Borrowed(bytes))),
            Value::Unavailable => Err(RegexpError::AllocationFailure),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Byte length without materializing numeric text.
    fn is_empty_text(&self) -> bool {
        matches!(self, Value::Text(b) | Value::Blob(b) if b.is_empty())
    }
}

impl<'a> From<&'a str> for Value<'a> {
    fn from(s: &'a str) -> Self {
        Value::Text(s.as_bytes())
    }
}

impl From<i64> for Value<'_> {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value<'_> {
    fn from(r: f64) -> Self {
        Value::Real(r)
    }
}

// Integral reals keep a trailing ".0", matching how the host renders them.
fn render_real(r: f64) -> String {
    if r.is_finite() && r.fract() == 0.0 && r.abs() < 1e15 {
        format!("{r:.1}")
    } else {
        format!("{r}")
    }
}

/// Keys accepted by [`RegexpFunctions::regexp_stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatKey {
    CacheSize,
    CacheHits,
    CacheMisses,
    CacheEvacuations,
    RegexesCompiled,
    JitStackStartSize,
    JitStackMaxSize,
    MaxDisplayedPatternLength,
    ResetStats,
}

impl StatKey {
    pub const ALL: [StatKey; 9] = [
        StatKey::CacheSize,
        StatKey::CacheHits,
        StatKey::CacheMisses,
        StatKey::CacheEvacuations,
        StatKey::RegexesCompiled,
        StatKey::JitStackStartSize,
        StatKey::JitStackMaxSize,
        StatKey::MaxDisplayedPatternLength,
        StatKey::ResetStats,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatKey::CacheSize => "cache_size",
            StatKey::CacheHits => "cache_hits",
            StatKey::CacheMisses => "cache_misses",
            StatKey::CacheEvacuations => "cache_evacuations",
            StatKey::RegexesCompiled => "regexes_compiled",
            StatKey::JitStackStartSize => "jit_stack_start_size",
            StatKey::JitStackMaxSize => "jit_stack_max_size",
            StatKey::MaxDisplayedPatternLength => "max_displayed_pattern_length",
            StatKey::ResetStats => "reset_stats",
        }
    }
}

impl fmt::Display for StatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatKey {
    type Err = RegexpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StatKey::ALL
            .iter()
            .copied()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| RegexpError::invalid_argument(format!("unknown stats key: '{s}'")))
    }
}

/// `REGEXP`, `IREGEXP` and `REGEXP_STATS` over one per-connection cache.
///
/// # Example
///
/// ```
/// use regexkit::host::{RegexpFunctions, Value};
/// use regexkit::prelude::*;
///
/// let funcs = RegexpFunctions::new(PatternCache::new(AutomataEngine::new()));
/// assert!(funcs.regexp(&[Value::from("^1"), Value::from(1.234)]).unwrap());
/// assert!(funcs.iregexp(&[Value::from("^abc"), Value::from("ABCD")]).unwrap());
/// assert!(!funcs.regexp(&[Value::from("a"), Value::Null]).unwrap());
/// assert_eq!(funcs.regexp_stats("regexes_compiled").unwrap(), Some(2));
/// ```
pub struct RegexpFunctions<E: RegexEngine> {
    cache: Rc<RefCell<PatternCache<E>>>,
}

impl<E: RegexEngine> Clone for RegexpFunctions<E> {
    fn clone(&self) -> Self {
        Self {
            cache: Rc::clone(&self.cache),
        }
    }
}

impl<E: RegexEngine> RegexpFunctions<E> {
    pub fn new(cache: PatternCache<E>) -> Self {
        Self {
            cache: Rc::new(RefCell::new(cache)),
        }
    }

    /// Shares an existing per-connection cache.
    pub fn from_shared(cache: Rc<RefCell<PatternCache<E>>>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Rc<RefCell<PatternCache<E>>> {
        &self.cache
    }

    /// `REGEXP(pattern, subject)`.
    pub fn regexp(&self, args: &[Value<'_>]) -> Result<bool, RegexpError> {
        self.call(CaseMode::Sensitive, None, args)
    }

    /// `IREGEXP(pattern, subject)`: case-insensitive.
    pub fn iregexp(&self, args: &[Value<'_>]) -> Result<bool, RegexpError> {
        self.call(CaseMode::Insensitive, None, args)
    }

    /// `REGEXP` that keeps its compiled pattern pinned in `aux` across calls.
    ///
    /// `aux` is the host's per-call-site slot. A lease already stored there
    /// for the same pattern is reused without a cache lookup; otherwise a new
    /// lease replaces it. Dropping `aux` releases the pin.
    pub fn regexp_with_aux(
        &self,
        aux: &mut Option<Lease<E>>,
        args: &[Value<'_>],
    ) -> Result<bool, RegexpError> {
        self.call(CaseMode::Sensitive, Some(aux), args)
    }

    pub fn iregexp_with_aux(
        &self,
        aux: &mut Option<Lease<E>>,
        args: &[Value<'_>],
    ) -> Result<bool, RegexpError> {
        self.call(CaseMode::Insensitive, Some(aux), args)
    }

    fn call(
        &self,
        case: CaseMode,
        aux: Option<&mut Option<Lease<E>>>,
        args: &[Value<'_>],
    ) -> Result<bool, RegexpError> {
        let [pattern, subject] = args else {
            return Err(RegexpError::invalid_argument("invalid number of arguments"));
        };
        if pattern.is_null() {
            return Err(RegexpError::invalid_argument("NULL regex pattern"));
        }
        if subject.is_null() {
            return Ok(false);
        }
        if pattern.is_empty_text() {
            return Ok(true);
        }
        let (Some(pattern), Some(subject)) = (pattern.to_bytes()?, subject.to_bytes()?) else {
            return Ok(false);
        };

        match aux {
            None => self.borrow_cache()?.matches(&pattern, case, &subject),
            Some(slot) => {
                if !slot.as_ref().is_some_and(|l| l.holds(&pattern, case)) {
                    // Release the old pin before taking a new one.
                    *slot = None;
                    *slot = Some(Lease::acquire(&self.cache, &pattern, case)?);
                }
                match slot.as_ref() {
                    Some(lease) => lease.is_match(&subject),
                    None => Ok(false),
                }
            }
        }
    }

    /// `REGEXP_STATS(key)`.
    ///
    /// Returns the value for numeric keys and `None` for `reset_stats`,
    /// which zeroes the counters.
    pub fn regexp_stats(&self, key: &str) -> Result<Option<i64>, RegexpError> {
        let key: StatKey = key.parse()?;
        let mut cache = self.borrow_cache()?;
        if key == StatKey::ResetStats {
            cache.reset_stats();
            return Ok(None);
        }
        let stats = cache.stats();
        let config = cache.config();
        let value = match key {
            StatKey::CacheSize => cache.capacity() as u64,
            StatKey::CacheHits => stats.hits,
            StatKey::CacheMisses => stats.misses,
            StatKey::CacheEvacuations => stats.evictions,
            StatKey::RegexesCompiled => stats.compilations,
            StatKey::JitStackStartSize => config.jit_stack.start as u64,
            StatKey::JitStackMaxSize => config.jit_stack.max as u64,
            StatKey::MaxDisplayedPatternLength => config.max_displayed_pattern_length as u64,
            StatKey::ResetStats => return Ok(None),
        };
        Ok(Some(i64::try_from(value).unwrap_or(i64::MAX)))
    }

    fn borrow_cache(&self) -> Result<std::cell::RefMut<'_, PatternCache<E>>, RegexpError> {
        self.cache
            .try_borrow_mut()
            .map_err(|_| RegexpError::invalid_argument("pattern cache is already in use"))
    }
}

impl<E: RegexEngine> fmt::Debug for RegexpFunctions<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegexpFunctions")
            .field("cache", &self.cache.try_borrow().ok())
            .finish()
    }
}
