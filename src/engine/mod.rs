//! The regex engine seam.
//!
//! [`PatternCache`](crate::cache::PatternCache) never interprets patterns
//! itself. Compilation, optional acceleration ("JIT") and matching are
//! delegated to a [`RegexEngine`], which owns the matcher and scratch types.
//!
//! ```text
//!   compile ──► Matcher ──► jit_compile ──► Active ──► is_match(.., Some(scratch))
//!                                  │
//!                                  └──────► Degraded ─► is_match(.., None)
//! ```
//!
//! Scratch memory is created once per cache via [`RegexEngine::create_scratch`]
//! and passed to every match of a JIT-active matcher.
//!
//! [`AutomataEngine`] is the bundled implementation.

mod automata;

pub use automata::{AutomataEngine, AutomataMatcher, AutomataScratch};

use thiserror::Error;

use crate::pattern::CaseMode;

/// Bytes reserved for JIT scratch memory; both default to 32 KiB.
pub const DEFAULT_JIT_STACK_START: usize = 32 * 1024;
pub const DEFAULT_JIT_STACK_MAX: usize = 32 * 1024;

/// Options passed to [`RegexEngine::compile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileFlags {
    /// `^` and `$` also match at line boundaries.
    pub multi_line: bool,
    /// Invalid UTF-8 in subjects is tolerated instead of rejected.
    pub permissive_utf8: bool,
    pub case: CaseMode,
}

impl CompileFlags {
    /// The option set every cached pattern is compiled with.
    pub fn baseline(case: CaseMode) -> Self {
        Self {
            multi_line: true,
            permissive_utf8: true,
            case,
        }
    }
}

/// Initial and maximum size of the shared JIT scratch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JitStackSize {
    pub start: usize,
    pub max: usize,
}

impl Default for JitStackSize {
    fn default() -> Self {
        Self {
            start: DEFAULT_JIT_STACK_START,
            max: DEFAULT_JIT_STACK_MAX,
        }
    }
}

/// Outcome of [`RegexEngine::jit_compile`]. Degradation is never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JitStatus {
    Active,
    Degraded(String),
}

impl JitStatus {
    #[inline]
    pub fn is_active(&self) -> bool {
        matches!(self, JitStatus::Active)
    }
}

/// Failure reported by an engine. Codes stay inside the crate; the cache
/// translates these into [`RegexpError`](crate::error::RegexpError).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("out of memory")]
    NoMemory,

    #[error("{message}")]
    Syntax { offset: usize, message: String },

    #[error("regular expression is too large (limit is {limit} bytes)")]
    SizeLimit { limit: usize },

    #[error("JIT stack limit reached")]
    ScratchExhausted,

    #[error("{message}")]
    Internal { code: i32, message: String },
}

impl EngineError {
    /// Numeric code; negative values follow the usual engine convention.
    pub fn code(&self) -> i32 {
        match self {
            EngineError::NoMemory => -48,
            EngineError::Syntax { .. } => 101,
            EngineError::SizeLimit { .. } => 120,
            EngineError::ScratchExhausted => -46,
            EngineError::Internal { code, .. } => *code,
        }
    }
}

/// Compiles patterns and runs matches for a [`PatternCache`](crate::cache::PatternCache).
///
/// Implementations must not panic on adversarial patterns or subjects; every
/// failure is reported through [`EngineError`].
pub trait RegexEngine {
    /// One compiled pattern.
    type Matcher;
    /// Scratch memory shared by all JIT-active matches of one cache.
    type Scratch;

    fn compile(&self, pattern: &[u8], flags: CompileFlags) -> Result<Self::Matcher, EngineError>;

    /// Attempts to accelerate `matcher` in place.
    fn jit_compile(&self, matcher: &mut Self::Matcher, stack: JitStackSize) -> JitStatus;

    fn create_scratch(&self, stack: JitStackSize) -> Result<Self::Scratch, EngineError>;

    /// Reports whether `matcher` matches anywhere in `subject`.
    ///
    /// `scratch` is `Some` only for matchers whose JIT compile succeeded.
    /// Engines whose scratch can run out return
    /// [`EngineError::ScratchExhausted`]. [`AutomataEngine`] never does: its
    /// lazy DFA silently falls back to a slower search when the cache sized by
    /// `JitStackSize::max` is exhausted.
    fn is_match(
        &self,
        matcher: &Self::Matcher,
        subject: &[u8],
        scratch: Option<&mut Self::Scratch>,
    ) -> Result<bool, EngineError>;
}

// ---------------------------------------------------------------------------
// ScriptedEngine
// ---------------------------------------------------------------------------

/// Deterministic engine for exercising cache failure paths in unit tests.
///
/// A pattern matches a subject when the subject contains the pattern bytes
/// (ASCII-folded for caseless compiles). Patterns starting with `!` fail to
/// compile at offset 1, and subjects equal to `boom` exhaust the scratch.
#[cfg(test)]
pub(crate) mod scripted {
    use std::cell::Cell;

    use super::*;

    #[derive(Debug, Default)]
    pub(crate) struct ScriptedEngine {
        pub(crate) jit_unavailable: bool,
        pub(crate) scratch_fails: bool,
        pub(crate) compiles: Cell<usize>,
        pub(crate) scratches: Cell<usize>,
    }

    #[derive(Debug)]
    pub(crate) struct ScriptedMatcher {
        pub(crate) needle: Vec<u8>,
        pub(crate) caseless: bool,
        pub(crate) jit: bool,
    }

    #[derive(Debug)]
    pub(crate) struct ScriptedScratch {
        pub(crate) budget: usize,
    }

    impl RegexEngine for ScriptedEngine {
        type Matcher = ScriptedMatcher;
        type Scratch = ScriptedScratch;

        fn compile(
            &self,
            pattern: &[u8],
            flags: CompileFlags,
        ) -> Result<ScriptedMatcher, EngineError> {
            if pattern.first() == Some(&b'!') {
                return Err(EngineError::Syntax {
                    offset: 1,
                    message: "scripted failure".into(),
                });
            }
            self.compiles.set(self.compiles.get() + 1);
            let caseless = flags.case.is_caseless();
            let needle = if caseless {
                pattern.to_ascii_lowercase()
            } else {
                pattern.to_vec()
            };
            Ok(ScriptedMatcher {
                needle,
                caseless,
                jit: false,
            })
        }

        fn jit_compile(&self, matcher: &mut ScriptedMatcher, _stack: JitStackSize) -> JitStatus {
            if self.jit_unavailable {
                return JitStatus::Degraded("jit unavailable".into());
            }
            matcher.jit = true;
            JitStatus::Active
        }

        fn create_scratch(&self, stack: JitStackSize) -> Result<ScriptedScratch, EngineError> {
            if self.scratch_fails {
                return Err(EngineError::NoMemory);
            }
            self.scratches.set(self.scratches.get() + 1);
            Ok(ScriptedScratch { budget: stack.max })
        }

        fn is_match(
            &self,
            matcher: &ScriptedMatcher,
            subject: &[u8],
            scratch: Option<&mut ScriptedScratch>,
        ) -> Result<bool, EngineError> {
            if matcher.jit != scratch.is_some() {
                return Err(EngineError::Internal {
                    code: -44,
                    message: "scratch passed to the wrong tier".into(),
                });
            }
            if subject == b"boom" {
                return Err(EngineError::ScratchExhausted);
            }
            if let Some(scratch) = scratch {
                if scratch.budget == 0 {
                    return Err(EngineError::ScratchExhausted);
                }
            }
            let hay = if matcher.caseless {
                subject.to_ascii_lowercase()
            } else {
                subject.to_vec()
            };
            Ok(matcher.needle.is_empty()
                || hay
                    .windows(matcher.needle.len())
                    .any(|w| w == matcher.needle.as_slice()))
        }
    }
}
