//! [`RegexEngine`] backed by `regex-automata`.
//!
//! Patterns are parsed once with `regex-syntax` into an `Hir`, then compiled
//! to a Thompson NFA executed by the PikeVM. That is the degraded tier: always
//! available, bounded memory, slowest.
//!
//! [`RegexEngine::jit_compile`] builds a `meta::Regex` from the same `Hir`.
//! The meta regex picks prefilters and a lazy DFA whose transition cache is
//! sized by the JIT stack maximum. Its per-search state lives in the shared
//! [`AutomataScratch`], which is rebuilt whenever a different matcher runs.
//!
//! The lazy DFA never reports [`EngineError::ScratchExhausted`]: once its
//! transition cache fills up too often, the meta regex falls back to slower
//! engines inside the same search. `JitStackSize::start` is validated but
//! only `max` sizes the cache.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use regex_automata::meta;
use regex_automata::nfa::thompson::{self, pikevm, pikevm::PikeVM};
use regex_automata::util::pool::Pool;
use regex_automata::Input;
use regex_syntax::hir::Hir;
use regex_syntax::ParserBuilder;

use super::{CompileFlags, EngineError, JitStackSize, JitStatus, RegexEngine};

/// Default cap on the compiled NFA size.
pub const DEFAULT_NFA_SIZE_LIMIT: usize = 10 * (1 << 20);

/// Regex engine built on `regex-automata`'s PikeVM and meta regex.
#[derive(Debug)]
pub struct AutomataEngine {
    jit_enabled: bool,
    nfa_size_limit: Option<usize>,
    next_id: AtomicU64,
}

impl AutomataEngine {
    pub fn new() -> Self {
        Self {
            jit_enabled: true,
            nfa_size_limit: Some(DEFAULT_NFA_SIZE_LIMIT),
            next_id: AtomicU64::new(1),
        }
    }

    /// An engine whose matchers always stay on the PikeVM tier.
    pub fn without_jit() -> Self {
        Self {
            jit_enabled: false,
            ..Self::new()
        }
    }

    /// Caps the compiled program size; `None` removes the cap.
    pub fn with_nfa_size_limit(mut self, limit: Option<usize>) -> Self {
        self.nfa_size_limit = limit;
        self
    }
}

impl Default for AutomataEngine {
    fn default() -> Self {
        Self::new()
    }
}

type PikeCacheFn = Box<dyn Fn() -> pikevm::Cache + Send + Sync>;

/// A compiled pattern.
pub struct AutomataMatcher {
    id: u64,
    hir: Option<Hir>,
    pikevm: PikeVM,
    // Reused across PikeVM searches; degraded matchers never see the scratch.
    pike_cache: Pool<pikevm::Cache, PikeCacheFn>,
    accelerated: Option<meta::Regex>,
}

impl fmt::Debug for AutomataMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutomataMatcher")
            .field("id", &self.id)
            .field("accelerated", &self.accelerated.is_some())
            .finish_non_exhaustive()
    }
}

impl AutomataMatcher {
    /// Returns `true` once [`RegexEngine::jit_compile`] succeeded.
    pub fn is_accelerated(&self) -> bool {
        self.accelerated.is_some()
    }
}

/// Search state shared by every accelerated matcher of one cache.
#[derive(Debug)]
pub struct AutomataScratch {
    bound: Option<(u64, meta::Cache)>,
}

impl AutomataScratch {
    /// Returns search state for matcher `id`.
    ///
    /// A `meta::Cache` only fits the strategy of the regex it was created
    /// for, so switching matchers builds a new one instead of resetting.
    fn cache_for(&mut self, id: u64, re: &meta::Regex) -> &mut meta::Cache {
        let (bound_id, cache) = self.bound.get_or_insert_with(|| (id, re.create_cache()));
        if *bound_id != id {
            *cache = re.create_cache();
            *bound_id = id;
        }
        cache
    }
}

impl RegexEngine for AutomataEngine {
    type Matcher = AutomataMatcher;
    type Scratch = AutomataScratch;

    fn compile(&self, pattern: &[u8], flags: CompileFlags) -> Result<AutomataMatcher, EngineError> {
        let text = std::str::from_utf8(pattern).map_err(|err| EngineError::Syntax {
            offset: err.valid_up_to(),
            message: "pattern is not valid UTF-8".into(),
        })?;

        let hir = ParserBuilder::new()
            .multi_line(flags.multi_line)
            .case_insensitive(flags.case.is_caseless())
            .utf8(!flags.permissive_utf8)
            .build()
            .parse(text)
            .map_err(syntax_error)?;

        let nfa = thompson::Compiler::new()
            .configure(
                thompson::Config::new()
                    .nfa_size_limit(self.nfa_size_limit)
                    .utf8(!flags.permissive_utf8),
            )
            .build_from_hir(&hir)
            .map_err(|err| match err.size_limit() {
                Some(limit) => EngineError::SizeLimit { limit },
                None => EngineError::Internal {
                    code: -44,
                    message: err.to_string(),
                },
            })?;

        let pikevm = PikeVM::new_from_nfa(nfa).map_err(|err| EngineError::Internal {
            code: -44,
            message: err.to_string(),
        })?;

        let vm = pikevm.clone();
        let create: PikeCacheFn = Box::new(move || vm.create_cache());
        Ok(AutomataMatcher {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            hir: Some(hir),
            pikevm,
            pike_cache: Pool::new(create),
            accelerated: None,
        })
    }

    fn jit_compile(&self, matcher: &mut AutomataMatcher, stack: JitStackSize) -> JitStatus {
        if !self.jit_enabled {
            return JitStatus::Degraded("JIT disabled".into());
        }
        if matcher.accelerated.is_some() {
            return JitStatus::Active;
        }
        let Some(hir) = matcher.hir.as_ref() else {
            return JitStatus::Degraded("pattern source no longer available".into());
        };
        let built = meta::Builder::new()
            .configure(
                meta::Config::new()
                    .utf8_empty(false)
                    .nfa_size_limit(self.nfa_size_limit)
                    .hybrid_cache_capacity(stack.max),
            )
            .build_from_hir(hir);
        match built {
            Ok(re) => {
                matcher.accelerated = Some(re);
                matcher.hir = None;
                JitStatus::Active
            }
            Err(err) => JitStatus::Degraded(err.to_string()),
        }
    }

    fn create_scratch(&self, stack: JitStackSize) -> Result<AutomataScratch, EngineError> {
        if stack.start == 0 || stack.start > stack.max {
            return Err(EngineError::Internal {
                code: -34,
                message: format!(
                    "invalid JIT stack size (start {}, max {})",
                    stack.start, stack.max
                ),
            });
        }
        Ok(AutomataScratch { bound: None })
    }

    fn is_match(
        &self,
        matcher: &AutomataMatcher,
        subject: &[u8],
        scratch: Option<&mut AutomataScratch>,
    ) -> Result<bool, EngineError> {
        let matched = match (&matcher.accelerated, scratch) {
            (Some(re), Some(scratch)) => {
                let cache = scratch.cache_for(matcher.id, re);
                re.search_half_with(cache, &Input::new(subject).earliest(true))
                    .is_some()
            }
            (Some(re), None) => re.is_match(subject),
            (None, _) => {
                let mut cache = matcher.pike_cache.get();
                matcher.pikevm.is_match(&mut *cache, Input::new(subject))
            }
        };
        Ok(matched)
    }
}

fn syntax_error(err: regex_syntax::Error) -> EngineError {
    match err {
        regex_syntax::Error::Parse(e) => EngineError::Syntax {
            offset: e.span().start.offset,
            message: e.kind().to_string(),
        },
        regex_syntax::Error::Translate(e) => EngineError::Syntax {
            offset: e.span().start.offset,
            message: e.kind().to_string(),
        },
        other => EngineError::Syntax {
            offset: 0,
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::CaseMode;

    fn compile(engine: &AutomataEngine, pattern: &str, case: CaseMode) -> AutomataMatcher {
        engine
            .compile(pattern.as_bytes(), CompileFlags::baseline(case))
            .unwrap()
    }

    #[test]
    fn pike_tier_matches_without_scratch() {
        let engine = AutomataEngine::without_jit();
        let mut m = compile(&engine, "^b", CaseMode::Sensitive);
        assert!(!engine.jit_compile(&mut m, JitStackSize::default()).is_active());
        assert!(!m.is_accelerated());
        // Multi-line anchors.
        assert!(engine.is_match(&m, b"a\nb", None).unwrap());
        assert!(!engine.is_match(&m, b"ab", None).unwrap());
    }

    #[test]
    fn accelerated_tier_shares_scratch_between_matchers() {
        let engine = AutomataEngine::new();
        let stack = JitStackSize::default();
        let mut a = compile(&engine, "a+b", CaseMode::Sensitive);
        let mut b = compile(&engine, "xyz", CaseMode::Insensitive);
        assert!(engine.jit_compile(&mut a, stack).is_active());
        assert!(engine.jit_compile(&mut b, stack).is_active());

        let mut scratch = engine.create_scratch(stack).unwrap();
        assert!(engine.is_match(&a, b"caab", Some(&mut scratch)).unwrap());
        assert!(engine.is_match(&b, b"__XyZ__", Some(&mut scratch)).unwrap());
        assert!(!engine.is_match(&a, b"ba", Some(&mut scratch)).unwrap());
        assert!(!engine.is_match(&b, b"xy", Some(&mut scratch)).unwrap());
    }

    #[test]
    fn switching_strategies_on_one_scratch() {
        let engine = AutomataEngine::new();
        let stack = JitStackSize::default();
        let cases: [(&str, &[u8], &[u8]); 6] = [
            ("a+", b"baab", b"bbb"),
            ("foo\\d", b"xfoo7", b"foo"),
            ("needle", b"haystack needle", b"needl"),
            ("bar$", b"foobar", b"barfoo"),
            ("[a-z]+ing", b"so boring", b"ING"),
            ("^x|y$", b"ay", b"ax"),
        ];
        let matchers: Vec<_> = cases
            .iter()
            .map(|(p, _, _)| {
                let mut m = compile(&engine, p, CaseMode::Sensitive);
                assert!(engine.jit_compile(&mut m, stack).is_active());
                m
            })
            .collect();
        let mut scratch = engine.create_scratch(stack).unwrap();
        for round in 0..3 {
            // Odd rounds walk backwards so each neighbour pair swaps.
            let order: Vec<usize> = if round % 2 == 0 {
                (0..cases.len()).collect()
            } else {
                (0..cases.len()).rev().collect()
            };
            for i in order {
                let (_, hit, miss) = cases[i];
                assert!(engine.is_match(&matchers[i], hit, Some(&mut scratch)).unwrap());
                assert!(!engine.is_match(&matchers[i], miss, Some(&mut scratch)).unwrap());
            }
        }
    }

    #[test]
    fn pike_tier_reuses_its_cache() {
        let engine = AutomataEngine::without_jit();
        let m = compile(&engine, "a+b", CaseMode::Sensitive);
        for _ in 0..4 {
            assert!(engine.is_match(&m, b"xaab", None).unwrap());
            assert!(!engine.is_match(&m, b"xa", None).unwrap());
        }
    }

    #[test]
    fn invalid_utf8_subject_is_tolerated() {
        let engine = AutomataEngine::new();
        let mut m = compile(&engine, "a+$", CaseMode::Sensitive);
        engine.jit_compile(&mut m, JitStackSize::default());
        let mut scratch = engine.create_scratch(JitStackSize::default()).unwrap();
        assert!(engine
            .is_match(&m, b"\xff\xfeaa", Some(&mut scratch))
            .unwrap());
        assert!(!engine
            .is_match(&m, b"aa\xff", Some(&mut scratch))
            .unwrap());
    }

    #[test]
    fn syntax_error_reports_offset() {
        let engine = AutomataEngine::new();
        let err = engine
            .compile(b"ab(", CompileFlags::baseline(CaseMode::Sensitive))
            .unwrap_err();
        match err {
            EngineError::Syntax { offset, message } => {
                assert_eq!(offset, 2);
                assert!(message.contains("unclosed group"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn lone_open_paren_is_a_syntax_error() {
        let engine = AutomataEngine::new();
        let err = engine
            .compile(b"(", CompileFlags::baseline(CaseMode::Sensitive))
            .unwrap_err();
        match err {
            EngineError::Syntax { offset, message } => {
                assert_eq!(offset, 0);
                assert_eq!(message, "unclosed group");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn offset_points_at_the_opening_token() {
        // Offsets are where the offending construct starts, not where the
        // parser gave up.
        let engine = AutomataEngine::new();
        let err = engine
            .compile(b"[a", CompileFlags::baseline(CaseMode::Sensitive))
            .unwrap_err();
        assert!(matches!(err, EngineError::Syntax { offset: 0, .. }));
    }

    #[test]
    fn invalid_utf8_pattern_is_a_syntax_error() {
        let engine = AutomataEngine::new();
        let err = engine
            .compile(b"ab\xff", CompileFlags::baseline(CaseMode::Sensitive))
            .unwrap_err();
        assert!(matches!(err, EngineError::Syntax { offset: 2, .. }));
    }

    #[test]
    fn tiny_size_limit_is_reported_as_size_limit() {
        let engine = AutomataEngine::new().with_nfa_size_limit(Some(16));
        let err = engine
            .compile(
                "a*b*".repeat(64).as_bytes(),
                CompileFlags::baseline(CaseMode::Sensitive),
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::SizeLimit { limit: 16 }));
    }

    #[test]
    fn scratch_rejects_inverted_bounds() {
        let engine = AutomataEngine::new();
        let err = engine
            .create_scratch(JitStackSize { start: 64, max: 32 })
            .unwrap_err();
        assert!(matches!(err, EngineError::Internal { .. }));
    }
}
