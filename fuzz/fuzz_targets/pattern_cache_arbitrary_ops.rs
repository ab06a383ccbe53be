#![no_main]

use libfuzzer_sys::fuzz_target;
use regexkit::prelude::*;

// Fuzz arbitrary operation sequences on PatternCache
//
// Random lookups, pins, releases, evictions and matches over a small pattern
// alphabet, checking cache invariants after every step.
const PATTERNS: &[&[u8]] = &[
    b"a",
    b"^a",
    b"a$",
    b"a+b",
    b"(a|b)*c",
    b"[0-9]+",
    b"\\bword\\b",
    b"x",
    b"(",
    b"",
];

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let capacity = usize::from(data[0] % 6) + 1;
    let Ok(mut cache) = CacheBuilder::new(capacity).try_build(AutomataEngine::new()) else {
        return;
    };
    let mut pins: Vec<Pin> = Vec::new();
    let mut ids: Vec<EntryId> = Vec::new();

    let mut idx = 1;
    while idx + 1 < data.len() {
        let op = data[idx] % 6;
        let arg = usize::from(data[idx + 1]);
        let pattern = PATTERNS[arg % PATTERNS.len()];
        let case = if arg & 0x80 != 0 {
            CaseMode::Insensitive
        } else {
            CaseMode::Sensitive
        };

        match op {
            0 => {
                // matches
                let subject = &data[idx..];
                let result = cache.matches(pattern, case, subject);
                if pattern.is_empty() {
                    assert_eq!(result, Ok(true));
                }
            }
            1 => {
                // get_or_compile
                if let Ok(Resolved::Resident(id)) = cache.get_or_compile(pattern, case) {
                    assert!(cache.entry(id).is_some());
                    ids.push(id);
                }
            }
            2 => {
                // acquire
                if !ids.is_empty() {
                    let id = ids[arg % ids.len()];
                    match cache.acquire(id) {
                        Ok(pin) => pins.push(pin),
                        Err(_) => assert!(cache.entry(id).is_none()),
                    }
                }
            }
            3 => {
                // release
                if !pins.is_empty() {
                    let pin = pins.swap_remove(arg % pins.len());
                    cache.release(pin);
                }
            }
            4 => {
                // evict
                if !ids.is_empty() {
                    let id = ids[arg % ids.len()];
                    let pinned = cache.entry(id).map(|e| e.is_pinned());
                    let result = cache.evict(id);
                    assert_eq!(result.is_ok(), pinned == Some(false));
                }
            }
            _ => {
                // reset stats
                cache.reset_stats();
                assert_eq!(cache.stats().lookups(), 0);
            }
        }

        assert!(cache.len() <= cache.capacity());
        cache.check_invariants().unwrap();
        idx += 2;
    }

    for pin in pins.drain(..) {
        cache.release(pin);
    }
    assert!(cache.iter().all(|e| !e.is_pinned()));
});
