//! Pins a pattern in a shared cache while worker threads churn through
//! other patterns.

use std::thread;

use regexkit::prelude::*;

fn main() -> Result<(), RegexpError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cache = SharedPatternCache::with_config(
        AutomataEngine::new(),
        CacheConfig {
            capacity: 2,
            ..CacheConfig::default()
        },
    )
    .map_err(|err| RegexpError::InvalidArgument(err.to_string()))?;

    let lease = cache.lease(br"^ERROR\b", CaseMode::Sensitive)?;
    println!("pinned {:?}", lease.entry());

    let workers: Vec<_> = (0..4)
        .map(|t| {
            let cache = cache.clone();
            thread::spawn(move || -> Result<usize, RegexpError> {
                let mut hits = 0;
                for i in 0..50 {
                    let pattern = format!("worker{t}-{}", i % 5);
                    if cache.matches(pattern.as_bytes(), CaseMode::Sensitive, b"worker1-3")? {
                        hits += 1;
                    }
                }
                Ok(hits)
            })
        })
        .collect();
    for (t, worker) in workers.into_iter().enumerate() {
        match worker.join() {
            Ok(hits) => println!("worker {t}: {} hits", hits?),
            Err(_) => println!("worker {t} panicked"),
        }
    }

    for line in ["ERROR disk full", "WARN slow", "ERRORS are fine"] {
        println!("{line:?}: {}", lease.is_match(line.as_bytes())?);
    }
    let stats = cache.stats();
    println!(
        "compiled={} hits={} misses={} evictions={} ratio={:.2}",
        stats.compilations,
        stats.hits,
        stats.misses,
        stats.evictions,
        stats.hit_ratio()
    );
    drop(lease);
    Ok(())
}
