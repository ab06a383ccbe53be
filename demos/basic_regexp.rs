//! Runs a few REGEXP / IREGEXP calls and prints the cache statistics.
//!
//! ```sh
//! RUST_LOG=regexkit=debug cargo run --example basic_regexp
//! ```

use regexkit::host::{RegexpFunctions, StatKey, Value};
use regexkit::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

fn main() -> Result<(), RegexpError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("regexkit=info"));
    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();

    let cache = CacheBuilder::new(4)
        .max_displayed_pattern_length(32)
        .try_build(AutomataEngine::new())
        .map_err(|err| RegexpError::InvalidArgument(err.to_string()))?;
    let funcs = RegexpFunctions::new(cache);

    let rows: [Value<'_>; 5] = [
        Value::from("alice@example.com"),
        Value::from("BOB@EXAMPLE.ORG"),
        Value::from("not an address"),
        Value::Integer(42),
        Value::Null,
    ];
    let email = Value::from(r"^[a-z0-9.]+@[a-z0-9.]+\.[a-z]+$");
    for row in rows {
        println!(
            "{row:?}: REGEXP={} IREGEXP={}",
            funcs.regexp(&[email, row])?,
            funcs.iregexp(&[email, row])?,
        );
    }

    match funcs.regexp(&[Value::from("(unclosed"), Value::from("x")]) {
        Ok(_) => println!("unexpected match"),
        Err(err) => println!("{err}"),
    }

    for key in StatKey::ALL {
        if key != StatKey::ResetStats {
            println!("{:>30}: {:?}", key.as_str(), funcs.regexp_stats(key.as_str())?);
        }
    }
    Ok(())
}
