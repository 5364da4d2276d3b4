//! Drive a flaky operation with a classifier policy and watch the decisions in the log.
//!
//! The subscriber prints everything down to trace level.
use relapse::prelude::*;
use relapse::presets;
use std::io;
use std::time::Duration;

fn flaky(attempt: usize) -> Result<&'static str, io::Error> {
    match attempt {
        1 | 2 => Err(io::Error::new(io::ErrorKind::ConnectionReset, "peer went away")),
        3 => Err(io::Error::new(io::ErrorKind::TimedOut, "slow upstream")),
        _ => Ok("payload"),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::TRACE).init();

    let policy = CompositeRetryPolicy::new([
        presets::transient_io(),
        TimeoutRetryPolicy::new(Duration::from_secs(5))?.into(),
    ]);

    let mut ctx = policy.open(None);
    let mut attempt = 0;
    let outcome = loop {
        if !policy.can_retry(&ctx)? {
            break None;
        }
        attempt += 1;
        match flaky(attempt) {
            Ok(value) => break Some(value),
            Err(e) => policy.register_throwable(&mut ctx, e.into())?,
        }
    };
    policy.close(&mut ctx)?;

    match outcome {
        Some(value) => println!("succeeded after {} attempt(s): {}", attempt, value),
        None => println!(
            "gave up after {} failure(s), last: {}",
            ctx.retry_count(),
            ctx.last_throwable().map(ToString::to_string).unwrap_or_default()
        ),
    }
    Ok(())
}
