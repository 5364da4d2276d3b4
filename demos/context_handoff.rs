//! Persist a retry loop halfway through and resume it elsewhere.
//!
//! The policy travels as base64 text (think job queue), the context as bytes (think database
//! row). The resumed loop continues counting where the first one stopped.
use relapse::prelude::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().init();

    let policy: PolicyKind = SimpleRetryPolicy::builder()
        .max_attempts(4)
        .abort_on("invalid_argument")
        .build()?
        .into();

    // first worker: two failures, then it is shut down
    let mut ctx = policy.open(None);
    ctx.set_attribute("job", "invoice-7");
    for _ in 0..2 {
        policy.register_throwable(&mut ctx, Throwable::io("upstream unavailable"))?;
    }
    let policy_text = policy.encode_to_string()?;
    let ctx_bytes = ctx.encode()?;

    // second worker picks the job up
    let policy = PolicyKind::decode_from_str(&policy_text)?;
    let mut ctx = RetryContext::decode(&ctx_bytes)?;
    println!(
        "resuming {} at attempt {} (limit {:?})",
        ctx.attribute("job").unwrap_or("?"),
        ctx.retry_count() + 1,
        policy.max_attempts()
    );
    while policy.can_retry(&ctx)? {
        policy.register_throwable(&mut ctx, Throwable::io("still unavailable"))?;
    }
    policy.close(&mut ctx)?;
    println!("exhausted after {} attempts", ctx.retry_count());

    // a corrupted payload is refused outright
    let mut damaged = ctx_bytes;
    damaged.truncate(damaged.len() / 2);
    if let Err(e) = RetryContext::decode(&damaged) {
        println!("refused damaged context: {}", e);
    }
    Ok(())
}
