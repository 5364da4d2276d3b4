use criterion::{black_box, criterion_group, criterion_main, Criterion};
use relapse::{presets, Persist, PolicyKind, RetryContext, RetryPolicy, Throwable};
use std::time::Duration;

// A context that went through a few classified failures, so delegate state is non-trivial.
fn busy_context(policy: &PolicyKind) -> RetryContext {
    let mut ctx = policy.open(None);
    ctx.set_attribute("operation", "fetch");
    for i in 0..4 {
        let failure = Throwable::io(format!("reset #{}", i))
            .caused_by(Throwable::runtime("socket closed"));
        policy.register_throwable(&mut ctx, failure).expect("open context");
    }
    ctx
}

fn context_round_trip(c: &mut Criterion) {
    let policy = presets::transient_io();
    let ctx = busy_context(&policy);
    let bytes = ctx.encode().expect("encode");

    c.bench_function("context_encode", |b| b.iter(|| black_box(&ctx).encode().expect("encode")));
    c.bench_function("context_decode", |b| {
        b.iter(|| RetryContext::decode(black_box(&bytes)).expect("decode"))
    });
}

fn policy_round_trip(c: &mut Criterion) {
    let policy = PolicyKind::from(relapse::CompositeRetryPolicy::new([
        presets::transient_io(),
        presets::bounded(10, Duration::from_secs(30)).expect("valid preset"),
    ]));
    let bytes = policy.encode().expect("encode");

    c.bench_function("policy_encode", |b| b.iter(|| black_box(&policy).encode().expect("encode")));
    c.bench_function("policy_decode", |b| {
        b.iter(|| PolicyKind::decode(black_box(&bytes)).expect("decode"))
    });
}

fn classify_and_decide(c: &mut Criterion) {
    let policy = presets::transient_io();
    c.bench_function("classifier_loop_5_attempts", |b| {
        b.iter(|| {
            let mut ctx = policy.open(None);
            while policy.can_retry(&ctx).expect("open") {
                policy.register_throwable(&mut ctx, Throwable::io("reset")).expect("open");
            }
            black_box(ctx.retry_count())
        })
    });
}

criterion_group!(benches, context_round_trip, policy_round_trip, classify_and_decide);
criterion_main!(benches);
