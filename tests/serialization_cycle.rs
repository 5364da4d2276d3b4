//! Every built-in policy and the contexts it opens survive an encode/decode cycle.

mod common;

use relapse::{
    presets, AlwaysRetryPolicy, Classifier, CompositeRetryPolicy, DecodeError,
    ExceptionClassifierRetryPolicy, NeverRetryPolicy, Persist, PolicyKind, RetryContext,
    RetryError, RetryPolicy, SimpleRetryPolicy, Throwable, TimeoutRetryPolicy,
};

fn boom() -> Throwable {
    Throwable::io("boom")
}

#[test]
fn fresh_context_starts_at_zero() {
    for (name, policy) in presets::catalog() {
        let ctx = policy.open(None);
        assert_eq!(ctx.retry_count(), 0, "{}", name);
        assert!(ctx.last_throwable().is_none(), "{}", name);
        assert!(!ctx.is_closed(), "{}", name);
    }
}

#[test]
fn registration_is_counted_and_remembered() {
    for (name, policy) in presets::catalog() {
        let mut ctx = policy.open(None);
        policy.register_throwable(&mut ctx, boom()).unwrap();
        assert_eq!(ctx.retry_count(), 1, "{}", name);
        assert_eq!(ctx.last_throwable(), Some(&boom()), "{}", name);
    }
}

#[test]
fn context_survives_round_trip() {
    for (name, policy) in presets::catalog() {
        let mut ctx = policy.open(None);
        policy.register_throwable(&mut ctx, boom()).unwrap();

        let restored = RetryContext::decode(&ctx.encode().unwrap()).unwrap();
        assert_eq!(restored.retry_count(), 1, "{}", name);
        assert_eq!(restored.last_throwable(), Some(&boom()), "{}", name);
        assert_eq!(restored, ctx, "{}", name);
        assert_eq!(
            policy.can_retry(&restored).unwrap(),
            policy.can_retry(&ctx).unwrap(),
            "{}: restored context decides differently",
            name
        );
    }
}

#[test]
fn policy_survives_round_trip() {
    for (name, policy) in presets::catalog() {
        let restored = PolicyKind::decode(&policy.encode().unwrap()).unwrap();
        assert_eq!(restored, policy, "{}", name);

        let fresh = restored.open(None);
        assert_eq!(fresh.retry_count(), 0, "{}", name);
        assert_eq!(
            restored.can_retry(&fresh).unwrap(),
            policy.can_retry(&policy.open(None)).unwrap(),
            "{}: fresh decision differs",
            name
        );

        let mut ctx = policy.open(None);
        policy.register_throwable(&mut ctx, boom()).unwrap();
        let mut restored_ctx = restored.open(None);
        restored.register_throwable(&mut restored_ctx, boom()).unwrap();
        assert_eq!(
            restored.can_retry(&restored_ctx).unwrap(),
            policy.can_retry(&ctx).unwrap(),
            "{}: decision after one failure differs",
            name
        );
    }
}

#[test]
fn encoding_is_repeatable() {
    for (name, policy) in presets::catalog() {
        assert_eq!(policy.encode().unwrap(), policy.encode().unwrap(), "{}", name);

        let mut ctx = policy.open(None);
        policy.register_throwable(&mut ctx, boom()).unwrap();
        assert_eq!(ctx.encode().unwrap(), ctx.encode().unwrap(), "{}", name);
    }
}

#[test]
fn corrupted_bytes_are_rejected() {
    for (name, policy) in presets::catalog() {
        let bytes = policy.encode().unwrap();
        let truncated = &bytes[..bytes.len() - 1];
        assert!(PolicyKind::decode(truncated).is_err(), "{}", name);

        let mut ctx = policy.open(None);
        policy.register_throwable(&mut ctx, boom()).unwrap();
        let mut garbled = ctx.encode().unwrap();
        garbled[0] = b'#';
        assert!(
            matches!(RetryContext::decode(&garbled), Err(DecodeError::Malformed(_))),
            "{}",
            name
        );
    }
}

#[test]
fn text_form_round_trips_every_policy() {
    for (name, policy) in presets::catalog() {
        let text = policy.encode_to_string().unwrap();
        assert_eq!(PolicyKind::decode_from_str(&text).unwrap(), policy, "{}", name);
    }
}

#[test]
fn classifier_delegate_state_survives_round_trip() {
    let policy = ExceptionClassifierRetryPolicy::new(
        Classifier::new(PolicyKind::from(SimpleRetryPolicy::new(3).unwrap()))
            .with("invalid_argument", NeverRetryPolicy.into()),
    );
    let mut ctx = policy.open(None);
    policy.register_throwable(&mut ctx, boom()).unwrap();
    policy.register_throwable(&mut ctx, boom()).unwrap();

    let mut restored = RetryContext::decode(&ctx.encode().unwrap()).unwrap();
    assert_eq!(restored.sub_contexts().len(), 1);
    assert_eq!(restored.sub_contexts()[0].retry_count(), 2);
    assert!(policy.can_retry(&restored).unwrap());

    // the third failure exhausts the delegate that already counted two
    policy.register_throwable(&mut restored, boom()).unwrap();
    assert_eq!(restored.retry_count(), 3);
    assert!(!policy.can_retry(&restored).unwrap());
}

#[test]
fn decoded_context_for_another_composite_is_not_half_updated() {
    let written = CompositeRetryPolicy::new([AlwaysRetryPolicy, AlwaysRetryPolicy]);
    let bytes = written.open(None).encode().unwrap();

    let reader = CompositeRetryPolicy::new([
        PolicyKind::from(AlwaysRetryPolicy),
        TimeoutRetryPolicy::default().into(),
    ]);
    let mut ctx = RetryContext::decode(&bytes).unwrap();
    let err = reader.register_throwable(&mut ctx, boom()).unwrap_err();
    assert_eq!(err, RetryError::ForeignContext { expected: "timeout", found: "basic" });
    assert_eq!(ctx.retry_count(), 0);
    let child_counts: Vec<usize> = ctx.sub_contexts().iter().map(|c| c.retry_count()).collect();
    assert_eq!(child_counts, vec![0, 0]);
}

#[test]
fn empty_class_lineage_is_rejected() {
    let mut ctx = NeverRetryPolicy.open(None);
    NeverRetryPolicy.register_throwable(&mut ctx, boom()).unwrap();
    let mut json: serde_json::Value = serde_json::from_slice(&ctx.encode().unwrap()).unwrap();
    json["body"]["last_throwable"]["class"] = serde_json::json!([]);
    let bytes = serde_json::to_vec(&json).unwrap();
    assert!(matches!(RetryContext::decode(&bytes), Err(DecodeError::InvalidBody { .. })));

    json["body"]["last_throwable"]["class"] = serde_json::json!(["io"]);
    let bytes = serde_json::to_vec(&json).unwrap();
    assert!(matches!(RetryContext::decode(&bytes), Err(DecodeError::InvalidBody { .. })));
}

#[test]
fn concrete_policies_decode_only_their_own_kind() {
    let bytes = SimpleRetryPolicy::default().encode().unwrap();
    assert_eq!(SimpleRetryPolicy::decode(&bytes).unwrap(), SimpleRetryPolicy::default());
    assert!(matches!(
        NeverRetryPolicy::decode(&bytes),
        Err(DecodeError::KindMismatch { expected: "never_retry_policy", .. })
    ));
}

#[test]
fn decode_rejection_is_logged() {
    let logs = common::capture_logs(|| {
        let _ = RetryContext::decode(b"not an envelope");
    });
    assert!(logs.contains("rejected encoded payload"), "logs: {}", logs);
    assert!(logs.contains("retry_context"), "logs: {}", logs);
}
