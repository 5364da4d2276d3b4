#![allow(dead_code)]

use relapse::{RetryContext, RetryError, RetryPolicy, Throwable};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::MakeWriter;

/// Run the retry loop an executor would: attempt while allowed, fail every attempt.
///
/// Returns the number of attempts made and the still-open context. `cap` bounds loops driven by
/// unbounded policies.
pub fn drive<P, F>(
    policy: &P,
    mut failure: F,
    cap: usize,
) -> Result<(usize, RetryContext), RetryError>
where
    P: RetryPolicy + ?Sized,
    F: FnMut(usize) -> Throwable,
{
    let mut ctx = policy.open(None);
    let mut attempts = 0;
    while attempts < cap && policy.can_retry(&ctx)? {
        attempts += 1;
        policy.register_throwable(&mut ctx, failure(attempts))?;
    }
    Ok((attempts, ctx))
}

#[derive(Clone)]
pub struct SharedWriter(pub Arc<Mutex<Vec<u8>>>);

impl<'a> MakeWriter<'a> for SharedWriter {
    type Writer = SharedGuard;
    fn make_writer(&'a self) -> Self::Writer {
        SharedGuard(self.0.clone())
    }
}

pub struct SharedGuard(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for SharedGuard {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut guard = self.0.lock().unwrap();
        guard.extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Run `f` with a debug-level subscriber writing into a buffer, and return what was logged.
pub fn capture_logs<F: FnOnce()>(f: F) -> String {
    let buffer = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::fmt()
        .with_writer(BoxMakeWriter::new(SharedWriter(buffer.clone())))
        .with_max_level(tracing::Level::TRACE)
        .with_target(true)
        .with_ansi(false)
        .without_time()
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    let logs = buffer.lock().unwrap().clone();
    String::from_utf8(logs).unwrap()
}
