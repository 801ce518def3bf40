use locksmith::{ErrorCode, Locksmith};
use std::sync::mpsc;
use std::time::Duration;

pub const DEADLOCK_TIMEOUT: Duration = Duration::from_secs(3);
#[allow(dead_code)]
pub const NO_DEADLOCK_TIMEOUT: Duration = Duration::from_millis(500);

pub struct ReporterHarness {
    pub rx: mpsc::Receiver<(ErrorCode, String)>,
}

/// Installs a process-wide error callback that forwards every report over
/// an `mpsc` channel. Locksmith's callback slot is process-global and
/// last-writer-wins, so tests in the same binary that rely on this harness
/// must not run concurrently with each other; `cargo test` gives each
/// integration test binary its own process, which is enough isolation here
/// since every scenario below lives in its own file.
pub fn start_reporter() -> ReporterHarness {
    let (tx, rx) = mpsc::channel();
    Locksmith::new()
        .callback(move |code, message| {
            let _ = tx.send((code, message.to_string()));
        })
        .start()
        .expect("Locksmith::start should only be called once per test binary");
    ReporterHarness { rx }
}

#[allow(dead_code)]
pub fn expect_report(h: &ReporterHarness, code: ErrorCode, timeout: Duration) -> String {
    match h.rx.recv_timeout(timeout) {
        Ok((got, message)) => {
            assert_eq!(got, code, "unexpected error code reported");
            message
        }
        Err(_) => panic!("no {code} report received within {timeout:?}"),
    }
}

#[allow(dead_code)]
pub fn assert_no_report(h: &ReporterHarness, timeout: Duration) {
    assert!(
        h.rx.recv_timeout(timeout).is_err(),
        "unexpected report received"
    );
}
