//! Injected lifecycle logging.
//!
//! The reconciler reports high-level events (`init`, ...) through a
//! [`LedgerLogger`] handed to it by the caller. Step-level detail always goes
//! to the `log` facade at debug level.

/// Receiver for ledger lifecycle events.
pub trait LedgerLogger: Send + Sync {
    fn log(&self, event: &str, message: &str);
}

/// Discards every event. The default.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLogger;

impl LedgerLogger for NullLogger {
    fn log(&self, _event: &str, _message: &str) {}
}

/// Forwards events to the `log` facade at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct FacadeLogger;

impl LedgerLogger for FacadeLogger {
    fn log(&self, event: &str, message: &str) {
        log::info!("[{event}] {message}");
    }
}

impl<F> LedgerLogger for F
where
    F: Fn(&str, &str) + Send + Sync,
{
    fn log(&self, event: &str, message: &str) {
        self(event, message)
    }
}
