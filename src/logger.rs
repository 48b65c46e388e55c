use log::Level;

/// Receives diagnostics about individual request attempts.
///
/// All methods default to doing nothing, so implementations only override what they need.
/// Independently of this trait, the client always emits records through the
/// [`log`](https://docs.rs/log/latest/log/) facade under the `hyphen` target.
///
/// # Examples
///
/// ```
/// # use hyphen_toggle::Logger;
/// struct StderrLogger;
///
/// impl Logger for StderrLogger {
///     fn error(&self, message: &str) {
///         eprintln!("hyphen: {message}");
///     }
/// }
/// ```
///
/// # Errors
///
/// Methods cannot return errors and should not panic. Logging never fails a client call.
pub trait Logger {
    /// Low-level detail, e.g. which URL is being tried.
    fn debug(&self, _message: &str) {}

    /// Notable events, e.g. a successful response.
    fn info(&self, _message: &str) {}

    /// A failed attempt.
    fn error(&self, _message: &str) {}
}

/// A [`Logger`] that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl Logger for NoopLogger {}

impl<T: Fn(Level, &str)> Logger for T {
    fn debug(&self, message: &str) {
        self(Level::Debug, message);
    }

    fn info(&self, message: &str) {
        self(Level::Info, message);
    }

    fn error(&self, message: &str) {
        self(Level::Error, message);
    }
}
