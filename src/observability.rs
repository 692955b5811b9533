//! Counters and log initialization.

use std::sync::OnceLock;

use biometrics::{Collector, Counter, Moments};

pub(crate) static GATEWAY_REQUESTS: Counter = Counter::new("percent.gateway.requests");
pub(crate) static GATEWAY_REQUEST_ERRORS: Counter =
    Counter::new("percent.gateway.request_errors");

pub(crate) static STREAM_BYTES: Counter = Counter::new("percent.stream.bytes");
pub(crate) static STREAM_FRAMES: Counter = Counter::new("percent.stream.frames");
pub(crate) static STREAM_MALFORMED_FRAMES: Counter =
    Counter::new("percent.stream.malformed_frames");
pub(crate) static STREAM_TOKENS: Counter = Counter::new("percent.stream.tokens");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("percent.stream.errors");
pub(crate) static STREAM_DURATION: Moments = Moments::new("percent.stream.duration_seconds");

pub(crate) static CODEGEN_FILES_WRITTEN: Counter = Counter::new("percent.codegen.files_written");
pub(crate) static CODEGEN_FILES_APPENDED: Counter =
    Counter::new("percent.codegen.files_appended");
pub(crate) static CODEGEN_FILES_SKIPPED: Counter = Counter::new("percent.codegen.files_skipped");
pub(crate) static CODEGEN_FAILURES: Counter = Counter::new("percent.codegen.failures");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&GATEWAY_REQUESTS);
    collector.register_counter(&GATEWAY_REQUEST_ERRORS);

    collector.register_counter(&STREAM_BYTES);
    collector.register_counter(&STREAM_FRAMES);
    collector.register_counter(&STREAM_MALFORMED_FRAMES);
    collector.register_counter(&STREAM_TOKENS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_moments(&STREAM_DURATION);

    collector.register_counter(&CODEGEN_FILES_WRITTEN);
    collector.register_counter(&CODEGEN_FILES_APPENDED);
    collector.register_counter(&CODEGEN_FILES_SKIPPED);
    collector.register_counter(&CODEGEN_FAILURES);
}

static LOGGING: OnceLock<()> = OnceLock::new();

fn resolve_env_filter() -> tracing_subscriber::EnvFilter {
    if let Ok(level) = std::env::var("PERCENT_LOG")
        && let Ok(filter) = tracing_subscriber::EnvFilter::try_new(level)
    {
        return filter;
    }
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
}

/// Initialize logging once per process.
///
/// Logs go to stderr so they never interleave with streamed model output on
/// stdout. `PERCENT_LOG` takes precedence over `RUST_LOG`; the default level is
/// `warn`.
pub fn init_logging() {
    LOGGING.get_or_init(|| {
        let _ = tracing_subscriber::fmt()
            .compact()
            .with_target(false)
            .with_env_filter(resolve_env_filter())
            .with_writer(std::io::stderr)
            .try_init();
    });
}

/// Collects what the default `warn` filter would print.
#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct WarnCapture(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

#[cfg(test)]
impl WarnCapture {
    /// Routes this thread's logs into the capture until the guard drops.
    pub(crate) fn install(&self) -> tracing::subscriber::DefaultGuard {
        let sink = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || sink.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub(crate) fn output(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

#[cfg(test)]
impl std::io::Write for WarnCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_logging_is_idempotent() {
        init_logging();
        init_logging();
    }

    #[test]
    fn warn_capture_sees_warnings_only() {
        let capture = WarnCapture::default();
        {
            let _guard = capture.install();
            tracing::debug!("quiet detail");
            tracing::warn!("loud problem");
        }
        let output = capture.output();
        assert!(output.contains("loud problem"), "{output}");
        assert!(!output.contains("quiet detail"), "{output}");
    }
}
