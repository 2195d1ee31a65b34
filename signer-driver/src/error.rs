use std::backtrace::Backtrace;
use std::error::Error;
use std::fmt;

use signer::error::SignerError;

fn should_render_backtrace() -> bool {
    matches!(
        std::env::var("RUST_BACKTRACE").as_deref(),
        Ok("1") | Ok("full")
    )
}

pub type DriverResult<T> = Result<T, DriverError>;

/// Captured backtrace for non-pipeline variants.
pub struct CapturedBacktrace(Backtrace);

impl CapturedBacktrace {
    fn capture() -> Self {
        Self(Backtrace::capture())
    }
}

impl fmt::Debug for CapturedBacktrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error type of the signer driver.
#[derive(Debug)]
pub enum DriverError {
    /// The signing pipeline failed.
    Signer(SignerError),
    /// Configuration could not be loaded or is invalid.
    Config(Box<dyn Error + Send + Sync>, CapturedBacktrace),
    /// Runtime or terminal I/O failed.
    Io(std::io::Error, CapturedBacktrace),
}

impl DriverError {
    /// Returns a short category label for this error.
    pub fn category(&self) -> &'static str {
        match self {
            DriverError::Signer(_) => "pipeline error",
            DriverError::Config(_, _) => "configuration error",
            DriverError::Io(_, _) => "i/o error",
        }
    }

    pub fn backtrace(&self) -> Option<&Backtrace> {
        match self {
            DriverError::Signer(err) => err.backtrace(),
            DriverError::Config(_, cb) => Some(&cb.0),
            DriverError::Io(_, cb) => Some(&cb.0),
        }
    }

    /// Wraps any configuration failure.
    pub fn config<E: Error + Send + Sync + 'static>(err: E) -> Self {
        DriverError::Config(Box::new(err), CapturedBacktrace::capture())
    }

    /// Returns a user-oriented report for terminal output.
    ///
    /// Aggregated pipeline errors already list every failure, so their cause chain is omitted.
    pub fn render_report(&self) -> String {
        let mut out = String::new();
        out.push_str("signer-driver failed\n");
        out.push_str(&format!("category: {}\n", self.category()));
        out.push_str(&format!("error: {self}\n"));

        if !matches!(self, DriverError::Signer(err) if err.errors().is_some()) {
            let mut source = Error::source(self);
            let mut idx = 1usize;
            while let Some(err) = source {
                out.push_str(&format!("cause {idx}: {err}\n"));
                source = err.source();
                idx += 1;
            }
        }

        if should_render_backtrace() {
            if let Some(backtrace) = self.backtrace() {
                out.push_str("backtrace:\n");
                out.push_str(&backtrace.to_string());
                if !out.ends_with('\n') {
                    out.push('\n');
                }
            }
        }

        out
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverError::Signer(err) => write!(f, "{err}"),
            DriverError::Config(source, _) => write!(f, "configuration error: {source}"),
            DriverError::Io(source, _) => write!(f, "i/o error: {source}"),
        }
    }
}

impl Error for DriverError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DriverError::Signer(err) => err.source(),
            DriverError::Config(source, _) => Some(source.as_ref()),
            DriverError::Io(source, _) => Some(source),
        }
    }
}

impl From<std::io::Error> for DriverError {
    fn from(err: std::io::Error) -> Self {
        DriverError::Io(err, CapturedBacktrace::capture())
    }
}

impl From<SignerError> for DriverError {
    fn from(err: SignerError) -> Self {
        DriverError::Signer(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signer::error::ErrorKind;
    use signer::signer_error;
    use signer_config::shared::ValidationError;

    #[test]
    fn report_lists_category_and_causes() {
        let err = DriverError::config(ValidationError::InvalidFieldValue {
            field: "signer.cheap_latency_ms".to_string(),
            constraint: "must be at most 60000".to_string(),
        });

        let report = err.render_report();
        assert!(report.starts_with("signer-driver failed\ncategory: configuration error\n"));
        assert!(report.contains("cause 1: Invalid value for `signer.cheap_latency_ms`"));
    }

    #[test]
    fn aggregated_pipeline_error_skips_cause_chain() {
        let err: DriverError = SignerError::from(vec![
            signer_error!(ErrorKind::ResourceOverheated, "Overheated"),
            signer_error!(ErrorKind::QueueClosed, "Queue closed"),
        ])
        .into();

        let report = err.render_report();
        assert!(report.contains("category: pipeline error"));
        assert!(report.contains("[Many] 2 errors aggregated"));
        assert!(!report.contains("cause 1"));
    }
}
