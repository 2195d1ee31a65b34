//! Error types and result definitions for signing pipeline operations.
//!
//! Provides an error system with classification, aggregation, and captured diagnostic metadata.
//! The [`SignerError`] type supports single errors, errors with additional detail, and multiple
//! aggregated errors, which is how failures of several concurrently running stages or per-item
//! tasks are reported together.

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::error;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use tokio::task::JoinError;

/// Convenient result type for signing operations using [`SignerError`] as the error type.
pub type SignerResult<T> = Result<T, SignerError>;

/// Detailed payload stored for single [`SignerError`] instances.
#[derive(Debug, Clone)]
struct ErrorPayload {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
    backtrace: Arc<Backtrace>,
}

/// Main error type for signing pipeline operations.
///
/// [`SignerError`] can represent a single failure or an aggregation of failures collected
/// from many tasks. Aggregation is what a completion barrier produces when more than one
/// of the tasks it waited for failed.
#[derive(Debug, Clone)]
pub struct SignerError {
    repr: ErrorRepr,
}

/// Internal representation of error data.
#[derive(Debug, Clone)]
enum ErrorRepr {
    /// Single error payload holding rich metadata.
    Single(ErrorPayload),
    /// Multiple aggregated errors, typically from several stages or per-item tasks.
    Many {
        errors: Vec<SignerError>,
        location: &'static Location<'static>,
    },
}

/// Specific categories of errors that can occur while running a pipeline.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // Queue Errors
    QueueClosed,

    // Signer & Resource Errors
    SignerFailed,
    ResourceOverheated,

    // Task Errors
    TaskPanicked,
    TaskCancelled,
    InvalidState,

    // Configuration & IO Errors
    ConfigError,
    IoError,

    // Unknown / Uncategorized
    Unknown,

    // Error kind produced by fault injection in tests.
    #[cfg(feature = "failpoints")]
    InjectedFailure,
}

impl SignerError {
    /// Returns the [`ErrorKind`] of this error.
    ///
    /// For multiple errors, returns the kind of the first error or [`ErrorKind::Unknown`]
    /// if the error list is empty.
    pub fn kind(&self) -> ErrorKind {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.kind,
            ErrorRepr::Many { ref errors, .. } => errors
                .first()
                .map(|err| err.kind())
                .unwrap_or(ErrorKind::Unknown),
        }
    }

    /// Returns all [`ErrorKind`]s present in this error, flattened.
    pub fn kinds(&self) -> Vec<ErrorKind> {
        match self.repr {
            ErrorRepr::Single(ref payload) => vec![payload.kind],
            ErrorRepr::Many { ref errors, .. } => {
                errors.iter().flat_map(|err| err.kinds()).collect()
            }
        }
    }

    /// Returns the aggregated errors, or [`None`] for a single error.
    pub fn errors(&self) -> Option<&[SignerError]> {
        match self.repr {
            ErrorRepr::Single(_) => None,
            ErrorRepr::Many { ref errors, .. } => Some(errors),
        }
    }

    /// Returns the detailed error information if available.
    ///
    /// For multiple errors, returns the detail of the first error that has one.
    pub fn detail(&self) -> Option<&str> {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.detail.as_deref(),
            ErrorRepr::Many { ref errors, .. } => errors.iter().find_map(|e| e.detail()),
        }
    }

    /// Returns the captured backtrace for this error.
    pub fn backtrace(&self) -> Option<&Backtrace> {
        match self.repr {
            ErrorRepr::Single(ref payload) => Some(payload.backtrace.as_ref()),
            ErrorRepr::Many { .. } => None,
        }
    }

    /// Returns the captured callsite location for this error.
    pub fn location(&self) -> &'static Location<'static> {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.location,
            ErrorRepr::Many { location, .. } => location,
        }
    }

    /// Attaches an originating [`error::Error`] to this error and returns the modified instance.
    ///
    /// Has no effect on aggregated errors, which forward their first contained error as source.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        if let ErrorRepr::Single(ref mut payload) = self.repr {
            payload.source = Some(Arc::new(source));
        }

        self
    }

    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    ) -> Self {
        SignerError {
            repr: ErrorRepr::Single(ErrorPayload {
                kind,
                description,
                detail,
                source,
                location: Location::caller(),
                backtrace: Arc::new(Backtrace::capture()),
            }),
        }
    }
}

impl PartialEq for SignerError {
    fn eq(&self, other: &SignerError) -> bool {
        match (&self.repr, &other.repr) {
            (ErrorRepr::Single(a), ErrorRepr::Single(b)) => a.kind == b.kind,
            (
                ErrorRepr::Many {
                    errors: errors_a, ..
                },
                ErrorRepr::Many {
                    errors: errors_b, ..
                },
            ) => {
                errors_a.len() == errors_b.len()
                    && errors_a.iter().zip(errors_b.iter()).all(|(a, b)| a == b)
            }
            _ => false,
        }
    }
}

impl fmt::Display for SignerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            ErrorRepr::Single(payload) => {
                let location = payload.location;
                write!(
                    f,
                    "[{:?}] {} @ {}:{}:{}",
                    payload.kind,
                    payload.description,
                    location.file(),
                    location.line(),
                    location.column()
                )?;

                if let Some(detail) = payload.detail.as_deref() {
                    write!(f, "\n  Detail:")?;
                    for line in detail.lines() {
                        write!(f, "\n    {line}")?;
                    }
                }

                Ok(())
            }
            ErrorRepr::Many { errors, location } => {
                let count = errors.len();
                write!(
                    f,
                    "[Many] {} error{} aggregated @ {}:{}:{}",
                    count,
                    if count == 1 { "" } else { "s" },
                    location.file(),
                    location.line(),
                    location.column()
                )?;

                for (index, error) in errors.iter().enumerate() {
                    let rendered = error.to_string();
                    let mut lines = rendered.lines();
                    match lines.next() {
                        Some(first_line) => write!(f, "\n  {}. {}", index + 1, first_line)?,
                        None => write!(f, "\n  {}.", index + 1)?,
                    }

                    for line in lines {
                        write!(f, "\n     {line}")?;
                    }
                }

                Ok(())
            }
        }
    }
}

impl error::Error for SignerError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &self.repr {
            ErrorRepr::Single(payload) => payload
                .source
                .as_ref()
                .map(|source| source as &(dyn error::Error + 'static)),
            ErrorRepr::Many { errors, .. } => errors
                .first()
                .map(|error| error as &(dyn error::Error + 'static)),
        }
    }
}

/// Creates a [`SignerError`] from an error kind and static description.
impl From<(ErrorKind, &'static str)> for SignerError {
    #[track_caller]
    fn from((kind, desc): (ErrorKind, &'static str)) -> SignerError {
        SignerError::from_components(kind, Cow::Borrowed(desc), None, None)
    }
}

/// Creates a [`SignerError`] from an error kind, static description, and dynamic detail.
impl<D> From<(ErrorKind, &'static str, D)> for SignerError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, desc, detail): (ErrorKind, &'static str, D)) -> SignerError {
        SignerError::from_components(kind, Cow::Borrowed(desc), Some(detail.into()), None)
    }
}

/// Creates a [`SignerError`] from a vector of errors for aggregation.
///
/// A vector holding exactly one error yields that error unchanged.
impl<E> From<Vec<E>> for SignerError
where
    E: Into<SignerError>,
{
    #[track_caller]
    fn from(errors: Vec<E>) -> SignerError {
        let location = Location::caller();

        let mut errors: Vec<SignerError> = errors.into_iter().map(Into::into).collect();
        if errors.len() == 1 {
            if let Some(error) = errors.pop() {
                return error;
            }
        }

        SignerError {
            repr: ErrorRepr::Many { errors, location },
        }
    }
}

/// Converts [`std::io::Error`] to [`SignerError`] with [`ErrorKind::IoError`].
impl From<std::io::Error> for SignerError {
    #[track_caller]
    fn from(err: std::io::Error) -> SignerError {
        let detail = err.to_string();
        SignerError::from_components(
            ErrorKind::IoError,
            Cow::Borrowed("I/O operation failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// Converts a failed task join into [`ErrorKind::TaskPanicked`] or [`ErrorKind::TaskCancelled`].
impl From<JoinError> for SignerError {
    #[track_caller]
    fn from(err: JoinError) -> SignerError {
        let (kind, description) = if err.is_cancelled() {
            (ErrorKind::TaskCancelled, "Task was cancelled before completing")
        } else {
            (ErrorKind::TaskPanicked, "Task panicked")
        };

        let detail = err.to_string();
        SignerError::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer_error;

    #[test]
    fn single_error_exposes_kind_and_detail() {
        let err = signer_error!(
            ErrorKind::QueueClosed,
            "Output queue closed",
            "stage 'combine'"
        );

        assert_eq!(err.kind(), ErrorKind::QueueClosed);
        assert_eq!(err.kinds(), vec![ErrorKind::QueueClosed]);
        assert_eq!(err.detail(), Some("stage 'combine'"));
        assert!(err.errors().is_none());
        assert!(err.to_string().starts_with("[QueueClosed] Output queue closed @"));
    }

    #[test]
    fn vector_of_one_error_is_not_wrapped() {
        let err: SignerError = vec![signer_error!(ErrorKind::SignerFailed, "Signer failed")].into();

        assert!(err.errors().is_none());
        assert_eq!(err.kind(), ErrorKind::SignerFailed);
    }

    #[test]
    fn aggregated_errors_flatten_kinds() {
        let nested: SignerError = vec![
            signer_error!(ErrorKind::TaskPanicked, "Task panicked"),
            signer_error!(ErrorKind::InvalidState, "Missing slot"),
        ]
        .into();
        let err: SignerError = vec![
            signer_error!(ErrorKind::ResourceOverheated, "Overheated"),
            nested,
        ]
        .into();

        assert_eq!(err.kind(), ErrorKind::ResourceOverheated);
        assert_eq!(
            err.kinds(),
            vec![
                ErrorKind::ResourceOverheated,
                ErrorKind::TaskPanicked,
                ErrorKind::InvalidState
            ]
        );
        assert_eq!(err.errors().map(|errors| errors.len()), Some(2));
        assert!(err.to_string().starts_with("[Many] 2 errors aggregated"));
    }

    #[test]
    fn empty_aggregation_has_unknown_kind() {
        let err: SignerError = Vec::<SignerError>::new().into();

        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert!(err.kinds().is_empty());
    }

    #[test]
    fn io_error_keeps_source() {
        let err: SignerError = std::io::Error::other("disk on fire").into();

        assert_eq!(err.kind(), ErrorKind::IoError);
        assert!(error::Error::source(&err).is_some());
        assert_eq!(err.detail(), Some("disk on fire"));
    }

    #[tokio::test]
    async fn join_error_maps_to_task_kinds() {
        let panicked = tokio::spawn(async { panic!("boom") }).await.unwrap_err();
        assert_eq!(SignerError::from(panicked).kind(), ErrorKind::TaskPanicked);

        let handle = tokio::spawn(std::future::pending::<()>());
        handle.abort();
        let cancelled = handle.await.unwrap_err();
        assert_eq!(SignerError::from(cancelled).kind(), ErrorKind::TaskCancelled);
    }
}
