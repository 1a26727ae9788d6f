use crate::db::route::ShardId;
use std::fmt;
use thiserror::Error as ThisError;

/// Boxed driver-level failure carried as the source of an execution error.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

///
/// InternalError
///
/// Structured runtime error with a stable classification.
/// Module-level errors (`ConditionError`, `RouteError`, ...) convert into this
/// type at the session boundary; the facade crate maps it into its public
/// `Error`.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,

    /// Optional structured error detail.
    pub detail: Option<ErrorDetail>,

    /// Underlying cause, when one exists (driver failures).
    #[source]
    pub source: Option<BoxError>,
}

impl InternalError {
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
            detail: None,
            source: None,
        }
    }

    /// Construct an internal invariant violation.
    pub(crate) fn invariant(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::Internal,
            origin,
            format!("invariant violated: {}", message.into()),
        )
    }

    /// Construct a per-shard execution failure.
    ///
    /// The message names the shard and the rendered SQL so logs stay useful
    /// even when the detail payload is dropped.
    pub(crate) fn execution(shard: ShardId, sql: String, cause: BoxError) -> Self {
        let message = format!("shard '{shard}' failed: {cause}\nThe SQL being executed was: {sql}");

        Self {
            class: ErrorClass::Execution,
            origin: ErrorOrigin::Command,
            message,
            detail: Some(ErrorDetail::Execution { shard, sql }),
            source: Some(cause),
        }
    }

    #[must_use]
    pub const fn is_policy(&self) -> bool {
        matches!(self.class, ErrorClass::Policy)
    }

    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self.class, ErrorClass::Configuration)
    }

    #[must_use]
    pub const fn is_argument(&self) -> bool {
        matches!(self.class, ErrorClass::Argument)
    }

    /// Shard that failed, for execution errors.
    #[must_use]
    pub const fn failed_shard(&self) -> Option<&ShardId> {
        match &self.detail {
            Some(ErrorDetail::Execution { shard, .. }) => Some(shard),
            None => None,
        }
    }

    /// Rendered SQL of the failing statement, for execution errors.
    #[must_use]
    pub fn failed_sql(&self) -> Option<&str> {
        match &self.detail {
            Some(ErrorDetail::Execution { sql, .. }) => Some(sql),
            None => None,
        }
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

///
/// ErrorClass
/// Internal error taxonomy for runtime classification.
/// Not a stable API; may change without notice.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    /// Missing sharding metadata, empty primary key, unregistered coordinator
    /// or backend.
    Configuration,
    /// Malformed condition operands.
    Argument,
    /// Query shape that cannot be merged across the resolved shards.
    Policy,
    /// A shard statement failed.
    Execution,
    Internal,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Configuration => "configuration",
            Self::Argument => "argument",
            Self::Policy => "policy",
            Self::Execution => "execution",
            Self::Internal => "internal",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Internal origin taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Build,
    Command,
    Condition,
    Config,
    Extract,
    Response,
    Route,
    Session,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Build => "build",
            Self::Command => "command",
            Self::Condition => "condition",
            Self::Config => "config",
            Self::Extract => "extract",
            Self::Response => "response",
            Self::Route => "route",
            Self::Session => "session",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorDetail
///
/// Structured, origin-specific error detail carried by [`InternalError`].
///

#[derive(Debug, Eq, PartialEq)]
pub enum ErrorDetail {
    Execution { shard: ShardId, sql: String },
}
