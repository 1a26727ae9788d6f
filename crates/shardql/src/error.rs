use derive_more::Display;
use serde::{Deserialize, Serialize};
use shardql_config::ConfigError;
use shardql_core::error::{
    ErrorClass as CoreErrorClass, ErrorDetail, ErrorOrigin as CoreErrorOrigin, InternalError,
};
use thiserror::Error as ThisError;

///
/// Error
/// Public error type with a stable kind + origin taxonomy.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize, ThisError)]
#[error("{message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            kind,
            origin,
            message: message.into(),
        }
    }
}

impl From<InternalError> for Error {
    fn from(err: InternalError) -> Self {
        let kind = match err.class {
            CoreErrorClass::Configuration => ErrorKind::Configuration,
            CoreErrorClass::Argument => ErrorKind::Argument,
            CoreErrorClass::Policy => ErrorKind::Policy,
            CoreErrorClass::Execution => ErrorKind::Execution(ExecutionError {
                shard: match &err.detail {
                    Some(ErrorDetail::Execution { shard, .. }) => Some(shard.to_string()),
                    None => None,
                },
                sql: err.failed_sql().map(str::to_string),
            }),
            CoreErrorClass::Internal => ErrorKind::Internal,
        };

        Self::new(kind, err.origin.into(), err.message)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        InternalError::from(err).into()
    }
}

///
/// ErrorKind
/// Public error taxonomy for callers and transports.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ErrorKind {
    /// Sharding metadata or registry wiring is wrong.
    Configuration,

    /// Malformed condition or statement.
    Argument,

    /// The query cannot be merged across the shards it routed to.
    Policy,

    Execution(ExecutionError),

    /// The caller cannot remediate this.
    Internal,
}

///
/// ExecutionError
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ExecutionError {
    pub shard: Option<String>,

    /// Statement with its bindings rendered as literals.
    pub sql: Option<String>,
}

///
/// ErrorOrigin
/// Public origin taxonomy for callers and transports.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
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

impl From<CoreErrorOrigin> for ErrorOrigin {
    fn from(origin: CoreErrorOrigin) -> Self {
        match origin {
            CoreErrorOrigin::Build => Self::Build,
            CoreErrorOrigin::Command => Self::Command,
            CoreErrorOrigin::Condition => Self::Condition,
            CoreErrorOrigin::Config => Self::Config,
            CoreErrorOrigin::Extract => Self::Extract,
            CoreErrorOrigin::Response => Self::Response,
            CoreErrorOrigin::Route => Self::Route,
            CoreErrorOrigin::Session => Self::Session,
        }
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use shardql_core::db::route::RouteError;

    #[test]
    fn route_errors_surface_as_configuration() {
        let err: Error = InternalError::from(RouteError::UnknownShardingType {
            sharding_type: "region".to_string(),
        })
        .into();

        assert_eq!(err.kind, ErrorKind::Configuration);
        assert_eq!(err.origin, ErrorOrigin::Route);
    }

    #[test]
    fn config_errors_keep_their_origin() {
        let err: Error = ConfigError::UnknownShard {
            shard: "db3".to_string(),
        }
        .into();

        assert_eq!(err.origin, ErrorOrigin::Config);
        assert!(err.message.contains("db3"));
    }

    #[test]
    fn error_survives_json_transport() {
        let err = Error::new(
            ErrorKind::Execution(ExecutionError {
                shard: Some("db1".to_string()),
                sql: Some("DELETE FROM \"t\"".to_string()),
            }),
            ErrorOrigin::Command,
            "shard 'db1' failed: deadlock",
        );

        let json = serde_json::to_string(&err).unwrap();
        let back: Error = serde_json::from_str(&json).unwrap();

        assert_eq!(back, err);
    }
}
