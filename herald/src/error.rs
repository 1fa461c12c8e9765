// Copyright (c) 2020-present, UMD Database Group.
//
// This program is free software: you can use, redistribute, and/or modify
// it under the terms of the GNU Affero General Public License, version 3
// or later ("AGPL"), as published by the Free Software Foundation.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <http://www.gnu.org/licenses/>.

//! Herald error types

use std::error;
use std::fmt::{Display, Formatter};
use std::io;
use std::result;
use std::time::Duration;

/// Result type for operations that could result in an [HeraldError]
pub type Result<T> = result::Result<T, HeraldError>;

/// Herald error
#[derive(Debug)]
pub enum HeraldError {
    /// The named resource does not exist. A pipeline name carried by an event
    /// that cannot be resolved is a data inconsistency, so it is never
    /// retried.
    NotFound(String),
    /// A transient failure of an external call (network, throttling, 5xx).
    /// This is the only error that the retry policy acts on.
    Unavailable(String),
    /// Malformed configuration, e.g. an empty tag value list. Raised while a
    /// workflow is being defined and never observed by a run.
    Fatal(String),
    /// A workflow run exceeded its deadline.
    Timeout(Duration),
    /// Error returned when accessing the AWS services fails in a way that
    /// retrying will not fix (authorization, validation, ...).
    AWS(String),
    /// Error associated to Lambda runtime execution.
    LambdaError(Box<dyn std::error::Error + Send + Sync>),
    /// Error associated to I/O operations and associated traits.
    IoError(io::Error),
    /// Error returned when serde_json failed to serialize or deserialize data.
    SerdeJson(serde_json::Error),
    /// Error returned as a consequence of an error in Herald.
    /// Herald has internal invariants that we are unable to ask the
    /// compiler to check for us. This error is raised when one of those
    /// invariants is not verified during execution.
    Internal(String),
}

impl HeraldError {
    /// Returns true if the failed call may succeed when it is attempted again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, HeraldError::Unavailable(_))
    }

    /// A short, stable name of the error class, used in run outcomes.
    pub fn kind(&self) -> &'static str {
        match self {
            HeraldError::NotFound(_) => "NotFound",
            HeraldError::Unavailable(_) => "Unavailable",
            HeraldError::Fatal(_) => "Fatal",
            HeraldError::Timeout(_) => "Timeout",
            HeraldError::AWS(_) => "AWS",
            HeraldError::LambdaError(_) => "Lambda",
            HeraldError::IoError(_) => "Io",
            HeraldError::SerdeJson(_) => "SerdeJson",
            HeraldError::Internal(_) => "Internal",
        }
    }
}

impl From<io::Error> for HeraldError {
    fn from(e: io::Error) -> Self {
        HeraldError::IoError(e)
    }
}

impl From<serde_json::Error> for HeraldError {
    fn from(e: serde_json::Error) -> Self {
        HeraldError::SerdeJson(e)
    }
}

impl From<ini::ParseError> for HeraldError {
    fn from(e: ini::ParseError) -> Self {
        HeraldError::Fatal(format!("invalid config.toml: {}", e))
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for HeraldError {
    fn from(e: Box<dyn std::error::Error + Send + Sync>) -> Self {
        HeraldError::LambdaError(e)
    }
}

impl From<&str> for HeraldError {
    fn from(e: &str) -> Self {
        HeraldError::Internal(e.to_string())
    }
}

impl Display for HeraldError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match *self {
            HeraldError::NotFound(ref desc) => write!(f, "Resource not found: {}", desc),
            HeraldError::Unavailable(ref desc) => write!(f, "Service unavailable: {}", desc),
            HeraldError::Fatal(ref desc) => write!(f, "Invalid configuration: {}", desc),
            HeraldError::Timeout(ref limit) => {
                write!(f, "Run timed out after {}", humantime::format_duration(*limit))
            }
            HeraldError::AWS(ref desc) => write!(f, "AWS error: {}", desc),
            HeraldError::LambdaError(ref desc) => write!(f, "Lambda error: {}", desc),
            HeraldError::IoError(ref desc) => write!(f, "IO error: {}", desc),
            HeraldError::SerdeJson(ref desc) => write!(f, "serde_json error: {:?}", desc),
            HeraldError::Internal(ref desc) => write!(
                f,
                "Internal error: {}. This was likely caused by a bug in Herald's \
                    code and we would welcome that you file an bug report in our issue tracker",
                desc
            ),
        }
    }
}

impl error::Error for HeraldError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unavailable_is_retryable() {
        assert!(HeraldError::Unavailable("throttled".to_owned()).is_retryable());
        assert!(!HeraldError::NotFound("deploy-pl".to_owned()).is_retryable());
        assert!(!HeraldError::Fatal("empty tag values".to_owned()).is_retryable());
        assert!(!HeraldError::AWS("access denied".to_owned()).is_retryable());
        assert!(!HeraldError::Timeout(Duration::from_secs(1)).is_retryable());
    }

    #[test]
    fn display_timeout() {
        let err = HeraldError::Timeout(Duration::from_secs(300));
        assert_eq!(err.to_string(), "Run timed out after 5m");
        assert_eq!(err.kind(), "Timeout");
    }
}
