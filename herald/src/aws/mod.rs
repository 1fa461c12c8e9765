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

//! This crate contains the AWS implementations of the capabilities of a
//! workflow run: CodePipeline for name resolution, the Resource Groups
//! Tagging API for tag lookups and SNS for notifications.

pub mod codepipeline;
pub mod sns;
pub mod tagging;

pub use codepipeline::CodePipelineResolver;
pub use sns::SnsTopic;
pub use tagging::TaggingDirectory;

use crate::configs::WorkflowConfig;
use crate::error::{HeraldError, Result};
use crate::workflow::Workflow;
use rusoto_core::request::BufferedHttpResponse;
use rusoto_core::RusotoError;
use std::error::Error;
use std::sync::Arc;

/// Creates a workflow backed by the AWS services of the default region.
pub fn aws_workflow(config: &WorkflowConfig) -> Result<Workflow> {
    Workflow::new(
        config,
        Arc::new(CodePipelineResolver::new()),
        Arc::new(TaggingDirectory::new()),
        Arc::new(SnsTopic::new()),
    )
}

/// Maps the service independent part of a rusoto error to a Herald error.
/// Service specific errors should be matched by the caller first.
///
/// Dispatch failures, throttling and server errors are transient; everything
/// else (credentials, validation, client errors) is not.
pub(crate) fn classify<E: Error + 'static>(what: &str, err: RusotoError<E>) -> HeraldError {
    match err {
        RusotoError::HttpDispatch(e) => HeraldError::Unavailable(format!("{}: {}", what, e)),
        RusotoError::Unknown(response) => {
            let desc = format!(
                "{}: HTTP {}: {}",
                what,
                response.status.as_u16(),
                response.body_as_str()
            );
            if is_transient(&response) {
                HeraldError::Unavailable(desc)
            } else {
                HeraldError::AWS(desc)
            }
        }
        e => HeraldError::AWS(format!("{}: {}", what, e)),
    }
}

fn is_transient(response: &BufferedHttpResponse) -> bool {
    response.status.is_server_error()
        || response.status.as_u16() == 429
        || response.body_as_str().contains("Throttl")
        || response.body_as_str().contains("RequestLimitExceeded")
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{HeaderMap, StatusCode};
    use rusoto_codepipeline::GetPipelineError;
    use rusoto_core::HttpDispatchError;

    fn unknown(status: u16, body: &'static str) -> RusotoError<GetPipelineError> {
        RusotoError::Unknown(BufferedHttpResponse {
            status:  StatusCode::from_u16(status).unwrap(),
            body:    Bytes::from_static(body.as_bytes()),
            headers: HeaderMap::default(),
        })
    }

    #[test]
    fn transient_responses_are_unavailable() {
        let cases = vec![
            unknown(503, "Service Unavailable"),
            unknown(500, "InternalFailure"),
            unknown(429, "Too Many Requests"),
            unknown(400, r#"{"__type":"ThrottlingException","message":"Rate exceeded"}"#),
            unknown(400, r#"{"__type":"RequestLimitExceeded"}"#),
        ];
        for err in cases {
            let err = classify("codepipeline:GetPipeline", err);
            assert_eq!(err.kind(), "Unavailable", "{}", err);
            assert!(err.is_retryable());
        }
    }

    #[test]
    fn dispatch_failures_are_unavailable() {
        let err = classify::<GetPipelineError>(
            "sns:Publish",
            RusotoError::HttpDispatch(HttpDispatchError::new("connection reset".to_owned())),
        );
        assert_eq!(err.kind(), "Unavailable");
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn permanent_failures_are_not_retried() {
        let cases = vec![
            unknown(
                400,
                r#"{"__type":"AccessDeniedException","message":"not authorized"}"#,
            ),
            unknown(403, "Forbidden"),
            RusotoError::Validation("topic ARN is invalid".to_owned()),
            RusotoError::ParseError("unexpected end of input".to_owned()),
        ];
        for err in cases {
            let err = classify("tag:GetResources", err);
            assert_eq!(err.kind(), "AWS", "{}", err);
            assert!(!err.is_retryable());
        }
    }

    #[test]
    fn status_and_body_are_reported() {
        let err = classify("tag:GetResources", unknown(403, "AccessDenied"));
        assert_eq!(
            err.to_string(),
            "AWS error: tag:GetResources: HTTP 403: AccessDenied"
        );
    }
}
