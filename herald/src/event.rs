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

//! The inbound pipeline execution state change event.
//!
//! EventBridge delivers CodePipeline events in the following envelope:
//!
//! ```json
//! {
//!     "version": "0",
//!     "id": "01234567-EXAMPLE",
//!     "detail-type": "CodePipeline Pipeline Execution State Change",
//!     "source": "aws.codepipeline",
//!     "account": "111111111111",
//!     "time": "2024-01-01T00:00:00Z",
//!     "region": "us-east-1",
//!     "resources": ["arn:aws:codepipeline:us-east-1:111111111111:deploy-pl"],
//!     "detail": {
//!         "pipeline": "deploy-pl",
//!         "execution-id": "01234567-0123-0123-0123-012345678901",
//!         "state": "SUCCEEDED",
//!         "version": 1
//!     }
//! }
//! ```

use crate::configs::{HERALD_DETAIL_TYPE, HERALD_EVENT_SOURCE};
use crate::error::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The time of an event. Parsed on arrival so malformed times are rejected,
/// but rendered exactly as EventBridge sent it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EventTime {
    raw:    String,
    parsed: DateTime<Utc>,
}

impl EventTime {
    /// The time as received.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The time in UTC.
    pub fn utc(&self) -> DateTime<Utc> {
        self.parsed
    }
}

impl TryFrom<String> for EventTime {
    type Error = chrono::ParseError;

    fn try_from(raw: String) -> std::result::Result<Self, Self::Error> {
        let parsed = DateTime::parse_from_rfc3339(&raw)?.with_timezone(&Utc);
        Ok(EventTime { raw, parsed })
    }
}

impl From<DateTime<Utc>> for EventTime {
    fn from(time: DateTime<Utc>) -> Self {
        EventTime {
            raw:    time.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            parsed: time,
        }
    }
}

impl From<EventTime> for String {
    fn from(time: EventTime) -> Self {
        time.raw
    }
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// A pipeline execution state change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineEvent {
    /// The EventBridge event id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id:          Option<String>,
    /// The event source, `aws.codepipeline` for pipeline events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source:      Option<String>,
    /// The event type.
    #[serde(
        rename = "detail-type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub detail_type: Option<String>,
    /// The account that owns the pipeline.
    pub account:     String,
    /// The region of the pipeline.
    pub region:      String,
    /// When the state change happened.
    pub time:        EventTime,
    /// The ARNs the event refers to.
    #[serde(default)]
    pub resources:   Vec<String>,
    /// The pipeline specific part of the event.
    pub detail:      ExecutionDetail,
}

/// The `detail` object of a pipeline execution state change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionDetail {
    /// The pipeline name.
    pub pipeline:     String,
    /// The execution state. Kept as a string: states Herald does not know
    /// about must still be representable.
    pub state:        String,
    /// The pipeline execution id.
    #[serde(
        rename = "execution-id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub execution_id: Option<String>,
    /// The pipeline structure version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version:      Option<Value>,
}

impl PipelineEvent {
    /// Decodes an event from the raw JSON payload of an invocation.
    pub fn from_value(value: Value) -> Result<PipelineEvent> {
        Ok(serde_json::from_value(value)?)
    }

    /// Decodes an event from a JSON string.
    pub fn from_json(json: &str) -> Result<PipelineEvent> {
        Ok(serde_json::from_str(json)?)
    }

    /// The pipeline name.
    pub fn pipeline(&self) -> &str {
        &self.detail.pipeline
    }

    /// The execution state.
    pub fn state(&self) -> &str {
        &self.detail.state
    }

    /// The event time as rendered in notifications: the text of the `time`
    /// field, unchanged.
    pub fn timestamp(&self) -> String {
        self.time.to_string()
    }

    /// Returns true unless the envelope says this is some other kind of event.
    /// Envelope fields that are absent are not held against the event.
    pub fn is_pipeline_state_change(&self) -> bool {
        self.source
            .as_deref()
            .map_or(true, |source| source == HERALD_EVENT_SOURCE.as_str())
            && self
                .detail_type
                .as_deref()
                .map_or(true, |detail_type| detail_type == HERALD_DETAIL_TYPE.as_str())
    }
}
