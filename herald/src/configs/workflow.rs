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

//! The workflow configuration, supplied when a workflow is defined and
//! shared read-only by every run of it.
//!
//! The configuration is JSON, usually taken from the environment variable
//! named by [`HERALD_CONFIG_ENV`](crate::configs::HERALD_CONFIG_ENV):
//!
//! ```json
//! {
//!     "topicArn": "arn:aws:sns:us-east-1:111111111111:herald-topic",
//!     "targetResource": { "tagKey": "DeployNotification", "tagValues": ["YES"] },
//!     "enabled": true,
//!     "notifications": {
//!         "emails": ["ops@example.com"],
//!         "slack": { "workspaceId": "T0123456", "channelId": "C0123456" }
//!     },
//!     "timeout": "5min",
//!     "retry": { "maxRetries": 3, "baseBackoffMs": 100, "maxBackoffMs": 3200 }
//! }
//! ```
//!
//! Everything but `topicArn` falls back to the bundled `config.toml`.

use super::herald::{setting, HERALD_CONF};
use super::HERALD_CONFIG_ENV;
use crate::error::{HeraldError, Result};
use crate::retry::RetryPolicy;
use crate::rule::TargetingRule;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Which resources are in scope for notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetResource {
    /// The tag key.
    pub tag_key:    String,
    /// The accepted tag values, OR-matched.
    pub tag_values: Vec<String>,
}

impl Default for TargetResource {
    fn default() -> Self {
        TargetResource {
            tag_key:    HERALD_CONF["target"]["tag_key"].to_string(),
            tag_values: HERALD_CONF["target"]["tag_values"]
                .split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_owned)
                .collect(),
        }
    }
}

/// A chat channel subscribed to the topic through AWS Chatbot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlackChannel {
    /// The Slack workspace id.
    pub workspace_id: String,
    /// The Slack channel id.
    pub channel_id:   String,
}

/// Who the topic delivers to. Herald does not manage these subscriptions; the
/// configuration only describes them so they can be validated and reported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationsConfig {
    /// Plain-text (email) subscribers.
    #[serde(default)]
    pub emails: Vec<String>,
    /// The rich (chat) subscriber.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slack:  Option<SlackChannel>,
}

/// Retry settings of the resolve, tag lookup and publish calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryConfig {
    /// Retries after the first attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries:     Option<u32>,
    /// The delay before the first retry, doubled on every further retry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_backoff_ms: Option<u64>,
    /// The upper bound of a single delay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_backoff_ms:  Option<u64>,
}

fn enabled_by_default() -> bool {
    true
}

/// The configuration of a notification workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowConfig {
    /// The ARN of the SNS topic notifications are published to.
    pub topic_arn:       String,
    /// Which pipelines are in scope.
    #[serde(default)]
    pub target_resource: TargetResource,
    /// When false, events are acknowledged without starting a run.
    #[serde(default = "enabled_by_default")]
    pub enabled:         bool,
    /// The subscribers of the topic.
    #[serde(default)]
    pub notifications:   NotificationsConfig,
    /// The end-to-end deadline of a run, e.g. `5min` or `90s`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout:         Option<String>,
    /// Retry settings.
    #[serde(default)]
    pub retry:           RetryConfig,
}

impl WorkflowConfig {
    /// Creates a configuration with the bundled defaults for `topic_arn`.
    pub fn new(topic_arn: &str) -> Self {
        WorkflowConfig {
            topic_arn:       topic_arn.to_owned(),
            target_resource: TargetResource::default(),
            enabled:         true,
            notifications:   NotificationsConfig::default(),
            timeout:         None,
            retry:           RetryConfig::default(),
        }
    }

    /// Parses a JSON configuration. Malformed JSON is a configuration error.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| HeraldError::Fatal(format!("malformed workflow configuration: {}", e)))
    }

    /// Reads a JSON configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&json)
    }

    /// Reads the configuration from the environment of the cloud function.
    pub fn from_env() -> Result<Self> {
        let json = std::env::var(HERALD_CONFIG_ENV.as_str()).map_err(|e| {
            HeraldError::Fatal(format!(
                "no workflow configuration in ${}: {}",
                *HERALD_CONFIG_ENV, e
            ))
        })?;
        Self::from_json(&json)
    }

    /// Builds the targeting rule.
    pub fn targeting_rule(&self) -> Result<TargetingRule> {
        TargetingRule::new(
            &self.target_resource.tag_key,
            self.target_resource.tag_values.iter().cloned(),
        )
    }

    /// The end-to-end deadline of a run.
    pub fn timeout(&self) -> Result<Duration> {
        let timeout = match &self.timeout {
            Some(timeout) => humantime::parse_duration(timeout)
                .map_err(|e| HeraldError::Fatal(format!("invalid timeout {:?}: {}", timeout, e)))?,
            None => {
                let timeout = setting::<String>("workflow", "timeout")?;
                humantime::parse_duration(&timeout).map_err(|e| {
                    HeraldError::Fatal(format!("invalid default timeout {:?}: {}", timeout, e))
                })?
            }
        };
        if timeout.is_zero() {
            return Err(HeraldError::Fatal("the run timeout must be positive".to_owned()));
        }
        Ok(timeout)
    }

    /// The retry policy of the external calls.
    pub fn retry_policy(&self) -> Result<RetryPolicy> {
        let max_retries = match self.retry.max_retries {
            Some(n) => n,
            None => setting("retry", "max_retries")?,
        };
        let base_backoff_ms = match self.retry.base_backoff_ms {
            Some(ms) => ms,
            None => setting("retry", "base_backoff_ms")?,
        };
        let max_backoff_ms = match self.retry.max_backoff_ms {
            Some(ms) => ms,
            None => setting("retry", "max_backoff_ms")?,
        };
        if base_backoff_ms > max_backoff_ms {
            return Err(HeraldError::Fatal(format!(
                "base backoff {}ms exceeds max backoff {}ms",
                base_backoff_ms, max_backoff_ms
            )));
        }
        Ok(RetryPolicy::new(
            max_retries,
            Duration::from_millis(base_backoff_ms),
            Duration::from_millis(max_backoff_ms),
        ))
    }

    /// Checks the whole configuration. Every error is [`HeraldError::Fatal`].
    pub fn validate(&self) -> Result<()> {
        if !self.topic_arn.starts_with("arn:") || !self.topic_arn.contains(":sns:") {
            return Err(HeraldError::Fatal(format!(
                "{:?} is not an SNS topic ARN",
                self.topic_arn
            )));
        }
        if let Some(email) = self
            .notifications
            .emails
            .iter()
            .find(|email| !is_plausible_email(email))
        {
            return Err(HeraldError::Fatal(format!(
                "{:?} is not an email address",
                email
            )));
        }
        if let Some(slack) = &self.notifications.slack {
            if slack.workspace_id.trim().is_empty() || slack.channel_id.trim().is_empty() {
                return Err(HeraldError::Fatal(
                    "the slack channel needs a workspace id and a channel id".to_owned(),
                ));
            }
        }
        self.targeting_rule()?;
        self.timeout()?;
        self.retry_policy()?;
        Ok(())
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}
