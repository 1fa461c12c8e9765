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

//! Common unit test utility methods: a sample event and in-memory fakes of
//! the capabilities a workflow run depends on.

use crate::configs::WorkflowConfig;
use crate::error::{HeraldError, Result};
use crate::event::{EventTime, ExecutionDetail, PipelineEvent};
use crate::message::ComposedMessage;
use crate::rule::{ResourceId, TargetingRule};
use crate::services::{NotificationSink, ResourceResolver, TagDirectory};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// The account of the sample events.
pub const TEST_ACCOUNT: &str = "111111111111";
/// The region of the sample events.
pub const TEST_REGION: &str = "us-east-1";
/// The topic of the sample workflow configuration.
pub const TEST_TOPIC: &str = "arn:aws:sns:us-east-1:111111111111:herald-topic";

/// The ARN of a pipeline in the test account.
pub fn pipeline_arn(pipeline: &str) -> ResourceId {
    ResourceId::from(format!(
        "arn:aws:codepipeline:{}:{}:{}",
        TEST_REGION, TEST_ACCOUNT, pipeline
    ))
}

/// A pipeline execution state change at `2024-01-01T00:00:00Z`.
pub fn pipeline_event(pipeline: &str, state: &str) -> PipelineEvent {
    PipelineEvent {
        id:          Some("6a7e8feb-b491-4cf7-a9f1-bf3703467718".to_owned()),
        source:      Some("aws.codepipeline".to_owned()),
        detail_type: Some("CodePipeline Pipeline Execution State Change".to_owned()),
        account:     TEST_ACCOUNT.to_owned(),
        region:      TEST_REGION.to_owned(),
        time:        EventTime::from(Utc.timestamp_opt(1_704_067_200, 0).unwrap()),
        resources:   vec![pipeline_arn(pipeline).to_string()],
        detail:      ExecutionDetail {
            pipeline:     pipeline.to_owned(),
            state:        state.to_owned(),
            execution_id: Some("01234567-0123-0123-0123-012345678901".to_owned()),
            version:      None,
        },
    }
}

/// A configuration targeting `DeployNotification=YES` with millisecond
/// backoffs.
pub fn workflow_config() -> WorkflowConfig {
    let mut config = WorkflowConfig::new(TEST_TOPIC);
    config.target_resource.tag_key = "DeployNotification".to_owned();
    config.target_resource.tag_values = vec!["YES".to_owned()];
    config.retry.max_retries = Some(3);
    config.retry.base_backoff_ms = Some(1);
    config.retry.max_backoff_ms = Some(4);
    config
}

/// Fails the first `n` calls with [`HeraldError::Unavailable`].
#[derive(Debug, Default)]
struct TransientFailures {
    remaining: AtomicUsize,
}

impl TransientFailures {
    fn set(&self, n: usize) {
        self.remaining.store(n, Ordering::SeqCst);
    }

    fn check(&self, what: &str) -> Result<()> {
        let left = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        match left {
            Ok(_) => Err(HeraldError::Unavailable(format!("{}: throttled", what))),
            Err(_) => Ok(()),
        }
    }
}

/// An in-memory [`ResourceResolver`].
#[derive(Debug, Default)]
pub struct InMemoryResolver {
    pipelines: HashMap<String, ResourceId>,
    failures:  TransientFailures,
    latency:   Option<Duration>,
    calls:     AtomicUsize,
}

impl InMemoryResolver {
    /// Creates a resolver that knows no pipelines.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a pipeline of the test account.
    pub fn with_pipeline(mut self, pipeline: &str) -> Self {
        self.pipelines
            .insert(pipeline.to_owned(), pipeline_arn(pipeline));
        self
    }

    /// Fails the next `n` calls transiently.
    pub fn with_transient_failures(self, n: usize) -> Self {
        self.failures.set(n);
        self
    }

    /// Delays every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// The number of calls so far, including failed ones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResourceResolver for InMemoryResolver {
    async fn resolve(&self, pipeline: &str) -> Result<ResourceId> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.failures.check("GetPipeline")?;
        self.pipelines
            .get(pipeline)
            .cloned()
            .ok_or_else(|| HeraldError::NotFound(format!("pipeline {}", pipeline)))
    }
}

/// An in-memory [`TagDirectory`] that evaluates targeting rules against the
/// tags it was given.
#[derive(Debug, Default)]
pub struct InMemoryTagDirectory {
    tags:     HashMap<ResourceId, HashMap<String, String>>,
    failures: TransientFailures,
    calls:    AtomicUsize,
}

impl InMemoryTagDirectory {
    /// Creates a directory in which nothing is tagged.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tags a pipeline of the test account.
    pub fn with_tag(mut self, pipeline: &str, key: &str, value: &str) -> Self {
        self.tags
            .entry(pipeline_arn(pipeline))
            .or_default()
            .insert(key.to_owned(), value.to_owned());
        self
    }

    /// Fails the next `n` calls transiently.
    pub fn with_transient_failures(self, n: usize) -> Self {
        self.failures.set(n);
        self
    }

    /// The number of calls so far, including failed ones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TagDirectory for InMemoryTagDirectory {
    async fn resources_with_tag(&self, rule: &TargetingRule) -> Result<HashSet<ResourceId>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.failures.check("GetResources")?;
        Ok(self
            .tags
            .iter()
            .filter(|(_, tags)| rule.matches(tags))
            .map(|(arn, _)| arn.clone())
            .collect())
    }
}

/// A [`NotificationSink`] that records what it is asked to publish.
#[derive(Debug, Default)]
pub struct RecordingSink {
    published: Mutex<Vec<(String, ComposedMessage)>>,
    failures:  TransientFailures,
    latency:   Option<Duration>,
    calls:     AtomicUsize,
}

impl RecordingSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the next `n` calls transiently.
    pub fn with_transient_failures(self, n: usize) -> Self {
        self.failures.set(n);
        self
    }

    /// Delays every call before the message is recorded.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// The successfully published messages with their topics.
    pub fn published(&self) -> Vec<(String, ComposedMessage)> {
        self.published
            .lock()
            .map(|published| published.clone())
            .unwrap_or_default()
    }

    /// The number of calls so far, including failed ones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn publish(&self, topic: &str, message: &ComposedMessage) -> Result<Option<String>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.failures.check("Publish")?;
        self.published
            .lock()
            .map_err(|e| HeraldError::Internal(e.to_string()))?
            .push((topic.to_owned(), message.clone()));
        Ok(Some(format!("message-{}", call)))
    }
}
