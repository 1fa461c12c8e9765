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

//! The notification workflow engine.
//!
//! A [`Workflow`] is defined once from a [`WorkflowConfig`] and runs once per
//! event. Each run is an independent [`WorkflowRun`] that walks the states
//!
//! ```text
//! Start -> ResolvingResource -> FilteringByTag -> MatchingState -> Composing -> Dispatching
//!                                     |                |
//!                             SkippedNoTagMatch   SkippedUnrecognizedState
//! ```
//!
//! and ends in `Sent`, one of the two skips, `Failed` (a step failed or used
//! up its retries) or `TimedOut` (the run deadline passed in any state).
//!
//! Publishing is the last step of a run and nothing can fail after it. A run
//! that reports `Sent` has published exactly once. A run that reports
//! `TimedOut` while `Dispatching` gives no guarantee either way: the publish
//! call may have reached the topic before its future was dropped. With the
//! at-least-once delivery of the event source, subscribers must therefore
//! tolerate an occasional duplicate notification.

mod state;
pub use state::{OutcomeCounters, OutcomeSnapshot, RunOutcome, RunState};

use crate::configs::WorkflowConfig;
use crate::error::{HeraldError, Result};
use crate::event::PipelineEvent;
use crate::lexicon;
use crate::message::compose;
use crate::retry::{retry, RetryPolicy};
use crate::rule::{is_member, TargetingRule};
use crate::services::{NotificationSink, ResourceResolver, TagDirectory};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Whether an incoming event starts a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The event starts a run.
    Admitted,
    /// The workflow is installed but disabled.
    Disabled,
    /// The event is not a pipeline execution state change.
    ForeignEvent,
}

/// A notification workflow: the targeting rule, the run limits and the
/// capabilities every run uses. Read-only once defined, so runs for
/// different events may execute concurrently.
pub struct Workflow {
    rule:      TargetingRule,
    topic_arn: String,
    enabled:   bool,
    timeout:   Duration,
    retry:     RetryPolicy,
    resolver:  Arc<dyn ResourceResolver>,
    tags:      Arc<dyn TagDirectory>,
    sink:      Arc<dyn NotificationSink>,
    counters:  OutcomeCounters,
}

impl Workflow {
    /// Defines a workflow. Configuration errors surface here, as
    /// [`HeraldError::Fatal`], and never reach a run.
    pub fn new(
        config: &WorkflowConfig,
        resolver: Arc<dyn ResourceResolver>,
        tags: Arc<dyn TagDirectory>,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<Workflow> {
        config.validate()?;
        Ok(Workflow {
            rule: config.targeting_rule()?,
            topic_arn: config.topic_arn.clone(),
            enabled: config.enabled,
            timeout: config.timeout()?,
            retry: config.retry_policy()?,
            resolver,
            tags,
            sink,
            counters: OutcomeCounters::default(),
        })
    }

    /// The targeting rule.
    pub fn rule(&self) -> &TargetingRule {
        &self.rule
    }

    /// The deadline of a single run.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Decides whether `event` starts a run.
    pub fn admit(&self, event: &PipelineEvent) -> Admission {
        if !self.enabled {
            Admission::Disabled
        } else if !event.is_pipeline_state_change() {
            Admission::ForeignEvent
        } else {
            Admission::Admitted
        }
    }

    /// Runs the workflow once for `event`. Never panics or returns an error:
    /// failures are outcomes, isolated to this run.
    pub async fn run(&self, event: &PipelineEvent) -> RunOutcome {
        let run = WorkflowRun::new(self, event);
        let id = run.id;
        let outcome = run.execute().await;
        self.counters.record(&outcome);

        match &outcome {
            RunOutcome::Sent { .. } => info!(
                "[{}] {} {}: notification {}",
                id,
                event.pipeline(),
                event.state(),
                outcome
            ),
            RunOutcome::SkippedNoTagMatch | RunOutcome::SkippedUnrecognizedState { .. } => info!(
                "[{}] {} {}: {}",
                id,
                event.pipeline(),
                event.state(),
                outcome
            ),
            RunOutcome::TimedOut { .. } => warn!(
                "[{}] {} {}: {}",
                id,
                event.pipeline(),
                event.state(),
                outcome
            ),
            RunOutcome::Failed { .. } => error!(
                "[{}] {} {}: {}",
                id,
                event.pipeline(),
                event.state(),
                outcome
            ),
        }
        outcome
    }

    /// The outcome counts of all runs so far.
    pub fn outcomes(&self) -> OutcomeSnapshot {
        self.counters.snapshot()
    }
}

/// One end-to-end execution of a workflow for a single event. Created on
/// event arrival and consumed by [`WorkflowRun::execute`].
pub struct WorkflowRun<'a> {
    id:       Uuid,
    workflow: &'a Workflow,
    event:    &'a PipelineEvent,
    state:    RunState,
}

impl<'a> WorkflowRun<'a> {
    /// Creates a run of `workflow` for `event`.
    pub fn new(workflow: &'a Workflow, event: &'a PipelineEvent) -> Self {
        WorkflowRun {
            id: Uuid::new_v4(),
            workflow,
            event,
            state: RunState::Start,
        }
    }

    /// The run id, used to correlate log lines.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Executes the run under the workflow deadline.
    pub async fn execute(mut self) -> RunOutcome {
        let limit = self.workflow.timeout;
        let result = tokio::time::timeout(limit, self.drive()).await;
        match result {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => RunOutcome::Failed {
                step:   self.state,
                kind:   e.kind().to_owned(),
                reason: e.to_string(),
            },
            Err(_) => {
                debug!(
                    "[{}] {} in {}",
                    self.id,
                    HeraldError::Timeout(limit),
                    self.state
                );
                RunOutcome::TimedOut { during: self.state }
            }
        }
    }

    fn advance(&mut self, next: RunState) -> Result<()> {
        if !self.state.can_advance_to(next) {
            return Err(HeraldError::Internal(format!(
                "illegal transition {} -> {}",
                self.state, next
            )));
        }
        debug!("[{}] {} -> {}", self.id, self.state, next);
        self.state = next;
        Ok(())
    }

    async fn drive(&mut self) -> Result<RunOutcome> {
        let workflow = self.workflow;
        let event = self.event;

        self.advance(RunState::ResolvingResource)?;
        let pipeline = event.pipeline();
        if pipeline.is_empty() {
            return Err(HeraldError::NotFound(
                "the event carries an empty pipeline name".to_owned(),
            ));
        }
        let resolver = &*workflow.resolver;
        let resource = retry(&workflow.retry, "Resolving the pipeline", move || {
            resolver.resolve(pipeline)
        })
        .await?;

        self.advance(RunState::FilteringByTag)?;
        let tags = &*workflow.tags;
        let rule = &workflow.rule;
        let tagged = retry(&workflow.retry, "Looking up tagged pipelines", move || {
            tags.resources_with_tag(rule)
        })
        .await?;
        if !is_member(&resource, &tagged) {
            return Ok(RunOutcome::SkippedNoTagMatch);
        }

        self.advance(RunState::MatchingState)?;
        if !lexicon::is_notifiable(event.state()) {
            return Ok(RunOutcome::SkippedUnrecognizedState {
                state: event.state().to_owned(),
            });
        }

        self.advance(RunState::Composing)?;
        let message = compose(event, lexicon::lookup(event.state()));

        self.advance(RunState::Dispatching)?;
        let sink = &*workflow.sink;
        let topic = workflow.topic_arn.as_str();
        let message = &message;
        let message_id = retry(&workflow.retry, "Publishing the notification", move || {
            sink.publish(topic, message)
        })
        .await?;

        Ok(RunOutcome::Sent { message_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::*;

    const PIPELINE: &str = "deploy-pl";

    struct Fixture {
        resolver: Arc<InMemoryResolver>,
        tags:     Arc<InMemoryTagDirectory>,
        sink:     Arc<RecordingSink>,
        workflow: Workflow,
    }

    fn fixture_with(
        config: &WorkflowConfig,
        resolver: InMemoryResolver,
        tags: InMemoryTagDirectory,
        sink: RecordingSink,
    ) -> Fixture {
        let resolver = Arc::new(resolver);
        let tags = Arc::new(tags);
        let sink = Arc::new(sink);
        let workflow = Workflow::new(config, resolver.clone(), tags.clone(), sink.clone())
            .expect("valid workflow configuration");
        Fixture {
            resolver,
            tags,
            sink,
            workflow,
        }
    }

    fn fixture(resolver: InMemoryResolver, tags: InMemoryTagDirectory) -> Fixture {
        fixture_with(&workflow_config(), resolver, tags, RecordingSink::new())
    }

    fn tagged_pipeline() -> Fixture {
        fixture(
            InMemoryResolver::new().with_pipeline(PIPELINE),
            InMemoryTagDirectory::new().with_tag(PIPELINE, "DeployNotification", "YES"),
        )
    }

    #[tokio::test]
    async fn tagged_pipeline_is_notified() {
        let f = tagged_pipeline();
        let outcome = f.workflow.run(&pipeline_event(PIPELINE, "SUCCEEDED")).await;

        assert_eq!(
            outcome,
            RunOutcome::Sent {
                message_id: Some("message-0".to_owned())
            }
        );
        let published = f.sink.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, TEST_TOPIC);
        assert_eq!(
            published[0].1.subject,
            "🤩 [SUCCEEDED] AWS CodePipeline Pipeline Execution State Notification [111111111111][us-east-1]"
        );
        assert_eq!(f.resolver.calls(), 1);
        assert_eq!(f.tags.calls(), 1);
    }

    #[tokio::test]
    async fn untagged_pipeline_is_skipped() {
        let f = fixture(
            InMemoryResolver::new().with_pipeline(PIPELINE),
            InMemoryTagDirectory::new(),
        );
        let outcome = f.workflow.run(&pipeline_event(PIPELINE, "SUCCEEDED")).await;

        assert_eq!(outcome, RunOutcome::SkippedNoTagMatch);
        assert_eq!(f.sink.calls(), 0);
        assert!(!outcome.is_failure());
    }

    #[tokio::test]
    async fn other_tag_values_are_skipped() {
        let f = fixture(
            InMemoryResolver::new().with_pipeline(PIPELINE),
            InMemoryTagDirectory::new()
                .with_tag(PIPELINE, "DeployNotification", "NO")
                .with_tag(PIPELINE, "Team", "YES"),
        );
        let outcome = f.workflow.run(&pipeline_event(PIPELINE, "FAILED")).await;
        assert_eq!(outcome, RunOutcome::SkippedNoTagMatch);
        assert_eq!(f.sink.calls(), 0);
    }

    #[tokio::test]
    async fn membership_is_not_a_prefix_match() {
        let f = fixture(
            InMemoryResolver::new().with_pipeline(PIPELINE),
            InMemoryTagDirectory::new()
                .with_tag("deploy-pl-v2", "DeployNotification", "YES")
                .with_tag("deploy", "DeployNotification", "YES"),
        );
        let outcome = f.workflow.run(&pipeline_event(PIPELINE, "SUCCEEDED")).await;
        assert_eq!(outcome, RunOutcome::SkippedNoTagMatch);
        assert_eq!(f.sink.calls(), 0);
    }

    #[tokio::test]
    async fn membership_is_decided_before_the_state() {
        let f = fixture(
            InMemoryResolver::new().with_pipeline(PIPELINE),
            InMemoryTagDirectory::new(),
        );
        let outcome = f.workflow.run(&pipeline_event(PIPELINE, "CANCELLED")).await;

        assert_eq!(outcome, RunOutcome::SkippedNoTagMatch);
        assert_eq!(f.sink.calls(), 0);
        assert_eq!(f.workflow.outcomes().skipped_no_tag_match, 1);
        assert_eq!(f.workflow.outcomes().skipped_unrecognized_state, 0);
    }

    #[tokio::test]
    async fn unrecognized_state_is_skipped() {
        let f = tagged_pipeline();
        for state in &["CANCELLED", "succeeded", ""] {
            let outcome = f.workflow.run(&pipeline_event(PIPELINE, state)).await;
            assert_eq!(
                outcome,
                RunOutcome::SkippedUnrecognizedState {
                    state: state.to_string()
                }
            );
        }
        assert_eq!(f.sink.calls(), 0);
    }

    #[tokio::test]
    async fn every_notifiable_state_publishes_once() {
        for entry in lexicon::STATE_LEXICON.iter() {
            let f = tagged_pipeline();
            let outcome = f.workflow.run(&pipeline_event(PIPELINE, entry.state)).await;
            assert!(matches!(outcome, RunOutcome::Sent { .. }), "{}", entry.state);

            let published = f.sink.published();
            assert_eq!(published.len(), 1);
            let subject = &published[0].1.subject;
            assert!(subject.starts_with(entry.glyph));
            assert!(subject.contains(&format!("[{}]", entry.state)));
            assert!(subject.contains(TEST_ACCOUNT));
            assert!(subject.contains(TEST_REGION));
        }
    }

    #[tokio::test]
    async fn transient_resolver_failures_are_transparent() {
        let f = fixture(
            InMemoryResolver::new()
                .with_pipeline(PIPELINE)
                .with_transient_failures(2),
            InMemoryTagDirectory::new().with_tag(PIPELINE, "DeployNotification", "YES"),
        );
        let outcome = f.workflow.run(&pipeline_event(PIPELINE, "SUCCEEDED")).await;

        assert!(matches!(outcome, RunOutcome::Sent { .. }));
        assert_eq!(f.resolver.calls(), 3);
        assert_eq!(f.sink.published().len(), 1);
    }

    #[tokio::test]
    async fn retries_do_not_repeat_completed_steps() {
        let f = fixture(
            InMemoryResolver::new().with_pipeline(PIPELINE),
            InMemoryTagDirectory::new()
                .with_tag(PIPELINE, "DeployNotification", "YES")
                .with_transient_failures(3),
        );
        let outcome = f.workflow.run(&pipeline_event(PIPELINE, "STARTED")).await;

        assert!(matches!(outcome, RunOutcome::Sent { .. }));
        assert_eq!(f.resolver.calls(), 1);
        assert_eq!(f.tags.calls(), 4);
    }

    #[tokio::test]
    async fn exhausted_publish_retries_fail_the_run() {
        let f = fixture_with(
            &workflow_config(),
            InMemoryResolver::new().with_pipeline(PIPELINE),
            InMemoryTagDirectory::new().with_tag(PIPELINE, "DeployNotification", "YES"),
            RecordingSink::new().with_transient_failures(10),
        );
        let outcome = f.workflow.run(&pipeline_event(PIPELINE, "FAILED")).await;

        match &outcome {
            RunOutcome::Failed { step, kind, .. } => {
                assert_eq!(*step, RunState::Dispatching);
                assert_eq!(kind, "Unavailable");
            }
            other => panic!("unexpected outcome: {}", other),
        }
        assert_eq!(f.sink.calls(), 4);
        assert!(f.sink.published().is_empty());
        assert_eq!(f.workflow.outcomes().failed, 1);
    }

    #[tokio::test]
    async fn unknown_pipeline_fails_without_retries() {
        let f = fixture(
            InMemoryResolver::new(),
            InMemoryTagDirectory::new().with_tag(PIPELINE, "DeployNotification", "YES"),
        );
        let outcome = f.workflow.run(&pipeline_event(PIPELINE, "SUCCEEDED")).await;

        match &outcome {
            RunOutcome::Failed { step, kind, .. } => {
                assert_eq!(*step, RunState::ResolvingResource);
                assert_eq!(kind, "NotFound");
            }
            other => panic!("unexpected outcome: {}", other),
        }
        assert_eq!(f.resolver.calls(), 1);
        assert_eq!(f.tags.calls(), 0);
        assert_eq!(f.sink.calls(), 0);
    }

    #[tokio::test]
    async fn empty_pipeline_name_is_not_resolved() {
        let f = tagged_pipeline();
        let outcome = f.workflow.run(&pipeline_event("", "SUCCEEDED")).await;

        assert!(matches!(
            outcome,
            RunOutcome::Failed {
                step: RunState::ResolvingResource,
                ..
            }
        ));
        assert_eq!(f.resolver.calls(), 0);
    }

    #[tokio::test]
    async fn slow_runs_time_out() {
        let mut config = workflow_config();
        config.timeout = Some("50ms".to_owned());
        let f = fixture_with(
            &config,
            InMemoryResolver::new()
                .with_pipeline(PIPELINE)
                .with_latency(Duration::from_secs(5)),
            InMemoryTagDirectory::new().with_tag(PIPELINE, "DeployNotification", "YES"),
            RecordingSink::new(),
        );
        let outcome = f.workflow.run(&pipeline_event(PIPELINE, "SUCCEEDED")).await;

        assert_eq!(
            outcome,
            RunOutcome::TimedOut {
                during: RunState::ResolvingResource
            }
        );
        assert_eq!(f.sink.calls(), 0);
        assert_eq!(f.workflow.outcomes().timed_out, 1);
    }

    #[tokio::test]
    async fn slow_publish_times_out_while_dispatching() {
        let mut config = workflow_config();
        config.timeout = Some("50ms".to_owned());
        let f = fixture_with(
            &config,
            InMemoryResolver::new().with_pipeline(PIPELINE),
            InMemoryTagDirectory::new().with_tag(PIPELINE, "DeployNotification", "YES"),
            RecordingSink::new().with_latency(Duration::from_secs(5)),
        );
        let outcome = f.workflow.run(&pipeline_event(PIPELINE, "FAILED")).await;

        assert_eq!(
            outcome,
            RunOutcome::TimedOut {
                during: RunState::Dispatching
            }
        );
        assert_eq!(f.sink.calls(), 1);
        assert!(f.sink.published().is_empty());
        assert_eq!(f.workflow.outcomes().timed_out, 1);
    }

    #[test]
    fn malformed_rules_are_rejected_at_definition() {
        let mut config = workflow_config();
        config.target_resource.tag_values.clear();
        let result = Workflow::new(
            &config,
            Arc::new(InMemoryResolver::new()),
            Arc::new(InMemoryTagDirectory::new()),
            Arc::new(RecordingSink::new()),
        );
        assert_eq!(result.err().map(|e| e.kind()), Some("Fatal"));
    }

    #[test]
    fn admission() {
        let f = tagged_pipeline();
        let mut event = pipeline_event(PIPELINE, "SUCCEEDED");
        assert_eq!(f.workflow.admit(&event), Admission::Admitted);

        event.detail_type = Some("CodePipeline Action Execution State Change".to_owned());
        assert_eq!(f.workflow.admit(&event), Admission::ForeignEvent);

        let mut config = workflow_config();
        config.enabled = false;
        let f = fixture_with(
            &config,
            InMemoryResolver::new(),
            InMemoryTagDirectory::new(),
            RecordingSink::new(),
        );
        assert_eq!(
            f.workflow.admit(&pipeline_event(PIPELINE, "SUCCEEDED")),
            Admission::Disabled
        );
    }

    #[tokio::test]
    async fn outcomes_are_counted() {
        let f = tagged_pipeline();
        f.workflow.run(&pipeline_event(PIPELINE, "STARTED")).await;
        f.workflow.run(&pipeline_event(PIPELINE, "CANCELLED")).await;
        f.workflow.run(&pipeline_event("unknown-pl", "STARTED")).await;

        assert_eq!(
            f.workflow.outcomes(),
            OutcomeSnapshot {
                sent: 1,
                skipped_unrecognized_state: 1,
                failed: 1,
                ..Default::default()
            }
        );
    }

    #[tokio::test]
    async fn runs_are_independent() {
        let pipelines = (0..8).map(|i| format!("pipeline-{}", i)).collect::<Vec<_>>();
        let resolver = pipelines
            .iter()
            .fold(InMemoryResolver::new(), |r, p| r.with_pipeline(p));
        let tags = pipelines
            .iter()
            .step_by(2)
            .fold(InMemoryTagDirectory::new(), |t, p| {
                t.with_tag(p, "DeployNotification", "YES")
            });
        let f = fixture(resolver, tags);
        let workflow = Arc::new(f.workflow);

        let handles = pipelines
            .iter()
            .map(|pipeline| {
                let workflow = workflow.clone();
                let event = pipeline_event(pipeline, "SUCCEEDED");
                tokio::spawn(async move { workflow.run(&event).await })
            })
            .collect::<Vec<_>>();

        let mut sent = 0;
        for handle in handles {
            if let RunOutcome::Sent { .. } = handle.await.unwrap() {
                sent += 1;
            }
        }
        assert_eq!(sent, 4);
        assert_eq!(f.sink.published().len(), 4);
        assert_eq!(workflow.outcomes().skipped_no_tag_match, 4);
    }
}
