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

//! The states a workflow run passes through and the outcomes it ends in.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// The non-terminal states of a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunState {
    /// Created for an event, nothing done yet.
    Start,
    /// Resolving the pipeline name to its ARN.
    ResolvingResource,
    /// Looking up the tagged pipelines and testing membership.
    FilteringByTag,
    /// Testing whether the execution state is notifiable.
    MatchingState,
    /// Rendering the notification.
    Composing,
    /// Publishing the notification.
    Dispatching,
}

impl RunState {
    /// Returns true if a run may advance from `self` to `next`. A run only
    /// moves forward, one step at a time.
    pub fn can_advance_to(self, next: RunState) -> bool {
        use RunState::*;
        matches!(
            (self, next),
            (Start, ResolvingResource)
                | (ResolvingResource, FilteringByTag)
                | (FilteringByTag, MatchingState)
                | (MatchingState, Composing)
                | (Composing, Dispatching)
        )
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// How a workflow run ended. Every variant is terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome")]
pub enum RunOutcome {
    /// The notification was published.
    Sent {
        /// The id assigned by the sink.
        message_id: Option<String>,
    },
    /// The pipeline does not carry a matching tag. Expected for most
    /// pipelines; not an error.
    SkippedNoTagMatch,
    /// The execution state is not one Herald notifies about. Not an error.
    SkippedUnrecognizedState {
        /// The state carried by the event.
        state: String,
    },
    /// The run exceeded its deadline. Whether a publish that was in flight
    /// reached the topic is unknown.
    TimedOut {
        /// The state the run was in when the deadline passed.
        during: RunState,
    },
    /// A step failed or used up its retries.
    Failed {
        /// The step that failed.
        step:   RunState,
        /// The error class, e.g. `NotFound` or `Unavailable`.
        kind:   String,
        /// The error message.
        reason: String,
    },
}

impl RunOutcome {
    /// The name of the outcome.
    pub fn name(&self) -> &'static str {
        match self {
            RunOutcome::Sent { .. } => "Sent",
            RunOutcome::SkippedNoTagMatch => "SkippedNoTagMatch",
            RunOutcome::SkippedUnrecognizedState { .. } => "SkippedUnrecognizedState",
            RunOutcome::TimedOut { .. } => "TimedOut",
            RunOutcome::Failed { .. } => "Failed",
        }
    }

    /// Returns true for the two skip outcomes.
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            RunOutcome::SkippedNoTagMatch | RunOutcome::SkippedUnrecognizedState { .. }
        )
    }

    /// Returns true if the run ended abnormally and should be looked into.
    pub fn is_failure(&self) -> bool {
        matches!(self, RunOutcome::TimedOut { .. } | RunOutcome::Failed { .. })
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Sent { message_id } => {
                write!(f, "Sent ({})", message_id.as_deref().unwrap_or("no message id"))
            }
            RunOutcome::SkippedNoTagMatch => write!(f, "SkippedNoTagMatch"),
            RunOutcome::SkippedUnrecognizedState { state } => {
                write!(f, "SkippedUnrecognizedState ({:?})", state)
            }
            RunOutcome::TimedOut { during } => write!(f, "TimedOut (during {})", during),
            RunOutcome::Failed { step, kind, reason } => {
                write!(f, "Failed in {} ({}): {}", step, kind, reason)
            }
        }
    }
}

/// Counts the outcomes of the runs of a workflow.
#[derive(Debug, Default)]
pub struct OutcomeCounters {
    sent:                       AtomicU64,
    skipped_no_tag_match:       AtomicU64,
    skipped_unrecognized_state: AtomicU64,
    timed_out:                  AtomicU64,
    failed:                     AtomicU64,
}

/// A point in time copy of [`OutcomeCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeSnapshot {
    /// Runs that published a notification.
    pub sent:                       u64,
    /// Runs skipped because the pipeline is not tagged.
    pub skipped_no_tag_match:       u64,
    /// Runs skipped because of the execution state.
    pub skipped_unrecognized_state: u64,
    /// Runs that exceeded their deadline.
    pub timed_out:                  u64,
    /// Runs that failed.
    pub failed:                     u64,
}

impl OutcomeCounters {
    /// Counts one outcome.
    pub fn record(&self, outcome: &RunOutcome) {
        let counter = match outcome {
            RunOutcome::Sent { .. } => &self.sent,
            RunOutcome::SkippedNoTagMatch => &self.skipped_no_tag_match,
            RunOutcome::SkippedUnrecognizedState { .. } => &self.skipped_unrecognized_state,
            RunOutcome::TimedOut { .. } => &self.timed_out,
            RunOutcome::Failed { .. } => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Reads all counters.
    pub fn snapshot(&self) -> OutcomeSnapshot {
        OutcomeSnapshot {
            sent:                       self.sent.load(Ordering::Relaxed),
            skipped_no_tag_match:       self.skipped_no_tag_match.load(Ordering::Relaxed),
            skipped_unrecognized_state: self.skipped_unrecognized_state.load(Ordering::Relaxed),
            timed_out:                  self.timed_out.load(Ordering::Relaxed),
            failed:                     self.failed.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_only_move_forward() {
        use RunState::*;
        let order = [
            Start,
            ResolvingResource,
            FilteringByTag,
            MatchingState,
            Composing,
            Dispatching,
        ];
        for (i, from) in order.iter().enumerate() {
            for (j, to) in order.iter().enumerate() {
                assert_eq!(from.can_advance_to(*to), j == i + 1, "{} -> {}", from, to);
            }
        }
    }

    #[test]
    fn outcome_classes() {
        assert!(RunOutcome::SkippedNoTagMatch.is_skip());
        assert!(!RunOutcome::SkippedNoTagMatch.is_failure());
        assert!(RunOutcome::TimedOut {
            during: RunState::Dispatching
        }
        .is_failure());
        assert!(!RunOutcome::Sent { message_id: None }.is_skip());
    }

    #[test]
    fn outcome_json() -> crate::error::Result<()> {
        let outcome = RunOutcome::Failed {
            step:   RunState::ResolvingResource,
            kind:   "NotFound".to_owned(),
            reason: "pipeline deploy-pl".to_owned(),
        };
        let json = serde_json::to_value(&outcome)?;
        assert_eq!(json["outcome"], "Failed");
        assert_eq!(json["step"], "ResolvingResource");
        assert_eq!(serde_json::from_value::<RunOutcome>(json)?, outcome);
        Ok(())
    }

    #[test]
    fn count_outcomes() {
        let counters = OutcomeCounters::default();
        counters.record(&RunOutcome::SkippedNoTagMatch);
        counters.record(&RunOutcome::SkippedNoTagMatch);
        counters.record(&RunOutcome::Sent { message_id: None });
        assert_eq!(
            counters.snapshot(),
            OutcomeSnapshot {
                sent: 1,
                skipped_no_tag_match: 2,
                ..Default::default()
            }
        );
    }
}
