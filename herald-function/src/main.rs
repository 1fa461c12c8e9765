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

//! The main entry point for the notification lambda function.

mod cloud_context;

use cloud_context::init_workflow;
use herald::prelude::*;
use lambda_runtime::{service_fn, LambdaEvent};
use log::{info, warn};
use serde_json::{json, Value};
use std::sync::Arc;

/// Handles one EventBridge event.
///
/// Every run outcome, failures included, is acknowledged with `Ok`: the
/// outcome is reported in the response and in the logs. Only an event that
/// cannot be decoded is returned as an error.
async fn handler(workflow: &Workflow, event: Value) -> Result<Value> {
    let event = PipelineEvent::from_value(event)?;

    match workflow.admit(&event) {
        Admission::Disabled => {
            info!(
                "Workflow disabled, dropping {} {}",
                event.pipeline(),
                event.state()
            );
            Ok(json!({ "status": "disabled" }))
        }
        Admission::ForeignEvent => {
            warn!(
                "Ignoring event from {:?} of type {:?}",
                event.source, event.detail_type
            );
            Ok(json!({ "status": "ignored" }))
        }
        Admission::Admitted => {
            let outcome = workflow.run(&event).await;
            Ok(json!({
                "status": "completed",
                "pipeline": event.pipeline(),
                "state": event.state(),
                "result": outcome,
            }))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let workflow = init_workflow()?;
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let workflow = Arc::clone(&workflow);
        async move { handler(&workflow, event.payload).await }
    }))
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald::test_util::*;

    fn workflow(config: &WorkflowConfig, sink: Arc<RecordingSink>) -> Result<Workflow> {
        Workflow::new(
            config,
            Arc::new(InMemoryResolver::new().with_pipeline("deploy-pl")),
            Arc::new(InMemoryTagDirectory::new().with_tag("deploy-pl", "DeployNotification", "YES")),
            sink,
        )
    }

    #[tokio::test]
    async fn sent_notification() -> Result<()> {
        let sink = Arc::new(RecordingSink::new());
        let workflow = workflow(&workflow_config(), sink.clone())?;
        let event = serde_json::to_value(pipeline_event("deploy-pl", "FAILED"))?;

        let response = handler(&workflow, event).await?;
        assert_eq!(response["status"], "completed");
        assert_eq!(response["result"]["outcome"], "Sent");
        assert_eq!(sink.published().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn failed_runs_are_acknowledged() -> Result<()> {
        let sink = Arc::new(RecordingSink::new());
        let workflow = workflow(&workflow_config(), sink.clone())?;
        let event = serde_json::to_value(pipeline_event("unknown-pl", "STARTED"))?;

        let response = handler(&workflow, event).await?;
        assert_eq!(response["result"]["outcome"], "Failed");
        assert_eq!(response["result"]["kind"], "NotFound");
        assert!(sink.published().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn disabled_workflow_drops_events() -> Result<()> {
        let mut config = workflow_config();
        config.enabled = false;
        let sink = Arc::new(RecordingSink::new());
        let workflow = workflow(&config, sink.clone())?;
        let event = serde_json::to_value(pipeline_event("deploy-pl", "SUCCEEDED"))?;

        let response = handler(&workflow, event).await?;
        assert_eq!(response["status"], "disabled");
        assert_eq!(sink.calls(), 0);
        assert_eq!(workflow.outcomes(), OutcomeSnapshot::default());
        Ok(())
    }

    #[tokio::test]
    async fn foreign_events_are_ignored() -> Result<()> {
        let sink = Arc::new(RecordingSink::new());
        let workflow = workflow(&workflow_config(), sink.clone())?;
        let mut event = pipeline_event("deploy-pl", "SUCCEEDED");
        event.source = Some("aws.codebuild".to_owned());

        let response = handler(&workflow, serde_json::to_value(event)?).await?;
        assert_eq!(response["status"], "ignored");
        assert_eq!(sink.calls(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn malformed_events_are_errors() -> Result<()> {
        let workflow = workflow(&workflow_config(), Arc::new(RecordingSink::new()))?;
        let response = handler(&workflow, json!({ "detail": { "state": "STARTED" } })).await;
        assert!(response.is_err());
        Ok(())
    }
}
