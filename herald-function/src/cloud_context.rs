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

//! The workflow definition of the function instance.

use herald::prelude::*;
use log::info;
use std::sync::Arc;

/// Defines the workflow from the configuration in the cloud environment.
///
/// Runs once per function instance, on cold start. A malformed configuration
/// is a [`HeraldError::Fatal`] and keeps the instance from serving events.
pub fn init_workflow() -> Result<Arc<Workflow>> {
    let config = WorkflowConfig::from_env()?;
    let workflow = aws_workflow(&config)?;

    info!("Targeting rule: {}", workflow.rule());
    info!("Notification topic: {}", config.topic_arn);
    info!("Run timeout: {:?}", workflow.timeout());
    if !config.enabled {
        info!("The workflow is disabled. Events will be acknowledged and dropped.");
    }

    Ok(Arc::new(workflow))
}
