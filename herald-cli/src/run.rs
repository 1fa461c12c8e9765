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

//! Replays an event through a workflow backed by live AWS services.

use crate::args::{config_arg, event_arg};
use crate::validate::load_config;
use anyhow::Result;
use clap::{ArgMatches, Command};
use herald::prelude::*;

pub fn command_args() -> Command<'static> {
    Command::new("run")
        .about("Runs the notification workflow for a pipeline event against AWS")
        .arg(event_arg())
        .arg(config_arg())
}

pub async fn command(matches: &ArgMatches) -> Result<()> {
    let config = load_config(matches.value_of("config"))?;
    let path = matches.value_of("event").unwrap_or_default();
    let event = PipelineEvent::from_json(&std::fs::read_to_string(path)?)?;

    let workflow = aws_workflow(&config)?;
    match workflow.admit(&event) {
        Admission::Admitted => {
            let outcome = workflow.run(&event).await;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            if outcome.is_failure() {
                anyhow::bail!("the run did not complete: {}", outcome);
            }
        }
        Admission::Disabled => println!("The workflow is disabled, no run was created."),
        Admission::ForeignEvent => println!("Not a pipeline execution state change, ignored."),
    }
    Ok(())
}
