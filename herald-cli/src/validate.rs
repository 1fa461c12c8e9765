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

//! Checks a workflow configuration.

use crate::args::config_arg;
use anyhow::Result;
use clap::{ArgMatches, Command};
use herald::prelude::*;

pub fn command_args() -> Command<'static> {
    Command::new("validate")
        .about("Validates a workflow configuration and prints its summary")
        .arg(config_arg())
}

pub fn command(matches: &ArgMatches) -> Result<()> {
    let config = load_config(matches.value_of("config"))?;
    config.validate()?;
    println!("{}", summary(&config)?);
    Ok(())
}

/// Loads the configuration from `path`, or from the environment.
pub fn load_config(path: Option<&str>) -> Result<WorkflowConfig> {
    Ok(match path {
        Some(path) => WorkflowConfig::from_file(path)?,
        None => WorkflowConfig::from_env()?,
    })
}

fn summary(config: &WorkflowConfig) -> Result<String> {
    let retry = config.retry_policy()?;
    let mut lines = vec![
        format!("Topic:    {}", config.topic_arn),
        format!("Rule:     {}", config.targeting_rule()?),
        format!("Enabled:  {}", config.enabled),
        format!(
            "Timeout:  {}",
            humantime::format_duration(config.timeout()?)
        ),
        format!(
            "Retry:    {} retries, backoff {:?} to {:?}",
            retry.max_retries(),
            retry.backoff(0),
            retry.backoff(retry.max_retries())
        ),
    ];
    match config.notifications.emails.as_slice() {
        [] => lines.push("Email:    none".to_owned()),
        emails => lines.push(format!("Email:    {}", emails.join(", "))),
    }
    match &config.notifications.slack {
        Some(slack) => lines.push(format!(
            "Slack:    workspace {} channel {}",
            slack.workspace_id, slack.channel_id
        )),
        None => lines.push("Slack:    none".to_owned()),
    }
    Ok(lines.join("\n"))
}
