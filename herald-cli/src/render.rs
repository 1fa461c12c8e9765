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

//! Previews the notification of an event without calling AWS.

use crate::args::event_arg;
use anyhow::{bail, Result};
use clap::{Arg, ArgMatches, Command};
use herald::lexicon;
use herald::prelude::*;
use log::warn;

pub fn command_args() -> Command<'static> {
    Command::new("render")
        .about("Renders the notification of a pipeline event offline")
        .arg(event_arg())
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .possible_values(["text", "slack", "sns"])
                .default_value("text")
                .help("Sets the rendering to print")
                .takes_value(true),
        )
}

pub fn command(matches: &ArgMatches) -> Result<()> {
    let path = matches.value_of("event").unwrap_or_default();
    let event = PipelineEvent::from_json(&std::fs::read_to_string(path)?)?;
    let format = matches.value_of("format").unwrap_or("text");
    println!("{}", render(&event, format)?);
    Ok(())
}

/// Renders `event` in one of the per-subscription formats.
fn render(event: &PipelineEvent, format: &str) -> Result<String> {
    let entry = lexicon::lookup(event.state());
    if entry.is_none() {
        warn!(
            "{} is not a notifiable state, a workflow run would skip this event",
            event.state()
        );
    }
    let message = compose(event, entry);
    Ok(match format {
        "text" => format!("Subject: {}\n\n{}", message.subject, message.text_body),
        "slack" => message.structured_json()?,
        "sns" => message.sns_message()?,
        _ => bail!("unknown format: {}", format),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald::test_util::pipeline_event;

    #[test]
    fn render_text() -> Result<()> {
        let event = pipeline_event("deploy-pl", "STOPPED");
        let text = render(&event, "text")?;
        assert!(text.starts_with("Subject: 😌 [STOPPED] "));
        assert!(text.contains("deploy-pl"));
        Ok(())
    }

    #[test]
    fn render_sns() -> Result<()> {
        let event = pipeline_event("deploy-pl", "RESUMED");
        let sns: serde_json::Value = serde_json::from_str(&render(&event, "sns")?)?;
        assert!(sns["default"].is_string());
        assert!(sns["email"].is_string());
        assert!(sns["lambda"].is_string());
        Ok(())
    }

    #[test]
    fn unknown_format() {
        let event = pipeline_event("deploy-pl", "RESUMED");
        assert!(render(&event, "html").is_err());
    }
}
