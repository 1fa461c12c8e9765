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

//! Renders a pipeline state change into the three equivalent payloads of a
//! notification: a subject line, a plain-text body for email subscribers and
//! a Slack attachment for chat subscribers.

use crate::configs::HERALD_CONSOLE_DOMAIN;
use crate::error::Result;
use crate::event::PipelineEvent;
use crate::lexicon::LexiconEntry;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// The product title of every subject line.
pub const NOTIFICATION_TITLE: &str = "AWS CodePipeline Pipeline Execution State Notification";

/// One field of a Slack attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentField {
    /// The field label.
    pub title: String,
    /// The field value.
    pub value: String,
    /// Short fields are laid out side by side.
    pub short: bool,
}

/// A Slack message attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// The color bar of the attachment.
    pub color:   String,
    /// The line shown above the attachment.
    pub pretext: String,
    /// The attachment fields.
    pub fields:  Vec<AttachmentField>,
}

/// The structured (chat) rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackMessage {
    /// The attachments, exactly one for pipeline notifications.
    pub attachments: Vec<Attachment>,
}

/// A notification, rendered once per channel kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposedMessage {
    /// The single-line subject.
    pub subject:         String,
    /// The plain-text body.
    pub text_body:       String,
    /// The structured body.
    pub structured_body: SlackMessage,
}

impl ComposedMessage {
    /// The structured body encoded as JSON.
    pub fn structured_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.structured_body)?)
    }

    /// The per-protocol message of an SNS publish with
    /// `MessageStructure=json`: `default` and `email` subscribers receive the
    /// plain-text body, `lambda` subscribers (the chat forwarder) receive the
    /// structured body.
    pub fn sns_message(&self) -> Result<String> {
        Ok(json!({
            "default": self.text_body,
            "email": self.text_body,
            "lambda": self.structured_json()?,
        })
        .to_string())
    }
}

/// The console deep link of a pipeline.
pub fn pipeline_url(region: &str, pipeline: &str) -> String {
    format!(
        "https://{}.{}/codesuite/codepipeline/pipelines/{}/view?region={}",
        region, *HERALD_CONSOLE_DOMAIN, pipeline, region
    )
}

/// Composes the notification of `event`.
///
/// The three renderings are built from the same values, so they always agree
/// on the state, the pipeline and the time. Composition is pure: identical
/// inputs give byte-identical output. Without a lexicon entry the glyph and
/// the color render as empty strings.
pub fn compose(event: &PipelineEvent, entry: Option<&LexiconEntry>) -> ComposedMessage {
    let glyph = entry.map_or("", |e| e.glyph);
    let color = entry.map_or("", |e| e.color);
    let time = event.timestamp();
    let url = pipeline_url(&event.region, event.pipeline());

    let fields = [
        ("Account", event.account.as_str()),
        ("Region", event.region.as_str()),
        ("Pipeline", event.pipeline()),
        ("State", event.state()),
        ("Time", time.as_str()),
    ];

    let subject = format!(
        "{} [{}] {} [{}][{}]",
        glyph,
        event.state(),
        NOTIFICATION_TITLE,
        event.account,
        event.region
    );

    let text_body = fields
        .iter()
        .chain(std::iter::once(&("URL", url.as_str())))
        .map(|(label, value)| format!("{} : {}\n", label, value))
        .collect::<String>();

    let structured_body = SlackMessage {
        attachments: vec![Attachment {
            color:   color.to_owned(),
            pretext: format!(
                "{} Pipeline {} state changed to {}",
                glyph,
                event.pipeline(),
                event.state()
            ),
            fields:  fields
                .iter()
                .map(|(title, value)| AttachmentField {
                    title: title.to_string(),
                    value: value.to_string(),
                    short: true,
                })
                .collect(),
        }],
    };

    ComposedMessage {
        subject,
        text_body,
        structured_body,
    }
}
