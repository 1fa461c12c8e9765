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

//! Publishes notifications to an SNS topic.

use super::classify;
use crate::configs::HERALD_SNS_CLIENT;
use crate::error::{HeraldError, Result};
use crate::message::ComposedMessage;
use crate::services::NotificationSink;
use async_trait::async_trait;
use log::debug;
use rusoto_core::RusotoError;
use rusoto_sns::{PublishError, PublishInput, Sns, SnsClient};

/// SNS subjects must be shorter than 100 characters.
pub const MAX_SUBJECT_CHARS: usize = 99;

/// A [`NotificationSink`] backed by Amazon SNS.
#[derive(Clone)]
pub struct SnsTopic {
    client: SnsClient,
}

impl SnsTopic {
    /// Creates a sink with the shared client of the default region.
    pub fn new() -> Self {
        SnsTopic {
            client: HERALD_SNS_CLIENT.clone(),
        }
    }

    /// Creates a sink with a specific client.
    pub fn with_client(client: SnsClient) -> Self {
        SnsTopic { client }
    }
}

/// Makes a subject acceptable to SNS: a single line of at most
/// [`MAX_SUBJECT_CHARS`] characters, truncated on a character boundary.
pub fn sns_subject(subject: &str) -> String {
    subject
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .take(MAX_SUBJECT_CHARS)
        .collect()
}

/// Builds the publish request of a composed message. The subscription
/// protocol of each subscriber selects the rendering.
pub fn create_publish_request(topic: &str, message: &ComposedMessage) -> Result<PublishInput> {
    Ok(PublishInput {
        topic_arn: Some(topic.to_owned()),
        subject: Some(sns_subject(&message.subject)),
        message: message.sns_message()?,
        message_structure: Some("json".to_owned()),
        ..Default::default()
    })
}

#[async_trait]
impl NotificationSink for SnsTopic {
    async fn publish(&self, topic: &str, message: &ComposedMessage) -> Result<Option<String>> {
        let response = self
            .client
            .publish(create_publish_request(topic, message)?)
            .await
            .map_err(|e| match e {
                RusotoError::Service(PublishError::InternalError(desc)) => {
                    HeraldError::Unavailable(format!("sns:Publish: {}", desc))
                }
                e => classify("sns:Publish", e),
            })?;
        debug!("Published {:?} to {}", response.message_id, topic);
        Ok(response.message_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon;
    use crate::message::compose;
    use crate::test_util::pipeline_event;

    #[test]
    fn subjects_are_single_line_and_bounded() {
        assert_eq!(sns_subject("🤩 [SUCCEEDED] ok"), "🤩 [SUCCEEDED] ok");
        assert_eq!(sns_subject("line\nbreak"), "line break");

        let long = "🤩".repeat(150);
        let subject = sns_subject(&long);
        assert_eq!(subject.chars().count(), MAX_SUBJECT_CHARS);
        assert!(long.starts_with(&subject));
    }

    #[test]
    fn publish_request_selects_rendering_per_subscription() -> Result<()> {
        let event = pipeline_event("deploy-pl", "SUCCEEDED");
        let message = compose(&event, lexicon::lookup("SUCCEEDED"));
        let topic = "arn:aws:sns:us-east-1:111111111111:herald-topic";
        let request = create_publish_request(topic, &message)?;

        assert_eq!(request.topic_arn.as_deref(), Some(topic));
        assert_eq!(request.message_structure.as_deref(), Some("json"));
        assert_eq!(request.subject.as_deref(), Some(message.subject.as_str()));
        assert_eq!(request.message, message.sns_message()?);
        Ok(())
    }
}
