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

//! The external capabilities a workflow run depends on. Each is a small
//! trait so that the engine can run against AWS or against in-memory fakes.

use crate::error::Result;
use crate::message::ComposedMessage;
use crate::rule::{ResourceId, TargetingRule};
use async_trait::async_trait;
use std::collections::HashSet;

/// Resolves a pipeline name to its durable resource identifier.
#[async_trait]
pub trait ResourceResolver: Send + Sync {
    /// Resolves `pipeline` to its ARN.
    ///
    /// Fails with [`HeraldError::NotFound`](crate::error::HeraldError::NotFound)
    /// if no pipeline has that name, and with
    /// [`HeraldError::Unavailable`](crate::error::HeraldError::Unavailable)
    /// on transient failures.
    async fn resolve(&self, pipeline: &str) -> Result<ResourceId>;
}

/// Finds the resources that carry a tag.
#[async_trait]
pub trait TagDirectory: Send + Sync {
    /// Returns the identifiers of all pipelines tagged with the key of `rule`
    /// and one of its values. The lookup filters by resource type and tag on
    /// the server side rather than listing every resource.
    async fn resources_with_tag(&self, rule: &TargetingRule) -> Result<HashSet<ResourceId>>;
}

/// The fan-out mechanism that delivers a notification to its subscribers.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Publishes `message` to `topic`. The sink picks the rendering of the
    /// message per subscriber. Returns the message id assigned by the sink,
    /// if any.
    async fn publish(&self, topic: &str, message: &ComposedMessage) -> Result<Option<String>>;
}
