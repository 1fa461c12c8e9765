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

//! This module provides various default configurations for Herald.

pub mod workflow;
pub use workflow::{NotificationsConfig, RetryConfig, SlackChannel, TargetResource, WorkflowConfig};

mod herald;
pub use self::herald::{setting, HERALD_CONF};
use lazy_static::lazy_static;
use rusoto_codepipeline::CodePipelineClient;
use rusoto_core::Region;
use rusoto_resourcegroupstaggingapi::ResourceGroupsTaggingApiClient;
use rusoto_sns::SnsClient;

lazy_static! {
    /// Environment variable that carries the JSON workflow configuration.
    pub static ref HERALD_CONFIG_ENV: String = HERALD_CONF["workflow"]["environment"].to_string();
    /// The domain of the AWS management console, used in deep links.
    pub static ref HERALD_CONSOLE_DOMAIN: String = HERALD_CONF["aws"]["console_domain"].to_string();
    /// The resource type filter of tag lookups.
    pub static ref HERALD_RESOURCE_TYPE: String = HERALD_CONF["aws"]["resource_type"].to_string();
    /// The EventBridge source of pipeline events.
    pub static ref HERALD_EVENT_SOURCE: String = HERALD_CONF["aws"]["event_source"].to_string();
    /// The EventBridge detail type of pipeline execution state changes.
    pub static ref HERALD_DETAIL_TYPE: String = HERALD_CONF["aws"]["detail_type"].to_string();

    /// Herald associated services.
    /// Herald CodePipeline Client.
    pub static ref HERALD_CODEPIPELINE_CLIENT: CodePipelineClient = CodePipelineClient::new(Region::default());
    /// Herald Resource Groups Tagging API Client.
    pub static ref HERALD_TAGGING_CLIENT: ResourceGroupsTaggingApiClient = ResourceGroupsTaggingApiClient::new(Region::default());
    /// Herald SNS Client.
    pub static ref HERALD_SNS_CLIENT: SnsClient = SnsClient::new(Region::default());
}
