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

//! Finds tagged pipelines with `tag:GetResources`.

use super::classify;
use crate::configs::{HERALD_RESOURCE_TYPE, HERALD_TAGGING_CLIENT};
use crate::error::{HeraldError, Result};
use crate::rule::{ResourceId, TargetingRule};
use crate::services::TagDirectory;
use async_trait::async_trait;
use log::debug;
use rusoto_core::RusotoError;
use rusoto_resourcegroupstaggingapi::{
    GetResourcesError, GetResourcesInput, GetResourcesOutput, ResourceGroupsTaggingApi,
    ResourceGroupsTaggingApiClient, TagFilter,
};
use std::collections::HashSet;
use std::future::Future;

/// A [`TagDirectory`] backed by the AWS Resource Groups Tagging API.
#[derive(Clone)]
pub struct TaggingDirectory {
    client: ResourceGroupsTaggingApiClient,
}

impl TaggingDirectory {
    /// Creates a directory with the shared client of the default region.
    pub fn new() -> Self {
        TaggingDirectory {
            client: HERALD_TAGGING_CLIENT.clone(),
        }
    }

    /// Creates a directory with a specific client.
    pub fn with_client(client: ResourceGroupsTaggingApiClient) -> Self {
        TaggingDirectory { client }
    }
}

/// Builds one page request of the tag lookup.
///
/// # Arguments
/// * `rule` - The targeting rule; its values are OR-matched by AWS.
/// * `token` - The pagination token of the previous page.
pub fn create_get_resources_request(
    rule: &TargetingRule,
    token: Option<String>,
) -> GetResourcesInput {
    GetResourcesInput {
        resource_type_filters: Some(vec![HERALD_RESOURCE_TYPE.clone()]),
        tag_filters: Some(vec![TagFilter {
            key:    Some(rule.tag_key().to_owned()),
            values: Some(rule.tag_values().map(str::to_owned).collect()),
        }]),
        pagination_token: token,
        ..Default::default()
    }
}

/// Maps a `GetResources` failure. Throttling and internal errors of the
/// tagging service are transient.
pub(crate) fn get_resources_error(err: RusotoError<GetResourcesError>) -> HeraldError {
    match err {
        RusotoError::Service(GetResourcesError::Throttled(desc))
        | RusotoError::Service(GetResourcesError::InternalService(desc)) => {
            HeraldError::Unavailable(format!("tag:GetResources: {}", desc))
        }
        e => classify("tag:GetResources", e),
    }
}

/// Fetches pages until the service stops handing out pagination tokens and
/// collects the ARNs of every page.
///
/// # Arguments
/// * `fetch_page` - Fetches the page of the given token, `None` for the first.
pub(crate) async fn collect_pages<F, Fut>(mut fetch_page: F) -> Result<HashSet<ResourceId>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<GetResourcesOutput>>,
{
    let mut resources = HashSet::new();
    let mut token: Option<String> = None;
    loop {
        let output = fetch_page(token).await?;
        resources.extend(
            output
                .resource_tag_mapping_list
                .into_iter()
                .flatten()
                .filter_map(|mapping| mapping.resource_arn)
                .map(ResourceId::from),
        );

        // The last page carries an empty token rather than none.
        match output.pagination_token {
            Some(next) if !next.is_empty() => token = Some(next),
            _ => return Ok(resources),
        }
    }
}

#[async_trait]
impl TagDirectory for TaggingDirectory {
    async fn resources_with_tag(&self, rule: &TargetingRule) -> Result<HashSet<ResourceId>> {
        let client = &self.client;
        let resources = collect_pages(move |token| async move {
            client
                .get_resources(create_get_resources_request(rule, token))
                .await
                .map_err(get_resources_error)
        })
        .await?;
        debug!("{} pipelines are tagged {}", resources.len(), rule);
        Ok(resources)
    }
}
