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

//! Resolves pipeline names to ARNs with `codepipeline:GetPipeline`.

use super::classify;
use crate::configs::HERALD_CODEPIPELINE_CLIENT;
use crate::error::{HeraldError, Result};
use crate::rule::ResourceId;
use crate::services::ResourceResolver;
use async_trait::async_trait;
use log::debug;
use rusoto_codepipeline::{CodePipeline, CodePipelineClient, GetPipelineError, GetPipelineInput};
use rusoto_core::RusotoError;

/// A [`ResourceResolver`] backed by AWS CodePipeline.
#[derive(Clone)]
pub struct CodePipelineResolver {
    client: CodePipelineClient,
}

impl CodePipelineResolver {
    /// Creates a resolver with the shared client of the default region.
    pub fn new() -> Self {
        CodePipelineResolver {
            client: HERALD_CODEPIPELINE_CLIENT.clone(),
        }
    }

    /// Creates a resolver with a specific client.
    pub fn with_client(client: CodePipelineClient) -> Self {
        CodePipelineResolver { client }
    }
}

/// Maps a `GetPipeline` failure. An unknown name is [`HeraldError::NotFound`]
/// and is never retried.
pub(crate) fn get_pipeline_error(
    pipeline: &str,
    err: RusotoError<GetPipelineError>,
) -> HeraldError {
    match err {
        RusotoError::Service(GetPipelineError::PipelineNotFound(desc)) => {
            HeraldError::NotFound(format!("pipeline {}: {}", pipeline, desc))
        }
        e => classify("codepipeline:GetPipeline", e),
    }
}

#[async_trait]
impl ResourceResolver for CodePipelineResolver {
    async fn resolve(&self, pipeline: &str) -> Result<ResourceId> {
        let output = self
            .client
            .get_pipeline(GetPipelineInput {
                name: pipeline.to_owned(),
                ..Default::default()
            })
            .await
            .map_err(|e| get_pipeline_error(pipeline, e))?;

        let arn = output
            .metadata
            .and_then(|metadata| metadata.pipeline_arn)
            .ok_or_else(|| {
                HeraldError::AWS(format!("GetPipeline returned no ARN for {}", pipeline))
            })?;
        debug!("Resolved pipeline {} to {}", pipeline, arn);
        Ok(ResourceId::from(arn))
    }
}
