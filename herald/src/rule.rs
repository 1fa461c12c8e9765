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

//! The tag-based targeting rule that opts pipelines into notifications, and
//! the membership test applied to the resources it selects.

use crate::error::{HeraldError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

/// Maximum length of an AWS tag key.
const MAX_TAG_KEY_LEN: usize = 128;
/// Maximum length of an AWS tag value.
const MAX_TAG_VALUE_LEN: usize = 256;
/// A single `TagFilter` of `tag:GetResources` accepts at most 20 values.
const MAX_TAG_VALUES: usize = 20;

/// The durable identifier (ARN) of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId(String);

impl ResourceId {
    /// Creates a resource identifier from an ARN.
    pub fn new(arn: impl Into<String>) -> Self {
        ResourceId(arn.into())
    }

    /// Returns the ARN.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ResourceId {
    fn from(arn: String) -> Self {
        ResourceId(arn)
    }
}

impl From<&str> for ResourceId {
    fn from(arn: &str) -> Self {
        ResourceId(arn.to_owned())
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A tag key and the values of that key that opt a resource in.
///
/// A rule can only be obtained through [`TargetingRule::new`], so the value
/// set is never empty. This matters for the AWS tag filter, where an empty
/// value list selects every value of the key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetingRule {
    tag_key:    String,
    tag_values: BTreeSet<String>,
}

impl TargetingRule {
    /// Validates and creates a targeting rule.
    ///
    /// # Arguments
    /// * `tag_key` - The tag key, e.g. `DeployNotification`.
    /// * `tag_values` - The accepted values of the key, OR-matched.
    ///   Duplicates are collapsed.
    ///
    /// # Returns
    /// [`HeraldError::Fatal`] when the key or any value violates the AWS tag
    /// constraints or no value is given.
    pub fn new<I, S>(tag_key: &str, tag_values: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if tag_key.trim().is_empty() {
            return Err(HeraldError::Fatal("the tag key is empty".to_owned()));
        }
        if tag_key.trim() != tag_key {
            return Err(HeraldError::Fatal(format!(
                "the tag key {:?} has leading or trailing whitespace",
                tag_key
            )));
        }
        if tag_key.chars().count() > MAX_TAG_KEY_LEN {
            return Err(HeraldError::Fatal(format!(
                "the tag key {:?} is longer than {} characters",
                tag_key, MAX_TAG_KEY_LEN
            )));
        }

        let tag_values = tag_values
            .into_iter()
            .map(Into::into)
            .collect::<BTreeSet<String>>();
        if tag_values.is_empty() {
            return Err(HeraldError::Fatal(format!(
                "no tag values given for the tag key {:?}",
                tag_key
            )));
        }
        if tag_values.len() > MAX_TAG_VALUES {
            return Err(HeraldError::Fatal(format!(
                "{} tag values given, at most {} are supported",
                tag_values.len(),
                MAX_TAG_VALUES
            )));
        }
        if let Some(v) = tag_values
            .iter()
            .find(|v| v.chars().count() > MAX_TAG_VALUE_LEN)
        {
            return Err(HeraldError::Fatal(format!(
                "the tag value {:?} is longer than {} characters",
                v, MAX_TAG_VALUE_LEN
            )));
        }

        Ok(TargetingRule {
            tag_key: tag_key.to_owned(),
            tag_values,
        })
    }

    /// The tag key.
    pub fn tag_key(&self) -> &str {
        &self.tag_key
    }

    /// The accepted tag values in a stable order.
    pub fn tag_values(&self) -> impl Iterator<Item = &str> {
        self.tag_values.iter().map(String::as_str)
    }

    /// Returns true if a resource carrying `tags` is selected by this rule.
    /// Keys and values are compared exactly.
    pub fn matches(&self, tags: &HashMap<String, String>) -> bool {
        tags.get(&self.tag_key)
            .map_or(false, |value| self.tag_values.contains(value))
    }
}

impl fmt::Display for TargetingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values = self.tag_values.iter().cloned().collect::<Vec<_>>();
        write!(f, "{} in [{}]", self.tag_key, values.join(", "))
    }
}

/// Tests whether the resolved resource is one of the tagged resources.
/// Membership is strict set containment: no prefix or substring matching.
pub fn is_member(resource: &ResourceId, tagged: &HashSet<ResourceId>) -> bool {
    tagged.contains(resource)
}
