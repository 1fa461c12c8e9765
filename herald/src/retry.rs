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

//! Error retries and exponential backoff of the external calls of a run.

use crate::error::Result;
use log::info;
use std::future::Future;
use std::time::Duration;

/// Bounded retries with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries:  u32,
    base_backoff: Duration,
    max_backoff:  Duration,
}

impl RetryPolicy {
    /// Creates a retry policy.
    ///
    /// # Arguments
    /// * `max_retries` - The number of retries after the first attempt.
    /// * `base_backoff` - The delay before the first retry.
    /// * `max_backoff` - The upper bound of any single delay.
    pub fn new(max_retries: u32, base_backoff: Duration, max_backoff: Duration) -> Self {
        RetryPolicy {
            max_retries,
            base_backoff,
            max_backoff,
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        RetryPolicy::new(0, Duration::ZERO, Duration::ZERO)
    }

    /// The number of retries after the first attempt.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// The delay before retry number `retry` (zero based): `base * 2^retry`,
    /// capped at the maximum backoff.
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2_u32.checked_pow(retry).unwrap_or(u32::MAX);
        self.base_backoff
            .checked_mul(factor)
            .map_or(self.max_backoff, |delay| delay.min(self.max_backoff))
    }
}

/// Runs `op` until it succeeds, fails with an error that is not retryable, or
/// the retries of `policy` are used up. The last error is returned.
///
/// # Arguments
/// * `policy` - The retry policy.
/// * `what` - A short description of the call, for the logs.
/// * `op` - Produces a fresh attempt of the call.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut retries = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && retries < policy.max_retries => {
                let delay = policy.backoff(retries);
                retries += 1;
                info!(
                    "{} failed: {}. Retrying ({}/{}) in {:?}...",
                    what, e, retries, policy.max_retries, delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                if e.is_retryable() {
                    info!("{} failed after {} retries: {}", what, retries, e);
                }
                return Err(e);
            }
        }
    }
}
