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

//! Configuration settings that affect all crates in current system.

use crate::error::{HeraldError, Result};
use ini::Ini;
use lazy_static::lazy_static;
use std::str::FromStr;

lazy_static! {
    /// Global settings.
    pub static ref HERALD_CONF: Ini =
        Ini::load_from_str(include_str!("./config.toml")).expect("bundled config.toml is valid");
}

/// Reads and parses a single setting from the bundled `config.toml`.
///
/// # Arguments
/// * `section` - The INI section, e.g. `retry`.
/// * `key` - The key inside the section, e.g. `max_retries`.
pub fn setting<T>(section: &str, key: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let value = HERALD_CONF
        .get_from(Some(section), key)
        .ok_or_else(|| HeraldError::Fatal(format!("missing setting [{}] {}", section, key)))?;
    value.trim().parse::<T>().map_err(|e| {
        HeraldError::Fatal(format!(
            "invalid setting [{}] {} = {:?}: {}",
            section, key, value, e
        ))
    })
}
