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

mod args;
mod render;
mod run;
mod validate;

use anyhow::Result;
use clap::{crate_version, Command};

fn cli() -> Command<'static> {
    Command::new("herald-cli")
        .version(crate_version!())
        .about("Command Line Tool for Herald pipeline notifications")
        .author("UMD Database Group")
        .args(args::get_logging_args())
        .subcommand(render::command_args())
        .subcommand(run::command_args())
        .subcommand(validate::command_args())
        .arg_required_else_help(true)
}

#[tokio::main]
pub async fn main() -> Result<()> {
    let matches = cli().get_matches();
    args::get_logging(&matches)?.init();

    match matches.subcommand() {
        Some(("render", sub)) => render::command(sub)?,
        Some(("run", sub)) => run::command(sub).await?,
        Some(("validate", sub)) => validate::command(sub)?,
        _ => cli().print_help()?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        cli().debug_assert();
    }

    #[test]
    fn global_logging_args() {
        let matches = cli()
            .try_get_matches_from(vec![
                "herald-cli",
                "render",
                "--event",
                "event.json",
                "-L",
                "debug",
            ])
            .unwrap();
        assert_eq!(matches.value_of("log-level"), Some("debug"));
    }
}
