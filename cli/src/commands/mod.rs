mod dump;

pub use dump::*;

use std::path::PathBuf;

use anyhow::{anyhow, Context};
use clap::{arg, command, crate_authors, ArgMatches, Command};
use machofile::{load_config_from_file, ParserConfig};

use crate::{commands, help, APP_HELP_TEMPLATE, CONFIG_FILE};

pub fn command(name: &'static str) -> Command {
    Command::new(name).help_template(
        r#"{about-with-newline}
{usage-heading}
  {usage}

{all-args}
"#,
    )
}

pub fn cli() -> Command {
    command!()
        .author(crate_authors!("\n")) // requires `cargo` feature
        .arg_required_else_help(true)
        .arg(
            arg!(-C --config <CONFIG_FILE> "Config file")
                .value_parser(existing_path_parser)
                .long_help(help::CONFIG_FILE),
        )
        .help_template(APP_HELP_TEMPLATE)
        .subcommand_required(true)
        .subcommands(vec![commands::dump()])
}

/// Returns the parser configuration.
///
/// The configuration is read from the file passed with `--config`, if any,
/// or from `${HOME}/.machofile.toml`. Errors in the file passed with
/// `--config` are reported, while a missing or invalid file in the home
/// directory is ignored and the default configuration is used instead.
pub fn load_config(args: &ArgMatches) -> anyhow::Result<ParserConfig> {
    if let Some(config_file) = args.get_one::<PathBuf>("config") {
        return load_config_from_file(config_file).with_context(|| {
            format!("can not load config file `{}`", config_file.display())
        });
    }

    let config = match home::home_dir() {
        Some(home_path) if !home_path.as_os_str().is_empty() => {
            load_config_from_file(&home_path.join(CONFIG_FILE))
                .unwrap_or_default()
        }
        _ => ParserConfig::default(),
    };

    Ok(config)
}

/// Parses a path and makes sure that it exists.
fn existing_path_parser(input: &str) -> Result<PathBuf, anyhow::Error> {
    let path = PathBuf::from(input);
    if path.try_exists()? {
        Ok(path)
    } else {
        Err(anyhow!("file not found"))
    }
}
