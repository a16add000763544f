use std::fs::File;
use std::io::{stdin, stdout, Read};
use std::path::PathBuf;

use anyhow::Context;
use clap::{arg, value_parser, ArgMatches, Command};
use colored_json::{ColorMode, ToColoredJson};
use crossterm::tty::IsTty;
use machofile::{Parser, ParserConfig};

use crate::help;

pub fn dump() -> Command {
    super::command("dump")
        .about("Show the structure of a Mach-O or fat binary")
        .long_about(help::DUMP_LONG_HELP)
        .arg(
            arg!([FILE])
                .help("Path to binary file")
                .value_parser(value_parser!(PathBuf)),
        )
        // Keep options sorted alphabetically by their long name.
        // For instance, --bar goes before --foo.
        .arg(arg!(--"compact").help("Print the JSON output in a single line"))
        .arg(arg!(--"no-colors").help("Turn off colors in JSON output"))
}

pub fn exec_dump(
    args: &ArgMatches,
    config: ParserConfig,
) -> anyhow::Result<()> {
    let mut buffer = Vec::new();

    let file = args.get_one::<PathBuf>("FILE");
    let compact = args.get_flag("compact");
    let no_colors = args.get_flag("no-colors");

    // By default, use colors if output is stdout. When output is a standard
    // file colors are disabled, and also when `--no-colors` is used.
    let use_color = stdout().is_tty() && !no_colors;

    // Get the input.
    if let Some(file) = file {
        File::open(file.as_path())
            .with_context(|| format!("can not open `{}`", file.display()))?
            .read_to_end(&mut buffer)?
    } else {
        stdin().read_to_end(&mut buffer)?
    };

    let macho = Parser::new().config(config).parse(buffer.as_slice());

    let macho = match (macho, file) {
        (Ok(macho), _) => macho,
        (Err(err), Some(file)) => {
            return Err(err).with_context(|| {
                format!("can not parse `{}`", file.display())
            })
        }
        (Err(err), None) => return Err(err).context("can not parse input"),
    };

    if compact {
        println!("{}", serde_json::to_string(&macho)?);
    } else {
        let mode = if use_color { ColorMode::On } else { ColorMode::Off };
        println!(
            "{}",
            serde_json::to_string_pretty(&macho)?.to_colored_json(mode)?
        );
    }

    Ok(())
}
