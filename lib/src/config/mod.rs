use std::path::Path;

use figment::{
    providers::{Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Limits that bound the work done by the parser on adversarial input.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ParserConfig {
    /// How many fat binaries can be nested inside a fat binary. With the
    /// default value of 1 the members of a fat binary can't be fat
    /// binaries themselves.
    pub max_fat_depth: usize,
    /// Maximum depth of the export trie.
    pub max_export_depth: usize,
    /// Maximum number of records produced by each of the rebase, bind,
    /// weak bind and lazy bind regions.
    pub max_region_records: usize,
}

impl Default for ParserConfig {
    fn default() -> ParserConfig {
        ParserConfig {
            max_fat_depth: 1,
            max_export_depth: 128,
            max_region_records: 1 << 20,
        }
    }
}

/// Load config file from a given path. Path must contain a valid TOML file or
/// this function will propagate the error. Settings missing from the file
/// keep their default values.
///
/// ```toml
/// max_fat_depth = 2
/// max_export_depth = 64
/// ```
pub fn load_config_from_file(
    config_file: &Path,
) -> Result<ParserConfig, figment::Error> {
    let config: ParserConfig =
        Figment::from(Serialized::defaults(ParserConfig::default()))
            .merge(Toml::file_exact(config_file))
            .extract()?;
    Ok(config)
}
