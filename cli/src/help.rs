pub const CONFIG_FILE: &str = r#"Config file for machofile

Specifies a config file which controls the limits used by the parser. If config file
is not specified, ${HOME}/.machofile.toml is used. If it does not exist the default
options are applied.

Supported options:

max_fat_depth = 1             # How many fat binaries can be nested in a fat binary
max_export_depth = 128        # Maximum depth of the export trie
max_region_records = 1048576  # Maximum number of records per dyld info region"#;

pub const DUMP_LONG_HELP: &str = r#"Show the structure of a Mach-O or fat binary

Parses the file and prints the result in JSON format. This includes the header,
the load commands, segments and sections, references to dynamic libraries, the
symbol table, and the records in the rebase, bind and export information used by
the dynamic linker.

For fat binaries every member is shown. Members that can't be parsed are shown
together with the error that prevented their parsing.

If the file is not provided it will be read from stdin.

Examples:

machofile dump /usr/lib/dyld
machofile dump --compact SOMEFILE
cat SOMEFILE | machofile dump"#;
