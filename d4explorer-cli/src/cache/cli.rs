use clap::{Arg, ArgAction, Command};

pub const CACHE_CMD: &str = "cache";
pub const CACHE_LIST: &str = "list";
pub const CACHE_SHOW: &str = "show";
pub const CACHE_REMOVE: &str = "rm";
pub const CACHE_SCHEMA: &str = "schema";

pub fn create_cache_cli() -> Command {
    Command::new(CACHE_CMD)
        .author("d4explorer developers")
        .about("Inspect and edit the histogram cache")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("cache-folder")
                .long("cache-folder")
                .short('f')
                .global(true)
                .help("Cache folder path"),
        )
        .subcommand(
            Command::new(CACHE_LIST)
                .about("List cached datasets")
                .arg(
                    Arg::new("all")
                        .long("all")
                        .action(ArgAction::SetTrue)
                        .help("List every entry, not only datasets"),
                ),
        )
        .subcommand(
            Command::new(CACHE_SHOW)
                .about("Print the metadata of an entry")
                .arg(Arg::new("key").required(true).help("Cache key")),
        )
        .subcommand(
            Command::new(CACHE_REMOVE)
                .about("Remove an entry from the cache")
                .arg(Arg::new("key").required(true).help("Cache key")),
        )
        .subcommand(Command::new(CACHE_SCHEMA).about("Print the JSON schema of entry metadata"))
}
