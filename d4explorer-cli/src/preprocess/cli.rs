use clap::{Arg, ArgAction, Command, value_parser};

pub const PREPROCESS_CMD: &str = "preprocess";

pub fn create_preprocess_cli() -> Command {
    Command::new(PREPROCESS_CMD)
        .author("d4explorer developers")
        .about("Compute depth histograms per feature of a d4 file and store them in the cache")
        .arg(
            Arg::new("path")
                .required(true)
                .help("Path to the d4 depth file"),
        )
        .arg(
            Arg::new("annotation-file")
                .long("annotation-file")
                .short('a')
                .help("GFF3 or BED annotation; GFF3 is split into one feature per type"),
        )
        .arg(
            Arg::new("chrom-sizes")
                .long("chrom-sizes")
                .help("Sequence lengths (name<TAB>length) to use instead of the d4 header"),
        )
        .arg(
            Arg::new("max-bins")
                .long("max-bins")
                .short('m')
                .value_parser(value_parser!(u64))
                .help("Largest depth with its own bin [default: 1000]"),
        )
        .arg(
            Arg::new("threads")
                .long("threads")
                .short('t')
                .value_parser(value_parser!(usize))
                .help("Concurrent d4tools invocations [default: 1]"),
        )
        .arg(
            Arg::new("max-queue-size")
                .long("max-queue-size")
                .value_parser(value_parser!(usize))
                .help("Invocations queued at once [default: 2 x threads]"),
        )
        .arg(
            Arg::new("d4tools")
                .long("d4tools")
                .help("d4tools binary [default: $D4TOOLS or d4tools]"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .value_parser(value_parser!(u64))
                .help("Seconds before a d4tools invocation is killed"),
        )
        .arg(
            Arg::new("on-error")
                .long("on-error")
                .value_parser(["abort", "skip"])
                .help("What to do when a feature fails [default: abort]"),
        )
        .arg(
            Arg::new("cache-folder")
                .long("cache-folder")
                .short('f')
                .help("Cache folder path"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("TOML file with preprocessing options; flags take precedence"),
        )
        .arg(
            Arg::new("no-cache")
                .long("no-cache")
                .action(ArgAction::SetTrue)
                .help("Neither read nor write the cache"),
        )
        .arg(
            Arg::new("no-progress")
                .long("no-progress")
                .action(ArgAction::SetTrue)
                .help("Hide the progress bar"),
        )
}
