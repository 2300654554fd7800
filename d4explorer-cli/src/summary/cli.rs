use clap::{Arg, ArgAction, Command, value_parser};

pub const SUMMARY_CMD: &str = "summary";

pub fn create_summary_cli() -> Command {
    Command::new(SUMMARY_CMD)
        .author("d4explorer developers")
        .about("Summarize a cached dataset: coverage statistics per feature and the histogram table")
        .arg(
            Arg::new("dataset")
                .required(true)
                .help("Dataset cache key, or the d4 file it was computed from"),
        )
        .arg(
            Arg::new("annotation-file")
                .long("annotation-file")
                .short('a')
                .help("Annotation used for preprocessing, when the dataset is given as a file"),
        )
        .arg(
            Arg::new("max-bins")
                .long("max-bins")
                .short('m')
                .value_parser(value_parser!(u64))
                .default_value("1000")
                .help("max-bins used for preprocessing, when the dataset is given as a file"),
        )
        .arg(
            Arg::new("cache-folder")
                .long("cache-folder")
                .short('f')
                .help("Cache folder path"),
        )
        .arg(
            Arg::new("min")
                .long("min")
                .value_parser(value_parser!(i64))
                .allow_negative_numbers(true)
                .help("Lowest depth bin to include"),
        )
        .arg(
            Arg::new("max")
                .long("max")
                .value_parser(value_parser!(i64))
                .help("Highest depth bin to include"),
        )
        .arg(
            Arg::new("features")
                .long("features")
                .action(ArgAction::Append)
                .value_delimiter(',')
                .help("Comma separated features to include [default: all]"),
        )
        .arg(
            Arg::new("sample-size")
                .long("sample-size")
                .value_parser(value_parser!(usize))
                .default_value("1000000")
                .help("Depth values sampled per feature for the statistics"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_parser(value_parser!(u64))
                .help("Random seed for sampling"),
        )
        .arg(
            Arg::new("table")
                .long("table")
                .short('o')
                .help("Write the histogram table to this file ('-' for stdout)"),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .value_parser(["tsv", "json"])
                .default_value("tsv")
                .help("Format of the histogram table"),
        )
}
