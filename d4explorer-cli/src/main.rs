mod cache;
mod preprocess;
mod summary;

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use tracing_subscriber::EnvFilter;

pub mod consts {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
    pub const BIN_NAME: &str = "d4explorer";

    pub const DEFAULT_LOG_LEVEL: &str = "info";
    /// Log targets kept unless `--no-log-filter` is given
    pub const LOG_TARGETS: [&str; 5] = [
        "d4explorer_cli",
        "d4explorer_core",
        "d4explorer_hist",
        "d4explorer_cache",
        "d4explorer_pipeline",
    ];
}

fn build_parser() -> Command {
    Command::new(consts::BIN_NAME)
        .bin_name(consts::BIN_NAME)
        .version(consts::VERSION)
        .author("d4explorer developers")
        .about("Summarize sequencing depth in d4 files as histograms per genomic feature.")
        .subcommand_required(true)
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .global(true)
                .value_parser(["trace", "debug", "info", "warn", "error"])
                .help("Logging level [default: info, or RUST_LOG if set]"),
        )
        .arg(
            Arg::new("no-log-filter")
                .long("no-log-filter")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Show log messages of all libraries, not only d4explorer's"),
        )
        .subcommand(preprocess::cli::create_preprocess_cli())
        .subcommand(cache::cli::create_cache_cli())
        .subcommand(summary::cli::create_summary_cli())
}

///
/// Build the log filter. An explicit `--log-level` wins over `RUST_LOG`.
///
fn log_filter(level: Option<&str>, no_log_filter: bool) -> Result<EnvFilter> {
    let env_level = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let level = match (level, env_level) {
        (Some(level), _) => level.to_string(),
        (None, Some(directives)) => return Ok(EnvFilter::try_new(directives)?),
        (None, None) => consts::DEFAULT_LOG_LEVEL.to_string(),
    };
    let directives = if no_log_filter {
        level
    } else {
        consts::LOG_TARGETS
            .iter()
            .map(|target| format!("{}={}", target, level))
            .collect::<Vec<_>>()
            .join(",")
    };
    EnvFilter::try_new(&directives).with_context(|| format!("invalid log filter '{}'", directives))
}

fn init_logging(matches: &ArgMatches) -> Result<()> {
    let filter = log_filter(
        matches.get_one::<String>("log-level").map(String::as_str),
        matches.get_flag("no-log-filter"),
    )?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let app = build_parser();
    let matches = app.get_matches();
    init_logging(&matches)?;

    match matches.subcommand() {
        //
        // PREPROCESS
        //
        Some((preprocess::cli::PREPROCESS_CMD, matches)) => {
            preprocess::handlers::run_preprocess(matches)?;
        }

        //
        // CACHE
        //
        Some((cache::cli::CACHE_CMD, matches)) => {
            cache::handlers::run_cache(matches)?;
        }

        //
        // SUMMARY
        //
        Some((summary::cli::SUMMARY_CMD, matches)) => {
            summary::handlers::run_summary(matches)?;
        }

        _ => unreachable!("Subcommand not found"),
    };

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    fn test_parser_is_consistent() {
        build_parser().debug_assert();
    }

    #[rstest]
    fn test_log_filter_targets() {
        let filter = log_filter(Some("debug"), false).unwrap();
        let rendered = filter.to_string();
        assert!(rendered.contains("d4explorer_pipeline=debug"));

        let filter = log_filter(Some("warn"), true).unwrap();
        assert_eq!(filter.to_string(), "warn");
    }

    #[rstest]
    fn test_global_flags_after_subcommand() {
        let matches = build_parser()
            .try_get_matches_from(["d4explorer", "cache", "list", "--log-level", "debug"])
            .unwrap();
        assert_eq!(
            matches.get_one::<String>("log-level").map(String::as_str),
            Some("debug")
        );
    }
}
