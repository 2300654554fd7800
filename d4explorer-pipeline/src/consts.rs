use std::time::Duration;

pub const D4TOOLS_ENV: &str = "D4TOOLS";
pub const DEFAULT_D4TOOLS: &str = "d4tools";

pub const DEFAULT_MAX_BINS: u64 = 1_000;
pub const DEFAULT_THREADS: usize = 1;

/// How often a running tool is checked against its timeout.
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);
