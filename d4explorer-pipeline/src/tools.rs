use std::env;
use std::ffi::OsString;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error};

use d4explorer_core::utils::parse_chrom_size_line;

use crate::consts::{D4TOOLS_ENV, DEFAULT_D4TOOLS, POLL_INTERVAL};
use crate::errors::{PipelineError, Result};

///
/// Where histograms and chromosome sizes of a depth file come from.
///
pub trait HistogramSource: Send + Sync {
    ///
    /// `(name, length)` of every sequence in the depth file.
    ///
    fn chrom_sizes(&self, path: &Path) -> Result<Vec<(String, u64)>>;

    ///
    /// Raw `(bin label, count)` rows of the depth histogram restricted to
    /// the regions in `regions`, with depths above `max_bins` collected in
    /// one `>max_bins` bin.
    ///
    fn histogram(&self, path: &Path, regions: &Path, max_bins: u64) -> Result<Vec<(String, u64)>>;
}

///
/// Runs the `d4tools` binary.
///
#[derive(Debug, Clone, PartialEq)]
pub struct D4Tools {
    program: PathBuf,
    threads: usize,
    timeout: Option<Duration>,
}

impl Default for D4Tools {
    ///
    /// `d4tools` from `$PATH`, or the binary named by `D4TOOLS`.
    ///
    fn default() -> Self {
        let program = env::var_os(D4TOOLS_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_D4TOOLS));
        D4Tools {
            program,
            threads: 1,
            timeout: None,
        }
    }
}

impl D4Tools {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Threads used by each invocation.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    ///
    /// Kill an invocation that runs longer than `timeout`.
    ///
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn hist_args(&self, path: &Path, regions: &Path, max_bins: u64) -> Vec<OsString> {
        vec![
            "stat".into(),
            "--stat".into(),
            "hist".into(),
            "--max-bin".into(),
            max_bins.to_string().into(),
            "--region".into(),
            regions.as_os_str().to_owned(),
            "--threads".into(),
            self.threads.to_string().into(),
            path.as_os_str().to_owned(),
        ]
    }

    pub fn genome_args(&self, path: &Path) -> Vec<OsString> {
        vec!["view".into(), "-g".into(), path.as_os_str().to_owned()]
    }

    ///
    /// Run the tool and return its standard output.
    ///
    fn run(&self, args: &[OsString]) -> Result<String> {
        let program = self.program.display().to_string();
        debug!(program = %program, ?args, "running depth tool");

        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| PipelineError::ToolSpawn {
                program: program.clone(),
                source,
            })?;

        // drain both pipes so a chatty tool cannot block on a full pipe
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let stdout = thread::spawn(move || read_pipe(stdout));
        let stderr = thread::spawn(move || read_pipe(stderr));

        let status = wait(&mut child, self.timeout)?;
        let stdout = join_reader(stdout);
        let stderr = join_reader(stderr);

        let Some(status) = status else {
            let seconds = self.timeout.map(|t| t.as_secs()).unwrap_or_default();
            error!(program = %program, seconds, "depth tool timed out");
            return Err(PipelineError::Timeout { program, seconds });
        };
        let stderr = stderr?;
        if !status.success() {
            error!(program = %program, %status, stderr = %stderr.trim(), "depth tool failed");
            return Err(PipelineError::ToolFailed {
                program,
                status: status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }
        Ok(stdout?)
    }
}

impl HistogramSource for D4Tools {
    fn chrom_sizes(&self, path: &Path) -> Result<Vec<(String, u64)>> {
        let output = self.run(&self.genome_args(path))?;
        parse_genome_listing(&output)
    }

    fn histogram(&self, path: &Path, regions: &Path, max_bins: u64) -> Result<Vec<(String, u64)>> {
        let output = self.run(&self.hist_args(path, regions, max_bins))?;
        parse_hist_output(&output)
    }
}

fn read_pipe(pipe: Option<impl Read>) -> io::Result<String> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf)?;
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn join_reader(reader: thread::JoinHandle<io::Result<String>>) -> Result<String> {
    reader
        .join()
        .map_err(|_| PipelineError::TaskPanicked("pipe reader panicked".to_string()))?
        .map_err(PipelineError::from)
}

///
/// Wait for the child; `None` if it was killed after `timeout`.
///
fn wait(child: &mut Child, timeout: Option<Duration>) -> Result<Option<ExitStatus>> {
    let Some(timeout) = timeout else {
        return Ok(Some(child.wait()?));
    };
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if start.elapsed() >= timeout {
            let _ = child.kill();
            child.wait()?;
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL.min(timeout));
    }
}

///
/// Parse `label count` rows. Blank lines are skipped; every other line must
/// have exactly two whitespace separated fields and an integer count.
///
pub fn parse_hist_output(output: &str) -> Result<Vec<(String, u64)>> {
    let mut rows = Vec::new();
    for (i, line) in output.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let unparseable = || PipelineError::Unparseable {
            line: i + 1,
            content: line.to_string(),
        };
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [label, count] = fields.as_slice() else {
            return Err(unparseable());
        };
        let count = count.parse::<u64>().map_err(|_| unparseable())?;
        rows.push((label.to_string(), count));
    }
    if rows.is_empty() {
        return Err(PipelineError::Unparseable {
            line: 0,
            content: "no histogram rows".to_string(),
        });
    }
    Ok(rows)
}

///
/// Parse the `name length` listing of `d4tools view -g`.
///
pub fn parse_genome_listing(output: &str) -> Result<Vec<(String, u64)>> {
    let mut sizes = Vec::new();
    for (i, line) in output.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        sizes.push(parse_chrom_size_line(line, i + 1)?);
    }
    if sizes.is_empty() {
        return Err(PipelineError::Unparseable {
            line: 0,
            content: "no sequences listed".to_string(),
        });
    }
    Ok(sizes)
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    fn test_parse_hist_output() {
        let rows = parse_hist_output("<0\t0\n0\t120\n1 300\n\n>1\t10\n").unwrap();
        assert_eq!(
            rows,
            vec![
                ("<0".to_string(), 0),
                ("0".to_string(), 120),
                ("1".to_string(), 300),
                (">1".to_string(), 10),
            ]
        );
    }

    #[rstest]
    #[case("0\t12\textra\n")]
    #[case("0\tmany\n")]
    #[case("lonely\n")]
    #[case("\n\n")]
    fn test_parse_hist_output_rejects(#[case] output: &str) {
        assert!(matches!(
            parse_hist_output(output),
            Err(PipelineError::Unparseable { .. })
        ));
    }

    #[rstest]
    fn test_parse_genome_listing() {
        let sizes = parse_genome_listing("chr1\t1000000\nchr2\t500\n").unwrap();
        assert_eq!(
            sizes,
            vec![("chr1".to_string(), 1_000_000), ("chr2".to_string(), 500)]
        );
        assert!(parse_genome_listing("").is_err());
    }

    #[rstest]
    fn test_hist_args() {
        let tools = D4Tools::new().with_program("d4tools").with_threads(4);
        let args = tools.hist_args(Path::new("a.d4"), Path::new("/tmp/r.bed"), 500);
        let args: Vec<String> = args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "stat", "--stat", "hist", "--max-bin", "500", "--region", "/tmp/r.bed",
                "--threads", "4", "a.d4"
            ]
        );
    }

    // yields `data`, then fails
    struct BrokenPipe {
        data: Option<&'static [u8]>,
    }

    impl Read for BrokenPipe {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.data.take() {
                Some(data) => {
                    buf[..data.len()].copy_from_slice(data);
                    Ok(data.len())
                }
                None => Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed")),
            }
        }
    }

    #[rstest]
    fn test_read_pipe() {
        assert_eq!(read_pipe(Some(&b"0\t12\n"[..])).unwrap(), "0\t12\n");
        assert_eq!(read_pipe(None::<&[u8]>).unwrap(), "");
    }

    #[rstest]
    fn test_truncated_pipe_is_an_error() {
        let pipe = BrokenPipe {
            data: Some(&b"<0\t0\n0\t1"[..]),
        };
        assert!(read_pipe(Some(pipe)).is_err());

        let reader = thread::spawn(|| read_pipe(Some(BrokenPipe { data: None })));
        assert!(matches!(join_reader(reader), Err(PipelineError::Io(_))));
    }

    #[rstest]
    fn test_missing_program_is_spawn_error() {
        let tools = D4Tools::new().with_program("/nonexistent/d4tools");
        assert!(matches!(
            tools.chrom_sizes(Path::new("a.d4")),
            Err(PipelineError::ToolSpawn { .. })
        ));
    }
}
