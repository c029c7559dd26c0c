//! Build-and-run driver for generated programs.
//!
//! Every run gets its own fresh build directory holding the program, the
//! metaprogramming header and the binary, so concurrent runs never share
//! files. The program is compiled with an external C++ compiler and the
//! binary is run, both bounded by a timeout. Diagnostics from the compiler or
//! the program are returned verbatim.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, info};
use snafu::ResultExt;
use tempfile::TempDir;

use crate::codegen::{DEFAULT_HEADER, META_FUNC_HPP};
use crate::error::{
  CompileResult, CompilerFailedSnafu, IoSnafu, ProgramFailedSnafu, TimeoutSnafu,
};

pub const GENERATED_SOURCE: &str = "generated.cpp";
pub const BINARY_STEM: &str = "result";
const BUILD_DIR_PREFIX: &str = "tessellator-";

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Where the program's standard output goes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputMode {
  /// Collect stdout into the returned report.
  #[default]
  Capture,
  /// Share the caller's terminal, e.g. for programs that wait on stdin.
  Inherit,
}

#[derive(Debug, Clone)]
pub struct BuildConfig {
  pub cxx: PathBuf,
  pub cxx_flags: Vec<String>,
  /// Parent of the per-run build directories. Directories created here are
  /// kept for inspection; with `None` they go to the system temp directory
  /// and are removed when the run ends.
  pub work_dir: Option<PathBuf>,
  /// File name the bundled header is written under; must match the include.
  pub header: String,
  pub timeout: Duration,
  pub output: OutputMode,
}

impl Default for BuildConfig {
  fn default() -> Self {
    Self {
      cxx: PathBuf::from("g++"),
      cxx_flags: Vec::new(),
      work_dir: None,
      header: DEFAULT_HEADER.to_string(),
      timeout: Duration::from_secs(60),
      output: OutputMode::Capture,
    }
  }
}

/// Outcome of a successful compile-and-run.
#[derive(Debug, Clone)]
pub struct RunReport {
  /// Program stdout; empty when output was inherited.
  pub stdout: String,
  pub compile_time: Duration,
  /// Wall-clock time of the program run alone.
  pub elapsed: Duration,
  /// Build directory left behind when `work_dir` was set.
  pub artifacts: Option<PathBuf>,
}

impl RunReport {
  /// Value printed on the program's `Result: ` line, if captured.
  pub fn value(&self) -> Option<i64> {
    self
      .stdout
      .lines()
      .find_map(|line| line.strip_prefix("Result: "))
      .and_then(|value| value.trim().parse().ok())
  }
}

struct Captured {
  status: ExitStatus,
  stdout: String,
  stderr: String,
}

/// A run's build directory: removed on drop, or kept on disk.
enum BuildDir {
  Scratch(TempDir),
  Kept(PathBuf),
}

impl BuildDir {
  fn create(config: &BuildConfig) -> CompileResult<Self> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(BUILD_DIR_PREFIX);
    let dir = match &config.work_dir {
      Some(parent) => {
        fs::create_dir_all(parent).context(IoSnafu {
          context: format!("cannot create {}", parent.display()),
        })?;
        let dir = builder.tempdir_in(parent).context(IoSnafu {
          context: format!("cannot create a build directory in {}", parent.display()),
        })?;
        Self::Kept(dir.keep())
      }
      None => Self::Scratch(builder.tempdir().context(IoSnafu {
        context: "cannot create a build directory",
      })?),
    };
    debug!("build directory: {}", dir.path().display());
    Ok(dir)
  }

  fn path(&self) -> &Path {
    match self {
      Self::Scratch(dir) => dir.path(),
      Self::Kept(path) => path,
    }
  }
}

/// Write the program and the header named `header` into `dir`.
///
/// Returns the path of the generated source file.
pub fn write_sources(program: &str, dir: &Path, header: &str) -> CompileResult<PathBuf> {
  let header = dir.join(header);
  if let Some(parent) = header.parent() {
    fs::create_dir_all(parent).context(IoSnafu {
      context: format!("cannot create {}", parent.display()),
    })?;
  }
  fs::write(&header, META_FUNC_HPP).context(IoSnafu {
    context: format!("cannot write {}", header.display()),
  })?;

  let source = dir.join(GENERATED_SOURCE);
  fs::write(&source, program).context(IoSnafu {
    context: format!("cannot write {}", source.display()),
  })?;

  debug!("wrote {} and {}", source.display(), header.display());
  Ok(source)
}

/// Compile the program with the configured compiler and run the binary.
pub fn compile_and_run(program: &str, config: &BuildConfig) -> CompileResult<RunReport> {
  let build_dir = BuildDir::create(config)?;
  // Absolute so the binary path does not depend on the child's cwd.
  let work_dir = fs::canonicalize(build_dir.path()).context(IoSnafu {
    context: format!("cannot resolve {}", build_dir.path().display()),
  })?;
  write_sources(program, &work_dir, &config.header)?;
  let binary = binary_path(&work_dir);

  let mut compile = Command::new(&config.cxx);
  compile
    .args(&config.cxx_flags)
    .arg(GENERATED_SOURCE)
    .arg("-o")
    .arg(&binary)
    .current_dir(&work_dir)
    .stdin(Stdio::null())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped());
  info!("compiling: {compile:?}");

  let started = Instant::now();
  let compiled = run_with_timeout(&mut compile, "compile", config.timeout)?;
  let compile_time = started.elapsed();
  if !compiled.status.success() {
    return CompilerFailedSnafu {
      status: compiled.status,
      stderr: compiled.stderr,
    }
    .fail();
  }

  let mut run = Command::new(&binary);
  run.current_dir(&work_dir).stderr(Stdio::piped());
  match config.output {
    OutputMode::Capture => {
      run.stdin(Stdio::null()).stdout(Stdio::piped());
    }
    OutputMode::Inherit => {
      run.stdin(Stdio::inherit()).stdout(Stdio::inherit());
    }
  }
  info!("running: {}", binary.display());

  let started = Instant::now();
  let ran = run_with_timeout(&mut run, "run", config.timeout)?;
  let elapsed = started.elapsed();
  if !ran.status.success() {
    return ProgramFailedSnafu {
      status: ran.status,
      stderr: ran.stderr,
    }
    .fail();
  }

  let artifacts = match build_dir {
    BuildDir::Kept(path) => Some(path),
    BuildDir::Scratch(_) => None,
  };
  Ok(RunReport {
    stdout: ran.stdout,
    compile_time,
    elapsed,
    artifacts,
  })
}

fn binary_path(work_dir: &Path) -> PathBuf {
  work_dir.join(format!("{BINARY_STEM}{}", std::env::consts::EXE_SUFFIX))
}

/// Spawn `command`, draining its pipes on background threads, and kill it
/// once `limit` has elapsed.
fn run_with_timeout(command: &mut Command, step: &str, limit: Duration) -> CompileResult<Captured> {
  let mut child = command.spawn().context(IoSnafu {
    context: format!("cannot start {step} step"),
  })?;
  let stdout = child.stdout.take().map(spawn_reader);
  let stderr = child.stderr.take().map(spawn_reader);

  let deadline = Instant::now() + limit;
  let status = loop {
    if let Some(status) = child.try_wait().context(IoSnafu {
      context: format!("cannot wait for {step} step"),
    })? {
      break status;
    }
    if Instant::now() >= deadline {
      // The child may have exited between the poll and the kill.
      let _ = child.kill();
      let _ = child.wait();
      return TimeoutSnafu { step, limit }.fail();
    }
    thread::sleep(POLL_INTERVAL);
  };

  Ok(Captured {
    status,
    stdout: join_reader(stdout),
    stderr: join_reader(stderr),
  })
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<String> {
  thread::spawn(move || {
    let mut buf = Vec::new();
    let _ = pipe.read_to_end(&mut buf);
    String::from_utf8_lossy(&buf).into_owned()
  })
}

fn join_reader(handle: Option<JoinHandle<String>>) -> String {
  handle
    .and_then(|handle| handle.join().ok())
    .unwrap_or_default()
}
