use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser as ClapParser;
use log::info;
use tessellator::codegen::DEFAULT_HEADER;
use tessellator::driver::{self, BuildConfig, OutputMode};
use tessellator::{Options, ProgramOptions};

/// Evaluate arithmetic expressions at C++ compile time.
#[derive(ClapParser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
  /// Expression to compile; prompts on stdin when omitted
  expr: Option<String>,

  /// Print the generated C++ program instead of compiling it
  #[arg(long)]
  emit: bool,

  /// Write the generated program to this file (implies --emit)
  #[arg(short, long)]
  output: Option<PathBuf>,

  /// C++ compiler to invoke
  #[arg(long, default_value = "g++")]
  cxx: PathBuf,

  /// Extra flag passed to the compiler; may be repeated
  #[arg(long = "cxx-flag", allow_hyphen_values = true)]
  cxx_flags: Vec<String>,

  /// Keep each run's source, header and binary in a new directory under this one
  #[arg(long)]
  work_dir: Option<PathBuf>,

  /// Seconds allowed for each of the compile and run steps
  #[arg(long, default_value_t = 60)]
  timeout: u64,

  /// Header name used in the generated #include
  #[arg(long, default_value = DEFAULT_HEADER)]
  header: String,

  /// Make the generated program wait for Enter before exiting
  #[arg(long)]
  pause: bool,

  /// Reject unknown characters and trailing tokens
  #[arg(long)]
  strict: bool,
}

fn read_expression() -> io::Result<String> {
  print!("Enter arithmetic expression: ");
  io::stdout().flush()?;
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line)
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
  let expr = match args.expr {
    Some(expr) => expr,
    None => read_expression()?,
  };

  let mut options = if args.strict {
    Options::strict()
  } else {
    Options::default()
  };
  options.program = ProgramOptions {
    header: args.header.clone(),
    pause_on_exit: args.pause,
  };

  let program = tessellator::generate_program_with(&expr, &options)?;

  if let Some(path) = &args.output {
    fs::write(path, &program)?;
    info!("wrote {}", path.display());
    return Ok(());
  }
  if args.emit {
    print!("{program}");
    return Ok(());
  }

  let config = BuildConfig {
    cxx: args.cxx,
    cxx_flags: args.cxx_flags,
    work_dir: args.work_dir,
    header: args.header,
    timeout: Duration::from_secs(args.timeout),
    output: if args.pause {
      OutputMode::Inherit
    } else {
      OutputMode::Capture
    },
  };

  let report = driver::compile_and_run(&program, &config)?;
  if let Some(dir) = &report.artifacts {
    info!("build artifacts kept in {}", dir.display());
  }
  print!("{}", report.stdout);
  println!(
    "Subprocess execution time: {:.10} seconds",
    report.elapsed.as_secs_f64()
  );
  Ok(())
}

fn main() {
  env_logger::init();

  let args = Args::parse();
  if let Err(err) = run(args) {
    eprintln!("{err}");
    process::exit(1);
  }
}
