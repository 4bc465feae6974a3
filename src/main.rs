use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;

use clap::Parser;
use snafu::{ResultExt, Snafu};
use tracing::{Level, debug, info};

use ewecalc::machine::{self, MachineError};
use ewecalc::{CalcResult, codegen, parser, tokenizer};

/// Evaluate arithmetic expressions, or compile them into EWE pseudo-assembly.
#[derive(Parser, Debug)]
#[command(name = "ewecalc", version)]
struct Cli {
  /// Read expressions line by line until end of input.
  #[arg(short, long, conflicts_with = "compile")]
  interactive: bool,

  /// Compile one expression into an EWE program.
  #[arg(short, long)]
  compile: bool,

  /// Where compile mode writes the program.
  #[arg(short, long, default_value = "a.ewe")]
  output: PathBuf,

  /// Also execute the compiled program and print what it writes.
  #[arg(long, requires = "compile")]
  run: bool,

  /// Print the token stream before parsing.
  #[arg(long)]
  tokens: bool,

  /// Print the parsed tree as an S-expression.
  #[arg(long)]
  ast: bool,

  /// Raise log verbosity (-v info, -vv debug, -vvv trace).
  #[arg(short, long, action = clap::ArgAction::Count)]
  verbose: u8,
}

#[derive(Debug, Snafu)]
enum DriverError {
  #[snafu(display("failed to read input: {source}"))]
  ReadInput { source: io::Error },

  #[snafu(display("failed to write output: {source}"))]
  WriteOutput { source: io::Error },

  #[snafu(display("failed to write {}: {source}", path.display()))]
  WriteProgram { path: PathBuf, source: io::Error },

  #[snafu(display("{report}"))]
  Expression { report: String },

  #[snafu(display("failed to run program: {source}"))]
  Run { source: MachineError },
}

fn main() {
  let cli = Cli::parse();
  init_logging(cli.verbose);

  let outcome = if cli.interactive {
    interactive(&cli)
  } else if cli.compile {
    compile(&cli)
  } else {
    single_shot(&cli)
  };

  if let Err(err) = outcome {
    eprintln!("{err}");
    process::exit(1);
  }
}

fn init_logging(verbose: u8) {
  let level = match verbose {
    0 => Level::WARN,
    1 => Level::INFO,
    2 => Level::DEBUG,
    _ => Level::TRACE,
  };
  tracing_subscriber::fmt()
    .with_max_level(level)
    .with_target(false)
    .with_writer(io::stderr)
    .init();
}

/// Each line is its own session with a fresh memory cell.
fn interactive(cli: &Cli) -> Result<(), DriverError> {
  let stdin = io::stdin();
  let mut input = String::new();
  loop {
    prompt("> ")?;
    input.clear();
    if stdin.lock().read_line(&mut input).context(ReadInputSnafu)? == 0 {
      println!();
      return Ok(());
    }

    let line = input.trim();
    if line.is_empty() {
      continue;
    }
    match calculate_line(cli, line) {
      Ok(value) => println!("= {value}"),
      Err(err) => {
        debug!(error = %err, "expression rejected");
        eprintln!("{}", err.report(line));
      }
    }
  }
}

fn single_shot(cli: &Cli) -> Result<(), DriverError> {
  prompt("Enter expression: ")?;
  let line = read_expression()?;
  let value = calculate_line(cli, &line).map_err(|err| DriverError::Expression {
    report: err.report(&line),
  })?;
  println!("The result is {value}");
  Ok(())
}

fn compile(cli: &Cli) -> Result<(), DriverError> {
  prompt("Expression to compile: ")?;
  let line = read_expression()?;
  let asm = compile_line(cli, &line).map_err(|err| DriverError::Expression {
    report: err.report(&line),
  })?;

  fs::write(&cli.output, &asm).context(WriteProgramSnafu {
    path: cli.output.clone(),
  })?;
  info!(path = %cli.output.display(), "wrote EWE program");
  println!("wrote {}", cli.output.display());

  if cli.run {
    for value in machine::run(&asm).context(RunSnafu)? {
      println!("= {value}");
    }
  }
  Ok(())
}

fn calculate_line(cli: &Cli, line: &str) -> CalcResult<i64> {
  ewecalc::calculate_node(&parse_line(cli, line)?)
}

fn compile_line(cli: &Cli, line: &str) -> CalcResult<String> {
  let node = parse_line(cli, line)?;
  Ok(codegen::program(&node))
}

fn parse_line(cli: &Cli, line: &str) -> CalcResult<ewecalc::Node> {
  if cli.tokens {
    for token in tokenizer::tokenize(line)? {
      println!(
        "{}:{} {:?} {}",
        token.line,
        token.column,
        token.kind,
        token.lexeme.as_deref().unwrap_or_default()
      );
    }
  }
  let node = parser::Parser::new(line).parse()?;
  if cli.ast {
    println!("{node}");
  }
  Ok(node)
}

fn prompt(text: &str) -> Result<(), DriverError> {
  print!("{text}");
  io::stdout().flush().context(WriteOutputSnafu)
}

fn read_expression() -> Result<String, DriverError> {
  let mut input = String::new();
  io::stdin().read_line(&mut input).context(ReadInputSnafu)?;
  Ok(input.trim().to_string())
}
