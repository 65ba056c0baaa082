use clap::{Args, Parser, Subcommand};
use ktape::types::COMMENT_MARKER;
use ktape::{
    analyze, compile, parse_with, CompileOptions, Config, Machine, MachineCatalog,
    MachineLoader, Outcome, Symbol, TapeMode, Token, TuringMachine, DEFAULT_MAX_STEPS,
};
use std::error::Error;
use std::path::{Path, PathBuf};

type CliResult<T = ()> = Result<T, Box<dyn Error>>;

#[derive(Parser)]
#[clap(author, version, about, long_about = None, arg_required_else_help = true)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a machine on an input
    Run(RunArgs),

    /// Compile a multi-tape machine into a single-tape machine
    Compile(CompileArgs),

    /// Report likely mistakes in a machine
    Check {
        /// A machine file, or the key or name of a built-in machine
        machine: String,

        /// Use multi-character symbols
        #[clap(short, long)]
        tokens: bool,
    },

    /// List the built-in machines
    List,
}

#[derive(Args)]
struct RunArgs {
    /// A machine file, or the key or name of a built-in machine
    machine: String,

    /// The input for the first tape; defaults to the built-in sample
    input: Option<String>,

    /// Use multi-character symbols; separate input symbols with '|'
    #[clap(short, long)]
    tokens: bool,

    /// Stop after this many steps
    #[clap(short, long, default_value_t = DEFAULT_MAX_STEPS)]
    max_steps: usize,

    /// Keep heads from moving left of the first cell
    #[clap(short, long)]
    right_infinite: bool,

    /// Run the compiled single-tape machine instead
    #[clap(short, long)]
    compiled: bool,

    /// Print each step of the execution to stderr
    #[clap(short = 'd', long)]
    trace: bool,

    /// Print the outcome as JSON
    #[clap(short, long)]
    json: bool,
}

#[derive(Args)]
struct CompileArgs {
    /// A machine file, or the key or name of a built-in machine
    machine: String,

    /// Use multi-character symbols
    #[clap(short, long)]
    tokens: bool,

    /// Reproduce right-infinite tapes
    #[clap(short, long)]
    right_infinite: bool,

    /// List the phase of every compiled state as comments
    #[clap(short, long)]
    phases: bool,

    /// Write the compiled machine to this file instead of stdout
    #[clap(short, long)]
    output: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = execute(cli.command) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn execute(command: Command) -> CliResult {
    match command {
        Command::Run(args) if args.tokens => run_command::<Token>(args),
        Command::Run(args) => run_command::<char>(args),
        Command::Compile(args) if args.tokens => compile_command::<Token>(args),
        Command::Compile(args) => compile_command::<char>(args),
        Command::Check { machine, tokens } => {
            let findings = if tokens {
                analyze(&load::<Token>(&machine)?.0)
            } else {
                analyze(&load::<char>(&machine)?.0)
            };

            if findings.is_empty() {
                println!("No findings.");
            }
            for finding in findings {
                println!("{finding}");
            }
            Ok(())
        }
        Command::List => {
            for index in 0..MachineCatalog::count() {
                let info = MachineCatalog::info(index)?;
                println!(
                    "{:>2}  {:<20} {} ({} tapes, {} states, {} transitions), try: {}",
                    info.index,
                    info.key,
                    info.name,
                    info.tapes,
                    info.state_count,
                    info.transition_count,
                    info.sample
                );
            }
            Ok(())
        }
    }
}

/// Loads a machine from a file, falling back to the built-in catalog. Built-in machines
/// come with a sample input.
fn load<S: Symbol>(source: &str) -> CliResult<(Machine<S>, Option<&'static str>)> {
    let path = Path::new(source);
    if path.exists() {
        return Ok((MachineLoader::load(path)?, None));
    }

    let entry = MachineCatalog::get_by_name(source)?;
    Ok((parse_with(entry.text)?, Some(entry.sample)))
}

fn tape_mode(right_infinite: bool) -> TapeMode {
    if right_infinite {
        TapeMode::RightInfinite
    } else {
        TapeMode::BiInfinite
    }
}

fn run_command<S: Symbol>(args: RunArgs) -> CliResult {
    let (machine, sample) = load::<S>(&args.machine)?;
    let input = S::split_input(args.input.as_deref().or(sample).unwrap_or_default());
    let config = Config::new(args.max_steps).with_tape_mode(tape_mode(args.right_infinite));

    if !args.compiled {
        let outcome = execute_machine(&machine, &input, config, args.trace)?;
        return report(&outcome, S::join(&outcome.output()), args.json);
    }

    let compiled = compile(
        &machine,
        CompileOptions {
            tape_mode: config.tape_mode,
        },
    )?;
    let encoded = compiled.encode_input(&input)?;
    let outcome = execute_machine(compiled.machine(), &encoded, config, args.trace)?;
    let output = compiled
        .decode_output(&outcome.tapes[0])
        .map(|output| S::join(&output))
        .unwrap_or_else(|| "(no layout to decode)".to_string());

    report(&outcome, output, args.json)
}

/// Runs a machine to the end, tracing every step when asked to.
fn execute_machine<T: Symbol>(
    machine: &Machine<T>,
    input: &[T],
    config: Config,
    trace: bool,
) -> CliResult<Outcome<T>> {
    let machine = TuringMachine::new(machine, input, config)?;
    if !trace {
        return Ok(machine.finish());
    }

    eprintln!("{}", describe(&machine.snapshot()));
    let mut snapshots = machine.snapshots();
    for snapshot in snapshots.by_ref() {
        eprintln!("{}", describe(&snapshot));
    }

    Ok(snapshots.finish())
}

fn describe<T: Symbol>(snapshot: &ktape::Snapshot<T>) -> String {
    let tapes = snapshot
        .tapes
        .iter()
        .map(|tape| tape.render())
        .collect::<Vec<_>>()
        .join(", ");
    let heads = snapshot
        .tapes
        .iter()
        .map(|tape| tape.head_index())
        .collect::<Vec<_>>();

    format!(
        "Step: {}, State: {}, Tapes: [{}], Heads: {:?}",
        snapshot.step, snapshot.state, tapes, heads
    )
}

fn report<T: Symbol>(outcome: &Outcome<T>, output: String, json: bool) -> CliResult {
    if json {
        let mut value = serde_json::to_value(outcome)?;
        value["output"] = serde_json::Value::String(output);
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Verdict: {}", outcome.verdict);
    println!("Steps: {}", outcome.steps);
    println!("State: {}", outcome.state);
    println!("Output: {output}");
    Ok(())
}

fn compile_command<S: Symbol>(args: CompileArgs) -> CliResult {
    let (machine, _) = load::<S>(&args.machine)?;
    let compiled = compile(
        &machine,
        CompileOptions {
            tape_mode: tape_mode(args.right_infinite),
        },
    )?;

    let mut text = format!(
        "{COMMENT_MARKER} compiled from {}: {} tapes, {} states\n",
        args.machine,
        compiled.source_tapes(),
        compiled.machine().state_count()
    );
    if args.phases {
        for (state, phase) in compiled.phases().iter().enumerate() {
            text.push_str(&format!("{COMMENT_MARKER} {state}: {phase}\n"));
        }
    }
    text.push_str(&compiled.machine().to_string());

    match args.output {
        Some(path) => std::fs::write(&path, text)?,
        None => print!("{text}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse_args(args: &[&str]) -> Command {
        Cli::try_parse_from([&["ktape-cli"][..], args].concat()).unwrap().command
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_arguments() {
        let Command::Run(args) = parse_args(&["run", "copy", "a|b", "-t", "-m", "50", "-c"]) else {
            panic!("expected the run command");
        };

        assert_eq!(args.machine, "copy");
        assert_eq!(args.input.as_deref(), Some("a|b"));
        assert!(args.tokens && args.compiled);
        assert!(!args.trace && !args.json && !args.right_infinite);
        assert_eq!(args.max_steps, 50);
    }

    #[test]
    fn test_run_defaults_to_step_bound() {
        let Command::Run(args) = parse_args(&["run", "copy"]) else {
            panic!("expected the run command");
        };

        assert_eq!(args.max_steps, DEFAULT_MAX_STEPS);
        assert!(args.input.is_none());
    }

    #[test]
    fn test_compile_arguments() {
        let Command::Compile(args) = parse_args(&["compile", "copy", "-r", "-p", "-o", "out.tm"])
        else {
            panic!("expected the compile command");
        };

        assert!(args.right_infinite && args.phases && !args.tokens);
        assert_eq!(args.output, Some(PathBuf::from("out.tm")));
    }

    #[test]
    fn test_commands_run_catalog_machines() {
        for args in [
            vec!["run", "copy"],
            vec!["run", "two-tape-equality", "01=01", "--compiled"],
            vec!["run", "Binary palindrome", "0110", "--json"],
            vec!["check", "unary-addition"],
            vec!["list"],
        ] {
            assert!(execute(parse_args(&args)).is_ok(), "{args:?}");
        }
    }

    #[test]
    fn test_unknown_machine_is_an_error() {
        assert!(execute(parse_args(&["run", "no-such-machine"])).is_err());
    }

    #[test]
    fn test_single_tape_machine_does_not_compile() {
        assert!(execute(parse_args(&["compile", "binary-increment"])).is_err());
    }
}
