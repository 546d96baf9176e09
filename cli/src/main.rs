mod checks;
mod test_runner;
mod toml_value;

use std::path::Path;
use std::process;

use clap::{Parser, Subcommand};
use codespan_reporting::diagnostic::Diagnostic;
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use tracing::info;
use tracing_subscriber::EnvFilter;

use interpreter::{CommandRegistry, RuntimeValue};

const SUBCOMMANDS: &[&str] = &["run", "test", "checks", "commands", "help"];

#[derive(Parser)]
#[command(name = "kmd", version, about = "kmd check script interpreter")]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a kmd script
    Run(RunArgs),

    /// Run .test.kmd test files
    Test(TestArgs),

    /// Run a TOML suite of checks and print their results as JSON
    Checks(ChecksArgs),

    /// List the available commands
    Commands,
}

#[derive(clap::Args)]
struct RunArgs {
    /// Script file to execute
    #[arg(required_unless_present = "list_commands")]
    file: Option<String>,

    /// List the available commands and exit
    #[arg(long)]
    list_commands: bool,

    /// Initial input, as a string
    #[arg(short, long, conflicts_with = "input_json")]
    input: Option<String>,

    /// Initial input, as JSON
    #[arg(long)]
    input_json: Option<String>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Compile only, don't execute (exit 0 if valid)
    #[arg(long)]
    check: bool,

    /// Dump the parsed indentation tree
    #[arg(long)]
    ast: bool,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.kmd file or directory containing them
    path: String,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

#[derive(clap::Args)]
struct ChecksArgs {
    /// Check suite file
    suite: String,

    /// Pretty-print the JSON report
    #[arg(long)]
    pretty: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Backwards compatibility: if the first positional arg is not a known
    // subcommand, inject "run" so `kmd file.kmd` works like `kmd run file.kmd`.
    let mut args: Vec<String> = std::env::args().collect();
    if let Some(pos) = args
        .iter()
        .skip(1)
        .position(|a| !a.starts_with('-'))
        .map(|p| p + 1)
    {
        if !SUBCOMMANDS.contains(&args[pos].as_str()) {
            args.insert(pos, "run".to_string());
        }
    }

    let cli = Cli::parse_from(&args);
    init_tracing(cli.verbose);

    let registry = CommandRegistry::with_builtins();

    match cli.command {
        Command::Run(run_args) => do_run(run_args, &registry, cli.no_color).await,
        Command::Test(test_args) => {
            let path = Path::new(&test_args.path);
            if test_args.list_categories {
                test_runner::list_categories(path);
                return;
            }
            let exit_code =
                test_runner::run_tests(path, &registry, cli.no_color, &test_args.category).await;
            process::exit(exit_code);
        }
        Command::Checks(checks_args) => do_checks(checks_args, &registry).await,
        Command::Commands => print!("{}", command_listing(&registry)),
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn do_run(args: RunArgs, registry: &CommandRegistry, no_color: bool) {
    let color_choice = if no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    if args.list_commands {
        print!("{}", command_listing(registry));
        return;
    }

    let Some(file) = args.file else {
        eprintln!("error: no script file given");
        process::exit(2);
    };

    let source = match std::fs::read_to_string(&file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", file, e);
            process::exit(1);
        }
    };

    // Set up codespan file database
    let mut files = SimpleFiles::new();
    let file_id = files.add(file.clone(), source.clone());

    // --ast: dump the indentation tree
    if args.ast {
        match kmd::parser::Parser::new(source, file_id).parse() {
            Ok(script) => println!("{:#?}", script),
            Err(errors) => {
                let diagnostics: Vec<_> = errors.iter().map(|e| e.to_diagnostic()).collect();
                emit_diagnostics(color_choice, &files, &diagnostics);
                process::exit(1);
            }
        }
        return;
    }

    let pipeline = match interpreter::compile_with_id(&source, file_id, registry) {
        Ok(p) => p,
        Err(error) => {
            emit_diagnostics(color_choice, &files, &error.diagnostics());
            process::exit(1);
        }
    };

    // --check: compilation succeeded, exit
    if args.check {
        eprintln!("ok: {} compiled successfully", file);
        return;
    }

    let input = match (args.input, args.input_json) {
        (Some(text), _) => RuntimeValue::String(text),
        (None, Some(json)) => match serde_json::from_str::<serde_json::Value>(&json) {
            Ok(value) => RuntimeValue::from(value),
            Err(e) => {
                eprintln!("error: invalid --input-json: {}", e);
                process::exit(1);
            }
        },
        (None, None) => RuntimeValue::Unit,
    };

    info!(file = %file, "running script");
    match pipeline.run(input).await {
        Ok(value) => print_value(&value, args.json),
        Err(error) => {
            eprintln!("runtime error: {}", error);
            process::exit(1);
        }
    }
}

async fn do_checks(args: ChecksArgs, registry: &CommandRegistry) {
    let path = Path::new(&args.suite);
    let suite = match checks::load_suite(path) {
        Ok(suite) => suite,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };
    let base_dir = path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| std::path::PathBuf::from("."));

    let report = checks::run_suite(&suite, &base_dir, registry).await;
    let rendered = if args.pretty {
        serde_json::to_string_pretty(&report.results)
    } else {
        serde_json::to_string(&report.results)
    };
    match rendered {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("error: cannot render report: {}", e);
            process::exit(1);
        }
    }

    if report.failed > 0 {
        eprintln!("{} of {} checks failed", report.failed, suite.checks.len());
        process::exit(1);
    }
}

/// One registered command name per line, sorted.
fn command_listing(registry: &CommandRegistry) -> String {
    registry
        .names()
        .into_iter()
        .map(|name| format!("{}\n", name))
        .collect()
}

fn print_value(value: &RuntimeValue, json: bool) {
    if !json {
        println!("{}", value);
        return;
    }
    match serde_json::to_string_pretty(value) {
        Ok(rendered) => println!("{}", rendered),
        Err(e) => {
            eprintln!("error: cannot render result: {}", e);
            process::exit(1);
        }
    }
}

fn emit_diagnostics(
    color_choice: ColorChoice,
    files: &SimpleFiles<String, String>,
    diagnostics: &[Diagnostic<usize>],
) {
    let writer = StandardStream::stderr(color_choice);
    let config = term::Config::default();
    for diagnostic in diagnostics {
        let _ = term::emit_to_write_style(&mut writer.lock(), &config, files, diagnostic);
    }
}
