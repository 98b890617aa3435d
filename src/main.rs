//! Quill CLI: run a script file or evaluate a snippet.

use std::env;
use std::fs;
use std::process;

use colored::Colorize;
use quill::vm::{disassemble, VmConfig};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// CLI command to execute.
enum Command {
    /// Run a script file
    Run { file: String },
    /// Evaluate a string
    Eval { code: String },
}

/// CLI options parsed from arguments.
struct Options {
    command: Option<Command>,
    config: VmConfig,
    disassemble: bool,
}

fn print_usage() {
    eprintln!("Quill {} - bytecode interpreter", VERSION);
    eprintln!();
    eprintln!("Usage: quill [options] <script.ql>");
    eprintln!("       quill [options] -e <code>");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -e, --eval <code>   Evaluate code instead of reading a file");
    eprintln!("  --disassemble       Print the compiled bytecode instead of running it");
    eprintln!("  --max-frames N      Maximum call depth (default: 1024)");
    eprintln!("  --max-stack N       Maximum operand stack slots (default: 16 per frame)");
    eprintln!("  --version           Print the version and exit");
    eprintln!("  --help, -h          Show this help message");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  quill script.ql                 Run a script file");
    eprintln!("  quill --disassemble script.ql   Show the bytecode listing");
    eprintln!("  quill -e 'print(1 + 1)'         Evaluate code directly");
    eprintln!();
    eprintln!("Set RUST_LOG=debug to trace compilation and execution.");
}

fn usage_error(message: &str) -> ! {
    eprintln!("{}", message);
    print_usage();
    process::exit(64);
}

fn parse_limit(args: &[String], i: usize, flag: &str) -> usize {
    let Some(raw) = args.get(i) else {
        usage_error(&format!("{} requires a number", flag));
    };
    match raw.parse::<usize>() {
        Ok(n) if n > 0 => n,
        _ => usage_error(&format!("Invalid value for {}: {}", flag, raw)),
    }
}

fn parse_args() -> Options {
    let args: Vec<String> = env::args().skip(1).collect();
    let mut options = Options {
        command: None,
        config: VmConfig::default(),
        disassemble: false,
    };

    let mut max_stack = None;
    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                process::exit(0);
            }
            "--version" => {
                println!("quill {}", VERSION);
                process::exit(0);
            }
            "--disassemble" => options.disassemble = true,
            "--max-frames" => {
                i += 1;
                options.config = VmConfig::with_max_frames(parse_limit(&args, i, "--max-frames"));
            }
            "--max-stack" => {
                i += 1;
                max_stack = Some(parse_limit(&args, i, "--max-stack"));
            }
            "-e" | "--eval" => {
                i += 1;
                let Some(code) = args.get(i) else {
                    usage_error("-e requires a code argument");
                };
                if options.command.is_some() {
                    usage_error("Only one script or -e snippet can be given");
                }
                options.command = Some(Command::Eval { code: code.clone() });
            }
            _ if arg.starts_with('-') => usage_error(&format!("Unknown option: {}", arg)),
            _ => {
                if options.command.is_some() {
                    usage_error("Only one script or -e snippet can be given");
                }
                options.command = Some(Command::Run { file: arg.clone() });
            }
        }
        i += 1;
    }

    if let Some(max_stack) = max_stack {
        options.config.max_stack = max_stack;
    }
    options
}

fn main() {
    env_logger::init();
    let options = parse_args();

    let source = match &options.command {
        Some(Command::Run { file }) => match fs::read_to_string(file) {
            Ok(source) => source,
            Err(e) => {
                eprintln!("{} cannot read '{}': {}", "Error:".red().bold(), file, e);
                process::exit(66);
            }
        },
        Some(Command::Eval { code }) => code.clone(),
        None => usage_error("No script given"),
    };

    if options.disassemble {
        run_disassemble(&source);
    } else {
        run_source(&source, &options);
    }
}

fn run_disassemble(source: &str) {
    match quill::compile_source(source) {
        Ok(bytecode) => print!("{}", disassemble(&bytecode)),
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            process::exit(65);
        }
    }
}

fn run_source(source: &str, options: &Options) {
    let result = quill::run_source_with_output(source, options.config, std::io::stdout());

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        process::exit(70);
    }
}
