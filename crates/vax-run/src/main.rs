//! CLI entry point for the VAX-11 subset runner.

mod host;

use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

use host::ConsoleService;
use vax_core::{run, run_traced, AoutImage, Cpu, TraceSink};

const USAGE_TEXT: &str = "\
Usage: vax-run [options] <image> [guest args...]

Runs a v7-style VAX a.out executable in a user-mode interpreter with a
console-only system-call service.

Options:
  -t, --trace          Print each instruction to stderr as it executes
  -h, --help           Show this help message

Examples:
  vax-run hello.out
  vax-run --trace sh.out -c 'echo hi'
";

#[derive(Debug, PartialEq, Eq)]
struct RunArgs {
    image: PathBuf,
    guest_args: Vec<OsString>,
    trace: bool,
}

#[derive(Debug)]
enum ParseResult {
    Run(RunArgs),
    Help,
}

fn parse_args(args: impl Iterator<Item = OsString>) -> Result<ParseResult, String> {
    let mut image: Option<PathBuf> = None;
    let mut guest_args = Vec::new();
    let mut trace = false;

    for arg in args {
        if image.is_some() {
            // Everything after the image path belongs to the guest.
            guest_args.push(arg);
            continue;
        }
        if arg == "--help" || arg == "-h" {
            return Ok(ParseResult::Help);
        }
        if arg == "--trace" || arg == "-t" {
            trace = true;
            continue;
        }
        if arg.to_string_lossy().starts_with('-') {
            return Err(format!("unknown option: {}", arg.to_string_lossy()));
        }
        image = Some(PathBuf::from(arg));
    }

    let image = image.ok_or_else(|| "missing image path".to_string())?;
    Ok(ParseResult::Run(RunArgs {
        image,
        guest_args,
        trace,
    }))
}

struct StderrTrace;

impl TraceSink for StderrTrace {
    fn record(&mut self, pc: u32, disassembly: &str) {
        eprintln!("{pc:8x}:\t{disassembly}");
    }
}

fn run_image(args: &RunArgs) -> Result<i32, String> {
    let image = AoutImage::from_file(&args.image)
        .map_err(|e| format!("{}: {e}", args.image.display()))?;

    let mut cpu = Cpu::new();
    cpu.load(&image);

    let mut guest_argv: Vec<Vec<u8>> = vec![args.image.display().to_string().into_bytes()];
    guest_argv.extend(
        args.guest_args
            .iter()
            .map(|a| a.to_string_lossy().into_owned().into_bytes()),
    );
    cpu.init_args(&guest_argv, &[])
        .map_err(|e| format!("argument setup failed: {e}"))?;

    let mut service = ConsoleService;
    let status = if args.trace {
        run_traced(&mut cpu, &mut service, &mut StderrTrace)
    } else {
        run(&mut cpu, &mut service)
    };
    status.map_err(|fault| format!("fault at pc {:#x}: {fault}", cpu.pc()))
}

fn main() {
    let exit_code = match parse_args(env::args_os().skip(1)) {
        Ok(ParseResult::Help) => {
            println!("{USAGE_TEXT}");
            0
        }
        Ok(ParseResult::Run(args)) => match run_image(&args) {
            Ok(status) => status,
            Err(error) => {
                eprintln!("error: {error}");
                1
            }
        },
        Err(error) => {
            eprintln!("error: {error}");
            eprintln!("{USAGE_TEXT}");
            1
        }
    };

    std::process::exit(exit_code);
}
