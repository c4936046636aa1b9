use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use clap::Parser;
use colored::Colorize;
use miette::{IntoDiagnostic, Report};

use lc3vm::term::Stdio;
use lc3vm::{Features, Image, Memory, RunError, RunState, PC_START};

/// Run LC3 object images, starting at x3000.
#[derive(Parser)]
#[command(version)]
struct Args {
    /// `.obj` images to load, in order. Later images overwrite earlier ones where they overlap
    #[arg(required = true)]
    images: Vec<PathBuf>,
    /// Produce minimal output, suited for blackbox tests
    #[arg(short, long)]
    minimal: bool,
    /// Comma-separated optional behaviour: `canonical-ldr`, `strict-traps`
    #[arg(short, long)]
    features: Option<Features>,
    /// How long a read of the keyboard status register waits for a key, in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 1000)]
    poll_timeout: u64,
}

/// Exit status when the user interrupts a running program.
const EXIT_INTERRUPTED: i32 = -2;
const EXIT_LOAD_FAILED: i32 = 1;

fn main() -> miette::Result<()> {
    use MsgColor::*;
    let args = Args::parse();
    lc3vm::env::init();
    let quiet = args.minimal;

    let mut images = Vec::with_capacity(args.images.len());
    let mut failed = false;
    for path in &args.images {
        match Image::read(path) {
            Ok(image) => {
                if !quiet {
                    file_message(Green, "Loaded", path);
                }
                images.push(image);
            }
            Err(err) => {
                file_message(Red, "Failed", path);
                eprintln!("{:?}", Report::new(err));
                failed = true;
            }
        }
    }
    if failed {
        process::exit(EXIT_LOAD_FAILED);
    }

    let features = args.features.unwrap_or_default();
    let memory = Memory::new(Duration::from_millis(args.poll_timeout));
    if !quiet {
        message(Green, "Running", &format!("from x{PC_START:04X}"));
    }
    // Terminal is raw from here until `state` is dropped
    let console = Stdio::detect().into_diagnostic()?;
    let mut state = RunState::with_memory(memory, console, features);
    for image in &images {
        state.load_image(image);
    }
    let result = state.run();
    // Restores the terminal before any of the exits below
    drop(state);
    match result {
        Ok(()) => {
            if !quiet {
                message(Cyan, "Halted", "program finished");
            }
            Ok(())
        }
        Err(RunError::Interrupted) => {
            eprintln!();
            process::exit(EXIT_INTERRUPTED);
        }
        Err(err @ RunError::IllegalOpcode { .. }) => {
            eprintln!("{:?}", Report::new(err));
            process::abort();
        }
        Err(err) => Err(err.into()),
    }
}

enum MsgColor {
    Green,
    Cyan,
    Red,
}

fn file_message(color: MsgColor, left: &str, right: &Path) {
    let right = format!("target {}", right.display());
    message(color, left, &right);
}

/// Status lines go to stderr, leaving stdout to the program.
fn message(color: MsgColor, left: &str, right: &str) {
    let left = match color {
        MsgColor::Green => left.green(),
        MsgColor::Cyan => left.cyan(),
        MsgColor::Red => left.red(),
    };
    eprintln!("{left:>12} {right}");
}
