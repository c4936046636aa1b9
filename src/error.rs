use std::io;
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::instr::Opcode;

// Loader errors

#[derive(Debug, Error, Diagnostic)]
pub enum LoadError {
    #[error("Failed to load image {}", path.display())]
    #[diagnostic(
        code(load::io),
        help("check that the file exists and can be read")
    )]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Image {} has no origin word", path.display())]
    #[diagnostic(
        code(load::empty),
        help("an image starts with a big-endian origin address followed by program words")
    )]
    Empty { path: PathBuf },

    #[error("Image {} is not aligned to 16 bits ({len} bytes)", path.display())]
    #[diagnostic(
        code(load::unaligned),
        help("images are made of whole 16-bit words; the file may be truncated")
    )]
    Unaligned { path: PathBuf, len: usize },
}

// Runtime errors

#[derive(Debug, Error, Diagnostic)]
pub enum RunError {
    #[error("Executed reserved instruction {opcode:?} at 0x{addr:04x}")]
    #[diagnostic(
        code(run::illegal_opcode),
        help("RES and RTI are not defined for user programs")
    )]
    IllegalOpcode { opcode: Opcode, addr: u16 },

    #[error("You called a trap with an unknown vector of 0x{vector:02x} at 0x{addr:04x}")]
    #[diagnostic(
        code(run::unknown_trap),
        help("supported vectors are 0x20 to 0x25; drop the `strict-traps` feature to ignore others")
    )]
    UnknownTrap { vector: u8, addr: u16 },

    #[error("Interrupted by user")]
    #[diagnostic(code(run::interrupted))]
    Interrupted,

    #[error("Input closed while waiting for a character")]
    #[diagnostic(
        code(run::input_closed),
        help("the program asked for more input than was provided on stdin")
    )]
    InputClosed,

    #[error("Console I/O failed")]
    #[diagnostic(code(run::io))]
    Io(#[from] io::Error),
}
