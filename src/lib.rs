// Machine
mod registers;
pub use registers::{Registers, RunFlag, PC_START};
mod memory;
pub use memory::{Memory, DEFAULT_POLL_TIMEOUT, KBDR, KBSR, MEMORY_MAX};
pub mod instr;

// Running
mod runtime;
pub use runtime::{RunState, HALT_NOTICE, IN_PROMPT};
mod features;
pub use features::Features;

// Devices and loading
pub mod console;
pub use console::{BufferConsole, Console, Keyboard};
pub mod term;
mod image;
pub use image::Image;

mod error;
pub use error::{LoadError, RunError};

pub mod env;
