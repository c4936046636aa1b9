//! Device interface between the machine and whatever provides its keyboard and display.

use std::collections::VecDeque;
use std::io::{self, Write};
use std::time::Duration;

use crate::error::RunError;

/// Source of key presses.
pub trait Keyboard {
    /// Wait at most `timeout` for a key, returning its code if one arrived.
    ///
    /// Used by the keyboard status register; must not block past `timeout`.
    fn poll_key(&mut self, timeout: Duration) -> Result<Option<u8>, RunError>;

    /// Block until a key is available. Nothing is echoed.
    fn read_key(&mut self) -> Result<u8, RunError>;

    /// Whether the user has asked to stop the machine.
    fn interrupted(&self) -> bool {
        false
    }
}

/// A keyboard plus a display to write program output to.
pub trait Console: Keyboard + Write {}

impl<T: Keyboard + Write> Console for T {}

/// Console backed by memory: scripted input, captured output.
///
/// Useful for embedding the machine or for driving it in tests.
#[derive(Debug, Default, Clone)]
pub struct BufferConsole {
    input: VecDeque<u8>,
    output: Vec<u8>,
}

impl BufferConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(input: impl AsRef<[u8]>) -> Self {
        Self {
            input: input.as_ref().iter().copied().collect(),
            output: Vec::new(),
        }
    }

    pub fn push_input(&mut self, input: impl AsRef<[u8]>) {
        self.input.extend(input.as_ref());
    }

    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Output decoded lossily, for assertions.
    pub fn output_str(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

impl Keyboard for BufferConsole {
    fn poll_key(&mut self, _timeout: Duration) -> Result<Option<u8>, RunError> {
        Ok(self.input.pop_front())
    }

    fn read_key(&mut self) -> Result<u8, RunError> {
        self.input.pop_front().ok_or(RunError::InputClosed)
    }
}

impl Write for BufferConsole {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.output.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
