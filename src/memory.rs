use std::time::Duration;

use crate::console::Keyboard;
use crate::error::RunError;

/// LC3 can address 128KB of memory.
pub const MEMORY_MAX: usize = 0x10000;

/// Keyboard status register. Bit 15 is set when a key is ready.
pub const KBSR: u16 = 0xFE00;
/// Keyboard data register. Low byte holds the last key read.
pub const KBDR: u16 = 0xFE02;

pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(1000);

/// Flat word-addressed memory with the keyboard registers mapped in.
pub struct Memory {
    /// System memory - 128KB in size.
    mem: Box<[u16; MEMORY_MAX]>,
    /// How long a read of [`KBSR`] waits for a key.
    poll_timeout: Duration,
}

impl Default for Memory {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_TIMEOUT)
    }
}

impl Memory {
    pub fn new(poll_timeout: Duration) -> Self {
        let mem: Box<[u16; MEMORY_MAX]> = vec![0u16; MEMORY_MAX]
            .into_boxed_slice()
            .try_into()
            .unwrap_or_else(|_| unreachable!("vector has exactly MEMORY_MAX words"));
        Memory { mem, poll_timeout }
    }

    /// Read a word, refreshing the keyboard registers first when [`KBSR`] is read.
    pub fn read<K>(&mut self, addr: u16, keyboard: &mut K) -> Result<u16, RunError>
    where
        K: Keyboard + ?Sized,
    {
        if addr == KBSR {
            match keyboard.poll_key(self.poll_timeout)? {
                Some(key) => {
                    self.write(KBSR, 1 << 15);
                    self.write(KBDR, key as u16);
                }
                None => self.write(KBSR, 0),
            }
        }
        Ok(self.peek(addr))
    }

    /// Read a word without touching any device.
    #[inline]
    pub fn peek(&self, addr: u16) -> u16 {
        self.mem[addr as usize]
    }

    #[inline]
    pub fn write(&mut self, addr: u16, val: u16) {
        self.mem[addr as usize] = val;
    }

    /// Copy `words` in starting at `origin`, dropping whatever would run past the end.
    ///
    /// Returns how many words were copied.
    pub fn load(&mut self, origin: u16, words: &[u16]) -> usize {
        let origin = origin as usize;
        let count = words.len().min(MEMORY_MAX - origin);
        self.mem[origin..origin + count].copy_from_slice(&words[..count]);
        count
    }

    /// Iterate words from `addr` up to (not including) the first zero word.
    ///
    /// Stops at the end of memory rather than wrapping.
    pub fn string_at(&self, addr: u16) -> impl Iterator<Item = u16> + '_ {
        self.mem[addr as usize..]
            .iter()
            .copied()
            .take_while(|word| *word != 0)
    }
}
