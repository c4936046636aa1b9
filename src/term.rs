//! Consoles attached to the process's standard streams.

use std::io::{self, IsTerminal as _, Read as _, Stdout, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyEvent},
    terminal,
};
use log::debug;

use crate::console::Keyboard;
use crate::error::RunError;

/// Similar to [`crossterm::event::KeyCode`] but only contains what the machine can receive.
#[derive(Debug, PartialEq, Eq)]
pub enum Key {
    /// A single ASCII byte, including control characters.
    Byte(u8),
    /// Any other character, delivered as UTF-8 bytes.
    Char(char),
    /// `Ctrl+C`
    Interrupt,
}

/// Keeps the terminal in raw mode for as long as it is alive.
///
/// Restores the previous mode when dropped.
pub struct RawMode {
    was_raw: bool,
}

impl RawMode {
    pub fn enable() -> io::Result<Self> {
        let was_raw = terminal::is_raw_mode_enabled()?;
        if !was_raw {
            terminal::enable_raw_mode()?;
        }
        Ok(RawMode { was_raw })
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        if !self.was_raw {
            // Nothing useful to do with a failure on the way out
            let _ = terminal::disable_raw_mode();
        }
    }
}

/// Bytes arriving from a background reader thread.
///
/// The thread owns the blocking read, so polling can give up after a timeout.
pub struct Input {
    rx: Receiver<u8>,
    interrupted: Arc<AtomicBool>,
}

impl Input {
    /// Run `feed` on its own thread. It sends bytes until input ends or the receiver is gone,
    /// and raises the flag if the user asked to stop.
    pub fn spawn<F>(name: &str, feed: F) -> io::Result<Self>
    where
        F: FnOnce(Sender<u8>, &AtomicBool) + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let interrupted = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&interrupted);
        thread::Builder::new()
            .name(name.to_string())
            .spawn(move || feed(tx, &flag))?;
        Ok(Input { rx, interrupted })
    }

    fn closed(&self) -> RunError {
        if self.interrupted() {
            RunError::Interrupted
        } else {
            RunError::InputClosed
        }
    }
}

impl Keyboard for Input {
    fn poll_key(&mut self, timeout: Duration) -> Result<Option<u8>, RunError> {
        if self.interrupted() {
            return Err(RunError::Interrupted);
        }
        match self.rx.recv_timeout(timeout) {
            Ok(byte) => Ok(Some(byte)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) if self.interrupted() => {
                Err(RunError::Interrupted)
            }
            // Input has ended for good; keep reporting "no key"
            Err(RecvTimeoutError::Disconnected) => Ok(None),
        }
    }

    fn read_key(&mut self) -> Result<u8, RunError> {
        self.rx.recv().map_err(|_| self.closed())
    }

    fn interrupted(&self) -> bool {
        self.interrupted.load(Ordering::Relaxed)
    }
}

/// Either an interactive terminal or whatever was piped into stdin.
pub enum Stdio {
    Terminal(Terminal),
    Piped(Piped),
}

impl Stdio {
    /// Pick the console matching how stdin is connected.
    ///
    /// A terminal is switched to raw mode until the returned value is dropped.
    pub fn detect() -> io::Result<Self> {
        if io::stdin().is_terminal() {
            Ok(Stdio::Terminal(Terminal::new()?))
        } else {
            Ok(Stdio::Piped(Piped::new()?))
        }
    }
}

impl Keyboard for Stdio {
    fn poll_key(&mut self, timeout: Duration) -> Result<Option<u8>, RunError> {
        match self {
            Stdio::Terminal(term) => term.input.poll_key(timeout),
            Stdio::Piped(piped) => piped.input.poll_key(timeout),
        }
    }

    fn read_key(&mut self) -> Result<u8, RunError> {
        match self {
            Stdio::Terminal(term) => term.input.read_key(),
            Stdio::Piped(piped) => piped.input.read_key(),
        }
    }

    fn interrupted(&self) -> bool {
        match self {
            Stdio::Terminal(term) => term.input.interrupted(),
            Stdio::Piped(piped) => piped.input.interrupted(),
        }
    }
}

impl Write for Stdio {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Stdio::Terminal(term) => term.stdout.write(buf),
            Stdio::Piped(piped) => piped.stdout.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Stdio::Terminal(term) => term.stdout.flush(),
            Stdio::Piped(piped) => piped.stdout.flush(),
        }
    }
}

/// Interactive terminal, held in raw mode for its whole lifetime.
///
/// Keys are never echoed by the terminal. `Ctrl+C` raises the interrupt flag.
pub struct Terminal {
    input: Input,
    stdout: CrLf<Stdout>,
    // Dropped last, after the reader has nothing left to do
    _raw: RawMode,
}

impl Terminal {
    pub fn new() -> io::Result<Self> {
        let raw = RawMode::enable()?;
        let input = Input::spawn("terminal-input", read_terminal)?;
        Ok(Terminal {
            input,
            stdout: CrLf(io::stdout()),
            _raw: raw,
        })
    }
}

fn read_terminal(tx: Sender<u8>, interrupted: &AtomicBool) {
    loop {
        let event = match event::read() {
            Ok(event) => event,
            Err(err) => {
                debug!("terminal input ended: {err}");
                return;
            }
        };
        let mut buf = [0u8; 4];
        let bytes: &[u8] = match Key::try_from(event) {
            Ok(Key::Interrupt) => {
                interrupted.store(true, Ordering::Relaxed);
                return;
            }
            Ok(Key::Byte(byte)) => {
                buf[0] = byte;
                &buf[..1]
            }
            Ok(Key::Char(ch)) => ch.encode_utf8(&mut buf).as_bytes(),
            Err(()) => continue,
        };
        for byte in bytes {
            if tx.send(*byte).is_err() {
                return;
            }
        }
    }
}

/// Non-interactive stdin.
pub struct Piped {
    input: Input,
    stdout: Stdout,
}

impl Piped {
    pub fn new() -> io::Result<Self> {
        let input = Input::spawn("stdin-input", read_stdin)?;
        Ok(Piped {
            input,
            stdout: io::stdout(),
        })
    }
}

fn read_stdin(tx: Sender<u8>, _interrupted: &AtomicBool) {
    for byte in io::stdin().lock().bytes() {
        let Ok(byte) = byte else {
            return;
        };
        if tx.send(byte).is_err() {
            return;
        }
    }
}

/// Writes `\n` as `\r\n`, since raw mode also turns off output processing.
pub struct CrLf<W>(pub W);

impl<W: Write> Write for CrLf<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match buf.iter().position(|byte| *byte == b'\n') {
            Some(0) => {
                self.0.write_all(b"\r\n")?;
                Ok(1)
            }
            Some(end) => self.0.write(&buf[..end]),
            None => self.0.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl TryFrom<Event> for Key {
    type Error = ();
    fn try_from(event: Event) -> Result<Self, Self::Error> {
        if let Event::Key(event) = event {
            if let Ok(key) = event.try_into() {
                return Ok(key);
            }
        }
        Err(())
    }
}

impl TryFrom<KeyEvent> for Key {
    type Error = ();
    fn try_from(event: KeyEvent) -> Result<Self, Self::Error> {
        use event::{KeyCode, KeyEventKind, KeyModifiers as Mod};

        if matches!(event.kind, KeyEventKind::Release) {
            return Err(());
        }

        let key = match (event.modifiers, event.code) {
            // Ctrl+C
            (Mod::CONTROL, KeyCode::Char('c')) => Key::Interrupt,

            (_, KeyCode::Enter) | (_, KeyCode::Char('\n')) => Key::Byte(b'\n'),
            (_, KeyCode::Backspace) => Key::Byte(0x08),
            (_, KeyCode::Tab) => Key::Byte(b'\t'),
            (_, KeyCode::Esc) => Key::Byte(0x1b),
            (_, KeyCode::Delete) => Key::Byte(0x7f),

            // Other control characters
            (Mod::CONTROL, KeyCode::Char(ch)) if ch.is_ascii_alphabetic() => {
                Key::Byte(ch.to_ascii_lowercase() as u8 & 0x1f)
            }

            // Normal character
            (Mod::NONE | Mod::SHIFT, KeyCode::Char(ch)) if ch.is_ascii() => Key::Byte(ch as u8),
            (Mod::NONE | Mod::SHIFT, KeyCode::Char(ch)) => Key::Char(ch),

            _ => return Err(()),
        };

        Ok(key)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crossterm::event::{KeyCode, KeyModifiers};
    use std::time::Instant;

    fn press(code: KeyCode, modifiers: KeyModifiers) -> Result<Key, ()> {
        KeyEvent::new(code, modifiers).try_into()
    }

    #[test]
    fn maps_keys_to_bytes() {
        assert_eq!(press(KeyCode::Char('a'), KeyModifiers::NONE), Ok(Key::Byte(b'a')));
        assert_eq!(press(KeyCode::Char('A'), KeyModifiers::SHIFT), Ok(Key::Byte(b'A')));
        assert_eq!(press(KeyCode::Enter, KeyModifiers::NONE), Ok(Key::Byte(b'\n')));
        assert_eq!(press(KeyCode::Backspace, KeyModifiers::NONE), Ok(Key::Byte(0x08)));
        assert_eq!(press(KeyCode::Char('d'), KeyModifiers::CONTROL), Ok(Key::Byte(0x04)));
        assert_eq!(press(KeyCode::Char('é'), KeyModifiers::NONE), Ok(Key::Char('é')));
    }

    #[test]
    fn ctrl_c_interrupts() {
        assert_eq!(press(KeyCode::Char('c'), KeyModifiers::CONTROL), Ok(Key::Interrupt));
    }

    #[test]
    fn ignores_navigation() {
        assert_eq!(press(KeyCode::Left, KeyModifiers::NONE), Err(()));
        assert_eq!(press(KeyCode::F(1), KeyModifiers::NONE), Err(()));
    }

    #[test]
    fn poll_gives_up_on_idle_input() {
        // Sender stays alive without ever sending
        let mut input = Input::spawn("idle", |tx, _| {
            thread::sleep(Duration::from_secs(5));
            drop(tx);
        })
        .unwrap();
        let start = Instant::now();
        assert_eq!(input.poll_key(Duration::from_millis(50)).unwrap(), None);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn ended_input() {
        let mut input = Input::spawn("ended", |tx, _| {
            tx.send(b'x').unwrap();
        })
        .unwrap();
        assert_eq!(input.read_key().unwrap(), b'x');
        assert_eq!(input.poll_key(Duration::from_millis(50)).unwrap(), None);
        assert!(matches!(input.read_key(), Err(RunError::InputClosed)));
        assert!(!input.interrupted());
    }

    #[test]
    fn interrupt_ends_reads() {
        let mut input = Input::spawn("interrupted", |tx, interrupted| {
            tx.send(b'a').unwrap();
            interrupted.store(true, Ordering::Relaxed);
        })
        .unwrap();
        assert_eq!(input.read_key().unwrap(), b'a');
        assert!(matches!(input.read_key(), Err(RunError::Interrupted)));
        assert!(input.interrupted());
        assert!(matches!(
            input.poll_key(Duration::ZERO),
            Err(RunError::Interrupted)
        ));
    }

    #[test]
    fn crlf_translates_newlines() {
        let mut out = CrLf(Vec::new());
        out.write_all(b"ab\ncd\n\nHALT").unwrap();
        assert_eq!(out.0, b"ab\r\ncd\r\n\r\nHALT");
    }
}
