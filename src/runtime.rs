use std::io::Write;

use log::{debug, info, trace, warn};

use crate::console::Console;
use crate::error::RunError;
use crate::features::Features;
use crate::image::Image;
use crate::instr::{Instr, Opcode, TrapVector};
use crate::memory::Memory;
use crate::registers::Registers;

/// Printed by `IN` before waiting for a key.
pub const IN_PROMPT: &str = "Enter a character: ";
/// Printed on its own line by `HALT`.
pub const HALT_NOTICE: &str = "HALT";

/// Represents complete program state during runtime.
///
/// Memory and registers belong to this machine alone; independent machines share nothing.
pub struct RunState<C> {
    regs: Registers,
    mem: Memory,
    console: C,
    features: Features,
    /// Cleared by `HALT`, never set again.
    running: bool,
    /// Whether program output so far ends with a newline (or is empty).
    line_start: bool,
}

impl<C: Console> RunState<C> {
    pub fn new(console: C, features: Features) -> Self {
        Self::with_memory(Memory::default(), console, features)
    }

    pub fn with_memory(mem: Memory, console: C, features: Features) -> Self {
        RunState {
            regs: Registers::new(),
            mem,
            console,
            features,
            running: true,
            line_start: true,
        }
    }

    /// Copy an image into memory at its origin. Execution still starts at the fixed entry point.
    pub fn load_image(&mut self, image: &Image) -> usize {
        let copied = self.mem.load(image.origin(), image.words());
        if copied < image.words().len() {
            warn!(
                "image at 0x{:04x} overruns memory, dropped {} words",
                image.origin(),
                image.words().len() - copied
            );
        }
        info!("loaded {copied} words at 0x{:04x}", image.origin());
        copied
    }

    /// Run until `HALT`.
    pub fn run(&mut self) -> Result<(), RunError> {
        while self.running {
            self.step()?;
        }
        Ok(())
    }

    /// Fetch, decode and execute one instruction. Does nothing once halted.
    pub fn step(&mut self) -> Result<(), RunError> {
        if !self.running {
            return Ok(());
        }
        if self.console.interrupted() {
            return Err(RunError::Interrupted);
        }
        let addr = self.regs.pc();
        let instr = Instr(self.read(addr)?);
        // PC incremented before instruction is performed
        self.regs.set_pc(addr.wrapping_add(1));
        trace!("0x{addr:04x}: {instr}");

        match instr.opcode() {
            Opcode::BR => self.br(instr),
            Opcode::ADD => self.add(instr),
            Opcode::LD => self.ld(instr)?,
            Opcode::ST => self.st(instr),
            Opcode::JSR => self.jsr(instr),
            Opcode::AND => self.and(instr),
            Opcode::LDR => self.ldr(instr)?,
            Opcode::STR => self.str(instr),
            Opcode::NOT => self.not(instr),
            Opcode::LDI => self.ldi(instr)?,
            Opcode::STI => self.sti(instr)?,
            Opcode::JMP => self.jmp(instr),
            Opcode::LEA => self.lea(instr),
            Opcode::TRAP => self.trap(instr, addr)?,
            opcode @ (Opcode::RTI | Opcode::RES) => {
                return Err(RunError::IllegalOpcode { opcode, addr });
            }
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn regs(&self) -> &Registers {
        &self.regs
    }

    pub fn regs_mut(&mut self) -> &mut Registers {
        &mut self.regs
    }

    pub fn memory(&self) -> &Memory {
        &self.mem
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.mem
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    pub fn console_mut(&mut self) -> &mut C {
        &mut self.console
    }

    pub fn into_console(self) -> C {
        self.console
    }

    pub fn features(&self) -> Features {
        self.features
    }

    #[inline]
    fn read(&mut self, addr: u16) -> Result<u16, RunError> {
        self.mem.read(addr, &mut self.console)
    }

    /// Write `val` into DR and set the condition code from it.
    #[inline]
    fn set_dest(&mut self, dr: u16, val: u16) {
        self.regs.set_reg(dr, val);
        self.regs.update_flags(dr);
    }

    #[inline]
    fn pc_relative(&self, offset: u16) -> u16 {
        self.regs.pc().wrapping_add(offset)
    }

    fn alu_operand(&self, instr: Instr) -> u16 {
        if instr.is_imm() {
            instr.imm5()
        } else {
            self.regs.reg(instr.sr2())
        }
    }

    fn add(&mut self, instr: Instr) {
        let res = self
            .regs
            .reg(instr.sr1())
            .wrapping_add(self.alu_operand(instr));
        self.set_dest(instr.dr(), res);
    }

    fn and(&mut self, instr: Instr) {
        let res = self.regs.reg(instr.sr1()) & self.alu_operand(instr);
        self.set_dest(instr.dr(), res);
    }

    fn not(&mut self, instr: Instr) {
        let res = !self.regs.reg(instr.sr1());
        self.set_dest(instr.dr(), res);
    }

    fn br(&mut self, instr: Instr) {
        if instr.nzp() & self.regs.flag().bits() != 0 {
            self.regs.set_pc(self.pc_relative(instr.pc_offset9()));
        }
    }

    fn jmp(&mut self, instr: Instr) {
        self.regs.set_pc(self.regs.reg(instr.sr1()));
    }

    fn jsr(&mut self, instr: Instr) {
        // Saved before the base register is read, so `JSRR R7` does not move
        self.regs.set_reg(7, self.regs.pc());
        let target = if instr.is_long() {
            self.pc_relative(instr.pc_offset11())
        } else {
            self.regs.reg(instr.sr1())
        };
        self.regs.set_pc(target);
    }

    fn ld(&mut self, instr: Instr) -> Result<(), RunError> {
        let val = self.read(self.pc_relative(instr.pc_offset9()))?;
        self.set_dest(instr.dr(), val);
        Ok(())
    }

    fn ldi(&mut self, instr: Instr) -> Result<(), RunError> {
        let ptr = self.read(self.pc_relative(instr.pc_offset9()))?;
        let val = self.read(ptr)?;
        self.set_dest(instr.dr(), val);
        Ok(())
    }

    fn ldr(&mut self, instr: Instr) -> Result<(), RunError> {
        let addr = self.regs.reg(instr.sr1()).wrapping_add(instr.offset6());
        let mut val = self.read(addr)?;
        if !self.features.canonical_ldr {
            // The word at BaseR+offset6 is used as a second address
            val = self.read(val)?;
        }
        self.set_dest(instr.dr(), val);
        Ok(())
    }

    fn lea(&mut self, instr: Instr) {
        let val = self.pc_relative(instr.pc_offset9());
        self.set_dest(instr.dr(), val);
    }

    fn st(&mut self, instr: Instr) {
        let val = self.regs.reg(instr.dr());
        self.mem.write(self.pc_relative(instr.pc_offset9()), val);
    }

    fn sti(&mut self, instr: Instr) -> Result<(), RunError> {
        let val = self.regs.reg(instr.dr());
        let ptr = self.read(self.pc_relative(instr.pc_offset9()))?;
        self.mem.write(ptr, val);
        Ok(())
    }

    fn str(&mut self, instr: Instr) {
        let val = self.regs.reg(instr.dr());
        let addr = self.regs.reg(instr.sr1()).wrapping_add(instr.offset6());
        self.mem.write(addr, val);
    }

    fn trap(&mut self, instr: Instr, addr: u16) -> Result<(), RunError> {
        self.regs.set_reg(7, self.regs.pc());

        let vector = match TrapVector::try_from(instr.trap_vector()) {
            Ok(vector) => vector,
            Err(vector) if self.features.strict_traps => {
                return Err(RunError::UnknownTrap { vector, addr });
            }
            Err(vector) => {
                warn!("ignoring unknown trap vector 0x{vector:02x} at 0x{addr:04x}");
                return Ok(());
            }
        };
        debug!("trap {vector:?} at 0x{addr:04x}");

        match vector {
            TrapVector::Getc => {
                let ch = self.console.read_key()?;
                self.set_dest(0, ch as u16);
            }
            TrapVector::Out => {
                let ch = (self.regs.reg(0) & 0xFF) as u8;
                self.emit(&[ch])?;
            }
            TrapVector::Puts => {
                let bytes: Vec<u8> = self
                    .mem
                    .string_at(self.regs.reg(0))
                    .map(|word| (word & 0xFF) as u8)
                    .collect();
                self.emit(&bytes)?;
            }
            TrapVector::In => {
                self.emit(IN_PROMPT.as_bytes())?;
                let ch = self.console.read_key()?;
                self.emit(&[ch])?;
                self.set_dest(0, ch as u16);
            }
            TrapVector::Putsp => {
                let mut bytes = Vec::new();
                for word in self.mem.string_at(self.regs.reg(0)) {
                    bytes.push((word & 0xFF) as u8);
                    let high = (word >> 8) as u8;
                    if high != 0 {
                        bytes.push(high);
                    }
                }
                self.emit(&bytes)?;
            }
            TrapVector::Halt => {
                if !self.line_start {
                    self.emit(b"\n")?;
                }
                self.emit(HALT_NOTICE.as_bytes())?;
                self.emit(b"\n")?;
                self.running = false;
            }
        }
        Ok(())
    }

    /// Write program output and flush it straight away.
    fn emit(&mut self, bytes: &[u8]) -> Result<(), RunError> {
        self.console.write_all(bytes)?;
        self.console.flush()?;
        if let Some(last) = bytes.last() {
            self.line_start = *last == b'\n';
        }
        Ok(())
    }
}
