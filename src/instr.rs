use std::fmt;

/// Replicate bit `bits - 1` of `val` into every higher bit.
#[inline]
pub fn sign_extend(val: u16, bits: u32) -> u16 {
    debug_assert!(bits > 0 && bits < 16);
    // Sign bit
    let sign = val & (1u16 << (bits - 1));
    // Bits lower than sign bit
    let magnitude = val & ((1u16 << bits) - 1);
    // Positive input: all bits unset; 0x0000
    // Negative input: sign bit and above will be set, lower bits will be reset
    //      Eg. bits=14 -> 0xE000
    let sign_extension = (!sign).wrapping_add(1); // sign * -1
    magnitude | sign_extension
}

/// The 16 values of the opcode field, in encoding order.
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Opcode {
    BR,
    ADD,
    LD,
    ST,
    JSR,
    AND,
    LDR,
    STR,
    RTI,
    NOT,
    LDI,
    STI,
    JMP,
    RES,
    LEA,
    TRAP,
}

impl Opcode {
    const TABLE: [Opcode; 16] = [
        Opcode::BR,   // 0x0
        Opcode::ADD,  // 0x1
        Opcode::LD,   // 0x2
        Opcode::ST,   // 0x3
        Opcode::JSR,  // 0x4
        Opcode::AND,  // 0x5
        Opcode::LDR,  // 0x6
        Opcode::STR,  // 0x7
        Opcode::RTI,  // 0x8
        Opcode::NOT,  // 0x9
        Opcode::LDI,  // 0xA
        Opcode::STI,  // 0xB
        Opcode::JMP,  // 0xC
        Opcode::RES,  // 0xD
        Opcode::LEA,  // 0xE
        Opcode::TRAP, // 0xF
    ];

    /// Every 4-bit value names an opcode, so this never fails.
    #[inline]
    pub fn from_nibble(nibble: u16) -> Self {
        Self::TABLE[(nibble & 0xF) as usize]
    }
}

/// Service routines reachable through `TRAP`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrapVector {
    /// Read a character without echo
    Getc = 0x20,
    /// Write a character
    Out = 0x21,
    /// Write a string of one character per word
    Puts = 0x22,
    /// Prompt for a character and echo it
    In = 0x23,
    /// Write a string of two characters per word
    Putsp = 0x24,
    /// Stop the machine
    Halt = 0x25,
}

impl TryFrom<u8> for TrapVector {
    type Error = u8;
    fn try_from(vector: u8) -> Result<Self, Self::Error> {
        Ok(match vector {
            0x20 => TrapVector::Getc,
            0x21 => TrapVector::Out,
            0x22 => TrapVector::Puts,
            0x23 => TrapVector::In,
            0x24 => TrapVector::Putsp,
            0x25 => TrapVector::Halt,
            _ => return Err(vector),
        })
    }
}

/// A word read at the program counter, decoded lazily field by field.
///
/// Which accessors are meaningful depends on [`Instr::opcode`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Instr(pub u16);

impl Instr {
    #[inline]
    pub fn opcode(self) -> Opcode {
        Opcode::from_nibble(self.0 >> 12)
    }

    /// Bits 11-9: DR, or SR for stores.
    #[inline]
    pub fn dr(self) -> u16 {
        (self.0 >> 9) & 0b111
    }

    /// Bits 8-6: SR1 or BaseR.
    #[inline]
    pub fn sr1(self) -> u16 {
        (self.0 >> 6) & 0b111
    }

    /// Bits 2-0.
    #[inline]
    pub fn sr2(self) -> u16 {
        self.0 & 0b111
    }

    /// Bits 11-9 of a `BR`.
    #[inline]
    pub fn nzp(self) -> u16 {
        (self.0 >> 9) & 0b111
    }

    /// Bit 5 of `ADD`/`AND`.
    #[inline]
    pub fn is_imm(self) -> bool {
        self.0 & 0b10_0000 != 0
    }

    /// Bit 11 of `JSR`.
    #[inline]
    pub fn is_long(self) -> bool {
        self.0 & 0x0800 != 0
    }

    #[inline]
    pub fn imm5(self) -> u16 {
        sign_extend(self.0, 5)
    }

    #[inline]
    pub fn offset6(self) -> u16 {
        sign_extend(self.0, 6)
    }

    #[inline]
    pub fn pc_offset9(self) -> u16 {
        sign_extend(self.0, 9)
    }

    #[inline]
    pub fn pc_offset11(self) -> u16 {
        sign_extend(self.0, 11)
    }

    #[inline]
    pub fn trap_vector(self) -> u8 {
        (self.0 & 0xFF) as u8
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let i = *self;
        let second = |f: &mut fmt::Formatter<'_>| {
            if i.is_imm() {
                write!(f, "#{}", i.imm5() as i16)
            } else {
                write!(f, "R{}", i.sr2())
            }
        };
        match i.opcode() {
            Opcode::ADD => {
                write!(f, "ADD R{}, R{}, ", i.dr(), i.sr1())?;
                second(f)
            }
            Opcode::AND => {
                write!(f, "AND R{}, R{}, ", i.dr(), i.sr1())?;
                second(f)
            }
            Opcode::NOT => write!(f, "NOT R{}, R{}", i.dr(), i.sr1()),
            Opcode::BR => {
                write!(f, "BR")?;
                for (bit, ch) in [(0b100, 'n'), (0b010, 'z'), (0b001, 'p')] {
                    if i.nzp() & bit != 0 {
                        write!(f, "{ch}")?;
                    }
                }
                write!(f, " #{}", i.pc_offset9() as i16)
            }
            Opcode::JMP if i.sr1() == 7 => write!(f, "RET"),
            Opcode::JMP => write!(f, "JMP R{}", i.sr1()),
            Opcode::JSR if i.is_long() => write!(f, "JSR #{}", i.pc_offset11() as i16),
            Opcode::JSR => write!(f, "JSRR R{}", i.sr1()),
            Opcode::LD => write!(f, "LD R{}, #{}", i.dr(), i.pc_offset9() as i16),
            Opcode::LDI => write!(f, "LDI R{}, #{}", i.dr(), i.pc_offset9() as i16),
            Opcode::LDR => write!(
                f,
                "LDR R{}, R{}, #{}",
                i.dr(),
                i.sr1(),
                i.offset6() as i16
            ),
            Opcode::LEA => write!(f, "LEA R{}, #{}", i.dr(), i.pc_offset9() as i16),
            Opcode::ST => write!(f, "ST R{}, #{}", i.dr(), i.pc_offset9() as i16),
            Opcode::STI => write!(f, "STI R{}, #{}", i.dr(), i.pc_offset9() as i16),
            Opcode::STR => write!(
                f,
                "STR R{}, R{}, #{}",
                i.dr(),
                i.sr1(),
                i.offset6() as i16
            ),
            Opcode::TRAP => match TrapVector::try_from(i.trap_vector()) {
                Ok(vector) => write!(f, "{}", format!("{vector:?}").to_uppercase()),
                Err(vector) => write!(f, "TRAP x{vector:02X}"),
            },
            Opcode::RTI => write!(f, "RTI"),
            Opcode::RES => write!(f, "RES"),
        }
    }
}
