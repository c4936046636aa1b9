use std::fmt;

/// Address where execution starts, regardless of image origin.
pub const PC_START: u16 = 0x3000;

/// Condition code, set using the result of the last register write.
///
/// Discriminants match the `nzp` field of a `BR` instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunFlag {
    N = 0b100,
    Z = 0b010,
    P = 0b001,
}

impl RunFlag {
    pub fn from_value(val: u16) -> Self {
        if val == 0 {
            RunFlag::Z
        } else if val >> 15 != 0 {
            RunFlag::N
        } else {
            RunFlag::P
        }
    }

    pub fn bits(self) -> u16 {
        self as u16
    }
}

impl fmt::Display for RunFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ch = match self {
            RunFlag::N => 'n',
            RunFlag::Z => 'z',
            RunFlag::P => 'p',
        };
        write!(f, "{ch}")
    }
}

/// General purpose registers, program counter and condition code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Registers {
    /// 8x 16-bit registers
    reg: [u16; 8],
    /// Program counter
    pc: u16,
    /// Condition code
    flag: RunFlag,
}

impl Default for Registers {
    fn default() -> Self {
        Self {
            reg: [0; 8],
            pc: PC_START,
            flag: RunFlag::Z,
        }
    }
}

impl Registers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index is masked to 3 bits, matching every register field of an instruction.
    #[inline]
    pub fn reg(&self, index: u16) -> u16 {
        self.reg[(index & 0b111) as usize]
    }

    /// Does not touch the condition code. See [`Registers::update_flags`].
    #[inline]
    pub fn set_reg(&mut self, index: u16, val: u16) {
        self.reg[(index & 0b111) as usize] = val;
    }

    #[inline]
    pub fn pc(&self) -> u16 {
        self.pc
    }

    #[inline]
    pub fn set_pc(&mut self, pc: u16) {
        self.pc = pc;
    }

    #[inline]
    pub fn flag(&self) -> RunFlag {
        self.flag
    }

    #[inline]
    pub fn set_flag(&mut self, flag: RunFlag) {
        self.flag = flag;
    }

    /// Set condition code from the value now held in register `index`.
    #[inline]
    pub fn update_flags(&mut self, index: u16) {
        self.flag = RunFlag::from_value(self.reg(index));
    }

    pub fn all(&self) -> &[u16; 8] {
        &self.reg
    }
}
