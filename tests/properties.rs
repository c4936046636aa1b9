use lc3vm::instr::sign_extend;
use lc3vm::{BufferConsole, Features, Image, RunFlag, RunState, PC_START};
use proptest::prelude::*;

fn machine(words: &[u16]) -> RunState<BufferConsole> {
    let mut state = RunState::new(BufferConsole::new(), Features::default());
    state.load_image(&Image::new(PC_START, words.to_vec()));
    state
}

fn expected_flag(val: u16) -> RunFlag {
    if val == 0 {
        RunFlag::Z
    } else if (val as i16) < 0 {
        RunFlag::N
    } else {
        RunFlag::P
    }
}

proptest! {
    #[test]
    fn add_immediate_sign_extends(dr in 0u16..8, sr in 0u16..8, imm in 0u16..32, val: u16) {
        let instr = 0x1000 | dr << 9 | sr << 6 | 0b10_0000 | imm;
        let mut state = machine(&[instr]);
        state.regs_mut().set_reg(sr, val);
        state.step().unwrap();

        let signed = if imm & 0x10 != 0 { imm as i16 - 32 } else { imm as i16 };
        let expected = val.wrapping_add(signed as u16);
        prop_assert_eq!(state.regs().reg(dr), expected);
        prop_assert_eq!(state.regs().flag(), expected_flag(expected));
    }

    #[test]
    fn sign_extend_matches_signed_shift(val: u16, bits in 1u32..16) {
        let shift = 16 - bits;
        let expected = ((val << shift) as i16 >> shift) as u16;
        prop_assert_eq!(sign_extend(val, bits), expected);
    }

    #[test]
    fn flags_follow_destination(op in 0usize..4, dr in 0u16..8, val: u16, other: u16) {
        // ADD reg, AND reg, NOT, LEA
        let instr = [
            0x1000 | dr << 9 | 1 << 6 | 2,
            0x5000 | dr << 9 | 1 << 6 | 2,
            0x903f | dr << 9 | 1 << 6,
            0xe000 | dr << 9 | (val & 0x1ff),
        ][op];
        let mut state = machine(&[instr]);
        state.regs_mut().set_reg(1, val);
        state.regs_mut().set_reg(2, other);
        state.step().unwrap();

        let written = state.regs().reg(dr);
        prop_assert_eq!(state.regs().flag(), expected_flag(written));
    }

    #[test]
    fn ldi_reads_twice(offset in 1u16..0x100, ptr in 0x4000u16..0xfe00, val: u16) {
        let mut words = vec![0u16; offset as usize + 1];
        words[0] = 0xa000 | 1 << 9 | offset;
        words[offset as usize] = ptr;
        let mut state = machine(&words);
        state.memory_mut().write(ptr, val);
        state.step().unwrap();

        prop_assert_eq!(state.regs().reg(1), val);
        prop_assert_eq!(state.regs().flag(), expected_flag(val));
    }

    #[test]
    fn jsr_saves_incremented_pc(long: bool, offset in 0u16..0x800, base in 0u16..7, target: u16) {
        let instr = if long { 0x4800 | offset } else { 0x4000 | base << 6 };
        let mut state = machine(&[instr]);
        state.regs_mut().set_reg(base, target);
        state.step().unwrap();

        prop_assert_eq!(state.regs().reg(7), PC_START + 1);
        let expected_pc = if long {
            (PC_START + 1).wrapping_add(sign_extend(offset, 11))
        } else {
            target
        };
        prop_assert_eq!(state.regs().pc(), expected_pc);
    }

    #[test]
    fn image_words_land_at_origin(words in proptest::collection::vec(any::<u16>(), 0..64)) {
        let mut bytes = vec![0x30, 0x00];
        for word in &words {
            bytes.extend(word.to_be_bytes());
        }
        let path = std::env::temp_dir().join(format!("lc3vm-image-{}.obj", std::process::id()));
        std::fs::write(&path, &bytes).unwrap();
        let image = Image::read(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        prop_assert_eq!(image.origin(), 0x3000);

        let mut state = RunState::new(BufferConsole::new(), Features::default());
        state.load_image(&image);
        for (i, word) in words.iter().enumerate() {
            prop_assert_eq!(state.memory().peek(0x3000 + i as u16), *word);
        }
        prop_assert_eq!(image.to_bytes(), bytes);
    }
}
