use std::fmt;

use crate::engine::Fault;
use crate::instr::Instruction;
use crate::machine::Machine;
use crate::word::Word;

use super::Operation;

/// STR: mem[BASE + sext(OFFSET6)] <- SR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Str {
    sr: usize,
    base: usize,
    offset: Word,
}

impl Operation for Str {
    fn decode(ir: Instruction) -> Self {
        // LAYOUT: 0111 | SR | BaseR | offset6
        Self {
            sr: ir.sr(),
            base: ir.base_r(),
            offset: ir.offset6(),
        }
    }

    fn evaluate_address(&mut self, machine: &mut Machine) {
        machine.mem.mar = machine.reg[self.base].wrapping_add(self.offset);
    }

    fn execute(&mut self, machine: &mut Machine) -> Result<(), Fault> {
        machine.mem.mdr = machine.reg[self.sr];
        Ok(())
    }

    fn store_result(&mut self, machine: &mut Machine) -> Result<(), Fault> {
        machine.mem.store()?;
        Ok(())
    }
}

impl fmt::Display for Str {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "STR R{}, R{}, #{}",
            self.sr,
            self.base,
            self.offset.get() as i16
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::testing::step_one;

    #[test]
    fn test_store_base_plus_offset() {
        let mut machine = Machine::new();
        machine.reg[1] = Word::new(0xBEEF);
        machine.reg[2] = Word::new(0x4000);
        // STR R1, R2, #5
        step_one(&mut machine, 0x3000, 0b0111_001_010_000101).expect("step");
        assert_eq!(
            machine
                .mem
                .load_direct(Word::new(0x4005))
                .expect("load")
                .get(),
            0xBEEF
        );
    }

    #[test]
    fn test_store_to_display_data_register() {
        let mut machine = Machine::new();
        let rx = machine.display().subscribe_channel();
        machine.reg[0] = Word::from(b'A');
        machine.reg[2] = Word::new(crate::DDR_ADDR);
        // STR R0, R2, #0 writes straight at the display
        step_one(&mut machine, 0x3000, 0b0111_000_010_000000).expect("step");
        let seen = rx
            .recv_timeout(std::time::Duration::from_secs(1))
            .expect("listener");
        assert_eq!(seen.get(), u16::from(b'A'));
    }

    #[test]
    fn test_display() {
        let op = Str::decode(Instruction::new(Word::new(0b0111_001_010_111011)));
        assert_eq!(format!("{op}"), "STR R1, R2, #-5");
    }
}
