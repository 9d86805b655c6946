use std::fmt;

use crate::engine::Fault;
use crate::instr::Instruction;
use crate::machine::Machine;
use crate::word::Word;

use super::Operation;

/// ST: mem[PC + sext(OFFSET9)] <- SR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct St {
    sr: usize,
    offset: Word,
}

impl Operation for St {
    fn decode(ir: Instruction) -> Self {
        // LAYOUT: 0011 | SR | PCoffset9
        Self {
            sr: ir.sr(),
            offset: ir.offset9(),
        }
    }

    fn evaluate_address(&mut self, machine: &mut Machine) {
        machine.mem.mar = machine.pc.wrapping_add(self.offset);
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

impl fmt::Display for St {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ST R{}, #{}", self.sr, self.offset.get() as i16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::testing::step_one;

    #[test]
    fn test_store_relative_to_incremented_pc() {
        let mut machine = Machine::new();
        machine.reg[1] = Word::new(0xBEEF);
        // ST R1, #0: target is PC+1
        step_one(&mut machine, 0x3050, 0b0011_001_000000000).expect("step");
        assert_eq!(
            machine
                .mem
                .load_direct(Word::new(0x3051))
                .expect("load")
                .get(),
            0xBEEF
        );
    }

    #[test]
    fn test_store_does_not_settle_flags() {
        let mut machine = Machine::new();
        machine.psr().set_condition(crate::psr::Condition::Zero);
        machine.reg[1] = Word::new(0x8000);
        step_one(&mut machine, 0x3050, 0b0011_001_000000000).expect("step");
        assert_eq!(machine.psr().condition().get(), 0b010);
    }

    #[test]
    fn test_user_store_into_system_space_faults() {
        let mut machine = Machine::new();
        machine.reg[0] = Word::new(0x1234);
        // ST R0, #-256 from x3000 lands below user space
        let fault = step_one(&mut machine, 0x3000, 0b0011_000_100000000)
            .expect_err("store into system space");
        assert!(matches!(fault, Fault::Interrupt(_)));
        // The target word is untouched.
        assert_eq!(
            machine
                .mem
                .load_direct(Word::new(0x2F01))
                .expect("load")
                .get(),
            0
        );
    }

    #[test]
    fn test_display() {
        let op = St::decode(Instruction::new(Word::new(0b0011_001_000000000)));
        assert_eq!(format!("{op}"), "ST R1, #0");
    }
}
