use std::fmt;

use crate::engine::Fault;
use crate::instr::Instruction;
use crate::machine::Machine;
use crate::word::Word;

use super::Operation;

/// STI: a <- mem[PC + sext(OFFSET9)]; mem[a] <- SR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sti {
    sr: usize,
    offset: Word,
}

impl Operation for Sti {
    fn decode(ir: Instruction) -> Self {
        // LAYOUT: 1011 | SR | PCoffset9
        Self {
            sr: ir.sr(),
            offset: ir.offset9(),
        }
    }

    fn evaluate_address(&mut self, machine: &mut Machine) {
        machine.mem.mar = machine.pc.wrapping_add(self.offset);
    }

    fn fetch_operands(&mut self, machine: &mut Machine) -> Result<(), Fault> {
        // The fetched word is the real destination.
        machine.mem.fetch()?;
        machine.mem.mar = machine.mem.mdr;
        Ok(())
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

impl fmt::Display for Sti {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "STI R{}, #{}", self.sr, self.offset.get() as i16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::testing::step_one;
    use crate::psr::PrivilegeLevel;

    #[test]
    fn test_indirect_store() {
        let mut machine = Machine::new();
        machine.reg[1] = Word::new(0xBEEF);
        machine
            .mem
            .store_direct(Word::new(0x3051), Word::new(0x4000))
            .expect("store pointer");
        // STI R1, #0: pointer at PC+1
        step_one(&mut machine, 0x3050, 0b1011_001_000000000).expect("step");
        assert_eq!(
            machine
                .mem
                .load_direct(Word::new(0x4000))
                .expect("load")
                .get(),
            0xBEEF
        );
    }

    #[test]
    fn test_supervisor_can_reach_control_registers() {
        let mut machine = Machine::new();
        machine.psr().set_privilege(PrivilegeLevel::Supervisor);
        machine.reg[0] = Word::ZERO;
        machine
            .mem
            .store_direct(Word::new(0x0202), Word::new(crate::MCR_ADDR))
            .expect("store pointer");
        // STI R0, #0 at x0201 clears the MCR through the pointer: HALT.
        step_one(&mut machine, 0x0201, 0b1011_000_000000000).expect("step");
        assert!(!machine.mcr().running());
    }

    #[test]
    fn test_display() {
        let op = Sti::decode(Instruction::new(Word::new(0b1011_001_000000000)));
        assert_eq!(format!("{op}"), "STI R1, #0");
    }
}
