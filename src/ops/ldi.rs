use std::fmt;

use crate::engine::Fault;
use crate::instr::Instruction;
use crate::machine::Machine;
use crate::word::Word;

use super::Operation;

/// LDI: a <- mem[PC + sext(OFFSET9)]; DR <- mem[a].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ldi {
    dr: usize,
    offset: Word,
}

impl Operation for Ldi {
    fn decode(ir: Instruction) -> Self {
        // LAYOUT: 1010 | DR | PCoffset9
        Self {
            dr: ir.dr(),
            offset: ir.offset9(),
        }
    }

    fn evaluate_address(&mut self, machine: &mut Machine) {
        machine.mem.mar = machine.pc.wrapping_add(self.offset);
    }

    fn fetch_operands(&mut self, machine: &mut Machine) -> Result<(), Fault> {
        // First read pulls the pointer, second follows it.
        machine.mem.fetch()?;
        machine.mem.mar = machine.mem.mdr;
        machine.mem.fetch()?;
        Ok(())
    }

    fn execute(&mut self, machine: &mut Machine) -> Result<(), Fault> {
        machine.write_register(self.dr, machine.mem.mdr);
        Ok(())
    }
}

impl fmt::Display for Ldi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LDI R{}, #{}", self.dr, self.offset.get() as i16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::testing::step_one;
    use crate::psr::PrivilegeLevel;

    #[test]
    fn test_indirect_load() {
        let mut machine = Machine::new();
        machine.psr().set_privilege(PrivilegeLevel::Supervisor);
        machine
            .mem
            .store_direct(Word::new(0x0402), Word::new(0xDAD0))
            .expect("store pointer");
        machine
            .mem
            .store_direct(Word::new(0xDAD0), Word::new(0xCAFE))
            .expect("store value");
        machine.reg[0] = Word::new(0xFFFF);

        // LDI R0, #1 at x0400: pointer at x0402
        step_one(&mut machine, 0x0400, 0xA001).expect("step");
        assert_eq!(machine.reg[0].get(), 0xCAFE);
        assert_eq!(machine.psr().condition().get(), 0b100);
        assert_eq!(machine.pc.get(), 0x0401);
    }

    #[test]
    fn test_pointer_into_privileged_memory_faults() {
        let mut machine = Machine::new();
        // Pointer lives in user space but targets system space.
        machine
            .mem
            .store_direct(Word::new(0x3002), Word::new(0x0200))
            .expect("store pointer");
        let fault = step_one(&mut machine, 0x3000, 0b1010_000_000000001)
            .expect_err("indirect load into system space");
        assert!(matches!(fault, Fault::Interrupt(_)));
    }

    #[test]
    fn test_display() {
        let op = Ldi::decode(Instruction::new(Word::new(0xA001)));
        assert_eq!(format!("{op}"), "LDI R0, #1");
    }
}
