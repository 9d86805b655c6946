use std::fmt;

use crate::engine::Fault;
use crate::instr::Instruction;
use crate::machine::Machine;
use crate::word::Word;

use super::Operation;

/// LD: DR <- mem[PC + sext(OFFSET9)].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ld {
    dr: usize,
    offset: Word,
}

impl Operation for Ld {
    fn decode(ir: Instruction) -> Self {
        // LAYOUT: 0010 | DR | PCoffset9
        Self {
            dr: ir.dr(),
            offset: ir.offset9(),
        }
    }

    fn evaluate_address(&mut self, machine: &mut Machine) {
        machine.mem.mar = machine.pc.wrapping_add(self.offset);
    }

    fn fetch_operands(&mut self, machine: &mut Machine) -> Result<(), Fault> {
        machine.mem.fetch()?;
        Ok(())
    }

    fn execute(&mut self, machine: &mut Machine) -> Result<(), Fault> {
        machine.write_register(self.dr, machine.mem.mdr);
        Ok(())
    }
}

impl fmt::Display for Ld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LD R{}, #{}", self.dr, self.offset.get() as i16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::testing::step_one;

    #[test]
    fn test_load_relative_to_incremented_pc() {
        let mut machine = Machine::new();
        machine
            .mem
            .store_direct(Word::new(0x3003), Word::new(0xABCD))
            .expect("store");
        // LD R1, #2: effective address is PC+1+2
        step_one(&mut machine, 0x3000, 0b0010_001_000000010).expect("step");
        assert_eq!(machine.reg[1].get(), 0xABCD);
        assert_eq!(machine.psr().condition().get(), 0b100);
    }

    #[test]
    fn test_load_from_privileged_memory_raises_acv() {
        let mut machine = Machine::new();
        // LD R0, #-256 from x3000 reaches into system space
        let fault = step_one(&mut machine, 0x3000, 0b0010_000_100000000)
            .expect_err("user load below user space");
        match fault {
            Fault::Interrupt(event) => {
                assert_eq!(event.handler_slot().get(), 0x0102, "ACV service slot");
            }
            other => panic!("expected ACV event, got {other:?}"),
        }
    }

    #[test]
    fn test_display() {
        let op = Ld::decode(Instruction::new(Word::new(0b0010_001_000000010)));
        assert_eq!(format!("{op}"), "LD R1, #2");
    }
}
