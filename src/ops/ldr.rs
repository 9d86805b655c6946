use std::fmt;

use crate::engine::Fault;
use crate::instr::Instruction;
use crate::machine::Machine;
use crate::word::Word;

use super::Operation;

/// LDR: DR <- mem[BASE + sext(OFFSET6)].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ldr {
    dr: usize,
    base: usize,
    offset: Word,
}

impl Operation for Ldr {
    fn decode(ir: Instruction) -> Self {
        // LAYOUT: 0110 | DR | BaseR | offset6
        Self {
            dr: ir.dr(),
            base: ir.base_r(),
            offset: ir.offset6(),
        }
    }

    fn evaluate_address(&mut self, machine: &mut Machine) {
        machine.mem.mar = machine.reg[self.base].wrapping_add(self.offset);
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

impl fmt::Display for Ldr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LDR R{}, R{}, #{}",
            self.dr,
            self.base,
            self.offset.get() as i16
        )
    }
}
