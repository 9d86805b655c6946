use std::fmt;

use crate::engine::Fault;
use crate::instr::Instruction;
use crate::machine::Machine;
use crate::word::Word;

use super::Operation;

/// LEA: DR <- PC + sext(OFFSET9). The condition flags are left alone; the
/// result is an address, not data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lea {
    dr: usize,
    offset: Word,
}

impl Operation for Lea {
    fn decode(ir: Instruction) -> Self {
        // LAYOUT: 1110 | DR | PCoffset9
        Self {
            dr: ir.dr(),
            offset: ir.offset9(),
        }
    }

    fn execute(&mut self, machine: &mut Machine) -> Result<(), Fault> {
        machine.reg[self.dr] = machine.pc.wrapping_add(self.offset);
        Ok(())
    }
}

impl fmt::Display for Lea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LEA R{}, #{}", self.dr, self.offset.get() as i16)
    }
}
