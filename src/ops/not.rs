use std::fmt;

use crate::engine::Fault;
use crate::instr::Instruction;
use crate::machine::Machine;
use crate::word::Word;

use super::Operation;

/// NOT: DR <- ~SR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Not {
    dr: usize,
    sr: usize,
}

impl Operation for Not {
    fn decode(ir: Instruction) -> Self {
        // LAYOUT: 1001 | DR | SR | 111111
        Self {
            dr: ir.dr(),
            sr: ir.sr1(),
        }
    }

    fn execute(&mut self, machine: &mut Machine) -> Result<(), Fault> {
        let result = Word::new(!machine.reg[self.sr].get());
        machine.write_register(self.dr, result);
        Ok(())
    }
}

impl fmt::Display for Not {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NOT R{}, R{}", self.dr, self.sr)
    }
}
