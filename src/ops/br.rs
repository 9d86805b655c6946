use std::fmt;

use crate::engine::Fault;
use crate::instr::Instruction;
use crate::machine::Machine;
use crate::word::Word;

use super::Operation;

/// BR: if the current condition intersects the instruction's NZP mask,
/// PC <- PC + sext(OFFSET9).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Br {
    mask: Word,
    offset: Word,
}

impl Operation for Br {
    fn decode(ir: Instruction) -> Self {
        // LAYOUT: 0000 | N | Z | P | PCoffset9
        Self {
            mask: ir.cond_mask(),
            offset: ir.offset9(),
        }
    }

    fn execute(&mut self, machine: &mut Machine) -> Result<(), Fault> {
        if machine.psr().condition_matches(self.mask) {
            machine.pc = machine.pc.wrapping_add(self.offset);
            tracing::trace!(pc = %machine.pc, "branch taken");
        }
        Ok(())
    }
}

impl fmt::Display for Br {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mask = self.mask.get();
        write!(
            f,
            "BR{}{}{} #{}",
            if mask & 0b100 != 0 { "n" } else { "" },
            if mask & 0b010 != 0 { "z" } else { "" },
            if mask & 0b001 != 0 { "p" } else { "" },
            self.offset.get() as i16
        )
    }
}
