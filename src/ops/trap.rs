use std::fmt;

use crate::engine::{Event, Fault};
use crate::instr::Instruction;
use crate::machine::Machine;
use crate::word::Word;

use super::Operation;

/// TRAP: raise a service request with the instruction's 8-bit vector. The
/// engine pushes the caller's context and jumps through the trap table;
/// the handler returns with RTI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trap {
    vector: Word,
}

impl Operation for Trap {
    fn decode(ir: Instruction) -> Self {
        // LAYOUT: 1111 | 0000 | trapvect8
        Self {
            vector: ir.vector8(),
        }
    }

    fn execute(&mut self, machine: &mut Machine) -> Result<(), Fault> {
        tracing::debug!(vector = %self.vector, "trap raised");
        Err(Fault::Interrupt(Event::trap(
            self.vector,
            machine.pc,
            machine.psr().get(),
        )))
    }
}

impl fmt::Display for Trap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The conventional service-routine aliases.
        match self.vector.get() {
            0x20 => write!(f, "GETC"),
            0x21 => write!(f, "OUT"),
            0x22 => write!(f, "PUTS"),
            0x23 => write!(f, "IN"),
            0x24 => write!(f, "PUTSP"),
            0x25 => write!(f, "HALT"),
            vector => write!(f, "TRAP x{vector:02X}"),
        }
    }
}
