use std::fmt;

use crate::engine::{Event, ExceptionKind, Fault};
use crate::instr::Instruction;
use crate::machine::{Machine, SP};
use crate::word::{BitAddressable, Word};
use crate::psr::PrivilegeLevel;

use super::Operation;

/// RTI: return from a trap, exception or interrupt handler by popping PC
/// and PSR off the system stack. Executed in user mode it raises a
/// privilege-mode violation instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rti;

impl Operation for Rti {
    fn decode(_ir: Instruction) -> Self {
        // LAYOUT: 1000 | 000000000000; no operands.
        Self
    }

    fn execute(&mut self, machine: &mut Machine) -> Result<(), Fault> {
        if machine.psr().privilege() == PrivilegeLevel::User {
            tracing::warn!(pc = %machine.pc, "RTI in user mode");
            return Err(Fault::Interrupt(Event::exception(
                ExceptionKind::PrivilegeMode,
                machine.pc,
                machine.psr().get(),
            )));
        }

        // Pop PC, then PSR, both through the MDR.
        machine.mem.mar = machine.reg[SP];
        machine.mem.fetch()?;
        machine.pc = machine.mem.mdr;
        machine.reg[SP] = machine.reg[SP].wrapping_add(Word::new(1));

        machine.mem.mar = machine.reg[SP];
        machine.mem.fetch()?;
        let restored = machine.mem.mdr;
        machine.reg[SP] = machine.reg[SP].wrapping_add(Word::new(1));
        machine.psr().set(restored);

        // Dropping back to user mode swaps the stacks back.
        if restored.index(15).get() == 1 {
            machine.ssp = machine.reg[SP];
            machine.reg[SP] = machine.usp;
        }
        tracing::debug!(pc = %machine.pc, psr = %restored, "returned from handler");
        Ok(())
    }
}

impl fmt::Display for Rti {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RTI")
    }
}
