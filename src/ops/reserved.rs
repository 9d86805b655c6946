use std::fmt;

use crate::engine::{Event, ExceptionKind, Fault};
use crate::instr::Instruction;
use crate::machine::Machine;

use super::Operation;

/// The reserved encoding (0b1101). Decodes like any instruction and raises
/// an illegal-opcode exception when executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reserved;

impl Operation for Reserved {
    fn decode(_ir: Instruction) -> Self {
        Self
    }

    fn execute(&mut self, machine: &mut Machine) -> Result<(), Fault> {
        tracing::warn!(pc = %machine.pc, ir = %machine.ir, "reserved opcode executed");
        Err(Fault::Interrupt(Event::exception(
            ExceptionKind::IllegalOpcode,
            machine.pc,
            machine.psr().get(),
        )))
    }
}

impl fmt::Display for Reserved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RESV")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::testing::step_one;

    #[test]
    fn test_raises_illegal_opcode() {
        let mut machine = Machine::new();
        let fault = step_one(&mut machine, 0x3000, 0xD000).expect_err("XOP");
        match fault {
            Fault::Interrupt(event) => {
                assert_eq!(event.handler_slot().get(), 0x0101);
                assert_eq!(event.pc.get(), 0x3001);
            }
            other => panic!("expected XOP event, got {other:?}"),
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Reserved), "RESV");
    }
}
