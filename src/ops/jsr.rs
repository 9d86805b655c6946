use std::fmt;

use crate::engine::Fault;
use crate::instr::Instruction;
use crate::machine::{Machine, RA};
use crate::word::Word;

use super::Operation;

/// JSR/JSRR: save the return address in R7, then jump PC-relative (JSR)
/// or through a base register (JSRR).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Jsr {
    Relative { offset: Word },
    Register { base: usize },
}

impl Operation for Jsr {
    fn decode(ir: Instruction) -> Self {
        // LAYOUT: 0100 | 1 | PCoffset11
        //         0100 | 0 | 00 | BaseR | 000000
        if ir.relative_bit() {
            Jsr::Relative {
                offset: ir.offset11(),
            }
        } else {
            Jsr::Register { base: ir.base_r() }
        }
    }

    fn execute(&mut self, machine: &mut Machine) -> Result<(), Fault> {
        // Read the target before clobbering R7: JSRR R7 is legal.
        let target = match *self {
            Jsr::Relative { offset } => machine.pc.wrapping_add(offset),
            Jsr::Register { base } => machine.reg[base],
        };
        machine.reg[RA] = machine.pc;
        machine.pc = target;
        Ok(())
    }
}

impl fmt::Display for Jsr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Jsr::Relative { offset } => write!(f, "JSR #{}", offset.get() as i16),
            Jsr::Register { base } => write!(f, "JSRR R{base}"),
        }
    }
}
