use std::fmt;

use crate::engine::Fault;
use crate::instr::Instruction;
use crate::machine::Machine;
use crate::word::Word;

use super::Operation;

/// ADD: DR <- SR1 + SR2 (mod 2^16), or DR <- SR1 + sext(IMM5).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Add {
    Register { dr: usize, sr1: usize, sr2: usize },
    Immediate { dr: usize, sr1: usize, imm5: Word },
}

impl Operation for Add {
    fn decode(ir: Instruction) -> Self {
        // LAYOUT: 0001 | DR | SR1 | 0 | 00 | SR2
        //         0001 | DR | SR1 | 1 | IMM5
        if ir.imm_bit() {
            Add::Immediate {
                dr: ir.dr(),
                sr1: ir.sr1(),
                imm5: ir.imm5(),
            }
        } else {
            Add::Register {
                dr: ir.dr(),
                sr1: ir.sr1(),
                sr2: ir.sr2(),
            }
        }
    }

    fn execute(&mut self, machine: &mut Machine) -> Result<(), Fault> {
        let (dr, result) = match *self {
            Add::Register { dr, sr1, sr2 } => (dr, machine.reg[sr1].wrapping_add(machine.reg[sr2])),
            Add::Immediate { dr, sr1, imm5 } => (dr, machine.reg[sr1].wrapping_add(imm5)),
        };
        machine.write_register(dr, result);
        Ok(())
    }
}

impl fmt::Display for Add {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Add::Register { dr, sr1, sr2 } => write!(f, "ADD R{dr}, R{sr1}, R{sr2}"),
            Add::Immediate { dr, sr1, imm5 } => {
                write!(f, "ADD R{dr}, R{sr1}, #{}", imm5.get() as i16)
            }
        }
    }
}
