use std::fmt;

use crate::engine::Fault;
use crate::instr::Instruction;
use crate::machine::Machine;
use crate::word::Word;

use super::Operation;

/// AND: DR <- SR1 & SR2, or DR <- SR1 & sext(IMM5).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum And {
    Register { dr: usize, sr1: usize, sr2: usize },
    Immediate { dr: usize, sr1: usize, imm5: Word },
}

impl Operation for And {
    fn decode(ir: Instruction) -> Self {
        // LAYOUT: 0101 | DR | SR1 | 0 | 00 | SR2
        //         0101 | DR | SR1 | 1 | IMM5
        if ir.imm_bit() {
            And::Immediate {
                dr: ir.dr(),
                sr1: ir.sr1(),
                imm5: ir.imm5(),
            }
        } else {
            And::Register {
                dr: ir.dr(),
                sr1: ir.sr1(),
                sr2: ir.sr2(),
            }
        }
    }

    fn execute(&mut self, machine: &mut Machine) -> Result<(), Fault> {
        let (dr, result) = match *self {
            And::Register { dr, sr1, sr2 } => {
                (dr, Word::new(machine.reg[sr1].get() & machine.reg[sr2].get()))
            }
            And::Immediate { dr, sr1, imm5 } => {
                (dr, Word::new(machine.reg[sr1].get() & imm5.get()))
            }
        };
        machine.write_register(dr, result);
        Ok(())
    }
}

impl fmt::Display for And {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            And::Register { dr, sr1, sr2 } => write!(f, "AND R{dr}, R{sr1}, R{sr2}"),
            And::Immediate { dr, sr1, imm5 } => {
                write!(f, "AND R{dr}, R{sr1}, #{}", imm5.get() as i16)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::testing::step_one;

    #[test]
    fn test_register_and() {
        let mut machine = Machine::new();
        machine.reg[2] = Word::new(0xF0F0);
        machine.reg[3] = Word::new(0x0FF0);
        step_one(&mut machine, 0x3000, 0b0101_001_010_0_00_011).expect("step");
        assert_eq!(machine.reg[1].get(), 0x00F0);
        assert_eq!(machine.psr().condition().get(), 0b001);
    }

    #[test]
    fn test_clear_register_idiom() {
        let mut machine = Machine::new();
        machine.reg[0] = Word::new(0xABCD);
        // AND R0, R0, #0
        step_one(&mut machine, 0x3000, 0b0101_000_000_1_00000).expect("step");
        assert_eq!(machine.reg[0].get(), 0);
        assert_eq!(machine.psr().condition().get(), 0b010);
    }

    #[test]
    fn test_immediate_sign_extends() {
        let mut machine = Machine::new();
        machine.reg[1] = Word::new(0x8421);
        // AND R0, R1, #-1 keeps the source intact
        step_one(&mut machine, 0x3000, 0b0101_000_001_1_11111).expect("step");
        assert_eq!(machine.reg[0].get(), 0x8421);
        assert_eq!(machine.psr().condition().get(), 0b100);
    }

    #[test]
    fn test_display() {
        let op = And::decode(Instruction::new(Word::new(0b0101_001_010_0_00_011)));
        assert_eq!(format!("{op}"), "AND R1, R2, R3");
        let op = And::decode(Instruction::new(Word::new(0b0101_000_000_1_00000)));
        assert_eq!(format!("{op}"), "AND R0, R0, #0");
    }
}
