use std::fmt;

use crate::engine::Fault;
use crate::instr::Instruction;
use crate::machine::{Machine, RA};

use super::Operation;

/// JMP: PC <- BASE. With BASE = R7 this is the conventional subroutine
/// return, RET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Jmp {
    base: usize,
}

impl Operation for Jmp {
    fn decode(ir: Instruction) -> Self {
        // LAYOUT: 1100 | 000 | BaseR | 000000
        Self { base: ir.base_r() }
    }

    fn execute(&mut self, machine: &mut Machine) -> Result<(), Fault> {
        machine.pc = machine.reg[self.base];
        Ok(())
    }
}

impl fmt::Display for Jmp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.base == RA {
            write!(f, "RET")
        } else {
            write!(f, "JMP R{}", self.base)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::testing::step_one;
    use crate::word::Word;

    #[test]
    fn test_jump_through_register() {
        let mut machine = Machine::new();
        machine.reg[3] = Word::new(0x4000);
        // JMP R3
        step_one(&mut machine, 0x3000, 0b1100_000_011_000000).expect("step");
        assert_eq!(machine.pc.get(), 0x4000);
    }

    #[test]
    fn test_ret_uses_r7() {
        let mut machine = Machine::new();
        machine.reg[7] = Word::new(0x5000);
        // RET
        step_one(&mut machine, 0x3000, 0b1100_000_111_000000).expect("step");
        assert_eq!(machine.pc.get(), 0x5000);
    }

    #[test]
    fn test_display() {
        let op = Jmp::decode(Instruction::new(Word::new(0b1100_000_011_000000)));
        assert_eq!(format!("{op}"), "JMP R3");
        let op = Jmp::decode(Instruction::new(Word::new(0b1100_000_111_000000)));
        assert_eq!(format!("{op}"), "RET");
    }
}
