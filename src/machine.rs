use std::fmt;
use std::ops::{Index, IndexMut};
use std::sync::Arc;

use crate::devices::{Display, DisplayDriver, Keyboard};
use crate::instr::Instruction;
use crate::interrupt::InterruptController;
use crate::memory::Memory;
use crate::mmio::{Mapping, MmioTable};
use crate::psr::{Condition, MachineControl, Priority, PrivilegeLevel, ProcessorStatus};
use crate::word::Word;
use crate::{DDR_ADDR, DSR_ADDR, IO_PAGE, KBDR_ADDR, KBSR_ADDR, MCR_ADDR, PSR_ADDR, USER_SPACE};

/// Index of the stack pointer in the register file.
pub const SP: usize = 6;
/// Index of the subroutine return address register.
pub const RA: usize = 7;

/// Where execution starts after construction.
pub const INITIAL_PC: u16 = USER_SPACE;

/// The eight general-purpose registers R0-R7. R6 is the active stack
/// pointer, R7 the subroutine return address.
#[derive(Debug, Default, Clone, Copy)]
pub struct RegisterFile([Word; 8]);

impl Index<usize> for RegisterFile {
    type Output = Word;

    fn index(&self, index: usize) -> &Word {
        &self.0[index]
    }
}

impl IndexMut<usize> for RegisterFile {
    fn index_mut(&mut self, index: usize) -> &mut Word {
        &mut self.0[index]
    }
}

impl fmt::Display for RegisterFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, reg) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "R{i}={reg}")?;
        }
        Ok(())
    }
}

/// Construction knobs. The priority the machine runs at after dropping to
/// user mode is debatable architecture-wise, so it is open to callers.
#[derive(Debug, Clone)]
pub struct MachineOptions {
    pub initial_priority: Priority,
}

impl Default for MachineOptions {
    fn default() -> Self {
        Self {
            initial_priority: Priority::NORMAL,
        }
    }
}

/// The machine: register state, memory controller, interrupt controller
/// and the two standard devices, wired and ready to run user code.
#[derive(Debug)]
pub struct Machine {
    /// Registers R0-R7.
    pub reg: RegisterFile,
    /// Address of the next instruction to fetch.
    pub pc: Word,
    /// The instruction currently being executed.
    pub ir: Instruction,
    /// Saved user stack pointer while running privileged.
    pub usp: Word,
    /// Saved system stack pointer while running unprivileged.
    pub ssp: Word,
    pub mem: Memory,
    pub intc: InterruptController,
    psr: ProcessorStatus,
    mcr: MachineControl,
    keyboard: Arc<Keyboard>,
    display: Arc<DisplayDriver>,
}

impl Machine {
    pub fn new() -> Self {
        Self::with_options(MachineOptions::default())
    }

    pub fn with_options(options: MachineOptions) -> Self {
        // Powers on privileged, priority 0, with every condition flag
        // raised; the first register write will settle them.
        let psr = ProcessorStatus::new(Word::new(0x0007));
        let mcr = MachineControl::new();

        let keyboard = Arc::new(Keyboard::new(Word::new(KBSR_ADDR), Word::new(KBDR_ADDR)));
        let display = Arc::new(DisplayDriver::new(
            Arc::new(Display::new()),
            Word::new(DSR_ADDR),
            Word::new(DDR_ADDR),
        ));

        let mut mmio = MmioTable::new();
        mmio.map(Word::new(KBSR_ADDR), Mapping::Driver(keyboard.clone()));
        mmio.map(Word::new(KBDR_ADDR), Mapping::Driver(keyboard.clone()));
        mmio.map(Word::new(DSR_ADDR), Mapping::Driver(display.clone()));
        mmio.map(Word::new(DDR_ADDR), Mapping::Driver(display.clone()));
        mmio.map_psr(Word::new(PSR_ADDR), psr.clone());
        mmio.map(Word::new(MCR_ADDR), Mapping::Register(Arc::new(mcr.clone())));

        let mut machine = Self {
            reg: RegisterFile::default(),
            pc: Word::new(INITIAL_PC),
            ir: Instruction::default(),
            usp: Word::new(IO_PAGE),
            ssp: Word::new(USER_SPACE),
            mem: Memory::new(mmio, psr.clone()),
            intc: InterruptController::new(),
            psr,
            mcr,
            keyboard,
            display,
        };

        // Second pass, now that every device can see its mapped addresses:
        // the keyboard claims its interrupt slot and the display spawns its
        // notifier.
        machine.keyboard.clone().init(&mut machine.intc);
        machine.display.start();

        machine.drop_to_user(options.initial_priority);
        tracing::debug!(pc = %machine.pc, psr = %machine.psr, "machine constructed");
        machine
    }

    /// Leave the construction-time privileged state: switch to user mode at
    /// the given priority with the user stack active.
    fn drop_to_user(&mut self, priority: Priority) {
        self.reg[SP] = self.usp;
        self.psr.set_privilege(PrivilegeLevel::User);
        self.psr.set_priority(priority);
    }

    /// Restore the power-on register state and wipe memory below the I/O
    /// page. Devices and their mappings survive a reset.
    pub fn reset(&mut self) {
        self.mem.clear();
        self.reg = RegisterFile::default();
        self.pc = Word::new(INITIAL_PC);
        self.ir = Instruction::default();
        self.usp = Word::new(IO_PAGE);
        self.ssp = Word::new(USER_SPACE);
        self.psr.set(Word::new(0x0007));
        self.mcr.start();
        self.drop_to_user(MachineOptions::default().initial_priority);
        tracing::info!("machine reset");
    }

    pub fn psr(&self) -> &ProcessorStatus {
        &self.psr
    }

    pub fn mcr(&self) -> &MachineControl {
        &self.mcr
    }

    /// The keyboard device, for external producers feeding keys in.
    pub fn keyboard(&self) -> &Arc<Keyboard> {
        &self.keyboard
    }

    /// The display driver, for subscribing to output.
    pub fn display(&self) -> &Arc<DisplayDriver> {
        &self.display
    }

    /// Write a destination register and settle the condition flags from the
    /// sign of the stored value.
    pub(crate) fn write_register(&mut self, index: usize, value: Word) {
        self.reg[index] = value;
        self.psr.set_condition(Condition::from_word(value));
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PC={} IR={} PSR={} {}",
            self.pc,
            self.ir,
            self.psr,
            self.reg
        )
    }
}
