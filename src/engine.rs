//! The execution engine: the six-phase instruction cycle, the run loop,
//! and the handle protocol that turns traps, exceptions and I/O interrupts
//! into control transfers through the vector tables.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::Error;
use crate::instr::Instruction;
use crate::machine::{Machine, SP};
use crate::ops::{Opcode, Operation};
use crate::psr::PrivilegeLevel;
use crate::word::{BitAddressable, Word};
use crate::{EXCEPTION_TABLE, INTERRUPT_TABLE, TRAP_TABLE, VECTOR_ACV, VECTOR_PMV, VECTOR_XOP};

/// The exceptions the machine can raise on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionKind {
    /// RTI executed in user mode.
    PrivilegeMode,
    /// The reserved opcode executed.
    IllegalOpcode,
    /// User access to privileged memory.
    AccessControl,
}

impl ExceptionKind {
    fn vector(self) -> Word {
        Word::new(match self {
            ExceptionKind::PrivilegeMode => VECTOR_PMV,
            ExceptionKind::IllegalOpcode => VECTOR_XOP,
            ExceptionKind::AccessControl => VECTOR_ACV,
        })
    }
}

impl fmt::Display for ExceptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExceptionKind::PrivilegeMode => write!(f, "PMV"),
            ExceptionKind::IllegalOpcode => write!(f, "XOP"),
            ExceptionKind::AccessControl => write!(f, "ACV"),
        }
    }
}

/// An interruptable event: which vector table to go through, the vector
/// into it, and the caller's PC/PSR snapshot to push for the handler's
/// eventual RTI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub table: Word,
    pub vector: Word,
    pub pc: Word,
    pub psr: Word,
}

impl Event {
    /// A TRAP instruction with the given vector.
    pub fn trap(vector: Word, pc: Word, psr: Word) -> Self {
        Self {
            table: Word::new(TRAP_TABLE),
            vector,
            pc,
            psr,
        }
    }

    /// A machine-raised exception.
    pub fn exception(kind: ExceptionKind, pc: Word, psr: Word) -> Self {
        Self {
            table: Word::new(EXCEPTION_TABLE),
            vector: kind.vector(),
            pc,
            psr,
        }
    }

    /// An I/O interrupt from a driver with the given service vector.
    pub fn interrupt(vector: Word, pc: Word, psr: Word) -> Self {
        Self {
            table: Word::new(INTERRUPT_TABLE),
            vector,
            pc,
            psr,
        }
    }

    /// The vector-table entry holding the handler's start address.
    pub fn handler_slot(&self) -> Word {
        Word::new(self.table.get() | self.vector.get())
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "vector {} via {} (pc={})",
            self.vector, self.table, self.pc
        )
    }
}

/// Outcome of a failed cycle: either a control transfer the engine resolves
/// through a vector table, or a genuine error that aborts the run.
#[derive(Debug)]
pub enum Fault {
    Interrupt(Event),
    Error(Error),
}

impl From<Error> for Fault {
    fn from(err: Error) -> Self {
        Fault::Error(err)
    }
}

#[derive(Debug, Default)]
struct CancelState {
    flag: AtomicBool,
    reason: Mutex<Option<String>>,
}

/// Cooperative cancellation for [`Machine::run`]. Cloning yields another
/// handle onto the same signal; the run loop checks it once per
/// instruction boundary, never mid-cycle.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    state: Arc<CancelState>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation with a reason the run loop will hand back.
    pub fn cancel(&self, reason: impl Into<String>) {
        let mut slot = self.state.reason.lock().expect("cancel lock");
        slot.get_or_insert_with(|| reason.into());
        self.state.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.flag.load(Ordering::SeqCst)
    }

    fn reason(&self) -> String {
        self.state
            .reason
            .lock()
            .expect("cancel lock")
            .clone()
            .unwrap_or_default()
    }
}

impl Machine {
    /// Run one instruction through the six-phase cycle. A failed phase
    /// skips the rest; user accesses to privileged memory come back as an
    /// ACV exception ready for [`Machine::service`].
    pub fn step(&mut self) -> Result<(), Fault> {
        match self.cycle() {
            Err(Fault::Error(Error::AccessControl { .. })) => Err(Fault::Interrupt(
                Event::exception(ExceptionKind::AccessControl, self.pc, self.psr().get()),
            )),
            outcome => outcome,
        }
    }

    /// fetch → decode → evaluate address → fetch operands → execute →
    /// store result. Phases an opcode does not implement fall through.
    fn cycle(&mut self) -> Result<(), Fault> {
        let span = tracing::trace_span!("cycle", pc = %self.pc);
        let _enter = span.enter();

        // Fetch: IR <- mem[PC] via MAR/MDR, then increment PC so every
        // later phase sees the address of the next instruction.
        self.mem.mar = self.pc;
        self.mem.fetch()?;
        self.ir = Instruction::from(self.mem.mdr);
        self.pc = self.pc.wrapping_add(Word::new(1));

        // Decode. The reserved encoding decodes too; it raises XOP when it
        // reaches its execute phase.
        let mut op = Opcode::decode(self.ir);
        tracing::trace!(ir = %self.ir, op = %op, "decoded");

        op.evaluate_address(self);
        op.fetch_operands(self)?;
        op.execute(self)?;
        op.store_result(self)?;
        Ok(())
    }

    /// The handle protocol, shared by traps, exceptions and interrupts:
    /// swap to the system stack if the caller ran unprivileged, push the
    /// caller's PSR then PC, and jump through the vector table.
    pub fn service(&mut self, event: Event) -> Result<(), Error> {
        tracing::debug!(%event, "servicing");

        if event.psr.index(15).get() == 1 {
            self.usp = self.reg[SP];
            self.reg[SP] = self.ssp;
        }
        self.psr().set_privilege(PrivilegeLevel::Supervisor);

        let psr_slot = self.reg[SP].wrapping_sub(Word::new(1));
        let pc_slot = psr_slot.wrapping_sub(Word::new(1));
        self.mem.store_direct(psr_slot, event.psr)?;
        self.mem.store_direct(pc_slot, event.pc)?;
        self.reg[SP] = pc_slot;

        self.pc = self.mem.load_direct(event.handler_slot())?;
        tracing::debug!(handler = %self.pc, "control transferred");
        Ok(())
    }

    /// Run until the RUN flag drops (success) or `cancel` fires (returns
    /// the cancellation as an error). Interruptable events never escape;
    /// they transfer control and the loop keeps going.
    pub fn run(&mut self, cancel: &CancelToken) -> Result<(), Error> {
        self.run_loop(Some(cancel), None)
    }

    /// Run at most `max_steps` instructions, with the same semantics
    /// otherwise.
    pub fn run_steps(&mut self, max_steps: usize) -> Result<(), Error> {
        self.run_loop(None, Some(max_steps))
    }

    fn run_loop(
        &mut self,
        cancel: Option<&CancelToken>,
        max_steps: Option<usize>,
    ) -> Result<(), Error> {
        let mut steps = 0usize;
        loop {
            if let Some(token) = cancel {
                if token.is_cancelled() {
                    tracing::info!("run cancelled");
                    return Err(Error::Cancelled {
                        reason: token.reason(),
                    });
                }
            }
            if !self.mcr().running() {
                tracing::info!(steps, "halted");
                return Ok(());
            }
            if let Some(max) = max_steps {
                if steps >= max {
                    tracing::debug!(steps, "step budget exhausted");
                    return Ok(());
                }
            }

            match self.step() {
                Ok(()) => {
                    // Between-instruction poll: take the highest pending
                    // request that beats the current priority before the
                    // next fetch.
                    let pending = self
                        .intc
                        .requested(self.psr().priority())
                        .map(|entry| entry.vector);
                    if let Some(vector) = pending {
                        let event = Event::interrupt(vector, self.pc, self.psr().get());
                        self.service(event)?;
                    }
                }
                Err(Fault::Interrupt(event)) => self.service(event)?,
                Err(Fault::Error(err)) => {
                    tracing::error!(%err, "run aborted");
                    return Err(err);
                }
            }
            steps += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_token_carries_reason() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        token.cancel("deadline exceeded");
        assert!(token.is_cancelled());
        assert_eq!(token.reason(), "deadline exceeded");

        // First reason wins.
        token.cancel("later");
        assert_eq!(token.reason(), "deadline exceeded");
    }

    #[test]
    fn test_cancel_token_clones_share_state() {
        let token = CancelToken::new();
        let other = token.clone();
        other.cancel("from the other handle");
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_handler_slot_composition() {
        let trap = Event::trap(Word::new(0x25), Word::ZERO, Word::ZERO);
        assert_eq!(trap.handler_slot().get(), 0x0025);

        let exc = Event::exception(ExceptionKind::AccessControl, Word::ZERO, Word::ZERO);
        assert_eq!(exc.handler_slot().get(), 0x0102);

        let irq = Event::interrupt(Word::new(0x80), Word::ZERO, Word::ZERO);
        assert_eq!(irq.handler_slot().get(), 0x0180);
    }

    #[test]
    fn test_exception_vectors() {
        assert_eq!(ExceptionKind::PrivilegeMode.vector().get(), 0x00);
        assert_eq!(ExceptionKind::IllegalOpcode.vector().get(), 0x01);
        assert_eq!(ExceptionKind::AccessControl.vector().get(), 0x02);
    }
}
