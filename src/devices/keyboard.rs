use std::sync::{Condvar, Mutex};

use crate::error::Error;
use crate::interrupt::InterruptController;
use crate::mmio::Driver;
use crate::psr::Priority;
use crate::word::Word;

/// KBSR[15]: a key is waiting in KBDR.
pub const KBSR_READY: u16 = 0x8000;
/// KBSR[14]: raise an interrupt when a key arrives.
pub const KBSR_INTERRUPT_ENABLE: u16 = 0x4000;
/// Interrupt service routine vector the keyboard claims at configuration.
pub const KEYBOARD_VECTOR: Word = Word::new(0x80);

#[derive(Debug, Default)]
struct KeyboardState {
    kbsr: Word,
    kbdr: Word,
}

impl KeyboardState {
    fn ready(&self) -> bool {
        self.kbsr.get() & KBSR_READY != 0
    }

    fn interrupt_enabled(&self) -> bool {
        self.kbsr.get() & KBSR_INTERRUPT_ENABLE != 0
    }
}

/// The keyboard device and its driver in one: status and data registers
/// behind a lock, fed by an external producer thread through [`update`].
///
/// The condition variable covers the "enabled and empty" predicate:
/// `update` parks until the program has turned interrupts on and consumed
/// the previous key, then publishes data and READY in one critical section.
///
/// [`update`]: Keyboard::update
#[derive(Debug)]
pub struct Keyboard {
    state: Mutex<KeyboardState>,
    cond: Condvar,
    status_addr: Word,
    data_addr: Word,
}

impl Keyboard {
    pub fn new(status_addr: Word, data_addr: Word) -> Self {
        Self {
            state: Mutex::new(KeyboardState::default()),
            cond: Condvar::new(),
            status_addr,
            data_addr,
        }
    }

    /// Second-pass configuration: claim the keyboard's interrupt slot.
    /// A conflicting registration is reported by the controller and the
    /// keyboard simply stays silent on that line.
    pub fn init(self: std::sync::Arc<Self>, intc: &mut InterruptController) {
        if let Err(err) = intc.register(Priority::NORMAL, KEYBOARD_VECTOR, self) {
            tracing::warn!(%err, "keyboard could not claim its interrupt slot");
        }
    }

    /// Deliver one key from the producer side. Blocks until the program
    /// has set KBSR[14] (interrupt enable) and cleared READY by consuming
    /// the previous key, then sets KBDR and READY atomically.
    pub fn update(&self, key: u8) {
        let mut state = self.state.lock().expect("keyboard lock");
        while !(state.interrupt_enabled() && !state.ready()) {
            state = self.cond.wait(state).expect("keyboard lock");
        }
        state.kbdr = Word::from(key);
        state.kbsr = Word::new(state.kbsr.get() | KBSR_READY);
        tracing::debug!(key, "keyboard delivered key");
        self.cond.notify_all();
    }

    /// Nonblocking peek at the status register, for tests and embedders.
    pub fn status(&self) -> Word {
        self.state.lock().expect("keyboard lock").kbsr
    }
}

impl Driver for Keyboard {
    fn interrupt_requested(&self) -> bool {
        let state = self.state.lock().expect("keyboard lock");
        state.interrupt_enabled() && state.ready()
    }

    fn read(&self, addr: Word) -> Result<Word, Error> {
        let mut state = self.state.lock().expect("keyboard lock");
        if addr == self.data_addr {
            // Consuming the key clears READY and unblocks the producer.
            let key = state.kbdr;
            state.kbsr = Word::new(state.kbsr.get() & !KBSR_READY);
            self.cond.notify_all();
            tracing::trace!(%key, "KBDR read");
            Ok(key)
        } else if addr == self.status_addr {
            Ok(state.kbsr)
        } else {
            Err(Error::NoDevice { addr })
        }
    }

    fn write(&self, addr: Word, value: Word) -> Result<(), Error> {
        let mut state = self.state.lock().expect("keyboard lock");
        if addr == self.status_addr {
            // Status bits are program controlled; flipping interrupt-enable
            // or clearing READY may unblock a waiting producer.
            state.kbsr = value;
            self.cond.notify_all();
            tracing::trace!(kbsr = %value, "KBSR written");
            Ok(())
        } else if addr == self.data_addr {
            state.kbdr = value;
            Ok(())
        } else {
            Err(Error::NoDevice { addr })
        }
    }
}
