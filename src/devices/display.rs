use std::fmt;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

use crate::error::Error;
use crate::mmio::Driver;
use crate::word::Word;

/// DSR[15]: the display is idle and will accept a character.
pub const DSR_READY: u16 = 0x8000;
/// DSR[14]: interrupt-enable flag.
pub const DSR_INTERRUPT_ENABLE: u16 = 0x4000;

/// A consumer of displayed words. Listeners run on the notifier task, not
/// the execution thread; they must hand real work off (e.g. to a buffered
/// channel) and never block, fail or panic.
pub type Listener = Box<dyn Fn(Word) + Send>;

#[derive(Debug)]
struct DisplayState {
    dsr: Word,
    ddr: Word,
}

/// The display device: status and data registers plus the listener list
/// that observes every written character.
pub struct Display {
    state: Mutex<DisplayState>,
    listeners: Mutex<Vec<Listener>>,
}

impl Display {
    pub fn new() -> Self {
        Self {
            // Powers on idle, ready for a character.
            state: Mutex::new(DisplayState {
                dsr: Word::new(DSR_READY),
                ddr: Word::ZERO,
            }),
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, listener: Listener) {
        self.listeners.lock().expect("listener lock").push(listener);
    }

    fn notify(&self, value: Word) {
        let listeners = self.listeners.lock().expect("listener lock");
        for listener in listeners.iter() {
            listener(value);
        }
    }

    fn status(&self) -> Word {
        self.state.lock().expect("display lock").dsr
    }

    fn data(&self) -> Word {
        self.state.lock().expect("display lock").ddr
    }

    fn set_status(&self, value: Word) {
        self.state.lock().expect("display lock").dsr = value;
    }

    /// Accept a character: latch it and drop READY until the notifier has
    /// fanned it out.
    fn begin_write(&self, value: Word) {
        let mut state = self.state.lock().expect("display lock");
        state.ddr = value;
        state.dsr = Word::new(state.dsr.get() & !DSR_READY);
    }

    /// Notification finished; the display is idle again.
    fn complete_write(&self) {
        let mut state = self.state.lock().expect("display lock");
        state.dsr = Word::new(state.dsr.get() | DSR_READY);
    }
}

impl Default for Display {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Display {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock().expect("display lock");
        f.debug_struct("Display")
            .field("dsr", &state.dsr)
            .field("ddr", &state.ddr)
            .finish_non_exhaustive()
    }
}

/// Driver for the display: owns the device, its two mapped addresses and
/// the write-behind notifier. A store to the data register clears READY and
/// queues the word; the notifier thread fans it out to listeners and only
/// then raises READY, so the cycle never runs listener code.
pub struct DisplayDriver {
    device: Arc<Display>,
    status_addr: Word,
    data_addr: Word,
    tx: mpsc::Sender<Word>,
    rx: Mutex<Option<mpsc::Receiver<Word>>>,
}

impl DisplayDriver {
    pub fn new(device: Arc<Display>, status_addr: Word, data_addr: Word) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            device,
            status_addr,
            data_addr,
            tx,
            rx: Mutex::new(Some(rx)),
        }
    }

    /// Second-pass configuration: spawn the notifier task. Idempotent; the
    /// channel receiver moves into the thread on the first call.
    pub fn start(&self) {
        let Some(rx) = self.rx.lock().expect("display driver lock").take() else {
            return;
        };
        let device = Arc::clone(&self.device);
        thread::Builder::new()
            .name("display-notifier".to_owned())
            .spawn(move || {
                // Runs until the machine (the only sender) is dropped.
                for value in rx {
                    device.notify(value);
                    device.complete_write();
                    tracing::trace!(%value, "display character fanned out");
                }
            })
            .expect("spawn display notifier");
    }

    /// Register a listener for every displayed word.
    pub fn subscribe(&self, listener: Listener) {
        self.device.subscribe(listener);
    }

    /// Convenience listener: a channel that receives every displayed word.
    pub fn subscribe_channel(&self) -> mpsc::Receiver<Word> {
        let (tx, rx) = mpsc::channel();
        self.subscribe(Box::new(move |value| {
            let _ = tx.send(value);
        }));
        rx
    }
}

impl fmt::Debug for DisplayDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisplayDriver")
            .field("device", &self.device)
            .field("status_addr", &self.status_addr)
            .field("data_addr", &self.data_addr)
            .finish_non_exhaustive()
    }
}

impl Driver for DisplayDriver {
    fn interrupt_requested(&self) -> bool {
        // READY plus interrupt-enable means the display is idle; there is
        // never buffered work to signal, so this line stays quiet unless a
        // program explicitly arms it.
        let dsr = self.device.status().get();
        dsr & DSR_READY != 0 && dsr & DSR_INTERRUPT_ENABLE != 0
    }

    fn read(&self, addr: Word) -> Result<Word, Error> {
        if addr == self.status_addr {
            Ok(self.device.status())
        } else if addr == self.data_addr {
            Ok(self.device.data())
        } else {
            Err(Error::NoDevice { addr })
        }
    }

    fn write(&self, addr: Word, value: Word) -> Result<(), Error> {
        if addr == self.status_addr {
            self.device.set_status(value);
            Ok(())
        } else if addr == self.data_addr {
            self.device.begin_write(value);
            tracing::trace!(%value, "DDR written");
            // Hand the word to the notifier; READY comes back once the
            // listeners have run.
            if self.tx.send(value).is_err() {
                // Notifier gone (shutdown); nobody is left to observe.
                self.device.complete_write();
            }
            Ok(())
        } else {
            Err(Error::NoDevice { addr })
        }
    }
}
