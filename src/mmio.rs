use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::Error;
use crate::psr::{MachineControl, ProcessorStatus};
use crate::word::Word;

/// A register-like device: one word of state behind an I/O-page address.
/// The PSR and MCR facades are the two instances the machine maps.
pub trait Device: Send + Sync + fmt::Debug {
    fn get(&self) -> Word;
    fn put(&self, value: Word);
}

/// A device driver: per-address load/store semantics plus an interrupt
/// line the controller polls between instructions. A driver typically owns
/// several mapped addresses (the keyboard has status and data, so does the
/// display) and decides what each means on read and write.
pub trait Driver: Send + Sync + fmt::Debug {
    /// Is this driver requesting service right now?
    fn interrupt_requested(&self) -> bool;

    fn read(&self, addr: Word) -> Result<Word, Error>;

    fn write(&self, addr: Word, value: Word) -> Result<(), Error>;
}

/// What an I/O-page address resolves to.
#[derive(Debug, Clone)]
pub enum Mapping {
    Register(Arc<dyn Device>),
    Driver(Arc<dyn Driver>),
}

/// The address→device map for the I/O page. Built once during machine
/// construction and immutable afterwards; the memory controller routes
/// every I/O-page access through here.
#[derive(Debug, Default)]
pub struct MmioTable {
    devices: FxHashMap<u16, Mapping>,
    psr_addr: Option<u16>,
}

impl MmioTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a mapping. Remapping an address is almost certainly a
    /// construction bug; the newest mapping wins but we say so.
    pub fn map(&mut self, addr: Word, mapping: Mapping) {
        tracing::debug!(%addr, ?mapping, "mapping I/O address");
        if self.devices.insert(addr.get(), mapping).is_some() {
            tracing::warn!(%addr, "I/O address remapped, previous device dropped");
        }
    }

    /// Install the PSR register facade and remember where it lives for the
    /// convenience accessor.
    pub fn map_psr(&mut self, addr: Word, psr: ProcessorStatus) {
        self.map(addr, Mapping::Register(Arc::new(psr)));
        self.psr_addr = Some(addr.get());
    }

    /// Value of the mapped PSR register, if one was installed.
    pub fn psr(&self) -> Option<Word> {
        let addr = self.psr_addr?;
        match self.devices.get(&addr) {
            Some(Mapping::Register(device)) => Some(device.get()),
            _ => None,
        }
    }

    /// Read one word from the device mapped at `addr`.
    pub fn load(&self, addr: Word) -> Result<Word, Error> {
        match self.devices.get(&addr.get()) {
            Some(Mapping::Register(device)) => Ok(device.get()),
            Some(Mapping::Driver(driver)) => driver.read(addr),
            None => Err(Error::NoDevice { addr }),
        }
    }

    /// Write one word to the device mapped at `addr`.
    pub fn store(&self, addr: Word, value: Word) -> Result<(), Error> {
        match self.devices.get(&addr.get()) {
            Some(Mapping::Register(device)) => {
                device.put(value);
                Ok(())
            }
            Some(Mapping::Driver(driver)) => driver.write(addr, value),
            None => Err(Error::NoDevice { addr }),
        }
    }
}

impl Device for ProcessorStatus {
    fn get(&self) -> Word {
        ProcessorStatus::get(self)
    }

    fn put(&self, value: Word) {
        ProcessorStatus::set(self, value);
    }
}

impl Device for MachineControl {
    fn get(&self) -> Word {
        MachineControl::get(self)
    }

    fn put(&self, value: Word) {
        MachineControl::set(self, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Latch(std::sync::Mutex<Word>);

    impl Device for Latch {
        fn get(&self) -> Word {
            *self.0.lock().expect("latch lock")
        }

        fn put(&self, value: Word) {
            *self.0.lock().expect("latch lock") = value;
        }
    }

    #[test]
    fn test_register_round_trip() {
        let mut table = MmioTable::new();
        let addr = Word::new(0xFE10);
        table.map(addr, Mapping::Register(Arc::new(Latch(Default::default()))));

        table.store(addr, Word::new(0xBEEF)).expect("store");
        assert_eq!(table.load(addr).expect("load").get(), 0xBEEF);
    }

    #[test]
    fn test_unmapped_address_is_no_device() {
        let table = MmioTable::new();
        let addr = Word::new(0xFE08);
        assert!(matches!(
            table.load(addr),
            Err(Error::NoDevice { addr: a }) if a == addr
        ));
        assert!(matches!(
            table.store(addr, Word::ZERO),
            Err(Error::NoDevice { .. })
        ));
    }

    #[test]
    fn test_psr_accessor() {
        let mut table = MmioTable::new();
        assert_eq!(table.psr(), None);

        let psr = ProcessorStatus::new(Word::new(0x8002));
        table.map_psr(Word::new(0xFFFC), psr.clone());
        assert_eq!(table.psr(), Some(Word::new(0x8002)));

        // The facade reads the live register, not a snapshot.
        psr.set(Word::new(0x0001));
        assert_eq!(table.psr(), Some(Word::new(0x0001)));
    }

    #[test]
    fn test_mcr_facade_halts() {
        let mut table = MmioTable::new();
        let mcr = MachineControl::new();
        table.map(Word::new(0xFFFE), Mapping::Register(Arc::new(mcr.clone())));

        assert!(mcr.running());
        table.store(Word::new(0xFFFE), Word::ZERO).expect("store");
        assert!(!mcr.running());
    }
}
