use crate::error::Error;
use crate::mmio::MmioTable;
use crate::psr::{PrivilegeLevel, ProcessorStatus};
use crate::word::Word;
use crate::{IO_PAGE, MCR_ADDR, PSR_ADDR, USER_SPACE};

/// Number of directly backed words; everything from [`IO_PAGE`] up is
/// routed to the MMIO table instead.
const BACKED_WORDS: usize = IO_PAGE as usize;

/// The memory controller: the 64K-word logical address space, the MAR/MDR
/// pair the instruction cycle drives, the user/supervisor access check and
/// the I/O-page routing.
///
/// All cycle-driven access goes MAR → [`fetch`]/[`store`] → MDR. The loader
/// and the handler machinery use the privileged direct accessors instead,
/// which skip MAR/MDR and the access check.
///
/// [`fetch`]: Memory::fetch
/// [`store`]: Memory::store
#[derive(Debug)]
pub struct Memory {
    // On the heap: a 65024-word array is unkind to the stack.
    cells: Box<[Word; BACKED_WORDS]>,
    pub mar: Word,
    pub mdr: Word,
    mmio: MmioTable,
    psr: ProcessorStatus,
}

/// Addresses a user-mode program may not touch: everything below user
/// space, plus the two control registers on the I/O page.
fn privileged(addr: Word) -> bool {
    addr.get() < USER_SPACE || addr.get() == MCR_ADDR || addr.get() == PSR_ADDR
}

impl Memory {
    pub fn new(mmio: MmioTable, psr: ProcessorStatus) -> Self {
        Self {
            cells: Box::new([Word::ZERO; BACKED_WORDS]),
            mar: Word::ZERO,
            mdr: Word::ZERO,
            mmio,
            psr,
        }
    }

    /// The access check shared by fetch and store. On a violation the MDR
    /// is poisoned with the PSR value so a handler can inspect the state
    /// that caused it.
    fn check_access(&mut self) -> Result<(), Error> {
        if self.psr.privilege() == PrivilegeLevel::User && privileged(self.mar) {
            tracing::warn!(mar = %self.mar, "user access to privileged memory");
            self.mdr = self.psr.get();
            return Err(Error::AccessControl { addr: self.mar });
        }
        Ok(())
    }

    /// MDR ← mem[MAR].
    pub fn fetch(&mut self) -> Result<(), Error> {
        self.check_access()?;
        let addr = self.mar;
        if addr.get() >= IO_PAGE {
            self.mdr = self.mmio.load(addr).map_err(|source| Error::Memory {
                addr,
                source: Box::new(source),
            })?;
        } else {
            self.mdr = self.cells[usize::from(addr)];
        }
        tracing::trace!(mar = %addr, mdr = %self.mdr, "fetch");
        Ok(())
    }

    /// mem[MAR] ← MDR.
    pub fn store(&mut self) -> Result<(), Error> {
        self.check_access()?;
        let addr = self.mar;
        if addr.get() >= IO_PAGE {
            self.mmio
                .store(addr, self.mdr)
                .map_err(|source| Error::Memory {
                    addr,
                    source: Box::new(source),
                })?;
        } else {
            self.cells[usize::from(addr)] = self.mdr;
        }
        tracing::trace!(mar = %addr, mdr = %self.mdr, "store");
        Ok(())
    }

    /// Read a word with system privilege, bypassing MAR/MDR. Used by the
    /// loader and the trap/interrupt handler machinery.
    pub fn load_direct(&self, addr: Word) -> Result<Word, Error> {
        if addr.get() >= IO_PAGE {
            self.mmio.load(addr).map_err(|source| Error::Memory {
                addr,
                source: Box::new(source),
            })
        } else {
            Ok(self.cells[usize::from(addr)])
        }
    }

    /// Write a word with system privilege, bypassing MAR/MDR.
    pub fn store_direct(&mut self, addr: Word, value: Word) -> Result<(), Error> {
        if addr.get() >= IO_PAGE {
            self.mmio.store(addr, value).map_err(|source| Error::Memory {
                addr,
                source: Box::new(source),
            })
        } else {
            self.cells[usize::from(addr)] = value;
            Ok(())
        }
    }

    /// Zero the backing store, leaving devices alone.
    pub fn clear(&mut self) {
        self.cells.fill(Word::ZERO);
    }

    pub fn mmio(&self) -> &MmioTable {
        &self.mmio
    }
}
