use std::fmt;
use std::sync::Arc;

use crate::error::Error;
use crate::mmio::Driver;
use crate::psr::Priority;
use crate::word::Word;

/// One interrupt descriptor: the service-routine vector and the driver
/// whose request line it serves.
#[derive(Debug, Clone)]
pub struct IdtEntry {
    pub vector: Word,
    pub driver: Arc<dyn Driver>,
}

/// The interrupt descriptor table: one slot per priority level. Populated
/// while the machine is wired together, read-only afterwards; the engine
/// polls it between instructions.
#[derive(Debug, Default)]
pub struct InterruptController {
    table: [Option<IdtEntry>; 8],
}

impl InterruptController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a priority level for a driver. A level holds at most one
    /// driver; a duplicate claim is reported and the original entry kept.
    pub fn register(
        &mut self,
        priority: Priority,
        vector: Word,
        driver: Arc<dyn Driver>,
    ) -> Result<(), Error> {
        let slot = &mut self.table[usize::from(priority.get())];
        if slot.is_some() {
            tracing::warn!(%priority, %vector, "interrupt slot already claimed");
            return Err(Error::PriorityClaimed { priority });
        }
        tracing::debug!(%priority, %vector, "interrupt registered");
        *slot = Some(IdtEntry { vector, driver });
        Ok(())
    }

    /// The highest-priority pending request that would preempt a processor
    /// running at `current`, if any. Scans strictly above `current`: an
    /// interrupt fires only when its level beats the one we are running at.
    pub fn requested(&self, current: Priority) -> Option<&IdtEntry> {
        let floor = usize::from(current.get()) + 1;
        self.table[floor..]
            .iter()
            .rev()
            .flatten()
            .find(|entry| entry.driver.interrupt_requested())
    }
}

impl fmt::Display for InterruptController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (level, slot) in self.table.iter().enumerate().rev() {
            match slot {
                Some(entry) => writeln!(f, "PL{level}: vector {}", entry.vector)?,
                None => writeln!(f, "PL{level}: -")?,
            }
        }
        Ok(())
    }
}
