//! Single in-flight guard for mutating ledger operations.

use std::sync::{Mutex, MutexGuard};

use crate::atm::OperationKind;
use crate::error::{AtmError, AtmResult};

#[derive(Debug, Default)]
pub(crate) struct InFlight {
    current: Mutex<Option<OperationKind>>,
}

impl InFlight {
    fn slot(&self) -> MutexGuard<'_, Option<OperationKind>> {
        self.current.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Claim the slot, or report the operation already holding it.
    pub(crate) fn begin(&self, kind: OperationKind) -> AtmResult<InFlightGuard<'_>> {
        let mut slot = self.slot();
        if let Some(running) = *slot {
            return Err(AtmError::OperationInFlight(running));
        }
        *slot = Some(kind);
        Ok(InFlightGuard { owner: self })
    }

    pub(crate) fn current(&self) -> Option<OperationKind> { *self.slot() }
}

/// Releases the slot on drop, whichever way the operation exits.
pub(crate) struct InFlightGuard<'a> {
    owner: &'a InFlight,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        *self.owner.slot() = None;
    }
}
