//! Manual/automatic operation mode

use core::sync::atomic::{AtomicBool, Ordering};

/// Who is in charge of the chassis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OperationMode {
    /// Commands come from the serial console
    Manual,
    /// The movement script is replayed
    Automatic,
}

/// Source of the current operation mode, polled between commands
pub trait ModeSwitch {
    fn is_manual(&self) -> bool;
}

/// Mode shared between tasks
///
/// Lives in a `static`; any task or interrupt handler can flip it.
pub struct ModeFlag {
    manual: AtomicBool,
}

impl ModeFlag {
    pub const fn new(mode: OperationMode) -> Self {
        Self {
            manual: AtomicBool::new(matches!(mode, OperationMode::Manual)),
        }
    }

    pub fn get(&self) -> OperationMode {
        if self.manual.load(Ordering::Acquire) {
            OperationMode::Manual
        } else {
            OperationMode::Automatic
        }
    }

    /// Switches mode, returning the previous one
    pub fn set(&self, mode: OperationMode) -> OperationMode {
        let was_manual = self
            .manual
            .swap(matches!(mode, OperationMode::Manual), Ordering::AcqRel);
        if was_manual {
            OperationMode::Manual
        } else {
            OperationMode::Automatic
        }
    }

    /// Flips between manual and automatic, returning the new mode
    pub fn toggle(&self) -> OperationMode {
        let was_manual = self.manual.fetch_xor(true, Ordering::AcqRel);
        if was_manual {
            OperationMode::Automatic
        } else {
            OperationMode::Manual
        }
    }
}

impl ModeSwitch for ModeFlag {
    fn is_manual(&self) -> bool {
        self.get() == OperationMode::Manual
    }
}

impl<T: ModeSwitch + ?Sized> ModeSwitch for &T {
    fn is_manual(&self) -> bool {
        (**self).is_manual()
    }
}
