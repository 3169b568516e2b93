//! The human-facing side of a run: notices and the input toggle.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Info,
    Warning,
    Success,
}

/// Receives every user-visible message of the assistant and controller.
pub trait Operator: Send + Sync {
    fn notify(&self, kind: Notice, text: &str);

    /// Enable or disable free-form input while automation is running.
    fn set_input_enabled(&self, enabled: bool);
}

/// Shared "a run is active" flag in front of an [`Operator`].
pub struct InputGate {
    operator: Arc<dyn Operator>,
    busy: AtomicBool,
}

impl InputGate {
    pub fn new(operator: Arc<dyn Operator>) -> Arc<Self> {
        Arc::new(Self {
            operator,
            busy: AtomicBool::new(false),
        })
    }

    pub fn operator(&self) -> &Arc<dyn Operator> {
        &self.operator
    }

    pub fn is_locked(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Disable input until the returned guard is dropped. `None` when
    /// another holder already has it.
    pub fn try_lock(self: &Arc<Self>) -> Option<InputLock> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        self.operator.set_input_enabled(false);
        Some(InputLock {
            gate: Arc::clone(self),
        })
    }
}

/// Re-enables input on drop, whatever way the run ended.
pub struct InputLock {
    gate: Arc<InputGate>,
}

impl Drop for InputLock {
    fn drop(&mut self) {
        self.gate.busy.store(false, Ordering::Release);
        self.gate.operator.set_input_enabled(true);
    }
}
