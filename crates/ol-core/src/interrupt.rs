//! Cooperative interruption.
//!
//! Long-running computations (a Monte Carlo convergence loop, a deep lattice,
//! a fine finite-difference grid) poll an [`Interrupt`] between units of work
//! and stop early with the best estimate they have, flagged as partial.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Why a computation stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InterruptReason {
    /// The caller-specified deadline passed.
    DeadlineReached,
    /// The caller raised the cancellation flag.
    Cancelled,
}

/// A deadline and/or a shared cancellation flag.
///
/// The default value never triggers.
///
/// # Example
/// ```
/// use ol_core::Interrupt;
/// use std::sync::{atomic::{AtomicBool, Ordering}, Arc};
///
/// let flag = Arc::new(AtomicBool::new(false));
/// let interrupt = Interrupt::default().with_cancel_flag(flag.clone());
/// assert!(interrupt.check().is_none());
/// flag.store(true, Ordering::Relaxed);
/// assert!(interrupt.check().is_some());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    deadline: Option<Instant>,
    cancel: Option<Arc<AtomicBool>>,
}

impl Interrupt {
    /// Stop once `deadline` has passed.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Stop once `budget` has elapsed from now.
    pub fn with_timeout(self, budget: Duration) -> Self {
        self.with_deadline(Instant::now() + budget)
    }

    /// Stop once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Whether a deadline or a cancellation flag is attached.
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some() || self.cancel.is_some()
    }

    /// Returns the reason to stop, if any. Cancellation wins over the deadline.
    pub fn check(&self) -> Option<InterruptReason> {
        if let Some(flag) = &self.cancel {
            if flag.load(Ordering::Relaxed) {
                return Some(InterruptReason::Cancelled);
            }
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(InterruptReason::DeadlineReached),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn default_never_triggers() {
        let interrupt = Interrupt::default();
        assert!(!interrupt.is_armed());
        assert_eq!(interrupt.check(), None);
    }

    #[test]
    fn past_deadline_triggers() {
        let interrupt = Interrupt::default().with_deadline(Instant::now());
        assert_eq!(interrupt.check(), Some(InterruptReason::DeadlineReached));
    }

    #[test]
    fn cancellation_takes_precedence() {
        let flag = Arc::new(AtomicBool::new(true));
        let interrupt = Interrupt::default()
            .with_deadline(Instant::now())
            .with_cancel_flag(flag);
        assert_eq!(interrupt.check(), Some(InterruptReason::Cancelled));
    }

    #[test]
    fn far_deadline_does_not_trigger() {
        let interrupt = Interrupt::default().with_timeout(Duration::from_secs(3600));
        assert!(interrupt.is_armed());
        assert_eq!(interrupt.check(), None);
    }

    proptest! {
        #[test]
        fn flag_state_decides_cancellation(raised in any::<bool>(), secs in 60u64..86_400) {
            let flag = Arc::new(AtomicBool::new(raised));
            let interrupt = Interrupt::default()
                .with_timeout(Duration::from_secs(secs))
                .with_cancel_flag(flag.clone());
            let expected = raised.then_some(InterruptReason::Cancelled);
            prop_assert_eq!(interrupt.check(), expected);

            flag.store(true, Ordering::Relaxed);
            prop_assert_eq!(interrupt.check(), Some(InterruptReason::Cancelled));
            // Clones share the flag.
            prop_assert_eq!(interrupt.clone().check(), Some(InterruptReason::Cancelled));
        }

        #[test]
        fn elapsed_deadline_always_triggers(ago in 0u64..3_600) {
            let deadline = Instant::now()
                .checked_sub(Duration::from_secs(ago))
                .unwrap_or_else(Instant::now);
            let interrupt = Interrupt::default().with_deadline(deadline);
            prop_assert_eq!(interrupt.check(), Some(InterruptReason::DeadlineReached));
        }
    }
}
