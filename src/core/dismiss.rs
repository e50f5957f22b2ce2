//! Auto-dismiss for pop-up windows
//!
//! A pop-up closes shortly after losing focus. Focus-out/focus-in pairs can
//! arrive back to back (a transient overlay grabbing focus for a moment), so
//! the close is deferred by a short delay and re-checked when the timer fires.
//! A focus-in clears the flag; the timer is never removed from the loop.

use std::time::Duration;

/// Default debounce before a blurred pop-up is destroyed
pub const DEFAULT_DISMISS_DELAY: Duration = Duration::from_millis(10);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DismissState {
    /// Focused, or the grace period has not been entered
    Active,
    /// Focus lost, timer armed
    DismissPending,
}

#[derive(Debug)]
pub struct DismissController {
    delay: Duration,
    state: DismissState,
    dismiss_queued: bool,
}

impl DismissController {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            state: DismissState::Active,
            dismiss_queued: false,
        }
    }

    pub fn state(&self) -> DismissState {
        self.state
    }

    pub fn dismiss_queued(&self) -> bool {
        self.dismiss_queued
    }

    /// Focus left the window. Returns the delay of the timer to arm, if any.
    pub fn focus_lost(&mut self) -> Option<Duration> {
        self.dismiss_queued = true;
        match self.state {
            DismissState::Active => {
                self.state = DismissState::DismissPending;
                Some(self.delay)
            }
            // a timer is already on its way
            DismissState::DismissPending => None,
        }
    }

    pub fn focus_gained(&mut self) {
        self.dismiss_queued = false;
        self.state = DismissState::Active;
    }

    /// A dismiss timer fired. Returns true if the window must be destroyed.
    pub fn timer_fired(&mut self) -> bool {
        if self.dismiss_queued {
            true
        } else {
            if self.state == DismissState::DismissPending {
                self.state = DismissState::Active;
            }
            false
        }
    }
}

impl Default for DismissController {
    fn default() -> Self {
        Self::new(DEFAULT_DISMISS_DELAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blur_then_timer_destroys() {
        let mut ctl = DismissController::default();
        assert_eq!(ctl.focus_lost(), Some(DEFAULT_DISMISS_DELAY));
        assert_eq!(ctl.state(), DismissState::DismissPending);
        assert!(ctl.timer_fired());
    }

    #[test]
    fn test_flicker_survives() {
        let mut ctl = DismissController::default();
        ctl.focus_lost();
        ctl.focus_gained();
        assert!(!ctl.dismiss_queued());
        assert_eq!(ctl.state(), DismissState::Active);
        assert!(!ctl.timer_fired());
        assert_eq!(ctl.state(), DismissState::Active);
    }

    #[test]
    fn test_repeated_blur_arms_once() {
        let mut ctl = DismissController::new(Duration::from_millis(25));
        assert_eq!(ctl.focus_lost(), Some(Duration::from_millis(25)));
        assert_eq!(ctl.focus_lost(), None);
        assert!(ctl.timer_fired());
    }

    #[test]
    fn test_rearm_after_focus_regained() {
        let mut ctl = DismissController::default();
        ctl.focus_lost();
        ctl.focus_gained();
        assert!(ctl.focus_lost().is_some());
        // the stale first timer sees the new blur and still closes
        assert!(ctl.timer_fired());
    }
}
