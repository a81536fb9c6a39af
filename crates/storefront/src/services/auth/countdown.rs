//! Resend countdown shown on the verify step.

use std::time::Duration;

/// Seconds left before another OTP may be requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    window: u64,
    remaining: u64,
}

impl Countdown {
    /// A countdown starting at the full `window`.
    #[must_use]
    pub const fn new(window: Duration) -> Self {
        let window = window.as_secs();
        Self {
            window,
            remaining: window,
        }
    }

    /// A countdown for an OTP sent `elapsed` ago.
    #[must_use]
    pub const fn resumed(window: Duration, elapsed: Duration) -> Self {
        let window = window.as_secs();
        Self {
            window,
            remaining: window.saturating_sub(elapsed.as_secs()),
        }
    }

    /// A countdown that has already run out.
    #[must_use]
    pub const fn expired(window: Duration) -> Self {
        Self {
            window: window.as_secs(),
            remaining: 0,
        }
    }

    /// Advance by one second.
    pub const fn tick(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
    }

    /// Start over from the full window.
    pub const fn reset(&mut self) {
        self.remaining = self.window;
    }

    #[must_use]
    pub const fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Resend is offered exactly when the countdown has reached zero.
    #[must_use]
    pub const fn can_resend(&self) -> bool {
        self.remaining == 0
    }

    /// `MM:SS`, as shown next to the resend button.
    #[must_use]
    pub fn format_remaining(&self) -> String {
        format!("{:02}:{:02}", self.remaining / 60, self.remaining % 60)
    }
}
