// Server-owned match countdown.

/// Result of advancing the clock by one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockStep {
    pub old: f32,
    pub new: f32,
}

impl ClockStep {
    pub fn changed(&self) -> bool {
        self.old != self.new
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SessionClock {
    total: f32,
    remaining: f32,
}

impl SessionClock {
    /// Restarts the countdown at `total` seconds.
    pub fn reset(&mut self, total: f32) {
        self.total = total;
        self.remaining = total;
    }

    /// Moves the countdown forward by `dt`, never below zero.
    pub fn advance(&mut self, dt: f32) -> ClockStep {
        let old = self.remaining;
        self.remaining = (self.remaining - dt).max(0.0);
        ClockStep {
            old,
            new: self.remaining,
        }
    }

    pub fn total(&self) -> f32 {
        self.total
    }

    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    pub fn is_expired(&self) -> bool {
        self.remaining <= 0.0
    }
}
