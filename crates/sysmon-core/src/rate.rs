//! Throughput derived from cumulative network byte counters.

use crate::clock::Timestamp;

/// Cumulative byte counters at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ByteCounters {
    pub sent: u64,
    pub recv: u64,
}

/// Upload/download rates in megabits per second.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Throughput {
    pub upload_mbps: f64,
    pub download_mbps: f64,
}

/// Last observed counters and when they were read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateState {
    last_bytes: ByteCounters,
    last_time: Timestamp,
}

impl RateState {
    pub fn new(bytes: ByteCounters, at: Timestamp) -> Self {
        Self {
            last_bytes: bytes,
            last_time: at,
        }
    }

    pub fn last_bytes(&self) -> ByteCounters {
        self.last_bytes
    }

    pub fn last_time(&self) -> Timestamp {
        self.last_time
    }

    /// Derive throughput since the previous reading and move the cursor to
    /// `current`/`now`.
    ///
    /// The cursor moves even when `now` is not after the previous reading, in
    /// which case both rates are 0. A counter that went backwards (interface
    /// reset) contributes no bytes.
    pub fn advance(&mut self, current: ByteCounters, now: Timestamp) -> Throughput {
        let dt = now.seconds_since(self.last_time);
        let throughput = if dt > 0.0 {
            Throughput {
                upload_mbps: mbps(current.sent.saturating_sub(self.last_bytes.sent), dt),
                download_mbps: mbps(current.recv.saturating_sub(self.last_bytes.recv), dt),
            }
        } else {
            Throughput::default()
        };

        self.last_bytes = current;
        self.last_time = now;
        throughput
    }
}

fn mbps(delta_bytes: u64, dt_secs: f64) -> f64 {
    delta_bytes as f64 / dt_secs * 8.0 / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_megabit_per_second() {
        let mut state = RateState::new(ByteCounters { sent: 0, recv: 0 }, Timestamp(1_000));
        let t = state.advance(
            ByteCounters {
                sent: 125_000,
                recv: 250_000,
            },
            Timestamp(2_000),
        );
        assert!((t.upload_mbps - 1.0).abs() < 1e-12);
        assert!((t.download_mbps - 2.0).abs() < 1e-12);
    }

    #[test]
    fn zero_elapsed_reports_zero_and_still_advances() {
        let mut state = RateState::new(ByteCounters { sent: 10, recv: 20 }, Timestamp(5_000));
        let current = ByteCounters {
            sent: 125_010,
            recv: 999_999,
        };
        let t = state.advance(current, Timestamp(5_000));
        assert_eq!(t, Throughput::default());
        assert_eq!(state.last_bytes(), current);
        assert_eq!(state.last_time(), Timestamp(5_000));
    }

    #[test]
    fn clock_going_backwards_reports_zero() {
        let mut state = RateState::new(ByteCounters::default(), Timestamp(9_000));
        let t = state.advance(ByteCounters { sent: 1, recv: 1 }, Timestamp(8_000));
        assert_eq!(t, Throughput::default());
        assert_eq!(state.last_time(), Timestamp(8_000));
    }

    #[test]
    fn drift_does_not_compound_after_zero_interval() {
        let mut state = RateState::new(ByteCounters::default(), Timestamp(0));
        state.advance(ByteCounters { sent: 500_000, recv: 0 }, Timestamp(0));
        // Only the 125 kB since the previous read count toward the next rate.
        let t = state.advance(ByteCounters { sent: 625_000, recv: 0 }, Timestamp(1_000));
        assert!((t.upload_mbps - 1.0).abs() < 1e-12);
    }

    #[test]
    fn counter_reset_is_not_negative() {
        let mut state = RateState::new(
            ByteCounters {
                sent: 1_000_000,
                recv: 1_000_000,
            },
            Timestamp(0),
        );
        let t = state.advance(ByteCounters { sent: 10, recv: 10 }, Timestamp(1_000));
        assert_eq!(t.upload_mbps, 0.0);
        assert_eq!(t.download_mbps, 0.0);
    }
}
