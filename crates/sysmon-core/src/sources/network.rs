//! Interface counters summed across all interfaces, with throughput derived
//! from the previous reading.

use sysinfo::Networks;

use super::MetricSource;
use crate::clock::Timestamp;
use crate::error::SourceError;
use crate::rate::{ByteCounters, RateState};
use crate::snapshot::{NetworkRecord, ResourceKind};

/// Cumulative counters across every interface at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InterfaceTotals {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub packets_sent: u64,
    pub packets_recv: u64,
}

impl InterfaceTotals {
    fn bytes(&self) -> ByteCounters {
        ByteCounters {
            sent: self.bytes_sent,
            recv: self.bytes_recv,
        }
    }
}

type CounterReader = Box<dyn FnMut() -> Result<InterfaceTotals, SourceError>>;
type ClockFn = Box<dyn FnMut() -> Timestamp>;

pub struct NetworkSource {
    read: CounterReader,
    now: ClockFn,
    rate: Option<RateState>,
}

impl NetworkSource {
    /// Reads counters through `sysinfo`. The rate is seeded here so the first
    /// tick already reports throughput since construction.
    pub fn new() -> Self {
        let mut networks = Networks::new_with_refreshed_list();
        let reader = move || -> Result<InterfaceTotals, SourceError> {
            networks.refresh(true);
            Ok(sum_interfaces(&networks))
        };
        let mut source = Self::with_reader(reader, Timestamp::now);
        source.seed();
        source
    }

    /// A source over arbitrary counter and clock readers. The first
    /// [`sample`](MetricSource::sample) seeds the rate and reports 0 Mbps.
    pub fn with_reader(
        read: impl FnMut() -> Result<InterfaceTotals, SourceError> + 'static,
        now: impl FnMut() -> Timestamp + 'static,
    ) -> Self {
        Self {
            read: Box::new(read),
            now: Box::new(now),
            rate: None,
        }
    }

    fn seed(&mut self) {
        match (self.read)() {
            Ok(totals) => self.rate = Some(RateState::new(totals.bytes(), (self.now)())),
            Err(e) => log::debug!("network counters not readable at startup: {e}"),
        }
    }

    pub fn rate_state(&self) -> Option<&RateState> {
        self.rate.as_ref()
    }
}

impl Default for NetworkSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricSource for NetworkSource {
    type Record = NetworkRecord;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Network
    }

    fn sample(&mut self) -> Result<NetworkRecord, SourceError> {
        let totals = (self.read)()?;
        let now = (self.now)();

        let throughput = match self.rate.as_mut() {
            Some(state) => state.advance(totals.bytes(), now),
            None => {
                self.rate = Some(RateState::new(totals.bytes(), now));
                Default::default()
            }
        };

        Ok(NetworkRecord {
            bytes_sent: totals.bytes_sent,
            bytes_recv: totals.bytes_recv,
            packets_sent: totals.packets_sent,
            packets_recv: totals.packets_recv,
            upload_mbps: throughput.upload_mbps,
            download_mbps: throughput.download_mbps,
        })
    }
}

fn sum_interfaces(networks: &Networks) -> InterfaceTotals {
    let mut totals = InterfaceTotals::default();
    for (_name, data) in networks {
        totals.bytes_sent = totals.bytes_sent.saturating_add(data.total_transmitted());
        totals.bytes_recv = totals.bytes_recv.saturating_add(data.total_received());
        totals.packets_sent = totals
            .packets_sent
            .saturating_add(data.total_packets_transmitted());
        totals.packets_recv = totals
            .packets_recv
            .saturating_add(data.total_packets_received());
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    /// Each reading is `(unix_ms, bytes_sent, bytes_recv)`.
    fn scripted(readings: Vec<(u64, u64, u64)>) -> NetworkSource {
        let queue: Rc<RefCell<VecDeque<(u64, u64, u64)>>> =
            Rc::new(RefCell::new(readings.into_iter().collect()));
        let current = Rc::new(RefCell::new(0u64));
        let clock = current.clone();
        NetworkSource::with_reader(
            move || {
                let (t, sent, recv) = queue
                    .borrow_mut()
                    .pop_front()
                    .ok_or(SourceError::Unavailable("script exhausted"))?;
                *current.borrow_mut() = t;
                Ok(InterfaceTotals {
                    bytes_sent: sent,
                    bytes_recv: recv,
                    packets_sent: sent / 100,
                    packets_recv: recv / 100,
                })
            },
            move || Timestamp(*clock.borrow()),
        )
    }

    #[test]
    fn first_sample_seeds_rate() {
        let mut source = scripted(vec![(1_000, 500, 700)]);
        let r = source.sample().unwrap();
        assert_eq!(r.upload_mbps, 0.0);
        assert_eq!(r.download_mbps, 0.0);
        assert_eq!(r.bytes_sent, 500);
        assert_eq!(r.packets_recv, 7);
        assert_eq!(source.rate_state().unwrap().last_time(), Timestamp(1_000));
    }

    #[test]
    fn second_sample_derives_mbps() {
        let mut source = scripted(vec![(0, 0, 0), (1_000, 125_000, 1_250_000)]);
        source.sample().unwrap();
        let r = source.sample().unwrap();
        assert!((r.upload_mbps - 1.0).abs() < 1e-12);
        assert!((r.download_mbps - 10.0).abs() < 1e-12);
    }

    #[test]
    fn reader_error_leaves_rate_untouched() {
        let mut source = scripted(vec![(0, 10, 10)]);
        source.sample().unwrap();
        assert!(source.sample().is_err());
        let state = source.rate_state().unwrap();
        assert_eq!(state.last_bytes(), ByteCounters { sent: 10, recv: 10 });
    }

    #[test]
    fn live_sample_reads_counters() {
        let mut source = NetworkSource::new();
        let r = source.sample().unwrap();
        assert!(r.upload_mbps >= 0.0);
        assert!(r.download_mbps >= 0.0);
    }
}
