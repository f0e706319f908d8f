//! Wheel odometry from rising-edge pulse sensors
//!
//! Each wheel carries a slotted disc and an optical sensor producing one rising
//! edge per slot. The edges are counted from interrupt context and periodically
//! drained into a cumulative travelled distance per wheel.
//!
//! # Operation
//! - [`PulseCounter::record`] is the whole interrupt handler: one atomic increment
//! - [`OdometryAccumulator::drain`] runs from the periodic tick (10 Hz on the robot)
//!   inside a critical section, converts pulses to millimetres and resets the counters
//! - The movement dispatcher reads the cumulative distances and resets them once a
//!   `DISTANCE` target has been reached
//!
//! # Configuration
//! - 20 pulses per full wheel turn
//! - Wheel circumference 212 mm (front) and 211 mm (rear)
//! - A drain only happens once some wheel saw at least half a turn worth of pulses
//!
//! # Pulse budget
//! Pulse counters are 32 bits wide. At 20 pulses per turn a wheel would need
//! over 200 million turns between two drains to wrap, so missed drain ticks only
//! delay accumulation. Cumulative distances saturate at `u32::MAX` millimetres.

use core::cell::Cell;
use core::sync::atomic::{AtomicU32, Ordering};

use critical_section::{CriticalSection, Mutex};

use crate::wheel::{Wheel, NUM_WHEELS};

/// Pulses produced by one full turn of a wheel
pub const PULSES_PER_TURN: u32 = 20;

/// Wheel circumferences in millimetres, in [`Wheel`] index order
pub const WHEEL_CIRCUMFERENCE_MM: [u32; NUM_WHEELS] = [212, 212, 211, 211];

/// Conversion constants from pulses to travelled distance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WheelCalibration {
    /// Circumference of each wheel in millimetres
    pub circumference_mm: [u32; NUM_WHEELS],
    /// Pulses per full turn, shared by all wheels
    pub pulses_per_turn: u32,
}

impl WheelCalibration {
    /// Calibration of the stock chassis
    pub const DEFAULT: Self = Self::new(WHEEL_CIRCUMFERENCE_MM, PULSES_PER_TURN);

    pub const fn new(circumference_mm: [u32; NUM_WHEELS], pulses_per_turn: u32) -> Self {
        Self {
            circumference_mm,
            pulses_per_turn,
        }
    }

    /// Minimum pulse count on any wheel before a drain converts anything
    pub const fn drain_threshold(&self) -> u32 {
        self.pulses_per_turn / 2
    }

    /// Distance covered by `pulses` on `wheel`, rounded down to whole millimetres
    ///
    /// The rounding down matches the granularity of the counters; the remainder
    /// is not carried over to the next drain.
    pub const fn distance_mm(&self, wheel: Wheel, pulses: u32) -> u32 {
        if self.pulses_per_turn == 0 {
            return 0;
        }
        let mm = self.circumference_mm[wheel.index()] as u64 * pulses as u64
            / self.pulses_per_turn as u64;
        if mm > u32::MAX as u64 {
            u32::MAX
        } else {
            mm as u32
        }
    }
}

impl Default for WheelCalibration {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Per-wheel pulse counters written from interrupt context
pub struct PulseCounter {
    counts: [AtomicU32; NUM_WHEELS],
}

impl PulseCounter {
    pub const fn new() -> Self {
        Self {
            counts: [
                AtomicU32::new(0),
                AtomicU32::new(0),
                AtomicU32::new(0),
                AtomicU32::new(0),
            ],
        }
    }

    /// Count one rising edge on `wheel`
    ///
    /// Safe to call from the highest priority interrupt. Does nothing else.
    #[inline]
    pub fn record(&self, wheel: Wheel) {
        self.counts[wheel.index()].fetch_add(1, Ordering::Relaxed);
    }

    /// Pulses counted on `wheel` since the last successful drain
    pub fn pending(&self, wheel: Wheel) -> u32 {
        self.counts[wheel.index()].load(Ordering::Relaxed)
    }

    /// Snapshot of all four counters
    ///
    /// Requiring the critical section token keeps the snapshot consistent with
    /// the following [`Self::reset`].
    fn snapshot(&self, _cs: CriticalSection<'_>) -> [u32; NUM_WHEELS] {
        let mut pulses = [0; NUM_WHEELS];
        for (count, pulse) in self.counts.iter().zip(pulses.iter_mut()) {
            *pulse = count.load(Ordering::Relaxed);
        }
        pulses
    }

    fn reset(&self, _cs: CriticalSection<'_>) {
        for count in &self.counts {
            count.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for PulseCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a drain that converted pulses into distance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DrainReport {
    /// Pulses taken from each counter
    pub pulses: [u32; NUM_WHEELS],
    /// Millimetres added to each cumulative distance
    pub added_mm: [u32; NUM_WHEELS],
    /// Cumulative distances after the drain
    pub distance_mm: [u32; NUM_WHEELS],
}

/// Owner of the pulse counters and the cumulative distance per wheel
///
/// Designed to live in a `static` shared by the pulse interrupt handlers, the
/// drain tick and the movement dispatcher.
pub struct OdometryAccumulator {
    calibration: WheelCalibration,
    pulses: PulseCounter,
    distance_mm: Mutex<Cell<[u32; NUM_WHEELS]>>,
}

impl OdometryAccumulator {
    pub const fn new(calibration: WheelCalibration) -> Self {
        Self {
            calibration,
            pulses: PulseCounter::new(),
            distance_mm: Mutex::new(Cell::new([0; NUM_WHEELS])),
        }
    }

    pub fn calibration(&self) -> &WheelCalibration {
        &self.calibration
    }

    /// Counters fed by the pulse interrupt handlers
    pub fn pulses(&self) -> &PulseCounter {
        &self.pulses
    }

    /// Interrupt handler body for a rising edge on `wheel`
    #[inline]
    pub fn record_pulse(&self, wheel: Wheel) {
        self.pulses.record(wheel);
    }

    /// Converts the pending pulses into distance
    ///
    /// Runs entirely inside a critical section so no edge can be counted between
    /// reading and resetting the counters. Returns `None` without touching any
    /// state while every wheel is below half a turn worth of pulses.
    pub fn drain(&self) -> Option<DrainReport> {
        let threshold = self.calibration.drain_threshold();

        let report = critical_section::with(|cs| {
            let pulses = self.pulses.snapshot(cs);
            if pulses.iter().all(|&p| p < threshold) {
                return None;
            }

            let cell = self.distance_mm.borrow(cs);
            let mut distance_mm = cell.get();
            let mut added_mm = [0; NUM_WHEELS];
            for wheel in Wheel::ALL {
                let i = wheel.index();
                added_mm[i] = self.calibration.distance_mm(wheel, pulses[i]);
                distance_mm[i] = distance_mm[i].saturating_add(added_mm[i]);
            }
            cell.set(distance_mm);
            self.pulses.reset(cs);

            Some(DrainReport {
                pulses,
                added_mm,
                distance_mm,
            })
        });

        if let Some(report) = &report {
            trace!(
                "Drained pulses {:?} -> distance {:?} mm",
                report.pulses,
                report.distance_mm
            );
        }
        report
    }

    /// Cumulative distance of every wheel in millimetres
    pub fn distances(&self) -> [u32; NUM_WHEELS] {
        critical_section::with(|cs| self.distance_mm.borrow(cs).get())
    }

    /// Cumulative distance of `wheel` in millimetres
    pub fn distance(&self, wheel: Wheel) -> u32 {
        self.distances()[wheel.index()]
    }

    /// True once every wheel has covered at least `target_mm`
    pub fn all_reached(&self, target_mm: u32) -> bool {
        self.distances().iter().all(|&d| d >= target_mm)
    }

    /// Zeroes the cumulative distances, leaving pending pulses untouched
    pub fn reset_distances(&self) {
        critical_section::with(|cs| self.distance_mm.borrow(cs).set([0; NUM_WHEELS]));
    }
}

impl Default for OdometryAccumulator {
    fn default() -> Self {
        Self::new(WheelCalibration::DEFAULT)
    }
}
