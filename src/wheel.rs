//! Wheel identifiers
//!
//! The chassis always has four wheels. The order is significant: index 0 and 1
//! are the front pair, which drives the automatic light signalling.

/// Number of wheels on the chassis
pub const NUM_WHEELS: usize = 4;

/// Position of a wheel on the chassis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Wheel {
    FrontLeft,
    FrontRight,
    RearLeft,
    RearRight,
}

impl Wheel {
    /// All wheels in index order
    pub const ALL: [Wheel; NUM_WHEELS] = [
        Wheel::FrontLeft,
        Wheel::FrontRight,
        Wheel::RearLeft,
        Wheel::RearRight,
    ];

    /// Index of the wheel in per-wheel arrays
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Wheel at the given array index
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Wheel::FrontLeft),
            1 => Some(Wheel::FrontRight),
            2 => Some(Wheel::RearLeft),
            3 => Some(Wheel::RearRight),
            _ => None,
        }
    }

    pub const fn is_front(self) -> bool {
        matches!(self, Wheel::FrontLeft | Wheel::FrontRight)
    }
}
