//! KNX addresses.
//!
//! Both address kinds share one 16-bit wire encoding, big-endian on the
//! wire, with the area/line fields packed into the high byte and the member
//! in the low byte:
//!
//! ```text
//!              high byte                low byte
//! physical   AAAA LLLL                MMMM MMMM    area 0-15, line 0-15
//! group      AAAA ALLL                MMMM MMMM    area 0-31, line 0-7
//! ```
//!
//! An [`Address`] does not remember which interpretation produced it. The
//! caller picks the interpretation when decoding; decoding a group address
//! with [`Address::physical_fields`] (or the reverse) silently yields wrong
//! area/line values. This mirrors the wire format, where the destination
//! type is a separate bit in the frame, and costs nothing for callers that
//! already know which kind they hold.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AddressError;

const PHYSICAL_AREA_MAX: u8 = 15;
const PHYSICAL_LINE_MAX: u8 = 15;
const GROUP_AREA_MAX: u8 = 31;
const GROUP_LINE_MAX: u8 = 7;

/// A raw 16-bit KNX address. Equality is on the raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Address(u16);

impl Address {
    /// Encode a physical (individual) address `area.line.member`.
    pub fn physical(area: u8, line: u8, member: u8) -> Result<Self, AddressError> {
        if area > PHYSICAL_AREA_MAX {
            return Err(AddressError::AreaOutOfRange(area));
        }
        if line > PHYSICAL_LINE_MAX {
            return Err(AddressError::LineOutOfRange(line));
        }
        Ok(Self::from_bytes([(area << 4) | line, member]))
    }

    /// Encode a 3-level group address `area/line/member`.
    pub fn group(area: u8, line: u8, member: u8) -> Result<Self, AddressError> {
        if area > GROUP_AREA_MAX {
            return Err(AddressError::AreaOutOfRange(area));
        }
        if line > GROUP_LINE_MAX {
            return Err(AddressError::LineOutOfRange(line));
        }
        Ok(Self::from_bytes([(area << 3) | line, member]))
    }

    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Wire order: `[high, low]`.
    pub const fn from_bytes(bytes: [u8; 2]) -> Self {
        Self(u16::from_be_bytes(bytes))
    }

    pub const fn to_bytes(self) -> [u8; 2] {
        self.0.to_be_bytes()
    }

    /// Decode as a physical address.
    pub const fn physical_fields(self) -> PhysicalFields {
        let [high, low] = self.to_bytes();
        PhysicalFields {
            area: high >> 4,
            line: high & 0x0F,
            member: low,
        }
    }

    /// Decode as a group address.
    pub const fn group_fields(self) -> GroupFields {
        let [high, low] = self.to_bytes();
        GroupFields {
            area: high >> 3,
            line: high & 0x07,
            member: low,
        }
    }
}

/// A physical address split into its fields. Displays as `area.line.member`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicalFields {
    pub area: u8,
    pub line: u8,
    pub member: u8,
}

impl fmt::Display for PhysicalFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.area, self.line, self.member)
    }
}

/// A group address split into its fields. Displays as `area/line/member`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupFields {
    pub area: u8,
    pub line: u8,
    pub member: u8,
}

impl fmt::Display for GroupFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.area, self.line, self.member)
    }
}
