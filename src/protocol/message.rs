//! Decoded group telegrams.

use super::address::Address;

/// Application data octets of a standard frame, carrier octet included.
pub const MAX_PAYLOAD: usize = 15;

/// Telegram payload buffer.
pub type Payload = heapless::Vec<u8, MAX_PAYLOAD>;

/// Operation a telegram requests against its destination.
///
/// The 4-bit value is split on the wire: the high two bits sit in the low
/// bits of the TPCI/APCI octet, the low two bits in the top of the first
/// data octet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandType {
    Read = 0x00,
    Answer = 0x01,
    Write = 0x02,
    IndividualAddrWrite = 0x03,
    IndividualAddrRequest = 0x04,
    IndividualAddrResponse = 0x05,
    AdcRead = 0x06,
    AdcAnswer = 0x07,
    MemRead = 0x08,
    MemAnswer = 0x09,
    MemWrite = 0x0A,
    MaskVersionRead = 0x0C,
    MaskVersionResponse = 0x0D,
    Restart = 0x0E,
    Escape = 0x0F,
}

impl CommandType {
    /// Decode a 4-bit command value. `0x0B` is unassigned.
    pub const fn from_bits(bits: u8) -> Option<Self> {
        Some(match bits & 0x0F {
            0x00 => Self::Read,
            0x01 => Self::Answer,
            0x02 => Self::Write,
            0x03 => Self::IndividualAddrWrite,
            0x04 => Self::IndividualAddrRequest,
            0x05 => Self::IndividualAddrResponse,
            0x06 => Self::AdcRead,
            0x07 => Self::AdcAnswer,
            0x08 => Self::MemRead,
            0x09 => Self::MemAnswer,
            0x0A => Self::MemWrite,
            0x0C => Self::MaskVersionRead,
            0x0D => Self::MaskVersionResponse,
            0x0E => Self::Restart,
            0x0F => Self::Escape,
            _ => return None,
        })
    }

    pub const fn bits(self) -> u8 {
        self as u8
    }
}

/// One inbound group telegram. Built per frame, handed to the matching
/// callbacks, then dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub command: CommandType,
    pub source: Address,
    pub destination: Address,
    /// Application data with the command bits masked out of octet 0.
    pub payload: Payload,
    /// Monotonic receive time in microseconds.
    pub received_at_us: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_bits_roundtrip_except_unassigned() {
        for bits in 0u8..16 {
            match CommandType::from_bits(bits) {
                Some(ct) => assert_eq!(ct.bits(), bits),
                None => assert_eq!(bits, 0x0B),
            }
        }
    }
}
