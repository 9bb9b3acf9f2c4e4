//! KNX/IP routing-indication frames.
//!
//! Wire format (all multi-byte fields big-endian):
//! ```text
//! ┌──────────────────────── KNX/IP header (6B) ───────────────────────┐
//! │ hdr len 0x06 │ version 0x10 │ service 0x0530 (2B) │ total len (2B) │
//! ├──────────────────────────── cEMI ─────────────────────────────────┤
//! │ msg code 0x29 │ add-info len N │ add-info (N B)                    │
//! │ ctrl1 │ ctrl2 │ source (2B) │ destination (2B) │ data len L        │
//! │ TPCI/APCI │ data[0] … data[L-1]                                    │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The command type straddles two octets: bits 3..2 are the low two bits
//! of TPCI/APCI, bits 1..0 are the top two bits of `data[0]`.

use log::trace;

use crate::error::CodecError;

use super::address::Address;
use super::message::{CommandType, MAX_PAYLOAD, Message, Payload};

pub const HEADER_LEN: u8 = 0x06;
pub const PROTOCOL_VERSION: u8 = 0x10;
pub const SERVICE_ROUTING_INDICATION: u16 = 0x0530;
pub const CEMI_L_DATA_IND: u8 = 0x29;

/// Standard frame, do not repeat, broadcast, low priority.
const CONTROL1_DEFAULT: u8 = 0xBC;
/// Group destination, hop count 6, standard frame format.
const CONTROL2_DEFAULT: u8 = 0xE0;
const CONTROL2_GROUP_DEST: u8 = 0x80;

const CEMI_OFFSET: usize = HEADER_LEN as usize;
/// Bytes between the cEMI service start and `data[0]`.
const SERVICE_FIXED_LEN: usize = 8;

/// Largest frame this engine emits.
pub const MAX_FRAME: usize = CEMI_OFFSET + 2 + SERVICE_FIXED_LEN + MAX_PAYLOAD;

/// An encoded outbound frame.
pub type Frame = heapless::Vec<u8, MAX_FRAME>;

/// Decode a received datagram into a [`Message`].
///
/// Returns `None` for anything that is not a group-addressed data
/// indication: wrong header, other services, other cEMI message codes,
/// physical destinations, truncated frames. That is the common case on a
/// shared multicast segment, so nothing is reported beyond a trace log.
pub fn parse_frame(buf: &[u8], received_at_us: u64) -> Option<Message> {
    if buf.len() < CEMI_OFFSET + 2 {
        trace!("frame: {} bytes, too short", buf.len());
        return None;
    }
    if buf[0] != HEADER_LEN || buf[1] != PROTOCOL_VERSION {
        trace!("frame: header {:#04x}/{:#04x}", buf[0], buf[1]);
        return None;
    }
    let service = u16::from_be_bytes([buf[2], buf[3]]);
    if service != SERVICE_ROUTING_INDICATION {
        trace!("frame: service {service:#06x} ignored");
        return None;
    }
    let message_code = buf[CEMI_OFFSET];
    if message_code != CEMI_L_DATA_IND {
        trace!("frame: cEMI code {message_code:#04x} ignored");
        return None;
    }

    let service_start = CEMI_OFFSET + 2 + buf[CEMI_OFFSET + 1] as usize;
    let Some(svc) = buf.get(service_start..) else {
        trace!("frame: additional info overruns buffer");
        return None;
    };
    if svc.len() < SERVICE_FIXED_LEN {
        trace!("frame: cEMI service truncated");
        return None;
    }

    let control2 = svc[1];
    if control2 & CONTROL2_GROUP_DEST == 0 {
        trace!("frame: physical destination ignored");
        return None;
    }

    let source = Address::from_bytes([svc[2], svc[3]]);
    let destination = Address::from_bytes([svc[4], svc[5]]);
    let data_len = svc[6] as usize;
    let tpci = svc[7];
    if data_len == 0 || data_len > MAX_PAYLOAD {
        trace!("frame: data length {data_len} unsupported");
        return None;
    }
    let Some(data) = svc.get(SERVICE_FIXED_LEN..SERVICE_FIXED_LEN + data_len) else {
        trace!("frame: data truncated ({} of {data_len})", svc.len() - SERVICE_FIXED_LEN);
        return None;
    };

    let bits = (data[0] >> 6) | ((tpci & 0x03) << 2);
    let Some(command) = CommandType::from_bits(bits) else {
        trace!("frame: command {bits:#03x} unassigned");
        return None;
    };

    let mut payload = Payload::new();
    // data_len <= MAX_PAYLOAD was checked above.
    let _ = payload.extend_from_slice(data);
    payload[0] &= 0x3F;

    Some(Message {
        command,
        source,
        destination,
        payload,
        received_at_us,
    })
}

/// Encode a group telegram as a routing indication.
///
/// An empty payload is sent as a single zero carrier octet (e.g. a read
/// request).
pub fn build_frame(
    source: Address,
    destination: Address,
    command: CommandType,
    payload: &[u8],
) -> Result<Frame, CodecError> {
    if payload.len() > MAX_PAYLOAD {
        return Err(CodecError::PayloadTooLong);
    }
    let data: &[u8] = if payload.is_empty() { &[0x00] } else { payload };
    let total = CEMI_OFFSET + 2 + SERVICE_FIXED_LEN + data.len();
    let ct = command.bits();

    let mut frame = Frame::new();
    let [total_hi, total_lo] = (total as u16).to_be_bytes();
    let [svc_hi, svc_lo] = SERVICE_ROUTING_INDICATION.to_be_bytes();
    let [src_hi, src_lo] = source.to_bytes();
    let [dst_hi, dst_lo] = destination.to_bytes();
    let head = [
        HEADER_LEN,
        PROTOCOL_VERSION,
        svc_hi,
        svc_lo,
        total_hi,
        total_lo,
        CEMI_L_DATA_IND,
        0x00,
        CONTROL1_DEFAULT,
        CONTROL2_DEFAULT,
        src_hi,
        src_lo,
        dst_hi,
        dst_lo,
        data.len() as u8,
        (ct & 0x0C) >> 2,
    ];
    frame
        .extend_from_slice(&head)
        .and_then(|()| frame.extend_from_slice(data))
        .map_err(|()| CodecError::PayloadTooLong)?;
    let first = CEMI_OFFSET + 2 + SERVICE_FIXED_LEN;
    frame[first] = (frame[first] & 0x3F) | ((ct & 0x03) << 6);
    Ok(frame)
}
