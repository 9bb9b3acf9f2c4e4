//! Datapoint codec.
//!
//! Converts between typed values and the application-data octets of a
//! group telegram. Payload layout follows the frame: octet 0 is the carrier
//! octet whose top two bits belong to the command type. Datapoints of six
//! bits or less live in its low bits; every larger datapoint leaves it zero
//! and starts at octet 1.
//!
//! The 2-byte float (DPT 9) is `MEEE EMMM MMMM MMMM`: an 11-bit two's
//! complement mantissa (sign bit plus 11 bits), a 4-bit exponent, and
//! value = `0.01 * M * 2^E`. Out-of-range values saturate; `0x7FFF` is
//! the "invalid" marker and maps to and from NaN.

use crate::error::CodecError;

use super::message::{MAX_PAYLOAD, Payload};

/// Largest value representable as a 2-byte float. `0x7FFF` would be
/// 670 760.96 but is reserved for "invalid".
pub const FLOAT16_MAX: f32 = 670_433.28;
/// Smallest value representable as a 2-byte float.
pub const FLOAT16_MIN: f32 = -671_088.64;

/// DPT 9 "invalid data" pattern.
const FLOAT16_INVALID: [u8; 2] = [0x7F, 0xFF];

const STRING14_LEN: usize = 14;

/// Encode a 2-byte float. Saturates outside [`FLOAT16_MIN`]..=[`FLOAT16_MAX`];
/// NaN encodes as `0x7FFF`, the DPT 9 "invalid" pattern.
pub fn encode_2byte_float(value: f32) -> [u8; 2] {
    if value.is_nan() {
        return FLOAT16_INVALID;
    }
    let clamped = f64::from(value.clamp(FLOAT16_MIN, FLOAT16_MAX));
    let mut m = clamped * 100.0;
    let mut e: u8 = 0;
    while (m > 2047.0 || m < -2048.0) && e < 15 {
        m /= 2.0;
        e += 1;
    }
    let mantissa = (m.round() as i32).clamp(-2048, 2047);
    let bits = (mantissa as u16) & 0x07FF;
    let mut msb = (e << 3) | (bits >> 8) as u8;
    if mantissa < 0 {
        msb |= 0x80;
    }
    [msb, bits as u8]
}

/// Decode a 2-byte float. `0x7FFF` ("invalid") decodes as NaN.
pub fn decode_2byte_float(bytes: [u8; 2]) -> f32 {
    if bytes == FLOAT16_INVALID {
        return f32::NAN;
    }
    let [msb, lsb] = bytes;
    let mut mantissa = (i32::from(msb & 0x07) << 8) | i32::from(lsb);
    if msb & 0x80 != 0 {
        mantissa -= 2048;
    }
    let exponent = (msb >> 3) & 0x0F;
    (0.01 * f64::from(mantissa) * f64::from(1u32 << exponent)) as f32
}

// ───────────────────────────────────────────────────────────────
// Composite value types
// ───────────────────────────────────────────────────────────────

/// DPT 10 time of day. `weekday` 0 = no day, 1 = Monday … 7 = Sunday.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeOfDay {
    pub weekday: u8,
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
}

/// DPT 11 date. `year` is 0–99.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Date {
    pub day: u8,
    pub month: u8,
    pub year: u8,
}

/// DPT 232 RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

// ───────────────────────────────────────────────────────────────
// Outbound
// ───────────────────────────────────────────────────────────────

/// A typed value to transmit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Datapoint<'a> {
    Bool(bool),
    TwoBit(u8),
    FourBit(u8),
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    Float16(f32),
    Time(TimeOfDay),
    Date(Date),
    Color(Color),
    I32(i32),
    U32(u32),
    Float32(f32),
    /// Up to 14 characters; longer strings are cut at 14 bytes.
    String14(&'a str),
}

impl Datapoint<'_> {
    /// Encode into telegram payload octets, carrier octet included.
    pub fn encode(&self) -> Payload {
        let mut buf = [0u8; MAX_PAYLOAD];
        let len = match *self {
            Self::Bool(b) => {
                buf[0] = u8::from(b);
                1
            }
            Self::TwoBit(v) => {
                buf[0] = v & 0x03;
                1
            }
            Self::FourBit(v) => {
                buf[0] = v & 0x0F;
                1
            }
            Self::I8(v) => put(&mut buf, &v.to_be_bytes()),
            Self::U8(v) => put(&mut buf, &[v]),
            Self::I16(v) => put(&mut buf, &v.to_be_bytes()),
            Self::U16(v) => put(&mut buf, &v.to_be_bytes()),
            Self::Float16(v) => put(&mut buf, &encode_2byte_float(v)),
            Self::Time(t) => put(
                &mut buf,
                &[
                    ((t.weekday << 5) & 0xE0) | (t.hours & 0x1F),
                    t.minutes & 0x3F,
                    t.seconds & 0x3F,
                ],
            ),
            Self::Date(d) => put(&mut buf, &[d.day & 0x1F, d.month & 0x0F, d.year & 0x7F]),
            Self::Color(c) => put(&mut buf, &[c.red, c.green, c.blue]),
            Self::I32(v) => put(&mut buf, &v.to_be_bytes()),
            Self::U32(v) => put(&mut buf, &v.to_be_bytes()),
            Self::Float32(v) => put(&mut buf, &v.to_be_bytes()),
            Self::String14(s) => {
                let raw = s.as_bytes();
                let n = raw.len().min(STRING14_LEN);
                buf[1..=n].copy_from_slice(&raw[..n]);
                1 + STRING14_LEN
            }
        };
        let mut out = Payload::new();
        // len <= MAX_PAYLOAD for every arm.
        let _ = out.extend_from_slice(&buf[..len]);
        out
    }
}

/// Place `value` after a zero carrier octet; returns the payload length.
fn put(buf: &mut [u8; MAX_PAYLOAD], value: &[u8]) -> usize {
    buf[1..=value.len()].copy_from_slice(value);
    1 + value.len()
}

// ───────────────────────────────────────────────────────────────
// Inbound
// ───────────────────────────────────────────────────────────────

fn need(payload: &[u8], needed: usize) -> Result<(), CodecError> {
    if payload.len() < needed {
        return Err(CodecError::PayloadTooShort {
            needed,
            got: payload.len(),
        });
    }
    Ok(())
}

fn word(payload: &[u8]) -> Result<[u8; 2], CodecError> {
    need(payload, 3)?;
    Ok([payload[1], payload[2]])
}

fn dword(payload: &[u8]) -> Result<[u8; 4], CodecError> {
    need(payload, 5)?;
    Ok([payload[1], payload[2], payload[3], payload[4]])
}

pub fn decode_bool(payload: &[u8]) -> Result<bool, CodecError> {
    need(payload, 1)?;
    Ok(payload[0] & 0x01 != 0)
}

pub fn decode_2bit(payload: &[u8]) -> Result<u8, CodecError> {
    need(payload, 1)?;
    Ok(payload[0] & 0x03)
}

pub fn decode_4bit(payload: &[u8]) -> Result<u8, CodecError> {
    need(payload, 1)?;
    Ok(payload[0] & 0x0F)
}

pub fn decode_1byte_uint(payload: &[u8]) -> Result<u8, CodecError> {
    need(payload, 2)?;
    Ok(payload[1])
}

pub fn decode_1byte_int(payload: &[u8]) -> Result<i8, CodecError> {
    decode_1byte_uint(payload).map(|v| v as i8)
}

pub fn decode_2byte_uint(payload: &[u8]) -> Result<u16, CodecError> {
    word(payload).map(u16::from_be_bytes)
}

pub fn decode_2byte_int(payload: &[u8]) -> Result<i16, CodecError> {
    word(payload).map(i16::from_be_bytes)
}

/// Decode a 2-byte float from a telegram payload.
pub fn decode_float16(payload: &[u8]) -> Result<f32, CodecError> {
    word(payload).map(decode_2byte_float)
}

pub fn decode_time(payload: &[u8]) -> Result<TimeOfDay, CodecError> {
    need(payload, 4)?;
    Ok(TimeOfDay {
        weekday: (payload[1] & 0xE0) >> 5,
        hours: payload[1] & 0x1F,
        minutes: payload[2] & 0x3F,
        seconds: payload[3] & 0x3F,
    })
}

pub fn decode_date(payload: &[u8]) -> Result<Date, CodecError> {
    need(payload, 4)?;
    Ok(Date {
        day: payload[1] & 0x1F,
        month: payload[2] & 0x0F,
        year: payload[3] & 0x7F,
    })
}

pub fn decode_color(payload: &[u8]) -> Result<Color, CodecError> {
    need(payload, 4)?;
    Ok(Color {
        red: payload[1],
        green: payload[2],
        blue: payload[3],
    })
}

pub fn decode_4byte_uint(payload: &[u8]) -> Result<u32, CodecError> {
    dword(payload).map(u32::from_be_bytes)
}

pub fn decode_4byte_int(payload: &[u8]) -> Result<i32, CodecError> {
    dword(payload).map(i32::from_be_bytes)
}

pub fn decode_4byte_float(payload: &[u8]) -> Result<f32, CodecError> {
    dword(payload).map(f32::from_be_bytes)
}

/// Decode a 14-byte string, stopping at the first NUL.
pub fn decode_string14(payload: &[u8]) -> Result<heapless::String<STRING14_LEN>, CodecError> {
    need(payload, 2)?;
    let chars = &payload[1..payload.len().min(1 + STRING14_LEN)];
    let mut out = heapless::String::new();
    for &b in chars.iter().take_while(|&&b| b != 0) {
        // DPT 16.000 is ASCII; map anything else to '?'.
        let c = if b.is_ascii() { char::from(b) } else { '?' };
        let _ = out.push(c);
    }
    Ok(out)
}
