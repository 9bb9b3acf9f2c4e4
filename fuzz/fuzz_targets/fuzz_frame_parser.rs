//! Fuzz target: `parse_frame`
//!
//! Drives arbitrary datagrams into the routing-indication parser and
//! asserts that it never panics, never yields an oversized payload, and
//! that anything it accepts re-encodes to a frame it accepts again.
//!
//! cargo fuzz run fuzz_frame_parser

#![no_main]

use knxip::protocol::{MAX_PAYLOAD, build_frame, parse_frame};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some(msg) = parse_frame(data, 0) else {
        return;
    };
    assert!(!msg.payload.is_empty() && msg.payload.len() <= MAX_PAYLOAD);
    assert_eq!(msg.payload[0] & 0xC0, 0, "command bits leaked into payload");

    let frame = build_frame(msg.source, msg.destination, msg.command, &msg.payload)
        .expect("parsed payload always fits a frame");
    let again = parse_frame(&frame, 0).expect("built frame must parse");
    assert_eq!(again.command, msg.command);
    assert_eq!(again.destination, msg.destination);
    assert_eq!(again.payload, msg.payload);
});
