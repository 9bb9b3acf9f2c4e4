//! Receive path: datagram → parser → dispatch table → callbacks.

use std::cell::RefCell;
use std::rc::Rc;

use knxip::config::{DispatchPolicy, EngineConfig, RX_BUFFER_SIZE};
use knxip::dispatch::AssignmentId;
use knxip::protocol::dpt::{self, Datapoint};
use knxip::protocol::{Address, CommandType, Message};
use knxip::{KnxEngine, PollOutcome};

use super::mock::{FixedClock, MockTransport, telegram};

fn engine(policy: DispatchPolicy) -> KnxEngine {
    KnxEngine::new(EngineConfig {
        dispatch_policy: policy,
        ..Default::default()
    })
    .unwrap()
}

type Seen = Rc<RefCell<Vec<(&'static str, Message)>>>;

fn recorder(seen: &Seen, tag: &'static str) -> impl FnMut(&Message) + 'static {
    let seen = seen.clone();
    move |msg: &Message| seen.borrow_mut().push((tag, msg.clone()))
}

#[test]
fn setpoint_write_reaches_callback_once() {
    let seen: Seen = Rc::default();
    let mut engine = engine(DispatchPolicy::FirstMatch);
    let ga = Address::group(3, 1, 0).unwrap();
    let cb = engine
        .dispatch_mut()
        .register_callback("SetpointReceived", recorder(&seen, "sp"), None)
        .unwrap();
    engine.dispatch_mut().assign(ga, cb).unwrap();

    let mut t = MockTransport::new();
    t.push(&telegram(CommandType::Write, ga, &Datapoint::Float16(21.5).encode()));
    let clock = FixedClock(1_234);

    assert_eq!(engine.poll(&mut t, &clock), PollOutcome::Dispatched(1));
    assert_eq!(engine.poll(&mut t, &clock), PollOutcome::Idle);

    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    let msg = &seen[0].1;
    assert_eq!(msg.command, CommandType::Write);
    assert_eq!(msg.destination, ga);
    assert_eq!(msg.received_at_us, 1_234);
    let v = dpt::decode_float16(&msg.payload).unwrap();
    assert!((v - 21.5).abs() < 0.01, "decoded {v}");
}

#[test]
fn shared_address_fans_out_only_when_allowed() {
    for (policy, expected) in [
        (DispatchPolicy::FanOut, vec!["a", "b"]),
        (DispatchPolicy::FirstMatch, vec!["a"]),
        (DispatchPolicy::FirstEnabledMatch, vec!["a"]),
    ] {
        let seen: Seen = Rc::default();
        let mut engine = engine(policy);
        let ga = Address::group(1, 2, 3).unwrap();
        let d = engine.dispatch_mut();
        let a = d.register_callback("a", recorder(&seen, "a"), None).unwrap();
        let b = d.register_callback("b", recorder(&seen, "b"), None).unwrap();
        d.assign(ga, a).unwrap();
        d.assign(ga, b).unwrap();

        let mut t = MockTransport::new();
        t.push(&telegram(CommandType::Write, ga, &[0x01]));
        engine.poll(&mut t, &FixedClock(0));

        let tags: Vec<_> = seen.borrow().iter().map(|(tag, _)| *tag).collect();
        assert_eq!(tags, expected, "{policy:?}");
    }
}

#[test]
fn unrelated_addresses_and_garbage_do_not_dispatch() {
    let seen: Seen = Rc::default();
    let mut engine = engine(DispatchPolicy::FanOut);
    let cb = engine
        .dispatch_mut()
        .register_callback("cb", recorder(&seen, "cb"), None)
        .unwrap();
    engine
        .dispatch_mut()
        .assign(Address::group(1, 0, 0).unwrap(), cb)
        .unwrap();

    let mut t = MockTransport::new();
    t.push(&telegram(CommandType::Write, Address::group(1, 0, 1).unwrap(), &[0x01]));
    t.push(&[0xFF; 20]);
    t.push(&[]);

    let clock = FixedClock(0);
    assert_eq!(engine.poll(&mut t, &clock), PollOutcome::Dispatched(0));
    assert_eq!(engine.poll(&mut t, &clock), PollOutcome::Dropped);
    assert_eq!(engine.poll(&mut t, &clock), PollOutcome::Dropped);
    assert!(seen.borrow().is_empty());
}

#[test]
fn oversized_datagram_is_truncated_not_fatal() {
    let mut engine = engine(DispatchPolicy::FirstMatch);
    let mut t = MockTransport::new();
    let mut big = telegram(CommandType::Write, Address::group(1, 0, 0).unwrap(), &[0x01]);
    big.resize(RX_BUFFER_SIZE * 2, 0xAA);
    t.push(&big);
    // Still a well-formed telegram in its first RX_BUFFER_SIZE bytes.
    assert_eq!(engine.poll(&mut t, &FixedClock(0)), PollOutcome::Dispatched(0));
}

#[test]
fn transport_error_reports_idle() {
    let mut engine = engine(DispatchPolicy::FirstMatch);
    let mut t = MockTransport {
        fail_recv: true,
        ..Default::default()
    };
    assert_eq!(engine.poll(&mut t, &FixedClock(0)), PollOutcome::Idle);
}

#[test]
fn unassign_stops_delivery() {
    let seen: Seen = Rc::default();
    let mut engine = engine(DispatchPolicy::FanOut);
    let g1 = Address::group(2, 0, 1).unwrap();
    let g2 = Address::group(2, 0, 2).unwrap();
    let d = engine.dispatch_mut();
    let a = d.register_callback("a", recorder(&seen, "a"), None).unwrap();
    let b = d.register_callback("b", recorder(&seen, "b"), None).unwrap();
    d.assign(g1, a).unwrap();
    d.assign(g2, b).unwrap();
    d.unassign(AssignmentId(0)).unwrap();
    assert_eq!(d.assignments().len(), 1);
    assert_eq!(d.assignments()[0].address, g2);

    let mut t = MockTransport::new();
    t.push(&telegram(CommandType::Write, g1, &[0x01]));
    t.push(&telegram(CommandType::Write, g2, &[0x01]));
    engine.poll(&mut t, &FixedClock(0));
    engine.poll(&mut t, &FixedClock(0));

    let tags: Vec<_> = seen.borrow().iter().map(|(tag, _)| *tag).collect();
    assert_eq!(tags, ["b"]);
}

#[test]
fn read_requests_are_dispatched_with_command() {
    let seen: Seen = Rc::default();
    let mut engine = engine(DispatchPolicy::FirstMatch);
    let ga = Address::group(5, 5, 5).unwrap();
    let cb = engine
        .dispatch_mut()
        .register_callback("status", recorder(&seen, "s"), None)
        .unwrap();
    engine.dispatch_mut().assign(ga, cb).unwrap();

    let mut t = MockTransport::new();
    t.push(&telegram(CommandType::Read, ga, &[]));
    engine.poll(&mut t, &FixedClock(0));
    assert_eq!(seen.borrow()[0].1.command, CommandType::Read);
}
