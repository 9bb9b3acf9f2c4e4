//! Admin-page submissions, from form fields to engine state.

use std::cell::Cell;
use std::rc::Rc;

use knxip::app::{AdminError, AdminOutcome, AdminRequest};
use knxip::config::EngineConfig;
use knxip::dispatch::{AssignmentId, CallbackId};
use knxip::error::{AddressError, Error, RegistryError};
use knxip::protocol::Address;
use knxip::registry::{ConfigId, OptionEntry};
use knxip::KnxEngine;

use super::mock::MemStore;

static FAN: [OptionEntry; 3] = [
    OptionEntry { name: "Off", value: 0 },
    OptionEntry { name: "Low", value: 1 },
    OptionEntry { name: "High", value: 3 },
];

struct Rig {
    engine: KnxEngine,
    store: MemStore,
    pressed: Rc<Cell<u32>>,
}

const ROOM: ConfigId = ConfigId(0);
const INTERVAL: ConfigId = ConfigId(1);
const ECO: ConfigId = ConfigId(2);
const FAN_SPEED: ConfigId = ConfigId(3);
const STATUS_GA: ConfigId = ConfigId(4);

fn rig() -> Rig {
    let mut engine = KnxEngine::new(EngineConfig::default()).unwrap();
    engine
        .dispatch_mut()
        .register_callback("Light", |_| {}, None)
        .unwrap();
    let c = engine.configs_mut();
    c.register_string("Room", 8, "Hall", None).unwrap();
    c.register_int("Interval", 60, None).unwrap();
    c.register_bool("Eco", true, None).unwrap();
    c.register_options("Fan", &FAN, 1, None).unwrap();
    c.register_group_address("Status GA", None).unwrap();

    let pressed = Rc::new(Cell::new(0));
    let p = pressed.clone();
    let f = engine.feedbacks_mut();
    f.register_int("Uptime", || 42, None).unwrap();
    f.register_action("Identify", move || p.set(p.get() + 1), None)
        .unwrap();

    let store = MemStore::new();
    engine.load(&store).unwrap();
    Rig {
        engine,
        store,
        pressed,
    }
}

impl Rig {
    fn submit(&mut self, action: &str, fields: &[(&str, &str)]) -> Result<AdminOutcome, AdminError> {
        let request = AdminRequest::from_form(action, fields)?;
        self.engine.handle_admin(request, &mut self.store)
    }
}

#[test]
fn register_then_delete_assignment() {
    let mut r = rig();
    let ga = [("area", "1"), ("line", "2"), ("member", "3"), ("cb", "0")];
    assert_eq!(r.submit("register", &ga), Ok(AdminOutcome::Applied));
    assert_eq!(r.engine.dispatch().assignments().len(), 1);
    assert_eq!(
        r.engine.dispatch().assignments()[0].address,
        Address::group(1, 2, 3).unwrap()
    );

    assert_eq!(r.submit("delete", &[("id", "0")]), Ok(AdminOutcome::Applied));
    assert!(r.engine.dispatch().assignments().is_empty());
    // Assignments are live only until saved.
    assert_eq!(r.store.writes.get(), 0);
}

#[test]
fn register_rejects_unknown_callback_and_bad_address() {
    let mut r = rig();
    assert_eq!(
        r.submit("register", &[("area", "1"), ("line", "2"), ("member", "3"), ("cb", "5")]),
        Err(AdminError::Engine(Error::Registry(RegistryError::UnknownId)))
    );
    assert_eq!(
        r.submit("register", &[("area", "32"), ("line", "0"), ("member", "1"), ("cb", "0")]),
        Err(AdminError::Engine(Error::Address(AddressError::AreaOutOfRange(32))))
    );
    assert!(r.engine.dispatch().assignments().is_empty());
}

#[test]
fn delete_out_of_range_is_error() {
    let mut r = rig();
    assert_eq!(
        r.engine
            .handle_admin(AdminRequest::Unassign(AssignmentId(3)), &mut r.store),
        Err(AdminError::Engine(Error::Registry(RegistryError::UnknownId)))
    );
}

#[test]
fn physical_address_update() {
    let mut r = rig();
    r.submit("phys", &[("area", "2"), ("line", "3"), ("member", "40")])
        .unwrap();
    assert_eq!(r.engine.physical_address(), Address::physical(2, 3, 40).unwrap());

    assert_eq!(
        r.submit("phys", &[("area", "2"), ("line", "16"), ("member", "40")]),
        Err(AdminError::Engine(Error::Address(AddressError::LineOutOfRange(16))))
    );
    assert_eq!(r.engine.physical_address(), Address::physical(2, 3, 40).unwrap());
}

#[test]
fn config_updates_by_kind() {
    let mut r = rig();
    r.submit("config", &[("id", "0"), ("value", "Kitchen")]).unwrap();
    r.submit("config", &[("id", "1"), ("value", " 120 ")]).unwrap();
    r.submit("config", &[("id", "3"), ("value", "3")]).unwrap();
    r.submit(
        "config",
        &[("id", "4"), ("area", "4"), ("line", "0"), ("member", "9")],
    )
    .unwrap();

    let c = r.engine.configs();
    assert_eq!(c.get_string(ROOM).unwrap(), "Kitchen");
    assert_eq!(c.get_int(INTERVAL).unwrap(), 120);
    assert_eq!(c.get_option(FAN_SPEED).unwrap(), 3);
    assert_eq!(c.get_group_address(STATUS_GA).unwrap(), Address::group(4, 0, 9).unwrap());
}

#[test]
fn unchecked_checkbox_clears_bool() {
    let mut r = rig();
    assert!(r.engine.configs().get_bool(ECO).unwrap());
    r.submit("config", &[("id", "2")]).unwrap();
    assert!(!r.engine.configs().get_bool(ECO).unwrap());
    r.submit("config", &[("id", "2"), ("value", "on")]).unwrap();
    assert!(r.engine.configs().get_bool(ECO).unwrap());
}

#[test]
fn invalid_config_input_changes_nothing() {
    let mut r = rig();
    let before = *r.engine.configs().blob();

    assert_eq!(
        r.submit("config", &[("id", "3"), ("value", "2")]),
        Err(AdminError::Engine(Error::Registry(RegistryError::UnknownOption)))
    );
    assert_eq!(
        r.submit("config", &[("id", "0"), ("value", "Conference room")]),
        Err(AdminError::Engine(Error::Registry(RegistryError::ValueTooLong)))
    );
    assert_eq!(
        r.submit("config", &[("id", "0"), ("value", "Ha\0ll")]),
        Err(AdminError::Engine(Error::Registry(RegistryError::InvalidValue)))
    );
    assert_eq!(
        r.submit("config", &[("id", "1"), ("value", "sixty")]),
        Err(AdminError::InvalidField("value"))
    );
    assert_eq!(
        r.submit("config", &[("id", "4")]),
        Err(AdminError::MissingField("area"))
    );
    assert_eq!(
        r.submit("config", &[("id", "19"), ("value", "1")]),
        Err(AdminError::Engine(Error::Registry(RegistryError::UnknownId)))
    );

    assert_eq!(r.engine.configs().blob(), &before);
}

#[test]
fn feedback_action_runs_and_value_binding_refuses() {
    let mut r = rig();
    r.submit("feedback", &[("id", "1")]).unwrap();
    r.submit("feedback", &[("id", "1")]).unwrap();
    assert_eq!(r.pressed.get(), 2);

    assert_eq!(
        r.submit("feedback", &[("id", "0")]),
        Err(AdminError::Engine(Error::Registry(RegistryError::NotAnAction)))
    );
}

#[test]
fn eeprom_save_and_restore() {
    let mut r = rig();
    assert_eq!(
        r.submit("eeprom", &[("mode", "2")]),
        Ok(AdminOutcome::NothingStored)
    );

    r.submit("config", &[("id", "0"), ("value", "Attic")]).unwrap();
    assert_eq!(r.submit("eeprom", &[("mode", "1")]), Ok(AdminOutcome::Applied));

    r.submit("config", &[("id", "0"), ("value", "Cellar")]).unwrap();
    assert_eq!(r.submit("eeprom", &[("mode", "2")]), Ok(AdminOutcome::Applied));
    assert_eq!(r.engine.configs().get_string(ROOM).unwrap(), "Attic");

    assert_eq!(
        r.submit("eeprom", &[("mode", "3")]),
        Err(AdminError::InvalidField("mode"))
    );
}

#[test]
fn restore_resets_config_but_keeps_assignments() {
    let mut r = rig();
    r.engine
        .handle_admin(
            AdminRequest::Assign {
                address: Address::group(1, 1, 1).unwrap(),
                callback: CallbackId(0),
            },
            &mut r.store,
        )
        .unwrap();
    r.submit("config", &[("id", "1"), ("value", "5")]).unwrap();

    r.submit("restore", &[]).unwrap();
    assert_eq!(r.engine.configs().get_int(INTERVAL).unwrap(), 60);
    assert!(!r.engine.configs().is_value_set(INTERVAL).unwrap());
    assert_eq!(r.engine.dispatch().assignments().len(), 1);
}

#[test]
fn reboot_is_handed_back_to_host() {
    let mut r = rig();
    assert_eq!(r.submit("reboot", &[]), Ok(AdminOutcome::RebootRequested));
    assert_eq!(r.submit("shutdown", &[]), Err(AdminError::UnknownAction));
}
