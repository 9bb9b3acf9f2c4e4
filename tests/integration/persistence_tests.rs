//! Save / restore / load through the engine against an in-memory store.

use knxip::app::ports::StoragePort;
use knxip::config::{EngineConfig, STORAGE_MAGIC};
use knxip::dispatch::{Assignment, CallbackId};
use knxip::error::Error;
use knxip::persistence::{KEY_ASSIGNMENTS, KEY_CONFIG, KEY_MAGIC};
use knxip::protocol::Address;
use knxip::registry::ConfigId;
use knxip::KnxEngine;

use super::mock::MemStore;

const NS: &str = "knx";

/// An engine with the registrations a firmware would make at boot.
fn booted() -> KnxEngine {
    let mut engine = KnxEngine::new(EngineConfig::default()).unwrap();
    let d = engine.dispatch_mut();
    d.register_callback("SetpointReceived", |_| {}, None).unwrap();
    d.register_callback("ModeReceived", |_| {}, None).unwrap();
    let c = engine.configs_mut();
    c.register_string("Room", 16, "Living", None).unwrap();
    c.register_int("Interval", 60, None).unwrap();
    c.register_group_address("Status GA", None).unwrap();
    engine
}

fn configure(engine: &mut KnxEngine) {
    engine
        .dispatch_mut()
        .assign(Address::group(3, 1, 0).unwrap(), CallbackId(0))
        .unwrap();
    engine
        .dispatch_mut()
        .assign(Address::group(3, 4, 0).unwrap(), CallbackId(1))
        .unwrap();
    engine.set_physical_address(Address::physical(1, 1, 77).unwrap());
    let c = engine.configs_mut();
    c.set_string(ConfigId(0), "Kitchen").unwrap();
    c.set_int(ConfigId(1), 15).unwrap();
    c.set_group_address(ConfigId(2), Address::group(3, 5, 0).unwrap())
        .unwrap();
}

#[test]
fn state_survives_reboot() {
    let mut store = MemStore::new();
    let mut before = booted();
    before.load(&store).unwrap();
    configure(&mut before);
    before.save(&mut store).unwrap();

    let mut after = booted();
    assert!(after.load(&store).unwrap());

    assert_eq!(after.physical_address(), Address::physical(1, 1, 77).unwrap());
    assert_eq!(
        after.dispatch().assignments(),
        &[
            Assignment {
                address: Address::group(3, 1, 0).unwrap(),
                callback: CallbackId(0)
            },
            Assignment {
                address: Address::group(3, 4, 0).unwrap(),
                callback: CallbackId(1)
            },
        ]
    );
    let c = after.configs();
    assert_eq!(c.get_string(ConfigId(0)).unwrap(), "Kitchen");
    assert_eq!(c.get_int(ConfigId(1)).unwrap(), 15);
    assert!(c.is_value_set(ConfigId(1)).unwrap());
}

#[test]
fn magic_wipe_leaves_live_state_untouched() {
    let mut store = MemStore::new();
    let mut engine = booted();
    engine.load(&store).unwrap();
    configure(&mut engine);
    engine.save(&mut store).unwrap();

    store.delete(NS, KEY_MAGIC).unwrap();
    let config_before = *engine.configs().blob();

    assert!(!engine.restore(&store).unwrap());
    assert_eq!(engine.dispatch().assignments().len(), 2);
    assert_eq!(engine.physical_address(), Address::physical(1, 1, 77).unwrap());
    assert_eq!(engine.configs().blob(), &config_before);
}

#[test]
fn foreign_magic_is_no_prior_state() {
    let mut store = MemStore::new();
    let mut engine = booted();
    configure(&mut engine);
    engine.save(&mut store).unwrap();
    store.put_raw(NS, KEY_MAGIC, &(STORAGE_MAGIC ^ 0xFF00).to_le_bytes());

    let mut fresh = booted();
    assert!(!fresh.load(&store).unwrap());
    assert!(fresh.dispatch().assignments().is_empty());
    assert_eq!(fresh.configs().get_string(ConfigId(0)).unwrap(), "Living");
}

#[test]
fn corrupt_store_is_reported_and_not_applied() {
    let mut store = MemStore::new();
    let mut engine = booted();
    configure(&mut engine);
    engine.save(&mut store).unwrap();
    store.put_raw(NS, KEY_ASSIGNMENTS, &[0xFF, 0xFF, 0xFF]);

    let mut fresh = booted();
    assert!(matches!(fresh.load(&store), Err(Error::Persistence(_))));
    assert!(fresh.dispatch().assignments().is_empty());
    assert_eq!(fresh.physical_address(), Address::physical(1, 1, 0).unwrap());
    assert_eq!(fresh.configs().get_string(ConfigId(0)).unwrap(), "Living");
}

#[test]
fn save_writes_magic_last_and_full_blob() {
    let mut store = MemStore::new();
    let engine = booted();
    engine.save(&mut store).unwrap();
    assert_eq!(store.writes.get(), 5);
    assert_eq!(store.raw(NS, KEY_CONFIG).unwrap().len(), 512);
    assert_eq!(
        store.raw(NS, KEY_MAGIC).unwrap(),
        STORAGE_MAGIC.to_le_bytes().to_vec()
    );
}

#[test]
fn failed_save_surfaces_storage_error() {
    let mut store = MemStore::failing();
    let engine = booted();
    assert!(matches!(engine.save(&mut store), Err(Error::Storage(_))));
    assert!(!store.exists(NS, KEY_MAGIC));
}

#[test]
fn factory_reset_uses_boot_defaults_not_restored_values() {
    let mut store = MemStore::new();
    let mut engine = booted();
    configure(&mut engine);
    engine.save(&mut store).unwrap();

    let mut rebooted = booted();
    assert!(rebooted.load(&store).unwrap());
    assert_eq!(rebooted.configs().get_int(ConfigId(1)).unwrap(), 15);

    rebooted.restore_defaults();
    assert_eq!(rebooted.configs().get_int(ConfigId(1)).unwrap(), 60);
    assert_eq!(rebooted.configs().get_string(ConfigId(0)).unwrap(), "Living");
    assert!(!rebooted.configs().is_value_set(ConfigId(0)).unwrap());
    // Assignments are not part of the factory image.
    assert_eq!(rebooted.dispatch().assignments().len(), 2);
}
