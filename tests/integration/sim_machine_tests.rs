//! Settings persistence through the simulated machine's bootstrap.

use motionctl::adapters::eeprom::MemoryEeprom;
use motionctl::adapters::machine::SimMachine;
use motionctl::adapters::serial::RxChannel;
use motionctl::config::{BootPolicy, MachineConfig};
use motionctl::settings::{SETTINGS_VERSION, Settings, SettingsFlag};
use motionctl::supervisor::bootstrap;
use motionctl::system::{OperationalState, RealtimeFlags};

fn homing_lock_config() -> MachineConfig {
    MachineConfig {
        boot: BootPolicy {
            homing_init_lock: true,
            force_init_alarm: false,
        },
        ..MachineConfig::default()
    }
}

fn homing_image() -> Vec<u8> {
    let mut s = Settings::default();
    s.set_flag(SettingsFlag::HomingEnable, true);
    s.pulse_microseconds = 5;
    s.to_image().expect("encode")
}

#[test]
fn stored_settings_drive_boot_policy() {
    let rt = RealtimeFlags::new();
    let rx = RxChannel::new();
    let mut hw = SimMachine::new(&rx).with_eeprom(MemoryEeprom::with_image(homing_image()));

    let out = bootstrap(&homing_lock_config(), &rt, &mut hw);

    assert!(out.settings.homing_enabled());
    assert_eq!(out.settings.pulse_microseconds, 5);
    assert_eq!(out.sys.state, OperationalState::Alarm);
    assert_eq!(hw.settings_store.storage().writes(), 0);
    assert!(hw.serial.is_open());
    assert!(hw.pins_ready());
    assert!(hw.interrupts_enabled());
    assert!(hw.reset_button_armed());
}

#[test]
fn wrong_version_falls_back_and_rewrites() {
    let mut image = homing_image();
    image[0] = SETTINGS_VERSION.wrapping_add(1);

    let rt = RealtimeFlags::new();
    let rx = RxChannel::new();
    let mut hw = SimMachine::new(&rx).with_eeprom(MemoryEeprom::with_image(image));
    let out = bootstrap(&homing_lock_config(), &rt, &mut hw);

    assert_eq!(out.settings, Settings::default());
    assert_eq!(out.sys.state, OperationalState::Idle);
    assert_eq!(hw.settings_store.storage().writes(), 1);
    assert_eq!(hw.settings_store.read_settings().ok(), Some(Settings::default()));
}

#[test]
fn corrupted_checksum_falls_back_and_rewrites() {
    let mut image = homing_image();
    if let Some(sum) = image.last_mut() {
        *sum = sum.wrapping_add(1);
    }

    let rt = RealtimeFlags::new();
    let rx = RxChannel::new();
    let mut hw = SimMachine::new(&rx).with_eeprom(MemoryEeprom::with_image(image));
    let out = bootstrap(&MachineConfig::default(), &rt, &mut hw);

    assert_eq!(out.settings, Settings::default());
    assert_eq!(hw.settings_store.storage().writes(), 1);
}

#[test]
fn blank_eeprom_persists_defaults_once() {
    let rt = RealtimeFlags::new();
    let rx = RxChannel::new();
    let mut hw = SimMachine::new(&rx);
    bootstrap(&MachineConfig::default(), &rt, &mut hw);
    assert_eq!(hw.settings_store.storage().writes(), 1);

    let image = hw.settings_store.storage().image().map(<[u8]>::to_vec);
    let mut again = SimMachine::new(&rx).with_eeprom(MemoryEeprom::with_image(
        image.expect("defaults written"),
    ));
    bootstrap(&MachineConfig::default(), &rt, &mut again);
    assert_eq!(again.settings_store.storage().writes(), 0);
}

#[test]
fn missing_secondary_channel_is_tolerated() {
    let rt = RealtimeFlags::new();
    let rx = RxChannel::new();
    let mut config = MachineConfig::default();
    config.comm.secondary_channel = true;
    let mut hw = SimMachine::new(&rx);

    let out = bootstrap(&config, &rt, &mut hw);
    assert_eq!(out.sys.state, OperationalState::Idle);
    assert!(hw.serial2.is_none());
    assert!(hw.serial.is_open());
}
