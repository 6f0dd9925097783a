//! Queue lifecycle and initialization behavior through the public surface.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

mod common;

use common::{NoopDelay, RecordingI2c};
use motor_shield::registers::{channel_base, ALL_LED_OFF_H, MODE1, PRE_SCALE};
use motor_shield::{MotorDirection, MotorShield, ShieldConfig};
use std::sync::atomic::{AtomicBool, Ordering};

#[test]
fn a_full_session_produces_the_documented_wire_traffic() {
    let mut shield = MotorShield::new(RecordingI2c::default(), NoopDelay);
    shield.begin().unwrap();
    shield.set_motor_direction(1, MotorDirection::Forward).unwrap();
    shield.set_motor_percent(1, 50.0).unwrap();
    shield.write_servo(0, 100.0).unwrap();
    let (bus, _) = shield.release();

    // begin: all-off, sleep, prescale, wake. Then two direction writes, one
    // speed write, one servo write.
    assert_eq!(bus.writes.len(), 8);
    assert_eq!(bus.writes[0].1[0], ALL_LED_OFF_H);
    assert_eq!(bus.writes[1].1[0], MODE1);
    assert_eq!(bus.writes[2].1[0], PRE_SCALE);
    assert_eq!(bus.writes[3].1[0], MODE1);
    // Motor 1: direction channels 9 then 10, speed channel 8.
    assert_eq!(bus.writes[4].1[0], channel_base(9));
    assert_eq!(bus.writes[5].1[0], channel_base(10));
    assert_eq!(bus.writes[6].1[0], channel_base(8));
    assert_eq!(bus.writes[7].1[0], channel_base(0));
    for (address, _) in &bus.writes {
        assert_eq!(*address, 0x60);
    }
}

#[test]
fn begin_resets_slots_left_over_from_before_initialization() {
    let gate_open = AtomicBool::new(false);
    let mut shield = MotorShield::with_gate(
        RecordingI2c::default(),
        NoopDelay,
        ShieldConfig::default(),
        || gate_open.load(Ordering::Relaxed),
    );

    // Park a write, then re-initialize: the slot must not survive begin().
    shield.write_pwm(3, 11, 22).unwrap();
    gate_open.store(true, Ordering::Relaxed);
    shield.begin().unwrap();
    shield.resolve_queue().unwrap();
    let (bus, _) = shield.release();

    assert_eq!(bus.writes.len(), 4, "only the begin() frames may appear");
}

#[test]
fn closed_gate_defers_and_flush_replays_last_values_in_channel_order() {
    let gate_open = AtomicBool::new(true);
    let mut shield = MotorShield::with_gate(
        RecordingI2c::default(),
        NoopDelay,
        ShieldConfig::default(),
        || gate_open.load(Ordering::Relaxed),
    );
    shield.begin().unwrap();

    gate_open.store(false, Ordering::Relaxed);
    shield.set_motor_percent(2, 40.0).unwrap();
    shield.write_servo(0, 25.0).unwrap();
    shield.write_servo(0, 75.0).unwrap();
    gate_open.store(true, Ordering::Relaxed);
    shield.resolve_queue().unwrap();
    shield.resolve_queue().unwrap();
    let (bus, _) = shield.release();

    // Four begin() frames, then exactly one flush frame per touched channel:
    // nothing reached the bus while the gate was closed, the second flush
    // found the queue empty, and channel 0 (servo) precedes channel 13
    // (motor 2 speed).
    assert_eq!(bus.writes.len(), 6);
    // Only the 75% pulse survived the overwrite: position 24 → 520 ticks.
    assert_eq!(bus.writes[4].1, vec![channel_base(0), 0x00, 0x00, 0x08, 0x02]);
    assert_eq!(bus.writes[5].1[0], channel_base(13));
}

#[test]
fn flushing_an_empty_queue_is_a_no_op() {
    let mut shield = MotorShield::new(RecordingI2c::default(), NoopDelay);
    shield.resolve_queue().unwrap();
    let (bus, _) = shield.release();
    assert!(bus.writes.is_empty());
}
