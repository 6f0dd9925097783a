//! The shield controller: initialization, register writes, channel model,
//! and the deferred-write queue.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::PinState;
use embedded_hal::i2c::I2c;
use heapless::Vec;

use crate::error::Error;
use crate::gate::{AlwaysReady, BusGate};
use crate::motor::{motor_channels, MotorDirection};
use crate::registers::{
    channel_base, prescale_value, split_ticks, ALL_LED_OFF_H, CHANNEL_COUNT, DEFAULT_ADDRESS,
    DEFAULT_REFRESH_HZ, FULL_SCALE_FLAG, INTERNAL_OSC_HZ, MODE1, MODE1_AUTO_INCREMENT,
    MODE1_SLEEP, PRE_SCALE, TICKS_PER_CYCLE, TICK_MASK,
};
use crate::servo;

/// Largest transaction the driver assembles: one register address plus the
/// full 16-channel bank of 16-bit pairs.
const MAX_TRANSACTION: usize = 1 + CHANNEL_COUNT * 4;

/// Byte order for 16-bit register writes.
///
/// The channel timing groups are laid out low-byte-first; other chips hung
/// off the same write path may want the opposite, so the order is chosen per
/// call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ByteOrder {
    /// Least significant byte first.
    LsbFirst,
    /// Most significant byte first.
    MsbFirst,
}

/// Construction-time configuration.
///
/// The refresh rate is fixed once at initialization through the prescaler;
/// runtime reconfiguration is out of scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ShieldConfig {
    /// 7-bit I2C device address.
    pub address: u8,
    /// Frequency of the oscillator feeding the PWM counter, in Hz.
    pub osc_hz: u32,
    /// PWM refresh rate in Hz.
    pub refresh_hz: u32,
}

impl Default for ShieldConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS,
            osc_hz: INTERNAL_OSC_HZ,
            refresh_hz: DEFAULT_REFRESH_HZ,
        }
    }
}

/// Driver for a PCA9685-based 16-channel PWM motor/servo shield.
///
/// Owns the bus handle, the delay provider, the gate, and the per-channel
/// pending-write queue. All channel operations funnel through
/// [`write_pwm`](Self::write_pwm), which either performs the register write
/// synchronously or, when the gate reports the bus unusable, parks the
/// timing pair until [`resolve_queue`](Self::resolve_queue).
pub struct MotorShield<I2C, D, G = AlwaysReady> {
    i2c: I2C,
    delay: D,
    gate: G,
    address: u8,
    prescale: u8,
    queue: [Option<(u16, u16)>; CHANNEL_COUNT],
}

impl<I2C, D> MotorShield<I2C, D>
where
    I2C: I2c,
    D: DelayNs,
{
    /// Create a driver with the default address, oscillator and refresh rate.
    ///
    /// Channel writes are never deferred; use
    /// [`with_gate`](Self::with_gate) on hosts with time-critical sections.
    pub fn new(i2c: I2C, delay: D) -> Self {
        Self::with_gate(i2c, delay, ShieldConfig::default(), AlwaysReady)
    }

    /// Create a driver with an explicit configuration.
    pub fn with_config(i2c: I2C, delay: D, config: ShieldConfig) -> Self {
        Self::with_gate(i2c, delay, config, AlwaysReady)
    }
}

impl<I2C, D, G> MotorShield<I2C, D, G>
where
    I2C: I2c,
    D: DelayNs,
    G: BusGate,
{
    /// Create a driver whose channel writes are deferred whenever `gate`
    /// reports the bus unusable.
    pub fn with_gate(i2c: I2C, delay: D, config: ShieldConfig, gate: G) -> Self {
        Self {
            i2c,
            delay,
            gate,
            address: config.address,
            prescale: prescale_value(config.osc_hz, config.refresh_hz),
            queue: [None; CHANNEL_COUNT],
        }
    }

    /// Release the bus and delay handles.
    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }

    /// Initialize the chip.
    ///
    /// Empties the pending queue, blanks every output, programs the
    /// prescaler (the chip only accepts it in sleep mode), then wakes the
    /// oscillator with register auto-increment enabled. The trailing delay
    /// covers the ≥500 µs the oscillator needs after leaving sleep mode; it
    /// is required after every sleep-mode exit, not just at startup.
    pub fn begin(&mut self) -> Result<(), Error<I2C::Error>> {
        self.queue = [None; CHANNEL_COUNT];

        let (_, full_off) = split_ticks(FULL_SCALE_FLAG);
        self.write_register(ALL_LED_OFF_H, full_off)?;
        self.write_register(MODE1, MODE1_SLEEP)?;
        self.write_register(PRE_SCALE, self.prescale)?;
        self.write_register(MODE1, MODE1_AUTO_INCREMENT)?;
        self.delay.delay_ms(1);
        Ok(())
    }

    /// Flush pending channel writes in ascending channel order.
    ///
    /// Call this from a context where the bus is known to be usable; queued
    /// pairs are written directly without consulting the gate. A slot is
    /// cleared only after its write succeeds, so a bus error returns early
    /// and leaves the remaining pairs queued.
    #[allow(clippy::cast_possible_truncation)] // channel indices fit u8
    pub fn resolve_queue(&mut self) -> Result<(), Error<I2C::Error>> {
        for channel in 0..CHANNEL_COUNT {
            let pending = self.queue.get(channel).copied().flatten();
            if let Some((on, off)) = pending {
                self.write_channel(channel as u8, on, off)?;
                if let Some(slot) = self.queue.get_mut(channel) {
                    *slot = None;
                }
            }
        }
        Ok(())
    }

    // ── Channel model ────────────────────────────────────────────────────────

    /// Write a raw on/off timing pair to a channel.
    ///
    /// `on` is the tick at which the output asserts, `off` the tick at which
    /// it deasserts; both are masked to 13 bits so the full-on/full-off flag
    /// (bit 12) survives. When the gate denies bus access the pair is queued
    /// instead, replacing any previously queued pair for the same channel.
    /// Channels above 15 are ignored.
    pub fn write_pwm(&mut self, channel: u8, on: u16, off: u16) -> Result<(), Error<I2C::Error>> {
        if usize::from(channel) >= CHANNEL_COUNT {
            return Ok(());
        }
        if !self.gate.transaction_allowed() {
            if let Some(slot) = self.queue.get_mut(usize::from(channel)) {
                *slot = Some((on & TICK_MASK, off & TICK_MASK));
            }
            return Ok(());
        }
        self.write_channel(channel, on, off)
    }

    /// Set a duty cycle in ticks of the 4096-tick cycle, asserting at tick 0.
    pub fn write_analog(
        &mut self,
        channel: u8,
        pulse_width: u16,
    ) -> Result<(), Error<I2C::Error>> {
        self.write_analog_phased(channel, pulse_width, 0)
    }

    /// Set a duty cycle whose pulse starts `start_tick` into the cycle.
    ///
    /// Staggering `start_tick` across channels spreads switching edges over
    /// the refresh cycle instead of stacking every current transient on
    /// tick 0. A `pulse_width` of 4096 or more drives the channel fully on,
    /// zero drives it fully off; `start_tick` is clamped to 4095.
    #[allow(clippy::arithmetic_side_effects)] // start ≤ 4095 and width ≤ 4095
    pub fn write_analog_phased(
        &mut self,
        channel: u8,
        pulse_width: u16,
        start_tick: u16,
    ) -> Result<(), Error<I2C::Error>> {
        if pulse_width >= TICKS_PER_CYCLE {
            return self.write_digital(channel, PinState::High);
        }
        if pulse_width == 0 {
            return self.write_digital(channel, PinState::Low);
        }
        let start = start_tick.min(TICKS_PER_CYCLE - 1);
        self.write_pwm(channel, start, start + pulse_width)
    }

    /// Drive a channel fully high or fully low via the flag encodings.
    pub fn write_digital(
        &mut self,
        channel: u8,
        level: PinState,
    ) -> Result<(), Error<I2C::Error>> {
        match level {
            PinState::High => self.write_pwm(channel, FULL_SCALE_FLAG, 0),
            PinState::Low => self.write_pwm(channel, 0, FULL_SCALE_FLAG),
        }
    }

    // ── Motors ───────────────────────────────────────────────────────────────

    /// Set a motor's speed in raw ticks (4096 and above is fully on).
    ///
    /// Motor numbers outside 1–4 are ignored.
    pub fn set_motor_pwm(&mut self, motor: u8, value: u16) -> Result<(), Error<I2C::Error>> {
        match motor_channels(motor) {
            Some(channels) => self.write_analog(channels.pwm, value),
            None => Ok(()),
        }
    }

    /// Set a motor's speed as a percentage, clamped to [0, 100].
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::arithmetic_side_effects
    )]
    pub fn set_motor_percent(&mut self, motor: u8, percent: f32) -> Result<(), Error<I2C::Error>> {
        let percent = percent.clamp(0.0, 100.0);
        let value = (percent / 100.0 * f32::from(TICKS_PER_CYCLE - 1)) as u16;
        self.set_motor_pwm(motor, value)
    }

    /// Set the H-bridge state of a motor's direction channel pair.
    ///
    /// The input headed low is written first. Motor numbers outside 1–4 are
    /// ignored.
    pub fn set_motor_direction(
        &mut self,
        motor: u8,
        direction: MotorDirection,
    ) -> Result<(), Error<I2C::Error>> {
        let Some(channels) = motor_channels(motor) else {
            return Ok(());
        };
        match direction {
            MotorDirection::Forward => {
                self.write_digital(channels.in2, PinState::Low)?;
                self.write_digital(channels.in1, PinState::High)
            }
            MotorDirection::Backward => {
                self.write_digital(channels.in1, PinState::Low)?;
                self.write_digital(channels.in2, PinState::High)
            }
            MotorDirection::Brake => {
                self.write_digital(channels.in1, PinState::High)?;
                self.write_digital(channels.in2, PinState::High)
            }
            MotorDirection::Release => {
                self.write_digital(channels.in1, PinState::Low)?;
                self.write_digital(channels.in2, PinState::Low)
            }
        }
    }

    // ── Servos ───────────────────────────────────────────────────────────────

    /// Move a servo to a percentage of its travel, clamped to [0, 100].
    ///
    /// Positions are quantized to the 33-step pulse mapping calibrated for
    /// the default 60 Hz refresh rate (see [`crate::servo`]).
    pub fn write_servo(&mut self, channel: u8, percent: f32) -> Result<(), Error<I2C::Error>> {
        self.write_servo_position(channel, servo::percent_to_position(percent))
    }

    /// Drive a servo by raw position index (0–32, clamped).
    pub fn write_servo_position(
        &mut self,
        channel: u8,
        index: u8,
    ) -> Result<(), Error<I2C::Error>> {
        self.write_analog(channel, servo::position_ticks(index))
    }

    /// De-energize a servo output entirely, letting the horn move freely.
    pub fn release_servo(&mut self, channel: u8) -> Result<(), Error<I2C::Error>> {
        self.write_digital(channel, PinState::Low)
    }

    // ── Register writes ──────────────────────────────────────────────────────

    /// Write one 8-bit register.
    pub fn write_register(&mut self, register: u8, value: u8) -> Result<(), Error<I2C::Error>> {
        self.i2c
            .write(self.address, &[register, value])
            .map_err(Error::Bus)
    }

    /// Write one 16-bit register pair, split per `order`.
    pub fn write_register16(
        &mut self,
        register: u8,
        value: u16,
        order: ByteOrder,
    ) -> Result<(), Error<I2C::Error>> {
        self.write_registers16(register, &[value], order)
    }

    /// Write consecutive 8-bit registers in one transaction.
    ///
    /// Relies on the auto-increment mode set by [`begin`](Self::begin).
    pub fn write_registers(
        &mut self,
        register: u8,
        values: &[u8],
    ) -> Result<(), Error<I2C::Error>> {
        let mut frame: Vec<u8, MAX_TRANSACTION> = Vec::new();
        frame.push(register).map_err(|_| Error::TransactionTooLong)?;
        frame
            .extend_from_slice(values)
            .map_err(|_| Error::TransactionTooLong)?;
        self.i2c.write(self.address, &frame).map_err(Error::Bus)
    }

    /// Write consecutive 16-bit register pairs in one transaction.
    ///
    /// Each value is masked to 13 bits and split into two bytes per `order`.
    pub fn write_registers16(
        &mut self,
        register: u8,
        values: &[u16],
        order: ByteOrder,
    ) -> Result<(), Error<I2C::Error>> {
        let mut frame: Vec<u8, MAX_TRANSACTION> = Vec::new();
        frame.push(register).map_err(|_| Error::TransactionTooLong)?;
        for &value in values {
            let (low, high) = split_ticks(value);
            let bytes = match order {
                ByteOrder::LsbFirst => [low, high],
                ByteOrder::MsbFirst => [high, low],
            };
            frame
                .extend_from_slice(&bytes)
                .map_err(|_| Error::TransactionTooLong)?;
        }
        self.i2c.write(self.address, &frame).map_err(Error::Bus)
    }

    /// Physical 4-register channel write: ON low/high, OFF low/high.
    fn write_channel(&mut self, channel: u8, on: u16, off: u16) -> Result<(), Error<I2C::Error>> {
        self.write_registers16(channel_base(channel), &[on, off], ByteOrder::LsbFirst)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicBool, Ordering};
    use std::vec::Vec as StdVec;

    #[derive(Default)]
    struct MockI2c {
        writes: StdVec<(u8, StdVec<u8>)>,
    }
    impl embedded_hal::i2c::ErrorType for MockI2c {
        type Error = core::convert::Infallible;
    }
    impl embedded_hal::i2c::I2c for MockI2c {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [embedded_hal::i2c::Operation<'_>],
        ) -> Result<(), Self::Error> {
            for op in operations.iter() {
                if let embedded_hal::i2c::Operation::Write(data) = op {
                    self.writes.push((address, data.to_vec()));
                }
            }
            Ok(())
        }
    }

    struct FailingI2c;
    impl embedded_hal::i2c::ErrorType for FailingI2c {
        type Error = embedded_hal::i2c::ErrorKind;
    }
    impl embedded_hal::i2c::I2c for FailingI2c {
        fn transaction(
            &mut self,
            _address: u8,
            _operations: &mut [embedded_hal::i2c::Operation<'_>],
        ) -> Result<(), Self::Error> {
            Err(embedded_hal::i2c::ErrorKind::Other)
        }
    }

    #[derive(Default)]
    struct RecordingDelay {
        total_ns: u64,
    }
    impl embedded_hal::delay::DelayNs for RecordingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.total_ns += u64::from(ns);
        }
    }

    fn shield(mock: MockI2c) -> MotorShield<MockI2c, RecordingDelay> {
        MotorShield::new(mock, RecordingDelay::default())
    }

    #[test]
    fn begin_issues_all_off_sleep_prescale_wake_in_order() {
        let mut shield = shield(MockI2c::default());
        shield.begin().unwrap();
        let (mock, delay) = shield.release();

        let frames: StdVec<&[u8]> = mock.writes.iter().map(|(_, d)| d.as_slice()).collect();
        assert_eq!(
            frames,
            [
                &[ALL_LED_OFF_H, 0x10][..],
                &[MODE1, MODE1_SLEEP][..],
                &[PRE_SCALE, 107][..],
                &[MODE1, MODE1_AUTO_INCREMENT][..],
            ]
        );
        for (address, _) in &mock.writes {
            assert_eq!(*address, DEFAULT_ADDRESS);
        }
        // Oscillator stabilization delay after the sleep-mode exit.
        assert!(delay.total_ns >= 500_000);
    }

    #[test]
    fn begin_uses_configured_address_and_prescaler() {
        let config = ShieldConfig {
            address: 0x41,
            refresh_hz: 50,
            ..ShieldConfig::default()
        };
        let mut shield =
            MotorShield::with_config(MockI2c::default(), RecordingDelay::default(), config);
        shield.begin().unwrap();
        let (mock, _) = shield.release();
        assert_eq!(mock.writes[0].0, 0x41);
        assert_eq!(mock.writes[2].1, [PRE_SCALE, 128]);
    }

    #[test]
    fn write_pwm_hits_the_channel_register_group() {
        let mut shield = shield(MockI2c::default());
        shield.write_pwm(3, 1000, 3000).unwrap();
        let (mock, _) = shield.release();
        // 1000 = 0x03E8, 3000 = 0x0BB8, group base 0x06 + 4*3.
        assert_eq!(mock.writes, [(DEFAULT_ADDRESS, vec![0x12, 0xE8, 0x03, 0xB8, 0x0B])]);
    }

    #[test]
    fn write_pwm_ignores_channels_above_15() {
        let mut shield = shield(MockI2c::default());
        shield.write_pwm(16, 1000, 3000).unwrap();
        shield.write_pwm(u8::MAX, 1000, 3000).unwrap();
        let (mock, _) = shield.release();
        assert!(mock.writes.is_empty());
    }

    #[test]
    fn write_digital_uses_the_flag_encodings() {
        let mut shield = shield(MockI2c::default());
        shield.write_digital(0, PinState::High).unwrap();
        shield.write_digital(0, PinState::Low).unwrap();
        let (mock, _) = shield.release();
        assert_eq!(mock.writes[0].1, vec![0x06, 0x00, 0x10, 0x00, 0x00]);
        assert_eq!(mock.writes[1].1, vec![0x06, 0x00, 0x00, 0x00, 0x10]);
    }

    #[test]
    fn write_analog_saturates_to_digital_levels() {
        let mut saturated = shield(MockI2c::default());
        saturated.write_analog(5, 4096).unwrap();
        saturated.write_analog(5, u16::MAX).unwrap();
        saturated.write_analog(5, 0).unwrap();
        let (mock, _) = saturated.release();

        let mut digital = shield(MockI2c::default());
        digital.write_digital(5, PinState::High).unwrap();
        digital.write_digital(5, PinState::High).unwrap();
        digital.write_digital(5, PinState::Low).unwrap();
        let (expected, _) = digital.release();

        assert_eq!(mock.writes, expected.writes);
    }

    #[test]
    fn write_analog_phased_clamps_the_start_tick() {
        let mut shield = shield(MockI2c::default());
        shield.write_analog_phased(0, 100, 9000).unwrap();
        let (mock, _) = shield.release();
        // start clamps to 4095; 4095 + 100 = 4195 = 0x1063.
        assert_eq!(mock.writes[0].1, vec![0x06, 0xFF, 0x0F, 0x63, 0x10]);
    }

    #[test]
    fn gated_write_queues_instead_of_touching_the_bus() {
        let gate_open = AtomicBool::new(false);
        let mut shield = MotorShield::with_gate(
            MockI2c::default(),
            RecordingDelay::default(),
            ShieldConfig::default(),
            || gate_open.load(Ordering::Relaxed),
        );

        shield.write_pwm(2, 100, 200).unwrap();
        gate_open.store(true, Ordering::Relaxed);
        shield.resolve_queue().unwrap();
        let (mock, _) = shield.release();

        assert_eq!(mock.writes, [(DEFAULT_ADDRESS, vec![0x0E, 0x64, 0x00, 0xC8, 0x00])]);
    }

    #[test]
    fn queued_writes_are_last_write_wins_and_flush_empties_the_slot() {
        let gate_open = AtomicBool::new(false);
        let mut shield = MotorShield::with_gate(
            MockI2c::default(),
            RecordingDelay::default(),
            ShieldConfig::default(),
            || gate_open.load(Ordering::Relaxed),
        );

        shield.write_pwm(7, 10, 20).unwrap();
        shield.write_pwm(7, 30, 40).unwrap();
        gate_open.store(true, Ordering::Relaxed);
        shield.resolve_queue().unwrap();
        // Slot must now be empty: a second flush writes nothing.
        shield.resolve_queue().unwrap();
        let (mock, _) = shield.release();

        assert_eq!(mock.writes, [(DEFAULT_ADDRESS, vec![0x22, 30, 0, 40, 0])]);
    }

    #[test]
    fn flush_walks_channels_in_ascending_order() {
        let gate_open = AtomicBool::new(false);
        let mut shield = MotorShield::with_gate(
            MockI2c::default(),
            RecordingDelay::default(),
            ShieldConfig::default(),
            || gate_open.load(Ordering::Relaxed),
        );

        shield.write_pwm(9, 1, 2).unwrap();
        shield.write_pwm(4, 3, 4).unwrap();
        gate_open.store(true, Ordering::Relaxed);
        shield.resolve_queue().unwrap();
        let (mock, _) = shield.release();

        assert_eq!(mock.writes[0].1[0], channel_base(4));
        assert_eq!(mock.writes[1].1[0], channel_base(9));
    }

    #[test]
    fn brake_sets_both_direction_channels_always_on() {
        let mut shield = shield(MockI2c::default());
        shield.set_motor_direction(1, MotorDirection::Brake).unwrap();
        let (mock, _) = shield.release();
        // Motor 1 direction channels are 10 and 9.
        assert_eq!(mock.writes[0].1, vec![channel_base(10), 0x00, 0x10, 0x00, 0x00]);
        assert_eq!(mock.writes[1].1, vec![channel_base(9), 0x00, 0x10, 0x00, 0x00]);
    }

    #[test]
    fn release_sets_both_direction_channels_always_off() {
        let mut shield = shield(MockI2c::default());
        shield.set_motor_direction(1, MotorDirection::Release).unwrap();
        let (mock, _) = shield.release();
        assert_eq!(mock.writes[0].1, vec![channel_base(10), 0x00, 0x00, 0x00, 0x10]);
        assert_eq!(mock.writes[1].1, vec![channel_base(9), 0x00, 0x00, 0x00, 0x10]);
    }

    #[test]
    fn forward_writes_the_lowered_input_first() {
        let mut shield = shield(MockI2c::default());
        shield.set_motor_direction(1, MotorDirection::Forward).unwrap();
        let (mock, _) = shield.release();
        assert_eq!(mock.writes[0].1, vec![channel_base(9), 0x00, 0x00, 0x00, 0x10]);
        assert_eq!(mock.writes[1].1, vec![channel_base(10), 0x00, 0x10, 0x00, 0x00]);
    }

    #[test]
    fn unknown_motor_numbers_are_no_ops() {
        let mut shield = shield(MockI2c::default());
        shield.set_motor_pwm(0, 1000).unwrap();
        shield.set_motor_pwm(5, 1000).unwrap();
        shield.set_motor_direction(9, MotorDirection::Forward).unwrap();
        shield.set_motor_percent(200, 50.0).unwrap();
        let (mock, _) = shield.release();
        assert!(mock.writes.is_empty());
    }

    #[test]
    fn motor_percent_clamps_at_both_ends() {
        let mut clamped = shield(MockI2c::default());
        clamped.set_motor_percent(2, 150.0).unwrap();
        clamped.set_motor_percent(2, -10.0).unwrap();
        let (mock, _) = clamped.release();

        let mut reference = shield(MockI2c::default());
        reference.set_motor_percent(2, 100.0).unwrap();
        reference.set_motor_percent(2, 0.0).unwrap();
        let (expected, _) = reference.release();

        assert_eq!(mock.writes, expected.writes);
    }

    #[test]
    fn motor_percent_drives_the_motor_pwm_channel() {
        let mut shield = shield(MockI2c::default());
        shield.set_motor_percent(3, 100.0).unwrap();
        let (mock, _) = shield.release();
        // Motor 3 speed channel is 2; 100% = 4095 ticks from tick 0.
        assert_eq!(mock.writes[0].1, vec![channel_base(2), 0x00, 0x00, 0xFF, 0x0F]);
    }

    #[test]
    fn servo_endpoints_match_the_position_table() {
        let mut shield = shield(MockI2c::default());
        shield.write_servo(0, 0.0).unwrap();
        shield.write_servo(0, 100.0).unwrap();
        let (mock, _) = shield.release();
        // 136 = 0x88 and 648 = 0x288 ticks from tick 0.
        assert_eq!(mock.writes[0].1, vec![0x06, 0x00, 0x00, 0x88, 0x00]);
        assert_eq!(mock.writes[1].1, vec![0x06, 0x00, 0x00, 0x88, 0x02]);
    }

    #[test]
    fn release_servo_drives_the_channel_fully_off() {
        let mut released = shield(MockI2c::default());
        released.release_servo(11).unwrap();
        let (mock, _) = released.release();

        let mut reference = shield(MockI2c::default());
        reference.write_digital(11, PinState::Low).unwrap();
        let (expected, _) = reference.release();

        assert_eq!(mock.writes, expected.writes);
    }

    #[test]
    fn sixteen_bit_writes_honor_the_byte_order() {
        let mut shield = shield(MockI2c::default());
        shield.write_register16(0x06, 0x0ABC, ByteOrder::LsbFirst).unwrap();
        shield.write_register16(0x06, 0x0ABC, ByteOrder::MsbFirst).unwrap();
        let (mock, _) = shield.release();
        assert_eq!(mock.writes[0].1, vec![0x06, 0xBC, 0x0A]);
        assert_eq!(mock.writes[1].1, vec![0x06, 0x0A, 0xBC]);
    }

    #[test]
    fn bus_failures_surface_as_bus_errors() {
        let mut shield = MotorShield::new(FailingI2c, RecordingDelay::default());
        assert_eq!(
            shield.write_pwm(0, 1, 2),
            Err(Error::Bus(embedded_hal::i2c::ErrorKind::Other))
        );
        assert_eq!(
            shield.begin(),
            Err(Error::Bus(embedded_hal::i2c::ErrorKind::Other))
        );
    }

    #[test]
    fn flush_keeps_unwritten_slots_on_bus_error() {
        let gate_open = AtomicBool::new(false);
        let mut shield = MotorShield::with_gate(
            FailingI2c,
            RecordingDelay::default(),
            ShieldConfig::default(),
            || gate_open.load(Ordering::Relaxed),
        );
        shield.write_pwm(1, 5, 6).unwrap();
        gate_open.store(true, Ordering::Relaxed);
        assert!(shield.resolve_queue().is_err());
        // The pair is still queued; a later flush retries it.
        assert!(shield.resolve_queue().is_err());
    }

    #[test]
    fn oversized_multi_writes_are_rejected() {
        let mut shield = shield(MockI2c::default());
        let too_many = [0u8; MAX_TRANSACTION];
        assert_eq!(
            shield.write_registers(0x06, &too_many),
            Err(Error::TransactionTooLong)
        );
    }
}
