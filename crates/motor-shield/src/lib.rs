//! I2C driver for PCA9685-based 16-channel PWM motor/servo shields.
//!
//! Translates high-level motor and servo intents ("motor 2 at 75% forward",
//! "servo to 40% travel") into the chip's 12-bit on/off timing registers,
//! with a per-channel deferred-write queue for host contexts where the bus
//! must not be touched.
//!
//! # Architecture
//!
//! - [`registers`] - register map, flag bits, and wire encoding
//! - [`MotorShield`] - the controller: initialization, register writes,
//!   safety gating, and the pending-write queue
//! - [`motor`] / [`servo`] - the shield's fixed channel tables and pulse
//!   mappings
//! - [`BusGate`] - "may I use the bus right now?" capability
//!
//! # Quick start
//!
//! ```no_run
//! use embedded_hal::delay::DelayNs;
//! use embedded_hal::i2c::I2c;
//! use motor_shield::{Error, MotorDirection, MotorShield};
//!
//! fn spin_up<I: I2c, D: DelayNs>(i2c: I, delay: D) -> Result<(), Error<I::Error>> {
//!     let mut shield = MotorShield::new(i2c, delay);
//!     shield.begin()?;
//!     shield.set_motor_direction(2, MotorDirection::Forward)?;
//!     shield.set_motor_percent(2, 75.0)?;
//!     shield.write_servo(0, 40.0)?;
//!     Ok(())
//! }
//! ```
//!
//! # Deferred writes
//!
//! On hosts with time-critical sections, construct the driver with a
//! [`BusGate`] wired to the interrupt state. Channel writes issued while the
//! gate is closed are queued (last write wins per channel) and hit the wire
//! when the host calls [`MotorShield::resolve_queue`] at a safe point.
//!
//! # Features
//!
//! - `defmt`: `defmt::Format` derives on the public driver types
//! - `cortex-m`: `gate::PrimaskGate`, a gate wired to the ARM PRIMASK
//!   interrupt-state register

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Pedantic lints suppressed for this driver crate:
#![allow(clippy::doc_markdown)] // hex addresses and register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors — callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // every fallible op fails the same way: Error::Bus

pub mod error;
pub mod gate;
pub mod motor;
pub mod registers;
pub mod servo;
mod shield;

pub use error::Error;
pub use gate::{AlwaysReady, BusGate};
pub use motor::{MotorChannels, MotorDirection};
pub use shield::{ByteOrder, MotorShield, ShieldConfig};

// The digital level type used by write_digital; re-exported so downstream
// crates do not need a direct embedded-hal dependency for it.
pub use embedded_hal::digital::PinState;
