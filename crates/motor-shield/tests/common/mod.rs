//! Shared test doubles: a recording I2C bus and a no-op delay provider.

/// I2C bus that records every write frame it is handed.
#[derive(Default)]
pub struct RecordingI2c {
    pub writes: Vec<(u8, Vec<u8>)>,
}

impl embedded_hal::i2c::ErrorType for RecordingI2c {
    type Error = core::convert::Infallible;
}

impl embedded_hal::i2c::I2c for RecordingI2c {
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

/// Delay provider that returns immediately.
#[derive(Default)]
pub struct NoopDelay;

impl embedded_hal::delay::DelayNs for NoopDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}
