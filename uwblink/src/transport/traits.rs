// uwblink/src/transport/traits.rs

use crate::types::{EdgeWait, Level, Line};
use crate::Result;

/// Duplex SPI shift with chip-select bracketing. No retry or framing.
pub trait SpiBus {
    fn cs_assert(&mut self);

    fn cs_deassert(&mut self);

    /// Shift `data` out to the device.
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Shift `buf.len()` bytes in from the device.
    fn read_into(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Shift `len` bytes in and return them.
    fn read(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_into(&mut buf)?;
        Ok(buf)
    }
}

/// Level-sensitive `ready`/`irq` handshake lines.
pub trait HandshakeLines {
    fn level(&self, line: Line) -> Level;

    /// Block until `line` is asserted or `timeout_ms` passes. The edge
    /// interrupt is enabled for the duration of the call only.
    fn wait_edge(&mut self, line: Line, timeout_ms: u64) -> EdgeWait;

    fn is_asserted(&self, line: Line) -> bool {
        self.level(line).is_asserted()
    }
}

/// Millisecond delay and monotonic time source.
pub trait Delay {
    fn delay_ms(&mut self, ms: u64);

    fn now_ms(&self) -> u64;
}

/// Everything the link session needs from a platform.
pub trait SpiHandshakeTransport: SpiBus + HandshakeLines + Delay {}

impl<T: SpiBus + HandshakeLines + Delay> SpiHandshakeTransport for T {}
