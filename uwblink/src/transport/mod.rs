// uwblink/src/transport/mod.rs

pub mod mock;
pub mod signals;
pub mod traits;

pub use mock::MockTransport;
pub use signals::{EdgeSignals, GpioIrq, IrqSemaphore, IsrHandle};
pub use traits::{Delay, HandshakeLines, SpiBus, SpiHandshakeTransport};
