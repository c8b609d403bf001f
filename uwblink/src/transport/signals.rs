// uwblink/src/transport/signals.rs
//! Interrupt-fed handshake signalling.
//!
//! The platform's GPIO interrupt handler only ever calls [`IsrHandle::give`].
//! [`EdgeSignals`] owns one binary semaphore per line and implements the
//! one-shot wait: enable the edge interrupt, block on the semaphore with a
//! timeout, disable the interrupt again.

use std::sync::mpsc::{Receiver, SyncSender, TryRecvError, sync_channel};

use log::trace;

use crate::transport::traits::HandshakeLines;
use crate::types::{EdgeWait, Level, Line};
use crate::utils::ms;

/// GPIO access a platform provides for the handshake lines.
pub trait GpioIrq {
    fn read_level(&self, line: Line) -> Level;
    fn enable_irq(&mut self, line: Line);
    fn disable_irq(&mut self, line: Line);
}

/// Binary semaphore backed by a bounded channel of capacity one.
#[derive(Debug)]
pub struct IrqSemaphore {
    tx: SyncSender<()>,
    rx: Receiver<()>,
}

/// Cloneable, non-blocking give side of an [`IrqSemaphore`], safe to
/// call from interrupt context.
#[derive(Debug, Clone)]
pub struct IsrHandle {
    tx: SyncSender<()>,
}

impl IsrHandle {
    pub fn give(&self) {
        // a full channel already holds the token
        let _ = self.tx.try_send(());
    }
}

impl Default for IrqSemaphore {
    fn default() -> Self {
        Self::new()
    }
}

impl IrqSemaphore {
    pub fn new() -> Self {
        let (tx, rx) = sync_channel(1);
        Self { tx, rx }
    }

    pub fn isr_handle(&self) -> IsrHandle {
        IsrHandle {
            tx: self.tx.clone(),
        }
    }

    /// Take the token, waiting at most `timeout_ms`.
    pub fn take(&self, timeout_ms: u64) -> bool {
        self.rx.recv_timeout(ms(timeout_ms)).is_ok()
    }

    /// Discard a token left over from an earlier interrupt.
    pub fn drain(&self) -> bool {
        !matches!(self.rx.try_recv(), Err(TryRecvError::Empty))
    }
}

/// Handshake lines implemented over a platform GPIO and two semaphores.
#[derive(Debug)]
pub struct EdgeSignals<G> {
    gpio: G,
    ready: IrqSemaphore,
    irq: IrqSemaphore,
}

impl<G: GpioIrq> EdgeSignals<G> {
    pub fn new(gpio: G) -> Self {
        Self {
            gpio,
            ready: IrqSemaphore::new(),
            irq: IrqSemaphore::new(),
        }
    }

    /// Handle the platform registers with the interrupt for `line`.
    pub fn isr_handle(&self, line: Line) -> IsrHandle {
        self.semaphore(line).isr_handle()
    }

    pub fn gpio(&self) -> &G {
        &self.gpio
    }

    pub fn gpio_mut(&mut self) -> &mut G {
        &mut self.gpio
    }

    fn semaphore(&self, line: Line) -> &IrqSemaphore {
        match line {
            Line::Ready => &self.ready,
            Line::Irq => &self.irq,
        }
    }
}

impl<G: GpioIrq> HandshakeLines for EdgeSignals<G> {
    fn level(&self, line: Line) -> Level {
        self.gpio.read_level(line)
    }

    fn wait_edge(&mut self, line: Line, timeout_ms: u64) -> EdgeWait {
        if self.semaphore(line).drain() {
            trace!("discarded stale {:?} edge", line);
        }
        self.gpio.enable_irq(line);
        let signaled = self.semaphore(line).take(timeout_ms);
        self.gpio.disable_irq(line);
        if signaled {
            EdgeWait::Signaled
        } else {
            EdgeWait::TimedOut
        }
    }
}
