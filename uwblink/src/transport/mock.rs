// uwblink/src/transport/mock.rs

use std::collections::VecDeque;
use std::fmt;

use crate::transport::traits::{Delay, HandshakeLines, SpiBus};
use crate::types::{EdgeWait, Level, Line};
use crate::{Error, Result};

/// Produces the device's reply frames for one received MOSI frame.
pub type Responder = Box<dyn FnMut(&[u8]) -> Vec<Vec<u8>> + Send>;

struct QueuedFrame {
    at_ms: u64,
    bytes: Vec<u8>,
}

/// Simulated device for unit tests.
///
/// Time is simulated: `delay_ms` and timed-out edge waits advance
/// `now_ms`. The bytes written inside one chip-select window are recorded
/// as one entry of `sent`. Queued response frames assert `irq` until they
/// have been fully clocked out. `ready` is asserted whenever the device is
/// not busy digesting a frame it just received.
pub struct MockTransport {
    pub sent: Vec<Vec<u8>>,
    pub now_ms: u64,
    /// `ready` never asserts.
    pub ready_stuck_high: bool,
    /// How long `ready` stays deasserted after each received frame.
    pub busy_ms: u64,
    /// Number of upcoming irq waits that report an edge without the line
    /// actually being asserted.
    pub spurious_irq_edges: usize,
    /// Number of upcoming transfers that fail.
    pub transfer_failures: usize,
    pub cs_asserted: bool,
    pub cs_cycles: usize,
    responses: VecDeque<QueuedFrame>,
    responder: Option<Responder>,
    cursor: usize,
    read_in_window: bool,
    pending_write: Vec<u8>,
    busy_until: u64,
}

impl fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockTransport")
            .field("sent", &self.sent.len())
            .field("queued", &self.responses.len())
            .field("now_ms", &self.now_ms)
            .field("cs_asserted", &self.cs_asserted)
            .finish()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            sent: Vec::new(),
            now_ms: 0,
            ready_stuck_high: false,
            busy_ms: 2,
            spurious_irq_edges: 0,
            transfer_failures: 0,
            cs_asserted: false,
            cs_cycles: 0,
            responses: VecDeque::new(),
            responder: None,
            cursor: 0,
            read_in_window: false,
            pending_write: Vec::new(),
            busy_until: 0,
        }
    }

    /// Install a closure that generates replies to every received frame.
    pub fn with_responder<F>(mut self, f: F) -> Self
    where
        F: FnMut(&[u8]) -> Vec<Vec<u8>> + Send + 'static,
    {
        self.responder = Some(Box::new(f));
        self
    }

    /// Queue a frame that is available immediately.
    pub fn push_response(&mut self, frame: Vec<u8>) {
        self.push_response_after(0, frame);
    }

    /// Queue a frame that becomes available `delay_ms` from now.
    pub fn push_response_after(&mut self, delay_ms: u64, frame: Vec<u8>) {
        self.responses.push_back(QueuedFrame {
            at_ms: self.now_ms + delay_ms,
            bytes: frame,
        });
    }

    pub fn pending_responses(&self) -> usize {
        self.responses.len()
    }

    pub fn pop_sent(&mut self) -> Option<Vec<u8>> {
        self.sent.pop()
    }

    fn irq_asserted(&self) -> bool {
        match self.responses.front() {
            Some(f) => f.at_ms <= self.now_ms && self.cursor < f.bytes.len(),
            None => false,
        }
    }

    fn ready_asserted(&self) -> bool {
        !self.ready_stuck_high && self.now_ms >= self.busy_until
    }

    fn take_failure(&mut self) -> Result<()> {
        if self.transfer_failures > 0 {
            self.transfer_failures -= 1;
            return Err(Error::Transport("injected transfer failure".into()));
        }
        if !self.cs_asserted {
            return Err(Error::Transport("transfer without chip select".into()));
        }
        Ok(())
    }
}

impl SpiBus for MockTransport {
    fn cs_assert(&mut self) {
        self.cs_asserted = true;
    }

    fn cs_deassert(&mut self) {
        if !self.cs_asserted {
            return;
        }
        self.cs_asserted = false;
        self.cs_cycles += 1;

        if self.read_in_window {
            self.read_in_window = false;
            if self.cursor > 0 {
                self.responses.pop_front();
            }
            self.cursor = 0;
        }

        if !self.pending_write.is_empty() {
            let frame = std::mem::take(&mut self.pending_write);
            self.busy_until = self.now_ms + self.busy_ms;
            if let Some(responder) = self.responder.as_mut() {
                for reply in responder(&frame) {
                    self.responses.push_back(QueuedFrame {
                        at_ms: self.now_ms,
                        bytes: reply,
                    });
                }
            }
            self.sent.push(frame);
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.take_failure()?;
        self.pending_write.extend_from_slice(data);
        Ok(())
    }

    fn read_into(&mut self, buf: &mut [u8]) -> Result<()> {
        self.take_failure()?;
        self.read_in_window = true;
        let now = self.now_ms;
        let frame = self
            .responses
            .front()
            .filter(|f| f.at_ms <= now)
            .map(|f| f.bytes.as_slice())
            .unwrap_or(&[]);
        for b in buf.iter_mut() {
            *b = frame.get(self.cursor).copied().unwrap_or(0x00);
            self.cursor += 1;
        }
        if frame.is_empty() {
            self.cursor = 0;
        }
        Ok(())
    }
}

impl HandshakeLines for MockTransport {
    fn level(&self, line: Line) -> Level {
        let asserted = match line {
            Line::Ready => self.ready_asserted(),
            Line::Irq => self.irq_asserted(),
        };
        if asserted { Level::Low } else { Level::High }
    }

    fn wait_edge(&mut self, line: Line, timeout_ms: u64) -> EdgeWait {
        if self.is_asserted(line) {
            return EdgeWait::Signaled;
        }
        let becomes_asserted_at = match line {
            Line::Ready if !self.ready_stuck_high => Some(self.busy_until),
            Line::Irq => {
                if self.spurious_irq_edges > 0 {
                    self.spurious_irq_edges -= 1;
                    return EdgeWait::Signaled;
                }
                self.responses.front().map(|f| f.at_ms)
            }
            _ => None,
        };
        match becomes_asserted_at {
            Some(at) if at <= self.now_ms + timeout_ms => {
                self.now_ms = self.now_ms.max(at);
                EdgeWait::Signaled
            }
            _ => {
                self.now_ms += timeout_ms;
                EdgeWait::TimedOut
            }
        }
    }
}

impl Delay for MockTransport {
    fn delay_ms(&mut self, ms: u64) {
        self.now_ms += ms;
    }

    fn now_ms(&self) -> u64 {
        self.now_ms
    }
}
