// uwblink/src/link/session.rs

use std::sync::{Mutex, MutexGuard};

use log::{debug, trace, warn};

use crate::constants::{
    HBCI_HEADER_LEN, HBCI_LEN_MASK, HBCI_MAX_MISO_PAYLOAD, LINK_HEADER_LEN, LOW_POWER_MARKER,
    MISALIGNED_DUMMY, RCI_BLOCK_LEN, READ_PROBE_LEN,
};
use crate::link::backoff::Backoff;
use crate::link::config::{LinkConfig, PROTOCOL_SWITCH_FLUSH_LEN};
use crate::protocol::link::parse_link_header;
use crate::transport::traits::SpiHandshakeTransport;
use crate::types::{EdgeWait, Line};
use crate::utils::Hex;
use crate::{Error, Result};

/// One physical link to the coprocessor.
///
/// The platform sits behind the session mutex, so at most one read or
/// write exchange is in flight at a time. Engines share the session by
/// reference.
#[derive(Debug)]
pub struct LinkSession<P> {
    platform: Mutex<P>,
    config: LinkConfig,
}

/// Split a read probe into the link header and any payload bytes it
/// already carried. A leading dummy `0x00` means the device shifted out
/// one byte late.
pub(crate) fn align_probe(probe: &[u8; READ_PROBE_LEN]) -> ([u8; LINK_HEADER_LEN], &[u8]) {
    let mut header = [0u8; LINK_HEADER_LEN];
    if probe[0] == MISALIGNED_DUMMY {
        header.copy_from_slice(&probe[1..]);
        (header, &[])
    } else {
        header.copy_from_slice(&probe[..LINK_HEADER_LEN]);
        (header, &probe[LINK_HEADER_LEN..])
    }
}

fn dump(dir: &str, bytes: &[u8]) {
    if cfg!(feature = "diagnostics") {
        trace!("{} {}", dir, Hex(bytes));
    }
}

impl<P: SpiHandshakeTransport> LinkSession<P> {
    pub fn new(platform: P) -> Self {
        Self::with_config(platform, LinkConfig::default())
    }

    pub fn with_config(platform: P, config: LinkConfig) -> Self {
        Self {
            platform: Mutex::new(platform),
            config,
        }
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Tear the session down and hand the platform back.
    pub fn into_inner(self) -> Result<P> {
        self.platform.into_inner().map_err(|_| Error::SessionPoisoned)
    }

    /// Run `f` with exclusive access to the platform.
    pub fn with_platform<R>(&self, f: impl FnOnce(&mut P) -> R) -> Result<R> {
        let mut p = self.lock()?;
        Ok(f(&mut p))
    }

    fn lock(&self) -> Result<MutexGuard<'_, P>> {
        self.platform.lock().map_err(|_| Error::SessionPoisoned)
    }

    fn edge_wait_ms(&self, backoff: &Backoff, p: &P) -> u64 {
        self.config.edge_wait_ms.min(backoff.remaining_ms(p)).max(1)
    }

    /// Send one frame with the default ceiling.
    pub fn write(&self, frame: &[u8]) -> Result<()> {
        self.write_with_ceiling(frame, self.config.backoff_ceiling_ms)
    }

    /// Send one frame: irq idle, ready asserted, CS, ready edge, shift,
    /// release CS, then wait for the device to drop ready.
    pub fn write_with_ceiling(&self, frame: &[u8], ceiling_ms: u64) -> Result<()> {
        let limit = LINK_HEADER_LEN + self.config.max_command_payload;
        if frame.len() > limit {
            return Err(Error::InvalidLength {
                expected: limit,
                actual: frame.len(),
            });
        }

        let mut guard = self.lock()?;
        let p = &mut *guard;
        let mut backoff = Backoff::start(ceiling_ms, &*p);
        loop {
            if p.is_asserted(Line::Irq) {
                debug!("irq asserted before write, backing off");
                backoff.retry_or(p, || Error::TransportTimeout {
                    stage: "irq idle before write",
                })?;
                continue;
            }
            if !p.is_asserted(Line::Ready) {
                backoff.retry_or(p, || Error::TransportTimeout {
                    stage: "ready before write",
                })?;
                continue;
            }

            p.cs_assert();
            let wait = self.edge_wait_ms(&backoff, p);
            if p.wait_edge(Line::Ready, wait) == EdgeWait::TimedOut {
                p.cs_deassert();
                debug!("ready dropped after chip select");
                backoff.retry_or(p, || Error::TransportTimeout {
                    stage: "ready after chip select",
                })?;
                continue;
            }

            dump("tx", frame);
            let shifted = p.write(frame);
            p.cs_deassert();
            match shifted {
                Ok(()) => break,
                Err(e) => {
                    warn!("write transfer failed: {}", e);
                    backoff.retry_or(p, || e)?;
                }
            }
        }

        let mut settle = Backoff::start(ceiling_ms, &*p);
        while p.is_asserted(Line::Ready) {
            settle.retry_or(p, || Error::TransportTimeout {
                stage: "ready release after write",
            })?;
        }
        Ok(())
    }

    /// Send one RCI block. The block carries its own framing, so it goes
    /// through the same handshake as any other frame.
    pub fn write_rci(&self, block: &[u8; RCI_BLOCK_LEN], ceiling_ms: u64) -> Result<()> {
        self.write_with_ceiling(block, ceiling_ms)
    }

    /// Receive one header-delimited frame with the default ceiling.
    pub fn read(&self) -> Result<Vec<u8>> {
        self.read_with_ceiling(self.config.backoff_ceiling_ms)
    }

    /// Receive one header-delimited frame (header + payload).
    ///
    /// Returns [`Error::DeviceLowPower`] without retrying when the probe
    /// reads all `0xFF`.
    pub fn read_with_ceiling(&self, ceiling_ms: u64) -> Result<Vec<u8>> {
        let mut backoff = Backoff::start(ceiling_ms, &*self.lock()?);
        loop {
            let mut guard = self.await_irq(&mut backoff)?;
            let p = &mut *guard;

            let mut probe = [0u8; READ_PROBE_LEN];
            if let Err(e) = p.read_into(&mut probe) {
                p.cs_deassert();
                warn!("probe transfer failed: {}", e);
                backoff.retry_or(p, || e)?;
                continue;
            }
            if probe[0] == MISALIGNED_DUMMY && probe[1] != MISALIGNED_DUMMY {
                debug!("probe misaligned by one byte, shifting header");
            }
            let (header, carried) = align_probe(&probe);

            if header.iter().all(|&b| b == LOW_POWER_MARKER) {
                p.cs_deassert();
                return Err(Error::DeviceLowPower);
            }
            if header[0] == 0x00 {
                p.cs_deassert();
                debug!("empty frame, device not ready yet");
                backoff.retry_or(p, || Error::TransportTimeout {
                    stage: "non-empty frame",
                })?;
                continue;
            }

            let (_, len) = parse_link_header(&header);
            if len > self.config.max_response_payload {
                p.cs_deassert();
                return Err(Error::InvalidLength {
                    expected: self.config.max_response_payload,
                    actual: len,
                });
            }

            let mut frame = vec![0u8; LINK_HEADER_LEN + len];
            frame[..LINK_HEADER_LEN].copy_from_slice(&header);
            let carried = &carried[..carried.len().min(len)];
            let filled = LINK_HEADER_LEN + carried.len();
            frame[LINK_HEADER_LEN..filled].copy_from_slice(carried);
            if filled < frame.len() {
                if let Err(e) = p.read_into(&mut frame[filled..]) {
                    p.cs_deassert();
                    warn!("payload transfer failed: {}", e);
                    backoff.retry_or(p, || e)?;
                    continue;
                }
            }

            self.release_irq(p);
            p.cs_deassert();
            dump("rx", &frame);
            return Ok(frame);
        }
    }

    /// Receive a fixed-length block (RCI responses) using the same irq
    /// handshake as [`read`](Self::read).
    pub fn read_block(&self, len: usize, ceiling_ms: u64) -> Result<Vec<u8>> {
        let mut backoff = Backoff::start(ceiling_ms, &*self.lock()?);
        loop {
            let mut guard = self.await_irq(&mut backoff)?;
            let p = &mut *guard;
            let mut block = vec![0u8; len];
            if let Err(e) = p.read_into(&mut block) {
                p.cs_deassert();
                warn!("block transfer failed: {}", e);
                backoff.retry_or(p, || e)?;
                continue;
            }
            self.release_irq(p);
            p.cs_deassert();

            let head = &block[..block.len().min(LINK_HEADER_LEN)];
            if !head.is_empty() && head.iter().all(|&b| b == LOW_POWER_MARKER) {
                return Err(Error::DeviceLowPower);
            }
            dump("rx", &block);
            return Ok(block);
        }
    }

    /// HBCI exchange: shift the APDU out, wait for irq, then read the
    /// answer header and the body length it announces.
    pub fn hbci_transceive(&self, apdu: &[u8], ceiling_ms: u64) -> Result<Vec<u8>> {
        let mut guard = self.lock()?;
        let p = &mut *guard;

        dump("tx", apdu);
        p.cs_assert();
        let shifted = p.write(apdu);
        p.cs_deassert();
        shifted?;

        let mut backoff = Backoff::start(ceiling_ms, &*p);
        loop {
            let wait = self.edge_wait_ms(&backoff, p);
            if p.wait_edge(Line::Irq, wait) == EdgeWait::Signaled && p.is_asserted(Line::Irq) {
                break;
            }
            backoff.retry_or(p, || Error::TransportTimeout {
                stage: "hbci answer",
            })?;
        }

        p.cs_assert();
        let mut header = [0u8; HBCI_HEADER_LEN];
        if let Err(e) = p.read_into(&mut header) {
            p.cs_deassert();
            return Err(e);
        }
        let body_len = (u16::from_le_bytes([header[2], header[3]]) & HBCI_LEN_MASK) as usize;
        if body_len > HBCI_MAX_MISO_PAYLOAD + 1 {
            p.cs_deassert();
            return Err(Error::InvalidLength {
                expected: HBCI_MAX_MISO_PAYLOAD + 1,
                actual: body_len,
            });
        }
        let mut answer = vec![0u8; HBCI_HEADER_LEN + body_len];
        answer[..HBCI_HEADER_LEN].copy_from_slice(&header);
        if body_len > 0 {
            if let Err(e) = p.read_into(&mut answer[HBCI_HEADER_LEN..]) {
                p.cs_deassert();
                return Err(e);
            }
        }
        self.release_irq(p);
        p.cs_deassert();
        dump("rx", &answer);
        Ok(answer)
    }

    /// Clock out and discard `len` bytes.
    pub fn flush(&self, len: usize) -> Result<()> {
        let mut guard = self.lock()?;
        let p = &mut *guard;
        p.cs_assert();
        let r = p.read(len);
        p.cs_deassert();
        r.map(|_| ())
    }

    /// Drop whatever the device left in its FIFO after leaving UCI framing.
    pub fn switch_protocol(&self) -> Result<()> {
        debug!("flushing link for protocol switch");
        self.flush(PROTOCOL_SWITCH_FLUSH_LEN)
    }

    /// Read steps up to chip select: irq edge with backoff, take the
    /// session mutex, re-check irq after a short delay, assert CS.
    fn await_irq(&self, backoff: &mut Backoff) -> Result<MutexGuard<'_, P>> {
        loop {
            {
                let mut guard = self.lock()?;
                let p = &mut *guard;
                let wait = self.edge_wait_ms(backoff, p);
                if p.wait_edge(Line::Irq, wait) == EdgeWait::TimedOut {
                    backoff.retry_or(p, || Error::TransportTimeout {
                        stage: "irq before read",
                    })?;
                    continue;
                }
            }

            let mut guard = self.lock()?;
            let p = &mut *guard;
            p.delay_ms(self.config.irq_recheck_delay_ms);
            if !p.is_asserted(Line::Irq) {
                debug!("spurious irq edge ignored");
                backoff.retry_or(p, || Error::TransportTimeout {
                    stage: "irq before read",
                })?;
                continue;
            }
            p.cs_assert();
            return Ok(guard);
        }
    }

    fn release_irq(&self, p: &mut P) {
        for _ in 0..self.config.irq_deassert_polls {
            if !p.is_asserted(Line::Irq) {
                return;
            }
            p.delay_ms(1);
        }
        warn!(
            "irq still asserted after {} polls, releasing chip select anyway",
            self.config.irq_deassert_polls
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;
    use crate::transport::traits::{Delay, HandshakeLines, SpiBus};
    use crate::types::Level;

    fn session(mock: MockTransport) -> LinkSession<MockTransport> {
        LinkSession::new(mock)
    }

    #[test]
    fn probe_alignment() {
        let (h, carried) = align_probe(&[0x40, 0x02, 0x00, 0x03, 0xAA]);
        assert_eq!(h, [0x40, 0x02, 0x00, 0x03]);
        assert_eq!(carried, &[0xAA]);

        let (h, carried) = align_probe(&[0x00, 0x40, 0x02, 0x00, 0x03]);
        assert_eq!(h, [0x40, 0x02, 0x00, 0x03]);
        assert!(carried.is_empty());
        assert_eq!(parse_link_header(&h), (false, 3));
    }

    #[test]
    fn write_records_frame_and_waits_for_release() {
        let s = session(MockTransport::new());
        s.write(&[0x20, 0x02, 0x00, 0x00]).unwrap();
        let m = s.into_inner().unwrap();
        assert_eq!(m.sent, vec![vec![0x20, 0x02, 0x00, 0x00]]);
        assert!(!m.cs_asserted);
    }

    #[test]
    fn write_times_out_when_ready_never_asserts() {
        let mut mock = MockTransport::new();
        mock.ready_stuck_high = true;
        let s = session(mock);
        match s.write(&[0x20, 0x02, 0x00, 0x00]) {
            Err(Error::TransportTimeout { stage }) => assert_eq!(stage, "ready before write"),
            other => panic!("expected timeout, got: {:?}", other),
        }
        let m = s.into_inner().unwrap();
        assert!(m.now_ms <= 250, "took {} ms", m.now_ms);
        assert!(m.sent.is_empty());
    }

    #[test]
    fn write_refuses_while_device_holds_irq() {
        let mut mock = MockTransport::new();
        mock.push_response(vec![0x60, 0x01, 0x00, 0x01, 0x01]);
        let s = session(mock);
        assert!(matches!(
            s.write(&[0x20, 0x02, 0x00, 0x00]),
            Err(Error::TransportTimeout {
                stage: "irq idle before write"
            })
        ));
    }

    #[test]
    fn write_retries_injected_transfer_failure() {
        let mut mock = MockTransport::new();
        mock.transfer_failures = 1;
        let s = session(mock);
        s.write(&[0x20, 0x03, 0x00, 0x00]).unwrap();
        let m = s.into_inner().unwrap();
        assert_eq!(m.sent.len(), 1);
    }

    #[test]
    fn oversized_frame_rejected_before_io() {
        let s = session(MockTransport::new());
        let frame = vec![0u8; 4 + 2049];
        assert!(matches!(s.write(&frame), Err(Error::InvalidLength { .. })));
    }

    #[test]
    fn read_aligned_frame() {
        let mut mock = MockTransport::new();
        mock.push_response(vec![0x40, 0x02, 0x00, 0x03, 0x00, 0x11, 0x22]);
        let s = session(mock);
        assert_eq!(
            s.read().unwrap(),
            vec![0x40, 0x02, 0x00, 0x03, 0x00, 0x11, 0x22]
        );
        let m = s.into_inner().unwrap();
        assert_eq!(m.pending_responses(), 0);
        assert!(!m.cs_asserted);
    }

    #[test]
    fn read_recovers_misaligned_header() {
        let mut mock = MockTransport::new();
        mock.push_response(vec![0x00, 0x60, 0x01, 0x00, 0x01, 0x01]);
        let s = session(mock);
        assert_eq!(s.read().unwrap(), vec![0x60, 0x01, 0x00, 0x01, 0x01]);
    }

    #[test]
    fn read_header_only_frame() {
        let mut mock = MockTransport::new();
        mock.push_response(vec![0x40, 0x00, 0x00, 0x00]);
        let s = session(mock);
        assert_eq!(s.read().unwrap(), vec![0x40, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn read_extended_length_frame() {
        let mut mock = MockTransport::new();
        let mut frame = vec![0x40, 0x80, 0x00, 0x01];
        frame.extend((0..256).map(|i| i as u8));
        mock.push_response(frame.clone());
        let s = session(mock);
        assert_eq!(s.read().unwrap(), frame);
    }

    #[test]
    fn read_low_power_is_fatal() {
        let mut mock = MockTransport::new();
        mock.push_response(vec![0xFF; 8]);
        mock.push_response(vec![0x40, 0x00, 0x00, 0x00]);
        let s = session(mock);
        assert!(matches!(s.read(), Err(Error::DeviceLowPower)));
        // no retry: the next frame is still queued
        assert_eq!(s.into_inner().unwrap().pending_responses(), 1);
    }

    #[test]
    fn read_skips_empty_frame() {
        let mut mock = MockTransport::new();
        mock.push_response(vec![0x00; 5]);
        mock.push_response(vec![0x40, 0x00, 0x00, 0x00]);
        let s = session(mock);
        assert_eq!(s.read().unwrap(), vec![0x40, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn read_ignores_spurious_edge() {
        let mut mock = MockTransport::new();
        mock.spurious_irq_edges = 2;
        mock.push_response_after(20, vec![0x40, 0x00, 0x00, 0x00]);
        let s = session(mock);
        assert_eq!(s.read().unwrap(), vec![0x40, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn read_waits_for_late_frame() {
        let mut mock = MockTransport::new();
        mock.push_response_after(150, vec![0x60, 0x00, 0x00, 0x00]);
        let s = session(mock);
        assert_eq!(s.read().unwrap(), vec![0x60, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn read_times_out_without_frame() {
        let s = session(MockTransport::new());
        assert!(matches!(
            s.read(),
            Err(Error::TransportTimeout {
                stage: "irq before read"
            })
        ));
        assert!(s.into_inner().unwrap().now_ms <= 250);
    }

    #[test]
    fn read_block_returns_fixed_length() {
        let mut mock = MockTransport::new();
        mock.push_response(vec![0x70; 256]);
        let s = session(mock);
        let block = s.read_block(256, 200).unwrap();
        assert_eq!(block.len(), 256);
    }

    #[test]
    fn hbci_transceive_reads_announced_body() {
        let mock = MockTransport::new()
            .with_responder(|_| vec![vec![0x04, 0x01, 0x00, 0x00]]);
        let s = session(mock);
        let answer = s.hbci_transceive(&[0x01, 0x21, 0x00, 0x00], 1000).unwrap();
        assert_eq!(answer, vec![0x04, 0x01, 0x00, 0x00]);

        let mock = MockTransport::new()
            .with_responder(|_| vec![vec![0x02, 0x35, 0x02, 0x00, 0x07, 0xC0]]);
        let s = session(mock);
        let answer = s.hbci_transceive(&[0x01, 0x35, 0x00, 0x00], 1000).unwrap();
        assert_eq!(answer, vec![0x02, 0x35, 0x02, 0x00, 0x07, 0xC0]);
    }

    /// Bus whose `read` hands back fewer bytes than asked for.
    struct TruncatingBus(MockTransport);

    impl SpiBus for TruncatingBus {
        fn cs_assert(&mut self) {
            self.0.cs_assert();
        }

        fn cs_deassert(&mut self) {
            self.0.cs_deassert();
        }

        fn write(&mut self, data: &[u8]) -> Result<()> {
            self.0.write(data)
        }

        fn read_into(&mut self, buf: &mut [u8]) -> Result<()> {
            self.0.read_into(buf)
        }

        fn read(&mut self, len: usize) -> Result<Vec<u8>> {
            let mut buf = vec![0u8; len / 2];
            self.0.read_into(&mut buf)?;
            Ok(buf)
        }
    }

    impl HandshakeLines for TruncatingBus {
        fn level(&self, line: Line) -> Level {
            self.0.level(line)
        }

        fn wait_edge(&mut self, line: Line, timeout_ms: u64) -> EdgeWait {
            self.0.wait_edge(line, timeout_ms)
        }
    }

    impl Delay for TruncatingBus {
        fn delay_ms(&mut self, ms: u64) {
            self.0.delay_ms(ms);
        }

        fn now_ms(&self) -> u64 {
            self.0.now_ms()
        }
    }

    #[test]
    fn reads_do_not_depend_on_read_returning_full_length() {
        let mut mock = MockTransport::new();
        mock.push_response(vec![0x40, 0x02, 0x00, 0x03, 0x00, 0x01, 0x01]);
        let s = LinkSession::new(TruncatingBus(mock));
        assert_eq!(
            s.read().unwrap(),
            vec![0x40, 0x02, 0x00, 0x03, 0x00, 0x01, 0x01]
        );

        let mock = MockTransport::new()
            .with_responder(|_| vec![vec![0x02, 0x35, 0x02, 0x00, 0x07, 0xC0]]);
        let s = LinkSession::new(TruncatingBus(mock));
        let answer = s.hbci_transceive(&[0x01, 0x35, 0x00, 0x00], 1000).unwrap();
        assert_eq!(answer, vec![0x02, 0x35, 0x02, 0x00, 0x07, 0xC0]);
    }

    #[test]
    fn flush_discards_bytes() {
        let mut mock = MockTransport::new();
        mock.push_response(vec![0x12; 10]);
        let s = session(mock);
        s.switch_protocol().unwrap();
        assert_eq!(s.into_inner().unwrap().pending_responses(), 0);
    }
}
