//! SPI bus transport
//!
//! Drives an SPI-attached flash chip through an injected [`SpiPort`]:
//! lifecycle and clock configuration, chip-select framed exchanges, and
//! streamed bulk transfers that relay bytes to and from a host link one at a
//! time. Identification probes live in [`probe`], the divisor table in
//! [`speed`].

pub mod opcodes;
pub mod probe;
pub mod speed;

pub use probe::{odd_parity, ChipId};
pub use speed::{SpeedEntry, F_CPU, SPEED_TABLE};

use crate::link::{ByteSink, ByteSource};

/// Filler byte shifted out while receiving.
const FILL: u8 = 0xFF;

/// SPI master peripheral and its chip-select line.
///
/// `enable`/`disable` configure the shift engine only; they must leave
/// chip-select alone so a live re-init (speed change) cannot glitch a
/// selected chip. `deselect` owns the settle time of releasing a pulled-up
/// select line.
pub trait SpiPort {
    /// Enable the master with the given control bits (one
    /// [`SpeedEntry::ctrl`] value).
    fn enable(&mut self, ctrl: u8);

    /// Disable the master.
    fn disable(&mut self);

    /// Assert chip-select.
    fn select(&mut self);

    /// Release chip-select and wait out the pull-up settle.
    fn deselect(&mut self);

    /// Shift one byte out while shifting one in.
    fn transfer(&mut self, out: u8) -> u8;
}

/// SPI transport engine over a [`SpiPort`].
///
/// Carries the stored divisor choice and the initialized flag; both used to
/// be hidden module state in older firmware and are deliberately per-handle
/// here.
pub struct SpiTransport<P: SpiPort> {
    port: P,
    speed_idx: usize,
    initialized: bool,
}

impl<P: SpiPort> SpiTransport<P> {
    /// Create a transport over `port`, defaulting to the fastest divisor.
    /// No port traffic happens until `init`.
    pub fn new(port: P) -> Self {
        Self {
            port,
            speed_idx: 0,
            initialized: false,
        }
    }

    /// Access the underlying port.
    pub fn port(&self) -> &P {
        &self.port
    }

    /// Mutable access to the underlying port.
    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    /// Map `target_hz` to the fastest divisor not exceeding it and store the
    /// choice; a live peripheral is re-programmed immediately.
    ///
    /// Returns the frequency actually selected, never the request verbatim;
    /// callers learn the true speed from the return value.
    pub fn set_speed(&mut self, target_hz: u32) -> u32 {
        let (idx, actual_hz) = speed::select(target_hz);
        self.speed_idx = idx;
        log::debug!("spi: requested {} Hz, selected {} Hz", target_hz, actual_hz);
        if self.initialized {
            self.port.enable(speed::SPEED_TABLE[idx].ctrl);
        }
        actual_hz
    }

    /// Enable the master at the stored divisor.
    pub fn init(&mut self) {
        self.port.enable(speed::SPEED_TABLE[self.speed_idx].ctrl);
        self.initialized = true;
    }

    /// Enable the master only if it is not already enabled.
    pub fn init_if_needed(&mut self) {
        if !self.initialized {
            self.init();
        }
    }

    /// Disable the master. Returns whether it had actually been enabled, so
    /// callers can tear down unconditionally and still learn what happened.
    pub fn uninit(&mut self) -> bool {
        if !self.initialized {
            return false;
        }
        self.port.disable();
        self.initialized = false;
        true
    }

    fn local_op_start(&mut self, send: &[u8]) {
        self.port.select();
        for &byte in send {
            self.port.transfer(byte);
        }
    }

    fn local_op_end(&mut self, recv: &mut [u8]) {
        for slot in recv.iter_mut() {
            *slot = self.port.transfer(FILL);
        }
        self.port.deselect();
    }

    /// Fixed-length exchange: select, clock out `send`, clock `recv.len()`
    /// reply bytes into `recv`, deselect.
    pub fn local_op(&mut self, send: &[u8], recv: &mut [u8]) {
        self.local_op_start(send);
        self.local_op_end(recv);
    }

    fn stream_op_start<S: ByteSource + ?Sized>(&mut self, source: &mut S, send_len: u32) {
        self.port.select();
        for _ in 0..send_len {
            let byte = source.pull_byte();
            self.port.transfer(byte);
        }
    }

    fn stream_op_end<K: ByteSink + ?Sized>(&mut self, sink: &mut K, recv_len: u32) {
        for _ in 0..recv_len {
            let byte = self.port.transfer(FILL);
            sink.push_byte(byte);
        }
        self.port.deselect();
    }

    /// Streamed exchange: clock out `send_len` bytes pulled from the link,
    /// acknowledge the command phase, then clock `recv_len` reply bytes back
    /// into the link.
    ///
    /// One byte is in flight at a time, so transfer length is independent of
    /// RAM; both counts are caller-supplied and finite, which is the only
    /// bound this path needs.
    pub fn stream_op<L>(&mut self, link: &mut L, send_len: u32, recv_len: u32)
    where
        L: ByteSource + ByteSink + ?Sized,
    {
        self.stream_op_start(link, send_len);
        link.ack();
        self.stream_op_end(link, recv_len);
    }

    /// Read one byte at `addr` (low 24 bits) with the plain read command.
    pub fn read_byte(&mut self, addr: u32) -> u8 {
        let mut reply = [0u8; 1];
        self.local_op(&read_header(addr), &mut reply);
        reply[0]
    }

    /// Read `len` bytes starting at `addr` (low 24 bits), pushing each one
    /// to `sink` as it arrives.
    pub fn read_stream<K: ByteSink + ?Sized>(&mut self, sink: &mut K, addr: u32, len: u32) {
        self.local_op_start(&read_header(addr));
        self.stream_op_end(sink, len);
    }
}

/// Header of the plain read command: opcode plus three address bytes, most
/// significant first.
fn read_header(addr: u32) -> [u8; 4] {
    [
        opcodes::READ,
        (addr >> 16) as u8,
        (addr >> 8) as u8,
        addr as u8,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_header_is_msb_first() {
        assert_eq!(read_header(0x123456), [opcodes::READ, 0x12, 0x34, 0x56]);
        // Bits above the 24-bit address field never reach the header.
        assert_eq!(read_header(0xFF123456), read_header(0x123456));
    }
}
