//! flashbus-dummy - In-memory bus emulators for testing
//!
//! This crate provides emulated devices for both flashbus transports: an
//! FWH flash chip behind a [`NibbleBus`], an SPI flash chip behind an
//! [`SpiPort`], and a scripted host link for the streaming paths. They hold
//! their flash contents in memory and check the bus discipline of whoever
//! drives them, so transport behavior can be tested without real hardware.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "alloc")]
use alloc::collections::VecDeque;
#[cfg(feature = "alloc")]
use alloc::vec;
#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use flashbus_core::error::{Error, Result};
use flashbus_core::fwh::cycle;
use flashbus_core::link::{ByteSink, ByteSource};
use flashbus_core::nibble::{BusDirection, NibbleBus};
use flashbus_core::spi::{opcodes, SpiPort};

/// Configuration for the emulated firmware hub flash
#[derive(Debug, Clone)]
pub struct DummyFwhConfig {
    /// Flash size in bytes
    pub size: usize,
    /// Whether a device is on the bus and answers ready polls
    pub present: bool,
    /// Make bus driver bring-up fail
    pub fail_init: bool,
}

impl Default for DummyFwhConfig {
    fn default() -> Self {
        Self {
            size: 512 * 1024, // SST49LF004-class part
            present: true,
            fail_init: false,
        }
    }
}

/// A read or write cycle that has been decoded but not yet acknowledged.
#[cfg(feature = "alloc")]
enum PendingCycle {
    Read,
    Write { offset: usize, byte: u8 },
}

/// Emulated FWH flash device on a nibble bus
///
/// Decodes the cycles a master drives at it: accumulates the nibbles of the
/// framing and address phases, parses them at the bus turnaround, and serves
/// or absorbs the data phase when the ready poll lands. Departures from the
/// cycle format are counted rather than panicking, so tests can assert a
/// clean run with one check.
#[cfg(feature = "alloc")]
pub struct DummyFwhFlash {
    config: DummyFwhConfig,
    data: Vec<u8>,
    present: bool,
    initialized: bool,
    direction: BusDirection,
    start_code: Option<u8>,
    nibbles: Vec<u8>,
    pending: Option<PendingCycle>,
    out_nibbles: [u8; 2],
    out_pos: usize,
    serving: bool,
    last_address: Option<u32>,
    resets: usize,
    violations: usize,
}

#[cfg(feature = "alloc")]
impl DummyFwhFlash {
    /// Create a new emulated device with the given configuration
    pub fn new(config: DummyFwhConfig) -> Self {
        let data = vec![0xFF; config.size];
        let present = config.present;
        Self {
            config,
            data,
            present,
            initialized: false,
            direction: BusDirection::Output,
            start_code: None,
            nibbles: Vec::new(),
            pending: None,
            out_nibbles: [0xF, 0xF],
            out_pos: 0,
            serving: false,
            last_address: None,
            resets: 0,
            violations: 0,
        }
    }

    /// Create a new emulated device with default configuration
    pub fn new_default() -> Self {
        Self::new(DummyFwhConfig::default())
    }

    /// Get a reference to the flash data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get a mutable reference to the flash data
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Get the configuration
    pub fn config(&self) -> &DummyFwhConfig {
        &self.config
    }

    /// Attach or detach the device without touching the bus driver state.
    pub fn set_present(&mut self, present: bool) {
        self.present = present;
    }

    /// The 28-bit address field of the last decoded cycle, as transmitted.
    pub fn last_address(&self) -> Option<u32> {
        self.last_address
    }

    /// Current direction of the data lines, as the master left them.
    pub fn direction(&self) -> BusDirection {
        self.direction
    }

    /// Whether the bus driver is currently initialized.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Number of reset pulses seen.
    pub fn resets(&self) -> usize {
        self.resets
    }

    /// Number of bus discipline departures seen.
    pub fn violations(&self) -> usize {
        self.violations
    }

    fn violation(&mut self, what: &str) {
        log::warn!("fwh-dummy: {}", what);
        self.violations += 1;
    }

    fn address_field(&self) -> u32 {
        self.nibbles[1..8]
            .iter()
            .fold(0u32, |field, &nibble| (field << 4) | u32::from(nibble))
    }

    fn data_offset(&self, wire: u32) -> usize {
        (wire & 0x00FF_FFFF) as usize % self.data.len()
    }

    /// Parse the accumulated master-driven nibbles at the bus turnaround.
    ///
    /// A read cycle is nine nibbles (IDSEL, seven address, IMSIZE), a write
    /// cycle twelve with the data byte and the unclocked turnaround pattern
    /// appended. Nothing touches the flash array yet; that waits for the
    /// ready poll.
    fn parse_cycle(&mut self) {
        let code = match self.start_code.take() {
            Some(code) => code,
            None => {
                self.violation("turnaround without a start cycle");
                return;
            }
        };
        match code {
            cycle::START_READ => {
                if self.nibbles.len() != 9 {
                    self.violation("read cycle with a malformed nibble count");
                    return;
                }
                if self.nibbles[0] != 0x0 {
                    self.violation("nonzero IDSEL");
                }
                if self.nibbles[8] != 0x0 {
                    self.violation("nonzero IMSIZE");
                }
                let wire = self.address_field();
                self.last_address = Some(wire);
                let byte = self.data[self.data_offset(wire)];
                self.out_nibbles = [byte >> 4, byte & 0x0F];
                self.pending = Some(PendingCycle::Read);
                log::trace!("fwh-dummy: read cycle at 0x{:07x}", wire);
            }
            cycle::START_WRITE => {
                if self.nibbles.len() != 12 {
                    self.violation("write cycle with a malformed nibble count");
                    return;
                }
                if self.nibbles[0] != 0x0 {
                    self.violation("nonzero IDSEL");
                }
                if self.nibbles[8] != 0x0 {
                    self.violation("nonzero IMSIZE");
                }
                if self.nibbles[11] != cycle::ABORT {
                    self.violation("write cycle without the turnaround pattern");
                }
                let wire = self.address_field();
                self.last_address = Some(wire);
                let offset = self.data_offset(wire);
                let byte = (self.nibbles[9] << 4) | self.nibbles[10];
                self.pending = Some(PendingCycle::Write { offset, byte });
                log::trace!("fwh-dummy: write cycle at 0x{:07x}", wire);
            }
            _ => self.violation("unknown start cycle code"),
        }
    }
}

#[cfg(feature = "alloc")]
impl NibbleBus for DummyFwhFlash {
    fn init(&mut self) -> Result<()> {
        if self.config.fail_init {
            return Err(Error::InitFailed);
        }
        self.initialized = true;
        self.direction = BusDirection::Output;
        self.start_code = None;
        self.pending = None;
        self.serving = false;
        Ok(())
    }

    fn cleanup(&mut self) {
        self.initialized = false;
    }

    fn set_direction(&mut self, dir: BusDirection) {
        if dir == BusDirection::Input && self.direction == BusDirection::Output {
            self.parse_cycle();
        }
        if dir == BusDirection::Output {
            self.serving = false;
        }
        self.direction = dir;
    }

    fn start(&mut self, code: u8) {
        if !self.initialized {
            self.violation("start cycle before init");
        }
        if self.direction != BusDirection::Output {
            self.violation("start cycle while the device owns the bus");
        }
        self.start_code = Some(code & 0x0F);
        self.nibbles.clear();
        self.pending = None;
        self.serving = false;
    }

    fn write_nibble(&mut self, nibble: u8) {
        if self.direction != BusDirection::Output {
            self.violation("write while the device owns the bus");
            return;
        }
        // Drives outside a framed cycle are the idle/abort pattern.
        if self.start_code.is_some() {
            self.nibbles.push(nibble & 0x0F);
        }
    }

    fn read_nibble(&mut self) -> u8 {
        if !self.serving {
            self.violation("read with no data phase in progress");
            return 0x0F;
        }
        self.out_nibbles[self.out_pos]
    }

    fn clock_cycle(&mut self) {
        if self.serving && self.out_pos < 1 {
            self.out_pos += 1;
        }
    }

    fn ready_sync(&mut self) -> bool {
        let pending = match self.pending.take() {
            Some(pending) => pending,
            None => {
                self.violation("ready poll with no cycle pending");
                return false;
            }
        };
        if !self.present {
            return false;
        }
        match pending {
            PendingCycle::Read => {
                self.serving = true;
                self.out_pos = 0;
            }
            PendingCycle::Write { offset, byte } => {
                self.data[offset] = byte;
            }
        }
        true
    }

    fn reset_pulse(&mut self) {
        self.resets += 1;
        self.start_code = None;
        self.pending = None;
        self.serving = false;
    }
}

/// What the data line reads back when no chip drives it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpiBusMode {
    /// A chip is attached and decodes commands
    Attached,
    /// Nothing drives the bus; it floats high
    FloatingHigh,
    /// A stuck or shorted line reads all zeroes
    FloatingLow,
}

/// Configuration for the emulated SPI flash
#[derive(Debug, Clone)]
pub struct DummySpiConfig {
    /// JEDEC manufacturer ID
    pub manufacturer_id: u8,
    /// JEDEC device ID
    pub device_id: u16,
    /// Device byte of the REMS signature pair
    pub rems_device_id: u8,
    /// One-byte RES electronic signature
    pub res_id: u8,
    /// Flash size in bytes
    pub size: usize,
    /// How the bus behaves
    pub mode: SpiBusMode,
}

impl Default for DummySpiConfig {
    fn default() -> Self {
        Self {
            manufacturer_id: 0xEF, // Winbond
            device_id: 0x4018,     // W25Q128FV
            rems_device_id: 0x17,
            res_id: 0x17,
            size: 16 * 1024 * 1024,
            mode: SpiBusMode::Attached,
        }
    }
}

/// Emulated SPI flash chip
///
/// Answers the identification commands and the plain read command with
/// full-duplex timing: each transferred byte's reply is decided by the bytes
/// received before it, exactly one reply byte per clocked byte. Framing
/// mistakes by the master (transfers outside a select, double selects) are
/// counted, not panicked on.
#[cfg(feature = "alloc")]
pub struct DummySpiFlash {
    config: DummySpiConfig,
    data: Vec<u8>,
    enabled: bool,
    selected: bool,
    last_ctrl: Option<u8>,
    enable_count: usize,
    received: Vec<u8>,
    violations: usize,
}

#[cfg(feature = "alloc")]
impl DummySpiFlash {
    /// Create a new emulated chip with the given configuration
    pub fn new(config: DummySpiConfig) -> Self {
        let data = vec![0xFF; config.size];
        Self {
            config,
            data,
            enabled: false,
            selected: false,
            last_ctrl: None,
            enable_count: 0,
            received: Vec::new(),
            violations: 0,
        }
    }

    /// Create a new emulated chip with default configuration (W25Q128FV)
    pub fn new_default() -> Self {
        Self::new(DummySpiConfig::default())
    }

    /// Create an emulated chip with pre-filled data
    pub fn with_data(config: DummySpiConfig, initial_data: &[u8]) -> Self {
        let mut chip = Self::new(config);
        let len = core::cmp::min(initial_data.len(), chip.data.len());
        chip.data[..len].copy_from_slice(&initial_data[..len]);
        chip
    }

    /// Get a reference to the flash data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get a mutable reference to the flash data
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Get the configuration
    pub fn config(&self) -> &DummySpiConfig {
        &self.config
    }

    /// Whether the master peripheral is currently enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether chip-select is currently asserted.
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Control bits of the most recent enable.
    pub fn last_ctrl(&self) -> Option<u8> {
        self.last_ctrl
    }

    /// Number of times the master was enabled.
    pub fn enable_count(&self) -> usize {
        self.enable_count
    }

    /// Number of bus discipline departures seen.
    pub fn violations(&self) -> usize {
        self.violations
    }

    fn violation(&mut self, what: &str) {
        log::warn!("spi-dummy: {}", what);
        self.violations += 1;
    }

    /// The byte shifted back for the transfer about to happen, decided by
    /// everything received since select.
    fn reply(&self) -> u8 {
        match self.config.mode {
            SpiBusMode::FloatingHigh => return 0xFF,
            SpiBusMode::FloatingLow => return 0x00,
            SpiBusMode::Attached => {}
        }
        let pos = self.received.len();
        if pos == 0 {
            // The opcode is still shifting in.
            return 0xFF;
        }
        match self.received[0] {
            opcodes::RDID => match pos {
                1 => self.config.manufacturer_id,
                2 => (self.config.device_id >> 8) as u8,
                3 => self.config.device_id as u8,
                _ => 0xFF,
            },
            opcodes::REMS if pos >= 4 => {
                if (pos - 4) % 2 == 0 {
                    self.config.manufacturer_id
                } else {
                    self.config.rems_device_id
                }
            }
            opcodes::RES if pos >= 4 => self.config.res_id,
            opcodes::READ if pos >= 4 => {
                let addr = (usize::from(self.received[1]) << 16)
                    | (usize::from(self.received[2]) << 8)
                    | usize::from(self.received[3]);
                self.data[(addr + pos - 4) % self.data.len()]
            }
            _ => 0xFF,
        }
    }
}

#[cfg(feature = "alloc")]
impl SpiPort for DummySpiFlash {
    fn enable(&mut self, ctrl: u8) {
        self.enabled = true;
        self.last_ctrl = Some(ctrl);
        self.enable_count += 1;
        log::trace!("spi-dummy: master enabled, ctrl 0x{:02x}", ctrl);
    }

    fn disable(&mut self) {
        self.enabled = false;
    }

    fn select(&mut self) {
        if !self.enabled {
            self.violation("select with the master disabled");
        }
        if self.selected {
            self.violation("select while already selected");
        }
        self.selected = true;
        self.received.clear();
    }

    fn deselect(&mut self) {
        if !self.selected {
            self.violation("deselect with no chip selected");
        }
        self.selected = false;
        self.received.clear();
    }

    fn transfer(&mut self, out: u8) -> u8 {
        if !self.enabled || !self.selected {
            self.violation("transfer outside a selected frame");
            return 0xFF;
        }
        let reply = self.reply();
        self.received.push(out);
        reply
    }
}

/// Scripted host link
///
/// A queue of bytes for the transport to pull and a log of everything it
/// pushed back, with the position of the first acknowledgement recorded so
/// tests can check the command phase was confirmed before reply data flowed.
#[cfg(feature = "alloc")]
#[derive(Debug, Default)]
pub struct DummyLink {
    input: VecDeque<u8>,
    output: Vec<u8>,
    acks: usize,
    ack_mark: Option<usize>,
    underruns: usize,
}

#[cfg(feature = "alloc")]
impl DummyLink {
    /// Create an empty link.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a link preloaded with bytes to be pulled.
    pub fn with_input(input: &[u8]) -> Self {
        let mut link = Self::new();
        link.queue(input);
        link
    }

    /// Append bytes to the pull queue.
    pub fn queue(&mut self, bytes: &[u8]) {
        self.input.extend(bytes.iter().copied());
    }

    /// Everything pushed to the link so far.
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Number of acknowledgements seen.
    pub fn acks(&self) -> usize {
        self.acks
    }

    /// Output length at the moment of the first acknowledgement.
    pub fn ack_mark(&self) -> Option<usize> {
        self.ack_mark
    }

    /// Bytes still waiting to be pulled.
    pub fn remaining_input(&self) -> usize {
        self.input.len()
    }

    /// Number of pulls that found the queue empty.
    pub fn underruns(&self) -> usize {
        self.underruns
    }
}

#[cfg(feature = "alloc")]
impl ByteSource for DummyLink {
    fn pull_byte(&mut self) -> u8 {
        match self.input.pop_front() {
            Some(byte) => byte,
            None => {
                self.underruns += 1;
                0xFF
            }
        }
    }
}

#[cfg(feature = "alloc")]
impl ByteSink for DummyLink {
    fn push_byte(&mut self, byte: u8) {
        self.output.push(byte);
    }

    fn ack(&mut self) {
        self.acks += 1;
        if self.ack_mark.is_none() {
            self.ack_mark = Some(self.output.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flashbus_core::fwh::FwhTransport;
    use flashbus_core::spi::{SpiTransport, F_CPU, SPEED_TABLE};

    /// The 28-bit field a correctly encoded cycle puts on the wire.
    fn wire_address(addr: u32) -> u32 {
        (addr & 0x00FF_FFFF) | 0x0F00_0000
    }

    #[test]
    fn test_fwh_read_encodes_address() {
        let mut fwh = FwhTransport::new(DummyFwhFlash::new_default());
        fwh.init().unwrap();
        for addr in [0x000000u32, 0x000001, 0x123456, 0xABCDEF, 0xFFFFFF] {
            fwh.read_address(addr).unwrap();
            assert_eq!(fwh.bus().last_address(), Some(wire_address(addr)));
        }
        // Bits above the hub window never reach the wire.
        fwh.read_address(0xFF12_3456).unwrap();
        assert_eq!(fwh.bus().last_address(), Some(wire_address(0x123456)));
        assert_eq!(fwh.bus().violations(), 0);
    }

    #[test]
    fn test_fwh_write_then_read() {
        let mut fwh = FwhTransport::new(DummyFwhFlash::new_default());
        fwh.init().unwrap();
        fwh.write_address(0x1234, 0x5A).unwrap();
        assert_eq!(fwh.read_address(0x1234).unwrap(), 0x5A);
        // The same cell through the full hub window address.
        assert_eq!(fwh.read_address(0xFF00_1234).unwrap(), 0x5A);
        assert_eq!(fwh.bus().violations(), 0);
    }

    #[test]
    fn test_fwh_erased_flash_reads_ff() {
        let mut fwh = FwhTransport::new(DummyFwhFlash::new_default());
        fwh.init().unwrap();
        assert_eq!(fwh.read_address(0).unwrap(), 0xFF);
    }

    #[test]
    fn test_fwh_absent_device() {
        let config = DummyFwhConfig {
            present: false,
            ..Default::default()
        };
        let mut fwh = FwhTransport::new(DummyFwhFlash::new(config));
        fwh.init().unwrap();
        assert_eq!(fwh.read_address(0x10), Err(Error::NotPresent));
        assert_eq!(fwh.bus().direction(), BusDirection::Output);
        assert_eq!(fwh.write_address(0x10, 0xAA), Err(Error::NotPresent));
        assert_eq!(fwh.bus().direction(), BusDirection::Output);
        // The write never landed.
        fwh.bus_mut().set_present(true);
        assert_eq!(fwh.read_address(0x10).unwrap(), 0xFF);
        assert_eq!(fwh.bus().violations(), 0);
    }

    #[test]
    fn test_fwh_recovers_fresh_data_after_failure() {
        let config = DummyFwhConfig {
            present: false,
            ..Default::default()
        };
        let mut fwh = FwhTransport::new(DummyFwhFlash::new(config));
        fwh.init().unwrap();
        assert!(fwh.read_address(0x40).is_err());
        fwh.bus_mut().data_mut()[0x40] = 0x42;
        fwh.bus_mut().set_present(true);
        // Nothing stale from the aborted cycle leaks into the retry.
        assert_eq!(fwh.read_address(0x40).unwrap(), 0x42);
        assert_eq!(fwh.bus().violations(), 0);
    }

    #[test]
    fn test_fwh_presence_probe() {
        let mut fwh = FwhTransport::new(DummyFwhFlash::new_default());
        assert!(fwh.test());
        assert_eq!(fwh.bus().resets(), 1);
        assert!(fwh.bus().is_initialized());
        assert_eq!(fwh.bus().direction(), BusDirection::Output);

        let config = DummyFwhConfig {
            present: false,
            ..Default::default()
        };
        let mut fwh = FwhTransport::new(DummyFwhFlash::new(config));
        assert!(!fwh.test());
        assert_eq!(fwh.bus().resets(), 1);
        assert_eq!(fwh.bus().direction(), BusDirection::Output);
    }

    #[test]
    fn test_fwh_init_failure() {
        let config = DummyFwhConfig {
            fail_init: true,
            ..Default::default()
        };
        let mut fwh = FwhTransport::new(DummyFwhFlash::new(config));
        assert_eq!(fwh.init(), Err(Error::InitFailed));
        assert!(!fwh.test());
        assert!(!fwh.bus().is_initialized());
    }

    #[test]
    fn test_spi_probe_rdid() {
        let mut spi = SpiTransport::new(DummySpiFlash::new_default());
        spi.init();
        let id = spi.probe_rdid().unwrap();
        assert_eq!(id.as_bytes(), &[0xEF, 0x40, 0x18]);
        assert!(!spi.port().is_selected());
        assert_eq!(spi.port().violations(), 0);
    }

    #[test]
    fn test_spi_probe_rems_and_res() {
        let mut spi = SpiTransport::new(DummySpiFlash::new_default());
        spi.init();
        assert_eq!(spi.probe_rems().unwrap().as_bytes(), &[0xEF, 0x17]);
        assert_eq!(spi.probe_res().unwrap().as_bytes(), &[0x17]);
        assert_eq!(spi.port().violations(), 0);
    }

    #[test]
    fn test_spi_probes_reject_floating_bus() {
        for mode in [SpiBusMode::FloatingHigh, SpiBusMode::FloatingLow] {
            let config = DummySpiConfig {
                mode,
                ..Default::default()
            };
            let mut spi = SpiTransport::new(DummySpiFlash::new(config));
            spi.init();
            assert_eq!(spi.probe_rdid(), None);
            assert_eq!(spi.probe_rems(), None);
            // Repeats stay rejected; nothing latches between attempts.
            assert_eq!(spi.probe_res(), None);
            assert_eq!(spi.probe_res(), None);
            assert_eq!(spi.probe_res(), None);
        }
    }

    #[test]
    fn test_spi_rdid_rejects_even_parity() {
        let config = DummySpiConfig {
            manufacturer_id: 0x03,
            ..Default::default()
        };
        let mut spi = SpiTransport::new(DummySpiFlash::new(config));
        spi.init();
        assert_eq!(spi.probe_rdid(), None);
        // REMS carries no parity rule and still answers.
        assert_eq!(spi.probe_rems().unwrap().as_bytes(), &[0x03, 0x17]);
    }

    #[test]
    fn test_spi_detect_keeps_bus_up_on_hit() {
        let mut spi = SpiTransport::new(DummySpiFlash::new_default());
        assert!(spi.test());
        assert!(spi.port().is_enabled());
        // Still initialized after the hit; tearing down reports it.
        assert!(spi.uninit());

        let config = DummySpiConfig {
            mode: SpiBusMode::FloatingHigh,
            ..Default::default()
        };
        let mut spi = SpiTransport::new(DummySpiFlash::new(config));
        assert!(!spi.test());
        assert!(!spi.port().is_enabled());
        assert!(!spi.uninit());
    }

    #[test]
    fn test_spi_detect_falls_back_to_rems() {
        // Parity kills RDID, but the chip still answers REMS.
        let config = DummySpiConfig {
            manufacturer_id: 0x03,
            ..Default::default()
        };
        let mut spi = SpiTransport::new(DummySpiFlash::new(config));
        assert!(spi.test());
        assert!(spi.uninit());
    }

    #[test]
    fn test_spi_set_speed_reprograms_live_master() {
        let mut spi = SpiTransport::new(DummySpiFlash::new_default());
        // Stored only: the master is still down.
        assert_eq!(spi.set_speed(F_CPU / 4), F_CPU / 4);
        assert_eq!(spi.port().enable_count(), 0);
        spi.init();
        assert_eq!(spi.port().enable_count(), 1);
        assert_eq!(spi.port().last_ctrl(), Some(SPEED_TABLE[1].ctrl));
        // A request between divisors rounds down to the next slower one.
        assert_eq!(spi.set_speed(F_CPU / 10), F_CPU / 16);
        assert_eq!(spi.port().enable_count(), 2);
        assert_eq!(spi.port().last_ctrl(), Some(SPEED_TABLE[3].ctrl));
        assert!(!spi.port().is_selected());
        assert_eq!(spi.port().violations(), 0);
    }

    #[test]
    fn test_spi_read_byte_and_stream() {
        let mut seed = vec![0u8; 0x108];
        seed[0x100..0x108].copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
        let chip = DummySpiFlash::with_data(DummySpiConfig::default(), &seed);
        let mut spi = SpiTransport::new(chip);
        spi.init();
        assert_eq!(spi.read_byte(0x100), 1);
        assert_eq!(spi.read_byte(0x107), 8);

        let mut link = DummyLink::new();
        spi.read_stream(&mut link, 0x100, 8);
        assert_eq!(link.output(), &[1, 2, 3, 4, 5, 6, 7, 8]);
        // Plain reads answer in the same frame; no command acknowledgement.
        assert_eq!(link.acks(), 0);
        assert!(!spi.port().is_selected());
        assert_eq!(spi.port().violations(), 0);
    }

    #[test]
    fn test_spi_stream_op_acks_between_phases() {
        let mut spi = SpiTransport::new(DummySpiFlash::new_default());
        spi.init();
        spi.port_mut().data_mut()[0x200..0x204].copy_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
        let mut link = DummyLink::with_input(&[opcodes::READ, 0x00, 0x02, 0x00]);
        spi.stream_op(&mut link, 4, 4);
        assert_eq!(link.remaining_input(), 0);
        assert_eq!(link.underruns(), 0);
        assert_eq!(link.acks(), 1);
        // The command phase is confirmed before any reply byte flows back.
        assert_eq!(link.ack_mark(), Some(0));
        assert_eq!(link.output(), &[0xDE, 0xAD, 0xBE, 0xEF]);
        assert!(!spi.port().is_selected());
        assert_eq!(spi.port().violations(), 0);
    }

    #[test]
    fn test_spi_local_op_round_trip() {
        let mut spi = SpiTransport::new(DummySpiFlash::new_default());
        spi.init();
        let mut id = [0u8; 3];
        spi.local_op(&[opcodes::RDID], &mut id);
        assert_eq!(id, [0xEF, 0x40, 0x18]);
        assert!(!spi.port().is_selected());
    }

    #[test]
    fn test_spi_rems_alternates_on_long_reads() {
        let mut spi = SpiTransport::new(DummySpiFlash::new_default());
        spi.init();
        // A master clocking past the signature pair keeps getting it.
        let mut id = [0u8; 4];
        spi.local_op(&[opcodes::REMS, 0, 0, 0], &mut id);
        assert_eq!(id, [0xEF, 0x17, 0xEF, 0x17]);
    }

    #[test]
    fn test_spi_lifecycle_is_idempotent() {
        let mut spi = SpiTransport::new(DummySpiFlash::new_default());
        assert!(!spi.uninit());
        spi.init_if_needed();
        assert_eq!(spi.port().enable_count(), 1);
        spi.init_if_needed();
        assert_eq!(spi.port().enable_count(), 1);
        assert!(spi.uninit());
        assert!(!spi.uninit());
        spi.init_if_needed();
        assert_eq!(spi.port().enable_count(), 2);
    }
}
