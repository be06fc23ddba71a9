//! Firmware Hub (FWH/LPC) bus transport
//!
//! Single-byte read and write cycles against an FWH-attached flash device,
//! built from [`NibbleBus`] primitives: start framing, a seven-nibble
//! address phase, a one-byte data phase and a polled turnaround. All waiting
//! is bounded busy-polling; nothing here blocks on an event source.
//!
//! Every operation, including its failure paths, leaves the bus driven and
//! idle so a dead cycle cannot corrupt the next one.

use crate::error::{Error, Result};
use crate::nibble::{BusDirection, NibbleBus};

/// FWH start/abort cycle codes, one nibble each.
pub mod cycle {
    /// Start a single-byte read cycle.
    pub const START_READ: u8 = 0b1101;
    /// Start a single-byte write cycle.
    pub const START_WRITE: u8 = 0b1110;
    /// Abort/terminate the current cycle. Doubles as the idle line pattern.
    pub const ABORT: u8 = 0b1111;
}

/// Firmware hub address window. The low nibble of its top byte is the fixed
/// lead-in of every transmitted address; revisit `send_address` if the
/// window ever moves.
pub const FWH_SPACE: u32 = 0xFF00_0000;

/// The single hardwired device identity on this bus.
const IDSEL: u8 = 0x0;

/// IMSIZE field for a one-byte transfer.
const IMSIZE_SINGLE: u8 = 0x0;

/// Swap the two nibbles of a byte.
///
/// The address phase transmits each byte's bit-reversed nibble-swap
/// companion ahead of the byte itself; since the bus consumes only the low
/// four bits of every write, the companion puts the high nibble on the wire
/// first. A wire-format quirk to preserve bit for bit, not to simplify.
pub const fn swap(byte: u8) -> u8 {
    (byte << 4) | (byte >> 4)
}

/// FWH transport engine over a [`NibbleBus`].
///
/// Holds no state of its own beyond the bus it owns: cycle legality and the
/// resting-state guarantee live here, pin wiggling lives in the bus
/// implementation.
pub struct FwhTransport<B: NibbleBus> {
    bus: B,
}

impl<B: NibbleBus> FwhTransport<B> {
    /// Create a transport over `bus`. No bus traffic happens until `init`.
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    /// Access the underlying bus.
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Mutable access to the underlying bus.
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Initialize the underlying nibble bus.
    pub fn init(&mut self) -> Result<()> {
        self.bus.init()
    }

    /// Release the underlying nibble bus. Safe to call repeatedly.
    pub fn uninit(&mut self) {
        self.bus.cleanup();
    }

    fn clocked_write(&mut self, nibble: u8) {
        self.bus.write_nibble(nibble);
        self.bus.clock_cycle();
    }

    /// Transmit the seven-nibble address phase: the fixed `0xF` lead-in of
    /// the [`FWH_SPACE`] window, then the three low address bytes
    /// most-significant first, each as its swapped companion followed by the
    /// byte itself.
    fn send_address(&mut self, addr: u32) {
        self.clocked_write(0xF);
        for shift in [16u32, 8, 0] {
            let byte = (addr >> shift) as u8;
            self.clocked_write(swap(byte));
            self.clocked_write(byte);
        }
    }

    /// Execute one single-byte read cycle at `addr`.
    ///
    /// Only the low 24 bits of `addr` reach the wire, beneath the fixed
    /// lead-in nibble. A device that never signals ready reports
    /// [`Error::NotPresent`]; the cycle is aborted and the bus left idle
    /// either way.
    pub fn read_address(&mut self, addr: u32) -> Result<u8> {
        self.bus.start(cycle::START_READ);
        self.clocked_write(IDSEL);
        self.send_address(addr);
        self.clocked_write(IMSIZE_SINGLE);
        self.bus.set_direction(BusDirection::Input);
        self.bus.clock_cycle();
        if !self.bus.ready_sync() {
            self.bus.set_direction(BusDirection::Output);
            self.clocked_write(cycle::ABORT);
            self.bus.clock_cycle();
            log::debug!("fwh: read 0x{:08x}: no ready, cycle aborted", addr);
            return Err(Error::NotPresent);
        }
        let byte = self.bus.read_byte();
        self.bus.clock_cycle();
        self.bus.set_direction(BusDirection::Output);
        self.clocked_write(cycle::ABORT);
        self.bus.clock_cycle();
        Ok(byte)
    }

    /// Execute one single-byte write cycle at `addr`.
    ///
    /// Same framing as a read, then the data byte, then the turnaround: the
    /// abort pattern is driven without a clock before the bus is handed to
    /// the device for its ready phase.
    pub fn write_address(&mut self, addr: u32, byte: u8) -> Result<()> {
        self.bus.start(cycle::START_WRITE);
        self.clocked_write(IDSEL);
        self.send_address(addr);
        self.clocked_write(IMSIZE_SINGLE);
        self.bus.write_byte(byte);
        self.bus.write_nibble(cycle::ABORT);
        self.bus.set_direction(BusDirection::Input);
        self.bus.clock_cycle();
        self.bus.clock_cycle();
        if !self.bus.ready_sync() {
            self.bus.set_direction(BusDirection::Output);
            log::debug!("fwh: write 0x{:08x}: no ready", addr);
            return Err(Error::NotPresent);
        }
        self.bus.clock_cycle();
        self.bus.set_direction(BusDirection::Output);
        Ok(())
    }

    /// Bus presence probe: pulse the device reset line, reinitialize, and
    /// read at the top of the firmware hub window. Any answer counts; the
    /// data does not.
    pub fn test(&mut self) -> bool {
        self.bus.reset_pulse();
        if self.init().is_err() {
            log::warn!("fwh: bus init failed during presence test");
            return false;
        }
        match self.read_address(0xFFFF_FFFF) {
            Ok(_) => {
                log::info!("fwh: device answered presence probe");
                true
            }
            Err(_) => {
                log::warn!("fwh: no device on the bus");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swap_pins_known_values() {
        assert_eq!(swap(0x00), 0x00);
        assert_eq!(swap(0x12), 0x21);
        assert_eq!(swap(0xAB), 0xBA);
        assert_eq!(swap(0xF0), 0x0F);
        assert_eq!(swap(0xFF), 0xFF);
    }

    #[test]
    fn swap_is_its_own_inverse() {
        for byte in 0..=255u8 {
            assert_eq!(swap(swap(byte)), byte);
        }
    }

    #[test]
    fn cycle_codes_are_single_nibbles() {
        assert_eq!(cycle::START_READ, 0xD);
        assert_eq!(cycle::START_WRITE, 0xE);
        assert_eq!(cycle::ABORT, 0xF);
    }
}
