//! Nibble bus seam consumed by the FWH transport
//!
//! The FWH engine drives a 4-bit data path plus clock and frame lines. The
//! pin-level recipe is hardware specific and lives behind this trait; the
//! engine composes the primitives into whole bus cycles.

use crate::Result;

/// Direction of the 4-bit data lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusDirection {
    /// Data lines driven by this master.
    Output,
    /// Data lines released and sampled.
    Input,
}

/// Bit-level access to the nibble bus lines.
///
/// Data-line writes and clock pulses are separate primitives: `write_nibble`
/// only drives the lines, and a clocked emission is a write followed by
/// [`clock_cycle`](NibbleBus::clock_cycle). The split matters once per write
/// cycle, where the turnaround pattern is driven without a clock before the
/// direction flips.
pub trait NibbleBus {
    /// Claim and configure the bus pins.
    fn init(&mut self) -> Result<()>;

    /// Release the bus pins. Safe to call when never initialized.
    fn cleanup(&mut self);

    /// Switch the data lines between driven and sampled.
    fn set_direction(&mut self, dir: BusDirection);

    /// Drive a start code onto the bus with the frame line asserted,
    /// including its clock pulse. Begins a new cycle regardless of what the
    /// previous one left behind.
    fn start(&mut self, code: u8);

    /// Drive the low four bits of `nibble` onto the data lines. No clock.
    fn write_nibble(&mut self, nibble: u8);

    /// Sample the data lines. Meaningful only in input direction.
    fn read_nibble(&mut self) -> u8;

    /// Pulse the bus clock once.
    fn clock_cycle(&mut self);

    /// Poll the slave-ready phase for a bounded number of attempts,
    /// consuming clocks. After `true` the data lines carry the first (high)
    /// data nibble; `false` means no device ever signalled ready.
    fn ready_sync(&mut self) -> bool;

    /// Pulse the device reset line: assert briefly, release, and let the
    /// pull-up settle. Usable whether or not the bus is initialized.
    fn reset_pulse(&mut self);

    /// Write a byte as two clocked nibbles, high nibble first.
    fn write_byte(&mut self, byte: u8) {
        self.write_nibble(byte >> 4);
        self.clock_cycle();
        self.write_nibble(byte);
        self.clock_cycle();
    }

    /// Read a byte as two nibble samples with one clock between them. The
    /// clock that steps past the final nibble belongs to the caller.
    fn read_byte(&mut self) -> u8 {
        let hi = self.read_nibble() & 0x0F;
        self.clock_cycle();
        let lo = self.read_nibble() & 0x0F;
        (hi << 4) | lo
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingBus {
        driven: heapless::Vec<u8, 8>,
        sampled: heapless::Vec<u8, 8>,
        sample_pos: usize,
        clocks: usize,
    }

    impl NibbleBus for RecordingBus {
        fn init(&mut self) -> Result<()> {
            Ok(())
        }
        fn cleanup(&mut self) {}
        fn set_direction(&mut self, _dir: BusDirection) {}
        fn start(&mut self, _code: u8) {}
        fn write_nibble(&mut self, nibble: u8) {
            let _ = self.driven.push(nibble & 0x0F);
        }
        fn read_nibble(&mut self) -> u8 {
            let n = self.sampled[self.sample_pos];
            self.sample_pos += 1;
            n
        }
        fn clock_cycle(&mut self) {
            self.clocks += 1;
        }
        fn ready_sync(&mut self) -> bool {
            true
        }
        fn reset_pulse(&mut self) {}
    }

    #[test]
    fn write_byte_is_two_clocked_nibbles_high_first() {
        let mut bus = RecordingBus::default();
        bus.write_byte(0xA5);
        assert_eq!(bus.driven.as_slice(), &[0xA, 0x5]);
        assert_eq!(bus.clocks, 2);
    }

    #[test]
    fn read_byte_assembles_high_then_low() {
        let mut bus = RecordingBus::default();
        let _ = bus.sampled.push(0x7);
        let _ = bus.sampled.push(0xE);
        assert_eq!(bus.read_byte(), 0x7E);
        // Only the clock between the nibbles; the trailing one is the caller's.
        assert_eq!(bus.clocks, 1);
    }
}
