//! Chip identification probes
//!
//! Three independent heuristics, tried in order by the caller's detect
//! routine: the JEDEC RDID triple, the REMS manufacturer/device pair, and
//! the one-byte RES signature. A floating bus reads back all ones, or all
//! zeroes with a stuck line, so neither pattern is ever accepted as an
//! identity; RDID additionally insists on the odd parity every JEDEC
//! manufacturer code carries.

use super::{opcodes, SpiPort, SpiTransport};

/// Longest identity a probe returns (the RDID triple).
pub const MAX_ID_LEN: usize = 3;

/// Raw identity bytes captured by a successful probe, in wire order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChipId {
    bytes: heapless::Vec<u8, MAX_ID_LEN>,
}

impl ChipId {
    fn from_bytes(bytes: &[u8]) -> Self {
        let mut id = ChipId::default();
        let _ = id.bytes.extend_from_slice(bytes);
        id
    }

    /// The identity bytes, 1 to 3 of them depending on the probe.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Parity of a byte: `true` when it has an odd number of set bits.
///
/// Folds the nibbles, then the bit pairs, then the bits. JEDEC manufacturer
/// codes are assigned odd parity, which makes this a cheap sanity filter on
/// the first RDID byte.
pub fn odd_parity(byte: u8) -> bool {
    let folded = (byte ^ (byte >> 4)) & 0x0F;
    let folded = (folded ^ (folded >> 2)) & 0x03;
    ((folded ^ (folded >> 1)) & 0x01) != 0
}

fn floating_bus(bytes: &[u8]) -> bool {
    bytes.iter().all(|&b| b == 0xFF) || bytes.iter().all(|&b| b == 0x00)
}

impl<P: SpiPort> SpiTransport<P> {
    /// JEDEC Read ID probe: three identity bytes, filtered by the
    /// manufacturer-byte parity and the floating-bus patterns.
    pub fn probe_rdid(&mut self) -> Option<ChipId> {
        let mut id = [0u8; 3];
        self.local_op(&[opcodes::RDID], &mut id);
        if !odd_parity(id[0]) {
            log::debug!("spi: rdid {:02x?} fails manufacturer parity", id);
            return None;
        }
        if floating_bus(&id) {
            log::debug!("spi: rdid reads a floating bus ({:02x?})", id);
            return None;
        }
        Some(ChipId::from_bytes(&id))
    }

    /// REMS probe: manufacturer and device signature bytes.
    pub fn probe_rems(&mut self) -> Option<ChipId> {
        let mut id = [0u8; 2];
        self.local_op(&[opcodes::REMS, 0, 0, 0], &mut id);
        if floating_bus(&id) {
            log::debug!("spi: rems reads a floating bus ({:02x?})", id);
            return None;
        }
        Some(ChipId::from_bytes(&id))
    }

    /// RES probe: the one-byte electronic signature.
    pub fn probe_res(&mut self) -> Option<ChipId> {
        let mut id = [0u8; 1];
        self.local_op(&[opcodes::RES, 0, 0, 0], &mut id);
        if floating_bus(&id) {
            log::debug!("spi: res reads a floating bus ({:02x?})", id);
            return None;
        }
        Some(ChipId::from_bytes(&id))
    }

    /// Chip presence test: bring the bus up and try the probes in order.
    ///
    /// The first hit wins and the transport stays initialized for the
    /// traffic that invariably follows; only a complete miss tears the bus
    /// back down.
    pub fn test(&mut self) -> bool {
        self.init();
        if let Some(id) = self.probe_rdid() {
            log::info!("spi: chip found via RDID {:02x?}", id.as_bytes());
            return true;
        }
        if let Some(id) = self.probe_rems() {
            log::info!("spi: chip found via REMS {:02x?}", id.as_bytes());
            return true;
        }
        if let Some(id) = self.probe_res() {
            log::info!("spi: chip found via RES {:02x?}", id.as_bytes());
            return true;
        }
        log::warn!("spi: no chip answered any probe");
        self.uninit();
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parity_of_known_manufacturers_is_odd() {
        assert!(odd_parity(0xEF)); // Winbond
        assert!(odd_parity(0xC2)); // Macronix
        assert!(odd_parity(0x20)); // Micron/ST
        assert!(odd_parity(0x01)); // Spansion
    }

    #[test]
    fn parity_of_floating_patterns_is_even() {
        assert!(!odd_parity(0x00));
        assert!(!odd_parity(0xFF));
        assert!(!odd_parity(0x03));
    }

    #[test]
    fn parity_matches_popcount() {
        for byte in 0..=255u8 {
            assert_eq!(odd_parity(byte), byte.count_ones() % 2 == 1);
        }
    }

    #[test]
    fn chip_id_keeps_wire_order() {
        let id = ChipId::from_bytes(&[0xEF, 0x40, 0x18]);
        assert_eq!(id.as_bytes(), &[0xEF, 0x40, 0x18]);
    }
}
