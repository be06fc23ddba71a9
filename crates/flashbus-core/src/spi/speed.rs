//! SPI clock divisor table and selection
//!
//! The master peripheral derives its clock from the CPU clock through seven
//! fixed divisors. Selection picks the fastest divisor whose frequency does
//! not exceed the request, clamping requests below the slowest entry to the
//! slowest divisor; a caller therefore never gets a faster clock than it
//! asked for.

/// CPU core clock the divisor table is derived from.
pub const F_CPU: u32 = 16_000_000;

/// Double-speed marker in the control column. The two low bits are the
/// peripheral's rate-select field.
pub const CTRL_2X: u8 = 0x80;

/// One divisor table row: peripheral control bits and the resulting clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeedEntry {
    /// Control bits handed to [`SpiPort::enable`](super::SpiPort::enable).
    pub ctrl: u8,
    /// Resulting SPI clock in Hz.
    pub hz: u32,
}

/// Divisor table, fastest first: `F_CPU` / {2, 4, 8, 16, 32, 64, 128}.
pub static SPEED_TABLE: [SpeedEntry; 7] = [
    SpeedEntry { ctrl: CTRL_2X, hz: F_CPU / 2 },
    SpeedEntry { ctrl: 0x00, hz: F_CPU / 4 },
    SpeedEntry { ctrl: CTRL_2X | 0x01, hz: F_CPU / 8 },
    SpeedEntry { ctrl: 0x01, hz: F_CPU / 16 },
    SpeedEntry { ctrl: CTRL_2X | 0x02, hz: F_CPU / 32 },
    SpeedEntry { ctrl: 0x02, hz: F_CPU / 64 },
    SpeedEntry { ctrl: 0x03, hz: F_CPU / 128 },
];

/// Pick the fastest table row whose frequency does not exceed `hz`.
///
/// Returns the row index and its frequency. Requests below the slowest row
/// clamp to it.
pub fn select(hz: u32) -> (usize, u32) {
    for (idx, entry) in SPEED_TABLE.iter().enumerate() {
        if hz >= entry.hz {
            return (idx, entry.hz);
        }
    }
    let last = SPEED_TABLE.len() - 1;
    (last, SPEED_TABLE[last].hz)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_spans_div2_to_div128_decreasing() {
        assert_eq!(SPEED_TABLE[0].hz, F_CPU / 2);
        assert_eq!(SPEED_TABLE[6].hz, F_CPU / 128);
        for pair in SPEED_TABLE.windows(2) {
            assert!(pair[0].hz > pair[1].hz);
        }
    }

    #[test]
    fn select_hits_exact_entries() {
        for (idx, entry) in SPEED_TABLE.iter().enumerate() {
            let (chosen, hz) = select(entry.hz);
            assert_eq!(chosen, idx);
            assert_eq!(hz, entry.hz);
        }
    }

    #[test]
    fn select_between_entries_rounds_down() {
        // F_CPU/10 sits between the /8 and /16 rows; the result must not
        // exceed the request.
        let (idx, hz) = select(F_CPU / 10);
        assert_eq!(idx, 3);
        assert_eq!(hz, F_CPU / 16);
    }

    #[test]
    fn select_clamps_below_slowest() {
        let (idx, hz) = select(1);
        assert_eq!(idx, 6);
        assert_eq!(hz, F_CPU / 128);
    }

    #[test]
    fn select_caps_above_fastest() {
        let (idx, hz) = select(u32::MAX);
        assert_eq!(idx, 0);
        assert_eq!(hz, F_CPU / 2);
    }
}
