//! SPI flash opcodes issued by this transport
//!
//! The small subset of the standard JEDEC command set this layer speaks:
//! the plain read plus the three identification commands the probes use.

// ============================================================================
// Identification
// ============================================================================

/// Read JEDEC ID (manufacturer + device ID)
pub const RDID: u8 = 0x9F;
/// Read Electronic Manufacturer & Device ID (legacy)
pub const REMS: u8 = 0x90;
/// Read Electronic Signature / Release from Deep Power Down
pub const RES: u8 = 0xAB;

// ============================================================================
// Read commands - 3-byte address
// ============================================================================

/// Read Data (up to ~33 MHz)
pub const READ: u8 = 0x03;
