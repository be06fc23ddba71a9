//! flashbus-core - Bus transport engines for flash chip programming
//!
//! This crate implements the two transports a small flash programmer speaks
//! to its attached chip: a nibble-clocked Firmware Hub (FWH/LPC) bus and a
//! byte-oriented SPI bus. It is `no_std` and hardware-free: pin and
//! peripheral access is injected through the [`nibble::NibbleBus`] and
//! [`spi::SpiPort`] traits, and bulk transfers stream through the
//! [`link::ByteSource`]/[`link::ByteSink`] pair instead of an owned serial
//! port.
//!
//! The two transports never drive the same chip at the same time; a command
//! dispatcher above this crate picks one, runs `init`/operations/`uninit` on
//! it, and relays streamed bytes between the host link and the chip.
//!
//! # Features
//!
//! - `std` - Enable standard library support (`std::error::Error` impl)
//!
//! # Example
//!
//! ```ignore
//! use flashbus_core::spi::{SpiPort, SpiTransport};
//!
//! fn identify<P: SpiPort>(port: P) {
//!     let mut spi = SpiTransport::new(port);
//!     spi.init();
//!     match spi.probe_rdid() {
//!         Some(id) => log::info!("chip id: {:02x?}", id.as_bytes()),
//!         None => log::warn!("no chip answered"),
//!     }
//!     spi.uninit();
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "std")]
extern crate std;

pub mod error;
pub mod fwh;
pub mod link;
pub mod nibble;
pub mod spi;

pub use error::{Error, Result};
