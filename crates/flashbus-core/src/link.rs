//! Host-link byte stream seams for streamed transfers
//!
//! A streamed SPI operation moves bytes between the flash chip and the host
//! serial link one at a time, so transfer length is independent of RAM. The
//! transport does not own the link; the dispatcher injects these two
//! capabilities for the duration of one call.

/// Incoming byte stream from the host link.
pub trait ByteSource {
    /// Pull the next byte sent by the host.
    ///
    /// Busy-waits until one is available; the serial protocol guarantees the
    /// host sends exactly the announced count, so this never starves inside
    /// a well-formed operation.
    fn pull_byte(&mut self) -> u8;
}

/// Outgoing byte stream towards the host link.
pub trait ByteSink {
    /// Push one byte towards the host.
    fn push_byte(&mut self, byte: u8);

    /// Signal that the command phase of a streamed operation completed and
    /// the receive phase is about to begin.
    ///
    /// Sent exactly once per streamed operation, between the two phases; the
    /// link layer encodes it as its acknowledge byte on the wire.
    fn ack(&mut self);
}
