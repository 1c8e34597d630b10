//! Where encoded octets go.
//!
//! This is a private module. The relevant items are re-exported by the
//! parent.

use bytes::BytesMut;


//------------ Target --------------------------------------------------------

/// A buffer encoded octets are appended to.
///
/// Messages are always encoded into memory before they are handed to a
/// connection, so appending can’t fail. Since value encoders know their
/// length up front, a target is typically allocated with the right
/// capacity before anything is written.
pub trait Target {
    /// Appends a slice of octets.
    fn append_slice(&mut self, data: &[u8]);

    /// Appends a single octet.
    fn append_u8(&mut self, octet: u8) {
        self.append_slice(&[octet])
    }
}

impl<T: Target + ?Sized> Target for &mut T {
    fn append_slice(&mut self, data: &[u8]) {
        (**self).append_slice(data)
    }

    fn append_u8(&mut self, octet: u8) {
        (**self).append_u8(octet)
    }
}

impl Target for Vec<u8> {
    fn append_slice(&mut self, data: &[u8]) {
        self.extend_from_slice(data)
    }

    fn append_u8(&mut self, octet: u8) {
        self.push(octet)
    }
}

impl Target for BytesMut {
    fn append_slice(&mut self, data: &[u8]) {
        self.extend_from_slice(data)
    }
}
