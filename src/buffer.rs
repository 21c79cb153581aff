//! Fixed-capacity packet buffer
//!
//! DNS over UDP is limited to 512 bytes, so every inbound and outbound packet
//! is read from or written into a [`WireBuffer`] of exactly that size. All
//! accessors are checked: running off the end yields
//! [`BufferError::EndOfBuffer`] instead of panicking or wrapping.

use crate::errors::BufferError;

/// Maximum size of a DNS message over UDP
pub const MAX_PACKET_SIZE: usize = 512;

/// Maximum number of compression pointers followed while reading one name
pub const MAX_JUMPS: usize = 5;

/// Longest label allowed in a domain name
pub const MAX_LABEL_LEN: usize = 63;

/// A 512-byte buffer with a read/write cursor
#[derive(Clone)]
pub struct WireBuffer {
    buf: [u8; MAX_PACKET_SIZE],
    pos: usize,
}

impl WireBuffer {
    /// Create an empty, zeroed buffer with the cursor at the start
    pub fn new() -> Self {
        Self {
            buf: [0; MAX_PACKET_SIZE],
            pos: 0,
        }
    }

    /// Copy a received datagram into a fresh buffer, cursor at the start
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BufferError> {
        if bytes.len() > MAX_PACKET_SIZE {
            return Err(BufferError::PacketTooLarge { len: bytes.len() });
        }

        let mut buffer = Self::new();
        buffer.buf[..bytes.len()].copy_from_slice(bytes);
        Ok(buffer)
    }

    /// Current cursor position
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Everything written so far, i.e. the bytes before the cursor
    pub fn filled(&self) -> &[u8] {
        &self.buf[..self.pos]
    }

    /// Advance the cursor without reading
    pub fn step(&mut self, steps: usize) -> Result<(), BufferError> {
        self.seek(self.pos + steps)
    }

    /// Move the cursor to an absolute position
    pub fn seek(&mut self, pos: usize) -> Result<(), BufferError> {
        if pos > MAX_PACKET_SIZE {
            return Err(BufferError::EndOfBuffer { pos });
        }
        self.pos = pos;
        Ok(())
    }

    /// Read a single byte and advance the cursor
    pub fn read(&mut self) -> Result<u8, BufferError> {
        let byte = self.get(self.pos)?;
        self.pos += 1;
        Ok(byte)
    }

    /// Read two bytes, big-endian
    pub fn read_u16(&mut self) -> Result<u16, BufferError> {
        Ok(u16::from_be_bytes([self.read()?, self.read()?]))
    }

    /// Read four bytes, big-endian
    pub fn read_u32(&mut self) -> Result<u32, BufferError> {
        Ok(u32::from_be_bytes([
            self.read()?,
            self.read()?,
            self.read()?,
            self.read()?,
        ]))
    }

    /// Look at a byte without moving the cursor
    pub fn get(&self, pos: usize) -> Result<u8, BufferError> {
        self.buf
            .get(pos)
            .copied()
            .ok_or(BufferError::EndOfBuffer { pos })
    }

    /// Look at a range of bytes without moving the cursor
    pub fn get_range(&self, start: usize, len: usize) -> Result<&[u8], BufferError> {
        let end = start + len;
        if end > MAX_PACKET_SIZE {
            return Err(BufferError::EndOfBuffer { pos: end });
        }
        Ok(&self.buf[start..end])
    }

    /// Read a domain name starting at the cursor, following compression
    /// pointers, and append it to `out` as dot-separated labels.
    ///
    /// After a pointer has been followed the cursor stays just past the first
    /// pointer, which is where the enclosing record continues. Case is kept
    /// as it appears on the wire.
    pub fn read_qname(&mut self, out: &mut String) -> Result<(), BufferError> {
        let mut pos = self.pos;
        let mut jumped = false;
        let mut jumps = 0;
        let mut delim = "";

        loop {
            let len = self.get(pos)?;

            // Two high bits set: a pointer to a name earlier in the packet
            if (len & 0xC0) == 0xC0 {
                let next = self.get(pos + 1)? as u16;

                if !jumped {
                    self.seek(pos + 2)?;
                }

                jumps += 1;
                if jumps > MAX_JUMPS {
                    return Err(BufferError::JumpLimitExceeded { max: MAX_JUMPS });
                }

                pos = ((((len as u16) ^ 0xC0) << 8) | next) as usize;
                jumped = true;
                continue;
            }

            pos += 1;

            if len == 0 {
                break;
            }

            let label = self.get_range(pos, len as usize)?;
            out.push_str(delim);
            out.push_str(&String::from_utf8_lossy(label));
            delim = ".";

            pos += len as usize;
        }

        if !jumped {
            self.seek(pos)?;
        }

        Ok(())
    }

    /// Write a single byte and advance the cursor
    pub fn write(&mut self, val: u8) -> Result<(), BufferError> {
        self.set(self.pos, val)?;
        self.pos += 1;
        Ok(())
    }

    pub fn write_u16(&mut self, val: u16) -> Result<(), BufferError> {
        for byte in val.to_be_bytes() {
            self.write(byte)?;
        }
        Ok(())
    }

    pub fn write_u32(&mut self, val: u32) -> Result<(), BufferError> {
        for byte in val.to_be_bytes() {
            self.write(byte)?;
        }
        Ok(())
    }

    /// Write a domain name as length-prefixed labels followed by a zero byte.
    /// Names are always written in full; no compression pointers are emitted.
    pub fn write_qname(&mut self, qname: &str) -> Result<(), BufferError> {
        for label in qname.split('.') {
            // Trailing dots and the root name produce empty labels
            if label.is_empty() {
                continue;
            }

            if label.len() > MAX_LABEL_LEN {
                return Err(BufferError::LabelTooLong {
                    label: label.to_string(),
                });
            }

            self.write(label.len() as u8)?;
            for byte in label.bytes() {
                self.write(byte)?;
            }
        }

        self.write(0)
    }

    /// Overwrite a byte at an arbitrary position, leaving the cursor alone
    pub fn set(&mut self, pos: usize, val: u8) -> Result<(), BufferError> {
        let slot = self
            .buf
            .get_mut(pos)
            .ok_or(BufferError::EndOfBuffer { pos })?;
        *slot = val;
        Ok(())
    }

    /// Overwrite two bytes, big-endian; used to backpatch length fields
    pub fn set_u16(&mut self, pos: usize, val: u16) -> Result<(), BufferError> {
        if pos + 1 >= MAX_PACKET_SIZE {
            return Err(BufferError::EndOfBuffer { pos: pos + 1 });
        }
        let [high, low] = val.to_be_bytes();
        self.set(pos, high)?;
        self.set(pos + 1, low)
    }
}

impl Default for WireBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for WireBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WireBuffer")
            .field("pos", &self.pos)
            .field("filled", &self.filled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_write_primitives() {
        let mut buffer = WireBuffer::new();
        buffer.write(0xAB).unwrap();
        buffer.write_u16(0x1234).unwrap();
        buffer.write_u32(0xDEADBEEF).unwrap();
        assert_eq!(buffer.pos(), 7);
        assert_eq!(buffer.filled(), &[0xAB, 0x12, 0x34, 0xDE, 0xAD, 0xBE, 0xEF]);

        buffer.seek(0).unwrap();
        assert_eq!(buffer.read().unwrap(), 0xAB);
        assert_eq!(buffer.read_u16().unwrap(), 0x1234);
        assert_eq!(buffer.read_u32().unwrap(), 0xDEADBEEF);
        assert_eq!(buffer.pos(), 7);
    }

    #[test]
    fn test_end_of_buffer() {
        let mut buffer = WireBuffer::new();
        buffer.seek(MAX_PACKET_SIZE - 1).unwrap();
        assert!(buffer.read().is_ok());
        assert_eq!(
            buffer.read(),
            Err(BufferError::EndOfBuffer {
                pos: MAX_PACKET_SIZE
            })
        );
        assert!(buffer.write(1).is_err());

        buffer.seek(MAX_PACKET_SIZE - 1).unwrap();
        assert!(buffer.read_u16().is_err());
        assert!(buffer.seek(MAX_PACKET_SIZE + 1).is_err());
        assert!(buffer.step(2).is_err());
    }

    #[test]
    fn test_get_does_not_move_cursor() {
        let buffer = WireBuffer::from_bytes(&[1, 2, 3, 4]).unwrap();
        assert_eq!(buffer.get(2).unwrap(), 3);
        assert_eq!(buffer.get_range(1, 3).unwrap(), &[2, 3, 4]);
        assert_eq!(buffer.pos(), 0);

        assert!(buffer.get(MAX_PACKET_SIZE).is_err());
        assert!(buffer.get_range(MAX_PACKET_SIZE - 4, 4).is_ok());
        assert!(buffer.get_range(MAX_PACKET_SIZE - 4, 5).is_err());
    }

    #[test]
    fn test_from_bytes_rejects_oversized_datagram() {
        let bytes = vec![0u8; MAX_PACKET_SIZE + 1];
        assert_eq!(
            WireBuffer::from_bytes(&bytes).unwrap_err(),
            BufferError::PacketTooLarge {
                len: MAX_PACKET_SIZE + 1
            }
        );
    }

    #[test]
    fn test_qname_round_trip() {
        let mut buffer = WireBuffer::new();
        buffer.write_qname("www.Example.com").unwrap();
        let end = buffer.pos();

        buffer.seek(0).unwrap();
        let mut name = String::new();
        buffer.read_qname(&mut name).unwrap();
        assert_eq!(name, "www.Example.com");
        assert_eq!(buffer.pos(), end);
    }

    #[test]
    fn test_qname_trailing_dot_and_root() {
        let mut buffer = WireBuffer::new();
        buffer.write_qname("test.org.").unwrap();
        assert_eq!(buffer.filled(), b"\x04test\x03org\x00");

        let mut buffer = WireBuffer::new();
        buffer.write_qname("").unwrap();
        assert_eq!(buffer.filled(), &[0]);

        buffer.seek(0).unwrap();
        let mut name = String::new();
        buffer.read_qname(&mut name).unwrap();
        assert_eq!(name, "");
        assert_eq!(buffer.pos(), 1);
    }

    #[test]
    fn test_label_length_limit() {
        let ok = format!("{}.com", "a".repeat(63));
        let mut buffer = WireBuffer::new();
        buffer.write_qname(&ok).unwrap();

        buffer.seek(0).unwrap();
        let mut name = String::new();
        buffer.read_qname(&mut name).unwrap();
        assert_eq!(name, ok);

        let too_long = format!("{}.com", "a".repeat(64));
        let mut buffer = WireBuffer::new();
        assert!(matches!(
            buffer.write_qname(&too_long),
            Err(BufferError::LabelTooLong { label }) if label.len() == 64
        ));
    }

    #[test]
    fn test_compressed_qname() {
        let mut buffer = WireBuffer::new();
        // "example.com" at offset 0
        buffer.write_qname("example.com").unwrap();
        // "www" + pointer to offset 0, followed by a marker u16
        let start = buffer.pos();
        buffer.write(3).unwrap();
        for byte in b"www" {
            buffer.write(*byte).unwrap();
        }
        buffer.write_u16(0xC000).unwrap();
        buffer.write_u16(0xBEEF).unwrap();

        buffer.seek(start).unwrap();
        let mut name = String::new();
        buffer.read_qname(&mut name).unwrap();
        assert_eq!(name, "www.example.com");

        // Cursor sits just past the pointer, not at the jump target
        assert_eq!(buffer.pos(), start + 6);
        assert_eq!(buffer.read_u16().unwrap(), 0xBEEF);
    }

    #[test]
    fn test_chained_pointers_leave_cursor_after_first() {
        let mut buffer = WireBuffer::new();
        buffer.write_qname("com").unwrap(); // offset 0..5
        buffer.write(7).unwrap(); // offset 5: "example" + ptr -> 0
        for byte in b"example" {
            buffer.write(*byte).unwrap();
        }
        buffer.write_u16(0xC000).unwrap();
        let start = buffer.pos();
        buffer.write_u16(0xC005).unwrap(); // bare pointer -> 5

        buffer.seek(start).unwrap();
        let mut name = String::new();
        buffer.read_qname(&mut name).unwrap();
        assert_eq!(name, "example.com");
        assert_eq!(buffer.pos(), start + 2);
    }

    #[test]
    fn test_self_referencing_pointer_fails() {
        let mut buffer = WireBuffer::new();
        buffer.seek(20).unwrap();
        buffer.write_u16(0xC000 | 20).unwrap();

        buffer.seek(20).unwrap();
        let mut name = String::new();
        assert_eq!(
            buffer.read_qname(&mut name),
            Err(BufferError::JumpLimitExceeded { max: MAX_JUMPS })
        );
    }

    #[test]
    fn test_pointer_cycle_fails() {
        let mut buffer = WireBuffer::new();
        // label "a" then pointer to 4; at 4 label "b" then pointer to 0
        buffer.write(1).unwrap();
        buffer.write(b'a').unwrap();
        buffer.write_u16(0xC004).unwrap();
        buffer.write(1).unwrap();
        buffer.write(b'b').unwrap();
        buffer.write_u16(0xC000).unwrap();

        buffer.seek(0).unwrap();
        let mut name = String::new();
        assert!(matches!(
            buffer.read_qname(&mut name),
            Err(BufferError::JumpLimitExceeded { .. })
        ));
    }

    #[test]
    fn test_truncated_label_fails() {
        let mut buffer = WireBuffer::new();
        buffer.seek(MAX_PACKET_SIZE - 2).unwrap();
        buffer.write(10).unwrap();

        buffer.seek(MAX_PACKET_SIZE - 2).unwrap();
        let mut name = String::new();
        assert!(matches!(
            buffer.read_qname(&mut name),
            Err(BufferError::EndOfBuffer { .. })
        ));
    }

    #[test]
    fn test_backpatch() {
        let mut buffer = WireBuffer::new();
        buffer.write_u16(0).unwrap();
        buffer.write_qname("ns1.example.net").unwrap();
        let len = buffer.pos() - 2;
        buffer.set_u16(0, len as u16).unwrap();

        buffer.seek(0).unwrap();
        assert_eq!(buffer.read_u16().unwrap(), 17);

        buffer.set(5, b'X').unwrap();
        assert_eq!(buffer.get(5).unwrap(), b'X');

        assert!(buffer.set(MAX_PACKET_SIZE, 0).is_err());
        assert!(buffer.set_u16(MAX_PACKET_SIZE - 1, 0).is_err());
        assert!(buffer.set_u16(MAX_PACKET_SIZE - 2, 0).is_ok());
    }
}
