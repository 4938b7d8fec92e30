//! Bit-exact build/parse of the Linux SocketCAN classic and FD frame layouts.
//!
//! Classic frames are 16 bytes, FD frames 72; both share the first 8 bytes (identifier word, DLC,
//! 3 reserved bytes) and differ only in the payload's length and padding. Endianness governs the
//! identifier word only — DLC and payload are always read byte-by-byte.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::constants::{CAN_MAX_DLEN, CANFD_MAX_DLEN, CAN_MTU, CANFD_MTU, EFF_FLAG, EFF_MASK};
use crate::error::Error;

/// Byte order of the 32-bit identifier word. Network order (big-endian) is the SocketCAN default;
/// little-endian is offered for hosts that pack frames in native order.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Endianness {
    Big,
    Little,
}

impl Default for Endianness {
    fn default() -> Self {
        Endianness::Big
    }
}

/// A parsed or about-to-be-built CAN frame, independent of the wire bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    id: u32,
    extended: bool,
    data: Vec<u8>,
    fd: bool,
}

impl Frame {
    /// Builds a frame from logical fields, checking payload length against the frame kind.
    pub fn new(id: u32, data: &[u8], extended: bool, fd: bool) -> Result<Self, Error> {
        let max = if fd { CANFD_MAX_DLEN } else { CAN_MAX_DLEN };
        if data.len() > max {
            return Err(Error::InvalidLength {
                len: data.len(),
                max,
            });
        }
        Ok(Frame {
            id: id & EFF_MASK,
            extended,
            data: data.to_vec(),
            fd,
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn is_extended(&self) -> bool {
        self.extended
    }

    pub fn is_fd(&self) -> bool {
        self.fd
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Serializes to the wire layout (16 or 72 bytes depending on `self.fd()`).
    pub fn to_bytes(&self, endianness: Endianness) -> Vec<u8> {
        let (mtu, max_dlen) = if self.fd {
            (CANFD_MTU, CANFD_MAX_DLEN)
        } else {
            (CAN_MTU, CAN_MAX_DLEN)
        };

        let mut bytes = vec![0u8; mtu];
        let mut word = self.id & EFF_MASK;
        if self.extended {
            word |= EFF_FLAG;
        }
        write_id_word(&mut bytes[0..4], word, endianness);
        bytes[4] = self.data.len() as u8;
        // bytes[5..8] stay zero (reserved)

        let payload_end = 8 + self.data.len().min(max_dlen);
        bytes[8..payload_end].copy_from_slice(&self.data[..payload_end - 8]);
        bytes
    }

    /// Parses a frame from wire bytes. `fd` forces classic/FD interpretation; `None` auto-detects
    /// from the buffer length (`>= CANFD_MTU` is FD).
    pub fn parse(bytes: &[u8], endianness: Endianness, fd: Option<bool>) -> Result<Self, Error> {
        if bytes.len() < 8 {
            return Err(Error::ParseError(bytes.len()));
        }
        let is_fd = fd.unwrap_or_else(|| bytes.len() >= CANFD_MTU);

        let word = read_id_word(&bytes[0..4], endianness);
        let extended = word & EFF_FLAG != 0;
        let id = word & EFF_MASK;

        let dlc_byte = bytes[4];
        let dlc = if is_fd {
            dlc_byte as usize
        } else {
            (dlc_byte & 0x0F) as usize
        };

        let data = if bytes.len() >= 8 + dlc {
            bytes[8..8 + dlc].to_vec()
        } else {
            Vec::new()
        };

        Ok(Frame {
            id,
            extended,
            data,
            fd: is_fd,
        })
    }
}

fn write_id_word(dst: &mut [u8], word: u32, endianness: Endianness) {
    match endianness {
        Endianness::Big => BigEndian::write_u32(dst, word),
        Endianness::Little => LittleEndian::write_u32(dst, word),
    }
}

fn read_id_word(src: &[u8], endianness: Endianness) -> u32 {
    match endianness {
        Endianness::Big => BigEndian::read_u32(src),
        Endianness::Little => LittleEndian::read_u32(src),
    }
}
