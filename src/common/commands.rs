use log::warn;

use crate::{
    common::{CardStatus, SDMMC_CMD_MAX},
    tools::crc7_trailer,
};

/// Direction of a data phase byte, seen from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Host reads a byte from the card.
    Read,
    /// Host writes a byte to the card.
    Write,
}

/// Logical response shape produced by a command handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    None,
    R1,
    /// R1 with busy signalled on DAT0; identical bytes on the wire.
    R1b,
    R2Cid,
    R2Csd,
    R3,
    R6,
    R7,
    /// Command rejected; nothing is sent.
    Illegal,
}

impl ResponseKind {
    pub fn len(&self) -> usize {
        match self {
            ResponseKind::None | ResponseKind::Illegal => 0,
            ResponseKind::R1
            | ResponseKind::R1b
            | ResponseKind::R3
            | ResponseKind::R6
            | ResponseKind::R7 => 4,
            ResponseKind::R2Cid | ResponseKind::R2Csd => 16,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ResponseKind::None => "RESP#0 (no response)",
            ResponseKind::R1 | ResponseKind::R1b => "RESP#1 (normal cmd)",
            ResponseKind::R2Cid => "RESP#2 (CID reg)",
            ResponseKind::R2Csd => "RESP#2 (CSD reg)",
            ResponseKind::R3 => "RESP#3 (OCR reg)",
            ResponseKind::R6 => "RESP#6 (RCA)",
            ResponseKind::R7 => "RESP#7 (operating voltage)",
            ResponseKind::Illegal => "ILLEGAL RESP",
        }
    }
}

/// A command frame as received from the host: start+transmission bits and
/// 6-bit index, 32-bit argument, CRC7 with end bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SdRequest {
    pub cmd: u8,
    pub arg: u32,
    pub crc: u8,
}

impl SdRequest {
    /// Builds a request with a correct CRC trailer.
    pub fn new(cmd: u8, arg: u32) -> Self {
        let mut req = Self { cmd, arg, crc: 0 };
        req.crc = req.expected_crc();
        req
    }

    pub fn with_crc(mut self, crc: u8) -> Self {
        self.crc = crc;
        self
    }

    /// Parses a 6-byte wire frame. The start and transmission bits of the
    /// first byte are stripped.
    pub fn from_frame(frame: &[u8; 6]) -> Self {
        Self {
            cmd: frame[0] & 0x3f,
            arg: u32::from_be_bytes([frame[1], frame[2], frame[3], frame[4]]),
            crc: frame[5],
        }
    }

    pub fn frame(&self) -> [u8; 6] {
        let arg = self.arg.to_be_bytes();
        [0x40 | (self.cmd & 0x3f), arg[0], arg[1], arg[2], arg[3], self.crc]
    }

    /// Trailer byte the frame should carry.
    pub fn expected_crc(&self) -> u8 {
        let frame = self.frame();
        crc7_trailer(&frame[..5])
    }

    pub fn crc_valid(&self) -> bool {
        self.crc == self.expected_crc()
    }

    /// Command index reduced to the 6 bits the card decodes.
    pub fn index(&self) -> u8 {
        if self.cmd as usize >= SDMMC_CMD_MAX {
            warn!("SD: incorrect command 0x{:02x}", self.cmd);
        }
        self.cmd & 0x3f
    }

    /// Upper 16 bits of the argument, where addressed commands carry the RCA.
    pub fn rca(&self) -> u16 {
        (self.arg >> 16) as u16
    }
}

/// Response bytes in wire order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdResponse {
    kind: ResponseKind,
    raw: [u8; 16],
}

impl SdResponse {
    pub fn new(kind: ResponseKind) -> Self {
        Self { kind, raw: [0; 16] }
    }

    /// Response with no bytes at all.
    pub fn empty() -> Self {
        Self::new(ResponseKind::None)
    }

    pub fn short(kind: ResponseKind, value: u32) -> Self {
        let mut resp = Self::new(kind);
        resp.raw[..4].copy_from_slice(&value.to_be_bytes());
        resp
    }

    pub fn long(kind: ResponseKind, value: &[u8; 16]) -> Self {
        Self { kind, raw: *value }
    }

    pub fn kind(&self) -> ResponseKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.kind.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.raw[..self.len()]
    }

    fn word(&self) -> u32 {
        u32::from_be_bytes([self.raw[0], self.raw[1], self.raw[2], self.raw[3]])
    }

    pub fn as_r1(&self) -> CardStatus {
        CardStatus::from_bits_retain(self.word())
    }

    pub fn as_r2(&self) -> [u8; 16] {
        self.raw
    }

    pub fn as_r3(&self) -> u32 {
        self.word()
    }

    /// Published RCA and the packed 16-bit status.
    pub fn as_r6(&self) -> (u16, u16) {
        let word = self.word();
        ((word >> 16) as u16, word as u16)
    }

    pub fn as_r7(&self) -> u32 {
        self.word()
    }
}
