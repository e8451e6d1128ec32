//! Card register bank: CID, CSD, SCR, SD status and EXT_CSD, with the
//! builders that derive their contents from the medium geometry.

use bitflags::bitflags;
use log::{trace, warn};

use crate::common::{CMULT_SHIFT, HWBLOCK_SHIFT, SDSC_MAX_CAPACITY, SECTOR_SHIFT, WPGROUP_SHIFT};
use crate::config::{BOOT_PARTITION_UNIT, SpecVersion};
use crate::tools::crc7_trailer;

const MID: u8 = 0xaa;
const OID: &[u8; 2] = b"XY";
const PNM: &[u8; 6] = b"RSEMU0";
const PRV: u8 = 0x01;
const PSN: u32 = 0xdead_beef;
const MDT_YR: u32 = 2006;
const MDT_MON: u32 = 2;

bitflags! {
    /// CSD byte 14 (bits 15:8 of the register).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CsdFlags: u8 {
        const FILE_FORMAT_GROUP = 1 << 7;               /* [15:15] */
        const COPY = 1 << 6;                            /* [14:14] */
        const PERMANENT_WRITE_PROTECT = 1 << 5;         /* [13:13] */
        const TEMPORARY_WRITE_PROTECT = 1 << 4;         /* [12:12] */
        const FILE_FORMAT = 0b11 << 2;                  /* [11:10] */
    }
}

impl CsdFlags {
    pub const WRITE_PROTECT: CsdFlags = CsdFlags::from_bits_retain(
        CsdFlags::PERMANENT_WRITE_PROTECT.bits() | CsdFlags::TEMPORARY_WRITE_PROTECT.bits(),
    );
    /// One-time programmable bits; once set they can never be cleared.
    pub const OTP: CsdFlags = CsdFlags::from_bits_retain(
        CsdFlags::COPY.bits() | CsdFlags::PERMANENT_WRITE_PROTECT.bits(),
    );
}

bitflags! {
    /// Card command classes advertised in CSD bits 95:84.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CmdClass: u16 {
        const BASIC = 1 << 0;
        const STREAM_READ = 1 << 1;
        const BLOCK_READ = 1 << 2;
        const STREAM_WRITE = 1 << 3;
        const BLOCK_WRITE = 1 << 4;
        const ERASE = 1 << 5;
        const WRITE_PROTECT = 1 << 6;
        const LOCK_CARD = 1 << 7;
        const APPLICATION_SPECIFIC = 1 << 8;
        const IO_MODE = 1 << 9;
        const SWITCH = 1 << 10;
        const EXTENSION = 1 << 11;
    }
}

bitflags! {
    /// Upper SCR word (bits 63:32) feature bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ScrFlags: u32 {
        const DATA_STATUS_AFTER_ERASE = 1 << 23;        /* [55:55] */
        const BUS_WIDTH_4BIT = 1 << 18;                 /* [50:50] */
        const BUS_WIDTH_1BIT = 1 << 16;                 /* [48:48] */
        const SD_SPECIFICATION3 = 1 << 15;              /* [47:47] */
        const CMD23_SUPPORT = 1 << 1;                   /* [33:33] */
        const CMD20_SUPPORT = 1 << 0;                   /* [32:32] */
    }
}

/// Card identification register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cid {
    bytes: [u8; 16],
}

impl_register_ops!(Cid, bytes, 16);

impl Cid {
    pub fn sd() -> Self {
        let mut cid = Self { bytes: [0; 16] };
        cid.write_reg8(0, MID);
        cid.bytes[1..3].copy_from_slice(OID);
        cid.bytes[3..8].copy_from_slice(&PNM[..5]);
        cid.write_reg8(8, PRV);
        cid.write_reg32(9, PSN);
        cid.write_reg8(13, ((MDT_YR - 2000) / 10) as u8);
        cid.write_reg8(14, (((MDT_YR % 10) << 4) | MDT_MON) as u8);
        cid.seal();
        cid
    }

    pub fn emmc() -> Self {
        let mut cid = Self { bytes: [0; 16] };
        cid.write_reg8(0, MID);
        cid.write_reg8(1, 0b01); // CBX: BGA
        cid.write_reg8(2, OID[0]);
        cid.bytes[3..9].copy_from_slice(PNM);
        cid.write_reg8(9, PRV);
        cid.write_reg32(10, PSN);
        cid.write_reg8(14, ((MDT_MON << 4) | (MDT_YR - 1997)) as u8);
        cid.seal();
        cid
    }

    fn seal(&mut self) {
        self.bytes[15] = crc7_trailer(&self.bytes[..15]);
    }

    /// PROGRAM_CID: the CID is one-time programmed at the factory, so only a
    /// byte-identical image is accepted. Returns `false` on an overwrite
    /// attempt.
    pub fn program(&mut self, data: &[u8]) -> bool {
        if self.bytes.iter().zip(data).any(|(&old, &new)| old != new) {
            return false;
        }
        for (reg, &new) in self.bytes.iter_mut().zip(data) {
            *reg &= new;
        }
        true
    }
}

/// Writable bits of the CSD.
const CSD_RW_MASK: [u8; 16] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xfc, 0xfe,
];

/// Card specific data register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Csd {
    bytes: [u8; 16],
}

impl_register_ops!(Csd, bytes, 16);

impl Csd {
    pub fn sd(size: u64) -> Self {
        let mut csd = Self { bytes: [0; 16] };
        let mut hwblock_shift = HWBLOCK_SHIFT;
        let sectsize: u32 = (1 << (SECTOR_SHIFT + 1)) - 1;
        let wpsize: u32 = (1 << (WPGROUP_SHIFT + 1)) - 1;

        // A 2 GiB card advertises 1024-byte READ_BL_LEN
        if size == SDSC_MAX_CAPACITY {
            hwblock_shift += 1;
        }
        let csize = ((size >> (CMULT_SHIFT + hwblock_shift)) as u32).wrapping_sub(1);

        if size <= SDSC_MAX_CAPACITY {
            let ccc = CmdClass::BASIC
                | CmdClass::BLOCK_READ
                | CmdClass::BLOCK_WRITE
                | CmdClass::ERASE
                | CmdClass::WRITE_PROTECT
                | CmdClass::LOCK_CARD
                | CmdClass::APPLICATION_SPECIFIC
                | CmdClass::SWITCH;
            csd.bytes[0] = 0x00; /* CSD structure 1.0 */
            csd.bytes[1] = 0x26; /* Data read access-time-1 */
            csd.bytes[2] = 0x00; /* Data read access-time-2 */
            csd.bytes[3] = 0x32; /* Max. data transfer rate: 25 MHz */
            csd.set_ccc(ccc);
            csd.modify_reg8(5, 0x0f, hwblock_shift as u8); /* READ_BL_LEN */
            csd.bytes[6] = 0xe0 | ((csize >> 10) & 0x03) as u8;
            csd.bytes[7] = ((csize >> 2) & 0xff) as u8;
            csd.bytes[8] = 0x3f | ((csize << 6) & 0xc0) as u8;
            csd.bytes[9] = 0xfc | ((CMULT_SHIFT - 2) >> 1) as u8;
            csd.bytes[10] = 0x40 | (((CMULT_SHIFT - 2) << 7) & 0x80) as u8 | (sectsize >> 1) as u8;
            csd.bytes[11] = ((sectsize << 7) & 0x80) as u8 | wpsize as u8;
            csd.bytes[12] = 0x90 | (hwblock_shift >> 2) as u8;
            csd.bytes[13] = 0x20 | ((hwblock_shift << 6) & 0xc0) as u8;
            csd.bytes[14] = 0x00;
        } else {
            // CSD structure 2.0: C_SIZE counts 512 KiB units
            let csize = (size / (512 * 1024) - 1) as u32;
            let ccc = CmdClass::BASIC
                | CmdClass::BLOCK_READ
                | CmdClass::BLOCK_WRITE
                | CmdClass::ERASE
                | CmdClass::LOCK_CARD
                | CmdClass::APPLICATION_SPECIFIC
                | CmdClass::SWITCH;
            csd.bytes[0] = 0x40;
            csd.bytes[1] = 0x0e;
            csd.bytes[2] = 0x00;
            csd.bytes[3] = 0x32;
            csd.set_ccc(ccc);
            csd.modify_reg8(5, 0x0f, 0x09);
            csd.bytes[6] = 0x00;
            csd.bytes[7] = ((csize >> 16) & 0xff) as u8;
            csd.bytes[8] = ((csize >> 8) & 0xff) as u8;
            csd.bytes[9] = (csize & 0xff) as u8;
            csd.bytes[10] = 0x7f;
            csd.bytes[11] = 0x80;
            csd.bytes[12] = 0x0a;
            csd.bytes[13] = 0x40;
            csd.bytes[14] = 0x00;
        }
        csd.seal();
        trace!("SD CSD for {} bytes: {:02x?}", size, csd.bytes);
        csd
    }

    pub fn emmc(size: u64) -> Self {
        let mut csd = Self { bytes: [0; 16] };
        let hwblock_shift = HWBLOCK_SHIFT;
        let sectsize: u32 = (1 << (SECTOR_SHIFT + 1)) - 1;
        let wpsize: u32 = (1 << (WPGROUP_SHIFT + 1)) - 1;
        let ccc = CmdClass::BASIC
            | CmdClass::BLOCK_READ
            | CmdClass::BLOCK_WRITE
            | CmdClass::ERASE
            | CmdClass::WRITE_PROTECT
            | CmdClass::LOCK_CARD;

        csd.bytes[0] = (3 << 6) | (4 << 2); /* CSD_STRUCTURE / SPEC_VERS 4.x */
        csd.bytes[1] = (1 << 3) | 6; /* TAAC: 1 ms */
        csd.bytes[2] = 0x00;
        csd.bytes[3] = (1 << 3) | 3; /* TRAN_SPEED: 100 MHz */
        csd.set_ccc(ccc);
        if size <= SDSC_MAX_CAPACITY {
            // byte addressing with 1 KiB blocks
            let csize = ((size >> (CMULT_SHIFT + 10)) as u32).wrapping_sub(1);
            csd.modify_reg8(5, 0x0f, 0x0a);
            csd.bytes[6] = 0x80 | ((csize >> 10) & 0x03) as u8;
            csd.bytes[7] = ((csize >> 2) & 0xff) as u8;
            csd.bytes[8] = 0x3f | ((csize << 6) & 0xc0) as u8;
        } else {
            // sector addressing, the real size lives in EXT_CSD SEC_COUNT
            csd.modify_reg8(5, 0x0f, 0x09);
            csd.bytes[6] = 0x83;
            csd.bytes[7] = 0xff;
            csd.bytes[8] = 0xff;
        }
        csd.bytes[9] = 0xfc | ((CMULT_SHIFT - 2) >> 1) as u8;
        csd.bytes[10] = 0x40 | (((CMULT_SHIFT - 2) << 7) & 0x80) as u8 | (sectsize >> 1) as u8;
        csd.bytes[11] = ((sectsize << 7) & 0x80) as u8 | wpsize as u8;
        csd.bytes[12] = 0x90 | (hwblock_shift >> 2) as u8;
        csd.bytes[13] = 0x20 | ((hwblock_shift << 6) & 0xc0) as u8;
        csd.bytes[14] = 0x00;
        csd.seal();
        trace!("eMMC CSD for {} bytes: {:02x?}", size, csd.bytes);
        csd
    }

    fn seal(&mut self) {
        self.bytes[15] = crc7_trailer(&self.bytes[..15]);
    }

    fn set_ccc(&mut self, ccc: CmdClass) {
        let bits = ccc.bits();
        self.write_reg8(4, (bits >> 4) as u8);
        self.modify_reg8(5, 0xf0, ((bits & 0xf) << 4) as u8);
    }

    /// Command classes the card advertises.
    pub fn ccc(&self) -> CmdClass {
        let bits = ((self.read_reg8(4) as u16) << 4) | (self.read_reg8(5) >> 4) as u16;
        CmdClass::from_bits_retain(bits)
    }

    pub fn flags(&self) -> CsdFlags {
        CsdFlags::from_bits_retain(self.read_reg8(14))
    }

    pub fn insert_flags(&mut self, flags: CsdFlags) {
        if !self.flags().contains(flags) {
            self.bytes[14] |= flags.bits();
            self.seal();
        }
    }

    pub fn remove_flags(&mut self, flags: CsdFlags) {
        if self.flags().intersects(flags) {
            self.bytes[14] &= !flags.bits();
            self.seal();
        }
    }

    pub fn is_write_protected(&self) -> bool {
        self.flags().intersects(CsdFlags::WRITE_PROTECT)
    }

    /// PROGRAM_CSD: only the bits in the writable mask may differ, and the
    /// OTP bits cannot be cleared. Returns `false` on an overwrite attempt.
    pub fn program(&mut self, data: &[u8]) -> bool {
        let overwrite = self
            .bytes
            .iter()
            .zip(data)
            .zip(CSD_RW_MASK)
            .any(|((&old, &new), mask)| (old | mask) != (new | mask));
        let otp_cleared = self.bytes[14] & !data[14] & CsdFlags::OTP.bits() != 0;
        if overwrite || otp_cleared {
            return false;
        }
        for ((reg, &new), mask) in self.bytes.iter_mut().zip(data).zip(CSD_RW_MASK) {
            *reg |= mask;
            *reg &= new;
        }
        true
    }
}

/// SD configuration register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scr {
    bytes: [u8; 8],
}

impl_register_ops!(Scr, bytes, 8);

impl Scr {
    pub fn new(version: SpecVersion) -> Self {
        let mut scr = Self { bytes: [0; 8] };
        // SCR_STRUCTURE 1.0
        let sd_spec: u32 = match version {
            SpecVersion::V1_10 => 1,
            SpecVersion::V2_00 | SpecVersion::V3_01 => 2,
        };
        let security: u32 = 2; // SDSC security version 1.01
        let mut flags = ScrFlags::BUS_WIDTH_1BIT | ScrFlags::BUS_WIDTH_4BIT;
        if version >= SpecVersion::V3_01 {
            flags |= ScrFlags::SD_SPECIFICATION3;
        }
        scr.write_reg32(0, (sd_spec << 24) | (security << 20) | flags.bits());
        scr
    }

    pub fn flags(&self) -> ScrFlags {
        ScrFlags::from_bits_truncate(self.read_reg32(0))
    }
}

/// 512-bit SD status returned by ACMD13.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdStatus {
    bytes: [u8; 64],
}

impl_register_ops!(SdStatus, bytes, 64);

impl SdStatus {
    pub fn new() -> Self {
        Self { bytes: [0; 64] }
    }

    /// DAT_BUS_WIDTH field, bits 511:510.
    pub fn set_bus_width(&mut self, width: u8) {
        self.modify_reg8(0, 0xc0, (width & 0x03) << 6);
    }

    pub fn bus_width(&self) -> u8 {
        self.read_reg8(0) >> 6
    }
}

impl Default for SdStatus {
    fn default() -> Self {
        Self::new()
    }
}

pub const EXT_CSD_S_CMD_SET: usize = 504;
pub const EXT_CSD_BOOT_INFO: usize = 228;
pub const EXT_CSD_BOOT_MULT: usize = 226;
pub const EXT_CSD_ACC_SIZE: usize = 225;
pub const EXT_CSD_HC_ERASE_GRP_SIZE: usize = 224;
pub const EXT_CSD_ERASE_TIMEOUT_MULT: usize = 223;
pub const EXT_CSD_REL_WR_SEC_C: usize = 222;
pub const EXT_CSD_HC_WP_GRP_SIZE: usize = 221;
pub const EXT_CSD_S_C_VCC: usize = 220;
pub const EXT_CSD_S_C_VCCQ: usize = 219;
pub const EXT_CSD_S_A_TIMEOUT: usize = 217;
pub const EXT_CSD_SEC_CNT: usize = 212;
pub const EXT_CSD_CARD_TYPE: usize = 196;
pub const EXT_CSD_STRUCTURE: usize = 194;
pub const EXT_CSD_REV: usize = 192;
pub const EXT_CSD_HS_TIMING: usize = 185;
pub const EXT_CSD_BUS_WIDTH: usize = 183;
pub const EXT_CSD_PART_CONFIG: usize = 179;
pub const EXT_CSD_ERASE_GROUP_DEF: usize = 175;

/// First read-only EXT_CSD index (properties segment).
const EXT_CSD_PROPERTIES: usize = 192;

pub const EXT_CSD_PART_CONFIG_ACC_MASK: u8 = 0x07;

/// SWITCH access modes, argument bits 25:24.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchAccess {
    CommandSet = 0,
    SetBits = 1,
    ClearBits = 2,
    WriteByte = 3,
}

impl From<u32> for SwitchAccess {
    fn from(value: u32) -> Self {
        match value & 0x3 {
            0 => SwitchAccess::CommandSet,
            1 => SwitchAccess::SetBits,
            2 => SwitchAccess::ClearBits,
            _ => SwitchAccess::WriteByte,
        }
    }
}

/// Partition selected by PART_CONFIG.PARTITION_ACCESS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    User,
    Boot1,
    Boot2,
}

/// Extended CSD (eMMC only).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtCsd {
    bytes: [u8; 512],
}

impl_register_ops!(ExtCsd, bytes, 512);

impl ExtCsd {
    pub fn new() -> Self {
        Self { bytes: [0; 512] }
    }

    /// `size` is the user area in bytes.
    pub fn emmc(size: u64, boot_partition_size: u64, boot_config: u8) -> Self {
        let mut ext = Self::new();
        let sectcount = (size >> HWBLOCK_SHIFT) as u32;

        // Properties segment
        ext.write_reg8(EXT_CSD_S_CMD_SET, 0b1);
        ext.write_reg8(EXT_CSD_BOOT_INFO, 0x0);
        ext.write_reg8(EXT_CSD_BOOT_MULT, (boot_partition_size / BOOT_PARTITION_UNIT) as u8);
        ext.write_reg8(EXT_CSD_ACC_SIZE, 0x1);
        ext.write_reg8(EXT_CSD_HC_ERASE_GRP_SIZE, 0x01);
        ext.write_reg8(EXT_CSD_ERASE_TIMEOUT_MULT, 0x01);
        ext.write_reg8(EXT_CSD_REL_WR_SEC_C, 0x1);
        ext.write_reg8(EXT_CSD_HC_WP_GRP_SIZE, 0x01);
        ext.write_reg8(EXT_CSD_S_C_VCC, 0x01);
        ext.write_reg8(EXT_CSD_S_C_VCCQ, 0x01);
        ext.write_reg8(EXT_CSD_S_A_TIMEOUT, 0x01);
        ext.write_reg32_le(EXT_CSD_SEC_CNT, sectcount);
        // minimum read/write performance, 205..=210
        for offset in 205..=210 {
            ext.write_reg8(offset, 0x46);
        }
        ext.write_reg8(EXT_CSD_CARD_TYPE, 0b11);
        ext.write_reg8(EXT_CSD_STRUCTURE, 2);
        ext.write_reg8(EXT_CSD_REV, 3);

        // Modes segment
        ext.write_reg8(EXT_CSD_PART_CONFIG, boot_config);
        ext
    }

    pub fn sector_count(&self) -> u32 {
        self.read_reg32_le(EXT_CSD_SEC_CNT)
    }

    pub fn partition(&self) -> Partition {
        match self.read_reg8(EXT_CSD_PART_CONFIG) & EXT_CSD_PART_CONFIG_ACC_MASK {
            0 => Partition::User,
            1 => Partition::Boot1,
            2 => Partition::Boot2,
            other => {
                warn!("eMMC: partition access {} not supported, using user area", other);
                Partition::User
            }
        }
    }

    /// Applies a SWITCH command. Returns `false` when the index is in the
    /// read-only properties segment.
    pub fn switch(&mut self, access: SwitchAccess, index: usize, value: u8) -> bool {
        match index {
            EXT_CSD_PART_CONFIG | EXT_CSD_BUS_WIDTH | EXT_CSD_HS_TIMING
            | EXT_CSD_ERASE_GROUP_DEF => {}
            _ if index >= EXT_CSD_PROPERTIES => return false,
            _ => warn!("eMMC: switching EXT_CSD[{}] not modelled", index),
        }

        let old = self.read_reg8(index);
        let new = match access {
            SwitchAccess::CommandSet => {
                warn!("eMMC: command set switching not supported");
                return true;
            }
            SwitchAccess::SetBits => old | value,
            SwitchAccess::ClearBits => old & !value,
            SwitchAccess::WriteByte => value,
        };
        trace!("EXT_CSD[{}]: {:#04x} -> {:#04x}", index, old, new);
        self.write_reg8(index, new);
        true
    }
}

impl Default for ExtCsd {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::crc7;

    #[test]
    fn sd_cid_layout() {
        let cid = Cid::sd();
        assert_eq!(cid.read_reg8(0), 0xaa);
        assert_eq!(&cid.as_bytes()[1..3], b"XY");
        assert_eq!(cid.read_reg32(9), 0xdead_beef);
        // 2006/02
        assert_eq!(cid.read_reg8(13), 0x00);
        assert_eq!(cid.read_reg8(14), 0x62);
        assert_eq!(cid.read_reg8(15), (crc7(&cid.as_bytes()[..15]) << 1) | 1);
    }

    #[test]
    fn sdsc_csd_64mib() {
        let size = 64 * 1024 * 1024;
        let csd = Csd::sd(size);
        let b = csd.as_bytes();
        assert_eq!(b[0], 0x00);
        assert_eq!(b[4], 0x5f);
        assert_eq!(b[5], 0x59);
        // C_SIZE = 64 MiB / (512 * 512) - 1 = 255
        let c_size = ((b[6] as u32 & 0x03) << 10) | ((b[7] as u32) << 2) | (b[8] as u32 >> 6);
        assert_eq!(c_size, 255);
        assert_eq!(b[15] & 1, 1);
        assert!(csd.ccc().contains(CmdClass::WRITE_PROTECT));
    }

    #[test]
    fn sdhc_csd_4gib() {
        let csd = Csd::sd(4 * 1024 * 1024 * 1024);
        let b = csd.as_bytes();
        assert_eq!(b[0], 0x40);
        assert_eq!(b[4], 0x5b);
        assert_eq!(b[5], 0x59);
        // C_SIZE = 4 GiB / 512 KiB - 1
        assert_eq!(((b[7] as u32) << 16) | ((b[8] as u32) << 8) | b[9] as u32, 8191);
        assert!(!csd.ccc().contains(CmdClass::WRITE_PROTECT));
    }

    #[test]
    fn csd_program_rules() {
        let mut csd = Csd::sd(1 << 20);
        let mut image = *csd.as_bytes();
        image[14] |= CsdFlags::TEMPORARY_WRITE_PROTECT.bits();
        assert!(csd.program(&image));
        assert!(csd.is_write_protected());

        // read-only field
        let mut bad = *csd.as_bytes();
        bad[3] ^= 0x01;
        assert!(!csd.program(&bad));

        // copy bit cannot be cleared once set
        csd.insert_flags(CsdFlags::COPY);
        let mut clear_copy = *csd.as_bytes();
        clear_copy[14] &= !CsdFlags::COPY.bits();
        assert!(!csd.program(&clear_copy));
    }

    #[test]
    fn cid_program_requires_identical_image() {
        let mut cid = Cid::sd();
        let image = *cid.as_bytes();
        assert!(cid.program(&image));
        let mut other = image;
        other[3] = b'Z';
        assert!(!cid.program(&other));
    }

    #[test]
    fn scr_versions() {
        assert_eq!(Scr::new(SpecVersion::V1_10).as_bytes()[..4], [0x01, 0x25, 0x00, 0x00]);
        assert_eq!(Scr::new(SpecVersion::V2_00).as_bytes()[..4], [0x02, 0x25, 0x00, 0x00]);
        let v3 = Scr::new(SpecVersion::V3_01);
        assert_eq!(v3.as_bytes()[..4], [0x02, 0x25, 0x80, 0x00]);
        assert!(v3.flags().contains(ScrFlags::SD_SPECIFICATION3));
    }

    #[test]
    fn ext_csd_switch() {
        let mut ext = ExtCsd::emmc(1 << 20, 2 * BOOT_PARTITION_UNIT, 0);
        assert_eq!(ext.sector_count(), 2048);
        assert_eq!(ext.read_reg8(EXT_CSD_BOOT_MULT), 2);

        assert!(ext.switch(SwitchAccess::WriteByte, EXT_CSD_PART_CONFIG, 0x01));
        assert_eq!(ext.partition(), Partition::Boot1);
        assert!(ext.switch(SwitchAccess::SetBits, EXT_CSD_PART_CONFIG, 0x02));
        assert_eq!(ext.read_reg8(EXT_CSD_PART_CONFIG), 0x03);
        assert!(ext.switch(SwitchAccess::ClearBits, EXT_CSD_PART_CONFIG, 0x01));
        assert_eq!(ext.partition(), Partition::Boot2);

        assert!(!ext.switch(SwitchAccess::WriteByte, EXT_CSD_REV, 7));
        assert_eq!(ext.read_reg8(EXT_CSD_REV), 3);
    }
}
