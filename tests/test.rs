use std::collections::HashMap;

use byte_unit::{Byte, Unit};
use sdcard_emu::card::info::Partition;
use sdcard_emu::config::BOOT_PARTITION_UNIT;
use sdcard_emu::{
    BlockStore, CardConfig, CardState, CardStatus, CrcPolicy, MemStore, Ocr, RcaSource,
    ResponseKind, SdBus, SdCard, SdRequest, SdResponse, SpecVersion, StoreError, StoreResult,
    XorShiftRca,
};

fn mib(n: u64) -> usize {
    Byte::from_u64_with_unit(n, Unit::MiB).unwrap().as_u64() as usize
}

/// Minimal host controller driving one card.
struct Host<B: BlockStore> {
    card: SdCard<B>,
    rca: u16,
}

impl<B: BlockStore> Host<B> {
    fn new(card: SdCard<B>) -> Self {
        Self { card, rca: 0 }
    }

    fn cmd(&mut self, cmd: u8, arg: u32) -> SdResponse {
        self.card.do_command(&SdRequest::new(cmd, arg))
    }

    /// Addressed command: RCA in bits 31:16.
    fn acmd_rca(&self) -> u32 {
        (self.rca as u32) << 16
    }

    fn acmd(&mut self, cmd: u8, arg: u32) -> SdResponse {
        let rca = self.acmd_rca();
        let resp = self.cmd(55, rca);
        assert!(resp.as_r1().contains(CardStatus::APP_CMD));
        self.cmd(cmd, arg)
    }

    fn read(&mut self, len: usize) -> Vec<u8> {
        (0..len).map(|_| self.card.read_byte()).collect()
    }

    fn write(&mut self, data: &[u8]) {
        for &b in data {
            self.card.write_byte(b);
        }
    }

    fn status(&mut self) -> CardStatus {
        let rca = self.acmd_rca();
        self.cmd(13, rca).as_r1()
    }

    /// Runs SD identification and selects the card.
    fn init_sd(&mut self) {
        assert_eq!(self.cmd(0, 0).kind(), ResponseKind::None);
        assert_eq!(self.cmd(8, 0x1aa).as_r7(), 0x1aa);
        let resp = self.acmd(41, 0x40ff_8000);
        assert_ne!(resp.as_r3() & Ocr::CARD_POWER_UP.bits(), 0);
        assert_eq!(self.cmd(2, 0).kind(), ResponseKind::R2Cid);
        let (rca, _) = self.cmd(3, 0).as_r6();
        self.rca = rca;
        let arg = self.acmd_rca();
        assert_eq!(self.cmd(7, arg).kind(), ResponseKind::R1b);
        assert_eq!(self.card.state(), CardState::Transfer);
    }
}

fn sd_host(size: usize, version: SpecVersion) -> Host<MemStore> {
    let cfg = CardConfig::sd().with_spec_version(version);
    Host::new(SdCard::new(cfg, Some(MemStore::new(size))).unwrap())
}

/// Reports a large medium and only keeps blocks that were written.
struct SparseStore {
    size: u64,
    blocks: HashMap<u64, Vec<u8>>,
}

impl SparseStore {
    fn new(size: u64) -> Self {
        Self { size, blocks: HashMap::new() }
    }
}

impl BlockStore for SparseStore {
    fn read(&mut self, offset: u64, buf: &mut [u8]) -> StoreResult {
        if offset % 512 != 0 || buf.len() > 512 {
            return Err(StoreError::OutOfBounds { offset, len: buf.len() });
        }
        match self.blocks.get(&(offset / 512)) {
            Some(block) => buf.copy_from_slice(&block[..buf.len()]),
            None => buf.fill(0),
        }
        Ok(())
    }

    fn write(&mut self, offset: u64, buf: &[u8]) -> StoreResult {
        if offset % 512 != 0 || buf.len() > 512 {
            return Err(StoreError::OutOfBounds { offset, len: buf.len() });
        }
        let block = self.blocks.entry(offset / 512).or_insert_with(|| vec![0; 512]);
        block[..buf.len()].copy_from_slice(buf);
        Ok(())
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn is_writable(&self) -> bool {
        true
    }
}

#[test]
fn test_write_read_single_block() {
    let mut host = sd_host(mib(64), "2.00".parse().unwrap());
    host.init_sd();

    assert_eq!(host.cmd(16, 512).kind(), ResponseKind::R1);
    assert_eq!(host.cmd(24, 0).kind(), ResponseKind::R1);
    assert!(host.card.receive_ready());
    host.write(&[0xaa; 512]);
    assert_eq!(host.card.state(), CardState::Transfer);

    let resp = host.cmd(17, 0);
    assert_eq!(resp.kind(), ResponseKind::R1);
    assert!(host.card.data_ready());
    assert_eq!(host.read(512), vec![0xaa; 512]);
    assert_eq!(host.card.state(), CardState::Transfer);

    let status = host.status();
    assert!(status.contains(CardStatus::READY_FOR_DATA));
    assert!(!status.contains(CardStatus::WP_VIOLATION));
    assert!(!status.contains(CardStatus::ADDRESS_ERROR));
    assert_eq!(&host.card.store().unwrap().as_slice()[..512], &[0xaa; 512]);
}

#[test]
fn test_erase_first_block() {
    let mut host = sd_host(mib(64), SpecVersion::V2_00);
    host.init_sd();
    host.cmd(24, 0);
    host.write(&[0xaa; 512]);

    assert_eq!(host.cmd(32, 0).kind(), ResponseKind::R1);
    assert_eq!(host.cmd(33, 0).kind(), ResponseKind::R1);
    let resp = host.cmd(38, 0);
    assert_eq!(resp.kind(), ResponseKind::R1b);
    assert!(!resp.as_r1().contains(CardStatus::CID_CSD_OVERWRITE));
    assert!(!resp.as_r1().contains(CardStatus::ERASE_SEQ_ERROR));

    let data = host.card.store().unwrap().as_slice();
    assert!(data[..512].iter().all(|&b| b == 0xff));
    assert!(data[512..1024].iter().all(|&b| b == 0));
    assert!(!host.status().contains(CardStatus::CID_CSD_OVERWRITE));
}

#[test]
fn test_erase_needs_both_bounds() {
    let mut host = sd_host(mib(1), SpecVersion::V2_00);
    host.init_sd();
    host.cmd(32, 0);
    let resp = host.cmd(38, 0);
    assert!(resp.as_r1().contains(CardStatus::ERASE_SEQ_ERROR));
    assert!(host.card.store().unwrap().as_slice().iter().all(|&b| b == 0));
}

#[test]
fn test_boundary_address_error() {
    let size = mib(1);
    let mut host = sd_host(size, SpecVersion::V2_00);
    host.init_sd();

    let resp = host.cmd(17, (size - 256) as u32);
    assert_eq!(resp.kind(), ResponseKind::R1);
    assert!(resp.as_r1().contains(CardStatus::ADDRESS_ERROR));
    assert_eq!(host.card.state(), CardState::Transfer);

    let resp = host.cmd(24, (size - 256) as u32);
    assert!(resp.as_r1().contains(CardStatus::ADDRESS_ERROR));
    host.write(&[0x55; 512]);
    assert!(host.card.store().unwrap().as_slice().iter().all(|&b| b == 0));

    // last full block is fine
    let resp = host.cmd(17, (size - 512) as u32);
    assert!(!resp.as_r1().contains(CardStatus::ADDRESS_ERROR));
    assert_eq!(host.read(512), vec![0; 512]);
}

#[test]
fn test_idle_state_gating() {
    let mut host = sd_host(mib(1), SpecVersion::V2_00);
    let before = host.card.status();
    let resp = host.cmd(17, 0);
    assert_eq!(resp.kind(), ResponseKind::Illegal);
    assert!(resp.is_empty());
    assert_eq!(host.card.status(), before | CardStatus::ILLEGAL_COMMAND);
    assert_eq!(host.card.state(), CardState::Idle);
}

#[test]
fn test_multi_block_termination() {
    let mut host = sd_host(mib(1), SpecVersion::V3_01);
    host.init_sd();

    let pattern: Vec<u8> = (0..4 * 512).map(|i| (i / 512) as u8 + 1).collect();
    assert_eq!(host.cmd(23, 4).kind(), ResponseKind::R1);
    assert_eq!(host.cmd(25, 0).kind(), ResponseKind::R1);
    host.write(&pattern);
    assert_eq!(host.card.state(), CardState::Transfer);
    assert_eq!(&host.card.store().unwrap().as_slice()[..2048], &pattern[..]);

    // block count
    host.cmd(23, 2);
    host.cmd(18, 0);
    let counted = host.read(1024);
    assert_eq!(host.card.state(), CardState::Transfer);
    assert!(!host.card.data_ready());

    // manual stop after the same number of blocks
    host.cmd(18, 0);
    let manual = host.read(1024);
    assert_eq!(host.card.state(), CardState::SendingData);
    assert_eq!(host.cmd(12, 0).kind(), ResponseKind::R1b);
    assert_eq!(host.card.state(), CardState::Transfer);

    assert_eq!(counted, manual);
    assert_eq!(counted, pattern[..1024]);

    // ACMD22 reports the blocks written by the last write command
    host.acmd(22, 0);
    assert_eq!(host.read(4), vec![0, 0, 0, 4]);
}

#[test]
fn test_block_count_needs_v3() {
    let mut host = sd_host(mib(1), SpecVersion::V2_00);
    host.init_sd();
    assert_eq!(host.cmd(23, 2).kind(), ResponseKind::Illegal);
    assert_eq!(host.cmd(19, 0).kind(), ResponseKind::Illegal);
}

#[test]
fn test_tuning_block() {
    let mut host = sd_host(mib(1), SpecVersion::V3_01);
    host.init_sd();
    host.cmd(19, 0);
    let block = host.read(64);
    assert_eq!(&block[..4], &[0xff, 0x0f, 0xff, 0x00]);
    assert_eq!(block[63], 0xde);
    assert_eq!(host.card.state(), CardState::Transfer);
}

#[test]
fn test_lock_unlock() {
    let mut host = sd_host(mib(1), SpecVersion::V2_00);
    host.init_sd();

    host.cmd(16, 6);
    assert_eq!(host.cmd(42, 0).kind(), ResponseKind::R1);
    host.write(&[0x05, 4, b'a', b'b', b'c', b'd']);
    let status = host.status();
    assert!(status.contains(CardStatus::CARD_IS_LOCKED));
    assert!(!status.contains(CardStatus::LOCK_UNLOCK_FAILED));

    // block read is class 2: rejected while locked
    let resp = host.cmd(17, 0);
    assert_eq!(resp.kind(), ResponseKind::Illegal);
    assert!(host.card.status().contains(CardStatus::ILLEGAL_COMMAND));

    // wrong password
    host.cmd(42, 0);
    host.write(&[0x00, 4, b'a', b'b', b'c', b'x']);
    let status = host.status();
    assert!(status.contains(CardStatus::LOCK_UNLOCK_FAILED));
    assert!(status.contains(CardStatus::CARD_IS_LOCKED));

    host.cmd(42, 0);
    host.write(&[0x00, 4, b'a', b'b', b'c', b'd']);
    assert!(!host.status().contains(CardStatus::CARD_IS_LOCKED));

    host.cmd(16, 512);
    assert_eq!(host.cmd(17, 0).kind(), ResponseKind::R1);
    assert_eq!(host.read(512), vec![0; 512]);
}

#[test]
fn test_write_protect_groups() {
    let mut host = sd_host(mib(4), SpecVersion::V2_00);
    host.init_sd();

    assert_eq!(host.cmd(28, 0).kind(), ResponseKind::R1b);
    let resp = host.cmd(24, 0);
    assert!(resp.as_r1().contains(CardStatus::WP_VIOLATION));
    host.write(&[0x42; 512]);
    assert!(host.status().contains(CardStatus::WP_VIOLATION));
    assert!(host.card.store().unwrap().as_slice()[..512].iter().all(|&b| b == 0));

    host.cmd(30, 0);
    assert_eq!(host.read(4), vec![0, 0, 0, 1]);

    assert_eq!(host.cmd(29, 0).kind(), ResponseKind::R1b);
    let resp = host.cmd(24, 0);
    assert!(!resp.as_r1().contains(CardStatus::WP_VIOLATION));
    host.write(&[0x42; 512]);
    assert_eq!(&host.card.store().unwrap().as_slice()[..512], &[0x42; 512]);
}

#[test]
fn test_program_registers() {
    let mut host = sd_host(mib(1), SpecVersion::V2_00);
    host.init_sd();

    // temporary write protect through PROGRAM_CSD
    let mut csd = *host.card.csd().as_bytes();
    csd[14] |= 0x10;
    host.cmd(27, 0);
    host.write(&csd);
    assert!(!host.status().contains(CardStatus::CID_CSD_OVERWRITE));
    assert!(host.card.csd().is_write_protected());
    let resp = host.cmd(24, 0);
    assert!(resp.as_r1().contains(CardStatus::WP_VIOLATION));
    assert_eq!(host.card.state(), CardState::ReceivingData);
    assert_eq!(host.cmd(12, 0).kind(), ResponseKind::R1b);
    assert_eq!(host.card.state(), CardState::Transfer);

    // the CID cannot be changed
    let mut cid = *host.card.cid().as_bytes();
    cid[0] ^= 0xff;
    assert_eq!(host.cmd(26, 0).kind(), ResponseKind::R1);
    host.write(&cid);
    assert_eq!(host.card.state(), CardState::Transfer);
    assert!(host.status().contains(CardStatus::CID_CSD_OVERWRITE));
    assert_ne!(host.card.cid().as_bytes()[0], cid[0]);
}

#[test]
fn test_switch_function() {
    let mut host = sd_host(mib(1), SpecVersion::V2_00);
    host.init_sd();
    assert_eq!(host.cmd(6, 0x80ff_fff1).kind(), ResponseKind::R1);
    let status = host.read(64);
    assert_eq!(status[13], 0x03);
    assert_eq!(status[16], 0xf1);
    assert_eq!(host.card.function_group()[0], 1);
}

#[test]
fn test_app_registers() {
    let mut host = sd_host(mib(1), SpecVersion::V2_00);
    host.init_sd();

    assert_eq!(host.acmd(51, 0).kind(), ResponseKind::R1);
    let scr = host.read(8);
    assert_eq!(&scr[..], &host.card.scr().as_bytes()[..]);

    assert_eq!(host.acmd(6, 2).kind(), ResponseKind::R1);
    host.acmd(13, 0);
    let sd_status = host.read(64);
    assert_eq!(sd_status[0], 0x80);
    assert_eq!(host.card.state(), CardState::Transfer);

    // GEN_CMD read
    host.cmd(56, 1);
    assert_eq!(host.read(512), vec![0xec; 512]);
}

#[test]
fn test_unknown_command() {
    let mut host = sd_host(mib(1), SpecVersion::V2_00);
    let resp = host.cmd(50, 0);
    assert_eq!(resp.kind(), ResponseKind::R1);
    assert!(resp.as_r1().contains(CardStatus::ILLEGAL_COMMAND));
}

#[test]
fn test_power_up_timer() {
    let mut host = sd_host(mib(1), SpecVersion::V2_00);
    let mut polls = 0;
    loop {
        polls += 1;
        let resp = host.acmd(41, 0);
        assert_eq!(host.card.state(), CardState::Idle);
        if resp.as_r3() & Ocr::CARD_POWER_UP.bits() != 0 {
            break;
        }
        assert!(polls < 10, "card never powered up");
    }
    assert!(polls > 1);
    assert!(!host.card.ocr().is_high_capacity());

    host.acmd(41, 0x00ff_8000);
    assert_eq!(host.card.state(), CardState::Ready);
}

#[test]
fn test_high_capacity_addressing() {
    let size = 4 * 1024 * 1024 * 1024;
    let card = SdCard::new(CardConfig::sd(), Some(SparseStore::new(size))).unwrap();
    let mut host = Host::new(card);
    host.init_sd();
    assert!(host.card.ocr().is_high_capacity());
    // CSD structure 2.0
    assert_eq!(host.card.csd().as_bytes()[0] >> 6, 1);

    // arguments are block numbers
    host.cmd(24, 3);
    host.write(&[0x77; 512]);
    assert_eq!(host.card.store().unwrap().blocks[&3], vec![0x77; 512]);
    host.cmd(17, 3);
    assert_eq!(host.read(512), vec![0x77; 512]);

    // write protect groups are SDSC only
    assert_eq!(host.cmd(28, 0).kind(), ResponseKind::Illegal);

    host.cmd(32, 3);
    host.cmd(33, 3);
    host.cmd(38, 0);
    assert_eq!(host.card.store().unwrap().blocks[&3], vec![0xff; 512]);
}

#[test]
fn test_spi_flow() {
    let card = SdCard::new(CardConfig::spi(), Some(MemStore::new(mib(1)))).unwrap();
    let mut host = Host::new(card);

    let resp = host.cmd(0, 0);
    assert_eq!(resp.kind(), ResponseKind::R1);
    assert_eq!(resp.as_r1(), CardStatus::READY_FOR_DATA);
    assert_eq!(host.cmd(8, 0x1aa).as_r7(), 0x1aa);
    // bad voltage pattern still answers in SPI mode
    assert_eq!(host.cmd(8, 0x3aa).kind(), ResponseKind::R7);

    let ocr = host.cmd(58, 0).as_r3();
    assert_ne!(ocr & Ocr::CARD_POWER_UP.bits(), 0);

    assert_eq!(host.cmd(55, 0).kind(), ResponseKind::R1);
    assert_eq!(host.cmd(41, 0x4000_0000).kind(), ResponseKind::R1);
    assert_eq!(host.card.state(), CardState::Transfer);

    assert_eq!(host.cmd(9, 0).kind(), ResponseKind::R1);
    let csd = host.read(16);
    assert_eq!(&csd[..], &host.card.csd().as_bytes()[..]);
    assert_eq!(host.card.state(), CardState::Transfer);

    // no RCA check in SPI mode
    assert_eq!(host.cmd(13, 0x1234_0000).kind(), ResponseKind::R1);
    assert_eq!(host.cmd(59, 0).kind(), ResponseKind::R1);
    assert_eq!(host.cmd(3, 0).kind(), ResponseKind::Illegal);
}

#[test]
fn test_emmc_flow() {
    let boot = BOOT_PARTITION_UNIT;
    let cfg = CardConfig::emmc().with_boot_partition_size(boot);
    let size = 2 * boot as usize + mib(1);
    let mut host = Host::new(SdCard::new(cfg, Some(MemStore::new(size))).unwrap());

    assert_eq!(host.cmd(0, 0).kind(), ResponseKind::None);
    let resp = host.cmd(1, 0x40ff_8080);
    assert_eq!(resp.kind(), ResponseKind::R3);
    assert_ne!(resp.as_r3() & Ocr::CARD_POWER_UP.bits(), 0);
    assert_eq!(host.card.state(), CardState::Ready);
    assert_eq!(host.cmd(2, 0).as_r2(), *host.card.cid().as_bytes());

    host.rca = 2;
    assert_eq!(host.cmd(3, 2 << 16).kind(), ResponseKind::R1);
    assert_eq!(host.card.rca(), 2);
    assert_eq!(host.cmd(9, 2 << 16).kind(), ResponseKind::R2Csd);
    assert_eq!(host.cmd(7, 2 << 16).kind(), ResponseKind::R1b);

    // EXT_CSD
    assert_eq!(host.cmd(8, 0).kind(), ResponseKind::R1);
    let ext_csd = host.read(512);
    assert_eq!(u32::from_le_bytes([ext_csd[212], ext_csd[213], ext_csd[214], ext_csd[215]]), 2048);
    assert_eq!(ext_csd[226], 1);

    // partitions live at boot1, boot2, user in the medium
    let switch_part = |part: u32| (3 << 24) | (179 << 16) | (part << 8);
    for (part, fill, offset) in [(1, 0x11, 0), (2, 0x22, boot as usize), (0, 0x33, 2 * boot as usize)] {
        assert_eq!(host.cmd(6, switch_part(part)).kind(), ResponseKind::R1b);
        host.cmd(24, 0);
        host.write(&[fill; 512]);
        assert_eq!(&host.card.store().unwrap().as_slice()[offset..offset + 512], &[fill; 512]);
    }
    assert_eq!(host.card.ext_csd().partition(), Partition::User);

    // boot partition bounds
    host.cmd(6, switch_part(1));
    let resp = host.cmd(17, boot as u32);
    assert!(resp.as_r1().contains(CardStatus::ADDRESS_ERROR));
    host.cmd(6, switch_part(0));

    // properties segment is read-only
    let resp = host.cmd(6, (3 << 24) | (212 << 16));
    assert!(resp.as_r1().contains(CardStatus::SWITCH_ERROR));

    // bus test echoes the inverted pattern
    assert_eq!(host.cmd(19, 2 << 16).kind(), ResponseKind::R1);
    assert_eq!(host.card.state(), CardState::BusTest);
    host.write(&[0x55, 0xaa, 0, 0, 0, 0, 0, 0]);
    assert_eq!(host.card.state(), CardState::BusTest);
    assert_eq!(host.cmd(14, 2 << 16).kind(), ResponseKind::R1);
    assert_eq!(host.read(8), vec![0xaa, 0x55, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]);
    assert_eq!(host.card.state(), CardState::Transfer);

    // sleep / awake
    host.cmd(7, 0);
    assert_eq!(host.card.state(), CardState::Standby);
    assert_eq!(host.cmd(5, (2 << 16) | (1 << 15)).kind(), ResponseKind::R1b);
    assert_eq!(host.card.state(), CardState::Sleep);
    assert!(host.cmd(13, 2 << 16).is_empty());
    assert_eq!(host.cmd(5, 2 << 16).kind(), ResponseKind::R1b);
    assert_eq!(host.card.state(), CardState::Standby);

    // interrupt mode
    assert_eq!(host.cmd(40, 0).kind(), ResponseKind::None);
    assert_eq!(host.card.state(), CardState::WaitIrq);
    assert!(host.cmd(13, 2 << 16).is_empty());
    assert_eq!(host.card.state(), CardState::Standby);
}

#[test]
fn test_crc_enforced_on_bus() {
    let cfg = CardConfig::sd().with_crc_policy(CrcPolicy::Enforce);
    let bus = SdBus::new(SdCard::new(cfg, Some(MemStore::new(mib(1)))).unwrap());

    let resp = bus.do_frame(&[0x48, 0, 0, 0x01, 0xaa, 0x00]);
    assert_eq!(resp.kind(), ResponseKind::Illegal);
    assert!(bus.with_card(|card| card.status().contains(CardStatus::COM_CRC_ERROR)));

    let resp = bus.do_frame(&[0x48, 0, 0, 0x01, 0xaa, 0x87]);
    assert_eq!(resp.as_r7(), 0x1aa);
}

#[test]
fn test_media_change() {
    let bus = SdBus::new(SdCard::new(CardConfig::sd(), Some(MemStore::new(mib(1)))).unwrap());
    bus.do_command(&SdRequest::new(55, 0));
    bus.do_command(&SdRequest::new(41, 0x00ff_8000));
    assert_eq!(bus.with_card(|card| card.state()), CardState::Ready);

    let media = bus.change_media(None).unwrap();
    assert!(!media.inserted);
    assert!(bus.do_command(&SdRequest::new(8, 0x1aa)).is_empty());

    let mut store = MemStore::new(mib(2));
    store.set_writable(false);
    let media = bus.change_media(Some(store)).unwrap();
    assert!(media.inserted);
    assert!(media.readonly);
    assert_eq!(bus.with_card(|card| (card.state(), card.size())), (CardState::Idle, mib(2) as u64));

    assert!(bus.change_media(Some(MemStore::new(3 * 512))).is_err());
}

#[test]
fn test_erase_twice_is_idempotent() {
    let mut host = sd_host(mib(1), SpecVersion::V2_00);
    host.init_sd();
    for addr in [0, 512, 1024, 1536] {
        host.cmd(24, addr);
        host.write(&[0xaa; 512]);
    }

    host.cmd(32, 0);
    host.cmd(33, 1024);
    host.cmd(38, 0);
    let once = host.card.store().unwrap().as_slice().to_vec();
    assert!(once[..1536].iter().all(|&b| b == 0xff));
    assert!(once[1536..2048].iter().all(|&b| b == 0xaa));

    host.cmd(32, 0);
    host.cmd(33, 1024);
    let resp = host.cmd(38, 0);
    assert!(!resp.as_r1().intersects(CardStatus::ERASE_SEQ_ERROR | CardStatus::OUT_OF_RANGE));
    assert_eq!(host.card.store().unwrap().as_slice(), &once[..]);
}

#[test]
fn test_unaligned_byte_address_round_trip() {
    let mut host = sd_host(mib(1), SpecVersion::V2_00);
    host.init_sd();
    assert!(!host.card.ocr().is_high_capacity());

    let pattern: Vec<u8> = (0..512).map(|i| (i * 7) as u8).collect();
    assert_eq!(host.cmd(24, 1000).kind(), ResponseKind::R1);
    host.write(&pattern);
    assert_eq!(host.card.state(), CardState::Transfer);

    let data = host.card.store().unwrap().as_slice();
    assert_eq!(&data[1000..1512], &pattern[..]);
    assert_eq!(data[999], 0);
    assert_eq!(data[1512], 0);

    assert_eq!(host.cmd(17, 1000).kind(), ResponseKind::R1);
    assert_eq!(host.read(512), pattern);
}

#[test]
fn test_locked_card_app_commands() {
    let mut host = sd_host(mib(1), SpecVersion::V2_00);
    host.init_sd();
    host.cmd(16, 6);
    host.cmd(42, 0);
    host.write(&[0x05, 4, b'p', b'a', b's', b's']);
    host.cmd(16, 512);
    assert!(host.status().contains(CardStatus::CARD_IS_LOCKED));

    // the ACMD42 bootstrap goes through
    let resp = host.acmd(42, 1);
    assert_eq!(resp.kind(), ResponseKind::R1);
    assert!(!resp.as_r1().contains(CardStatus::ILLEGAL_COMMAND));

    // other application commands are refused and the prefix is consumed
    let rca = host.acmd_rca();
    for acmd in [13, 51] {
        assert_eq!(host.cmd(55, rca).kind(), ResponseKind::R1);
        assert_eq!(host.cmd(acmd, 0).kind(), ResponseKind::Illegal);
        assert!(!host.card.data_ready());

        let resp = host.cmd(13, rca);
        assert_eq!(resp.kind(), ResponseKind::R1);
        assert!(resp.as_r1().contains(CardStatus::ILLEGAL_COMMAND));
        assert!(!resp.as_r1().contains(CardStatus::APP_CMD));
        assert_eq!(host.card.state(), CardState::Transfer);
    }
}

#[test]
fn test_seeded_rca_source() {
    let card =
        SdCard::with_rca_source(CardConfig::sd(), Some(MemStore::new(mib(1))), XorShiftRca::new(7))
            .unwrap();
    let mut host = Host::new(card);
    host.init_sd();

    let mut expected = XorShiftRca::new(7);
    let first = expected.next_rca(0);
    assert_eq!(host.rca, first);
    assert_eq!(host.card.rca(), first);

    // a second address request in standby draws the next value
    host.cmd(7, 0);
    assert_eq!(host.card.state(), CardState::Standby);
    let (rca, _) = host.cmd(3, 0).as_r6();
    assert_eq!(rca, expected.next_rca(first));
    assert_eq!(host.card.rca(), rca);
}
