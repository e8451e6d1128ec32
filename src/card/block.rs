//! Data phase: block I/O against the store, write protect groups, erase and
//! the byte pump behind `read_byte` / `write_byte`.

extern crate alloc;
use alloc::vec;
use alloc::vec::Vec;

use log::{debug, error, trace, warn};

use super::info::CsdFlags;
use super::{CardState, SdCard};
use crate::common::commands::{Direction, ResponseKind, SdRequest};
use crate::common::{
    CardStatus, HWBLOCK_SHIFT, INVALID_ADDRESS, SDSC_MAX_CAPACITY, SECTOR_SHIFT, WPGROUP_SHIFT,
    WPGROUP_SIZE,
};
use crate::host::BlockStore;

/// Physical Layer Simplified Specification 3.01, Table 4-2.
const TUNING_BLOCK_PATTERN: [u8; 64] = [
    0xff, 0x0f, 0xff, 0x00, 0x0f, 0xfc, 0xc3, 0xcc, //
    0xc3, 0x3c, 0xcc, 0xff, 0xfe, 0xff, 0xfe, 0xef, //
    0xff, 0xdf, 0xff, 0xdd, 0xff, 0xfb, 0xff, 0xfb, //
    0xbf, 0xff, 0x7f, 0xff, 0x77, 0xf7, 0xbd, 0xef, //
    0xff, 0xf0, 0xff, 0xf0, 0x0f, 0xfc, 0xcc, 0x3c, //
    0xcc, 0x33, 0xcc, 0xcf, 0xff, 0xef, 0xff, 0xee, //
    0xff, 0xfd, 0xff, 0xfd, 0xdf, 0xff, 0xbf, 0xff, //
    0xbb, 0xff, 0xf7, 0xff, 0xf7, 0x7f, 0x7b, 0xde, //
];

/// GEN_CMD reads return this filler.
const GEN_CMD_FILL: u8 = 0xec;

/// Where the bytes of a card-to-host transfer come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum DataSource {
    /// Prepared in the scratch buffer by the command.
    Buffer,
    SdStatus,
    Scr,
    ExtCsd,
    Tuning,
    ReadSingle,
    ReadMultiple,
    GenCmd,
}

/// What a host-to-card transfer commits to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum DataSink {
    WriteSingle,
    WriteMultiple,
    ProgramCid,
    ProgramCsd,
    Lock,
    GenCmd,
    BusTest,
}

/// Progress of the data phase. `start` is the byte address of the current
/// block, `total` the number of bytes per block and `cursor` the position in
/// it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum DataPhase {
    Idle,
    Sending { source: DataSource, start: u64, total: usize, cursor: usize },
    Receiving { sink: DataSink, start: u64, total: usize, cursor: usize },
}

/// Write protect group bitmap, one bit per 2 MiB group.
#[derive(Debug, Clone)]
pub(super) struct WpGroups {
    bits: Vec<u64>,
    count: usize,
}

impl WpGroups {
    pub(super) fn new(count: usize) -> Self {
        Self { bits: vec![0; count.div_ceil(64)], count }
    }

    pub(super) fn test(&self, group: usize) -> bool {
        group < self.count && self.bits[group / 64] & (1 << (group % 64)) != 0
    }

    pub(super) fn set(&mut self, group: usize, protect: bool) {
        if group >= self.count {
            return;
        }
        if protect {
            self.bits[group / 64] |= 1 << (group % 64);
        } else {
            self.bits[group / 64] &= !(1 << (group % 64));
        }
    }

    pub(super) fn clear_all(&mut self) {
        self.bits.fill(0);
    }
}

pub(super) fn wp_group_of(addr: u64) -> usize {
    (addr >> (HWBLOCK_SHIFT + SECTOR_SHIFT + WPGROUP_SHIFT)) as usize
}

impl<B: BlockStore> SdCard<B> {
    /// Moves one byte across DAT in the given direction. Writes return 0.
    pub fn transfer_byte(&mut self, direction: Direction, value: u8) -> u8 {
        match direction {
            Direction::Read => self.read_byte(),
            Direction::Write => {
                self.write_byte(value);
                0
            }
        }
    }

    /// Next byte of a card-to-host transfer.
    pub fn read_byte(&mut self) -> u8 {
        if !self.is_present() {
            return 0x00;
        }
        if self.state != CardState::SendingData {
            warn!("{}: read_byte: not in sending-data state", self.proto.name);
            return 0x00;
        }
        if self.status.intersects(CardStatus::ADDRESS_ERROR | CardStatus::WP_VIOLATION) {
            return 0x00;
        }
        let DataPhase::Sending { source, mut start, total, mut cursor } = self.phase else {
            warn!("{}: read_byte: no transfer in progress", self.proto.name);
            return 0x00;
        };

        let ret = match source {
            DataSource::Buffer => self.data[cursor],
            DataSource::SdStatus => self.sd_status.read_reg8(cursor),
            DataSource::Scr => self.scr.read_reg8(cursor),
            DataSource::ExtCsd => self.ext_csd.read_reg8(cursor),
            DataSource::Tuning => TUNING_BLOCK_PATTERN[cursor],
            DataSource::ReadSingle => {
                if cursor == 0 {
                    self.blk_read(start, total);
                }
                self.data[cursor]
            }
            DataSource::ReadMultiple => {
                if cursor == 0 {
                    if !self.address_in_range("READ_MULTIPLE_BLOCK", start, total) {
                        return 0x00;
                    }
                    self.blk_read(start, total);
                }
                self.data[cursor]
            }
            DataSource::GenCmd => {
                if cursor == 0 {
                    self.data[..total].fill(GEN_CMD_FILL);
                }
                self.data[cursor]
            }
        };
        cursor += 1;

        if cursor < total {
            self.phase = DataPhase::Sending { source, start, total, cursor };
            return ret;
        }

        if source == DataSource::ReadMultiple {
            start += total as u64;
            if self.multi_blk_cnt != 0 {
                self.multi_blk_cnt -= 1;
                if self.multi_blk_cnt == 0 {
                    // Stop!
                    self.finish_data();
                    return ret;
                }
            }
            self.phase = DataPhase::Sending { source, start, total, cursor: 0 };
            return ret;
        }

        self.finish_data();
        ret
    }

    /// Next byte of a host-to-card transfer.
    pub fn write_byte(&mut self, value: u8) {
        if !self.is_present() {
            return;
        }
        if !self.receive_ready() {
            warn!("{}: write_byte: not in receiving-data state", self.proto.name);
            return;
        }
        if self.status.intersects(CardStatus::ADDRESS_ERROR | CardStatus::WP_VIOLATION) {
            return;
        }
        let DataPhase::Receiving { sink, mut start, total, mut cursor } = self.phase else {
            return;
        };

        if sink == DataSink::WriteMultiple && cursor == 0 {
            // Start of the block - let's check the address is valid
            if !self.address_in_range("WRITE_MULTIPLE_BLOCK", start, total) {
                return;
            }
            if (self.size <= SDSC_MAX_CAPACITY && self.wp_addr(start))
                || self.medium_write_protected()
            {
                warn!("{}: write to protected group at {:#x}", self.proto.name, start);
                self.status.insert(CardStatus::WP_VIOLATION);
                return;
            }
        }

        self.data[cursor] = if sink == DataSink::BusTest { !value } else { value };
        cursor += 1;
        if cursor < total {
            self.phase = DataPhase::Receiving { sink, start, total, cursor };
            return;
        }

        match sink {
            DataSink::WriteSingle => {
                self.set_state(CardState::Programming);
                if (self.size <= SDSC_MAX_CAPACITY && self.wp_addr(start))
                    || self.medium_write_protected()
                {
                    warn!("{}: write to protected block at {:#x}", self.proto.name, start);
                    self.status.insert(CardStatus::WP_VIOLATION);
                } else {
                    self.blk_write(start, cursor);
                    self.blk_written += 1;
                    self.csd.insert_flags(CsdFlags::COPY);
                }
                self.finish_data();
            }
            DataSink::WriteMultiple => {
                self.set_state(CardState::Programming);
                self.blk_write(start, cursor);
                self.blk_written += 1;
                self.csd.insert_flags(CsdFlags::COPY);
                start += total as u64;

                if self.multi_blk_cnt != 0 {
                    self.multi_blk_cnt -= 1;
                    if self.multi_blk_cnt == 0 {
                        // Stop!
                        self.finish_data();
                        return;
                    }
                }
                self.set_state(CardState::ReceivingData);
                self.phase = DataPhase::Receiving { sink, start, total, cursor: 0 };
            }
            DataSink::ProgramCid => {
                self.set_state(CardState::Programming);
                if !self.cid.program(&self.data[..16]) {
                    warn!("{}: attempt to overwrite CID", self.proto.name);
                    self.status.insert(CardStatus::CID_CSD_OVERWRITE);
                }
                self.finish_data();
            }
            DataSink::ProgramCsd => {
                self.set_state(CardState::Programming);
                if !self.csd.program(&self.data[..16]) {
                    warn!("{}: attempt to overwrite CSD", self.proto.name);
                    self.status.insert(CardStatus::CID_CSD_OVERWRITE);
                }
                self.finish_data();
            }
            DataSink::Lock => {
                self.set_state(CardState::Programming);
                self.lock_command();
                self.finish_data();
            }
            DataSink::GenCmd => {
                trace!("{}: GEN_CMD payload of {} bytes dropped", self.proto.name, cursor);
                self.finish_data();
            }
            DataSink::BusTest => {
                // Stay in bus-test until BUSTEST_R reads the pattern back
                self.phase = DataPhase::Idle;
            }
        }
    }

    fn finish_data(&mut self) {
        self.set_state(CardState::Transfer);
        self.phase = DataPhase::Idle;
    }

    /// Drops a stale data phase once the card has left the data states.
    pub(super) fn settle_data_phase(&mut self) {
        if !matches!(
            self.state,
            CardState::SendingData | CardState::ReceivingData | CardState::BusTest
        ) {
            self.phase = DataPhase::Idle;
        }
    }

    pub(super) fn start_sending(
        &mut self,
        source: DataSource,
        start: u64,
        total: usize,
    ) -> ResponseKind {
        self.phase = DataPhase::Sending { source, start, total, cursor: 0 };
        self.set_state(CardState::SendingData);
        ResponseKind::R1
    }

    pub(super) fn start_receiving(
        &mut self,
        sink: DataSink,
        start: u64,
        total: usize,
    ) -> ResponseKind {
        self.phase = DataPhase::Receiving { sink, start, total, cursor: 0 };
        self.set_state(CardState::ReceivingData);
        ResponseKind::R1
    }

    /// Bytes moved per block: high capacity cards always use 512.
    fn io_len(&self) -> usize {
        if self.is_high_capacity() { 512 } else { self.blk_len as usize }
    }

    fn address_in_range(&mut self, desc: &str, addr: u64, len: usize) -> bool {
        let size = self.partition_size();
        if addr.saturating_add(len as u64) > size {
            warn!(
                "{}: {} at {:#x}+{} is beyond the card ({:#x} bytes)",
                self.proto.name, desc, addr, len, size
            );
            self.status.insert(CardStatus::ADDRESS_ERROR);
            return false;
        }
        true
    }

    fn blk_read(&mut self, addr: u64, len: usize) {
        let offset = self.partition_offset() + addr;
        debug!("{}: read {} bytes at {:#x}", self.proto.name, len, addr);
        if let Some(store) = self.store.as_mut() {
            if let Err(e) = store.read(offset, &mut self.data[..len]) {
                error!("{}: read error on host side at {:#x}: {}", self.proto.name, offset, e);
            }
        }
    }

    fn blk_write(&mut self, addr: u64, len: usize) {
        let offset = self.partition_offset() + addr;
        debug!("{}: write {} bytes at {:#x}", self.proto.name, len, addr);
        if let Some(store) = self.store.as_mut() {
            if let Err(e) = store.write(offset, &self.data[..len]) {
                error!("{}: write error on host side at {:#x}: {}", self.proto.name, offset, e);
            }
        }
    }

    /// Overwrites `len` bytes with `byte`, used by erase paths.
    pub(super) fn blk_fill(&mut self, addr: u64, len: u64, byte: u8) {
        let offset = self.partition_offset() + addr;
        if let Some(store) = self.store.as_mut() {
            if let Err(e) = store.fill(offset, len, byte) {
                error!("{}: erase error on host side at {:#x}: {}", self.proto.name, offset, e);
            }
        }
    }

    /// CSD write protection or a read-only medium.
    fn medium_write_protected(&self) -> bool {
        self.wp_switch || self.csd.is_write_protected()
    }

    fn wp_addr(&self, addr: u64) -> bool {
        self.wp_groups.test(wp_group_of(addr))
    }

    pub(super) fn clear_write_protect(&mut self) {
        self.wp_groups.clear_all();
    }

    /// Protection bits of the 32 groups starting at `addr`. Groups past the
    /// end of the card read as 0.
    fn wpbits(&self, mut addr: u64) -> u32 {
        let mut group = wp_group_of(addr);
        let mut ret = 0;
        for i in 0..32 {
            if addr < self.size && self.wp_groups.test(group) {
                ret |= 1 << i;
            }
            group += 1;
            addr += WPGROUP_SIZE;
        }
        ret
    }

    /// Builds the 64-byte CMD6 switch status in the scratch buffer. Mode 1
    /// (bit 31) also applies the selection.
    pub(super) fn function_switch(&mut self, arg: u32) {
        let mode = arg & 0x8000_0000 != 0;

        self.data[..64].fill(0);
        // Maximum current consumption
        self.data[0] = 0x00;
        self.data[1] = 0x01;
        // Supported functions, groups 6 down to 1
        self.data[2..12].copy_from_slice(&[0x80, 0x01, 0x80, 0x01, 0x80, 0x01, 0x80, 0x01, 0x80, 0x43]);
        self.data[12] = 0x80;
        self.data[13] = 0x03;

        for i in 0..6 {
            let new_func = ((arg >> (i * 4)) & 0x0f) as u8;
            if mode && new_func != 0x0f {
                self.function_group[i] = new_func;
            }
            self.data[16 - (i >> 1)] |= new_func << ((i % 2) * 4);
        }
    }

    fn erase(&mut self) {
        trace!("{}: erase {:#x}..{:#x}", self.proto.name, self.erase_start, self.erase_end);
        let (erase_start, erase_end) = (self.erase_start, self.erase_end);
        if erase_start == INVALID_ADDRESS || erase_end == INVALID_ADDRESS {
            warn!("{}: erase without a start/end pair", self.proto.name);
            self.status.insert(CardStatus::ERASE_SEQ_ERROR);
            self.clear_erase_range();
            return;
        }

        let sdsc = !self.is_high_capacity();
        let (mut start, mut end) = (erase_start as u64, erase_end as u64);
        if !sdsc {
            // High capacity memory card: erase units are 512 byte blocks
            start *= 512;
            end *= 512;
        }

        let size = self.partition_size();
        if start >= size || end >= size {
            warn!("{}: erase range {:#x}..{:#x} beyond card", self.proto.name, start, end);
            self.status.insert(CardStatus::OUT_OF_RANGE);
            self.clear_erase_range();
            return;
        }
        if start > end {
            warn!("{}: inverted erase range {:#x}..{:#x}", self.proto.name, start, end);
            self.status.insert(CardStatus::ERASE_SEQ_ERROR);
            self.clear_erase_range();
            return;
        }

        self.clear_erase_range();
        self.csd.insert_flags(CsdFlags::COPY);

        let mut addr = start & !0x1ff;
        while addr <= end {
            // Only SDSC cards support write protect groups
            if sdsc && self.wp_addr(addr) {
                self.status.insert(CardStatus::WP_ERASE_SKIP);
            } else {
                let len = core::cmp::min(512, size - addr);
                self.blk_fill(addr, len, 0xff);
            }
            addr += 512;
        }
    }

    fn clear_erase_range(&mut self) {
        self.erase_start = INVALID_ADDRESS;
        self.erase_end = INVALID_ADDRESS;
    }

    pub(super) fn cmd_read_block(&mut self, req: &SdRequest, multiple: bool) -> ResponseKind {
        if self.state != CardState::Transfer {
            return self.invalid_state_for_cmd(req);
        }
        let addr = self.req_address(req);
        let desc = if multiple { "READ_MULTIPLE_BLOCK" } else { "READ_SINGLE_BLOCK" };
        if !self.address_in_range(desc, addr, self.blk_len as usize) {
            return ResponseKind::R1;
        }
        let source = if multiple { DataSource::ReadMultiple } else { DataSource::ReadSingle };
        let io_len = self.io_len();
        self.start_sending(source, addr, io_len)
    }

    pub(super) fn cmd_write_block(&mut self, req: &SdRequest, multiple: bool) -> ResponseKind {
        if self.state != CardState::Transfer {
            return self.invalid_state_for_cmd(req);
        }
        let addr = self.req_address(req);
        let desc = if multiple { "WRITE_MULTIPLE_BLOCK" } else { "WRITE_SINGLE_BLOCK" };
        if !self.address_in_range(desc, addr, self.blk_len as usize) {
            return ResponseKind::R1;
        }

        let sink = if multiple { DataSink::WriteMultiple } else { DataSink::WriteSingle };
        let blk_len = self.blk_len as usize;
        self.blk_written = 0;
        let resp = self.start_receiving(sink, addr, blk_len);

        if self.size <= SDSC_MAX_CAPACITY && self.wp_addr(addr) {
            self.status.insert(CardStatus::WP_VIOLATION);
        }
        if self.medium_write_protected() {
            self.status.insert(CardStatus::WP_VIOLATION);
        }
        resp
    }

    pub(super) fn cmd_program(&mut self, req: &SdRequest, sink: DataSink) -> ResponseKind {
        if self.state != CardState::Transfer {
            return self.invalid_state_for_cmd(req);
        }
        self.start_receiving(sink, 0, 16)
    }

    pub(super) fn cmd_write_prot(&mut self, req: &SdRequest, protect: bool) -> ResponseKind {
        if self.size > SDSC_MAX_CAPACITY {
            return ResponseKind::Illegal;
        }
        if self.state != CardState::Transfer {
            return self.invalid_state_for_cmd(req);
        }
        let addr = self.req_address(req);
        let desc = if protect { "SET_WRITE_PROT" } else { "CLR_WRITE_PROT" };
        if !self.address_in_range(desc, addr, 1) {
            return ResponseKind::R1b;
        }

        self.set_state(CardState::Programming);
        self.wp_groups.set(wp_group_of(addr), protect);
        debug!("{}: write protect group {} = {}", self.proto.name, wp_group_of(addr), protect);
        // Bzzzzzzztt .... Operation complete.
        self.set_state(CardState::Transfer);
        ResponseKind::R1b
    }

    pub(super) fn cmd_send_write_prot(&mut self, req: &SdRequest) -> ResponseKind {
        if self.size > SDSC_MAX_CAPACITY {
            return ResponseKind::Illegal;
        }
        if self.state != CardState::Transfer {
            return self.invalid_state_for_cmd(req);
        }
        if !self.address_in_range("SEND_WRITE_PROT", req.arg as u64, self.blk_len as usize) {
            return ResponseKind::R1;
        }
        let bits = self.wpbits(req.arg as u64);
        self.data[..4].copy_from_slice(&bits.to_be_bytes());
        let addr = self.req_address(req);
        self.start_sending(DataSource::Buffer, addr, 4)
    }

    pub(super) fn cmd_erase_bound(&mut self, req: &SdRequest, start: bool) -> ResponseKind {
        if self.state != CardState::Transfer {
            return self.invalid_state_for_cmd(req);
        }
        if start {
            self.erase_start = req.arg;
        } else {
            self.erase_end = req.arg;
        }
        ResponseKind::R1
    }

    pub(super) fn cmd_erase(&mut self, req: &SdRequest) -> ResponseKind {
        if self.state != CardState::Transfer {
            return self.invalid_state_for_cmd(req);
        }
        if self.medium_write_protected() {
            self.status.insert(CardStatus::WP_VIOLATION);
            return ResponseKind::R1b;
        }
        self.set_state(CardState::Programming);
        self.erase();
        self.set_state(CardState::Transfer);
        ResponseKind::R1b
    }

    pub(super) fn cmd_lock_unlock(&mut self, req: &SdRequest) -> ResponseKind {
        if self.state != CardState::Transfer {
            return self.invalid_state_for_cmd(req);
        }
        let blk_len = self.blk_len as usize;
        self.start_receiving(DataSink::Lock, 0, blk_len)
    }

    pub(super) fn cmd_bustest_write(&mut self, req: &SdRequest) -> ResponseKind {
        if self.state != CardState::Transfer {
            return self.invalid_state_for_cmd(req);
        }
        self.start_receiving(DataSink::BusTest, 0, 8);
        self.set_state(CardState::BusTest);
        ResponseKind::R1
    }

    pub(super) fn cmd_bustest_read(&mut self, req: &SdRequest) -> ResponseKind {
        if self.state != CardState::BusTest {
            return self.invalid_state_for_cmd(req);
        }
        self.start_sending(DataSource::Buffer, 0, 8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CardConfig;
    use crate::host::MemStore;

    fn card(size: usize) -> SdCard<MemStore> {
        SdCard::new(CardConfig::sd(), Some(MemStore::new(size))).unwrap()
    }

    #[test]
    fn wp_bitmap() {
        let mut groups = WpGroups::new(70);
        groups.set(3, true);
        groups.set(65, true);
        assert!(groups.test(3));
        assert!(groups.test(65));
        assert!(!groups.test(4));
        // out of range is ignored
        groups.set(70, true);
        assert!(!groups.test(70));
        groups.set(3, false);
        assert!(!groups.test(3));
        groups.clear_all();
        assert!(!groups.test(65));
    }

    #[test]
    fn wp_groups_are_2mib() {
        assert_eq!(wp_group_of(0), 0);
        assert_eq!(wp_group_of(WPGROUP_SIZE - 1), 0);
        assert_eq!(wp_group_of(WPGROUP_SIZE), 1);
        assert_eq!(WPGROUP_SIZE, 2 * 1024 * 1024);
    }

    #[test]
    fn wpbits_stop_at_card_end() {
        let mut card = card(4 << 20);
        card.wp_groups.set(0, true);
        card.wp_groups.set(1, true);
        card.wp_groups.set(2, true);
        // group 2 lies past the end of a 4 MiB card
        assert_eq!(card.wpbits(0), 0b11);
        assert_eq!(card.wpbits(WPGROUP_SIZE), 0b1);
    }

    #[test]
    fn function_switch_status() {
        let mut card = card(1 << 20);
        card.function_switch(0x80ff_fff1);
        assert_eq!(card.function_group, [1, 0, 0, 0, 0, 0]);
        assert_eq!(&card.data[..4], &[0x00, 0x01, 0x80, 0x01]);
        assert_eq!(card.data[11], 0x43);
        assert_eq!(card.data[13], 0x03);
        assert_eq!(card.data[16], 0xf1);
        assert_eq!(card.data[14], 0xff);

        // check mode leaves the selection alone
        card.function_switch(0x00ff_fff0);
        assert_eq!(card.function_group, [1, 0, 0, 0, 0, 0]);
        assert_eq!(card.data[16], 0xf0);
    }

    #[test]
    fn erase_range_checks() {
        let mut card = card(1 << 20);
        card.erase();
        assert!(card.status.contains(CardStatus::ERASE_SEQ_ERROR));

        card.status = CardStatus::RESET;
        card.erase_start = 0;
        card.erase_end = 1 << 20;
        card.erase();
        assert!(card.status.contains(CardStatus::OUT_OF_RANGE));
        assert_eq!(card.erase_start, INVALID_ADDRESS);

        card.status = CardStatus::RESET;
        card.erase_start = 1024;
        card.erase_end = 0;
        card.erase();
        assert!(card.status.contains(CardStatus::ERASE_SEQ_ERROR));
        assert!(card.store().unwrap().as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn erase_skips_protected_groups() {
        let mut card = card(4 << 20);
        card.wp_groups.set(1, true);
        card.erase_start = (WPGROUP_SIZE - 512) as u32;
        card.erase_end = (WPGROUP_SIZE + 512) as u32;
        card.erase();
        assert!(card.status.contains(CardStatus::WP_ERASE_SKIP));
        assert!(card.csd.flags().contains(CsdFlags::COPY));
        let data = card.store().unwrap().as_slice();
        let group = WPGROUP_SIZE as usize;
        assert!(data[group - 512..group].iter().all(|&b| b == 0xff));
        assert!(data[group..group + 1024].iter().all(|&b| b == 0));
    }

    #[test]
    fn read_outside_data_state() {
        let mut card = card(1 << 20);
        assert_eq!(card.read_byte(), 0);
        card.write_byte(0x12);
        assert_eq!(card.state(), CardState::Idle);
    }
}
