use log::{debug, trace, warn};

use super::block::{DataSink, DataSource};
use super::info::SwitchAccess;
use super::proto::SdCmd;
use super::{CMD_FRAME_NS, CardMode, CardState, SdCard};
use crate::common::commands::{ResponseKind, SdRequest, SdResponse};
use crate::common::{
    CardStatus, Ocr, SD_APP_CMD, SD_GO_IDLE_STATE, SD_READ_MULTIPLE_BLOCK, SD_SET_BLOCKLEN,
    SD_SLEEP_AWAKE, SD_WRITE_MULTIPLE_BLOCK, SD_ACMD_SD_SEND_OP_COND,
    SD_ACMD_SET_CLR_CARD_DETECT,
};
use crate::config::{CrcPolicy, SpecVersion};
use crate::host::BlockStore;
use crate::tools::extract32;

impl<B: BlockStore> SdCard<B> {
    /// Runs one command and returns the response the card drives on CMD.
    ///
    /// An empty response means the card stays silent, either because the
    /// command does not have a response or because it was rejected.
    pub fn do_command(&mut self, req: &SdRequest) -> SdResponse {
        if !self.is_present() {
            return SdResponse::empty();
        }
        self.advance_clock(CMD_FRAME_NS);

        if !req.crc_valid() {
            match self.config.crc_policy() {
                CrcPolicy::Enforce => {
                    warn!(
                        "{}: CMD{} CRC mismatch: got {:#04x}, expected {:#04x}",
                        self.proto.name,
                        req.cmd & 0x3f,
                        req.crc,
                        req.expected_crc()
                    );
                    self.status.insert(CardStatus::COM_CRC_ERROR);
                    return self.respond(ResponseKind::Illegal);
                }
                CrcPolicy::Ignore => debug!(
                    "{}: CMD{} CRC mismatch ignored",
                    self.proto.name,
                    req.cmd & 0x3f
                ),
            }
        }

        let req = SdRequest { cmd: req.index(), ..*req };

        if self.state == CardState::Sleep
            && req.cmd != SD_GO_IDLE_STATE
            && req.cmd != SD_SLEEP_AWAKE
        {
            trace!("{}: CMD{} ignored while asleep", self.proto.name, req.cmd);
            return SdResponse::empty();
        }

        if self.state == CardState::WaitIrq {
            // Any command terminates the interrupt wait
            self.set_state(CardState::Standby);
            return SdResponse::empty();
        }

        if self.status.contains(CardStatus::CARD_IS_LOCKED) && !self.cmd_valid_while_locked(req.cmd) {
            warn!("{}: card is locked, CMD{} rejected", self.proto.name, req.cmd);
            self.status.insert(CardStatus::ILLEGAL_COMMAND);
            self.expecting_acmd = false;
            return self.respond(ResponseKind::Illegal);
        }

        let last_state = self.state;
        let kind = if self.expecting_acmd {
            self.expecting_acmd = false;
            self.app_command(&req)
        } else {
            self.normal_command(&req)
        };

        if kind == ResponseKind::Illegal {
            self.status.insert(CardStatus::ILLEGAL_COMMAND);
        } else {
            // Valid command: the response reports the state it was received in
            self.status.set_current_state(last_state.status_code());
        }
        self.settle_data_phase();

        self.respond(kind)
    }

    fn cmd_valid_while_locked(&self, cmd: u8) -> bool {
        // Valid commands in locked state:
        // basic class (0)
        // lock card class (7)
        // CMD16
        // implicitly, the ACMD prefix CMD55
        // ACMD41 and ACMD42
        if self.expecting_acmd {
            return cmd == SD_ACMD_SD_SEND_OP_COND || cmd == SD_ACMD_SET_CLR_CARD_DETECT;
        }
        if cmd == SD_SET_BLOCKLEN || cmd == SD_APP_CMD {
            return true;
        }
        let class = self.proto.entry(cmd).class;
        class == 0 || class == 7
    }

    /// Encodes the response and retires status bits accordingly.
    pub(super) fn respond(&mut self, kind: ResponseKind) -> SdResponse {
        let resp = match kind {
            ResponseKind::R1 | ResponseKind::R1b => {
                let resp = SdResponse::short(kind, self.status.bits());
                self.status.remove(CardStatus::CLEAR_BY_READ);
                resp
            }
            ResponseKind::R2Cid => SdResponse::long(kind, self.cid.as_bytes()),
            ResponseKind::R2Csd => SdResponse::long(kind, self.csd.as_bytes()),
            ResponseKind::R3 => SdResponse::short(kind, (self.ocr & Ocr::R3_MASK).bits()),
            ResponseKind::R6 => {
                let status = self.status.bits();
                let packed = ((status >> 8) & 0xc000) | ((status >> 6) & 0x2000) | (status & 0x1fff);
                self.status.remove(CardStatus::from_bits_retain(
                    CardStatus::CLEAR_BY_READ.bits() & 0x00c8_1fff,
                ));
                SdResponse::short(kind, ((self.rca as u32) << 16) | packed)
            }
            ResponseKind::R7 => SdResponse::short(kind, self.vhs),
            ResponseKind::None | ResponseKind::Illegal => SdResponse::new(kind),
        };

        if kind != ResponseKind::Illegal {
            // Clear the "clear on valid command" status bits now we've
            // sent any response
            self.status.remove(CardStatus::CLEAR_BY_COMMAND);
        }
        trace!("{}: response {} ({} bytes)", self.proto.name, kind.name(), resp.len());
        resp
    }

    /// RCA carried by an addressed command, 0 for broadcasts.
    pub(super) fn req_rca(&self, req: &SdRequest) -> u16 {
        if self.proto.entry(req.cmd).kind.is_addressed() { req.rca() } else { 0 }
    }

    pub(super) fn req_rca_same(&self, req: &SdRequest) -> bool {
        self.req_rca(req) == self.rca
    }

    /// Byte address of a data command. High capacity cards are addressed in
    /// 512-byte blocks.
    pub(super) fn req_address(&self, req: &SdRequest) -> u64 {
        if self.is_high_capacity() { (req.arg as u64) << 9 } else { req.arg as u64 }
    }

    pub(super) fn invalid_state_for_cmd(&self, req: &SdRequest) -> ResponseKind {
        warn!(
            "{}: CMD{} {} in a wrong state: {} (spec {})",
            self.proto.name,
            req.cmd,
            self.proto.entry(req.cmd).cmd.name(),
            self.state.name(),
            self.config.spec_version().as_str()
        );
        ResponseKind::Illegal
    }

    fn invalid_mode_for_cmd(&self, req: &SdRequest) -> ResponseKind {
        warn!(
            "{}: CMD{} {} in a wrong mode: {:?} (spec {})",
            self.proto.name,
            req.cmd,
            self.proto.entry(req.cmd).cmd.name(),
            self.state.mode(),
            self.config.spec_version().as_str()
        );
        ResponseKind::Illegal
    }

    fn cmd_illegal(&self, req: &SdRequest) -> ResponseKind {
        warn!(
            "{}: unknown CMD{} for spec {}",
            self.proto.name,
            req.cmd,
            self.config.spec_version().as_str()
        );
        ResponseKind::Illegal
    }

    fn cmd_unimplemented(&self, req: &SdRequest) -> ResponseKind {
        warn!("{}: CMD{} not implemented", self.proto.name, req.cmd);
        ResponseKind::Illegal
    }

    /// Commands with no table entry still answer so the host does not stall.
    fn cmd_unknown(&mut self, req: &SdRequest) -> ResponseKind {
        warn!("{}: unknown CMD{}", self.proto.name, req.cmd);
        self.status.insert(CardStatus::ILLEGAL_COMMAND);
        ResponseKind::R1
    }

    pub(super) fn normal_command(&mut self, req: &SdRequest) -> ResponseKind {
        let entry = self.proto.entry(req.cmd);
        if req.cmd != SD_APP_CMD {
            trace!(
                "{}: CMD{} {} arg {:#010x} ({})",
                self.proto.name,
                req.cmd,
                entry.cmd.name(),
                req.arg,
                self.state.name()
            );
        }

        // Not interpreting this as an app command
        self.status.remove(CardStatus::APP_CMD);

        // CMD23 (set block count) must be immediately followed by CMD18 or
        // CMD25 if not the block count is reset
        if self.multi_blk_cnt != 0
            && req.cmd != SD_READ_MULTIPLE_BLOCK
            && req.cmd != SD_WRITE_MULTIPLE_BLOCK
        {
            self.multi_blk_cnt = 0;
        }

        if entry.class == 6 && self.is_high_capacity() {
            // Only Standard Capacity cards support class 6 commands
            warn!("{}: CMD{} needs a standard capacity card", self.proto.name, req.cmd);
            return ResponseKind::Illegal;
        }

        match entry.cmd {
            SdCmd::GoIdleState => self.cmd_go_idle_state(),
            SdCmd::SendOpCond => self.cmd_spi_send_op_cond(),
            SdCmd::EmmcSendOpCond => self.cmd_emmc_send_op_cond(req),
            SdCmd::AllSendCid => self.cmd_all_send_cid(req),
            SdCmd::SendRelativeAddr => self.cmd_send_relative_addr(req),
            SdCmd::SetRelativeAddr => self.cmd_set_relative_addr(req),
            SdCmd::SetDsr => self.cmd_set_dsr(req),
            SdCmd::SleepAwake => self.cmd_sleep_awake(req),
            SdCmd::SwitchFunction => self.cmd_switch_function(req),
            SdCmd::EmmcSwitch => self.cmd_emmc_switch(req),
            SdCmd::SelectCard => self.cmd_select_card(req),
            SdCmd::SendIfCond => self.cmd_send_if_cond(req),
            SdCmd::SendExtCsd => self.cmd_send_ext_csd(req),
            SdCmd::SendCsd => self.cmd_send_csd_cid(req, false),
            SdCmd::SendCid => self.cmd_send_csd_cid(req, true),
            SdCmd::StopTransmission => self.cmd_stop_transmission(req),
            SdCmd::SendStatus => self.cmd_send_status(req),
            SdCmd::BusTestRead => self.cmd_bustest_read(req),
            SdCmd::GoInactiveState => self.cmd_go_inactive_state(req),
            SdCmd::SetBlockLen => self.cmd_set_blocklen(req),
            SdCmd::ReadSingleBlock => self.cmd_read_block(req, false),
            SdCmd::ReadMultipleBlock => self.cmd_read_block(req, true),
            SdCmd::SendTuningBlock => self.cmd_send_tuning_block(req),
            SdCmd::BusTestWrite => self.cmd_bustest_write(req),
            SdCmd::SetBlockCount => self.cmd_set_block_count(req),
            SdCmd::WriteBlock => self.cmd_write_block(req, false),
            SdCmd::WriteMultipleBlock => self.cmd_write_block(req, true),
            SdCmd::ProgramCid => self.cmd_program(req, DataSink::ProgramCid),
            SdCmd::ProgramCsd => self.cmd_program(req, DataSink::ProgramCsd),
            SdCmd::SetWriteProt => self.cmd_write_prot(req, true),
            SdCmd::ClrWriteProt => self.cmd_write_prot(req, false),
            SdCmd::SendWriteProt => self.cmd_send_write_prot(req),
            SdCmd::EraseStart => self.cmd_erase_bound(req, true),
            SdCmd::EraseEnd => self.cmd_erase_bound(req, false),
            SdCmd::Erase => self.cmd_erase(req),
            SdCmd::GoIrqState => self.cmd_go_irq_state(req),
            SdCmd::LockUnlock => self.cmd_lock_unlock(req),
            SdCmd::AppCmd => self.cmd_app_cmd(req),
            SdCmd::GenCmd => self.cmd_gen_cmd(req),
            SdCmd::ReadOcr => ResponseKind::R3,
            SdCmd::CrcOnOff => ResponseKind::R1,
            SdCmd::Illegal => self.cmd_illegal(req),
            SdCmd::Unimplemented => self.cmd_unimplemented(req),
            SdCmd::Unknown => self.cmd_unknown(req),
        }
    }

    fn cmd_go_idle_state(&mut self) -> ResponseKind {
        if self.state != CardState::Inactive {
            self.reset();
        }
        if self.is_spi() { ResponseKind::R1 } else { ResponseKind::None }
    }

    fn cmd_spi_send_op_cond(&mut self) -> ResponseKind {
        self.set_state(CardState::Transfer);
        ResponseKind::R1
    }

    fn cmd_emmc_send_op_cond(&mut self, req: &SdRequest) -> ResponseKind {
        if self.state != CardState::Idle {
            return self.invalid_state_for_cmd(req);
        }
        self.ocr_powerup();
        if self.ocr.bits() & req.arg & Ocr::ACMD41_ENQUIRY_MASK != 0 {
            self.set_state(CardState::Ready);
        }
        ResponseKind::R3
    }

    fn cmd_all_send_cid(&mut self, req: &SdRequest) -> ResponseKind {
        if self.state != CardState::Ready {
            return self.invalid_state_for_cmd(req);
        }
        self.set_state(CardState::Identification);
        ResponseKind::R2Cid
    }

    fn cmd_send_relative_addr(&mut self, req: &SdRequest) -> ResponseKind {
        match self.state {
            CardState::Identification | CardState::Standby => {
                self.set_state(CardState::Standby);
                self.rca = self.rca_source.next_rca(self.rca);
                debug!("{}: new RCA {:#06x}", self.proto.name, self.rca);
                ResponseKind::R6
            }
            _ => self.invalid_state_for_cmd(req),
        }
    }

    fn cmd_set_relative_addr(&mut self, req: &SdRequest) -> ResponseKind {
        match self.state {
            CardState::Identification | CardState::Standby => {
                self.set_state(CardState::Standby);
                self.rca = req.rca();
                ResponseKind::R1
            }
            _ => self.invalid_state_for_cmd(req),
        }
    }

    fn cmd_set_dsr(&mut self, req: &SdRequest) -> ResponseKind {
        if self.state != CardState::Standby {
            return self.invalid_state_for_cmd(req);
        }
        ResponseKind::None
    }

    fn cmd_sleep_awake(&mut self, req: &SdRequest) -> ResponseKind {
        if !self.req_rca_same(req) {
            return ResponseKind::None;
        }
        let do_sleep = extract32(req.arg, 15, 1) != 0;
        match self.state {
            CardState::Sleep => {
                if !do_sleep {
                    self.set_state(CardState::Standby);
                }
                ResponseKind::R1b
            }
            CardState::Standby => {
                if do_sleep {
                    self.set_state(CardState::Sleep);
                }
                ResponseKind::R1b
            }
            _ => self.invalid_state_for_cmd(req),
        }
    }

    fn cmd_switch_function(&mut self, req: &SdRequest) -> ResponseKind {
        if self.state.mode() != CardMode::DataTransfer {
            return self.invalid_mode_for_cmd(req);
        }
        if self.state != CardState::Transfer {
            return self.invalid_state_for_cmd(req);
        }
        self.function_switch(req.arg);
        self.start_sending(DataSource::Buffer, 0, 64)
    }

    fn cmd_emmc_switch(&mut self, req: &SdRequest) -> ResponseKind {
        if self.state != CardState::Transfer {
            return self.invalid_state_for_cmd(req);
        }
        let access = SwitchAccess::from(extract32(req.arg, 24, 2));
        let index = extract32(req.arg, 16, 8) as usize;
        let value = extract32(req.arg, 8, 8) as u8;
        if !self.ext_csd.switch(access, index, value) {
            warn!("eMMC: EXT_CSD[{}] is read-only", index);
            self.status.insert(CardStatus::SWITCH_ERROR);
        }
        ResponseKind::R1b
    }

    fn cmd_select_card(&mut self, req: &SdRequest) -> ResponseKind {
        let same = self.req_rca_same(req);
        match self.state {
            CardState::Standby => {
                if !same {
                    return ResponseKind::None;
                }
                self.set_state(CardState::Transfer);
                ResponseKind::R1b
            }
            CardState::Transfer | CardState::SendingData if !same => {
                self.set_state(CardState::Standby);
                ResponseKind::R1b
            }
            CardState::Disconnect => {
                if !same {
                    return ResponseKind::None;
                }
                self.set_state(CardState::Programming);
                ResponseKind::R1b
            }
            CardState::Programming if !same => {
                self.set_state(CardState::Disconnect);
                ResponseKind::R1b
            }
            _ => self.invalid_state_for_cmd(req),
        }
    }

    fn cmd_send_if_cond(&mut self, req: &SdRequest) -> ResponseKind {
        if self.config.spec_version() < SpecVersion::V2_00 {
            return self.cmd_illegal(req);
        }
        if self.state != CardState::Idle {
            return self.invalid_state_for_cmd(req);
        }
        self.vhs = 0;

        // No response if not exactly one VHS bit is set
        let arg = req.arg;
        let extra = (arg >> 8) != 0
            && arg
                .checked_shr((arg & !0xff).trailing_zeros() + 1)
                .unwrap_or(0)
                != 0;
        if (arg >> 8) == 0 || extra {
            return if self.is_spi() { ResponseKind::R7 } else { ResponseKind::None };
        }

        // Accept
        self.vhs = arg;
        ResponseKind::R7
    }

    fn cmd_send_ext_csd(&mut self, req: &SdRequest) -> ResponseKind {
        if self.state != CardState::Transfer {
            return self.invalid_state_for_cmd(req);
        }
        self.start_sending(DataSource::ExtCsd, 0, 512)
    }

    fn cmd_send_csd_cid(&mut self, req: &SdRequest, cid: bool) -> ResponseKind {
        match self.state {
            CardState::Standby => {
                if !self.req_rca_same(req) {
                    return ResponseKind::None;
                }
                if cid { ResponseKind::R2Cid } else { ResponseKind::R2Csd }
            }
            CardState::Transfer if self.is_spi() => {
                let reg = if cid { self.cid.as_bytes() } else { self.csd.as_bytes() };
                self.data[..16].copy_from_slice(reg);
                let start = self.req_address(req);
                self.start_sending(DataSource::Buffer, start, 16)
            }
            _ => self.invalid_state_for_cmd(req),
        }
    }

    fn cmd_stop_transmission(&mut self, req: &SdRequest) -> ResponseKind {
        match self.state {
            CardState::SendingData => {
                self.set_state(CardState::Transfer);
                ResponseKind::R1b
            }
            CardState::ReceivingData => {
                // Programming finishes instantly
                self.set_state(CardState::Programming);
                self.set_state(CardState::Transfer);
                ResponseKind::R1b
            }
            _ => self.invalid_state_for_cmd(req),
        }
    }

    fn cmd_send_status(&mut self, req: &SdRequest) -> ResponseKind {
        if self.state.mode() != CardMode::DataTransfer {
            return self.invalid_mode_for_cmd(req);
        }
        if !self.is_spi() && !self.req_rca_same(req) {
            return ResponseKind::None;
        }
        ResponseKind::R1
    }

    fn cmd_go_inactive_state(&mut self, req: &SdRequest) -> ResponseKind {
        if self.state.mode() != CardMode::DataTransfer {
            return self.invalid_mode_for_cmd(req);
        }
        if !self.req_rca_same(req) {
            return ResponseKind::None;
        }
        self.set_state(CardState::Inactive);
        ResponseKind::None
    }

    fn cmd_set_blocklen(&mut self, req: &SdRequest) -> ResponseKind {
        if self.state != CardState::Transfer {
            return self.invalid_state_for_cmd(req);
        }
        if req.arg > 512 {
            warn!("{}: block length {} over 512", self.proto.name, req.arg);
            self.status.insert(CardStatus::BLOCK_LEN_ERROR);
        } else {
            trace!("{}: block length {}", self.proto.name, req.arg);
            self.blk_len = req.arg;
        }
        ResponseKind::R1
    }

    fn cmd_send_tuning_block(&mut self, req: &SdRequest) -> ResponseKind {
        if self.config.spec_version() < SpecVersion::V3_01 {
            return self.cmd_illegal(req);
        }
        if self.state != CardState::Transfer {
            return self.invalid_state_for_cmd(req);
        }
        self.start_sending(DataSource::Tuning, 0, 64)
    }

    fn cmd_set_block_count(&mut self, req: &SdRequest) -> ResponseKind {
        if !self.is_emmc() && self.config.spec_version() < SpecVersion::V3_01 {
            return self.cmd_illegal(req);
        }
        if self.state != CardState::Transfer {
            return self.invalid_state_for_cmd(req);
        }
        self.multi_blk_cnt = if self.is_emmc() { extract32(req.arg, 0, 16) } else { req.arg };
        trace!("{}: block count {}", self.proto.name, self.multi_blk_cnt);
        ResponseKind::R1
    }

    fn cmd_go_irq_state(&mut self, req: &SdRequest) -> ResponseKind {
        if self.state != CardState::Standby {
            return self.invalid_state_for_cmd(req);
        }
        self.set_state(CardState::WaitIrq);
        ResponseKind::None
    }

    fn cmd_app_cmd(&mut self, req: &SdRequest) -> ResponseKind {
        match self.state {
            CardState::Ready | CardState::Identification | CardState::Inactive => {
                return self.invalid_state_for_cmd(req);
            }
            CardState::Idle if req.rca() != 0 => {
                warn!("{}: illegal RCA {:#06x} for APP_CMD", self.proto.name, req.rca());
            }
            _ => {}
        }
        if !self.is_spi() && !self.req_rca_same(req) {
            return ResponseKind::None;
        }
        self.expecting_acmd = true;
        self.status.insert(CardStatus::APP_CMD);
        ResponseKind::R1
    }

    fn cmd_gen_cmd(&mut self, req: &SdRequest) -> ResponseKind {
        if self.state != CardState::Transfer {
            return self.invalid_state_for_cmd(req);
        }
        let len = self.blk_len as usize;
        if req.arg & 1 != 0 {
            self.start_sending(DataSource::GenCmd, 0, len)
        } else {
            self.start_receiving(DataSink::GenCmd, 0, len)
        }
    }
}
