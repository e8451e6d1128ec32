use log::{debug, trace, warn};

use super::block::DataSource;
use super::proto::AppCmd;
use super::{CardState, SdCard};
use crate::common::commands::{ResponseKind, SdRequest};
use crate::common::{CardStatus, Ocr};
use crate::host::BlockStore;

impl<B: BlockStore> SdCard<B> {
    /// Runs a command received right after APP_CMD.
    pub(super) fn app_command(&mut self, req: &SdRequest) -> ResponseKind {
        let acmd = self.proto.app(req.cmd);
        trace!(
            "{}: ACMD{} {} arg {:#010x} ({})",
            self.proto.name,
            req.cmd,
            acmd.name(),
            req.arg,
            self.state.name()
        );
        self.status.insert(CardStatus::APP_CMD);

        match acmd {
            AppCmd::SetBusWidth => {
                if self.state != CardState::Transfer {
                    return self.acmd_wrong_state(req);
                }
                self.sd_status.set_bus_width((req.arg & 0x03) as u8);
                debug!("{}: bus width {}", self.proto.name, if req.arg & 0x03 == 2 { 4 } else { 1 });
                ResponseKind::R1
            }
            AppCmd::SdStatus => {
                if self.state != CardState::Transfer {
                    return self.acmd_wrong_state(req);
                }
                self.start_sending(DataSource::SdStatus, 0, 64)
            }
            AppCmd::SendNumWrBlocks => {
                if self.state != CardState::Transfer {
                    return self.acmd_wrong_state(req);
                }
                self.data[..4].copy_from_slice(&self.blk_written.to_be_bytes());
                self.start_sending(DataSource::Buffer, 0, 4)
            }
            AppCmd::SetWrBlkEraseCount | AppCmd::SetClrCardDetect => {
                // Pre-erase count and the DAT3 pull-up have no effect here
                if self.state != CardState::Transfer {
                    return self.acmd_wrong_state(req);
                }
                ResponseKind::R1
            }
            AppCmd::SdSendOpCond => self.acmd_sd_send_op_cond(req),
            AppCmd::SpiSendOpCond => {
                self.set_state(CardState::Transfer);
                ResponseKind::R1
            }
            AppCmd::SendScr => {
                if self.state != CardState::Transfer {
                    return self.acmd_wrong_state(req);
                }
                self.start_sending(DataSource::Scr, 0, 8)
            }
            AppCmd::Security => {
                warn!("{}: security ACMD{} not implemented", self.proto.name, req.cmd);
                ResponseKind::Illegal
            }
            AppCmd::Unimplemented => {
                warn!("{}: ACMD{} not implemented", self.proto.name, req.cmd);
                ResponseKind::Illegal
            }
            // Fall back to standard commands
            AppCmd::Fallback => self.normal_command(req),
        }
    }

    fn acmd_sd_send_op_cond(&mut self, req: &SdRequest) -> ResponseKind {
        if self.state != CardState::Idle {
            return self.acmd_wrong_state(req);
        }

        // The first ACMD41 since reset decides how to power up. A real
        // request powers up at once; an enquiry (voltage window 0) only
        // starts the power-up delay so the host has to poll.
        if !self.ocr.is_powered_up() {
            if req.arg & Ocr::ACMD41_ENQUIRY_MASK != 0 {
                self.powerup_deadline = None;
                self.ocr_powerup();
            } else {
                trace!("{}: enquiry ACMD41", self.proto.name);
                self.arm_powerup_timer();
            }
        }

        if self.ocr.bits() & req.arg & Ocr::ACMD41_ENQUIRY_MASK != 0 {
            // We accept any voltage. Once powered up, a non-enquiry ACMD41
            // moves the card straight to ready.
            self.set_state(CardState::Ready);
        }
        ResponseKind::R3
    }

    fn acmd_wrong_state(&self, req: &SdRequest) -> ResponseKind {
        warn!(
            "{}: ACMD{} in a wrong state: {}",
            self.proto.name,
            req.cmd,
            self.state.name()
        );
        ResponseKind::Illegal
    }
}
