//! CMD42 LOCK_UNLOCK payload processing.

use bitflags::bitflags;
use log::{info, trace, warn};

use super::SdCard;
use super::info::CsdFlags;
use crate::common::CardStatus;
use crate::host::BlockStore;

bitflags! {
    /// First byte of the LOCK_UNLOCK data block.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LockFlags: u8 {
        const SET_PWD = 1 << 0;
        const CLR_PWD = 1 << 1;
        const LOCK_UNLOCK = 1 << 2;
        const ERASE = 1 << 3;
    }
}

impl<B: BlockStore> SdCard<B> {
    /// Applies the payload received by LOCK_UNLOCK. Failures only raise
    /// LOCK_UNLOCK_FAILED.
    pub(super) fn lock_command(&mut self) {
        let flags = LockFlags::from_bits_truncate(self.data[0]);
        let lock = flags.contains(LockFlags::LOCK_UNLOCK);
        let set_pwd = flags.contains(LockFlags::SET_PWD);
        let clr_pwd = flags.contains(LockFlags::CLR_PWD);
        let locked = self.status.contains(CardStatus::CARD_IS_LOCKED);
        let pwd_len = if self.blk_len > 1 { self.data[1] as usize } else { 0 };

        trace!("{}: {} {:?}", self.proto.name, if lock { "lock" } else { "unlock" }, flags);

        if flags.contains(LockFlags::ERASE) {
            if !locked
                || self.blk_len > 1
                || set_pwd
                || clr_pwd
                || lock
                || self.wp_switch
                || self.csd.flags().contains(CsdFlags::PERMANENT_WRITE_PROTECT)
            {
                warn!("{}: forced erase refused", self.proto.name);
                self.status.insert(CardStatus::LOCK_UNLOCK_FAILED);
                return;
            }
            self.clear_write_protect();
            self.csd.remove_flags(CsdFlags::TEMPORARY_WRITE_PROTECT);
            self.status.remove(CardStatus::CARD_IS_LOCKED);
            self.pwd_len = 0;
            info!("{}: card force-erased by LOCK_UNLOCK", self.proto.name);
            let size = self.partition_size();
            self.blk_fill(0, size, 0xff);
            return;
        }

        if (self.blk_len as usize) < 2 + pwd_len
            || pwd_len < self.pwd_len
            || pwd_len > self.pwd_len + 16
        {
            warn!("{}: malformed LOCK_UNLOCK payload", self.proto.name);
            self.status.insert(CardStatus::LOCK_UNLOCK_FAILED);
            return;
        }

        if self.pwd_len != 0 && self.pwd[..self.pwd_len] != self.data[2..2 + self.pwd_len] {
            warn!("{}: password mismatch", self.proto.name);
            self.status.insert(CardStatus::LOCK_UNLOCK_FAILED);
            return;
        }

        let new_len = pwd_len - self.pwd_len;
        if (new_len != 0 && !set_pwd)
            || (clr_pwd && (set_pwd || lock))
            || (lock && self.pwd_len == 0 && !set_pwd)
            || (!set_pwd && !clr_pwd && locked == lock)
        {
            warn!("{}: invalid LOCK_UNLOCK request {:?}", self.proto.name, flags);
            self.status.insert(CardStatus::LOCK_UNLOCK_FAILED);
            return;
        }

        if set_pwd {
            let old_len = self.pwd_len;
            self.pwd[..new_len].copy_from_slice(&self.data[2 + old_len..2 + old_len + new_len]);
            self.pwd_len = new_len;
        }
        if clr_pwd {
            self.pwd_len = 0;
        }

        if lock {
            self.status.insert(CardStatus::CARD_IS_LOCKED);
        } else {
            self.status.remove(CardStatus::CARD_IS_LOCKED);
        }
    }
}
