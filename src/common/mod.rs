pub mod commands;

use bitflags::bitflags;

/// Standard-capacity cards top out at 2 GiB; anything larger is SDHC/SDXC
/// and uses block addressing.
pub const SDSC_MAX_CAPACITY: u64 = 2 * 1024 * 1024 * 1024;

pub const HWBLOCK_SHIFT: u32 = 9; /* 512 bytes */
pub const SECTOR_SHIFT: u32 = 5; /* 16 kilobytes */
pub const WPGROUP_SHIFT: u32 = 7; /* 2 megs */
pub const CMULT_SHIFT: u32 = 9; /* 512 times HWBLOCK_SIZE */
pub const HWBLOCK_SIZE: u32 = 1 << HWBLOCK_SHIFT;
pub const WPGROUP_SIZE: u64 = 1 << (HWBLOCK_SHIFT + SECTOR_SHIFT + WPGROUP_SHIFT);

pub const INVALID_ADDRESS: u32 = u32::MAX;

/// Number of command opcodes (6-bit index).
pub const SDMMC_CMD_MAX: usize = 64;

// Commands shared by all variants
pub const SD_GO_IDLE_STATE: u8 = 0;
pub const SD_SEND_OP_COND: u8 = 1;
pub const SD_ALL_SEND_CID: u8 = 2;
pub const SD_SEND_RELATIVE_ADDR: u8 = 3;
pub const SD_SET_DSR: u8 = 4;
pub const SD_SLEEP_AWAKE: u8 = 5;
pub const SD_SWITCH: u8 = 6;
pub const SD_SELECT_CARD: u8 = 7;
pub const SD_SEND_IF_COND: u8 = 8;
pub const SD_SEND_CSD: u8 = 9;
pub const SD_SEND_CID: u8 = 10;
pub const SD_STOP_TRANSMISSION: u8 = 12;
pub const SD_SEND_STATUS: u8 = 13;
pub const SD_BUSTEST_R: u8 = 14;
pub const SD_GO_INACTIVE_STATE: u8 = 15;
pub const SD_SET_BLOCKLEN: u8 = 16;
pub const SD_READ_SINGLE_BLOCK: u8 = 17;
pub const SD_READ_MULTIPLE_BLOCK: u8 = 18;
pub const SD_SEND_TUNING_BLOCK: u8 = 19;
pub const SD_SET_BLOCK_COUNT: u8 = 23;
pub const SD_WRITE_BLOCK: u8 = 24;
pub const SD_WRITE_MULTIPLE_BLOCK: u8 = 25;
pub const SD_PROGRAM_CID: u8 = 26;
pub const SD_PROGRAM_CSD: u8 = 27;
pub const SD_SET_WRITE_PROT: u8 = 28;
pub const SD_CLR_WRITE_PROT: u8 = 29;
pub const SD_SEND_WRITE_PROT: u8 = 30;
pub const SD_ERASE_WR_BLK_START: u8 = 32;
pub const SD_ERASE_WR_BLK_END: u8 = 33;
pub const MMC_ERASE_GROUP_START: u8 = 35;
pub const MMC_ERASE_GROUP_END: u8 = 36;
pub const SD_ERASE: u8 = 38;
pub const MMC_GO_IRQ_STATE: u8 = 40;
pub const SD_LOCK_UNLOCK: u8 = 42;
pub const SD_APP_CMD: u8 = 55;
pub const SD_GEN_CMD: u8 = 56;
pub const SD_SPI_READ_OCR: u8 = 58;
pub const SD_SPI_CRC_ON_OFF: u8 = 59;

// Application specific commands
pub const SD_ACMD_SET_BUS_WIDTH: u8 = 6;
pub const SD_ACMD_SD_STATUS: u8 = 13;
pub const SD_ACMD_SEND_NUM_WR_BLOCKS: u8 = 22;
pub const SD_ACMD_SET_WR_BLK_ERASE_COUNT: u8 = 23;
pub const SD_ACMD_SD_SEND_OP_COND: u8 = 41;
pub const SD_ACMD_SET_CLR_CARD_DETECT: u8 = 42;
pub const SD_ACMD_SEND_SCR: u8 = 51;

bitflags! {
    /// Card status register returned in R1 responses.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CardStatus: u32 {
        const AKE_SEQ_ERROR = 1 << 3;
        const APP_CMD = 1 << 5;
        const FX_EVENT = 1 << 6;
        const SWITCH_ERROR = 1 << 7;
        const READY_FOR_DATA = 1 << 8;
        const CURRENT_STATE = 0xf << 9;
        const ERASE_RESET = 1 << 13;
        const CARD_ECC_DISABLED = 1 << 14;
        const WP_ERASE_SKIP = 1 << 15;
        const CID_CSD_OVERWRITE = 1 << 16;
        const DEFERRED_RESPONSE = 1 << 17;
        const ERROR = 1 << 19;
        const CC_ERROR = 1 << 20;
        const CARD_ECC_FAILED = 1 << 21;
        const ILLEGAL_COMMAND = 1 << 22;
        const COM_CRC_ERROR = 1 << 23;
        const LOCK_UNLOCK_FAILED = 1 << 24;
        const CARD_IS_LOCKED = 1 << 25;
        const WP_VIOLATION = 1 << 26;
        const ERASE_PARAM = 1 << 27;
        const ERASE_SEQ_ERROR = 1 << 28;
        const BLOCK_LEN_ERROR = 1 << 29;
        const ADDRESS_ERROR = 1 << 30;
        const OUT_OF_RANGE = 1 << 31;
    }
}

impl CardStatus {
    /// Status after reset: only READY_FOR_DATA.
    pub const RESET: CardStatus = CardStatus::READY_FOR_DATA;

    /// Class A: follows the card's current state, never cleared by a response.
    pub const CLEAR_BY_STATE: CardStatus = CardStatus::from_bits_retain(
        CardStatus::READY_FOR_DATA.bits()
            | CardStatus::CARD_ECC_DISABLED.bits()
            | CardStatus::CARD_IS_LOCKED.bits(),
    );

    /// Class B: describes the previous command, cleared once any valid
    /// command has been answered.
    pub const CLEAR_BY_COMMAND: CardStatus = CardStatus::from_bits_retain(
        CardStatus::CURRENT_STATE.bits()
            | CardStatus::ILLEGAL_COMMAND.bits()
            | CardStatus::COM_CRC_ERROR.bits(),
    );

    /// Class C: latched until read out by a status-bearing response.
    pub const CLEAR_BY_READ: CardStatus = CardStatus::from_bits_retain(
        CardStatus::AKE_SEQ_ERROR.bits()
            | CardStatus::APP_CMD.bits()
            | CardStatus::ERASE_RESET.bits()
            | CardStatus::WP_ERASE_SKIP.bits()
            | CardStatus::CID_CSD_OVERWRITE.bits()
            | CardStatus::ERROR.bits()
            | CardStatus::CC_ERROR.bits()
            | CardStatus::CARD_ECC_FAILED.bits()
            | CardStatus::LOCK_UNLOCK_FAILED.bits()
            | CardStatus::WP_VIOLATION.bits()
            | CardStatus::ERASE_PARAM.bits()
            | CardStatus::ERASE_SEQ_ERROR.bits()
            | CardStatus::BLOCK_LEN_ERROR.bits()
            | CardStatus::ADDRESS_ERROR.bits()
            | CardStatus::OUT_OF_RANGE.bits(),
    );

    /// Value of the CURRENT_STATE field.
    pub fn current_state(&self) -> u32 {
        (self.bits() & CardStatus::CURRENT_STATE.bits()) >> 9
    }

    pub fn set_current_state(&mut self, state: u32) {
        *self = CardStatus::from_bits_retain(
            (self.bits() & !CardStatus::CURRENT_STATE.bits()) | ((state & 0xf) << 9),
        );
    }
}

bitflags! {
    /// Operating conditions register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Ocr: u32 {
        const VDD_VOLTAGE_WIN_LO = 0x0000_00ff;
        const DUAL_VOLTAGE_CARD = 1 << 7;
        const VDD_VOLTAGE_WIN_HI = 0x00ff_ff00;
        const ACCEPT_SWITCH_1V8 = 1 << 24;
        const UHS_II_CARD = 1 << 29;
        const CARD_CAPACITY = 1 << 30;
        const CARD_POWER_UP = 1 << 31;
    }
}

impl Ocr {
    /// Bits 23:0; an ACMD41 whose argument has none of them set is an enquiry.
    pub const ACMD41_ENQUIRY_MASK: u32 = 0x00ff_ffff;

    /// Fields visible in an R3 response.
    pub const R3_MASK: Ocr = Ocr::from_bits_retain(
        Ocr::VDD_VOLTAGE_WIN_HI.bits()
            | Ocr::ACCEPT_SWITCH_1V8.bits()
            | Ocr::UHS_II_CARD.bits()
            | Ocr::CARD_CAPACITY.bits()
            | Ocr::CARD_POWER_UP.bits(),
    );

    pub fn is_powered_up(&self) -> bool {
        self.contains(Ocr::CARD_POWER_UP)
    }

    pub fn is_high_capacity(&self) -> bool {
        self.contains(Ocr::CARD_CAPACITY)
    }
}
