//! Per-variant command dispatch tables.
//!
//! Each protocol flavour owns a pair of 64-entry tables, one for regular
//! commands and one for application commands. The tables are built at
//! compile time and map an opcode to its class, transfer type and handler.

use crate::common::SDMMC_CMD_MAX;
use crate::config::CardVariant;

/// Transfer type of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmdType {
    /// Broadcast, no response.
    Bc,
    /// Broadcast with response.
    Bcr,
    /// Addressed, no data.
    Ac,
    /// Addressed, data transfer on DAT.
    Adtc,
    None,
}

impl CmdType {
    /// Addressed commands carry the RCA in argument bits 31:16.
    pub fn is_addressed(&self) -> bool {
        matches!(self, CmdType::Ac | CmdType::Adtc)
    }
}

/// Regular command handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdCmd {
    GoIdleState,
    SendOpCond,
    EmmcSendOpCond,
    AllSendCid,
    SendRelativeAddr,
    SetRelativeAddr,
    SetDsr,
    SleepAwake,
    SwitchFunction,
    EmmcSwitch,
    SelectCard,
    SendIfCond,
    SendExtCsd,
    SendCsd,
    SendCid,
    StopTransmission,
    SendStatus,
    BusTestRead,
    GoInactiveState,
    SetBlockLen,
    ReadSingleBlock,
    ReadMultipleBlock,
    SendTuningBlock,
    BusTestWrite,
    SetBlockCount,
    WriteBlock,
    WriteMultipleBlock,
    ProgramCid,
    ProgramCsd,
    SetWriteProt,
    ClrWriteProt,
    SendWriteProt,
    EraseStart,
    EraseEnd,
    Erase,
    GoIrqState,
    LockUnlock,
    AppCmd,
    GenCmd,
    ReadOcr,
    CrcOnOff,
    /// Not supported by this flavour.
    Illegal,
    /// Recognised but not modelled.
    Unimplemented,
    /// Not in the table at all.
    Unknown,
}

impl SdCmd {
    pub fn name(&self) -> &'static str {
        match self {
            SdCmd::GoIdleState => "GO_IDLE_STATE",
            SdCmd::SendOpCond | SdCmd::EmmcSendOpCond => "SEND_OP_COND",
            SdCmd::AllSendCid => "ALL_SEND_CID",
            SdCmd::SendRelativeAddr => "SEND_RELATIVE_ADDR",
            SdCmd::SetRelativeAddr => "SET_RELATIVE_ADDR",
            SdCmd::SetDsr => "SET_DSR",
            SdCmd::SleepAwake => "SLEEP_AWAKE",
            SdCmd::SwitchFunction => "SWITCH_FUNCTION",
            SdCmd::EmmcSwitch => "SWITCH",
            SdCmd::SelectCard => "SELECT/DESELECT_CARD",
            SdCmd::SendIfCond => "SEND_IF_COND",
            SdCmd::SendExtCsd => "SEND_EXT_CSD",
            SdCmd::SendCsd => "SEND_CSD",
            SdCmd::SendCid => "SEND_CID",
            SdCmd::StopTransmission => "STOP_TRANSMISSION",
            SdCmd::SendStatus => "SEND_STATUS",
            SdCmd::BusTestRead => "BUSTEST_R",
            SdCmd::GoInactiveState => "GO_INACTIVE_STATE",
            SdCmd::SetBlockLen => "SET_BLOCKLEN",
            SdCmd::ReadSingleBlock => "READ_SINGLE_BLOCK",
            SdCmd::ReadMultipleBlock => "READ_MULTIPLE_BLOCK",
            SdCmd::SendTuningBlock => "SEND_TUNING_BLOCK",
            SdCmd::BusTestWrite => "BUSTEST_W",
            SdCmd::SetBlockCount => "SET_BLOCK_COUNT",
            SdCmd::WriteBlock => "WRITE_SINGLE_BLOCK",
            SdCmd::WriteMultipleBlock => "WRITE_MULTIPLE_BLOCK",
            SdCmd::ProgramCid => "PROGRAM_CID",
            SdCmd::ProgramCsd => "PROGRAM_CSD",
            SdCmd::SetWriteProt => "SET_WRITE_PROT",
            SdCmd::ClrWriteProt => "CLR_WRITE_PROT",
            SdCmd::SendWriteProt => "SEND_WRITE_PROT",
            SdCmd::EraseStart => "ERASE_WR_BLK_START",
            SdCmd::EraseEnd => "ERASE_WR_BLK_END",
            SdCmd::Erase => "ERASE",
            SdCmd::GoIrqState => "GO_IRQ_STATE",
            SdCmd::LockUnlock => "LOCK_UNLOCK",
            SdCmd::AppCmd => "APP_CMD",
            SdCmd::GenCmd => "GEN_CMD",
            SdCmd::ReadOcr => "READ_OCR",
            SdCmd::CrcOnOff => "CRC_ON_OFF",
            SdCmd::Illegal | SdCmd::Unimplemented | SdCmd::Unknown => "UNKNOWN_CMD",
        }
    }
}

/// Application command handlers, reached after APP_CMD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCmd {
    SetBusWidth,
    SdStatus,
    SendNumWrBlocks,
    SetWrBlkEraseCount,
    SdSendOpCond,
    /// SPI flavour of ACMD41: no power-up negotiation.
    SpiSendOpCond,
    SetClrCardDetect,
    SendScr,
    /// Reserved for the security specification.
    Security,
    Unimplemented,
    /// No ACMD with this index; run it as a regular command.
    Fallback,
}

impl AppCmd {
    pub fn name(&self) -> &'static str {
        match self {
            AppCmd::SetBusWidth => "SET_BUS_WIDTH",
            AppCmd::SdStatus => "SD_STATUS",
            AppCmd::SendNumWrBlocks => "SEND_NUM_WR_BLOCKS",
            AppCmd::SetWrBlkEraseCount => "SET_WR_BLK_ERASE_COUNT",
            AppCmd::SdSendOpCond | AppCmd::SpiSendOpCond => "SD_APP_OP_COND",
            AppCmd::SetClrCardDetect => "SET_CLR_CARD_DETECT",
            AppCmd::SendScr => "SEND_SCR",
            AppCmd::Security => "SECURITY",
            AppCmd::Unimplemented | AppCmd::Fallback => "UNKNOWN_ACMD",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CmdEntry {
    pub class: u8,
    pub kind: CmdType,
    pub cmd: SdCmd,
}

impl CmdEntry {
    const fn new(class: u8, kind: CmdType, cmd: SdCmd) -> Self {
        Self { class, kind, cmd }
    }
}

/// One protocol flavour.
#[derive(Debug)]
pub struct Proto {
    pub name: &'static str,
    pub cmd: [CmdEntry; SDMMC_CMD_MAX],
    pub acmd: [AppCmd; SDMMC_CMD_MAX],
}

impl Proto {
    pub fn for_variant(variant: CardVariant) -> &'static Proto {
        match variant {
            CardVariant::Sd => &SD_PROTO,
            CardVariant::Spi => &SPI_PROTO,
            CardVariant::Emmc => &EMMC_PROTO,
        }
    }

    pub fn entry(&self, index: u8) -> CmdEntry {
        self.cmd[(index & 0x3f) as usize]
    }

    pub fn app(&self, index: u8) -> AppCmd {
        self.acmd[(index & 0x3f) as usize]
    }
}

use CmdType::*;

const CMD_TYPE: [CmdType; SDMMC_CMD_MAX] = [
    Bc, None, Bcr, Bcr, None, None, None, Ac, //
    Bcr, Ac, Ac, Adtc, Ac, Ac, None, Ac, //
    /* 16 */
    Ac, Adtc, Adtc, None, None, None, None, None, //
    Adtc, Adtc, Adtc, Adtc, Ac, Ac, Adtc, None, //
    /* 32 */
    Ac, Ac, None, None, None, None, Ac, None, //
    None, None, Bc, None, None, None, None, None, //
    /* 48 */
    None, None, None, None, None, None, None, Ac, //
    Adtc, None, None, None, None, None, None, None, //
];

const CMD_CLASS: [u8; SDMMC_CMD_MAX] = [
    0, 0, 0, 0, 0, 9, 10, 0, 0, 0, 0, 1, 0, 0, 0, 0, //
    2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 6, 6, 6, 6, //
    5, 5, 10, 10, 10, 10, 5, 9, 9, 9, 7, 7, 7, 7, 7, 7, //
    7, 7, 10, 7, 9, 9, 9, 8, 8, 10, 8, 8, 8, 8, 8, 8, //
];

/// Entries shared by every flavour; the per-flavour builders patch it.
const fn base_table() -> [CmdEntry; SDMMC_CMD_MAX] {
    let mut table = [CmdEntry::new(0, None, SdCmd::Unknown); SDMMC_CMD_MAX];
    let mut i = 0;
    while i < SDMMC_CMD_MAX {
        table[i] = CmdEntry::new(CMD_CLASS[i], CMD_TYPE[i], SdCmd::Unknown);
        i += 1;
    }

    table[0].cmd = SdCmd::GoIdleState;
    table[2].cmd = SdCmd::AllSendCid;
    table[3].cmd = SdCmd::SendRelativeAddr;
    table[4].cmd = SdCmd::SetDsr;
    table[6].cmd = SdCmd::SwitchFunction;
    table[7].cmd = SdCmd::SelectCard;
    table[8].cmd = SdCmd::SendIfCond;
    table[9].cmd = SdCmd::SendCsd;
    table[10].cmd = SdCmd::SendCid;
    table[12].cmd = SdCmd::StopTransmission;
    table[13].cmd = SdCmd::SendStatus;
    table[15].cmd = SdCmd::GoInactiveState;
    table[16].cmd = SdCmd::SetBlockLen;
    table[17].cmd = SdCmd::ReadSingleBlock;
    table[18].cmd = SdCmd::ReadMultipleBlock;
    table[24].cmd = SdCmd::WriteBlock;
    table[25].cmd = SdCmd::WriteMultipleBlock;
    table[26].cmd = SdCmd::ProgramCid;
    table[27].cmd = SdCmd::ProgramCsd;
    table[28].cmd = SdCmd::SetWriteProt;
    table[29].cmd = SdCmd::ClrWriteProt;
    table[30].cmd = SdCmd::SendWriteProt;
    table[32].cmd = SdCmd::EraseStart;
    table[33].cmd = SdCmd::EraseEnd;
    table[38].cmd = SdCmd::Erase;
    table[42].cmd = SdCmd::LockUnlock;
    table[55].cmd = SdCmd::AppCmd;
    table[56].cmd = SdCmd::GenCmd;
    table[58].cmd = SdCmd::ReadOcr;
    table[59].cmd = SdCmd::CrcOnOff;
    table
}

const fn sd_table() -> [CmdEntry; SDMMC_CMD_MAX] {
    let mut table = base_table();
    table[1].cmd = SdCmd::Illegal;
    table[5].cmd = SdCmd::Illegal;
    table[19].cmd = SdCmd::SendTuningBlock;
    table[23].cmd = SdCmd::SetBlockCount;
    table[52].cmd = SdCmd::Illegal;
    table[53].cmd = SdCmd::Illegal;
    table[54].cmd = SdCmd::Illegal;
    table[58].cmd = SdCmd::Illegal;
    table[59].cmd = SdCmd::Illegal;
    table
}

const fn spi_table() -> [CmdEntry; SDMMC_CMD_MAX] {
    let mut table = base_table();
    table[1].cmd = SdCmd::SendOpCond;
    table[2].cmd = SdCmd::Illegal;
    table[3].cmd = SdCmd::Illegal;
    table[4].cmd = SdCmd::Illegal;
    table[5].cmd = SdCmd::Illegal;
    table[7].cmd = SdCmd::Illegal;
    table[15].cmd = SdCmd::Illegal;
    table[26].cmd = SdCmd::Illegal;
    table[52].cmd = SdCmd::Illegal;
    table[53].cmd = SdCmd::Illegal;
    table[54].cmd = SdCmd::Illegal;
    table
}

const fn emmc_table() -> [CmdEntry; SDMMC_CMD_MAX] {
    let mut table = base_table();
    table[1] = CmdEntry::new(0, Bcr, SdCmd::EmmcSendOpCond);
    table[3] = CmdEntry::new(0, Ac, SdCmd::SetRelativeAddr);
    table[5] = CmdEntry::new(0, Ac, SdCmd::SleepAwake);
    table[6] = CmdEntry::new(0, Ac, SdCmd::EmmcSwitch);
    table[8] = CmdEntry::new(0, Adtc, SdCmd::SendExtCsd);
    table[14] = CmdEntry::new(0, Adtc, SdCmd::BusTestRead);
    table[19] = CmdEntry::new(0, Adtc, SdCmd::BusTestWrite);
    table[23].cmd = SdCmd::SetBlockCount;
    table[35] = CmdEntry::new(5, Ac, SdCmd::EraseStart);
    table[36] = CmdEntry::new(5, Ac, SdCmd::EraseEnd);
    table[40] = CmdEntry::new(9, Bcr, SdCmd::GoIrqState);
    table[52].cmd = SdCmd::Illegal;
    table[53].cmd = SdCmd::Illegal;
    table[54].cmd = SdCmd::Illegal;
    table[58].cmd = SdCmd::Illegal;
    table[59].cmd = SdCmd::Illegal;
    table
}

const fn sd_app_table() -> [AppCmd; SDMMC_CMD_MAX] {
    let mut table = [AppCmd::Fallback; SDMMC_CMD_MAX];
    table[6] = AppCmd::SetBusWidth;
    table[13] = AppCmd::SdStatus;
    table[22] = AppCmd::SendNumWrBlocks;
    table[23] = AppCmd::SetWrBlkEraseCount;
    table[41] = AppCmd::SdSendOpCond;
    table[42] = AppCmd::SetClrCardDetect;
    table[51] = AppCmd::SendScr;
    table[18] = AppCmd::Security;
    table[25] = AppCmd::Security;
    table[26] = AppCmd::Security;
    table[38] = AppCmd::Security;
    let mut i = 43;
    while i <= 49 {
        table[i] = AppCmd::Security;
        i += 1;
    }
    table
}

const fn spi_app_table() -> [AppCmd; SDMMC_CMD_MAX] {
    let mut table = sd_app_table();
    table[6] = AppCmd::Unimplemented;
    table[41] = AppCmd::SpiSendOpCond;
    table
}

pub static SD_PROTO: Proto = Proto { name: "SD", cmd: sd_table(), acmd: sd_app_table() };

pub static SPI_PROTO: Proto = Proto { name: "SPI", cmd: spi_table(), acmd: spi_app_table() };

// MMC has no application commands
pub static EMMC_PROTO: Proto =
    Proto { name: "eMMC", cmd: emmc_table(), acmd: [AppCmd::Fallback; SDMMC_CMD_MAX] };
