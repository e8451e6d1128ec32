mod acmd;
mod block;
mod cmd;
pub mod info;
mod lock;
pub mod proto;
pub mod rca;

extern crate alloc;
use alloc::boxed::Box;

use log::{debug, info, warn};

use crate::common::{CardStatus, INVALID_ADDRESS, Ocr, SDSC_MAX_CAPACITY};
use crate::config::{CardConfig, CardVariant};
use crate::err::{CardError, CardResult};
use crate::host::BlockStore;

use block::{DataPhase, WpGroups};
use info::{Cid, Csd, ExtCsd, Partition, Scr, SdStatus};
use proto::Proto;
use rca::{RcaSource, SequentialRca};

/// Time the card needs to finish its power-up sequence after the first
/// enquiry ACMD41.
pub const OCR_POWER_DELAY_NS: u64 = 500_000;

/// One 48-bit command frame at the 400 kHz identification clock.
pub const CMD_FRAME_NS: u64 = 120_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardState {
    WaitIrq = -2,
    Inactive = -1,
    Idle = 0,
    Ready = 1,
    Identification = 2,
    Standby = 3,
    Transfer = 4,
    SendingData = 5,
    ReceivingData = 6,
    Programming = 7,
    Disconnect = 8,
    BusTest = 9,
    Sleep = 10,
    Io = 15,
}

impl CardState {
    pub fn name(&self) -> &'static str {
        match self {
            CardState::WaitIrq => "wait-irq",
            CardState::Inactive => "inactive",
            CardState::Idle => "idle",
            CardState::Ready => "ready",
            CardState::Identification => "identification",
            CardState::Standby => "standby",
            CardState::Transfer => "transfer",
            CardState::SendingData => "sendingdata",
            CardState::ReceivingData => "receivingdata",
            CardState::Programming => "programming",
            CardState::Disconnect => "disconnect",
            CardState::BusTest => "bus-test",
            CardState::Sleep => "sleep",
            CardState::Io => "i/o",
        }
    }

    pub fn mode(&self) -> CardMode {
        match self {
            CardState::Inactive | CardState::WaitIrq | CardState::Io => CardMode::Inactive,
            CardState::Idle | CardState::Ready | CardState::Identification => {
                CardMode::Identification
            }
            _ => CardMode::DataTransfer,
        }
    }

    /// Encoding in the CURRENT_STATE status field; states without one
    /// report 0.
    pub fn status_code(&self) -> u32 {
        match self {
            CardState::Inactive | CardState::WaitIrq => 0,
            other => *other as i32 as u32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardMode {
    Inactive,
    Identification,
    DataTransfer,
}

/// Card-detect and write-protect levels the host latches on a media change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaState {
    pub inserted: bool,
    pub readonly: bool,
}

/// An SD, SPI-mode SD or eMMC card.
pub struct SdCard<B: BlockStore> {
    config: CardConfig,
    proto: &'static Proto,
    store: Option<B>,
    rca_source: Box<dyn RcaSource + Send>,

    // registers
    ocr: Ocr,
    scr: Scr,
    cid: Cid,
    csd: Csd,
    ext_csd: ExtCsd,
    rca: u16,
    status: CardStatus,
    sd_status: SdStatus,

    state: CardState,
    vhs: u32,
    wp_switch: bool,
    wp_groups: WpGroups,
    /// User area in bytes.
    size: u64,
    blk_len: u32,
    multi_blk_cnt: u32,
    erase_start: u32,
    erase_end: u32,
    pwd: [u8; 16],
    pwd_len: usize,
    function_group: [u8; 6],
    /// Next command is an ACMD. Not the same thing as the APP_CMD status bit.
    expecting_acmd: bool,
    blk_written: u32,
    data: [u8; 512],
    phase: DataPhase,

    enabled: bool,
    dat_lines: u8,
    cmd_line: bool,
    clock_ns: u64,
    powerup_deadline: Option<u64>,
}

impl<B: BlockStore> SdCard<B> {
    /// Builds a card with the sequential RCA generator.
    pub fn new(config: CardConfig, store: Option<B>) -> CardResult<Self> {
        Self::with_rca_source(config, store, SequentialRca)
    }

    pub fn with_rca_source(
        config: CardConfig,
        store: Option<B>,
        rca_source: impl RcaSource + Send + 'static,
    ) -> CardResult<Self> {
        config.validate()?;
        if let Some(store) = &store {
            Self::check_medium(&config, store)?;
        }

        let mut card = Self {
            proto: Proto::for_variant(config.variant()),
            config,
            store,
            rca_source: Box::new(rca_source),
            ocr: Ocr::empty(),
            scr: Scr::new(crate::config::SpecVersion::V2_00),
            cid: Cid::sd(),
            csd: Csd::sd(0),
            ext_csd: ExtCsd::new(),
            rca: 0,
            status: CardStatus::RESET,
            sd_status: SdStatus::new(),
            state: CardState::Idle,
            vhs: 0,
            wp_switch: false,
            wp_groups: WpGroups::new(1),
            size: 0,
            blk_len: 512,
            multi_blk_cnt: 0,
            erase_start: INVALID_ADDRESS,
            erase_end: INVALID_ADDRESS,
            pwd: [0; 16],
            pwd_len: 0,
            function_group: [0; 6],
            expecting_acmd: false,
            blk_written: 0,
            data: [0; 512],
            phase: DataPhase::Idle,
            enabled: true,
            dat_lines: 0xf,
            cmd_line: true,
            clock_ns: 0,
            powerup_deadline: None,
        };
        card.reset();
        Ok(card)
    }

    /// Checks the medium geometry and returns the user area size.
    fn check_medium(config: &CardConfig, store: &B) -> CardResult<u64> {
        let boot_area = 2 * config.boot_partition_size();
        let total = store.size();
        if total < boot_area {
            return Err(CardError::MediumTooSmall);
        }
        let size = total - boot_area;
        if size > 0 && !size.is_power_of_two() {
            return Err(CardError::SizeNotPowerOfTwo(size));
        }
        Ok(size)
    }

    /// Power-on reset: recomputes every register from the medium geometry
    /// and drops all transient state.
    pub fn reset(&mut self) {
        let total = self.store.as_ref().map_or(0, |s| s.size());
        let size = total.saturating_sub(2 * self.config.boot_partition_size());

        self.state = CardState::Idle;
        self.rca = 0x0000;
        self.size = size;
        self.powerup_deadline = None;
        self.set_ocr();
        self.scr = Scr::new(self.config.spec_version());
        match self.config.variant() {
            CardVariant::Emmc => {
                self.cid = Cid::emmc();
                self.csd = Csd::emmc(size);
                self.ext_csd = ExtCsd::emmc(
                    size,
                    self.config.boot_partition_size(),
                    self.config.boot_config(),
                );
            }
            CardVariant::Sd | CardVariant::Spi => {
                self.cid = Cid::sd();
                self.csd = Csd::sd(size);
                self.ext_csd = ExtCsd::new();
            }
        }
        self.status = CardStatus::RESET;
        self.sd_status = SdStatus::new();

        self.wp_switch = self.store.as_ref().is_some_and(|s| !s.is_writable());
        self.wp_groups = WpGroups::new(block::wp_group_of(size) + 1);
        self.function_group = [0; 6];
        self.erase_start = INVALID_ADDRESS;
        self.erase_end = INVALID_ADDRESS;
        self.blk_len = 0x200;
        self.pwd_len = 0;
        self.expecting_acmd = false;
        self.dat_lines = 0xf;
        self.cmd_line = true;
        self.multi_blk_cnt = 0;
        self.blk_written = 0;
        self.vhs = 0;
        self.phase = DataPhase::Idle;

        info!(
            "{} card reset: {} bytes, spec {}",
            self.proto.name,
            size,
            self.config.spec_version().as_str()
        );
    }

    fn set_ocr(&mut self) {
        // All voltages OK
        self.ocr = Ocr::VDD_VOLTAGE_WIN_HI;
        if self.config.variant() == CardVariant::Emmc {
            self.ocr |= Ocr::DUAL_VOLTAGE_CARD;
        }
        if self.config.variant() == CardVariant::Spi {
            // SPI mode has no power-up sequence to model
            self.ocr_powerup();
        }
    }

    fn ocr_powerup(&mut self) {
        if self.ocr.is_powered_up() {
            return;
        }
        self.ocr |= Ocr::CARD_POWER_UP;
        if self.size > SDSC_MAX_CAPACITY {
            self.ocr |= Ocr::CARD_CAPACITY;
        }
        info!("{} card powered up", self.proto.name);
    }

    /// Moves the card's virtual clock forward and fires any due timer.
    pub fn advance_clock(&mut self, ns: u64) {
        self.clock_ns = self.clock_ns.saturating_add(ns);
        if let Some(deadline) = self.powerup_deadline {
            if self.clock_ns >= deadline {
                self.powerup_deadline = None;
                self.ocr_powerup();
            }
        }
    }

    pub fn now_ns(&self) -> u64 {
        self.clock_ns
    }

    fn arm_powerup_timer(&mut self) {
        if self.powerup_deadline.is_none() {
            self.powerup_deadline = Some(self.clock_ns.saturating_add(OCR_POWER_DELAY_NS));
            debug!("power-up timer armed for {} ns", OCR_POWER_DELAY_NS);
        }
    }

    fn set_state(&mut self, state: CardState) {
        if self.state != state {
            debug!("{}: {} -> {}", self.proto.name, self.state.name(), state.name());
            self.state = state;
        }
    }

    fn is_high_capacity(&self) -> bool {
        self.ocr.is_high_capacity()
    }

    fn is_spi(&self) -> bool {
        self.config.variant() == CardVariant::Spi
    }

    fn is_emmc(&self) -> bool {
        self.config.variant() == CardVariant::Emmc
    }

    /// Card reacts to the bus: medium present and chip enabled.
    fn is_present(&self) -> bool {
        self.enabled && self.is_inserted()
    }

    /// Byte offset of the selected eMMC partition inside the medium.
    fn partition_offset(&self) -> u64 {
        let boot_size = self.config.boot_partition_size();
        if !self.is_emmc() || boot_size == 0 {
            return 0;
        }
        match self.ext_csd.partition() {
            Partition::User => 2 * boot_size,
            Partition::Boot1 => 0,
            Partition::Boot2 => boot_size,
        }
    }

    /// Size of the area addressed by data commands.
    fn partition_size(&self) -> u64 {
        if !self.is_emmc() || self.config.boot_partition_size() == 0 {
            return self.size;
        }
        match self.ext_csd.partition() {
            Partition::User => self.size,
            Partition::Boot1 | Partition::Boot2 => self.config.boot_partition_size(),
        }
    }

    /// Chip select. A disabled card ignores the bus entirely.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_voltage(&mut self, millivolts: u16) {
        match millivolts {
            2001..=3600 => debug!("SD card voltage: {} mV", millivolts),
            _ => warn!(
                "SD card voltage not supported: {}.{:03}V",
                millivolts / 1000,
                millivolts % 1000
            ),
        }
    }

    pub fn dat_lines(&self) -> u8 {
        if self.enabled { self.dat_lines } else { 0 }
    }

    pub fn cmd_line(&self) -> bool {
        self.enabled && self.cmd_line
    }

    pub fn is_inserted(&self) -> bool {
        self.store.as_ref().is_some_and(|s| s.is_inserted())
    }

    pub fn is_readonly(&self) -> bool {
        self.wp_switch
    }

    /// Card has data for the host.
    pub fn data_ready(&self) -> bool {
        self.state == CardState::SendingData
    }

    /// Card expects data from the host.
    pub fn receive_ready(&self) -> bool {
        self.state == CardState::ReceivingData
            || (self.state == CardState::BusTest && matches!(self.phase, DataPhase::Receiving { .. }))
    }

    /// Swaps the medium. Inserting a medium resets the card.
    pub fn change_media(&mut self, store: Option<B>) -> CardResult<MediaState> {
        if let Some(store) = &store {
            Self::check_medium(&self.config, store)?;
        }
        self.store = store;

        let inserted = self.is_inserted();
        if inserted {
            self.reset();
            info!("{} card inserted, readonly={}", self.proto.name, self.wp_switch);
        } else {
            info!("{} card ejected", self.proto.name);
        }
        Ok(MediaState { inserted, readonly: self.is_readonly() })
    }

    pub fn config(&self) -> &CardConfig {
        &self.config
    }

    pub fn protocol_name(&self) -> &'static str {
        self.proto.name
    }

    pub fn state(&self) -> CardState {
        self.state
    }

    pub fn mode(&self) -> CardMode {
        self.state.mode()
    }

    pub fn status(&self) -> CardStatus {
        self.status
    }

    pub fn ocr(&self) -> Ocr {
        self.ocr
    }

    pub fn rca(&self) -> u16 {
        self.rca
    }

    pub fn cid(&self) -> &Cid {
        &self.cid
    }

    pub fn csd(&self) -> &Csd {
        &self.csd
    }

    pub fn scr(&self) -> &Scr {
        &self.scr
    }

    pub fn ext_csd(&self) -> &ExtCsd {
        &self.ext_csd
    }

    pub fn sd_status(&self) -> &SdStatus {
        &self.sd_status
    }

    pub fn blk_len(&self) -> u32 {
        self.blk_len
    }

    /// Current function selected in each CMD6 group.
    pub fn function_group(&self) -> [u8; 6] {
        self.function_group
    }

    /// User area size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn store(&self) -> Option<&B> {
        self.store.as_ref()
    }

    pub fn store_mut(&mut self) -> Option<&mut B> {
        self.store.as_mut()
    }
}
