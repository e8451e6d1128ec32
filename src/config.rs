use core::str::FromStr;

use crate::err::{CardError, CardResult};

/// Boot partition sizes are expressed in EXT_CSD BOOT_SIZE_MULT units.
pub const BOOT_PARTITION_UNIT: u64 = 128 * 1024;

/// Protocol flavour spoken by the card; selects the command dispatch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardVariant {
    /// Removable card on the native SD bus.
    Sd,
    /// SD card driven through its SPI mode.
    Spi,
    /// Soldered embedded MMC device.
    Emmc,
}

/// Physical layer specification version the card claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SpecVersion {
    V1_10 = 1,
    V2_00 = 2,
    V3_01 = 3,
}

impl SpecVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpecVersion::V1_10 => "v1.10",
            SpecVersion::V2_00 => "v2.00",
            SpecVersion::V3_01 => "v3.01",
        }
    }
}

impl FromStr for SpecVersion {
    type Err = CardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.strip_prefix(['v', 'V']).unwrap_or(s);
        match s {
            "1.10" | "1" => Ok(SpecVersion::V1_10),
            "2.00" | "2" => Ok(SpecVersion::V2_00),
            "3.01" | "3" => Ok(SpecVersion::V3_01),
            _ => Err(CardError::InvalidSpecVersion),
        }
    }
}

/// What to do with the CRC7 trailer of inbound command frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrcPolicy {
    /// Compute it, log mismatches, accept the frame anyway.
    #[default]
    Ignore,
    /// Reject mismatching frames with COM_CRC_ERROR.
    Enforce,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardConfig {
    variant: CardVariant,
    spec_version: SpecVersion,
    boot_partition_size: u64,
    boot_config: u8,
    crc_policy: CrcPolicy,
}

impl CardConfig {
    pub fn new(variant: CardVariant) -> Self {
        Self {
            variant,
            spec_version: SpecVersion::V2_00,
            boot_partition_size: 0,
            boot_config: 0,
            crc_policy: CrcPolicy::Ignore,
        }
    }

    pub fn sd() -> Self {
        Self::new(CardVariant::Sd)
    }

    pub fn spi() -> Self {
        Self::new(CardVariant::Spi)
    }

    pub fn emmc() -> Self {
        Self::new(CardVariant::Emmc)
    }

    pub fn with_spec_version(mut self, version: SpecVersion) -> Self {
        self.spec_version = version;
        self
    }

    pub fn with_boot_partition_size(mut self, size: u64) -> Self {
        self.boot_partition_size = size;
        self
    }

    pub fn with_boot_config(mut self, config: u8) -> Self {
        self.boot_config = config;
        self
    }

    pub fn with_crc_policy(mut self, policy: CrcPolicy) -> Self {
        self.crc_policy = policy;
        self
    }

    pub fn variant(&self) -> CardVariant {
        self.variant
    }

    pub fn spec_version(&self) -> SpecVersion {
        self.spec_version
    }

    pub fn boot_partition_size(&self) -> u64 {
        self.boot_partition_size
    }

    pub fn boot_config(&self) -> u8 {
        self.boot_config
    }

    pub fn crc_policy(&self) -> CrcPolicy {
        self.crc_policy
    }

    /// Checks the options that do not depend on the medium.
    pub fn validate(&self) -> CardResult {
        if self.variant != CardVariant::Emmc
            && (self.boot_partition_size != 0 || self.boot_config != 0)
        {
            return Err(CardError::BootPartitionsUnsupported);
        }
        if self.boot_partition_size % BOOT_PARTITION_UNIT != 0
            || self.boot_partition_size / BOOT_PARTITION_UNIT > u8::MAX as u64
        {
            return Err(CardError::InvalidBootPartitionSize(self.boot_partition_size));
        }
        Ok(())
    }
}

impl Default for CardConfig {
    fn default() -> Self {
        Self::sd()
    }
}
