use core::fmt::Display;

/// Errors raised while building or re-configuring a card. Protocol-level
/// faults never end up here; they are reported through the card status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardError {
    InvalidSpecVersion,
    SizeNotPowerOfTwo(u64),
    InvalidBootPartitionSize(u64),
    BootPartitionsUnsupported,
    MediumTooSmall,
    NoMedium,
}

impl Display for CardError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            CardError::InvalidSpecVersion => write!(f, "Invalid SD card spec version"),
            CardError::SizeNotPowerOfTwo(size) => {
                write!(f, "Invalid SD card size: {} bytes, must be a power of 2", size)
            }
            CardError::InvalidBootPartitionSize(size) => write!(
                f,
                "Invalid boot partition size: {} bytes, must be a multiple of 128 KiB",
                size
            ),
            CardError::BootPartitionsUnsupported => {
                write!(f, "Boot partitions are only supported on eMMC")
            }
            CardError::MediumTooSmall => write!(f, "Medium smaller than its boot partitions"),
            CardError::NoMedium => write!(f, "No medium inserted"),
        }
    }
}

pub type CardResult<T = ()> = Result<T, CardError>;
