//! Card-side model of the SD / SPI-mode SD / eMMC command protocol.
//!
//! The host side of the bus hands the card one [`SdRequest`] at a time through
//! [`SdCard::do_command`] and then pumps the data phase with
//! [`SdCard::read_byte`] / [`SdCard::write_byte`]. Responses come back as
//! [`SdResponse`] values whose bytes match what a real card puts on the wire.
//! Media is supplied through the [`BlockStore`] trait.
#![cfg_attr(not(test), no_std)]

extern crate alloc;

#[macro_use]
mod regs;

pub mod card;
pub mod common;
pub mod config;
pub mod err;
pub mod host;
pub mod tools;

pub use card::{CardMode, CardState, MediaState, SdCard, rca::RcaSource, rca::SequentialRca, rca::XorShiftRca};
pub use common::commands::{Direction, ResponseKind, SdRequest, SdResponse};
pub use common::{CardStatus, Ocr};
pub use config::{CardConfig, CardVariant, CrcPolicy, SpecVersion};
pub use err::{CardError, CardResult};
pub use host::{BlockStore, MemStore, StoreError, StoreResult, bus::SdBus};
