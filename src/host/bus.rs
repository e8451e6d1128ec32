//! Host-controller facing front-end of a card.
//!
//! A controller model usually holds the card behind a shared reference and
//! pokes it from its register handlers. `SdBus` serializes every command and
//! data byte through one spin lock so the card never sees two frames at once.

use kspin::SpinRaw;
use log::trace;

use crate::card::{MediaState, SdCard};
use crate::common::commands::{Direction, SdRequest, SdResponse};
use crate::err::CardResult;
use crate::host::BlockStore;

pub struct SdBus<B: BlockStore> {
    card: SpinRaw<SdCard<B>>,
}

impl<B: BlockStore> SdBus<B> {
    pub fn new(card: SdCard<B>) -> Self {
        Self { card: SpinRaw::new(card) }
    }

    /// Sends one command frame and collects the response.
    pub fn do_command(&self, req: &SdRequest) -> SdResponse {
        self.card.lock().do_command(req)
    }

    /// Sends a raw 6-byte command frame.
    pub fn do_frame(&self, frame: &[u8; 6]) -> SdResponse {
        let req = SdRequest::from_frame(frame);
        trace!("SD bus: frame {:02x?}", frame);
        self.do_command(&req)
    }

    pub fn read_byte(&self) -> u8 {
        self.card.lock().read_byte()
    }

    pub fn write_byte(&self, value: u8) {
        self.card.lock().write_byte(value)
    }

    pub fn transfer_byte(&self, direction: Direction, value: u8) -> u8 {
        self.card.lock().transfer_byte(direction, value)
    }

    /// Fills `buf` from the card's data phase.
    pub fn read_data(&self, buf: &mut [u8]) {
        let mut card = self.card.lock();
        for byte in buf.iter_mut() {
            *byte = card.read_byte();
        }
    }

    /// Pushes `buf` into the card's data phase.
    pub fn write_data(&self, buf: &[u8]) {
        let mut card = self.card.lock();
        for &byte in buf {
            card.write_byte(byte);
        }
    }

    pub fn data_ready(&self) -> bool {
        self.card.lock().data_ready()
    }

    pub fn receive_ready(&self) -> bool {
        self.card.lock().receive_ready()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.card.lock().set_enabled(enabled)
    }

    pub fn set_voltage(&self, millivolts: u16) {
        self.card.lock().set_voltage(millivolts)
    }

    pub fn dat_lines(&self) -> u8 {
        self.card.lock().dat_lines()
    }

    pub fn cmd_line(&self) -> bool {
        self.card.lock().cmd_line()
    }

    pub fn change_media(&self, store: Option<B>) -> CardResult<MediaState> {
        self.card.lock().change_media(store)
    }

    pub fn advance_clock(&self, ns: u64) {
        self.card.lock().advance_clock(ns)
    }

    /// Runs `f` with exclusive access to the card.
    pub fn with_card<R>(&self, f: impl FnOnce(&mut SdCard<B>) -> R) -> R {
        f(&mut self.card.lock())
    }

    pub fn into_inner(self) -> SdCard<B> {
        self.card.into_inner()
    }
}
