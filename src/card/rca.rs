/// Supplies relative card addresses on SEND_RELATIVE_ADDR.
pub trait RcaSource {
    /// Next RCA given the one currently held by the card.
    fn next_rca(&mut self, current: u16) -> u16;
}

/// Advances the previous address by a fixed stride, so every reset cycle
/// publishes the same sequence.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialRca;

impl SequentialRca {
    pub const STRIDE: u16 = 0x4567;
}

impl RcaSource for SequentialRca {
    fn next_rca(&mut self, current: u16) -> u16 {
        current.wrapping_add(Self::STRIDE)
    }
}

/// Seedable xorshift32 generator. Never yields 0, which is reserved for
/// the broadcast / deselect address.
#[derive(Debug, Clone, Copy)]
pub struct XorShiftRca {
    state: u32,
}

impl XorShiftRca {
    pub fn new(seed: u32) -> Self {
        Self { state: if seed == 0 { 0x2545_f491 } else { seed } }
    }

    fn step(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }
}

impl RcaSource for XorShiftRca {
    fn next_rca(&mut self, current: u16) -> u16 {
        loop {
            let rca = (self.step() >> 16) as u16;
            if rca != 0 && rca != current {
                return rca;
            }
        }
    }
}
