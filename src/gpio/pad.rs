//! # Value-level handles for single pads
//!
//! A [`Pad`] borrows its [`Port`] and implements the embedded HAL GPIO traits
//! for one pad, so higher-level drivers can drive chip selects, resets and
//! similar lines without touching any register.
//!
//! ```ignore
//! let pal = init(&BOARD_CONFIG, Ports::take().unwrap().into_array());
//! let porta = pal.port(PortId::A).unwrap();
//! let mut led = porta.pad(5).unwrap();
//! led.set_high().ok();
//! ```
//!
//! All pad operations go through the set/reset register or the input
//! register. None of them can fail, so the trait error type is
//! [`Infallible`]. The pad mode is not checked: setting the level of an input
//! pad only updates its latch bit.
use super::port::{PinState, Port};
use super::reg::PortRegisters;
use core::convert::Infallible;
use embedded_hal::digital::v2::{InputPin, OutputPin, StatefulOutputPin, ToggleableOutputPin};

pub struct Pad<'a, R: PortRegisters> {
    port: &'a Port<R>,
    num: u8,
}

impl<'a, R: PortRegisters> Pad<'a, R> {
    #[inline]
    pub(super) fn new(port: &'a Port<R>, num: u8) -> Self {
        Pad { port, num }
    }

    /// Pad number within the port
    #[inline]
    pub fn num(&self) -> u8 {
        self.num
    }

    #[inline]
    pub fn port(&self) -> &'a Port<R> {
        self.port
    }

    #[inline]
    pub fn read(&self) -> PinState {
        self.port.read_pad(self.num)
    }

    #[inline]
    pub fn write(&self, state: PinState) {
        self.port.write_pad(self.num, state);
    }

    /// Level of the pad's latch bit
    #[inline]
    pub fn latched(&self) -> PinState {
        PinState::from(self.port.read_latch() & (1 << self.num) != 0)
    }
}

impl<R: PortRegisters> OutputPin for Pad<'_, R> {
    type Error = Infallible;
    #[inline]
    fn set_high(&mut self) -> Result<(), Infallible> {
        self.port.set_pad(self.num);
        Ok(())
    }
    #[inline]
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.port.clear_pad(self.num);
        Ok(())
    }
}

impl<R: PortRegisters> StatefulOutputPin for Pad<'_, R> {
    #[inline]
    fn is_set_high(&self) -> Result<bool, Infallible> {
        Ok(self.latched() == PinState::High)
    }
    #[inline]
    fn is_set_low(&self) -> Result<bool, Infallible> {
        Ok(self.latched() == PinState::Low)
    }
}

impl<R: PortRegisters> ToggleableOutputPin for Pad<'_, R> {
    type Error = Infallible;
    #[inline]
    fn toggle(&mut self) -> Result<(), Infallible> {
        self.port.toggle_pad(self.num);
        Ok(())
    }
}

impl<R: PortRegisters> InputPin for Pad<'_, R> {
    type Error = Infallible;
    #[inline]
    fn is_high(&self) -> Result<bool, Infallible> {
        Ok(self.read() == PinState::High)
    }
    #[inline]
    fn is_low(&self) -> Result<bool, Infallible> {
        Ok(self.read() == PinState::Low)
    }
}
