//! # Port-wide access to the GPIO registers
//!
//! A [`Port`] owns the register handle of one GPIO bank and exposes the
//! operations which work on bitmasks of pads:
//!
//! - Reading the input levels and the output latch
//! - Overwriting the latch, or setting/clearing bits through the set/reset
//!   register
//! - Writing a group of adjacent pads with a single set/reset access
//! - Reprogramming the mode of an arbitrary subset of pads
//!
//! Operations which only touch the set/reset register take `&self`. A single
//! set/reset write can not lose concurrent updates of other latch bits, so
//! these are safe to use from interrupt handlers as well. Mode changes are
//! read-modify-write sequences over several registers and therefore take
//! `&mut self`. Callers sharing a port with an interrupt handler need to
//! serialize access themselves, for example with a
//! [`critical_section::Mutex`].
use super::mode::{
    direction_to_moder, ModeWord, PadMode, ALTERNATE_SHIFT, DIRECTION_SHIFT, OTYPE_SHIFT,
    PULL_SHIFT, SPEED_SHIFT,
};
use super::pad::Pad;
use super::reg::{PortRegisters, Register};

/// Bitmask of pads within one port, bit `n` selects pad `n`
pub type PortMask = u32;

/// Number of pads per port
pub const PORT_WIDTH: u8 = 16;

/// Mask selecting every pad of a port
pub const WHOLE_PORT: PortMask = 0xFFFF;

//==================================================================================================
//  Errors and Definitions
//==================================================================================================

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PortError {
    /// There is no port with this index
    InvalidPort(u8),
    /// Pad numbers range from 0 to 15
    InvalidPad(u8),
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinState {
    Low = 0,
    High = 1,
}

impl From<bool> for PinState {
    #[inline]
    fn from(high: bool) -> Self {
        if high {
            PinState::High
        } else {
            PinState::Low
        }
    }
}

/// Identifier of a physical port
#[derive(Debug, PartialEq, Eq, Clone, Copy, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PortId {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
}

impl PortId {
    /// Maximum number of ports
    pub const COUNT: usize = 7;

    pub const ALL: [PortId; Self::COUNT] = [
        PortId::A,
        PortId::B,
        PortId::C,
        PortId::D,
        PortId::E,
        PortId::F,
        PortId::G,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub const fn from_index(index: usize) -> Option<Self> {
        if index < Self::COUNT {
            Some(Self::ALL[index])
        } else {
            None
        }
    }

    /// Start of the port's register block on the AHB bus
    #[inline]
    pub const fn base_address(self) -> usize {
        match self {
            PortId::A => 0x4002_0000,
            PortId::B => 0x4002_0400,
            PortId::C => 0x4002_0800,
            PortId::D => 0x4002_0C00,
            PortId::E => 0x4002_1000,
            PortId::F => 0x4002_1800,
            PortId::G => 0x4002_1C00,
        }
    }
}

impl TryFrom<u8> for PortId {
    type Error = PortError;

    #[inline]
    fn try_from(index: u8) -> Result<Self, PortError> {
        Self::from_index(index as usize).ok_or(PortError::InvalidPort(index))
    }
}

/// Shift a group mask to its position in the port. Bits shifted past the port
/// width are dropped.
#[inline(always)]
const fn place(mask: PortMask, offset: u8) -> PortMask {
    debug_assert!(offset < PORT_WIDTH, "offset outside of port");
    match mask.checked_shl(offset as u32) {
        Some(placed) => placed & WHOLE_PORT,
        None => 0,
    }
}

//==================================================================================================
//  IoBus
//==================================================================================================

/// A group of adjacent pads within one port, handled as one value
///
/// ```
/// use stm32l1_pal::gpio::IoBus;
///
/// // Pads 4..=7
/// const NIBBLE: IoBus = IoBus::new(0xF, 4);
/// const NIBBLE_MASK: u32 = NIBBLE.port_mask();
/// assert_eq!(NIBBLE_MASK, 0x00F0);
/// ```
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IoBus {
    mask: PortMask,
    offset: u8,
}

impl IoBus {
    /// Panics if `offset` is outside of the port. In constant context this
    /// is a compile-time error.
    pub const fn new(mask: PortMask, offset: u8) -> Self {
        assert!(offset < PORT_WIDTH, "bus offset outside of port");
        IoBus { mask, offset }
    }

    #[inline]
    pub const fn mask(&self) -> PortMask {
        self.mask
    }

    #[inline]
    pub const fn offset(&self) -> u8 {
        self.offset
    }

    /// Pads of the bus as a port mask
    #[inline]
    pub const fn port_mask(&self) -> PortMask {
        place(self.mask, self.offset)
    }
}

//==================================================================================================
//  Port
//==================================================================================================

/// One GPIO bank, parameterized by its register handle
///
/// Instances are created by [`init`](super::init) or
/// [`Port::configure`], which both apply a [`PortSnapshot`](super::PortSnapshot)
/// first.
pub struct Port<R: PortRegisters> {
    id: PortId,
    regs: R,
}

impl<R: PortRegisters> Port<R> {
    #[inline]
    pub(super) fn new(id: PortId, regs: R) -> Self {
        Port { id, regs }
    }

    #[inline]
    pub fn id(&self) -> PortId {
        self.id
    }

    /// Access the underlying register handle
    #[inline]
    pub fn registers(&self) -> &R {
        &self.regs
    }

    /// Release the register handle
    #[inline]
    pub fn free(self) -> R {
        self.regs
    }

    //----------------------------------------------------------------------------------------------
    //  Port accessors
    //----------------------------------------------------------------------------------------------

    /// Live pad levels
    #[inline]
    pub fn read_port(&self) -> PortMask {
        self.regs.read(Register::Idr) & WHOLE_PORT
    }

    /// Last value written to the output latch. Can differ from the pad levels
    /// for pads which are not outputs.
    #[inline]
    pub fn read_latch(&self) -> PortMask {
        self.regs.read(Register::Odr) & WHOLE_PORT
    }

    /// Overwrite the whole output latch
    ///
    /// The latch is not atomic with respect to other writers. Prefer
    /// [`set_bits`](Self::set_bits), [`clear_bits`](Self::clear_bits) or
    /// [`write_group`](Self::write_group) if pads of this port are driven from
    /// interrupt context.
    ///
    /// The latch also selects the resistor of pulled inputs on some parts, so
    /// writing it can change the pull direction of such pads.
    #[inline]
    pub fn write_port(&self, bits: PortMask) {
        self.regs.write(Register::Odr, bits & WHOLE_PORT);
    }

    /// Set the latch bits in `mask` with a single set/reset access
    #[inline]
    pub fn set_bits(&self, mask: PortMask) {
        self.regs.write(Register::Bsrr, mask & WHOLE_PORT);
    }

    /// Clear the latch bits in `mask` with a single set/reset access
    #[inline]
    pub fn clear_bits(&self, mask: PortMask) {
        self.regs.write(Register::Bsrr, (mask & WHOLE_PORT) << 16);
    }

    //----------------------------------------------------------------------------------------------
    //  Group write
    //----------------------------------------------------------------------------------------------

    /// Write `bits` to the pads selected by `mask << offset`
    ///
    /// Set and clear requests are issued in one set/reset access, so the
    /// update is atomic and leaves every other latch bit untouched. Bits of
    /// `bits` outside of `mask` are ignored.
    #[inline]
    pub fn write_group(&self, mask: PortMask, offset: u8, bits: u32) {
        let set = place(bits & mask, offset);
        let clear = place(!bits & mask, offset);
        self.regs.write(Register::Bsrr, (clear << 16) | set);
    }

    /// Read the pads selected by `mask << offset`, shifted down to bit 0
    #[inline]
    pub fn read_group(&self, mask: PortMask, offset: u8) -> u32 {
        self.read_port().checked_shr(offset as u32).unwrap_or(0) & mask
    }

    #[inline]
    pub fn read_bus(&self, bus: &IoBus) -> u32 {
        self.read_group(bus.mask, bus.offset)
    }

    #[inline]
    pub fn write_bus(&self, bus: &IoBus, bits: u32) {
        self.write_group(bus.mask, bus.offset, bits);
    }

    //----------------------------------------------------------------------------------------------
    //  Single pads
    //----------------------------------------------------------------------------------------------

    /// Value-level handle for pad `num`
    #[inline]
    pub fn pad(&self, num: u8) -> Result<Pad<'_, R>, PortError> {
        if num >= PORT_WIDTH {
            return Err(PortError::InvalidPad(num));
        }
        Ok(Pad::new(self, num))
    }

    #[inline]
    pub fn read_pad(&self, pad: u8) -> PinState {
        PinState::from(self.read_group(1, pad) != 0)
    }

    #[inline]
    pub fn write_pad(&self, pad: u8, state: PinState) {
        self.write_group(1, pad, state as u32);
    }

    #[inline]
    pub fn set_pad(&self, pad: u8) {
        self.set_bits(place(1, pad));
    }

    #[inline]
    pub fn clear_pad(&self, pad: u8) {
        self.clear_bits(place(1, pad));
    }

    /// Invert the latch bit of `pad`
    ///
    /// The new value is written through the set/reset register, so other
    /// latch bits are never rewritten. A concurrent writer of the same pad
    /// can still race with the read of the latch.
    #[inline]
    pub fn toggle_pad(&self, pad: u8) {
        let bit = place(1, pad);
        if self.read_latch() & bit != 0 {
            self.clear_bits(bit);
        } else {
            self.set_bits(bit);
        }
    }

    //----------------------------------------------------------------------------------------------
    //  Group mode
    //----------------------------------------------------------------------------------------------

    /// Program every pad selected by `mask` with `mode`
    ///
    /// Configuration bits of unselected pads are left unchanged. Mask bits
    /// beyond the port width are ignored, and an empty mask does not touch
    /// any register.
    ///
    /// The registers are updated one after another with MODER last, so a pad
    /// only switches direction once its output stage is configured. The
    /// sequence as a whole is not atomic.
    #[inline]
    pub fn set_group_mode(&mut self, mask: PortMask, mode: PadMode) {
        self.set_group_mode_raw(mask, mode.encode());
    }

    /// Like [`set_group_mode`](Self::set_group_mode) for an already encoded
    /// mode
    pub fn set_group_mode_raw(&mut self, mask: PortMask, mode: ModeWord) {
        let mask = mask & WHOLE_PORT;
        if mask == 0 {
            return;
        }
        trace!("port {}: mode {=u32:#x} for pads {=u32:#06x}", self.id, mode.bits(), mask);

        let mut slots_2: u32 = 0;
        let mut moder: u32 = 0;
        let mut ospeedr: u32 = 0;
        let mut pupdr: u32 = 0;
        let mut otyper: u32 = 0;
        let (mut slots_afrl, mut afrl): (u32, u32) = (0, 0);
        let (mut slots_afrh, mut afrh): (u32, u32) = (0, 0);
        for pad in 0..PORT_WIDTH as u32 {
            if (mask >> pad) & 1 == 0 {
                continue;
            }
            let shift_2 = 2 * pad;
            slots_2 |= 0b11 << shift_2;
            moder |= mode.moder_bits() << shift_2;
            ospeedr |= mode.ospeedr_bits() << shift_2;
            pupdr |= mode.pupdr_bits() << shift_2;
            otyper |= mode.otyper_bits() << pad;
            let shift_4 = 4 * (pad % 8);
            if pad < 8 {
                slots_afrl |= 0b1111 << shift_4;
                afrl |= mode.afr_bits() << shift_4;
            } else {
                slots_afrh |= 0b1111 << shift_4;
                afrh |= mode.afr_bits() << shift_4;
            }
        }

        let regs = &self.regs;
        regs.modify(Register::Otyper, |r| (r & !mask) | otyper);
        regs.modify(Register::Ospeedr, |r| (r & !slots_2) | ospeedr);
        regs.modify(Register::Pupdr, |r| (r & !slots_2) | pupdr);
        if slots_afrl != 0 {
            regs.modify(Register::Afrl, |r| (r & !slots_afrl) | afrl);
        }
        if slots_afrh != 0 {
            regs.modify(Register::Afrh, |r| (r & !slots_afrh) | afrh);
        }
        regs.modify(Register::Moder, |r| (r & !slots_2) | moder);
    }

    #[inline]
    pub fn set_pad_mode(&mut self, pad: u8, mode: PadMode) {
        self.set_group_mode(place(1, pad), mode);
    }

    #[inline]
    pub fn set_bus_mode(&mut self, bus: &IoBus, mode: PadMode) {
        self.set_group_mode(bus.port_mask(), mode);
    }

    /// Mode of `pad` as currently programmed in the configuration registers
    pub fn pad_mode(&self, pad: u8) -> PadMode {
        debug_assert!(pad < PORT_WIDTH, "pad {} outside of port", pad);
        let pad = (pad % PORT_WIDTH) as u32;
        let shift_2 = 2 * pad;
        let afr = if pad < 8 {
            self.regs.read(Register::Afrl)
        } else {
            self.regs.read(Register::Afrh)
        };
        let slot_2 = |reg: Register| (self.regs.read(reg) >> shift_2) & 0b11;
        let word = (direction_to_moder(slot_2(Register::Moder)) << DIRECTION_SHIFT)
            | (((self.regs.read(Register::Otyper) >> pad) & 0b1) << OTYPE_SHIFT)
            | (slot_2(Register::Ospeedr) << SPEED_SHIFT)
            | (slot_2(Register::Pupdr) << PULL_SHIFT)
            | (((afr >> (4 * (pad % 8))) & 0b1111) << ALTERNATE_SHIFT);
        PadMode::decode(ModeWord::from_bits(word))
    }
}
