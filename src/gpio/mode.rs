//! # Pad mode encoding
//!
//! A [`PadMode`] describes how a single pad is configured: its direction,
//! output stage, speed class, pull resistor and alternate function. The
//! value-level description is packed into a [`ModeWord`] with the following
//! fixed, non-overlapping layout:
//!
//! | Bits  | Field              |
//! |-------|--------------------|
//! | 0..2  | [`Direction`]      |
//! | 2     | [`OutputType`]     |
//! | 3..5  | [`Speed`]          |
//! | 5..7  | [`Pull`]           |
//! | 7..11 | [`AltFunction`]    |
//!
//! Because the fields never overlap, OR-ing the words of two independent field
//! sets yields the word of their union. An alternate function word also
//! carries the [`Direction::Alternate`] bits, which are a superset of every
//! other direction, so routing an output pad to a peripheral is a plain OR:
//!
//! ```
//! use stm32l1_pal::gpio::{open_drain_alternate, ModeWord, OPEN_DRAIN_OUTPUT, AF7};
//!
//! let word = OPEN_DRAIN_OUTPUT.encode() | ModeWord::from(AF7);
//! assert_eq!(word, open_drain_alternate(AF7).encode());
//! ```
//!
//! The direction field is not the hardware MODER value. MODER orders
//! alternate (`0b10`) before analog (`0b11`), the translation happens when the
//! word is written to the port.
//!
//! Composing raw words is not checked. Prefer the named modes or
//! [`PadMode::builder`], which rejects fields that have no meaning for the
//! selected direction.
use core::ops::{BitOr, BitOrAssign};
use paste::paste;

pub(crate) const DIRECTION_SHIFT: u32 = 0;
pub(crate) const DIRECTION_MASK: u32 = 0b11;
pub(crate) const OTYPE_SHIFT: u32 = 2;
pub(crate) const OTYPE_MASK: u32 = 0b1;
pub(crate) const SPEED_SHIFT: u32 = 3;
pub(crate) const SPEED_MASK: u32 = 0b11;
pub(crate) const PULL_SHIFT: u32 = 5;
pub(crate) const PULL_MASK: u32 = 0b11;
pub(crate) const ALTERNATE_SHIFT: u32 = 7;
pub(crate) const ALTERNATE_MASK: u32 = 0b1111;

//==================================================================================================
//  Errors
//==================================================================================================

/// Rejected [`PadModeBuilder`] configurations
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModeError {
    /// Output type was set, but the direction has no output stage
    OutputTypeNotApplicable,
    /// Speed was set, but the direction has no output stage
    SpeedNotApplicable,
    /// Pull resistors are only configured for input and analog pads
    PullNotApplicable,
    /// Alternate function was set, but the direction is not [`Direction::Alternate`]
    AlternateNotApplicable,
    /// [`Direction::Alternate`] requires an alternate function
    MissingAlternate,
    /// Alternate function numbers range from 0 to 15
    InvalidAlternate(u8),
}

//==================================================================================================
//  Fields
//==================================================================================================

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Input = 0b00,
    Output = 0b01,
    Analog = 0b10,
    Alternate = 0b11,
}

impl Direction {
    #[inline]
    const fn from_bits(bits: u32) -> Self {
        match bits & DIRECTION_MASK {
            0b00 => Direction::Input,
            0b01 => Direction::Output,
            0b10 => Direction::Analog,
            _ => Direction::Alternate,
        }
    }

    /// Output type and speed only apply to pads driving the line
    #[inline]
    pub const fn has_output_stage(self) -> bool {
        matches!(self, Direction::Output | Direction::Alternate)
    }

    /// Pull resistors only apply to pads which do not drive the line
    #[inline]
    pub const fn has_pull(self) -> bool {
        matches!(self, Direction::Input | Direction::Analog)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputType {
    PushPull = 0,
    OpenDrain = 1,
}

impl OutputType {
    #[inline]
    const fn from_bits(bits: u32) -> Self {
        match bits & OTYPE_MASK {
            0 => OutputType::PushPull,
            _ => OutputType::OpenDrain,
        }
    }
}

/// Output slew rate class. The frequencies are the maximum toggle rates
/// specified for the pad drivers.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Speed {
    /// 400 kHz
    VeryLow = 0b00,
    /// 2 MHz
    Low = 0b01,
    /// 10 MHz
    Medium = 0b10,
    /// 40 MHz
    High = 0b11,
}

impl Speed {
    #[inline]
    const fn from_bits(bits: u32) -> Self {
        match bits & SPEED_MASK {
            0b00 => Speed::VeryLow,
            0b01 => Speed::Low,
            0b10 => Speed::Medium,
            _ => Speed::High,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pull {
    Floating = 0b00,
    PullUp = 0b01,
    PullDown = 0b10,
}

impl Pull {
    /// The reserved encoding `0b11` decodes as [`Pull::Floating`]
    #[inline]
    const fn from_bits(bits: u32) -> Self {
        match bits & PULL_MASK {
            0b01 => Pull::PullUp,
            0b10 => Pull::PullDown,
            _ => Pull::Floating,
        }
    }
}

/// Alternate function selector, checked to be within 0..=15
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AltFunction(u8);

impl AltFunction {
    pub const MAX: u8 = ALTERNATE_MASK as u8;

    #[inline]
    pub const fn new(num: u8) -> Option<Self> {
        if num > Self::MAX {
            return None;
        }
        Some(AltFunction(num))
    }

    #[inline]
    pub const fn number(self) -> u8 {
        self.0
    }
}

macro_rules! alt_functions {
    ($($NUM:literal),+) => {
        paste! {
            $(
                #[doc = "Alternate function " $NUM]
                pub const [<AF $NUM>]: AltFunction = AltFunction($NUM);
            )+
        }
    };
}

alt_functions!(0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15);

//==================================================================================================
//  ModeWord
//==================================================================================================

/// Translate between the direction field and a MODER slot. Swaps analog and
/// alternate, so it is its own inverse.
#[inline]
pub(crate) const fn direction_to_moder(bits: u32) -> u32 {
    let bits = bits & DIRECTION_MASK;
    bits ^ (bits >> 1)
}

/// Encoded [`PadMode`]
#[repr(transparent)]
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ModeWord(u32);

impl ModeWord {
    #[inline]
    pub const fn from_bits(bits: u32) -> Self {
        ModeWord(bits)
    }

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Bitwise union of two words. Only sound for independent field sets.
    #[inline]
    pub const fn union(self, other: ModeWord) -> Self {
        ModeWord(self.0 | other.0)
    }

    /// MODER slot value, 2 bits
    #[inline]
    pub(crate) const fn moder_bits(self) -> u32 {
        direction_to_moder(self.0 >> DIRECTION_SHIFT)
    }

    /// OTYPER slot value, 1 bit
    #[inline]
    pub(crate) const fn otyper_bits(self) -> u32 {
        (self.0 >> OTYPE_SHIFT) & OTYPE_MASK
    }

    /// OSPEEDR slot value, 2 bits
    #[inline]
    pub(crate) const fn ospeedr_bits(self) -> u32 {
        (self.0 >> SPEED_SHIFT) & SPEED_MASK
    }

    /// PUPDR slot value, 2 bits
    #[inline]
    pub(crate) const fn pupdr_bits(self) -> u32 {
        (self.0 >> PULL_SHIFT) & PULL_MASK
    }

    /// AFRL/AFRH slot value, 4 bits
    #[inline]
    pub(crate) const fn afr_bits(self) -> u32 {
        (self.0 >> ALTERNATE_SHIFT) & ALTERNATE_MASK
    }
}

impl BitOr for ModeWord {
    type Output = ModeWord;
    #[inline]
    fn bitor(self, rhs: ModeWord) -> ModeWord {
        self.union(rhs)
    }
}

impl BitOrAssign for ModeWord {
    #[inline]
    fn bitor_assign(&mut self, rhs: ModeWord) {
        *self = self.union(rhs);
    }
}

impl From<Direction> for ModeWord {
    #[inline]
    fn from(direction: Direction) -> Self {
        ModeWord((direction as u32) << DIRECTION_SHIFT)
    }
}

impl From<OutputType> for ModeWord {
    #[inline]
    fn from(otype: OutputType) -> Self {
        ModeWord((otype as u32) << OTYPE_SHIFT)
    }
}

impl From<Speed> for ModeWord {
    #[inline]
    fn from(speed: Speed) -> Self {
        ModeWord((speed as u32) << SPEED_SHIFT)
    }
}

impl From<Pull> for ModeWord {
    #[inline]
    fn from(pull: Pull) -> Self {
        ModeWord((pull as u32) << PULL_SHIFT)
    }
}

/// Selects the function and the [`Direction::Alternate`] direction
impl From<AltFunction> for ModeWord {
    #[inline]
    fn from(af: AltFunction) -> Self {
        ModeWord(
            ((af.0 as u32) << ALTERNATE_SHIFT)
                | ((Direction::Alternate as u32) << DIRECTION_SHIFT),
        )
    }
}

impl From<PadMode> for ModeWord {
    #[inline]
    fn from(mode: PadMode) -> Self {
        mode.encode()
    }
}

impl From<ModeWord> for PadMode {
    #[inline]
    fn from(word: ModeWord) -> Self {
        PadMode::decode(word)
    }
}

//==================================================================================================
//  PadMode
//==================================================================================================

/// Value-level pad configuration
///
/// Fields which have no meaning for the [`Direction`] keep their reset
/// defaults when the mode is created through the constructors or the builder.
/// A mode obtained through [`PadMode::decode`] carries whatever the word
/// contained.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PadMode {
    direction: Direction,
    output_type: OutputType,
    speed: Speed,
    pull: Pull,
    alternate: AltFunction,
}

impl PadMode {
    const fn base(direction: Direction) -> Self {
        PadMode {
            direction,
            output_type: OutputType::PushPull,
            speed: Speed::VeryLow,
            pull: Pull::Floating,
            alternate: AltFunction(0),
        }
    }

    #[inline]
    pub const fn input(pull: Pull) -> Self {
        let mut mode = Self::base(Direction::Input);
        mode.pull = pull;
        mode
    }

    #[inline]
    pub const fn analog() -> Self {
        Self::base(Direction::Analog)
    }

    #[inline]
    pub const fn output(output_type: OutputType) -> Self {
        let mut mode = Self::base(Direction::Output);
        mode.output_type = output_type;
        mode
    }

    #[inline]
    pub const fn alternate(alternate: AltFunction, output_type: OutputType) -> Self {
        let mut mode = Self::base(Direction::Alternate);
        mode.output_type = output_type;
        mode.alternate = alternate;
        mode
    }

    /// Start a validated mode description for the given direction
    #[inline]
    pub const fn builder(direction: Direction) -> PadModeBuilder {
        PadModeBuilder {
            direction,
            output_type: None,
            speed: None,
            pull: None,
            alternate: None,
        }
    }

    #[inline]
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    #[inline]
    pub const fn output_type(&self) -> OutputType {
        self.output_type
    }

    #[inline]
    pub const fn speed(&self) -> Speed {
        self.speed
    }

    #[inline]
    pub const fn pull(&self) -> Pull {
        self.pull
    }

    #[inline]
    pub const fn alternate_function(&self) -> AltFunction {
        self.alternate
    }

    /// Copy of the mode with every field that is meaningless for its direction
    /// reset to its default
    pub const fn meaningful(self) -> Self {
        let mut mode = Self::base(self.direction);
        if self.direction.has_output_stage() {
            mode.output_type = self.output_type;
            mode.speed = self.speed;
        }
        if self.direction.has_pull() {
            mode.pull = self.pull;
        }
        if matches!(self.direction, Direction::Alternate) {
            mode.alternate = self.alternate;
        }
        mode
    }

    pub const fn encode(self) -> ModeWord {
        ModeWord(
            ((self.direction as u32) << DIRECTION_SHIFT)
                | ((self.output_type as u32) << OTYPE_SHIFT)
                | ((self.speed as u32) << SPEED_SHIFT)
                | ((self.pull as u32) << PULL_SHIFT)
                | ((self.alternate.0 as u32) << ALTERNATE_SHIFT),
        )
    }

    /// Every word decodes to some mode. Bits above the alternate function
    /// field are ignored.
    pub const fn decode(word: ModeWord) -> Self {
        let bits = word.0;
        PadMode {
            direction: Direction::from_bits(bits >> DIRECTION_SHIFT),
            output_type: OutputType::from_bits(bits >> OTYPE_SHIFT),
            speed: Speed::from_bits(bits >> SPEED_SHIFT),
            pull: Pull::from_bits(bits >> PULL_SHIFT),
            alternate: AltFunction(((bits >> ALTERNATE_SHIFT) & ALTERNATE_MASK) as u8),
        }
    }
}

impl Default for PadMode {
    fn default() -> Self {
        RESET
    }
}

/// Pack a [`PadMode`] into its [`ModeWord`]
#[inline]
pub const fn encode(mode: PadMode) -> ModeWord {
    mode.encode()
}

/// Unpack any [`ModeWord`] into a [`PadMode`]
#[inline]
pub const fn decode(word: ModeWord) -> PadMode {
    PadMode::decode(word)
}

//==================================================================================================
//  PadModeBuilder
//==================================================================================================

/// Validating constructor for [`PadMode`]
///
/// ```
/// use stm32l1_pal::gpio::{Direction, ModeError, OutputType, PadMode, Pull, Speed};
///
/// let mode = PadMode::builder(Direction::Alternate)
///     .alternate_function(4)
///     .output_type(OutputType::OpenDrain)
///     .speed(Speed::Medium)
///     .build()
///     .unwrap();
/// assert_eq!(mode.alternate_function().number(), 4);
///
/// let err = PadMode::builder(Direction::Output).pull(Pull::PullUp).build();
/// assert_eq!(err, Err(ModeError::PullNotApplicable));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct PadModeBuilder {
    direction: Direction,
    output_type: Option<OutputType>,
    speed: Option<Speed>,
    pull: Option<Pull>,
    alternate: Option<u8>,
}

impl PadModeBuilder {
    #[inline]
    pub const fn output_type(mut self, output_type: OutputType) -> Self {
        self.output_type = Some(output_type);
        self
    }

    #[inline]
    pub const fn speed(mut self, speed: Speed) -> Self {
        self.speed = Some(speed);
        self
    }

    #[inline]
    pub const fn pull(mut self, pull: Pull) -> Self {
        self.pull = Some(pull);
        self
    }

    #[inline]
    pub const fn alternate_function(mut self, num: u8) -> Self {
        self.alternate = Some(num);
        self
    }

    pub const fn build(self) -> Result<PadMode, ModeError> {
        let direction = self.direction;
        let mut mode = PadMode::base(direction);
        if let Some(output_type) = self.output_type {
            if !direction.has_output_stage() {
                return Err(ModeError::OutputTypeNotApplicable);
            }
            mode.output_type = output_type;
        }
        if let Some(speed) = self.speed {
            if !direction.has_output_stage() {
                return Err(ModeError::SpeedNotApplicable);
            }
            mode.speed = speed;
        }
        if let Some(pull) = self.pull {
            if !direction.has_pull() {
                return Err(ModeError::PullNotApplicable);
            }
            mode.pull = pull;
        }
        match (direction, self.alternate) {
            (Direction::Alternate, Some(num)) => match AltFunction::new(num) {
                Some(af) => mode.alternate = af,
                None => return Err(ModeError::InvalidAlternate(num)),
            },
            (Direction::Alternate, None) => return Err(ModeError::MissingAlternate),
            (_, Some(_)) => return Err(ModeError::AlternateNotApplicable),
            (_, None) => (),
        }
        Ok(mode)
    }
}

//==================================================================================================
//  Named modes
//==================================================================================================

/// Floating input pad
pub const FLOATING_INPUT: PadMode = PadMode::input(Pull::Floating);
/// Input pad with weak pull-up resistor
pub const PULL_UP_INPUT: PadMode = PadMode::input(Pull::PullUp);
/// Input pad with weak pull-down resistor
pub const PULL_DOWN_INPUT: PadMode = PadMode::input(Pull::PullDown);
/// Analog input pad
pub const ANALOG_INPUT: PadMode = PadMode::analog();
/// Push-pull output pad
pub const PUSH_PULL_OUTPUT: PadMode = PadMode::output(OutputType::PushPull);
/// Open-drain output pad
pub const OPEN_DRAIN_OUTPUT: PadMode = PadMode::output(OutputType::OpenDrain);

/// Mode of a pad after reset
pub const RESET: PadMode = FLOATING_INPUT;
/// Mode for pads with nothing attached. Driving them avoids floating inputs.
pub const UNCONNECTED: PadMode = PUSH_PULL_OUTPUT;

/// Push-pull pad routed to alternate function `af`
#[inline]
pub const fn push_pull_alternate(af: AltFunction) -> PadMode {
    PadMode::alternate(af, OutputType::PushPull)
}

/// Open-drain pad routed to alternate function `af`
#[inline]
pub const fn open_drain_alternate(af: AltFunction) -> PadMode {
    PadMode::alternate(af, OutputType::OpenDrain)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIRECTIONS: [Direction; 4] = [
        Direction::Input,
        Direction::Output,
        Direction::Alternate,
        Direction::Analog,
    ];
    const OUTPUT_TYPES: [OutputType; 2] = [OutputType::PushPull, OutputType::OpenDrain];
    const SPEEDS: [Speed; 4] = [Speed::VeryLow, Speed::Low, Speed::Medium, Speed::High];
    const PULLS: [Pull; 3] = [Pull::Floating, Pull::PullUp, Pull::PullDown];

    #[test]
    fn meaningful_fields_survive_encoding() {
        for direction in DIRECTIONS {
            for otype in OUTPUT_TYPES {
                for speed in SPEEDS {
                    for pull in PULLS {
                        for af in 0..=AltFunction::MAX {
                            let mut builder = PadMode::builder(direction);
                            if direction.has_output_stage() {
                                builder = builder.output_type(otype).speed(speed);
                            }
                            if direction.has_pull() {
                                builder = builder.pull(pull);
                            }
                            if direction == Direction::Alternate {
                                builder = builder.alternate_function(af);
                            }
                            let mode = builder.build().unwrap();
                            assert_eq!(decode(encode(mode)), mode);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn field_layout() {
        assert_eq!(PUSH_PULL_OUTPUT.encode().bits(), 0b01);
        assert_eq!(OPEN_DRAIN_OUTPUT.encode().bits(), 0b101);
        assert_eq!(PULL_UP_INPUT.encode().bits(), 0b01 << 5);
        assert_eq!(PULL_DOWN_INPUT.encode().bits(), 0b10 << 5);
        assert_eq!(ANALOG_INPUT.encode().bits(), 0b10);
        assert_eq!(push_pull_alternate(AF7).encode().bits(), 0b11 | (7 << 7));
        assert_eq!(ModeWord::from(Speed::High).bits(), 0b11 << 3);
    }

    #[test]
    fn moder_slot_values() {
        assert_eq!(FLOATING_INPUT.encode().moder_bits(), 0b00);
        assert_eq!(PUSH_PULL_OUTPUT.encode().moder_bits(), 0b01);
        assert_eq!(push_pull_alternate(AF1).encode().moder_bits(), 0b10);
        assert_eq!(ANALOG_INPUT.encode().moder_bits(), 0b11);
        for bits in 0..=0b11 {
            assert_eq!(direction_to_moder(direction_to_moder(bits)), bits);
        }
    }

    #[test]
    fn composition_of_independent_fields() {
        let routed = encode(PadMode::output(OutputType::OpenDrain)) | ModeWord::from(AF7);
        assert_eq!(routed, encode(PadMode::alternate(AF7, OutputType::OpenDrain)));
        assert_eq!(decode(routed).direction(), Direction::Alternate);
        assert_eq!(
            PUSH_PULL_OUTPUT.encode() | ModeWord::from(AF0),
            push_pull_alternate(AF0).encode()
        );

        let composed = ModeWord::from(Direction::Alternate)
            | ModeWord::from(OutputType::OpenDrain)
            | ModeWord::from(AF7);
        assert_eq!(composed, open_drain_alternate(AF7).encode());

        let mut word = PUSH_PULL_OUTPUT.encode();
        word |= ModeWord::from(Speed::Medium);
        let expected = PadMode::builder(Direction::Output)
            .speed(Speed::Medium)
            .build()
            .unwrap();
        assert_eq!(word, expected.encode());
    }

    #[test]
    fn any_word_decodes() {
        let mode = decode(ModeWord::from_bits(u32::MAX));
        assert_eq!(mode.direction(), Direction::Alternate);
        assert_eq!(mode.pull(), Pull::Floating);
        assert_eq!(mode.alternate_function(), AF15);
        // Pull is not meaningful for alternate pads
        let expected = PadMode::builder(Direction::Alternate)
            .alternate_function(15)
            .output_type(OutputType::OpenDrain)
            .speed(Speed::High)
            .build()
            .unwrap();
        assert_eq!(mode.meaningful(), expected);

        let analog = decode(ModeWord::from_bits(0b10 | (0b11 << 5)));
        assert_eq!(analog.direction(), Direction::Analog);
        assert_eq!(analog.meaningful(), ANALOG_INPUT);
    }

    #[test]
    fn builder_rejects_meaningless_fields() {
        assert_eq!(
            PadMode::builder(Direction::Input)
                .output_type(OutputType::OpenDrain)
                .build(),
            Err(ModeError::OutputTypeNotApplicable)
        );
        assert_eq!(
            PadMode::builder(Direction::Analog).speed(Speed::High).build(),
            Err(ModeError::SpeedNotApplicable)
        );
        assert_eq!(
            PadMode::builder(Direction::Alternate)
                .alternate_function(1)
                .pull(Pull::PullUp)
                .build(),
            Err(ModeError::PullNotApplicable)
        );
        assert_eq!(
            PadMode::builder(Direction::Output)
                .alternate_function(3)
                .build(),
            Err(ModeError::AlternateNotApplicable)
        );
        assert_eq!(
            PadMode::builder(Direction::Alternate).build(),
            Err(ModeError::MissingAlternate)
        );
        assert_eq!(
            PadMode::builder(Direction::Alternate)
                .alternate_function(16)
                .build(),
            Err(ModeError::InvalidAlternate(16))
        );
    }

    #[test]
    fn named_modes_match_builder() {
        assert_eq!(
            PadMode::builder(Direction::Input)
                .pull(Pull::PullUp)
                .build(),
            Ok(PULL_UP_INPUT)
        );
        assert_eq!(
            PadMode::builder(Direction::Alternate)
                .alternate_function(5)
                .build(),
            Ok(push_pull_alternate(AF5))
        );
        assert_eq!(PadMode::default(), FLOATING_INPUT);
    }

    #[test]
    fn alt_function_range() {
        assert_eq!(AltFunction::new(15), Some(AF15));
        assert_eq!(AltFunction::new(16), None);
    }
}
