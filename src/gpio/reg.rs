//! # Register interface for GPIO ports
//!
//! Every port operation goes through the [`PortRegisters`] trait. On target the
//! registers are memory-mapped ([`MmioPort`]). On the host, [`SimulatedPort`]
//! provides a register file with the same observable semantics, so the port
//! logic can be unit tested without hardware.
use super::port::{PortId, PortMask, WHOLE_PORT};
use core::cell::Cell;
use core::sync::atomic::{AtomicU32, Ordering};
use critical_section::Mutex;

//==================================================================================================
//  Register
//==================================================================================================

/// Logical registers of one GPIO port
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Register {
    /// Direction, 2 bits per pad
    Moder,
    /// Output type, 1 bit per pad
    Otyper,
    /// Output speed, 2 bits per pad
    Ospeedr,
    /// Pull resistor, 2 bits per pad
    Pupdr,
    /// Input data, read-only
    Idr,
    /// Output data latch
    Odr,
    /// Bit set/reset, write-only. The low half sets, the high half clears
    /// latch bits.
    Bsrr,
    /// Alternate function selection for pads 0..=7, 4 bits per pad
    Afrl,
    /// Alternate function selection for pads 8..=15, 4 bits per pad
    Afrh,
}

impl Register {
    pub const COUNT: usize = 9;

    /// Byte offset from the port base address
    #[inline]
    pub const fn offset(self) -> usize {
        match self {
            Register::Moder => 0x00,
            Register::Otyper => 0x04,
            Register::Ospeedr => 0x08,
            Register::Pupdr => 0x0C,
            Register::Idr => 0x10,
            Register::Odr => 0x14,
            Register::Bsrr => 0x18,
            Register::Afrl => 0x20,
            Register::Afrh => 0x24,
        }
    }

    #[inline]
    const fn index(self) -> usize {
        self as usize
    }
}

//==================================================================================================
//  PortRegisters
//==================================================================================================

/// Provide raw access to the registers of exactly one GPIO port
///
/// Accessors take `&self` because the hardware registers are shared state which
/// is modified behind the back of the compiler anyway. The
/// [`Port`](super::Port) wrapper decides which operations require exclusive
/// access.
///
/// # Safety
///
/// An implementer must guarantee that a given port's registers are reachable
/// through at most one value at a time. Every register access must be a single
/// volatile (or otherwise indivisible) access, so that a [`Register::Bsrr`]
/// write stays atomic with respect to other writers of the latch.
pub unsafe trait PortRegisters {
    fn read(&self, reg: Register) -> u32;
    fn write(&self, reg: Register, value: u32);

    /// Read-modify-write helper. Not atomic.
    #[inline]
    fn modify(&self, reg: Register, f: impl FnOnce(u32) -> u32) {
        let value = self.read(reg);
        self.write(reg, f(value));
    }
}

//==================================================================================================
//  MmioPort
//==================================================================================================

/// Memory-mapped registers of a physical port
pub struct MmioPort {
    id: PortId,
}

impl MmioPort {
    /// Create a handle for the registers of port `id`
    ///
    /// # Safety
    ///
    /// Users must never create two simultaneous instances of this `struct` for
    /// the same [`PortId`]. Use [`Ports::take`] for the safe variant.
    #[inline]
    pub const unsafe fn new(id: PortId) -> Self {
        MmioPort { id }
    }

    #[inline]
    pub const fn id(&self) -> PortId {
        self.id
    }

    #[inline]
    fn ptr(&self, reg: Register) -> *mut u32 {
        (self.id.base_address() + reg.offset()) as *mut u32
    }
}

// [`MmioPort`] can only be created through `unsafe` code or [`Ports::take`],
// both of which guarantee a singleton per [`PortId`].
unsafe impl PortRegisters for MmioPort {
    #[inline(always)]
    fn read(&self, reg: Register) -> u32 {
        // Safety: The address belongs to the GPIO peripheral of this port
        unsafe { core::ptr::read_volatile(self.ptr(reg)) }
    }

    #[inline(always)]
    fn write(&self, reg: Register, value: u32) {
        // Safety: The address belongs to the GPIO peripheral of this port
        unsafe { core::ptr::write_volatile(self.ptr(reg), value) }
    }
}

static PORTS_TAKEN: Mutex<Cell<bool>> = Mutex::new(Cell::new(false));

/// Singleton collection of the memory-mapped port handles
pub struct Ports {
    pub gpioa: MmioPort,
    pub gpiob: MmioPort,
    pub gpioc: MmioPort,
    pub gpiod: MmioPort,
    pub gpioe: MmioPort,
    pub gpiof: MmioPort,
    pub gpiog: MmioPort,
}

impl Ports {
    /// Returns the port handles exactly once. Subsequent calls return [`None`].
    pub fn take() -> Option<Self> {
        critical_section::with(|cs| {
            let taken = PORTS_TAKEN.borrow(cs);
            if taken.get() {
                return None;
            }
            taken.set(true);
            // Safety: Guarded by the flag above
            Some(unsafe { Self::steal() })
        })
    }

    /// Unchecked version of [`Ports::take`]
    ///
    /// # Safety
    ///
    /// Each of the returned handles must be a singleton
    pub unsafe fn steal() -> Self {
        Ports {
            gpioa: MmioPort::new(PortId::A),
            gpiob: MmioPort::new(PortId::B),
            gpioc: MmioPort::new(PortId::C),
            gpiod: MmioPort::new(PortId::D),
            gpioe: MmioPort::new(PortId::E),
            gpiof: MmioPort::new(PortId::F),
            gpiog: MmioPort::new(PortId::G),
        }
    }

    /// Ports in [`PortId`] order, as expected by [`init`](super::init)
    pub fn into_array(self) -> [MmioPort; PortId::COUNT] {
        [
            self.gpioa, self.gpiob, self.gpioc, self.gpiod, self.gpioe, self.gpiof, self.gpiog,
        ]
    }
}

//==================================================================================================
//  SimulatedPort
//==================================================================================================

/// Register file of one port, simulated in RAM
///
/// - [`Register::Bsrr`] writes update the latch atomically, with set requests
///   taking priority over clear requests for the same bit. Reading it returns
///   0.
/// - [`Register::Idr`] is read-only. Pads configured as output read back their
///   latch, all other pads read the levels injected with
///   [`SimulatedPort::drive_inputs`].
/// - Every write is counted per register and stamped with a sequence number,
///   so tests can check the order of register updates.
pub struct SimulatedPort {
    regs: [AtomicU32; Register::COUNT],
    external: AtomicU32,
    writes: [AtomicU32; Register::COUNT],
    stamps: [AtomicU32; Register::COUNT],
    sequence: AtomicU32,
}

impl Default for SimulatedPort {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedPort {
    /// Register file with every register at its reset value of 0
    pub const fn new() -> Self {
        SimulatedPort {
            regs: [const { AtomicU32::new(0) }; Register::COUNT],
            external: AtomicU32::new(0),
            writes: [const { AtomicU32::new(0) }; Register::COUNT],
            stamps: [const { AtomicU32::new(0) }; Register::COUNT],
            sequence: AtomicU32::new(0),
        }
    }

    /// Levels applied to the pads from outside
    pub fn drive_inputs(&self, levels: PortMask) {
        self.external.store(levels & WHOLE_PORT, Ordering::SeqCst);
    }

    /// Register value without going through the port semantics
    pub fn peek(&self, reg: Register) -> u32 {
        self.regs[reg.index()].load(Ordering::SeqCst)
    }

    /// Number of writes issued to `reg`
    pub fn write_count(&self, reg: Register) -> u32 {
        self.writes[reg.index()].load(Ordering::SeqCst)
    }

    /// Sum of writes issued to any register
    pub fn total_writes(&self) -> u32 {
        self.writes
            .iter()
            .map(|count| count.load(Ordering::SeqCst))
            .sum()
    }

    /// Sequence number of the most recent write to `reg`. Later writes have
    /// larger numbers.
    pub fn last_write(&self, reg: Register) -> Option<u32> {
        match self.stamps[reg.index()].load(Ordering::SeqCst) {
            0 => None,
            stamp => Some(stamp),
        }
    }

    pub fn reset_write_counts(&self) {
        for count in self.writes.iter() {
            count.store(0, Ordering::SeqCst);
        }
    }

    /// Bitmask of the pads whose MODER slot selects general purpose output
    fn output_pads(&self) -> u32 {
        let moder = self.peek(Register::Moder);
        (0..16).fold(0, |acc, pad| {
            if (moder >> (2 * pad)) & 0b11 == 0b01 {
                acc | (1 << pad)
            } else {
                acc
            }
        })
    }
}

unsafe impl PortRegisters for SimulatedPort {
    fn read(&self, reg: Register) -> u32 {
        match reg {
            Register::Bsrr => 0,
            Register::Idr => {
                let outputs = self.output_pads();
                let latch = self.peek(Register::Odr);
                let external = self.external.load(Ordering::SeqCst);
                ((latch & outputs) | (external & !outputs)) & WHOLE_PORT
            }
            _ => self.peek(reg),
        }
    }

    fn write(&self, reg: Register, value: u32) {
        self.writes[reg.index()].fetch_add(1, Ordering::SeqCst);
        let stamp = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        self.stamps[reg.index()].store(stamp, Ordering::SeqCst);
        match reg {
            Register::Idr => (),
            Register::Bsrr => {
                let set = value & WHOLE_PORT;
                let clear = (value >> 16) & WHOLE_PORT;
                // A single atomic update, like the hardware
                self.regs[Register::Odr.index()]
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |odr| {
                        Some((odr & !clear) | set)
                    })
                    .ok();
            }
            Register::Odr => {
                self.regs[reg.index()].store(value & WHOLE_PORT, Ordering::SeqCst);
            }
            _ => self.regs[reg.index()].store(value, Ordering::SeqCst),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bsrr_sets_and_clears_in_one_write() {
        let port = SimulatedPort::new();
        port.write(Register::Odr, 0x00F0);
        port.write(Register::Bsrr, (0x0030 << 16) | 0x0001);
        assert_eq!(port.read(Register::Odr), 0x00C1);
        assert_eq!(port.read(Register::Bsrr), 0);
    }

    #[test]
    fn bsrr_set_wins() {
        let port = SimulatedPort::new();
        port.write(Register::Bsrr, (0x0001 << 16) | 0x0001);
        assert_eq!(port.read(Register::Odr), 0x0001);
    }

    #[test]
    fn idr_mixes_latch_and_external_levels() {
        let port = SimulatedPort::new();
        // Pad 0 output, pad 1 input
        port.write(Register::Moder, 0b01);
        port.write(Register::Odr, 0b01);
        port.drive_inputs(0b10);
        assert_eq!(port.read(Register::Idr), 0b11);
        port.drive_inputs(0b01);
        assert_eq!(port.read(Register::Idr), 0b01);
        port.write(Register::Odr, 0);
        assert_eq!(port.read(Register::Idr), 0);
    }

    #[test]
    fn idr_is_read_only() {
        let port = SimulatedPort::new();
        port.write(Register::Idr, 0xFFFF);
        assert_eq!(port.read(Register::Idr), 0);
        assert_eq!(port.write_count(Register::Idr), 1);
    }

    #[test]
    fn ports_can_be_taken_once() {
        assert!(Ports::take().is_some());
        assert!(Ports::take().is_none());
    }

    #[test]
    fn mmio_layout() {
        assert_eq!(Register::Bsrr.offset(), 0x18);
        assert_eq!(Register::Afrh.offset(), 0x24);
        let port = unsafe { MmioPort::new(PortId::C) };
        assert_eq!(port.ptr(Register::Odr) as usize, 0x4002_0814);
    }
}
