//! # Start-up configuration of all ports
//!
//! The board describes the reset state of every port in a
//! [`GlobalPortConfig`], usually a `const` table. [`init`] applies the table
//! once and hands out the configured [`Port`]s. Port handles only exist after
//! their snapshot was applied, so no port operation can run before
//! initialization.
//!
//! ```
//! use stm32l1_pal::gpio::{init, GlobalPortConfig, PortId, PortSnapshot, SimulatedPort};
//!
//! const BOARD: GlobalPortConfig<2> = GlobalPortConfig::new([
//!     // PA5 push-pull output, initially high
//!     PortSnapshot::new(0x0000_0400, 0, 0, 0, 0x0020),
//!     PortSnapshot::RESET,
//! ]);
//!
//! let pal = init(&BOARD, [SimulatedPort::new(), SimulatedPort::new()]);
//! assert_eq!(pal.port(PortId::A).unwrap().read_latch(), 0x0020);
//! assert!(pal.port(PortId::C).is_none());
//! ```
use super::port::{Port, PortId};
use super::reg::{PortRegisters, Register};

/// Register values of one port
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PortSnapshot {
    pub moder: u32,
    pub otyper: u32,
    pub ospeedr: u32,
    pub pupdr: u32,
    pub odr: u32,
    pub afrl: u32,
    pub afrh: u32,
}

impl PortSnapshot {
    /// Reset values: all pads floating inputs
    pub const RESET: PortSnapshot = PortSnapshot::new(0, 0, 0, 0, 0);

    /// Port A with PA13 (SWDIO, pull-up) and PA14 (SWCLK, pull-down) left on
    /// the debug port function, all other pads floating inputs
    pub const SWD_PORT_A: PortSnapshot = PortSnapshot::new(0x2800_0000, 0, 0, 0x2400_0000, 0);

    /// Snapshot with the alternate function registers at their reset value
    pub const fn new(moder: u32, otyper: u32, ospeedr: u32, pupdr: u32, odr: u32) -> Self {
        PortSnapshot {
            moder,
            otyper,
            ospeedr,
            pupdr,
            odr,
            afrl: 0,
            afrh: 0,
        }
    }

    /// Also load the alternate function registers
    pub const fn with_alternate(mut self, afrl: u32, afrh: u32) -> Self {
        self.afrl = afrl;
        self.afrh = afrh;
        self
    }
}

impl Default for PortSnapshot {
    fn default() -> Self {
        Self::RESET
    }
}

/// Snapshots for the first `N` ports, in [`PortId`] order
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct GlobalPortConfig<const N: usize> {
    ports: [PortSnapshot; N],
}

impl<const N: usize> GlobalPortConfig<N> {
    /// Panics if `N` is 0 or larger than [`PortId::COUNT`]. Used in a `const`,
    /// this is a compile-time error.
    pub const fn new(ports: [PortSnapshot; N]) -> Self {
        assert!(N > 0 && N <= PortId::COUNT, "invalid number of ports");
        GlobalPortConfig { ports }
    }

    #[inline]
    pub const fn snapshot(&self, id: PortId) -> Option<&PortSnapshot> {
        if id.index() < N {
            Some(&self.ports[id.index()])
        } else {
            None
        }
    }

    #[inline]
    pub fn snapshots(&self) -> &[PortSnapshot; N] {
        &self.ports
    }
}

impl GlobalPortConfig<{ PortId::COUNT }> {
    /// Every port at its reset snapshot
    pub const RESET: Self = GlobalPortConfig::new([PortSnapshot::RESET; PortId::COUNT]);
}

impl<R: PortRegisters> Port<R> {
    /// Take control of a single port and apply its start-up snapshot
    pub fn configure(id: PortId, regs: R, snapshot: &PortSnapshot) -> Self {
        let port = Port::new(id, regs);
        port.load(snapshot);
        port
    }

    /// The latch is written before any configuration register and MODER comes
    /// last, so pads switching to output drive their configured level right
    /// away.
    fn load(&self, snapshot: &PortSnapshot) {
        debug!(
            "port {}: moder={=u32:#010x} otyper={=u32:#06x} ospeedr={=u32:#010x} pupdr={=u32:#010x} odr={=u32:#06x}",
            self.id(),
            snapshot.moder,
            snapshot.otyper,
            snapshot.ospeedr,
            snapshot.pupdr,
            snapshot.odr
        );
        let regs = self.registers();
        regs.write(Register::Odr, snapshot.odr);
        regs.write(Register::Otyper, snapshot.otyper);
        regs.write(Register::Ospeedr, snapshot.ospeedr);
        regs.write(Register::Pupdr, snapshot.pupdr);
        regs.write(Register::Afrl, snapshot.afrl);
        regs.write(Register::Afrh, snapshot.afrh);
        regs.write(Register::Moder, snapshot.moder);
    }
}

/// The configured ports of the target
pub struct Pal<R: PortRegisters, const N: usize> {
    ports: [Port<R>; N],
}

impl<R: PortRegisters, const N: usize> Pal<R, N> {
    /// Ports beyond the configured count return [`None`]
    #[inline]
    pub fn port(&self, id: PortId) -> Option<&Port<R>> {
        self.ports.get(id.index())
    }

    #[inline]
    pub fn port_mut(&mut self, id: PortId) -> Option<&mut Port<R>> {
        self.ports.get_mut(id.index())
    }

    #[inline]
    pub fn ports(&self) -> &[Port<R>; N] {
        &self.ports
    }

    #[inline]
    pub fn into_ports(self) -> [Port<R>; N] {
        self.ports
    }
}

/// Apply `config` to the register handles of the first `N` ports
///
/// `regs[i]` must belong to the port with index `i`. Consuming the handles
/// makes sure the table is applied once, before any other port operation.
pub fn init<R: PortRegisters, const N: usize>(
    config: &GlobalPortConfig<N>,
    regs: [R; N],
) -> Pal<R, N> {
    let mut index = 0;
    let ports = regs.map(|regs| {
        // N never exceeds PortId::COUNT, see GlobalPortConfig::new
        let id = PortId::ALL[index];
        let port = Port::configure(id, regs, &config.ports[index]);
        index += 1;
        port
    });
    Pal { ports }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpio::{SimulatedPort, PUSH_PULL_OUTPUT};

    const CONFIG: GlobalPortConfig<3> = GlobalPortConfig::new([
        PortSnapshot::new(0x5555_5555, 0x00FF, 0xFFFF_FFFF, 0, 0xA5A5),
        PortSnapshot::new(0, 0, 0, 0x5555_5555, 0xFFFF),
        PortSnapshot::new(0xA000_0000, 0x8000, 0, 0, 0).with_alternate(0, 0x7700_0000),
    ]);

    fn simulated() -> [SimulatedPort; 3] {
        [SimulatedPort::new(), SimulatedPort::new(), SimulatedPort::new()]
    }

    #[test]
    fn loads_every_register() {
        let pal = init(&CONFIG, simulated());
        for (port, snapshot) in pal.ports().iter().zip(CONFIG.snapshots()) {
            let regs = port.registers();
            assert_eq!(regs.peek(Register::Moder), snapshot.moder);
            assert_eq!(regs.peek(Register::Otyper), snapshot.otyper);
            assert_eq!(regs.peek(Register::Ospeedr), snapshot.ospeedr);
            assert_eq!(regs.peek(Register::Pupdr), snapshot.pupdr);
            assert_eq!(regs.peek(Register::Odr), snapshot.odr);
            assert_eq!(regs.peek(Register::Afrl), snapshot.afrl);
            assert_eq!(regs.peek(Register::Afrh), snapshot.afrh);
        }
        assert_eq!(
            pal.port(PortId::C).unwrap().pad_mode(15),
            crate::gpio::open_drain_alternate(crate::gpio::AF7)
        );
    }

    #[test]
    fn latch_before_direction() {
        let pal = init(&CONFIG, simulated());
        let regs = pal.port(PortId::A).unwrap().registers();
        let odr = regs.last_write(Register::Odr).unwrap();
        let moder = regs.last_write(Register::Moder).unwrap();
        assert!(odr < moder);
        for reg in [
            Register::Otyper,
            Register::Ospeedr,
            Register::Pupdr,
            Register::Afrl,
            Register::Afrh,
        ] {
            assert!(regs.last_write(reg).unwrap() < moder);
        }
        // Outputs drive the configured level immediately
        assert_eq!(pal.port(PortId::A).unwrap().read_port(), 0xA5A5);
    }

    #[test]
    fn ports_are_ordered_and_bounded() {
        let mut pal = init(&CONFIG, simulated());
        assert_eq!(pal.port(PortId::A).unwrap().id(), PortId::A);
        assert_eq!(pal.port(PortId::C).unwrap().id(), PortId::C);
        assert!(pal.port(PortId::D).is_none());
        assert!(pal.port_mut(PortId::G).is_none());
        assert!(CONFIG.snapshot(PortId::D).is_none());

        let portb = pal.port_mut(PortId::B).unwrap();
        portb.set_pad_mode(0, PUSH_PULL_OUTPUT);
        assert_eq!(portb.read_pad(0), crate::gpio::PinState::High);
    }

    #[test]
    fn configure_single_port() {
        let snapshot = PortSnapshot::new(0x1, 0, 0, 0, 0x1);
        let port = Port::configure(PortId::E, SimulatedPort::new(), &snapshot);
        assert_eq!(port.id(), PortId::E);
        assert_eq!(port.read_port(), 0x1);
        assert_eq!(port.registers().total_writes(), 7);
    }

    #[test]
    fn reset_table_covers_every_port() {
        let config = GlobalPortConfig::<{ PortId::COUNT }>::RESET;
        assert_eq!(config.snapshots().len(), PortId::COUNT);
        for id in PortId::ALL {
            assert_eq!(config.snapshot(id), Some(&PortSnapshot::RESET));
        }
        let pal = init(&config, core::array::from_fn(|_| SimulatedPort::new()));
        assert_eq!(pal.port(PortId::G).unwrap().pad_mode(0), crate::gpio::RESET);
    }

    #[test]
    fn debug_pads_stay_on_alternate_function() {
        let pal = init(&GlobalPortConfig::new([PortSnapshot::SWD_PORT_A]), [SimulatedPort::new()]);
        let porta = pal.port(PortId::A).unwrap();
        for pad in [13, 14] {
            let mode = porta.pad_mode(pad);
            assert_eq!(mode.direction(), crate::gpio::Direction::Alternate);
            assert_eq!(mode.alternate_function(), crate::gpio::AF0);
        }
        assert_eq!(porta.pad_mode(13).pull(), crate::gpio::Pull::PullUp);
        assert_eq!(porta.pad_mode(14).pull(), crate::gpio::Pull::PullDown);
        assert_eq!(porta.pad_mode(15), crate::gpio::RESET);
    }

    #[test]
    #[should_panic]
    fn rejects_empty_config() {
        let _ = GlobalPortConfig::<0>::new([]);
    }
}
