//! Simple blinky example
//!
//! Blinks the user LED LD2 of the NUCLEO-L152RE board, which is connected to
//! PA5. The GPIO clocks need to be enabled in RCC_AHBENR before the port
//! table is applied, this is done right at the start.
#![no_main]
#![no_std]

use cortex_m_rt::entry;
use panic_halt as _;
use stm32l1_pal::{
    gpio::{init, GlobalPortConfig, PortId, PortSnapshot, Ports, PUSH_PULL_OUTPUT},
    prelude::*,
};

const RCC_AHBENR: *mut u32 = 0x4002_381C as *mut u32;

const BOARD: GlobalPortConfig<3> = GlobalPortConfig::new([
    // PA2 and PA3 are the ST-LINK virtual COM port (AF7), PA5 is LD2.
    // PA13 and PA14 stay on the debug port.
    PortSnapshot::new(0x2800_04A0, 0, 0x0000_00F0, 0x2400_0040, 0).with_alternate(0x0000_7700, 0),
    PortSnapshot::RESET,
    // PC13 is the user button B1, which has an external pull-up
    PortSnapshot::RESET,
]);

#[entry]
fn main() -> ! {
    // Enable GPIOA, GPIOB and GPIOC
    unsafe { RCC_AHBENR.write_volatile(RCC_AHBENR.read_volatile() | 0b111) };
    let ports = Ports::take().unwrap().into_array();
    let [gpioa, gpiob, gpioc, ..] = ports;
    let mut pal = init(&BOARD, [gpioa, gpiob, gpioc]);

    // Drive PB8 and PB9 as well, they are routed to the Arduino header
    let portb = pal.port_mut(PortId::B).unwrap();
    portb.set_group_mode(0b11 << 8, PUSH_PULL_OUTPUT);
    portb.write_group(0b11, 8, 0b01);

    let porta = pal.port(PortId::A).unwrap();
    let mut led = porta.pad(5).unwrap();
    for _ in 0..10 {
        led.set_low().ok();
        cortex_m::asm::delay(2_000_000);
        led.set_high().ok();
        cortex_m::asm::delay(2_000_000);
    }
    let portb = pal.port(PortId::B).unwrap();
    loop {
        led.toggle().ok();
        portb.toggle_pad(8);
        portb.toggle_pad(9);
        cortex_m::asm::delay(2_000_000);
    }
}
