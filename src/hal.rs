use crate::error::{Rc522Error, Result};
use rppal::{
    gpio::{Gpio, OutputPin},
    spi::{Bus, Mode, SlaveSelect, Spi},
};
use std::thread;
use std::time::{Duration, Instant};

// See Section 8.1.2 - the chip handles up to 10Mbit/s but long jumper wires do not
pub const SPI_CLOCK_HZ: u32 = 1_000_000;

/// Full duplex byte exchange with the reader chip
pub trait Transport {
    /// Clock out `write` while filling `read`, returning how many bytes were exchanged
    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<usize>;

    /// Called once before the transport is dropped
    fn close(&mut self) {}
}

/// The digital output wired to the chip's NRSTPD pin
pub trait ResetLine {
    fn set(&mut self, high: bool) -> Result<()>;

    /// Called once before the line is dropped
    fn release(&mut self) {}
}

/// Monotonic time source, injectable so that timeouts can be simulated
pub trait Clock {
    /// Time elapsed since an arbitrary fixed origin
    fn now(&mut self) -> Duration;

    fn sleep(&mut self, duration: Duration);
}

impl Transport for Spi {
    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<usize> {
        Ok(Spi::transfer(self, read, write)?)
    }
}

impl ResetLine for OutputPin {
    fn set(&mut self, high: bool) -> Result<()> {
        if high {
            self.set_high();
        } else {
            self.set_low();
        }

        Ok(())
    }
}

pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> SystemClock {
        SystemClock {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        SystemClock::new()
    }
}

impl Clock for SystemClock {
    fn now(&mut self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Open `/dev/spidev<bus>.<device>` in mode 0 (CPOL=0, CPHA=0, MSB first)
pub fn open_spi(bus: u8, device: u8) -> Result<Spi> {
    let bus = match bus {
        0 => Bus::Spi0,
        1 => Bus::Spi1,
        2 => Bus::Spi2,
        3 => Bus::Spi3,
        4 => Bus::Spi4,
        5 => Bus::Spi5,
        6 => Bus::Spi6,
        other => return Err(Rc522Error::UnsupportedBus(other)),
    };
    let slave_select = match device {
        0 => SlaveSelect::Ss0,
        1 => SlaveSelect::Ss1,
        2 => SlaveSelect::Ss2,
        3 => SlaveSelect::Ss3,
        4 => SlaveSelect::Ss4,
        5 => SlaveSelect::Ss5,
        6 => SlaveSelect::Ss6,
        7 => SlaveSelect::Ss7,
        8 => SlaveSelect::Ss8,
        9 => SlaveSelect::Ss9,
        10 => SlaveSelect::Ss10,
        11 => SlaveSelect::Ss11,
        12 => SlaveSelect::Ss12,
        13 => SlaveSelect::Ss13,
        14 => SlaveSelect::Ss14,
        15 => SlaveSelect::Ss15,
        other => return Err(Rc522Error::UnsupportedDevice(other)),
    };

    Ok(Spi::new(bus, slave_select, SPI_CLOCK_HZ, Mode::Mode0)?)
}

/// Claim a BCM numbered pin as the reset output. The pin mode is restored when it is dropped.
pub fn open_reset_line(bcm_pin: u8) -> Result<OutputPin> {
    Ok(Gpio::new()?.get(bcm_pin)?.into_output_high())
}
