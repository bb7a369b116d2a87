//! Simulated RC522 for unit tests. The bench state is shared between the reader under test
//! and the test body so that register traffic can be scripted and inspected.

use crate::error::{Rc522Error, Result};
use crate::hal::{Clock, ResetLine, Transport};
use crate::register::Register;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read(u8),
    Write(u8, u8),
}

#[derive(Debug)]
pub struct Bench {
    /// Last value written to each register
    pub regs: [u8; 64],
    /// Every register access, in bus order
    pub log: Vec<Access>,
    /// Bytes clocked into the FIFO since the last flush
    pub fifo_in: Vec<u8>,
    /// Bytes returned by FIFO reads
    pub response: VecDeque<u8>,
    /// Card answers loaded one per Transceive command; `None` is a silent field
    pub script: VecDeque<Option<Vec<u8>>>,
    /// Overrides `response.len()` as the value of `FifoLevelReg`
    pub fifo_level: Option<u8>,
    pub com_irq: u8,
    pub error: u8,
    pub control: u8,
    pub version: u8,
    /// Fail every transfer after this many have succeeded
    pub fail_after: Option<usize>,
    /// Return one byte less than requested from every transfer
    pub short_transfers: bool,
    pub transfers: usize,
    pub reset_levels: Vec<bool>,
    pub line_released: bool,
    pub transport_closed: bool,
    pub now: Duration,
    /// How far the clock moves on every `now()` call
    pub tick: Duration,
    pub slept: Vec<Duration>,
}

impl Default for Bench {
    fn default() -> Self {
        Bench {
            regs: [0; 64],
            log: Vec::new(),
            fifo_in: Vec::new(),
            response: VecDeque::new(),
            script: VecDeque::new(),
            fifo_level: None,
            com_irq: 0,
            error: 0,
            control: 0,
            version: 0x92,
            fail_after: None,
            short_transfers: false,
            transfers: 0,
            reset_levels: Vec::new(),
            line_released: false,
            transport_closed: false,
            now: Duration::ZERO,
            tick: Duration::from_millis(1),
            slept: Vec::new(),
        }
    }
}

impl Bench {
    /// Simulate a card answering with `bytes` and the chip reporting completion
    pub fn answer(&mut self, bytes: &[u8]) {
        self.response = bytes.iter().copied().collect();
        self.com_irq = 0x30;
    }

    pub fn script(&mut self, answers: Vec<Option<Vec<u8>>>) {
        self.script = answers.into();
    }

    pub fn reg(&self, reg: Register) -> u8 {
        self.regs[reg.address() as usize]
    }

    pub fn writes_to(&self, reg: Register) -> Vec<u8> {
        self.log
            .iter()
            .filter_map(|access| match *access {
                Access::Write(addr, value) if addr == reg.address() => Some(value),
                _ => None,
            })
            .collect()
    }

    pub fn reads_of(&self, reg: Register) -> usize {
        self.log
            .iter()
            .filter(|access| **access == Access::Read(reg.address()))
            .count()
    }

    fn read_register(&mut self, addr: u8) -> u8 {
        match addr {
            a if a == Register::ComIrqReg.address() => self.com_irq,
            a if a == Register::ErrorReg.address() => self.error,
            a if a == Register::ControlReg.address() => self.control,
            a if a == Register::VersionReg.address() => self.version,
            a if a == Register::FifoLevelReg.address() => self
                .fifo_level
                .unwrap_or(self.response.len() as u8),
            a if a == Register::FifoDataReg.address() => self.response.pop_front().unwrap_or(0),
            a => self.regs[a as usize],
        }
    }

    fn write_register(&mut self, addr: u8, value: u8) {
        if addr == Register::FifoDataReg.address() {
            self.fifo_in.push(value);
        } else if addr == Register::FifoLevelReg.address() && value & 0x80 != 0 {
            self.fifo_in.clear();
        } else if addr == Register::CommandReg.address() && value == 0x0C {
            match self.script.pop_front() {
                Some(Some(bytes)) => self.answer(&bytes),
                Some(None) => {
                    self.response.clear();
                    self.com_irq = 0;
                }
                None => {}
            }
        }

        self.regs[addr as usize] = value;
    }
}

pub type SharedBench = Rc<RefCell<Bench>>;

pub struct MockChip(pub SharedBench);
pub struct MockResetLine(pub SharedBench);
pub struct MockClock(pub SharedBench);

impl Transport for MockChip {
    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<usize> {
        let mut bench = self.0.borrow_mut();

        if let Some(limit) = bench.fail_after {
            if bench.transfers >= limit {
                let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "bus unplugged");
                return Err(Rc522Error::Spi(rppal::spi::Error::Io(io)));
            }
        }

        bench.transfers += 1;

        let addr = (write[0] >> 1) & 0x3F;

        if write[0] & 0x80 != 0 {
            bench.log.push(Access::Read(addr));
            read[1] = bench.read_register(addr);
        } else {
            bench.log.push(Access::Write(addr, write[1]));
            bench.write_register(addr, write[1]);
        }

        if bench.short_transfers {
            Ok(write.len() - 1)
        } else {
            Ok(write.len())
        }
    }

    fn close(&mut self) {
        self.0.borrow_mut().transport_closed = true;
    }
}

impl ResetLine for MockResetLine {
    fn set(&mut self, high: bool) -> Result<()> {
        self.0.borrow_mut().reset_levels.push(high);

        Ok(())
    }

    fn release(&mut self) {
        self.0.borrow_mut().line_released = true;
    }
}

impl Clock for MockClock {
    fn now(&mut self) -> Duration {
        let mut bench = self.0.borrow_mut();
        let now = bench.now;
        let tick = bench.tick;

        bench.now += tick;

        now
    }

    fn sleep(&mut self, duration: Duration) {
        let mut bench = self.0.borrow_mut();

        bench.now += duration;
        bench.slept.push(duration);
    }
}

pub fn bench() -> SharedBench {
    Rc::new(RefCell::new(Bench::default()))
}

pub fn parts(bench: &SharedBench) -> (MockChip, MockResetLine, MockClock) {
    (
        MockChip(bench.clone()),
        MockResetLine(bench.clone()),
        MockClock(bench.clone()),
    )
}
