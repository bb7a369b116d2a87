use crate::error::{Rc522Error, Result};
use crate::hal::{self, Clock, ResetLine, SystemClock, Transport};
use crate::picc::{Atqa, PiccCommand, Uid, NVB_ANTICOLL};
use crate::register::*;
use log::{debug, info, trace, warn};
use rppal::{gpio::OutputPin, spi::Spi};
use std::time::Duration;

// See Section 8.8.2 - reset pulse and oscillator start-up both fit comfortably in 50ms
const RESET_HOLD: Duration = Duration::from_millis(50);
// Settle time after the SoftReset command
const SOFT_RESET_SETTLE: Duration = Duration::from_millis(50);
// f_timer = 13.56MHz / (2 * 0xD3E + 1) ~= 2kHz, i.e. ~0.5ms per tick
const TIMER_PRESCALER: u16 = 0x0D3E;
// 30 ticks ~= 15ms chip timeout
const TIMER_RELOAD: u16 = 30;
// Our wall clock safety net when waiting for the chip
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(100);
// Max size of FIFO buffer
const MAX_FIFO_BYTES: usize = 64;
// Never drain more than this from the FIFO per response
const MAX_DRAIN_BYTES: usize = 16;

/// Outcome codes reported to pollers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 0,
    Error = 1,
    Timeout = 3,
    /// Reserved for authentication, which this reader never performs
    AuthError = 5,
}

/// Why a transceive did not end in `Status::Ok`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Our own wall clock deadline passed before the chip finished
    Deadline,
    /// `ErrorReg` reported a collision, parity, protocol or overflow error
    ChipErrors(ErrorFlags),
    /// The chip's internal timer expired, usually because no card answered
    ChipTimer,
}

/// What one `communicate` call produced. `data` is empty unless the FIFO was drained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransceiveResult {
    pub status: Status,
    /// Bytes drained from the FIFO, at most 16
    pub data: Vec<u8>,
    /// Number of valid bits received
    pub bit_length: usize,
    /// Internal cause of a non-`Ok` status
    pub fault: Option<Fault>,
}

impl TransceiveResult {
    fn failed(status: Status, fault: Fault) -> TransceiveResult {
        TransceiveResult {
            status,
            data: Vec::new(),
            bit_length: 0,
            fault: Some(fault),
        }
    }
}

/// Valid bits in a received frame, given the FIFO level and `ControlReg` RxLastBits.
/// RxLastBits of zero means the whole last byte is valid.
pub fn received_bit_length(fifo_level: usize, last_bits: usize) -> usize {
    if last_bits != 0 {
        fifo_level.saturating_sub(1) * 8 + last_bits
    } else {
        fifo_level * 8
    }
}

/// Bytes to read out of the FIFO for a given level. One byte is always read.
pub fn drain_count(fifo_level: usize) -> usize {
    fifo_level.clamp(1, MAX_DRAIN_BYTES)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Initialized,
    Closed,
}

/// Where the reader is wired on the Raspberry Pi
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderConfig {
    pub bus: u8,
    pub device: u8,
    /// BCM number of the pin wired to NRSTPD
    pub reset_line: u8,
    /// Trace every register access and transceive
    pub debug: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        ReaderConfig {
            bus: 0,
            device: 0,
            reset_line: 22,
            debug: false,
        }
    }
}

/// An RC522 reader session. It owns the bus and the reset line until `cleanup` or drop.
pub struct Rc522<T: Transport, L: ResetLine, C: Clock = SystemClock> {
    transport: Option<T>,
    reset_line: Option<L>,
    clock: C,
    state: SessionState,
    timeout: Duration,
    debug: bool,
}

impl Rc522<Spi, OutputPin, SystemClock> {
    /// Open the SPI device and reset pin named by `config` and initialize the chip
    pub fn open(config: &ReaderConfig) -> Result<Self> {
        let spi = hal::open_spi(config.bus, config.device)?;
        let reset_line = hal::open_reset_line(config.reset_line)?;

        debug!(
            "opened /dev/spidev{}.{} with reset on BCM{}",
            config.bus, config.device, config.reset_line
        );

        Rc522::new(spi, reset_line, SystemClock::new(), config.debug)
    }
}

impl<T: Transport, L: ResetLine, C: Clock> Rc522<T, L, C> {
    /// Take ownership of the hardware and initialize the chip. On failure everything is
    /// released again before the error is returned.
    pub fn new(transport: T, reset_line: L, clock: C, debug: bool) -> Result<Self> {
        let mut reader = Rc522 {
            transport: Some(transport),
            reset_line: Some(reset_line),
            clock,
            state: SessionState::Uninitialized,
            timeout: DEFAULT_TIMEOUT,
            debug,
        };

        if let Err(err) = reader.initialize() {
            reader.cleanup();
            return Err(err);
        }

        Ok(reader)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Wall clock limit for `request` and `anticoll`
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    fn exchange(&mut self, read_buffer: &mut [u8; 2], write_buffer: &[u8; 2]) -> Result<()> {
        let transport = self.transport.as_mut().ok_or(Rc522Error::Closed)?;
        let transferred = transport.transfer(read_buffer, write_buffer)?;

        if transferred != write_buffer.len() {
            return Err(Rc522Error::ShortTransfer {
                expected: write_buffer.len(),
                actual: transferred,
            });
        }

        Ok(())
    }

    pub fn write(&mut self, reg: Register, value: u8) -> Result<()> {
        // See Section 8.1.2.2 - address byte with MSB cleared, then the value
        let mut read_buffer = [0u8; 2];

        self.exchange(&mut read_buffer, &[reg.write_address(), value])?;

        if self.debug {
            trace!("{:?} <- {:#04x}", reg, value);
        }

        Ok(())
    }

    pub fn read(&mut self, reg: Register) -> Result<u8> {
        // See Section 8.1.2.1 - the zero byte terminates the address list, the value
        // arrives in the second byte
        let mut read_buffer = [0u8; 2];

        self.exchange(&mut read_buffer, &[reg.read_address(), 0])?;

        if self.debug {
            trace!("{:?} -> {:#04x}", reg, read_buffer[1]);
        }

        Ok(read_buffer[1])
    }

    pub fn set_bits(&mut self, reg: Register, mask: u8) -> Result<()> {
        let value = self.read(reg)?;

        self.write(reg, value | mask)
    }

    pub fn clear_bits(&mut self, reg: Register, mask: u8) -> Result<()> {
        let value = self.read(reg)?;

        self.write(reg, value & !mask)
    }

    /// Pulse NRSTPD low. See Section 8.8.1
    pub fn hardware_reset(&mut self) -> Result<()> {
        self.set_reset_line(false)?;
        self.clock.sleep(RESET_HOLD);
        self.set_reset_line(true)?;
        self.clock.sleep(RESET_HOLD);

        Ok(())
    }

    fn set_reset_line(&mut self, high: bool) -> Result<()> {
        self.reset_line
            .as_mut()
            .ok_or(Rc522Error::Closed)?
            .set(high)
    }

    pub fn initialize(&mut self) -> Result<()> {
        if self.state == SessionState::Closed {
            return Err(Rc522Error::Closed);
        }

        self.state = SessionState::Uninitialized;
        self.hardware_reset()?;

        // See Section 9.3.1.2 - soft reset the chip, setting all registers to defaults
        self.write(Register::CommandReg, Command::SoftReset.into())?;
        self.clock.sleep(SOFT_RESET_SETTLE);

        let prescaler_bytes = TIMER_PRESCALER.to_be_bytes();

        // See Section 9.3.3.10:
        // TAuto=1 - timer starts automatically at the end of the transmission
        // TPrescaler_Hi=hh - high 4-bits of prescaler value
        self.write(Register::TModeReg, 0x80 | (prescaler_bytes[0] & 0x0F))?;
        self.write(Register::TPrescalerReg, prescaler_bytes[1])?;

        let reload_bytes = TIMER_RELOAD.to_be_bytes();

        // See Section 9.3.3.11 - timer reload value
        self.write(Register::TReloadRegL, reload_bytes[1])?;
        self.write(Register::TReloadRegH, reload_bytes[0])?;

        // See Section 9.3.2.6 - ForceASK100=1, 100% ASK modulation always
        self.write(Register::TxAskReg, 0x40)?;

        // See Section 9.3.2.2
        // TxWaitRF=1 - transmitter can only be started if RF field is generated
        // CRCPreset=01 - CRC coprocessor preset value is 0x6363 (ISO 14443-3 part 6.2.4)
        self.write(Register::ModeReg, 0x3D)?;

        self.antenna_on()?;

        self.state = SessionState::Initialized;
        info!("RC522 initialized");

        Ok(())
    }

    /// Output the 13.56MHz carrier on TX1 and TX2. See Section 9.3.2.5
    pub fn antenna_on(&mut self) -> Result<()> {
        let value = self.read(Register::TxControlReg)?;

        // Leave a running field alone
        if value & ANTENNA_DRIVERS != ANTENNA_DRIVERS {
            self.set_bits(Register::TxControlReg, ANTENNA_DRIVERS)?;
        }

        Ok(())
    }

    /// Chip version, 0x91 or 0x92 for genuine MFRC522 parts. See Section 9.3.4.8
    pub fn version(&mut self) -> Result<u8> {
        self.read(Register::VersionReg)
    }

    /// Park the chip in reset and release the bus and reset line. Safe to call repeatedly.
    pub fn cleanup(&mut self) {
        if self.state == SessionState::Initialized {
            if let Err(err) = self.hardware_reset() {
                warn!("RC522 reset during cleanup failed: {}", err);
            }
        }

        let mut released = false;

        if let Some(mut reset_line) = self.reset_line.take() {
            reset_line.release();
            released = true;
        }

        if let Some(mut transport) = self.transport.take() {
            transport.close();
            released = true;
        }

        self.state = SessionState::Closed;

        if released {
            info!("RC522 resources released");
        }
    }

    fn ensure_initialized(&self) -> Result<()> {
        match self.state {
            SessionState::Initialized => Ok(()),
            SessionState::Uninitialized => Err(Rc522Error::NotInitialized),
            SessionState::Closed => Err(Rc522Error::Closed),
        }
    }

    /// Run `command` on the chip with `send_frame` loaded into the FIFO and collect the answer.
    /// Recoverable failures are reported in the result status; `Err` means the bus failed or
    /// the session is not initialized.
    pub fn communicate(
        &mut self,
        command: Command,
        send_frame: &[u8],
        timeout: Duration,
    ) -> Result<TransceiveResult> {
        self.ensure_initialized()?;

        if send_frame.len() > MAX_FIFO_BYTES {
            return Err(Rc522Error::FrameTooLong(send_frame.len()));
        }

        // See Section 9.3.1.2 - idle, canceling outstanding commands
        self.write(Register::CommandReg, Command::Idle.into())?;
        // See Section 9.3.1.5 - clear all IRQ bits
        self.write(Register::ComIrqReg, ComIrq::CLEAR_ALL)?;
        // See Section 9.3.1.11 - flush the FIFO buffer
        self.set_bits(Register::FifoLevelReg, FIFO_FLUSH)?;

        for byte in send_frame {
            self.write(Register::FifoDataReg, *byte)?;
        }

        self.write(Register::CommandReg, command.into())?;

        if command == Command::Transceive {
            // See Section 9.3.1.14 - start data transmission
            self.set_bits(Register::BitFramingReg, START_SEND)?;
        }

        let polled = self.wait_for_done(timeout);
        // StartSend must not stay set, even when polling failed
        let stopped = self.clear_bits(Register::BitFramingReg, START_SEND);
        let irq = polled?;

        stopped?;

        let irq = match irq {
            Some(irq) => irq,
            None => {
                if self.debug {
                    debug!("{:?} timed out after {:?}", command, timeout);
                }
                return Ok(TransceiveResult::failed(Status::Timeout, Fault::Deadline));
            }
        };

        let errors =
            ErrorFlags::from_bits_retain(self.read(Register::ErrorReg)?) & ErrorFlags::FATAL;

        if !errors.is_empty() {
            if self.debug {
                debug!("{:?} failed with {:?}", command, errors);
            }
            return Ok(TransceiveResult::failed(
                Status::Error,
                Fault::ChipErrors(errors),
            ));
        }

        let mut result = TransceiveResult {
            status: Status::Ok,
            data: Vec::new(),
            bit_length: 0,
            fault: None,
        };

        if irq.contains(ComIrq::TIMER) {
            result.status = Status::Error;
            result.fault = Some(Fault::ChipTimer);
        }

        if command == Command::Transceive {
            // See Section 9.3.1.11 - bit 7 is write only
            let fifo_level = (self.read(Register::FifoLevelReg)? & 0x7F) as usize;
            // See Section 9.3.1.13 - valid bits in the last received byte
            let last_bits = (self.read(Register::ControlReg)? & RX_LAST_BITS) as usize;

            result.bit_length = received_bit_length(fifo_level, last_bits);

            let count = drain_count(fifo_level);

            result.data.reserve(count);

            for _ in 0..count {
                result.data.push(self.read(Register::FifoDataReg)?);
            }
        }

        if self.debug {
            debug!(
                "{:?} {:02x?} -> {:?} {:02x?} ({} bits)",
                command, send_frame, result.status, result.data, result.bit_length
            );
        }

        Ok(result)
    }

    /// Poll `ComIrqReg` until RxIRq or IdleIRq is raised. `None` means the deadline passed.
    fn wait_for_done(&mut self, timeout: Duration) -> Result<Option<ComIrq>> {
        let start = self.clock.now();

        while self.clock.now().saturating_sub(start) < timeout {
            let irq = ComIrq::from_bits_retain(self.read(Register::ComIrqReg)?);

            if irq.intersects(ComIrq::DONE) {
                return Ok(Some(irq));
            }
        }

        Ok(None)
    }

    /// Send REQA to any card in the field. A card answers with its ATQA.
    /// No card and a garbled answer both come back as `Status::Error`.
    pub fn request(&mut self) -> Result<(Status, Option<Atqa>)> {
        self.ensure_initialized()?;

        // See Section 9.3.1.14 - REQA is a short frame of 7 bits
        self.write(Register::BitFramingReg, 0x07)?;

        let result = self.communicate(
            Command::Transceive,
            &[PiccCommand::ReqA.into()],
            self.timeout,
        )?;

        if result.status != Status::Ok {
            return Ok((Status::Error, None));
        }

        Ok(match Atqa::from_response(&result.data) {
            Some(atqa) => (Status::Ok, Some(atqa)),
            None => (Status::Error, None),
        })
    }

    /// Cascade level 1 anticollision. Returns the UID only when its BCC checks out.
    pub fn anticoll(&mut self) -> Result<(Status, Option<Uid>)> {
        self.ensure_initialized()?;

        // All 8 bits of the last byte are transmitted
        self.write(Register::BitFramingReg, 0x00)?;

        let result = self.communicate(
            Command::Transceive,
            &[PiccCommand::SelCl1.into(), NVB_ANTICOLL],
            self.timeout,
        )?;

        if result.status != Status::Ok {
            return Ok((Status::Error, None));
        }

        match Uid::from_response(&result.data) {
            Some(uid) => Ok((Status::Ok, Some(uid))),
            None => {
                if self.debug {
                    debug!("rejected anticollision response {:02x?}", result.data);
                }
                Ok((Status::Error, None))
            }
        }
    }
}

impl<T: Transport, L: ResetLine, C: Clock> Drop for Rc522<T, L, C> {
    fn drop(&mut self) {
        self.cleanup();
    }
}
