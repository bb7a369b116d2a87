mod cancellation_token;
mod error;
pub mod hal;
mod log_macros;
#[cfg(test)]
mod mock;
pub mod picc;
mod rc522;
pub mod register;
mod tracker;

pub use crate::error::{Rc522Error, Result};
pub use crate::rc522::{
    drain_count, received_bit_length, Fault, Rc522, ReaderConfig, SessionState, Status,
    TransceiveResult, DEFAULT_TIMEOUT,
};
pub use crate::tracker::{CardEvent, UidTracker};
pub use cancellation_token::CancellationToken;
use clap::Parser;
use core::fmt::Arguments;
use log::LevelFilter;
use std::error::Error;
use std::time::Duration;

// Chip versions reported by genuine MFRC522 parts
const KNOWN_VERSIONS: [u8; 2] = [0x91, 0x92];

pub trait Rc522Log {
    fn output(self: &Self, args: Arguments);
    fn warning(self: &Self, args: Arguments);
    fn error(self: &Self, args: Arguments);
    /// Turn colored output on or off
    fn use_color(self: &Self, _enabled: bool) {}
}

pub struct RppalRc522Tool<'a> {
    log: &'a dyn Rc522Log,
}

#[derive(Parser)]
#[clap(version, about, long_about = None)]
struct Cli {
    /// Disable colors in output
    #[arg(long = "no-color", short = 'n', env = "NO_CLI_COLOR")]
    no_color: bool,
    /// SPI bus the reader is attached to
    #[arg(
        long,
        short = 'b',
        default_value_t = 0,
        value_parser = clap::value_parser!(u8).range(0..=6)
    )]
    bus: u8,
    /// SPI chip select of the reader
    #[arg(
        long,
        short = 'd',
        default_value_t = 0,
        value_parser = clap::value_parser!(u8).range(0..=15)
    )]
    device: u8,
    /// BCM pin wired to the reader's RST pin
    #[arg(
        long = "reset",
        short = 'r',
        default_value_t = 22,
        value_parser = clap::value_parser!(u8).range(1..=27)
    )]
    reset_pin: u8,
    /// Milliseconds between polls
    #[arg(long, short = 'i', default_value_t = 200)]
    interval: u64,
    /// Log chip traffic to stderr
    #[arg(long)]
    debug: bool,
}

impl<'a> RppalRc522Tool<'a> {
    pub fn new(log: &'a dyn Rc522Log) -> RppalRc522Tool<'a> {
        RppalRc522Tool { log }
    }

    pub fn run(
        self: &mut Self,
        args: impl IntoIterator<Item = std::ffi::OsString>,
    ) -> std::result::Result<(), Box<dyn Error>> {
        let cli = match Cli::try_parse_from(args) {
            Ok(m) => m,
            Err(err) => {
                output!(self.log, "{}", err.to_string());
                return Ok(());
            }
        };

        self.log.use_color(!cli.no_color);

        let mut logger = env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or("warn"),
        );

        if cli.debug {
            logger.filter_module("rppal_rc522", LevelFilter::Debug);
        }

        // A second run in the same process keeps the first logger
        let _ = logger.try_init();

        let token = CancellationToken::new();
        let token_clone = token.clone();

        ctrlc::set_handler(move || {
            eprintln!("Ctrl+C received, stopping...");
            token_clone.cancel();
        })?;

        let config = ReaderConfig {
            bus: cli.bus,
            device: cli.device,
            reset_line: cli.reset_pin,
            debug: cli.debug,
        };
        let mut reader = Rc522::open(&config)?;
        let version = reader.version()?;

        output!(self.log, "Reader version: {:#04x}", version);

        if !KNOWN_VERSIONS.contains(&version) {
            warning!(
                self.log,
                "unexpected chip version {:#04x}, check the wiring",
                version
            );
        }

        output!(self.log, "Hold a card near the reader. Press Ctrl+C to exit.");

        let polled = self.poll(&mut reader, &token, Duration::from_millis(cli.interval));

        reader.cleanup();
        output!(self.log, "Reader resources released");

        Ok(polled?)
    }

    fn poll(
        &self,
        reader: &mut Rc522<rppal::spi::Spi, rppal::gpio::OutputPin>,
        token: &CancellationToken,
        interval: Duration,
    ) -> Result<()> {
        let mut tracker = UidTracker::new();

        while !token.is_canceled() {
            match tracker.poll(reader)? {
                CardEvent::Arrived(uid) => output!(self.log, "Card detected! UID: {}", uid),
                CardEvent::Removed => {
                    output!(self.log, "Card removed. Ready for the next card.")
                }
                CardEvent::Unchanged => (),
            }

            if token.sleep(interval) {
                break;
            }
        }

        Ok(())
    }
}
