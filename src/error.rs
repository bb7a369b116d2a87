use thiserror::Error;

#[derive(Debug, Error)]
pub enum Rc522Error {
    #[error("SPI error: {0}")]
    Spi(#[from] rppal::spi::Error),
    #[error("GPIO error: {0}")]
    Gpio(#[from] rppal::gpio::Error),
    #[error("SPI bus {0} is not supported")]
    UnsupportedBus(u8),
    #[error("SPI device {0} is not supported")]
    UnsupportedDevice(u8),
    #[error("short SPI transfer: expected {expected} bytes, got {actual}")]
    ShortTransfer { expected: usize, actual: usize },
    #[error("frame of {0} bytes does not fit the 64 byte FIFO")]
    FrameTooLong(usize),
    #[error("reader is not initialized")]
    NotInitialized,
    #[error("reader has been closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, Rc522Error>;
