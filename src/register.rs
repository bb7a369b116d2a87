use bitflags::bitflags;

/// RC522 register map. See Section 9.2 of the MFRC522 datasheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Register {
    // Command and status
    CommandReg = 0x01,
    ComIEnReg = 0x02,
    DivIEnReg = 0x03,
    ComIrqReg = 0x04,
    DivIrqReg = 0x05,
    ErrorReg = 0x06,
    Status1Reg = 0x07,
    Status2Reg = 0x08,
    FifoDataReg = 0x09,
    FifoLevelReg = 0x0A,
    WaterLevelReg = 0x0B,
    ControlReg = 0x0C,
    BitFramingReg = 0x0D,
    CollReg = 0x0E,
    // Command configuration
    ModeReg = 0x11,
    TxModeReg = 0x12,
    RxModeReg = 0x13,
    TxControlReg = 0x14,
    TxAskReg = 0x15,
    TxSelReg = 0x16,
    RxSelReg = 0x17,
    RxThresholdReg = 0x18,
    DemodReg = 0x19,
    MfTxReg = 0x1C,
    MfRxReg = 0x1D,
    SerialSpeedReg = 0x1F,
    // Configuration
    CrcResultRegH = 0x21,
    CrcResultRegL = 0x22,
    ModWidthReg = 0x24,
    RfCfgReg = 0x26,
    GsNReg = 0x27,
    CwGsPReg = 0x28,
    ModGsPReg = 0x29,
    TModeReg = 0x2A,
    TPrescalerReg = 0x2B,
    TReloadRegH = 0x2C,
    TReloadRegL = 0x2D,
    TCounterValRegH = 0x2E,
    TCounterValRegL = 0x2F,
    // Test
    TestSel1Reg = 0x31,
    TestSel2Reg = 0x32,
    TestPinEnReg = 0x33,
    TestPinValueReg = 0x34,
    TestBusReg = 0x35,
    AutoTestReg = 0x36,
    VersionReg = 0x37,
    AnalogTestReg = 0x38,
    TestDac1Reg = 0x39,
    TestDac2Reg = 0x3A,
    TestAdcReg = 0x3B,
}

impl Register {
    /// Register address
    pub fn address(self) -> u8 {
        self as u8
    }

    /// First SPI byte when reading. See Section 8.1.2.3 - MSB set, LSB always zero
    pub fn read_address(self) -> u8 {
        ((self.address() << 1) & 0x7E) | 0x80
    }

    /// First SPI byte when writing
    pub fn write_address(self) -> u8 {
        (self.address() << 1) & 0x7E
    }
}

/// Chip commands written to `CommandReg`. See Section 10.3
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    Idle = 0x00,
    CalcCrc = 0x03,
    Transceive = 0x0C,
    MfAuthent = 0x0E,
    SoftReset = 0x0F,
}

impl From<Command> for u8 {
    fn from(command: Command) -> u8 {
        command as u8
    }
}

bitflags! {
    /// `ComIrqReg` interrupt request bits. See Section 9.3.1.5
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ComIrq: u8 {
        const SET1 = 0x80;
        const TX = 0x40;
        const RX = 0x20;
        const IDLE = 0x10;
        const HI_ALERT = 0x08;
        const LO_ALERT = 0x04;
        const ERR = 0x02;
        const TIMER = 0x01;
    }
}

impl ComIrq {
    /// Flags that end a command: data received or the chip went idle
    pub const DONE: ComIrq = ComIrq::RX.union(ComIrq::IDLE);
    /// Writing this to `ComIrqReg` with `SET1` cleared clears every request bit
    pub const CLEAR_ALL: u8 = 0x7F;
}

bitflags! {
    /// `ErrorReg` bits. See Section 9.3.1.7
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ErrorFlags: u8 {
        const WR_ERR = 0x80;
        const TEMP_ERR = 0x40;
        const BUFFER_OVFL = 0x10;
        const COLL_ERR = 0x08;
        const CRC_ERR = 0x04;
        const PARITY_ERR = 0x02;
        const PROTOCOL_ERR = 0x01;
    }
}

impl ErrorFlags {
    /// Errors that invalidate a received frame
    pub const FATAL: ErrorFlags = ErrorFlags::BUFFER_OVFL
        .union(ErrorFlags::COLL_ERR)
        .union(ErrorFlags::PARITY_ERR)
        .union(ErrorFlags::PROTOCOL_ERR);
}

// FifoLevelReg: FlushBuffer
pub const FIFO_FLUSH: u8 = 0x80;
// BitFramingReg: StartSend
pub const START_SEND: u8 = 0x80;
// ControlReg: RxLastBits
pub const RX_LAST_BITS: u8 = 0x07;
// TxControlReg: Tx2RFEn | Tx1RFEn
pub const ANTENNA_DRIVERS: u8 = 0x03;
