use std::fmt;

/// Commands sent over the air to a PICC (proximity card). See ISO/IEC 14443-3
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PiccCommand {
    /// REQuest command type A
    ReqA = 0x26,
    /// Anticollision and SELECT for cascade level 1
    SelCl1 = 0x93,
    /// HaLT command type A
    HltA = 0x50,
    /// MIFARE Classic read
    Read = 0x30,
    /// MIFARE Classic authenticate with key A
    AuthA = 0x60,
}

impl From<PiccCommand> for u8 {
    fn from(command: PiccCommand) -> u8 {
        command as u8
    }
}

/// NVB byte for an anticollision frame: two whole bytes sent, no UID bits known
pub const NVB_ANTICOLL: u8 = 0x20;

/// Answer To reQuest A
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Atqa {
    pub bytes: [u8; 2],
}

impl Atqa {
    pub fn from_response(data: &[u8]) -> Option<Atqa> {
        let bytes: [u8; 2] = data.try_into().ok()?;

        Some(Atqa { bytes })
    }
}

/// Single size UID as returned by cascade level 1 anticollision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Uid {
    bytes: [u8; 4],
}

impl Uid {
    /// Parse an anticollision response of four UID bytes followed by the BCC.
    /// Returns `None` for the wrong length or a BCC mismatch.
    pub fn from_response(data: &[u8]) -> Option<Uid> {
        let frame: &[u8; 5] = data.try_into().ok()?;
        let bytes = [frame[0], frame[1], frame[2], frame[3]];

        if bcc(&bytes) != frame[4] {
            return None;
        }

        Some(Uid { bytes })
    }

    pub fn bytes(&self) -> &[u8; 4] {
        &self.bytes
    }

    pub fn as_u32(&self) -> u32 {
        u32::from_be_bytes(self.bytes)
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.bytes;

        write!(f, "{:02X}:{:02X}:{:02X}:{:02X}", a, b, c, d)
    }
}

/// Block check character: XOR of the UID bytes
pub fn bcc(uid: &[u8]) -> u8 {
    uid.iter().fold(0, |acc, b| acc ^ b)
}
