use crate::error::Result;
use crate::hal::{Clock, ResetLine, Transport};
use crate::picc::Uid;
use crate::rc522::{Rc522, Status};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardEvent {
    /// A card not seen since the field was last empty
    Arrived(Uid),
    /// The remembered card left the field
    Removed,
    Unchanged,
}

/// Turns a stream of poll results into arrival and removal events, so that a card resting
/// on the reader is announced once.
#[derive(Debug, Default)]
pub struct UidTracker {
    last_uid: Option<Uid>,
}

impl UidTracker {
    pub fn new() -> UidTracker {
        UidTracker { last_uid: None }
    }

    pub fn last_uid(&self) -> Option<&Uid> {
        self.last_uid.as_ref()
    }

    /// Record a UID read by a successful request and anticollision
    pub fn card_read(&mut self, uid: Uid) -> CardEvent {
        if self.last_uid == Some(uid) {
            return CardEvent::Unchanged;
        }

        self.last_uid = Some(uid);

        CardEvent::Arrived(uid)
    }

    /// Record a failed request, meaning no card answered
    pub fn field_empty(&mut self) -> CardEvent {
        match self.last_uid.take() {
            Some(_) => CardEvent::Removed,
            None => CardEvent::Unchanged,
        }
    }

    pub fn observe(&mut self, uid: Option<Uid>) -> CardEvent {
        match uid {
            Some(uid) => self.card_read(uid),
            None => self.field_empty(),
        }
    }

    /// One poll cycle: REQA, then anticollision if a card answered. A failed anticollision
    /// forgets the card like an empty field does, so its next clean read is announced again.
    pub fn poll<T, L, C>(&mut self, reader: &mut Rc522<T, L, C>) -> Result<CardEvent>
    where
        T: Transport,
        L: ResetLine,
        C: Clock,
    {
        let (status, _) = reader.request()?;

        if status != Status::Ok {
            return Ok(self.field_empty());
        }

        match reader.anticoll()? {
            (Status::Ok, Some(uid)) => Ok(self.card_read(uid)),
            _ => Ok(self.field_empty()),
        }
    }
}
