#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Append-only key/value records in two rotating flash pages.
//!
//! Every `put_int` appends one 8-byte slot to the active page; reads scan it
//! and keep the last slot for a key. Slot 0 of a page is a header carrying a
//! sequence number, and the page with the newest valid header is active.
//!
//! When the active page is full, the latest value of every key (the new one
//! included) is copied into the erased spare page and the spare's header is
//! written last. Until that header lands the old page stays active, so a
//! power loss mid-rotation never loses the stored budget. The old page is
//! only erased when it becomes the target of the next rotation.
//!
//! Erased flash reads as `0xFF`, so a slot of all `0xFF` marks the end of the
//! log.
//!
//! Slot layout (little endian):
//!
//! | bytes | field                       |
//! |-------|-----------------------------|
//! | 0..2  | key tag                     |
//! | 2..6  | value (`i32`)               |
//! | 6     | XOR of bytes 0..6           |
//! | 7     | [`SLOT_MARKER`]             |

use core::fmt;

use heapless::Vec;
use mystery_core::budget::KeyValueStore;

/// Bytes per record; matches the STM32G0 double-word program size.
pub const SLOT_SIZE: usize = 8;

/// Trailer byte of a completely written slot.
pub const SLOT_MARKER: u8 = 0x5A;

/// Distinct keys kept across rotation.
pub const MAX_KEYS: usize = 8;

const ERASED: u8 = 0xFF;

/// Tag of the header slot; never produced by [`key_tag`].
const HEADER_TAG: u16 = 0xFFFE;

/// First slot holding records; slot 0 is the header.
const FIRST_RECORD: u32 = 1;

/// One of the two erasable pages reserved for the store.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Page {
    A,
    B,
}

impl Page {
    pub const ALL: [Page; 2] = [Page::A, Page::B];

    #[must_use]
    pub const fn other(self) -> Page {
        match self {
            Page::A => Page::B,
            Page::B => Page::A,
        }
    }

    #[must_use]
    pub const fn index(self) -> u32 {
        match self {
            Page::A => 0,
            Page::B => 1,
        }
    }
}

/// Two equally sized erasable flash pages.
pub trait FlashBank {
    type Error: fmt::Debug;

    /// Bytes per page; a multiple of [`SLOT_SIZE`].
    fn page_size(&self) -> u32;

    fn read(&mut self, page: Page, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error>;

    /// Programs `bytes` at `offset`. The target range must be erased.
    fn write(&mut self, page: Page, offset: u32, bytes: &[u8; SLOT_SIZE])
    -> Result<(), Self::Error>;

    /// Erases one page back to `0xFF`.
    fn erase(&mut self, page: Page) -> Result<(), Self::Error>;
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StoreError<E> {
    Flash(E),
    /// Rotation found more distinct keys than fit in a page or [`MAX_KEYS`].
    TooManyKeys,
}

impl<E: fmt::Debug> fmt::Display for StoreError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Flash(err) => write!(f, "flash access failed: {err:?}"),
            StoreError::TooManyKeys => f.write_str("too many keys to rotate"),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Slot {
    Erased,
    Record { tag: u16, value: i32 },
    /// Interrupted write or foreign data; skipped but occupied.
    Torn,
}

/// Page currently holding the live records.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct Active {
    page: Page,
    sequence: u32,
}

/// [`KeyValueStore`] over a [`FlashBank`].
pub struct SlotStore<B> {
    bank: B,
}

impl<B: FlashBank> SlotStore<B> {
    pub const fn new(bank: B) -> Self {
        Self { bank }
    }

    pub fn into_inner(self) -> B {
        self.bank
    }

    fn slot_count(&self) -> u32 {
        self.bank.page_size() / SLOT_SIZE as u32
    }

    fn read_slot(&mut self, page: Page, index: u32) -> Result<Slot, StoreError<B::Error>> {
        let mut bytes = [0u8; SLOT_SIZE];
        self.bank
            .read(page, index * SLOT_SIZE as u32, &mut bytes)
            .map_err(StoreError::Flash)?;
        Ok(decode_slot(&bytes))
    }

    fn write_slot(
        &mut self,
        page: Page,
        index: u32,
        tag: u16,
        value: i32,
    ) -> Result<(), StoreError<B::Error>> {
        self.bank
            .write(page, index * SLOT_SIZE as u32, &encode_slot(tag, value))
            .map_err(StoreError::Flash)
    }

    /// Page with the newest committed header, if any.
    fn active(&mut self) -> Result<Option<Active>, StoreError<B::Error>> {
        let mut active: Option<Active> = None;
        for page in Page::ALL {
            if let Slot::Record {
                tag: HEADER_TAG,
                value,
            } = self.read_slot(page, 0)?
            {
                let sequence = u32::from_le_bytes(value.to_le_bytes());
                if active.is_none_or(|newest| sequence > newest.sequence) {
                    active = Some(Active { page, sequence });
                }
            }
        }
        Ok(active)
    }

    /// Latest value for `tag` on `page` and the index of the first erased slot.
    fn scan(&mut self, page: Page, tag: u16) -> Result<(Option<i32>, Option<u32>), StoreError<B::Error>> {
        let mut latest = None;
        for index in FIRST_RECORD..self.slot_count() {
            match self.read_slot(page, index)? {
                Slot::Erased => return Ok((latest, Some(index))),
                Slot::Record { tag: found, value } if found == tag => latest = Some(value),
                Slot::Record { .. } | Slot::Torn => {}
            }
        }
        Ok((latest, None))
    }

    /// Moves the live records plus `tag = value` into the other page and
    /// commits it by writing its header last.
    fn rotate(&mut self, from: Option<Active>, tag: u16, value: i32) -> Result<(), StoreError<B::Error>> {
        let mut latest: Vec<(u16, i32), MAX_KEYS> = Vec::new();
        if let Some(active) = from {
            for index in FIRST_RECORD..self.slot_count() {
                if let Slot::Record { tag: kept, value: kept_value } =
                    self.read_slot(active.page, index)?
                {
                    upsert(&mut latest, kept, kept_value)?;
                }
            }
        }
        upsert(&mut latest, tag, value)?;
        if latest.len() > (self.slot_count() - FIRST_RECORD) as usize {
            return Err(StoreError::TooManyKeys);
        }

        let (target, sequence) = match from {
            Some(active) => (active.page.other(), active.sequence.wrapping_add(1)),
            None => (Page::A, 1),
        };
        self.bank.erase(target).map_err(StoreError::Flash)?;
        let mut index = FIRST_RECORD;
        for (kept, kept_value) in latest {
            self.write_slot(target, index, kept, kept_value)?;
            index += 1;
        }
        self.write_slot(
            target,
            0,
            HEADER_TAG,
            i32::from_le_bytes(sequence.to_le_bytes()),
        )
    }
}

impl<B: FlashBank> KeyValueStore for SlotStore<B> {
    type Error = StoreError<B::Error>;

    fn get_int(&mut self, key: &str, default: i32) -> Result<i32, Self::Error> {
        let Some(active) = self.active()? else {
            return Ok(default);
        };
        let (latest, _) = self.scan(active.page, key_tag(key))?;
        Ok(latest.unwrap_or(default))
    }

    fn put_int(&mut self, key: &str, value: i32) -> Result<(), Self::Error> {
        let tag = key_tag(key);
        let active = self.active()?;
        if let Some(current) = active {
            let (latest, free) = self.scan(current.page, tag)?;
            if latest == Some(value) {
                return Ok(());
            }
            if let Some(index) = free {
                return self.write_slot(current.page, index, tag, value);
            }
        }
        self.rotate(active, tag, value)
    }
}

fn upsert<E>(
    latest: &mut Vec<(u16, i32), MAX_KEYS>,
    tag: u16,
    value: i32,
) -> Result<(), StoreError<E>> {
    if let Some(entry) = latest.iter_mut().find(|(known, _)| *known == tag) {
        entry.1 = value;
        Ok(())
    } else {
        latest.push((tag, value)).map_err(|_| StoreError::TooManyKeys)
    }
}

/// FNV-1a folded to 16 bits; never the erased or header pattern.
fn key_tag(key: &str) -> u16 {
    let hash = key.bytes().fold(0x811c_9dc5_u32, |hash, byte| {
        (hash ^ u32::from(byte)).wrapping_mul(0x0100_0193)
    });
    #[allow(clippy::cast_possible_truncation)]
    let folded = ((hash >> 16) ^ hash) as u16;
    if folded >= HEADER_TAG { folded - 2 } else { folded }
}

fn encode_slot(tag: u16, value: i32) -> [u8; SLOT_SIZE] {
    let mut bytes = [0u8; SLOT_SIZE];
    bytes[0..2].copy_from_slice(&tag.to_le_bytes());
    bytes[2..6].copy_from_slice(&value.to_le_bytes());
    bytes[6] = bytes[..6].iter().fold(0, |acc, byte| acc ^ byte);
    bytes[7] = SLOT_MARKER;
    bytes
}

fn decode_slot(bytes: &[u8; SLOT_SIZE]) -> Slot {
    if bytes.iter().all(|byte| *byte == ERASED) {
        return Slot::Erased;
    }
    let parity = bytes[..6].iter().fold(0, |acc, byte| acc ^ byte);
    if bytes[7] != SLOT_MARKER || bytes[6] != parity {
        return Slot::Torn;
    }
    Slot::Record {
        tag: u16::from_le_bytes([bytes[0], bytes[1]]),
        value: i32::from_le_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]),
    }
}
