//! Field-name interning.
//!
//! Symbols are appended to a fixed string pool and numbered densely from
//! zero in order of first appearance. Writers look names up through an
//! open-addressing hash index so each distinct name is defined on the wire
//! once and referenced by id afterwards; readers replay the same numbering
//! from the definitions they encounter.

use core::fmt;

use crate::{
    Error, Malformed, Tag,
    codec::{read_uint, write_str, write_uint},
    layout::{IndexSlot, SymbolSlot},
    stream::{Input, Output, read_exact, write_all},
};

/// Dense identifier of an interned symbol within one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SymbolId(pub(crate) u32);

impl SymbolId {
    /// The raw identifier as it appears in `SYM_REF` payloads.
    #[must_use]
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

const SEED: u64 = 525_201_411_107_845_655;
const MULTIPLIER: u64 = 0x5bd1_e995_5bd1_e995;

/// MurmurOAAT64.
pub(crate) fn hash(bytes: &[u8]) -> u64 {
    bytes.iter().fold(SEED, |mut h, &b| {
        h ^= u64::from(b);
        h = h.wrapping_mul(MULTIPLIER);
        h ^ (h >> 47)
    })
}

/// Where a probe for a name ended.
enum Probe {
    Found(SymbolId),
    Vacant(usize),
}

pub(crate) struct SymbolTable<'a> {
    slots: &'a mut [SymbolSlot],
    index: &'a mut [IndexSlot],
    strings: &'a mut [u8],
    index_exp: u32,
    max_len: u32,
    count: u32,
    pool_cursor: u32,
}

impl<'a> SymbolTable<'a> {
    pub(crate) fn new(
        slots: &'a mut [SymbolSlot],
        index: &'a mut [IndexSlot],
        strings: &'a mut [u8],
        index_exp: u32,
        max_len: u32,
    ) -> Self {
        Self {
            slots,
            index,
            strings,
            index_exp,
            max_len,
            count: 0,
            pool_cursor: 0,
        }
    }

    pub(crate) fn len(&self) -> u32 {
        self.count
    }

    /// Bytes of `id`, `None` if it was never defined.
    pub(crate) fn get(&self, id: SymbolId) -> Option<&[u8]> {
        if id.0 >= self.count {
            return None;
        }
        let slot = &self.slots[id.0 as usize];
        let start = slot.offset() as usize;
        Some(&self.strings[start..start + slot.len() as usize])
    }

    fn probe(&self, name: &[u8]) -> Result<Probe, Malformed> {
        let h = hash(name);
        let mask = (1u32 << self.index_exp) - 1;
        #[allow(clippy::cast_possible_truncation)]
        let step = ((h >> (64 - self.index_exp)) | 1) as u32;
        #[allow(clippy::cast_possible_truncation)]
        let mut i = h as u32 & mask;
        // step is odd and the table size a power of two, so one lap visits
        // every bucket
        for _ in 0..=mask {
            match self.index[i as usize].entry() {
                0 => return Ok(Probe::Vacant(i as usize)),
                entry => {
                    let id = SymbolId(entry - 1);
                    if self.get(id) == Some(name) {
                        return Ok(Probe::Found(id));
                    }
                }
            }
            i = i.wrapping_add(step) & mask;
        }
        Err(Malformed::SymbolTableFull)
    }

    /// Claims the next id and the pool bytes for a symbol of `len` bytes.
    fn reserve(&mut self, len: u64) -> Result<(SymbolId, core::ops::Range<usize>), Malformed> {
        if len > u64::from(self.max_len) {
            return Err(Malformed::SymbolTooLong(len));
        }
        if self.count as usize == self.slots.len() {
            return Err(Malformed::SymbolTableFull);
        }
        #[allow(clippy::cast_possible_truncation)]
        let len = len as u32;
        let id = SymbolId(self.count);
        let slot = &mut self.slots[id.0 as usize];
        slot.set_offset(self.pool_cursor);
        slot.set_len(len);
        let start = self.pool_cursor as usize;
        self.pool_cursor += len;
        self.count += 1;
        Ok((id, start..start + len as usize))
    }

    fn index_bucket(&mut self, bucket: usize, id: SymbolId) {
        self.index[bucket].set_entry(id.0 + 1);
    }

    /// Write path: `SYM_DEF` with the bytes on first sight of `name`,
    /// `SYM_REF` with its id afterwards.
    pub(crate) fn write<O: Output + ?Sized>(
        &mut self,
        name: &[u8],
        output: &mut O,
    ) -> Result<SymbolId, Error> {
        match self.probe(name)? {
            Probe::Found(id) => {
                write_all(output, &[Tag::SymbolRef.byte()])?;
                write_uint(u64::from(id.0), output)?;
                Ok(id)
            }
            Probe::Vacant(bucket) => {
                let (id, range) = self.reserve(name.len() as u64)?;
                self.strings[range].copy_from_slice(name);
                self.index_bucket(bucket, id);
                write_all(output, &[Tag::SymbolDef.byte()])?;
                write_str(name, output)?;
                Ok(id)
            }
        }
    }

    /// Read path for a symbol whose tag byte was already consumed.
    ///
    /// Definitions are registered even when the caller is only skipping, so
    /// later references keep resolving.
    pub(crate) fn read<I: Input + ?Sized>(
        &mut self,
        tag: u8,
        input: &mut I,
    ) -> Result<SymbolId, Error> {
        match Tag::from_byte(tag) {
            Some(Tag::SymbolDef) => {
                let len = read_uint(input)?;
                let (id, range) = self.reserve(len)?;
                read_exact(input, &mut self.strings[range.clone()])?;
                if let Probe::Vacant(bucket) = self.probe(&self.strings[range])? {
                    self.index_bucket(bucket, id);
                }
                Ok(id)
            }
            Some(Tag::SymbolRef) => {
                let raw = read_uint(input)?;
                match u32::try_from(raw) {
                    Ok(id) if id < self.count => Ok(SymbolId(id)),
                    _ => Err(Malformed::UnknownSymbol(raw).into()),
                }
            }
            _ => Err(Malformed::UnexpectedTag(tag).into()),
        }
    }
}
