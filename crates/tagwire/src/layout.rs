//! Memory layout planning for a context's backing buffer.
//!
//! A [`Config`] fully determines how much memory a context needs. The plan is
//! computed twice with the same function: once by the caller through
//! [`size_for`] to allocate the buffer, and once by
//! [`Context::place`](crate::Context::place) to carve that buffer into typed
//! regions:
//!
//! ```text
//! +----------------------+  offset 0
//! | symbol slots         |  max_num_symbols x 8 bytes
//! +----------------------+
//! | symbol hash index    |  2^k x 4 bytes, 2^k >= 2 x max_num_symbols
//! +----------------------+
//! | field-schema pool    |  max_depth x max_record_fields x 8 bytes
//! +----------------------+
//! | scope frames         |  (max_depth + 1) x 40 bytes
//! +----------------------+
//! | string pool          |  max_num_symbols x max_symbol_len bytes
//! +----------------------+
//! ```
//!
//! Slots store their fields as little-endian `zerocopy` integers, so casting
//! never depends on the alignment of the caller's buffer. Offsets are still
//! rounded up to each slot's natural alignment so the regions line up the
//! same way a native layout would.

use core::ops::Range;

use zerocopy::{
    FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned,
    little_endian::{U32, U64},
};

use crate::{Config, Error};

/// One interned symbol: where its bytes live in the string pool.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub(crate) struct SymbolSlot {
    offset: U32,
    len: U32,
}

impl SymbolSlot {
    slot_accessors! {
        offset: u32,
        len: u32,
    }
}

/// One open-addressing bucket: `0` when empty, otherwise symbol id + 1.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub(crate) struct IndexSlot {
    entry: U32,
}

impl IndexSlot {
    slot_accessors! {
        entry: u32,
    }
}

/// One discovered record field: the symbol found in the stream and, while
/// reading, whether some key guard asked for it (`1`) or not (`0`).
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub(crate) struct SchemaSlot {
    symbol: U32,
    claim: U32,
}

impl SchemaSlot {
    slot_accessors! {
        symbol: u32,
        claim: u32,
    }
}

/// One scope stack frame.
///
/// `schema` is the first schema-pool slot owned by a record or table frame;
/// popping the frame rewinds the pool cursor back to it. `pass_start` is the
/// field a reading record's value pass stopped on before its body ran.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub(crate) struct ScopeFrame {
    iterator: U64,
    len: U64,
    width: U64,
    schema: U32,
    pass_start: U32,
    pub(crate) kind: u8,
    pub(crate) phase: u8,
    _reserved: [u8; 6],
}

impl ScopeFrame {
    slot_accessors! {
        iterator: u64,
        len: u64,
        width: u64,
        schema: u32,
        pass_start: u32,
    }
}

const _: () = assert!(size_of::<SymbolSlot>() == 8);
const _: () = assert!(size_of::<IndexSlot>() == 4);
const _: () = assert!(size_of::<SchemaSlot>() == 8);
const _: () = assert!(size_of::<ScopeFrame>() == 40);

/// Byte offsets of every region inside a context's backing buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    symbols: Range<usize>,
    index: Range<usize>,
    schema: Range<usize>,
    scopes: Range<usize>,
    strings: Range<usize>,
    index_exp: u32,
}

/// Bump cursor used while planning.
struct Planner {
    cursor: usize,
}

impl Planner {
    fn reserve(&mut self, size: usize, align: usize) -> Range<usize> {
        let start = self.cursor.next_multiple_of(align);
        self.cursor = start + size;
        start..self.cursor
    }
}

impl Layout {
    /// Plans the regions for `config`.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        let symbol_count = config.max_num_symbols as usize;
        let index_exp = index_exp(config.max_num_symbols);
        let fields = config.max_record_fields as usize;
        let depth = config.max_depth as usize;

        let mut planner = Planner { cursor: 0 };
        let symbols = planner.reserve(symbol_count * size_of::<SymbolSlot>(), 4);
        let index = planner.reserve((1usize << index_exp) * size_of::<IndexSlot>(), 4);
        let schema = planner.reserve(depth * fields * size_of::<SchemaSlot>(), 4);
        let scopes = planner.reserve((depth + 1) * size_of::<ScopeFrame>(), 8);
        let strings = planner.reserve(symbol_count * config.max_symbol_len as usize, 1);

        Self {
            symbols,
            index,
            schema,
            scopes,
            strings,
            index_exp,
        }
    }

    /// Total bytes the backing buffer must hold.
    #[must_use]
    pub fn size(&self) -> usize {
        self.strings.end
    }

    /// Log2 of the number of hash index buckets.
    #[must_use]
    pub fn index_exp(&self) -> u32 {
        self.index_exp
    }

    /// Zeroes the planned prefix of `buffer` and splits it into typed regions.
    pub(crate) fn carve<'a>(&self, buffer: &'a mut [u8]) -> Result<Regions<'a>, Error> {
        let required = self.size();
        if buffer.len() < required {
            return Err(Error::BufferTooSmall {
                required,
                provided: buffer.len(),
            });
        }

        let (used, _) = buffer.split_at_mut(required);
        used.fill(0);

        let mut carver = Carver {
            rest: used,
            offset: 0,
        };
        let symbols = carver.take(&self.symbols);
        let index = carver.take(&self.index);
        let schema = carver.take(&self.schema);
        let scopes = carver.take(&self.scopes);
        let strings = carver.take(&self.strings);

        Ok(Regions {
            symbols: cast(symbols, required)?,
            index: cast(index, required)?,
            schema: cast(schema, required)?,
            scopes: cast(scopes, required)?,
            strings,
            index_exp: self.index_exp,
        })
    }
}

/// Splits planned ranges off the front of a buffer, in ascending order.
struct Carver<'a> {
    rest: &'a mut [u8],
    offset: usize,
}

impl<'a> Carver<'a> {
    fn take(&mut self, range: &Range<usize>) -> &'a mut [u8] {
        let rest = core::mem::take(&mut self.rest);
        let (_, tail) = rest.split_at_mut(range.start - self.offset);
        let (region, tail) = tail.split_at_mut(range.len());
        self.rest = tail;
        self.offset = range.end;
        region
    }
}

/// The typed views of a carved buffer.
pub(crate) struct Regions<'a> {
    pub(crate) symbols: &'a mut [SymbolSlot],
    pub(crate) index: &'a mut [IndexSlot],
    pub(crate) schema: &'a mut [SchemaSlot],
    pub(crate) scopes: &'a mut [ScopeFrame],
    pub(crate) strings: &'a mut [u8],
    pub(crate) index_exp: u32,
}

fn cast<T>(bytes: &mut [u8], required: usize) -> Result<&mut [T], Error>
where
    T: FromBytes + IntoBytes + KnownLayout + Unaligned,
{
    let provided = bytes.len();
    <[T]>::mut_from_bytes(bytes).map_err(|_| Error::BufferTooSmall { required, provided })
}

/// Smallest `k >= 2` with `2^k >= 2 * max_num_symbols`, keeping the index at
/// most half full.
fn index_exp(max_num_symbols: u32) -> u32 {
    let wanted = u64::from(max_num_symbols) * 2;
    let mut exp = 2;
    while (1u64 << exp) < wanted {
        exp += 1;
    }
    exp
}

/// Bytes a context configured with `config` needs for its backing buffer.
///
/// ```rust
/// use tagwire::{Config, Layout, size_for};
///
/// let config = Config::default();
/// assert_eq!(size_for(&config), Layout::new(&config).size());
/// ```
#[must_use]
pub fn size_for(config: &Config) -> usize {
    Layout::new(config).size()
}
