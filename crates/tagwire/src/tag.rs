use core::fmt;

/// The one-byte discriminator preceding every encoded value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Tag {
    /// Unsigned variable-length integer.
    Uint = 1,
    /// Zigzag-folded signed variable-length integer.
    Sint = 2,
    /// Four little-endian bytes.
    F32 = 3,
    /// Eight little-endian bytes.
    F64 = 4,
    /// Length-prefixed raw bytes.
    Blob = 5,
    /// First occurrence of a symbol: length-prefixed bytes.
    SymbolDef = 6,
    /// Later occurrence of a symbol: its identifier.
    SymbolRef = 7,
    /// Element count followed by that many values.
    Array = 8,
    /// Row count, then column count, column symbols and packed row values.
    Table = 9,
    /// Field count, field symbols, then field values.
    Record = 10,
}

impl Tag {
    /// Decodes a raw tag byte.
    #[must_use]
    pub fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            1 => Self::Uint,
            2 => Self::Sint,
            3 => Self::F32,
            4 => Self::F64,
            5 => Self::Blob,
            6 => Self::SymbolDef,
            7 => Self::SymbolRef,
            8 => Self::Array,
            9 => Self::Table,
            10 => Self::Record,
            _ => return None,
        })
    }

    /// The byte written to the stream for this tag.
    #[must_use]
    pub fn byte(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uint => "UINT",
            Self::Sint => "SINT",
            Self::F32 => "F32",
            Self::F64 => "F64",
            Self::Blob => "BLOB",
            Self::SymbolDef => "SYM_DEF",
            Self::SymbolRef => "SYM_REF",
            Self::Array => "ARRAY",
            Self::Table => "TABLE",
            Self::Record => "RECORD",
        };
        f.write_str(name)
    }
}
