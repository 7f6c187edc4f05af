use thiserror::Error;

/// The status a [`Context`](crate::Context) latches on its first failure.
///
/// Both variants are `Copy`: once latched, the same value is returned by
/// every later operation on that context.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The underlying stream could not deliver or accept the requested bytes.
    #[error("stream i/o failure")]
    Io,
    /// The data, or the sequence of calls made against the context, is not
    /// well formed.
    #[error("malformed data: {0}")]
    Malformed(#[from] Malformed),
    /// The backing buffer handed to [`Context::place`](crate::Context::place)
    /// is smaller than [`size_for`](crate::size_for) requires. Only returned
    /// by construction; never latched.
    #[error("backing buffer holds {provided} bytes, {required} required")]
    BufferTooSmall {
        /// Bytes the configuration needs.
        required: usize,
        /// Bytes supplied by the caller.
        provided: usize,
    },
}

/// What exactly was malformed.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Malformed {
    /// A value carried a tag other than the one the caller asked for.
    #[error("unexpected tag {0:#04x}")]
    UnexpectedTag(u8),
    /// A variable-length integer ran past ten bytes.
    #[error("variable-length integer longer than 10 bytes")]
    VarintOverflow,
    /// A decoded integer does not fit the narrower destination type.
    #[error("integer out of range for the destination type")]
    OutOfRange,
    /// A declared length exceeds the destination buffer.
    #[error("length {0} exceeds the destination buffer")]
    LengthExceeded(u64),
    /// Nesting went deeper than `max_depth`.
    #[error("nesting depth limit exceeded")]
    DepthExceeded,
    /// A record declared more fields than `max_record_fields`.
    #[error("record width limit exceeded")]
    TooManyFields,
    /// A table row presented a different number of fields than the first row.
    #[error("table row width {found} differs from table width {expected}")]
    RowWidthMismatch {
        /// Width established by the first row.
        expected: u64,
        /// Width of the offending row.
        found: u64,
    },
    /// More distinct symbols than `max_num_symbols`.
    #[error("symbol table is full")]
    SymbolTableFull,
    /// A symbol longer than `max_symbol_len`.
    #[error("symbol of {0} bytes exceeds the length limit")]
    SymbolTooLong(u64),
    /// A symbol reference to an identifier that was never defined.
    #[error("reference to undefined symbol {0}")]
    UnknownSymbol(u64),
    /// A record read pass ended without any guard taking the field it
    /// stopped on.
    #[error("record pass made no progress")]
    StalledRecord,
    /// A structural call made where the current scope does not allow it.
    #[error("operation not allowed in the current {0} scope")]
    ScopeViolation(crate::ScopeKind),
    /// A stream operation for the other direction was requested.
    #[error("operation requires the other serialization mode")]
    WrongMode,
}
