//! The multi-pass record protocol.
//!
//! Calling code drives a record as a loop around [`Context::record`], with
//! every field's code guarded by [`Context::key`]. The loop body runs once per
//! pass and the frame's [`RecordPhase`] decides what the guards do in that
//! pass:
//!
//! ```text
//! write:  MeasureWidth -> WriteKeys -> WriteValues -> Done
//!                                      ^ table rows after the first start here
//! read:   MatchKeys -> ReadValues (one pass per claimed field run) -> Done
//!                      ^ table rows after the first start here
//! ```
//!
//! While reading, the first pass marks every schema slot whose symbol equals
//! some guard's name as wanted. Each value pass then starts on the next
//! wanted slot and fires the guards whose names match the slots in stream
//! order, so the stream's field order is free to differ from the code's, and
//! from one table row to the next.

use core::fmt;

use crate::{
    Context, Error, Malformed, Mode, ScopeKind, Tag,
    codec::{read_uint, write_uint},
    layout::ScopeFrame,
    scope::Op,
    symbol::SymbolId,
};

/// Which pass of the record loop is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordPhase {
    /// Writing: guards count the fields.
    MeasureWidth = 0,
    /// Writing: guards emit their field names.
    WriteKeys = 1,
    /// Writing: guards fire and the fields' values are written.
    WriteValues = 2,
    /// Reading: guards claim the schema slots carrying their names.
    MatchKeys = 3,
    /// Reading: guards fire in stream order and the values are read.
    ReadValues = 4,
    /// The record finished and its scope is closing.
    Done = 5,
}

impl RecordPhase {
    fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::MeasureWidth,
            1 => Self::WriteKeys,
            2 => Self::WriteValues,
            3 => Self::MatchKeys,
            4 => Self::ReadValues,
            _ => Self::Done,
        }
    }
}

impl fmt::Display for RecordPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MeasureWidth => "measure width",
            Self::WriteKeys => "write keys",
            Self::WriteValues => "write values",
            Self::MatchKeys => "match keys",
            Self::ReadValues => "read values",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

impl ScopeFrame {
    pub(crate) fn phase(&self) -> RecordPhase {
        RecordPhase::from_raw(self.phase)
    }

    pub(crate) fn set_phase(&mut self, phase: RecordPhase) {
        self.phase = phase as u8;
    }

    /// Enters `phase` with the field iterator rewound.
    fn restart(&mut self, phase: RecordPhase) {
        self.set_phase(phase);
        self.set_iterator(0);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Fresh,
    Open { depth: usize },
    Closed,
}

/// Caller-owned identity of one record loop.
///
/// A handle starts fresh and is bound to the scope depth of the record it
/// opens on the first [`Context::record`] call. Once the loop ends it is
/// closed, and the next `record` call through it opens the next record, so
/// one handle can drive a sequence of records one after another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    state: State,
}

impl Record {
    /// A fresh handle.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: State::Fresh,
        }
    }

    /// True once the loop this handle drove has ended, until it opens
    /// another record.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state == State::Closed
    }
}

impl Default for Record {
    fn default() -> Self {
        Self::new()
    }
}

/// One direction of the record protocol.
pub(crate) trait RecordProtocol {
    /// First `record` call: opens the scope. Returns whether the loop body
    /// should run.
    fn enter(ctx: &mut Context<'_>) -> Result<bool, Error>;

    /// Every later `record` call: advances the phase.
    fn resume(ctx: &mut Context<'_>, phase: RecordPhase) -> Result<bool, Error>;

    /// A guard: returns whether its field's code should run.
    fn key(ctx: &mut Context<'_>, name: &[u8], phase: RecordPhase) -> Result<bool, Error>;
}

pub(crate) struct WriteRecord;

pub(crate) struct ReadRecord;

/// Depth of the frame whose schema this record uses: the enclosing table's
/// for table rows, its own otherwise.
fn schema_depth(ctx: &Context<'_>) -> usize {
    let depth = ctx.scopes.depth();
    if ctx.scopes.parent_kind() == Some(ScopeKind::Table) {
        depth - 1
    } else {
        depth
    }
}

impl Context<'_> {
    fn in_table(&self) -> bool {
        self.scopes.top().kind() == ScopeKind::Table
    }

    fn row_of_table(&self) -> bool {
        self.scopes.parent_kind() == Some(ScopeKind::Table)
    }

    fn parent_mut(&mut self) -> &mut ScopeFrame {
        let depth = self.scopes.depth() - 1;
        self.scopes.frame_mut(depth)
    }

    fn finish_record(&mut self) {
        let top = self.scopes.top_mut();
        #[cfg(any(test, feature = "fuzzing"))]
        assert!(
            top.iterator() <= top.len(),
            "record visited more fields than it declared"
        );
        top.set_phase(RecordPhase::Done);
        self.end_op(Op::Open(ScopeKind::Record));
    }
}

impl RecordProtocol for WriteRecord {
    fn enter(ctx: &mut Context<'_>) -> Result<bool, Error> {
        let in_table = ctx.in_table();
        ctx.begin_op(Op::Open(ScopeKind::Record))?;

        if in_table && ctx.parent_mut().iterator() != 1 {
            let width = ctx.parent_mut().width();
            let top = ctx.scopes.top_mut();
            top.set_len(width);
            top.restart(RecordPhase::WriteValues);
            return Ok(true);
        }
        if !in_table {
            ctx.write_tag(Tag::Record)?;
        }
        ctx.scopes.top_mut().restart(RecordPhase::MeasureWidth);
        Ok(true)
    }

    fn resume(ctx: &mut Context<'_>, phase: RecordPhase) -> Result<bool, Error> {
        match phase {
            RecordPhase::MeasureWidth => {
                let width = ctx.scopes.top().len();
                write_uint(width, ctx.stream.output()?)?;
                if ctx.row_of_table() {
                    ctx.parent_mut().set_width(width);
                }
                ctx.scopes.top_mut().restart(RecordPhase::WriteKeys);
                Ok(true)
            }
            RecordPhase::WriteKeys => {
                ctx.scopes.top_mut().restart(RecordPhase::WriteValues);
                Ok(true)
            }
            RecordPhase::WriteValues => {
                let found = ctx.scopes.top().iterator();
                if ctx.row_of_table() {
                    let expected = ctx.parent_mut().width();
                    if found != expected {
                        return Err(Malformed::RowWidthMismatch { expected, found }.into());
                    }
                }
                ctx.finish_record();
                Ok(false)
            }
            _ => Err(Malformed::ScopeViolation(ScopeKind::Record).into()),
        }
    }

    fn key(ctx: &mut Context<'_>, name: &[u8], phase: RecordPhase) -> Result<bool, Error> {
        let max_fields = u64::from(ctx.config.max_record_fields);
        match phase {
            RecordPhase::MeasureWidth => {
                let top = ctx.scopes.top_mut();
                let width = top.len() + 1;
                if width > max_fields {
                    return Err(Malformed::TooManyFields.into());
                }
                top.set_len(width);
                Ok(false)
            }
            RecordPhase::WriteKeys => {
                ctx.symbols.write(name, ctx.stream.output()?)?;
                let top = ctx.scopes.top_mut();
                top.set_iterator(top.iterator() + 1);
                Ok(false)
            }
            RecordPhase::WriteValues => {
                let top = ctx.scopes.top_mut();
                top.set_iterator(top.iterator() + 1);
                Ok(true)
            }
            _ => Err(Malformed::ScopeViolation(ScopeKind::Record).into()),
        }
    }
}

impl ReadRecord {
    /// Skips fields nobody claimed up to the next claimed one and remembers
    /// where the pass starts. Closes the record when none is left.
    fn next_claimed(ctx: &mut Context<'_>) -> Result<bool, Error> {
        let schema = schema_depth(ctx);
        let budget = u32::try_from(ctx.scopes.max_depth() - ctx.scopes.depth()).unwrap_or(u32::MAX);
        loop {
            let top = ctx.scopes.top();
            let (index, len) = (top.iterator(), top.len());
            if index == len {
                ctx.finish_record();
                return Ok(false);
            }
            if ctx.scopes.schema(schema)[index as usize].claim() != 0 {
                let start = u32::try_from(index).unwrap_or(u32::MAX);
                ctx.scopes.top_mut().set_pass_start(start);
                return Ok(true);
            }
            log::trace!("skipping unclaimed field {index}");
            ctx.skip_value(budget)?;
            ctx.scopes.top_mut().set_iterator(index + 1);
        }
    }
}

impl RecordProtocol for ReadRecord {
    fn enter(ctx: &mut Context<'_>) -> Result<bool, Error> {
        let in_table = ctx.in_table();
        ctx.begin_op(Op::Open(ScopeKind::Record))?;
        if !in_table {
            ctx.expect_tag(Tag::Record)?;
        }

        if in_table && ctx.parent_mut().iterator() != 1 {
            let width = ctx.parent_mut().width();
            let top = ctx.scopes.top_mut();
            top.set_len(width);
            top.restart(RecordPhase::ReadValues);
            return Self::next_claimed(ctx);
        }

        let width = read_uint(ctx.stream.input()?)?;
        let fields = usize::try_from(width)
            .ok()
            .filter(|&n| n <= ctx.config.max_record_fields as usize)
            .ok_or(Malformed::TooManyFields)?;
        let schema = schema_depth(ctx);
        for index in 0..fields {
            let id = ctx.read_symbol()?;
            let slot = &mut ctx.scopes.schema_mut(schema)[index];
            slot.set_symbol(id.get());
            slot.set_claim(0);
        }
        ctx.scopes.frame_mut(schema).set_width(width);
        let top = ctx.scopes.top_mut();
        top.set_len(width);
        top.restart(RecordPhase::MatchKeys);
        Ok(true)
    }

    fn resume(ctx: &mut Context<'_>, phase: RecordPhase) -> Result<bool, Error> {
        match phase {
            RecordPhase::MatchKeys => {
                ctx.scopes.top_mut().restart(RecordPhase::ReadValues);
                Self::next_claimed(ctx)
            }
            RecordPhase::ReadValues => {
                let top = ctx.scopes.top();
                if top.iterator() == u64::from(top.pass_start()) {
                    return Err(Malformed::StalledRecord.into());
                }
                Self::next_claimed(ctx)
            }
            _ => Err(Malformed::ScopeViolation(ScopeKind::Record).into()),
        }
    }

    fn key(ctx: &mut Context<'_>, name: &[u8], phase: RecordPhase) -> Result<bool, Error> {
        let schema = schema_depth(ctx);
        let top = ctx.scopes.top();
        let (index, len) = (top.iterator(), top.len());
        let Context { scopes, symbols, .. } = ctx;

        match phase {
            RecordPhase::MatchKeys => {
                #[allow(clippy::cast_possible_truncation)]
                let len = len as usize;
                for slot in &mut scopes.schema_mut(schema)[..len] {
                    if symbols.get(SymbolId(slot.symbol())) == Some(name) {
                        slot.set_claim(1);
                    }
                }
                Ok(false)
            }
            RecordPhase::ReadValues => {
                if index >= len {
                    return Ok(false);
                }
                #[allow(clippy::cast_possible_truncation)]
                let slot = scopes.schema(schema)[index as usize];
                let fires =
                    slot.claim() != 0 && symbols.get(SymbolId(slot.symbol())) == Some(name);
                if fires {
                    scopes.top_mut().set_iterator(index + 1);
                }
                Ok(fires)
            }
            _ => Err(Malformed::ScopeViolation(ScopeKind::Record).into()),
        }
    }
}

impl<'a> Context<'a> {
    /// Drives one pass of a record loop. See [`record!`](crate::record) for
    /// the usual way to write one.
    ///
    /// Returns `true` while the loop body should run again. Returns `false`
    /// when the record is complete or the context has failed; check
    /// [`Context::status`] afterwards.
    pub fn record(&mut self, record: &mut Record) -> bool {
        if self.status.is_err() {
            return false;
        }
        let result = match self.mode {
            Mode::Write => self.record_step::<WriteRecord>(record),
            Mode::Read => self.record_step::<ReadRecord>(record),
        };
        self.latch(result).unwrap_or(false)
    }

    fn record_step<P: RecordProtocol>(&mut self, record: &mut Record) -> Result<bool, Error> {
        let open = match record.state {
            State::Fresh | State::Closed => P::enter(self)?,
            State::Open { depth } => {
                let top = self.scopes.top();
                if self.scopes.depth() != depth || top.kind() != ScopeKind::Record {
                    return Err(Malformed::ScopeViolation(top.kind()).into());
                }
                let phase = top.phase();
                P::resume(self, phase)?
            }
        };
        record.state = if open {
            State::Open {
                depth: self.scopes.depth(),
            }
        } else {
            State::Closed
        };
        Ok(open)
    }

    /// Guards the code of the field called `name`: returns `true` when that
    /// code should run in the current pass.
    ///
    /// Must be called inside a [`Context::record`] loop, unconditionally and
    /// in the same order on every pass.
    pub fn key(&mut self, name: impl AsRef<[u8]>) -> bool {
        if self.status.is_err() {
            return false;
        }
        let top = self.scopes.top();
        let result = if top.kind() == ScopeKind::Record {
            let phase = top.phase();
            match self.mode {
                Mode::Write => WriteRecord::key(self, name.as_ref(), phase),
                Mode::Read => ReadRecord::key(self, name.as_ref(), phase),
            }
        } else {
            Err(Malformed::ScopeViolation(top.kind()).into())
        };
        self.latch(result).unwrap_or(false)
    }

    /// Runs `body` as the loop body of one record, latching any error it
    /// returns.
    ///
    /// ```rust
    /// # use tagwire::{Context, Error};
    /// fn point(ctx: &mut Context<'_>, x: &mut i64, y: &mut i64) -> Result<(), Error> {
    ///     ctx.record_with(|ctx| {
    ///         if ctx.key("x") {
    ///             ctx.sint(x)?;
    ///         }
    ///         if ctx.key("y") {
    ///             ctx.sint(y)?;
    ///         }
    ///         Ok(())
    ///     })
    /// }
    /// ```
    ///
    /// # Errors
    ///
    /// The context's status once the record is complete.
    pub fn record_with<F>(&mut self, mut body: F) -> Result<(), Error>
    where
        F: FnMut(&mut Self) -> Result<(), Error>,
    {
        let mut record = Record::new();
        while self.record(&mut record) {
            let result = body(self);
            self.latch(result)?;
        }
        self.status
    }
}
