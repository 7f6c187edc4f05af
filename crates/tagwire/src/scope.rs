//! The scope stack and the structural rules every operation goes through.
//!
//! Frame 0 is the implicit root and is never popped. Arrays and tables count
//! their elements in `iterator` against the declared `len` and close
//! themselves once the last element has ended; blobs and records are closed
//! explicitly by the operation that finishes them.

use core::fmt;

use zerocopy::FromZeros;

use crate::{
    Context, Error, Malformed, Mode, RecordPhase,
    layout::{SchemaSlot, ScopeFrame},
    trace::TraceEvent,
};

/// What kind of region a scope frame tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ScopeKind {
    /// The implicit outermost scope.
    Root = 0,
    /// A blob whose header was transferred and whose body is pending.
    Blob = 1,
    /// A counted sequence of values.
    Array = 2,
    /// A counted sequence of records sharing one schema.
    Table = 3,
    /// A self-describing set of named fields.
    Record = 4,
}

impl ScopeKind {
    fn from_raw(raw: u8) -> Option<Self> {
        Some(match raw {
            0 => Self::Root,
            1 => Self::Blob,
            2 => Self::Array,
            3 => Self::Table,
            4 => Self::Record,
            _ => return None,
        })
    }

    fn owns_schema(self) -> bool {
        matches!(self, Self::Table | Self::Record)
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Root => "root",
            Self::Blob => "blob",
            Self::Array => "array",
            Self::Table => "table",
            Self::Record => "record",
        };
        f.write_str(name)
    }
}

impl ScopeFrame {
    pub(crate) fn kind(&self) -> ScopeKind {
        ScopeKind::from_raw(self.kind).unwrap_or(ScopeKind::Root)
    }

    /// True for an array or table whose last element has ended.
    fn exhausted(&self) -> bool {
        matches!(self.kind(), ScopeKind::Array | ScopeKind::Table) && self.iterator() == self.len()
    }
}

/// The structural shape of an operation, as seen by the scope rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Op {
    /// A primitive or a symbol: occupies one element slot, opens nothing.
    Value,
    /// Opens a scope of the given kind.
    Open(ScopeKind),
}

/// Fixed-capacity stack of frames indexed by depth, plus the schema pool
/// its record and table frames borrow from.
pub(crate) struct ScopeStack<'a> {
    frames: &'a mut [ScopeFrame],
    pool: &'a mut [SchemaSlot],
    pool_cursor: u32,
    fields: u32,
    top: usize,
}

impl<'a> ScopeStack<'a> {
    pub(crate) fn new(
        frames: &'a mut [ScopeFrame],
        pool: &'a mut [SchemaSlot],
        fields: u32,
    ) -> Self {
        Self {
            frames,
            pool,
            pool_cursor: 0,
            fields,
            top: 0,
        }
    }

    /// Number of open scopes above the root.
    pub(crate) fn depth(&self) -> usize {
        self.top
    }

    pub(crate) fn max_depth(&self) -> usize {
        self.frames.len() - 1
    }

    pub(crate) fn top(&self) -> &ScopeFrame {
        &self.frames[self.top]
    }

    pub(crate) fn top_mut(&mut self) -> &mut ScopeFrame {
        &mut self.frames[self.top]
    }

    pub(crate) fn frame_mut(&mut self, depth: usize) -> &mut ScopeFrame {
        &mut self.frames[depth]
    }

    /// Kind of the frame directly below the top, `None` at the root.
    pub(crate) fn parent_kind(&self) -> Option<ScopeKind> {
        self.top
            .checked_sub(1)
            .map(|depth| self.frames[depth].kind())
    }

    /// Open frames, root first.
    pub(crate) fn frames(&self) -> &[ScopeFrame] {
        &self.frames[..=self.top]
    }

    /// The schema slots owned by the record or table frame at `depth`.
    pub(crate) fn schema(&self, depth: usize) -> &[SchemaSlot] {
        let start = self.frames[depth].schema() as usize;
        &self.pool[start..start + self.fields as usize]
    }

    pub(crate) fn schema_mut(&mut self, depth: usize) -> &mut [SchemaSlot] {
        let start = self.frames[depth].schema() as usize;
        &mut self.pool[start..start + self.fields as usize]
    }

    pub(crate) fn push(&mut self, kind: ScopeKind) -> Result<(), Malformed> {
        if self.top == self.max_depth() {
            return Err(Malformed::DepthExceeded);
        }
        let mut frame = ScopeFrame::new_zeroed();
        frame.kind = kind as u8;
        if kind.owns_schema() {
            let end = self.pool_cursor + self.fields;
            if end as usize > self.pool.len() {
                return Err(Malformed::DepthExceeded);
            }
            frame.set_schema(self.pool_cursor);
            self.pool_cursor = end;
        }
        self.top += 1;
        self.frames[self.top] = frame;
        log::trace!("push {kind} at depth {}", self.top);
        Ok(())
    }

    pub(crate) fn pop(&mut self) {
        debug_assert!(self.top > 0, "the root scope is never popped");
        let frame = &self.frames[self.top];
        log::trace!("pop {} at depth {}", frame.kind(), self.top);
        if frame.kind().owns_schema() {
            self.pool_cursor = frame.schema();
        }
        self.top -= 1;
    }
}

impl Context<'_> {
    /// Validates that `op` may start in the current scope, counts it as an
    /// element of an enclosing array or table, and pushes its frame.
    pub(crate) fn begin_op(&mut self, op: Op) -> Result<(), Error> {
        let top = self.scopes.top_mut();
        match top.kind() {
            ScopeKind::Blob => return Err(Malformed::ScopeViolation(ScopeKind::Blob).into()),
            ScopeKind::Table if op != Op::Open(ScopeKind::Record) => {
                return Err(Malformed::ScopeViolation(ScopeKind::Table).into());
            }
            ScopeKind::Array | ScopeKind::Table => top.set_iterator(top.iterator() + 1),
            ScopeKind::Root | ScopeKind::Record => {}
        }
        if let Op::Open(kind) = op {
            self.scopes.push(kind)?;
            if kind == ScopeKind::Record {
                let phase = match self.mode {
                    Mode::Write => RecordPhase::MeasureWidth,
                    Mode::Read => RecordPhase::MatchKeys,
                };
                self.scopes.top_mut().set_phase(phase);
            }
            self.emit(TraceEvent::Enter);
        }
        Ok(())
    }

    /// Closes the scope `op` finishes, then every enclosing array or table
    /// that this completed.
    pub(crate) fn end_op(&mut self, op: Op) {
        if let Op::Open(kind @ (ScopeKind::Blob | ScopeKind::Record)) = op {
            if self.scopes.top().kind() == kind {
                self.close_scope();
            }
        }
        while self.scopes.top().exhausted() {
            self.close_scope();
        }
    }

    fn close_scope(&mut self) {
        self.emit(TraceEvent::Exit);
        self.scopes.pop();
    }
}
