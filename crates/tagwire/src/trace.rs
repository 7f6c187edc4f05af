use core::fmt;

use crate::{Context, RecordPhase, ScopeKind, layout::ScopeFrame};

/// Whether a scope was just opened or is about to close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceEvent {
    /// Emitted right after a scope is pushed.
    Enter,
    /// Emitted right before a scope is popped.
    Exit,
}

/// A snapshot of one scope frame, as handed to a [`Tracer`] or yielded by
/// [`Context::scopes`].
///
/// Its `Display` form is compact enough for one-line diagnostics:
///
/// | kind   | rendering                          |
/// |--------|------------------------------------|
/// | root   | `Root`                             |
/// | blob   | `Blob(len)`                        |
/// | array  | `Array(iterator/len)`              |
/// | table  | `Table(iterator/len)`              |
/// | record | `Record(iterator/len) (phase)`     |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeInfo {
    /// The frame's kind.
    pub kind: ScopeKind,
    /// Elements started so far (arrays, tables) or fields visited in the
    /// current phase (records).
    pub iterator: u64,
    /// Declared element count, blob length, or record width.
    pub len: u64,
    /// The record protocol phase; `None` for other kinds.
    pub phase: Option<RecordPhase>,
}

impl From<&ScopeFrame> for ScopeInfo {
    fn from(frame: &ScopeFrame) -> Self {
        let kind = frame.kind();
        Self {
            kind,
            iterator: frame.iterator(),
            len: frame.len(),
            phase: (kind == ScopeKind::Record).then(|| frame.phase()),
        }
    }
}

impl fmt::Display for ScopeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            kind,
            iterator,
            len,
            phase,
        } = *self;
        match kind {
            ScopeKind::Root => f.write_str("Root"),
            ScopeKind::Blob => write!(f, "Blob({len})"),
            ScopeKind::Array => write!(f, "Array({iterator}/{len})"),
            ScopeKind::Table => write!(f, "Table({iterator}/{len})"),
            ScopeKind::Record => {
                write!(f, "Record({iterator}/{len})")?;
                if let Some(phase) = phase {
                    write!(f, " ({phase})")?;
                }
                Ok(())
            }
        }
    }
}

/// Receives a callback whenever a scope opens or closes.
///
/// Any `FnMut(TraceEvent, usize, &ScopeInfo)` closure is a tracer.
///
/// ```rust
/// use tagwire::{Config, Context, Error, ScopeInfo, TraceEvent, size_for};
///
/// let config = Config::default();
/// let mut mem = vec![0u8; size_for(&config)];
/// let mut out = Vec::new();
/// let mut log = Vec::new();
/// let mut tracer = |event: TraceEvent, depth: usize, scope: &ScopeInfo| {
///     log.push(format!("{event:?} {depth} {scope}"));
/// };
///
/// let mut ctx = Context::writer(&mut mem, config, &mut out)?;
/// ctx.set_tracer(&mut tracer);
/// ctx.array(&mut 1)?;
/// ctx.uint(&mut 7)?;
/// drop(ctx);
///
/// assert_eq!(log, ["Enter 1 Array(0/0)", "Exit 1 Array(1/1)"]);
/// # Ok::<(), Error>(())
/// ```
pub trait Tracer {
    /// Called with the scope's depth (root is 0) and its current state.
    fn trace(&mut self, event: TraceEvent, depth: usize, scope: &ScopeInfo);
}

impl<F> Tracer for F
where
    F: FnMut(TraceEvent, usize, &ScopeInfo),
{
    fn trace(&mut self, event: TraceEvent, depth: usize, scope: &ScopeInfo) {
        self(event, depth, scope);
    }
}

impl Context<'_> {
    pub(crate) fn emit(&mut self, event: TraceEvent) {
        if let Some(tracer) = self.tracer.as_deref_mut() {
            let depth = self.scopes.depth();
            tracer.trace(event, depth, &ScopeInfo::from(self.scopes.top()));
        }
    }
}
