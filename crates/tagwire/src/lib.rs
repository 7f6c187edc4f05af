//! Binary serialization that tolerates schema drift.
//!
//! One function describes a structure and is run unchanged for writing and for
//! reading; the [`Context`] decides which direction the bytes flow. Records
//! are self-describing: field names travel with the data as interned symbols,
//! so a reader built against a newer or older version of a structure can
//! reorder, drop, or add fields without breaking older streams.
//!
//! All bookkeeping (scope stack, symbol table, per-record schemas) lives in a
//! single buffer supplied by the caller and sized up front with
//! [`size_for`]. Nothing is allocated while a document is traversed.
//!
//! ```rust
//! use tagwire::{Config, Context, Error, size_for};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Vec2 {
//!     x: f32,
//!     y: f32,
//! }
//!
//! fn vec2(ctx: &mut Context<'_>, v: &mut Vec2) -> Result<(), Error> {
//!     tagwire::record!(ctx, {
//!         "x" => ctx.f32(&mut v.x)?,
//!         "y" => ctx.f32(&mut v.y)?,
//!     });
//!     ctx.status()
//! }
//!
//! let config = Config::default();
//! let mut mem = vec![0u8; size_for(&config)];
//!
//! let mut bytes = Vec::new();
//! let mut ctx = Context::writer(&mut mem, config, &mut bytes)?;
//! vec2(&mut ctx, &mut Vec2 { x: 4.0, y: -3.5 })?;
//!
//! let mut input = bytes.as_slice();
//! let mut ctx = Context::reader(&mut mem, config, &mut input)?;
//! let mut out = Vec2::default();
//! vec2(&mut ctx, &mut out)?;
//! assert_eq!(out, Vec2 { x: 4.0, y: -3.5 });
//! # Ok::<(), Error>(())
//! ```

#![no_std]
extern crate alloc;

#[cfg(any(test, feature = "std"))]
extern crate std;

#[macro_use]
mod macros;

pub mod codec;
mod config;
mod context;
mod error;
mod layout;
mod record;
mod scope;
mod skip;
pub mod stream;
mod symbol;
mod tag;
mod trace;

#[cfg(test)]
mod tests;

pub use config::Config;
pub use context::{Context, Integer, Mode};
pub use error::{Error, Malformed};
pub use layout::{Layout, size_for};
pub use record::{Record, RecordPhase};
pub use scope::ScopeKind;
pub use stream::{Input, Output, Stream};
pub use symbol::SymbolId;
pub use tag::Tag;
pub use trace::{ScopeInfo, TraceEvent, Tracer};

/// Drives a record loop with one guarded block per field.
///
/// Each arm is `name => expression`; the expression runs only when that
/// field's value is due. `?` inside an arm propagates out of the enclosing
/// function.
///
/// ```rust
/// # use tagwire::{Config, Context, Error, size_for};
/// # fn point(ctx: &mut Context<'_>, x: &mut i64, y: &mut i64) -> Result<(), Error> {
/// tagwire::record!(ctx, {
///     "x" => ctx.sint(x)?,
///     "y" => ctx.sint(y)?,
/// });
/// ctx.status()
/// # }
/// ```
#[macro_export]
macro_rules! record {
    ($ctx:ident, { $( $name:expr => $body:expr ),* $(,)? }) => {{
        let mut __record = $crate::Record::new();
        while $ctx.record(&mut __record) {
            $(
                if $ctx.key($name) {
                    $body;
                }
            )*
        }
    }};
}
