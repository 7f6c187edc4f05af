//! Consuming values nobody asked for.
//!
//! A reader meets values of unknown shape whenever the stream carries a field
//! the code does not declare. `Context::skip_value` walks such a value
//! without touching the scope stack; instead, `budget` is the number of
//! scopes the value may still open before it would exceed `max_depth`.

use crate::{
    Context, Error, Malformed, Tag,
    codec::read_uint,
    stream::Input,
};

impl Context<'_> {
    pub(crate) fn skip_value(&mut self, budget: u32) -> Result<(), Error> {
        let tag = self.take_tag()?;
        let Some(tag) = Tag::from_byte(tag) else {
            return Err(Malformed::UnexpectedTag(tag).into());
        };
        let max_fields = u64::from(self.config.max_record_fields);

        match tag {
            Tag::Uint | Tag::Sint => {
                read_uint(self.stream.input()?)?;
            }
            Tag::F32 => self.stream.input()?.skip(4)?,
            Tag::F64 => self.stream.input()?.skip(8)?,
            Tag::Blob => {
                let input = self.stream.input()?;
                let len = read_uint(input)?;
                input.skip(len)?;
            }
            Tag::SymbolDef | Tag::SymbolRef => {
                self.symbols.read(tag.byte(), self.stream.input()?)?;
            }
            Tag::Array => {
                let count = read_uint(self.stream.input()?)?;
                if count > 0 {
                    let inner = descend(budget, 1)?;
                    for _ in 0..count {
                        self.skip_value(inner)?;
                    }
                }
            }
            Tag::Table => {
                let rows = read_uint(self.stream.input()?)?;
                if rows > 0 {
                    let inner = descend(budget, 2)?;
                    let columns = read_uint(self.stream.input()?)?;
                    if columns > max_fields {
                        return Err(Malformed::TooManyFields.into());
                    }
                    for _ in 0..columns {
                        self.read_symbol()?;
                    }
                    for _ in 0..rows.saturating_mul(columns) {
                        self.skip_value(inner)?;
                    }
                }
            }
            Tag::Record => {
                let fields = read_uint(self.stream.input()?)?;
                if fields > max_fields {
                    return Err(Malformed::TooManyFields.into());
                }
                if fields > 0 {
                    let inner = descend(budget, 1)?;
                    for _ in 0..fields {
                        self.read_symbol()?;
                    }
                    for _ in 0..fields {
                        self.skip_value(inner)?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Budget left inside a value that opens `scopes` nested scopes.
fn descend(budget: u32, scopes: u32) -> Result<u32, Malformed> {
    budget.checked_sub(scopes).ok_or(Malformed::DepthExceeded)
}
