use bstr::BStr;

use crate::{
    Config, Error, Layout, Malformed, ScopeInfo, ScopeKind, SymbolId, Tag, Tracer,
    codec::{self, read_uint, write_uint},
    scope::{Op, ScopeStack},
    stream::{Input, Output, Stream, read_exact, write_all},
    symbol::SymbolTable,
};

/// The direction bytes flow through a [`Context`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Values are decoded from an [`Input`] into the caller's variables.
    Read,
    /// The caller's variables are encoded onto an [`Output`].
    Write,
}

/// One document traversal in one direction.
///
/// Every operation takes its value by `&mut`: writing reads the variable,
/// reading overwrites it. The same describing function therefore serves both
/// directions.
///
/// The first failure is latched. From then on every operation returns the
/// same error without touching the stream, so describing functions may check
/// [`Context::status`] once at the end instead of after every call.
pub struct Context<'a> {
    pub(crate) mode: Mode,
    pub(crate) status: Result<(), Error>,
    pub(crate) stream: Stream<'a>,
    pub(crate) config: Config,
    pub(crate) scopes: ScopeStack<'a>,
    pub(crate) symbols: SymbolTable<'a>,
    pub(crate) peeked: Option<u8>,
    pub(crate) tracer: Option<&'a mut dyn Tracer>,
}

impl<'a> Context<'a> {
    /// Carves `buffer` into the tables `config` calls for and binds them to
    /// `stream`. The stream's variant selects the [`Mode`].
    ///
    /// # Errors
    ///
    /// [`Error::BufferTooSmall`] when `buffer` is shorter than
    /// [`size_for(&config)`](crate::size_for).
    pub fn place(buffer: &'a mut [u8], config: Config, stream: Stream<'a>) -> Result<Self, Error> {
        let layout = Layout::new(&config);
        let regions = layout.carve(buffer)?;
        let mode = match stream {
            Stream::Input(_) => Mode::Read,
            Stream::Output(_) => Mode::Write,
        };
        log::debug!("placed {mode:?} context using {} bytes", layout.size());

        Ok(Self {
            mode,
            status: Ok(()),
            stream,
            config,
            scopes: ScopeStack::new(regions.scopes, regions.schema, config.max_record_fields),
            symbols: SymbolTable::new(
                regions.symbols,
                regions.index,
                regions.strings,
                regions.index_exp,
                config.max_symbol_len,
            ),
            peeked: None,
            tracer: None,
        })
    }

    /// A context decoding from `input`.
    ///
    /// # Errors
    ///
    /// See [`Context::place`].
    pub fn reader(
        buffer: &'a mut [u8],
        config: Config,
        input: &'a mut dyn Input,
    ) -> Result<Self, Error> {
        Self::place(buffer, config, Stream::Input(input))
    }

    /// A context encoding onto `output`.
    ///
    /// # Errors
    ///
    /// See [`Context::place`].
    pub fn writer(
        buffer: &'a mut [u8],
        config: Config,
        output: &'a mut dyn Output,
    ) -> Result<Self, Error> {
        Self::place(buffer, config, Stream::Output(output))
    }

    /// `Ok` until the first failure, that failure afterwards.
    ///
    /// # Errors
    ///
    /// The latched error.
    pub fn status(&self) -> Result<(), Error> {
        self.status
    }

    /// Which direction this context runs in.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The limits this context was placed with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of open scopes above the root.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.scopes.depth()
    }

    /// Installs a callback invoked on every scope push and pop.
    pub fn set_tracer(&mut self, tracer: &'a mut dyn Tracer) {
        self.tracer = Some(tracer);
    }

    /// The open scopes, root first.
    ///
    /// ```rust
    /// # use tagwire::{Config, Context, size_for};
    /// # let config = Config::default();
    /// # let mut mem = vec![0u8; size_for(&config)];
    /// # let mut out = Vec::new();
    /// let mut ctx = Context::writer(&mut mem, config, &mut out)?;
    /// ctx.array(&mut 3)?;
    /// ctx.uint(&mut 1)?;
    ///
    /// let dump: Vec<String> = ctx.scopes().map(|scope| scope.to_string()).collect();
    /// assert_eq!(dump, ["Root", "Array(1/3)"]);
    /// # Ok::<(), tagwire::Error>(())
    /// ```
    pub fn scopes(&self) -> impl Iterator<Item = ScopeInfo> + '_ {
        self.scopes.frames().iter().map(ScopeInfo::from)
    }

    /// The bytes of an interned symbol.
    #[must_use]
    pub fn resolve(&self, id: SymbolId) -> Option<&BStr> {
        self.symbols.get(id).map(BStr::new)
    }

    /// Number of symbols interned so far.
    #[must_use]
    pub fn symbol_count(&self) -> u32 {
        self.symbols.len()
    }

    /// Latches the first error seen and hands back the one latched.
    pub(crate) fn latch<T>(&mut self, result: Result<T, Error>) -> Result<T, Error> {
        result.map_err(|err| match self.status {
            Err(latched) => latched,
            Ok(()) => {
                log::debug!("context failed at depth {}: {err}", self.scopes.depth());
                self.status = Err(err);
                err
            }
        })
    }

    /// Runs `op` unless the context already failed, latching its failure.
    fn guarded<T>(&mut self, op: impl FnOnce(&mut Self) -> Result<T, Error>) -> Result<T, Error> {
        self.status?;
        let result = op(self);
        self.latch(result)
    }

    pub(crate) fn write_tag(&mut self, tag: Tag) -> Result<(), Error> {
        write_all(self.stream.output()?, &[tag.byte()])
    }

    pub(crate) fn take_tag(&mut self) -> Result<u8, Error> {
        if let Some(tag) = self.peeked.take() {
            return Ok(tag);
        }
        let mut byte = [0u8; 1];
        read_exact(self.stream.input()?, &mut byte)?;
        Ok(byte[0])
    }

    pub(crate) fn expect_tag(&mut self, expected: Tag) -> Result<(), Error> {
        match self.take_tag()? {
            tag if tag == expected.byte() => Ok(()),
            tag => Err(Malformed::UnexpectedTag(tag).into()),
        }
    }

    /// Reads one `SYM_DEF` or `SYM_REF`, tag included.
    pub(crate) fn read_symbol(&mut self) -> Result<SymbolId, Error> {
        let tag = self.take_tag()?;
        self.symbols.read(tag, self.stream.input()?)
    }

    /// Looks at the tag of the next value without consuming it.
    ///
    /// Lets a reader branch on what the stream holds, for example to accept
    /// either an unsigned or a signed encoding of the same field.
    ///
    /// # Errors
    ///
    /// [`Malformed::WrongMode`] on a writer, [`Malformed::UnexpectedTag`] when
    /// the byte is not a tag, [`Error::Io`] at the end of the stream.
    /// [`Malformed::ScopeViolation`] directly inside a table or an open blob,
    /// where the next bytes are not a tag.
    pub fn peek_tag(&mut self) -> Result<Tag, Error> {
        self.guarded(|ctx| {
            let kind = ctx.scopes.top().kind();
            if matches!(kind, ScopeKind::Table | ScopeKind::Blob) {
                return Err(Malformed::ScopeViolation(kind).into());
            }
            let byte = ctx.take_tag()?;
            ctx.peeked = Some(byte);
            Tag::from_byte(byte).ok_or_else(|| Malformed::UnexpectedTag(byte).into())
        })
    }

    fn primitive<T>(
        &mut self,
        tag: Tag,
        value: &mut T,
        write: impl FnOnce(&T, &mut dyn Output) -> Result<(), Error>,
        read: impl FnOnce(&mut dyn Input) -> Result<T, Error>,
    ) -> Result<(), Error> {
        self.guarded(|ctx| {
            ctx.begin_op(Op::Value)?;
            match ctx.mode {
                Mode::Write => {
                    ctx.write_tag(tag)?;
                    write(value, ctx.stream.output()?)?;
                }
                Mode::Read => {
                    ctx.expect_tag(tag)?;
                    *value = read(ctx.stream.input()?)?;
                }
            }
            ctx.end_op(Op::Value);
            Ok(())
        })
    }

    /// Transfers an unsigned integer as `UINT`.
    ///
    /// # Errors
    ///
    /// The latched status on failure.
    pub fn uint(&mut self, value: &mut u64) -> Result<(), Error> {
        self.primitive(
            Tag::Uint,
            value,
            |v, out| write_uint(*v, out),
            |input| read_uint(input),
        )
    }

    /// Transfers a signed integer as `SINT`.
    ///
    /// # Errors
    ///
    /// The latched status on failure.
    pub fn sint(&mut self, value: &mut i64) -> Result<(), Error> {
        self.primitive(
            Tag::Sint,
            value,
            |v, out| codec::write_sint(*v, out),
            |input| codec::read_sint(input),
        )
    }

    /// Transfers an `f32`, bit for bit.
    ///
    /// # Errors
    ///
    /// The latched status on failure.
    pub fn f32(&mut self, value: &mut f32) -> Result<(), Error> {
        self.primitive(
            Tag::F32,
            value,
            |v, out| codec::write_f32(*v, out),
            |input| codec::read_f32(input),
        )
    }

    /// Transfers an `f64`, bit for bit.
    ///
    /// # Errors
    ///
    /// The latched status on failure.
    pub fn f64(&mut self, value: &mut f64) -> Result<(), Error> {
        self.primitive(
            Tag::F64,
            value,
            |v, out| codec::write_f64(*v, out),
            |input| codec::read_f64(input),
        )
    }

    narrowing_adapters! {
        u8: u8 => uint as u64,
        u16: u16 => uint as u64,
        u32: u32 => uint as u64,
        i8: i8 => sint as i64,
        i16: i16 => sint as i64,
        i32: i32 => sint as i64,
    }

    /// Transfers any primitive integer through the matching adapter.
    ///
    /// ```rust
    /// # use tagwire::{Context, Error};
    /// fn counters(ctx: &mut Context<'_>, hits: &mut u16, delta: &mut i32) -> Result<(), Error> {
    ///     ctx.int(hits)?;
    ///     ctx.int(delta)
    /// }
    /// ```
    ///
    /// # Errors
    ///
    /// The latched status on failure.
    pub fn int<T: Integer>(&mut self, value: &mut T) -> Result<(), Error> {
        T::transfer(value, self)
    }

    /// Opens a blob and transfers its length. The body must follow with
    /// [`Context::blob_body`] before anything else.
    ///
    /// # Errors
    ///
    /// The latched status on failure.
    pub fn blob_header(&mut self, len: &mut u64) -> Result<(), Error> {
        self.guarded(|ctx| {
            ctx.begin_op(Op::Open(ScopeKind::Blob))?;
            match ctx.mode {
                Mode::Write => {
                    ctx.write_tag(Tag::Blob)?;
                    write_uint(*len, ctx.stream.output()?)?;
                }
                Mode::Read => {
                    ctx.expect_tag(Tag::Blob)?;
                    *len = read_uint(ctx.stream.input()?)?;
                }
            }
            ctx.scopes.top_mut().set_len(*len);
            Ok(())
        })
    }

    /// Transfers the body of the open blob through the first `len` bytes of
    /// `buf` and closes it.
    ///
    /// # Errors
    ///
    /// [`Malformed::ScopeViolation`] without an open blob,
    /// [`Malformed::LengthExceeded`] when `buf` is shorter than the blob.
    pub fn blob_body(&mut self, buf: &mut [u8]) -> Result<(), Error> {
        self.guarded(|ctx| {
            let top = ctx.scopes.top();
            if top.kind() != ScopeKind::Blob {
                return Err(Malformed::ScopeViolation(top.kind()).into());
            }
            let len = top.len();
            let body = usize::try_from(len)
                .ok()
                .and_then(|n| buf.get_mut(..n))
                .ok_or(Malformed::LengthExceeded(len))?;
            match ctx.mode {
                Mode::Write => write_all(ctx.stream.output()?, body)?,
                Mode::Read => read_exact(ctx.stream.input()?, body)?,
            }
            ctx.end_op(Op::Open(ScopeKind::Blob));
            Ok(())
        })
    }

    /// Header and body in one call. Writing sends the first `len` bytes of
    /// `buf`; reading fills them and stores the length in `len`.
    ///
    /// # Errors
    ///
    /// [`Malformed::LengthExceeded`] when the blob does not fit `buf`.
    pub fn blob(&mut self, buf: &mut [u8], len: &mut u64) -> Result<(), Error> {
        let fits = usize::try_from(*len).is_ok_and(|n| n <= buf.len());
        if self.mode == Mode::Write && !fits {
            let result: Result<(), Error> = Err(Malformed::LengthExceeded(*len).into());
            return self.guarded(|_| result);
        }
        self.blob_header(len)?;
        self.blob_body(buf)
    }

    fn counted(&mut self, tag: Tag, kind: ScopeKind, len: &mut u64) -> Result<(), Error> {
        self.guarded(|ctx| {
            ctx.begin_op(Op::Open(kind))?;
            match ctx.mode {
                Mode::Write => {
                    ctx.write_tag(tag)?;
                    write_uint(*len, ctx.stream.output()?)?;
                }
                Mode::Read => {
                    ctx.expect_tag(tag)?;
                    *len = read_uint(ctx.stream.input()?)?;
                }
            }
            ctx.scopes.top_mut().set_len(*len);
            ctx.end_op(Op::Open(kind));
            Ok(())
        })
    }

    /// Opens an array of `len` elements. Each following value is one
    /// element; the array closes itself after the last.
    ///
    /// # Errors
    ///
    /// The latched status on failure.
    pub fn array(&mut self, len: &mut u64) -> Result<(), Error> {
        self.counted(Tag::Array, ScopeKind::Array, len)
    }

    /// Opens a table of `len` rows. Each row must be a record presenting the
    /// same fields; their names are transferred once, with the first row.
    ///
    /// # Errors
    ///
    /// The latched status on failure.
    pub fn table(&mut self, len: &mut u64) -> Result<(), Error> {
        self.counted(Tag::Table, ScopeKind::Table, len)
    }

    /// Transfers an interned symbol. Writing interns `name`; reading ignores
    /// it and returns the id found in the stream, whose bytes
    /// [`Context::resolve`] returns.
    ///
    /// # Errors
    ///
    /// The latched status on failure.
    pub fn symbol(&mut self, name: impl AsRef<[u8]>) -> Result<SymbolId, Error> {
        self.guarded(|ctx| {
            ctx.begin_op(Op::Value)?;
            let id = match ctx.mode {
                Mode::Write => ctx.symbols.write(name.as_ref(), ctx.stream.output()?)?,
                Mode::Read => ctx.read_symbol()?,
            };
            ctx.end_op(Op::Value);
            Ok(id)
        })
    }
}

/// Integer types [`Context::int`] accepts.
pub trait Integer: Copy {
    /// Transfers `value` through the adapter for `Self`.
    ///
    /// # Errors
    ///
    /// The context's latched status on failure.
    fn transfer(value: &mut Self, ctx: &mut Context<'_>) -> Result<(), Error>;
}

macro_rules! integer_impls {
    ($($ty:ty => $method:ident),* $(,)?) => {
        $(
            impl Integer for $ty {
                fn transfer(value: &mut Self, ctx: &mut Context<'_>) -> Result<(), Error> {
                    ctx.$method(value)
                }
            }
        )*
    };
}

integer_impls! {
    u8 => u8,
    u16 => u16,
    u32 => u32,
    u64 => uint,
    i8 => i8,
    i16 => i16,
    i32 => i32,
    i64 => sint,
}
