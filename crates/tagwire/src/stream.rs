//! Raw byte streams consumed by the engine.
//!
//! The engine only ever asks for exact byte counts; [`read_exact`] and
//! [`write_all`] retry short transfers until the request is satisfied or the
//! stream stops making progress.

use alloc::vec::Vec;

use crate::{Error, Malformed};

/// How many bytes the default [`Input::skip`] discards per read.
pub const SKIP_BLOCK_SIZE: usize = 1024;

/// A source of bytes.
pub trait Input {
    /// Reads up to `buf.len()` bytes into `buf` and returns how many were
    /// read. `Ok(0)` for a non-empty `buf` means the stream is exhausted.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] when the stream fails.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error>;

    /// Discards exactly `len` bytes.
    ///
    /// The default implementation reads into a stack buffer in
    /// [`SKIP_BLOCK_SIZE`] chunks; seekable or in-memory streams should
    /// override it.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] when fewer than `len` bytes are available.
    fn skip(&mut self, mut len: u64) -> Result<(), Error> {
        let mut scratch = [0u8; SKIP_BLOCK_SIZE];
        while len > 0 {
            let chunk = usize::try_from(len).map_or(SKIP_BLOCK_SIZE, |n| n.min(SKIP_BLOCK_SIZE));
            read_exact(self, &mut scratch[..chunk])?;
            len -= chunk as u64;
        }
        Ok(())
    }
}

/// A sink for bytes.
pub trait Output {
    /// Writes up to `buf.len()` bytes and returns how many were accepted.
    /// `Ok(0)` for a non-empty `buf` means the sink is full.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] when the sink fails.
    fn write(&mut self, buf: &[u8]) -> Result<usize, Error>;
}

/// The stream a context is bound to. Its variant decides the
/// [`Mode`](crate::Mode).
pub enum Stream<'a> {
    /// Read mode.
    Input(&'a mut dyn Input),
    /// Write mode.
    Output(&'a mut dyn Output),
}

impl Stream<'_> {
    pub(crate) fn input(&mut self) -> Result<&mut dyn Input, Error> {
        match self {
            Self::Input(input) => Ok(&mut **input),
            Self::Output(_) => Err(Malformed::WrongMode.into()),
        }
    }

    pub(crate) fn output(&mut self) -> Result<&mut dyn Output, Error> {
        match self {
            Self::Output(output) => Ok(&mut **output),
            Self::Input(_) => Err(Malformed::WrongMode.into()),
        }
    }
}

/// Fills `buf` completely.
///
/// # Errors
///
/// [`Error::Io`] when the input fails or runs dry first.
pub fn read_exact<I: Input + ?Sized>(input: &mut I, mut buf: &mut [u8]) -> Result<(), Error> {
    while !buf.is_empty() {
        let n = input.read(buf)?;
        if n == 0 {
            return Err(Error::Io);
        }
        buf = &mut buf[n..];
    }
    Ok(())
}

/// Writes all of `buf`.
///
/// # Errors
///
/// [`Error::Io`] when the output fails or stops accepting bytes first.
pub fn write_all<O: Output + ?Sized>(output: &mut O, mut buf: &[u8]) -> Result<(), Error> {
    while !buf.is_empty() {
        let n = output.write(buf)?;
        if n == 0 {
            return Err(Error::Io);
        }
        buf = &buf[n..];
    }
    Ok(())
}

impl Input for &[u8] {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        let n = buf.len().min(self.len());
        let (head, tail) = self.split_at(n);
        buf[..n].copy_from_slice(head);
        *self = tail;
        Ok(n)
    }

    fn skip(&mut self, len: u64) -> Result<(), Error> {
        match usize::try_from(len) {
            Ok(len) if len <= self.len() => {
                *self = &self[len..];
                Ok(())
            }
            _ => Err(Error::Io),
        }
    }
}

impl Output for Vec<u8> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Error> {
        self.extend_from_slice(buf);
        Ok(buf.len())
    }
}

/// A fixed-capacity output over a caller-owned slice.
///
/// Writes past the end of the slice fail with [`Error::Io`], which makes it
/// suitable for emitting into preallocated frames.
#[derive(Debug)]
pub struct SliceOutput<'a> {
    buf: &'a mut [u8],
    len: usize,
}

impl<'a> SliceOutput<'a> {
    /// Wraps `buf`; writing starts at its first byte.
    #[must_use]
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, len: 0 }
    }

    /// The bytes written so far.
    #[must_use]
    pub fn written(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

impl Output for SliceOutput<'_> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Error> {
        let n = buf.len().min(self.buf.len() - self.len);
        self.buf[self.len..self.len + n].copy_from_slice(&buf[..n]);
        self.len += n;
        Ok(n)
    }
}

#[cfg(feature = "std")]
pub use io::{IoInput, IoOutput};

#[cfg(feature = "std")]
mod io {
    use std::io::{self, ErrorKind, Read, Write};

    use super::{Input, Output};
    use crate::Error;

    /// Adapts any [`std::io::Read`] (files, sockets, cursors) into an
    /// [`Input`].
    #[derive(Debug)]
    pub struct IoInput<R>(pub R);

    /// Adapts any [`std::io::Write`] into an [`Output`].
    #[derive(Debug)]
    pub struct IoOutput<W>(pub W);

    impl<R: Read> Input for IoInput<R> {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
            loop {
                match self.0.read(buf) {
                    Ok(n) => return Ok(n),
                    Err(err) if err.kind() == ErrorKind::Interrupted => {}
                    Err(err) => {
                        log::debug!("input stream failed: {err}");
                        return Err(Error::Io);
                    }
                }
            }
        }

        fn skip(&mut self, len: u64) -> Result<(), Error> {
            let copied = io::copy(&mut (&mut self.0).take(len), &mut io::sink()).map_err(|err| {
                log::debug!("input stream failed while skipping: {err}");
                Error::Io
            })?;
            if copied == len { Ok(()) } else { Err(Error::Io) }
        }
    }

    impl<W: Write> Output for IoOutput<W> {
        fn write(&mut self, buf: &[u8]) -> Result<usize, Error> {
            loop {
                match self.0.write(buf) {
                    Ok(n) => return Ok(n),
                    Err(err) if err.kind() == ErrorKind::Interrupted => {}
                    Err(err) => {
                        log::debug!("output stream failed: {err}");
                        return Err(Error::Io);
                    }
                }
            }
        }
    }
}
