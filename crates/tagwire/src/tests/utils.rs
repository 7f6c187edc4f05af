use alloc::{vec, vec::Vec};

use crate::{Config, Context, Error, Input, Output, size_for};

/// Runs `describe` against a fresh writer and returns the bytes it produced.
pub fn write_with<F>(config: Config, describe: F) -> Result<Vec<u8>, Error>
where
    F: FnOnce(&mut Context<'_>) -> Result<(), Error>,
{
    let mut mem = vec![0u8; size_for(&config)];
    let mut out = Vec::new();
    let mut ctx = Context::writer(&mut mem, config, &mut out)?;
    describe(&mut ctx)?;
    ctx.status()?;
    Ok(out)
}

/// Runs `describe` against a fresh reader over `bytes`.
pub fn read_with<F>(config: Config, bytes: &[u8], describe: F) -> Result<(), Error>
where
    F: FnOnce(&mut Context<'_>) -> Result<(), Error>,
{
    let mut mem = vec![0u8; size_for(&config)];
    let mut input = bytes;
    let mut ctx = Context::reader(&mut mem, config, &mut input)?;
    describe(&mut ctx)?;
    ctx.status()
}

/// An input that counts how often it is asked for bytes.
pub struct CountingInput<'a> {
    pub bytes: &'a [u8],
    pub reads: usize,
}

impl<'a> CountingInput<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, reads: 0 }
    }
}

impl Input for CountingInput<'_> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        self.reads += 1;
        Input::read(&mut self.bytes, buf)
    }
}

/// An output that counts how often it is handed bytes.
#[derive(Default)]
pub struct CountingOutput {
    pub bytes: Vec<u8>,
    pub writes: usize,
}

impl Output for CountingOutput {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Error> {
        self.writes += 1;
        Output::write(&mut self.bytes, buf)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

pub fn vec2(ctx: &mut Context<'_>, v: &mut Vec2) -> Result<(), Error> {
    crate::record!(ctx, {
        "x" => ctx.f32(&mut v.x)?,
        "y" => ctx.f32(&mut v.y)?,
    });
    ctx.status()
}

/// The four-field document used across the record tests.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Example {
    pub num: u64,
    pub text: Vec<u8>,
    pub array: Vec<u32>,
    pub vec2: Vec2,
}

impl Example {
    pub fn sample() -> Self {
        Self {
            num: 42069,
            text: b"Hello".to_vec(),
            array: vec![1, 2, 3],
            vec2: Vec2 { x: 4.0, y: -3.5 },
        }
    }
}

pub fn text(ctx: &mut Context<'_>, text: &mut Vec<u8>) -> Result<(), Error> {
    let mut len = text.len() as u64;
    ctx.blob_header(&mut len)?;
    text.resize(usize::try_from(len).unwrap_or(0), 0);
    ctx.blob_body(text)
}

pub fn numbers(ctx: &mut Context<'_>, array: &mut Vec<u32>) -> Result<(), Error> {
    let mut len = array.len() as u64;
    ctx.array(&mut len)?;
    array.resize(usize::try_from(len).unwrap_or(0), 0);
    for n in array.iter_mut() {
        ctx.u32(n)?;
    }
    ctx.status()
}

/// Fields in declaration order.
pub fn example(ctx: &mut Context<'_>, e: &mut Example) -> Result<(), Error> {
    crate::record!(ctx, {
        "num" => ctx.uint(&mut e.num)?,
        "str" => text(ctx, &mut e.text)?,
        "array" => numbers(ctx, &mut e.array)?,
        "vec2" => vec2(ctx, &mut e.vec2)?,
    });
    ctx.status()
}

/// Same fields, different order.
pub fn example_reordered(ctx: &mut Context<'_>, e: &mut Example) -> Result<(), Error> {
    crate::record!(ctx, {
        "str" => text(ctx, &mut e.text)?,
        "array" => numbers(ctx, &mut e.array)?,
        "vec2" => vec2(ctx, &mut e.vec2)?,
        "num" => ctx.uint(&mut e.num)?,
    });
    ctx.status()
}

/// How many cases each property runs.
pub fn quickcheck_tests() -> u64 {
    #[cfg(not(miri))]
    let tests = if is_ci::cached() { 10_000 } else { 1_000 };
    #[cfg(miri)]
    let tests = 10;
    tests
}
