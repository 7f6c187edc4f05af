#![allow(missing_docs, dead_code)]

use std::fmt::Write as _;

use tagwire::{Config, Context, Error, size_for};

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

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

pub fn vec2(ctx: &mut Context<'_>, v: &mut Vec2) -> Result<(), Error> {
    tagwire::record!(ctx, {
        "x" => ctx.f32(&mut v.x)?,
        "y" => ctx.f32(&mut v.y)?,
    });
    ctx.status()
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

pub fn example(ctx: &mut Context<'_>, e: &mut Example) -> Result<(), Error> {
    tagwire::record!(ctx, {
        "num" => ctx.uint(&mut e.num)?,
        "str" => text(ctx, &mut e.text)?,
        "array" => numbers(ctx, &mut e.array)?,
        "vec2" => vec2(ctx, &mut e.vec2)?,
    });
    ctx.status()
}

pub fn encode<F>(describe: F) -> Vec<u8>
where
    F: FnOnce(&mut Context<'_>) -> Result<(), Error>,
{
    let config = Config::default();
    let mut mem = vec![0u8; size_for(&config)];
    let mut out = Vec::new();
    let mut ctx = Context::writer(&mut mem, config, &mut out).expect("backing buffer");
    describe(&mut ctx).expect("encode");
    drop(ctx);
    out
}

/// Sixteen space-separated hex bytes per line.
pub fn hex(bytes: &[u8]) -> String {
    let mut out = String::new();
    for (i, line) in bytes.chunks(16).enumerate() {
        if i > 0 {
            out.push('\n');
        }
        for (j, byte) in line.iter().enumerate() {
            if j > 0 {
                out.push(' ');
            }
            write!(out, "{byte:02x}").unwrap();
        }
    }
    out
}
