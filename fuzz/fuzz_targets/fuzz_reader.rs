#![no_main]

use libfuzzer_sys::fuzz_target;
use tagwire::{Config, Context, Error, Tag, size_for};

const KEYS: [&str; 4] = ["id", "name", "x", "y"];

/// Rows without columns consume no input, so cap how many are visited.
const MAX_ROWS: u64 = 1024;

/// Reads whatever value comes next, recursing into containers.
fn walk(ctx: &mut Context<'_>) -> Result<(), Error> {
    match ctx.peek_tag()? {
        Tag::Uint => ctx.uint(&mut 0)?,
        Tag::Sint => ctx.sint(&mut 0)?,
        Tag::F32 => ctx.f32(&mut 0.0)?,
        Tag::F64 => ctx.f64(&mut 0.0)?,
        Tag::Blob => {
            let mut buf = [0u8; 256];
            let mut len = 0;
            ctx.blob(&mut buf, &mut len)?;
        }
        Tag::SymbolDef | Tag::SymbolRef => {
            let id = ctx.symbol("")?;
            assert!(ctx.resolve(id).is_some(), "read symbol {id} does not resolve");
        }
        Tag::Array => {
            let mut len = 0;
            ctx.array(&mut len)?;
            for _ in 0..len {
                walk(ctx)?;
            }
        }
        Tag::Table => {
            let mut len = 0;
            ctx.table(&mut len)?;
            for _ in 0..len.min(MAX_ROWS) {
                fields(ctx)?;
            }
        }
        Tag::Record => fields(ctx)?,
    }
    ctx.status()
}

fn fields(ctx: &mut Context<'_>) -> Result<(), Error> {
    ctx.record_with(|ctx| {
        for key in KEYS {
            if ctx.key(key) {
                walk(ctx)?;
            }
        }
        Ok(())
    })
}

fn reader(data: &[u8]) {
    let [depth, width, rest @ ..] = data else {
        return;
    };
    let config = Config {
        max_depth: u32::from(depth % 16) + 1,
        max_record_fields: u32::from(width % 16) + 1,
        ..Config::default()
    };
    let mut mem = vec![0u8; size_for(&config)];

    let mut outcome = None;
    for _ in 0..2 {
        let mut input = rest;
        let mut ctx = Context::reader(&mut mem, config, &mut input).expect("sized buffer");
        let result = walk(&mut ctx);
        assert_eq!(result, ctx.status(), "result and latched status disagree");
        let run = (result, input.len());
        // Leftover state in the reused buffer must not change the outcome.
        assert_eq!(*outcome.get_or_insert(run), run);
    }
}

fuzz_target!(|data: &[u8]| reader(data));
