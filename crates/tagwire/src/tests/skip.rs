use alloc::vec::Vec;

use rstest::rstest;

use super::utils::{Vec2, read_with, text, vec2, write_with};
use crate::{Config, Context, Error, Malformed};

/// A record carrying one field of every shape next to the one readers want.
fn everything(ctx: &mut Context<'_>) -> Result<(), Error> {
    crate::record!(ctx, {
        "blob" => text(ctx, &mut b"bytes".to_vec())?,
        "single" => ctx.f32(&mut 1.5)?,
        "double" => ctx.f64(&mut -2.25)?,
        "signed" => ctx.sint(&mut -300)?,
        "sym" => ctx.symbol("value")?,
        "nested" => {
            ctx.array(&mut 2)?;
            for n in 0..2 {
                ctx.array(&mut 1)?;
                ctx.uint(&mut { n })?;
            }
        },
        "rows" => {
            ctx.table(&mut 2)?;
            for _ in 0..2 {
                vec2(ctx, &mut Vec2 { x: 1.0, y: 2.0 })?;
            }
        },
        "no_rows" => ctx.table(&mut 0)?,
        "inner" => vec2(ctx, &mut Vec2 { x: 3.0, y: 4.0 })?,
        "empty" => ctx.record_with(|_| Ok(()))?,
        "keep" => ctx.uint(&mut 77)?,
    });
    ctx.uint(&mut 5)
}

#[test]
fn unknown_fields_of_every_shape_are_skipped() {
    let mut written_symbols = 0;
    let bytes = write_with(Config::default(), |ctx| {
        everything(ctx)?;
        written_symbols = ctx.symbol_count();
        Ok(())
    })
    .unwrap();

    let (mut keep, mut after) = (0, 0);
    read_with(Config::default(), &bytes, |ctx| {
        crate::record!(ctx, {
            "keep" => ctx.uint(&mut keep)?,
        });
        ctx.uint(&mut after)?;
        assert_eq!(ctx.depth(), 0);
        assert_eq!(ctx.symbol_count(), written_symbols);
        Ok(())
    })
    .unwrap();
    assert_eq!((keep, after), (77, 5));
}

#[test]
fn symbols_defined_in_skipped_values_stay_referable() {
    let bytes = write_with(Config::default(), |ctx| {
        crate::record!(ctx, {
            "ignored" => ctx.symbol("shared")?,
            "kept" => ctx.symbol("shared")?,
        });
        ctx.status()
    })
    .unwrap();

    read_with(Config::default(), &bytes, |ctx| {
        let mut kept = None;
        crate::record!(ctx, {
            "kept" => kept = Some(ctx.symbol("")?),
        });
        ctx.status()?;
        let kept = kept.and_then(|id| ctx.resolve(id)).unwrap();
        assert_eq!(kept, "shared");
        Ok(())
    })
    .unwrap();
}

fn deep(ctx: &mut Context<'_>) -> Result<(), Error> {
    crate::record!(ctx, {
        "deep" => {
            for _ in 0..3 {
                ctx.array(&mut 1)?;
            }
            ctx.uint(&mut 0)?;
        },
    });
    ctx.status()
}

#[rstest]
#[case(4, Ok(()))]
#[case(3, Err(Error::Malformed(Malformed::DepthExceeded)))]
fn skipping_respects_max_depth(#[case] max_depth: u32, #[case] expected: Result<(), Error>) {
    let bytes = write_with(Config::default(), deep).unwrap();
    let config = Config {
        max_depth,
        ..Config::default()
    };
    assert_eq!(
        read_with(config, &bytes, |ctx| ctx.record_with(|_| Ok(()))),
        expected
    );
}

#[test]
fn unknown_tag_in_a_skipped_field_is_malformed() {
    let bytes = [10, 1, 6, 1, b'x', 0xee];
    assert_eq!(
        read_with(Config::default(), &bytes, |ctx| ctx.record_with(|_| Ok(()))),
        Err(Error::Malformed(Malformed::UnexpectedTag(0xee)))
    );
}

#[test]
fn skipped_blob_must_be_complete() {
    let mut bytes: Vec<u8> = write_with(Config::default(), |ctx| {
        ctx.record_with(|ctx| {
            if ctx.key("payload") {
                text(ctx, &mut b"truncated".to_vec())?;
            }
            Ok(())
        })
    })
    .unwrap();
    bytes.truncate(bytes.len() - 3);

    assert_eq!(
        read_with(Config::default(), &bytes, |ctx| ctx.record_with(|_| Ok(()))),
        Err(Error::Io)
    );
}
