use alloc::{vec, vec::Vec};

use rstest::rstest;

use super::utils::{read_with, write_with};
use crate::{Config, Context, Error, Malformed, ScopeKind, size_for};

fn malformed(m: Malformed) -> Result<(), Error> {
    Err(Error::Malformed(m))
}

#[test]
fn nesting_beyond_max_depth_is_malformed() {
    let config = Config {
        max_depth: 2,
        ..Config::default()
    };

    let ok = write_with(config, |ctx| {
        ctx.array(&mut 1)?;
        ctx.array(&mut 1)?;
        assert_eq!(ctx.depth(), 2);
        ctx.uint(&mut 0)
    });
    assert!(ok.is_ok());

    let too_deep = write_with(config, |ctx| {
        ctx.array(&mut 1)?;
        ctx.array(&mut 1)?;
        ctx.array(&mut 1)
    });
    assert_eq!(too_deep.map(drop), malformed(Malformed::DepthExceeded));
}

#[test]
fn reading_beyond_max_depth_is_malformed() {
    let nested = |ctx: &mut Context<'_>| -> Result<(), Error> {
        let mut len = 1;
        ctx.array(&mut len)?;
        crate::record!(ctx, {
            "inner" => {
                let mut len = 1;
                ctx.array(&mut len)?;
                ctx.uint(&mut 3)?;
            }
        });
        ctx.status()
    };
    let bytes = write_with(Config::default(), nested).unwrap();

    let deep_enough = Config {
        max_depth: 3,
        ..Config::default()
    };
    assert_eq!(read_with(deep_enough, &bytes, nested), Ok(()));

    let shallow = Config {
        max_depth: 2,
        ..Config::default()
    };
    assert_eq!(
        read_with(shallow, &bytes, nested),
        malformed(Malformed::DepthExceeded)
    );
}

fn three_fields(ctx: &mut Context<'_>) -> Result<(), Error> {
    crate::record!(ctx, {
        "a" => ctx.uint(&mut 1)?,
        "b" => ctx.uint(&mut 2)?,
        "c" => ctx.uint(&mut 3)?,
    });
    ctx.status()
}

#[test]
fn record_wider_than_max_fields_is_malformed() {
    let narrow = Config {
        max_record_fields: 2,
        ..Config::default()
    };
    assert_eq!(
        write_with(narrow, three_fields).map(drop),
        malformed(Malformed::TooManyFields)
    );

    let bytes = write_with(Config::default(), three_fields).unwrap();
    assert_eq!(
        read_with(narrow, &bytes, three_fields),
        malformed(Malformed::TooManyFields)
    );
}

#[test]
fn symbol_limits_are_malformed() {
    let few = Config {
        max_num_symbols: 2,
        ..Config::default()
    };
    let three = |ctx: &mut Context<'_>| -> Result<(), Error> {
        for name in ["one", "two", "three"] {
            ctx.symbol(name)?;
        }
        Ok(())
    };
    assert_eq!(
        write_with(few, three).map(drop),
        malformed(Malformed::SymbolTableFull)
    );
    let bytes = write_with(Config::default(), three).unwrap();
    assert_eq!(
        read_with(few, &bytes, three),
        malformed(Malformed::SymbolTableFull)
    );

    let short = Config {
        max_symbol_len: 4,
        ..Config::default()
    };
    assert_eq!(
        write_with(short, |ctx| ctx.symbol("toolong").map(drop)).map(drop),
        malformed(Malformed::SymbolTooLong(7))
    );
}

#[test]
fn reference_to_undefined_symbol_is_malformed() {
    assert_eq!(
        read_with(Config::default(), &[7, 3], |ctx| ctx.symbol("").map(drop)),
        malformed(Malformed::UnknownSymbol(3))
    );
}

#[rstest]
#[case(0, Some(0))]
#[case(255, Some(255))]
#[case(256, None)]
#[case(1000, None)]
fn unsigned_narrowing(#[case] mut wire: u64, #[case] expected: Option<u8>) {
    let bytes = write_with(Config::default(), |ctx| ctx.uint(&mut wire)).unwrap();
    let mut value = 0u8;
    let result = read_with(Config::default(), &bytes, |ctx| ctx.u8(&mut value));
    match expected {
        Some(n) => assert_eq!((result, value), (Ok(()), n)),
        None => assert_eq!(result, malformed(Malformed::OutOfRange)),
    }
}

#[rstest]
#[case(-32768, Some(-32768))]
#[case(32767, Some(32767))]
#[case(-32769, None)]
#[case(i64::MAX, None)]
fn signed_narrowing(#[case] mut wire: i64, #[case] expected: Option<i16>) {
    let bytes = write_with(Config::default(), |ctx| ctx.sint(&mut wire)).unwrap();
    let mut value = 0i16;
    let result = read_with(Config::default(), &bytes, |ctx| ctx.int(&mut value));
    match expected {
        Some(n) => assert_eq!((result, value), (Ok(()), n)),
        None => assert_eq!(result, malformed(Malformed::OutOfRange)),
    }
}

#[test]
fn wrong_tag_is_malformed() {
    let bytes = write_with(Config::default(), |ctx| ctx.uint(&mut 1)).unwrap();
    let mut f = 0.0;
    assert_eq!(
        read_with(Config::default(), &bytes, |ctx| ctx.f32(&mut f)),
        malformed(Malformed::UnexpectedTag(1))
    );
}

#[test]
fn truncated_stream_is_io() {
    let bytes = write_with(Config::default(), |ctx| ctx.f64(&mut 1.0)).unwrap();
    let mut f = 0.0;
    assert_eq!(
        read_with(Config::default(), &bytes[..5], |ctx| ctx.f64(&mut f)),
        Err(Error::Io)
    );
}

#[test]
fn blob_rules() {
    let mut body = *b"payload";
    let bytes = write_with(Config::default(), |ctx| ctx.blob(&mut body, &mut 7)).unwrap();

    let mut small = [0u8; 3];
    let mut len = 0;
    assert_eq!(
        read_with(Config::default(), &bytes, |ctx| ctx.blob(&mut small, &mut len)),
        malformed(Malformed::LengthExceeded(7))
    );

    assert_eq!(
        write_with(Config::default(), |ctx| ctx.blob(&mut small, &mut 4)).map(drop),
        malformed(Malformed::LengthExceeded(4))
    );

    assert_eq!(
        write_with(Config::default(), |ctx| ctx.blob_body(&mut body)).map(drop),
        malformed(Malformed::ScopeViolation(ScopeKind::Root))
    );

    assert_eq!(
        write_with(Config::default(), |ctx| {
            ctx.blob_header(&mut 2)?;
            ctx.uint(&mut 1)
        })
        .map(drop),
        malformed(Malformed::ScopeViolation(ScopeKind::Blob))
    );
}

#[test]
fn peeking_needs_a_reader() {
    assert_eq!(
        write_with(Config::default(), |ctx| ctx.peek_tag().map(drop)).map(drop),
        malformed(Malformed::WrongMode)
    );
}

#[test]
fn undersized_buffer_is_rejected_up_front() {
    let config = Config::default();
    let mut mem = vec![0u8; size_for(&config) - 1];
    let mut out = Vec::new();
    assert!(matches!(
        Context::writer(&mut mem, config, &mut out),
        Err(Error::BufferTooSmall { required, provided }) if required == provided + 1
    ));
}
