#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tagwire::{Config, Context, Error, Record, size_for};

#[derive(Arbitrary, Debug, Clone, PartialEq)]
enum Value {
    Uint(u64),
    Sint(i64),
    Float(u64),
    Blob(Vec<u8>),
    Symbol(String),
    Array(Vec<Value>),
    Record(Vec<(u8, Value)>),
}

impl Value {
    /// Same shape, every leaf reset.
    fn blank(&self) -> Self {
        match self {
            Self::Uint(_) => Self::Uint(0),
            Self::Sint(_) => Self::Sint(0),
            Self::Float(_) => Self::Float(0),
            Self::Blob(bytes) => Self::Blob(vec![0; bytes.len()]),
            Self::Symbol(_) => Self::Symbol(String::new()),
            Self::Array(items) => Self::Array(items.iter().map(Self::blank).collect()),
            Self::Record(fields) => {
                Self::Record(fields.iter().map(|(k, v)| (*k, v.blank())).collect())
            }
        }
    }

    /// Drops repeated field names, which a reader cannot tell apart.
    fn dedup_keys(&mut self) {
        match self {
            Self::Array(items) => items.iter_mut().for_each(Self::dedup_keys),
            Self::Record(fields) => {
                let mut seen = [false; 256];
                fields.retain(|(key, _)| !std::mem::replace(&mut seen[*key as usize], true));
                fields.iter_mut().for_each(|(_, v)| v.dedup_keys());
            }
            _ => {}
        }
    }
}

/// One description for both directions.
fn describe(ctx: &mut Context<'_>, value: &mut Value) -> Result<(), Error> {
    match value {
        Value::Uint(n) => ctx.uint(n),
        Value::Sint(n) => ctx.sint(n),
        Value::Float(bits) => {
            let mut f = f64::from_bits(*bits);
            ctx.f64(&mut f)?;
            *bits = f.to_bits();
            Ok(())
        }
        Value::Blob(bytes) => {
            let mut len = bytes.len() as u64;
            ctx.blob(bytes, &mut len)
        }
        Value::Symbol(name) => {
            let id = ctx.symbol(name.as_bytes())?;
            if let Some(bytes) = ctx.resolve(id) {
                *name = String::from_utf8_lossy(bytes).into_owned();
            }
            Ok(())
        }
        Value::Array(items) => {
            let mut len = items.len() as u64;
            ctx.array(&mut len)?;
            assert_eq!(len, items.len() as u64, "array length changed on the wire");
            for item in items.iter_mut() {
                describe(ctx, item)?;
            }
            ctx.status()
        }
        Value::Record(fields) => {
            let mut record = Record::new();
            while ctx.record(&mut record) {
                for (key, field) in fields.iter_mut() {
                    if ctx.key([*key]) {
                        describe(ctx, field)?;
                    }
                }
            }
            ctx.status()
        }
    }
}

fn roundtrip(mut written: Value) {
    written.dedup_keys();
    let config = Config::default();
    let mut mem = vec![0u8; size_for(&config)];

    let mut bytes = Vec::new();
    let mut ctx = Context::writer(&mut mem, config, &mut bytes).expect("sized buffer");
    let mut source = written.clone();
    if describe(&mut ctx, &mut source).is_err() {
        // Limits exceeded; nothing to compare.
        return;
    }
    drop(ctx);

    let mut read = written.blank();
    let mut input = bytes.as_slice();
    let mut ctx = Context::reader(&mut mem, config, &mut input).expect("sized buffer");
    describe(&mut ctx, &mut read).expect("reading back what was written");
    drop(ctx);

    assert!(input.is_empty(), "{} bytes left unread", input.len());
    assert_eq!(read, written);
}

fuzz_target!(|value: Value| roundtrip(value));
