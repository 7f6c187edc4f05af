//! Stateless primitive encodings.
//!
//! - Unsigned integers are variable-length: 7 payload bits per byte, least
//!   significant group first, high bit set on every byte but the last. A
//!   `u64` never needs more than [`MAX_VARINT_LEN`] bytes.
//! - Signed integers are zigzag folded (`0, -1, 1, -2, ...` map to
//!   `0, 1, 2, 3, ...`) before varint encoding.
//! - Floats are their IEEE-754 bit patterns in little-endian byte order.

use crate::{
    Error, Malformed,
    stream::{Input, Output, read_exact, write_all},
};

/// Upper bound on the encoded size of a `u64`.
pub const MAX_VARINT_LEN: usize = 10;

/// Writes `value` as a varint.
///
/// # Errors
///
/// [`Error::Io`] from the output.
pub fn write_uint<O: Output + ?Sized>(value: u64, output: &mut O) -> Result<(), Error> {
    let mut buf = [0u8; MAX_VARINT_LEN];
    let mut rest = value;
    let mut n = 0;
    loop {
        let byte = (rest & 0x7f) as u8;
        rest >>= 7;
        if rest == 0 {
            buf[n] = byte;
            n += 1;
            break;
        }
        buf[n] = byte | 0x80;
        n += 1;
    }
    write_all(output, &buf[..n])
}

/// Reads a varint.
///
/// # Errors
///
/// [`Error::Io`] from the input, [`Malformed::VarintOverflow`] when the tenth
/// byte carries anything beyond bit 63 or still has its continuation bit
/// set.
pub fn read_uint<I: Input + ?Sized>(input: &mut I) -> Result<u64, Error> {
    let mut value = 0u64;
    for i in 0..MAX_VARINT_LEN {
        let mut byte = [0u8; 1];
        read_exact(input, &mut byte)?;
        if i == MAX_VARINT_LEN - 1 && byte[0] > 1 {
            break;
        }
        value |= u64::from(byte[0] & 0x7f) << (7 * i);
        if byte[0] < 0x80 {
            return Ok(value);
        }
    }
    Err(Malformed::VarintOverflow.into())
}

/// Folds a signed integer so that small magnitudes of either sign encode
/// into few bytes.
#[inline]
#[must_use]
pub fn zigzag(value: i64) -> u64 {
    let folded = (value as u64) << 1;
    if value < 0 { !folded } else { folded }
}

/// Inverse of [`zigzag`].
#[inline]
#[must_use]
pub fn unzigzag(value: u64) -> i64 {
    let half = (value >> 1) as i64;
    if value & 1 == 0 { half } else { !half }
}

/// Writes `value` zigzag folded.
///
/// # Errors
///
/// [`Error::Io`] from the output.
pub fn write_sint<O: Output + ?Sized>(value: i64, output: &mut O) -> Result<(), Error> {
    write_uint(zigzag(value), output)
}

/// Reads a zigzag folded varint.
///
/// # Errors
///
/// See [`read_uint`].
pub fn read_sint<I: Input + ?Sized>(input: &mut I) -> Result<i64, Error> {
    read_uint(input).map(unzigzag)
}

/// Writes the four little-endian bytes of `value`.
///
/// # Errors
///
/// [`Error::Io`] from the output.
pub fn write_f32<O: Output + ?Sized>(value: f32, output: &mut O) -> Result<(), Error> {
    write_all(output, &value.to_bits().to_le_bytes())
}

/// Reads four little-endian bytes as an `f32`.
///
/// # Errors
///
/// [`Error::Io`] from the input.
pub fn read_f32<I: Input + ?Sized>(input: &mut I) -> Result<f32, Error> {
    let mut buf = [0u8; 4];
    read_exact(input, &mut buf)?;
    Ok(f32::from_bits(u32::from_le_bytes(buf)))
}

/// Writes the eight little-endian bytes of `value`.
///
/// # Errors
///
/// [`Error::Io`] from the output.
pub fn write_f64<O: Output + ?Sized>(value: f64, output: &mut O) -> Result<(), Error> {
    write_all(output, &value.to_bits().to_le_bytes())
}

/// Reads eight little-endian bytes as an `f64`.
///
/// # Errors
///
/// [`Error::Io`] from the input.
pub fn read_f64<I: Input + ?Sized>(input: &mut I) -> Result<f64, Error> {
    let mut buf = [0u8; 8];
    read_exact(input, &mut buf)?;
    Ok(f64::from_bits(u64::from_le_bytes(buf)))
}

/// Writes a varint length followed by the bytes.
///
/// # Errors
///
/// [`Error::Io`] from the output.
pub fn write_str<O: Output + ?Sized>(bytes: &[u8], output: &mut O) -> Result<(), Error> {
    write_uint(bytes.len() as u64, output)?;
    write_all(output, bytes)
}

/// Reads a length-prefixed byte string into `buf` and returns its length.
///
/// # Errors
///
/// [`Malformed::LengthExceeded`] when the string does not fit `buf`,
/// otherwise see [`read_uint`].
pub fn read_str<I: Input + ?Sized>(buf: &mut [u8], input: &mut I) -> Result<usize, Error> {
    let len = read_uint(input)?;
    let fits = usize::try_from(len).ok().filter(|&n| n <= buf.len());
    let Some(len) = fits else {
        return Err(Malformed::LengthExceeded(len).into());
    };
    read_exact(input, &mut buf[..len])?;
    Ok(len)
}
