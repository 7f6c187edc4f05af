//! Accessor generation for the little-endian slots carved out of the backing
//! buffer.
//!
//! Slot structs store their fields as `zerocopy` `U32`/`U64` so they can be
//! cast from arbitrary, unaligned bytes. This macro generates a native getter
//! and a `set_` counterpart per field:
//!
//! ```ignore
//! impl SymbolSlot {
//!     slot_accessors! {
//!         offset: u32,
//!         len: u32,
//!     }
//! }
//! // fn offset(&self) -> u32
//! // fn set_offset(&mut self, val: u32)
//! ```

macro_rules! slot_accessors {
    (@impl $field:ident, u32) => {
        ::paste::paste! {
            #[inline]
            pub(crate) fn $field(&self) -> u32 {
                self.$field.get()
            }

            #[inline]
            pub(crate) fn [<set_ $field>](&mut self, val: u32) {
                self.$field = ::zerocopy::little_endian::U32::new(val);
            }
        }
    };
    (@impl $field:ident, u64) => {
        ::paste::paste! {
            #[inline]
            pub(crate) fn $field(&self) -> u64 {
                self.$field.get()
            }

            #[inline]
            pub(crate) fn [<set_ $field>](&mut self, val: u64) {
                self.$field = ::zerocopy::little_endian::U64::new(val);
            }
        }
    };
    ($($field:ident : $ty:tt),* $(,)?) => {
        $(
            slot_accessors!(@impl $field, $ty);
        )*
    };
}

/// Generates the narrowing integer adapters on `Context`: each reads or
/// writes through the 64-bit path and rejects values outside the target
/// range.
macro_rules! narrowing_adapters {
    ($($name:ident: $ty:ty => $wide:ident as $wide_ty:ty),* $(,)?) => {
        $(
            #[doc = concat!("Reads or writes a `", stringify!($ty), "` through the ")]
            #[doc = concat!("`", stringify!($wide_ty), "` path, failing with ")]
            #[doc = "[`Malformed::OutOfRange`] when the decoded value does not fit."]
            #[doc = ""]
            #[doc = "# Errors"]
            #[doc = ""]
            #[doc = "The latched status on failure."]
            pub fn $name(&mut self, value: &mut $ty) -> Result<(), Error> {
                let mut wide = <$wide_ty>::from(*value);
                self.$wide(&mut wide)?;
                let narrowed = <$ty>::try_from(wide)
                    .map_err(|_| Error::Malformed(Malformed::OutOfRange));
                *value = self.latch(narrowed)?;
                Ok(())
            }
        )*
    };
}
