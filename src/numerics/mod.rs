//! Saturating integer casts.
//!
//! [`saturated_cast`] clamps a value into the range of the destination type
//! instead of wrapping. On ARM builds with the `asm` feature, narrowing casts
//! from small signed types are done with a single `ssat`/`usat` instruction;
//! everywhere else the portable clamp is used.

#[cfg(all(feature = "asm", target_arch = "arm"))]
mod arm;
mod saturate;

pub use saturate::{
    ENABLE_ASM_CODE, SaturateFastAsmOp, SaturateOp, SaturatePortableOp,
    fast_path_shape_supported, saturated_cast,
};

mod sealed {
    pub trait Sealed {}
}

/// A primitive integer type, described by the properties the saturation
/// routines branch on.
pub trait Integer: Copy + PartialOrd + sealed::Sealed {
    const IS_SIGNED: bool;
    /// Digits plus the sign bit. Equal to the type's bit width.
    const BITS_PLUS_SIGN: u32;
    const MIN: i128;
    const MAX: i128;

    fn to_i128(self) -> i128;

    /// Keeps the low bits of `value`, like an `as` cast.
    fn from_i128_truncating(value: i128) -> Self;
}

macro_rules! impl_integer {
    ($($t:ty => $signed:expr),* $(,)?) => {
        $(
            impl sealed::Sealed for $t {}

            impl Integer for $t {
                const IS_SIGNED: bool = $signed;
                const BITS_PLUS_SIGN: u32 = <$t>::BITS;
                const MIN: i128 = <$t>::MIN as i128;
                const MAX: i128 = <$t>::MAX as i128;

                #[inline(always)]
                fn to_i128(self) -> i128 {
                    self as i128
                }

                #[inline(always)]
                fn from_i128_truncating(value: i128) -> Self {
                    value as $t
                }
            }
        )*
    };
}

impl_integer! {
    i8 => true,
    i16 => true,
    i32 => true,
    i64 => true,
    isize => true,
    u8 => false,
    u16 => false,
    u32 => false,
    u64 => false,
    usize => false,
}

/// True when every value of `Src` is representable in `Dst`.
pub const fn is_type_in_range<Dst: Integer, Src: Integer>() -> bool {
    Dst::MIN <= Src::MIN && Src::MAX <= Dst::MAX
}
