use super::{Integer, is_type_in_range};

/// Whether inline saturation instructions may be used in this build.
pub const ENABLE_ASM_CODE: bool = cfg!(all(feature = "asm", target_arch = "arm"));

/// The type-shape half of [`SaturateFastAsmOp`]'s capability predicate: a
/// signed source and a destination both no wider than 32 bits, where the
/// source range does not already fit in the destination.
pub const fn fast_path_shape_supported<Dst: Integer, Src: Integer>() -> bool {
    Src::IS_SIGNED
        && Src::BITS_PLUS_SIGN <= <i32 as Integer>::BITS_PLUS_SIGN
        && Dst::BITS_PLUS_SIGN <= <i32 as Integer>::BITS_PLUS_SIGN
        && !is_type_in_range::<Dst, Src>()
}

/// Saturating conversion from `Src` to `Dst`.
pub trait SaturateOp<Dst: Integer, Src: Integer> {
    /// Whether `saturate` may be called for this type pair.
    const IS_SUPPORTED: bool;

    fn saturate(value: Src) -> Dst;
}

/// Comparison-based clamp. Valid for every type pair.
pub struct SaturatePortableOp;

impl<Dst: Integer, Src: Integer> SaturateOp<Dst, Src> for SaturatePortableOp {
    const IS_SUPPORTED: bool = true;

    #[inline]
    fn saturate(value: Src) -> Dst {
        Dst::from_i128_truncating(value.to_i128().clamp(Dst::MIN, Dst::MAX))
    }
}

/// Single-instruction saturation (`ssat`/`usat`) for narrow signed sources.
///
/// Only valid when [`SaturateOp::IS_SUPPORTED`] holds for the pair. Builds
/// without the instruction evaluate the same bounds in portable code, so the
/// result never depends on the target.
pub struct SaturateFastAsmOp;

impl SaturateFastAsmOp {
    /// Saturation bit position for `Dst`. `usat` accepts at most 31.
    pub const fn shift<Dst: Integer>() -> u32 {
        let n = Dst::BITS_PLUS_SIGN;
        if Dst::IS_SIGNED {
            if n <= 32 { n } else { 32 }
        } else if n < 32 {
            n
        } else {
            31
        }
    }

    /// Inclusive `(min, max)` the fast path clamps into for `Dst`.
    pub const fn bounds<Dst: Integer>() -> (i32, i32) {
        let shift = Self::shift::<Dst>();
        if Dst::IS_SIGNED {
            let max = ((1i64 << (shift - 1)) - 1) as i32;
            (-max - 1, max)
        } else {
            (0, ((1i64 << shift) - 1) as i32)
        }
    }
}

impl<Dst: Integer, Src: Integer> SaturateOp<Dst, Src> for SaturateFastAsmOp {
    const IS_SUPPORTED: bool = ENABLE_ASM_CODE && fast_path_shape_supported::<Dst, Src>();

    #[inline(always)]
    fn saturate(value: Src) -> Dst {
        debug_assert!(
            fast_path_shape_supported::<Dst, Src>(),
            "fast saturation requested for an unsupported type pair"
        );
        let src = value.to_i128() as i32;
        Dst::from_i128_truncating(i128::from(saturate_i32::<Dst>(src)))
    }
}

#[cfg(all(feature = "asm", target_arch = "arm"))]
#[inline(always)]
fn saturate_i32<Dst: Integer>(src: i32) -> i32 {
    let shift = SaturateFastAsmOp::shift::<Dst>();
    if Dst::IS_SIGNED {
        super::arm::ssat(src, shift)
    } else {
        super::arm::usat(src, shift)
    }
}

#[cfg(not(all(feature = "asm", target_arch = "arm")))]
#[inline(always)]
fn saturate_i32<Dst: Integer>(src: i32) -> i32 {
    let (min, max) = SaturateFastAsmOp::bounds::<Dst>();
    src.clamp(min, max)
}

/// Converts `value` to `Dst`, clamping to `Dst`'s bounds when it does not fit.
///
/// ```
/// use pdfpages::numerics::saturated_cast;
///
/// assert_eq!(saturated_cast::<i8, i32>(300), 127);
/// assert_eq!(saturated_cast::<u8, i32>(-300), 0);
/// ```
#[inline]
pub fn saturated_cast<Dst: Integer, Src: Integer>(value: Src) -> Dst {
    if <SaturateFastAsmOp as SaturateOp<Dst, Src>>::IS_SUPPORTED {
        <SaturateFastAsmOp as SaturateOp<Dst, Src>>::saturate(value)
    } else {
        <SaturatePortableOp as SaturateOp<Dst, Src>>::saturate(value)
    }
}
