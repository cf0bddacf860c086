//! `ssat`/`usat` wrappers. The saturation position is an immediate, so each
//! width the integer types can ask for gets its own instruction.

use core::arch::asm;

macro_rules! sat {
    ($insn:literal, $bits:literal, $src:expr) => {{
        let result: i32;
        // SAFETY: register-to-register instruction. It touches no memory
        // and only sets the sticky Q flag.
        unsafe {
            asm!(
                concat!($insn, " {dst}, #", $bits, ", {src}"),
                dst = lateout(reg) result,
                src = in(reg) $src,
                options(pure, nomem, nostack),
            );
        }
        result
    }};
}

#[inline(always)]
pub(super) fn ssat(src: i32, shift: u32) -> i32 {
    match shift {
        8 => sat!("ssat", 8, src),
        16 => sat!("ssat", 16, src),
        _ => sat!("ssat", 32, src),
    }
}

/// The result is at most `2^31 - 1`, so it is returned as `i32`.
#[inline(always)]
pub(super) fn usat(src: i32, shift: u32) -> i32 {
    match shift {
        8 => sat!("usat", 8, src),
        16 => sat!("usat", 16, src),
        _ => sat!("usat", 31, src),
    }
}
