// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Call-free word copy/fill used while the memory image is still being built
//! OWNERS: @kernel-boot-team
//! PUBLIC API: copy_words(), zero_words(), WORD
//! INVARIANTS: Word granularity; byte counts are multiples of WORD; stores are volatile
//!
//! `core::ptr::copy_nonoverlapping` and friends may lower to a `memcpy` call
//! whose implementation lives in the very image being constructed. The
//! volatile stores below keep LLVM from recognising the loops as libcalls.

use core::ptr::{read, write_volatile};

/// Native word width of the target in bytes.
pub const WORD: usize = core::mem::size_of::<u32>();

/// Copies `bytes` bytes from `src` to `dest`, one word at a time.
///
/// Trailing bytes that do not fill a whole word are left untouched.
///
/// # Safety
///
/// `src` must be readable and `dest` writable for `bytes` bytes, both must
/// be word aligned, and the ranges must not overlap.
#[inline(always)]
pub unsafe fn copy_words(dest: *mut u32, src: *const u32, bytes: usize) {
    let mut d = dest;
    let mut s = src;
    let mut remaining = bytes;
    while remaining >= WORD {
        // SAFETY: both cursors stay inside the caller-provided ranges.
        unsafe {
            write_volatile(d, read(s));
            d = d.add(1);
            s = s.add(1);
        }
        remaining -= WORD;
    }
}

/// Writes `bytes` bytes of zero at `dest`, one word at a time.
///
/// # Safety
///
/// `dest` must be word aligned and writable for `bytes` bytes.
#[inline(always)]
pub unsafe fn zero_words(dest: *mut u32, bytes: usize) {
    let mut d = dest;
    let mut remaining = bytes;
    while remaining >= WORD {
        // SAFETY: the cursor stays inside the caller-provided range.
        unsafe {
            write_volatile(d, 0);
            d = d.add(1);
        }
        remaining -= WORD;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const GUARD: u32 = 0xDEAD_BEEF;

    #[test]
    fn zero_length_is_a_no_op() {
        let src = [1u32, 2];
        let mut dst = [GUARD; 2];
        unsafe {
            copy_words(dst.as_mut_ptr(), src.as_ptr(), 0);
            zero_words(dst.as_mut_ptr(), 0);
        }
        assert_eq!(dst, [GUARD; 2]);
    }

    #[test]
    fn partial_word_tail_is_not_written() {
        let src = [0x1111_1111u32, 0x2222_2222];
        let mut dst = [GUARD; 2];
        unsafe { copy_words(dst.as_mut_ptr(), src.as_ptr(), WORD + 3) };
        assert_eq!(dst, [0x1111_1111, GUARD]);
    }

    proptest! {
        #[test]
        fn copy_reproduces_source_within_bounds(words in proptest::collection::vec(any::<u32>(), 0..64)) {
            let n = words.len();
            let mut buf = vec![GUARD; n + 2];
            unsafe { copy_words(buf.as_mut_ptr().add(1), words.as_ptr(), n * WORD) };
            prop_assert_eq!(buf[0], GUARD);
            prop_assert_eq!(&buf[1..=n], &words[..]);
            prop_assert_eq!(buf[n + 1], GUARD);
        }

        #[test]
        fn zero_clears_exactly_the_region(prior in proptest::collection::vec(any::<u32>(), 0..64)) {
            let n = prior.len();
            let mut buf = vec![GUARD; n + 2];
            buf[1..=n].copy_from_slice(&prior);
            unsafe { zero_words(buf.as_mut_ptr().add(1), n * WORD) };
            prop_assert_eq!(buf[0], GUARD);
            prop_assert!(buf[1..=n].iter().all(|&w| w == 0));
            prop_assert_eq!(buf[n + 1], GUARD);
        }
    }
}
