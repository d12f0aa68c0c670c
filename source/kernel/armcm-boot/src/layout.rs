// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Link-time memory image descriptor and the dynamic memory range
//! OWNERS: @kernel-boot-team
//! STATUS: Functional
//! API_STABILITY: Unstable
//! PUBLIC API: Region, MemoryLayout, VectorRelocation, DynamicRange, dynmem_start(), dynmem_end()
//! DEPENDS_ON: link script symbols
//! INVARIANTS: Regions word aligned with word-multiple lengths; copy pairs never overlap
//!
//! Region boundaries come from the link script and never change at run
//! time. The boot path trusts them; [`MemoryLayout::validate`] exists for
//! tests and image tooling.

use core::fmt;

use thiserror::Error;

use crate::mem::WORD;

/// Half-open byte range `[start, end)`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Region {
    start: usize,
    end: usize,
}

impl Region {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Region of `len` bytes beginning at `start`.
    pub const fn with_len(start: usize, len: usize) -> Self {
        Self { start, end: start + len }
    }

    #[inline]
    pub const fn start(&self) -> usize {
        self.start
    }

    #[inline]
    pub const fn end(&self) -> usize {
        self.end
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Both bounds sit on a word boundary, so the length is a word multiple.
    pub const fn is_word_aligned(&self) -> bool {
        self.start % WORD == 0 && self.end % WORD == 0
    }

    /// Empty regions overlap nothing.
    pub const fn overlaps(&self, other: &Region) -> bool {
        !self.is_empty() && !other.is_empty() && self.start < other.end && other.start < self.end
    }

    #[inline]
    pub const fn as_ptr(&self) -> *const u32 {
        self.start as *const u32
    }

    #[inline]
    pub const fn as_mut_ptr(&self) -> *mut u32 {
        self.start as *mut u32
    }
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:#010x}, {:#010x})", self.start, self.end)
    }
}

/// Compiled vector table in flash and the SRAM slot it is copied to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VectorRelocation {
    pub flash: Region,
    pub ram_start: usize,
}

impl VectorRelocation {
    /// SRAM destination, same length as the compiled table.
    pub const fn ram(&self) -> Region {
        Region::with_len(self.ram_start, self.flash.len())
    }
}

/// Memory available to an external allocator: past `.bss`, below the stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DynamicRange {
    start: usize,
    end: usize,
}

impl DynamicRange {
    #[inline]
    pub const fn start(&self) -> usize {
        self.start
    }

    /// Exclusive.
    #[inline]
    pub const fn end(&self) -> usize {
        self.end
    }

    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub const fn contains(&self, addr: usize) -> bool {
        addr >= self.start && addr < self.end
    }

    /// `start` as the pointer handed to an allocator.
    #[inline]
    pub const fn start_ptr(&self) -> *mut u8 {
        self.start as *mut u8
    }

    /// `end` as a pointer; exclusive.
    #[inline]
    pub const fn end_ptr(&self) -> *mut u8 {
        self.end as *mut u8
    }
}

/// Reasons a layout breaks the boot contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("{region} region is not word aligned")]
    Misaligned { region: &'static str },
    #[error("{region} region ends before it starts")]
    Inverted { region: &'static str },
    #[error("{first} region overlaps {second} region")]
    Overlap { first: &'static str, second: &'static str },
    #[error("no memory left between bss and stack")]
    NoDynamicMemory,
}

/// Addressed regions making up the process memory image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryLayout {
    /// Load address of the `.data` initialisers in flash.
    pub data_load: usize,
    pub data: Region,
    pub bss: Region,
    /// Reserved stack; `stack.end()` is the initial stack pointer.
    pub stack: Region,
    pub vectors: Option<VectorRelocation>,
}

impl MemoryLayout {
    /// Flash copy of the `.data` initialisers.
    pub const fn data_image(&self) -> Region {
        Region::with_len(self.data_load, self.data.len())
    }

    #[inline]
    pub const fn data_len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub const fn bss_len(&self) -> usize {
        self.bss.len()
    }

    /// Span between the end of `.bss` and the base of the stack.
    pub const fn dynamic_range(&self) -> DynamicRange {
        DynamicRange { start: self.bss.end(), end: self.stack.start() }
    }

    /// Checks alignment, ordering and overlap of every region.
    pub fn validate(&self) -> Result<(), LayoutError> {
        let mut named: [(&str, Region); 6] = [
            ("data", self.data),
            ("data image", self.data_image()),
            ("bss", self.bss),
            ("stack", self.stack),
            ("vector table", Region::new(0, 0)),
            ("ram vector table", Region::new(0, 0)),
        ];
        if let Some(vectors) = self.vectors {
            named[4].1 = vectors.flash;
            named[5].1 = vectors.ram();
        }

        for &(name, region) in named.iter() {
            if region.end() < region.start() {
                return Err(LayoutError::Inverted { region: name });
            }
            if !region.is_word_aligned() {
                return Err(LayoutError::Misaligned { region: name });
            }
        }
        for (i, &(first, a)) in named.iter().enumerate() {
            for &(second, b) in named.iter().skip(i + 1) {
                if a.overlaps(&b) {
                    return Err(LayoutError::Overlap { first, second });
                }
            }
        }
        if self.stack.start() <= self.bss.end() {
            return Err(LayoutError::NoDynamicMemory);
        }
        Ok(())
    }

    /// Logs every region and the dynamic range at Info level.
    pub fn log_summary(&self) {
        log_info!(target: "layout", "data {:?} <- {:#010x}", self.data, self.data_load);
        log_info!(target: "layout", "bss {:?}", self.bss);
        log_info!(target: "layout", "stack {:?}", self.stack);
        if let Some(vectors) = self.vectors {
            log_info!(target: "layout", "vectors {:?} -> {:?}", vectors.flash, vectors.ram());
        }
        let dynamic = self.dynamic_range();
        log_info!(
            target: "layout",
            "dynmem [{:#010x}, {:#010x}) {} bytes",
            dynamic.start(),
            dynamic.end(),
            dynamic.len()
        );
    }
}

#[cfg(all(target_arch = "arm", target_os = "none"))]
mod linked {
    use super::{MemoryLayout, Region};

    extern "C" {
        static _data_start: u32;
        static _data_end: u32;
        static _data_flash: u32;
        static _bss_start: u32;
        static _bss_end: u32;
        static _stack_start: u32;
        static _stack_end: u32;
    }

    #[cfg(feature = "ram-vectortable")]
    extern "C" {
        static _text_vectortable_start: u32;
        static _text_vectortable_end: u32;
        static _ram_vectortable_start: u32;
    }

    macro_rules! sym {
        ($name:ident) => {
            // SAFETY: only the address of the link script symbol is taken.
            unsafe { core::ptr::addr_of!($name) as usize }
        };
    }

    impl MemoryLayout {
        /// Layout described by the link script symbols.
        ///
        /// Only symbol addresses are read, so this is usable before `.data`
        /// and `.bss` exist.
        #[inline(always)]
        pub fn linked() -> Self {
            Self {
                data_load: sym!(_data_flash),
                data: Region::new(sym!(_data_start), sym!(_data_end)),
                bss: Region::new(sym!(_bss_start), sym!(_bss_end)),
                stack: Region::new(sym!(_stack_start), sym!(_stack_end)),
                #[cfg(feature = "ram-vectortable")]
                vectors: Some(super::VectorRelocation {
                    flash: Region::new(sym!(_text_vectortable_start), sym!(_text_vectortable_end)),
                    ram_start: sym!(_ram_vectortable_start),
                }),
                #[cfg(not(feature = "ram-vectortable"))]
                vectors: None,
            }
        }
    }

    /// Initial stack pointer loaded by both stages.
    #[inline(always)]
    pub fn stack_end() -> usize {
        sym!(_stack_end)
    }
}

#[cfg(all(target_arch = "arm", target_os = "none"))]
pub(crate) use linked::stack_end;

/// First byte available for dynamic allocation (end of `.bss`).
#[cfg(all(target_arch = "arm", target_os = "none"))]
pub fn dynmem_start() -> *mut u8 {
    MemoryLayout::linked().dynamic_range().start_ptr()
}

/// End of memory available for dynamic allocation (base of the stack), exclusive.
#[cfg(all(target_arch = "arm", target_os = "none"))]
pub fn dynmem_end() -> *mut u8 {
    MemoryLayout::linked().dynamic_range().end_ptr()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MemoryLayout {
        MemoryLayout {
            data_load: 0x0800_4000,
            data: Region::new(0x2000_0100, 0x2000_0140),
            bss: Region::new(0x2000_0140, 0x2000_0400),
            stack: Region::new(0x2000_4800, 0x2000_5000),
            vectors: Some(VectorRelocation {
                flash: Region::new(0x0800_0000, 0x0800_00c0),
                ram_start: 0x2000_0000,
            }),
        }
    }

    #[test]
    fn sample_layout_is_valid() {
        assert_eq!(sample().validate(), Ok(()));
    }

    #[test]
    fn dynamic_range_spans_bss_end_to_stack_base() {
        let layout = sample();
        let dynamic = layout.dynamic_range();
        assert_eq!(dynamic.start(), layout.bss.end());
        assert_eq!(dynamic.end(), layout.stack.start());
        assert!(dynamic.end() > dynamic.start());
        assert!(dynamic.contains(0x2000_0400));
        assert!(!dynamic.contains(0x2000_4800));
        assert_eq!(dynamic.len(), 0x4400);
    }

    #[test]
    fn dynamic_range_is_stable_across_queries() {
        let layout = sample();
        assert_eq!(layout.dynamic_range(), layout.dynamic_range());
    }

    #[test]
    fn rejects_misaligned_bss() {
        let mut layout = sample();
        layout.bss = Region::new(0x2000_0140, 0x2000_0402);
        assert_eq!(layout.validate(), Err(LayoutError::Misaligned { region: "bss" }));
    }

    #[test]
    fn rejects_vector_copy_onto_data() {
        let mut layout = sample();
        layout.vectors = Some(VectorRelocation {
            flash: Region::new(0x0800_0000, 0x0800_00c0),
            ram_start: 0x2000_0100,
        });
        assert_eq!(
            layout.validate(),
            Err(LayoutError::Overlap { first: "data", second: "ram vector table" })
        );
    }

    #[test]
    fn rejects_stack_touching_bss() {
        let mut layout = sample();
        layout.stack = Region::new(0x2000_0400, 0x2000_0800);
        assert_eq!(layout.validate(), Err(LayoutError::NoDynamicMemory));
    }

    #[test]
    fn inverted_region_is_reported() {
        let mut layout = sample();
        layout.data = Region::new(0x2000_0140, 0x2000_0100);
        assert_eq!(layout.validate(), Err(LayoutError::Inverted { region: "data" }));
    }

    #[test]
    fn empty_regions_never_overlap() {
        let empty = Region::new(0x100, 0x100);
        assert!(!empty.overlaps(&Region::new(0x0, 0x200)));
        assert!(Region::new(0x0, 0x8).overlaps(&Region::new(0x4, 0xc)));
        assert!(!Region::new(0x0, 0x8).overlaps(&Region::new(0x8, 0xc)));
    }

    #[test]
    fn error_messages_name_the_region() {
        use std::string::ToString;
        let err = LayoutError::Overlap { first: "data", second: "bss" };
        assert_eq!(err.to_string(), "data region overlaps bss region");
    }
}
