//! # Page Arena
//!
//! `MemoryPages` is a growable list of equally sized byte pages with bump
//! allocation. Addresses are flat `i64` offsets:
//!
//! ```text
//! address = page_index << page_bits | offset_in_page
//! ```
//!
//! An allocation never spans two pages. When the current page cannot hold the
//! requested size the cursor skips to the start of the next page, leaving the
//! tail of the previous page unused. `clear()` rewinds the cursor but keeps
//! the pages for reuse by the next query; `release()` frees them.
//!
//! All reads and writes are little-endian and bounds-checked through slice
//! indexing: an address outside allocated memory is an internal invariant
//! violation and panics.

use crate::error::PlanError;

#[derive(Debug)]
pub struct MemoryPages {
    pages: Vec<Box<[u8]>>,
    page_size: usize,
    bits: u32,
    mask: usize,
    cursor: usize,
}

impl MemoryPages {
    /// Creates an empty arena. `page_size` is rounded up to a power of two.
    pub fn new(page_size: usize) -> Self {
        let page_size = page_size.max(1).next_power_of_two();
        Self {
            pages: Vec::new(),
            page_size,
            bits: page_size.trailing_zeros(),
            mask: page_size - 1,
            cursor: 0,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Bytes handed out since the last `clear`, including skipped page tails.
    pub fn used(&self) -> usize {
        self.cursor
    }

    /// Reserves `size` contiguous bytes and returns their address.
    pub fn allocate(&mut self, size: usize) -> Result<i64, PlanError> {
        if size > self.page_size {
            return Err(PlanError::RecordTooLarge {
                size,
                page_size: self.page_size,
            });
        }
        let offset = self.cursor & self.mask;
        if offset + size > self.page_size {
            self.cursor += self.page_size - offset;
        }
        let page = self.cursor >> self.bits;
        while self.pages.len() <= page {
            self.pages.push(vec![0u8; self.page_size].into_boxed_slice());
        }
        let addr = self.cursor;
        self.cursor += size;
        Ok(addr as i64)
    }

    pub fn clear(&mut self) {
        self.cursor = 0;
    }

    pub fn release(&mut self) {
        self.pages = Vec::new();
        self.cursor = 0;
    }

    #[inline]
    fn locate(&self, addr: i64) -> (usize, usize) {
        let addr = addr as usize;
        (addr >> self.bits, addr & self.mask)
    }

    #[inline]
    pub fn slice(&self, addr: i64, len: usize) -> &[u8] {
        let (page, offset) = self.locate(addr);
        &self.pages[page][offset..offset + len]
    }

    #[inline]
    pub fn write_bytes(&mut self, addr: i64, bytes: &[u8]) {
        let (page, offset) = self.locate(addr);
        self.pages[page][offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    #[inline]
    fn read_array<const N: usize>(&self, addr: i64) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(self.slice(addr, N));
        out
    }

    #[inline]
    pub fn get_u8(&self, addr: i64) -> u8 {
        let (page, offset) = self.locate(addr);
        self.pages[page][offset]
    }

    #[inline]
    pub fn put_u8(&mut self, addr: i64, v: u8) {
        let (page, offset) = self.locate(addr);
        self.pages[page][offset] = v;
    }

    #[inline]
    pub fn get_i16(&self, addr: i64) -> i16 {
        i16::from_le_bytes(self.read_array(addr))
    }

    #[inline]
    pub fn put_i16(&mut self, addr: i64, v: i16) {
        self.write_bytes(addr, &v.to_le_bytes());
    }

    #[inline]
    pub fn get_i32(&self, addr: i64) -> i32 {
        i32::from_le_bytes(self.read_array(addr))
    }

    #[inline]
    pub fn put_i32(&mut self, addr: i64, v: i32) {
        self.write_bytes(addr, &v.to_le_bytes());
    }

    #[inline]
    pub fn get_i64(&self, addr: i64) -> i64 {
        i64::from_le_bytes(self.read_array(addr))
    }

    #[inline]
    pub fn put_i64(&mut self, addr: i64, v: i64) {
        self.write_bytes(addr, &v.to_le_bytes());
    }

    #[inline]
    pub fn get_f32(&self, addr: i64) -> f32 {
        f32::from_bits(self.get_i32(addr) as u32)
    }

    #[inline]
    pub fn put_f32(&mut self, addr: i64, v: f32) {
        self.put_i32(addr, v.to_bits() as i32);
    }

    #[inline]
    pub fn get_f64(&self, addr: i64) -> f64 {
        f64::from_bits(self.get_i64(addr) as u64)
    }

    #[inline]
    pub fn put_f64(&mut self, addr: i64, v: f64) {
        self.put_i64(addr, v.to_bits() as i64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocations_never_span_pages() {
        let mut pages = MemoryPages::new(64);
        let a = pages.allocate(40).unwrap();
        let b = pages.allocate(40).unwrap();

        assert_eq!(a, 0);
        assert_eq!(b, 64, "second allocation must start on the next page");
        assert_eq!(pages.page_count(), 2);
    }

    #[test]
    fn oversized_allocation_is_rejected() {
        let mut pages = MemoryPages::new(64);
        let err = pages.allocate(65).unwrap_err();
        assert_eq!(
            err,
            PlanError::RecordTooLarge {
                size: 65,
                page_size: 64
            }
        );
    }

    #[test]
    fn typed_values_round_trip() {
        let mut pages = MemoryPages::new(128);
        let addr = pages.allocate(32).unwrap();

        pages.put_i64(addr, -42);
        pages.put_i32(addr + 8, i32::MIN);
        pages.put_f64(addr + 12, 1.5);
        pages.put_i16(addr + 20, 300);
        pages.put_u8(addr + 22, 7);
        pages.put_f32(addr + 23, f32::NAN);

        assert_eq!(pages.get_i64(addr), -42);
        assert_eq!(pages.get_i32(addr + 8), i32::MIN);
        assert_eq!(pages.get_f64(addr + 12), 1.5);
        assert_eq!(pages.get_i16(addr + 20), 300);
        assert_eq!(pages.get_u8(addr + 22), 7);
        assert!(pages.get_f32(addr + 23).is_nan());
    }

    #[test]
    fn clear_reuses_pages() {
        let mut pages = MemoryPages::new(64);
        for _ in 0..4 {
            pages.allocate(60).unwrap();
        }
        assert_eq!(pages.page_count(), 4);

        pages.clear();
        assert_eq!(pages.used(), 0);
        assert_eq!(pages.allocate(8).unwrap(), 0);
        assert_eq!(pages.page_count(), 4);

        pages.release();
        assert_eq!(pages.page_count(), 0);
    }

    #[test]
    fn page_size_rounds_up() {
        assert_eq!(MemoryPages::new(100).page_size(), 128);
    }
}
