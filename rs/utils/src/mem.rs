use std::alloc::{self, Layout};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

use anyhow::{anyhow, Result};

/// Contiguous buffer of `T` whose first element sits on a caller-chosen byte boundary.
///
/// Rows laid out back to back in this buffer keep the boundary as long as the row size in bytes
/// is a multiple of it, which is what the vector kernels rely on.
pub struct AlignedBuffer<T: Copy + Default> {
    ptr: NonNull<T>,
    len: usize,
    layout: Layout,
}

// The buffer exclusively owns its allocation.
unsafe impl<T: Copy + Default + Send> Send for AlignedBuffer<T> {}
unsafe impl<T: Copy + Default + Sync> Sync for AlignedBuffer<T> {}

impl<T: Copy + Default> AlignedBuffer<T> {
    /// Allocate `len` default-initialized elements aligned to `alignment` bytes.
    pub fn zeroed(len: usize, alignment: usize) -> Result<Self> {
        if !alignment.is_power_of_two() {
            return Err(anyhow!("Alignment {} is not a power of two", alignment));
        }
        if alignment < std::mem::align_of::<T>() {
            return Err(anyhow!(
                "Alignment {} is smaller than the natural alignment {} of the element type",
                alignment,
                std::mem::align_of::<T>()
            ));
        }
        let size = len
            .checked_mul(std::mem::size_of::<T>())
            .ok_or_else(|| anyhow!("Buffer of {} elements overflows", len))?;
        let layout = Layout::from_size_align(size, alignment)?;

        if layout.size() == 0 {
            return Ok(Self {
                ptr: NonNull::new(std::ptr::without_provenance_mut::<T>(alignment))
                    .ok_or_else(|| anyhow!("Invalid dangling pointer"))?,
                len,
                layout,
            });
        }

        let raw = unsafe { alloc::alloc(layout) } as *mut T;
        let ptr = match NonNull::new(raw) {
            Some(ptr) => ptr,
            None => alloc::handle_alloc_error(layout),
        };
        for i in 0..len {
            unsafe { ptr.as_ptr().add(i).write(T::default()) };
        }
        Ok(Self { ptr, len, layout })
    }

    /// Allocate an aligned copy of `values`.
    pub fn from_slice(values: &[T], alignment: usize) -> Result<Self> {
        let mut buffer = Self::zeroed(values.len(), alignment)?;
        buffer.copy_from_slice(values);
        Ok(buffer)
    }

    pub fn alignment(&self) -> usize {
        self.layout.align()
    }

    pub fn is_aligned(&self) -> bool {
        self.ptr.as_ptr().align_offset(self.alignment()) == 0
    }
}

impl<T: Copy + Default> Deref for AlignedBuffer<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl<T: Copy + Default> DerefMut for AlignedBuffer<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl<T: Copy + Default> Drop for AlignedBuffer<T> {
    fn drop(&mut self) {
        if self.layout.size() != 0 {
            unsafe { alloc::dealloc(self.ptr.as_ptr() as *mut u8, self.layout) };
        }
    }
}

impl<T: Copy + Default> Clone for AlignedBuffer<T> {
    fn clone(&self) -> Self {
        let mut buffer = match Self::zeroed(self.len, self.alignment()) {
            Ok(buffer) => buffer,
            // Same layout as `self`, which was already allocated successfully.
            Err(_) => alloc::handle_alloc_error(self.layout),
        };
        buffer.copy_from_slice(self);
        buffer
    }
}

impl<T: Copy + Default + fmt::Debug> fmt::Debug for AlignedBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlignedBuffer")
            .field("alignment", &self.alignment())
            .field("values", &self.deref())
            .finish()
    }
}
