//! Fixed-capacity bump allocator for interned names.
//!
//! The pool is reserved once with the exact number of bytes every string
//! will need (length + 1 for the terminator) and then filled monotonically.
//! Strings are never freed individually; the whole pool goes away with its
//! owner. Copied strings are addressed by [`PoolStr`] handles.

use thiserror::Error;

/// Handle to a NUL-terminated string stored in a [`StringPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PoolStr {
    offset: u32,
    len: u32,
}

impl PoolStr {
    /// Length in bytes, excluding the terminator.
    pub fn len(self) -> usize {
        self.len as usize
    }

    pub fn is_empty(self) -> bool {
        self.len == 0
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StringPoolError {
    #[error("string pool has already been reserved")]
    AlreadyReserved,
    #[error("not enough space in the string pool: {requested} bytes requested, {remaining} remaining")]
    OutOfSpace { requested: usize, remaining: usize },
    #[error("string is not valid UTF-8")]
    InvalidUtf8,
}

/// Bump allocator for strings.
#[derive(Debug, Default)]
pub struct StringPool {
    buffer: Vec<u8>,
    capacity: usize,
    reserved: bool,
}

/// Round `value` up to a multiple of `align` (a power of two).
pub(crate) fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) & !(align - 1)
}

impl StringPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate `size` bytes. The backing allocation is rounded up to pointer
    /// alignment, but only `size` bytes are usable.
    pub fn reserve(&mut self, size: usize) -> Result<(), StringPoolError> {
        if self.reserved {
            return Err(StringPoolError::AlreadyReserved);
        }
        self.buffer = Vec::with_capacity(align_up(size, std::mem::size_of::<usize>()));
        self.capacity = size;
        self.reserved = true;
        Ok(())
    }

    /// Drop the buffer so the pool can be reserved again.
    pub fn release(&mut self) {
        self.buffer = Vec::new();
        self.capacity = 0;
        self.reserved = false;
    }

    /// Copy a string of known length together with its terminator.
    pub fn copy_str(&mut self, text: &str) -> Result<PoolStr, StringPoolError> {
        let requested = text.len() + 1;
        let remaining = self.remaining_size();
        if requested > remaining {
            return Err(StringPoolError::OutOfSpace {
                requested,
                remaining,
            });
        }

        let handle = PoolStr {
            offset: self.buffer.len() as u32,
            len: text.len() as u32,
        };
        self.buffer.extend_from_slice(text.as_bytes());
        self.buffer.push(0);
        Ok(handle)
    }

    /// Copy a NUL-terminated byte string, one byte at a time, up to and
    /// including the terminator. Input without a terminator is terminated
    /// at its end.
    ///
    /// Running out of capacity before the terminator is written fails and
    /// rolls the cursor back.
    pub fn copy_c_str(&mut self, bytes: &[u8]) -> Result<PoolStr, StringPoolError> {
        let text = match bytes.iter().position(|&b| b == 0) {
            Some(nul) => &bytes[..nul],
            None => bytes,
        };
        let text = std::str::from_utf8(text).map_err(|_| StringPoolError::InvalidUtf8)?;

        let start = self.buffer.len();
        for &byte in text.as_bytes().iter().chain(std::iter::once(&0)) {
            if self.buffer.len() >= self.capacity {
                let remaining = self.capacity - start;
                self.buffer.truncate(start);
                return Err(StringPoolError::OutOfSpace {
                    requested: text.len() + 1,
                    remaining,
                });
            }
            self.buffer.push(byte);
        }

        Ok(PoolStr {
            offset: start as u32,
            len: text.len() as u32,
        })
    }

    /// Resolve a handle issued by this pool.
    pub fn get(&self, handle: PoolStr) -> &str {
        let start = handle.offset as usize;
        self.buffer
            .get(start..start + handle.len as usize)
            .and_then(|bytes| std::str::from_utf8(bytes).ok())
            .unwrap_or_default()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn used_size(&self) -> usize {
        self.buffer.len()
    }

    pub fn remaining_size(&self) -> usize {
        self.capacity - self.buffer.len()
    }
}

#[cfg(test)]
#[path = "string_pool_tests.rs"]
mod string_pool_tests;
