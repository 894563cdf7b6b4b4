//! Serialization buffer pool (§4.4, §9 DESIGN NOTES).
//!
//! A bounded thread-safe free-list of page-sized buffers, used to avoid
//! allocating a fresh `Vec<u8>` for every needle serialized onto the wire.
//! This is purely an optimization: a needle whose `WriteSize` exceeds the
//! pool's buffer size is served by a one-shot allocation instead, and the
//! pool never changes observable behavior.

use std::ops::{Deref, DerefMut};
use std::sync::Mutex;

/// One OS page, the size buffers in the pool are cut to.
pub const PAGE_SIZE: usize = 4096;

/// Free-list of reusable, page-sized buffers.
pub struct BufferPool {
    buffer_size: usize,
    max_slots: usize,
    free: Mutex<Vec<Vec<u8>>>,
}

impl BufferPool {
    /// Creates a pool of buffers sized `buffer_size`, holding at most
    /// `max_slots` of them at a time.
    pub fn new(buffer_size: usize, max_slots: usize) -> Self {
        Self {
            buffer_size,
            max_slots,
            free: Mutex::new(Vec::with_capacity(max_slots)),
        }
    }

    /// Acquires a buffer with at least `needed` bytes of capacity, zeroed
    /// and resized to exactly `needed` bytes.
    ///
    /// If `needed` fits in the pool's buffer size, a pooled buffer is
    /// reused when available; otherwise a one-shot allocation is made and
    /// not returned to the pool on drop.
    pub fn acquire(&self, needed: usize) -> PooledBuffer<'_> {
        if needed <= self.buffer_size {
            let mut free = self.free.lock().unwrap_or_else(|p| p.into_inner());
            if let Some(mut buf) = free.pop() {
                buf.clear();
                buf.resize(needed, 0);
                return PooledBuffer {
                    pool: Some(self),
                    buf,
                };
            }
        }
        let mut buf = Vec::with_capacity(needed.max(self.buffer_size));
        buf.resize(needed, 0);
        PooledBuffer { pool: None, buf }
    }

    fn release(&self, mut buf: Vec<u8>) {
        if buf.capacity() < self.buffer_size {
            return;
        }
        let mut free = self.free.lock().unwrap_or_else(|p| p.into_inner());
        if free.len() < self.max_slots {
            buf.clear();
            free.push(buf);
        }
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(PAGE_SIZE, 64)
    }
}

/// A buffer checked out from a [`BufferPool`]; returned to the pool on drop
/// when it was eligible to come from one.
pub struct PooledBuffer<'a> {
    pool: Option<&'a BufferPool>,
    buf: Vec<u8>,
}

impl Deref for PooledBuffer<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.buf
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.release(std::mem::take(&mut self.buf));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_buffer_is_reused_after_release() {
        let pool = BufferPool::new(64, 2);
        {
            let buf = pool.acquire(32);
            assert_eq!(buf.len(), 32);
        }
        assert_eq!(pool.free.lock().unwrap().len(), 1);
        let buf = pool.acquire(16);
        assert_eq!(buf.len(), 16);
    }

    #[test]
    fn oversized_buffer_is_not_pooled() {
        let pool = BufferPool::new(64, 2);
        {
            let buf = pool.acquire(128);
            assert_eq!(buf.len(), 128);
        }
        assert_eq!(pool.free.lock().unwrap().len(), 0);
    }

    #[test]
    fn pool_is_bounded_by_max_slots() {
        let pool = BufferPool::new(64, 1);
        drop(pool.acquire(10));
        drop(pool.acquire(10));
        assert_eq!(pool.free.lock().unwrap().len(), 1);
    }

    #[test]
    fn acquired_buffer_is_zeroed() {
        let pool = BufferPool::new(64, 1);
        let buf = pool.acquire(8);
        assert_eq!(&*buf, &[0u8; 8]);
    }
}
