// src/io/pool.rs
//! Pool abstraction for [`IoBuffer`]s: `borrow`, `recycle`, `close`.
//!
//! This mirrors the shape of [`BufferPool`](crate::pool::BufferPool) —
//! a mutex-guarded free list, pre-warmed at construction, burning buffers
//! before they go back on the shelf — generalized into a trait so `Input`
//! and `Output` can be built against any pool implementation rather than
//! a single concrete type.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::error::{BufferError, Result};
use crate::pool::PoolConfig;

use super::buf::IoBuffer;

fn next_pool_id() -> u64 {
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// A pool that lends out [`IoBuffer`]s and takes them back.
///
/// `recycle` validates that the buffer came from this pool and has not
/// already been returned, via its default implementation; implementors
/// only need `recycle_raw`, the bookkeeping primitive that actually frees
/// the slot.
pub trait IoBufferPool: Send + Sync {
    /// Stable identity of this pool instance, used to reject buffers
    /// recycled into the wrong pool.
    fn id(&self) -> u64;

    /// Capacity of buffers this pool hands out.
    fn buffer_size(&self) -> usize;

    /// Lends out a buffer, allocating a fresh one if the free list is empty.
    fn borrow(&self) -> Result<PooledIoBuffer>;

    /// Marks the pool closed. Further `borrow` calls fail. Returns an
    /// error naming the number of buffers still outstanding, if any —
    /// the pool is still closed either way.
    fn close(&self) -> Result<()>;

    /// Internal: returns a raw buffer and its tag to the free list.
    #[doc(hidden)]
    fn recycle_raw(&self, buf: IoBuffer, tag: u64) -> Result<()>;

    /// Returns a previously borrowed buffer to this pool.
    fn recycle(&self, mut buf: PooledIoBuffer) -> Result<()> {
        if buf.pool_id != self.id() {
            return Err(BufferError::InvalidState(
                "buffer does not belong to this pool".to_string(),
            ));
        }
        let tag = buf.tag;
        let raw = buf
            .buf
            .take()
            .ok_or_else(|| BufferError::InvalidState("buffer already recycled".to_string()))?;
        self.recycle_raw(raw, tag)
    }
}

/// A borrowed [`IoBuffer`] tagged with the pool it came from.
///
/// The tag gives tests and the transfer bridge a cheap way to assert
/// "this is the very same buffer", something Rust's owned values have no
/// other way to express since there is no reference-identity on a `Vec`.
pub struct PooledIoBuffer {
    buf: Option<IoBuffer>,
    tag: u64,
    pool_id: u64,
    origin: Arc<dyn IoBufferPool>,
}

impl PooledIoBuffer {
    /// Identity tag assigned when this buffer was borrowed.
    pub fn tag(&self) -> u64 {
        self.tag
    }

    /// Consumes the handle, returning the underlying buffer to whichever
    /// pool originally lent it out.
    pub fn recycle_to_origin(self) -> Result<()> {
        let origin = Arc::clone(&self.origin);
        origin.recycle(self)
    }

    fn inner(&self) -> &IoBuffer {
        self.buf.as_ref().expect("PooledIoBuffer used after recycle")
    }

    fn inner_mut(&mut self) -> &mut IoBuffer {
        self.buf.as_mut().expect("PooledIoBuffer used after recycle")
    }
}

impl std::ops::Deref for PooledIoBuffer {
    type Target = IoBuffer;
    fn deref(&self) -> &IoBuffer {
        self.inner()
    }
}

impl std::ops::DerefMut for PooledIoBuffer {
    fn deref_mut(&mut self) -> &mut IoBuffer {
        self.inner_mut()
    }
}

impl Drop for PooledIoBuffer {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            if let Err(e) = self.origin.recycle_raw(buf, self.tag) {
                tracing::warn!(error = %e, tag = self.tag, "buffer dropped without explicit recycle");
            }
        }
    }
}

struct StandardIoPoolInner {
    free: Vec<IoBuffer>,
    outstanding: HashSet<u64>,
    next_tag: u64,
    closed: bool,
}

/// Mutex-guarded [`IoBufferPool`], pre-warmed at construction and bounded
/// at `max_pool_size` the same way as [`BufferPool`](crate::pool::BufferPool).
pub struct StandardIoPool {
    self_ref: Weak<StandardIoPool>,
    id: u64,
    buffer_size: usize,
    max_pool_size: usize,
    inner: Mutex<StandardIoPoolInner>,
}

impl StandardIoPool {
    /// Builds a pool, pre-allocating `config.min_pool_size` buffers.
    pub fn new(config: PoolConfig) -> Arc<Self> {
        Arc::new_cyclic(|weak| {
            let mut free = Vec::with_capacity(config.min_pool_size);
            for _ in 0..config.min_pool_size {
                free.push(IoBuffer::new(config.buffer_size));
            }
            Self {
                self_ref: weak.clone(),
                id: next_pool_id(),
                buffer_size: config.buffer_size,
                max_pool_size: config.max_pool_size,
                inner: Mutex::new(StandardIoPoolInner {
                    free,
                    outstanding: HashSet::new(),
                    next_tag: 0,
                    closed: false,
                }),
            }
        })
    }

    /// Buffers currently sitting in the free list.
    pub fn available(&self) -> usize {
        self.inner.lock().unwrap().free.len()
    }

    /// Buffers currently lent out and not yet recycled.
    pub fn outstanding(&self) -> usize {
        self.inner.lock().unwrap().outstanding.len()
    }
}

impl IoBufferPool for StandardIoPool {
    fn id(&self) -> u64 {
        self.id
    }

    fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    fn borrow(&self) -> Result<PooledIoBuffer> {
        let mut inner = self.inner.lock().unwrap();
        if inner.closed {
            return Err(BufferError::InvalidState("pool is closed".to_string()));
        }
        let tag = inner.next_tag;
        inner.next_tag += 1;
        let buf = inner.free.pop().unwrap_or_else(|| IoBuffer::new(self.buffer_size));
        inner.outstanding.insert(tag);
        drop(inner);

        let origin = self
            .self_ref
            .upgrade()
            .expect("pool dropped while a borrow was in flight");
        Ok(PooledIoBuffer {
            buf: Some(buf),
            tag,
            pool_id: self.id,
            origin,
        })
    }

    fn close(&self) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.closed = true;
        let outstanding = inner.outstanding.len();
        inner.free.clear();
        if outstanding > 0 {
            tracing::warn!(outstanding, pool_id = self.id, "pool closed with buffers still outstanding");
            return Err(BufferError::InvalidState(format!(
                "pool closed with {outstanding} buffer(s) still outstanding"
            )));
        }
        Ok(())
    }

    fn recycle_raw(&self, mut buf: IoBuffer, tag: u64) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.outstanding.remove(&tag) {
            return Err(BufferError::InvalidState(format!(
                "buffer tag {tag} was already recycled or is unknown to this pool"
            )));
        }
        buf.reset_for_reuse();
        if !inner.closed && inner.free.len() < self.max_pool_size {
            inner.free.push(buf);
        }
        Ok(())
    }
}

/// Test doubles for exercising [`IoBufferPool`] consumers without a real pool.
pub mod testing {
    use super::*;

    struct SingleShotState {
        buf: Option<IoBuffer>,
        borrowed: bool,
        outstanding_tag: Option<u64>,
        closed: bool,
    }

    /// A pool that lends out one pre-built buffer exactly once.
    ///
    /// Useful for asserting zero-copy identity: construct two of these,
    /// borrow from one, transfer it through an `Output` backed by the
    /// other, and check the tag that comes out the far side matches the
    /// one that went in.
    pub struct SingleShotPool {
        self_ref: Weak<SingleShotPool>,
        id: u64,
        buffer_size: usize,
        state: Mutex<SingleShotState>,
    }

    impl SingleShotPool {
        /// Wraps a pre-built buffer as the pool's single loan.
        pub fn new(buf: IoBuffer) -> Arc<Self> {
            let buffer_size = buf.capacity();
            Arc::new_cyclic(|weak| Self {
                self_ref: weak.clone(),
                id: next_pool_id(),
                buffer_size,
                state: Mutex::new(SingleShotState {
                    buf: Some(buf),
                    borrowed: false,
                    outstanding_tag: None,
                    closed: false,
                }),
            })
        }
    }

    impl IoBufferPool for SingleShotPool {
        fn id(&self) -> u64 {
            self.id
        }

        fn buffer_size(&self) -> usize {
            self.buffer_size
        }

        fn borrow(&self) -> Result<PooledIoBuffer> {
            let mut state = self.state.lock().unwrap();
            if state.closed {
                return Err(BufferError::InvalidState("single-shot pool is closed".to_string()));
            }
            if state.borrowed {
                return Err(BufferError::InvalidState(
                    "single-shot pool buffer already borrowed".to_string(),
                ));
            }
            let buf = state.buf.take().expect("single-shot buffer missing on first borrow");
            state.borrowed = true;
            let tag = 1;
            state.outstanding_tag = Some(tag);
            drop(state);

            let origin = self.self_ref.upgrade().expect("pool dropped while in use");
            Ok(PooledIoBuffer {
                buf: Some(buf),
                tag,
                pool_id: self.id,
                origin,
            })
        }

        fn close(&self) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            state.closed = true;
            if state.outstanding_tag.is_some() {
                return Err(BufferError::InvalidState(
                    "single-shot pool closed with its buffer still outstanding".to_string(),
                ));
            }
            Ok(())
        }

        fn recycle_raw(&self, buf: IoBuffer, tag: u64) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            if state.outstanding_tag != Some(tag) {
                return Err(BufferError::InvalidState(
                    "single-shot pool: recycled buffer does not match the one on loan".to_string(),
                ));
            }
            state.outstanding_tag = None;
            state.buf = Some(buf);
            Ok(())
        }
    }
}

/// Adapts the existing [`BufferPool`](crate::pool::BufferPool) to
/// [`IoBufferPool`] so `Input`/`Output` can run on top of the ambient pool
/// infrastructure instead of `StandardIoPool`'s own free list.
///
/// Each borrow takes one slot out of the wrapped `BufferPool` (so its
/// size limits and stats stay meaningful) and hands out a fresh `IoBuffer`
/// for `Input`/`Output` to actually write into; the `PooledBuffer` guard is
/// held onto only to keep that slot reserved until `recycle_raw` drops it,
/// returning it — already burned, per `PooledBuffer`'s own `Drop` — to the
/// wrapped pool's free list.
pub mod adapter {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex, Weak};

    use crate::pool::{BufferPool, PooledBuffer};

    use super::*;

    struct Reservation {
        // Held only for its slot; never read from or written to.
        _guard: PooledBuffer,
    }

    struct AdapterInner {
        outstanding: HashMap<u64, Reservation>,
        next_tag: u64,
        closed: bool,
    }

    /// Wraps an existing [`BufferPool`] so it satisfies [`IoBufferPool`].
    pub struct IoPoolAdapter {
        self_ref: Weak<IoPoolAdapter>,
        id: u64,
        source: BufferPool,
        inner: Mutex<AdapterInner>,
    }

    impl IoPoolAdapter {
        /// Wraps `source`, an already-configured [`BufferPool`].
        pub fn new(source: BufferPool) -> Arc<Self> {
            Arc::new_cyclic(|weak| Self {
                self_ref: weak.clone(),
                id: next_pool_id(),
                source,
                inner: Mutex::new(AdapterInner {
                    outstanding: HashMap::new(),
                    next_tag: 0,
                    closed: false,
                }),
            })
        }

        /// Buffers currently lent out and not yet recycled.
        pub fn outstanding(&self) -> usize {
            self.inner.lock().unwrap().outstanding.len()
        }
    }

    impl IoBufferPool for IoPoolAdapter {
        fn id(&self) -> u64 {
            self.id
        }

        fn buffer_size(&self) -> usize {
            self.source.stats().buffer_size
        }

        fn borrow(&self) -> Result<PooledIoBuffer> {
            let mut inner = self.inner.lock().unwrap();
            if inner.closed {
                return Err(BufferError::InvalidState("pool is closed".to_string()));
            }
            let guard = self.source.acquire();
            let buffer_size = guard.capacity();
            let tag = inner.next_tag;
            inner.next_tag += 1;
            inner.outstanding.insert(
                tag,
                Reservation { _guard: guard },
            );
            drop(inner);

            let origin = self
                .self_ref
                .upgrade()
                .expect("pool dropped while a borrow was in flight");
            Ok(PooledIoBuffer {
                buf: Some(IoBuffer::new(buffer_size)),
                tag,
                pool_id: self.id,
                origin,
            })
        }

        fn close(&self) -> Result<()> {
            let mut inner = self.inner.lock().unwrap();
            inner.closed = true;
            let outstanding = inner.outstanding.len();
            if outstanding > 0 {
                tracing::warn!(outstanding, pool_id = self.id, "pool closed with buffers still outstanding");
                return Err(BufferError::InvalidState(format!(
                    "pool closed with {outstanding} buffer(s) still outstanding"
                )));
            }
            Ok(())
        }

        fn recycle_raw(&self, _buf: IoBuffer, tag: u64) -> Result<()> {
            let mut inner = self.inner.lock().unwrap();
            inner
                .outstanding
                .remove(&tag)
                .map(|_| ())
                .ok_or_else(|| {
                    BufferError::InvalidState(format!(
                        "buffer tag {tag} was already recycled or is unknown to this pool"
                    ))
                })
            // Dropping the removed `Reservation` drops its `PooledBuffer`
            // guard, which burns and returns the slot to `source`.
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(buffer_size: usize) -> PoolConfig {
        PoolConfig {
            buffer_size,
            max_pool_size: 4,
            min_pool_size: 1,
        }
    }

    #[test]
    fn borrow_and_recycle_round_trips_through_free_list() {
        let pool = StandardIoPool::new(config(64));
        assert_eq!(pool.available(), 1);
        let buf = pool.borrow().unwrap();
        assert_eq!(pool.available(), 0);
        assert_eq!(pool.outstanding(), 1);
        pool.recycle(buf).unwrap();
        assert_eq!(pool.available(), 1);
        assert_eq!(pool.outstanding(), 0);
    }

    #[test]
    fn recycle_rejects_foreign_buffer() {
        let a = StandardIoPool::new(config(64));
        let b = StandardIoPool::new(config(64));
        let buf = a.borrow().unwrap();
        assert!(b.recycle(buf).is_err());
    }

    #[test]
    fn borrow_after_close_fails() {
        let pool = StandardIoPool::new(config(64));
        pool.close().unwrap();
        assert!(pool.borrow().is_err());
    }

    #[test]
    fn close_reports_outstanding_buffers() {
        let pool = StandardIoPool::new(config(64));
        let _buf = pool.borrow().unwrap();
        assert!(pool.close().is_err());
    }

    #[test]
    fn double_recycle_is_rejected() {
        // The public API makes a double-recycle unreachable: `recycle`
        // consumes its `PooledIoBuffer` by value, so the same handle can't
        // be presented twice. This exercises the underlying bookkeeping
        // directly, the way an internal bug (not a caller mistake) would
        // surface it.
        let pool = StandardIoPool::new(config(64));
        let buf = pool.borrow().unwrap();
        let tag = buf.tag();
        pool.recycle(buf).unwrap();
        assert!(pool.recycle_raw(IoBuffer::new(64), tag).is_err());
    }

    #[test]
    fn dropping_a_buffer_without_recycling_still_frees_its_slot() {
        let pool = StandardIoPool::new(config(64));
        {
            let _buf = pool.borrow().unwrap();
            assert_eq!(pool.outstanding(), 1);
        }
        assert_eq!(pool.outstanding(), 0);
    }

    #[test]
    fn single_shot_pool_lends_its_buffer_exactly_once() {
        let pool = testing::SingleShotPool::new(IoBuffer::new(32));
        let buf = pool.borrow().unwrap();
        assert!(pool.borrow().is_err());
        let tag = buf.tag();
        pool.recycle(buf).unwrap();
        let buf2 = pool.borrow().unwrap();
        assert_eq!(buf2.tag(), tag);
    }
}
