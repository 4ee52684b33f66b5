// src/io/input.rs
//! Pull-based byte source backed by a FIFO chain of pooled buffers.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::error::{BufferError, Result};

use super::buf::IoBuffer;
use super::output::Output;
use super::pool::{IoBufferPool, PooledIoBuffer};
use super::transfer;

type FillFn = dyn FnMut(&mut IoBuffer, usize, usize) -> Result<usize> + Send;
type CloseFn = dyn FnMut() -> Result<()> + Send;

#[derive(Clone, Copy)]
struct PreviewCheckpoint {
    cursor: usize,
    head_read_index: usize,
}

/// A buffered, pull-based source.
///
/// Bytes arrive through a `fill` callback that writes into a caller-opaque
/// [`IoBuffer`] slice; `Input` owns a FIFO of such buffers and exposes
/// byte/array reads, a zero-copy hand-off to [`Output`], and a nestable
/// [`preview`](Input::preview) that guarantees replay.
pub struct Input {
    pool: Arc<dyn IoBufferPool>,
    chain: VecDeque<PooledIoBuffer>,
    read_cursor: usize,
    closed: bool,
    checkpoints: Vec<PreviewCheckpoint>,
    fill: Box<FillFn>,
    close_source: Option<Box<CloseFn>>,
}

impl Input {
    /// Builds an `Input` drawing fresh buffers from `pool` and filling them
    /// via `fill(buffer, start, end) -> bytes written (0 means EOF)`.
    pub fn new(
        pool: Arc<dyn IoBufferPool>,
        fill: impl FnMut(&mut IoBuffer, usize, usize) -> Result<usize> + Send + 'static,
    ) -> Self {
        Self {
            pool,
            chain: VecDeque::new(),
            read_cursor: 0,
            closed: false,
            checkpoints: Vec::new(),
            fill: Box::new(fill),
            close_source: None,
        }
    }

    /// Attaches a hook run once, after buffers are recycled, when this
    /// `Input` closes (e.g. to close an underlying file descriptor).
    pub fn with_close_hook(mut self, close_source: impl FnMut() -> Result<()> + Send + 'static) -> Self {
        self.close_source = Some(Box::new(close_source));
        self
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            Err(BufferError::InvalidState("input is closed".to_string()))
        } else {
            Ok(())
        }
    }

    /// Calls `fill` once into a freshly borrowed buffer. Returns `Ok(true)`
    /// if bytes arrived (the buffer is appended to the chain), `Ok(false)`
    /// on EOF. On any error the borrowed buffer is recycled before the
    /// error propagates, so a failing source never leaks pool capacity.
    fn fill_one(&mut self) -> Result<bool> {
        let mut pooled = self.pool.borrow()?;
        let capacity = pooled.capacity();
        match (self.fill)(&mut pooled, 0, capacity) {
            Ok(0) => {
                self.pool.recycle(pooled)?;
                Ok(false)
            }
            Ok(count) => {
                pooled.set_write_index(count)?;
                self.chain.push_back(pooled);
                Ok(true)
            }
            Err(e) => {
                let _ = self.pool.recycle(pooled);
                Err(e)
            }
        }
    }

    /// Drops fully-consumed buffers from the front of the chain, recycling
    /// them, as long as no preview is keeping them alive for replay.
    fn reclaim_consumed_prefix(&mut self) -> Result<()> {
        while self.checkpoints.is_empty() && self.read_cursor > 0 {
            let buf = self.chain.pop_front().expect("cursor > 0 implies a buffer exists");
            self.pool.recycle(buf)?;
            self.read_cursor -= 1;
        }
        Ok(())
    }

    fn current_unread(&self) -> usize {
        self.chain.get(self.read_cursor).map(|b| b.unread()).unwrap_or(0)
    }

    /// Guarantees at least one unread byte is available, attempting fills
    /// as needed. Returns `false` only once the source is genuinely
    /// exhausted. While a preview is active, buffers that become fully
    /// read are kept in place (for replay) rather than recycled.
    fn ensure_readable(&mut self) -> Result<bool> {
        loop {
            if self.checkpoints.is_empty() {
                self.reclaim_consumed_prefix()?;
            }
            if let Some(buf) = self.chain.get(self.read_cursor) {
                if buf.unread() > 0 {
                    return Ok(true);
                }
                if self.checkpoints.is_empty() {
                    let buf = self.chain.pop_front().expect("buffer exists at cursor 0");
                    self.pool.recycle(buf)?;
                } else {
                    self.read_cursor += 1;
                }
                continue;
            }
            if !self.fill_one()? {
                return Ok(false);
            }
        }
    }

    /// Takes ownership of the buffer at the read cursor, removing it from
    /// the chain. Only valid outside of any active preview.
    fn take_current_buffer(&mut self) -> Result<PooledIoBuffer> {
        debug_assert_eq!(self.read_cursor, 0);
        self.chain
            .pop_front()
            .ok_or_else(|| BufferError::InvalidState("no buffer available to transfer".to_string()))
    }

    /// Reads a single byte, filling as needed.
    pub fn read_byte(&mut self) -> Result<u8> {
        self.check_open()?;
        if !self.ensure_readable()? {
            return Err(BufferError::BufferEmpty);
        }
        let buf = &mut self.chain[self.read_cursor];
        let idx = buf.read_index();
        let b = buf.get(idx)?;
        buf.set_read_index(idx + 1)?;
        Ok(b)
    }

    /// Reads exactly `count` bytes, or (when `count` is `None`) everything
    /// up to EOF. Returns `BufferEmpty` if `count` bytes never arrive.
    pub fn read_byte_array(&mut self, count: Option<usize>) -> Result<Vec<u8>> {
        self.check_open()?;
        match count {
            None => {
                let mut out = Vec::new();
                while self.ensure_readable()? {
                    let buf = &mut self.chain[self.read_cursor];
                    out.extend_from_slice(buf.filled_slice());
                    let wi = buf.write_index();
                    buf.set_read_index(wi)?;
                }
                Ok(out)
            }
            Some(target) => {
                let mut out = Vec::with_capacity(target);
                while out.len() < target {
                    if !self.ensure_readable()? {
                        return Err(BufferError::BufferEmpty);
                    }
                    let buf = &mut self.chain[self.read_cursor];
                    let take = buf.unread().min(target - out.len());
                    let start = buf.read_index();
                    out.extend_from_slice(&buf.filled_slice()[..take]);
                    buf.set_read_index(start + take)?;
                }
                Ok(out)
            }
        }
    }

    /// `true` once no bytes remain buffered and a fill attempt confirms EOF.
    pub fn eof(&mut self) -> Result<bool> {
        self.check_open()?;
        Ok(!self.ensure_readable()?)
    }

    /// Ensures at least `n` bytes are buffered without consuming them.
    /// Returns `false` if EOF arrives first.
    pub fn prefetch(&mut self, n: usize) -> Result<bool> {
        self.check_open()?;
        loop {
            let buffered: usize = self.chain.iter().skip(self.read_cursor).map(|b| b.unread()).sum();
            if buffered >= n {
                return Ok(true);
            }
            if !self.fill_one()? {
                return Ok(false);
            }
        }
    }

    /// Discards exactly `n` bytes, filling as needed.
    pub fn discard(&mut self, n: usize) -> Result<()> {
        self.check_open()?;
        let mut remaining = n;
        while remaining > 0 {
            if !self.ensure_readable()? {
                return Err(BufferError::BufferEmpty);
            }
            let buf = &mut self.chain[self.read_cursor];
            let take = buf.unread().min(remaining);
            let idx = buf.read_index();
            buf.set_read_index(idx + take)?;
            remaining -= take;
        }
        Ok(())
    }

    /// Reads bytes up to (but not including) the first byte for which
    /// `predicate` returns `true`. That byte, if found, remains unread.
    /// Returns the number of bytes consumed; EOF without a match is not
    /// an error.
    pub fn read_until(&mut self, mut predicate: impl FnMut(u8) -> bool) -> Result<usize> {
        self.check_open()?;
        let mut count = 0;
        loop {
            if !self.ensure_readable()? {
                return Ok(count);
            }
            let buf = &mut self.chain[self.read_cursor];
            let idx = buf.read_index();
            let mut advance = 0;
            let mut found = false;
            for &b in buf.filled_slice() {
                if predicate(b) {
                    found = true;
                    break;
                }
                advance += 1;
            }
            buf.set_read_index(idx + advance)?;
            count += advance;
            if found {
                return Ok(count);
            }
        }
    }

    /// Fills `buffer` directly via the source's `fill` callback, bypassing
    /// this `Input`'s own pool and chain entirely. Returns the new write
    /// index (`start` plus bytes filled).
    pub fn read_available_to_buffer(&mut self, buffer: &mut IoBuffer, start: usize) -> Result<usize> {
        self.check_open()?;
        let end = buffer.capacity();
        let count = (self.fill)(buffer, start, end)?;
        let new_index = start + count;
        buffer.set_write_index(new_index)?;
        Ok(new_index)
    }

    /// Hands whatever is immediately available to `output`.
    ///
    /// Outside of any active preview this is zero-copy: the buffer's
    /// ownership moves straight to `output`'s flush path and back to this
    /// pool, without an intermediate copy. Inside a preview, bytes are
    /// copied instead and the source buffer is retained in place, since
    /// the preview must still be able to replay them afterward. Returns
    /// `0` on EOF.
    pub fn read_available_to(&mut self, output: &mut Output) -> Result<usize> {
        self.check_open()?;
        if !self.ensure_readable()? {
            return Ok(0);
        }
        if self.checkpoints.is_empty() {
            let owned = self.take_current_buffer()?;
            transfer::transfer(output, owned)
        } else {
            let buf = &mut self.chain[self.read_cursor];
            let bytes = buf.filled_slice().to_vec();
            let n = bytes.len();
            output.write_buffer(&bytes)?;
            let wi = buf.write_index();
            buf.set_read_index(wi)?;
            Ok(n)
        }
    }

    /// Copies bytes to `output`: everything up to EOF when `size` is
    /// `None`, or exactly `size` bytes (erroring on premature EOF)
    /// otherwise. The final chunk of a sized copy may split a buffer, in
    /// which case only that prefix is handed over and the remainder stays
    /// in this `Input`'s chain.
    pub fn copy_to(&mut self, output: &mut Output, size: Option<usize>) -> Result<u64> {
        if self.closed {
            // Unlike a read, a copy on a closed stream is not an error: a
            // `close()` inside an active preview is terminal, and the copy
            // that preview's block was mid-way through should simply see
            // nothing left to deliver.
            return Ok(0);
        }
        match size {
            None => {
                let mut total = 0u64;
                loop {
                    let n = self.read_available_to(output)?;
                    if n == 0 {
                        break;
                    }
                    total += n as u64;
                }
                Ok(total)
            }
            Some(target) => {
                let mut total = 0usize;
                while total < target {
                    if !self.ensure_readable()? {
                        return Err(BufferError::BufferEmpty);
                    }
                    let remaining = target - total;
                    let avail = self.current_unread();
                    if avail <= remaining && self.checkpoints.is_empty() {
                        let owned = self.take_current_buffer()?;
                        let n = transfer::transfer(output, owned)?;
                        total += n;
                    } else {
                        let take = avail.min(remaining);
                        let buf = &mut self.chain[self.read_cursor];
                        let start = buf.read_index();
                        let bytes = buf.filled_slice()[..take].to_vec();
                        output.write_buffer(&bytes)?;
                        buf.set_read_index(start + take)?;
                        total += take;
                    }
                }
                Ok(total as u64)
            }
        }
    }

    fn capture_checkpoint(&self) -> PreviewCheckpoint {
        let head_read_index = self
            .chain
            .get(self.read_cursor)
            .map(|b| b.read_index())
            .unwrap_or(0);
        PreviewCheckpoint {
            cursor: self.read_cursor,
            head_read_index,
        }
    }

    fn finish_preview(&mut self, checkpoint: PreviewCheckpoint) -> Result<()> {
        self.checkpoints.pop();
        if self.closed {
            // `close()` already drained and recycled every buffer; there is
            // nothing left to restore.
            return Ok(());
        }
        // Every buffer from the checkpoint's head onward — whether it
        // already existed (untouched, read_index == 0) or was appended
        // during this preview — reverts to the state it had when this
        // preview level began: the head to its saved read_index, the rest
        // to fresh (0), since only the head can have been partially
        // consumed before entry.
        for (i, buf) in self.chain.iter_mut().enumerate().skip(checkpoint.cursor) {
            let restore_to = if i == checkpoint.cursor { checkpoint.head_read_index } else { 0 };
            buf.set_read_index(restore_to)?;
        }
        self.read_cursor = checkpoint.cursor;
        self.reclaim_consumed_prefix()
    }

    /// Runs `block` with a checkpoint in place: any reads it performs
    /// (including nested previews, zero-copy transfers, or `copy_to`)
    /// leave the stream exactly as it was once `block` returns, so the
    /// same bytes can be read again afterward.
    ///
    /// Fails with `BufferEmpty` if the stream is at EOF and no preview can
    /// be started; previews can be nested arbitrarily. If `block` closes
    /// the `Input`, that close is terminal and replay is not attempted.
    pub fn preview<R>(&mut self, block: impl FnOnce(&mut Input) -> R) -> Result<R> {
        self.check_open()?;
        if !self.ensure_readable()? {
            return Err(BufferError::BufferEmpty);
        }
        let checkpoint = self.capture_checkpoint();
        self.checkpoints.push(checkpoint);
        let result = block(self);
        self.finish_preview(checkpoint)?;
        Ok(result)
    }

    /// Recycles every held buffer, runs the close hook if any, and marks
    /// the stream closed. Idempotent: closing twice is a no-op success.
    /// Buffers are always recycled even if the close hook then fails.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.checkpoints.clear();
        self.read_cursor = 0;
        while let Some(buf) = self.chain.pop_front() {
            if let Err(e) = self.pool.recycle(buf) {
                tracing::warn!(error = %e, "failed to recycle input buffer during close");
            }
        }
        if let Some(close_source) = self.close_source.as_mut() {
            close_source()?;
        }
        Ok(())
    }
}

impl Drop for Input {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
