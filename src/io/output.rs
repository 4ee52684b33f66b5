// src/io/output.rs
//! Push-based byte sink that accumulates writes into a pooled buffer and
//! flushes it downstream once full, on demand, or on close.

use std::sync::Arc;

use crate::error::{BufferError, Result};

use super::pool::{IoBufferPool, PooledIoBuffer};

type FlushFn = dyn FnMut(&[u8]) -> Result<()> + Send;
type CloseFn = dyn FnMut() -> Result<()> + Send;

/// A buffered, push-based sink.
///
/// Writes accumulate into a single pooled buffer (`current`); once it
/// fills, or on an explicit [`flush`](Output::flush), its bytes are handed
/// to the `flush` callback and the buffer is returned to the pool.
pub struct Output {
    pool: Arc<dyn IoBufferPool>,
    current: Option<PooledIoBuffer>,
    closed: bool,
    flush_hook: Box<FlushFn>,
    close_sink: Option<Box<CloseFn>>,
}

impl Output {
    /// Builds an `Output` borrowing buffers from `pool` and delivering
    /// filled regions via `flush_hook`.
    pub fn new(
        pool: Arc<dyn IoBufferPool>,
        flush_hook: impl FnMut(&[u8]) -> Result<()> + Send + 'static,
    ) -> Self {
        Self {
            pool,
            current: None,
            closed: false,
            flush_hook: Box::new(flush_hook),
            close_sink: None,
        }
    }

    /// Attaches a hook run once, after a final flush, when this `Output`
    /// closes (e.g. to close an underlying socket).
    pub fn with_close_hook(mut self, close_sink: impl FnMut() -> Result<()> + Send + 'static) -> Self {
        self.close_sink = Some(Box::new(close_sink));
        self
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            Err(BufferError::InvalidState("output is closed".to_string()))
        } else {
            Ok(())
        }
    }

    fn ensure_current(&mut self) -> Result<()> {
        if self.current.is_none() {
            self.current = Some(self.pool.borrow()?);
        }
        Ok(())
    }

    /// Calls the flush callback directly, bypassing `current` entirely.
    /// Used by the zero-copy transfer bridge to deliver an `Input`
    /// buffer's bytes without ever staging them through this pool.
    pub(crate) fn deliver(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        (self.flush_hook)(bytes)
    }

    /// Flushes `current` if it holds any bytes, so a subsequent delivery
    /// (buffered or transferred) arrives in order after it.
    pub(crate) fn flush_pending(&mut self) -> Result<()> {
        if matches!(&self.current, Some(buf) if buf.write_index() > 0) {
            self.flush()
        } else {
            Ok(())
        }
    }

    /// Writes a single byte, flushing the current buffer once it fills.
    pub fn write_byte(&mut self, b: u8) -> Result<()> {
        self.check_open()?;
        self.ensure_current()?;
        let full = {
            let buf = self.current.as_mut().expect("just ensured");
            let wi = buf.write_index();
            buf.set(wi, b)?;
            buf.set_write_index(wi + 1)?;
            buf.write_index() == buf.capacity()
        };
        if full {
            self.flush()?;
        }
        Ok(())
    }

    /// Writes `src`, splitting across as many pooled buffers as needed and
    /// flushing each as it fills. When `src` alone exceeds one pool buffer's
    /// capacity, any pending bytes are flushed first and `src` is then
    /// forwarded straight to the flush callback in a single call, rather
    /// than copied in piecemeal.
    pub fn write_buffer(&mut self, src: &[u8]) -> Result<()> {
        self.check_open()?;
        if src.is_empty() {
            return Ok(());
        }

        if src.len() > self.pool.buffer_size() {
            self.flush()?; // delivers and releases any pending bytes first
            return self.deliver(src);
        }

        let mut offset = 0;
        while offset < src.len() {
            self.ensure_current()?;
            let buf = self.current.as_mut().expect("just ensured");
            let space = buf.capacity() - buf.write_index();
            if space == 0 {
                self.flush()?;
                continue;
            }
            let take = (src.len() - offset).min(space);
            let wi = buf.write_index();
            buf.write_slice(wi, &src[offset..offset + take])?;
            buf.set_write_index(wi + take)?;
            offset += take;
            if buf.write_index() == buf.capacity() {
                self.flush()?;
            }
        }
        Ok(())
    }

    /// Accepts a buffer transferred from an `Input`, delivering its bytes
    /// without copying and recycling it back to its originating pool.
    pub fn accept_transfer(&mut self, buf: PooledIoBuffer) -> Result<usize> {
        self.check_open()?;
        super::transfer::transfer(self, buf)
    }

    /// Flushes the current buffer, if any, delivering its bytes and
    /// returning it to the pool. A no-op if nothing is buffered.
    pub fn flush(&mut self) -> Result<()> {
        self.check_open()?;
        if let Some(buf) = self.current.take() {
            let flush_result = if buf.write_index() > 0 {
                (self.flush_hook)(buf.filled_slice())
            } else {
                Ok(())
            };
            let recycle_result = buf.recycle_to_origin();
            flush_result?;
            recycle_result?;
        }
        Ok(())
    }

    /// Flushes, runs the close hook if any, and marks the sink closed.
    /// Idempotent: closing twice is a no-op success. The sink is marked
    /// closed even if the flush or close hook fails.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        let flush_result = self.flush();
        self.closed = true;
        flush_result?;
        if let Some(close_sink) = self.close_sink.as_mut() {
            close_sink()?;
        }
        Ok(())
    }
}

impl Drop for Output {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
