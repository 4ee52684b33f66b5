// src/io/adapters.rs
//! Convenience constructors wrapping an [`Input`] or [`Output`] around
//! ordinary `std::io` types and in-memory buffers. These are sugar over
//! the core `fill`/`flush` contract, not part of it.

use std::io::{Read, Write};
use std::sync::Arc;

use crate::error::BufferError;
use crate::pool::PoolConfig;

use super::input::Input;
use super::output::Output;
use super::pool::{IoBufferPool, StandardIoPool};

fn adapter_pool(buffer_size: usize) -> Arc<dyn IoBufferPool> {
    StandardIoPool::new(PoolConfig {
        buffer_size,
        max_pool_size: 8,
        min_pool_size: 0,
    })
}

impl Input {
    /// An `Input` that reads from an in-memory byte vector.
    pub fn from_slice(data: Vec<u8>) -> Input {
        let buffer_size = data.len().clamp(1, 64 * 1024);
        let pool = adapter_pool(buffer_size);
        let mut cursor = 0usize;
        Input::new(pool, move |buf, start, end| {
            let remaining = data.len() - cursor;
            if remaining == 0 {
                return Ok(0);
            }
            let take = remaining.min(end - start);
            buf.write_slice(start, &data[cursor..cursor + take])?;
            cursor += take;
            Ok(take)
        })
    }

    /// An `Input` backed by any [`std::io::Read`], pulling up to
    /// `buffer_size` bytes per fill.
    pub fn from_reader<R: Read + Send + 'static>(mut reader: R, buffer_size: usize) -> Input {
        let pool = adapter_pool(buffer_size);
        Input::new(pool, move |buf, start, end| {
            let mut scratch = vec![0u8; end - start];
            let n = reader.read(&mut scratch).map_err(BufferError::from)?;
            if n > 0 {
                buf.write_slice(start, &scratch[..n])?;
            }
            Ok(n)
        })
    }
}

impl Output {
    /// An `Output` that forwards every flushed chunk to any
    /// [`std::io::Write`] sink.
    pub fn from_writer<W: Write + Send + 'static>(mut writer: W, buffer_size: usize) -> Output {
        let pool = adapter_pool(buffer_size);
        Output::new(pool, move |bytes| {
            writer.write_all(bytes).map_err(BufferError::from)
        })
    }
}
