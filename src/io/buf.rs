// src/io/buf.rs
//! Fixed-capacity byte region used as the unit of exchange between pools,
//! [`Input`](super::input::Input) and [`Output`](super::output::Output).

use zeroize::Zeroize;

use crate::error::{BufferError, Result};

/// A fixed-capacity byte buffer with independent read and write cursors.
///
/// Unlike [`Buffer`](crate::buffer::Buffer), `IoBuffer` never grows: its
/// capacity is fixed at construction, which is what lets a pool recycle the
/// same backing allocation indefinitely. `read_index` marks how much of the
/// filled region `[0, write_index)` has already been consumed.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct IoBuffer {
    data: Vec<u8>,
    capacity: usize,
    read_index: usize,
    write_index: usize,
}

impl IoBuffer {
    /// Allocates a zeroed buffer of the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity],
            capacity,
            read_index: 0,
            write_index: 0,
        }
    }

    /// A zero-capacity sentinel, useful as a placeholder before a real
    /// buffer is borrowed.
    pub fn empty() -> Self {
        Self {
            data: Vec::new(),
            capacity: 0,
            read_index: 0,
            write_index: 0,
        }
    }

    /// Total byte capacity, fixed for the life of the buffer.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current read cursor.
    pub fn read_index(&self) -> usize {
        self.read_index
    }

    /// Current write cursor; bytes in `[0, write_index)` are considered filled.
    pub fn write_index(&self) -> usize {
        self.write_index
    }

    /// Unread bytes still pending between the read and write cursors.
    pub fn unread(&self) -> usize {
        self.write_index - self.read_index
    }

    /// Moves the read cursor. Must stay within `[0, write_index]`.
    pub fn set_read_index(&mut self, index: usize) -> Result<()> {
        if index > self.write_index {
            return Err(BufferError::PositionOutOfBounds);
        }
        self.read_index = index;
        Ok(())
    }

    /// Moves the write cursor. Must stay within `[0, capacity]`.
    pub fn set_write_index(&mut self, index: usize) -> Result<()> {
        if index > self.capacity {
            return Err(BufferError::BufferOverflow);
        }
        self.write_index = index;
        Ok(())
    }

    /// Reads the byte at an absolute offset, irrespective of either cursor.
    pub fn get(&self, index: usize) -> Result<u8> {
        self.data.get(index).copied().ok_or(BufferError::PositionOutOfBounds)
    }

    /// Writes the byte at an absolute offset, irrespective of either cursor.
    pub fn set(&mut self, index: usize, value: u8) -> Result<()> {
        if index >= self.capacity {
            return Err(BufferError::PositionOutOfBounds);
        }
        self.data[index] = value;
        Ok(())
    }

    /// Copies `data[start..]` into the buffer at `start`, without touching
    /// either cursor. Callers advance `write_index` themselves.
    pub fn write_slice(&mut self, start: usize, data: &[u8]) -> Result<()> {
        let end = start
            .checked_add(data.len())
            .ok_or(BufferError::BufferOverflow)?;
        if end > self.capacity {
            return Err(BufferError::BufferOverflow);
        }
        self.data[start..end].copy_from_slice(data);
        Ok(())
    }

    /// The unread region `[read_index, write_index)`.
    pub fn filled_slice(&self) -> &[u8] {
        &self.data[self.read_index..self.write_index]
    }

    /// Copies `[src_start, src_end)` of `self` into `dest` starting at
    /// `dest_start`. Neither cursor is consulted or updated.
    ///
    /// Aliasing `self` and `dest` to the same buffer would be a bug in the
    /// original design this is modeled on; here it simply cannot be
    /// expressed, since the borrow checker already refuses `&self` and
    /// `&mut IoBuffer` pointing at one object.
    pub fn copy_to(
        &self,
        dest: &mut IoBuffer,
        src_start: usize,
        src_end: usize,
        dest_start: usize,
    ) -> Result<()> {
        if src_start > src_end || src_end > self.capacity {
            return Err(BufferError::PositionOutOfBounds);
        }
        let len = src_end - src_start;
        let dest_end = dest_start
            .checked_add(len)
            .ok_or(BufferError::BufferOverflow)?;
        if dest_end > dest.capacity {
            return Err(BufferError::BufferOverflow);
        }
        dest.data[dest_start..dest_end].copy_from_slice(&self.data[src_start..src_end]);
        Ok(())
    }

    /// Zeroes the backing storage and resets both cursors, for reuse by a
    /// pool. Uses `as_mut_slice` rather than `Vec::zeroize`, which would
    /// truncate `data` to length zero and break every future bounds check —
    /// the same pitfall documented on [`Buffer::burn`](crate::buffer::Buffer::burn).
    pub(crate) fn reset_for_reuse(&mut self) {
        self.data.as_mut_slice().zeroize();
        self.read_index = 0;
        self.write_index = 0;
    }
}
