// src/io/transfer.rs
//! Zero-copy hand-off of a filled [`Input`](super::input::Input) buffer into
//! an [`Output`](super::output::Output)'s flush path.

use crate::error::Result;

use super::output::Output;
use super::pool::PooledIoBuffer;

/// Delivers `buf`'s bytes to `output` without copying them into a buffer
/// borrowed from `output`'s own pool, then returns `buf` to whichever pool
/// originally lent it out. Any bytes already pending in `output` are
/// flushed first, so delivery stays in order.
pub(crate) fn transfer(output: &mut Output, buf: PooledIoBuffer) -> Result<usize> {
    output.flush_pending()?;
    let n = buf.unread();
    output.deliver(buf.filled_slice())?;
    buf.recycle_to_origin()?;
    Ok(n)
}
