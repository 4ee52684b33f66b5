// src/io/mod.rs
//! Pull/push buffered I/O on top of the pooled [`Buffer`](crate::buffer::Buffer)
//! machinery: a FIFO [`Input`](input::Input) for reading, an accumulating
//! [`Output`](output::Output) for writing, and a zero-copy bridge between the
//! two that hands a filled region straight from one side to the other without
//! ever copying its bytes.

pub mod adapters;
pub mod buf;
pub mod input;
pub mod output;
pub mod pool;
mod transfer;

pub use buf::IoBuffer;
pub use input::Input;
pub use output::Output;
pub use pool::{IoBufferPool, PooledIoBuffer, StandardIoPool};
