//! Synchronization primitives shared between tasks.
pub mod ring_buffer;

pub use ring_buffer::RingBuffer;
