//! [`Described`](crate::bind::Described) implementations for the standard
//! types the engine supports out of the box.
//!
//! - scalars: booleans, sized integers, floats, `char`, `String`
//! - `time::OffsetDateTime` as the date/time scalar
//! - containers: `Vec`, `VecDeque`, maps, `Option`, fixed arrays
//! - wrappers: `Box`, `Arc`
//! - [`Bytes`] for binary payloads
//! - the [`Value`](jb_json::Value) document model

mod bytes;
mod collections;
mod scalars;
mod time;
mod value;
mod wrappers;

pub use bytes::Bytes;
