#![doc = include_str!("../README.md")]

pub mod bind;
pub mod component;
pub mod config;
pub mod de;
pub mod desc;
pub mod error;
pub mod impls;
pub mod model;
pub mod resolve;
pub mod ser;

mod context;
mod engine;
mod format;

pub use config::{BinaryDataStrategy, BindConfig};
pub use engine::Engine;
pub use error::BindError;
pub use impls::Bytes;
