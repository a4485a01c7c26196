#![doc = include_str!("../README.md")]

pub use jb_bind as bind;
pub use jb_json as json;

/// Commonly used items, re-exported in one place.
pub mod prelude {
    pub use jb_bind::bind::{Bind, Described};
    pub use jb_bind::desc::BindType;
    pub use jb_bind::{BindConfig, BindError, Engine};
    pub use jb_json::Value;
}
