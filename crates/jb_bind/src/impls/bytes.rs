use core::ops::Deref;

use crate::bind::Described;
use crate::desc::{BytesDesc, DescCell, TypeDesc};

/// A binary payload.
///
/// Plain `Vec<u8>` binds as a list of numbers like any other sequence;
/// wrapping the buffer in `Bytes` routes it through the configured
/// binary-data strategy (integer array, Base64 or URL-safe Base64).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    #[inline]
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl Deref for Bytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Bytes {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl Described for Bytes {
    fn descriptor() -> &'static TypeDesc {
        static CELL: DescCell = DescCell::new();
        CELL.get_or_init(|| {
            TypeDesc::Bytes(BytesDesc::new::<Bytes>(Bytes::as_slice, Bytes))
        })
    }
}
