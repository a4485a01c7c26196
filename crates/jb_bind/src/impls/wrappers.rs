use std::sync::Arc;

use crate::bind::Described;
use crate::desc::{GenericDescCell, TypeDesc, WrapperDesc};

impl<T: Described> Described for Box<T> {
    fn descriptor() -> &'static TypeDesc {
        static CELL: GenericDescCell = GenericDescCell::new();
        CELL.get_or_insert::<Self>(|| {
            TypeDesc::Wrapper(WrapperDesc::new::<Box<T>, T>(
                |boxed| &**boxed,
                Box::new,
            ))
        })
    }
}

impl<T: Described> Described for Arc<T> {
    fn descriptor() -> &'static TypeDesc {
        static CELL: GenericDescCell = GenericDescCell::new();
        CELL.get_or_insert::<Self>(|| {
            TypeDesc::Wrapper(WrapperDesc::new::<Arc<T>, T>(
                |shared| &**shared,
                Arc::new,
            ))
        })
    }
}

// -----------------------------------------------------------------------------
// Tests
