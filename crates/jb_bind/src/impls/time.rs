use time::OffsetDateTime;

use crate::bind::Described;
use crate::desc::{DescCell, ScalarDesc, ScalarKind, TypeDesc};

impl Described for OffsetDateTime {
    fn descriptor() -> &'static TypeDesc {
        static CELL: DescCell = DescCell::new();
        CELL.get_or_init(|| {
            TypeDesc::Scalar(ScalarDesc::new::<OffsetDateTime>(ScalarKind::DateTime))
        })
    }
}
