use jb_json::Value;

use crate::bind::Described;
use crate::desc::{DescCell, DynamicDesc, TypeDesc};

impl Described for Value {
    fn descriptor() -> &'static TypeDesc {
        static CELL: DescCell = DescCell::new();
        CELL.get_or_init(|| TypeDesc::Dynamic(DynamicDesc::new::<Value>()))
    }
}
