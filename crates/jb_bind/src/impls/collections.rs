use core::hash::Hash;
use std::collections::{BTreeMap, HashMap, VecDeque};

use crate::bind::Described;
use crate::desc::{ArrayDesc, GenericDescCell, ListDesc, MapDesc, OptionalDesc, TypeDesc};

// -----------------------------------------------------------------------------
// Sequences

impl<T: Described> Described for Vec<T> {
    fn descriptor() -> &'static TypeDesc {
        static CELL: GenericDescCell = GenericDescCell::new();
        CELL.get_or_insert::<Self>(|| TypeDesc::List(ListDesc::of::<Vec<T>, T>()))
    }
}

impl<T: Described> Described for VecDeque<T> {
    fn descriptor() -> &'static TypeDesc {
        static CELL: GenericDescCell = GenericDescCell::new();
        CELL.get_or_insert::<Self>(|| TypeDesc::List(ListDesc::of::<VecDeque<T>, T>()))
    }
}

impl<T: Described, const N: usize> Described for [T; N] {
    fn descriptor() -> &'static TypeDesc {
        static CELL: GenericDescCell = GenericDescCell::new();
        CELL.get_or_insert::<Self>(|| TypeDesc::Array(ArrayDesc::of::<T, N>()))
    }
}

// -----------------------------------------------------------------------------
// Option

impl<T: Described> Described for Option<T> {
    fn descriptor() -> &'static TypeDesc {
        static CELL: GenericDescCell = GenericDescCell::new();
        CELL.get_or_insert::<Self>(|| TypeDesc::Optional(OptionalDesc::of::<T>()))
    }
}

// -----------------------------------------------------------------------------
// Maps

impl<K, V> Described for HashMap<K, V>
where
    K: Described + Eq + Hash,
    V: Described,
{
    fn descriptor() -> &'static TypeDesc {
        static CELL: GenericDescCell = GenericDescCell::new();
        CELL.get_or_insert::<Self>(|| TypeDesc::Map(MapDesc::of::<HashMap<K, V>, K, V>()))
    }
}

impl<K, V> Described for BTreeMap<K, V>
where
    K: Described + Ord,
    V: Described,
{
    fn descriptor() -> &'static TypeDesc {
        static CELL: GenericDescCell = GenericDescCell::new();
        CELL.get_or_insert::<Self>(|| TypeDesc::Map(MapDesc::of::<BTreeMap<K, V>, K, V>()))
    }
}

impl<K, V> Described for hashbrown::HashMap<K, V>
where
    K: Described + Eq + Hash,
    V: Described,
{
    fn descriptor() -> &'static TypeDesc {
        static CELL: GenericDescCell = GenericDescCell::new();
        CELL.get_or_insert::<Self>(|| {
            TypeDesc::Map(MapDesc::of::<hashbrown::HashMap<K, V>, K, V>())
        })
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use crate::bind::{Bind, Described};
    use crate::desc::DescKind;

    #[test]
    fn container_descriptors() {
        assert_eq!(Vec::<i32>::descriptor().kind(), DescKind::List);
        assert_eq!(<[u8; 4]>::descriptor().kind(), DescKind::Array);
        assert_eq!(Option::<String>::descriptor().kind(), DescKind::Optional);
        assert_eq!(
            BTreeMap::<String, i32>::descriptor().kind(),
            DescKind::Map
        );
    }

    #[test]
    fn generic_cell_distinguishes_instantiations() {
        let a = Vec::<i32>::descriptor();
        let b = Vec::<String>::descriptor();
        assert_ne!(a.ty().id(), b.ty().id());
        // Same instantiation shares the leaked descriptor.
        assert!(core::ptr::eq(a, Vec::<i32>::descriptor()));
    }

    #[test]
    fn list_capabilities_round_trip() {
        let desc = Vec::<i32>::descriptor().as_list().unwrap();
        let mut list = desc.create();
        desc.push(&mut *list, Box::new(1_i32)).unwrap();
        desc.push(&mut *list, Box::new(2_i32)).unwrap();

        let collected: Vec<i32> = desc
            .iter(&*list)
            .unwrap()
            .map(|item| *item.downcast_ref::<i32>().unwrap())
            .collect();
        assert_eq!(collected, vec![1, 2]);

        // Type mismatch is reported, not panicked.
        assert!(desc.push(&mut *list, Box::new("x".to_string())).is_err());
    }

    #[test]
    fn optional_capabilities() {
        let desc = Option::<i32>::descriptor().as_optional().unwrap();
        let none = desc.none();
        assert!(desc.as_inner(&*none).unwrap().is_none());

        let some = desc.some(Box::new(7_i32)).unwrap();
        let inner = desc.as_inner(&*some).unwrap().unwrap();
        assert_eq!(inner.downcast_ref::<i32>(), Some(&7));
    }
}
