//! Integration tests across the identifier and locator types together.

use crate::{Cookie, Key, NeedleRegion, VolumeId};

#[test]
fn index_entry_shape_round_trips_through_plain_integers() {
    // Mirrors how an index record is actually built: a `Key` and a packed
    // `NeedleRegion`, both reduced to plain integers for the on-disk codec.
    let vid = VolumeId::new(7);
    let key = Key::new(42);
    let cookie = Cookie::new(1);
    let region = NeedleRegion::new(1, 40);

    let key_bytes = key.as_i64();
    let region_bytes = region.encode();

    let decoded_region = NeedleRegion::decode(region_bytes);
    assert_eq!(decoded_region, region);
    assert_eq!(Key::new(key_bytes), key);
    assert_eq!(vid.as_i32(), 7);
    assert_eq!(cookie.as_i32(), 1);
}

#[test]
fn distinct_keys_pack_into_distinct_map_slots() {
    use std::collections::HashMap;

    let mut map: HashMap<Key, u64> = HashMap::new();
    map.insert(Key::new(42), NeedleRegion::new(1, 40).encode());
    map.insert(Key::new(43), NeedleRegion::new(6, 40).encode());

    assert_eq!(
        NeedleRegion::decode(map[&Key::new(42)]),
        NeedleRegion::new(1, 40)
    );
    assert_eq!(
        NeedleRegion::decode(map[&Key::new(43)]),
        NeedleRegion::new(6, 40)
    );
}
