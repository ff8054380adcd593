use std::collections::HashMap;

crate::define_id! {
    pub struct TestId("tst-");
}

#[test]
fn new_ids_carry_the_prefix_and_fit_the_buffer() {
    let id = TestId::new();
    assert!(id.as_str().starts_with("tst-"));
    assert_eq!(id.as_str().len(), crate::id::ID_MAX_LEN);
}

#[test]
fn round_trips_through_json() {
    let id = TestId::new();
    let json = serde_json::to_string(&id).unwrap();
    let back: TestId = serde_json::from_str(&json).unwrap();
    assert_eq!(id, back);
}

#[test]
fn hash_map_lookup_by_borrowed_str() {
    let id = TestId::new();
    let mut map = HashMap::new();
    map.insert(id, "value");
    assert_eq!(map.get(id.as_str()), Some(&"value"));
}

#[test]
fn two_ids_are_never_equal() {
    assert_ne!(TestId::new(), TestId::new());
}
