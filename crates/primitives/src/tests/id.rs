use std::collections::HashSet;

use super::Id;

#[test]
fn random_ids_are_distinct() {
    let ids: HashSet<_> = (0..64).map(|_| Id::random()).collect();
    assert_eq!(ids.len(), 64, "random ids collided");
}

#[test]
fn display_round_trips_through_from_str() {
    let id = Id::random();
    let parsed: Id = id.to_string().parse().expect("round trip failed");
    assert_eq!(id, parsed);
}

#[test]
fn rejects_wrong_length() {
    // Valid base58, wrong byte count.
    let err = "3yZe7d".parse::<Id>();
    assert!(err.is_err(), "expected a length error");
}

#[test]
fn serializes_as_a_string() {
    let id = Id::from([7_u8; 16]);
    let json = serde_json::to_string(&id).expect("serialize failed");
    assert_eq!(json, format!("\"{id}\""));
}
