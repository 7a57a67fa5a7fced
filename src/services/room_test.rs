use super::*;
use base64::{Engine, engine::general_purpose::STANDARD};
use crate::element::RemoteElement;
use crate::payload::ROOM_USER_CHANGE;
use crate::state::test_helpers;
use serde_json::json;

fn names(messages: &[OutboundMessage]) -> Vec<&str> {
    messages.iter().map(|m| m.name.as_str()).collect()
}

fn decode_body(message: &OutboundMessage) -> serde_json::Value {
    let text = message.data.as_str().unwrap();
    serde_json::from_slice(&STANDARD.decode(text).unwrap()).unwrap()
}

#[tokio::test]
async fn first_joiner_is_told_it_is_first() {
    let state = test_helpers::test_app_state();
    let mut rx = test_helpers::connect_session(&state, "s1");

    join_room(&state, "r1", "s1").await;

    let messages = test_helpers::drain(&mut rx);
    assert_eq!(names(&messages), vec![FIRST_IN_ROOM, ROOM_USER_CHANGE]);
    assert_eq!(messages[1].data, json!(["s1"]));
}

#[tokio::test]
async fn second_joiner_is_announced_to_existing_members() {
    let state = test_helpers::test_app_state();
    let mut rx1 = test_helpers::connect_session(&state, "s1");
    let mut rx2 = test_helpers::connect_session(&state, "s2");
    join_room(&state, "r1", "s1").await;
    test_helpers::drain(&mut rx1);

    join_room(&state, "r1", "s2").await;

    let to_s1 = test_helpers::drain(&mut rx1);
    assert_eq!(names(&to_s1), vec![NEW_USER, ROOM_USER_CHANGE]);
    assert_eq!(to_s1[0].data, json!("s2"));
    assert_eq!(to_s1[1].data, json!(["s1", "s2"]));

    let to_s2 = test_helpers::drain(&mut rx2);
    assert_eq!(names(&to_s2), vec![ROOM_USER_CHANGE]);
}

#[tokio::test]
async fn joiner_receives_stored_scene() {
    let state = test_helpers::test_app_state();
    let mut rx1 = test_helpers::connect_session(&state, "s1");
    let mut rx2 = test_helpers::connect_session(&state, "s2");
    join_room(&state, "r1", "s1").await;
    state
        .documents
        .apply("r1", vec![RemoteElement::new(Element::new("a"))])
        .await;
    test_helpers::drain(&mut rx1);

    join_room(&state, "r1", "s2").await;

    let to_s2 = test_helpers::drain(&mut rx2);
    assert_eq!(names(&to_s2), vec![CLIENT_BROADCAST, ROOM_USER_CHANGE]);
    let body = decode_body(&to_s2[0]);
    assert_eq!(body["type"], json!(SCENE_INIT));
    assert_eq!(body["elements"][0]["id"], json!("a"));
}

#[tokio::test]
async fn joining_another_room_leaves_the_first() {
    let state = test_helpers::test_app_state();
    let mut rx1 = test_helpers::connect_session(&state, "s1");
    let _rx2 = test_helpers::connect_session(&state, "s2");
    join_room(&state, "r1", "s1").await;
    join_room(&state, "r1", "s2").await;
    test_helpers::drain(&mut rx1);

    join_room(&state, "r2", "s2").await;

    assert!(!state.rooms.is_member("r1", "s2"));
    assert!(state.rooms.is_member("r2", "s2"));
    let to_s1 = test_helpers::drain(&mut rx1);
    assert_eq!(names(&to_s1), vec![ROOM_USER_CHANGE]);
    assert_eq!(to_s1[0].data, json!(["s1"]));
}

#[tokio::test]
async fn leave_announces_remaining_members() {
    let state = test_helpers::test_app_state();
    let mut rx1 = test_helpers::connect_session(&state, "s1");
    let mut rx2 = test_helpers::connect_session(&state, "s2");
    join_room(&state, "r1", "s1").await;
    join_room(&state, "r1", "s2").await;
    test_helpers::drain(&mut rx1);
    test_helpers::drain(&mut rx2);

    leave_room(&state, "r1", "s2").await;

    let to_s1 = test_helpers::drain(&mut rx1);
    assert_eq!(names(&to_s1), vec![ROOM_USER_CHANGE]);
    assert_eq!(to_s1[0].data, json!(["s1"]));
    assert!(test_helpers::drain(&mut rx2).is_empty());
}

#[tokio::test]
async fn last_leave_evicts_document() {
    let state = test_helpers::test_app_state();
    let _rx = test_helpers::connect_session(&state, "s1");
    join_room(&state, "r1", "s1").await;
    state
        .documents
        .apply("r1", vec![RemoteElement::new(Element::new("a"))])
        .await;

    leave_current(&state, "s1").await;

    assert_eq!(state.rooms.room_count(), 0);
    assert_eq!(state.documents.room_count().await, 0);
}

#[tokio::test]
async fn join_between_last_leave_and_eviction_keeps_document() {
    let state = test_helpers::test_app_state();
    let _rx_a = test_helpers::connect_session(&state, "a");
    let _rx_b = test_helpers::connect_session(&state, "b");
    join_room(&state, "r1", "a").await;
    state
        .documents
        .apply("r1", vec![RemoteElement::new(Element::new("old"))])
        .await;

    // a's leave has emptied the room but not yet evicted.
    assert_eq!(state.rooms.leave("r1", "a"), 0);
    join_room(&state, "r1", "b").await;
    state
        .documents
        .apply("r1", vec![RemoteElement::new(Element::new("fresh"))])
        .await;

    assert!(!evict_if_abandoned(&state, "r1").await);

    assert!(state.rooms.is_member("r1", "b"));
    let ids: Vec<String> = state
        .documents
        .snapshot("r1")
        .await
        .iter()
        .map(|e| e.id.clone())
        .collect();
    assert_eq!(ids, vec!["old", "fresh"]);
}

#[tokio::test]
async fn leave_current_without_room_is_noop() {
    let state = test_helpers::test_app_state();
    let mut rx = test_helpers::connect_session(&state, "s1");
    leave_current(&state, "s1").await;
    assert!(test_helpers::drain(&mut rx).is_empty());
}

#[test]
fn scene_body_encodes_type_and_elements() {
    let elements = vec![Arc::new(Element::new("a").with_version(3))];
    let body: serde_json::Value = serde_json::from_slice(&scene_body(SCENE_SYNC, &elements).unwrap()).unwrap();
    assert_eq!(body["type"], json!("scene-sync"));
    assert_eq!(body["elements"][0]["version"], json!(3));
}
