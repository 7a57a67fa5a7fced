use super::*;
use crate::element::{Element, OrderingHint};
use serde_json::json;

#[test]
fn parse_presence_payload() {
    let text = r#"{"name":"room-user-change","roomID":"r1","socketIDs":["s1","s2"]}"#;
    let payload = InboundPayload::parse(text).unwrap();
    assert_eq!(payload.name, ROOM_USER_CHANGE);
    assert_eq!(payload.room_id, "r1");
    assert_eq!(payload.socket_ids, Some(vec!["s1".to_string(), "s2".to_string()]));
    assert!(payload.data.is_none());
}

#[test]
fn parse_broadcast_payload_with_bytes() {
    let text = r#"{"name":"server-broadcast","roomID":"r1","publisherId":"s9","data":[1,2,255]}"#;
    let payload = InboundPayload::parse(text).unwrap();
    assert_eq!(payload.publisher_id.as_deref(), Some("s9"));
    assert_eq!(payload.data, Some(vec![1, 2, 255]));
}

#[test]
fn parse_broadcast_payload_with_base64_bytes() {
    let payload = InboundPayload::parse(r#"{"name":"server-broadcast","roomID":"r1","data":"AQL/"}"#).unwrap();
    assert_eq!(payload.data, Some(vec![1, 2, 255]));
}

#[test]
fn parse_rejects_invalid_base64() {
    let err = InboundPayload::parse(r#"{"name":"server-broadcast","roomID":"r1","data":"not base64!"}"#).unwrap_err();
    assert_eq!(err.error_code(), "E_INVALID_PAYLOAD");
}

#[test]
fn inbound_data_serializes_as_base64() {
    let payload = InboundPayload::new(SERVER_BROADCAST, "r1").with_data(vec![9]);
    let value = serde_json::to_value(&payload).unwrap();
    assert_eq!(value["data"], json!("CQ=="));
    assert_eq!(serde_json::from_value::<InboundPayload>(value).unwrap(), payload);
}

#[test]
fn parse_scene_update_with_hints() {
    let text = json!({
        "name": "scene-update",
        "roomID": "r1",
        "elements": [
            {"id": "a", "version": 2, "__precedingElement__": "^"},
            {"id": "b", "version": 1, "__precedingElement__": "a", "type": "rectangle"}
        ]
    })
    .to_string();
    let payload = InboundPayload::parse(&text).unwrap();
    let elements = payload.elements.unwrap();
    assert_eq!(elements.len(), 2);
    assert_eq!(elements[0].preceding, Some(OrderingHint::First));
    assert_eq!(elements[1].preceding, Some(OrderingHint::After("a".into())));
    assert_eq!(elements[1].element.attributes.get("type"), Some(&json!("rectangle")));
}

#[test]
fn parse_rejects_invalid_json() {
    let err = InboundPayload::parse("{not json").unwrap_err();
    assert!(matches!(err, PayloadError::Decode(_)));
    assert_eq!(err.error_code(), "E_INVALID_PAYLOAD");
}

#[test]
fn parse_requires_name() {
    assert!(InboundPayload::parse(r#"{"roomID":"r1"}"#).is_err());
}

#[test]
fn missing_room_defaults_to_empty() {
    let payload = InboundPayload::parse(r#"{"name":"disconnect"}"#).unwrap();
    assert!(payload.room_id.is_empty());
    assert!(matches!(payload.require_room(), Err(PayloadError::MissingRoom { .. })));
}

#[test]
fn require_room_returns_id() {
    let payload = InboundPayload::new(JOIN_ROOM, "r1");
    assert_eq!(payload.require_room().unwrap(), "r1");
}

#[test]
fn builders_set_fields() {
    let payload = InboundPayload::new(SCENE_UPDATE, "r1")
        .with_publisher("s1")
        .with_data(vec![7])
        .with_socket_ids(vec!["s2".into()])
        .with_elements(vec![RemoteElement::new(Element::new("a"))]);
    assert_eq!(payload.publisher_id.as_deref(), Some("s1"));
    assert_eq!(payload.data, Some(vec![7]));
    assert_eq!(payload.socket_ids.as_ref().map(Vec::len), Some(1));
    assert_eq!(payload.elements.as_ref().map(Vec::len), Some(1));
}

#[test]
fn outbound_serializes_without_delivery() {
    let msg = OutboundMessage::new(ROOM_USER_CHANGE, json!(["a", "b"]))
        .with_room("r1")
        .with_delivery(Delivery::Volatile);
    let value = serde_json::to_value(&msg).unwrap();
    assert_eq!(value, json!({"name": "room-user-change", "roomID": "r1", "data": ["a", "b"]}));
}

#[test]
fn outbound_bytes_become_base64() {
    let msg = OutboundMessage::bytes(CLIENT_BROADCAST, &[0, 16, 32]);
    assert_eq!(msg.data, json!("ABAg"));
    assert_eq!(msg.delivery, Delivery::Reliable);
}

#[test]
fn outbound_error_carries_code_and_message() {
    let err = PayloadError::NotInRoom("r7".into());
    let msg = OutboundMessage::error_from(&err);
    assert_eq!(msg.name, ERROR);
    assert_eq!(msg.data["code"], json!("E_NOT_IN_ROOM"));
    assert_eq!(msg.data["message"], json!("session is not joined to room r7"));
}

#[test]
fn error_codes_are_distinct() {
    let codes = [
        PayloadError::MissingRoom { name: "x".into() }.error_code(),
        PayloadError::MissingElements { name: "x".into() }.error_code(),
        PayloadError::NotInRoom("r".into()).error_code(),
    ];
    assert_eq!(codes, ["E_MISSING_ROOM", "E_MISSING_ELEMENTS", "E_NOT_IN_ROOM"]);
}
