//! Routines emitted by typeweave for the fixture host model, driven end to end

use serde_json::{Value, json};
use std::collections::HashMap;
use typeweave_fixtures::generated::json::*;
use typeweave_fixtures::generated::validate::*;
use typeweave_fixtures::model::{Color, Gauge, Inventory, Level, Panel, Person, Ticket};
use typeweave_runtime::ReadError;
use typeweave_runtime::json::{JsonReader, JsonWriter};

fn read<T>(value: Value, read: fn(&mut JsonReader) -> Result<T, ReadError>) -> Result<T, ReadError> {
    let mut reader = JsonReader::from_value(value);
    read(&mut reader)
}

fn write<T>(
    value: &T,
    write: fn(&mut JsonWriter, &T) -> Result<(), typeweave_runtime::WriteError>,
) -> Value {
    let mut writer = JsonWriter::new();
    write(&mut writer, value).unwrap();
    writer.into_value().unwrap()
}

#[test]
fn test_person_reads_aliases_and_skips_unknown() {
    let person = read(
        json!({
            "name": "Ada",
            "age": 36,
            "labels": ["math", "engines"],
            "favorite": "crimson",
            "level": 30,
            "score": 0.9,
            "unknown": { "nested": [1, 2, 3] }
        }),
        read_person,
    )
    .unwrap();
    assert_eq!(person.name, "Ada");
    assert_eq!(person.age, 36);
    assert_eq!(person.tags, vec!["math", "engines"]);
    assert_eq!(person.favorite, Some(Color::Red));
    assert_eq!(person.level, Level::High);
    assert_eq!(person.score(), 0.9);
    assert_eq!(person.email, None);
}

#[test]
fn test_only_throw_property_raises_when_missing() {
    // every other property falls back to the constructor's value
    let person = read(json!({ "name": "Grace" }), read_person).unwrap();
    assert_eq!(person, Person::new("Grace".to_string()));

    let err = read(json!({ "age": 3 }), read_person).unwrap_err();
    assert!(matches!(err, ReadError::MissingProperty { ref message, .. } if message == "a person needs a name"));

    let ticket = read(json!({ "id": 7 }), read_ticket).unwrap();
    assert_eq!(ticket.title, "untitled");
    assert_eq!(ticket.note, None);
    let err = read(json!({ "title": "t", "note": null }), read_ticket).unwrap_err();
    assert!(err.to_string().contains("missing required property 'id'"));
}

#[test]
fn test_person_written_with_serialized_names() {
    let mut person = Person::new("Ada".to_string());
    person.favorite = Some(Color::Green);
    person.level = Level::Mid;
    person.set_score(0.25);
    let value = write(&person, write_person);
    assert_eq!(
        value,
        json!({
            "name": "Ada",
            "age": 0,
            "email": null,
            "tags": [],
            "favorite": "green",
            "level": 2,
            "score": 0.25
        })
    );
    assert_eq!(read(value, read_person).unwrap(), person);
}

#[test]
fn test_enum_failures() {
    let err = read(json!({ "name": "x", "favorite": "purple" }), read_person).unwrap_err();
    assert!(matches!(err, ReadError::UnknownEnumValue { enum_name: "Color", .. }));
    let err = read(json!({ "name": "x", "level": 9 }), read_person).unwrap_err();
    assert!(matches!(err, ReadError::UnknownEnumValue { enum_name: "Level", ref value, .. } if value == "9"));
}

#[test]
fn test_maps_by_key_kind() {
    let mut inventory = Inventory::new();
    inventory.counts.insert("bolts".to_string(), 12);
    inventory.labels.insert(3, "three".to_string());
    inventory.labels.insert(1, "one".to_string());

    let value = write(&inventory, write_inventory);
    assert_eq!(value["counts"], json!({ "bolts": 12 }));
    assert_eq!(
        value["labels"],
        json!([{ "key": 1, "value": "one" }, { "key": 3, "value": "three" }])
    );
    assert_eq!(read(value, read_inventory).unwrap(), inventory);

    let err = read(json!({ "labels": [{ "key": 1 }] }), read_inventory).unwrap_err();
    assert!(err.to_string().contains("map entry requires both 'key' and 'value'"));
}

#[test]
fn test_half_open_range_is_clamped_inside() {
    let mut panel = read(
        json!({
            "gauges": [{ "value": -5 }, { "value": 0 }, { "value": 99 }, { "value": 100 }, { "value": 1000 }],
            "primary": { "value": 250 }
        }),
        read_panel,
    )
    .unwrap();
    check_panel(&mut panel, "").unwrap();
    let values: Vec<i32> = panel.gauges.iter().map(|g| g.value).collect();
    assert_eq!(values, vec![0, 0, 99, 99, 99]);
    assert_eq!(panel.primary, Some(Gauge { value: 99 }));

    let value = write(&panel, write_panel);
    assert_eq!(value["gauges"][4], json!({ "value": 99 }));
    assert_eq!(read(value, read_panel).unwrap(), panel);
}

#[test]
fn test_error_mode_reports_property_path() {
    let mut person = Person::new("Ada".to_string());
    person.age = 200;
    person.set_score(1.5);
    let err = check_person(&mut person, "owner").unwrap_err();
    assert_eq!(err.path, "owner.score");
    assert_eq!(err.message, "must be within [0, 1]");
    // TRY_FIX ran before the failing property
    assert_eq!(person.age, 150);

    person.set_score(1.0);
    check_person(&mut person, "").unwrap();
}

#[test]
fn test_empty_panel_checks_clean() {
    let mut panel = Panel::new();
    check_panel(&mut panel, "").unwrap();
    assert_eq!(panel, Panel::new());
    let mut ticket = Ticket::new();
    ticket.id = 1;
    assert_eq!(read(write(&ticket, write_ticket), read_ticket).unwrap(), ticket);
}

#[test]
fn test_properties_written_in_declaration_order() {
    let value = write(&Person::new("Ada".to_string()), write_person);
    let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(keys, ["name", "age", "email", "tags", "favorite", "level", "score"]);
}

#[test]
fn test_map_values_clamped_to_floor() {
    let mut inventory = read(json!({ "counts": { "bolts": -4, "nuts": 9 } }), read_inventory).unwrap();
    check_inventory(&mut inventory, "").unwrap();
    let expected: HashMap<String, i32> =
        [("bolts".to_string(), 0), ("nuts".to_string(), 9)].into_iter().collect();
    assert_eq!(inventory.counts, expected);
}
