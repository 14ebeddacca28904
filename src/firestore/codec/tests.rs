use super::*;
use crate::firestore::models::{ArrayValue, FieldType, LatLng, MapValue, Value};
use crate::firestore::types::{GeoPoint, Reference, Timestamp};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
struct TestFields {
    title: String,
    sub_title: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
struct NestedType {
    nested_string: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
struct AllTypesModel {
    some_string_value: String,
    some_bool_value: bool,
    some_int_value: i64,
    some_double_value: f64,
    some_geo_point: GeoPoint,
    some_timestamp: Timestamp,
    some_reference: Reference,
    some_map_value: NestedType,
    some_array: Vec<String>,
    some_optional: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct NullValueTest {
    title: Option<String>,
    number: i32,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct GeoFieldTest {
    somegeo_point: GeoPoint,
}

fn all_types() -> AllTypesModel {
    AllTypesModel {
        some_string_value: "demoString".to_string(),
        some_bool_value: true,
        some_int_value: 42,
        some_double_value: 3.14159265359,
        some_geo_point: GeoPoint::new(15.0, 10.0),
        some_timestamp: Timestamp(Utc.with_ymd_and_hms(2024, 1, 1, 12, 30, 0).unwrap()),
        some_reference: Reference::new("test-project", "test/tester"),
        some_map_value: NestedType {
            nested_string: "nestedStringDemo".to_string(),
        },
        some_array: vec![
            "lemon".to_string(),
            "banana".to_string(),
            "apple".to_string(),
            "grapes".to_string(),
        ],
        some_optional: None,
    }
}

fn wire(value: serde_json::Value) -> Fields {
    serde_json::from_value(value).unwrap()
}

#[test]
fn test_all_types_round_trip() {
    let model = all_types();
    let fields = to_fields(&model).unwrap();
    let decoded: AllTypesModel = from_fields(fields).unwrap();
    assert_eq!(decoded, model);
}

#[test]
fn test_all_types_wire_format() {
    let fields = to_fields(&all_types()).unwrap();
    let json = serde_json::to_value(&fields).unwrap();

    assert_eq!(json["someStringValue"], json!({ "stringValue": "demoString" }));
    assert_eq!(json["someBoolValue"], json!({ "booleanValue": true }));
    assert_eq!(json["someIntValue"], json!({ "integerValue": "42" }));
    assert_eq!(json["someDoubleValue"], json!({ "doubleValue": 3.14159265359 }));
    assert_eq!(
        json["someGeoPoint"],
        json!({ "geoPointValue": { "latitude": 15.0, "longitude": 10.0 } })
    );
    assert_eq!(
        json["someTimestamp"],
        json!({ "timestampValue": "2024-01-01T12:30:00Z" })
    );
    assert_eq!(
        json["someReference"],
        json!({ "referenceValue": "projects/test-project/databases/(default)/documents/test/tester" })
    );
    assert_eq!(
        json["someMapValue"],
        json!({ "mapValue": { "fields": { "nestedString": { "stringValue": "nestedStringDemo" } } } })
    );
    assert_eq!(json["someArray"]["arrayValue"]["values"][3], json!({ "stringValue": "grapes" }));
    assert_eq!(json["someOptional"], json!({ "nullValue": null }));
}

#[test]
fn test_decode_server_document() {
    let fields = wire(json!({
        "someStringValue": { "stringValue": "demoString" },
        "someBoolValue": { "booleanValue": true },
        "someIntValue": { "integerValue": "42" },
        "someDoubleValue": { "doubleValue": 3.14159265359 },
        "someGeoPoint": { "geoPointValue": { "latitude": 15 } },
        "someTimestamp": { "timestampValue": "2024-01-01T12:30:00.123456Z" },
        "someReference": { "referenceValue": "projects/p/databases/(default)/documents/test/tester" },
        "someMapValue": { "mapValue": { "fields": { "nestedString": { "stringValue": "n" } } } },
        "someArray": { "arrayValue": {} },
        "someOptional": { "nullValue": null }
    }));

    let decoded: AllTypesModel = from_fields(fields).unwrap();
    assert_eq!(decoded.some_geo_point, GeoPoint::new(15.0, 0.0));
    assert_eq!(decoded.some_timestamp.as_datetime().timestamp_subsec_micros(), 123456);
    assert_eq!(decoded.some_reference.project_id, "p");
    assert_eq!(decoded.some_reference.document_path, "test/tester");
    assert!(decoded.some_array.is_empty());
    assert_eq!(decoded.some_optional, None);
}

#[test]
fn test_null_round_trip() {
    let model = NullValueTest {
        title: None,
        number: 120,
    };
    let fields = to_fields(&model).unwrap();
    assert_eq!(fields.get("title"), Some(&Value::null()));
    assert_eq!(fields.get("number"), Some(&Value::IntegerValue("120".to_string())));

    let decoded: NullValueTest = from_fields(fields).unwrap();
    assert_eq!(decoded, model);
}

#[test]
fn test_skip_serializing_if_omits_null() {
    #[derive(Serialize, Deserialize)]
    struct OptOut {
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    }

    let fields = to_fields(&OptOut { title: None }).unwrap();
    assert!(fields.is_empty());

    let decoded: OptOut = from_fields(fields).unwrap();
    assert_eq!(decoded.title, None);
}

#[test]
fn test_integer_into_geo_point_fails() {
    let fields = wire(json!({ "somegeo_point": { "integerValue": "7" } }));

    let err = from_fields::<GeoFieldTest>(fields).unwrap_err();
    assert_eq!(err.path(), Some("somegeo_point"));
    assert_eq!(
        err.root_cause(),
        &DecodeError::TypeMismatch {
            expected: "geoPointValue",
            found: FieldType::Integer,
        }
    );
}

#[test]
fn test_declared_type_is_enforced() {
    // A timestamp-looking string is still a stringValue
    let fields = wire(json!({ "title": { "timestampValue": "2024-01-01T00:00:00Z" }, "subTitle": { "stringValue": "x" } }));
    let err = from_fields::<TestFields>(fields).unwrap_err();
    assert!(matches!(
        err.root_cause(),
        DecodeError::TypeMismatch {
            expected: "stringValue",
            found: FieldType::Timestamp,
        }
    ));

    #[derive(Deserialize, Debug)]
    struct Stamp {
        #[allow(dead_code)]
        at: Timestamp,
    }
    let fields = wire(json!({ "at": { "stringValue": "2024-01-01T00:00:00Z" } }));
    assert!(from_fields::<Stamp>(fields).is_err());
}

#[test]
fn test_error_path_points_into_nested_values() {
    #[derive(Deserialize, Debug)]
    struct Outer {
        #[allow(dead_code)]
        items: Vec<NestedType>,
    }

    let fields = wire(json!({
        "items": { "arrayValue": { "values": [
            { "mapValue": { "fields": { "nestedString": { "stringValue": "ok" } } } },
            { "mapValue": { "fields": { "nestedString": { "booleanValue": false } } } }
        ] } }
    }));

    let err = from_fields::<Outer>(fields).unwrap_err();
    assert_eq!(err.path(), Some("items[1].nestedString"));
}

#[test]
fn test_malformed_values_fail() {
    #[derive(Deserialize, Debug)]
    struct Numbers {
        #[allow(dead_code)]
        count: i64,
    }
    let err = from_fields::<Numbers>(wire(json!({ "count": { "integerValue": "twelve" } }))).unwrap_err();
    assert_eq!(err.root_cause(), &DecodeError::InvalidInteger("twelve".to_string()));

    #[derive(Deserialize, Debug)]
    struct Stamp {
        #[allow(dead_code)]
        at: Timestamp,
    }
    let err = from_fields::<Stamp>(wire(json!({ "at": { "timestampValue": "yesterday" } }))).unwrap_err();
    assert_eq!(err.root_cause(), &DecodeError::InvalidTimestamp("yesterday".to_string()));

    #[derive(Deserialize, Debug)]
    struct Link {
        #[allow(dead_code)]
        to: Reference,
    }
    let err = from_fields::<Link>(wire(json!({ "to": { "referenceValue": "users/alice" } }))).unwrap_err();
    assert_eq!(err.root_cause(), &DecodeError::InvalidReference("users/alice".to_string()));
}

#[test]
fn test_missing_required_field_fails() {
    let fields = wire(json!({ "title": { "stringValue": "A title" } }));
    let err = from_fields::<TestFields>(fields).unwrap_err();
    assert!(err.to_string().contains("subTitle"));
}

#[test]
fn test_integer_widens_into_double() {
    #[derive(Deserialize)]
    struct Ratio {
        value: f64,
    }
    let decoded: Ratio = from_fields(wire(json!({ "value": { "integerValue": "3" } }))).unwrap();
    assert_eq!(decoded.value, 3.0);
}

#[test]
fn test_datetime_with_timestamp_module() {
    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Flightplan {
        #[serde(with = "crate::timestamp")]
        last_modified: DateTime<Utc>,
        #[serde(with = "crate::timestamp::option")]
        metadata_modified: Option<DateTime<Utc>>,
    }

    let plan = Flightplan {
        last_modified: Utc.with_ymd_and_hms(2023, 5, 1, 8, 0, 0).unwrap(),
        metadata_modified: None,
    };
    let fields = to_fields(&plan).unwrap();
    assert_eq!(
        fields.get("last_modified"),
        Some(&Value::TimestampValue("2023-05-01T08:00:00Z".to_string()))
    );
    assert!(fields["metadata_modified"].is_null());
    assert_eq!(from_fields::<Flightplan>(fields).unwrap(), plan);
}

#[test]
fn test_bytes_and_enums() {
    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    enum Shape {
        Empty,
        Circle(f64),
        Rect { w: i64, h: i64 },
    }

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Blob {
        #[serde(with = "serde_bytes")]
        data: Vec<u8>,
        shapes: Vec<Shape>,
        tags: HashMap<String, u32>,
    }

    let blob = Blob {
        data: b"hi".to_vec(),
        shapes: vec![Shape::Empty, Shape::Circle(1.5), Shape::Rect { w: 2, h: 3 }],
        tags: HashMap::from([("a".to_string(), 1)]),
    };
    let fields = to_fields(&blob).unwrap();
    assert_eq!(fields.get("data"), Some(&Value::BytesValue("aGk=".to_string())));
    match &fields["shapes"] {
        Value::ArrayValue(ArrayValue { values }) => {
            assert_eq!(values[0], Value::StringValue("Empty".to_string()));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(from_fields::<Blob>(fields).unwrap(), blob);
}

#[test]
fn test_encode_rejects_non_maps_and_overflow() {
    assert_eq!(to_fields(&"just a string"), Err(EncodeError::NotAMap(FieldType::String)));

    #[derive(Serialize)]
    struct Big {
        n: u64,
    }
    assert_eq!(
        to_fields(&Big { n: u64::MAX }),
        Err(EncodeError::IntegerOverflow(u64::MAX.to_string()))
    );

    let mut bad_keys = HashMap::new();
    bad_keys.insert(vec![1u8], 1);
    assert_eq!(to_fields(&bad_keys), Err(EncodeError::InvalidKey(FieldType::Array)));
}

#[test]
fn test_generic_values_decode_with_any() {
    let value = Value::MapValue(MapValue {
        fields: HashMap::from([
            ("n".to_string(), Value::IntegerValue("5".to_string())),
            ("g".to_string(), Value::GeoPointValue(LatLng { latitude: 1.0, longitude: 2.0 })),
        ]),
    });
    let json: serde_json::Value = from_value(value).unwrap();
    assert_eq!(json, json!({ "n": 5, "g": { "latitude": 1.0, "longitude": 2.0 } }));
}

#[test]
fn test_field_mask_selects_whole_values() {
    let model = all_types();
    let fields = to_fields(&model).unwrap();

    let mask = FieldMask::new(["someMapValue", "someStringValue", "someStringValue", ""]);
    assert_eq!(mask.paths(), ["someMapValue", "someStringValue"]);

    let masked = mask.apply(&fields);
    assert_eq!(masked.len(), 2);
    assert_eq!(masked["someMapValue"], fields["someMapValue"]);
    assert_eq!(masked["someStringValue"], fields["someStringValue"]);
}

#[test]
fn test_field_mask_nested_path() {
    let fields = wire(json!({
        "address": { "mapValue": { "fields": {
            "city": { "stringValue": "Oslo" },
            "zip": { "stringValue": "0150" }
        } } },
        "name": { "stringValue": "n" }
    }));

    let masked = FieldMask::new(["address.city", "missing"]).apply(&fields);
    assert_eq!(
        serde_json::to_value(&masked).unwrap(),
        json!({ "address": { "mapValue": { "fields": { "city": { "stringValue": "Oslo" } } } } })
    );
}

#[test]
fn test_field_mask_quotes_non_identifier_segments() {
    let mask = FieldMask::new(["title", "sub-title", "address.1st", "a`b", "_private.zip9"]);
    assert_eq!(
        mask.field_paths(),
        vec!["title", "`sub-title`", "address.`1st`", "`a\\`b`", "_private.zip9"]
    );
}

#[test]
fn test_non_finite_doubles_round_trip() {
    #[derive(Serialize, Deserialize, Debug)]
    struct Reading {
        nan: f64,
        high: f64,
        low: f64,
        plain: f64,
    }

    let fields = to_fields(&Reading {
        nan: f64::NAN,
        high: f64::INFINITY,
        low: f64::NEG_INFINITY,
        plain: 1.5,
    })
    .unwrap();
    let body = serde_json::to_value(&fields).unwrap();
    assert_eq!(
        body,
        json!({
            "nan": { "doubleValue": "NaN" },
            "high": { "doubleValue": "Infinity" },
            "low": { "doubleValue": "-Infinity" },
            "plain": { "doubleValue": 1.5 }
        })
    );

    let reading: Reading = from_fields(wire(body)).unwrap();
    assert!(reading.nan.is_nan());
    assert_eq!(reading.high, f64::INFINITY);
    assert_eq!(reading.low, f64::NEG_INFINITY);
    assert_eq!(reading.plain, 1.5);

    let err = serde_json::from_value::<Value>(json!({ "doubleValue": "lots" })).unwrap_err();
    assert!(err.to_string().contains("invalid double value"));
}
