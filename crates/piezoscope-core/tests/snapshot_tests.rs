//! Snapshot tests for piezoscope-core error messages and stats serialization

use piezoscope_core::payload::parse_object;
use piezoscope_core::{DispatchStats, IngestError, RouterError};

#[test]
fn test_not_an_object_snapshot() {
    let err = IngestError::NotAnObject { kind: "array" };
    insta::assert_snapshot!(err.to_string(), @"Payload must be a JSON object, got array");
}

#[test]
fn test_invalid_utf8_snapshot() -> Result<(), Box<dyn std::error::Error>> {
    let err = parse_object(&[b'{', 0xff, b'}'])
        .err()
        .ok_or("invalid UTF-8 must be rejected")?;
    insta::assert_snapshot!(
        err.to_string(),
        @"Payload is not valid UTF-8: invalid utf-8 sequence of 1 bytes from index 1"
    );
    Ok(())
}

#[test]
fn test_router_error_snapshots() {
    insta::assert_snapshot!(
        RouterError::DuplicateTopic("iot/piezo".to_string()).to_string(),
        @"Topic is routed more than once: iot/piezo"
    );
    insta::assert_snapshot!(RouterError::EmptyTopic.to_string(), @"Topic name must not be empty");
    insta::assert_snapshot!(
        RouterError::NoSensors { topic: "iot/piezo".to_string() }.to_string(),
        @"Windowed topic iot/piezo has no sensor bindings"
    );
    insta::assert_snapshot!(
        RouterError::DuplicateSensorKey {
            topic: "iot/piezo".to_string(),
            key: "Sensor1".to_string(),
        }
        .to_string(),
        @"Sensor key Sensor1 is bound twice on topic iot/piezo"
    );
}

#[test]
fn test_dispatch_stats_json_snapshot() -> Result<(), serde_json::Error> {
    let stats = DispatchStats {
        messages: 12,
        ignored: 1,
        malformed: 2,
        windowed_batches: 7,
        scalar_updates: 2,
        points: 40,
        local_points: 3,
        dropped_samples: 1,
    };
    insta::assert_snapshot!(
        serde_json::to_string(&stats)?,
        @r#"{"messages":12,"ignored":1,"malformed":2,"windowed_batches":7,"scalar_updates":2,"points":40,"local_points":3,"dropped_samples":1}"#
    );
    Ok(())
}
