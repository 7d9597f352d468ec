use approx::assert_relative_eq;
use imucal_core::{
    AccelOutcome, CalibrationConfig, CalibrationEvent, CalibrationSession, NullSink, RawSample,
    Sample3, Stream,
};

fn session() -> CalibrationSession<NullSink> {
    CalibrationSession::start(CalibrationConfig::default(), NullSink)
}

#[test]
fn test_plus_x_pose_end_to_end() {
    let mut session = session();
    let events: Vec<CalibrationEvent> = (0..32)
        .filter_map(|_| {
            session
                .handle_raw(Stream::Accel, RawSample::new(9.8, 0.0, 0.0))
                .unwrap()
        })
        .collect();

    assert_eq!(events.len(), 1);
    match &events[0] {
        CalibrationEvent::AccelProgress(AccelOutcome::StableAxis {
            slot: Some(slot),
            magnitude,
            still_needed,
            ..
        }) => {
            assert_eq!(slot.label(), "+x");
            assert_relative_eq!(*magnitude, 9.8, epsilon = 1e-9);
            for label in ["-x", "+y", "-y", "+z", "-z"] {
                assert!(still_needed.contains(&label), "missing {}", label);
            }
            assert_eq!(still_needed.len(), 5);
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

#[test]
fn test_gyro_bias_end_to_end() {
    let mut session = session();
    let events: Vec<CalibrationEvent> = (0..32)
        .filter_map(|_| {
            session
                .handle_raw(Stream::Gyro, RawSample::new(0.01, 0.02, -0.01))
                .unwrap()
        })
        .collect();

    match events.as_slice() {
        [CalibrationEvent::GyroBias(b)] => {
            assert_relative_eq!(b.bias, Sample3::new(0.01, 0.02, -0.01), epsilon = 1e-12);
        }
        other => panic!("expected exactly one bias event, got {:?}", other),
    }
}

#[test]
fn test_interleaved_streams_are_independent() {
    let mut session = session();
    let mut events = Vec::new();
    for i in 0..32 {
        events.extend(session.handle(Stream::Accel, Sample3::new(0.0, 0.0, 9.8)));
        if i % 2 == 0 {
            events.extend(session.handle(Stream::Mag, Sample3::new(0.2, 0.0, -0.4)));
        }
        events.extend(session.handle(Stream::Gyro, Sample3::new(0.0, 0.0, 0.0)));
    }

    let gyro = events
        .iter()
        .filter(|e| matches!(e, CalibrationEvent::GyroBias(_)))
        .count();
    let accel = events
        .iter()
        .filter(|e| matches!(e, CalibrationEvent::AccelProgress(_)))
        .count();
    assert_eq!(gyro, 1);
    assert_eq!(accel, 1);
    assert_eq!(session.mag().len(), 16);
}

#[test]
fn test_malformed_samples_do_not_stop_session() {
    let mut session = session();
    for i in 0..40 {
        let raw = if i % 5 == 0 {
            RawSample {
                x: None,
                ..RawSample::new(0.0, 0.0, 9.8)
            }
        } else {
            RawSample::new(0.0, 0.0, 9.8)
        };
        let _ = session.handle_raw(Stream::Accel, raw);
    }
    let status = session.status();
    assert_eq!(status.dropped, 8);
    assert_eq!(status.accepted, 32);
    assert_eq!(status.still_needed.len(), 5);
}

#[test]
fn test_status_serializes() {
    let mut session = session();
    for _ in 0..32 {
        session.handle(Stream::Accel, Sample3::new(0.0, 0.0, -9.8));
    }
    let json = serde_json::to_value(session.status()).unwrap();
    assert_eq!(json["calibrated"], false);
    assert_eq!(json["accepted"], 32);
    assert!(json["still_needed"]
        .as_array()
        .unwrap()
        .iter()
        .all(|v| v != "-z"));
}
