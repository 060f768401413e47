use super::{FfProbeOutput, ProbeError, VideoGeometry};

fn geometry_tests() -> [(&'static str, Option<VideoGeometry>); 6] {
    [
        ("landscape", VideoGeometry::new(1920, 1080)),
        ("portrait", VideoGeometry::new(1080, 1920)),
        ("audio_first", VideoGeometry::new(852, 480)),
        ("audio_only", None),
        ("empty", None),
        ("zero_dimensions", None),
    ]
}

#[test]
fn parse_geometry() {
    for (case, expected) in geometry_tests() {
        let string = std::fs::read_to_string(format!(
            "./src/discover/ffprobe_6_0_{case}_streams.json"
        ))
        .expect("Read file");

        let json: FfProbeOutput = serde_json::from_str(&string).expect("Valid json");

        match (super::parse_geometry(json), expected) {
            (Ok(output), Some(expected)) => assert_eq!(output, expected, "{case}"),
            (Err(ProbeError::NoStreams), None) => {}
            (other, expected) => panic!("{case}: expected {expected:?}, got {other:?}"),
        }
    }
}

#[test]
fn missing_streams_key() {
    let json: FfProbeOutput = serde_json::from_str("{}").expect("Valid json");

    assert!(matches!(
        super::parse_geometry(json),
        Err(ProbeError::NoStreams)
    ));
}

#[test]
fn zero_is_not_a_dimension() {
    assert_eq!(VideoGeometry::new(0, 1080), None);
    assert_eq!(VideoGeometry::new(1920, 0), None);
    assert!(VideoGeometry::new(1, 1).is_some());
}

#[test]
fn no_streams_is_a_client_error() {
    assert!(ProbeError::NoStreams.is_client_error());
    assert_eq!(ProbeError::NoStreams.error_code().as_str(), "probe-no-streams");
}
