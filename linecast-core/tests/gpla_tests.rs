//! Integration tests for the GPLA container
//!
//! Structural checks against whole recordings: tag integrity at every tag
//! position, frame-count bookkeeping and the file-level entry points.

mod mocks;

use linecast_core::codec::gpla::{self, Version, TAG_END, TAG_FRAME};
use linecast_core::error::LinecastError;
use linecast_core::types::{Frame, SceneRecording};
use mocks::sample_frame;

const ALL_TAGS: [&[u8; 8]; 15] = [
    b"GPLA    ", b"FILE    ", b"fCount  ", b"fRate   ", b"FRAME   ", b"focalLen", b"OBJECTS ",
    b"OBJECT  ", b"MATRIX  ", b"STROKES ", b"STROKE  ", b"vertexCt", b"VERTICES", b"DONE    ",
    b"END GPLA",
];

fn three_frame_recording() -> SceneRecording {
    SceneRecording::new(30, vec![sample_frame(1.0), sample_frame(2.0), Frame::new(-2.5, vec![])])
}

/// Offsets of every tag field in an encoded recording
fn tag_offsets(bytes: &[u8]) -> Vec<usize> {
    (0..bytes.len())
        .step_by(8)
        .filter(|&p| p + 8 <= bytes.len() && ALL_TAGS.iter().any(|t| &bytes[p..p + 8] == *t))
        .collect()
}

#[test]
fn test_recording_roundtrip_preserves_geometry() {
    let recording = three_frame_recording();
    let bytes = gpla::encode_recording(&recording).unwrap();

    let decoded = gpla::decode_recording(&bytes).unwrap();
    assert_eq!(decoded, recording);
    assert_eq!(decoded.frame_count(), 3);
    assert_eq!(decoded.frame_rate, 30);
}

#[test]
fn test_every_corrupted_tag_is_reported_at_its_offset() {
    let bytes = gpla::encode_recording(&three_frame_recording()).unwrap();
    let offsets = tag_offsets(&bytes);
    assert!(offsets.len() > 40, "expected many tags, found {}", offsets.len());

    for &p in &offsets {
        let mut damaged = bytes.clone();
        damaged[p] = b'#';
        match gpla::decode_recording(&damaged) {
            Err(LinecastError::Corrupt { offset, .. }) => {
                assert_eq!(offset, p, "wrong offset for damaged tag {:?}", &bytes[p..p + 8])
            }
            other => panic!("damaged tag at {} decoded as {:?}", p, other.map(|r| r.frame_count())),
        }
    }
}

#[test]
fn test_every_truncation_fails() {
    let bytes = gpla::encode_recording(&three_frame_recording()).unwrap();
    for cut in 0..bytes.len() {
        assert!(
            gpla::decode_recording(&bytes[..cut]).is_err(),
            "truncated to {} bytes decoded",
            cut
        );
    }
}

#[test]
fn test_header_frame_count_matches_frames_written() {
    for n in 1..=4u64 {
        let frames = (0..n).map(|i| sample_frame(i as f64)).collect();
        let bytes = gpla::encode_recording(&SceneRecording::new(24, frames)).unwrap();

        let declared = u64::from_le_bytes(bytes[48..56].try_into().unwrap());
        assert_eq!(declared, n);

        let frame_tags = (0..bytes.len())
            .step_by(8)
            .filter(|&p| bytes[p..p + 8] == TAG_FRAME)
            .count() as u64;
        assert_eq!(frame_tags, n);
    }
}

#[test]
fn test_dropped_frame_is_a_count_mismatch() {
    let one = gpla::encode_recording(&SceneRecording::new(24, vec![sample_frame(1.0)])).unwrap();
    let two = gpla::encode_recording(&SceneRecording::new(24, vec![sample_frame(1.0), sample_frame(1.0)]))
        .unwrap();

    // header of the two-frame file followed by only the first frame
    let header_len = 80;
    let mut spliced = two[..header_len].to_vec();
    spliced.extend_from_slice(&one[header_len..]);

    match gpla::decode_recording(&spliced) {
        Err(LinecastError::FrameCountMismatch { declared, actual }) => {
            assert_eq!(declared, 2);
            assert_eq!(actual, 1);
        }
        other => panic!("expected count mismatch, got {:?}", other.map(|r| r.frame_count())),
    }
}

#[test]
fn test_file_ends_with_end_tag() {
    let bytes = gpla::encode_recording(&three_frame_recording()).unwrap();
    assert_eq!(&bytes[bytes.len() - 8..], &TAG_END);
    assert_eq!(bytes.len() % 8, 0);
}

#[test]
fn test_newer_minor_version_is_accepted() {
    let mut bytes = gpla::encode_recording(&three_frame_recording()).unwrap();
    bytes[16..24].copy_from_slice(&7u64.to_le_bytes());
    let decoded = gpla::decode_recording(&bytes).unwrap();
    assert_eq!(decoded.frame_count(), 3);
}

#[test]
fn test_current_version_is_written() {
    let bytes = gpla::encode_recording(&three_frame_recording()).unwrap();
    let major = u64::from_le_bytes(bytes[8..16].try_into().unwrap());
    assert_eq!(major, Version::CURRENT.major);
}

#[test]
fn test_snapshot_line_rejects_multi_frame_payload() {
    let bytes = gpla::encode_recording(&three_frame_recording()).unwrap();
    let line = format!("{}\n", gpla::to_base64(&bytes));
    assert!(gpla::decode_snapshot_line(line.as_bytes()).is_err());
}

#[test]
fn test_base64_file_with_wrapped_lines() {
    let bytes = gpla::encode_recording(&three_frame_recording()).unwrap();
    let text = gpla::to_base64(&bytes);

    let wrapped: String = text
        .as_bytes()
        .chunks(76)
        .map(|c| format!("{}\r\n", String::from_utf8_lossy(c)))
        .collect();

    let decoded = gpla::decode_file_bytes(wrapped.as_bytes()).unwrap();
    assert_eq!(decoded, three_frame_recording());
}

#[test]
fn test_garbage_file_is_rejected() {
    assert!(gpla::decode_file_bytes(b"not a recording at all!").is_err());
    assert!(gpla::decode_file_bytes(b"").is_err());
}

#[test]
fn test_json_frames_document_is_detected() {
    use linecast_core::codec::json;
    use linecast_core::types::{CapturedObject, Matrix4, Vec3};

    let object = CapturedObject::new(
        "Line01",
        Matrix4::translation(1.0, 2.0, -3.0),
        vec![vec![Vec3::new(0.5, 0.25, -1.0), Vec3::new(2.0, 0.0, 0.0)], vec![]],
    );
    let recording = SceneRecording::new(30, vec![Frame::new(-2.5, vec![object]), Frame::new(-1.75, vec![])]);
    let mut text = b"\n  ".to_vec();
    text.extend(json::encode_frames_document(&recording).unwrap());

    let decoded = gpla::decode_file_bytes(&text).unwrap();
    assert_eq!(decoded, recording);
    assert_eq!(decoded.frame_rate, 30);

    assert!(gpla::decode_file_bytes(br#"{"frames":[]}"#).is_err());
    assert!(gpla::decode_file_bytes(br#"{"objects":[],"focalLength":-1}"#).is_err());
}
