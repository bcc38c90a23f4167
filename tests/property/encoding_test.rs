// tests/property/encoding_test.rs

//! Property-based tests for the wire format
//! Tests that response headers, frame reassembly and request parsing hold for any input

use profctl::core::protocol::{HEADER_LEN, Response, encode_request_frame};
use profctl::core::{Request, RequestParser};
use profctl::transport::Framer;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 200,
        max_shrink_iters: 1000,
        ..ProptestConfig::default()
    })]

    #[test]
    fn test_response_header_counts_payload_and_prefix(
        payload in "[ -~]{0,512}",
        success in any::<bool>()
    ) {
        let response = if success {
            Response::success(payload.clone())
        } else {
            Response::failure(payload.clone())
        };
        let encoded = response.encode_to_string().unwrap();

        let header: usize = encoded[..HEADER_LEN].parse().unwrap();
        prop_assert_eq!(header, payload.len() + 5);
        prop_assert_eq!(encoded.len(), HEADER_LEN + header);
        prop_assert_eq!(Response::parse(encoded[HEADER_LEN..].as_bytes()).unwrap(), response);
    }

    #[test]
    fn test_frame_split_anywhere_reassembles(
        payload in prop::collection::vec(any::<u8>(), 0..256),
        split in any::<prop::sample::Index>()
    ) {
        let frame = encode_request_frame(&payload).unwrap();
        let at = split.index(frame.len() + 1);

        let mut framer = Framer::new();
        framer.extend(&frame[..at]);
        if at < frame.len() {
            prop_assert!(framer.next_frame().unwrap().is_none());
        }
        framer.extend(&frame[at..]);
        let decoded = framer.next_frame().unwrap().unwrap();
        prop_assert_eq!(&decoded[..], &payload[..]);
        prop_assert_eq!(framer.buffered(), 0);
    }

    #[test]
    fn test_back_to_back_frames_decode_in_order(
        payloads in prop::collection::vec("[a-zA-Z]{1,32}", 1..16)
    ) {
        let mut framer = Framer::new();
        for payload in &payloads {
            framer.extend(&encode_request_frame(payload.as_bytes()).unwrap());
        }
        for payload in &payloads {
            let decoded = framer.next_frame().unwrap().unwrap();
            prop_assert_eq!(&decoded[..], payload.as_bytes());
        }
        prop_assert!(framer.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_parsed_request_renders_back_to_its_line(
        command in "[a-zA-Z][a-zA-Z0-9]{0,15}",
        options in prop::collection::vec(("[a-zA-Z][a-zA-Z0-9]{0,15}", "[a-zA-Z0-9/*._-]{1,24}"), 0..8)
    ) {
        let mut expected = Request::new(command.clone());
        let mut line = command;
        for (key, value) in &options {
            expected = expected.with_arg(key.clone(), value);
            line.push_str(&format!(" --{key} {value}"));
        }

        let request = RequestParser::new().parse(line.as_bytes());
        prop_assert!(!request.is_complete());
        prop_assert_eq!(request.to_string(), line);
        prop_assert_eq!(request, expected);
    }

    #[test]
    fn test_arbitrary_bytes_never_panic(data in prop::collection::vec(any::<u8>(), 0..128)) {
        let _ = RequestParser::new().parse(&data);

        let mut framer = Framer::new();
        framer.extend(&data);
        // Decode until the buffer is exhausted or a framing error is reported.
        while let Ok(Some(_)) = framer.next_frame() {}
    }
}
