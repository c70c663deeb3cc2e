use neutralchat::api::StreamParser;
use neutralchat::types::StreamFrame;

#[test]
fn test_fragmented_frame_across_chunks() {
    let mut parser = StreamParser::new();

    let first = parser.feed(b"data: {\"type\":\"answer\",\"con");
    assert_eq!(first.len(), 0);

    let second = parser.feed(b"tent\":\"Hi\"}\n");
    assert_eq!(
        second,
        vec![StreamFrame::Answer {
            content: "Hi".to_string()
        }]
    );
}

#[test]
fn test_single_chunk_with_full_turn() {
    let mut parser = StreamParser::new();
    let frames = parser.feed(
        b"data: {\"type\":\"status\",\"message\":\"Searching knowledge base\"}\n\
          \n\
          data: {\"type\":\"answer\",\"content\":\"Hi\"}\n\
          data: {\"type\":\"answer\",\"content\":\"Hi there\"}\n\
          data: {\"type\":\"complete\",\"thread_id\":\"t1\"}\n",
    );

    assert_eq!(frames.len(), 4);
    assert_eq!(
        frames[3],
        StreamFrame::Complete {
            thread_id: Some("t1".to_string())
        }
    );
}

#[test]
fn test_parse_error_does_not_poison_the_parser() {
    let mut parser = StreamParser::new();

    let frames = parser.feed(b"data: {invalid json}\n");
    assert_eq!(frames.len(), 0);

    let frames = parser.feed(b"data: {\"type\":\"answer\",\"content\":\"ok\"}\n");
    assert_eq!(
        frames,
        vec![StreamFrame::Answer {
            content: "ok".to_string()
        }]
    );
}

#[test]
fn test_every_split_point_yields_identical_frames() {
    let body = "data: {\"type\":\"status\",\"message\":\"thinking\"}\n\
                data: {\"type\":\"answer\",\"content\":\"naïve résumé\"}\n\
                \n\
                data: {\"type\":\"complete\",\"thread_id\":\"t-42\"}\n"
        .as_bytes();

    let mut reference = StreamParser::new();
    let expected = reference.feed(body);
    assert_eq!(expected.len(), 3);

    for cut in 0..=body.len() {
        let mut parser = StreamParser::new();
        let mut frames = parser.feed(&body[..cut]);
        frames.extend(parser.feed(&body[cut..]));
        assert_eq!(frames, expected, "split at byte {cut} diverged");
    }
}

#[test]
fn test_unknown_kind_is_reported_as_unknown_frame() {
    let mut parser = StreamParser::new();
    let frames = parser.feed(b"data: {\"type\":\"typing_indicator\"}\n");
    assert_eq!(frames, vec![StreamFrame::Unknown]);
}

#[test]
fn test_non_data_lines_are_not_frames() {
    let mut parser = StreamParser::new();
    let frames = parser.feed(
        b"event: message\n\
          retry: 1000\n\
          data: {\"type\":\"answer\",\"content\":\"only me\"}\n",
    );
    assert_eq!(frames.len(), 1);
}
