use super::*;
use std::io::Cursor;

#[tokio::test]
async fn reads_multiple_lines_across_chunk_boundaries() {
    let input = b"{\"a\":1}\n{\"b\":2}\n".to_vec();
    let mut reader = FrameReader::new(Cursor::new(input));
    assert_eq!(reader.next_frame().await.unwrap().as_deref(), Some("{\"a\":1}"));
    assert_eq!(reader.next_frame().await.unwrap().as_deref(), Some("{\"b\":2}"));
    assert_eq!(reader.next_frame().await.unwrap(), None);
}

#[tokio::test]
async fn accepts_frame_of_exactly_max_bytes() {
    let payload = "a".repeat(MAX_FRAME_BYTES);
    let mut input = payload.clone().into_bytes();
    input.push(b'\n');
    let mut reader = FrameReader::new(Cursor::new(input));
    let line = reader.next_frame().await.unwrap().unwrap();
    assert_eq!(line.len(), MAX_FRAME_BYTES);
}

#[tokio::test]
async fn rejects_frame_exceeding_max_bytes() {
    let payload = "a".repeat(MAX_FRAME_BYTES + 1);
    let mut input = payload.into_bytes();
    input.push(b'\n');
    let mut reader = FrameReader::new(Cursor::new(input));
    let err = reader.next_frame().await.unwrap_err();
    assert!(matches!(err, FrameError::TooLarge));
}

#[tokio::test]
async fn strips_trailing_carriage_return() {
    let input = b"{\"a\":1}\r\n".to_vec();
    let mut reader = FrameReader::new(Cursor::new(input));
    assert_eq!(reader.next_frame().await.unwrap().as_deref(), Some("{\"a\":1}"));
}
