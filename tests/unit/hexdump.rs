//! Hex dump tests

use crate::common::{MockDelay, MockTransport};
use still_capture::transfer::hexdump::HexDump;

#[test]
fn test_rows_and_format() {
    let mut transport = MockTransport::new();
    let mut delay = MockDelay::default();
    let mut out = String::new();
    let bytes = [0x80, 0x81, 0x7F, 0x00, 0xFF, 0x0A];

    let rows = HexDump::new(3, 5)
        .unwrap()
        .dump(&mut out, &mut transport, &bytes, &mut delay)
        .unwrap();

    assert_eq!(rows, 2);
    assert_eq!(out, "80,81,7F\n00,FF,0A\n");
    assert_eq!(transport.poll_count(), 2);
    assert_eq!(delay.pauses, vec![5, 5]);
}

#[test]
fn test_short_last_row() {
    let mut transport = MockTransport::new();
    let mut delay = MockDelay::default();
    let mut out = String::new();

    let rows = HexDump::new(4, 0)
        .unwrap()
        .dump(&mut out, &mut transport, &[1, 2, 3, 4, 5], &mut delay)
        .unwrap();

    assert_eq!(rows, 2);
    assert_eq!(out, "01,02,03,04\n05\n");
    assert!(delay.pauses.is_empty());
}

#[test]
fn test_disconnected_peer_does_not_stop_dump() {
    let mut transport = MockTransport::new();
    transport.set_connected(false);
    let mut delay = MockDelay::default();
    let mut out = String::new();

    let rows = HexDump::new(96, 0)
        .unwrap()
        .dump(&mut out, &mut transport, &[0u8; 9216], &mut delay)
        .unwrap();

    assert_eq!(rows, 96);
    assert_eq!(out.lines().count(), 96);
    assert!(out.lines().all(|line| line.split(',').count() == 96));
}

#[test]
fn test_parsed_back_by_host() {
    let mut transport = MockTransport::new();
    let mut delay = MockDelay::default();
    let mut out = String::new();
    let bytes: Vec<u8> = (0..=255).collect();

    HexDump::new(16, 0)
        .unwrap()
        .dump(&mut out, &mut transport, &bytes, &mut delay)
        .unwrap();

    let parsed: Vec<u8> = out
        .lines()
        .flat_map(|line| line.split(','))
        .map(|hex| u8::from_str_radix(hex, 16).unwrap())
        .collect();
    assert_eq!(parsed, bytes);
}
