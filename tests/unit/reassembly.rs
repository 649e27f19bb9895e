//! Host-side reassembly tests

use still_capture::transfer::reassembly::{restore_pixel, Assembly, ImageAssembler};
use still_capture::transfer::TransferProgress;
use still_capture::TARGET_PIXELS;

#[test]
fn test_reassembles_chunked_image() {
    let image: Vec<u8> = (0..TARGET_PIXELS).map(|i| (i * 7 % 256) as u8).collect();
    let mut progress = TransferProgress::new(image.len(), 128).unwrap();
    let mut assembler = ImageAssembler::<TARGET_PIXELS>::new();

    let mut completed = None;
    while let Some(range) = progress.next_chunk() {
        let len = range.len();
        match assembler.push(&image[range]) {
            Assembly::Partial { received } => assert_eq!(received, progress.sent() + len),
            Assembly::Complete(data) => completed = Some(data.to_vec()),
        }
        progress.advance(len);
    }

    assert_eq!(completed.as_deref(), Some(image.as_slice()));
    assert_eq!(assembler.received(), 0);
}

#[test]
fn test_next_image_starts_fresh() {
    let mut assembler = ImageAssembler::<6>::new();
    assembler.push(&[1, 2, 3]);
    assert_eq!(
        assembler.push(&[4, 5, 6]),
        Assembly::Complete(&[1, 2, 3, 4, 5, 6])
    );

    assert_eq!(assembler.push(&[9]), Assembly::Partial { received: 1 });
}

#[test]
fn test_restore_pixel() {
    assert_eq!(restore_pixel(0x80), 0);
    assert_eq!(restore_pixel(0x00), 128);
    assert_eq!(restore_pixel(0x7F), 255);
}
