use tracing::warn;

pub const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];
pub const JPEG_EOI: [u8; 2] = [0xFF, 0xD9];

/// Incremental SOI/EOI scanner over an arbitrarily chunked byte stream.
///
/// Bytes that cannot belong to a frame are dropped as soon as they are seen, so
/// after each `feed` the buffer holds at most one partial frame (or, with no
/// start marker in sight, the trailing two bytes of a possibly split SOI).
pub struct FrameExtractor {
    buffer: Vec<u8>,
    max_frame_bytes: Option<usize>,
}

impl FrameExtractor {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::with_max_frame_bytes(None)
    }

    /// Caps the bytes held for one pending frame. Anything larger is discarded
    /// and scanning resumes at the next SOI.
    pub fn with_max_frame_bytes(max_frame_bytes: Option<usize>) -> Self {
        Self {
            buffer: Vec::new(),
            max_frame_bytes: max_frame_bytes.map(|cap| cap.max(JPEG_SOI.len() + JPEG_EOI.len())),
        }
    }

    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        loop {
            let Some(start) = find_marker(&self.buffer, &JPEG_SOI) else {
                self.keep_marker_tail();
                break;
            };

            if start > 0 {
                self.buffer.drain(0..start);
            }

            let Some(end) = find_marker(&self.buffer[JPEG_SOI.len()..], &JPEG_EOI)
                .map(|rel| rel + JPEG_SOI.len())
            else {
                if self.exceeds_cap(self.buffer.len()) {
                    warn!(
                        "dropping {} pending bytes without an end marker",
                        self.buffer.len()
                    );
                    // Only the SOI goes; a later SOI in the buffer may still start a frame.
                    self.buffer.drain(0..JPEG_SOI.len());
                    continue;
                }
                break;
            };

            let frame_len = end + JPEG_EOI.len();
            if self.exceeds_cap(frame_len) {
                warn!("dropping oversized frame of {frame_len} bytes");
                self.buffer.drain(0..JPEG_SOI.len());
                continue;
            }

            frames.push(self.buffer[..frame_len].to_vec());
            self.buffer.drain(0..frame_len);
        }

        frames
    }

    #[cfg(test)]
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    fn keep_marker_tail(&mut self) {
        if self.buffer.len() > JPEG_SOI.len() {
            let excess = self.buffer.len() - JPEG_SOI.len();
            self.buffer.drain(0..excess);
        }
    }

    fn exceeds_cap(&self, len: usize) -> bool {
        self.max_frame_bytes.is_some_and(|cap| len > cap)
    }
}

fn find_marker(buffer: &[u8], marker: &[u8; 2]) -> Option<usize> {
    buffer.windows(2).position(|w| w == marker)
}
