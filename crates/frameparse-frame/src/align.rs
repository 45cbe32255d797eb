use bytes::Bytes;

/// Locates the first frame boundary in an unaligned stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamAligner {
    marker: Option<Bytes>,
}

impl StreamAligner {
    /// Align on `marker`. An empty marker behaves like [`StreamAligner::none`].
    pub fn new(marker: impl Into<Bytes>) -> Self {
        let marker = marker.into();
        Self {
            marker: (!marker.is_empty()).then_some(marker),
        }
    }

    /// Aligner for protocols that need no synchronization.
    pub fn none() -> Self {
        Self { marker: None }
    }

    /// The configured sync marker, if any.
    pub fn marker(&self) -> Option<&[u8]> {
        self.marker.as_deref()
    }

    /// True when a sync marker is configured.
    pub fn uses_sync(&self) -> bool {
        self.marker.is_some()
    }

    /// Position of the first sync marker in `buffer`.
    ///
    /// Without a marker every buffer is aligned at offset zero.
    pub fn align(&self, buffer: &[u8]) -> Option<usize> {
        let Some(marker) = self.marker.as_deref() else {
            return Some(0);
        };
        if buffer.len() < marker.len() {
            return None;
        }
        if marker.len() == 1 {
            return buffer.iter().position(|&b| b == marker[0]);
        }
        buffer
            .windows(marker.len())
            .position(|window| window == marker)
    }

    /// Length of the longest suffix of `buffer` that could be the start of a
    /// marker split across two buffers.
    pub fn partial_marker_len(&self, buffer: &[u8]) -> usize {
        let Some(marker) = self.marker.as_deref() else {
            return 0;
        };
        let longest = marker.len().saturating_sub(1).min(buffer.len());
        (1..=longest)
            .rev()
            .find(|&len| buffer[buffer.len() - len..] == marker[..len])
            .unwrap_or(0)
    }
}
