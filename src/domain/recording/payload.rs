//! Audio payload value object

/// Encoded audio bytes for one take, ready to be written.
///
/// Built from encoder chunks; the chunks are joined in the order given, so
/// byte order matches capture order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioPayload {
    data: Vec<u8>,
}

impl AudioPayload {
    /// Create a payload from raw bytes
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Concatenate chunks in their original order
    pub fn from_chunks(chunks: Vec<Vec<u8>>) -> Self {
        let total = chunks.iter().map(Vec::len).sum();
        let mut data = Vec::with_capacity(total);
        for chunk in chunks {
            data.extend_from_slice(&chunk);
        }
        Self { data }
    }

    /// Get the raw bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consume and return the raw bytes
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Get the size in bytes
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get human-readable size
    pub fn human_readable_size(&self) -> String {
        human_readable_size(self.size_bytes())
    }
}

/// Format a byte count as B, KB or MB
pub fn human_readable_size(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_chunks_keeps_order() {
        let payload = AudioPayload::from_chunks(vec![vec![1, 2], vec![3], vec![], vec![4, 5]]);
        assert_eq!(payload.data(), &[1, 2, 3, 4, 5]);
        assert_eq!(payload.size_bytes(), 5);
    }

    #[test]
    fn from_no_chunks_is_empty() {
        assert!(AudioPayload::from_chunks(Vec::new()).is_empty());
    }

    #[test]
    fn human_readable_size_bytes() {
        assert_eq!(human_readable_size(0), "0 B");
        assert_eq!(human_readable_size(500), "500 B");
    }

    #[test]
    fn human_readable_size_kb() {
        let payload = AudioPayload::new(vec![0u8; 2048]);
        assert_eq!(payload.human_readable_size(), "2.0 KB");
    }

    #[test]
    fn human_readable_size_mb() {
        assert_eq!(human_readable_size(2 * 1024 * 1024), "2.0 MB");
    }
}
