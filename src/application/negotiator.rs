//! Audio format negotiation

use tracing::{info, warn};

use crate::domain::error::SessionError;
use crate::domain::format::AudioFormat;

/// Selects the most preferred encoding the capture device supports
#[derive(Debug, Clone)]
pub struct FormatNegotiator {
    candidates: Vec<AudioFormat>,
    supported: Vec<AudioFormat>,
    selected: Option<AudioFormat>,
}

impl FormatNegotiator {
    /// Negotiator over the built-in candidate list
    pub fn new() -> Self {
        Self::with_candidates(AudioFormat::CANDIDATES.to_vec())
    }

    pub fn with_candidates(candidates: Vec<AudioFormat>) -> Self {
        Self {
            candidates,
            supported: Vec::new(),
            selected: None,
        }
    }

    /// Filter candidates through `is_supported`, order by priority and
    /// select the first.
    pub fn negotiate<F>(&mut self, is_supported: F) -> Result<&AudioFormat, SessionError>
    where
        F: Fn(&str) -> bool,
    {
        let mut supported: Vec<AudioFormat> = self
            .candidates
            .iter()
            .filter(|format| is_supported(format.mime_type))
            .cloned()
            .collect();
        supported.sort_by_key(|format| format.priority);

        self.selected = supported.first().cloned();
        self.supported = supported;

        match &self.selected {
            Some(selected) => {
                info!(
                    supported = ?self.supported.iter().map(|f| f.display_name).collect::<Vec<_>>(),
                    selected = selected.display_name,
                    "Audio formats detected"
                );
                Ok(selected)
            }
            None => {
                warn!("No supported audio format");
                Err(SessionError::NoSupportedFormat)
            }
        }
    }

    /// Formats that passed the last negotiation, most preferred first
    pub fn supported(&self) -> &[AudioFormat] {
        &self.supported
    }

    /// The format chosen by the last negotiation
    pub fn selected(&self) -> Option<&AudioFormat> {
        self.selected.as_ref()
    }
}

impl Default for FormatNegotiator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::format::Container;

    fn candidate(mime_type: &'static str, priority: u32) -> AudioFormat {
        AudioFormat {
            mime_type,
            display_name: mime_type,
            priority,
            container: Container::Ogg,
        }
    }

    fn four_candidates() -> Vec<AudioFormat> {
        // Deliberately out of order
        vec![
            candidate("audio/four", 4),
            candidate("audio/one", 1),
            candidate("audio/three", 3),
            candidate("audio/two", 2),
        ]
    }

    #[test]
    fn selects_lowest_supported_priority() {
        let mut negotiator = FormatNegotiator::with_candidates(four_candidates());
        let selected = negotiator
            .negotiate(|mime| mime == "audio/two" || mime == "audio/four")
            .unwrap();
        assert_eq!(selected.priority, 2);

        let priorities: Vec<u32> = negotiator.supported().iter().map(|f| f.priority).collect();
        assert_eq!(priorities, vec![2, 4]);
    }

    #[test]
    fn nothing_supported_fails_and_selects_nothing() {
        let mut negotiator = FormatNegotiator::with_candidates(four_candidates());
        let err = negotiator.negotiate(|_| false).unwrap_err();
        assert_eq!(err, SessionError::NoSupportedFormat);
        assert!(negotiator.selected().is_none());
        assert!(negotiator.supported().is_empty());
    }

    #[test]
    fn renegotiation_is_idempotent() {
        let mut negotiator = FormatNegotiator::with_candidates(four_candidates());
        let first = negotiator.negotiate(|mime| mime != "audio/one").unwrap().clone();
        let second = negotiator.negotiate(|mime| mime != "audio/one").unwrap().clone();
        assert_eq!(first, second);
        assert_eq!(first.priority, 2);
    }

    #[test]
    fn failed_renegotiation_clears_previous_selection() {
        let mut negotiator = FormatNegotiator::with_candidates(four_candidates());
        negotiator.negotiate(|_| true).unwrap();
        assert!(negotiator.negotiate(|_| false).is_err());
        assert!(negotiator.selected().is_none());
    }

    #[test]
    fn builtin_candidates_prefer_flac_over_wav() {
        let mut negotiator = FormatNegotiator::new();
        let selected = negotiator
            .negotiate(|mime| mime == "audio/flac" || mime == "audio/wav")
            .unwrap();
        assert_eq!(selected.display_name, "FLAC");
        assert_eq!(selected.mime_type, "audio/flac");
    }
}
