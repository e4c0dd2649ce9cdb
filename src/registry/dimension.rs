use std::fmt;

use serde::{Deserialize, Serialize};

/// A billable unit of usage.
///
/// Declaration order is the canonical order used for cost lines and rate maps.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    InputTokensUncached,
    InputTokensCached,
    OutputTokens,
    ReasoningTokens,
    EmbeddingTokens,
    ToolCalls,
    ImageCount,
    ImageMegapixels,
    AudioInputSeconds,
    AudioOutputSeconds,
    Requests,
}

impl Dimension {
    pub const ALL: [Dimension; 11] = [
        Dimension::InputTokensUncached,
        Dimension::InputTokensCached,
        Dimension::OutputTokens,
        Dimension::ReasoningTokens,
        Dimension::EmbeddingTokens,
        Dimension::ToolCalls,
        Dimension::ImageCount,
        Dimension::ImageMegapixels,
        Dimension::AudioInputSeconds,
        Dimension::AudioOutputSeconds,
        Dimension::Requests,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::InputTokensUncached => "input_tokens_uncached",
            Dimension::InputTokensCached => "input_tokens_cached",
            Dimension::OutputTokens => "output_tokens",
            Dimension::ReasoningTokens => "reasoning_tokens",
            Dimension::EmbeddingTokens => "embedding_tokens",
            Dimension::ToolCalls => "tool_calls",
            Dimension::ImageCount => "image_count",
            Dimension::ImageMegapixels => "image_megapixels",
            Dimension::AudioInputSeconds => "audio_input_seconds",
            Dimension::AudioOutputSeconds => "audio_output_seconds",
            Dimension::Requests => "requests",
        }
    }

    /// Exact-match lookup; usage keys are not normalized.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.as_str() == name)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_every_name() {
        for dim in Dimension::ALL {
            assert_eq!(Dimension::parse(dim.as_str()), Some(dim));
        }
    }

    #[test]
    fn parse_is_exact() {
        assert_eq!(Dimension::parse("Output_Tokens"), None);
        assert_eq!(Dimension::parse("context_tokens"), None);
        assert_eq!(Dimension::parse(""), None);
    }

    #[test]
    fn serde_name_matches_as_str() {
        let json = serde_json::to_string(&Dimension::AudioOutputSeconds).unwrap();
        assert_eq!(json, "\"audio_output_seconds\"");
    }

    #[test]
    fn canonical_order_follows_declaration() {
        let mut shuffled = vec![
            Dimension::Requests,
            Dimension::OutputTokens,
            Dimension::InputTokensUncached,
        ];
        shuffled.sort();
        assert_eq!(
            shuffled,
            vec![
                Dimension::InputTokensUncached,
                Dimension::OutputTokens,
                Dimension::Requests
            ]
        );
    }
}
