//! Token accounting for persisted messages.

use maoflow_types::llm::Usage;
use maoflow_types::stream::ChannelKind;

/// Deterministic estimate: one token per four Unicode scalars, rounded up.
pub fn estimate_tokens(text: &str) -> u32 {
    u32::try_from(text.chars().count().div_ceil(4)).unwrap_or(u32::MAX)
}

/// Tokens charged to an assistant message.
///
/// Provider-reported `completion_tokens` wins. Without it, the estimate is
/// taken over all blocks concatenated in priority order.
pub fn assistant_tokens(usage: Option<Usage>, blocks: &[(ChannelKind, String)]) -> u32 {
    if let Some(usage) = usage {
        return usage.completion_tokens;
    }
    let joined: String = blocks.iter().map(|(_, text)| text.as_str()).collect();
    estimate_tokens(&joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("a"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("Hello"), 2);
    }

    #[test]
    fn test_estimate_counts_scalars_not_bytes() {
        // 4 CJK characters, 12 bytes.
        assert_eq!(estimate_tokens("你好世界"), 1);
    }

    #[test]
    fn test_reported_usage_wins() {
        let blocks = vec![(ChannelKind::Message, "Hi there".to_string())];
        let usage = Usage {
            prompt_tokens: 10,
            completion_tokens: 42,
        };
        assert_eq!(assistant_tokens(Some(usage), &blocks), 42);
        assert_eq!(assistant_tokens(None, &blocks), 2);
        assert_eq!(assistant_tokens(None, &[]), 0);
    }

    #[test]
    fn test_estimate_spans_all_blocks() {
        let blocks = vec![
            (ChannelKind::Think, "abc".to_string()),
            (ChannelKind::Message, "defgh".to_string()),
        ];
        assert_eq!(assistant_tokens(None, &blocks), 2);
    }
}
