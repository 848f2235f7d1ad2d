//! Response normalization: plain text from heterogeneous outputs, and bounded
//! insight lists parsed from free-form model text.

use serde_json::Value;

use crate::responders::RawOutput;

/// Lines at or below this many characters are not kept as insights
pub const MIN_INSIGHT_CHARS: usize = 20;
/// At most this many insights are returned
pub const MAX_INSIGHTS: usize = 4;

const BULLETS: [char; 3] = ['•', '-', '*'];

/// Extract plain text: `content`, else `text`, else the whole payload rendered.
pub fn normalize_text(raw: &RawOutput) -> String {
    match raw {
        RawOutput::Text(s) => s.clone(),
        RawOutput::Structured(map) => match map.get("content").or_else(|| map.get("text")) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => Value::Object(map.clone()).to_string(),
        },
    }
}

/// Parse up to [`MAX_INSIGHTS`] substantial lines out of a responder answer.
///
/// An empty result means nothing usable survived.
pub fn normalize_insights(raw: &RawOutput) -> Vec<String> {
    normalize_text(raw)
        .lines()
        .filter_map(clean_line)
        .take(MAX_INSIGHTS)
        .collect()
}

fn clean_line(line: &str) -> Option<String> {
    let mut line = line.trim().trim_start_matches(BULLETS).trim();

    // Numbered items keep whatever follows the first '.'; a digit-led line with no
    // '.' collapses to nothing. Decimals such as "3.2%" are split the same way.
    if line.starts_with(|c: char| c.is_ascii_digit()) {
        line = line.split_once('.').map(|(_, rest)| rest.trim()).unwrap_or("");
    }

    (line.chars().count() > MIN_INSIGHT_CHARS).then(|| line.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_prefers_content_then_text() {
        let both = RawOutput::from_json(json!({"content": "from content", "text": "from text"}));
        assert_eq!(normalize_text(&both), "from content");

        let text = RawOutput::from_json(json!({"text": "from text"}));
        assert_eq!(normalize_text(&text), "from text");

        let bare = RawOutput::text("bare");
        assert_eq!(normalize_text(&bare), "bare");
    }

    #[test]
    fn test_text_renders_unknown_payload() {
        let other = RawOutput::from_json(json!({"answer": 42}));
        assert_eq!(normalize_text(&other), r#"{"answer":42}"#);

        let numeric = RawOutput::from_json(json!({"content": 7}));
        assert_eq!(normalize_text(&numeric), "7");
    }

    #[test]
    fn test_bullets_and_numbering_stripped() {
        let raw = RawOutput::text(
            "• Expand weekend hours at community clinics\n** Partner with schools on vaccination drives\n12. Track asthma-related ER visits by neighborhood",
        );
        assert_eq!(
            normalize_insights(&raw),
            vec![
                "Expand weekend hours at community clinics",
                "Partner with schools on vaccination drives",
                "Track asthma-related ER visits by neighborhood",
            ]
        );
    }

    #[test]
    fn test_exact_boundary_lengths() {
        let line21 = "a".repeat(21);
        let line20 = "b".repeat(20);
        let raw = RawOutput::text(format!("{line20}\n{line21}"));
        assert_eq!(normalize_insights(&raw), vec![line21]);
    }

    #[test]
    fn test_keeps_first_four_in_order() {
        let lines: Vec<String> = (0..6)
            .map(|i| format!("Insight number {i} about regional health"))
            .collect();
        let raw = RawOutput::text(lines.join("\n"));
        assert_eq!(normalize_insights(&raw), lines[..4].to_vec());
    }

    #[test]
    fn test_digit_led_lines_split_on_first_dot() {
        let raw = RawOutput::text(
            "3.2% increase in uninsured residents across the county\n2024 saw record heat across the valley",
        );
        // the decimal is split literally and the dot-less year line collapses
        assert_eq!(
            normalize_insights(&raw),
            vec!["2% increase in uninsured residents across the county"]
        );
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        // 20 multi-byte characters is still too short
        let raw = RawOutput::text("é".repeat(20));
        assert!(normalize_insights(&raw).is_empty());
    }

    #[test]
    fn test_empty_and_whitespace() {
        assert!(normalize_insights(&RawOutput::text("")).is_empty());
        assert!(normalize_insights(&RawOutput::text("\n  \n\t")).is_empty());
    }
}
