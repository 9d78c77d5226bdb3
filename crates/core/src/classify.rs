use crate::models::BlockType;

/// Font size above which a block is treated as a heading.
pub const HEADING_FONT_SIZE: f32 = 14.0;

/// Font attributes of one span within a rendered line. This is the minimal
/// shape any page-extraction backend must supply; the style flags are kept
/// for parity with extractor output but do not influence classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpanStyle {
    pub font_size: f32,
    pub flags: u32,
}

/// Labels a block from its text and span font attributes. Deterministic for
/// identical inputs; font size takes precedence over the text rules.
pub fn classify(text: &str, spans: &[SpanStyle]) -> BlockType {
    let lowered = text.trim().to_lowercase();

    if spans.iter().any(|span| span.font_size > HEADING_FONT_SIZE) {
        return if lowered.contains("chapter") {
            BlockType::ChapterTitle
        } else {
            BlockType::Heading
        };
    }

    if lowered.starts_with("activity") || lowered.starts_with("experiment") {
        BlockType::Activity
    } else if lowered.starts_with("question") || lowered.starts_with("q.") {
        BlockType::Question
    } else if lowered.contains("figure") || lowered.contains("fig.") {
        BlockType::FigureCaption
    } else if lowered.contains("table") {
        BlockType::TableCaption
    } else {
        BlockType::BodyText
    }
}

#[cfg(test)]
mod tests {
    use super::{classify, SpanStyle, HEADING_FONT_SIZE};
    use crate::models::BlockType;

    fn span(font_size: f32) -> SpanStyle {
        SpanStyle { font_size, flags: 0 }
    }

    #[test]
    fn large_font_with_chapter_word_is_a_chapter_title() {
        let kind = classify("Chapter 3: Atoms and Molecules", &[span(18.0)]);
        assert_eq!(kind, BlockType::ChapterTitle);
    }

    #[test]
    fn large_font_without_chapter_word_is_a_heading() {
        let kind = classify("Physical Nature of Matter", &[span(16.0)]);
        assert_eq!(kind, BlockType::Heading);
    }

    #[test]
    fn threshold_is_exclusive() {
        let kind = classify("Physical Nature of Matter", &[span(HEADING_FONT_SIZE)]);
        assert_eq!(kind, BlockType::BodyText);
    }

    #[test]
    fn text_prefixes_route_to_activity_and_question() {
        assert_eq!(classify("Activity 1.1: take a beaker", &[span(10.0)]), BlockType::Activity);
        assert_eq!(classify("Experiment with salt", &[span(10.0)]), BlockType::Activity);
        assert_eq!(classify("Question 4: define matter", &[span(10.0)]), BlockType::Question);
        assert_eq!(classify("Q. what is diffusion?", &[span(10.0)]), BlockType::Question);
    }

    #[test]
    fn captions_match_on_substrings() {
        assert_eq!(classify("see Figure 1.2 above", &[span(10.0)]), BlockType::FigureCaption);
        assert_eq!(classify("as shown in fig. 2", &[span(10.0)]), BlockType::FigureCaption);
        assert_eq!(classify("Table 3 lists melting points", &[span(10.0)]), BlockType::TableCaption);
    }

    #[test]
    fn everything_else_is_body_text() {
        assert_eq!(classify("Matter is made of particles.", &[span(10.0)]), BlockType::BodyText);
        assert_eq!(classify("Matter is made of particles.", &[]), BlockType::BodyText);
    }
}
