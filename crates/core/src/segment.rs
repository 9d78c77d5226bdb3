use crate::chunking::{merge_by_budget, CharBudget};
use crate::models::{Block, BlockType, Section};

/// Folds a classified block stream into an ordered list of sections.
///
/// A heading or chapter title closes the section being accumulated (running
/// the character-budget merge over its three lists) and opens the next one.
/// Blocks seen before the first heading have no section to attach to and are
/// dropped. The trailing section is flushed at end of stream.
pub fn segment_blocks(blocks: impl IntoIterator<Item = Block>, budget: CharBudget) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current: Option<Section> = None;

    for block in blocks {
        if block.kind.opens_section() {
            if let Some(section) = current.take() {
                sections.push(close_section(section, budget));
            }
            current = Some(Section {
                title: block.text,
                kind: block.kind,
                content: Vec::new(),
                activities: Vec::new(),
                questions: Vec::new(),
            });
        } else if let Some(section) = current.as_mut() {
            match block.kind {
                BlockType::Activity => section.activities.push(block.text),
                BlockType::Question => section.questions.push(block.text),
                _ => section.content.push(block.text),
            }
        }
    }

    if let Some(section) = current {
        sections.push(close_section(section, budget));
    }

    sections
}

fn close_section(section: Section, budget: CharBudget) -> Section {
    Section {
        content: merge_by_budget(&section.content, budget),
        activities: merge_by_budget(&section.activities, budget),
        questions: merge_by_budget(&section.questions, budget),
        ..section
    }
}

#[cfg(test)]
mod tests {
    use super::segment_blocks;
    use crate::chunking::CharBudget;
    use crate::models::{Block, BlockType};

    fn block(text: &str, kind: BlockType) -> Block {
        Block {
            text: text.to_string(),
            kind,
            bbox: Vec::new(),
        }
    }

    #[test]
    fn headings_open_and_close_sections() {
        let blocks = vec![
            block("Chapter 1 Matter", BlockType::ChapterTitle),
            block("Everything is made of matter.", BlockType::BodyText),
            block("States of Matter", BlockType::Heading),
            block("Solids keep their shape.", BlockType::BodyText),
            block("Activity 1.1 observe ice", BlockType::Activity),
            block("Question 1 define matter", BlockType::Question),
        ];

        let sections = segment_blocks(blocks, CharBudget::default());
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].title, "Chapter 1 Matter");
        assert_eq!(sections[0].kind, BlockType::ChapterTitle);
        assert_eq!(sections[0].content, vec!["Everything is made of matter.".to_string()]);
        assert_eq!(sections[1].title, "States of Matter");
        assert_eq!(sections[1].activities, vec!["Activity 1.1 observe ice".to_string()]);
        assert_eq!(sections[1].questions, vec!["Question 1 define matter".to_string()]);
    }

    #[test]
    fn blocks_before_the_first_heading_are_dropped() {
        let blocks = vec![
            block("stray preface text", BlockType::BodyText),
            block("Introduction", BlockType::Heading),
            block("real content", BlockType::BodyText),
        ];

        let sections = segment_blocks(blocks, CharBudget::default());
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].content, vec!["real content".to_string()]);
    }

    #[test]
    fn captions_land_in_the_content_list() {
        let blocks = vec![
            block("Diffusion", BlockType::Heading),
            block("Figure 1.2 ink spreading in water", BlockType::FigureCaption),
            block("Table 1 diffusion rates", BlockType::TableCaption),
        ];

        let sections = segment_blocks(blocks, CharBudget::default());
        assert_eq!(sections[0].content.len(), 1);
        assert!(sections[0].content[0].contains("Figure 1.2"));
        assert!(sections[0].content[0].contains("Table 1"));
    }

    #[test]
    fn closing_a_section_merges_its_lists_by_budget() {
        let mut blocks = vec![block("Long Section", BlockType::Heading)];
        for _ in 0..5 {
            blocks.push(block(&"x".repeat(600), BlockType::BodyText));
        }

        let sections = segment_blocks(blocks, CharBudget::default());
        assert_eq!(sections[0].content.len(), 2);
    }

    #[test]
    fn empty_stream_yields_no_sections() {
        let sections = segment_blocks(Vec::new(), CharBudget::default());
        assert!(sections.is_empty());
    }
}
