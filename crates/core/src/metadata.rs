use crate::models::{ChunkMetadata, Difficulty};

/// Subject tokens recognized in source filenames.
const SUBJECTS: [&str; 10] = [
    "math",
    "science",
    "english",
    "hindi",
    "social",
    "physics",
    "chemistry",
    "biology",
    "history",
    "geography",
];

/// Subject recorded when the filename carries no recognized token.
pub const DEFAULT_SUBJECT: &str = "General";

/// How a chunk's difficulty is derived. The two strategies are not
/// interchangeable and are selected explicitly per call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DifficultyPolicy {
    /// Position among siblings: the opening chunk is Basic, the next two
    /// Intermediate, the rest Advanced.
    #[default]
    Positional,
    /// Keyword scan over the chunk text itself.
    ContentKeyword,
}

/// Scans the filename for `chapter<N>`, `chapter_<N>`, or `chapter <N>`
/// with N from 1 to 12; the first match wins.
pub fn chapter_from_filename(filename: &str) -> String {
    let lowered = filename.to_lowercase();
    for number in 1..=12u32 {
        let matched = [
            format!("chapter{number}"),
            format!("chapter_{number}"),
            format!("chapter {number}"),
        ]
        .iter()
        .any(|pattern| lowered.contains(pattern.as_str()));

        if matched {
            return format!("Chapter {number}");
        }
    }
    "Chapter Unknown".to_string()
}

pub fn subject_from_filename(filename: &str) -> String {
    let lowered = filename.to_lowercase();
    SUBJECTS
        .iter()
        .find(|subject| lowered.contains(*subject))
        .map(|subject| capitalize(subject))
        .unwrap_or_else(|| DEFAULT_SUBJECT.to_string())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

pub fn difficulty_for(policy: DifficultyPolicy, chunk_index: usize, text: &str) -> Difficulty {
    match policy {
        DifficultyPolicy::Positional => match chunk_index {
            0 => Difficulty::Basic,
            1 | 2 => Difficulty::Intermediate,
            _ => Difficulty::Advanced,
        },
        DifficultyPolicy::ContentKeyword => {
            let lowered = text.to_lowercase();
            if lowered.contains("advanced") || lowered.contains("challenging") {
                Difficulty::Advanced
            } else if lowered.contains("intermediate") || lowered.contains("moderate") {
                Difficulty::Intermediate
            } else {
                Difficulty::Basic
            }
        }
    }
}

/// Derives the full metadata record for one chunk. The section title, when
/// known, is filled in by the caller afterwards.
pub fn tag(
    source_file: &str,
    chunk_index: usize,
    chunk_text: &str,
    policy: DifficultyPolicy,
) -> ChunkMetadata {
    ChunkMetadata {
        chapter: chapter_from_filename(source_file),
        subject: subject_from_filename(source_file),
        difficulty: difficulty_for(policy, chunk_index, chunk_text),
        source_file: source_file.to_string(),
        chunk_index,
        section: None,
    }
}
