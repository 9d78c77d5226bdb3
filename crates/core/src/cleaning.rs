use crate::error::ExtractionError;
use regex::Regex;

/// Normalizes raw extracted text before classification and chunking.
///
/// The rules run in a fixed order: newline runs collapse to one, space runs
/// collapse to one, runs of four or more identical uppercase letters collapse
/// to a single occurrence, fused words get a space at the lowercase to
/// uppercase boundary, digit-only lines (stray page numbers) are dropped, and
/// a garbled standalone "C hapter" line becomes "Chapter". Cleaning is
/// idempotent: `clean(clean(x)) == clean(x)`.
pub struct TextCleaner {
    newline_runs: Regex,
    space_runs: Regex,
    fused_words: Regex,
    split_chapter: Regex,
}

impl TextCleaner {
    pub fn new() -> Result<Self, ExtractionError> {
        Ok(Self {
            newline_runs: Regex::new(r"\n+")?,
            space_runs: Regex::new(r" +")?,
            fused_words: Regex::new(r"([a-z])([A-Z])")?,
            split_chapter: Regex::new(r"^C\s*hapter$")?,
        })
    }

    pub fn clean(&self, raw: &str) -> String {
        let text = self.newline_runs.replace_all(raw, "\n");
        let text = self.space_runs.replace_all(&text, " ");
        let text = collapse_repeated_caps(&text);
        let text = self.fused_words.replace_all(&text, "$1 $2");

        let kept: Vec<&str> = text
            .lines()
            .filter(|line| !is_page_number(line))
            .map(|line| {
                if self.split_chapter.is_match(line.trim()) {
                    "Chapter"
                } else {
                    line
                }
            })
            .collect();

        kept.join("\n").trim().to_string()
    }
}

/// Runs of four or more identical uppercase letters are a rendering artifact
/// (e.g. "MMMMM OOOOO" column garbage); shorter runs are legitimate text.
fn collapse_repeated_caps(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(current) = chars.next() {
        out.push(current);
        if !current.is_ascii_uppercase() {
            continue;
        }
        let mut run = 1usize;
        while chars.peek() == Some(&current) {
            chars.next();
            run += 1;
        }
        if run < 4 {
            for _ in 1..run {
                out.push(current);
            }
        }
    }

    out
}

fn is_page_number(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && trimmed.bytes().all(|byte| byte.is_ascii_digit())
}
