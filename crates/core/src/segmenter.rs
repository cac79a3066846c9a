use crate::error::IngestError;
use regex::Regex;

/// Tokens that end with a period without ending a sentence. Compared
/// case-insensitively against the word preceding the punctuation run.
const ABBREVIATIONS: [&str; 13] = [
    "dr", "mr", "mrs", "ms", "prof", "sr", "jr", "st", "vs", "etc", "e.g", "i.e", "fig",
];

/// Splits raw text into sentences without breaking on abbreviation periods.
///
/// A boundary is a run of `.`, `!`, or `?` followed by whitespace and a
/// capital letter (or end of input). The split is suppressed when the word
/// before the punctuation is a known abbreviation, a single-letter initial,
/// or a numbered-list marker such as `1.`.
pub struct SentenceSegmenter {
    boundary: Regex,
}

impl SentenceSegmenter {
    pub fn new() -> Result<Self, IngestError> {
        Ok(Self {
            boundary: Regex::new(r"([.!?]+)(\s+)")?,
        })
    }

    /// Lazy iterator over the sentences of `text`. Original wording and
    /// punctuation are preserved; call again to restart.
    pub fn segment<'a>(&'a self, text: &'a str) -> Sentences<'a> {
        Sentences {
            segmenter: self,
            text,
            cursor: 0,
        }
    }

    fn is_sentence_break(&self, text: &str, punct_start: usize, next_start: usize) -> bool {
        let starts_upper = text[next_start..]
            .chars()
            .next()
            .map_or(true, |c| c.is_uppercase());
        if !starts_upper {
            return false;
        }

        let token = text[..punct_start]
            .rsplit(char::is_whitespace)
            .next()
            .unwrap_or("");
        !is_abbreviation(token)
    }
}

fn is_abbreviation(token: &str) -> bool {
    if token.is_empty() {
        return false;
    }
    if token.chars().all(|c| c.is_ascii_digit()) {
        // Numbered-list marker ("1.", "12.").
        return true;
    }
    let mut chars = token.chars();
    if let (Some(first), None) = (chars.next(), chars.next()) {
        // Single-letter initial ("J. Smith").
        if first.is_alphabetic() {
            return true;
        }
    }
    let lowered = token.to_lowercase();
    ABBREVIATIONS.contains(&lowered.as_str())
}

pub struct Sentences<'a> {
    segmenter: &'a SentenceSegmenter,
    text: &'a str,
    cursor: usize,
}

impl<'a> Iterator for Sentences<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        loop {
            if self.cursor >= self.text.len() {
                return None;
            }

            let mut search = self.cursor;
            let mut found = None;
            while let Some(caps) = self.segmenter.boundary.captures(&self.text[search..]) {
                let whole = caps.get(0).map(|m| (m.start(), m.end()))?;
                let punct = caps.get(1).map(|m| (m.start(), m.end()))?;
                let punct_start = search + punct.0;
                let punct_end = search + punct.1;
                let after_ws = search + whole.1;

                if self
                    .segmenter
                    .is_sentence_break(self.text, punct_start, after_ws)
                {
                    found = Some((punct_end, after_ws));
                    break;
                }
                search = after_ws;
            }

            let (sentence, next_cursor) = match found {
                Some((punct_end, after_ws)) => (&self.text[self.cursor..punct_end], after_ws),
                None => (&self.text[self.cursor..], self.text.len()),
            };
            self.cursor = next_cursor;

            let sentence = sentence.trim();
            if !sentence.is_empty() {
                return Some(sentence);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SentenceSegmenter;

    fn split(text: &str) -> Vec<String> {
        let segmenter = SentenceSegmenter::new().unwrap();
        segmenter.segment(text).map(str::to_string).collect()
    }

    #[test]
    fn splits_on_terminal_punctuation_before_capitals() {
        let sentences = split("Arrays are ordered. Lists can grow. Maps hold pairs.");
        assert_eq!(
            sentences,
            vec!["Arrays are ordered.", "Lists can grow.", "Maps hold pairs."]
        );
    }

    #[test]
    fn abbreviations_do_not_split() {
        let sentences = split("Dr. Smith explains arrays. Arrays are ordered.");
        assert_eq!(
            sentences,
            vec!["Dr. Smith explains arrays.", "Arrays are ordered."]
        );
    }

    #[test]
    fn single_letter_initials_do_not_split() {
        let sentences = split("J. Smith wrote the lecture. It is short.");
        assert_eq!(sentences, vec!["J. Smith wrote the lecture.", "It is short."]);
    }

    #[test]
    fn numbered_list_markers_do_not_split() {
        let sentences = split("1. Introduction To The Course");
        assert_eq!(sentences, vec!["1. Introduction To The Course"]);
    }

    #[test]
    fn latin_abbreviations_do_not_split() {
        let sentences = split("Use a list, e.g. Vec, for ordered data. Sets differ.");
        assert_eq!(
            sentences,
            vec!["Use a list, e.g. Vec, for ordered data.", "Sets differ."]
        );
    }

    #[test]
    fn lowercase_continuation_is_not_a_boundary() {
        let sentences = split("It returned 3.5 percent. the rest was noise");
        assert_eq!(sentences, vec!["It returned 3.5 percent. the rest was noise"]);
    }

    #[test]
    fn consecutive_punctuation_is_one_boundary() {
        let sentences = split("Wait... Then continue!");
        assert_eq!(sentences, vec!["Wait...", "Then continue!"]);
    }

    #[test]
    fn trailing_text_without_punctuation_is_a_sentence() {
        let sentences = split("First sentence. And a trailing fragment");
        assert_eq!(sentences, vec!["First sentence.", "And a trailing fragment"]);
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(split("").is_empty());
        assert!(split("   \n  ").is_empty());
    }

    #[test]
    fn iteration_is_restartable() {
        let segmenter = SentenceSegmenter::new().unwrap();
        let text = "One sentence. Two sentences.";
        let first: Vec<_> = segmenter.segment(text).collect();
        let second: Vec<_> = segmenter.segment(text).collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }
}
