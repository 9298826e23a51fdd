//! Sentence segmenter for streaming model output
//!
//! Turns an incremental delta stream into speakable sentences plus a carried
//! remainder. Segmentation is a pure function of `(carry, delta)`: the
//! concatenation of the returned sentences followed by the new carry is
//! exactly `carry + delta`, and no returned sentence is empty or
//! punctuation-only.
//!
//! Beyond the common terminators (`.`, `!`, `?`, newline, `。！？`, `।॥`) the
//! configured language contributes its script's terminal punctuation, so
//! Arabic `؟` or Armenian `։` split too.

use once_cell::sync::Lazy;
use voice_orchestrator_config::{ConfigError, SegmenterConfig};
use voice_orchestrator_core::{Language, CLAUSE_BREAKS, COMMON_TERMINATORS};

/// Closing quotes and brackets that stay with the sentence they close
const CLOSERS: &[char] = &[
    '"', '\'', ')', ']', '}', '\u{201D}', '\u{2019}', '»', '」', '』', '）', '】',
];

static DEFAULT_SEGMENTER: Lazy<SentenceSegmenter> =
    Lazy::new(|| SentenceSegmenter::new(Language::English, false));

/// Result of one segmentation step
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Segmentation {
    /// Complete sentences, in order
    pub sentences: Vec<String>,
    /// Trailing text without a sentence boundary yet
    pub carry: String,
}

/// Segment with the default (English, no clause breaks) terminator set
pub fn segment(carry: &str, delta: &str) -> Segmentation {
    DEFAULT_SEGMENTER.segment(carry, delta)
}

/// Language-aware sentence segmenter
#[derive(Debug, Clone)]
pub struct SentenceSegmenter {
    terminators: Vec<char>,
    language: Language,
}

impl SentenceSegmenter {
    /// Build the terminator set for `language`
    pub fn new(language: Language, clause_breaks: bool) -> Self {
        let mut terminators: Vec<char> = COMMON_TERMINATORS.to_vec();
        for c in language.sentence_terminators() {
            if !terminators.contains(c) {
                terminators.push(*c);
            }
        }
        if clause_breaks {
            for c in CLAUSE_BREAKS {
                if !terminators.contains(c) {
                    terminators.push(*c);
                }
            }
        }

        Self {
            terminators,
            language,
        }
    }

    /// Build from settings
    pub fn from_config(config: &SegmenterConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.language()?, config.clause_breaks))
    }

    /// Language this segmenter was built for
    pub fn language(&self) -> Language {
        self.language
    }

    /// Check if character is a sentence terminator
    pub fn is_terminator(&self, c: char) -> bool {
        self.terminators.contains(&c)
    }

    /// Split `carry + delta` into complete sentences and a new carry
    pub fn segment(&self, carry: &str, delta: &str) -> Segmentation {
        let mut text = String::with_capacity(carry.len() + delta.len());
        text.push_str(carry);
        text.push_str(delta);

        let chars: Vec<(usize, char)> = text.char_indices().collect();
        let mut sentences = Vec::new();
        let mut start = 0;
        let mut i = 0;

        while i < chars.len() {
            if !self.is_boundary(&chars, i) {
                i += 1;
                continue;
            }

            // Absorb "...", "?!", closing quotes, then trailing whitespace
            let mut end = i + 1;
            while end < chars.len() && (self.is_terminator(chars[end].1) || is_closer(chars[end].1))
            {
                end += 1;
            }
            while end < chars.len() && chars[end].1.is_whitespace() {
                end += 1;
            }

            let end_byte = chars.get(end).map(|(b, _)| *b).unwrap_or(text.len());
            let piece = &text[start..end_byte];

            // Punctuation-only pieces merge into whatever follows
            if piece.chars().any(char::is_alphanumeric) {
                sentences.push(piece.to_string());
                start = end_byte;
            }

            i = end;
        }

        Segmentation {
            sentences,
            carry: text[start..].to_string(),
        }
    }

    fn is_boundary(&self, chars: &[(usize, char)], i: usize) -> bool {
        let c = chars[i].1;
        if !self.is_terminator(c) {
            return false;
        }

        // Decimal points: "3.14" never splits, and a trailing "3." waits for
        // the next delta to decide
        if c == '.' && i > 0 && chars[i - 1].1.is_ascii_digit() {
            match chars.get(i + 1) {
                None => return false,
                Some((_, next)) if next.is_ascii_digit() => return false,
                _ => {}
            }
        }

        true
    }
}

impl Default for SentenceSegmenter {
    fn default() -> Self {
        (*DEFAULT_SEGMENTER).clone()
    }
}

fn is_closer(c: char) -> bool {
    CLOSERS.contains(&c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_reconstructs(seg: &SentenceSegmenter, carry: &str, delta: &str) {
        let result = seg.segment(carry, delta);
        let rebuilt: String = result.sentences.concat() + &result.carry;
        assert_eq!(rebuilt, format!("{}{}", carry, delta), "carry={:?} delta={:?}", carry, delta);
        for s in &result.sentences {
            assert!(!s.is_empty());
            assert!(s.chars().any(char::is_alphanumeric), "punctuation-only sentence {:?}", s);
        }
    }

    #[test]
    fn test_simple_sentences() {
        let result = segment("", "Hello world. How are you?");
        assert_eq!(result.sentences, vec!["Hello world. ", "How are you?"]);
        assert_eq!(result.carry, "");
    }

    #[test]
    fn test_carry_is_kept() {
        let result = segment("", "Hi there. I am");
        assert_eq!(result.sentences, vec!["Hi there. "]);
        assert_eq!(result.carry, "I am");

        let next = segment(&result.carry, " fine!");
        assert_eq!(next.sentences, vec!["I am fine!"]);
        assert_eq!(next.carry, "");
    }

    #[test]
    fn test_no_terminator() {
        let result = segment("Hel", "lo");
        assert!(result.sentences.is_empty());
        assert_eq!(result.carry, "Hello");
    }

    #[test]
    fn test_ellipsis_and_closing_quote() {
        let result = segment("", "Wait... He said \"yes.\" Then left");
        assert_eq!(result.sentences, vec!["Wait... ", "He said \"yes.\" "]);
        assert_eq!(result.carry, "Then left");
    }

    #[test]
    fn test_punctuation_only_is_merged_forward() {
        let result = segment("", "...");
        assert!(result.sentences.is_empty());
        assert_eq!(result.carry, "...");

        let next = segment(&result.carry, "Okay.");
        assert_eq!(next.sentences, vec!["...Okay."]);
    }

    #[test]
    fn test_decimal_numbers() {
        let result = segment("", "It costs 3.14 dollars. Done");
        assert_eq!(result.sentences, vec!["It costs 3.14 dollars. "]);

        let deferred = segment("", "The answer is 3.");
        assert!(deferred.sentences.is_empty());
        let resolved = segment(&deferred.carry, " Next");
        assert_eq!(resolved.sentences, vec!["The answer is 3. "]);
        assert_eq!(resolved.carry, "Next");
    }

    #[test]
    fn test_newline_terminates() {
        let result = segment("", "First line\nSecond");
        assert_eq!(result.sentences, vec!["First line\n"]);
        assert_eq!(result.carry, "Second");
    }

    #[test]
    fn test_cjk_terminators() {
        let result = segment("", "你好。今天怎么样？我很好");
        assert_eq!(result.sentences, vec!["你好。", "今天怎么样？"]);
        assert_eq!(result.carry, "我很好");
    }

    #[test]
    fn test_hindi_terminators() {
        let result = segment("", "नमस्ते। आप कैसे हैं?");
        assert_eq!(result.sentences.len(), 2);
        assert_eq!(result.carry, "");
    }

    #[test]
    fn test_language_specific_terminators() {
        let arabic = SentenceSegmenter::new(Language::Arabic, false);
        let result = arabic.segment("", "كيف حالك؟ بخير");
        assert_eq!(result.sentences, vec!["كيف حالك؟ "]);

        // English does not know the Arabic question mark
        assert!(segment("", "كيف حالك؟ بخير").sentences.is_empty());
    }

    #[test]
    fn test_clause_breaks() {
        let seg = SentenceSegmenter::new(Language::English, true);
        let result = seg.segment("", "Well, I think so");
        assert_eq!(result.sentences, vec!["Well, "]);
        assert_eq!(result.carry, "I think so");

        assert!(segment("", "Well, I think so").sentences.is_empty());
    }

    #[test]
    fn test_from_config() {
        let config = SegmenterConfig {
            language: "hy".to_string(),
            clause_breaks: false,
        };
        let seg = SentenceSegmenter::from_config(&config).unwrap();
        assert_eq!(seg.language(), Language::Armenian);
        assert!(seg.is_terminator('։'));

        let bad = SegmenterConfig {
            language: "xx".to_string(),
            clause_breaks: false,
        };
        assert!(SentenceSegmenter::from_config(&bad).is_err());
    }

    #[test]
    fn test_reconstruction_over_splits() {
        let seg = SentenceSegmenter::default();
        let samples = [
            "Hi there. How are you today? I'm fine!",
            "Wait... what?! \"Really.\" Yes",
            "Pi is 3.14159. Done.\n\nNext para",
            "。。！？ odd ... ",
            "",
            "no boundaries at all",
            "नमस्ते। आप कैसे हैं?",
        ];

        for text in samples {
            let boundaries: Vec<usize> = text
                .char_indices()
                .map(|(b, _)| b)
                .chain(std::iter::once(text.len()))
                .collect();
            for &split in &boundaries {
                let (carry, delta) = text.split_at(split);
                assert_reconstructs(&seg, carry, delta);
            }
        }
    }

    #[test]
    fn test_streaming_char_by_char_matches_whole() {
        let text = "Sure thing. The total is 12.50 dollars! Anything else?";
        let mut carry = String::new();
        let mut emitted = Vec::new();

        for c in text.chars() {
            let result = segment(&carry, &c.to_string());
            emitted.extend(result.sentences);
            carry = result.carry;
        }

        assert_eq!(emitted.concat() + &carry, text);
        // Whitespace after a boundary arrives later and leads the next sentence
        assert_eq!(
            emitted,
            vec!["Sure thing.", " The total is 12.50 dollars!", " Anything else?"]
        );
        assert!(carry.is_empty());
    }
}
