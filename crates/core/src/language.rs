//! Languages and their sentence terminators
//!
//! The segmenter always splits on the common terminators; the configured
//! language adds the terminal punctuation of its script.

use serde::{Deserialize, Serialize};

/// Terminators recognised regardless of the configured language
pub const COMMON_TERMINATORS: &[char] = &['.', '!', '?', '\n', '。', '！', '？', '।', '॥'];

/// Clause-level breaks, used only when clause breaking is enabled
pub const CLAUSE_BREAKS: &[char] = &[',', '，', '、', ';', '；'];

/// Response languages the segmenter knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    English,
    Chinese,
    Japanese,
    Korean,
    Hindi,
    Bengali,
    Arabic,
    Urdu,
    Thai,
    Armenian,
    Greek,
    Spanish,
}

impl Language {
    /// ISO 639-1 code
    pub fn code(&self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Chinese => "zh",
            Self::Japanese => "ja",
            Self::Korean => "ko",
            Self::Hindi => "hi",
            Self::Bengali => "bn",
            Self::Arabic => "ar",
            Self::Urdu => "ur",
            Self::Thai => "th",
            Self::Armenian => "hy",
            Self::Greek => "el",
            Self::Spanish => "es",
        }
    }

    /// Script used by this language
    pub fn script(&self) -> Script {
        match self {
            Self::English | Self::Spanish => Script::Latin,
            Self::Chinese | Self::Japanese => Script::Han,
            Self::Korean => Script::Hangul,
            Self::Hindi => Script::Devanagari,
            Self::Bengali => Script::Bengali,
            Self::Arabic | Self::Urdu => Script::Arabic,
            Self::Thai => Script::Thai,
            Self::Armenian => Script::Armenian,
            Self::Greek => Script::Greek,
        }
    }

    /// Sentence terminators for this language's script
    pub fn sentence_terminators(&self) -> &'static [char] {
        match self.script() {
            Script::Latin | Script::Hangul => &['.', '?', '!'],
            Script::Han => &['。', '？', '！', '.', '?', '!', '…'],
            Script::Devanagari => &['.', '?', '!', '।', '॥'],
            Script::Bengali => &['.', '?', '!', '।'],
            Script::Arabic => &['.', '?', '!', '؟', '۔'],
            Script::Thai => &['.', '?', '!', '๚', '๛'],
            Script::Armenian => &['.', '?', '!', '։', '՞', '՜'],
            Script::Greek => &['.', '!', ';'],
        }
    }

    /// Parse from string (case-insensitive)
    pub fn from_str_loose(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "en" | "eng" | "english" => Some(Self::English),
            "zh" | "zho" | "chinese" | "mandarin" => Some(Self::Chinese),
            "ja" | "jpn" | "japanese" => Some(Self::Japanese),
            "ko" | "kor" | "korean" => Some(Self::Korean),
            "hi" | "hin" | "hindi" => Some(Self::Hindi),
            "bn" | "ben" | "bengali" | "bangla" => Some(Self::Bengali),
            "ar" | "ara" | "arabic" => Some(Self::Arabic),
            "ur" | "urd" | "urdu" => Some(Self::Urdu),
            "th" | "tha" | "thai" => Some(Self::Thai),
            "hy" | "hye" | "armenian" => Some(Self::Armenian),
            "el" | "ell" | "greek" => Some(Self::Greek),
            "es" | "spa" | "spanish" => Some(Self::Spanish),
            _ => None,
        }
    }

    /// All known languages
    pub fn all() -> &'static [Language] {
        &[
            Self::English,
            Self::Chinese,
            Self::Japanese,
            Self::Korean,
            Self::Hindi,
            Self::Bengali,
            Self::Arabic,
            Self::Urdu,
            Self::Thai,
            Self::Armenian,
            Self::Greek,
            Self::Spanish,
        ]
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Writing systems with distinct terminal punctuation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Script {
    Latin,
    Han,
    Hangul,
    Devanagari,
    Bengali,
    Arabic,
    Thai,
    Armenian,
    Greek,
}
