//! Text processors for the synthesis path
//!
//! - SentenceSegmenter: splits streaming model output into speakable sentences

mod sentence_segmenter;

pub use sentence_segmenter::{segment, Segmentation, SentenceSegmenter};
