//! Turns a word entry into a multiple choice question.

use std::collections::BTreeSet;

use rand::{seq::SliceRandom, Rng};
use teloxide::utils::html;

use crate::catalog::{Catalog, WordEntry};

pub const MAX_DISTRACTORS: usize = 3;
pub const STOP_CALLBACK: &str = "STOP";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceOption {
    pub label: String,
    pub meaning: String,
}

/// One button of the answer keyboard, independent of the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyboardChoice {
    Answer { label: String },
    Stop,
}

impl KeyboardChoice {
    pub fn text(&self) -> &str {
        match self {
            KeyboardChoice::Answer { label } => label,
            KeyboardChoice::Stop => "🛑 Stop Quiz",
        }
    }

    pub fn callback_data(&self) -> &str {
        match self {
            KeyboardChoice::Answer { label } => label,
            KeyboardChoice::Stop => STOP_CALLBACK,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedQuestion {
    pub text: String,
    pub options: Vec<ChoiceOption>,
    pub keyboard: Vec<KeyboardChoice>,
}

/// A, B, ..., Z, then AA, AB, ... like spreadsheet columns.
pub fn option_label(mut idx: usize) -> String {
    let mut label = Vec::new();
    loop {
        label.push(b'A' + (idx % 26) as u8);
        if idx < 26 {
            break;
        }
        idx = idx / 26 - 1;
    }
    label.reverse();
    String::from_utf8(label).unwrap_or_default()
}

/// Distinct meanings of other words with the same type.
pub fn distractor_pool<'a>(entry: &WordEntry, catalog: &'a Catalog) -> Vec<&'a str> {
    let distinct: BTreeSet<&str> = catalog
        .iter()
        .filter(|other| other.word_type == entry.word_type && other.meaning != entry.meaning)
        .map(|other| other.meaning.as_str())
        .collect();
    distinct.into_iter().collect()
}

/// Builds the question for `entry`, numbered `position` of `total`.
///
/// Up to three distractors are drawn from words of the same type; the
/// correct meaning is always present exactly once.
pub fn format_question<R: Rng + ?Sized>(
    entry: &WordEntry,
    catalog: &Catalog,
    position: usize,
    total: usize,
    rng: &mut R,
) -> RenderedQuestion {
    let mut candidates = distractor_pool(entry, catalog);
    let take = candidates.len().min(MAX_DISTRACTORS);
    let (picked, _) = candidates.partial_shuffle(rng, take);

    let mut meanings: Vec<&str> = picked.to_vec();
    meanings.push(&entry.meaning);
    meanings.shuffle(rng);

    let options: Vec<ChoiceOption> = meanings
        .into_iter()
        .enumerate()
        .map(|(idx, meaning)| ChoiceOption {
            label: option_label(idx),
            meaning: meaning.to_owned(),
        })
        .collect();

    let mut text = format!(
        "❓ Question {}/{}\n\n👉 {} ({})\n\n",
        position,
        total,
        html::bold(&html::escape(&entry.term)),
        html::escape(&entry.word_type)
    );
    for option in &options {
        text.push_str(&format!("{}. {}\n", option.label, html::escape(&option.meaning)));
    }

    let keyboard = options
        .iter()
        .map(|option| KeyboardChoice::Answer {
            label: option.label.clone(),
        })
        .chain(std::iter::once(KeyboardChoice::Stop))
        .collect();

    RenderedQuestion {
        text,
        options,
        keyboard,
    }
}
