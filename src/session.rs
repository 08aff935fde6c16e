//! Quiz sessions: pool sampling, progress and scoring.

use std::{
    collections::HashMap,
    hash::Hash,
    sync::{Mutex, MutexGuard},
};

use rand::{seq::SliceRandom, Rng};

use crate::{
    catalog::{Catalog, WordEntry},
    error::SessionError,
    question::{format_question, ChoiceOption, RenderedQuestion},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Active,
    Finished,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pool: Vec<WordEntry>,
    index: usize,
    score: u32,
    status: SessionStatus,
    current_options: Vec<ChoiceOption>,
    current_correct_meaning: String,
    current_word: String,
    catalog: Catalog,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub is_correct: bool,
    pub correct_meaning: String,
    pub word: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreSummary {
    pub score: u32,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    Next(RenderedQuestion),
    Finished(ScoreSummary),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerReport {
    pub outcome: AnswerOutcome,
    pub progress: Progress,
}

impl SessionState {
    pub fn pool(&self) -> &[WordEntry] {
        &self.pool
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    pub fn current_options(&self) -> &[ChoiceOption] {
        &self.current_options
    }

    pub fn current_correct_meaning(&self) -> &str {
        &self.current_correct_meaning
    }

    pub fn current_word(&self) -> &str {
        &self.current_word
    }

    pub fn summary(&self) -> ScoreSummary {
        ScoreSummary {
            score: self.score,
            total: self.index,
        }
    }
}

/// Starts a session over a random sample of at most `pool_size` words.
pub fn start_session<R: Rng + ?Sized>(
    catalog: &Catalog,
    pool_size: usize,
    rng: &mut R,
) -> SessionState {
    let mut entries = catalog.entries().to_vec();
    let take = pool_size.min(entries.len());
    let (picked, _) = entries.partial_shuffle(rng, take);

    SessionState {
        pool: picked.to_vec(),
        index: 0,
        score: 0,
        status: SessionStatus::Active,
        current_options: Vec::new(),
        current_correct_meaning: String::new(),
        current_word: String::new(),
        catalog: catalog.clone(),
    }
}

/// Presents the next pool entry, or `None` once the quiz is over.
///
/// An active session whose pool is exhausted becomes finished.
pub fn next_question<R: Rng + ?Sized>(
    session: &mut SessionState,
    rng: &mut R,
) -> Option<RenderedQuestion> {
    if !session.is_active() {
        return None;
    }
    let Some(entry) = session.pool.get(session.index) else {
        close(session, SessionStatus::Finished);
        return None;
    };

    let total = session.pool.len();
    let question = format_question(entry, &session.catalog, session.index + 1, total, rng);
    session.current_options = question.options.clone();
    session.current_correct_meaning = entry.meaning.clone();
    session.current_word = entry.term.clone();
    session.index += 1;

    Some(question)
}

/// Checks `label` against the current question. Unknown labels are wrong.
///
/// Score and index are left alone; see [`award_point`] and [`next_question`].
pub fn submit_answer(session: &SessionState, label: &str) -> Result<AnswerOutcome, SessionError> {
    if !session.is_active() {
        return Err(SessionError::NoActiveSession);
    }

    let chosen = session
        .current_options
        .iter()
        .find(|option| option.label == label)
        .map(|option| option.meaning.as_str());

    Ok(AnswerOutcome {
        is_correct: chosen == Some(session.current_correct_meaning.as_str()),
        correct_meaning: session.current_correct_meaning.clone(),
        word: session.current_word.clone(),
    })
}

pub fn award_point(session: &mut SessionState) {
    session.score += 1;
}

/// Scores an answer and moves on to the next question or the final summary.
pub fn answer_and_advance<R: Rng + ?Sized>(
    session: &mut SessionState,
    label: &str,
    rng: &mut R,
) -> Result<AnswerReport, SessionError> {
    let outcome = submit_answer(session, label)?;
    if outcome.is_correct {
        award_point(session);
    }

    let progress = match next_question(session, rng) {
        Some(question) => Progress::Next(question),
        None => Progress::Finished(session.summary()),
    };

    Ok(AnswerReport { outcome, progress })
}

/// Ends the quiz early. The question on screen counts toward the total.
pub fn stop_session(session: &mut SessionState) -> Result<ScoreSummary, SessionError> {
    if !session.is_active() {
        return Err(SessionError::NoActiveSession);
    }
    close(session, SessionStatus::Stopped);
    Ok(session.summary())
}

// Ended sessions linger in the store, so they let go of the word list.
fn close(session: &mut SessionState, status: SessionStatus) {
    session.status = status;
    session.catalog = Catalog::default();
}

/// Sessions keyed by user.
#[derive(Debug)]
pub struct SessionStore<K> {
    sessions: Mutex<HashMap<K, SessionState>>,
}

impl<K> Default for SessionStore<K> {
    fn default() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash> SessionStore<K> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, SessionState>> {
        // Sessions are plain data, a poisoned lock is still usable.
        self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, key: &K) -> Option<SessionState> {
        self.lock().get(key).cloned()
    }

    /// Replaces whatever session the user had.
    pub fn put(&self, key: K, session: SessionState) {
        self.lock().insert(key, session);
    }

    pub fn clear(&self, key: &K) -> Option<SessionState> {
        self.lock().remove(key)
    }

    /// Runs `f` on the user's session, if there is one.
    pub fn update<T>(&self, key: &K, f: impl FnOnce(&mut SessionState) -> T) -> Option<T> {
        self.lock().get_mut(key).map(f)
    }
}
