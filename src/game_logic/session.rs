use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game_logic::question::{Choice, PresentedQuestion, QuestionItem, QuestionRecord};
use crate::game_logic::shuffle::{select_subset, shuffle};
use crate::game_logic::timer::{SessionTimer, format_elapsed};

pub const DEFAULT_SESSION_SIZE: usize = 10;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    InProgress,
    AnswerLocked,
    Finished,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SessionError {
    #[error("No playable questions in the pool")]
    EmptyPool,
    #[error("Question {index} is malformed: {reason}")]
    MalformedQuestion { index: usize, reason: String },
    #[error("Callback for answer {got} fired while the session is at answer {expected}")]
    StaleCallback {
        expected: AnswerTag,
        got: AnswerTag,
    },
}

/// Identifies one locked answer: the play-through it belongs to and its sequence number
/// within that play-through. Deferred callbacks carry the tag they were scheduled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerTag {
    pub generation: u64,
    pub answer: u64,
}

impl std::fmt::Display for AnswerTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.generation, self.answer)
    }
}

/// What happened when an answer was accepted.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AnswerOutcome {
    pub chosen_index: usize,
    /// Option to highlight as correct, also on a wrong pick.
    pub correct_index: usize,
    pub is_correct: bool,
    pub score: u32,
}

/// Final report of a finished play-through.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct QuizResult {
    pub score: u32,
    pub total: usize,
    pub elapsed_seconds: u64,
    pub elapsed: String,
    pub finished_at: DateTime<Utc>,
}

/// Read-only view of the session handed to the presentation layer.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub generation: u64,
    pub phase: Phase,
    pub position: usize,
    pub total: usize,
    pub score: u32,
    pub elapsed_seconds: u64,
    pub elapsed: String,
    pub question: Option<PresentedQuestion>,
    pub reveal: Option<AnswerOutcome>,
}

/// One quiz play-through state machine.
///
/// `Idle -> InProgress -> AnswerLocked -> InProgress -> ... -> Finished`. Every call to
/// [`QuizSession::start`] begins a new generation and every locked answer gets its own
/// [`AnswerTag`]; callbacks scheduled for any other answer are rejected by
/// [`QuizSession::advance_for`].
#[derive(Debug)]
pub struct QuizSession {
    all_questions: Vec<QuestionItem>,
    rejected: Vec<SessionError>,
    session_size: usize,
    active_questions: Vec<PresentedQuestion>,
    position: usize,
    score: u32,
    phase: Phase,
    timer: SessionTimer,
    generation: u64,
    answers_locked: u64,
    last_outcome: Option<AnswerOutcome>,
    result: Option<QuizResult>,
    rng: StdRng,
}

impl QuizSession {
    pub fn new(records: &[QuestionRecord], session_size: usize) -> Self {
        Self::with_rng(records, session_size, StdRng::from_entropy())
    }

    /// Builds a session around a validated pool. Malformed records are dropped and kept
    /// as [`SessionError::MalformedQuestion`] for reporting.
    pub fn with_rng(records: &[QuestionRecord], session_size: usize, rng: StdRng) -> Self {
        let mut all_questions = Vec::with_capacity(records.len());
        let mut rejected = Vec::new();

        for (index, record) in records.iter().enumerate() {
            match QuestionItem::from_record(record) {
                Ok(item) => all_questions.push(item),
                Err(reason) => {
                    tracing::warn!(
                        question.index = index,
                        reason = %reason,
                        "Skipping malformed question"
                    );
                    rejected.push(SessionError::MalformedQuestion { index, reason });
                }
            }
        }

        Self {
            all_questions,
            rejected,
            session_size,
            active_questions: Vec::new(),
            position: 0,
            score: 0,
            phase: Phase::Idle,
            timer: SessionTimer::new(),
            generation: 0,
            answers_locked: 0,
            last_outcome: None,
            result: None,
            rng,
        }
    }

    /// Begins a fresh play-through: new question subset and order, counters at zero,
    /// timer running. Also used for restarts.
    pub fn start(&mut self) -> Result<u64, SessionError> {
        let selected = select_subset(&self.all_questions, self.session_size, &mut self.rng);
        let mut active_questions = Vec::with_capacity(selected.len());
        for item in &selected {
            let options = if item.needs_option_shuffle() {
                shuffle(&item.options, &mut self.rng)
            } else {
                item.options.clone()
            };
            match PresentedQuestion::new(item, options) {
                Some(presented) => active_questions.push(presented),
                None => tracing::error!(prompt = %item.prompt, "Question lost its correct option"),
            }
        }

        if active_questions.is_empty() {
            tracing::warn!(
                pool.size = self.all_questions.len(),
                pool.rejected = self.rejected.len(),
                "Cannot start session with an empty pool"
            );
            return Err(SessionError::EmptyPool);
        }

        self.generation += 1;
        self.active_questions = active_questions;
        self.position = 0;
        self.score = 0;
        self.answers_locked = 0;
        self.last_outcome = None;
        self.result = None;
        self.phase = Phase::InProgress;
        self.timer.start();

        tracing::info!(
            session.generation = self.generation,
            session.total = self.active_questions.len(),
            "Quiz session started"
        );
        Ok(self.generation)
    }

    pub fn current_question(&self) -> Option<&PresentedQuestion> {
        match self.phase {
            Phase::InProgress | Phase::AnswerLocked => self.active_questions.get(self.position),
            Phase::Idle | Phase::Finished => None,
        }
    }

    /// Locks in an answer for the current question.
    ///
    /// Returns `None` without touching any state when no answer is expected (before
    /// start, while the previous answer is locked, after finishing) or when the choice
    /// names no option of the current question.
    pub fn submit_answer(&mut self, choice: &Choice) -> Option<AnswerOutcome> {
        if self.phase != Phase::InProgress {
            tracing::debug!(phase = ?self.phase, "Ignoring answer outside InProgress");
            return None;
        }
        let question = self.active_questions.get(self.position)?;
        let Some(chosen_index) = question.resolve_choice(choice) else {
            tracing::debug!(choice = ?choice, "Ignoring choice that matches no option");
            return None;
        };

        let is_correct = question.is_correct(chosen_index);
        let correct_index = question.correct_index;
        if is_correct {
            self.score += 1;
        }

        let outcome = AnswerOutcome {
            chosen_index,
            correct_index,
            is_correct,
            score: self.score,
        };
        self.last_outcome = Some(outcome.clone());
        self.answers_locked += 1;
        self.phase = Phase::AnswerLocked;

        tracing::debug!(
            session.generation = self.generation,
            session.position = self.position,
            answer.correct = is_correct,
            "Answer locked"
        );
        Some(outcome)
    }

    /// Moves past a locked answer. Returns the new phase, or `None` if no answer was
    /// locked.
    pub fn advance(&mut self) -> Option<Phase> {
        if self.phase != Phase::AnswerLocked {
            return None;
        }

        self.position += 1;
        self.last_outcome = None;
        if self.position >= self.active_questions.len() {
            self.finish();
        } else {
            self.phase = Phase::InProgress;
        }
        Some(self.phase)
    }

    /// Tag of the most recently locked answer in the current generation.
    pub fn answer_tag(&self) -> AnswerTag {
        AnswerTag {
            generation: self.generation,
            answer: self.answers_locked,
        }
    }

    /// [`QuizSession::advance`] on behalf of a deferred callback scheduled for the answer
    /// `tag`. Only succeeds while exactly that answer is still locked.
    pub fn advance_for(&mut self, tag: AnswerTag) -> Result<Phase, SessionError> {
        let expected = self.answer_tag();
        if tag != expected || self.phase != Phase::AnswerLocked {
            return Err(SessionError::StaleCallback { expected, got: tag });
        }
        self.advance()
            .ok_or(SessionError::StaleCallback { expected, got: tag })
    }

    fn finish(&mut self) {
        self.timer.stop();
        self.phase = Phase::Finished;
        let elapsed_seconds = self.timer.elapsed_seconds();
        self.result = Some(QuizResult {
            score: self.score,
            total: self.active_questions.len(),
            elapsed_seconds,
            elapsed: format_elapsed(elapsed_seconds),
            finished_at: Utc::now(),
        });
        tracing::info!(
            session.generation = self.generation,
            score = self.score,
            total = self.active_questions.len(),
            elapsed.seconds = elapsed_seconds,
            "Quiz session finished"
        );
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn total(&self) -> usize {
        self.active_questions.len()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.timer.elapsed_seconds()
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_running()
    }

    pub fn result(&self) -> Option<&QuizResult> {
        self.result.as_ref()
    }

    pub fn pool_size(&self) -> usize {
        self.all_questions.len()
    }

    pub fn rejected(&self) -> &[SessionError] {
        &self.rejected
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let elapsed_seconds = self.elapsed_seconds();
        SessionSnapshot {
            generation: self.generation,
            phase: self.phase,
            position: self.position,
            total: self.active_questions.len(),
            score: self.score,
            elapsed_seconds,
            elapsed: format_elapsed(elapsed_seconds),
            question: self.current_question().cloned(),
            reveal: self.last_outcome.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::time::Duration;

    /// Questions whose correct option is always index 2.
    fn indexed_pool(count: usize) -> Vec<QuestionRecord> {
        (0..count)
            .map(|i| QuestionRecord::Indexed {
                question: format!("Question {}", i),
                options: vec![
                    format!("{}-a", i),
                    format!("{}-b", i),
                    format!("{}-c", i),
                    format!("{}-d", i),
                ],
                answer: 2,
            })
            .collect()
    }

    fn seeded(records: &[QuestionRecord]) -> QuizSession {
        QuizSession::with_rng(records, DEFAULT_SESSION_SIZE, StdRng::seed_from_u64(11))
    }

    #[test]
    fn test_start_selects_fresh_subset() {
        let pool = indexed_pool(25);
        let mut session = seeded(&pool);
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.current_question().is_none());

        let generation = session.start().unwrap();
        assert_eq!(generation, 1);
        assert_eq!(session.phase(), Phase::InProgress);
        assert_eq!(session.total(), 10);
        assert_eq!(session.position(), 0);
        assert!(session.is_running());

        let prompts: HashSet<_> = session
            .active_questions
            .iter()
            .map(|q| q.prompt.clone())
            .collect();
        assert_eq!(prompts.len(), 10);
        assert!(session.current_question().is_some());
    }

    #[test]
    fn test_correct_and_wrong_answers() {
        let pool = indexed_pool(3);
        let mut session = seeded(&pool);
        session.start().unwrap();

        let outcome = session.submit_answer(&Choice::Index(2)).unwrap();
        assert!(outcome.is_correct);
        assert_eq!(outcome.correct_index, 2);
        assert_eq!(session.score(), 1);
        assert_eq!(session.phase(), Phase::AnswerLocked);

        assert_eq!(session.advance(), Some(Phase::InProgress));
        let outcome = session.submit_answer(&Choice::Index(0)).unwrap();
        assert!(!outcome.is_correct);
        assert_eq!(outcome.chosen_index, 0);
        assert_eq!(outcome.correct_index, 2);
        assert_eq!(session.score(), 1);
        assert_eq!(session.phase(), Phase::AnswerLocked);
    }

    #[test]
    fn test_double_submit_is_ignored() {
        let pool = indexed_pool(3);
        let mut session = seeded(&pool);
        session.start().unwrap();

        assert!(session.submit_answer(&Choice::Index(2)).is_some());
        let before = session.snapshot();
        assert!(session.submit_answer(&Choice::Index(2)).is_none());
        assert!(session.submit_answer(&Choice::Index(1)).is_none());
        assert_eq!(session.score(), 1);
        assert_eq!(session.snapshot().reveal, before.reveal);
    }

    #[test]
    fn test_unknown_choice_does_not_lock() {
        let pool = indexed_pool(2);
        let mut session = seeded(&pool);
        session.start().unwrap();

        assert!(session.submit_answer(&Choice::Index(9)).is_none());
        assert!(
            session
                .submit_answer(&Choice::Value("nope".to_string()))
                .is_none()
        );
        assert_eq!(session.phase(), Phase::InProgress);
    }

    #[test]
    fn test_advance_requires_locked_answer() {
        let pool = indexed_pool(2);
        let mut session = seeded(&pool);
        assert_eq!(session.advance(), None);
        session.start().unwrap();
        assert_eq!(session.advance(), None);
        assert_eq!(session.position(), 0);
    }

    #[test]
    fn test_ten_questions_finish_on_tenth_advance() {
        let pool = indexed_pool(14);
        let mut session = seeded(&pool);
        session.start().unwrap();
        assert_eq!(session.total(), 10);

        for i in 0..9 {
            assert_eq!(session.phase(), Phase::InProgress);
            session.submit_answer(&Choice::Index(2)).unwrap();
            assert_eq!(session.phase(), Phase::AnswerLocked);
            assert_eq!(session.advance(), Some(Phase::InProgress), "advance {}", i + 1);
            assert!(session.is_running());
        }

        session.submit_answer(&Choice::Index(1)).unwrap();
        assert_eq!(session.advance(), Some(Phase::Finished));
        assert!(!session.is_running());
        assert!(session.current_question().is_none());

        let result = session.result().unwrap();
        assert_eq!(result.score, 9);
        assert_eq!(result.total, 10);
        assert_eq!(result.elapsed, format_elapsed(result.elapsed_seconds));

        // Frozen after finishing.
        assert!(session.submit_answer(&Choice::Index(2)).is_none());
        assert_eq!(session.advance(), None);
        assert_eq!(session.score(), 9);
    }

    #[test]
    fn test_single_question_pool() {
        let pool = indexed_pool(1);
        let mut session = seeded(&pool);
        session.start().unwrap();
        assert_eq!(session.total(), 1);
        session.submit_answer(&Choice::Index(2)).unwrap();
        assert_eq!(session.advance(), Some(Phase::Finished));
        assert_eq!(session.result().unwrap().score, 1);
    }

    #[test]
    fn test_short_pool_gives_shorter_session() {
        let pool = indexed_pool(7);
        let mut session = seeded(&pool);
        session.start().unwrap();
        assert_eq!(session.total(), 7);
    }

    #[test]
    fn test_empty_pool_stays_idle() {
        let mut session = seeded(&[]);
        assert_eq!(session.start(), Err(SessionError::EmptyPool));
        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(session.generation(), 0);
    }

    #[test]
    fn test_malformed_records_are_skipped() {
        let mut pool = indexed_pool(2);
        pool.insert(
            1,
            QuestionRecord::Indexed {
                question: "Broken".to_string(),
                options: vec!["only".to_string()],
                answer: 0,
            },
        );
        pool.push(QuestionRecord::Unrecognized(serde_json::json!({"foo": 1})));

        let mut session = seeded(&pool);
        assert_eq!(session.pool_size(), 2);
        assert_eq!(session.rejected().len(), 2);
        assert!(matches!(
            session.rejected()[0],
            SessionError::MalformedQuestion { index: 1, .. }
        ));
        session.start().unwrap();
        assert_eq!(session.total(), 2);
        assert!(
            session
                .active_questions
                .iter()
                .all(|q| q.prompt != "Broken")
        );
    }

    #[test]
    fn test_all_malformed_is_empty_pool() {
        let pool = vec![QuestionRecord::Unrecognized(serde_json::json!(null))];
        let mut session = seeded(&pool);
        assert_eq!(session.start(), Err(SessionError::EmptyPool));
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[test]
    fn test_restart_resets_counters() {
        let pool = indexed_pool(12);
        let mut session = seeded(&pool);
        session.start().unwrap();
        session.submit_answer(&Choice::Index(2)).unwrap();
        session.advance();
        session.submit_answer(&Choice::Index(2)).unwrap();
        assert_eq!(session.score(), 2);
        assert_eq!(session.position(), 1);

        let generation = session.start().unwrap();
        assert_eq!(generation, 2);
        assert_eq!(session.score(), 0);
        assert_eq!(session.position(), 0);
        assert_eq!(session.elapsed_seconds(), 0);
        assert_eq!(session.phase(), Phase::InProgress);
        assert!(session.snapshot().reveal.is_none());
    }

    #[test]
    fn test_stale_generation_cannot_advance() {
        let pool = indexed_pool(5);
        let mut session = seeded(&pool);
        session.start().unwrap();
        session.submit_answer(&Choice::Index(2)).unwrap();
        let old = session.answer_tag();

        session.start().unwrap();
        session.submit_answer(&Choice::Index(2)).unwrap();
        let new = session.answer_tag();
        assert_eq!(old, AnswerTag { generation: 1, answer: 1 });
        assert_eq!(new, AnswerTag { generation: 2, answer: 1 });

        assert_eq!(
            session.advance_for(old),
            Err(SessionError::StaleCallback {
                expected: new,
                got: old
            })
        );
        assert_eq!(session.position(), 0);
        assert_eq!(session.phase(), Phase::AnswerLocked);

        assert_eq!(session.advance_for(new), Ok(Phase::InProgress));
        assert_eq!(session.position(), 1);
    }

    #[test]
    fn test_callback_for_previous_answer_cannot_advance() {
        let pool = indexed_pool(5);
        let mut session = seeded(&pool);
        session.start().unwrap();
        session.submit_answer(&Choice::Index(2)).unwrap();
        let first = session.answer_tag();

        // Advanced by hand before the deferred callback ran.
        assert_eq!(session.advance(), Some(Phase::InProgress));
        assert!(session.advance_for(first).is_err());
        assert_eq!(session.position(), 1);

        session.submit_answer(&Choice::Index(2)).unwrap();
        let second = session.answer_tag();
        assert_eq!(second, AnswerTag { generation: 1, answer: 2 });

        assert!(matches!(
            session.advance_for(first),
            Err(SessionError::StaleCallback { expected, got }) if expected == second && got == first
        ));
        assert_eq!(session.position(), 1);
        assert_eq!(session.phase(), Phase::AnswerLocked);

        assert_eq!(session.advance_for(second), Ok(Phase::InProgress));
        assert_eq!(session.position(), 2);
        // The same callback delivered twice only advances once.
        assert!(session.advance_for(second).is_err());
        assert_eq!(session.position(), 2);
    }

    #[test]
    fn test_open_questions_are_shuffled_and_scored_by_value() {
        let pool: Vec<QuestionRecord> = (0..4)
            .map(|i| QuestionRecord::Open {
                question: format!("Open {}", i),
                correct_answer: "right".to_string(),
                incorrect_answers: vec!["w1".to_string(), "w2".to_string(), "w3".to_string()],
            })
            .collect();
        let mut session = seeded(&pool);
        session.start().unwrap();

        let question = session.current_question().unwrap().clone();
        assert_eq!(question.options.len(), 4);
        assert_eq!(question.options[question.correct_index], "right");

        let outcome = session
            .submit_answer(&Choice::Value("right".to_string()))
            .unwrap();
        assert!(outcome.is_correct);
        assert_eq!(outcome.chosen_index, question.correct_index);
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_time_freezes_on_finish() {
        let pool = indexed_pool(1);
        let mut session = seeded(&pool);
        session.start().unwrap();
        tokio::time::advance(Duration::from_secs(65)).await;
        assert_eq!(session.snapshot().elapsed, "01:05");

        session.submit_answer(&Choice::Index(2)).unwrap();
        session.advance();
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(session.elapsed_seconds(), 65);
        assert_eq!(session.result().unwrap().elapsed, "01:05");
    }
}
