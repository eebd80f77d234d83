use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tracing::debug;

use crate::bank::{Question, QuestionBank};
use crate::difficulty::{DifficultyProfile, PowerUpCounts, PowerUpKind, DEFAULT_DIFFICULTY};
use crate::save::{SaveRecord, SaveStore};

pub const POINTS_PER_ANSWER: u32 = 10;
/// Seconds the player may leave the window after using Investigate.
pub const GRACE_SECS: u64 = 10;
/// Deferred focus re-check fires this long after a focus loss inside the
/// grace window. One second of slack over the window itself.
pub const FOCUS_RECHECK_SECS: u64 = 11;

const PROMPT_MESSAGE: &str = "Selecciona la opción correcta.";
const CATEGORY_COMPLETE_MESSAGE: &str =
    "¡Categoría completada! Excelente trabajo, puedes elegir otra categoría.";

#[derive(Debug, Error)]
pub enum GameError {
    #[error("dificultad desconocida: {0}")]
    UnknownDifficulty(String),
    #[error("índice fuera de rango: {0}")]
    IndexOutOfRange(usize),
    #[error("no hay una pregunta activa")]
    NoActiveQuestion,
    #[error("escribe un nombre para guardar la partida")]
    SaveSlotNameRequired,
    #[error("esta dificultad no permite guardar")]
    SavingDisabled,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LossReason {
    LivesExhausted,
    HardcoreMiss,
    FocusLost,
}

impl LossReason {
    pub fn message(&self) -> &'static str {
        match self {
            LossReason::LivesExhausted => {
                "Has perdido todas las vidas. Puedes intentarlo de nuevo."
            }
            LossReason::HardcoreMiss => "Fallaste en modo hardcore. La categoría se reinicia.",
            LossReason::FocusLost => {
                "Saliste de la ventana sin un comodín activo. La categoría se reinicia."
            }
        }
    }
}

/// Side effects requested by a command. The core never performs them; the
/// front-end decides how (and whether) to act on each.
#[derive(Clone, Debug, PartialEq)]
pub enum Intent {
    Celebrate,
    AutoSave,
    TimeExpired,
    CategoryComplete,
    RoundLost(LossReason),
}

#[derive(Clone, Debug, PartialEq)]
pub struct OptionView {
    pub text: String,
    pub disabled: bool,
}

/// Read-only view of the session for rendering. Recomputed on demand.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub difficulty: String,
    pub category_index: usize,
    pub category_name: String,
    pub question_number: usize,
    pub question_total: usize,
    pub lives: u32,
    pub unlimited_lives: bool,
    pub score: u32,
    pub prompt: Option<String>,
    pub options: Vec<OptionView>,
    pub bonus_round: bool,
    pub time_remaining: u32,
    pub timer_running: bool,
    pub grace_remaining: u32,
    pub power_ups: PowerUpCounts,
    pub message: String,
    pub category_complete: bool,
    pub can_save: bool,
}

/// The persisted shape of a run, stored under the save file's `estado` key.
/// Older save shapes omit the timer/power-up/difficulty fields; serde
/// defaults migrate them forward.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SavedState {
    #[serde(rename = "indice_categoria")]
    pub category_index: usize,
    #[serde(rename = "indice_pregunta")]
    pub question_cursor: usize,
    #[serde(rename = "vidas")]
    pub lives: u32,
    #[serde(rename = "puntaje")]
    pub score: u32,
    #[serde(rename = "orden_preguntas", default)]
    pub question_order: Vec<usize>,
    #[serde(rename = "tiempo_limite", default)]
    pub time_limit: u32,
    #[serde(rename = "tiempo_restante", default)]
    pub time_remaining: u32,
    #[serde(rename = "pregunta_especial", default)]
    pub bonus_round: bool,
    #[serde(rename = "comodines", default)]
    pub power_ups: PowerUpCounts,
    #[serde(rename = "dificultad", default = "default_difficulty_name")]
    pub difficulty: String,
}

fn default_difficulty_name() -> String {
    DEFAULT_DIFFICULTY.to_string()
}

/// All mutable game progress for one player run, advanced one command at a
/// time. Commands are synchronous; timers are adapter-owned one-second
/// ticks, and every wall-clock comparison takes `now` as an argument.
#[derive(Debug)]
pub struct Session {
    bank: QuestionBank,
    profile: DifficultyProfile,
    category_index: usize,
    question_cursor: usize,
    question_order: Vec<usize>,
    lives: u32,
    score: u32,
    power_ups: PowerUpCounts,
    current: Option<Question>,
    disabled_options: Vec<usize>,
    bonus_round: bool,
    time_limit: u32,
    time_remaining: u32,
    timer_running: bool,
    grace_deadline: Option<SystemTime>,
    grace_remaining: u32,
    focus_recheck: Option<SystemTime>,
    message: String,
}

impl Session {
    pub fn new(bank: QuestionBank) -> Self {
        Self::with_profile(bank, DifficultyProfile::default_profile().clone())
    }

    pub fn with_profile(bank: QuestionBank, profile: DifficultyProfile) -> Self {
        let mut session = Self {
            bank,
            lives: profile.starting_lives,
            power_ups: profile.power_ups,
            profile,
            category_index: 0,
            question_cursor: 0,
            question_order: Vec::new(),
            score: 0,
            current: None,
            disabled_options: Vec::new(),
            bonus_round: false,
            time_limit: 0,
            time_remaining: 0,
            timer_running: false,
            grace_deadline: None,
            grace_remaining: 0,
            focus_recheck: None,
            message: String::new(),
        };
        session.start_category(0);
        session
    }

    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }

    pub fn profile(&self) -> &DifficultyProfile {
        &self.profile
    }

    /// Switch the active difficulty. Lives, timers, and power-ups reset from
    /// the new profile; category and score are untouched.
    pub fn select_difficulty(&mut self, name: &str) -> Result<(), GameError> {
        let profile = DifficultyProfile::by_name(name)
            .ok_or_else(|| GameError::UnknownDifficulty(name.to_string()))?;
        debug!(difficulty = profile.name, "switching difficulty");
        self.profile = profile.clone();
        self.lives = profile.starting_lives;
        self.power_ups = profile.power_ups;
        self.clear_grace();
        if self.current.is_some() {
            self.time_limit = if self.bonus_round {
                profile.bonus_time_limit_secs
            } else {
                profile.normal_time_limit_secs
            };
            self.time_remaining = self.time_limit;
            self.timer_running = self.time_limit > 0;
        }
        Ok(())
    }

    /// Start a fresh run of the given category: full score/lives/power-up
    /// reset plus a new shuffle.
    pub fn select_category(&mut self, index: usize) -> Result<Vec<Intent>, GameError> {
        if index >= self.bank.categories().len() {
            return Err(GameError::IndexOutOfRange(index));
        }
        self.start_category(index);
        Ok(self.with_auto_save(Vec::new()))
    }

    pub fn new_game(&mut self) -> Vec<Intent> {
        self.start_category(0);
        self.with_auto_save(Vec::new())
    }

    /// Resolve an answer for the current question. An option that is not
    /// part of the question counts as a miss. There is no active question in
    /// the Category-Complete sub-state, so the command has no effect there.
    pub fn submit_answer(&mut self, option: &str) -> Vec<Intent> {
        let Some(question) = self.current.clone() else {
            return Vec::new();
        };
        self.timer_running = false;
        let correct = question.is_correct(option);
        self.resolve_round(&question, correct, false)
    }

    /// Timer expiry, reported by the adapter. Always a miss.
    pub fn on_timeout(&mut self) -> Vec<Intent> {
        let Some(question) = self.current.clone() else {
            return Vec::new();
        };
        self.timer_running = false;
        self.resolve_round(&question, false, true)
    }

    /// A hint derived from the correct answer. Silent no-op with no uses
    /// left; an error when no question is active.
    pub fn use_hint(&mut self) -> Result<Option<String>, GameError> {
        let question = self.current.as_ref().ok_or(GameError::NoActiveQuestion)?;
        let initial = question.answer.chars().next().unwrap_or('?');
        if !self.power_ups.spend(PowerUpKind::Hint) {
            return Ok(None);
        }
        let hint = format!("Pista: la respuesta comienza con «{initial}».");
        self.message = hint.clone();
        Ok(Some(hint))
    }

    /// Skip the current question. Does not count as right or wrong.
    pub fn use_skip(&mut self) -> Result<Vec<Intent>, GameError> {
        if self.current.is_none() {
            return Err(GameError::NoActiveQuestion);
        }
        if !self.power_ups.spend(PowerUpKind::Skip) {
            return Ok(Vec::new());
        }
        self.timer_running = false;
        self.question_cursor += 1;
        self.message = "Pregunta saltada.".to_string();
        self.draw_next();
        let mut intents = Vec::new();
        if self.current.is_none() {
            intents.push(Intent::CategoryComplete);
        }
        Ok(self.with_auto_save(intents))
    }

    /// Disable two random still-enabled incorrect options. No-op (counter
    /// untouched) when fewer than two are eligible or no uses remain.
    pub fn use_eliminate_two(&mut self) -> Result<(), GameError> {
        let eligible: Vec<usize> = {
            let question = self.current.as_ref().ok_or(GameError::NoActiveQuestion)?;
            question
                .wrong_option_indices()
                .into_iter()
                .filter(|idx| !self.disabled_options.contains(idx))
                .collect()
        };
        if eligible.len() < 2 || self.power_ups.remaining(PowerUpKind::EliminateTwo) == 0 {
            return Ok(());
        }
        self.power_ups.spend(PowerUpKind::EliminateTwo);
        let picked: Vec<usize> = eligible
            .choose_multiple(&mut rand::thread_rng(), 2)
            .copied()
            .collect();
        self.disabled_options.extend(picked);
        self.message = "Dos opciones incorrectas eliminadas.".to_string();
        Ok(())
    }

    /// Open the anti-cheat grace window: the player may leave the window
    /// without penalty until `now + GRACE_SECS`.
    pub fn use_investigate(&mut self, now: SystemTime) -> Result<(), GameError> {
        if self.current.is_none() {
            return Err(GameError::NoActiveQuestion);
        }
        if !self.power_ups.spend(PowerUpKind::Investigate) {
            return Ok(());
        }
        self.grace_deadline = Some(now + Duration::from_secs(GRACE_SECS));
        self.grace_remaining = GRACE_SECS as u32;
        self.message = format!("Puedes salir de la ventana durante {GRACE_SECS} segundos.");
        Ok(())
    }

    /// Focus left the presentation surface. Outside an active grace window
    /// this is an immediate round loss; inside it, a deferred re-check is
    /// armed that fires unless focus returns first.
    pub fn on_focus_lost(&mut self, now: SystemTime) -> Vec<Intent> {
        if !self.profile.anti_cheat_enabled || self.current.is_none() {
            return Vec::new();
        }
        let within_grace = self.grace_deadline.is_some_and(|deadline| now <= deadline);
        if within_grace {
            self.focus_recheck = Some(now + Duration::from_secs(FOCUS_RECHECK_SECS));
            Vec::new()
        } else {
            self.resolve_round_loss(LossReason::FocusLost)
        }
    }

    pub fn on_focus_returned(&mut self) {
        self.focus_recheck = None;
    }

    /// One-second tick from the adapter. Drives the round timer, the grace
    /// countdown, and the deferred focus re-check.
    pub fn on_tick(&mut self, now: SystemTime) -> Vec<Intent> {
        if let Some(deadline) = self.focus_recheck {
            if now > deadline {
                return self.resolve_round_loss(LossReason::FocusLost);
            }
        }
        if let Some(deadline) = self.grace_deadline {
            match deadline.duration_since(now) {
                Ok(left) => self.grace_remaining = left.as_secs().min(GRACE_SECS) as u32,
                Err(_) => {
                    self.grace_deadline = None;
                    self.grace_remaining = 0;
                }
            }
        }
        let mut intents = Vec::new();
        if self.timer_running && self.current.is_some() {
            self.time_remaining = self.time_remaining.saturating_sub(1);
            if self.time_remaining == 0 {
                self.timer_running = false;
                intents.push(Intent::TimeExpired);
            }
        }
        intents
    }

    /// Persist the run under a named slot. Fails on profiles that forbid
    /// saving.
    pub fn save(&self, store: &SaveStore, name: &str) -> Result<SaveRecord, GameError> {
        if !self.profile.can_save {
            return Err(GameError::SavingDisabled);
        }
        store.save(name, &self.to_saved_state())
    }

    pub fn to_saved_state(&self) -> SavedState {
        SavedState {
            category_index: self.category_index,
            question_cursor: self.question_cursor,
            lives: self.lives,
            score: self.score,
            question_order: self.question_order.clone(),
            time_limit: self.time_limit,
            time_remaining: self.time_remaining,
            bonus_round: self.bonus_round,
            power_ups: self.power_ups,
            difficulty: self.profile.name.to_string(),
        }
    }

    /// Rebuild a session from a persisted state. Unknown difficulty names
    /// fall back to the default profile; a stale question order (bank edited
    /// between runs) is discarded for a fresh shuffle.
    pub fn restore(bank: QuestionBank, state: &SavedState) -> Self {
        let profile = DifficultyProfile::by_name(&state.difficulty)
            .unwrap_or_else(DifficultyProfile::default_profile)
            .clone();
        let category_index = if state.category_index < bank.categories().len() {
            state.category_index
        } else {
            0
        };
        let question_count = bank.categories()[category_index].questions.len();
        let mut session = Self {
            bank,
            profile,
            category_index,
            question_cursor: state.question_cursor,
            question_order: state.question_order.clone(),
            lives: state.lives,
            score: state.score,
            power_ups: state.power_ups,
            current: None,
            disabled_options: Vec::new(),
            bonus_round: state.bonus_round,
            time_limit: state.time_limit,
            time_remaining: state.time_remaining,
            timer_running: false,
            grace_deadline: None,
            grace_remaining: 0,
            focus_recheck: None,
            message: "Partida cargada.".to_string(),
        };
        if session.question_order.len() != question_count {
            session.shuffle_order();
            session.question_cursor = session.question_cursor.min(question_count);
        }
        session.redraw_current();
        session
    }

    pub fn snapshot(&self) -> Snapshot {
        let category = &self.bank.categories()[self.category_index];
        let options = self
            .current
            .as_ref()
            .map(|question| {
                question
                    .options
                    .iter()
                    .enumerate()
                    .map(|(idx, text)| OptionView {
                        text: text.clone(),
                        disabled: self.disabled_options.contains(&idx),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Snapshot {
            difficulty: self.profile.name.to_string(),
            category_index: self.category_index,
            category_name: category.name.clone(),
            question_number: (self.question_cursor + 1).min(self.question_order.len()),
            question_total: self.question_order.len(),
            lives: self.lives,
            unlimited_lives: self.profile.unlimited_lives(),
            score: self.score,
            prompt: self.current.as_ref().map(|q| q.prompt.clone()),
            options,
            bonus_round: self.bonus_round,
            time_remaining: self.time_remaining,
            timer_running: self.timer_running,
            grace_remaining: self.grace_remaining,
            power_ups: self.power_ups,
            message: self.message.clone(),
            category_complete: self.current.is_none(),
            can_save: self.profile.can_save,
        }
    }

    fn start_category(&mut self, index: usize) {
        debug!(category = index, "starting category run");
        self.category_index = index;
        self.question_cursor = 0;
        self.lives = self.profile.starting_lives;
        self.score = 0;
        self.power_ups = self.profile.power_ups;
        self.timer_running = false;
        self.clear_grace();
        self.shuffle_order();
        self.message = PROMPT_MESSAGE.to_string();
        self.draw_next();
    }

    fn shuffle_order(&mut self) {
        let count = self.bank.categories()[self.category_index].questions.len();
        let mut order: Vec<usize> = (0..count).collect();
        order.shuffle(&mut rand::thread_rng());
        self.question_order = order;
    }

    fn resolve_round(
        &mut self,
        question: &Question,
        correct: bool,
        timed_out: bool,
    ) -> Vec<Intent> {
        let mut intents = Vec::new();
        if correct {
            self.score += POINTS_PER_ANSWER;
            if self.bonus_round
                && self.profile.bonus_life_reward > 0
                && !self.profile.unlimited_lives()
            {
                self.lives += self.profile.bonus_life_reward;
            }
            self.message = format!("✅ {}", question.feedback);
            intents.push(Intent::Celebrate);
        } else {
            if !self.profile.unlimited_lives() {
                self.lives = self.lives.saturating_sub(1);
            }
            let prefix = if timed_out {
                "⏰ Se acabó el tiempo."
            } else {
                "❌"
            };
            self.message = if self.profile.unlimited_lives() {
                format!("{prefix} {}", question.feedback)
            } else {
                format!(
                    "{prefix} {} Te quedan {} vidas.",
                    question.feedback, self.lives
                )
            };
        }
        self.question_cursor += 1;
        if !correct && self.profile.hardcore_on_wrong_answer {
            intents.extend(self.resolve_round_loss(LossReason::HardcoreMiss));
            return intents;
        }
        if !self.profile.unlimited_lives() && self.lives == 0 {
            intents.extend(self.resolve_round_loss(LossReason::LivesExhausted));
            return intents;
        }
        self.draw_next();
        if self.current.is_none() {
            intents.push(Intent::CategoryComplete);
        }
        self.with_auto_save(intents)
    }

    /// The uniform soft reset: stop every timer, reset the run, reshuffle,
    /// and draw again. Never terminates the program.
    fn resolve_round_loss(&mut self, reason: LossReason) -> Vec<Intent> {
        debug!(?reason, "round lost, resetting category run");
        self.timer_running = false;
        self.clear_grace();
        self.score = 0;
        self.question_cursor = 0;
        self.lives = self.profile.starting_lives;
        self.power_ups = self.profile.power_ups;
        self.shuffle_order();
        let intents = self.with_auto_save(vec![Intent::RoundLost(reason)]);
        self.draw_next();
        self.message = reason.message().to_string();
        intents
    }

    /// Draw the next question, rolling for a bonus round first. At the end
    /// of the shuffled order the session enters the Category-Complete
    /// sub-state instead.
    fn draw_next(&mut self) {
        self.disabled_options.clear();
        self.timer_running = false;
        if self.question_cursor >= self.question_order.len() {
            self.current = None;
            self.bonus_round = false;
            self.message = CATEGORY_COMPLETE_MESSAGE.to_string();
            return;
        }
        let mut rng = rand::thread_rng();
        let category = &self.bank.categories()[self.category_index];
        let bonus_pool = self.bank.bonus_pool(&category.name);
        let roll: f64 = rng.gen();
        if roll < self.profile.bonus_probability && !bonus_pool.is_empty() {
            self.bonus_round = true;
            self.current = bonus_pool.choose(&mut rng).cloned();
            self.time_limit = self.profile.bonus_time_limit_secs;
        } else {
            self.bonus_round = false;
            let question_index = self.question_order[self.question_cursor];
            self.current = Some(category.questions[question_index].clone());
            self.time_limit = self.profile.normal_time_limit_secs;
        }
        self.time_remaining = self.time_limit;
        self.timer_running = self.time_limit > 0;
    }

    /// Re-derive the current question after a restore without advancing the
    /// cursor or rolling a new bonus round.
    fn redraw_current(&mut self) {
        self.disabled_options.clear();
        if self.question_cursor >= self.question_order.len() {
            self.current = None;
            self.bonus_round = false;
            self.message = CATEGORY_COMPLETE_MESSAGE.to_string();
            return;
        }
        let category = &self.bank.categories()[self.category_index];
        let ordered = category
            .questions
            .get(self.question_order[self.question_cursor])
            .cloned();
        self.current = if self.bonus_round {
            let pool = self.bank.bonus_pool(&category.name);
            match pool.choose(&mut rand::thread_rng()) {
                Some(question) => Some(question.clone()),
                None => {
                    // Bonus pool emptied since the save; fall back to the order
                    self.bonus_round = false;
                    ordered
                }
            }
        } else {
            ordered
        };
        self.timer_running = self.current.is_some() && self.time_remaining > 0;
    }

    fn clear_grace(&mut self) {
        self.grace_deadline = None;
        self.grace_remaining = 0;
        self.focus_recheck = None;
    }

    fn with_auto_save(&self, mut intents: Vec<Intent>) -> Vec<Intent> {
        if self.profile.can_save {
            intents.push(Intent::AutoSave);
        }
        intents
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::Category;
    use assert_matches::assert_matches;
    use std::collections::HashMap;

    fn question(prompt: &str, answer: &str, wrong: &[&str], feedback: &str) -> Question {
        let mut options = vec![answer.to_string()];
        options.extend(wrong.iter().map(|w| w.to_string()));
        Question {
            prompt: prompt.to_string(),
            options,
            answer: answer.to_string(),
            feedback: feedback.to_string(),
        }
    }

    fn test_bank() -> QuestionBank {
        let questions = vec![
            question(
                "¿Capital de Perú?",
                "Lima",
                &["Cusco", "Arequipa"],
                "Lima es la capital.",
            ),
            question(
                "¿Capital de Chile?",
                "Santiago",
                &["Valparaíso"],
                "Santiago es la capital.",
            ),
            question(
                "¿Capital de Ecuador?",
                "Quito",
                &["Guayaquil"],
                "Quito es la capital.",
            ),
        ];
        let second = vec![question(
            "¿Capital de Bolivia?",
            "Sucre",
            &["La Paz"],
            "Sucre es la capital constitucional.",
        )];
        QuestionBank::from_parts(
            vec![
                Category {
                    name: "Capitales".into(),
                    description: "América del Sur".into(),
                    questions,
                },
                Category {
                    name: "Más capitales".into(),
                    description: String::new(),
                    questions: second,
                },
            ],
            vec![question("¿2 x 3?", "6", &["8"], "Multiplicación.")],
            HashMap::new(),
        )
    }

    fn no_bonus_profile() -> DifficultyProfile {
        DifficultyProfile {
            name: "prueba",
            starting_lives: 3,
            normal_time_limit_secs: 30,
            bonus_time_limit_secs: 15,
            bonus_probability: 0.0,
            bonus_life_reward: 1,
            anti_cheat_enabled: true,
            power_ups: PowerUpCounts::new(1, 1, 1, 1),
            can_save: true,
            hardcore_on_wrong_answer: false,
        }
    }

    fn always_bonus_profile() -> DifficultyProfile {
        DifficultyProfile {
            bonus_probability: 1.0,
            ..no_bonus_profile()
        }
    }

    fn correct_answer(session: &Session) -> String {
        let snapshot = session.snapshot();
        let prompt = snapshot.prompt.expect("question should be active");
        for category in session.bank().categories() {
            for q in &category.questions {
                if q.prompt == prompt {
                    return q.answer.clone();
                }
            }
        }
        for q in session.bank().bonus_pool("Capitales") {
            if q.prompt == prompt {
                return q.answer.clone();
            }
        }
        panic!("question not found in bank: {prompt}");
    }

    #[test]
    fn new_session_draws_a_question() {
        let session = Session::with_profile(test_bank(), no_bonus_profile());
        let snapshot = session.snapshot();

        assert!(snapshot.prompt.is_some());
        assert_eq!(snapshot.lives, 3);
        assert_eq!(snapshot.score, 0);
        assert!(snapshot.timer_running);
        assert_eq!(snapshot.time_remaining, 30);
        assert!(!snapshot.category_complete);
    }

    #[test]
    fn question_order_is_a_permutation() {
        let session = Session::with_profile(test_bank(), no_bonus_profile());
        let mut order = session.question_order.clone();
        order.sort_unstable();

        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn correct_answer_scores_and_celebrates() {
        let mut session = Session::with_profile(test_bank(), no_bonus_profile());
        let answer = correct_answer(&session);

        let intents = session.submit_answer(&answer);

        assert!(intents.contains(&Intent::Celebrate));
        assert!(intents.contains(&Intent::AutoSave));
        assert_eq!(session.snapshot().score, 10);
        assert_eq!(session.snapshot().lives, 3);
    }

    #[test]
    fn wrong_answer_costs_a_life() {
        let mut session = Session::with_profile(test_bank(), no_bonus_profile());

        let intents = session.submit_answer("no existe esta opción");

        assert!(!intents.contains(&Intent::Celebrate));
        assert_eq!(session.snapshot().lives, 2);
        assert_eq!(session.snapshot().score, 0);
    }

    #[test]
    fn unlimited_lives_never_decrement() {
        let profile = DifficultyProfile {
            starting_lives: 0,
            ..no_bonus_profile()
        };
        let mut session = Session::with_profile(test_bank(), profile);

        session.submit_answer("mal");
        session.submit_answer("mal");

        let snapshot = session.snapshot();
        assert_eq!(snapshot.lives, 0);
        assert!(snapshot.unlimited_lives);
        assert!(!snapshot.message.contains("vidas"));
    }

    #[test]
    fn losing_all_lives_soft_resets_the_run() {
        let mut session = Session::with_profile(test_bank(), no_bonus_profile());

        session.submit_answer("mal");
        session.submit_answer("mal");
        let intents = session.submit_answer("mal");

        assert!(intents.contains(&Intent::RoundLost(LossReason::LivesExhausted)));
        let snapshot = session.snapshot();
        assert_eq!(snapshot.lives, 3);
        assert_eq!(snapshot.score, 0);
        assert_eq!(snapshot.question_number, 1);
        assert!(snapshot.prompt.is_some());
        assert_eq!(snapshot.power_ups, PowerUpCounts::new(1, 1, 1, 1));
    }

    #[test]
    fn hardcore_miss_resets_regardless_of_lives() {
        let profile = DifficultyProfile {
            starting_lives: 5,
            hardcore_on_wrong_answer: true,
            ..no_bonus_profile()
        };
        let mut session = Session::with_profile(test_bank(), profile);

        let intents = session.submit_answer("mal");

        assert!(intents.contains(&Intent::RoundLost(LossReason::HardcoreMiss)));
        assert_eq!(session.snapshot().lives, 5);
        assert_eq!(session.snapshot().score, 0);
    }

    #[test]
    fn completing_the_category_stops_the_run() {
        let mut session = Session::with_profile(test_bank(), no_bonus_profile());

        for _ in 0..3 {
            let answer = correct_answer(&session);
            session.submit_answer(&answer);
        }

        let snapshot = session.snapshot();
        assert!(snapshot.category_complete);
        assert!(snapshot.prompt.is_none());
        assert!(!snapshot.timer_running);
        assert_eq!(snapshot.score, 30);
        // Gameplay commands have no effect in this sub-state
        assert!(session.submit_answer("Lima").is_empty());
        assert!(session.on_timeout().is_empty());
    }

    #[test]
    fn select_category_resets_progress() {
        let mut session = Session::with_profile(test_bank(), no_bonus_profile());
        let answer = correct_answer(&session);
        session.submit_answer(&answer);
        assert_eq!(session.snapshot().score, 10);

        session.select_category(1).unwrap();

        let snapshot = session.snapshot();
        assert_eq!(snapshot.category_index, 1);
        assert_eq!(snapshot.score, 0);
        assert_eq!(snapshot.lives, 3);
        assert_eq!(snapshot.question_total, 1);
    }

    #[test]
    fn select_category_out_of_range_fails() {
        let mut session = Session::with_profile(test_bank(), no_bonus_profile());

        assert_matches!(
            session.select_category(7),
            Err(GameError::IndexOutOfRange(7))
        );
    }

    #[test]
    fn select_difficulty_keeps_category_and_score() {
        let mut session = Session::with_profile(test_bank(), no_bonus_profile());
        session.select_category(1).unwrap();
        let answer = correct_answer(&session);
        session.submit_answer(&answer);

        session.select_difficulty("dificil").unwrap();

        let snapshot = session.snapshot();
        assert_eq!(snapshot.difficulty, "dificil");
        assert_eq!(snapshot.category_index, 1);
        assert_eq!(snapshot.score, 10);
        assert_eq!(snapshot.lives, 3);
    }

    #[test]
    fn select_unknown_difficulty_fails() {
        let mut session = Session::with_profile(test_bank(), no_bonus_profile());

        assert_matches!(
            session.select_difficulty("imposible"),
            Err(GameError::UnknownDifficulty(_))
        );
    }

    #[test]
    fn bonus_round_uses_bonus_pool_and_timer() {
        let session = Session::with_profile(test_bank(), always_bonus_profile());
        let snapshot = session.snapshot();

        assert!(snapshot.bonus_round);
        assert_eq!(snapshot.time_remaining, 15);
        assert_eq!(snapshot.prompt.as_deref(), Some("¿2 x 3?"));
    }

    #[test]
    fn bonus_reward_grants_extra_life() {
        let mut session = Session::with_profile(test_bank(), always_bonus_profile());

        session.submit_answer("6");

        assert_eq!(session.snapshot().lives, 4);
        assert_eq!(session.snapshot().score, 10);
    }

    #[test]
    fn timeout_is_always_a_miss() {
        let mut session = Session::with_profile(test_bank(), no_bonus_profile());

        let intents = session.on_timeout();

        assert!(!intents.contains(&Intent::Celebrate));
        assert_eq!(session.snapshot().lives, 2);
        assert_eq!(session.snapshot().score, 0);
    }

    #[test]
    fn tick_counts_down_and_reports_expiry() {
        let mut session = Session::with_profile(test_bank(), no_bonus_profile());
        let now = SystemTime::now();

        for _ in 0..29 {
            assert!(session.on_tick(now).is_empty());
        }
        let intents = session.on_tick(now);

        assert_eq!(intents, vec![Intent::TimeExpired]);
        assert!(!session.snapshot().timer_running);
        // The timer is stopped; further ticks stay silent
        assert!(session.on_tick(now).is_empty());
    }

    #[test]
    fn hint_spends_one_use_then_noops() {
        let mut session = Session::with_profile(test_bank(), no_bonus_profile());

        let hint = session.use_hint().unwrap();
        assert!(hint.is_some());
        assert_eq!(session.snapshot().power_ups.hint, 0);

        let again = session.use_hint().unwrap();
        assert!(again.is_none());
        assert_eq!(session.snapshot().power_ups.hint, 0);
    }

    #[test]
    fn hint_names_the_answers_first_character() {
        let mut session = Session::with_profile(test_bank(), no_bonus_profile());
        let answer = correct_answer(&session);
        let initial = answer.chars().next().unwrap();

        let hint = session.use_hint().unwrap().unwrap();

        assert!(hint.contains(initial));
    }

    #[test]
    fn skip_advances_without_touching_lives_or_score() {
        let mut session = Session::with_profile(test_bank(), no_bonus_profile());

        session.use_skip().unwrap();

        let snapshot = session.snapshot();
        assert_eq!(snapshot.lives, 3);
        assert_eq!(snapshot.score, 0);
        assert_eq!(snapshot.question_number, 2);
        assert_eq!(snapshot.power_ups.skip, 0);
    }

    #[test]
    fn eliminate_two_disables_two_wrong_options() {
        let mut session = Session::with_profile(test_bank(), no_bonus_profile());
        // Land on the three-option question so two wrong options exist
        while session.snapshot().options.len() < 3 {
            let answer = correct_answer(&session);
            session.submit_answer(&answer);
        }

        session.use_eliminate_two().unwrap();

        let snapshot = session.snapshot();
        let answer = correct_answer(&session);
        let disabled: Vec<_> = snapshot.options.iter().filter(|o| o.disabled).collect();
        assert_eq!(disabled.len(), 2);
        assert!(disabled.iter().all(|o| o.text != answer));
        assert_eq!(snapshot.power_ups.eliminate, 0);
    }

    #[test]
    fn eliminate_two_noops_with_a_single_wrong_option() {
        let mut session = Session::with_profile(test_bank(), no_bonus_profile());
        // Land on a two-option question: one wrong option only
        while session.snapshot().options.len() != 2 {
            let answer = correct_answer(&session);
            session.submit_answer(&answer);
        }

        session.use_eliminate_two().unwrap();

        assert_eq!(session.snapshot().power_ups.eliminate, 1);
        assert!(session.snapshot().options.iter().all(|o| !o.disabled));
    }

    #[test]
    fn power_ups_error_without_an_active_question() {
        let mut session = Session::with_profile(test_bank(), no_bonus_profile());
        for _ in 0..3 {
            let answer = correct_answer(&session);
            session.submit_answer(&answer);
        }
        assert!(session.snapshot().category_complete);

        assert_matches!(session.use_hint(), Err(GameError::NoActiveQuestion));
        assert_matches!(session.use_skip(), Err(GameError::NoActiveQuestion));
        assert_matches!(session.use_eliminate_two(), Err(GameError::NoActiveQuestion));
    }

    #[test]
    fn focus_loss_without_grace_resets_the_run() {
        let mut session = Session::with_profile(test_bank(), no_bonus_profile());
        session.submit_answer("mal");
        assert_eq!(session.snapshot().lives, 2);

        let intents = session.on_focus_lost(SystemTime::now());

        assert!(intents.contains(&Intent::RoundLost(LossReason::FocusLost)));
        assert_eq!(session.snapshot().lives, 3);
        assert_eq!(session.snapshot().score, 0);
    }

    #[test]
    fn focus_loss_is_ignored_without_anti_cheat() {
        let profile = DifficultyProfile {
            anti_cheat_enabled: false,
            ..no_bonus_profile()
        };
        let mut session = Session::with_profile(test_bank(), profile);

        let intents = session.on_focus_lost(SystemTime::now());

        assert!(intents.is_empty());
    }

    #[test]
    fn grace_window_tolerates_focus_loss() {
        let mut session = Session::with_profile(test_bank(), no_bonus_profile());
        let now = SystemTime::now();
        session.use_investigate(now).unwrap();

        let intents = session.on_focus_lost(now + Duration::from_secs(5));

        assert!(intents.is_empty());
        assert_eq!(session.snapshot().power_ups.investigate, 0);
    }

    #[test]
    fn focus_loss_after_grace_expiry_is_a_loss() {
        let mut session = Session::with_profile(test_bank(), no_bonus_profile());
        let now = SystemTime::now();
        session.use_investigate(now).unwrap();

        let after = now + Duration::from_secs(GRACE_SECS + 1);
        let intents = session.on_focus_lost(after);

        assert!(intents.contains(&Intent::RoundLost(LossReason::FocusLost)));
    }

    #[test]
    fn deferred_recheck_fires_when_focus_never_returns() {
        let mut session = Session::with_profile(test_bank(), no_bonus_profile());
        let now = SystemTime::now();
        session.use_investigate(now).unwrap();
        assert!(session.on_focus_lost(now).is_empty());

        let later = now + Duration::from_secs(FOCUS_RECHECK_SECS + 1);
        let intents = session.on_tick(later);

        assert!(intents.contains(&Intent::RoundLost(LossReason::FocusLost)));
    }

    #[test]
    fn returning_focus_cancels_the_recheck() {
        let mut session = Session::with_profile(test_bank(), no_bonus_profile());
        let now = SystemTime::now();
        session.use_investigate(now).unwrap();
        session.on_focus_lost(now);
        session.on_focus_returned();

        let later = now + Duration::from_secs(FOCUS_RECHECK_SECS + 5);
        let intents = session.on_tick(later);

        assert!(!intents
            .iter()
            .any(|i| matches!(i, Intent::RoundLost(LossReason::FocusLost))));
    }

    #[test]
    fn saved_state_round_trips_through_restore() {
        // A registered profile, so the difficulty name survives the trip
        let profile = DifficultyProfile::by_name("dificil").unwrap().clone();
        let mut session = Session::with_profile(test_bank(), profile);
        let answer = correct_answer(&session);
        session.submit_answer(&answer);
        session.use_hint().unwrap();
        let state = session.to_saved_state();

        let restored = Session::restore(test_bank(), &state);

        assert_eq!(restored.to_saved_state(), state);
    }

    #[test]
    fn restore_discards_a_stale_question_order() {
        let mut state = Session::with_profile(test_bank(), no_bonus_profile()).to_saved_state();
        state.question_order = vec![0, 1, 2, 3, 4, 5];
        state.question_cursor = 6;
        state.difficulty = "prueba inexistente".to_string();

        let restored = Session::restore(test_bank(), &state);
        let snapshot = restored.snapshot();

        assert_eq!(snapshot.question_total, 3);
        assert_eq!(snapshot.difficulty, "normal");
        assert!(snapshot.category_complete);
    }

    #[test]
    fn old_save_shapes_migrate_with_defaults() {
        let json = r#"{
            "indice_categoria": 0,
            "indice_pregunta": 1,
            "vidas": 2,
            "puntaje": 10
        }"#;

        let state: SavedState = serde_json::from_str(json).unwrap();

        assert_eq!(state.question_order, Vec::<usize>::new());
        assert_eq!(state.power_ups, PowerUpCounts::default());
        assert_eq!(state.difficulty, "normal");
        assert!(!state.bonus_round);
    }
}
