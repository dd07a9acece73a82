//! Onboarding questionnaire
//!
//! Six fixed questions answered strictly in order. The wizard only ever moves one
//! step forward or back; going back never discards an answer.

use crate::{
    error::{ClientError, ClientResult},
    models::{BudgetRange, ExperienceLevel, MultiField, PreferenceDocument, SingleChoice},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SingleField {
    ExperienceLevel,
    BudgetRange,
}

impl SingleField {
    /// `(value, label)` pairs in display order
    pub fn options(&self) -> Vec<(&'static str, &'static str)> {
        match self {
            SingleField::ExperienceLevel => ExperienceLevel::ALL
                .iter()
                .map(|level| (level.as_str(), level.label()))
                .collect(),
            SingleField::BudgetRange => BudgetRange::ALL
                .iter()
                .map(|range| (range.as_str(), range.label()))
                .collect(),
        }
    }

    /// Parses a wire value into a choice for this field
    pub fn choice(&self, value: &str) -> ClientResult<SingleChoice> {
        match self {
            SingleField::ExperienceLevel => value.parse().map(SingleChoice::Experience),
            SingleField::BudgetRange => value.parse().map(SingleChoice::Budget),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionKind {
    MultiSelect(MultiField),
    SingleSelect(SingleField),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Question {
    pub title: &'static str,
    pub subtitle: &'static str,
    pub kind: QuestionKind,
}

pub const QUESTIONS: [Question; 6] = [
    Question {
        title: "What movie genres do you enjoy?",
        subtitle: "Select all that apply",
        kind: QuestionKind::MultiSelect(MultiField::MovieGenres),
    },
    Question {
        title: "What music genres do you listen to?",
        subtitle: "Select all that apply",
        kind: QuestionKind::MultiSelect(MultiField::MusicGenres),
    },
    Question {
        title: "What do you usually shop for?",
        subtitle: "Select your main interests",
        kind: QuestionKind::MultiSelect(MultiField::ShoppingInterests),
    },
    Question {
        title: "What topics would you like to learn?",
        subtitle: "Select areas of interest",
        kind: QuestionKind::MultiSelect(MultiField::LearningTopics),
    },
    Question {
        title: "How would you describe your overall experience with online platforms?",
        subtitle: "Choose one",
        kind: QuestionKind::SingleSelect(SingleField::ExperienceLevel),
    },
    Question {
        title: "What's your typical spending preference?",
        subtitle: "For products and services",
        kind: QuestionKind::SingleSelect(SingleField::BudgetRange),
    },
];

const LAST_STEP: usize = QUESTIONS.len() - 1;

/// Result of asking the wizard to move forward
#[derive(Debug, Clone, PartialEq)]
pub enum WizardStep {
    /// Current question is unanswered; nothing changed
    Blocked,
    /// Moved to the given step
    Advanced(usize),
    /// Last question answered; the finished document
    Completed(PreferenceDocument),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OnboardingWizard {
    step: usize,
    responses: PreferenceDocument,
}

impl OnboardingWizard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wizard pre-filled with existing answers, starting at the first question
    pub fn with_responses(responses: PreferenceDocument) -> Self {
        Self { step: 0, responses }
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn question(&self) -> &'static Question {
        &QUESTIONS[self.step]
    }

    pub fn responses(&self) -> &PreferenceDocument {
        &self.responses
    }

    pub fn is_last(&self) -> bool {
        self.step == LAST_STEP
    }

    /// Completion shown to the user, counting the current question as done
    pub fn progress_percent(&self) -> u8 {
        (((self.step + 1) * 100) as f64 / QUESTIONS.len() as f64).round() as u8
    }

    /// Whether question `step` has an acceptable answer
    pub fn is_answered(&self, step: usize) -> bool {
        match QUESTIONS.get(step).map(|q| q.kind) {
            Some(QuestionKind::MultiSelect(field)) => !self.responses.selections(field).is_empty(),
            // Both single-select questions carry a default answer
            Some(QuestionKind::SingleSelect(_)) => true,
            None => false,
        }
    }

    pub fn can_proceed(&self) -> bool {
        self.is_answered(self.step)
    }

    /// Toggles an option of the current multi-select question
    pub fn toggle_option(&mut self, value: &str) -> ClientResult<bool> {
        match self.question().kind {
            QuestionKind::MultiSelect(field) => self.responses.toggle(field, value),
            QuestionKind::SingleSelect(_) => Err(ClientError::InvalidInput(
                "Current question accepts a single answer".to_string(),
            )),
        }
    }

    /// Answers the current single-select question
    pub fn select(&mut self, value: &str) -> ClientResult<()> {
        match self.question().kind {
            QuestionKind::SingleSelect(field) => {
                self.responses.set_single(field.choice(value)?);
                Ok(())
            }
            QuestionKind::MultiSelect(_) => Err(ClientError::InvalidInput(
                "Current question accepts multiple answers".to_string(),
            )),
        }
    }

    pub fn next(&mut self) -> WizardStep {
        if !self.can_proceed() {
            tracing::debug!(step = self.step, "Onboarding step not answered yet");
            return WizardStep::Blocked;
        }
        if self.is_last() {
            tracing::info!("Onboarding questionnaire completed");
            return WizardStep::Completed(self.responses.clone());
        }
        self.step += 1;
        WizardStep::Advanced(self.step)
    }

    /// Moves one question back; no-op on the first question
    pub fn back(&mut self) -> usize {
        self.step = self.step.saturating_sub(1);
        self.step
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer_current(wizard: &mut OnboardingWizard) {
        if let QuestionKind::MultiSelect(field) = wizard.question().kind {
            if wizard.responses().selections(field).is_empty() {
                wizard.toggle_option(field.options()[0]).unwrap();
            }
        }
    }

    #[test]
    fn test_cannot_proceed_without_selection() {
        let mut wizard = OnboardingWizard::new();
        assert!(!wizard.can_proceed());
        assert_eq!(wizard.next(), WizardStep::Blocked);
        assert_eq!(wizard.step(), 0);
    }

    #[test]
    fn test_deselecting_last_option_blocks_again() {
        let mut wizard = OnboardingWizard::new();
        wizard.toggle_option("Action").unwrap();
        assert!(wizard.can_proceed());
        wizard.toggle_option("Action").unwrap();
        assert!(!wizard.can_proceed());
    }

    #[test]
    fn test_single_select_steps_always_satisfied() {
        let wizard = OnboardingWizard::new();
        assert!(wizard.is_answered(4));
        assert!(wizard.is_answered(5));
        assert!(!wizard.is_answered(6));
    }

    #[test]
    fn test_back_on_first_step_is_noop() {
        let mut wizard = OnboardingWizard::new();
        assert_eq!(wizard.back(), 0);
        assert_eq!(wizard.step(), 0);
    }

    #[test]
    fn test_back_then_forward_preserves_answers() {
        let mut wizard = OnboardingWizard::new();
        wizard.toggle_option("Drama").unwrap();
        assert_eq!(wizard.next(), WizardStep::Advanced(1));
        wizard.toggle_option("Jazz").unwrap();
        assert_eq!(wizard.next(), WizardStep::Advanced(2));
        let snapshot = wizard.responses().clone();

        wizard.back();
        wizard.back();
        assert_eq!(wizard.step(), 0);
        assert_eq!(wizard.responses(), &snapshot);

        assert_eq!(wizard.next(), WizardStep::Advanced(1));
        assert_eq!(wizard.next(), WizardStep::Advanced(2));
        assert_eq!(wizard.responses(), &snapshot);
    }

    #[test]
    fn test_arbitrary_navigation_stays_in_bounds() {
        let mut wizard = OnboardingWizard::new();
        // Deterministic pseudo-random walk over next/back
        let mut seed: u32 = 0x2545_f491;
        for _ in 0..500 {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            if seed % 3 == 0 {
                wizard.back();
            } else {
                answer_current(&mut wizard);
                wizard.next();
            }
            assert!(wizard.step() <= LAST_STEP);
        }
    }

    #[test]
    fn test_full_walkthrough_emits_selected_document() {
        let mut wizard = OnboardingWizard::new();
        wizard.toggle_option("Action").unwrap();
        wizard.toggle_option("Comedy").unwrap();
        wizard.next();
        wizard.toggle_option("Rock").unwrap();
        wizard.next();
        wizard.toggle_option("Books").unwrap();
        wizard.next();
        wizard.toggle_option("Programming").unwrap();
        wizard.next();
        wizard.select("intermediate").unwrap();
        wizard.next();
        assert!(wizard.is_last());
        assert_eq!(wizard.progress_percent(), 100);

        match wizard.next() {
            WizardStep::Completed(doc) => {
                let genres: Vec<&str> = doc.favorite_movie_genres.iter().map(String::as_str).collect();
                assert_eq!(genres, vec!["Action", "Comedy"]);
                assert_eq!(doc.experience_level, ExperienceLevel::Intermediate);
                assert_eq!(doc.budget_range, BudgetRange::Medium);
            }
            other => panic!("expected completion, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_answer_kind_is_rejected() {
        let mut wizard = OnboardingWizard::new();
        assert!(wizard.select("beginner").is_err());

        let mut wizard = OnboardingWizard::with_responses(PreferenceDocument {
            favorite_movie_genres: ["Drama".to_string()].into(),
            favorite_music_genres: ["Pop".to_string()].into(),
            shopping_interests: ["Toys".to_string()].into(),
            learning_topics: ["Finance".to_string()].into(),
            ..PreferenceDocument::default()
        });
        for _ in 0..4 {
            wizard.next();
        }
        assert_eq!(wizard.step(), 4);
        assert!(wizard.toggle_option("Action").is_err());
        assert!(wizard.select("expert").is_err());
    }

    #[test]
    fn test_progress_percent() {
        let wizard = OnboardingWizard::new();
        assert_eq!(wizard.progress_percent(), 17);
    }
}
