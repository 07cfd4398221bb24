//! WizardController: step state machine over the simple and full tracks.

use std::collections::BTreeSet;

use crate::form::fields::{fields_for_step, FIELDS};
use crate::form::FormValues;
pub use crate::form::WizardMode;

/// Result of pressing Next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// Moved to the next step.
    Moved,
    /// Required inputs on the current step are empty; state unchanged.
    Blocked(Vec<&'static str>),
    /// The current step is the end of the simple track; the caller should save.
    SaveRequested,
    /// Nothing to do here (no mode, or already on the last step).
    Ignored,
}

/// Primary action shown for the current step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionButton {
    Next,
    Save,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WizardController {
    mode: Option<WizardMode>,
    step: u8,
    invalid: BTreeSet<&'static str>,
}

impl WizardController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Option<WizardMode> {
        self.mode
    }

    pub fn step(&self) -> u8 {
        self.step
    }

    pub fn last_step(&self) -> u8 {
        self.mode.map_or(0, |m| m.last_step())
    }

    /// Pick a track from the welcome page. Ignored once a track is chosen.
    pub fn select_mode(&mut self, mode: WizardMode) -> bool {
        if self.mode.is_some() {
            return false;
        }
        self.mode = Some(mode);
        self.step = 1;
        self.invalid.clear();
        true
    }

    pub fn advance(&mut self, form: &FormValues) -> AdvanceOutcome {
        let Some(mode) = self.mode else {
            return AdvanceOutcome::Ignored;
        };
        if mode == WizardMode::Full && self.step >= mode.last_step() {
            return AdvanceOutcome::Ignored;
        }

        let missing = self.missing_required(mode, form);
        self.invalid = missing.iter().copied().collect();
        if !missing.is_empty() {
            return AdvanceOutcome::Blocked(missing);
        }

        if mode == WizardMode::Simple {
            return AdvanceOutcome::SaveRequested;
        }
        self.step += 1;
        AdvanceOutcome::Moved
    }

    /// Validate the last step before saving. Returns the empty required inputs, if any.
    pub fn check_current_step(&mut self, form: &FormValues) -> Vec<&'static str> {
        let Some(mode) = self.mode else {
            return Vec::new();
        };
        let missing = self.missing_required(mode, form);
        self.invalid = missing.iter().copied().collect();
        missing
    }

    /// Required inputs of the chosen track that are empty, across every step. Used before a
    /// save so a jump back over a page cannot leave an unchecked required input behind.
    pub fn missing_anywhere(&self, form: &FormValues) -> Vec<&'static str> {
        let Some(mode) = self.mode else {
            return Vec::new();
        };
        FIELDS
            .iter()
            .filter(|f| f.mode == mode && f.required && form.is_visible(f))
            .filter(|f| form.is_blank(f.form_key))
            .map(|f| f.form_key)
            .collect()
    }

    fn missing_required(&self, mode: WizardMode, form: &FormValues) -> Vec<&'static str> {
        fields_for_step(mode, self.step)
            .filter(|f| f.required && form.is_visible(f))
            .filter(|f| form.is_blank(f.form_key))
            .map(|f| f.form_key)
            .collect()
    }

    pub fn retreat(&mut self) {
        match self.step {
            0 => {}
            1 => self.reset(),
            _ => {
                self.step -= 1;
                self.invalid.clear();
            }
        }
    }

    /// Jump back to an already-visited step.
    pub fn jump_to(&mut self, step: u8) -> bool {
        if step >= 1 && step < self.step {
            self.step = step;
            self.invalid.clear();
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Completed fraction in `[0, 1]`; zero before a track is chosen.
    pub fn progress(&self) -> f64 {
        match self.mode {
            Some(mode) => f64::from(self.step) / f64::from(mode.last_step()),
            None => 0.0,
        }
    }

    pub fn action_button(&self) -> Option<ActionButton> {
        let mode = self.mode?;
        if self.step == 0 {
            None
        } else if self.step == mode.last_step() {
            Some(ActionButton::Save)
        } else {
            Some(ActionButton::Next)
        }
    }

    pub fn shows_back(&self) -> bool {
        self.step >= 1
    }

    pub fn is_invalid(&self, form_key: &str) -> bool {
        self.invalid.contains(form_key)
    }

    /// Form keys required under the chosen track. Inputs of the other track are not required.
    pub fn required_fields(&self) -> Vec<&'static str> {
        let Some(mode) = self.mode else {
            return Vec::new();
        };
        FIELDS
            .iter()
            .filter(|f| f.mode == mode && f.required)
            .map(|f| f.form_key)
            .collect()
    }
}
