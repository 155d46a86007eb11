//! Editable form state for steps and projects, and its conversion to store input.
//!
//! Text fields hold exactly what the user typed. Blank optional fields
//! become `None`; dates are parsed only when the form is submitted.

use time::Date;

use crate::config::{DefaultsConfig, VocabularyConfig};
use crate::core::db::{
    CurrentStepDetails, NewProject, NewStep, StepStatus, StepUpdate, TimelineStep, format_date,
    parse_date,
};
use crate::error::ValidationError;

/// A value picked from a suggested list, or typed in after choosing "other".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VocabularyChoice {
    pub selected: String,
    pub custom: String,
}

impl VocabularyChoice {
    pub fn from_value(value: Option<&str>, options: &[String], other_label: &str) -> Self {
        match value {
            None => Self::default(),
            Some(value) if options.iter().any(|o| o == value) => Self {
                selected: value.to_string(),
                custom: String::new(),
            },
            Some(value) => Self {
                selected: other_label.to_string(),
                custom: value.to_string(),
            },
        }
    }

    pub fn resolve(&self, other_label: &str) -> Option<String> {
        let value = if self.selected == other_label {
            &self.custom
        } else {
            &self.selected
        };
        non_blank(value)
    }
}

#[derive(Debug, Clone, Default)]
pub struct StepForm {
    pub title: String,
    pub status: StepStatus,
    pub is_current: bool,
    pub top_annotation: String,
    pub bottom_annotation: String,
    pub agency: VocabularyChoice,
    pub sector: VocabularyChoice,
    pub start_date: String,
    pub completion_forecast: String,
}

impl StepForm {
    pub fn from_step(step: &TimelineStep, vocabulary: &VocabularyConfig) -> Self {
        let other = &vocabulary.other_label;
        Self {
            title: step.title.clone(),
            status: step.status,
            is_current: step.is_current,
            top_annotation: step.top_annotation.clone().unwrap_or_default(),
            bottom_annotation: step.bottom_annotation.clone().unwrap_or_default(),
            agency: VocabularyChoice::from_value(
                step.responsible_agency.as_deref(),
                &vocabulary.agencies,
                other,
            ),
            sector: VocabularyChoice::from_value(
                step.responsible_sector.as_deref(),
                &vocabulary.sectors,
                other,
            ),
            start_date: step.start_date.map(format_date).unwrap_or_default(),
            completion_forecast: step.completion_forecast.map(format_date).unwrap_or_default(),
        }
    }

    pub fn to_new_step(&self, other_label: &str) -> Result<NewStep, ValidationError> {
        let step = NewStep {
            title: self.title.trim().to_string(),
            status: self.status,
            is_current: self.is_current,
            top_annotation: non_blank(&self.top_annotation),
            bottom_annotation: non_blank(&self.bottom_annotation),
            responsible_agency: self.agency.resolve(other_label),
            responsible_sector: self.sector.resolve(other_label),
            start_date: optional_date(&self.start_date)?,
            completion_forecast: optional_date(&self.completion_forecast)?,
        };
        step.validate()?;
        Ok(step)
    }

    /// Every field of the form, with blank fields clearing the stored value.
    pub fn to_update(&self, other_label: &str) -> Result<StepUpdate, ValidationError> {
        let update = StepUpdate {
            title: Some(self.title.trim().to_string()),
            status: Some(self.status),
            is_current: Some(self.is_current),
            top_annotation: Some(non_blank(&self.top_annotation)),
            bottom_annotation: Some(non_blank(&self.bottom_annotation)),
            responsible_agency: Some(self.agency.resolve(other_label)),
            responsible_sector: Some(self.sector.resolve(other_label)),
            start_date: Some(optional_date(&self.start_date)?),
            completion_forecast: Some(optional_date(&self.completion_forecast)?),
        };
        update.validate()?;
        Ok(update)
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewProjectForm {
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub responsible: String,
    pub deadline: String,
}

impl NewProjectForm {
    pub fn to_new_project(&self, defaults: &DefaultsConfig) -> Result<NewProject, ValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        let current_step_details = non_blank(&self.responsible).map(|responsible| CurrentStepDetails {
            responsible,
            deadline: self.deadline.trim().to_string(),
            notes: defaults.started_notes.clone(),
        });
        Ok(NewProject {
            title: title.to_string(),
            description: self.description.trim().to_string(),
            image_url: non_blank(&self.image_url).or_else(|| non_blank(&defaults.image_url)),
            current_step_details,
            steps: defaults
                .steps
                .iter()
                .map(|step| NewStep {
                    title: step.title.clone(),
                    status: step.status,
                    is_current: step.current,
                    ..Default::default()
                })
                .collect(),
        })
    }
}

fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn optional_date(value: &str) -> Result<Option<Date>, ValidationError> {
    match value.trim() {
        "" => Ok(None),
        value => parse_date(value).map(Some),
    }
}
