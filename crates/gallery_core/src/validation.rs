use std::fmt;

use shared::domain::ImageFormat;
use thiserror::Error;

use crate::draft::{FileBlob, UploadDraft};

/// Files must be strictly smaller than 10 MiB.
pub const MAX_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
pub const TITLE_MIN_CHARS: usize = 2;
pub const TITLE_MAX_CHARS: usize = 20;
pub const DESCRIPTION_MAX_CHARS: usize = 65;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DraftField {
    File,
    Title,
    Description,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleProblem {
    Empty,
    TooShort { chars: usize },
    TooLong { chars: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptionProblem {
    Empty,
    TooLong { chars: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationFailure {
    #[error("A file is required")]
    MissingFile,
    #[error("The file must be smaller than 10MB ({size_bytes} bytes given)")]
    FileTooLarge { size_bytes: u64 },
    #[error("Unsupported image format '{mime_type}'; use JPEG, PNG or GIF")]
    UnsupportedFormat { mime_type: String },
    #[error("{}", title_message(.0))]
    InvalidTitle(TitleProblem),
    #[error("{}", description_message(.0))]
    InvalidDescription(DescriptionProblem),
}

impl ValidationFailure {
    pub fn field(&self) -> DraftField {
        match self {
            Self::MissingFile | Self::FileTooLarge { .. } | Self::UnsupportedFormat { .. } => {
                DraftField::File
            }
            Self::InvalidTitle(_) => DraftField::Title,
            Self::InvalidDescription(_) => DraftField::Description,
        }
    }
}

fn title_message(problem: &TitleProblem) -> String {
    match problem {
        TitleProblem::Empty => "Title is required".to_string(),
        TitleProblem::TooShort { .. } => {
            format!("Title must have at least {TITLE_MIN_CHARS} characters")
        }
        TitleProblem::TooLong { .. } => {
            format!("Title must have at most {TITLE_MAX_CHARS} characters")
        }
    }
}

fn description_message(problem: &DescriptionProblem) -> String {
    match problem {
        DescriptionProblem::Empty => "Description is required".to_string(),
        DescriptionProblem::TooLong { .. } => {
            format!("Description must have at most {DESCRIPTION_MAX_CHARS} characters")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationFailure>);

impl ValidationErrors {
    pub(crate) fn single(failure: ValidationFailure) -> Self {
        Self(vec![failure])
    }

    /// Callers only pass the non-empty output of the rule functions.
    pub(crate) fn from_failures(failures: Vec<ValidationFailure>) -> Self {
        Self(failures)
    }

    pub fn failures(&self) -> &[ValidationFailure] {
        &self.0
    }

    pub fn for_field(&self, field: DraftField) -> impl Iterator<Item = &ValidationFailure> {
        self.0.iter().filter(move |failure| failure.field() == field)
    }

    pub fn contains(&self, predicate: impl Fn(&ValidationFailure) -> bool) -> bool {
        self.0.iter().any(predicate)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, failure) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

pub fn validate_draft(draft: &UploadDraft) -> Result<(), ValidationErrors> {
    let mut failures = validate_file(draft.file.as_ref());
    failures.extend(validate_title(&draft.title));
    failures.extend(validate_description(&draft.description));

    if failures.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors(failures))
    }
}

pub fn validate_file(file: Option<&FileBlob>) -> Vec<ValidationFailure> {
    let Some(file) = file else {
        return vec![ValidationFailure::MissingFile];
    };

    let mut failures = Vec::new();
    if file.size_bytes() >= MAX_FILE_SIZE_BYTES {
        failures.push(ValidationFailure::FileTooLarge {
            size_bytes: file.size_bytes(),
        });
    }
    if ImageFormat::from_mime(&file.mime_type).is_none() {
        failures.push(ValidationFailure::UnsupportedFormat {
            mime_type: file.mime_type.clone(),
        });
    }
    failures
}

pub fn validate_title(title: &str) -> Option<ValidationFailure> {
    let chars = title.chars().count();
    let problem = if chars == 0 {
        TitleProblem::Empty
    } else if chars < TITLE_MIN_CHARS {
        TitleProblem::TooShort { chars }
    } else if chars > TITLE_MAX_CHARS {
        TitleProblem::TooLong { chars }
    } else {
        return None;
    };
    Some(ValidationFailure::InvalidTitle(problem))
}

pub fn validate_description(description: &str) -> Option<ValidationFailure> {
    let chars = description.chars().count();
    let problem = if chars == 0 {
        DescriptionProblem::Empty
    } else if chars > DESCRIPTION_MAX_CHARS {
        DescriptionProblem::TooLong { chars }
    } else {
        return None;
    };
    Some(ValidationFailure::InvalidDescription(problem))
}

#[cfg(test)]
#[path = "tests/validation_tests.rs"]
mod tests;
