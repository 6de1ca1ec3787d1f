//! Field paths and structured field errors.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Field(String),
    Index(usize),
    Key(String),
}

/// Dotted path to a field, e.g. `spec.affinityRules[2].weight`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<Segment>,
}

impl FieldPath {
    pub fn new(root: &str) -> Self {
        Self {
            segments: vec![Segment::Field(root.to_string())],
        }
    }

    pub fn child(&self, name: &str) -> Self {
        self.with(Segment::Field(name.to_string()))
    }

    pub fn index(&self, index: usize) -> Self {
        self.with(Segment::Index(index))
    }

    pub fn key(&self, key: &str) -> Self {
        self.with(Segment::Key(key.to_string()))
    }

    fn with(&self, segment: Segment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Field(name) if i == 0 => write!(f, "{name}")?,
                Segment::Field(name) => write!(f, ".{name}")?,
                Segment::Index(idx) => write!(f, "[{idx}]")?,
                Segment::Key(key) => write!(f, "[{key}]")?,
            }
        }
        Ok(())
    }
}

/// Classification of a single field error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldErrorKind {
    /// A mandatory field or selector is absent.
    Required,
    /// A value is present but outside its documented bounds or format.
    Invalid,
    /// A value repeats where entries must be unique.
    Duplicate,
    /// A value is not one of the supported options.
    NotSupported,
}

impl fmt::Display for FieldErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Required => "Required value",
            Self::Invalid => "Invalid value",
            Self::Duplicate => "Duplicate value",
            Self::NotSupported => "Unsupported value",
        };
        f.write_str(s)
    }
}

/// One violation at one field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub kind: FieldErrorKind,
    pub path: FieldPath,
    /// Rendered offending value, when there is one.
    pub value: Option<String>,
    pub message: String,
}

impl FieldError {
    pub fn required(path: FieldPath, message: impl Into<String>) -> Self {
        Self {
            kind: FieldErrorKind::Required,
            path,
            value: None,
            message: message.into(),
        }
    }

    pub fn invalid(path: FieldPath, value: impl fmt::Display, message: impl Into<String>) -> Self {
        Self {
            kind: FieldErrorKind::Invalid,
            path,
            value: Some(value.to_string()),
            message: message.into(),
        }
    }

    pub fn duplicate(path: FieldPath, value: impl fmt::Display) -> Self {
        Self {
            kind: FieldErrorKind::Duplicate,
            path,
            value: Some(value.to_string()),
            message: String::new(),
        }
    }

    pub fn not_supported(path: FieldPath, value: impl fmt::Display, supported: &[&str]) -> Self {
        Self {
            kind: FieldErrorKind::NotSupported,
            path,
            value: Some(value.to_string()),
            message: format!("supported values: {}", supported.join(", ")),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.kind)?;
        if let Some(value) = &self.value {
            write!(f, ": {value:?}")?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        Ok(())
    }
}

/// Every violation found in one object, in discovery order.
pub type ErrorList = Vec<FieldError>;

/// Aggregate rejection of an object.
#[derive(Debug, Clone, Error)]
#[error("{kind} {name:?} is invalid: {}", join(.errors))]
pub struct ValidationError {
    pub kind: String,
    pub name: String,
    pub errors: ErrorList,
}

fn join(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Collapse an error list into `Ok(())` or one combined error.
pub fn aggregate(kind: &str, name: &str, errors: ErrorList) -> Result<(), ValidationError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError {
            kind: kind.to_string(),
            name: name.to_string(),
            errors,
        })
    }
}
