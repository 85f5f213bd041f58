use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("project name must not be empty")]
    EmptyProjectName,
    #[error("invalid project name '{0}': use only letters, digits, '.', '_' and '-'")]
    InvalidProjectName(String),
    #[error("invalid project name '{0}': '.' and '..' are reserved")]
    ReservedProjectName(String),
}

/// Identity of a project. Names are checked client-side before any request is
/// made; the server remains the authority and may still reject a name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectName(String);

impl ProjectName {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let name = raw.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyProjectName);
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        {
            return Err(ValidationError::InvalidProjectName(name.to_string()));
        }
        if name == "." || name == ".." {
            return Err(ValidationError::ReservedProjectName(name.to_string()));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ProjectName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for ProjectName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ProjectName {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ProjectName> for String {
    fn from(value: ProjectName) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub filename: String,
    pub url: String,
}

/// Full server view of a project. Always replaced as a whole on refetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDetail {
    pub name: ProjectName,
    #[serde(default)]
    pub images: Vec<ImageInfo>,
    #[serde(default)]
    pub readme: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub name: ProjectName,
    #[serde(default)]
    pub created: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_letters_digits_and_separators() {
        let name = ProjectName::parse("design_v2.1-final").expect("valid");
        assert_eq!(name.as_str(), "design_v2.1-final");
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let name = ProjectName::parse("  shots  ").expect("valid");
        assert_eq!(name.as_str(), "shots");
    }

    #[test]
    fn rejects_empty_and_blank_names() {
        assert_eq!(
            ProjectName::parse("   "),
            Err(ValidationError::EmptyProjectName)
        );
    }

    #[test]
    fn rejects_spaces_slashes_and_non_ascii() {
        for raw in ["my shots", "a/b", "截图", "x?y"] {
            assert!(
                matches!(
                    ProjectName::parse(raw),
                    Err(ValidationError::InvalidProjectName(_))
                ),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_bare_dot_segments() {
        for raw in [".", ".."] {
            assert!(
                matches!(
                    ProjectName::parse(raw),
                    Err(ValidationError::ReservedProjectName(_))
                ),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn accepts_dots_anywhere_inside_a_longer_name() {
        for raw in [".config", "v1..2", "...", "release."] {
            let name = ProjectName::parse(raw).expect("valid");
            assert_eq!(name.as_str(), raw);
        }
        let detail: ProjectDetail =
            serde_json::from_str(r#"{"name":"v1..2","images":[],"readme":""}"#)
                .expect("decode detail");
        assert_eq!(detail.name.as_str(), "v1..2");
    }

    #[test]
    fn detail_deserializes_with_missing_optional_fields() {
        let detail: ProjectDetail =
            serde_json::from_str(r#"{"name":"alpha"}"#).expect("decode detail");
        assert_eq!(detail.name.as_str(), "alpha");
        assert!(detail.images.is_empty());
        assert_eq!(detail.readme, "");
    }

    #[test]
    fn detail_rejects_invalid_name_on_the_wire() {
        let result = serde_json::from_str::<ProjectDetail>(r#"{"name":"../etc"}"#);
        assert!(result.is_err());
    }
}
