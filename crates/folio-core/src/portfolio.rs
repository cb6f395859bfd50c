//! Read-only portfolio document, loaded once at startup and shared by every request.
//!
//! The store keeps two views of the same file: the raw JSON value, served
//! verbatim by the data-export endpoint, and the typed document the prompt
//! builder interpolates from. Unknown fields in the file survive the round
//! trip because the export path never goes through the typed structs.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::CoreError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactInfo {
    pub phone: String,
    pub linkedin: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonalInfo {
    pub name: String,
    pub title: String,
    pub location: String,
    #[serde(default)]
    pub summary: String,
    pub contact: ContactInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperienceEntry {
    pub company: String,
    pub role: String,
    #[serde(default)]
    pub period: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EducationEntry {
    pub institution: String,
    pub program: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
}

/// Named entry for the projects and services sections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Typed view of the portfolio file. `personal_info` and its contact block are
/// required; every list section defaults to empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioDocument {
    pub personal_info: PersonalInfo,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub experience: Vec<ExperienceEntry>,
    #[serde(default)]
    pub education: Vec<EducationEntry>,
    #[serde(default)]
    pub projects: Vec<SectionEntry>,
    #[serde(default)]
    pub services: Vec<SectionEntry>,
}

/// Immutable holder of both views of the portfolio file.
pub struct PortfolioStore {
    raw: serde_json::Value,
    document: PortfolioDocument,
}

impl PortfolioStore {
    /// Reads and parses the portfolio file. Called once at startup; any failure
    /// here is fatal to the process by design.
    pub fn load_path(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| CoreError::PortfolioRead {
            path: path.display().to_string(),
            source,
        })?;
        let raw: serde_json::Value =
            serde_json::from_str(&text).map_err(|source| CoreError::PortfolioParse {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_value(raw)
    }

    pub fn from_value(raw: serde_json::Value) -> Result<Self, CoreError> {
        let document: PortfolioDocument =
            serde_json::from_value(raw.clone()).map_err(CoreError::PortfolioShape)?;
        Ok(Self { raw, document })
    }

    /// The file exactly as parsed, for the verbatim JSON export.
    pub fn raw(&self) -> &serde_json::Value {
        &self.raw
    }

    /// The typed view the prompt builder reads.
    pub fn document(&self) -> &PortfolioDocument {
        &self.document
    }
}
