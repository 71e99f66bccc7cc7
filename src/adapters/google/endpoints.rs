//! Batch endpoints and per-API batch limits

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// API family a run targets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoogleApi {
    #[default]
    Classroom,
    Drive,
    Forms,
    /// Any other multipart batch endpoint; the URL must be configured
    Custom,
}

impl GoogleApi {
    /// Well-known batch URL, `None` for [`GoogleApi::Custom`]
    pub fn batch_url(&self) -> Option<&'static str> {
        match self {
            GoogleApi::Classroom => Some("https://classroom.googleapis.com/batch"),
            GoogleApi::Drive => Some("https://www.googleapis.com/batch/drive/v3"),
            GoogleApi::Forms => Some("https://forms.googleapis.com/batch"),
            GoogleApi::Custom => None,
        }
    }

    /// Largest batch the API accepts
    pub fn max_batch_size(&self) -> usize {
        match self {
            GoogleApi::Classroom => 50,
            GoogleApi::Drive => 100,
            GoogleApi::Forms => 50,
            GoogleApi::Custom => 1000,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GoogleApi::Classroom => "classroom",
            GoogleApi::Drive => "drive",
            GoogleApi::Forms => "forms",
            GoogleApi::Custom => "custom",
        }
    }
}

impl fmt::Display for GoogleApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GoogleApi {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "classroom" => Ok(GoogleApi::Classroom),
            "drive" => Ok(GoogleApi::Drive),
            "forms" => Ok(GoogleApi::Forms),
            "custom" => Ok(GoogleApi::Custom),
            other => Err(format!(
                "Unknown API '{other}'. Must be one of: classroom, drive, forms, custom"
            )),
        }
    }
}
