use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::event::Event;
use crate::error::SparkError;

pub const RSVP_STATUS_REQUIRED: &str = "Please select an RSVP status.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RsvpStatus {
    Going,
    Interested,
    #[serde(rename = "Not Going")]
    NotGoing,
}

impl RsvpStatus {
    pub const ALL: [RsvpStatus; 3] = [Self::Going, Self::Interested, Self::NotGoing];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Going => "Going",
            Self::Interested => "Interested",
            Self::NotGoing => "Not Going",
        }
    }
}

impl fmt::Display for RsvpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RsvpStatus {
    type Err = SparkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Going" => Ok(Self::Going),
            "Interested" => Ok(Self::Interested),
            "Not Going" => Ok(Self::NotGoing),
            "" => Err(SparkError::Validation(RSVP_STATUS_REQUIRED.into())),
            other => Err(SparkError::Validation(format!(
                "Unknown RSVP status '{other}'."
            ))),
        }
    }
}

/// Body of `POST /rsvp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RsvpRequest {
    pub event_id: i64,
    pub rsvp_status: RsvpStatus,
}

/// An event the visitor has RSVP'd to, with their answer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RsvpEvent {
    #[serde(flatten)]
    pub event: Event,
    #[serde(default, alias = "rsvp_status")]
    pub status: Option<String>,
}
