use serde::{Deserialize, Serialize};

use super::event::{null_as_default, string_or_list};
use crate::error::{Result, SparkError};

pub const DEFAULT_LANGUAGE: &str = "English";

/// A user's profile as returned by `GET /get_profile`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub interests: Option<String>,
    #[serde(
        rename = "buID",
        alias = "bu_id",
        default,
        deserialize_with = "null_as_default"
    )]
    pub bu_id: String,
    #[serde(
        default,
        alias = "dietary_preferences",
        deserialize_with = "string_or_list"
    )]
    pub diet: Vec<String>,
    #[serde(default)]
    pub language: Option<String>,
}

/// The backend has answered both with a bare profile and with one wrapped
/// under `profile`.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum ProfileBody {
    Wrapped { profile: Profile },
    Bare(Profile),
}

impl From<ProfileBody> for Profile {
    fn from(body: ProfileBody) -> Self {
        match body {
            ProfileBody::Wrapped { profile } => profile,
            ProfileBody::Bare(profile) => profile,
        }
    }
}

/// Body of `POST /create_profile` and `PUT /edit_profile`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileInput {
    pub name: String,
    pub bio: String,
    pub interests: String,
    #[serde(rename = "buID", skip_serializing_if = "Option::is_none")]
    pub bu_id: Option<String>,
    pub diet: Vec<String>,
    pub language: String,
}

impl ProfileInput {
    /// Pre-fill an edit form from the stored profile.
    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            name: profile.name.clone(),
            bio: profile.bio.clone().unwrap_or_default(),
            interests: profile.interests.clone().unwrap_or_default(),
            bu_id: Some(profile.bu_id.clone()),
            diet: profile.diet.clone(),
            language: profile
                .language
                .clone()
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
        }
    }

    /// Checks for profile creation: name and BU ID are required.
    pub fn validate_new(mut self) -> Result<Self> {
        self = self.normalized()?;
        match self.bu_id.as_deref() {
            Some(id) if !id.is_empty() => Ok(self),
            _ => Err(SparkError::Validation("BU ID is required.".into())),
        }
    }

    /// Checks for profile edits. The BU ID is fixed once created and is not
    /// sent.
    pub fn validate_edit(mut self) -> Result<Self> {
        self.bu_id = None;
        self.normalized()
    }

    fn normalized(mut self) -> Result<Self> {
        self.name = self.name.trim().to_string();
        if self.name.is_empty() {
            return Err(SparkError::Validation("Name is required.".into()));
        }
        self.bio = self.bio.trim().to_string();
        self.interests = self.interests.trim().to_string();
        self.bu_id = self.bu_id.map(|id| id.trim().to_string());
        self.diet.retain(|d| !d.trim().is_empty());
        if self.language.trim().is_empty() {
            self.language = DEFAULT_LANGUAGE.to_string();
        }
        Ok(self)
    }
}
