use serde::Serialize;

use crate::error::{Result, SparkError};

/// Body of `POST /login`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(mut self) -> Result<Self> {
        self.email = self.email.trim().to_string();
        if self.email.is_empty() || self.password.is_empty() {
            return Err(SparkError::Validation(
                "Email and password are required.".into(),
            ));
        }
        Ok(self)
    }
}

/// Body of `POST /register`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub bu_id: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    /// Only presence is checked here; the backend owns the email-domain rule.
    pub fn validate(mut self) -> Result<Self> {
        self.name = self.name.trim().to_string();
        self.bu_id = self.bu_id.trim().to_string();
        self.email = self.email.trim().to_string();
        let missing = [
            ("Name", &self.name),
            ("BU ID", &self.bu_id),
            ("Email", &self.email),
            ("Password", &self.password),
        ]
        .into_iter()
        .find(|(_, v)| v.is_empty());
        if let Some((label, _)) = missing {
            return Err(SparkError::Validation(format!("{label} is required.")));
        }
        Ok(self)
    }
}
