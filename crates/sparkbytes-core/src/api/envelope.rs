use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Result, SparkError};

/// The loose `{ success, message, error, ... }` wrapper every endpoint uses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub event_id: Option<i64>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub events: Option<Value>,
}

impl Envelope {
    /// `message` if present, else `error`.
    pub fn text(&self) -> Option<String> {
        self.message
            .clone()
            .or_else(|| self.error.clone())
            .filter(|m| !m.trim().is_empty())
    }
}

/// One backend response, read to completion.
#[derive(Debug, Clone)]
pub struct RawReply {
    pub status: StatusCode,
    pub body: Vec<u8>,
    pub set_cookies: Vec<String>,
}

impl RawReply {
    /// Best-effort envelope; a non-JSON body yields an empty one.
    pub fn envelope(&self) -> Envelope {
        if self.body.is_empty() {
            return Envelope::default();
        }
        serde_json::from_slice(&self.body).unwrap_or_default()
    }

    /// Turn non-2xx and `success: false` into errors, keeping the server's
    /// own wording.
    pub fn checked(self) -> Result<(Envelope, RawReply)> {
        let envelope = self.envelope();
        if !self.status.is_success() {
            return Err(SparkError::Status {
                status: self.status.as_u16(),
                message: envelope.text(),
            });
        }
        if envelope.success == Some(false) {
            return Err(SparkError::Rejected(
                envelope
                    .text()
                    .unwrap_or_else(|| "The request was not successful.".to_string()),
            ));
        }
        Ok((envelope, self))
    }

    /// Decode a list payload: either a bare JSON array or the envelope's
    /// `events` field. Order is kept as sent.
    pub fn list<T: DeserializeOwned>(self) -> Result<Vec<T>> {
        let (envelope, reply) = self.checked()?;
        let value: Value = if reply.body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&reply.body)?
        };
        match value {
            Value::Array(_) => Ok(serde_json::from_value(value)?),
            _ => match envelope.events {
                Some(events) => Ok(serde_json::from_value(events)?),
                None => Ok(Vec::new()),
            },
        }
    }

    pub fn json<T: DeserializeOwned>(self) -> Result<T> {
        let (_, reply) = self.checked()?;
        Ok(serde_json::from_slice(&reply.body)?)
    }
}
