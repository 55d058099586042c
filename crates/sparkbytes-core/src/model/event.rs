use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Result, SparkError};

/// Dietary tags offered by the event and profile forms.
pub const DIETARY_OPTIONS: [&str; 10] = [
    "Vegetarian",
    "Vegan",
    "Gluten-Free",
    "Dairy-Free",
    "Nut-Free",
    "Soy-Free",
    "Halal",
    "Kosher",
    "Snacks",
    "Other",
];

pub const EVENT_DATE_IN_PAST: &str = "The event date must be in the future.";
pub const END_BEFORE_START: &str = "The end time must be after the start time.";

/// An event as listed by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: i64,
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(alias = "date")]
    pub event_date: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub start_time: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub end_time: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub location: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub address: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub quantity: i64,
    #[serde(
        default,
        alias = "food_types",
        alias = "food_type",
        deserialize_with = "string_or_list"
    )]
    pub dietary_needs: Vec<String>,
    #[serde(default)]
    pub event_type: Option<String>,
}

impl Event {
    /// Dietary tags joined for display, or "None" when the list is empty.
    pub fn dietary_label(&self) -> String {
        if self.dietary_needs.is_empty() {
            "None".to_string()
        } else {
            self.dietary_needs.join(", ")
        }
    }
}

/// Body of `POST /events`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub event_date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    pub location: String,
    pub address: String,
    pub quantity: u32,
    pub dietary_needs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
}

/// Raw create-event form as typed by the organizer.
#[derive(Debug, Clone, Default)]
pub struct EventForm {
    pub title: String,
    pub description: String,
    pub event_date: String,
    pub start_time: String,
    pub end_time: String,
    pub location: String,
    pub address: String,
    pub quantity: String,
    pub dietary_needs: Vec<String>,
    pub event_type: String,
}

impl EventForm {
    /// Validate the form against `today` and produce the request body.
    ///
    /// Required fields are checked first, then the date must be strictly
    /// after `today` and the end time strictly after the start time.
    pub fn validate(&self, today: NaiveDate) -> Result<NewEvent> {
        let required = [
            ("Title", &self.title),
            ("Description", &self.description),
            ("Date", &self.event_date),
            ("Start time", &self.start_time),
            ("End time", &self.end_time),
            ("Location", &self.location),
            ("Address", &self.address),
            ("Quantity", &self.quantity),
        ];
        for (label, value) in required {
            if value.trim().is_empty() {
                return Err(SparkError::Validation(format!("{label} is required.")));
            }
        }

        let event_date = NaiveDate::parse_from_str(self.event_date.trim(), "%Y-%m-%d")
            .map_err(|_| SparkError::Validation("Date must be formatted YYYY-MM-DD.".into()))?;
        let start_time = parse_time(&self.start_time)?;
        let end_time = parse_time(&self.end_time)?;
        let quantity: u32 = self
            .quantity
            .trim()
            .parse()
            .map_err(|_| SparkError::Validation("Quantity must be a whole number.".into()))?;

        if event_date <= today {
            return Err(SparkError::Validation(EVENT_DATE_IN_PAST.into()));
        }
        if end_time <= start_time {
            return Err(SparkError::Validation(END_BEFORE_START.into()));
        }
        if quantity == 0 {
            return Err(SparkError::Validation(
                "Quantity must be at least 1.".into(),
            ));
        }

        let dietary_needs = self
            .dietary_needs
            .iter()
            .map(|d| d.trim())
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .collect();

        let event_type = Some(self.event_type.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        Ok(NewEvent {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            event_date,
            start_time,
            end_time,
            location: self.location.trim().to_string(),
            address: self.address.trim().to_string(),
            quantity,
            dietary_needs,
            event_type,
        })
    }
}

/// Accepts `HH:MM` (HTML time inputs) or `HH:MM:SS`.
pub fn parse_time(raw: &str) -> Result<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|_| SparkError::Validation(format!("'{raw}' is not a valid time.")))
}

/// Older backends send dietary tags as one comma-separated string.
/// `null` reads like a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub(crate) fn string_or_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<String>),
        Joined(String),
        Missing(()),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::List(items) => items,
        Raw::Joined(s) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Raw::Missing(()) => Vec::new(),
    })
}

mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(t: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&t.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_time(&raw).map_err(serde::de::Error::custom)
    }
}
