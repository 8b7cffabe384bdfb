//! Validated write commands.
//!
//! Request bodies arrive as loosely typed payloads (every field optional, the
//! way a browser form posts them). Converting a payload into a command checks
//! required fields and length bounds up front, so the store only ever sees
//! well-formed input. Commands can only be built through these checks.

use serde::Deserialize;
use uuid::Uuid;

use crate::constants::{
    MAX_DESCRIPTION_LEN, MAX_NAME_LEN, MAX_NOTES_LEN, MAX_RATING, MAX_TAG_LEN, MIN_RATING,
};
use crate::error::{FieldError, ValidationError};

// ---------------------------------------------------------------------------
// Payloads (as received)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopicPayload {
    pub name: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdeaPayload {
    pub topic_id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedbackPayload {
    pub rating: Option<i64>,
    pub notes: Option<String>,
}

// ---------------------------------------------------------------------------
// Commands (validated)
// ---------------------------------------------------------------------------

/// Create or update a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicCommand {
    name: String,
    description: Option<String>,
    tags: Option<Vec<String>>,
}

impl TopicCommand {
    /// `tags: None` means "leave the topic's tags as they are" on update.
    pub fn new(
        name: impl Into<String>,
        description: Option<String>,
        tags: Option<Vec<String>>,
    ) -> Result<Self, ValidationError> {
        let mut errors = Errors::default();
        let name = errors.name(Some(name.into()));
        let description = errors.description(description);
        if let Some(tags) = &tags {
            errors.tags(tags);
        }
        errors.finish()?;

        Ok(Self {
            name,
            description,
            tags,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn tags(&self) -> Option<&[String]> {
        self.tags.as_deref()
    }
}

impl TryFrom<TopicPayload> for TopicCommand {
    type Error = ValidationError;

    fn try_from(payload: TopicPayload) -> Result<Self, Self::Error> {
        TopicCommand::new(
            payload.name.unwrap_or_default(),
            payload.description,
            payload.tags,
        )
    }
}

/// Create or update an idea. An idea update always replaces the tag set, so
/// a missing tag list is the empty list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdeaCommand {
    topic_id: Uuid,
    name: String,
    description: Option<String>,
    tags: Vec<String>,
}

impl IdeaCommand {
    pub fn new(
        topic_id: Uuid,
        name: impl Into<String>,
        description: Option<String>,
        tags: Vec<String>,
    ) -> Result<Self, ValidationError> {
        let mut errors = Errors::default();
        let name = errors.name(Some(name.into()));
        let description = errors.description(description);
        errors.tags(&tags);
        errors.finish()?;

        Ok(Self {
            topic_id,
            name,
            description,
            tags,
        })
    }

    pub fn topic_id(&self) -> Uuid {
        self.topic_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }
}

impl TryFrom<IdeaPayload> for IdeaCommand {
    type Error = ValidationError;

    fn try_from(payload: IdeaPayload) -> Result<Self, Self::Error> {
        let mut errors = Errors::default();

        let topic_id = match payload.topic_id.as_deref().map(str::trim) {
            None | Some("") => {
                errors.push("topicId", "Topic ID is required");
                None
            }
            Some(raw) => match Uuid::parse_str(raw) {
                Ok(id) => Some(id),
                Err(_) => {
                    errors.push("topicId", "Topic ID is not a valid identifier");
                    None
                }
            },
        };
        let name = errors.name(payload.name);
        let description = errors.description(payload.description);
        let tags = payload.tags.unwrap_or_default();
        errors.tags(&tags);
        errors.finish()?;

        Ok(Self {
            // finish() returned early if topic_id was rejected
            topic_id: topic_id.unwrap_or_default(),
            name,
            description,
            tags,
        })
    }
}

/// Set the feedback attached to an idea.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackCommand {
    rating: u8,
    notes: Option<String>,
}

impl FeedbackCommand {
    pub fn new(rating: i64, notes: Option<String>) -> Result<Self, ValidationError> {
        let mut errors = Errors::default();
        if rating < MIN_RATING {
            errors.push("rating", format!("Rating must be at least {MIN_RATING}"));
        } else if rating > MAX_RATING {
            errors.push("rating", format!("Rating must be at most {MAX_RATING}"));
        }
        let notes = errors.optional_text("notes", notes, MAX_NOTES_LEN);
        errors.finish()?;

        Ok(Self {
            rating: rating as u8,
            notes,
        })
    }

    pub fn rating(&self) -> u8 {
        self.rating
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }
}

impl TryFrom<FeedbackPayload> for FeedbackCommand {
    type Error = ValidationError;

    fn try_from(payload: FeedbackPayload) -> Result<Self, Self::Error> {
        match payload.rating {
            Some(rating) => FeedbackCommand::new(rating, payload.notes),
            None => Err(ValidationError::single("rating", "Rating is required")),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Collects every field failure so a caller sees all of them at once.
#[derive(Default)]
struct Errors(Vec<FieldError>);

impl Errors {
    fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    /// Bounds apply to the text as sent; emptiness to the trimmed text.
    fn name(&mut self, raw: Option<String>) -> String {
        let raw = raw.unwrap_or_default();
        let name = raw.trim().to_string();
        if name.is_empty() {
            self.push("name", "Name is required");
        } else if raw.chars().count() > MAX_NAME_LEN {
            self.push(
                "name",
                format!("Name must be at most {MAX_NAME_LEN} characters"),
            );
        }
        name
    }

    fn description(&mut self, raw: Option<String>) -> Option<String> {
        self.optional_text("description", raw, MAX_DESCRIPTION_LEN)
    }

    fn optional_text(
        &mut self,
        field: &'static str,
        raw: Option<String>,
        max: usize,
    ) -> Option<String> {
        let raw = raw?;
        if raw.chars().count() > max {
            let mut label = field.to_string();
            label[..1].make_ascii_uppercase();
            self.push(field, format!("{label} must be at most {max} characters"));
        }
        Some(raw.trim().to_string()).filter(|s| !s.is_empty())
    }

    fn tags(&mut self, tags: &[String]) {
        if tags.iter().any(|t| t.chars().count() > MAX_TAG_LEN) {
            self.push(
                "tags",
                format!("Tag name must be at most {MAX_TAG_LEN} characters"),
            );
        }
    }

    fn finish(self) -> Result<(), ValidationError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ValidationError(self.0))
        }
    }
}
