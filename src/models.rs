//! Core data models for contacts, patches, and bulk operation reports.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A contact record as persisted and returned to callers.
///
/// Multi-valued fields are never null once persisted — absence is the
/// empty vector. Free-text fields default to the empty string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: String,
    pub name: String,
    pub title: String,
    pub company: String,
    pub notes: String,
    pub location: String,
    #[serde(rename = "email")]
    pub emails: Vec<String>,
    #[serde(rename = "phone")]
    pub phones: Vec<String>,
    pub links: Vec<String>,
    pub tags: Vec<String>,
    pub birthdate: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Multi-valued tool inputs accept either a single string or a sequence
/// of strings; both deserialize to a plain vector, so nothing downstream
/// of the tool boundary ever sees the one-string form.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct StringList(pub Vec<String>);

impl<'de> Deserialize<'de> for StringList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            One(String),
            Many(Vec<String>),
        }

        Ok(match OneOrMany::deserialize(deserializer)? {
            OneOrMany::One(value) => StringList(vec![value]),
            OneOrMany::Many(values) => StringList(values),
        })
    }
}

impl StringList {
    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl From<Vec<String>> for StringList {
    fn from(values: Vec<String>) -> Self {
        StringList(values)
    }
}

/// Input for creating a contact. Everything except `name` is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactDraft {
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub location: String,
    #[serde(default, rename = "email")]
    pub emails: StringList,
    #[serde(default, rename = "phone")]
    pub phones: StringList,
    #[serde(default)]
    pub links: StringList,
    #[serde(default)]
    pub tags: StringList,
    #[serde(default)]
    pub birthdate: Option<NaiveDate>,
}

/// Partial update. A field left `None` is untouched; a field provided as
/// an empty string or empty sequence overwrites the stored value with
/// that empty value — there is no separate "clear" operation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, rename = "email")]
    pub emails: Option<StringList>,
    #[serde(default, rename = "phone")]
    pub phones: Option<StringList>,
    #[serde(default)]
    pub links: Option<StringList>,
    #[serde(default)]
    pub tags: Option<StringList>,
    #[serde(default)]
    pub birthdate: Option<NaiveDate>,
}

/// One entry in a bulk update batch: a contact id plus the fields to change.
#[derive(Debug, Clone, Deserialize)]
pub struct ContactPatchEntry {
    pub id: String,
    #[serde(flatten)]
    pub patch: ContactPatch,
}

/// Listing parameters for the lexical path.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

/// A per-item failure inside a bulk operation, keyed by the item's
/// position in the original input sequence.
#[derive(Debug, Clone, Serialize)]
pub struct BulkError {
    pub index: usize,
    pub message: String,
}

/// Outcome of a bulk create or bulk update.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkWriteReport {
    pub processed_count: usize,
    pub contacts: Vec<Contact>,
    pub errors: Vec<BulkError>,
}

/// Outcome of a bulk delete.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteReport {
    pub processed_count: usize,
    pub deleted_ids: Vec<String>,
    pub errors: Vec<BulkError>,
}
