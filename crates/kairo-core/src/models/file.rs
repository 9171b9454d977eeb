use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

/// Whether a file is listed for everyone or only for its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn is_public(self) -> bool {
        matches!(self, Visibility::Public)
    }
}

impl From<bool> for Visibility {
    fn from(is_public: bool) -> Self {
        if is_public {
            Visibility::Public
        } else {
            Visibility::Private
        }
    }
}

impl FromStr for Visibility {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            _ => Err(anyhow::anyhow!("Invalid visibility: {}", s)),
        }
    }
}

impl Display for Visibility {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Visibility::Public => write!(f, "public"),
            Visibility::Private => write!(f, "private"),
        }
    }
}

/// A row of the `files` metadata table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: Uuid,
    pub file_name: String,
    /// Object storage path, `<owner>/<file name>`.
    pub file_path: String,
    pub file_type: String,
    pub file_size: i64,
    pub is_public: bool,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl FileRecord {
    pub fn visibility(&self) -> Visibility {
        Visibility::from(self.is_public)
    }

    /// Case-insensitive substring match against the file name. An empty term matches everything.
    pub fn matches_search(&self, term: &str) -> bool {
        self.file_name
            .to_lowercase()
            .contains(&term.to_lowercase())
    }
}

/// Insert payload for the metadata table; the backend assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFileRecord {
    pub file_name: String,
    pub file_path: String,
    pub file_type: String,
    pub file_size: i64,
    pub is_public: bool,
    pub user_id: Uuid,
}

/// Equality filter used when selecting records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordFilter {
    pub is_public: bool,
    /// Restrict to one owner. Row-level security on the backend applies regardless.
    pub owner: Option<Uuid>,
}

impl RecordFilter {
    pub fn public() -> Self {
        Self {
            is_public: true,
            owner: None,
        }
    }

    pub fn private_to(owner: Uuid) -> Self {
        Self {
            is_public: false,
            owner: Some(owner),
        }
    }

    pub fn matches(&self, record: &FileRecord) -> bool {
        record.is_public == self.is_public && self.owner.is_none_or(|owner| owner == record.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, is_public: bool, owner: Uuid) -> FileRecord {
        FileRecord {
            id: Uuid::new_v4(),
            file_name: name.to_string(),
            file_path: format!("{}/{}", owner, name),
            file_type: "text/plain".to_string(),
            file_size: 12,
            is_public,
            user_id: owner,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_matches_search_is_case_insensitive() {
        let owner = Uuid::new_v4();
        let lower = record("a.txt", true, owner);
        let upper = record("A.txt", true, owner);
        assert!(lower.matches_search("a.txt"));
        assert!(upper.matches_search("a.txt"));
        assert!(upper.matches_search("A.TXT"));
        assert!(lower.matches_search(""));
        assert!(!lower.matches_search("b"));
    }

    #[test]
    fn test_filter_matches_visibility_and_owner() {
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();
        let private = record("notes.md", false, owner);
        let public = record("photo.png", true, other);

        assert!(RecordFilter::public().matches(&public));
        assert!(!RecordFilter::public().matches(&private));
        assert!(RecordFilter::private_to(owner).matches(&private));
        assert!(!RecordFilter::private_to(other).matches(&private));
    }

    #[test]
    fn test_visibility_parse_and_display() {
        assert_eq!("Public".parse::<Visibility>().unwrap(), Visibility::Public);
        assert_eq!(Visibility::from(false), Visibility::Private);
        assert_eq!(Visibility::Private.to_string(), "private");
        assert!("shared".parse::<Visibility>().is_err());
    }
}
