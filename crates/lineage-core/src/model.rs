//! Entities of the genealogy dataset.
//!
//! Everything here is produced once by ingestion and treated as read-only
//! afterwards. The advisor→student relation itself is not stored on these
//! types; it is derived from each dissertation's advisor slots when the
//! graph is built.

use serde::{Deserialize, Serialize};

/// The dataset carries at most this many advisor slots per dissertation.
pub const MAX_ADVISOR_SLOTS: u8 = 8;

/// A scholar: author of a dissertation, advisor of one, or both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    /// Stable identifier from the dataset.
    pub id: String,
    /// Display name as written in the dataset.
    pub name: String,
    /// Free-form life years, e.g. "1901-1987".
    pub years: Option<String>,
}

impl Person {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            years: None,
        }
    }

    pub fn with_years(mut self, years: impl Into<String>) -> Self {
        self.years = Some(years.into());
        self
    }
}

/// A degree-granting institution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Institution {
    pub id: String,
    pub name: String,
}

/// The role an advisor held on a dissertation.
///
/// The dataset uses a small set of labels; anything else is kept verbatim
/// so it can still be shown.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdvisorRole {
    Advisor,
    CoAdvisor,
    CommitteeMember,
    Reader,
    Other(String),
}

impl AdvisorRole {
    /// Maps a dataset label onto a role. An empty label means `Advisor`.
    pub fn parse(label: &str) -> Self {
        let label = label.trim();
        let folded: String = label
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric() || c.is_whitespace())
            .collect();

        match folded.split_whitespace().collect::<Vec<_>>().join(" ").as_str() {
            "" | "advisor" | "adviser" | "main advisor" | "primary advisor" | "advisor 1" => {
                Self::Advisor
            }
            "coadvisor" | "co advisor" | "coadviser" | "cosupervisor" | "co supervisor" => {
                Self::CoAdvisor
            }
            "committee member" | "committee" | "member" => Self::CommitteeMember,
            "reader" | "second reader" => Self::Reader,
            _ => Self::Other(label.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Advisor => "Advisor",
            Self::CoAdvisor => "Co-Advisor",
            Self::CommitteeMember => "Committee Member",
            Self::Reader => "Reader",
            Self::Other(label) => label,
        }
    }
}

impl std::fmt::Display for AdvisorRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One filled advisor column group on a dissertation row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisorSlot {
    /// Column group number, 1-based.
    pub slot: u8,
    pub advisor_id: String,
    pub advisor_name: Option<String>,
    pub role: AdvisorRole,
}

/// A dissertation with its ordered advisor slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dissertation {
    pub id: String,
    pub author_id: String,
    pub title: Option<String>,
    /// Completion year as written; some rows carry ranges or "n.d.".
    pub year: Option<String>,
    pub institution_id: Option<String>,
    pub institution_name: Option<String>,
    pub department: Option<String>,
    pub subject: Option<String>,
    pub advisors: Vec<AdvisorSlot>,
}

/// A validated dataset row.
///
/// Produced by [`crate::ingest`]; the graph builder only ever sees these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DissertationRecord {
    pub dissertation: Dissertation,
    pub author_name: String,
    pub author_years: Option<String>,
}

impl DissertationRecord {
    /// Creates a record with no institution, metadata or advisors.
    pub fn new(
        dissertation_id: impl Into<String>,
        author_id: impl Into<String>,
        author_name: impl Into<String>,
    ) -> Self {
        Self {
            dissertation: Dissertation {
                id: dissertation_id.into(),
                author_id: author_id.into(),
                title: None,
                year: None,
                institution_id: None,
                institution_name: None,
                department: None,
                subject: None,
                advisors: Vec::new(),
            },
            author_name: author_name.into(),
            author_years: None,
        }
    }

    /// Appends an advisor in the next free slot.
    pub fn with_advisor(
        mut self,
        advisor_id: impl Into<String>,
        advisor_name: impl Into<String>,
        role: AdvisorRole,
    ) -> Self {
        let slot = self.dissertation.advisors.len() as u8 + 1;
        self.dissertation.advisors.push(AdvisorSlot {
            slot,
            advisor_id: advisor_id.into(),
            advisor_name: Some(advisor_name.into()),
            role,
        });
        self
    }

    pub fn at(mut self, institution_id: impl Into<String>, name: impl Into<String>) -> Self {
        self.dissertation.institution_id = Some(institution_id.into());
        self.dissertation.institution_name = Some(name.into());
        self
    }

    pub fn in_year(mut self, year: impl Into<String>) -> Self {
        self.dissertation.year = Some(year.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.dissertation.title = Some(title.into());
        self
    }

    pub fn with_author_years(mut self, years: impl Into<String>) -> Self {
        self.author_years = Some(years.into());
        self
    }

    /// The author as a [`Person`].
    pub fn author(&self) -> Person {
        Person {
            id: self.dissertation.author_id.clone(),
            name: self.author_name.clone(),
            years: self.author_years.clone(),
        }
    }

    /// The institution, when the row names both its id and its name.
    pub fn institution(&self) -> Option<Institution> {
        let id = self.dissertation.institution_id.as_ref()?;
        let name = self.dissertation.institution_name.as_ref()?;
        Some(Institution {
            id: id.clone(),
            name: name.clone(),
        })
    }
}
