use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque caller identity handed over by the authentication provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn generate() -> Self {
                Self(Uuid::now_v7())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

uuid_id!(
    /// Identifier of a user's board.
    BoardId
);
uuid_id!(
    /// Identifier of a pipeline column.
    ColumnId
);
uuid_id!(
    /// Identifier of a job application card.
    JobApplicationId
);

pub const DEFAULT_BOARD_NAME: &str = "Job Hunt";
pub const DEFAULT_STATUS: &str = "applied";

/// Columns seeded on every new board, in display order.
pub const DEFAULT_COLUMNS: [&str; 5] = ["Wish List", "Applied", "Interviewing", "Offer", "Rejected"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub id: BoardId,
    pub user_id: UserId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub id: ColumnId,
    pub board_id: BoardId,
    pub name: String,
    pub order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stored job application card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobApplication {
    pub id: JobApplicationId,
    pub user_id: UserId,
    pub board_id: BoardId,
    pub column_id: ColumnId,
    pub company: String,
    pub position: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub job_url: Option<String>,
    pub salary: Option<String>,
    pub notes: Option<String>,
    pub tags: Vec<String>,
    pub status: String,
    pub order: i64,
    pub applied_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobApplication {
    pub fn slot(&self) -> OrderSlot {
        OrderSlot {
            column_id: self.column_id,
            order: self.order,
        }
    }
}

/// Where a card sits: its column and the order key inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderSlot {
    pub column_id: ColumnId,
    pub order: i64,
}

/// Payload for a new card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewJobApplication {
    pub board_id: BoardId,
    pub column_id: ColumnId,
    pub company: String,
    pub position: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub salary: Option<String>,
    #[serde(default)]
    pub job_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Partial edit of a card; `column_id`/`order` request a move where `order` is
/// the target zero-based index in the destination column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobApplicationUpdate {
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub salary: Option<String>,
    #[serde(default)]
    pub job_url: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub column_id: Option<ColumnId>,
    #[serde(default)]
    pub order: Option<usize>,
}

impl JobApplicationUpdate {
    pub fn has_move(&self) -> bool {
        self.column_id.is_some() || self.order.is_some()
    }

    pub(crate) fn apply_fields(&self, record: &mut JobApplication) {
        if let Some(company) = &self.company {
            record.company = company.trim().to_string();
        }
        if let Some(position) = &self.position {
            record.position = position.trim().to_string();
        }
        if let Some(location) = &self.location {
            record.location = Some(location.clone());
        }
        if let Some(notes) = &self.notes {
            record.notes = Some(notes.clone());
        }
        if let Some(salary) = &self.salary {
            record.salary = Some(salary.clone());
        }
        if let Some(job_url) = &self.job_url {
            record.job_url = Some(job_url.clone());
        }
        if let Some(tags) = &self.tags {
            record.tags = tags.clone();
        }
        if let Some(description) = &self.description {
            record.description = Some(description.clone());
        }
    }
}

/// Read model returned to board views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardView {
    pub id: BoardId,
    pub name: String,
    pub columns: Vec<ColumnView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnView {
    pub id: ColumnId,
    pub name: String,
    pub order: i64,
    pub job_applications: Vec<JobApplication>,
}

impl BoardView {
    pub fn column_named(&self, name: &str) -> Option<&ColumnView> {
        self.columns.iter().find(|column| column.name == name)
    }
}

impl ColumnView {
    /// Companies in display order, handy for logs and assertions.
    pub fn companies(&self) -> Vec<&str> {
        self.job_applications
            .iter()
            .map(|application| application.company.as_str())
            .collect()
    }
}

/// Sorts by order key, breaking transient ties by creation time.
pub fn sort_by_order(applications: &mut [JobApplication]) {
    applications.sort_by(|a, b| {
        a.order
            .cmp(&b.order)
            .then_with(|| a.created_at.cmp(&b.created_at))
            .then_with(|| a.id.cmp(&b.id))
    });
}
