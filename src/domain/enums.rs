use serde::{Deserialize, Serialize};

/// Workflow status of a ticket or todo item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    New,
    Todo,
    #[serde(rename = "In_Progress", alias = "InProgress")]
    InProgress,
    #[serde(rename = "On_Hold", alias = "OnHold")]
    OnHold,
    Blocked,
    Validation,
    Done,
}

impl Status {
    /// Parse status from user text like "in-progress" or "On_Hold"
    pub fn from_tag(tag: &str) -> Option<Self> {
        let normalized: String = tag
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_uppercase();
        match normalized.as_str() {
            "NEW" => Some(Self::New),
            "TODO" => Some(Self::Todo),
            "INPROGRESS" => Some(Self::InProgress),
            "ONHOLD" => Some(Self::OnHold),
            "BLOCKED" => Some(Self::Blocked),
            "VALIDATION" => Some(Self::Validation),
            "DONE" => Some(Self::Done),
            _ => None,
        }
    }

    /// Label shown in listings
    pub fn label(&self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Todo => "Todo",
            Self::InProgress => "In progress",
            Self::OnHold => "On hold",
            Self::Blocked => "Blocked",
            Self::Validation => "Validation",
            Self::Done => "Done",
        }
    }

    /// The one status the engine cares about: hidden by the done filter
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

/// Set of statuses offered to the user, chosen once in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusScheme {
    #[default]
    Classic,
    Board,
}

impl StatusScheme {
    pub fn statuses(&self) -> &'static [Status] {
        match self {
            StatusScheme::Classic => &[
                Status::New,
                Status::InProgress,
                Status::OnHold,
                Status::Validation,
                Status::Done,
            ],
            StatusScheme::Board => &[
                Status::Todo,
                Status::InProgress,
                Status::Blocked,
                Status::Done,
            ],
        }
    }

    /// Status given to newly added tickets and todos
    pub fn initial(&self) -> Status {
        self.statuses()[0]
    }

    pub fn offers(&self, status: Status) -> bool {
        self.statuses().contains(&status)
    }
}

/// Global activity state reported to the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalState {
    /// A ticket timer is accruing
    Running,
    /// Everything was stopped by a global pause
    Paused,
    /// Not paused, but nothing selected
    Idle,
}

impl GlobalState {
    pub fn label(&self) -> &'static str {
        match self {
            GlobalState::Running => "running",
            GlobalState::Paused => "paused",
            GlobalState::Idle => "idle",
        }
    }
}
