//! Packet status normalization.
//!
//! Two status vocabularies exist historically: the lowercase runtime form
//! stored in state (`pending`, `in_progress`, ...) and the uppercase
//! schema/definition form (`PENDING`, `DRAFT`, ...), plus a handful of
//! legacy synonyms. Everything is canonicalized to the runtime form on
//! ingress; writes emit the runtime form only.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{Display, EnumString};

/// Canonical packet runtime status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum PacketStatus {
    Pending,
    InProgress,
    Done,
    Failed,
    Blocked,
}

impl PacketStatus {
    /// Normalize any historical status spelling to the canonical form.
    ///
    /// Unknown values fall back to `Pending`, matching load-time behavior
    /// for packets that have never been touched.
    #[must_use]
    pub fn normalize(value: &str) -> Self {
        let token = value.trim().to_lowercase().replace(['-', ' '], "_");
        match token.as_str() {
            "pending" | "draft" => Self::Pending,
            "in_progress" | "inprogress" => Self::InProgress,
            "done" | "complete" | "completed" => Self::Done,
            "failed" | "fail" => Self::Failed,
            "blocked" => Self::Blocked,
            _ => Self::Pending,
        }
    }

    /// Strict variant of [`PacketStatus::normalize`] for callers that must
    /// reject unknown values instead of defaulting.
    pub fn normalize_strict(value: &str) -> Result<Self, String> {
        let normalized = Self::normalize(value);
        let token = value.trim().to_lowercase().replace(['-', ' '], "_");
        let known = matches!(
            token.as_str(),
            "pending"
                | "draft"
                | "in_progress"
                | "inprogress"
                | "done"
                | "complete"
                | "completed"
                | "failed"
                | "fail"
                | "blocked"
        );
        if known {
            Ok(normalized)
        } else {
            Err(format!("invalid runtime status: {value:?}"))
        }
    }

    /// The uppercase schema-form spelling of this status.
    #[must_use]
    pub const fn schema_form(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
            Self::Blocked => "BLOCKED",
        }
    }

    /// True for statuses with no outgoing transitions other than reset paths.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done)
    }
}

impl Serialize for PacketStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PacketStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::normalize(&raw))
    }
}
