//! Wire types for the booking resources
//!
//! Field names match the server's JSON exactly. Timestamps are parsed into
//! [`chrono::DateTime<Utc>`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MeetspaceError;

// ---------------------------------------------------------------------------
// Rooms
// ---------------------------------------------------------------------------

/// Equipment assigned to a room, as listed on the room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomEquipment {
    /// Equipment id, when the server includes it
    #[serde(default)]
    pub id: Option<i64>,
    /// Equipment name
    pub name: String,
    /// Number of units in the room
    pub qty: u32,
}

/// A bookable room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub capacity: u32,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub equipment: Vec<RoomEquipment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Room as returned by the detail endpoint. Same shape as [`Room`].
pub type RoomDetail = Room;

/// Equipment line in a room create/update body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoomEquipmentInput {
    pub equipment_id: i64,
    pub qty: u32,
}

impl std::str::FromStr for RoomEquipmentInput {
    type Err = MeetspaceError;

    /// Parses `ID` or `ID:QTY`. Quantity defaults to 1.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = || {
            MeetspaceError::Config(format!(
                "Invalid equipment spec: {}. Expected EQUIPMENT_ID[:QTY]",
                s
            ))
        };
        let (id, qty) = match s.split_once(':') {
            Some((id, qty)) => (id, qty.trim().parse().map_err(|_| invalid())?),
            None => (s, 1),
        };
        let equipment_id = id.trim().parse().map_err(|_| invalid())?;
        if qty == 0 {
            return Err(invalid());
        }
        Ok(Self { equipment_id, qty })
    }
}

/// Body for creating or partially updating a room.
///
/// Unset fields are omitted so a PATCH only touches what was given. A
/// present `equipment` list replaces the room's equipment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoomPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equipment: Option<Vec<RoomEquipmentInput>>,
}

// ---------------------------------------------------------------------------
// Equipment
// ---------------------------------------------------------------------------

/// An equipment type from the catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipment {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body for creating or renaming an equipment type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EquipmentPayload {
    pub name: String,
}

// ---------------------------------------------------------------------------
// Reservations
// ---------------------------------------------------------------------------

/// Reservation lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    /// Held but not yet confirmed; expires at `hold_expires_at`
    Pending,
    Confirmed,
    Canceled,
}

impl ReservationStatus {
    /// Wire name of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Canceled => "canceled",
        }
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReservationStatus {
    type Err = MeetspaceError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(ReservationStatus::Pending),
            "confirmed" => Ok(ReservationStatus::Confirmed),
            "canceled" | "cancelled" => Ok(ReservationStatus::Canceled),
            other => Err(MeetspaceError::Config(format!(
                "Invalid reservation status: {}. Must be one of: pending, confirmed, canceled",
                other
            ))),
        }
    }
}

/// A room reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: i64,
    /// Owner's user id
    pub user: i64,
    #[serde(default)]
    pub user_email: String,
    /// Room id
    pub room: i64,
    #[serde(default)]
    pub room_name: String,
    pub status: ReservationStatus,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    #[serde(default)]
    pub hold_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body for booking a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReservationCreate {
    pub room_id: i64,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

/// Query filters for listing reservations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReservationFilter {
    pub room_id: Option<i64>,
    /// Reservations starting at or after this instant
    pub from: Option<DateTime<Utc>>,
    /// Reservations ending at or before this instant
    pub to: Option<DateTime<Utc>>,
    pub status: Option<ReservationStatus>,
    /// Only the caller's own reservations
    pub mine: bool,
}

impl ReservationFilter {
    /// Query string pairs, skipping unset filters.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(room_id) = self.room_id {
            pairs.push(("room_id", room_id.to_string()));
        }
        if let Some(from) = self.from {
            pairs.push(("from", from.to_rfc3339()));
        }
        if let Some(to) = self.to {
            pairs.push(("to", to.to_rfc3339()));
        }
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        if self.mine {
            pairs.push(("mine", "true".to_string()));
        }
        pairs
    }
}

// ---------------------------------------------------------------------------
// Admin users
// ---------------------------------------------------------------------------

/// A user account as seen by an administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminUser {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
}

impl AdminUser {
    /// Case-insensitive match against email and names.
    pub fn matches(&self, query: &str) -> bool {
        let q = query.trim().to_lowercase();
        q.is_empty()
            || self.email.to_lowercase().contains(&q)
            || self.first_name.to_lowercase().contains(&q)
            || self.last_name.to_lowercase().contains(&q)
    }
}

/// Body for creating a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminUserCreate {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}

/// Body for partially updating a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AdminUserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
}

/// Body for an administrative password reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PasswordReset {
    pub password: String,
}
