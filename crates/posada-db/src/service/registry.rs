//! # Room Registry
//!
//! Owns the room state machine. Transitions are guarded updates; a lost
//! race is indistinguishable from a wrong starting state, and both surface
//! as the same domain error without side effects.
//!
//! ## State Machine
//! ```text
//!   available ⇄ maintenance
//!   available → occupied → available
//!   available → reserved → occupied
//!
//!   occupied → maintenance is NOT an edge: release first, so an active
//!   guest is never lost track of.
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::info;

use posada_core::{Actor, ActorRole, CoreError, Room, RoomStatus};

use crate::error::DbError;
use crate::repository::room::RoomRepository;
use crate::service::EngineResult;

/// Availability filters for the front desk.
#[derive(Debug, Clone, Default)]
pub struct RoomFilter {
    /// Restrict to one room type.
    pub room_type: Option<String>,

    /// Requested stay window; rooms whose active bookings overlap it are
    /// excluded even if currently available.
    pub window: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

/// Room state machine operations, scoped to the actor's operator.
#[derive(Debug, Clone)]
pub struct RoomRegistry {
    pool: SqlitePool,
}

impl RoomRegistry {
    /// Creates a new RoomRegistry.
    pub fn new(pool: SqlitePool) -> Self {
        RoomRegistry { pool }
    }

    /// Rooms currently available, optionally filtered. Read-only.
    pub async fn find_available(&self, actor: &Actor, filter: &RoomFilter) -> EngineResult<Vec<Room>> {
        let rooms = RoomRepository::new(self.pool.clone())
            .find_available(
                &actor.operator_id,
                filter.room_type.as_deref(),
                filter.window,
            )
            .await?;

        Ok(rooms)
    }

    /// The full room board for the operator. Read-only.
    pub async fn list_rooms(&self, actor: &Actor) -> EngineResult<Vec<Room>> {
        Ok(RoomRepository::new(self.pool.clone())
            .list(&actor.operator_id)
            .await?)
    }

    /// Transitions available → occupied.
    ///
    /// Fails with `RoomNotAvailable` if the room is in any other state,
    /// including when a concurrent occupy won the race.
    pub async fn occupy(&self, actor: &Actor, room_id: &str) -> EngineResult<Room> {
        self.apply(actor, room_id, |status| match status {
            RoomStatus::Available => Ok(RoomStatus::Occupied),
            _ => Err(CoreError::RoomNotAvailable {
                room_id: room_id.to_string(),
            }),
        })
        .await
    }

    /// Transitions occupied → available.
    ///
    /// Fails with `InvalidTransition` if the room is not occupied.
    pub async fn release(&self, actor: &Actor, room_id: &str) -> EngineResult<Room> {
        self.apply(actor, room_id, |status| match status {
            RoomStatus::Occupied => Ok(RoomStatus::Available),
            other => Err(CoreError::InvalidTransition {
                room_id: room_id.to_string(),
                status: status_label(other).to_string(),
                attempted: "release",
            }),
        })
        .await
    }

    /// Transitions available → reserved (holding a room for arrival).
    pub async fn reserve(&self, actor: &Actor, room_id: &str) -> EngineResult<Room> {
        self.apply(actor, room_id, |status| match status {
            RoomStatus::Available => Ok(RoomStatus::Reserved),
            _ => Err(CoreError::RoomNotAvailable {
                room_id: room_id.to_string(),
            }),
        })
        .await
    }

    /// Toggles available ⇄ maintenance. Operator only.
    ///
    /// Fails with `RoomBusy` while a guest holds the room (occupied or
    /// reserved); the room must be released first.
    pub async fn toggle_maintenance(&self, actor: &Actor, room_id: &str) -> EngineResult<Room> {
        if actor.role != ActorRole::Operator {
            return Err(CoreError::MissingCapability {
                capability: "toggle_maintenance",
            }
            .into());
        }

        self.apply(actor, room_id, |status| match status {
            RoomStatus::Available => Ok(RoomStatus::Maintenance),
            RoomStatus::Maintenance => Ok(RoomStatus::Available),
            other => Err(CoreError::RoomBusy {
                room_id: room_id.to_string(),
                status: status_label(other).to_string(),
            }),
        })
        .await
    }

    /// Shared transition runner: reads the room, decides the target state,
    /// and applies the guarded update in one transaction. If the guarded
    /// update affects no rows the state moved underneath us; the decision
    /// function is re-run against a fresh read to produce the right error.
    async fn apply<F>(&self, actor: &Actor, room_id: &str, decide: F) -> EngineResult<Room>
    where
        F: Fn(RoomStatus) -> Result<RoomStatus, CoreError>,
    {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let room = RoomRepository::get_tx(&mut tx, &actor.operator_id, room_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Room", room_id))?;

        let to = decide(room.status)?;

        let moved =
            RoomRepository::transition(&mut tx, &actor.operator_id, room_id, room.status, to, now)
                .await?;
        if !moved {
            // Lost a race between the read and the update; surface the
            // error the decision function gives for whatever state the
            // room is in now.
            let current = RoomRepository::get_tx(&mut tx, &actor.operator_id, room_id)
                .await?
                .ok_or_else(|| CoreError::not_found("Room", room_id))?;
            return Err(decide(current.status)
                .err()
                .unwrap_or(CoreError::RoomNotAvailable {
                    room_id: room_id.to_string(),
                })
                .into());
        }

        tx.commit().await.map_err(DbError::from)?;

        info!(
            room_id = %room_id,
            room_number = %room.room_number,
            from = status_label(room.status),
            to = status_label(to),
            "Room transition"
        );

        Ok(Room {
            status: to,
            updated_at: now,
            ..room
        })
    }
}

fn status_label(status: RoomStatus) -> &'static str {
    match status {
        RoomStatus::Available => "available",
        RoomStatus::Occupied => "occupied",
        RoomStatus::Reserved => "reserved",
        RoomStatus::Maintenance => "maintenance",
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
