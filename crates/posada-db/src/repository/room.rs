//! # Room Repository
//!
//! Database operations for rooms.
//!
//! ## The Transition Primitive
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every room state change is one guarded UPDATE:                         │
//! │                                                                         │
//! │    UPDATE rooms SET status = <to>                                       │
//! │    WHERE id = ? AND operator_id = ? AND status = <from>                 │
//! │                                                                         │
//! │  rows_affected == 0  →  the room was not in <from> at execution time.   │
//! │                                                                         │
//! │  Two cashiers racing available→occupied on the same room: the UPDATE    │
//! │  serializes them, exactly one sees rows_affected == 1. No separate      │
//! │  check-then-act window exists.                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use posada_core::{Room, RoomStatus};

/// Repository for room database operations.
#[derive(Debug, Clone)]
pub struct RoomRepository {
    pool: SqlitePool,
}

impl RoomRepository {
    /// Creates a new RoomRepository.
    pub fn new(pool: SqlitePool) -> Self {
        RoomRepository { pool }
    }

    /// Inserts a room.
    pub async fn create(&self, room: &Room) -> DbResult<()> {
        debug!(id = %room.id, room_number = %room.room_number, "Inserting room");

        sqlx::query(
            r#"
            INSERT INTO rooms (
                id, operator_id, room_number, room_type,
                base_price_cents, short_stay_3h_price_cents, short_stay_6h_price_cents,
                floor, max_occupancy, status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&room.id)
        .bind(&room.operator_id)
        .bind(&room.room_number)
        .bind(&room.room_type)
        .bind(room.base_price_cents)
        .bind(room.short_stay_3h_price_cents)
        .bind(room.short_stay_6h_price_cents)
        .bind(room.floor)
        .bind(room.max_occupancy)
        .bind(room.status)
        .bind(room.created_at)
        .bind(room.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a room by id within the operator's scope.
    pub async fn get(&self, operator_id: &str, room_id: &str) -> DbResult<Option<Room>> {
        let room = sqlx::query_as::<_, Room>(
            "SELECT * FROM rooms WHERE id = ?1 AND operator_id = ?2",
        )
        .bind(room_id)
        .bind(operator_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(room)
    }

    /// Transaction-scoped variant of [`get`](Self::get).
    pub async fn get_tx(
        conn: &mut SqliteConnection,
        operator_id: &str,
        room_id: &str,
    ) -> DbResult<Option<Room>> {
        let room = sqlx::query_as::<_, Room>(
            "SELECT * FROM rooms WHERE id = ?1 AND operator_id = ?2",
        )
        .bind(room_id)
        .bind(operator_id)
        .fetch_optional(conn)
        .await?;

        Ok(room)
    }

    /// Lists all rooms for an operator, ordered by room number.
    pub async fn list(&self, operator_id: &str) -> DbResult<Vec<Room>> {
        let rooms = sqlx::query_as::<_, Room>(
            "SELECT * FROM rooms WHERE operator_id = ?1 ORDER BY room_number",
        )
        .bind(operator_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rooms)
    }

    /// Finds available rooms, optionally filtered by room type, optionally
    /// excluding rooms whose active bookings overlap a requested window.
    ///
    /// ## Overlap Rule
    /// A booking `[check_in, expected_checkout)` overlaps a requested window
    /// `[from, to)` when `check_in < to` and `expected_checkout > from`.
    /// Open-ended bookings (no expected checkout) count as overlapping
    /// whenever they start before the window ends.
    pub async fn find_available(
        &self,
        operator_id: &str,
        room_type: Option<&str>,
        window: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> DbResult<Vec<Room>> {
        let (from, to) = match window {
            Some((from, to)) => (Some(from), Some(to)),
            None => (None, None),
        };

        let rooms = sqlx::query_as::<_, Room>(
            r#"
            SELECT r.* FROM rooms r
            WHERE r.operator_id = ?1
              AND r.status = 'available'
              AND (?2 IS NULL OR r.room_type = ?2)
              AND (?3 IS NULL OR r.id NOT IN (
                    SELECT b.room_id FROM bookings b
                    WHERE b.operator_id = ?1
                      AND b.status IN ('reserved', 'checked_in')
                      AND b.check_in < ?4
                      AND (b.expected_checkout IS NULL OR b.expected_checkout > ?3)
              ))
            ORDER BY r.room_number
            "#,
        )
        .bind(operator_id)
        .bind(room_type)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rooms)
    }

    /// Attempts one edge of the room state machine as a guarded update.
    ///
    /// Returns `true` if the transition happened; `false` if the room was
    /// not in `from` (wrong state, lost race, wrong tenant, or missing).
    pub async fn transition(
        conn: &mut SqliteConnection,
        operator_id: &str,
        room_id: &str,
        from: RoomStatus,
        to: RoomStatus,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        debug!(room_id = %room_id, ?from, ?to, "Room transition");

        let result = sqlx::query(
            r#"
            UPDATE rooms SET status = ?1, updated_at = ?2
            WHERE id = ?3 AND operator_id = ?4 AND status = ?5
            "#,
        )
        .bind(to)
        .bind(now)
        .bind(room_id)
        .bind(operator_id)
        .bind(from)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
