use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parkspot_core::{
    Clock, CoreError, CoreResult, OwnerId, Reservation, ReservationDraft, ReservationLedger,
    ReservationStatus, SlotRef, SlotScope, SystemClock, TimeWindow, VehicleCategory,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// Postgres exclusion-constraint violation (`reservations_no_overlap`).
const EXCLUSION_VIOLATION: &str = "23P01";
/// Primary-key clash on `id`: the same draft was already stored.
const UNIQUE_VIOLATION: &str = "23505";
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";

const COLUMNS: &str = "id, reference, lot_id, floor_id, slot_id, owner_id, start_at, end_at, \
     price, currency, lot_name, slot_number, category, status, created_at, cancelled_at";

/// Postgres-backed ledger. Overlap exclusion is enforced by the database
/// itself, so any number of API processes may share one pool.
pub struct PgLedger {
    pool: PgPool,
    clock: Arc<dyn Clock>,
}

impl PgLedger {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            clock: Arc::new(SystemClock),
        }
    }
}

/// Why an insert was refused by a constraint, when the refusal may be a
/// replay of a commit that already landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InsertRejection {
    Overlap,
    DuplicateId,
}

fn insert_rejection(code: Option<&str>) -> Option<InsertRejection> {
    match code {
        Some(EXCLUSION_VIOLATION) => Some(InsertRejection::Overlap),
        Some(UNIQUE_VIOLATION) => Some(InsertRejection::DuplicateId),
        _ => None,
    }
}

/// The stored row is the attempted reservation itself, not a rival booking.
fn is_replay(stored: &Reservation, attempted: &Reservation) -> bool {
    stored.id == attempted.id
        && stored.slot == attempted.slot
        && stored.owner == attempted.owner
        && stored.window == attempted.window
}

#[derive(sqlx::FromRow)]
struct ReservationRow {
    id: Uuid,
    reference: String,
    lot_id: String,
    floor_id: String,
    slot_id: String,
    owner_id: String,
    start_at: DateTime<Utc>,
    end_at: DateTime<Utc>,
    price: i64,
    currency: String,
    lot_name: String,
    slot_number: i32,
    category: String,
    status: String,
    created_at: DateTime<Utc>,
    cancelled_at: Option<DateTime<Utc>>,
}

impl TryFrom<ReservationRow> for Reservation {
    type Error = CoreError;

    fn try_from(row: ReservationRow) -> Result<Self, Self::Error> {
        let category = VehicleCategory::parse(&row.category)
            .ok_or_else(|| CoreError::InternalError(format!("unknown category {}", row.category)))?;
        let status = ReservationStatus::parse(&row.status)
            .ok_or_else(|| CoreError::InternalError(format!("unknown status {}", row.status)))?;
        let slot_number = u32::try_from(row.slot_number)
            .map_err(|_| CoreError::InternalError(format!("negative slot number {}", row.slot_number)))?;

        Ok(Reservation {
            id: row.id,
            reference: row.reference,
            slot: SlotRef::new(row.lot_id, row.floor_id, row.slot_id),
            owner: OwnerId::new(row.owner_id)?,
            window: TimeWindow::new(row.start_at, row.end_at)?,
            price: row.price,
            currency: row.currency,
            lot_name: row.lot_name,
            slot_number,
            category,
            status,
            created_at: row.created_at,
            cancelled_at: row.cancelled_at,
        })
    }
}

fn sqlstate(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db) => db.code().map(|c| c.into_owned()),
        _ => None,
    }
}

/// Connection trouble and serialization aborts are worth retrying; anything
/// else is a bug or a schema mismatch.
fn map_db_error(err: sqlx::Error) -> CoreError {
    match &err {
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::PoolClosed => {
            CoreError::Transient(err.to_string())
        }
        _ => match sqlstate(&err).as_deref() {
            Some(SERIALIZATION_FAILURE) | Some(DEADLOCK_DETECTED) => CoreError::Transient(err.to_string()),
            _ => {
                error!("Ledger query failed: {:?}", err);
                CoreError::InternalError(err.to_string())
            }
        },
    }
}

fn rows_into(rows: Vec<ReservationRow>) -> CoreResult<Vec<Reservation>> {
    rows.into_iter().map(Reservation::try_from).collect()
}

#[async_trait]
impl ReservationLedger for PgLedger {
    async fn commit(&self, draft: ReservationDraft) -> CoreResult<Reservation> {
        let reservation = draft.into_reservation(self.clock.now());
        let slot_number = i32::try_from(reservation.slot_number)
            .map_err(|_| CoreError::ValidationError("slot number out of range".into()))?;

        let result = sqlx::query(
            "INSERT INTO reservations (id, reference, lot_id, floor_id, slot_id, owner_id, start_at, end_at, \
             price, currency, lot_name, slot_number, category, status, created_at, cancelled_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
        )
        .bind(reservation.id)
        .bind(&reservation.reference)
        .bind(&reservation.slot.lot_id)
        .bind(&reservation.slot.floor_id)
        .bind(&reservation.slot.slot_id)
        .bind(reservation.owner.as_str())
        .bind(reservation.window.start())
        .bind(reservation.window.end())
        .bind(reservation.price)
        .bind(&reservation.currency)
        .bind(&reservation.lot_name)
        .bind(slot_number)
        .bind(reservation.category.as_str())
        .bind(reservation.status.as_str())
        .bind(reservation.created_at)
        .bind(reservation.cancelled_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                info!(
                    "Reservation {} committed on {} for {}",
                    reservation.reference,
                    reservation.slot,
                    reservation.owner.masked()
                );
                Ok(reservation)
            }
            Err(e) => {
                let Some(rejection) = insert_rejection(sqlstate(&e).as_deref()) else {
                    return Err(map_db_error(e));
                };

                if let Some(stored) = self.get(reservation.id).await? {
                    if is_replay(&stored, &reservation) {
                        info!("Commit of {} replayed, returning stored reservation", reservation.id);
                        return Ok(stored);
                    }
                }

                match rejection {
                    InsertRejection::Overlap => Err(CoreError::Conflict {
                        slot: reservation.slot.to_string(),
                    }),
                    InsertRejection::DuplicateId => {
                        error!("Reservation id {} already used by another booking", reservation.id);
                        Err(CoreError::InternalError(format!(
                            "reservation id {} already used",
                            reservation.id
                        )))
                    }
                }
            }
        }
    }

    async fn cancel(&self, id: Uuid, requester: &OwnerId) -> CoreResult<Reservation> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let row = sqlx::query_as::<_, ReservationRow>(&format!(
            "SELECT {} FROM reservations WHERE id = $1 FOR UPDATE",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| CoreError::NotFound(format!("Reservation not found: {}", id)))?;

        let mut reservation = Reservation::try_from(row)?;
        if &reservation.owner != requester {
            return Err(CoreError::Forbidden);
        }
        reservation.cancel(self.clock.now())?;

        sqlx::query("UPDATE reservations SET status = $2, cancelled_at = $3 WHERE id = $1")
            .bind(id)
            .bind(reservation.status.as_str())
            .bind(reservation.cancelled_at)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;

        info!("Reservation {} cancelled by {}", reservation.reference, requester.masked());
        Ok(reservation)
    }

    async fn active_overlapping(
        &self,
        scope: &SlotScope,
        window: &TimeWindow,
    ) -> CoreResult<Vec<Reservation>> {
        let (lot_id, floor_id, slot_id): (&str, Option<&str>, Option<&str>) = match scope {
            SlotScope::Slot(slot) => (&slot.lot_id, Some(&slot.floor_id), Some(&slot.slot_id)),
            SlotScope::Floor { lot_id, floor_id } => (lot_id, Some(floor_id), None),
            SlotScope::Lot { lot_id } => (lot_id, None, None),
        };

        let rows = sqlx::query_as::<_, ReservationRow>(&format!(
            "SELECT {} FROM reservations \
             WHERE status = 'ACTIVE' AND lot_id = $1 \
               AND ($2::text IS NULL OR floor_id = $2) \
               AND ($3::text IS NULL OR slot_id = $3) \
               AND start_at < $5 AND $4 < end_at",
            COLUMNS
        ))
        .bind(lot_id)
        .bind(floor_id)
        .bind(slot_id)
        .bind(window.start())
        .bind(window.end())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        rows_into(rows)
    }

    async fn get(&self, id: Uuid) -> CoreResult<Option<Reservation>> {
        let row = sqlx::query_as::<_, ReservationRow>(&format!(
            "SELECT {} FROM reservations WHERE id = $1",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        row.map(Reservation::try_from).transpose()
    }

    async fn list_by_owner(&self, owner: &OwnerId) -> CoreResult<Vec<Reservation>> {
        let rows = sqlx::query_as::<_, ReservationRow>(&format!(
            "SELECT {} FROM reservations WHERE owner_id = $1 ORDER BY start_at DESC, created_at DESC",
            COLUMNS
        ))
        .bind(owner.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        rows_into(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(status: &str, category: &str) -> ReservationRow {
        ReservationRow {
            id: Uuid::new_v4(),
            reference: "BK00000000".into(),
            lot_id: "1".into(),
            floor_id: "F1".into(),
            slot_id: "F1-3".into(),
            owner_id: "guest-1".into(),
            start_at: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
            end_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            price: 100,
            currency: "INR".into(),
            lot_name: "Central Plaza Parking".into(),
            slot_number: 3,
            category: category.into(),
            status: status.into(),
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
            cancelled_at: None,
        }
    }

    #[test]
    fn test_row_maps_to_reservation() {
        let reservation = Reservation::try_from(row("ACTIVE", "ev")).unwrap();

        assert_eq!(reservation.slot, SlotRef::new("1", "F1", "F1-3"));
        assert_eq!(reservation.status, ReservationStatus::Active);
        assert_eq!(reservation.category, VehicleCategory::Ev);
        assert_eq!(reservation.slot_number, 3);
        assert_eq!(reservation.window.duration(), chrono::Duration::hours(2));
    }

    #[test]
    fn test_corrupt_rows_are_internal_errors() {
        assert!(matches!(
            Reservation::try_from(row("PENDING", "car")),
            Err(CoreError::InternalError(_))
        ));
        assert!(matches!(
            Reservation::try_from(row("ACTIVE", "truck")),
            Err(CoreError::InternalError(_))
        ));
    }

    #[test]
    fn test_constraint_rejections_are_classified() {
        assert_eq!(insert_rejection(Some("23P01")), Some(InsertRejection::Overlap));
        assert_eq!(insert_rejection(Some("23505")), Some(InsertRejection::DuplicateId));
        assert_eq!(insert_rejection(Some("40001")), None);
        assert_eq!(insert_rejection(None), None);
    }

    #[test]
    fn test_replay_matches_only_the_same_booking() {
        let stored = Reservation::try_from(row("ACTIVE", "car")).unwrap();
        assert!(is_replay(&stored, &stored.clone()));

        let mut other_owner = stored.clone();
        other_owner.owner = OwnerId::new("guest-2").unwrap();
        assert!(!is_replay(&stored, &other_owner));

        let mut other_id = stored.clone();
        other_id.id = Uuid::new_v4();
        assert!(!is_replay(&stored, &other_id));
    }

    #[test]
    fn test_pool_timeout_is_transient() {
        assert!(map_db_error(sqlx::Error::PoolTimedOut).is_transient());
        assert!(!map_db_error(sqlx::Error::RowNotFound).is_transient());
    }
}
