use chrono::{DateTime, Utc};
use parkspot_catalog::{PricingEngine, Quote, SlotRegistry};
use parkspot_core::{
    retry_with_backoff, Clock, CoreError, CoreResult, OwnerId, Reservation, ReservationDraft,
    ReservationLedger, ReservationStatus, RetryConfig, SlotRef, SystemClock, TimeWindow,
};
use parkspot_shared::{SlotEvent, SlotEventKind};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;
use uuid::Uuid;

/// Knobs the service applies on top of the ledger.
#[derive(Debug, Clone)]
pub struct BookingPolicy {
    /// Whether a reservation whose window has elapsed may still be cancelled
    /// (booking history correction).
    pub allow_cancel_completed: bool,
    pub retry: RetryConfig,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            allow_cancel_completed: true,
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReserveRequest {
    pub lot_id: String,
    pub floor_id: String,
    pub slot_id: String,
    pub owner: OwnerId,
    pub start: DateTime<Utc>,
    pub duration_hours: u32,
}

/// Booking history split the way the history view shows it.
#[derive(Debug, Clone, Serialize)]
pub struct ReservationHistory {
    pub upcoming: Vec<Reservation>,
    pub past: Vec<Reservation>,
}

/// Orchestrates pricing, conflict-checked commits and cancellation.
pub struct ReservationService {
    registry: Arc<SlotRegistry>,
    ledger: Arc<dyn ReservationLedger>,
    availability: crate::AvailabilityIndex,
    pricing: PricingEngine,
    policy: BookingPolicy,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<SlotEvent>,
}

impl ReservationService {
    pub fn new(
        registry: Arc<SlotRegistry>,
        ledger: Arc<dyn ReservationLedger>,
        pricing: PricingEngine,
        policy: BookingPolicy,
    ) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            availability: crate::AvailabilityIndex::new(registry.clone(), ledger.clone()),
            registry,
            ledger,
            pricing,
            policy,
            clock: Arc::new(SystemClock),
            events,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn registry(&self) -> &SlotRegistry {
        &self.registry
    }

    pub fn availability(&self) -> &crate::AvailabilityIndex {
        &self.availability
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SlotEvent> {
        self.events.subscribe()
    }

    pub fn quote(&self, slot: &SlotRef, duration_hours: u32) -> CoreResult<Quote> {
        let (lot, _) = self.registry.resolve(slot)?;
        Ok(self.pricing.quote(lot, duration_hours)?)
    }

    pub async fn reserve(&self, request: ReserveRequest) -> CoreResult<Reservation> {
        let slot_ref = SlotRef::new(&request.lot_id, &request.floor_id, &request.slot_id);
        let (lot, slot) = self.registry.resolve(&slot_ref)?;
        let quote = self.pricing.quote(lot, request.duration_hours)?;
        let window = TimeWindow::starting_at(request.start, request.duration_hours)?;

        if window.has_elapsed(self.clock.now()) {
            return Err(CoreError::ValidationError(
                "requested window has already ended".into(),
            ));
        }

        let draft = ReservationDraft {
            id: Uuid::new_v4(),
            slot: slot_ref,
            owner: request.owner,
            window,
            price: quote.total,
            currency: quote.currency,
            lot_name: lot.name.clone(),
            slot_number: slot.number,
            category: slot.category,
        };

        let ledger = self.ledger.clone();
        let result = retry_with_backoff(
            &self.policy.retry,
            || {
                let ledger = ledger.clone();
                let draft = draft.clone();
                async move { ledger.commit(draft).await }
            },
            CoreError::is_transient,
            "reservation_commit",
        )
        .await;

        match result {
            Ok(reservation) => {
                self.publish(SlotEventKind::Reserved, &reservation);
                Ok(reservation)
            }
            Err(CoreError::Conflict { slot }) => {
                info!("Slot {} unavailable for {:?}, asking caller to pick again", slot, window);
                Err(CoreError::Conflict { slot })
            }
            Err(other) => Err(other),
        }
    }

    /// All of `owner`'s reservations, newest window first, with statuses
    /// projected at the current instant.
    pub async fn list_reservations(&self, owner: &OwnerId) -> CoreResult<Vec<Reservation>> {
        let now = self.clock.now();
        let ledger = self.ledger.clone();
        let mut reservations = retry_with_backoff(
            &self.policy.retry,
            || {
                let ledger = ledger.clone();
                let owner = owner.clone();
                async move { ledger.list_by_owner(&owner).await }
            },
            CoreError::is_transient,
            "reservation_list",
        )
        .await?;

        reservations.sort_by(|a, b| {
            b.window
                .start()
                .cmp(&a.window.start())
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(reservations.iter().map(|r| r.projected(now)).collect())
    }

    /// Upcoming = active and not yet started; everything else is past.
    pub async fn history(&self, owner: &OwnerId) -> CoreResult<ReservationHistory> {
        let now = self.clock.now();
        let (upcoming, past): (Vec<Reservation>, Vec<Reservation>) = self
            .list_reservations(owner)
            .await?
            .into_iter()
            .partition(|r| r.is_upcoming(now));
        Ok(ReservationHistory { upcoming, past })
    }

    /// Receipt lookup. Only the owner may see a reservation.
    pub async fn get_reservation(&self, id: Uuid, owner: &OwnerId) -> CoreResult<Reservation> {
        let reservation = self
            .fetch(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Reservation not found: {}", id)))?;

        if &reservation.owner != owner {
            return Err(CoreError::Forbidden);
        }
        Ok(reservation.projected(self.clock.now()))
    }

    pub async fn cancel(&self, id: Uuid, owner: &OwnerId) -> CoreResult<Reservation> {
        let now = self.clock.now();

        if !self.policy.allow_cancel_completed {
            if let Some(existing) = self.fetch(id).await? {
                if &existing.owner == owner && existing.status_at(now) == ReservationStatus::Completed {
                    return Err(CoreError::CancellationClosed(id));
                }
            }
        }

        let ledger = self.ledger.clone();
        let cancelled = retry_with_backoff(
            &self.policy.retry,
            || {
                let ledger = ledger.clone();
                let owner = owner.clone();
                async move { ledger.cancel(id, &owner).await }
            },
            CoreError::is_transient,
            "reservation_cancel",
        )
        .await?;

        self.publish(SlotEventKind::Released, &cancelled);
        Ok(cancelled.projected(now))
    }

    async fn fetch(&self, id: Uuid) -> CoreResult<Option<Reservation>> {
        let ledger = self.ledger.clone();
        retry_with_backoff(
            &self.policy.retry,
            || {
                let ledger = ledger.clone();
                async move { ledger.get(id).await }
            },
            CoreError::is_transient,
            "reservation_get",
        )
        .await
    }

    fn publish(&self, kind: SlotEventKind, reservation: &Reservation) {
        let event = SlotEvent {
            kind,
            lot_id: reservation.slot.lot_id.clone(),
            floor_id: reservation.slot.floor_id.clone(),
            slot_id: reservation.slot.slot_id.clone(),
            reservation_id: reservation.id,
            window_start: reservation.window.start(),
            window_end: reservation.window.end(),
            occurred_at: self.clock.now().timestamp(),
        };
        // no subscribers is fine
        let _ = self.events.send(event);
    }
}
