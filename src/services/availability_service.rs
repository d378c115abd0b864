use crate::config::BusinessHoursConfig;
use crate::entities::{booking_entity, service_entity, BookingStatus};
use crate::error::{AppError, AppResult};
use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Fixed slot grid width. Treatment durations are advisory and do not widen
/// the grid.
pub const SLOT_MINUTES: u32 = 15;

/// Advisory cache TTL. Callers tolerate staleness up to this window; the
/// authoritative conflict check is the insert in the booking service.
const CACHE_TTL: Duration = Duration::from_secs(30);

/// Every grid point in `[open, close)`. Empty when `open >= close`.
pub fn slot_grid(open: NaiveTime, close: NaiveTime) -> Vec<NaiveTime> {
    let step = SLOT_MINUTES * 60;
    let mut secs = open.num_seconds_from_midnight();
    let end = close.num_seconds_from_midnight();
    let mut grid = Vec::new();
    while secs < end {
        if let Some(t) = NaiveTime::from_num_seconds_from_midnight_opt(secs, 0) {
            grid.push(t);
        }
        secs += step;
    }
    grid
}

/// Grid points not occupied by an existing booking. A booking at an off-grid
/// time occupies only that exact time value and blocks no neighbours.
pub fn free_slots(grid: &[NaiveTime], occupied: &HashSet<NaiveTime>) -> Vec<NaiveTime> {
    grid.iter()
        .copied()
        .filter(|t| !occupied.contains(t))
        .collect()
}

/// Whether `time` is a valid bookable slot on `date`: inside that weekday's
/// open window and aligned to the grid.
pub fn is_bookable_time(hours: &BusinessHoursConfig, date: NaiveDate, time: NaiveTime) -> bool {
    let Some((open, close)) = hours.window_for(date.weekday()) else {
        return false;
    };
    if time < open || time >= close {
        return false;
    }
    (time.num_seconds_from_midnight() - open.num_seconds_from_midnight()) % (SLOT_MINUTES * 60) == 0
}

struct CacheEntry {
    at: Instant,
    slots: Vec<NaiveTime>,
}

#[derive(Clone)]
pub struct AvailabilityService {
    pool: DatabaseConnection,
    hours: BusinessHoursConfig,
    cache: Arc<RwLock<HashMap<(NaiveDate, i64), CacheEntry>>>,
}

impl AvailabilityService {
    pub fn new(pool: DatabaseConnection, hours: BusinessHoursConfig) -> Self {
        Self {
            pool,
            hours,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn business_hours(&self) -> &BusinessHoursConfig {
        &self.hours
    }

    pub async fn list_services(&self) -> AppResult<Vec<service_entity::Model>> {
        Ok(service_entity::Entity::find()
            .order_by_asc(service_entity::Column::Id)
            .all(&self.pool)
            .await?)
    }

    /// Free slots for a date/service, ascending. This is a read path: no slot
    /// is reserved by reading it.
    pub async fn get_available_slots(
        &self,
        date: NaiveDate,
        service_id: i64,
    ) -> AppResult<Vec<NaiveTime>> {
        service_entity::Entity::find_by_id(service_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Service {service_id} not found")))?;

        {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.get(&(date, service_id)) {
                if entry.at.elapsed() < CACHE_TTL {
                    return Ok(entry.slots.clone());
                }
            }
        }

        let slots = self.compute_slots(date).await?;

        let mut cache = self.cache.write().await;
        cache.insert(
            (date, service_id),
            CacheEntry {
                at: Instant::now(),
                slots: slots.clone(),
            },
        );
        Ok(slots)
    }

    /// Drops cached entries for a date after a booking mutation so readers
    /// do not see a taken slot as free past the TTL window.
    pub async fn invalidate_date(&self, date: NaiveDate) {
        let mut cache = self.cache.write().await;
        cache.retain(|(d, _), _| *d != date);
    }

    async fn compute_slots(&self, date: NaiveDate) -> AppResult<Vec<NaiveTime>> {
        let Some((open, close)) = self.hours.window_for(date.weekday()) else {
            return Ok(Vec::new());
        };

        let occupied: HashSet<NaiveTime> = booking_entity::Entity::find()
            .filter(booking_entity::Column::Date.eq(date))
            .filter(booking_entity::Column::Status.ne(BookingStatus::Cancelled))
            .all(&self.pool)
            .await?
            .into_iter()
            .map(|b| b.time)
            .collect();

        Ok(free_slots(&slot_grid(open, close), &occupied))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn grid_covers_open_to_close_exclusive() {
        let grid = slot_grid(t(9, 0), t(17, 0));
        assert_eq!(grid.len(), 32);
        assert_eq!(grid.first().copied(), Some(t(9, 0)));
        assert_eq!(grid.last().copied(), Some(t(16, 45)));
        assert!(!grid.contains(&t(17, 0)));
    }

    #[test]
    fn equal_open_close_yields_empty_grid() {
        assert!(slot_grid(t(9, 0), t(9, 0)).is_empty());
        assert!(slot_grid(t(17, 0), t(9, 0)).is_empty());
    }

    #[test]
    fn occupied_slot_is_excluded() {
        // Business hours 09:00-17:00, one booking at 10:00.
        let grid = slot_grid(t(9, 0), t(17, 0));
        let occupied: HashSet<NaiveTime> = [t(10, 0)].into_iter().collect();
        let free = free_slots(&grid, &occupied);

        assert_eq!(&free[..5], &[t(9, 0), t(9, 15), t(9, 30), t(9, 45), t(10, 15)]);
        assert!(!free.contains(&t(10, 0)));
        assert_eq!(free.last().copied(), Some(t(16, 45)));
        assert_eq!(free.len(), 31);
    }

    #[test]
    fn off_grid_booking_blocks_nothing_on_the_grid() {
        let grid = slot_grid(t(9, 0), t(17, 0));
        let occupied: HashSet<NaiveTime> = [t(10, 7)].into_iter().collect();
        let free = free_slots(&grid, &occupied);
        assert_eq!(free.len(), 32);
        assert!(free.contains(&t(10, 0)));
        assert!(free.contains(&t(10, 15)));
    }

    #[test]
    fn bookable_time_requires_grid_alignment_and_window() {
        let hours = BusinessHoursConfig::default();
        // 2025-06-16 is a Monday, 09:00-17:00 by default.
        let mon = NaiveDate::from_ymd_opt(2025, 6, 16).unwrap();
        let sun = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();

        assert!(is_bookable_time(&hours, mon, t(9, 0)));
        assert!(is_bookable_time(&hours, mon, t(16, 45)));
        assert!(!is_bookable_time(&hours, mon, t(17, 0)));
        assert!(!is_bookable_time(&hours, mon, t(8, 45)));
        assert!(!is_bookable_time(&hours, mon, t(10, 7)));
        assert!(!is_bookable_time(&hours, sun, t(10, 0)));
    }

    fn service_row() -> service_entity::Model {
        service_entity::Model {
            id: 1,
            name: "Haircut".to_string(),
            duration_minutes: 45,
            price_cents: 5000,
        }
    }

    fn booking_row(date: NaiveDate, time: NaiveTime, status: BookingStatus) -> booking_entity::Model {
        booking_entity::Model {
            id: 1,
            service_id: 1,
            date,
            time,
            customer_id: Some(42),
            customer_name: "Alice".to_string(),
            customer_phone: "+15550001111".to_string(),
            customer_email: None,
            status,
            payment_status: crate::entities::PaymentStatus::Pending,
            notes: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn slots_exclude_non_cancelled_bookings() {
        let mon = NaiveDate::from_ymd_opt(2025, 6, 16).unwrap();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![service_row()]])
            .append_query_results([vec![booking_row(mon, t(10, 0), BookingStatus::Confirmed)]])
            .into_connection();

        let svc = AvailabilityService::new(db, BusinessHoursConfig::default());
        let slots = svc.get_available_slots(mon, 1).await.unwrap();
        assert_eq!(slots.len(), 31);
        assert!(!slots.contains(&t(10, 0)));
        assert!(slots.contains(&t(10, 15)));
    }

    #[tokio::test]
    async fn closed_day_returns_empty_without_booking_query() {
        let sun = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![service_row()]])
            .into_connection();

        let svc = AvailabilityService::new(db, BusinessHoursConfig::default());
        let slots = svc.get_available_slots(sun, 1).await.unwrap();
        assert!(slots.is_empty());
    }

    #[tokio::test]
    async fn unknown_service_is_not_found() {
        let mon = NaiveDate::from_ymd_opt(2025, 6, 16).unwrap();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<service_entity::Model>::new()])
            .into_connection();

        let svc = AvailabilityService::new(db, BusinessHoursConfig::default());
        let err = svc.get_available_slots(mon, 99).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
