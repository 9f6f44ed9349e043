// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed implementation of the scheduling trait.
//!
//! Serves tool calls from the `services` catalog and the `appointments`
//! book. Availability is a fixed half-hour grid over business hours minus
//! already-booked slots; the unique (salon, date, time) constraint is what
//! actually prevents double booking under concurrency.

use async_trait::async_trait;
use navalha_core::NavalhaError;
use navalha_core::traits::{
    BookingConfirmation, BookingRequest, SchedulingBackend, ServiceListing,
};
use rusqlite::params;

use crate::database::{Database, map_tr_err};

/// Bookable half-hour start times.
const SLOT_GRID: &[&str] = &[
    "09:00", "09:30", "10:00", "10:30", "11:00", "11:30", "12:00", "14:00", "14:30", "15:00",
    "15:30", "16:00", "16:30", "17:00", "17:30", "18:00",
];

/// Scheduling backend over the shared store.
#[derive(Clone)]
pub struct SqliteScheduling {
    db: Database,
}

impl SqliteScheduling {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

/// Register a service in a salon's catalog. Returns the row ID.
pub async fn insert_service(
    db: &Database,
    salon_id: i64,
    name: &str,
    duration_minutes: u32,
    price: &str,
) -> Result<i64, NavalhaError> {
    let name = name.to_string();
    let price = price.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO services (salon_id, name, duration_minutes, price)
                 VALUES (?1, ?2, ?3, ?4)",
                params![salon_id, name, duration_minutes, price],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

#[async_trait]
impl SchedulingBackend for SqliteScheduling {
    async fn list_services(&self, salon_id: i64) -> Result<Vec<ServiceListing>, NavalhaError> {
        self.db
            .connection()
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT name, duration_minutes, price FROM services
                     WHERE salon_id = ?1 ORDER BY name",
                )?;
                let services = stmt
                    .query_map(params![salon_id], |row| {
                        Ok(ServiceListing {
                            name: row.get(0)?,
                            duration_minutes: row.get(1)?,
                            price: row.get(2)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(services)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn check_availability(
        &self,
        salon_id: i64,
        date: &str,
        _service: &str,
    ) -> Result<Vec<String>, NavalhaError> {
        let date = date.to_string();
        self.db
            .connection()
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT time FROM appointments WHERE salon_id = ?1 AND date = ?2",
                )?;
                let booked = stmt
                    .query_map(params![salon_id, date], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;

                let free = SLOT_GRID
                    .iter()
                    .filter(|slot| !booked.iter().any(|b| b == *slot))
                    .map(|slot| (*slot).to_string())
                    .collect();
                Ok(free)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn book_appointment(
        &self,
        salon_id: i64,
        request: BookingRequest,
    ) -> Result<BookingConfirmation, NavalhaError> {
        let date = request.date.clone();
        let time = request.time.clone();
        let confirmation = self
            .db
            .connection()
            .call(move |conn| {
                let inserted = conn.execute(
                    "INSERT OR IGNORE INTO appointments
                     (salon_id, service, date, time, customer_name, customer_phone)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        salon_id,
                        request.service,
                        request.date,
                        request.time,
                        request.customer_name,
                        request.customer_phone
                    ],
                )?;
                if inserted == 0 {
                    return Ok(None);
                }
                Ok(Some(BookingConfirmation {
                    appointment_id: format!("apt-{}", conn.last_insert_rowid()),
                    date: request.date,
                    time: request.time,
                    service: request.service,
                }))
            })
            .await
            .map_err(map_tr_err)?;

        confirmation.ok_or_else(|| {
            NavalhaError::Validation(format!("slot {date} {time} already booked"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::salons;
    use tempfile::tempdir;

    async fn setup() -> (Database, i64, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("test.db").to_str().unwrap())
            .await
            .unwrap();
        let salon_id = salons::insert(&db, "Barbearia Central", "5511912345678")
            .await
            .unwrap();
        (db, salon_id, dir)
    }

    fn booking(date: &str, time: &str) -> BookingRequest {
        BookingRequest {
            date: date.to_string(),
            time: time.to_string(),
            service: "Corte masculino".to_string(),
            customer_name: "João".to_string(),
            customer_phone: "5511987654321".to_string(),
        }
    }

    #[tokio::test]
    async fn catalog_round_trip() {
        let (db, salon_id, _dir) = setup().await;
        insert_service(&db, salon_id, "Corte masculino", 30, "R$ 45,00")
            .await
            .unwrap();
        insert_service(&db, salon_id, "Barba", 20, "R$ 30,00")
            .await
            .unwrap();

        let scheduling = SqliteScheduling::new(db.clone());
        let services = scheduling.list_services(salon_id).await.unwrap();
        assert_eq!(services.len(), 2);
        assert_eq!(services[0].name, "Barba");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn booking_removes_slot_from_availability() {
        let (db, salon_id, _dir) = setup().await;
        let scheduling = SqliteScheduling::new(db.clone());

        let before = scheduling
            .check_availability(salon_id, "2026-09-01", "Corte masculino")
            .await
            .unwrap();
        assert!(before.contains(&"14:00".to_string()));

        scheduling
            .book_appointment(salon_id, booking("2026-09-01", "14:00"))
            .await
            .unwrap();

        let after = scheduling
            .check_availability(salon_id, "2026-09-01", "Corte masculino")
            .await
            .unwrap();
        assert!(!after.contains(&"14:00".to_string()));
        assert_eq!(after.len(), before.len() - 1);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn double_booking_is_rejected() {
        let (db, salon_id, _dir) = setup().await;
        let scheduling = SqliteScheduling::new(db.clone());

        scheduling
            .book_appointment(salon_id, booking("2026-09-01", "10:00"))
            .await
            .unwrap();
        let err = scheduling
            .book_appointment(salon_id, booking("2026-09-01", "10:00"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already booked"));

        db.close().await.unwrap();
    }
}
