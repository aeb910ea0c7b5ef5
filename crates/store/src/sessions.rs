use crate::boxes::{load_box, save_box};
use crate::db::{format_date, now_stamp, parse_date, parse_enum, today, Store};
use crate::error::{Result, StoreError};
use crate::farmers::load_farmer;
use crate::models::{effective_limit, NewSession, Session, SessionFilter, SessionUpdate};
use huilerie_domain::{
    oil_yield_percent, BoxId, DomainError, Millimes, PaymentStatus, PriceList, SessionBox,
    SessionFigures,
};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;

fn load_session_boxes(conn: &Connection, session_id: i64) -> Result<Vec<SessionBox>> {
    let mut stmt = conn.prepare(
        "SELECT box_id, kind, weight_kg FROM session_boxes WHERE session_id = ?1 ORDER BY box_id",
    )?;
    let rows = stmt
        .query_map(params![session_id], |row| {
            Ok((
                row.get::<_, u32>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter()
        .map(|(box_id, kind, weight_kg)| {
            Ok(SessionBox {
                box_id: BoxId(box_id),
                kind: parse_enum(&kind, "box kind")?,
                weight_kg,
            })
        })
        .collect()
}

pub(crate) fn paid_for_session(conn: &Connection, session_id: i64) -> Result<Millimes> {
    let paid: i64 = conn.query_row(
        "SELECT COALESCE(SUM(amount), 0) FROM payments WHERE session_id = ?1",
        params![session_id],
        |row| row.get(0),
    )?;
    Ok(Millimes(paid))
}

pub(crate) fn load_session(conn: &Connection, id: i64) -> Result<Session> {
    type SessionRow = (i64, String, String, f64, f64, i64, i64, Option<String>, String);
    let row: SessionRow = conn
        .query_row(
            "SELECT s.farmer_id, f.name, s.processing_date, s.olive_weight_kg, s.oil_weight_kg,
                    s.price_per_kg, s.total_price, s.notes, s.created_at
             FROM sessions s JOIN farmers f ON f.id = s.farmer_id
             WHERE s.id = ?1",
            params![id],
            |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                    row.get(7)?,
                    row.get(8)?,
                ))
            },
        )
        .optional()?
        .ok_or_else(|| StoreError::not_found("Session", id))?;
    let (farmer_id, farmer_name, date, olive, oil, price, total, notes, created_at) = row;
    let total_price = Millimes(total);
    let paid = paid_for_session(conn, id)?;
    Ok(Session {
        id,
        farmer_id,
        farmer_name,
        processing_date: parse_date(&date)?,
        boxes: load_session_boxes(conn, id)?,
        olive_weight_kg: olive,
        oil_weight_kg: oil,
        oil_yield_percent: oil_yield_percent(olive, oil),
        price_per_kg: Millimes(price),
        total_price,
        paid,
        outstanding: total_price - paid,
        payment_status: PaymentStatus::from_amounts(total_price, paid),
        notes,
        created_at,
    })
}

impl Store {
    /// Consume a farmer's weighed boxes into a processing session. The boxes
    /// are snapshotted and returned to AVAILABLE in the same transaction.
    pub fn create_session(&self, new: NewSession, prices: &PriceList) -> Result<Session> {
        self.with_tx(|tx| {
            let farmer = load_farmer(tx, new.farmer_id)?;
            let mut seen = HashSet::new();
            let mut snapshots = Vec::with_capacity(new.box_ids.len());
            let mut records = Vec::with_capacity(new.box_ids.len());
            for &box_id in &new.box_ids {
                if !seen.insert(box_id) {
                    return Err(DomainError::DuplicateBox(box_id).into());
                }
                let record = load_box(tx, box_id)?;
                snapshots.push(SessionBox::snapshot(&record, farmer.id)?);
                records.push(record);
            }

            let price = new
                .price_per_kg
                .unwrap_or_else(|| prices.price_for(farmer.kind, farmer.price_per_kg));
            let figures = SessionFigures::compute(&snapshots, new.oil_weight_kg, price)?;
            let date = new.processing_date.unwrap_or_else(today);

            tx.execute(
                "INSERT INTO sessions (farmer_id, processing_date, olive_weight_kg, oil_weight_kg,
                                       price_per_kg, total_price, notes, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    farmer.id,
                    format_date(date),
                    figures.olive_weight_kg,
                    figures.oil_weight_kg,
                    figures.price_per_kg.value(),
                    figures.total_price.value(),
                    new.notes,
                    now_stamp()
                ],
            )?;
            let session_id = tx.last_insert_rowid();

            for snapshot in &snapshots {
                tx.execute(
                    "INSERT INTO session_boxes (session_id, box_id, kind, weight_kg) VALUES (?1, ?2, ?3, ?4)",
                    params![
                        session_id,
                        snapshot.box_id.0,
                        snapshot.kind.as_str(),
                        snapshot.weight_kg
                    ],
                )?;
            }
            for mut record in records {
                record.release();
                save_box(tx, &record)?;
            }

            log::info!(
                "Session {session_id} for farmer {}: {} box(es), {:.2} kg, {}",
                farmer.id,
                snapshots.len(),
                figures.olive_weight_kg,
                figures.total_price
            );
            load_session(tx, session_id)
        })
    }

    pub fn get_session(&self, id: i64) -> Result<Session> {
        self.with_conn(|conn| load_session(conn, id))
    }

    pub fn list_sessions(&self, filter: &SessionFilter) -> Result<Vec<Session>> {
        let range = filter.range.validated()?;
        let limit = effective_limit(filter.limit) as usize;
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id FROM sessions
                 WHERE (?1 IS NULL OR farmer_id = ?1)
                   AND processing_date BETWEEN ?2 AND ?3
                 ORDER BY processing_date DESC, id DESC",
            )?;
            let ids = stmt
                .query_map(
                    params![filter.farmer_id, range.lower_bound(), range.upper_bound()],
                    |row| row.get::<_, i64>(0),
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let mut sessions = Vec::new();
            for id in ids {
                let session = load_session(conn, id)?;
                if filter
                    .payment_status
                    .is_some_and(|status| status != session.payment_status)
                {
                    continue;
                }
                sessions.push(session);
                if sessions.len() >= limit {
                    break;
                }
            }
            Ok(sessions)
        })
    }

    /// Correct the oil weight, price, date or notes; the total is recomputed
    /// from the stored olive weight.
    pub fn update_session(&self, update: SessionUpdate) -> Result<Session> {
        self.with_tx(|tx| {
            let current = load_session(tx, update.id)?;
            let oil = update.oil_weight_kg.unwrap_or(current.oil_weight_kg);
            let price = update.price_per_kg.unwrap_or(current.price_per_kg);
            let figures = SessionFigures::from_weights(current.olive_weight_kg, oil, price)?;
            if figures.total_price < current.paid {
                return Err(StoreError::conflict(format!(
                    "new total {} is below the {} already paid",
                    figures.total_price, current.paid
                )));
            }
            let date = update.processing_date.unwrap_or(current.processing_date);
            let notes = update.notes.or(current.notes);
            tx.execute(
                "UPDATE sessions SET oil_weight_kg = ?1, price_per_kg = ?2, total_price = ?3,
                                     processing_date = ?4, notes = ?5
                 WHERE id = ?6",
                params![
                    figures.oil_weight_kg,
                    figures.price_per_kg.value(),
                    figures.total_price.value(),
                    format_date(date),
                    notes,
                    update.id
                ],
            )?;
            load_session(tx, update.id)
        })
    }

    /// Delete a session without payments. Boxes stay where they are; they
    /// were already released when the session was created.
    pub fn delete_session(&self, id: i64) -> Result<()> {
        self.with_tx(|tx| {
            let session = load_session(tx, id)?;
            if !session.paid.is_zero() {
                return Err(StoreError::conflict(format!(
                    "session {id} has {} in payments",
                    session.paid
                )));
            }
            tx.execute("DELETE FROM session_boxes WHERE session_id = ?1", params![id])?;
            tx.execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
            log::info!("Deleted session {id}");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewFarmer, NewPayment};
    use chrono::NaiveDate;
    use huilerie_domain::{BoxStatus, DateRange, FarmerKind};

    fn setup() -> (Store, i64) {
        let store = Store::open_in_memory().unwrap();
        store.seed_inventory(10).unwrap();
        let farmer = store
            .create_farmer(NewFarmer {
                name: "Fathi".to_string(),
                phone: None,
                kind: FarmerKind::Large,
                price_per_kg: None,
            })
            .unwrap();
        (store, farmer.id)
    }

    fn fill(store: &Store, farmer: i64, id: u32, kg: f64) {
        store.assign_box(farmer, id).unwrap();
        store.weigh_box(id, kg).unwrap();
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn new_session(farmer: i64, box_ids: Vec<u32>) -> NewSession {
        NewSession {
            farmer_id: farmer,
            box_ids,
            oil_weight_kg: 12.0,
            price_per_kg: None,
            processing_date: Some(date("2025-11-20")),
            notes: None,
        }
    }

    #[test]
    fn session_snapshots_and_frees_boxes() {
        let (store, farmer) = setup();
        fill(&store, farmer, 1, 30.0);
        fill(&store, farmer, 2, 30.0);

        let session = store
            .create_session(new_session(farmer, vec![1, 2]), &PriceList::default())
            .unwrap();
        assert_eq!(session.boxes.len(), 2);
        assert!((session.olive_weight_kg - 60.0).abs() < 1e-9);
        // large farmers use the large tier: 60 kg * 0.180
        assert_eq!(session.total_price, Millimes(10_800));
        assert_eq!(session.payment_status, PaymentStatus::Unpaid);
        assert!((session.oil_yield_percent.unwrap() - 20.0).abs() < 1e-9);

        let box_one = store.get_box(1).unwrap();
        assert_eq!(box_one.status, BoxStatus::Available);
        assert_eq!(box_one.farmer_id, None);
    }

    #[test]
    fn unweighed_or_foreign_boxes_abort_the_session() {
        let (store, farmer) = setup();
        fill(&store, farmer, 1, 30.0);
        store.assign_box(farmer, 2).unwrap();

        assert!(store
            .create_session(new_session(farmer, vec![1, 2]), &PriceList::default())
            .is_err());
        // nothing changed
        assert_eq!(store.get_box(1).unwrap().status, BoxStatus::InUse);
        assert!(store.list_sessions(&SessionFilter::default()).unwrap().is_empty());

        assert!(matches!(
            store.create_session(new_session(farmer, vec![1, 1]), &PriceList::default()),
            Err(StoreError::Domain(DomainError::DuplicateBox(1)))
        ));
    }

    #[test]
    fn update_recomputes_and_guards_payments() {
        let (store, farmer) = setup();
        fill(&store, farmer, 3, 50.0);
        let session = store
            .create_session(new_session(farmer, vec![3]), &PriceList::default())
            .unwrap();
        store
            .record_payment(NewPayment {
                session_id: session.id,
                amount: Millimes(5_000),
                paid_on: None,
                method: None,
            })
            .unwrap();

        let updated = store
            .update_session(SessionUpdate {
                id: session.id,
                price_per_kg: Some(Millimes(200)),
                oil_weight_kg: Some(9.0),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(updated.total_price, Millimes(10_000));
        assert_eq!(updated.payment_status, PaymentStatus::Partial);

        let too_low = store.update_session(SessionUpdate {
            id: session.id,
            price_per_kg: Some(Millimes(50)),
            ..Default::default()
        });
        assert!(matches!(too_low, Err(StoreError::Conflict(_))));
        assert!(matches!(
            store.delete_session(session.id),
            Err(StoreError::Conflict(_))
        ));
    }

    #[test]
    fn list_filters_by_range_and_status() {
        let (store, farmer) = setup();
        fill(&store, farmer, 1, 10.0);
        store
            .create_session(new_session(farmer, vec![1]), &PriceList::default())
            .unwrap();
        fill(&store, farmer, 2, 10.0);
        let mut later = new_session(farmer, vec![2]);
        later.processing_date = Some(date("2025-12-05"));
        store.create_session(later, &PriceList::default()).unwrap();

        let november = store
            .list_sessions(&SessionFilter {
                range: DateRange::new(Some(date("2025-11-01")), Some(date("2025-11-30"))).unwrap(),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(november.len(), 1);

        let paid = store
            .list_sessions(&SessionFilter {
                payment_status: Some(PaymentStatus::Paid),
                ..Default::default()
            })
            .unwrap();
        assert!(paid.is_empty());
    }
}
