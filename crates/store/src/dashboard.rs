use crate::boxes::box_counts;
use crate::db::{to_u64, Store};
use crate::error::Result;
use crate::models::DashboardMetrics;
use huilerie_domain::{oil_yield_percent, DateRange, Millimes, SackCount};
use rusqlite::params;

impl Store {
    /// Aggregated figures for the dashboard. Session, payment and collection
    /// totals follow `range`; farmer, box and employee counts are current.
    pub fn dashboard(&self, range: DateRange) -> Result<DashboardMetrics> {
        let range = range.validated()?;
        let (lower, upper) = (range.lower_bound(), range.upper_bound());
        self.with_conn(|conn| {
            let farmers: i64 = conn.query_row("SELECT COUNT(*) FROM farmers", [], |row| row.get(0))?;
            let active_employees: i64 = conn.query_row(
                "SELECT COUNT(*) FROM employees WHERE active = 1",
                [],
                |row| row.get(0),
            )?;

            let (sessions, olive, oil, revenue, paid_on_sessions): (i64, f64, f64, i64, i64) = conn
                .query_row(
                    "SELECT COUNT(*),
                            COALESCE(SUM(olive_weight_kg), 0.0),
                            COALESCE(SUM(oil_weight_kg), 0.0),
                            COALESCE(SUM(total_price), 0),
                            COALESCE(SUM((SELECT COALESCE(SUM(p.amount), 0)
                                          FROM payments p WHERE p.session_id = s.id)), 0)
                     FROM sessions s
                     WHERE s.processing_date BETWEEN ?1 AND ?2",
                    params![lower, upper],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
                )?;

            let payments_collected: i64 = conn.query_row(
                "SELECT COALESCE(SUM(amount), 0) FROM payments WHERE paid_on BETWEEN ?1 AND ?2",
                params![lower, upper],
                |row| row.get(0),
            )?;

            let (chakra, galba, collection_amount): (i64, i64, i64) = conn.query_row(
                "SELECT COALESCE(SUM(chakra), 0), COALESCE(SUM(galba), 0), COALESCE(SUM(amount), 0)
                 FROM collection_entries WHERE collected_on BETWEEN ?1 AND ?2",
                params![lower, upper],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?;

            let revenue = Millimes(revenue);
            Ok(DashboardMetrics {
                range,
                farmers: to_u64(farmers, "farmer count")?,
                boxes: box_counts(conn)?,
                sessions: to_u64(sessions, "session count")?,
                olive_weight_kg: olive,
                oil_weight_kg: oil,
                average_yield_percent: oil_yield_percent(olive, oil),
                revenue,
                payments_collected: Millimes(payments_collected),
                outstanding: revenue - Millimes(paid_on_sessions),
                collected: SackCount::new(to_u64(chakra, "chakra")?, to_u64(galba, "galba")?),
                collection_amount: Millimes(collection_amount),
                active_employees: to_u64(active_employees, "employee count")?,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        NewCollectionEntry, NewCollector, NewFarmer, NewGroup, NewPayment, NewSession,
    };
    use chrono::NaiveDate;
    use huilerie_domain::{FarmerKind, PriceList};

    #[test]
    fn empty_store_has_zero_metrics() {
        let store = Store::open_in_memory().unwrap();
        let metrics = store.dashboard(DateRange::all()).unwrap();
        assert_eq!(metrics.sessions, 0);
        assert_eq!(metrics.revenue, Millimes::ZERO);
        assert_eq!(metrics.average_yield_percent, None);
        assert!(metrics.collected.is_zero());
    }

    #[test]
    fn aggregates_sessions_payments_and_collections() {
        let store = Store::open_in_memory().unwrap();
        store.seed_inventory(10).unwrap();
        let farmer = store
            .create_farmer(NewFarmer {
                name: "Hedi".to_string(),
                phone: None,
                kind: FarmerKind::Small,
                price_per_kg: None,
            })
            .unwrap();
        let on = NaiveDate::from_ymd_opt(2025, 11, 12);

        for (box_id, kg, oil) in [(1, 100.0, 18.0), (2, 300.0, 66.0)] {
            store.assign_box(farmer.id, box_id).unwrap();
            store.weigh_box(box_id, kg).unwrap();
            let session = store
                .create_session(
                    NewSession {
                        farmer_id: farmer.id,
                        box_ids: vec![box_id],
                        oil_weight_kg: oil,
                        price_per_kg: None,
                        processing_date: on,
                        notes: None,
                    },
                    &PriceList::default(),
                )
                .unwrap();
            store
                .record_payment(NewPayment {
                    session_id: session.id,
                    amount: Millimes(10_000),
                    paid_on: on,
                    method: None,
                })
                .unwrap();
        }
        store.assign_box(farmer.id, 3).unwrap();

        let group = store.create_group(NewGroup { name: "Nord".to_string() }).unwrap();
        let collector = store
            .create_collector(NewCollector {
                group_id: group.id,
                name: "Salah".to_string(),
                phone: None,
            })
            .unwrap();
        for galba in [3, 4] {
            store
                .record_collection(NewCollectionEntry {
                    collector_id: collector.id,
                    collected_on: on,
                    chakra: 1,
                    galba,
                    price_per_chakra: Millimes(5_000),
                    notes: None,
                })
                .unwrap();
        }

        let metrics = store.dashboard(DateRange::all()).unwrap();
        assert_eq!(metrics.farmers, 1);
        assert_eq!(metrics.sessions, 2);
        assert_eq!(metrics.boxes.in_use, 1);
        // 400 kg at 0.200 DT
        assert_eq!(metrics.revenue, Millimes(80_000));
        assert_eq!(metrics.payments_collected, Millimes(20_000));
        assert_eq!(metrics.outstanding, Millimes(60_000));
        // 84 kg of oil out of 400 kg of olives
        let yield_percent = metrics.average_yield_percent.unwrap();
        assert!((yield_percent - 21.0).abs() < 1e-9);
        assert_eq!(metrics.collected, SackCount { chakra: 3, galba: 2 });

        let december = DateRange::new(NaiveDate::from_ymd_opt(2025, 12, 1), None).unwrap();
        let later = store.dashboard(december).unwrap();
        assert_eq!(later.sessions, 0);
        assert_eq!(later.farmers, 1);
    }
}
