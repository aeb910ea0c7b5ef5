use crate::db::{format_date, now_stamp, parse_date, require_name, to_i64, to_u64, today, Store};
use crate::error::{Result, StoreError};
use crate::models::{
    effective_limit, CollectionEntry, CollectionFilter, Collector, CollectorGroup,
    CollectorTotals, GroupSummary, NewCollectionEntry, NewCollector, NewGroup,
};
use huilerie_domain::{DateRange, DomainError, Millimes, SackCount};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};

fn load_group(conn: &Connection, id: i64) -> Result<CollectorGroup> {
    conn.query_row(
        "SELECT g.name, g.created_at, (SELECT COUNT(*) FROM collectors c WHERE c.group_id = g.id)
         FROM collector_groups g WHERE g.id = ?1",
        params![id],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
            ))
        },
    )
    .optional()?
    .ok_or_else(|| StoreError::not_found("Collector group", id))
    .and_then(|(name, created_at, collectors)| {
        Ok(CollectorGroup {
            id,
            name,
            collectors: to_u64(collectors, "collector count")?,
            created_at,
        })
    })
}

fn load_collector(conn: &Connection, id: i64) -> Result<Collector> {
    conn.query_row(
        "SELECT group_id, name, phone, created_at FROM collectors WHERE id = ?1",
        params![id],
        |row| {
            Ok(Collector {
                id,
                group_id: row.get(0)?,
                name: row.get(1)?,
                phone: row.get(2)?,
                created_at: row.get(3)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| StoreError::not_found("Collector", id))
}

type EntryRow = (i64, i64, String, i64, i64, i64, i64, Option<String>, String);

fn build_entry(raw: EntryRow) -> Result<CollectionEntry> {
    let (id, collector_id, collected_on, chakra, galba, price, amount, notes, created_at) = raw;
    Ok(CollectionEntry {
        id,
        collector_id,
        collected_on: parse_date(&collected_on)?,
        quantity: SackCount::new(to_u64(chakra, "chakra")?, to_u64(galba, "galba")?),
        price_per_chakra: Millimes(price),
        amount: Millimes(amount),
        notes,
        created_at,
    })
}

const ENTRY_COLUMNS: &str =
    "e.id, e.collector_id, e.collected_on, e.chakra, e.galba, e.price_per_chakra, e.amount, e.notes, e.created_at";

fn entry_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EntryRow> {
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
}

/// Amount per chakra equivalent, rounded to the millime.
fn average_price(amount: Millimes, quantity: SackCount) -> Option<Millimes> {
    if quantity.is_zero() {
        return None;
    }
    let average = amount.value() as f64 / quantity.as_chakra_f64();
    Some(Millimes(average.round() as i64))
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

impl Store {
    pub fn create_group(&self, new: NewGroup) -> Result<CollectorGroup> {
        let name = require_name(&new.name, "group name")?;
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO collector_groups (name, created_at) VALUES (?1, ?2)",
                params![name, now_stamp()],
            );
            match inserted {
                Ok(_) => {}
                Err(err) if is_unique_violation(&err) => {
                    return Err(StoreError::conflict(format!("group '{name}' already exists")));
                }
                Err(err) => return Err(err.into()),
            }
            let group = load_group(conn, conn.last_insert_rowid())?;
            log::info!("Created collector group {} ({})", group.id, group.name);
            Ok(group)
        })
    }

    pub fn list_groups(&self) -> Result<Vec<CollectorGroup>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id FROM collector_groups ORDER BY name COLLATE NOCASE")?;
            let ids = stmt
                .query_map([], |row| row.get::<_, i64>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            ids.into_iter().map(|id| load_group(conn, id)).collect()
        })
    }

    pub fn create_collector(&self, new: NewCollector) -> Result<Collector> {
        let name = require_name(&new.name, "collector name")?;
        self.with_conn(|conn| {
            load_group(conn, new.group_id)?;
            let phone = new
                .phone
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty());
            conn.execute(
                "INSERT INTO collectors (group_id, name, phone, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![new.group_id, name, phone, now_stamp()],
            )?;
            let collector = load_collector(conn, conn.last_insert_rowid())?;
            log::info!(
                "Created collector {} in group {}",
                collector.id,
                collector.group_id
            );
            Ok(collector)
        })
    }

    pub fn list_collectors(&self, group_id: Option<i64>) -> Result<Vec<Collector>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id FROM collectors WHERE (?1 IS NULL OR group_id = ?1)
                 ORDER BY name COLLATE NOCASE, id",
            )?;
            let ids = stmt
                .query_map(params![group_id], |row| row.get::<_, i64>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            ids.into_iter().map(|id| load_collector(conn, id)).collect()
        })
    }

    /// Store a ledger entry. The quantity is normalized before it is written,
    /// so `{chakra: 1, galba: 7}` lands as `{chakra: 2, galba: 2}`.
    pub fn record_collection(&self, new: NewCollectionEntry) -> Result<CollectionEntry> {
        let quantity = SackCount::bounded(new.chakra, new.galba)?;
        if quantity.is_zero() {
            return Err(DomainError::validation("collected quantity must be greater than zero").into());
        }
        let price = new.price_per_chakra.ensure_positive("price per chakra")?;
        let amount = quantity.amount_at(price);
        self.with_conn(|conn| {
            load_collector(conn, new.collector_id)?;
            conn.execute(
                "INSERT INTO collection_entries
                    (collector_id, collected_on, chakra, galba, price_per_chakra, amount, notes, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    new.collector_id,
                    format_date(new.collected_on.unwrap_or_else(today)),
                    to_i64(quantity.chakra, "chakra")?,
                    to_i64(quantity.galba, "galba")?,
                    price.value(),
                    amount.value(),
                    new.notes,
                    now_stamp()
                ],
            )?;
            let id = conn.last_insert_rowid();
            let raw = conn.query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM collection_entries e WHERE e.id = ?1"),
                params![id],
                entry_from_row,
            )?;
            let entry = build_entry(raw)?;
            log::info!(
                "Collector {} brought {} chakra {} galba for {}",
                entry.collector_id,
                entry.quantity.chakra,
                entry.quantity.galba,
                entry.amount
            );
            Ok(entry)
        })
    }

    pub fn list_collections(&self, filter: &CollectionFilter) -> Result<Vec<CollectionEntry>> {
        let range = filter.range.validated()?;
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ENTRY_COLUMNS} FROM collection_entries e
                 JOIN collectors c ON c.id = e.collector_id
                 WHERE (?1 IS NULL OR e.collector_id = ?1)
                   AND (?2 IS NULL OR c.group_id = ?2)
                   AND e.collected_on BETWEEN ?3 AND ?4
                 ORDER BY e.collected_on DESC, e.id DESC
                 LIMIT ?5"
            ))?;
            let rows = stmt
                .query_map(
                    params![
                        filter.collector_id,
                        filter.group_id,
                        range.lower_bound(),
                        range.upper_bound(),
                        effective_limit(filter.limit)
                    ],
                    entry_from_row,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows.into_iter().map(build_entry).collect()
        })
    }

    /// Per-collector and group totals for a date range. Collectors without
    /// entries in the range are listed with zero totals.
    pub fn group_summary(&self, group_id: i64, range: DateRange) -> Result<GroupSummary> {
        let range = range.validated()?;
        self.with_conn(|conn| {
            let group = load_group(conn, group_id)?;
            let mut stmt = conn.prepare(
                "SELECT c.id, c.name, COUNT(e.id),
                        COALESCE(SUM(e.chakra), 0), COALESCE(SUM(e.galba), 0), COALESCE(SUM(e.amount), 0)
                 FROM collectors c
                 LEFT JOIN collection_entries e
                   ON e.collector_id = c.id AND e.collected_on BETWEEN ?2 AND ?3
                 WHERE c.group_id = ?1
                 GROUP BY c.id, c.name
                 ORDER BY c.name COLLATE NOCASE, c.id",
            )?;
            let rows = stmt
                .query_map(
                    params![group_id, range.lower_bound(), range.upper_bound()],
                    |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, i64>(2)?,
                            row.get::<_, i64>(3)?,
                            row.get::<_, i64>(4)?,
                            row.get::<_, i64>(5)?,
                        ))
                    },
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let mut collectors = Vec::with_capacity(rows.len());
            for (collector_id, name, entries, chakra, galba, amount) in rows {
                let quantity = SackCount::new(to_u64(chakra, "chakra")?, to_u64(galba, "galba")?);
                let amount = Millimes(amount);
                collectors.push(CollectorTotals {
                    collector_id,
                    name,
                    entries: to_u64(entries, "entry count")?,
                    quantity,
                    amount,
                    average_price_per_chakra: average_price(amount, quantity),
                });
            }
            let quantity: SackCount = collectors.iter().map(|c| c.quantity).sum();
            let amount: Millimes = collectors.iter().map(|c| c.amount).sum();
            Ok(GroupSummary {
                group_id,
                group_name: group.name,
                range,
                collectors,
                quantity,
                amount,
                average_price_per_chakra: average_price(amount, quantity),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn day(d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2025, 11, d)
    }

    fn entry(collector_id: i64, chakra: u64, galba: u64, price: i64, d: u32) -> NewCollectionEntry {
        NewCollectionEntry {
            collector_id,
            collected_on: day(d),
            chakra,
            galba,
            price_per_chakra: Millimes(price),
            notes: None,
        }
    }

    fn group_with_two(store: &Store) -> (i64, i64, i64) {
        let group = store
            .create_group(NewGroup {
                name: "Sidi Bouzid".to_string(),
            })
            .unwrap();
        let a = store
            .create_collector(NewCollector {
                group_id: group.id,
                name: "Ali".to_string(),
                phone: None,
            })
            .unwrap();
        let b = store
            .create_collector(NewCollector {
                group_id: group.id,
                name: "Bechir".to_string(),
                phone: Some("  ".to_string()),
            })
            .unwrap();
        assert_eq!(b.phone, None);
        (group.id, a.id, b.id)
    }

    #[test]
    fn entries_are_normalized_on_entry() {
        let store = Store::open_in_memory().unwrap();
        let (_, ali, _) = group_with_two(&store);
        let saved = store.record_collection(entry(ali, 1, 7, 10_000, 3)).unwrap();
        assert_eq!(saved.quantity, SackCount { chakra: 2, galba: 2 });
        // 12 galba at 2.000 DT each
        assert_eq!(saved.amount, Millimes(24_000));

        assert!(store.record_collection(entry(ali, 0, 0, 10_000, 3)).is_err());
        assert!(store.record_collection(entry(ali, 1, 0, 0, 3)).is_err());
        assert!(matches!(
            store.record_collection(entry(99, 1, 0, 10_000, 3)),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn oversized_quantities_are_rejected() {
        let store = Store::open_in_memory().unwrap();
        let (_, ali, _) = group_with_two(&store);
        assert!(matches!(
            store.record_collection(entry(ali, 4_000_000_000_000_000_000, 0, 1_000, 3)),
            Err(StoreError::Domain(DomainError::Validation(_)))
        ));
        assert!(matches!(
            store.record_collection(entry(ali, 0, u64::MAX, 1_000, 3)),
            Err(StoreError::Domain(DomainError::Validation(_)))
        ));
        assert!(store.list_collections(&CollectionFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn summary_normalizes_sums_and_weights_average() {
        let store = Store::open_in_memory().unwrap();
        let (group, ali, bechir) = group_with_two(&store);
        store.record_collection(entry(ali, 1, 3, 10_000, 3)).unwrap();
        store.record_collection(entry(ali, 0, 4, 10_000, 4)).unwrap();
        store.record_collection(entry(bechir, 2, 0, 13_000, 5)).unwrap();
        // outside the range
        store.record_collection(entry(bechir, 5, 0, 13_000, 20)).unwrap();

        let range = DateRange::new(day(1), day(10)).unwrap();
        let summary = store.group_summary(group, range).unwrap();
        assert_eq!(summary.collectors.len(), 2);

        let ali_totals = &summary.collectors[0];
        assert_eq!(ali_totals.entries, 2);
        // 3 + 4 galba fold into one more chakra
        assert_eq!(ali_totals.quantity, SackCount { chakra: 2, galba: 2 });
        assert_eq!(ali_totals.amount, Millimes(24_000));
        assert_eq!(ali_totals.average_price_per_chakra, Some(Millimes(10_000)));

        assert_eq!(summary.quantity, SackCount { chakra: 4, galba: 2 });
        assert_eq!(summary.amount, Millimes(50_000));
        // 50.000 DT over 4.4 chakra
        assert_eq!(summary.average_price_per_chakra, Some(Millimes(11_364)));
    }

    #[test]
    fn duplicate_group_names_conflict() {
        let store = Store::open_in_memory().unwrap();
        group_with_two(&store);
        assert!(matches!(
            store.create_group(NewGroup {
                name: "Sidi Bouzid".to_string()
            }),
            Err(StoreError::Conflict(_))
        ));
        let groups = store.list_groups().unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].collectors, 2);
        assert_eq!(store.list_collectors(Some(groups[0].id)).unwrap().len(), 2);
    }

    #[test]
    fn lists_entries_by_group_and_range() {
        let store = Store::open_in_memory().unwrap();
        let (group, ali, bechir) = group_with_two(&store);
        store.record_collection(entry(ali, 1, 0, 10_000, 3)).unwrap();
        store.record_collection(entry(bechir, 1, 0, 10_000, 15)).unwrap();
        let early = store
            .list_collections(&CollectionFilter {
                group_id: Some(group),
                range: DateRange::new(None, day(10)).unwrap(),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(early.len(), 1);
        assert_eq!(early[0].collector_id, ali);
    }
}
