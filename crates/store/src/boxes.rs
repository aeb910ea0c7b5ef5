use crate::db::{now_stamp, parse_enum, Store};
use crate::error::{Result, StoreError};
use crate::farmers::load_farmer;
use crate::models::{effective_limit, BoxCounts, BoxFilter};
use huilerie_domain::{
    plan_bulk_assignment, AssignmentLimits, BoxId, BoxKind, BoxRecord, BoxStatus, BulkAssignment,
    DomainError,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::collections::BTreeMap;

const BOX_COLUMNS: &str = "id, kind, status, farmer_id, weight_kg";

type BoxRow = (u32, String, String, Option<i64>, Option<f64>);

fn box_from_row(row: &Row<'_>) -> rusqlite::Result<BoxRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn build_box(raw: BoxRow) -> Result<BoxRecord> {
    let (id, kind, status, farmer_id, weight_kg) = raw;
    Ok(BoxRecord {
        id: BoxId(id),
        kind: parse_enum(&kind, "box kind")?,
        status: parse_enum(&status, "box status")?,
        farmer_id,
        weight_kg,
    })
}

pub(crate) fn load_box(conn: &Connection, id: u32) -> Result<BoxRecord> {
    let raw = conn
        .query_row(
            &format!("SELECT {BOX_COLUMNS} FROM boxes WHERE id = ?1"),
            params![id],
            box_from_row,
        )
        .optional()?
        .ok_or_else(|| StoreError::not_found("Box", id))?;
    build_box(raw)
}

fn load_all_boxes(conn: &Connection) -> Result<BTreeMap<u32, BoxRecord>> {
    let mut stmt = conn.prepare(&format!("SELECT {BOX_COLUMNS} FROM boxes"))?;
    let rows = stmt
        .query_map([], box_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter()
        .map(|raw| build_box(raw).map(|record| (record.id.0, record)))
        .collect()
}

pub(crate) fn save_box(conn: &Connection, record: &BoxRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO boxes (id, kind, status, farmer_id, weight_kg, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(id) DO UPDATE SET
            kind = excluded.kind,
            status = excluded.status,
            farmer_id = excluded.farmer_id,
            weight_kg = excluded.weight_kg,
            updated_at = excluded.updated_at",
        params![
            record.id.0,
            record.kind.as_str(),
            record.status.as_str(),
            record.farmer_id,
            record.weight_kg,
            now_stamp()
        ],
    )?;
    Ok(())
}

pub(crate) fn box_counts(conn: &Connection) -> Result<BoxCounts> {
    let (total, available, in_use, chkara): (i64, i64, i64, i64) = conn.query_row(
        "SELECT COUNT(*),
                COALESCE(SUM(status = ?1), 0),
                COALESCE(SUM(status = ?2), 0),
                COALESCE(SUM(kind = ?3), 0)
         FROM boxes",
        params![
            BoxStatus::Available.as_str(),
            BoxStatus::InUse.as_str(),
            BoxKind::Chkara.as_str()
        ],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
    )?;
    Ok(BoxCounts {
        total: total.max(0) as u64,
        available: available.max(0) as u64,
        in_use: in_use.max(0) as u64,
        chkara: chkara.max(0) as u64,
    })
}

/// Result of a bulk assignment.
#[derive(Debug, Clone, Serialize)]
pub struct BulkAssignmentOutcome {
    pub farmer_id: i64,
    pub assigned: Vec<BoxRecord>,
    pub created_chkara: Vec<BoxId>,
}

impl Store {
    /// Make sure inventory boxes `1..=box_count` exist. Existing rows are
    /// left untouched. Returns how many boxes were created.
    ///
    /// The inventory cannot grow over an existing chkara sack.
    pub fn seed_inventory(&self, box_count: u32) -> Result<u64> {
        if box_count == 0 {
            return Err(DomainError::validation("box_count must be at least 1").into());
        }
        self.with_tx(|tx| {
            let sack: Option<u32> = tx.query_row(
                "SELECT MIN(id) FROM boxes WHERE kind = ?1 AND id <= ?2",
                params![BoxKind::Chkara.as_str(), box_count],
                |row| row.get(0),
            )?;
            if let Some(sack) = sack {
                return Err(StoreError::conflict(format!(
                    "box {sack} is a chkara sack; the inventory cannot grow to {box_count}"
                )));
            }
            let mut inserted = 0u64;
            let stamp = now_stamp();
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO boxes (id, kind, status, farmer_id, weight_kg, updated_at)
                 VALUES (?1, ?2, ?3, NULL, NULL, ?4)",
            )?;
            for id in 1..=box_count {
                inserted += stmt.execute(params![
                    id,
                    BoxKind::Normal.as_str(),
                    BoxStatus::Available.as_str(),
                    stamp
                ])? as u64;
            }
            if inserted > 0 {
                log::info!("Seeded {inserted} inventory boxes (1..={box_count})");
            }
            Ok(inserted)
        })
    }

    pub fn get_box(&self, id: u32) -> Result<BoxRecord> {
        self.with_conn(|conn| load_box(conn, id))
    }

    pub fn list_boxes(&self, filter: &BoxFilter) -> Result<Vec<BoxRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {BOX_COLUMNS} FROM boxes
                 WHERE (?1 IS NULL OR status = ?1)
                   AND (?2 IS NULL OR farmer_id = ?2)
                   AND (?3 IS NULL OR kind = ?3)
                 ORDER BY id
                 LIMIT ?4"
            ))?;
            let rows = stmt
                .query_map(
                    params![
                        filter.status.map(BoxStatus::as_str),
                        filter.farmer_id,
                        filter.kind.map(BoxKind::as_str),
                        effective_limit(filter.limit)
                    ],
                    box_from_row,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows.into_iter().map(build_box).collect()
        })
    }

    pub fn box_counts(&self) -> Result<BoxCounts> {
        self.with_conn(box_counts)
    }

    /// Reclassify an inventory box between normal and nchira.
    pub fn set_box_kind(&self, id: u32, kind: BoxKind) -> Result<BoxRecord> {
        if kind == BoxKind::Chkara {
            return Err(DomainError::validation("chkara sacks are created by assignment, not reclassified").into());
        }
        self.with_conn(|conn| {
            let mut record = load_box(conn, id)?;
            if record.kind == BoxKind::Chkara {
                return Err(DomainError::validation(format!("box {id} is a chkara sack")).into());
            }
            record.kind = kind;
            save_box(conn, &record)?;
            Ok(record)
        })
    }

    pub fn assign_box(&self, farmer_id: i64, box_id: u32) -> Result<BoxRecord> {
        self.with_conn(|conn| {
            load_farmer(conn, farmer_id)?;
            let mut record = load_box(conn, box_id)?;
            record.assign(farmer_id)?;
            save_box(conn, &record)?;
            log::debug!("Box {box_id} assigned to farmer {farmer_id}");
            Ok(record)
        })
    }

    /// Assign explicit ids, ranges and new chkara sacks in one transaction.
    pub fn assign_boxes_bulk(
        &self,
        request: &BulkAssignment,
        limits: AssignmentLimits,
    ) -> Result<BulkAssignmentOutcome> {
        self.with_tx(|tx| {
            load_farmer(tx, request.farmer_id)?;
            let mut boxes = load_all_boxes(tx)?;
            let plan = plan_bulk_assignment(request, limits, &boxes)?;

            let mut assigned = Vec::with_capacity(plan.total());
            for id in &plan.existing {
                let record = boxes
                    .get_mut(&id.0)
                    .ok_or_else(|| StoreError::not_found("Box", id))?;
                record.assign(plan.farmer_id)?;
                save_box(tx, record)?;
                assigned.push(record.clone());
            }
            for id in &plan.new_chkara {
                let mut record = BoxRecord::chkara(id.0);
                record.assign(plan.farmer_id)?;
                save_box(tx, &record)?;
                assigned.push(record);
            }
            assigned.sort_by_key(|record| record.id);

            log::info!(
                "Assigned {} box(es) to farmer {} ({} new chkara)",
                assigned.len(),
                plan.farmer_id,
                plan.new_chkara.len()
            );
            Ok(BulkAssignmentOutcome {
                farmer_id: plan.farmer_id,
                assigned,
                created_chkara: plan.new_chkara,
            })
        })
    }

    pub fn weigh_box(&self, box_id: u32, weight_kg: f64) -> Result<BoxRecord> {
        self.with_conn(|conn| {
            let mut record = load_box(conn, box_id)?;
            record.record_weight(weight_kg)?;
            save_box(conn, &record)?;
            Ok(record)
        })
    }

    pub fn release_box(&self, box_id: u32) -> Result<BoxRecord> {
        self.with_conn(|conn| {
            let mut record = load_box(conn, box_id)?;
            record.release();
            save_box(conn, &record)?;
            log::debug!("Box {box_id} released");
            Ok(record)
        })
    }

    /// Release every box a farmer holds; returns the released ids.
    pub fn release_farmer_boxes(&self, farmer_id: i64) -> Result<Vec<BoxId>> {
        self.with_tx(|tx| {
            load_farmer(tx, farmer_id)?;
            let mut stmt = tx.prepare(&format!(
                "SELECT {BOX_COLUMNS} FROM boxes WHERE farmer_id = ?1 ORDER BY id"
            ))?;
            let rows = stmt
                .query_map(params![farmer_id], box_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            let mut released = Vec::with_capacity(rows.len());
            for raw in rows {
                let mut record = build_box(raw)?;
                record.release();
                save_box(tx, &record)?;
                released.push(record.id);
            }
            log::info!("Released {} box(es) of farmer {farmer_id}", released.len());
            Ok(released)
        })
    }

    /// Remove an available chkara sack; its id becomes reusable.
    pub fn delete_box(&self, box_id: u32) -> Result<()> {
        self.with_conn(|conn| {
            let record = load_box(conn, box_id)?;
            if record.kind != BoxKind::Chkara {
                return Err(DomainError::validation(format!(
                    "box {box_id} is part of the fixed inventory"
                ))
                .into());
            }
            if !record.is_available() {
                return Err(DomainError::BoxNotAvailable(box_id).into());
            }
            conn.execute("DELETE FROM boxes WHERE id = ?1", params![box_id])?;
            Ok(())
        })
    }
}
