use crate::db::{now_stamp, parse_enum, require_name, Store};
use crate::error::{Result, StoreError};
use crate::models::{effective_limit, Farmer, FarmerFilter, FarmerUpdate, NewFarmer};
use huilerie_domain::{BoxStatus, Millimes};
use rusqlite::{params, Connection, OptionalExtension, Row};

const FARMER_COLUMNS: &str = "id, name, phone, kind, price_per_kg, created_at";

type FarmerRow = (i64, String, Option<String>, String, Option<i64>, String);

fn farmer_from_row(row: &Row<'_>) -> rusqlite::Result<FarmerRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn build_farmer(raw: FarmerRow) -> Result<Farmer> {
    let (id, name, phone, kind, price, created_at) = raw;
    Ok(Farmer {
        id,
        name,
        phone,
        kind: parse_enum(&kind, "farmer kind")?,
        price_per_kg: price.map(Millimes),
        created_at,
    })
}

pub(crate) fn load_farmer(conn: &Connection, id: i64) -> Result<Farmer> {
    let raw = conn
        .query_row(
            &format!("SELECT {FARMER_COLUMNS} FROM farmers WHERE id = ?1"),
            params![id],
            farmer_from_row,
        )
        .optional()?
        .ok_or_else(|| StoreError::not_found("Farmer", id))?;
    build_farmer(raw)
}

fn clean_phone(phone: Option<String>) -> Option<String> {
    phone
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
}

impl Store {
    pub fn create_farmer(&self, new: NewFarmer) -> Result<Farmer> {
        let name = require_name(&new.name, "farmer name")?;
        if let Some(price) = new.price_per_kg {
            price.ensure_positive("price per kg")?;
        }
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO farmers (name, phone, kind, price_per_kg, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    name,
                    clean_phone(new.phone),
                    new.kind.as_str(),
                    new.price_per_kg.map(Millimes::value),
                    now_stamp()
                ],
            )?;
            let farmer = load_farmer(conn, conn.last_insert_rowid())?;
            log::info!("Created farmer {} ({})", farmer.id, farmer.name);
            Ok(farmer)
        })
    }

    pub fn update_farmer(&self, update: FarmerUpdate) -> Result<Farmer> {
        self.with_conn(|conn| {
            let mut farmer = load_farmer(conn, update.id)?;
            if let Some(name) = update.name.as_deref() {
                farmer.name = require_name(name, "farmer name")?;
            }
            if update.phone.is_some() {
                farmer.phone = clean_phone(update.phone);
            }
            if let Some(kind) = update.kind {
                farmer.kind = kind;
            }
            if let Some(price) = update.price_per_kg {
                farmer.price_per_kg = Some(price.ensure_positive("price per kg")?);
            }
            if update.clear_price {
                farmer.price_per_kg = None;
            }
            conn.execute(
                "UPDATE farmers SET name = ?1, phone = ?2, kind = ?3, price_per_kg = ?4 WHERE id = ?5",
                params![
                    farmer.name,
                    farmer.phone,
                    farmer.kind.as_str(),
                    farmer.price_per_kg.map(Millimes::value),
                    farmer.id
                ],
            )?;
            Ok(farmer)
        })
    }

    pub fn get_farmer(&self, id: i64) -> Result<Farmer> {
        self.with_conn(|conn| load_farmer(conn, id))
    }

    pub fn list_farmers(&self, filter: &FarmerFilter) -> Result<Vec<Farmer>> {
        let pattern = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s.to_lowercase()));
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {FARMER_COLUMNS} FROM farmers
                 WHERE (?1 IS NULL OR lower(name) LIKE ?1 OR phone LIKE ?1)
                   AND (?2 IS NULL OR kind = ?2)
                 ORDER BY name COLLATE NOCASE, id
                 LIMIT ?3"
            ))?;
            let rows = stmt
                .query_map(
                    params![
                        pattern,
                        filter.kind.map(|k| k.as_str()),
                        effective_limit(filter.limit)
                    ],
                    farmer_from_row,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows.into_iter().map(build_farmer).collect()
        })
    }

    /// Delete a farmer that has no boxes in use and no sessions on record.
    pub fn delete_farmer(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            load_farmer(conn, id)?;
            let boxes: i64 = conn.query_row(
                "SELECT COUNT(*) FROM boxes WHERE farmer_id = ?1 AND status = ?2",
                params![id, BoxStatus::InUse.as_str()],
                |row| row.get(0),
            )?;
            if boxes > 0 {
                return Err(StoreError::conflict(format!(
                    "farmer {id} still holds {boxes} box(es); release them first"
                )));
            }
            let sessions: i64 = conn.query_row(
                "SELECT COUNT(*) FROM sessions WHERE farmer_id = ?1",
                params![id],
                |row| row.get(0),
            )?;
            if sessions > 0 {
                return Err(StoreError::conflict(format!(
                    "farmer {id} has {sessions} processing session(s)"
                )));
            }
            conn.execute("DELETE FROM farmers WHERE id = ?1", params![id])?;
            log::info!("Deleted farmer {id}");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use huilerie_domain::FarmerKind;

    fn new_farmer(name: &str, kind: FarmerKind) -> NewFarmer {
        NewFarmer {
            name: name.to_string(),
            phone: Some(" 22 333 444 ".to_string()),
            kind,
            price_per_kg: None,
        }
    }

    #[test]
    fn create_update_and_search() {
        let store = Store::open_in_memory().unwrap();
        let salah = store.create_farmer(new_farmer("Salah Ben Ali", FarmerKind::Small)).unwrap();
        store.create_farmer(new_farmer("Mounir Trabelsi", FarmerKind::Large)).unwrap();
        assert_eq!(salah.phone.as_deref(), Some("22 333 444"));

        let updated = store
            .update_farmer(FarmerUpdate {
                id: salah.id,
                price_per_kg: Some(Millimes(170)),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(updated.price_per_kg, Some(Millimes(170)));

        let found = store
            .list_farmers(&FarmerFilter {
                search: Some("salah".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, salah.id);

        let large = store
            .list_farmers(&FarmerFilter {
                kind: Some(FarmerKind::Large),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(large.len(), 1);
        assert_eq!(large[0].name, "Mounir Trabelsi");
    }

    #[test]
    fn rejects_blank_names_and_missing_ids() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.create_farmer(new_farmer("   ", FarmerKind::Small)).is_err());
        assert!(matches!(
            store.get_farmer(42),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn delete_is_refused_while_boxes_are_held() {
        let store = Store::open_in_memory().unwrap();
        store.seed_inventory(10).unwrap();
        let farmer = store.create_farmer(new_farmer("Hedi", FarmerKind::Small)).unwrap();
        store.assign_box(farmer.id, 3).unwrap();

        assert!(matches!(
            store.delete_farmer(farmer.id),
            Err(StoreError::Conflict(_))
        ));
        store.release_box(3).unwrap();
        store.delete_farmer(farmer.id).unwrap();
        assert!(store.get_farmer(farmer.id).is_err());
    }
}
