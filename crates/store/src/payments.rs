use crate::db::{format_date, now_stamp, parse_date, to_u64, today, Store};
use crate::error::Result;
use crate::farmers::load_farmer;
use crate::models::{effective_limit, FarmerBalance, NewPayment, Payment, PaymentFilter};
use crate::sessions::load_session;
use huilerie_domain::{check_payment, Millimes, PaymentStatus};
use rusqlite::{params, Connection};

fn load_payment(conn: &Connection, id: i64) -> Result<Payment> {
    let (session_id, farmer_id, amount, paid_on, method, created_at): (
        i64,
        i64,
        i64,
        String,
        Option<String>,
        String,
    ) = conn.query_row(
        "SELECT session_id, farmer_id, amount, paid_on, method, created_at FROM payments WHERE id = ?1",
        params![id],
        |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
            ))
        },
    )?;
    Ok(Payment {
        id,
        session_id,
        farmer_id,
        amount: Millimes(amount),
        paid_on: parse_date(&paid_on)?,
        method,
        created_at,
    })
}

impl Store {
    /// Record a payment against a session. The amount must not exceed what
    /// is still owed on that session.
    pub fn record_payment(&self, new: NewPayment) -> Result<Payment> {
        self.with_tx(|tx| {
            let session = load_session(tx, new.session_id)?;
            if let Err(err) = check_payment(session.total_price, session.paid, new.amount) {
                log::debug!("Rejected payment on session {}: {err}", session.id);
                return Err(err.into());
            }
            let method = new
                .method
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty());
            tx.execute(
                "INSERT INTO payments (session_id, farmer_id, amount, paid_on, method, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    session.id,
                    session.farmer_id,
                    new.amount.value(),
                    format_date(new.paid_on.unwrap_or_else(today)),
                    method,
                    now_stamp()
                ],
            )?;
            let payment = load_payment(tx, tx.last_insert_rowid())?;
            log::info!(
                "Payment {} of {} on session {}",
                payment.id,
                payment.amount,
                payment.session_id
            );
            Ok(payment)
        })
    }

    pub fn list_payments(&self, filter: &PaymentFilter) -> Result<Vec<Payment>> {
        let range = filter.range.validated()?;
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id FROM payments
                 WHERE (?1 IS NULL OR farmer_id = ?1)
                   AND (?2 IS NULL OR session_id = ?2)
                   AND paid_on BETWEEN ?3 AND ?4
                 ORDER BY paid_on DESC, id DESC
                 LIMIT ?5",
            )?;
            let ids = stmt
                .query_map(
                    params![
                        filter.farmer_id,
                        filter.session_id,
                        range.lower_bound(),
                        range.upper_bound(),
                        effective_limit(filter.limit)
                    ],
                    |row| row.get::<_, i64>(0),
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            ids.into_iter().map(|id| load_payment(conn, id)).collect()
        })
    }

    /// Everything a farmer owes across all sessions, and what has been paid.
    pub fn farmer_balance(&self, farmer_id: i64) -> Result<FarmerBalance> {
        self.with_conn(|conn| {
            let farmer = load_farmer(conn, farmer_id)?;
            let (sessions, owed): (i64, i64) = conn.query_row(
                "SELECT COUNT(*), COALESCE(SUM(total_price), 0) FROM sessions WHERE farmer_id = ?1",
                params![farmer_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            let paid: i64 = conn.query_row(
                "SELECT COALESCE(SUM(amount), 0) FROM payments WHERE farmer_id = ?1",
                params![farmer_id],
                |row| row.get(0),
            )?;
            let total_owed = Millimes(owed);
            let total_paid = Millimes(paid);
            Ok(FarmerBalance {
                farmer_id,
                farmer_name: farmer.name,
                sessions: to_u64(sessions, "session count")?,
                total_owed,
                total_paid,
                outstanding: total_owed - total_paid,
                status: PaymentStatus::from_amounts(total_owed, total_paid),
            })
        })
    }
}
