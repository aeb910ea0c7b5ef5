use crate::db::{format_date, now_stamp, parse_date, parse_enum, require_name, today, Store};
use crate::error::{Result, StoreError};
use crate::models::{
    Advance, AttendanceFilter, AttendanceMark, AttendanceRecord, Employee, EmployeeUpdate,
    NewAdvance, NewEmployee, PayrollEntry, PayrollReport,
};
use huilerie_domain::{compute_payroll, DateRange, DomainError, Millimes, PayrollInput};
use rusqlite::{params, Connection, OptionalExtension};

fn load_employee(conn: &Connection, id: i64) -> Result<Employee> {
    conn.query_row(
        "SELECT name, role, daily_wage, active, created_at FROM employees WHERE id = ?1",
        params![id],
        |row| {
            Ok(Employee {
                id,
                name: row.get(0)?,
                role: row.get(1)?,
                daily_wage: Millimes(row.get(2)?),
                active: row.get(3)?,
                created_at: row.get(4)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| StoreError::not_found("Employee", id))
}

fn clean_role(role: Option<String>) -> Option<String> {
    role.map(|r| r.trim().to_string()).filter(|r| !r.is_empty())
}

fn attendance_rows(
    conn: &Connection,
    employee_id: Option<i64>,
    range: &DateRange,
) -> Result<Vec<AttendanceRecord>> {
    let mut stmt = conn.prepare(
        "SELECT employee_id, work_date, status, overtime_hours FROM attendance
         WHERE (?1 IS NULL OR employee_id = ?1) AND work_date BETWEEN ?2 AND ?3
         ORDER BY work_date, employee_id",
    )?;
    let rows = stmt
        .query_map(
            params![employee_id, range.lower_bound(), range.upper_bound()],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, f64>(3)?,
                ))
            },
        )?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter()
        .map(|(employee_id, work_date, status, overtime_hours)| {
            Ok(AttendanceRecord {
                employee_id,
                work_date: parse_date(&work_date)?,
                status: parse_enum(&status, "attendance status")?,
                overtime_hours,
            })
        })
        .collect()
}

impl Store {
    pub fn create_employee(&self, new: NewEmployee) -> Result<Employee> {
        let name = require_name(&new.name, "employee name")?;
        let wage = new.daily_wage.ensure_positive("daily wage")?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO employees (name, role, daily_wage, active, created_at) VALUES (?1, ?2, ?3, 1, ?4)",
                params![name, clean_role(new.role), wage.value(), now_stamp()],
            )?;
            let employee = load_employee(conn, conn.last_insert_rowid())?;
            log::info!("Created employee {} ({})", employee.id, employee.name);
            Ok(employee)
        })
    }

    pub fn list_employees(&self, include_inactive: bool) -> Result<Vec<Employee>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id FROM employees WHERE (?1 OR active = 1) ORDER BY name COLLATE NOCASE, id",
            )?;
            let ids = stmt
                .query_map(params![include_inactive], |row| row.get::<_, i64>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            ids.into_iter().map(|id| load_employee(conn, id)).collect()
        })
    }

    pub fn update_employee(&self, update: EmployeeUpdate) -> Result<Employee> {
        self.with_conn(|conn| {
            let mut employee = load_employee(conn, update.id)?;
            if let Some(name) = update.name.as_deref() {
                employee.name = require_name(name, "employee name")?;
            }
            if update.role.is_some() {
                employee.role = clean_role(update.role);
            }
            if let Some(wage) = update.daily_wage {
                employee.daily_wage = wage.ensure_positive("daily wage")?;
            }
            if let Some(active) = update.active {
                employee.active = active;
            }
            conn.execute(
                "UPDATE employees SET name = ?1, role = ?2, daily_wage = ?3, active = ?4 WHERE id = ?5",
                params![
                    employee.name,
                    employee.role,
                    employee.daily_wage.value(),
                    employee.active,
                    employee.id
                ],
            )?;
            Ok(employee)
        })
    }

    /// One record per employee and day; marking the same day again replaces it.
    pub fn mark_attendance(&self, mark: AttendanceMark) -> Result<AttendanceRecord> {
        if !mark.overtime_hours.is_finite() || mark.overtime_hours < 0.0 {
            return Err(DomainError::validation(format!(
                "overtime hours must be zero or positive, got {}",
                mark.overtime_hours
            ))
            .into());
        }
        let work_date = mark.work_date.unwrap_or_else(today);
        self.with_conn(|conn| {
            load_employee(conn, mark.employee_id)?;
            conn.execute(
                "INSERT INTO attendance (employee_id, work_date, status, overtime_hours)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(employee_id, work_date)
                 DO UPDATE SET status = excluded.status, overtime_hours = excluded.overtime_hours",
                params![
                    mark.employee_id,
                    format_date(work_date),
                    mark.status.as_str(),
                    mark.overtime_hours
                ],
            )?;
            log::debug!(
                "Attendance {} for employee {} on {work_date}",
                mark.status.as_str(),
                mark.employee_id
            );
            Ok(AttendanceRecord {
                employee_id: mark.employee_id,
                work_date,
                status: mark.status,
                overtime_hours: mark.overtime_hours,
            })
        })
    }

    pub fn list_attendance(&self, filter: &AttendanceFilter) -> Result<Vec<AttendanceRecord>> {
        let range = filter.range.validated()?;
        self.with_conn(|conn| attendance_rows(conn, filter.employee_id, &range))
    }

    pub fn record_advance(&self, new: NewAdvance) -> Result<Advance> {
        let amount = new.amount.ensure_positive("advance amount")?;
        let given_on = new.given_on.unwrap_or_else(today);
        self.with_conn(|conn| {
            load_employee(conn, new.employee_id)?;
            conn.execute(
                "INSERT INTO salary_advances (employee_id, amount, given_on, note, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    new.employee_id,
                    amount.value(),
                    format_date(given_on),
                    new.note,
                    now_stamp()
                ],
            )?;
            let advance = Advance {
                id: conn.last_insert_rowid(),
                employee_id: new.employee_id,
                amount,
                given_on,
                note: new.note,
            };
            log::info!(
                "Advance {} of {} to employee {}",
                advance.id,
                advance.amount,
                advance.employee_id
            );
            Ok(advance)
        })
    }

    /// Pay due to every active employee for the days marked in `range`, less
    /// the advances given in the same range.
    pub fn payroll(&self, range: DateRange, overtime_rate_per_hour: Millimes) -> Result<PayrollReport> {
        let range = range.validated()?;
        if overtime_rate_per_hour.value() < 0 {
            return Err(DomainError::validation(format!(
                "overtime rate must not be negative, got {overtime_rate_per_hour}"
            ))
            .into());
        }
        self.with_conn(|conn| {
            let employees = {
                let mut stmt = conn.prepare(
                    "SELECT id FROM employees WHERE active = 1 ORDER BY name COLLATE NOCASE, id",
                )?;
                let ids = stmt
                    .query_map([], |row| row.get::<_, i64>(0))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                ids.into_iter()
                    .map(|id| load_employee(conn, id))
                    .collect::<Result<Vec<_>>>()?
            };

            let mut entries = Vec::with_capacity(employees.len());
            for employee in employees {
                let days = attendance_rows(conn, Some(employee.id), &range)?;
                let half_days = days.iter().map(|d| d.status.half_days()).sum();
                let overtime_hours = days.iter().map(|d| d.overtime_hours).sum();
                let advances: i64 = conn.query_row(
                    "SELECT COALESCE(SUM(amount), 0) FROM salary_advances
                     WHERE employee_id = ?1 AND given_on BETWEEN ?2 AND ?3",
                    params![employee.id, range.lower_bound(), range.upper_bound()],
                    |row| row.get(0),
                )?;
                let line = compute_payroll(PayrollInput {
                    daily_wage: employee.daily_wage,
                    half_days,
                    overtime_hours,
                    overtime_rate_per_hour,
                    advances: Millimes(advances),
                })?;
                entries.push(PayrollEntry {
                    employee_id: employee.id,
                    name: employee.name,
                    daily_wage: employee.daily_wage,
                    line,
                });
            }

            Ok(PayrollReport {
                range,
                total_gross: entries.iter().map(|e| e.line.gross).sum(),
                total_advances: entries.iter().map(|e| e.line.advances).sum(),
                total_net: entries.iter().map(|e| e.line.net).sum(),
                entries,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use huilerie_domain::AttendanceStatus;

    fn day(d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2025, 11, d)
    }

    fn hire(store: &Store, name: &str, wage: i64) -> Employee {
        store
            .create_employee(NewEmployee {
                name: name.to_string(),
                role: Some("press".to_string()),
                daily_wage: Millimes(wage),
            })
            .unwrap()
    }

    fn mark(store: &Store, employee_id: i64, d: u32, status: AttendanceStatus, overtime: f64) {
        store
            .mark_attendance(AttendanceMark {
                employee_id,
                work_date: day(d),
                status,
                overtime_hours: overtime,
            })
            .unwrap();
    }

    #[test]
    fn attendance_upserts_per_day() {
        let store = Store::open_in_memory().unwrap();
        let karim = hire(&store, "Karim", 30_000);
        mark(&store, karim.id, 3, AttendanceStatus::Absent, 0.0);
        mark(&store, karim.id, 3, AttendanceStatus::Present, 2.0);

        let records = store
            .list_attendance(&AttendanceFilter {
                employee_id: Some(karim.id),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, AttendanceStatus::Present);
        assert!(store
            .mark_attendance(AttendanceMark {
                employee_id: karim.id,
                work_date: day(4),
                status: AttendanceStatus::Present,
                overtime_hours: -1.0,
            })
            .is_err());
    }

    #[test]
    fn payroll_covers_active_employees_in_range() {
        let store = Store::open_in_memory().unwrap();
        let karim = hire(&store, "Karim", 30_000);
        let leila = hire(&store, "Leila", 25_000);
        let gone = hire(&store, "Zied", 20_000);
        store
            .update_employee(EmployeeUpdate {
                id: gone.id,
                active: Some(false),
                ..Default::default()
            })
            .unwrap();

        mark(&store, karim.id, 3, AttendanceStatus::Present, 2.0);
        mark(&store, karim.id, 4, AttendanceStatus::HalfDay, 0.0);
        mark(&store, karim.id, 20, AttendanceStatus::Present, 0.0);
        mark(&store, leila.id, 3, AttendanceStatus::Absent, 0.0);
        store
            .record_advance(NewAdvance {
                employee_id: leila.id,
                amount: Millimes(10_000),
                given_on: day(5),
                note: None,
            })
            .unwrap();

        let report = store
            .payroll(DateRange::new(day(1), day(10)).unwrap(), Millimes(5_000))
            .unwrap();
        assert_eq!(report.entries.len(), 2);

        let karim_line = &report.entries[0].line;
        assert!((karim_line.worked_days - 1.5).abs() < f64::EPSILON);
        assert_eq!(karim_line.base_pay, Millimes(45_000));
        assert_eq!(karim_line.overtime_pay, Millimes(10_000));

        let leila_line = &report.entries[1].line;
        assert_eq!(leila_line.gross, Millimes::ZERO);
        assert_eq!(leila_line.net, Millimes(-10_000));

        assert_eq!(report.total_gross, Millimes(55_000));
        assert_eq!(report.total_net, Millimes(45_000));
        assert_eq!(store.list_employees(false).unwrap().len(), 2);
        assert_eq!(store.list_employees(true).unwrap().len(), 3);
    }

    #[test]
    fn payroll_rejects_negative_overtime_rate() {
        let store = Store::open_in_memory().unwrap();
        let karim = hire(&store, "Karim", 30_000);
        mark(&store, karim.id, 3, AttendanceStatus::Present, 2.0);
        let range = DateRange::new(day(1), day(10)).unwrap();
        assert!(matches!(
            store.payroll(range, Millimes(-1)),
            Err(StoreError::Domain(DomainError::Validation(_)))
        ));

        let free_overtime = store.payroll(range, Millimes::ZERO).unwrap();
        assert_eq!(free_overtime.entries[0].line.overtime_pay, Millimes::ZERO);
    }

    #[test]
    fn wages_must_be_positive() {
        let store = Store::open_in_memory().unwrap();
        assert!(store
            .create_employee(NewEmployee {
                name: "Nour".to_string(),
                role: None,
                daily_wage: Millimes::ZERO,
            })
            .is_err());
    }
}
