use crate::command::context::CommandContext;
use crate::command::domain::{parse_payload, CommandOutcome};
use anyhow::Result;
use huilerie_domain::{DateRange, Millimes};
use huilerie_store::{AttendanceFilter, AttendanceMark, EmployeeUpdate, NewAdvance, NewEmployee};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct EmployeeListPayload {
    #[serde(default)]
    include_inactive: bool,
}

#[derive(Debug, Deserialize)]
struct PayrollPayload {
    #[serde(flatten)]
    range: DateRange,
    /// Overrides `payroll.overtime_rate_per_hour` for this run
    #[serde(default)]
    overtime_rate_per_hour: Option<Millimes>,
}

/// Employees, attendance, advances and payroll.
pub(crate) struct StaffService;

impl StaffService {
    pub async fn create(&self, payload: Value, ctx: &CommandContext) -> Result<CommandOutcome> {
        let new: NewEmployee = parse_payload(payload)?;
        let employee = ctx.with_store(move |store| store.create_employee(new)).await?;
        CommandOutcome::from_value(employee)
    }

    pub async fn list(&self, payload: Value, ctx: &CommandContext) -> Result<CommandOutcome> {
        let EmployeeListPayload { include_inactive } = parse_payload(payload)?;
        let employees = ctx
            .with_store(move |store| store.list_employees(include_inactive))
            .await?;
        CommandOutcome::from_list(employees)
    }

    pub async fn update(&self, payload: Value, ctx: &CommandContext) -> Result<CommandOutcome> {
        let update: EmployeeUpdate = parse_payload(payload)?;
        let employee = ctx.with_store(move |store| store.update_employee(update)).await?;
        CommandOutcome::from_value(employee)
    }

    pub async fn mark_attendance(&self, payload: Value, ctx: &CommandContext) -> Result<CommandOutcome> {
        let mark: AttendanceMark = parse_payload(payload)?;
        let record = ctx.with_store(move |store| store.mark_attendance(mark)).await?;
        CommandOutcome::from_value(record)
    }

    pub async fn list_attendance(&self, payload: Value, ctx: &CommandContext) -> Result<CommandOutcome> {
        let filter: AttendanceFilter = parse_payload(payload)?;
        let records = ctx
            .with_store(move |store| store.list_attendance(&filter))
            .await?;
        CommandOutcome::from_list(records)
    }

    pub async fn record_advance(&self, payload: Value, ctx: &CommandContext) -> Result<CommandOutcome> {
        let new: NewAdvance = parse_payload(payload)?;
        let advance = ctx.with_store(move |store| store.record_advance(new)).await?;
        CommandOutcome::from_value(advance)
    }

    pub async fn payroll(&self, payload: Value, ctx: &CommandContext) -> Result<CommandOutcome> {
        let PayrollPayload {
            range,
            overtime_rate_per_hour,
        } = parse_payload(payload)?;
        let rate = overtime_rate_per_hour.unwrap_or(ctx.config().payroll.overtime_rate_per_hour);
        let report = ctx.with_store(move |store| store.payroll(range, rate)).await?;
        let count = report.entries.len();
        let mut outcome = CommandOutcome::from_value(report)?;
        outcome.meta.count = Some(count);
        Ok(outcome)
    }
}
