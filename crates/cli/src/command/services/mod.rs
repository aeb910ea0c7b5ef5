mod batch;
mod boxes;
mod capabilities;
mod collectors;
mod dashboard;
mod farmers;
mod sessions;
mod staff;
mod statements;

use crate::command::context::CommandContext;
use crate::command::domain::{CommandAction, CommandOutcome, RequestOptions};
use anyhow::Result;
use serde_json::Value;

pub struct Services {
    boxes: boxes::BoxService,
    capabilities: capabilities::CapabilitiesService,
    collectors: collectors::CollectorService,
    dashboard: dashboard::DashboardService,
    farmers: farmers::FarmerService,
    sessions: sessions::SessionService,
    staff: staff::StaffService,
    statements: statements::StatementService,
}

impl Services {
    pub fn new() -> Self {
        Self {
            boxes: boxes::BoxService,
            capabilities: capabilities::CapabilitiesService,
            collectors: collectors::CollectorService,
            dashboard: dashboard::DashboardService,
            farmers: farmers::FarmerService,
            sessions: sessions::SessionService,
            staff: staff::StaffService,
            statements: statements::StatementService,
        }
    }

    pub async fn route(
        &self,
        action: CommandAction,
        payload: Value,
        options: &RequestOptions,
        ctx: &CommandContext,
    ) -> Result<CommandOutcome> {
        match action {
            CommandAction::Batch => batch::run(self, payload, options, ctx).await,
            _ => self.route_item(action, payload, options, ctx).await,
        }
    }

    /// Run one non-batch action and drop cached dashboards after a
    /// successful write.
    async fn route_item(
        &self,
        action: CommandAction,
        payload: Value,
        options: &RequestOptions,
        ctx: &CommandContext,
    ) -> Result<CommandOutcome> {
        let outcome = self.dispatch(action, payload, options, ctx).await?;
        if action.is_mutating() {
            ctx.dashboard_cache().invalidate_all();
        }
        Ok(outcome)
    }

    async fn dispatch(
        &self,
        action: CommandAction,
        payload: Value,
        options: &RequestOptions,
        ctx: &CommandContext,
    ) -> Result<CommandOutcome> {
        match action {
            CommandAction::Capabilities => self.capabilities.run(ctx),
            CommandAction::Batch => Err(crate::command::domain::InvalidRequest(
                "batch items cannot contain another batch".to_string(),
            )
            .into()),
            CommandAction::FarmerCreate => self.farmers.create(payload, ctx).await,
            CommandAction::FarmerUpdate => self.farmers.update(payload, ctx).await,
            CommandAction::FarmerGet => self.farmers.get(payload, ctx).await,
            CommandAction::FarmerList => self.farmers.list(payload, ctx).await,
            CommandAction::FarmerDelete => self.farmers.delete(payload, ctx).await,
            CommandAction::BoxSeed => self.boxes.seed(payload, ctx).await,
            CommandAction::BoxList => self.boxes.list(payload, ctx).await,
            CommandAction::BoxGet => self.boxes.get(payload, ctx).await,
            CommandAction::BoxSetKind => self.boxes.set_kind(payload, ctx).await,
            CommandAction::BoxAssign => self.boxes.assign(payload, ctx).await,
            CommandAction::BoxAssignBulk => self.boxes.assign_bulk(payload, ctx).await,
            CommandAction::BoxWeigh => self.boxes.weigh(payload, ctx).await,
            CommandAction::BoxRelease => self.boxes.release(payload, ctx).await,
            CommandAction::BoxReleaseFarmer => self.boxes.release_farmer(payload, ctx).await,
            CommandAction::BoxDelete => self.boxes.delete(payload, ctx).await,
            CommandAction::SessionCreate => self.sessions.create(payload, ctx).await,
            CommandAction::SessionGet => self.sessions.get(payload, ctx).await,
            CommandAction::SessionList => self.sessions.list(payload, ctx).await,
            CommandAction::SessionUpdate => self.sessions.update(payload, ctx).await,
            CommandAction::SessionDelete => self.sessions.delete(payload, ctx).await,
            CommandAction::PaymentRecord => self.sessions.record_payment(payload, ctx).await,
            CommandAction::PaymentList => self.sessions.list_payments(payload, ctx).await,
            CommandAction::FarmerBalance => self.sessions.farmer_balance(payload, ctx).await,
            CommandAction::GroupCreate => self.collectors.create_group(payload, ctx).await,
            CommandAction::GroupList => self.collectors.list_groups(ctx).await,
            CommandAction::CollectorCreate => self.collectors.create_collector(payload, ctx).await,
            CommandAction::CollectorList => self.collectors.list_collectors(payload, ctx).await,
            CommandAction::CollectionRecord => self.collectors.record(payload, ctx).await,
            CommandAction::CollectionList => self.collectors.list_entries(payload, ctx).await,
            CommandAction::GroupSummary => self.collectors.summary(payload, ctx).await,
            CommandAction::EmployeeCreate => self.staff.create(payload, ctx).await,
            CommandAction::EmployeeList => self.staff.list(payload, ctx).await,
            CommandAction::EmployeeUpdate => self.staff.update(payload, ctx).await,
            CommandAction::AttendanceMark => self.staff.mark_attendance(payload, ctx).await,
            CommandAction::AttendanceList => self.staff.list_attendance(payload, ctx).await,
            CommandAction::AdvanceRecord => self.staff.record_advance(payload, ctx).await,
            CommandAction::Payroll => self.staff.payroll(payload, ctx).await,
            CommandAction::Dashboard => self.dashboard.run(payload, options, ctx).await,
            CommandAction::FarmerStatement => self.statements.farmer(payload, ctx).await,
            CommandAction::SessionReceipt => self.statements.receipt(payload, ctx).await,
        }
    }
}
