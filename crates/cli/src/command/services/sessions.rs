use crate::command::context::CommandContext;
use crate::command::domain::{parse_payload, CommandAction, CommandOutcome, HintKind};
use anyhow::Result;
use huilerie_domain::PaymentStatus;
use huilerie_store::{NewPayment, NewSession, PaymentFilter, SessionFilter, SessionUpdate};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
struct SessionRef {
    session_id: i64,
}

#[derive(Debug, Deserialize)]
struct FarmerRef {
    farmer_id: i64,
}

/// Processing sessions and the payments made against them.
pub(crate) struct SessionService;

impl SessionService {
    pub async fn create(&self, payload: Value, ctx: &CommandContext) -> Result<CommandOutcome> {
        let new: NewSession = parse_payload(payload)?;
        let prices = ctx.config().price_list();
        let session = ctx
            .with_store(move |store| store.create_session(new, &prices))
            .await?;
        let session_id = session.id;
        let total = session.total_price;
        let outcome = CommandOutcome::from_value(session)?
            .with_hint(HintKind::Info, format!("Session total: {total}"));
        // A free session is already paid.
        if total.value() == 0 {
            return Ok(outcome);
        }
        Ok(outcome.with_next_action(
            CommandAction::PaymentRecord,
            json!({ "session_id": session_id, "amount": total }),
            "Record the farmer's payment.",
        ))
    }

    pub async fn get(&self, payload: Value, ctx: &CommandContext) -> Result<CommandOutcome> {
        let SessionRef { session_id } = parse_payload(payload)?;
        let session = ctx.with_store(move |store| store.get_session(session_id)).await?;
        CommandOutcome::from_value(session)
    }

    pub async fn list(&self, payload: Value, ctx: &CommandContext) -> Result<CommandOutcome> {
        let filter: SessionFilter = parse_payload(payload)?;
        let sessions = ctx.with_store(move |store| store.list_sessions(&filter)).await?;
        CommandOutcome::from_list(sessions)
    }

    pub async fn update(&self, payload: Value, ctx: &CommandContext) -> Result<CommandOutcome> {
        let update: SessionUpdate = parse_payload(payload)?;
        let session = ctx.with_store(move |store| store.update_session(update)).await?;
        CommandOutcome::from_value(session)
    }

    pub async fn delete(&self, payload: Value, ctx: &CommandContext) -> Result<CommandOutcome> {
        let SessionRef { session_id } = parse_payload(payload)?;
        ctx.with_store(move |store| store.delete_session(session_id)).await?;
        CommandOutcome::from_value(json!({ "session_id": session_id, "deleted": true }))
    }

    pub async fn record_payment(&self, payload: Value, ctx: &CommandContext) -> Result<CommandOutcome> {
        let new: NewPayment = parse_payload(payload)?;
        let (payment, session) = ctx
            .with_store(move |store| {
                let payment = store.record_payment(new)?;
                let session = store.get_session(payment.session_id)?;
                Ok((payment, session))
            })
            .await?;
        let mut outcome = CommandOutcome::from_value(json!({
            "payment": payment,
            "session_status": session.payment_status,
            "outstanding": session.outstanding,
        }))?;
        if session.payment_status == PaymentStatus::Paid {
            outcome = outcome.with_hint(HintKind::Info, format!("Session {} is fully paid", session.id));
        }
        Ok(outcome)
    }

    pub async fn list_payments(&self, payload: Value, ctx: &CommandContext) -> Result<CommandOutcome> {
        let filter: PaymentFilter = parse_payload(payload)?;
        let payments = ctx.with_store(move |store| store.list_payments(&filter)).await?;
        CommandOutcome::from_list(payments)
    }

    pub async fn farmer_balance(&self, payload: Value, ctx: &CommandContext) -> Result<CommandOutcome> {
        let FarmerRef { farmer_id } = parse_payload(payload)?;
        let balance = ctx.with_store(move |store| store.farmer_balance(farmer_id)).await?;
        CommandOutcome::from_value(balance)
    }
}
