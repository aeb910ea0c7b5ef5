use huilerie_domain::{DateRange, DATE_FORMAT};
use huilerie_store::{Farmer, FarmerBalance, Payment, Session};
use serde::Serialize;

/// Everything printed on a farmer statement.
#[derive(Debug, Clone, Serialize)]
pub struct FarmerStatement {
    pub farmer: Farmer,
    pub range: DateRange,
    pub sessions: Vec<Session>,
    pub payments: Vec<Payment>,
    pub balance: FarmerBalance,
}

pub fn render_farmer_statement(statement: &FarmerStatement) -> String {
    let farmer = &statement.farmer;
    let mut md = String::new();
    md.push_str(&format!("# Statement: {}\n\n", farmer.name));
    md.push_str(&format!("- Farmer id: `{}`\n", farmer.id));
    if let Some(phone) = farmer.phone.as_deref() {
        md.push_str(&format!("- Phone: {phone}\n"));
    }
    md.push_str(&format!("- Tier: `{}`\n", farmer.kind.as_str()));
    md.push_str(&format!("- Period: {}\n\n", describe_range(&statement.range)));

    md.push_str("## Sessions\n\n");
    if statement.sessions.is_empty() {
        md.push_str("_No sessions in this period._\n\n");
    } else {
        md.push_str("| # | date | boxes | olives (kg) | oil (kg) | yield | total | paid | status |\n");
        md.push_str("|---:|---|---:|---:|---:|---:|---:|---:|---|\n");
        for session in &statement.sessions {
            md.push_str(&format!(
                "| {} | {} | {} | {:.2} | {:.2} | {} | {} | {} | {} |\n",
                session.id,
                session.processing_date.format(DATE_FORMAT),
                session.boxes.len(),
                session.olive_weight_kg,
                session.oil_weight_kg,
                format_yield(session.oil_yield_percent),
                session.total_price,
                session.paid,
                session.payment_status.as_str(),
            ));
        }
        md.push('\n');
    }

    md.push_str("## Payments\n\n");
    if statement.payments.is_empty() {
        md.push_str("_No payments in this period._\n\n");
    } else {
        md.push_str("| date | session | amount | method |\n");
        md.push_str("|---|---:|---:|---|\n");
        for payment in &statement.payments {
            md.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                payment.paid_on.format(DATE_FORMAT),
                payment.session_id,
                payment.amount,
                escape_cell(payment.method.as_deref().unwrap_or("-")),
            ));
        }
        md.push('\n');
    }

    let balance = &statement.balance;
    md.push_str("## Balance (all time)\n\n");
    md.push_str(&format!("- Sessions: {}\n", balance.sessions));
    md.push_str(&format!("- Owed: {}\n", balance.total_owed));
    md.push_str(&format!("- Paid: {}\n", balance.total_paid));
    md.push_str(&format!("- Outstanding: **{}**\n", balance.outstanding));
    md.push_str(&format!("- Status: `{}`\n", balance.status.as_str()));
    md
}

pub fn render_session_receipt(session: &Session) -> String {
    let mut md = String::new();
    md.push_str(&format!("# Receipt: session {}\n\n", session.id));
    md.push_str(&format!(
        "- Farmer: {} (`{}`)\n",
        session.farmer_name, session.farmer_id
    ));
    md.push_str(&format!(
        "- Date: {}\n",
        session.processing_date.format(DATE_FORMAT)
    ));
    if let Some(notes) = session.notes.as_deref() {
        md.push_str(&format!("- Notes: {}\n", notes.replace('\n', " ")));
    }
    md.push('\n');

    md.push_str("| box | kind | weight (kg) |\n");
    md.push_str("|---:|---|---:|\n");
    for item in &session.boxes {
        md.push_str(&format!(
            "| {} | {} | {:.2} |\n",
            item.box_id,
            item.kind.as_str(),
            item.weight_kg
        ));
    }
    md.push('\n');

    md.push_str(&format!("- Olives: {:.2} kg\n", session.olive_weight_kg));
    md.push_str(&format!("- Oil: {:.2} kg\n", session.oil_weight_kg));
    md.push_str(&format!(
        "- Yield: {}\n",
        format_yield(session.oil_yield_percent)
    ));
    md.push_str(&format!("- Price per kg: {}\n", session.price_per_kg));
    md.push_str(&format!("- Total: **{}**\n", session.total_price));
    md.push_str(&format!("- Paid: {}\n", session.paid));
    md.push_str(&format!("- Outstanding: {}\n", session.outstanding));
    md
}

fn describe_range(range: &DateRange) -> String {
    match (range.from, range.to) {
        (None, None) => "all time".to_string(),
        (Some(from), None) => format!("from {}", from.format(DATE_FORMAT)),
        (None, Some(to)) => format!("until {}", to.format(DATE_FORMAT)),
        (Some(from), Some(to)) => format!(
            "{} to {}",
            from.format(DATE_FORMAT),
            to.format(DATE_FORMAT)
        ),
    }
}

fn format_yield(percent: Option<f64>) -> String {
    percent.map_or_else(|| "n/a".to_string(), |p| format!("{p:.1}%"))
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
