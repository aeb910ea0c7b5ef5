use chrono::NaiveDate;
use huilerie_domain::{
    AttendanceStatus, BoxKind, BoxStatus, DateRange, FarmerKind, Millimes, PaymentStatus,
    PayrollLine, SackCount, SessionBox,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_LIST_LIMIT: usize = 200;

// Farmers

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Farmer {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub kind: FarmerKind,
    /// Per-farmer price override; the tier price applies when absent
    pub price_per_kg: Option<Millimes>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFarmer {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub kind: FarmerKind,
    #[serde(default)]
    pub price_per_kg: Option<Millimes>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FarmerUpdate {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub kind: Option<FarmerKind>,
    #[serde(default)]
    pub price_per_kg: Option<Millimes>,
    /// Drop the price override and fall back to the tier price
    #[serde(default)]
    pub clear_price: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FarmerFilter {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub kind: Option<FarmerKind>,
    #[serde(default)]
    pub limit: Option<usize>,
}

// Boxes

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoxFilter {
    #[serde(default)]
    pub status: Option<BoxStatus>,
    #[serde(default)]
    pub farmer_id: Option<i64>,
    #[serde(default)]
    pub kind: Option<BoxKind>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoxCounts {
    pub total: u64,
    pub available: u64,
    pub in_use: u64,
    pub chkara: u64,
}

// Sessions

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSession {
    pub farmer_id: i64,
    pub box_ids: Vec<u32>,
    #[serde(default)]
    pub oil_weight_kg: f64,
    #[serde(default)]
    pub price_per_kg: Option<Millimes>,
    #[serde(default)]
    pub processing_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: i64,
    pub farmer_id: i64,
    pub farmer_name: String,
    pub processing_date: NaiveDate,
    pub boxes: Vec<SessionBox>,
    pub olive_weight_kg: f64,
    pub oil_weight_kg: f64,
    pub oil_yield_percent: Option<f64>,
    pub price_per_kg: Millimes,
    pub total_price: Millimes,
    pub paid: Millimes,
    pub outstanding: Millimes,
    pub payment_status: PaymentStatus,
    pub notes: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionUpdate {
    pub id: i64,
    #[serde(default)]
    pub oil_weight_kg: Option<f64>,
    #[serde(default)]
    pub price_per_kg: Option<Millimes>,
    #[serde(default)]
    pub processing_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionFilter {
    #[serde(default)]
    pub farmer_id: Option<i64>,
    #[serde(flatten)]
    pub range: DateRange,
    #[serde(default)]
    pub payment_status: Option<PaymentStatus>,
    #[serde(default)]
    pub limit: Option<usize>,
}

// Payments

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPayment {
    pub session_id: i64,
    pub amount: Millimes,
    #[serde(default)]
    pub paid_on: Option<NaiveDate>,
    #[serde(default)]
    pub method: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub session_id: i64,
    pub farmer_id: i64,
    pub amount: Millimes,
    pub paid_on: NaiveDate,
    pub method: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentFilter {
    #[serde(default)]
    pub farmer_id: Option<i64>,
    #[serde(default)]
    pub session_id: Option<i64>,
    #[serde(flatten)]
    pub range: DateRange,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmerBalance {
    pub farmer_id: i64,
    pub farmer_name: String,
    pub sessions: u64,
    pub total_owed: Millimes,
    pub total_paid: Millimes,
    pub outstanding: Millimes,
    pub status: PaymentStatus,
}

// Collector groups

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGroup {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectorGroup {
    pub id: i64,
    pub name: String,
    pub collectors: u64,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCollector {
    pub group_id: i64,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collector {
    pub id: i64,
    pub group_id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCollectionEntry {
    pub collector_id: i64,
    #[serde(default)]
    pub collected_on: Option<NaiveDate>,
    #[serde(default)]
    pub chakra: u64,
    #[serde(default)]
    pub galba: u64,
    pub price_per_chakra: Millimes,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionEntry {
    pub id: i64,
    pub collector_id: i64,
    pub collected_on: NaiveDate,
    pub quantity: SackCount,
    pub price_per_chakra: Millimes,
    pub amount: Millimes,
    pub notes: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionFilter {
    #[serde(default)]
    pub collector_id: Option<i64>,
    #[serde(default)]
    pub group_id: Option<i64>,
    #[serde(flatten)]
    pub range: DateRange,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectorTotals {
    pub collector_id: i64,
    pub name: String,
    pub entries: u64,
    pub quantity: SackCount,
    pub amount: Millimes,
    /// Amount divided by chakra equivalent; `None` when nothing was collected
    pub average_price_per_chakra: Option<Millimes>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub group_id: i64,
    pub group_name: String,
    pub range: DateRange,
    pub collectors: Vec<CollectorTotals>,
    pub quantity: SackCount,
    pub amount: Millimes,
    pub average_price_per_chakra: Option<Millimes>,
}

// Employees

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEmployee {
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
    pub daily_wage: Millimes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: i64,
    pub name: String,
    pub role: Option<String>,
    pub daily_wage: Millimes,
    pub active: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmployeeUpdate {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub daily_wage: Option<Millimes>,
    #[serde(default)]
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceMark {
    pub employee_id: i64,
    #[serde(default)]
    pub work_date: Option<NaiveDate>,
    pub status: AttendanceStatus,
    #[serde(default)]
    pub overtime_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub employee_id: i64,
    pub work_date: NaiveDate,
    pub status: AttendanceStatus,
    pub overtime_hours: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttendanceFilter {
    #[serde(default)]
    pub employee_id: Option<i64>,
    #[serde(flatten)]
    pub range: DateRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAdvance {
    pub employee_id: i64,
    pub amount: Millimes,
    #[serde(default)]
    pub given_on: Option<NaiveDate>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advance {
    pub id: i64,
    pub employee_id: i64,
    pub amount: Millimes,
    pub given_on: NaiveDate,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayrollEntry {
    pub employee_id: i64,
    pub name: String,
    pub daily_wage: Millimes,
    #[serde(flatten)]
    pub line: PayrollLine,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayrollReport {
    pub range: DateRange,
    pub entries: Vec<PayrollEntry>,
    pub total_gross: Millimes,
    pub total_advances: Millimes,
    pub total_net: Millimes,
}

// Dashboard

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardMetrics {
    pub range: DateRange,
    pub farmers: u64,
    pub boxes: BoxCounts,
    pub sessions: u64,
    pub olive_weight_kg: f64,
    pub oil_weight_kg: f64,
    /// Total oil over total olives, so heavy sessions weigh more
    pub average_yield_percent: Option<f64>,
    pub revenue: Millimes,
    pub payments_collected: Millimes,
    pub outstanding: Millimes,
    pub collected: SackCount,
    pub collection_amount: Millimes,
    pub active_employees: u64,
}

pub(crate) fn effective_limit(limit: Option<usize>) -> i64 {
    let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, 10_000);
    limit as i64
}
