use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Payment, PaymentStatus};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePaymentRequest {
    pub course_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdatePaymentStatusRequest {
    pub status: PaymentStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PayerSummary {
    pub email: String,
    pub full_name: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaidCourseSummary {
    pub title: String,
    pub price: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentRow {
    #[serde(flatten)]
    pub payment: Payment,
    pub payer: Option<PayerSummary>,
    pub course: Option<PaidCourseSummary>,
}

#[derive(Debug, Default, PartialEq, Serialize, ToSchema)]
pub struct PaymentStats {
    pub total_revenue: i64,
    pub monthly_revenue: i64,
    pub pending_payments: i64,
    pub failed_payments: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentReport {
    pub stats: PaymentStats,
    pub payments: Vec<PaymentRow>,
}
