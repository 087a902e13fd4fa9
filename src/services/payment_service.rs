use chrono::{DateTime, Datelike, Utc};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    audit,
    authz::require_admin,
    dto::payments::{PaidCourseSummary, PayerSummary, PaymentReport, PaymentRow, PaymentStats},
    entity::{
        courses::{Column as CourseCol, Entity as Courses, Model as CourseModel},
        enrollments::{Column as EnrollmentCol, Entity as Enrollments},
        payments::{ActiveModel as PaymentActive, Column as PaymentCol, Entity as Payments, Model as PaymentModel},
        profiles::Entity as Profiles,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Payment, PaymentStatus, PricingType},
    response::{ApiResponse, Meta},
    services::{enrollment_service::new_enrollment, mapping::payment_from_entity},
    state::AppState,
};

/// Amount charged for a course: the sale price when one is set.
pub fn effective_price(course: &CourseModel) -> AppResult<i64> {
    if course.pricing_type == PricingType::Free.as_str() {
        return Err(AppError::bad_request("Course is free"));
    }
    Ok(course.sale_price.unwrap_or(course.price))
}

pub async fn create_payment(
    state: &AppState,
    user: &AuthUser,
    course_id: Uuid,
) -> AppResult<ApiResponse<Payment>> {
    let course = Courses::find_by_id(course_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Course not found"))?;
    let amount = effective_price(&course)?;

    let payment = PaymentActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        course_id: Set(course.id),
        amount: Set(amount),
        currency: Set(course.currency.clone()),
        status: Set(PaymentStatus::Pending.as_str().to_string()),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(payment_id = %payment.id, %course_id, amount, "payment recorded");
    Ok(ApiResponse::success(
        "Payment created",
        payment_from_entity(payment),
        Some(Meta::empty()),
    ))
}

pub async fn update_payment_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    status: PaymentStatus,
) -> AppResult<ApiResponse<Payment>> {
    require_admin(&state.orm, user).await?;

    let existing = Payments::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Payment not found"))?;

    let mut active: PaymentActive = existing.into();
    active.status = Set(status.as_str().to_string());
    active.updated_at = Set(Utc::now().into());
    let payment = active.update(&state.orm).await?;

    if status == PaymentStatus::Succeeded {
        // Already-enrolled payers keep their existing enrollment.
        Enrollments::insert(new_enrollment(payment.course_id, payment.user_id))
            .on_conflict(
                OnConflict::columns([EnrollmentCol::CourseId, EnrollmentCol::UserId])
                    .do_nothing()
                    .to_owned(),
            )
            .do_nothing()
            .exec(&state.orm)
            .await?;
    }

    audit::record(
        &state.pool,
        Some(user.user_id),
        "payment_status_update",
        "payments",
        json!({ "payment_id": payment.id, "status": payment.status }),
    )
    .await;

    Ok(ApiResponse::success(
        "Payment updated",
        payment_from_entity(payment),
        Some(Meta::empty()),
    )
    .revalidating(["/admin/payments"]))
}

pub async fn list_payments(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<PaymentReport>> {
    require_admin(&state.orm, user).await?;

    let rows = Payments::find()
        .order_by_desc(PaymentCol::CreatedAt)
        .limit(100)
        .find_also_related(Profiles)
        .all(&state.orm)
        .await?;

    let course_ids: Vec<Uuid> = rows.iter().map(|(p, _)| p.course_id).collect();
    let courses = Courses::find()
        .filter(CourseCol::Id.is_in(course_ids))
        .all(&state.orm)
        .await?;

    let payments: Vec<PaymentModel> = rows.iter().map(|(p, _)| p.clone()).collect();
    let stats = payment_stats(&payments, Utc::now());

    let payments = rows
        .into_iter()
        .map(|(payment, payer)| {
            let course = courses
                .iter()
                .find(|c| c.id == payment.course_id)
                .map(|c| PaidCourseSummary {
                    title: c.title.clone(),
                    price: c.price,
                });
            PaymentRow {
                payment: payment_from_entity(payment),
                payer: payer.map(|p| PayerSummary {
                    email: p.email,
                    full_name: p.full_name,
                }),
                course,
            }
        })
        .collect();

    Ok(ApiResponse::success(
        "Payments",
        PaymentReport { stats, payments },
        Some(Meta::empty()),
    ))
}

/// Revenue counts succeeded payments only; "monthly" is the calendar month of `now`.
pub fn payment_stats(payments: &[PaymentModel], now: DateTime<Utc>) -> PaymentStats {
    let mut stats = PaymentStats::default();
    for payment in payments {
        match payment.status.as_str() {
            "succeeded" => {
                stats.total_revenue += payment.amount;
                let at = payment.created_at.with_timezone(&Utc);
                if at.year() == now.year() && at.month() == now.month() {
                    stats.monthly_revenue += payment.amount;
                }
            }
            "pending" => stats.pending_payments += 1,
            "failed" => stats.failed_payments += 1,
            _ => {}
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    fn payment(status: &str, amount: i64, at: DateTime<Utc>) -> PaymentModel {
        let at = at.with_timezone(&FixedOffset::east_opt(0).unwrap());
        PaymentModel {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            course_id: Uuid::new_v4(),
            amount,
            currency: "EUR".into(),
            status: status.into(),
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn stats_split_by_status_and_month() {
        let now = Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap();
        let last_month = Utc.with_ymd_and_hms(2026, 2, 20, 12, 0, 0).unwrap();
        let rows = vec![
            payment("succeeded", 4900, now),
            payment("succeeded", 1000, last_month),
            payment("pending", 4900, now),
            payment("failed", 4900, now),
            payment("failed", 4900, last_month),
        ];

        let stats = payment_stats(&rows, now);
        assert_eq!(
            stats,
            PaymentStats {
                total_revenue: 5900,
                monthly_revenue: 4900,
                pending_payments: 1,
                failed_payments: 2,
            }
        );
    }

    #[test]
    fn sale_price_wins_and_free_courses_are_rejected() {
        let now = Utc::now().with_timezone(&FixedOffset::east_opt(0).unwrap());
        let mut course = CourseModel {
            id: Uuid::new_v4(),
            slug: "rust".into(),
            title: "Rust".into(),
            description: String::new(),
            short_description: None,
            thumbnail_url: None,
            category: "dev".into(),
            level: "beginner".into(),
            language: "en".into(),
            visibility: "public".into(),
            published: true,
            published_at: None,
            enrollment_type: "open".into(),
            max_students: None,
            pricing_type: "one-time".into(),
            price: 4900,
            currency: "EUR".into(),
            sale_price: None,
            certificate_enabled: true,
            completion_min_progress: 100,
            instructor_id: Uuid::new_v4(),
            created_by: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        };
        assert_eq!(effective_price(&course).unwrap(), 4900);
        course.sale_price = Some(2900);
        assert_eq!(effective_price(&course).unwrap(), 2900);
        course.pricing_type = "free".into();
        assert!(effective_price(&course).is_err());
    }

    #[test]
    fn no_payments_no_revenue() {
        assert_eq!(payment_stats(&[], Utc::now()), PaymentStats::default());
    }
}
