use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        audit::AuditLogList,
        auth::{
            ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, ResetPasswordRequest,
            Session, SessionUser, SignupRequest,
        },
        courses::{
            CourseAnalytics, CourseDetail, CourseList, CreateCourseRequest, InstructorSummary,
            ModuleWithLessons, TrendPoint, UpdateCourseRequest,
        },
        curriculum::{
            CreateLessonRequest, CreateModuleRequest, ReorderFailure, ReorderRequest,
            ReorderResult, UpdateLessonRequest, UpdateModuleRequest,
        },
        dashboard::{
            AdminDashboard, CourseProgress, Dashboard, DashboardView, InstructorCourseStats,
            InstructorDashboard, StudentDashboard,
        },
        enrollments::{
            BulkEnrollRequest, CertificateOverview, EnrollRequest, EnrolledStudent,
            EnrolledStudentList, EnrollmentList, EnrollmentWithCourse, ProgressOverview,
            ProgressRequest, UpdateEnrollmentRequest,
        },
        payments::{
            CreatePaymentRequest, PaidCourseSummary, PayerSummary, PaymentReport, PaymentRow,
            PaymentStats, UpdatePaymentStatusRequest,
        },
        users::{
            AdminCheck, BulkRoleError, BulkRoleResult, BulkRoleSuccess, BulkUpdateRolesRequest,
            CreateIdentityRequest, DeletedIdentity, EmailRequest, IdentityList, ProfileList,
            PromotedProfile, UpdateIdentityRequest, UpdateProfileRequest, UpdateRoleRequest,
        },
    },
    models::{
        AuditLog, Course, CourseLevel, Enrollment, EnrollmentStatus, EnrollmentType, Identity,
        Lesson, LessonType, Module, Payment, PaymentStatus, PricingType, Profile, Role,
        Visibility,
    },
    response::{ApiResponse, Meta},
    routes::{admin, auth, courses, curriculum, dashboard, enrollments, health, params, payments, users},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::signup,
        auth::login,
        auth::me,
        auth::callback,
        auth::forgot_password,
        auth::reset_password,
        auth::change_password,
        courses::list_courses,
        courses::create_course,
        courses::get_course,
        courses::update_course,
        courses::delete_course,
        courses::duplicate_course,
        courses::publish_course,
        courses::unpublish_course,
        courses::course_analytics,
        courses::create_module,
        courses::reorder_modules,
        courses::list_enrollments,
        courses::enroll_student,
        courses::bulk_enroll,
        curriculum::update_module,
        curriculum::delete_module,
        curriculum::create_lesson,
        curriculum::reorder_lessons,
        curriculum::update_lesson,
        curriculum::delete_lesson,
        enrollments::update_enrollment,
        enrollments::unenroll,
        enrollments::update_progress,
        enrollments::issue_certificate,
        enrollments::my_progress,
        enrollments::my_certificates,
        users::list_users,
        users::get_user_by_email,
        users::check_is_admin,
        users::update_role,
        users::bulk_update_roles,
        users::grant_admin,
        users::revoke_admin,
        users::update_profile,
        admin::promote_to_admin,
        admin::list_identities,
        admin::create_identity,
        admin::update_identity,
        admin::delete_identity,
        admin::list_payments,
        admin::update_payment_status,
        admin::list_audit_logs,
        payments::create_payment,
        dashboard::dashboard
    ),
    components(
        schemas(
            Role,
            EnrollmentStatus,
            LessonType,
            PaymentStatus,
            CourseLevel,
            Visibility,
            EnrollmentType,
            PricingType,
            Profile,
            Identity,
            Course,
            Module,
            Lesson,
            Enrollment,
            Payment,
            AuditLog,
            SignupRequest,
            LoginRequest,
            Session,
            SessionUser,
            ForgotPasswordRequest,
            ResetPasswordRequest,
            ChangePasswordRequest,
            CreateCourseRequest,
            UpdateCourseRequest,
            CourseList,
            InstructorSummary,
            ModuleWithLessons,
            CourseDetail,
            CourseAnalytics,
            TrendPoint,
            CreateModuleRequest,
            UpdateModuleRequest,
            CreateLessonRequest,
            UpdateLessonRequest,
            ReorderRequest,
            ReorderFailure,
            ReorderResult,
            EnrollRequest,
            BulkEnrollRequest,
            UpdateEnrollmentRequest,
            ProgressRequest,
            EnrollmentList,
            EnrolledStudent,
            EnrolledStudentList,
            EnrollmentWithCourse,
            ProgressOverview,
            CertificateOverview,
            UpdateRoleRequest,
            BulkUpdateRolesRequest,
            BulkRoleSuccess,
            BulkRoleError,
            BulkRoleResult,
            EmailRequest,
            ProfileList,
            UpdateProfileRequest,
            AdminCheck,
            PromotedProfile,
            CreateIdentityRequest,
            UpdateIdentityRequest,
            IdentityList,
            DeletedIdentity,
            CreatePaymentRequest,
            UpdatePaymentStatusRequest,
            PayerSummary,
            PaidCourseSummary,
            PaymentRow,
            PaymentStats,
            PaymentReport,
            AuditLogList,
            AdminDashboard,
            InstructorCourseStats,
            InstructorDashboard,
            CourseProgress,
            StudentDashboard,
            Dashboard,
            DashboardView,
            params::Pagination,
            params::SortOrder,
            params::CourseSortBy,
            Meta,
            ApiResponse<Course>,
            ApiResponse<CourseList>,
            ApiResponse<CourseDetail>,
            ApiResponse<Profile>,
            ApiResponse<Enrollment>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Sign-up, login, confirmation and password recovery"),
        (name = "Courses", description = "Course catalogue and management"),
        (name = "Curriculum", description = "Modules and lessons"),
        (name = "Enrollments", description = "Enrollment, progress and certificates"),
        (name = "Users", description = "Profiles and roles"),
        (name = "Admin", description = "Admin endpoints"),
        (name = "Payments", description = "Course purchases"),
        (name = "Dashboard", description = "Role-specific dashboards"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_router_path_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/auth/callback",
            "/api/auth/reset-password",
            "/api/courses/{id}/duplicate",
            "/api/modules/{id}/lessons/reorder",
            "/api/enrollments/{id}/progress",
            "/api/admin/update-role",
            "/api/dashboard",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
