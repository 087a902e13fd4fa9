use chrono::Utc;

use crate::{
    entity::{
        audit_logs, auth_users, courses, enrollments, lessons, modules, payments, profiles,
    },
    models::{AuditLog, Course, Enrollment, Identity, Lesson, Module, Payment, Profile, Role},
};

pub(crate) fn profile_from_entity(model: profiles::Model) -> Profile {
    Profile {
        id: model.id,
        email: model.email,
        full_name: model.full_name,
        avatar_url: model.avatar_url,
        bio: model.bio,
        role: Role::from_db(&model.role),
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

pub(crate) fn identity_from_entity(model: auth_users::Model) -> Identity {
    Identity {
        id: model.id,
        email: model.email,
        email_confirmed_at: model.email_confirmed_at.map(|dt| dt.with_timezone(&Utc)),
        user_metadata: model.user_metadata,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

pub(crate) fn course_from_entity(model: courses::Model) -> Course {
    Course {
        id: model.id,
        slug: model.slug,
        title: model.title,
        description: model.description,
        short_description: model.short_description,
        thumbnail_url: model.thumbnail_url,
        category: model.category,
        level: model.level,
        language: model.language,
        visibility: model.visibility,
        published: model.published,
        published_at: model.published_at.map(|dt| dt.with_timezone(&Utc)),
        enrollment_type: model.enrollment_type,
        max_students: model.max_students,
        pricing_type: model.pricing_type,
        price: model.price,
        currency: model.currency,
        sale_price: model.sale_price,
        certificate_enabled: model.certificate_enabled,
        completion_min_progress: model.completion_min_progress,
        instructor_id: model.instructor_id,
        created_by: model.created_by,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

pub(crate) fn module_from_entity(model: modules::Model) -> Module {
    Module {
        id: model.id,
        course_id: model.course_id,
        title: model.title,
        description: model.description,
        order_index: model.order_index,
        published: model.published,
        duration_minutes: model.duration_minutes,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

pub(crate) fn lesson_from_entity(model: lessons::Model) -> Lesson {
    Lesson {
        id: model.id,
        module_id: model.module_id,
        title: model.title,
        description: model.description,
        lesson_type: model.lesson_type,
        content: model.content,
        duration_minutes: model.duration_minutes,
        published: model.published,
        order_index: model.order_index,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

pub(crate) fn enrollment_from_entity(model: enrollments::Model) -> Enrollment {
    Enrollment {
        id: model.id,
        course_id: model.course_id,
        user_id: model.user_id,
        status: model.status,
        progress: model.progress,
        enrolled_at: model.enrolled_at.with_timezone(&Utc),
        completed_at: model.completed_at.map(|dt| dt.with_timezone(&Utc)),
        last_accessed_at: model.last_accessed_at.map(|dt| dt.with_timezone(&Utc)),
        certificate_issued: model.certificate_issued,
        certificate_issued_at: model.certificate_issued_at.map(|dt| dt.with_timezone(&Utc)),
    }
}

pub(crate) fn payment_from_entity(model: payments::Model) -> Payment {
    Payment {
        id: model.id,
        user_id: model.user_id,
        course_id: model.course_id,
        amount: model.amount,
        currency: model.currency,
        status: model.status,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

pub(crate) fn audit_log_from_entity(model: audit_logs::Model) -> AuditLog {
    AuditLog {
        id: model.id,
        user_id: model.user_id,
        action: model.action,
        resource: model.resource,
        metadata: model.metadata,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
