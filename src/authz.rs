//! The authorization guard shared by every mutating operation.
//!
//! Each check re-reads the caller's profile; nothing is cached between calls.

use sea_orm::{ConnectionTrait, EntityTrait};
use uuid::Uuid;

use crate::{
    entity::{
        courses::{Entity as Courses, Model as CourseModel},
        lessons::{Entity as Lessons, Model as LessonModel},
        modules::{Entity as Modules, Model as ModuleModel},
        profiles::{Entity as Profiles, Model as ProfileModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Role,
};

/// Fetch the caller's profile. A session without a profile counts as unauthenticated.
pub async fn load_profile<C: ConnectionTrait>(db: &C, user: &AuthUser) -> AppResult<ProfileModel> {
    Profiles::find_by_id(user.user_id)
        .one(db)
        .await?
        .ok_or(AppError::Unauthorized)
}

pub fn ensure_role(role: Role, allowed: &[Role]) -> AppResult<()> {
    if allowed.contains(&role) {
        Ok(())
    } else {
        Err(AppError::forbidden(format!(
            "Insufficient permissions. {} role required.",
            describe_roles(allowed)
        )))
    }
}

fn describe_roles(allowed: &[Role]) -> String {
    let names: Vec<&str> = allowed.iter().map(Role::as_str).collect();
    let joined = names.join(" or ");
    let mut chars = joined.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => joined,
    }
}

pub async fn require_role<C: ConnectionTrait>(
    db: &C,
    user: &AuthUser,
    allowed: &[Role],
) -> AppResult<ProfileModel> {
    let profile = load_profile(db, user).await?;
    ensure_role(Role::from_db(&profile.role), allowed)?;
    Ok(profile)
}

pub async fn require_admin<C: ConnectionTrait>(db: &C, user: &AuthUser) -> AppResult<ProfileModel> {
    require_role(db, user, &[Role::Admin]).await
}

/// Admins manage every course; instructors manage the courses they own.
pub fn can_manage_course(user_id: Uuid, role: Role, instructor_id: Uuid) -> bool {
    role == Role::Admin || instructor_id == user_id
}

#[derive(Debug, Clone)]
pub struct CourseAccess {
    pub course: CourseModel,
    pub role: Role,
}

pub async fn require_course_manager<C: ConnectionTrait>(
    db: &C,
    user: &AuthUser,
    course_id: Uuid,
) -> AppResult<CourseAccess> {
    let course = Courses::find_by_id(course_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found("Course not found"))?;
    let profile = load_profile(db, user).await?;
    let role = Role::from_db(&profile.role);

    if !can_manage_course(user.user_id, role, course.instructor_id) {
        return Err(AppError::forbidden(
            "Insufficient permissions to manage this course",
        ));
    }

    Ok(CourseAccess { course, role })
}

pub async fn require_module_manager<C: ConnectionTrait>(
    db: &C,
    user: &AuthUser,
    module_id: Uuid,
) -> AppResult<(ModuleModel, CourseAccess)> {
    let module = Modules::find_by_id(module_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found("Module not found"))?;
    let access = require_course_manager(db, user, module.course_id).await?;
    Ok((module, access))
}

pub async fn require_lesson_manager<C: ConnectionTrait>(
    db: &C,
    user: &AuthUser,
    lesson_id: Uuid,
) -> AppResult<(LessonModel, CourseAccess)> {
    let lesson = Lessons::find_by_id(lesson_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found("Lesson not found"))?;
    let (_, access) = require_module_manager(db, user, lesson.module_id).await?;
    Ok((lesson, access))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_is_checked() {
        assert!(ensure_role(Role::Admin, &[Role::Admin]).is_ok());
        assert!(ensure_role(Role::Instructor, &[Role::Admin, Role::Instructor]).is_ok());

        let err = ensure_role(Role::Student, &[Role::Admin, Role::Instructor]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Insufficient permissions. Admin or instructor role required."
        );
    }

    #[test]
    fn admin_only_message() {
        let err = ensure_role(Role::Student, &[Role::Admin]).unwrap_err();
        assert_eq!(err.to_string(), "Insufficient permissions. Admin role required.");
    }

    #[test]
    fn course_management_requires_ownership_or_admin() {
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();

        assert!(can_manage_course(owner, Role::Instructor, owner));
        assert!(!can_manage_course(other, Role::Instructor, owner));
        assert!(can_manage_course(other, Role::Admin, owner));
        // ownership is what counts, even if the owner was later demoted
        assert!(can_manage_course(owner, Role::Student, owner));
    }
}
