//! Lifecycle hooks run by the user repository inside the saving transaction.
//!
//! A user gets exactly one profile row, picked by its role flags at creation
//! time. Later flag changes never create the other profile.

use sqlx::{Postgres, Transaction};

use crate::err::Payload;
use crate::models::{Lecturer, Profile, Student, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Student,
    Lecturer,
}

/// `is_student` wins when both flags are set.
pub fn profile_role(user: &User) -> Option<Role> {
    if user.is_student {
        Some(Role::Student)
    } else if user.is_lecturer {
        Some(Role::Lecturer)
    } else {
        None
    }
}

pub async fn on_user_created(
    tx: &mut Transaction<'_, Postgres>,
    user: &User,
) -> Payload<Option<Profile>> {
    let profile = match profile_role(user) {
        Some(Role::Student) => {
            let student = sqlx::query_as::<_, Student>(
                "INSERT INTO students (user_id) VALUES ($1) RETURNING *",
            )
            .bind(user.id)
            .fetch_one(&mut *tx)
            .await?;
            Some(Profile::Student(student))
        }
        Some(Role::Lecturer) => {
            let lecturer = sqlx::query_as::<_, Lecturer>(
                "INSERT INTO lecturers (user_id) VALUES ($1) RETURNING *",
            )
            .bind(user.id)
            .fetch_one(&mut *tx)
            .await?;
            Some(Profile::Lecturer(lecturer))
        }
        None => None,
    };

    match &profile {
        Some(p) => log::info!(
            "Created {} profile #{} for user {}",
            p.kind(),
            p.id(),
            user
        ),
        None => log::debug!("User {} has no role flag, no profile created", user),
    }
    Ok(profile)
}

/// Re-saves the profile matching the user's current role, if one exists.
pub async fn on_user_saved(
    tx: &mut Transaction<'_, Postgres>,
    user: &User,
) -> Payload<Option<Profile>> {
    let profile = match profile_role(user) {
        Some(Role::Student) => sqlx::query_as::<_, Student>(
            "UPDATE students SET program = program WHERE user_id = $1 RETURNING *",
        )
        .bind(user.id)
        .fetch_optional(&mut *tx)
        .await?
        .map(Profile::Student),
        Some(Role::Lecturer) => sqlx::query_as::<_, Lecturer>(
            "UPDATE lecturers SET office = office WHERE user_id = $1 RETURNING *",
        )
        .bind(user.id)
        .fetch_optional(&mut *tx)
        .await?
        .map(Profile::Lecturer),
        None => return Ok(None),
    };

    if profile.is_none() {
        log::warn!(
            "User {} is flagged as {:?} but has no matching profile",
            user,
            profile_role(user)
        );
    }
    Ok(profile)
}
