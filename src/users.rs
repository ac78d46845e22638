use pbkdf2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use pbkdf2::Pbkdf2;
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::err::{Error, Payload};
use crate::models::{Gender, Profile, User};
use crate::signals::{on_user_created, on_user_saved};

pub const USER_ID_MAX: usize = 8;
pub const NAME_MAX: usize = 100;
pub const EMAIL_MAX: usize = 100;
pub const FULL_NAME_MAX: usize = 100;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewUser {
    pub user_id: String,
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub other_names: Option<String>,
    pub gender: Option<Gender>,
    #[serde(default)]
    pub is_student: bool,
    #[serde(default)]
    pub is_lecturer: bool,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default)]
    pub is_superuser: bool,
    pub password: Option<String>,
}

/// Partial update. `Some(None)` clears an optional column.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserChanges {
    pub email: Option<Option<String>>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub other_names: Option<Option<String>>,
    pub gender: Option<Option<Gender>>,
    pub is_student: Option<bool>,
    pub is_lecturer: Option<bool>,
    pub is_staff: Option<bool>,
    pub is_superuser: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedUser {
    pub user: User,
    pub profile: Option<Profile>,
}

/// Display name derived from the name parts, `None` unless both first and
/// last name are present.
pub fn full_name(first_name: &str, last_name: &str, other_names: Option<&str>) -> Option<String> {
    if first_name.is_empty() || last_name.is_empty() {
        return None;
    }
    match other_names.filter(|o| !o.is_empty()) {
        Some(other) => Some(format!("{} {} {}", first_name, other, last_name)),
        None => Some(format!("{} {}", first_name, last_name)),
    }
}

pub fn hash_password(password: &str) -> Payload<String> {
    if password.is_empty() {
        return Err(Error::invalid("Provided password was empty!"));
    }
    Ok(Pbkdf2
        .hash_password(password.as_bytes(), &SaltString::generate(&mut OsRng))?
        .to_string())
}

pub fn check_password(user: &User, password: &str) -> bool {
    let stored = match &user.password_hash {
        Some(stored) => stored,
        None => return false,
    };
    match PasswordHash::new(stored) {
        Ok(hash) => Pbkdf2.verify_password(password.as_bytes(), &hash).is_ok(),
        Err(err) => {
            log::warn!("Stored password hash for user {} is malformed: {}", user, err);
            false
        }
    }
}

fn check_len(field: &str, value: &str, max: usize) -> Payload<()> {
    if value.chars().count() > max {
        return Err(Error::invalid(format!(
            "`{}` must be at most {} characters",
            field, max
        )));
    }
    Ok(())
}

fn check_required(field: &str, value: &str, max: usize) -> Payload<()> {
    if value.trim().is_empty() {
        return Err(Error::invalid(format!("`{}` parameter was empty", field)));
    }
    check_len(field, value, max)
}

fn check_email(email: &str) -> Payload<()> {
    check_len("email", email, EMAIL_MAX)?;
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(Error::invalid(format!("`{}` is not a valid email", email)));
    }
    Ok(())
}

fn check_other_names(other: Option<&str>) -> Payload<()> {
    match other {
        Some(other) => check_len("other_names", other, NAME_MAX),
        None => Ok(()),
    }
}

/// The derived name shares the column width of a single name part.
fn checked_full_name(
    first_name: &str,
    last_name: &str,
    other_names: Option<&str>,
) -> Payload<Option<String>> {
    let derived = full_name(first_name, last_name, other_names);
    if let Some(name) = &derived {
        check_len("full_name", name, FULL_NAME_MAX)?;
    }
    Ok(derived)
}

pub fn validate_new_user(user: &NewUser) -> Payload<()> {
    check_required("user_id", &user.user_id, USER_ID_MAX)?;
    check_required("first_name", &user.first_name, NAME_MAX)?;
    check_required("last_name", &user.last_name, NAME_MAX)?;
    check_other_names(user.other_names.as_deref())?;
    checked_full_name(&user.first_name, &user.last_name, user.other_names.as_deref())?;
    if let Some(email) = &user.email {
        check_email(email)?;
    }
    Ok(())
}

/// Inserts the user and its profile in one transaction.
pub async fn create_user(pg: &PgPool, new: NewUser) -> Payload<CreatedUser> {
    validate_new_user(&new)?;

    let password_hash = match &new.password {
        Some(password) => Some(hash_password(password)?),
        None => None,
    };
    let full_name = checked_full_name(&new.first_name, &new.last_name, new.other_names.as_deref())?;

    let mut tx = pg.begin().await?;
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (user_id, email, first_name, last_name, other_names, full_name, \
         gender, is_student, is_lecturer, is_staff, is_superuser, password_hash) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
         ON CONFLICT (user_id) DO NOTHING RETURNING *",
    )
    .bind(&new.user_id)
    .bind(&new.email)
    .bind(&new.first_name)
    .bind(&new.last_name)
    .bind(&new.other_names)
    .bind(&full_name)
    .bind(new.gender.map(|g| g.as_str()))
    .bind(new.is_student)
    .bind(new.is_lecturer)
    .bind(new.is_staff)
    .bind(new.is_superuser)
    .bind(&password_hash)
    .fetch_optional(&mut tx)
    .await?;

    // the transaction rolls back on drop
    let user = match user {
        Some(user) => user,
        None => {
            return Err(Error::UserAlreadyExists {
                message: format!("User with id `{}` already exists!", new.user_id),
            })
        }
    };

    let profile = on_user_created(&mut tx, &user).await?;
    on_user_saved(&mut tx, &user).await?;
    tx.commit().await?;

    log::info!("Created user {} (#{})", user, user.id);
    Ok(CreatedUser { user, profile })
}

pub async fn create_superuser(pg: &PgPool, user_id: &str, password: &str) -> Payload<User> {
    let created = create_user(
        pg,
        NewUser {
            user_id: user_id.to_string(),
            first_name: "Admin".to_string(),
            last_name: user_id.to_string(),
            is_staff: true,
            is_superuser: true,
            password: Some(password.to_string()),
            ..NewUser::default()
        },
    )
    .await?;
    Ok(created.user)
}

pub async fn get_user(pg: &PgPool, id: i64) -> Payload<User> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 LIMIT 1")
        .bind(id)
        .fetch_optional(pg)
        .await?
        .ok_or_else(|| Error::UserDoesNotExist {
            message: format!("User #{} does not exist!", id),
        })
}

pub async fn find_user(pg: &PgPool, user_id: &str) -> Payload<User> {
    if user_id.is_empty() {
        return Err(Error::invalid("`user_id` parameter was empty"));
    }
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = $1 LIMIT 1")
        .bind(user_id)
        .fetch_optional(pg)
        .await?
        .ok_or_else(|| Error::UserDoesNotExist {
            message: format!("User with id `{}` does not exist!", user_id),
        })
}

/// Applies `changes` onto `user` in memory and recomputes the full name.
pub fn apply_changes(user: &mut User, changes: UserChanges) -> Payload<()> {
    if let Some(email) = changes.email {
        if let Some(email) = &email {
            check_email(email)?;
        }
        user.email = email;
    }
    if let Some(first) = changes.first_name {
        check_required("first_name", &first, NAME_MAX)?;
        user.first_name = first;
    }
    if let Some(last) = changes.last_name {
        check_required("last_name", &last, NAME_MAX)?;
        user.last_name = last;
    }
    if let Some(other) = changes.other_names {
        check_other_names(other.as_deref())?;
        user.other_names = other;
    }
    if let Some(gender) = changes.gender {
        user.gender = gender.map(|g| g.as_str().to_string());
    }
    if let Some(flag) = changes.is_student {
        user.is_student = flag;
    }
    if let Some(flag) = changes.is_lecturer {
        user.is_lecturer = flag;
    }
    if let Some(flag) = changes.is_staff {
        user.is_staff = flag;
    }
    if let Some(flag) = changes.is_superuser {
        user.is_superuser = flag;
    }
    user.full_name =
        checked_full_name(&user.first_name, &user.last_name, user.other_names.as_deref())?;
    Ok(())
}

pub async fn update_user(pg: &PgPool, id: i64, changes: UserChanges) -> Payload<User> {
    let mut user = get_user(pg, id).await?;
    apply_changes(&mut user, changes)?;

    let mut tx = pg.begin().await?;
    let user = sqlx::query_as::<_, User>(
        "UPDATE users SET email = $2, first_name = $3, last_name = $4, other_names = $5, \
         full_name = $6, gender = $7, is_student = $8, is_lecturer = $9, is_staff = $10, \
         is_superuser = $11 WHERE id = $1 RETURNING *",
    )
    .bind(user.id)
    .bind(&user.email)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.other_names)
    .bind(&user.full_name)
    .bind(&user.gender)
    .bind(user.is_student)
    .bind(user.is_lecturer)
    .bind(user.is_staff)
    .bind(user.is_superuser)
    .fetch_one(&mut tx)
    .await?;

    on_user_saved(&mut tx, &user).await?;
    tx.commit().await?;

    log::debug!("Updated user {}", user);
    Ok(user)
}

/// `None` marks the password unusable.
pub async fn set_password(pg: &PgPool, id: i64, password: Option<&str>) -> Payload<User> {
    let hash = match password {
        Some(password) => Some(hash_password(password)?),
        None => None,
    };
    let user = sqlx::query_as::<_, User>(
        "UPDATE users SET password_hash = $2 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&hash)
    .fetch_optional(pg)
    .await?
    .ok_or_else(|| Error::UserDoesNotExist {
        message: format!("User #{} does not exist!", id),
    })?;
    log::info!("Password changed for user {}", user);
    Ok(user)
}

pub async fn delete_user(pg: &PgPool, id: i64) -> Payload<bool> {
    let res = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(pg)
        .await?;
    let deleted = res.rows_affected() >= 1;
    if deleted {
        log::info!("Deleted user #{}", id);
    }
    Ok(deleted)
}
