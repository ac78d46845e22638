//! Short random codes students enter to mark attendance for one session.
//!
//! Codes carry no expiry, they stay usable until invalidated.

use rand::{thread_rng, Rng};
use sqlx::PgPool;

use crate::err::{Error, Payload};
use crate::models::UniqueCode;

pub const CODE_LENGTH: usize = 5;
pub const CODE_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

pub fn generate_code() -> String {
    generate_code_with(&mut thread_rng())
}

pub fn generate_code_with<R: Rng>(rng: &mut R) -> String {
    (0..CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

pub fn is_well_formed(code: &str) -> bool {
    code.len() == CODE_LENGTH && code.bytes().all(|b| CODE_ALPHABET.contains(&b))
}

pub async fn issue_code(pg: &PgPool, course_id: i64) -> Payload<UniqueCode> {
    let code = sqlx::query_as::<_, UniqueCode>(
        "INSERT INTO unique_codes (code, course_id) VALUES ($1, $2) RETURNING *",
    )
    .bind(generate_code())
    .bind(course_id)
    .fetch_one(pg)
    .await?;
    log::info!("Issued attendance code {} for course #{}", code, course_id);
    Ok(code)
}

/// Newest still-valid row carrying `code`.
pub async fn find_valid_code(pg: &PgPool, code: &str) -> Payload<UniqueCode> {
    let invalid = || Error::InvalidAttendanceCode {
        message: format!("Attendance code `{}` is not valid!", code),
    };
    if !is_well_formed(code) {
        return Err(invalid());
    }
    sqlx::query_as::<_, UniqueCode>(
        "SELECT * FROM unique_codes WHERE code = $1 AND is_valid \
         ORDER BY created_at DESC, id DESC LIMIT 1",
    )
    .bind(code)
    .fetch_optional(pg)
    .await?
    .ok_or_else(invalid)
}

pub async fn get_code(pg: &PgPool, id: i64) -> Payload<UniqueCode> {
    sqlx::query_as::<_, UniqueCode>("SELECT * FROM unique_codes WHERE id = $1 LIMIT 1")
        .bind(id)
        .fetch_optional(pg)
        .await?
        .ok_or_else(|| Error::not_found(format!("Attendance code #{} does not exist!", id)))
}

pub async fn invalidate_code(pg: &PgPool, id: i64) -> Payload<UniqueCode> {
    let code = sqlx::query_as::<_, UniqueCode>(
        "UPDATE unique_codes SET is_valid = FALSE WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .fetch_optional(pg)
    .await?
    .ok_or_else(|| Error::not_found(format!("Attendance code #{} does not exist!", id)))?;
    log::info!("Invalidated attendance code {} (#{})", code, code.id);
    Ok(code)
}

pub async fn codes_for_course(pg: &PgPool, course_id: i64) -> Payload<Vec<UniqueCode>> {
    Ok(sqlx::query_as::<_, UniqueCode>(
        "SELECT * FROM unique_codes WHERE course_id = $1 ORDER BY created_at DESC, id DESC",
    )
    .bind(course_id)
    .fetch_all(pg)
    .await?)
}
