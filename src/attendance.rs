use sqlx::PgPool;

use crate::codes::find_valid_code;
use crate::err::Payload;
use crate::models::Attendance;

pub async fn record_attendance(pg: &PgPool, student_id: i64, code_id: i64) -> Payload<Attendance> {
    let attendance = sqlx::query_as::<_, Attendance>(
        "INSERT INTO attendances (student_id, attendance_code_id) VALUES ($1, $2) RETURNING *",
    )
    .bind(student_id)
    .bind(code_id)
    .fetch_one(pg)
    .await?;
    log::info!(
        "Recorded attendance #{} for student #{} with code #{}",
        attendance.id,
        student_id,
        code_id
    );
    Ok(attendance)
}

/// Records attendance against the code a student typed in.
pub async fn mark_attendance(pg: &PgPool, student_id: i64, code: &str) -> Payload<Attendance> {
    let code = find_valid_code(pg, code.trim()).await?;
    record_attendance(pg, student_id, code.id).await
}

pub async fn attendance_for_student(pg: &PgPool, student_id: i64) -> Payload<Vec<Attendance>> {
    Ok(sqlx::query_as::<_, Attendance>(
        "SELECT * FROM attendances WHERE student_id = $1 ORDER BY created_at, id",
    )
    .bind(student_id)
    .fetch_all(pg)
    .await?)
}

pub async fn attendance_for_code(pg: &PgPool, code_id: i64) -> Payload<Vec<Attendance>> {
    Ok(sqlx::query_as::<_, Attendance>(
        "SELECT * FROM attendances WHERE attendance_code_id = $1 ORDER BY created_at, id",
    )
    .bind(code_id)
    .fetch_all(pg)
    .await?)
}

pub async fn attendance_count(pg: &PgPool, code_id: i64) -> Payload<i64> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM attendances WHERE attendance_code_id = $1")
            .bind(code_id)
            .fetch_one(pg)
            .await?;
    Ok(count)
}
