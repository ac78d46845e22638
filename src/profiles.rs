use serde::Deserialize;
use sqlx::PgPool;

use crate::err::{Error, Payload};
use crate::models::{Lecturer, Level, Profile, Semester, Student, User};
use crate::signals::{profile_role, Role};

pub const PROGRAM_MAX: usize = 100;
pub const PHONE_MAX: usize = 15;
pub const OFFICE_MAX: usize = 100;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentChanges {
    pub program: Option<Option<String>>,
    pub level: Option<Option<Level>>,
    pub semester: Option<Option<Semester>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LecturerChanges {
    pub phone_number: Option<Option<String>>,
    pub office: Option<Option<String>>,
}

fn check_optional_len(field: &str, value: &Option<String>, max: usize) -> Payload<()> {
    match value {
        Some(v) if v.chars().count() > max => Err(Error::invalid(format!(
            "`{}` must be at most {} characters",
            field, max
        ))),
        _ => Ok(()),
    }
}

pub async fn get_student(pg: &PgPool, id: i64) -> Payload<Student> {
    sqlx::query_as::<_, Student>("SELECT * FROM students WHERE id = $1 LIMIT 1")
        .bind(id)
        .fetch_optional(pg)
        .await?
        .ok_or_else(|| Error::not_found(format!("Student #{} does not exist!", id)))
}

pub async fn get_lecturer(pg: &PgPool, id: i64) -> Payload<Lecturer> {
    sqlx::query_as::<_, Lecturer>("SELECT * FROM lecturers WHERE id = $1 LIMIT 1")
        .bind(id)
        .fetch_optional(pg)
        .await?
        .ok_or_else(|| Error::not_found(format!("Lecturer #{} does not exist!", id)))
}

pub async fn student_for_user(pg: &PgPool, user_id: i64) -> Payload<Option<Student>> {
    Ok(
        sqlx::query_as::<_, Student>("SELECT * FROM students WHERE user_id = $1 LIMIT 1")
            .bind(user_id)
            .fetch_optional(pg)
            .await?,
    )
}

pub async fn lecturer_for_user(pg: &PgPool, user_id: i64) -> Payload<Option<Lecturer>> {
    Ok(
        sqlx::query_as::<_, Lecturer>("SELECT * FROM lecturers WHERE user_id = $1 LIMIT 1")
            .bind(user_id)
            .fetch_optional(pg)
            .await?,
    )
}

/// Profile for the user's current role flag, if it was ever created.
pub async fn profile_for(pg: &PgPool, user: &User) -> Payload<Option<Profile>> {
    Ok(match profile_role(user) {
        Some(Role::Student) => student_for_user(pg, user.id).await?.map(Profile::Student),
        Some(Role::Lecturer) => lecturer_for_user(pg, user.id).await?.map(Profile::Lecturer),
        None => None,
    })
}

pub async fn update_student(pg: &PgPool, id: i64, changes: StudentChanges) -> Payload<Student> {
    let mut student = get_student(pg, id).await?;
    if let Some(program) = changes.program {
        check_optional_len("program", &program, PROGRAM_MAX)?;
        student.program = program;
    }
    if let Some(level) = changes.level {
        student.level = level.map(|l| l.as_str().to_string());
    }
    if let Some(semester) = changes.semester {
        student.semester = semester.map(|s| s.as_str().to_string());
    }

    let student = sqlx::query_as::<_, Student>(
        "UPDATE students SET program = $2, level = $3, semester = $4 WHERE id = $1 RETURNING *",
    )
    .bind(student.id)
    .bind(&student.program)
    .bind(&student.level)
    .bind(&student.semester)
    .fetch_one(pg)
    .await?;
    log::debug!("Updated student profile #{}", student.id);
    Ok(student)
}

pub async fn update_lecturer(pg: &PgPool, id: i64, changes: LecturerChanges) -> Payload<Lecturer> {
    let mut lecturer = get_lecturer(pg, id).await?;
    if let Some(phone) = changes.phone_number {
        check_optional_len("phone_number", &phone, PHONE_MAX)?;
        lecturer.phone_number = phone;
    }
    if let Some(office) = changes.office {
        check_optional_len("office", &office, OFFICE_MAX)?;
        lecturer.office = office;
    }

    let lecturer = sqlx::query_as::<_, Lecturer>(
        "UPDATE lecturers SET phone_number = $2, office = $3 WHERE id = $1 RETURNING *",
    )
    .bind(lecturer.id)
    .bind(&lecturer.phone_number)
    .bind(&lecturer.office)
    .fetch_one(pg)
    .await?;
    log::debug!("Updated lecturer profile #{}", lecturer.id);
    Ok(lecturer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_length_check() {
        assert!(check_optional_len("office", &None, OFFICE_MAX).is_ok());
        assert!(check_optional_len("phone_number", &Some("+233 20 000 0000".to_string()), PHONE_MAX).is_err());
        assert!(check_optional_len("phone_number", &Some("0200000000".to_string()), PHONE_MAX).is_ok());
    }
}
