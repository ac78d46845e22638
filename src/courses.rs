use serde::Deserialize;
use sqlx::PgPool;

use crate::err::{Error, Payload};
use crate::models::{Course, Student};

pub const COURSE_CODE_MAX: usize = 8;
pub const COURSE_TITLE_MAX: usize = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct NewCourse {
    pub code: Option<String>,
    pub title: String,
    /// Optional secondary user reference.
    pub lecture_id: Option<i64>,
    pub lecturer_id: i64,
    pub level: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CourseChanges {
    pub code: Option<Option<String>>,
    pub title: Option<String>,
    pub lecture_id: Option<Option<i64>>,
    pub lecturer_id: Option<i64>,
    pub level: Option<i32>,
}

fn check_code(code: &Option<String>) -> Payload<()> {
    match code {
        Some(code) if code.chars().count() > COURSE_CODE_MAX => Err(Error::invalid(format!(
            "`code` must be at most {} characters",
            COURSE_CODE_MAX
        ))),
        _ => Ok(()),
    }
}

fn check_title(title: &str) -> Payload<()> {
    if title.trim().is_empty() {
        return Err(Error::invalid("`title` parameter was empty"));
    }
    if title.chars().count() > COURSE_TITLE_MAX {
        return Err(Error::invalid(format!(
            "`title` must be at most {} characters",
            COURSE_TITLE_MAX
        )));
    }
    Ok(())
}

pub fn validate_new_course(course: &NewCourse) -> Payload<()> {
    check_code(&course.code)?;
    check_title(&course.title)
}

pub async fn create_course(pg: &PgPool, new: NewCourse) -> Payload<Course> {
    validate_new_course(&new)?;
    let course = sqlx::query_as::<_, Course>(
        "INSERT INTO courses (code, title, lecture_id, lecturer_id, level) \
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(&new.code)
    .bind(&new.title)
    .bind(new.lecture_id)
    .bind(new.lecturer_id)
    .bind(new.level)
    .fetch_one(pg)
    .await?;
    log::info!("Created course {} (#{})", course, course.id);
    Ok(course)
}

pub async fn get_course(pg: &PgPool, id: i64) -> Payload<Course> {
    sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE id = $1 LIMIT 1")
        .bind(id)
        .fetch_optional(pg)
        .await?
        .ok_or_else(|| Error::not_found(format!("Course #{} does not exist!", id)))
}

pub async fn courses_taught(pg: &PgPool, lecturer_id: i64) -> Payload<Vec<Course>> {
    Ok(sqlx::query_as::<_, Course>(
        "SELECT * FROM courses WHERE lecturer_id = $1 ORDER BY created_at DESC, id DESC",
    )
    .bind(lecturer_id)
    .fetch_all(pg)
    .await?)
}

pub async fn update_course(pg: &PgPool, id: i64, changes: CourseChanges) -> Payload<Course> {
    let mut course = get_course(pg, id).await?;
    if let Some(code) = changes.code {
        check_code(&code)?;
        course.code = code;
    }
    if let Some(title) = changes.title {
        check_title(&title)?;
        course.title = title;
    }
    if let Some(lecture) = changes.lecture_id {
        course.lecture_id = lecture;
    }
    if let Some(lecturer) = changes.lecturer_id {
        course.lecturer_id = lecturer;
    }
    if let Some(level) = changes.level {
        course.level = level;
    }

    let course = sqlx::query_as::<_, Course>(
        "UPDATE courses SET code = $2, title = $3, lecture_id = $4, lecturer_id = $5, \
         level = $6, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(course.id)
    .bind(&course.code)
    .bind(&course.title)
    .bind(course.lecture_id)
    .bind(course.lecturer_id)
    .bind(course.level)
    .fetch_one(pg)
    .await?;
    log::debug!("Updated course {}", course);
    Ok(course)
}

pub async fn delete_course(pg: &PgPool, id: i64) -> Payload<bool> {
    let res = sqlx::query("DELETE FROM courses WHERE id = $1")
        .bind(id)
        .execute(pg)
        .await?;
    Ok(res.rows_affected() >= 1)
}

/// Returns `false` when the student was already enrolled.
pub async fn enroll_student(pg: &PgPool, course_id: i64, student_id: i64) -> Payload<bool> {
    let res = sqlx::query(
        "INSERT INTO course_students (course_id, student_id) VALUES ($1, $2) \
         ON CONFLICT DO NOTHING",
    )
    .bind(course_id)
    .bind(student_id)
    .execute(pg)
    .await?;
    let added = res.rows_affected() >= 1;
    if added {
        log::info!("Enrolled student #{} in course #{}", student_id, course_id);
    }
    Ok(added)
}

pub async fn unenroll_student(pg: &PgPool, course_id: i64, student_id: i64) -> Payload<bool> {
    let res = sqlx::query("DELETE FROM course_students WHERE course_id = $1 AND student_id = $2")
        .bind(course_id)
        .bind(student_id)
        .execute(pg)
        .await?;
    Ok(res.rows_affected() >= 1)
}

pub async fn enrolled_students(pg: &PgPool, course_id: i64) -> Payload<Vec<Student>> {
    Ok(sqlx::query_as::<_, Student>(
        "SELECT s.* FROM students s \
         JOIN course_students cs ON cs.student_id = s.id \
         WHERE cs.course_id = $1 ORDER BY s.id",
    )
    .bind(course_id)
    .fetch_all(pg)
    .await?)
}

pub async fn courses_enrolled(pg: &PgPool, student_id: i64) -> Payload<Vec<Course>> {
    Ok(sqlx::query_as::<_, Course>(
        "SELECT c.* FROM courses c \
         JOIN course_students cs ON cs.course_id = c.id \
         WHERE cs.student_id = $1 ORDER BY c.created_at DESC, c.id DESC",
    )
    .bind(student_id)
    .fetch_all(pg)
    .await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course() -> NewCourse {
        NewCourse {
            code: Some("CSC101".to_string()),
            title: "Intro to Computing".to_string(),
            lecture_id: None,
            lecturer_id: 1,
            level: 100,
        }
    }

    #[test]
    fn accepts_valid_course() {
        assert!(validate_new_course(&course()).is_ok());
        let mut no_code = course();
        no_code.code = None;
        assert!(validate_new_course(&no_code).is_ok());
    }

    #[test]
    fn rejects_long_code_and_blank_title() {
        let mut long_code = course();
        long_code.code = Some("CSC10101X".to_string());
        assert!(validate_new_course(&long_code).is_err());

        let mut blank = course();
        blank.title = String::new();
        assert!(validate_new_course(&blank).is_err());
    }
}
