use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::err::Error;

macro_rules! choice_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $value:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $value)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($value => Ok($name::$variant),)+
                    other => Err(Error::invalid(format!(
                        "`{}` is not a valid {}",
                        other,
                        stringify!($name)
                    ))),
                }
            }
        }
    };
}

choice_enum!(Gender {
    Male => "MALE",
    Female => "FEMALE",
    Mr => "MR",
    Mrs => "MRS",
});

choice_enum!(
    /// Academic year of a student.
    Level {
        L100 => "100",
        L200 => "200",
        L300 => "300",
        L400 => "400",
        L500 => "500",
    }
);

choice_enum!(Semester {
    First => "FIRST",
    Second => "SECOND",
});

fn parse_choice<T: FromStr>(raw: &Option<String>) -> Option<T> {
    raw.as_deref().and_then(|s| s.parse().ok())
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub user_id: String,
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub other_names: Option<String>,
    pub full_name: Option<String>,
    pub gender: Option<String>,
    pub is_student: bool,
    pub is_lecturer: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn gender(&self) -> Option<Gender> {
        parse_choice(&self.gender)
    }

    pub fn short_name(&self) -> &str {
        &self.first_name
    }

    pub fn has_perm(&self, _perm: &str) -> bool {
        true
    }

    pub fn has_module_perms(&self, _app_label: &str) -> bool {
        true
    }

    pub fn has_usable_password(&self) -> bool {
        self.password_hash.is_some()
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.user_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Student {
    pub id: i64,
    pub user_id: i64,
    pub program: Option<String>,
    pub level: Option<String>,
    pub semester: Option<String>,
}

impl Student {
    pub fn level(&self) -> Option<Level> {
        parse_choice(&self.level)
    }

    pub fn semester(&self) -> Option<Semester> {
        parse_choice(&self.semester)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Lecturer {
    pub id: i64,
    pub user_id: i64,
    pub phone_number: Option<String>,
    pub office: Option<String>,
}

/// The role-specific row that extends a [`User`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "role", content = "profile")]
pub enum Profile {
    Student(Student),
    Lecturer(Lecturer),
}

impl Profile {
    pub fn kind(&self) -> &'static str {
        match self {
            Profile::Student(_) => "student",
            Profile::Lecturer(_) => "lecturer",
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Profile::Student(s) => s.id,
            Profile::Lecturer(l) => l.id,
        }
    }

    pub fn user_id(&self) -> i64 {
        match self {
            Profile::Student(s) => s.user_id,
            Profile::Lecturer(l) => l.user_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Course {
    pub id: i64,
    pub code: Option<String>,
    pub title: String,
    pub lecture_id: Option<i64>,
    pub lecturer_id: i64,
    pub level: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Display for Course {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code.as_deref().unwrap_or(&self.title))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct QrCode {
    pub id: i64,
    pub lecturer_id: i64,
    pub course_id: i64,
    /// Image path relative to the media root.
    pub qr_code: String,
    pub qr_code_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Display for QrCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qr_code)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UniqueCode {
    pub id: i64,
    pub code: String,
    pub course_id: i64,
    pub is_valid: bool,
    pub created_at: DateTime<Utc>,
}

impl fmt::Display for UniqueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Attendance {
    pub id: i64,
    pub student_id: Option<i64>,
    pub attendance_code_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 1,
            user_id: "ST001".to_string(),
            email: None,
            first_name: "Ama".to_string(),
            last_name: "Mensah".to_string(),
            other_names: None,
            full_name: Some("Ama Mensah".to_string()),
            gender: Some("FEMALE".to_string()),
            is_student: true,
            is_lecturer: false,
            is_staff: false,
            is_superuser: false,
            password_hash: Some("$pbkdf2-sha256$secret".to_string()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn choices_parse_their_stored_values() {
        for gender in Gender::ALL {
            assert_eq!(gender.as_str().parse::<Gender>().unwrap(), *gender);
        }
        assert_eq!("300".parse::<Level>().unwrap(), Level::L300);
        assert_eq!("SECOND".parse::<Semester>().unwrap(), Semester::Second);
        assert!("THIRD".parse::<Semester>().is_err());
        assert!("male".parse::<Gender>().is_err());
    }

    #[test]
    fn choices_serialize_as_stored_values() {
        assert_eq!(serde_json::to_string(&Gender::Mrs).unwrap(), "\"MRS\"");
        assert_eq!(serde_json::to_string(&Level::L100).unwrap(), "\"100\"");
    }

    #[test]
    fn user_displays_as_user_id() {
        let user = user();
        assert_eq!(user.to_string(), "ST001");
        assert_eq!(user.short_name(), "Ama");
        assert_eq!(user.gender(), Some(Gender::Female));
        assert!(user.has_perm("anything"));
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let json = serde_json::to_value(user()).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["user_id"], "ST001");
    }

    #[test]
    fn unknown_stored_choice_reads_as_none() {
        let student = Student {
            id: 1,
            user_id: 1,
            program: None,
            level: Some("900".to_string()),
            semester: Some("FIRST".to_string()),
        };
        assert_eq!(student.level(), None);
        assert_eq!(student.semester(), Some(Semester::First));
    }

    #[test]
    fn profile_kind_names_the_role() {
        let lecturer = Profile::Lecturer(Lecturer {
            id: 3,
            user_id: 9,
            phone_number: None,
            office: None,
        });
        assert_eq!(lecturer.kind(), "lecturer");
        assert_eq!(lecturer.id(), 3);
        assert_eq!(lecturer.user_id(), 9);
    }

    #[test]
    fn course_displays_code_or_title() {
        let mut course = Course {
            id: 1,
            code: Some("CSC101".to_string()),
            title: "Intro to Computing".to_string(),
            lecture_id: None,
            lecturer_id: 1,
            level: 100,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(course.to_string(), "CSC101");
        course.code = None;
        assert_eq!(course.to_string(), "Intro to Computing");
    }
}
