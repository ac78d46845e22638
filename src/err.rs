use std::fmt;

use serde::Serialize;

pub type Payload<T> = Result<T, Error>;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "error")]
pub enum Error {
    NotFound { message: String },
    InvalidPayload { message: String },
    UserAlreadyExists { message: String },
    UserDoesNotExist { message: String },
    InvalidAttendanceCode { message: String },
    InternalError { kind: &'static str, message: String },
    Unknown { message: String },
}

impl Error {
    pub fn unknown<S: Into<String>>(msg: S) -> Error {
        Error::Unknown {
            message: msg.into(),
        }
    }

    pub fn invalid<S: Into<String>>(msg: S) -> Error {
        Error::InvalidPayload {
            message: msg.into(),
        }
    }

    pub fn not_found<S: Into<String>>(msg: S) -> Error {
        Error::NotFound {
            message: msg.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Error::NotFound { .. } => "NotFound",
            Error::InvalidPayload { .. } => "InvalidPayload",
            Error::UserAlreadyExists { .. } => "UserAlreadyExists",
            Error::UserDoesNotExist { .. } => "UserDoesNotExist",
            Error::InvalidAttendanceCode { .. } => "InvalidAttendanceCode",
            Error::InternalError { kind, .. } => *kind,
            Error::Unknown { .. } => "Unknown",
        }
    }

    fn message(&self) -> &str {
        match self {
            Error::NotFound { message }
            | Error::InvalidPayload { message }
            | Error::UserAlreadyExists { message }
            | Error::UserDoesNotExist { message }
            | Error::InvalidAttendanceCode { message }
            | Error::InternalError { message, .. }
            | Error::Unknown { message } => message.as_str(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind(), self.message())
    }
}

impl std::error::Error for Error {}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound {
                message: "Requested row does not exist!".to_string(),
            },
            sqlx::Error::Database(db) => Self::InternalError {
                kind: "DatabaseError",
                message: db.message().to_string(),
            },
            other => Self::InternalError {
                kind: "DatabaseError",
                message: other.to_string(),
            },
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(io: std::io::Error) -> Self {
        Self::InternalError {
            kind: "IOError",
            message: io.to_string(),
        }
    }
}

impl From<uuid::Error> for Error {
    fn from(id: uuid::Error) -> Self {
        Self::InternalError {
            kind: "UUIDError",
            message: id.to_string(),
        }
    }
}

impl From<pbkdf2::password_hash::Error> for Error {
    fn from(err: pbkdf2::password_hash::Error) -> Self {
        Self::InternalError {
            kind: "PasswordHashError",
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Unknown {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_error_tag() {
        let err = Error::UserDoesNotExist {
            message: "User with id `ST001` does not exist!".to_string(),
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["error"], "UserDoesNotExist");
        assert_eq!(json["message"], "User with id `ST001` does not exist!");
    }

    #[test]
    fn internal_error_keeps_kind() {
        let err = Error::from(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing",
        ));
        assert_eq!(err.kind(), "IOError");
        assert_eq!(err.to_string(), "IOError: missing");
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err = Error::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, Error::NotFound { .. }));
    }
}
