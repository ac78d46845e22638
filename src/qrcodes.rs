use std::path::Path;

use rand::{thread_rng, Rng};
use sha2::{Digest, Sha256};
use sqlx::PgPool;

use crate::err::{Error, Payload};
use crate::io::{read_upload, remove_upload, store_upload, QR_CODE_UPLOADS};
use crate::models::QrCode;

pub const QR_CODE_ID_LEN: usize = 40;

pub fn generate_qr_code_id() -> String {
    let bytes: [u8; 32] = thread_rng().gen();

    let mut hasher: Sha256 = Digest::new();
    hasher.update(&bytes);
    let result = hasher.finalize();
    let mut id = hex::encode(result);
    id.truncate(QR_CODE_ID_LEN);
    id
}

/// Stores the rendered QR image for one class session and registers it.
pub async fn create_qr_code<P: AsRef<Path>>(
    pg: &PgPool,
    media_root: P,
    lecturer_id: i64,
    course_id: i64,
    image: &[u8],
) -> Payload<QrCode> {
    if image.is_empty() {
        return Err(Error::invalid("QR code image was empty"));
    }
    let path = store_upload(&media_root, QR_CODE_UPLOADS, "png", image).await?;

    let inserted = sqlx::query_as::<_, QrCode>(
        "INSERT INTO qr_codes (lecturer_id, course_id, qr_code, qr_code_id) \
         VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(lecturer_id)
    .bind(course_id)
    .bind(&path)
    .bind(generate_qr_code_id())
    .fetch_one(pg)
    .await;

    match inserted {
        Ok(qr) => {
            log::info!("Created QR code {:?} for course #{}", qr.qr_code_id, course_id);
            Ok(qr)
        }
        Err(err) => {
            // do not leave orphaned images behind
            if let Err(cleanup) = remove_upload(&media_root, &path).await {
                log::warn!("Could not remove orphaned upload {}: {}", path, cleanup);
            }
            Err(Error::from(err))
        }
    }
}

pub async fn find_qr_code(pg: &PgPool, qr_code_id: &str) -> Payload<QrCode> {
    sqlx::query_as::<_, QrCode>("SELECT * FROM qr_codes WHERE qr_code_id = $1 LIMIT 1")
        .bind(qr_code_id)
        .fetch_optional(pg)
        .await?
        .ok_or_else(|| Error::not_found(format!("QR code `{}` does not exist!", qr_code_id)))
}

pub async fn qr_codes_for_course(pg: &PgPool, course_id: i64) -> Payload<Vec<QrCode>> {
    Ok(sqlx::query_as::<_, QrCode>(
        "SELECT * FROM qr_codes WHERE course_id = $1 ORDER BY created_at DESC, id DESC",
    )
    .bind(course_id)
    .fetch_all(pg)
    .await?)
}

pub async fn read_qr_image<P: AsRef<Path>>(media_root: P, qr: &QrCode) -> Payload<Vec<u8>> {
    Ok(read_upload(media_root, &qr.qr_code).await?)
}

pub async fn delete_qr_code<P: AsRef<Path>>(pg: &PgPool, media_root: P, id: i64) -> Payload<bool> {
    let qr = sqlx::query_as::<_, QrCode>("DELETE FROM qr_codes WHERE id = $1 RETURNING *")
        .bind(id)
        .fetch_optional(pg)
        .await?;
    match qr {
        Some(qr) => {
            if let Err(err) = remove_upload(media_root, &qr.qr_code).await {
                log::warn!("Deleted QR code #{} but kept its image {}: {}", id, qr.qr_code, err);
            }
            log::info!("Deleted QR code #{}", id);
            Ok(true)
        }
        None => Ok(false),
    }
}
