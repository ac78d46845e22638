use std::path::{Path, PathBuf};

use anyhow::bail;
use tokio::fs::{create_dir_all, remove_file, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};
use uuid::Uuid;

pub const QR_CODE_UPLOADS: &str = "qr_codes";

pub async fn prepare_io<P: AsRef<Path>>(media_root: P) -> anyhow::Result<()> {
    create_dir_all(media_root.as_ref().join(QR_CODE_UPLOADS)).await?;
    Ok(())
}

pub async fn create_io_file<P: AsRef<Path>>(path: P) -> anyhow::Result<File> {
    let pathbuf = path.as_ref().to_path_buf();
    if let Some(parent) = pathbuf.parent() {
        create_dir_all(parent).await?;
    }
    if pathbuf.exists() {
        bail!("File `{}` already exists!", pathbuf.display())
    }
    File::create(pathbuf).await.map_err(anyhow::Error::from)
}

pub async fn read_io_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<u8>> {
    let buf = path.as_ref();
    if !buf.exists() {
        bail!("Tried to read nonexistent file `{}`!", buf.display())
    }
    let mut bytes = Vec::new();
    BufReader::new(File::open(buf).await?)
        .read_to_end(&mut bytes)
        .await?;
    Ok(bytes)
}

/// Writes an uploaded file under `<media_root>/<upload_to>/` with a fresh
/// name and returns its path relative to the media root.
pub async fn store_upload<P: AsRef<Path>>(
    media_root: P,
    upload_to: &str,
    extension: &str,
    bytes: &[u8],
) -> anyhow::Result<String> {
    if bytes.is_empty() {
        bail!("Refusing to store an empty upload")
    }
    let relative = format!("{}/{}.{}", upload_to, Uuid::new_v4(), extension);
    let file = create_io_file(media_root.as_ref().join(&relative)).await?;
    let mut writer = BufWriter::new(file);
    writer.write_all(bytes).await?;
    writer.flush().await?;
    log::debug!("Stored {} byte upload at {}", bytes.len(), relative);
    Ok(relative)
}

pub async fn read_upload<P: AsRef<Path>>(media_root: P, relative: &str) -> anyhow::Result<Vec<u8>> {
    read_io_file(upload_path(media_root, relative)?).await
}

/// Missing files are not an error, the row may outlive its upload.
pub async fn remove_upload<P: AsRef<Path>>(media_root: P, relative: &str) -> anyhow::Result<()> {
    let path = upload_path(media_root, relative)?;
    if path.exists() {
        remove_file(path).await?;
    } else {
        log::warn!("Upload `{}` was already gone", relative);
    }
    Ok(())
}

fn upload_path<P: AsRef<Path>>(media_root: P, relative: &str) -> anyhow::Result<PathBuf> {
    let rel = Path::new(relative);
    if rel.is_absolute()
        || rel
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir))
    {
        bail!("Upload path `{}` escapes the media root", relative)
    }
    Ok(media_root.as_ref().join(rel))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_root() -> PathBuf {
        std::env::temp_dir().join(format!("qrmark-io-{}", Uuid::new_v4()))
    }

    #[tokio::test]
    async fn stores_and_reads_back_upload() {
        let root = scratch_root();
        prepare_io(&root).await.unwrap();

        let relative = store_upload(&root, QR_CODE_UPLOADS, "png", b"\x89PNG fake")
            .await
            .unwrap();
        assert!(relative.starts_with("qr_codes/"));
        assert!(relative.ends_with(".png"));

        let bytes = read_upload(&root, &relative).await.unwrap();
        assert_eq!(bytes, b"\x89PNG fake");

        remove_upload(&root, &relative).await.unwrap();
        assert!(read_upload(&root, &relative).await.is_err());
        // second removal is a no-op
        remove_upload(&root, &relative).await.unwrap();

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }

    #[tokio::test]
    async fn rejects_empty_upload() {
        let root = scratch_root();
        assert!(store_upload(&root, QR_CODE_UPLOADS, "png", b"").await.is_err());
    }

    #[tokio::test]
    async fn refuses_to_overwrite() {
        let root = scratch_root();
        let path = root.join("taken.bin");
        create_io_file(&path).await.unwrap();
        assert!(create_io_file(&path).await.is_err());
        tokio::fs::remove_dir_all(&root).await.unwrap();
    }

    #[tokio::test]
    async fn rejects_paths_outside_root() {
        let root = scratch_root();
        assert!(read_upload(&root, "../etc/passwd").await.is_err());
        assert!(read_upload(&root, "/etc/passwd").await.is_err());
    }
}
