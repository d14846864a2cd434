//! 会话文件（Artifact）
//!
//! 一个会话同一时刻至多绑定一个文件：CSV 解析成表格驻留内存，图片只留
//! MIME 与存储 key，字节在工具执行时再经 ArtifactStorage 读取（文件可能
//! 已被清扫，读不到按「未绑定文件」处理）。

pub mod table;

use std::time::Instant;

use uuid::Uuid;

use crate::error::IngestError;
use crate::storage::ArtifactStorage;

pub use table::Table;

/// 文件内容：表格或图片
#[derive(Debug, Clone)]
pub enum ArtifactKind {
    Table(Table),
    Image { mime: String },
}

/// 会话当前绑定的文件
#[derive(Debug, Clone)]
pub struct Artifact {
    pub kind: ArtifactKind,
    /// 存储 key（磁盘实现即路径），回显给前端、清扫时删除用
    pub path: String,
    pub loaded_at: Instant,
}

impl Artifact {
    pub fn is_table(&self) -> bool {
        matches!(self.kind, ArtifactKind::Table(_))
    }

    pub fn is_image(&self) -> bool {
        matches!(self.kind, ArtifactKind::Image { .. })
    }
}

/// 一次上传的原始内容
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// 解析并落盘一次上传：校验通过后才写存储
///
/// 按扩展名分发：csv -> 表格（此时完成 CSV 校验），png/jpg/jpeg -> 图片，
/// 其余 -> UnsupportedFileType；超过 max_bytes -> FileTooLarge。
pub fn ingest(
    upload: &Upload,
    storage: &dyn ArtifactStorage,
    max_bytes: usize,
) -> Result<Artifact, IngestError> {
    if upload.bytes.len() > max_bytes {
        return Err(IngestError::FileTooLarge {
            size: upload.bytes.len(),
            max: max_bytes,
        });
    }

    let ext = upload
        .filename
        .rsplit('.')
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();

    let kind = match ext.as_str() {
        "csv" => {
            let text = std::str::from_utf8(&upload.bytes)
                .map_err(|_| IngestError::InvalidCsv("not valid UTF-8".to_string()))?;
            ArtifactKind::Table(Table::parse_csv(text)?)
        }
        "png" => ArtifactKind::Image {
            mime: "image/png".to_string(),
        },
        "jpg" | "jpeg" => ArtifactKind::Image {
            mime: "image/jpeg".to_string(),
        },
        other => return Err(IngestError::UnsupportedFileType(other.to_string())),
    };

    let name = format!("{}.{}", Uuid::new_v4(), ext);
    let path = storage.store(&name, &upload.bytes)?;

    Ok(Artifact {
        kind,
        path,
        loaded_at: Instant::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn upload(filename: &str, bytes: &[u8]) -> Upload {
        Upload {
            filename: filename.to_string(),
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn ingest_csv_parses_table() {
        let storage = MemoryStorage::new();
        let a = ingest(&upload("data.csv", b"a,b\n1,2\n"), &storage, 1024).unwrap();
        assert!(a.is_table());
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn ingest_rejects_txt_without_storing() {
        let storage = MemoryStorage::new();
        let err = ingest(&upload("notes.txt", b"hello"), &storage, 1024).unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedFileType(_)));
        assert!(storage.is_empty());
    }

    #[test]
    fn ingest_rejects_oversized() {
        let storage = MemoryStorage::new();
        let err = ingest(&upload("big.png", &[0u8; 32]), &storage, 16).unwrap_err();
        assert!(matches!(err, IngestError::FileTooLarge { .. }));
        assert!(storage.is_empty());
    }

    #[test]
    fn ingest_rejects_invalid_csv_without_storing() {
        let storage = MemoryStorage::new();
        let err = ingest(&upload("empty.csv", b""), &storage, 1024).unwrap_err();
        assert!(matches!(err, IngestError::InvalidCsv(_)));
        assert!(storage.is_empty());
    }

    #[test]
    fn ingest_image_keeps_mime() {
        let storage = MemoryStorage::new();
        let a = ingest(&upload("scan.JPG", &[0xff, 0xd8]), &storage, 1024).unwrap();
        match &a.kind {
            ArtifactKind::Image { mime } => assert_eq!(mime, "image/jpeg"),
            _ => panic!("expected image"),
        }
    }
}
