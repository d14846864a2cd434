//! 上传文件存储
//!
//! 业务逻辑（路由/注册表/清扫器）不直接碰文件系统，统一走 ArtifactStorage，
//! 测试用 MemoryStorage 替身即可覆盖全部路径。

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

/// 存储接口：按生成的文件名写入，按返回的 key 读取/删除
pub trait ArtifactStorage: Send + Sync {
    /// 写入内容，返回后续 read/delete 使用的 key（磁盘实现即路径）
    fn store(&self, name: &str, bytes: &[u8]) -> io::Result<String>;

    fn read(&self, key: &str) -> io::Result<Vec<u8>>;

    /// 删除内容；key 不存在视为成功（清扫需要幂等）
    fn delete(&self, key: &str) -> io::Result<()>;
}

/// 磁盘存储：所有上传落在 root 下
pub struct DiskStorage {
    root: PathBuf,
}

impl DiskStorage {
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }
}

impl ArtifactStorage for DiskStorage {
    fn store(&self, name: &str, bytes: &[u8]) -> io::Result<String> {
        let path = self.root.join(name);
        std::fs::write(&path, bytes)?;
        Ok(path.to_string_lossy().into_owned())
    }

    fn read(&self, key: &str) -> io::Result<Vec<u8>> {
        std::fs::read(key)
    }

    fn delete(&self, key: &str) -> io::Result<()> {
        match std::fs::remove_file(key) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// 内存存储（测试用替身）
#[derive(Default)]
pub struct MemoryStorage {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.files.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.lock().unwrap().is_empty()
    }
}

impl ArtifactStorage for MemoryStorage {
    fn store(&self, name: &str, bytes: &[u8]) -> io::Result<String> {
        self.files
            .lock()
            .unwrap()
            .insert(name.to_string(), bytes.to_vec());
        Ok(name.to_string())
    }

    fn read(&self, key: &str) -> io::Result<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, key.to_string()))
    }

    fn delete(&self, key: &str) -> io::Result<()> {
        self.files.lock().unwrap().remove(key);
        Ok(())
    }
}
