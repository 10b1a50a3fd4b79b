//! # Store 模块
//!
//! 基于文件的一次性完成记录。
//!
//! ## 文件布局
//!
//! ```text
//! saves/
//! └── completion.json
//! ```
//!
//! 每次标记完成都会整体重写文件；写入失败时内存中也不记录。

use std::fs;
use std::path::{Path, PathBuf};

use dialogue_runtime::{
    CompletionFile, CompletionKey, CompletionStore, MemoryCompletionStore, StoreError,
};
use tracing::{debug, info};

/// 完成记录文件名
pub const COMPLETION_FILE: &str = "completion.json";

/// 文件完成记录
#[derive(Debug)]
pub struct FileCompletionStore {
    /// 存档目录
    saves_dir: PathBuf,
    records: MemoryCompletionStore,
}

impl FileCompletionStore {
    /// 打开存档目录下的完成记录
    ///
    /// 文件不存在时视为空记录；版本不兼容或格式损坏时返回错误。
    pub fn open(saves_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let saves_dir = saves_dir.as_ref().to_path_buf();
        let path = saves_dir.join(COMPLETION_FILE);

        let records = if path.exists() {
            let json = fs::read_to_string(&path)
                .map_err(|e| StoreError::Io(format!("无法读取完成记录: {}", e)))?;
            let file = CompletionFile::from_json(&json)?;
            debug!(path = %path.display(), count = file.records.len(), "完成记录已加载");
            MemoryCompletionStore::from_file(file)
        } else {
            MemoryCompletionStore::new()
        };

        Ok(Self { saves_dir, records })
    }

    /// 完成记录文件路径
    pub fn path(&self) -> PathBuf {
        self.saves_dir.join(COMPLETION_FILE)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 清空记录并删除文件
    pub fn reset(&mut self) -> Result<(), StoreError> {
        self.records.clear();
        let path = self.path();
        if path.exists() {
            fs::remove_file(&path)
                .map_err(|e| StoreError::Io(format!("无法删除完成记录: {}", e)))?;
            info!(path = %path.display(), "完成记录已重置");
        }
        Ok(())
    }

    /// 确保存档目录存在
    fn ensure_dir(&self) -> Result<(), StoreError> {
        if !self.saves_dir.exists() {
            fs::create_dir_all(&self.saves_dir)
                .map_err(|e| StoreError::Io(format!("无法创建存档目录: {}", e)))?;
        }
        Ok(())
    }

    fn write(&self, file: &CompletionFile) -> Result<(), StoreError> {
        self.ensure_dir()?;
        let json = file.to_json()?;
        fs::write(self.path(), json)
            .map_err(|e| StoreError::Io(format!("无法写入完成记录: {}", e)))
    }
}

impl CompletionStore for FileCompletionStore {
    fn is_complete(&self, key: &CompletionKey) -> bool {
        self.records.is_complete(key)
    }

    fn mark_complete(&mut self, key: &CompletionKey) -> Result<(), StoreError> {
        if self.records.is_complete(key) {
            return Ok(());
        }
        // 先落盘，成功后才更新内存记录
        let mut file = self.records.to_file();
        file.records.insert(key.clone());
        self.write(&file)?;
        self.records.mark_complete(key)
    }
}
