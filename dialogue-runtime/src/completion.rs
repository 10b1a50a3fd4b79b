//! # Completion 模块
//!
//! 一次性节点的完成记录。
//!
//! ## 设计原则
//!
//! - 键为 `(图名称, 节点名称, 节点 id)`，值为是否完成
//! - 只有一次性节点会写入记录，写入是幂等的
//! - 引擎只依赖 [`CompletionStore`] 契约，持久化方式由宿主决定；
//!   [`CompletionFile`] 提供带版本号的 JSON 格式

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::graph::{Node, NodeId};

/// 完成记录格式版本
///
/// - MAJOR: 不兼容的格式变更
/// - MINOR: 向后兼容的新字段
pub const COMPLETION_VERSION_MAJOR: u32 = 1;
pub const COMPLETION_VERSION_MINOR: u32 = 0;

/// 完成记录的键
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CompletionKey {
    pub graph: String,
    pub node_name: String,
    pub node_id: NodeId,
}

impl CompletionKey {
    pub fn new(
        graph: impl Into<String>,
        node_name: impl Into<String>,
        node_id: impl Into<NodeId>,
    ) -> Self {
        Self {
            graph: graph.into(),
            node_name: node_name.into(),
            node_id: node_id.into(),
        }
    }

    /// 节点在指定图中的键
    pub fn for_node(graph: &str, node: &Node) -> Self {
        Self::new(graph, node.name.clone(), node.id.clone())
    }
}

impl std::fmt::Display for CompletionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}#{}", self.graph, self.node_name, self.node_id)
    }
}

/// 完成记录存储契约
pub trait CompletionStore {
    fn is_complete(&self, key: &CompletionKey) -> bool;

    /// 标记完成；失败只会被记录为警告
    fn mark_complete(&mut self, key: &CompletionKey) -> Result<(), StoreError>;
}

/// 内存完成记录（克隆共享同一份记录）
#[derive(Debug, Clone, Default)]
pub struct MemoryCompletionStore {
    records: Rc<RefCell<BTreeSet<CompletionKey>>>,
}

impl MemoryCompletionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从文件内容恢复
    pub fn from_file(file: CompletionFile) -> Self {
        Self {
            records: Rc::new(RefCell::new(file.records)),
        }
    }

    /// 导出为文件内容
    pub fn to_file(&self) -> CompletionFile {
        CompletionFile::new(self.records.borrow().clone())
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }

    /// 清空记录（用于"重置进度"）
    pub fn clear(&self) {
        self.records.borrow_mut().clear();
    }
}

impl CompletionStore for MemoryCompletionStore {
    fn is_complete(&self, key: &CompletionKey) -> bool {
        self.records.borrow().contains(key)
    }

    fn mark_complete(&mut self, key: &CompletionKey) -> Result<(), StoreError> {
        self.records.borrow_mut().insert(key.clone());
        Ok(())
    }
}

/// 格式版本
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatVersion {
    pub major: u32,
    pub minor: u32,
}

impl FormatVersion {
    pub fn current() -> Self {
        Self {
            major: COMPLETION_VERSION_MAJOR,
            minor: COMPLETION_VERSION_MINOR,
        }
    }

    /// major 相同即兼容
    pub fn is_compatible(&self) -> bool {
        self.major == COMPLETION_VERSION_MAJOR
    }
}

impl Default for FormatVersion {
    fn default() -> Self {
        Self::current()
    }
}

impl std::fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// 完成记录文件
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CompletionFile {
    pub version: FormatVersion,
    pub records: BTreeSet<CompletionKey>,
}

impl CompletionFile {
    pub fn new(records: BTreeSet<CompletionKey>) -> Self {
        Self {
            version: FormatVersion::current(),
            records,
        }
    }

    pub fn to_json(&self) -> Result<String, StoreError> {
        serde_json::to_string_pretty(self).map_err(|e| StoreError::SerializationFailed(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        let file: CompletionFile = serde_json::from_str(json)
            .map_err(|e| StoreError::DeserializationFailed(e.to_string()))?;

        if !file.version.is_compatible() {
            return Err(StoreError::IncompatibleVersion {
                file_version: file.version.to_string(),
                current_version: FormatVersion::current().to_string(),
            });
        }

        Ok(file)
    }
}
