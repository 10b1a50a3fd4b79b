//! # Error 模块
//!
//! 定义 dialogue-runtime 中使用的错误类型。
//!
//! 普通的分支结果（条件为假、无匹配、未连接、选项越界）不是错误，
//! 只通过 `None`/`false` 在正常流程中传递。

use thiserror::Error;

use crate::graph::NodeId;

/// 对话图构建/加载错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    /// 重复的节点 id
    #[error("对话图 '{graph}' 中节点 '{node}' 重复")]
    DuplicateNode { graph: String, node: NodeId },

    /// 文档格式无效
    #[error("对话图文档无效: {0}")]
    InvalidDocument(String),
}

/// 运行时错误
///
/// 配置错误与不变量破坏都会先把遍历中止到空闲状态，再返回给调用方。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    /// 未设置起始节点
    #[error("对话图 '{graph}' 未设置起始节点")]
    MissingStartNode { graph: String },

    /// 未设置展示层
    #[error("对话图 '{graph}' 未设置展示层")]
    MissingPresenter { graph: String },

    /// 游标或连接指向不属于本图的节点
    #[error("对话图 '{graph}' 引用了不存在的节点 '{node}'")]
    DanglingNode { graph: String, node: NodeId },

    /// 已有遍历正在进行
    #[error("对话图 '{graph}' 已有正在进行的对话")]
    AlreadyActive { graph: String },

    /// 静默节点链过长（通常是条件/事件节点构成了环）
    #[error("对话图 '{graph}' 在节点 '{node}' 处静默节点链超过 {limit} 步")]
    SilentChainTooLong {
        graph: String,
        node: NodeId,
        limit: usize,
    },

    /// 状态不匹配
    #[error("当前状态不允许此操作：期望 {expected}，实际 {actual}")]
    StateMismatch { expected: String, actual: String },
}

impl RuntimeError {
    /// 是否为内容配置错误（需要反馈给内容作者）
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::MissingStartNode { .. }
                | Self::MissingPresenter { .. }
                | Self::DanglingNode { .. }
                | Self::SilentChainTooLong { .. }
        )
    }
}

/// 完成记录存储错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// 序列化失败
    #[error("序列化失败: {0}")]
    SerializationFailed(String),

    /// 反序列化失败
    #[error("反序列化失败: {0}")]
    DeserializationFailed(String),

    /// 版本不兼容
    #[error("完成记录版本不兼容: 文件版本 {file_version} vs 当前版本 {current_version}")]
    IncompatibleVersion {
        file_version: String,
        current_version: String,
    },

    /// 文件操作失败
    #[error("文件操作失败: {0}")]
    Io(String),
}

/// dialogue-runtime 统一错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DialogueError {
    #[error("对话图错误: {0}")]
    Graph(#[from] GraphError),

    #[error("运行时错误: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("存储错误: {0}")]
    Store(#[from] StoreError),
}

/// Result 类型别名
pub type DialogueResult<T> = Result<T, DialogueError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = RuntimeError::DanglingNode {
            graph: "g".to_string(),
            node: NodeId::from("n9"),
        };
        assert!(err.to_string().contains("n9"));
        assert!(err.is_configuration_error());

        let err = RuntimeError::AlreadyActive {
            graph: "g".to_string(),
        };
        assert!(!err.is_configuration_error());

        let unified: DialogueError = err.into();
        assert!(matches!(unified, DialogueError::Runtime(_)));
    }
}
