//! # History 模块
//!
//! 对话回看记录。
//!
//! ## 设计原则
//!
//! - 记录玩家看到和做出的关键事件（对话、选择、出示、结束）
//! - 按发生顺序编号，不读取真实时间
//! - 所有数据可序列化

use serde::{Deserialize, Serialize};

use crate::graph::{ItemId, NodeId};

/// 历史事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HistoryEvent {
    /// 显示了一句对话
    Line {
        node: NodeId,
        speaker: Option<String>,
        text: String,
    },

    /// 选择了选项
    OptionChosen {
        node: NodeId,
        /// 越界选择时为 None
        label: Option<String>,
        index: usize,
    },

    /// 出示了物品（None 表示放弃出示）
    ItemPresented { node: NodeId, item: Option<ItemId> },

    /// 对话结束
    Ended { graph: String },
}

/// 带序号的历史条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub seq: u64,
    pub event: HistoryEvent,
}

/// 历史记录容器
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct History {
    /// 事件列表（按发生顺序）
    entries: Vec<HistoryEntry>,
    /// 最大记录数
    max_entries: usize,
    next_seq: u64,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            max_entries: 1000,
            next_seq: 0,
        }
    }

    /// 设置最大记录数
    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }

    /// 添加事件，超过上限时丢弃最早的记录
    pub fn push(&mut self, event: HistoryEvent) {
        self.entries.push(HistoryEntry {
            seq: self.next_seq,
            event,
        });
        self.next_seq += 1;

        if self.entries.len() > self.max_entries {
            let overflow = self.entries.len() - self.max_entries;
            self.entries.drain(..overflow);
        }
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// 已显示的对话数量
    pub fn line_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.event, HistoryEvent::Line { .. }))
            .count()
    }

    /// 最近的 N 句对话文本（按时间顺序）
    pub fn recent_lines(&self, count: usize) -> Vec<&str> {
        let mut lines: Vec<&str> = self
            .entries
            .iter()
            .rev()
            .filter_map(|e| match &e.event {
                HistoryEvent::Line { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .take(count)
            .collect();
        lines.reverse();
        lines
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
