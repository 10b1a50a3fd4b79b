//! # Input 模块
//!
//! 定义宿主向引擎传递的输入事件。
//!
//! ## 设计说明
//!
//! - `DialogueInput` 是宿主采集玩家操作或外部完成信号后传给引擎的语义化输入
//! - 每种输入对应引擎的一个具名重入方法，引擎没有隐式的延续
//! - 计时（如"N 秒后隐藏"）由宿主负责，引擎不接收时间流逝事件

use serde::{Deserialize, Serialize};

use crate::graph::ItemId;

/// 宿主向引擎传递的输入
///
/// - `Continue`：对应 [`DialogueRunner::next`](crate::DialogueRunner::next)
/// - `OptionSelected`：对应 [`DialogueRunner::select_option`](crate::DialogueRunner::select_option)
/// - `ItemPresented`：对应 [`DialogueRunner::present_item`](crate::DialogueRunner::present_item)，
///   `item` 为 None 表示玩家放弃出示
/// - `TimelineFinished`：对应 [`DialogueRunner::timeline_finished`](crate::DialogueRunner::timeline_finished)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DialogueInput {
    Continue,
    OptionSelected { index: usize },
    ItemPresented { item: Option<ItemId> },
    TimelineFinished { timeline: String },
}

impl DialogueInput {
    pub fn next() -> Self {
        Self::Continue
    }

    pub fn option(index: usize) -> Self {
        Self::OptionSelected { index }
    }

    pub fn item(item: impl Into<ItemId>) -> Self {
        Self::ItemPresented {
            item: Some(item.into()),
        }
    }

    pub fn no_item() -> Self {
        Self::ItemPresented { item: None }
    }

    pub fn timeline_finished(timeline: impl Into<String>) -> Self {
        Self::TimelineFinished {
            timeline: timeline.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_creation() {
        assert_eq!(DialogueInput::next(), DialogueInput::Continue);
        assert_eq!(
            DialogueInput::option(2),
            DialogueInput::OptionSelected { index: 2 }
        );
        assert_eq!(
            DialogueInput::item("badge"),
            DialogueInput::ItemPresented {
                item: Some("badge".to_string())
            }
        );
        assert_eq!(
            DialogueInput::no_item(),
            DialogueInput::ItemPresented { item: None }
        );
    }

    #[test]
    fn test_input_replay_log() {
        let inputs = vec![
            DialogueInput::next(),
            DialogueInput::option(1),
            DialogueInput::timeline_finished("cut_01"),
        ];
        let json = serde_json::to_string(&inputs).unwrap();
        let loaded: Vec<DialogueInput> = serde_json::from_str(&json).unwrap();
        assert_eq!(inputs, loaded);
    }
}
