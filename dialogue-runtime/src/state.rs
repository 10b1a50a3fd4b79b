//! # State 模块
//!
//! 等待模型与引擎配置。
//!
//! ## 设计原则
//!
//! - 引擎不保存独立的等待状态：等待什么完全由当前节点的变体
//!   以及节点上已解析的选择状态推导
//! - 引擎不持有时钟，也不阻塞

use serde::{Deserialize, Serialize};

/// 等待原因
///
/// 由 [`DialogueRunner::waiting`](crate::DialogueRunner::waiting) 按需推导，宿主据此采集输入。
///
/// ```text
/// Nothing   -> 空闲（无对话）
/// Continue  -> 等待"继续"，收到 Continue 后推进
/// Option    -> 等待选项，收到 OptionSelected 后推进
/// Item      -> 等待出示物品，收到 ItemPresented 后推进
/// Timeline  -> 等待时间轴完成，收到匹配的 TimelineFinished 后推进
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WaitingFor {
    #[default]
    Nothing,
    Continue,
    Option { count: usize },
    Item,
    Timeline { timeline: String },
}

impl WaitingFor {
    /// 是否处于等待状态
    pub fn is_waiting(&self) -> bool {
        !matches!(self, Self::Nothing)
    }
}

/// 引擎配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// 开始对话前对齐选项平行数组
    #[serde(default = "default_repair_on_start")]
    pub repair_on_start: bool,

    /// 单次推进中允许连续处理的静默节点数
    #[serde(default = "default_max_silent_chain")]
    pub max_silent_chain: usize,

    /// 历史记录上限
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_repair_on_start() -> bool {
    true
}

fn default_max_silent_chain() -> usize {
    256
}

fn default_history_limit() -> usize {
    1000
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            repair_on_start: default_repair_on_start(),
            max_silent_chain: default_max_silent_chain(),
            history_limit: default_history_limit(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_waiting_for() {
        assert!(!WaitingFor::Nothing.is_waiting());
        assert!(WaitingFor::Continue.is_waiting());
        assert!(WaitingFor::Option { count: 2 }.is_waiting());
        assert!(WaitingFor::Item.is_waiting());
        assert!(
            WaitingFor::Timeline {
                timeline: "intro".to_string()
            }
            .is_waiting()
        );
    }

    #[test]
    fn test_config_defaults_from_partial_json() {
        let config: RunnerConfig = serde_json::from_str(r#"{ "max_silent_chain": 8 }"#).unwrap();
        assert_eq!(config.max_silent_chain, 8);
        assert!(config.repair_on_start);
        assert_eq!(config.history_limit, 1000);
    }
}
