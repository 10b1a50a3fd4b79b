//! # Presenter 模块
//!
//! 引擎调用的展示层契约。
//!
//! ## 设计原则
//!
//! - 展示层只负责"显示什么"，不决定游标移动
//! - 引擎从不阻塞等待展示层：选项、出示物品、时间轴完成都通过
//!   [`DialogueRunner`](crate::DialogueRunner) 的具名重入方法回传
//! - 不包含任何渲染引擎的类型

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// 展示层契约
///
/// 选项回调对应 [`DialogueRunner::select_option`](crate::DialogueRunner::select_option)，
/// 出示回调对应 [`DialogueRunner::present_item`](crate::DialogueRunner::present_item)。
pub trait Presenter {
    /// 显示一句对话（`speaker` 为 None 表示旁白）
    fn show_dialogue(&mut self, speaker: Option<&str>, text: &str);

    /// 显示选项
    fn show_options(&mut self, labels: &[String]);

    /// 隐藏选项
    fn hide_options(&mut self);

    /// 当前节点是否为结束节点
    fn set_end_node_flag(&mut self, is_end: bool);

    /// 开启物品出示
    fn enable_item_presentation(&mut self);

    /// 关闭物品出示
    fn disable_item_presentation(&mut self);

    /// 对话结束，隐藏对话界面
    fn on_dialogue_ended(&mut self);
}

/// 展示层调用的记录形式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PresenterEvent {
    ShowDialogue {
        speaker: Option<String>,
        text: String,
    },
    ShowOptions {
        labels: Vec<String>,
    },
    HideOptions,
    SetEndNodeFlag(bool),
    EnableItemPresentation,
    DisableItemPresentation,
    DialogueEnded,
}

impl std::fmt::Display for PresenterEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ShowDialogue { speaker, text } => write!(
                f,
                "show_dialogue({}, {:?})",
                speaker.as_deref().unwrap_or("-"),
                text
            ),
            Self::ShowOptions { labels } => write!(f, "show_options({:?})", labels),
            Self::HideOptions => write!(f, "hide_options"),
            Self::SetEndNodeFlag(is_end) => write!(f, "set_end_node_flag({})", is_end),
            Self::EnableItemPresentation => write!(f, "enable_item_presentation"),
            Self::DisableItemPresentation => write!(f, "disable_item_presentation"),
            Self::DialogueEnded => write!(f, "dialogue_ended"),
        }
    }
}

/// 记录所有调用的展示层
///
/// 克隆共享同一份记录，适合无界面运行和回放。
#[derive(Debug, Clone, Default)]
pub struct RecordingPresenter {
    events: Rc<RefCell<Vec<PresenterEvent>>>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已记录的事件
    pub fn events(&self) -> Vec<PresenterEvent> {
        self.events.borrow().clone()
    }

    /// 取出并清空已记录的事件
    pub fn take(&self) -> Vec<PresenterEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    /// 每行一个事件的文本记录
    pub fn transcript(&self) -> String {
        self.events
            .borrow()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// 最近一次显示的对话文本
    pub fn last_text(&self) -> Option<String> {
        self.events.borrow().iter().rev().find_map(|e| match e {
            PresenterEvent::ShowDialogue { text, .. } => Some(text.clone()),
            _ => None,
        })
    }

    fn record(&self, event: PresenterEvent) {
        self.events.borrow_mut().push(event);
    }
}

impl Presenter for RecordingPresenter {
    fn show_dialogue(&mut self, speaker: Option<&str>, text: &str) {
        self.record(PresenterEvent::ShowDialogue {
            speaker: speaker.map(str::to_string),
            text: text.to_string(),
        });
    }

    fn show_options(&mut self, labels: &[String]) {
        self.record(PresenterEvent::ShowOptions {
            labels: labels.to_vec(),
        });
    }

    fn hide_options(&mut self) {
        self.record(PresenterEvent::HideOptions);
    }

    fn set_end_node_flag(&mut self, is_end: bool) {
        self.record(PresenterEvent::SetEndNodeFlag(is_end));
    }

    fn enable_item_presentation(&mut self) {
        self.record(PresenterEvent::EnableItemPresentation);
    }

    fn disable_item_presentation(&mut self) {
        self.record(PresenterEvent::DisableItemPresentation);
    }

    fn on_dialogue_ended(&mut self) {
        self.record(PresenterEvent::DialogueEnded);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_shares_log_across_clones() {
        let recorder = RecordingPresenter::new();
        let mut handle = recorder.clone();

        handle.show_dialogue(Some("Mia"), "Hi");
        handle.show_options(&["A".to_string(), "B".to_string()]);
        handle.on_dialogue_ended();

        assert_eq!(recorder.events().len(), 3);
        assert_eq!(recorder.last_text().as_deref(), Some("Hi"));
        assert_eq!(
            recorder.transcript(),
            "show_dialogue(Mia, \"Hi\")\nshow_options([\"A\", \"B\"])\ndialogue_ended"
        );

        let taken = recorder.take();
        assert_eq!(taken.len(), 3);
        assert!(recorder.events().is_empty());
    }

    #[test]
    fn test_event_serialization() {
        let event = PresenterEvent::ShowDialogue {
            speaker: None,
            text: "...".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        let loaded: PresenterEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, loaded);
    }
}
