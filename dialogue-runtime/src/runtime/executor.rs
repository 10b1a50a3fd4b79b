//! # Executor 模块
//!
//! 执行单个节点：产生展示层调用与外部副作用。
//!
//! ## 职责
//!
//! - 对话/出示节点：调用展示层，进入等待
//! - 条件节点：求值并记录结果
//! - 事件节点：执行副作用
//! - 选项副作用的派发
//!
//! 执行器不移动游标，推进由 [`DialogueRunner`](super::DialogueRunner) 决定。

use tracing::debug;

use crate::graph::{
    AnimType, Condition, DialogueMode, EventKind, ItemOffer, Node, NodeKind, OptionEffects,
};
use crate::presenter::Presenter;
use crate::services::Services;

/// 节点执行后的流向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// 等待外部输入
    Await,
    /// 静默节点，立即推进
    Advance,
}

/// 节点执行器
///
/// 持有全部外部协作者。
#[derive(Debug, Default)]
pub struct Executor {
    services: Services,
}

impl Executor {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn services_mut(&mut self) -> &mut Services {
        &mut self.services
    }

    /// 执行单个节点
    ///
    /// 会重置节点上一次访问遗留的选择状态。
    pub fn execute(&mut self, node: &mut Node, presenter: &mut dyn Presenter) -> Flow {
        match &mut node.kind {
            NodeKind::Dialogue(dialogue) => {
                presenter.show_dialogue(dialogue.speaker.as_deref(), &dialogue.text);
                if let DialogueMode::Choice(choice) = &mut dialogue.mode {
                    choice.reset();
                    presenter.show_options(&choice.options);
                }
                Flow::Await
            }

            NodeKind::Presentation(presentation) => {
                presentation.set_offer(ItemOffer::Pending);
                presenter.show_dialogue(presentation.speaker.as_deref(), &presentation.text);
                presenter.enable_item_presentation();
                Flow::Await
            }

            NodeKind::Condition(condition) => {
                let result = self.evaluate(&condition.condition);
                debug!(node = %node.id, condition = %condition.condition, result, "条件求值");
                condition.resolve(result);
                Flow::Advance
            }

            NodeKind::Event(event) => {
                debug!(node = %node.id, event = %event.event, "执行事件");
                self.run_event(&event.event);
                Flow::Advance
            }
        }
    }

    /// 条件求值
    ///
    /// 协作者缺失、变量不存在都视为 false。
    pub fn evaluate(&self, condition: &Condition) -> bool {
        match condition {
            Condition::HasItem { item_id } => self.services.has_item(item_id),
            Condition::CheckFlag { flag, expected } => {
                self.services.flag(flag).is_some_and(|value| value == *expected)
            }
            Condition::CompareValue {
                variable,
                op,
                threshold,
            } => match self.services.numeric_variable(variable) {
                Some(value) => op.apply(value, *threshold),
                None => {
                    debug!(variable, "变量不存在，条件视为 false");
                    false
                }
            },
            Condition::CheckQuestStatus { quest_id, expected } => {
                self.services.quest_status(quest_id) == Some(*expected)
            }
            Condition::Custom { predicate } => self.services.predicate(predicate),
        }
    }

    /// 执行事件副作用
    pub fn run_event(&mut self, event: &EventKind) {
        match event {
            EventKind::GiveItem { item_id } => self.services.give_item(item_id),
            EventKind::PlaySound { source, volume } => self.services.play_sound(source, *volume),
            EventKind::QuestAction(action) => self.services.quest_action(action),
            EventKind::Custom { action } => self.services.run_action(action),
        }
    }

    /// 派发选项副作用
    ///
    /// 顺序：镜头震动、动画、语音、时间轴。
    /// 返回需要等待完成的时间轴；只有时间轴确实开始播放且要求等待时才返回。
    pub fn dispatch_option(&mut self, effects: &OptionEffects) -> Option<String> {
        if effects.shake_enabled {
            self.services.shake_camera(effects.shake_level);
        }
        if effects.anim_type != AnimType::None && !effects.anim_name.is_empty() {
            self.services
                .play_animation(effects.anim_type, &effects.anim_name);
        }
        if let Some(voice) = &effects.voice {
            self.services.play_voice(voice);
        }

        let timeline = effects.timeline.as_ref()?;
        let started = self.services.play_timeline(timeline);
        (started && effects.wait_for_timeline).then(|| timeline.clone())
    }
}
