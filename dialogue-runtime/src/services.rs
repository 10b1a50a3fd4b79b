//! # Services 模块
//!
//! 条件判定与事件执行所依赖的外部协作者契约。
//!
//! ## 设计原则
//!
//! - 所有协作者在构造时注入，不使用进程级单例
//! - 协作者缺失视为"条件为假 / 事件不执行"，只记录警告，不中止对话
//! - 契约都是纯查询或纯命令，不返回错误

use std::collections::HashMap;

use tracing::warn;

use crate::graph::{AnimType, QuestAction, QuestStatus, ShakeLevel, SoundSource};

/// 背包
pub trait Inventory {
    fn has_item(&self, item_id: &str) -> bool;
    fn give_item(&mut self, item_id: &str);
}

/// 标记与数值变量
pub trait FlagStore {
    /// 未设置的标记视为 false
    fn flag(&self, name: &str) -> bool;
    fn numeric_variable(&self, name: &str) -> Option<f64>;
}

/// 任务系统
pub trait QuestLog {
    fn quest_status(&self, quest_id: &str) -> QuestStatus;
    fn quest_action(&mut self, action: &QuestAction);
}

/// 音频
pub trait AudioSink {
    fn play_sound(&mut self, source: &SoundSource, volume: f32);
    fn play_voice(&mut self, voice: &str);
}

/// 演出：时间轴、角色动画、镜头震动
///
/// 时间轴播放完毕时，宿主调用
/// [`DialogueRunner::timeline_finished`](crate::DialogueRunner::timeline_finished)。
pub trait Cinematics {
    fn play_timeline(&mut self, timeline: &str);
    fn play_animation(&mut self, anim_type: AnimType, anim_name: &str);
    fn shake_camera(&mut self, level: ShakeLevel);
}

/// 注入的具名谓词
pub type Predicate = Box<dyn Fn() -> bool>;

/// 注入的具名动作
pub type Action = Box<dyn FnMut()>;

/// 外部协作者集合
#[derive(Default)]
pub struct Services {
    inventory: Option<Box<dyn Inventory>>,
    flags: Option<Box<dyn FlagStore>>,
    quests: Option<Box<dyn QuestLog>>,
    audio: Option<Box<dyn AudioSink>>,
    cinematics: Option<Box<dyn Cinematics>>,
    predicates: HashMap<String, Predicate>,
    actions: HashMap<String, Action>,
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("inventory", &self.inventory.is_some())
            .field("flags", &self.flags.is_some())
            .field("quests", &self.quests.is_some())
            .field("audio", &self.audio.is_some())
            .field("cinematics", &self.cinematics.is_some())
            .field("predicates", &self.predicates.keys().collect::<Vec<_>>())
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Services {
    /// 不带任何协作者
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_inventory(mut self, inventory: impl Inventory + 'static) -> Self {
        self.inventory = Some(Box::new(inventory));
        self
    }

    pub fn with_flags(mut self, flags: impl FlagStore + 'static) -> Self {
        self.flags = Some(Box::new(flags));
        self
    }

    pub fn with_quests(mut self, quests: impl QuestLog + 'static) -> Self {
        self.quests = Some(Box::new(quests));
        self
    }

    pub fn with_audio(mut self, audio: impl AudioSink + 'static) -> Self {
        self.audio = Some(Box::new(audio));
        self
    }

    pub fn with_cinematics(mut self, cinematics: impl Cinematics + 'static) -> Self {
        self.cinematics = Some(Box::new(cinematics));
        self
    }

    /// 注册具名谓词（供 `Custom` 条件使用）
    pub fn register_predicate(
        &mut self,
        name: impl Into<String>,
        predicate: impl Fn() -> bool + 'static,
    ) {
        self.predicates.insert(name.into(), Box::new(predicate));
    }

    /// 注册具名动作（供 `Custom` 事件使用）
    pub fn register_action(&mut self, name: impl Into<String>, action: impl FnMut() + 'static) {
        self.actions.insert(name.into(), Box::new(action));
    }

    //=========================================================================
    // 查询：协作者缺失时返回 false / None
    //=========================================================================

    pub fn has_item(&self, item_id: &str) -> bool {
        match &self.inventory {
            Some(inventory) => inventory.has_item(item_id),
            None => {
                warn!(item_id, "背包不可用，条件视为 false");
                false
            }
        }
    }

    pub fn flag(&self, name: &str) -> Option<bool> {
        match &self.flags {
            Some(flags) => Some(flags.flag(name)),
            None => {
                warn!(flag = name, "标记存储不可用，条件视为 false");
                None
            }
        }
    }

    pub fn numeric_variable(&self, name: &str) -> Option<f64> {
        match &self.flags {
            Some(flags) => flags.numeric_variable(name),
            None => {
                warn!(variable = name, "标记存储不可用，条件视为 false");
                None
            }
        }
    }

    pub fn quest_status(&self, quest_id: &str) -> Option<QuestStatus> {
        match &self.quests {
            Some(quests) => Some(quests.quest_status(quest_id)),
            None => {
                warn!(quest_id, "任务系统不可用，条件视为 false");
                None
            }
        }
    }

    pub fn predicate(&self, name: &str) -> bool {
        match self.predicates.get(name) {
            Some(predicate) => predicate(),
            None => {
                warn!(predicate = name, "未注册的谓词，条件视为 false");
                false
            }
        }
    }

    //=========================================================================
    // 命令：协作者缺失时不执行
    //=========================================================================

    pub fn give_item(&mut self, item_id: &str) {
        match &mut self.inventory {
            Some(inventory) => inventory.give_item(item_id),
            None => warn!(item_id, "背包不可用，忽略给予物品"),
        }
    }

    pub fn quest_action(&mut self, action: &QuestAction) {
        match &mut self.quests {
            Some(quests) => quests.quest_action(action),
            None => warn!(quest_id = %action.quest_id, "任务系统不可用，忽略任务操作"),
        }
    }

    pub fn play_sound(&mut self, source: &SoundSource, volume: f32) {
        match &mut self.audio {
            Some(audio) => audio.play_sound(source, volume),
            None => warn!(source = %source, "音频不可用，忽略音效"),
        }
    }

    pub fn play_voice(&mut self, voice: &str) {
        match &mut self.audio {
            Some(audio) => audio.play_voice(voice),
            None => warn!(voice, "音频不可用，忽略语音"),
        }
    }

    /// 播放时间轴；演出协作者缺失时返回 false
    pub fn play_timeline(&mut self, timeline: &str) -> bool {
        match &mut self.cinematics {
            Some(cinematics) => {
                cinematics.play_timeline(timeline);
                true
            }
            None => {
                warn!(timeline, "演出不可用，忽略时间轴");
                false
            }
        }
    }

    pub fn play_animation(&mut self, anim_type: AnimType, anim_name: &str) {
        match &mut self.cinematics {
            Some(cinematics) => cinematics.play_animation(anim_type, anim_name),
            None => warn!(anim_name, "演出不可用，忽略动画"),
        }
    }

    pub fn shake_camera(&mut self, level: ShakeLevel) {
        match &mut self.cinematics {
            Some(cinematics) => cinematics.shake_camera(level),
            None => warn!(level = ?level, "演出不可用，忽略镜头震动"),
        }
    }

    pub fn run_action(&mut self, name: &str) {
        match self.actions.get_mut(name) {
            Some(action) => action(),
            None => warn!(action = name, "未注册的动作，忽略"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_missing_backends_are_false_or_noop() {
        let mut services = Services::new();

        assert!(!services.has_item("key"));
        assert_eq!(services.flag("door"), None);
        assert_eq!(services.numeric_variable("trust"), None);
        assert_eq!(services.quest_status("q1"), None);
        assert!(!services.predicate("lucky"));
        assert!(!services.play_timeline("intro"));

        // 命令不会 panic
        services.give_item("key");
        services.quest_action(&QuestAction::accept("q1"));
        services.play_sound(&SoundSource::Clip("door".to_string()), 1.0);
        services.run_action("explode");
    }

    #[test]
    fn test_registered_predicate_and_action() {
        let mut services = Services::new();
        let counter = Rc::new(Cell::new(0));
        let handle = counter.clone();

        services.register_predicate("always", || true);
        services.register_action("bump", move || handle.set(handle.get() + 1));

        assert!(services.predicate("always"));
        services.run_action("bump");
        services.run_action("bump");
        assert_eq!(counter.get(), 2);
    }
}
