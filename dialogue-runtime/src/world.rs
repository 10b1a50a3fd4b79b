//! # World 模块
//!
//! 内存中的游戏世界：实现全部后端契约，并记录收到的副作用。
//!
//! 用于无界面宿主、回放和测试。克隆共享同一份状态。

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::graph::{AnimType, QuestAction, QuestActionKind, QuestStatus, ShakeLevel, SoundSource};
use crate::services::{AudioSink, Cinematics, FlagStore, Inventory, QuestLog, Services};

/// 世界收到的副作用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorldEffect {
    ItemGiven(String),
    SoundPlayed { source: SoundSource, volume: f32 },
    VoicePlayed(String),
    QuestChanged(QuestAction),
    TimelineStarted(String),
    AnimationPlayed { anim_type: AnimType, name: String },
    CameraShaken(ShakeLevel),
}

/// 世界状态（可从 JSON 种子加载）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldState {
    #[serde(default)]
    pub items: BTreeSet<String>,
    #[serde(default)]
    pub flags: BTreeMap<String, bool>,
    #[serde(default)]
    pub variables: BTreeMap<String, f64>,
    #[serde(default)]
    pub quests: BTreeMap<String, QuestStatus>,
    /// 任务 id -> 已完成的目标
    #[serde(default)]
    pub objectives: BTreeMap<String, BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<WorldEffect>,
}

/// 内存世界
#[derive(Debug, Clone, Default)]
pub struct MemoryWorld {
    state: Rc<RefCell<WorldState>>,
}

impl MemoryWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: WorldState) -> Self {
        Self {
            state: Rc::new(RefCell::new(state)),
        }
    }

    /// 当前状态快照
    pub fn snapshot(&self) -> WorldState {
        self.state.borrow().clone()
    }

    /// 已记录的副作用
    pub fn effects(&self) -> Vec<WorldEffect> {
        self.state.borrow().effects.clone()
    }

    pub fn add_item(&self, item_id: impl Into<String>) {
        self.state.borrow_mut().items.insert(item_id.into());
    }

    pub fn set_flag(&self, name: impl Into<String>, value: bool) {
        self.state.borrow_mut().flags.insert(name.into(), value);
    }

    pub fn set_variable(&self, name: impl Into<String>, value: f64) {
        self.state.borrow_mut().variables.insert(name.into(), value);
    }

    pub fn set_quest(&self, quest_id: impl Into<String>, status: QuestStatus) {
        self.state.borrow_mut().quests.insert(quest_id.into(), status);
    }

    /// 把全部后端契约注入到协作者集合
    pub fn install(&self, services: Services) -> Services {
        services
            .with_inventory(self.clone())
            .with_flags(self.clone())
            .with_quests(self.clone())
            .with_audio(self.clone())
            .with_cinematics(self.clone())
    }

    fn record(&self, effect: WorldEffect) {
        self.state.borrow_mut().effects.push(effect);
    }
}

impl Inventory for MemoryWorld {
    fn has_item(&self, item_id: &str) -> bool {
        self.state.borrow().items.contains(item_id)
    }

    fn give_item(&mut self, item_id: &str) {
        self.add_item(item_id);
        self.record(WorldEffect::ItemGiven(item_id.to_string()));
    }
}

impl FlagStore for MemoryWorld {
    fn flag(&self, name: &str) -> bool {
        self.state.borrow().flags.get(name).copied().unwrap_or(false)
    }

    fn numeric_variable(&self, name: &str) -> Option<f64> {
        self.state.borrow().variables.get(name).copied()
    }
}

impl QuestLog for MemoryWorld {
    fn quest_status(&self, quest_id: &str) -> QuestStatus {
        self.state
            .borrow()
            .quests
            .get(quest_id)
            .copied()
            .unwrap_or_default()
    }

    fn quest_action(&mut self, action: &QuestAction) {
        {
            let mut state = self.state.borrow_mut();
            let quest_id = action.quest_id.clone();
            match action.kind {
                QuestActionKind::AcceptQuest => {
                    let status = state.quests.entry(quest_id).or_default();
                    if *status == QuestStatus::NotStarted {
                        *status = QuestStatus::InProgress;
                    }
                }
                QuestActionKind::CompleteQuest => {
                    state.quests.insert(quest_id, QuestStatus::Completed);
                }
                QuestActionKind::FailQuest => {
                    state.quests.insert(quest_id, QuestStatus::Failed);
                }
                QuestActionKind::CompleteObjective => {
                    if let Some(objective) = &action.objective_id {
                        state
                            .objectives
                            .entry(quest_id)
                            .or_default()
                            .insert(objective.clone());
                    }
                }
            }
        }
        self.record(WorldEffect::QuestChanged(action.clone()));
    }
}

impl AudioSink for MemoryWorld {
    fn play_sound(&mut self, source: &SoundSource, volume: f32) {
        self.record(WorldEffect::SoundPlayed {
            source: source.clone(),
            volume,
        });
    }

    fn play_voice(&mut self, voice: &str) {
        self.record(WorldEffect::VoicePlayed(voice.to_string()));
    }
}

impl Cinematics for MemoryWorld {
    fn play_timeline(&mut self, timeline: &str) {
        self.record(WorldEffect::TimelineStarted(timeline.to_string()));
    }

    fn play_animation(&mut self, anim_type: AnimType, anim_name: &str) {
        self.record(WorldEffect::AnimationPlayed {
            anim_type,
            name: anim_name.to_string(),
        });
    }

    fn shake_camera(&mut self, level: ShakeLevel) {
        self.record(WorldEffect::CameraShaken(level));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inventory_and_flags() {
        let mut world = MemoryWorld::new();
        world.set_flag("door_open", true);
        world.set_variable("trust", 2.5);

        assert!(!world.has_item("key"));
        world.give_item("key");
        assert!(world.has_item("key"));
        assert!(world.flag("door_open"));
        assert!(!world.flag("unset"));
        assert_eq!(world.numeric_variable("trust"), Some(2.5));
        assert_eq!(world.effects(), vec![WorldEffect::ItemGiven("key".to_string())]);
    }

    #[test]
    fn test_quest_transitions() {
        let mut world = MemoryWorld::new();
        assert_eq!(world.quest_status("q1"), QuestStatus::NotStarted);

        world.quest_action(&QuestAction::accept("q1"));
        assert_eq!(world.quest_status("q1"), QuestStatus::InProgress);

        world.quest_action(&QuestAction::complete_objective("q1", "find_map"));
        assert!(world.snapshot().objectives["q1"].contains("find_map"));

        world.quest_action(&QuestAction::complete("q1"));
        assert_eq!(world.quest_status("q1"), QuestStatus::Completed);

        // 已完成的任务不会被重新接受
        world.quest_action(&QuestAction::accept("q1"));
        assert_eq!(world.quest_status("q1"), QuestStatus::Completed);
    }

    #[test]
    fn test_world_seed_from_json() {
        let json = r#"{
            "items": ["lantern"],
            "flags": { "met_elder": true },
            "variables": { "gold": 12 },
            "quests": { "q1": "in_progress" }
        }"#;

        let state: WorldState = serde_json::from_str(json).unwrap();
        let world = MemoryWorld::from_state(state);
        assert!(world.has_item("lantern"));
        assert_eq!(world.numeric_variable("gold"), Some(12.0));
        assert_eq!(world.quest_status("q1"), QuestStatus::InProgress);
    }
}
