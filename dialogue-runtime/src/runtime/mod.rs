//! # Runtime 模块
//!
//! 对话图遍历引擎核心，负责节点处理和游标推进。
//!
//! ## 模块结构
//!
//! - [`engine`]：遍历状态机
//! - [`executor`]：单个节点的执行与副作用派发

pub mod engine;
pub mod executor;


pub use engine::{DialogueRunner, StartOutcome};
pub use executor::{Executor, Flow};
