//! # Anim Runtime
//!
//! 时间轴动画调度引擎的核心库。
//!
//! ## 架构概述
//!
//! `anim-runtime` 是纯逻辑核心，不依赖任何渲染或窗口系统。
//! 宿主层（Host）每帧调用一次 [`Scheduler::tick`]，由调度器推进所有活动的轨道与补间：
//!
//! ```text
//! Host                          Scheduler
//!   │                              │
//!   │──── tick() ────────────────►│ Track::update / TweenTrack::update / TweenChain::update
//!   │                              │        │
//!   │                              │        └──► Instruction::execute ──► Animatable
//!   │◄─── Vec<SchedulerEvent> ────│
//!   │                              │
//! ```
//!
//! 时间不取自系统时钟，而是来自可插拔的 [`TimeSource`]。
//! 每个计时器都是一个可暂停、可缩放的 [`VirtualClock`]。
//!
//! ## 核心类型
//!
//! - [`Track`]：绑定到一个目标的有序指令序列
//! - [`InstructionKind`]：指令的声明式参数（可从 JSON 描述解析）
//! - [`TweenTrack`] / [`TweenChain`]：单段或多段属性补间
//! - [`Scheduler`]：活动集合的显式所有者
//! - [`Animatable`]：目标对象需要实现的属性访问契约
//!
//! ## 使用示例
//!
//! ```ignore
//! use anim_runtime::{AnimationLibrary, ManualTime, Scheduler, Sprite, Vec2};
//!
//! let mut library = AnimationLibrary::new();
//! library.load_file("assets/animations.json")?;
//!
//! let time = ManualTime::new();
//! let sprite = Rc::new(RefCell::new(Sprite::new(Vec2::zero(), Vec2::new(32.0, 32.0))));
//! let track = library.instantiate("bounce", sprite.clone(), time.source())?;
//!
//! let mut scheduler = Scheduler::new();
//! scheduler.play_track(track)?;
//! while !scheduler.is_idle() {
//!     time.advance(1.0 / 60.0);
//!     for event in scheduler.tick() {
//!         // ...
//!     }
//! }
//! ```
//!
//! ## 模块结构
//!
//! - [`clock`]：时间源与虚拟时钟
//! - [`easing`]：缓动函数
//! - [`value`] / [`geometry`]：可插值的值与几何类型
//! - [`property`]：属性访问
//! - [`instruction`]：指令定义与执行
//! - [`track`]：轨道调度循环
//! - [`tween`]：补间与补间链
//! - [`scheduler`]：调度器
//! - [`library`]：命名动画库
//! - [`diagnostic`]：指令描述的静态检查
//! - [`sprite`]：参考目标实现

pub mod clock;
pub mod diagnostic;
pub mod easing;
pub mod error;
pub mod geometry;
pub mod instruction;
pub mod library;
pub mod property;
pub mod scheduler;
pub mod sprite;
pub mod track;
pub mod tween;
pub mod value;

// 重导出核心类型
pub use clock::{ManualTime, SharedClock, TimeSource, VirtualClock};
pub use diagnostic::{
    Diagnostic, DiagnosticLevel, DiagnosticResult, check_descriptors, check_library_json,
};
pub use easing::Easing;
pub use error::{AnimError, AnimResult, DescriptorError, PropertyError};
pub use geometry::{Anchor, Color, Image, Pivot, Rect, Vec2};
pub use instruction::{Category, Instruction, InstructionKind, Step, parse_descriptors};
pub use library::{Animation, AnimationLibrary};
pub use property::{Animatable, Axis, Property, TargetRef};
pub use scheduler::{ChainId, ElementId, Scheduler, SchedulerEvent, TrackId, TweenId};
pub use sprite::{Sprite, SpriteSnapshot};
pub use track::{Track, TrackStatus};
pub use tween::{Goal, TweenChain, TweenInfo, TweenTrack};
pub use value::{Value, ValueKind};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_api_accessible() {
        let _easing = Easing::Linear;
        let _value = Value::Scalar(1.0);
        let _property = Property::from("pos");
        let _scheduler = Scheduler::new();
        let _library = AnimationLibrary::new();
        let _time = ManualTime::new();
    }
}
