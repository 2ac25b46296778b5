//! # Tween 模块
//!
//! 独立的属性补间。
//!
//! ## 核心概念
//!
//! - `TweenInfo`: 缓动函数 + 时长
//! - `Goal`: 有序的 属性 → 目标值 列表
//! - `TweenTrack`: 单段补间，`play()` 时快照起始值
//! - `TweenChain`: 多段补间，同一时刻只持有一个活动的 `TweenTrack`
//!
//! 补间既可由 UI 代码直接使用，也被 `tween_property` 指令在内部使用。

use tracing::debug;

use crate::clock::{TimeSource, VirtualClock};
use crate::easing::Easing;
use crate::error::{AnimResult, PropertyError};
use crate::property::{Property, TargetRef};
use crate::value::Value;

/// 补间参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TweenInfo {
    pub easing: Easing,
    pub time: f64,
}

impl TweenInfo {
    pub fn new(easing: Easing, time: f64) -> Self {
        Self { easing, time }
    }
}

/// 补间目标
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Goal(Vec<(Property, Value)>);

impl Goal {
    /// 空目标（纯等待）
    pub fn new() -> Self {
        Self::default()
    }

    /// 单个属性的目标
    pub fn single(property: impl Into<Property>, value: impl Into<Value>) -> Self {
        Self::new().with(property, value)
    }

    /// 追加一个属性的目标值
    pub fn with(mut self, property: impl Into<Property>, value: impl Into<Value>) -> Self {
        self.0.push((property.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Property, Value)> {
        self.0.iter()
    }

    fn clear(&mut self) {
        self.0.clear();
    }
}

/// 单段补间
#[derive(Clone)]
pub struct TweenTrack {
    target: Option<TargetRef>,
    info: TweenInfo,
    goal: Goal,
    start: Vec<Value>,
    timer: Option<VirtualClock>,
    source: TimeSource,
    time_factor: f64,
    is_playing: bool,
    has_finished: bool,
    stopped: bool,
    destroyed: bool,
}

impl TweenTrack {
    /// 创建补间（不会自动播放）
    pub fn new(target: TargetRef, info: TweenInfo, goal: Goal, source: TimeSource) -> Self {
        Self::build(Some(target), info, goal, source)
    }

    /// 无目标的等待补间
    pub fn stall(time: f64, source: TimeSource) -> Self {
        Self::build(None, TweenInfo::new(Easing::Linear, time), Goal::new(), source)
    }

    fn build(target: Option<TargetRef>, info: TweenInfo, goal: Goal, source: TimeSource) -> Self {
        Self {
            target,
            info,
            goal,
            start: Vec::new(),
            timer: None,
            source,
            time_factor: 1.0,
            is_playing: false,
            has_finished: false,
            stopped: false,
            destroyed: false,
        }
    }

    /// 设置时间系数（下一次 `play()` 生效）
    pub fn set_time_scale(&mut self, factor: f64) {
        self.time_factor = factor;
    }

    /// 快照起始值并开始计时
    ///
    /// 已销毁的补间无法再播放。
    pub fn play(&mut self) -> AnimResult<()> {
        if self.destroyed {
            debug!("补间已销毁，忽略 play");
            return Ok(());
        }

        let mut start = Vec::with_capacity(self.goal.len());
        if let Some(target) = &self.target {
            let target = target.borrow();
            for (property, goal) in self.goal.iter() {
                let current = property.get(&*target)?;
                if current.kind() != goal.kind() {
                    return Err(PropertyError::InterpolationTypeMismatch {
                        property: property.to_string(),
                        expected: current.kind(),
                        actual: goal.kind(),
                    }
                    .into());
                }
                start.push(current);
            }
        }

        self.start = start;
        self.timer = Some(VirtualClock::with_scale(
            self.info.time,
            self.source.clone(),
            self.time_factor,
        ));
        self.has_finished = false;
        self.stopped = false;
        self.is_playing = true;
        Ok(())
    }

    /// 停止（不回滚已设置的值），调度器会在下一次 `tick()` 时移除
    pub fn stop(&mut self) {
        self.is_playing = false;
        self.stopped = true;
        self.timer = None;
    }

    /// 销毁：清空目标，之后永远无法播放
    pub fn destroy(&mut self) {
        self.start.clear();
        self.goal.clear();
        self.target = None;
        self.timer = None;
        self.is_playing = false;
        self.has_finished = false;
        self.stopped = true;
        self.destroyed = true;
    }

    /// 暂停
    pub fn pause(&mut self) {
        self.is_playing = false;
        if let Some(timer) = &mut self.timer {
            timer.pause();
        }
    }

    /// 恢复；从未开始的补间会直接播放
    pub fn unpause(&mut self) -> AnimResult<()> {
        if self.has_finished || self.stopped {
            return Ok(());
        }
        match &mut self.timer {
            Some(timer) => {
                timer.unpause();
                self.is_playing = true;
                Ok(())
            }
            None => self.play(),
        }
    }

    /// 推进一帧
    pub fn update(&mut self) -> AnimResult<()> {
        if !self.is_playing {
            return Ok(());
        }
        let Some(timer) = &self.timer else {
            return Ok(());
        };

        let alpha = timer.progress();
        if alpha >= 1.0 {
            self.has_finished = true;
            self.is_playing = false;
        }

        let Some(target) = &self.target else {
            return Ok(());
        };
        let eased = self.info.easing.apply(alpha);
        let mut target = target.borrow_mut();
        for ((property, goal), start) in self.goal.iter().zip(&self.start) {
            let value =
                start
                    .lerp(goal, eased)
                    .ok_or_else(|| PropertyError::InterpolationTypeMismatch {
                        property: property.to_string(),
                        expected: start.kind(),
                        actual: goal.kind(),
                    })?;
            property.set(&mut *target, value)?;
        }
        Ok(())
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn has_finished(&self) -> bool {
        self.has_finished
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// 是否被 `stop()` 或 `destroy()` 终止
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// 计时是否处于暂停
    pub fn is_paused(&self) -> bool {
        self.timer.as_ref().is_some_and(VirtualClock::is_paused)
    }

    /// 是否可以从活动集合中移除
    pub fn is_done(&self) -> bool {
        self.has_finished || self.stopped
    }

    pub fn info(&self) -> &TweenInfo {
        &self.info
    }

    pub fn goal(&self) -> &Goal {
        &self.goal
    }
}

impl std::fmt::Debug for TweenTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TweenTrack")
            .field("info", &self.info)
            .field("goal", &self.goal)
            .field("is_playing", &self.is_playing)
            .field("has_finished", &self.has_finished)
            .field("stopped", &self.stopped)
            .field("destroyed", &self.destroyed)
            .finish()
    }
}

/// 多段补间
#[derive(Clone)]
pub struct TweenChain {
    target: TargetRef,
    steps: Vec<(TweenInfo, Goal)>,
    current_step: Option<usize>,
    current_track: Option<TweenTrack>,
    source: TimeSource,
    time_factor: f64,
    is_playing: bool,
    has_finished: bool,
    stopped: bool,
    destroyed: bool,
}

impl std::fmt::Debug for TweenChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TweenChain")
            .field("steps", &self.steps.len())
            .field("current_step", &self.current_step)
            .field("is_playing", &self.is_playing)
            .field("has_finished", &self.has_finished)
            .field("stopped", &self.stopped)
            .field("destroyed", &self.destroyed)
            .finish()
    }
}

impl TweenChain {
    /// 创建补间链；空目标的步骤为纯等待
    pub fn new(target: TargetRef, steps: Vec<(TweenInfo, Goal)>, source: TimeSource) -> Self {
        Self {
            target,
            steps,
            current_step: None,
            current_track: None,
            source,
            time_factor: 1.0,
            is_playing: false,
            has_finished: false,
            stopped: false,
            destroyed: false,
        }
    }

    /// 设置时间系数（之后开始的步骤生效）
    pub fn set_time_scale(&mut self, factor: f64) {
        self.time_factor = factor;
    }

    fn track_for_step(&self, step: usize) -> Option<TweenTrack> {
        let (info, goal) = self.steps.get(step)?;
        let mut track =
            TweenTrack::new(self.target.clone(), *info, goal.clone(), self.source.clone());
        track.set_time_scale(self.time_factor);
        Some(track)
    }

    /// 从第一步开始播放
    pub fn play(&mut self) -> AnimResult<()> {
        if self.destroyed {
            debug!("补间链已销毁，忽略 play");
            return Ok(());
        }
        self.has_finished = false;
        self.stopped = false;
        self.current_step = Some(0);
        match self.track_for_step(0) {
            Some(mut track) => {
                track.play()?;
                self.current_track = Some(track);
                self.is_playing = true;
            }
            None => self.finish(),
        }
        Ok(())
    }

    /// 停止（不回滚），调度器会在下一次 `tick()` 时移除
    pub fn stop(&mut self) {
        self.is_playing = false;
        self.stopped = true;
        self.current_track = None;
    }

    /// 销毁：丢弃所有步骤，之后永远无法播放
    pub fn destroy(&mut self) {
        if let Some(track) = &mut self.current_track {
            track.destroy();
        }
        self.steps.clear();
        self.current_step = None;
        self.current_track = None;
        self.is_playing = false;
        self.has_finished = false;
        self.stopped = true;
        self.destroyed = true;
    }

    /// 暂停当前步骤
    pub fn pause(&mut self) {
        self.is_playing = false;
        if let Some(track) = &mut self.current_track {
            track.pause();
        }
    }

    /// 恢复当前步骤；从未开始的链会直接播放
    pub fn unpause(&mut self) -> AnimResult<()> {
        if self.has_finished || self.stopped {
            return Ok(());
        }
        match &mut self.current_track {
            Some(track) => {
                track.unpause()?;
                self.is_playing = true;
                Ok(())
            }
            None => self.play(),
        }
    }

    /// 推进一帧；当前步骤结束时切换到下一步
    pub fn update(&mut self) -> AnimResult<()> {
        if !self.is_playing {
            return Ok(());
        }
        let Some(track) = &mut self.current_track else {
            return Ok(());
        };

        track.update()?;
        if !track.has_finished() {
            return Ok(());
        }

        let next = self.current_step.map_or(0, |step| step + 1);
        self.current_step = Some(next);
        match self.track_for_step(next) {
            Some(mut track) => {
                track.play()?;
                self.current_track = Some(track);
            }
            None => self.finish(),
        }
        Ok(())
    }

    fn finish(&mut self) {
        self.has_finished = true;
        self.is_playing = false;
        self.current_track = None;
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn has_finished(&self) -> bool {
        self.has_finished
    }

    /// 是否被 `stop()` 或 `destroy()` 终止
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// 是否可以从活动集合中移除
    pub fn is_done(&self) -> bool {
        self.has_finished || self.stopped
    }

    /// 当前步骤是否处于暂停
    pub fn is_paused(&self) -> bool {
        self.current_track.as_ref().is_some_and(TweenTrack::is_paused)
    }

    /// 当前步骤序号
    pub fn current_step(&self) -> Option<usize> {
        self.current_step
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }
}
