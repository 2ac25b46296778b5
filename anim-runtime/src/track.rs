//! # Track 模块
//!
//! 绑定到单个目标的有序指令序列，负责每帧的调度。
//!
//! ## 调度模型
//!
//! ```text
//! update():
//!   1. 游标：按顺序启动尚未开始的指令，遇到未结束的阻塞指令即停
//!   2. 推进阻塞指令；若最后一个阻塞指令在本帧结束，再跑一遍游标
//!   3. 推进并发指令
//!   4. progress == count 时标记结束
//! ```
//!
//! 即时指令在游标经过时当帧完成；并发指令启动后与其他指令并行推进；
//! 阻塞指令结束前，游标不会越过它。

use tracing::{debug, warn};

use crate::clock::TimeSource;
use crate::error::{AnimError, AnimResult};
use crate::instruction::{
    Category, ExecContext, Instruction, InstructionKind, Step, parse_descriptors,
};
use crate::property::TargetRef;

/// Track 状态
#[derive(Debug, Clone, PartialEq)]
pub enum TrackStatus {
    /// 尚未播放
    Idle,
    /// 播放中
    Playing,
    /// 已暂停
    Paused,
    /// 所有指令已结束
    Ended,
    /// 被外部停止（不回滚）
    Stopped,
    /// 指令执行失败，不再推进
    Failed(AnimError),
}

/// 指令轨道
pub struct Track {
    name: String,
    target: TargetRef,
    source: TimeSource,
    instructions: Vec<Instruction>,
    ended: Vec<bool>,
    blocking: Vec<usize>,
    running: Vec<usize>,
    progress: usize,
    time_scale: f64,
    has_started: bool,
    status: TrackStatus,
}

impl Track {
    /// 由指令描述构建 Track
    ///
    /// delay 类指令的引用在此解析并检查。
    pub fn load(
        target: TargetRef,
        source: TimeSource,
        kinds: Vec<InstructionKind>,
    ) -> AnimResult<Self> {
        let count = kinds.len();
        let instructions = kinds
            .into_iter()
            .enumerate()
            .map(|(index, kind)| -> AnimResult<Instruction> {
                let waits_on = kind.dependencies(index, count)?;
                Ok(Instruction::new(kind, waits_on))
            })
            .collect::<AnimResult<Vec<_>>>()?;

        Ok(Self {
            name: String::from("track"),
            target,
            source,
            instructions,
            ended: vec![false; count],
            blocking: Vec::new(),
            running: Vec::new(),
            progress: 0,
            time_scale: 1.0,
            has_started: false,
            status: TrackStatus::Idle,
        })
    }

    /// 由 JSON 指令描述构建 Track
    pub fn from_descriptors(
        target: TargetRef,
        source: TimeSource,
        descriptors: &[serde_json::Value],
    ) -> AnimResult<Self> {
        let kinds = parse_descriptors(descriptors)?;
        Self::load(target, source, kinds)
    }

    /// 设置名称（用于日志）
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// 从头开始播放
    ///
    /// 立即执行第一次游标推进：开头的即时指令当场完成，计时指令从此刻开始计时。
    /// 已播放过的 Track 会先重置。
    pub fn play(&mut self) -> AnimResult<()> {
        if self.has_started {
            self.reset();
        }
        self.has_started = true;
        self.status = TrackStatus::Playing;
        debug!(track = %self.name, count = self.count(), "Track 开始");

        let result = self.advance_cursor();
        self.settle(result)
    }

    /// 推进一帧
    ///
    /// 非播放状态下无操作。出错时 Track 进入 `Failed` 状态并返回错误。
    pub fn update(&mut self) -> AnimResult<()> {
        if self.status != TrackStatus::Playing {
            return Ok(());
        }
        let result = self.step();
        self.settle(result)
    }

    fn step(&mut self) -> AnimResult<()> {
        self.advance_cursor()?;
        if self.advance_blocking()? {
            self.advance_cursor()?;
        }
        self.advance_running()
    }

    /// 处理一次推进的结果：失败则中毒，否则检查是否结束
    fn settle(&mut self, result: AnimResult<()>) -> AnimResult<()> {
        if let Err(e) = result {
            warn!(track = %self.name, error = %e, "Track 执行失败");
            self.status = TrackStatus::Failed(e.clone());
            return Err(e);
        }
        if self.progress == self.count() && self.status == TrackStatus::Playing {
            self.status = TrackStatus::Ended;
            debug!(track = %self.name, "Track 结束");
        }
        Ok(())
    }

    fn execute(&mut self, index: usize) -> AnimResult<Step> {
        let ctx = ExecContext {
            target: &self.target,
            source: &self.source,
            time_scale: self.time_scale,
            ended: &self.ended,
        };
        self.instructions[index].execute(&ctx)
    }

    fn mark_ended(&mut self, index: usize) {
        self.ended[index] = true;
        self.progress += 1;
    }

    /// 游标推进：启动尚未开始的指令，直到遇到阻塞
    fn advance_cursor(&mut self) -> AnimResult<()> {
        for index in 0..self.instructions.len() {
            if !self.blocking.is_empty() {
                break;
            }
            if self.instructions[index].has_started() || self.ended[index] {
                continue;
            }

            match self.execute(index)? {
                Step::Ended => self.mark_ended(index),
                Step::Pending => match self.instructions[index].category() {
                    Category::Blocking => self.blocking.push(index),
                    Category::Concurrent | Category::Instant => self.running.push(index),
                },
            }
        }
        Ok(())
    }

    /// 推进阻塞指令，返回是否在本次推进中全部解除
    fn advance_blocking(&mut self) -> AnimResult<bool> {
        if self.blocking.is_empty() {
            return Ok(false);
        }
        let pending = std::mem::take(&mut self.blocking);
        for index in pending {
            match self.execute(index)? {
                Step::Ended => self.mark_ended(index),
                Step::Pending => self.blocking.push(index),
            }
        }
        Ok(self.blocking.is_empty())
    }

    /// 推进并发指令
    fn advance_running(&mut self) -> AnimResult<()> {
        let pending = std::mem::take(&mut self.running);
        for index in pending {
            match self.execute(index)? {
                Step::Ended => self.mark_ended(index),
                Step::Pending => self.running.push(index),
            }
        }
        Ok(())
    }

    /// 停止（不回滚已产生的修改）
    pub fn stop(&mut self) {
        if matches!(self.status, TrackStatus::Ended | TrackStatus::Failed(_)) {
            return;
        }
        self.status = TrackStatus::Stopped;
    }

    /// 暂停：冻结所有进行中的计时
    pub fn pause(&mut self) {
        if self.status != TrackStatus::Playing {
            return;
        }
        for &index in self.blocking.iter().chain(&self.running) {
            self.instructions[index].pause();
        }
        self.status = TrackStatus::Paused;
    }

    /// 恢复
    pub fn unpause(&mut self) -> AnimResult<()> {
        if self.status != TrackStatus::Paused {
            return Ok(());
        }
        self.status = TrackStatus::Playing;
        let active: Vec<usize> = self.blocking.iter().chain(&self.running).copied().collect();
        let result = active
            .into_iter()
            .try_for_each(|index| self.instructions[index].unpause());
        self.settle(result)
    }

    /// 重置所有指令与进度，回到未播放状态
    pub fn reset(&mut self) {
        for instruction in &mut self.instructions {
            instruction.reset();
        }
        self.ended.fill(false);
        self.blocking.clear();
        self.running.clear();
        self.progress = 0;
        self.has_started = false;
        self.status = TrackStatus::Idle;
    }

    /// 设置时间缩放
    ///
    /// 只影响之后启动的指令；非正值会被忽略。
    pub fn set_time_scale(&mut self, scale: f64) {
        if !(scale.is_finite() && scale > 0.0) {
            warn!(track = %self.name, scale, "忽略无效的时间缩放");
            return;
        }
        self.time_scale = scale;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> &TrackStatus {
        &self.status
    }

    pub fn target(&self) -> &TargetRef {
        &self.target
    }

    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    pub fn has_started(&self) -> bool {
        self.has_started
    }

    /// 所有指令是否已结束
    pub fn has_ended(&self) -> bool {
        self.status == TrackStatus::Ended
    }

    pub fn is_playing(&self) -> bool {
        self.status == TrackStatus::Playing
    }

    pub fn is_paused(&self) -> bool {
        self.status == TrackStatus::Paused
    }

    /// 是否不会再推进（结束、停止或失败）
    pub fn is_finished(&self) -> bool {
        matches!(
            self.status,
            TrackStatus::Ended | TrackStatus::Stopped | TrackStatus::Failed(_)
        )
    }

    /// 失败原因
    pub fn error(&self) -> Option<&AnimError> {
        match &self.status {
            TrackStatus::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// 已结束的指令数
    pub fn progress(&self) -> usize {
        self.progress
    }

    /// 指令总数
    pub fn count(&self) -> usize {
        self.instructions.len()
    }

    pub fn instruction(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }
}

impl std::fmt::Debug for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Track")
            .field("name", &self.name)
            .field("status", &self.status)
            .field("progress", &self.progress)
            .field("count", &self.instructions.len())
            .field("blocking", &self.blocking)
            .field("running", &self.running)
            .finish()
    }
}
