//! # Clock 模块
//!
//! 虚拟时钟：可暂停、可缩放的经过时间测量。
//!
//! ## 核心概念
//!
//! - `TimeSource`: 可插拔的单调时间源（秒）
//! - `ManualTime`: 手动推进的时间源，用于测试与无界面模拟
//! - `VirtualClock`: 锚定在时间源上的计时器
//! - `SharedClock`: 可共享的计时器，其经过时间可作为其他计时器的时间源
//!
//! 通过 `SharedClock` 派生时间源，可以让一整个子系统同步暂停：
//! 游戏暂停时冻结所有游戏内的 Track，而 UI 的 Track 继续运行。

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Instant;

/// 时间源
///
/// 返回单调递增的时间戳（秒）。传入非单调的时间源属于调用方违约。
#[derive(Clone)]
pub struct TimeSource(Rc<dyn Fn() -> f64>);

impl TimeSource {
    /// 基于 `Instant` 的真实时间源
    pub fn monotonic() -> Self {
        let anchor = Instant::now();
        Self(Rc::new(move || anchor.elapsed().as_secs_f64()))
    }

    /// 从任意闭包创建时间源
    pub fn from_fn(f: impl Fn() -> f64 + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// 创建手动推进的时间源，返回时间源与推进句柄
    pub fn manual() -> (Self, ManualTime) {
        let time = ManualTime::new();
        (time.source(), time)
    }

    /// 读取当前时间戳
    pub fn now(&self) -> f64 {
        (self.0)()
    }
}

impl Default for TimeSource {
    fn default() -> Self {
        Self::monotonic()
    }
}

impl std::fmt::Debug for TimeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("TimeSource").field(&self.now()).finish()
    }
}

/// 手动推进的时间源
///
/// 克隆共享同一个时间值。
#[derive(Debug, Clone, Default)]
pub struct ManualTime(Rc<Cell<f64>>);

impl ManualTime {
    /// 创建从 0 开始的手动时间
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前时间
    pub fn now(&self) -> f64 {
        self.0.get()
    }

    /// 推进时间
    pub fn advance(&self, dt: f64) {
        self.0.set(self.0.get() + dt);
    }

    /// 直接设置时间
    pub fn set(&self, t: f64) {
        self.0.set(t);
    }

    /// 获取对应的时间源
    pub fn source(&self) -> TimeSource {
        let cell = self.0.clone();
        TimeSource::from_fn(move || cell.get())
    }
}

/// 虚拟时钟
///
/// `elapsed() = (now - origin) * scale - pause_time`。
/// 暂停期间经过时间冻结；`duration < 0` 表示无限时长。
#[derive(Debug, Clone)]
pub struct VirtualClock {
    source: TimeSource,
    scale: f64,
    duration: f64,
    origin: f64,
    paused: bool,
    pause_started_at: Option<f64>,
    accumulated_pause: f64,
}

impl VirtualClock {
    /// 创建指定时长的时钟（缩放为 1）
    pub fn new(duration: f64, source: TimeSource) -> Self {
        Self::with_scale(duration, source, 1.0)
    }

    /// 创建无限时长的时钟
    pub fn unbounded(source: TimeSource) -> Self {
        Self::new(-1.0, source)
    }

    /// 创建带时间缩放的时钟
    pub fn with_scale(duration: f64, source: TimeSource, scale: f64) -> Self {
        let mut clock = Self {
            source,
            scale,
            duration,
            origin: 0.0,
            paused: false,
            pause_started_at: None,
            accumulated_pause: 0.0,
        };
        clock.origin = clock.timestamp();
        clock
    }

    fn timestamp(&self) -> f64 {
        self.source.now() * self.scale
    }

    /// 重新开始计时，清除暂停记录
    pub fn restart(&mut self) {
        self.origin = self.timestamp();
        self.paused = false;
        self.pause_started_at = None;
        self.accumulated_pause = 0.0;
    }

    /// 设置时长，可选择是否重新开始
    pub fn set_duration(&mut self, duration: f64, restart: bool) {
        self.duration = duration;
        if restart {
            self.restart();
        }
    }

    /// 暂停（已暂停时无操作）
    pub fn pause(&mut self) {
        if self.paused {
            return;
        }
        self.pause_started_at = Some(self.timestamp());
        self.paused = true;
    }

    /// 恢复（未暂停时无操作）
    pub fn unpause(&mut self) {
        if !self.paused {
            return;
        }
        if let Some(started) = self.pause_started_at.take() {
            self.accumulated_pause += self.timestamp() - started;
        }
        self.paused = false;
    }

    /// 切换暂停状态
    pub fn toggle(&mut self) {
        if self.paused {
            self.unpause();
        } else {
            self.pause();
        }
    }

    /// 是否暂停中
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// 时长（负数表示无限）
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// 时间缩放
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// 累计暂停时间（包括正在进行的暂停）
    pub fn pause_time(&self) -> f64 {
        match self.pause_started_at {
            Some(started) if self.paused => {
                self.accumulated_pause + self.timestamp() - started
            }
            _ => self.accumulated_pause,
        }
    }

    /// 未暂停的经过时间
    pub fn elapsed(&self) -> f64 {
        self.timestamp() - self.origin - self.pause_time()
    }

    /// 包含暂停的经过时间
    pub fn real_elapsed(&self) -> f64 {
        self.timestamp() - self.origin
    }

    /// 剩余时间
    pub fn time_left(&self) -> f64 {
        self.duration - self.elapsed()
    }

    /// 归一化进度，限制在 [0, 1]
    ///
    /// 时长 `<= 0` 视为已完成，返回 1；无限时长返回 0。
    pub fn progress(&self) -> f64 {
        if self.duration < 0.0 {
            return 0.0;
        }
        if self.duration == 0.0 {
            return 1.0;
        }
        (self.elapsed() / self.duration).clamp(0.0, 1.0)
    }

    /// 是否到期（无限时长永不到期）
    pub fn is_expired(&self) -> bool {
        if self.duration < 0.0 {
            return false;
        }
        self.elapsed() > self.duration
    }
}

/// 可共享的虚拟时钟
#[derive(Debug, Clone)]
pub struct SharedClock(Rc<RefCell<VirtualClock>>);

impl SharedClock {
    /// 包装一个时钟
    pub fn new(clock: VirtualClock) -> Self {
        Self(Rc::new(RefCell::new(clock)))
    }

    /// 暂停
    pub fn pause(&self) {
        self.0.borrow_mut().pause();
    }

    /// 恢复
    pub fn unpause(&self) {
        self.0.borrow_mut().unpause();
    }

    /// 是否暂停中
    pub fn is_paused(&self) -> bool {
        self.0.borrow().is_paused()
    }

    /// 经过时间
    pub fn elapsed(&self) -> f64 {
        self.0.borrow().elapsed()
    }

    /// 以本时钟的经过时间作为时间源
    ///
    /// 本时钟暂停时，派生时间源也随之冻结。
    pub fn time_source(&self) -> TimeSource {
        let inner = self.0.clone();
        TimeSource::from_fn(move || inner.borrow().elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_follows_source() {
        let time = ManualTime::new();
        let clock = VirtualClock::new(1.0, time.source());

        assert_eq!(clock.elapsed(), 0.0);
        time.advance(0.5);
        assert_eq!(clock.elapsed(), 0.5);
        assert_eq!(clock.time_left(), 0.5);
    }

    #[test]
    fn test_expiry_is_strict() {
        let time = ManualTime::new();
        let clock = VirtualClock::new(1.0, time.source());

        time.set(1.0);
        assert!(!clock.is_expired());
        time.set(1.25);
        assert!(clock.is_expired());
    }

    #[test]
    fn test_unbounded_never_expires() {
        let time = ManualTime::new();
        let clock = VirtualClock::unbounded(time.source());

        time.advance(1_000_000.0);
        assert!(!clock.is_expired());
    }

    #[test]
    fn test_pause_freezes_elapsed() {
        let time = ManualTime::new();
        let mut clock = VirtualClock::new(-1.0, time.source());

        time.advance(1.0);
        clock.pause();
        time.advance(5.0);
        assert_eq!(clock.elapsed(), 1.0);
        assert_eq!(clock.pause_time(), 5.0);
        assert_eq!(clock.real_elapsed(), 6.0);

        clock.unpause();
        time.advance(0.5);
        assert_eq!(clock.elapsed(), 1.5);
    }

    #[test]
    fn test_pause_is_idempotent() {
        let time = ManualTime::new();
        let mut clock = VirtualClock::new(-1.0, time.source());

        clock.pause();
        time.advance(1.0);
        clock.pause();
        time.advance(1.0);
        clock.unpause();
        clock.unpause();
        assert_eq!(clock.elapsed(), 0.0);

        clock.toggle();
        assert!(clock.is_paused());
        clock.toggle();
        assert!(!clock.is_paused());
    }

    #[test]
    fn test_progress() {
        let (source, time) = TimeSource::manual();
        let clock = VirtualClock::new(2.0, source.clone());

        time.advance(0.5);
        assert_eq!(clock.progress(), 0.25);
        time.advance(10.0);
        assert_eq!(clock.progress(), 1.0);

        assert_eq!(VirtualClock::new(0.0, source.clone()).progress(), 1.0);
        assert_eq!(VirtualClock::unbounded(source).progress(), 0.0);
    }

    #[test]
    fn test_scale() {
        let time = ManualTime::new();
        let clock = VirtualClock::with_scale(-1.0, time.source(), 2.0);

        time.advance(1.5);
        assert_eq!(clock.elapsed(), 3.0);
    }

    #[test]
    fn test_restart_clears_pause() {
        let time = ManualTime::new();
        let mut clock = VirtualClock::new(2.0, time.source());

        time.advance(1.0);
        clock.pause();
        time.advance(1.0);
        clock.restart();
        assert!(!clock.is_paused());
        assert_eq!(clock.elapsed(), 0.0);

        clock.set_duration(0.5, false);
        time.advance(0.75);
        assert!(clock.is_expired());
    }

    #[test]
    fn test_shared_clock_as_source() {
        let time = ManualTime::new();
        let game = SharedClock::new(VirtualClock::unbounded(time.source()));
        let child = VirtualClock::new(1.0, game.time_source());

        time.advance(0.5);
        game.pause();
        time.advance(10.0);
        assert_eq!(child.elapsed(), 0.5);
        assert!(!child.is_expired());

        game.unpause();
        time.advance(0.75);
        assert!(child.is_expired());
    }
}
