//! # Scheduler 模块
//!
//! 活动集合：持有所有正在运行的 Track、TweenTrack 与 TweenChain，
//! 由游戏循环每帧调用一次 `tick()` 统一推进。
//!
//! ## 顺序
//!
//! 每帧按注册顺序推进：先所有 Track，再所有 TweenTrack，最后所有 TweenChain。
//! 结束或失败的元素在整轮推进之后才被移除。
//!
//! 多个元素同时写同一目标的同一属性时，按注册顺序后写者生效。

use tracing::error;

use crate::error::{AnimError, AnimResult};
use crate::track::{Track, TrackStatus};
use crate::tween::{TweenChain, TweenTrack};

/// Track 标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(u64);

/// TweenTrack 标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TweenId(u64);

/// TweenChain 标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChainId(u64);

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "track#{}", self.0)
    }
}

impl std::fmt::Display for TweenId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tween#{}", self.0)
    }
}

impl std::fmt::Display for ChainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "chain#{}", self.0)
    }
}

/// 活动元素标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementId {
    Track(TrackId),
    Tween(TweenId),
    Chain(ChainId),
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ElementId::Track(id) => id.fmt(f),
            ElementId::Tween(id) => id.fmt(f),
            ElementId::Chain(id) => id.fmt(f),
        }
    }
}

/// 调度事件
#[derive(Debug, Clone, PartialEq)]
pub enum SchedulerEvent {
    /// 开始播放
    Started(ElementId),
    /// 正常完成
    Completed(ElementId),
    /// 被停止或销毁
    Stopped(ElementId),
    /// 执行失败（已移除）
    Failed { id: ElementId, error: AnimError },
}

/// 动画调度器
#[derive(Default)]
pub struct Scheduler {
    tracks: Vec<(TrackId, Track)>,
    tweens: Vec<(TweenId, TweenTrack)>,
    chains: Vec<(ChainId, TweenChain)>,
    next_id: u64,
    events: Vec<SchedulerEvent>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("tracks", &self.tracks.len())
            .field("tweens", &self.tweens.len())
            .field("chains", &self.chains.len())
            .finish()
    }
}

impl Scheduler {
    /// 创建空的调度器
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// 记录启动失败
    fn reject(&mut self, id: ElementId, error: &AnimError) {
        error!(id = %id, error = %error, "动画启动失败");
        self.events.push(SchedulerEvent::Failed {
            id,
            error: error.clone(),
        });
    }

    // ========== 注册 ==========

    /// 注册 Track（不播放）
    pub fn add_track(&mut self, track: Track) -> TrackId {
        let id = TrackId(self.next_id());
        self.tracks.push((id, track));
        id
    }

    /// 注册并播放 Track
    ///
    /// 启动即失败的 Track 不会进入活动集合。
    pub fn play_track(&mut self, mut track: Track) -> AnimResult<TrackId> {
        let id = TrackId(self.next_id());
        if let Err(e) = track.play() {
            self.reject(ElementId::Track(id), &e);
            return Err(e);
        }
        self.events.push(SchedulerEvent::Started(ElementId::Track(id)));
        self.tracks.push((id, track));
        Ok(id)
    }

    /// 注册 TweenTrack（不播放）
    pub fn add_tween(&mut self, tween: TweenTrack) -> TweenId {
        let id = TweenId(self.next_id());
        self.tweens.push((id, tween));
        id
    }

    /// 注册并播放 TweenTrack
    pub fn play_tween(&mut self, mut tween: TweenTrack) -> AnimResult<TweenId> {
        let id = TweenId(self.next_id());
        if let Err(e) = tween.play() {
            self.reject(ElementId::Tween(id), &e);
            return Err(e);
        }
        self.events.push(SchedulerEvent::Started(ElementId::Tween(id)));
        self.tweens.push((id, tween));
        Ok(id)
    }

    /// 注册 TweenChain（不播放）
    pub fn add_chain(&mut self, chain: TweenChain) -> ChainId {
        let id = ChainId(self.next_id());
        self.chains.push((id, chain));
        id
    }

    /// 注册并播放 TweenChain
    pub fn play_chain(&mut self, mut chain: TweenChain) -> AnimResult<ChainId> {
        let id = ChainId(self.next_id());
        if let Err(e) = chain.play() {
            self.reject(ElementId::Chain(id), &e);
            return Err(e);
        }
        self.events.push(SchedulerEvent::Started(ElementId::Chain(id)));
        self.chains.push((id, chain));
        Ok(id)
    }

    // ========== 停止 ==========

    /// 停止并立即移除 Track
    pub fn stop_track(&mut self, id: TrackId) -> Option<Track> {
        let index = self.tracks.iter().position(|(tid, _)| *tid == id)?;
        let (_, mut track) = self.tracks.remove(index);
        track.stop();
        self.events.push(SchedulerEvent::Stopped(ElementId::Track(id)));
        Some(track)
    }

    /// 停止并立即移除 TweenTrack
    pub fn stop_tween(&mut self, id: TweenId) -> Option<TweenTrack> {
        let index = self.tweens.iter().position(|(tid, _)| *tid == id)?;
        let (_, mut tween) = self.tweens.remove(index);
        tween.stop();
        self.events.push(SchedulerEvent::Stopped(ElementId::Tween(id)));
        Some(tween)
    }

    /// 停止并立即移除 TweenChain
    pub fn stop_chain(&mut self, id: ChainId) -> Option<TweenChain> {
        let index = self.chains.iter().position(|(cid, _)| *cid == id)?;
        let (_, mut chain) = self.chains.remove(index);
        chain.stop();
        self.events.push(SchedulerEvent::Stopped(ElementId::Chain(id)));
        Some(chain)
    }

    // ========== 访问 ==========

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|(tid, _)| *tid == id).map(|(_, t)| t)
    }

    pub fn track_mut(&mut self, id: TrackId) -> Option<&mut Track> {
        self.tracks
            .iter_mut()
            .find(|(tid, _)| *tid == id)
            .map(|(_, t)| t)
    }

    pub fn tween(&self, id: TweenId) -> Option<&TweenTrack> {
        self.tweens.iter().find(|(tid, _)| *tid == id).map(|(_, t)| t)
    }

    pub fn tween_mut(&mut self, id: TweenId) -> Option<&mut TweenTrack> {
        self.tweens
            .iter_mut()
            .find(|(tid, _)| *tid == id)
            .map(|(_, t)| t)
    }

    pub fn chain(&self, id: ChainId) -> Option<&TweenChain> {
        self.chains.iter().find(|(cid, _)| *cid == id).map(|(_, c)| c)
    }

    pub fn chain_mut(&mut self, id: ChainId) -> Option<&mut TweenChain> {
        self.chains
            .iter_mut()
            .find(|(cid, _)| *cid == id)
            .map(|(_, c)| c)
    }

    /// 元素是否仍在活动集合中
    pub fn contains(&self, id: ElementId) -> bool {
        match id {
            ElementId::Track(id) => self.track(id).is_some(),
            ElementId::Tween(id) => self.tween(id).is_some(),
            ElementId::Chain(id) => self.chain(id).is_some(),
        }
    }

    // ========== 推进 ==========

    /// 推进所有活动元素一帧
    ///
    /// # 返回
    /// 自上次 tick 以来产生的事件（包括 play/stop 产生的事件）
    pub fn tick(&mut self) -> Vec<SchedulerEvent> {
        for (id, track) in &mut self.tracks {
            if let Err(e) = track.update() {
                error!(id = %id, track = %track.name(), error = %e, "Track 执行失败，已移除");
            }
        }

        let mut failed: Vec<(ElementId, AnimError)> = Vec::new();
        for (id, tween) in &mut self.tweens {
            if let Err(e) = tween.update() {
                error!(id = %id, error = %e, "补间执行失败，已移除");
                failed.push((ElementId::Tween(*id), e));
            }
        }
        for (id, chain) in &mut self.chains {
            if let Err(e) = chain.update() {
                error!(id = %id, error = %e, "补间链执行失败，已移除");
                failed.push((ElementId::Chain(*id), e));
            }
        }

        let events = &mut self.events;
        let mut take_failure = |id: ElementId| -> Option<SchedulerEvent> {
            let index = failed.iter().position(|(fid, _)| *fid == id)?;
            let (id, error) = failed.swap_remove(index);
            Some(SchedulerEvent::Failed { id, error })
        };

        self.tracks.retain(|(id, track)| {
            let id = ElementId::Track(*id);
            let event = match track.status() {
                TrackStatus::Ended => SchedulerEvent::Completed(id),
                TrackStatus::Stopped => SchedulerEvent::Stopped(id),
                TrackStatus::Failed(error) => SchedulerEvent::Failed {
                    id,
                    error: error.clone(),
                },
                _ => return true,
            };
            events.push(event);
            false
        });

        self.tweens.retain(|(id, tween)| {
            let id = ElementId::Tween(*id);
            let event = if let Some(event) = take_failure(id) {
                event
            } else if tween.has_finished() {
                SchedulerEvent::Completed(id)
            } else if tween.is_stopped() {
                SchedulerEvent::Stopped(id)
            } else {
                return true;
            };
            events.push(event);
            false
        });

        self.chains.retain(|(id, chain)| {
            let id = ElementId::Chain(*id);
            let event = if let Some(event) = take_failure(id) {
                event
            } else if chain.has_finished() {
                SchedulerEvent::Completed(id)
            } else if chain.is_stopped() {
                SchedulerEvent::Stopped(id)
            } else {
                return true;
            };
            events.push(event);
            false
        });

        std::mem::take(&mut self.events)
    }

    // ========== 批量控制 ==========

    /// 暂停所有活动元素
    pub fn pause_all(&mut self) {
        for (_, track) in &mut self.tracks {
            track.pause();
        }
        for (_, tween) in &mut self.tweens {
            tween.pause();
        }
        for (_, chain) in &mut self.chains {
            chain.pause();
        }
    }

    /// 恢复所有被暂停的元素
    ///
    /// 从未播放过的元素保持原状。
    pub fn unpause_all(&mut self) {
        for (id, track) in &mut self.tracks {
            if let Err(e) = track.unpause() {
                error!(id = %id, error = %e, "Track 恢复失败");
            }
        }
        for (id, tween) in &mut self.tweens {
            if tween.is_paused() {
                if let Err(e) = tween.unpause() {
                    error!(id = %id, error = %e, "补间恢复失败");
                }
            }
        }
        for (id, chain) in &mut self.chains {
            if chain.is_paused() {
                if let Err(e) = chain.unpause() {
                    error!(id = %id, error = %e, "补间链恢复失败");
                }
            }
        }
    }

    /// 清空活动集合与事件
    pub fn clear(&mut self) {
        self.tracks.clear();
        self.tweens.clear();
        self.chains.clear();
        self.events.clear();
    }

    /// 活动元素数量
    pub fn active_count(&self) -> usize {
        self.tracks.len() + self.tweens.len() + self.chains.len()
    }

    /// 活动集合是否为空
    pub fn is_idle(&self) -> bool {
        self.active_count() == 0
    }
}
