//! # Simulate 模块
//!
//! 用模拟帧时钟驱动调度器：每帧推进固定时长，直到动画结束或达到最长模拟时长。

use std::cell::RefCell;
use std::rc::Rc;

use anim_runtime::{
    AnimError, AnimResult, AnimationLibrary, ManualTime, Scheduler, SchedulerEvent, Sprite,
    SpriteSnapshot,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::{HostConfig, SpriteConfig};

/// 模拟结果
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    /// 动画名称
    pub animation: String,
    /// 实际推进的帧数
    pub frames: u64,
    /// 模拟经过的时间（秒）
    pub elapsed: f64,
    /// 动画是否在时限内完成
    pub completed: bool,
    /// 最终精灵状态
    pub sprite: SpriteSnapshot,
}

/// 按配置构建精灵
pub fn build_sprite(config: &SpriteConfig) -> Sprite {
    let mut sprite = Sprite::new(config.position, config.size);
    if let Some(image) = &config.image {
        sprite = sprite.with_image(image.clone());
    }
    if let Some(offset) = config.pivot {
        sprite = sprite.with_pivot(offset);
    }
    for (name, images) in &config.sources {
        sprite = sprite.with_source(name.clone(), images.clone());
    }
    for (name, value) in &config.values {
        sprite = sprite.with_value(name.clone(), *value);
    }
    sprite
}

/// 运行一次模拟
///
/// Track 执行失败时返回对应错误。
pub fn run(config: &HostConfig, library: &AnimationLibrary) -> AnimResult<SimulationReport> {
    let time = ManualTime::new();
    let sprite = Rc::new(RefCell::new(build_sprite(&config.sprite)));

    let mut track = library.instantiate(&config.animation, sprite.clone(), time.source())?;
    track.set_time_scale(config.time_scale);

    let mut scheduler = Scheduler::new();
    scheduler.play_track(track)?;

    let dt = 1.0 / f64::from(config.fps);
    let max_frames = config.max_frames();
    let mut frames = 0;
    let mut completed = false;

    loop {
        for event in scheduler.tick() {
            match event {
                SchedulerEvent::Failed { id, error } => {
                    debug!(id = %id, frames, "动画执行失败");
                    return Err(error);
                }
                SchedulerEvent::Completed(id) => {
                    debug!(id = %id, frames, "动画完成");
                    completed = true;
                }
                event => debug!(?event, frames, "调度事件"),
            }
        }

        if scheduler.is_idle() || frames >= max_frames {
            break;
        }
        time.advance(dt);
        frames += 1;
    }

    info!(
        animation = %config.animation,
        frames,
        elapsed = time.now(),
        completed,
        "模拟结束"
    );

    let snapshot = sprite.borrow().snapshot();
    Ok(SimulationReport {
        animation: config.animation.clone(),
        frames,
        elapsed: time.now(),
        completed,
        sprite: snapshot,
    })
}

/// 动画是否存在于库中（用于在模拟前给出更友好的错误）
pub fn ensure_animation(library: &AnimationLibrary, name: &str) -> AnimResult<()> {
    if library.contains(name) {
        Ok(())
    } else {
        Err(AnimError::AnimationNotFound {
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use anim_runtime::{Image, Vec2};

    use super::*;

    const LIBRARY: &str = r#"{
        "nudge": [
            {"type": "wait", "time": 0.5},
            {"type": "move_by", "offset": [10, 0]}
        ],
        "broken": [
            {"type": "switch_image", "source": "missing", "index": 0}
        ]
    }"#;

    fn library() -> AnimationLibrary {
        let mut library = AnimationLibrary::new();
        library.load_json(LIBRARY).unwrap();
        library
    }

    #[test]
    fn test_build_sprite() {
        let mut config = SpriteConfig::default();
        config.image = Some(Image::new("idle", 8.0, 8.0));
        config.sources.insert("walk".to_string(), vec![Image::new("walk_0", 8.0, 8.0)]);

        let snapshot = build_sprite(&config).snapshot();
        assert_eq!(snapshot.position, Vec2::new(320.0, 240.0));
        assert_eq!(snapshot.image.as_deref(), Some("idle"));
        assert_eq!(snapshot.rect.width, 8.0);
    }

    #[test]
    fn test_run_completes() {
        let config = HostConfig {
            animation: "nudge".to_string(),
            fps: 10,
            ..HostConfig::default()
        };
        let report = run(&config, &library()).unwrap();
        assert!(report.completed);
        assert_eq!(report.sprite.position, Vec2::new(330.0, 240.0));
        assert!(report.frames >= 5 && report.frames <= 7);
    }

    #[test]
    fn test_run_stops_at_time_limit() {
        let config = HostConfig {
            animation: "nudge".to_string(),
            fps: 10,
            seconds: 0.2,
            ..HostConfig::default()
        };
        let report = run(&config, &library()).unwrap();
        assert!(!report.completed);
        assert_eq!(report.frames, 2);
        assert_eq!(report.sprite.position, Vec2::new(320.0, 240.0));
    }

    #[test]
    fn test_run_reports_failure() {
        let config = HostConfig {
            animation: "broken".to_string(),
            ..HostConfig::default()
        };
        assert!(matches!(
            run(&config, &library()),
            Err(AnimError::Property(_))
        ));
    }

    #[test]
    fn test_ensure_animation() {
        assert!(ensure_animation(&library(), "nudge").is_ok());
        assert!(matches!(
            ensure_animation(&library(), "missing"),
            Err(AnimError::AnimationNotFound { .. })
        ));
    }
}
