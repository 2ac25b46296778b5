//! 指令执行
//!
//! 每条指令持有自己的运行时状态（计时器、起始值、上次应用的值），
//! 由所属 Track 每帧调用 `execute` 推进。

use crate::clock::{TimeSource, VirtualClock};
use crate::easing::Easing;
use crate::error::{AnimResult, PropertyError};
use crate::geometry::{Anchor, Color, Image, Vec2};
use crate::property::{Animatable, TargetRef};
use crate::tween::{Goal, TweenInfo, TweenTrack};
use crate::value::Value;

use super::{Category, InstructionKind};

/// 单步执行结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// 尚未结束
    Pending,
    /// 已结束
    Ended,
}

/// 执行上下文（由 Track 提供）
pub struct ExecContext<'a> {
    /// 动画目标
    pub target: &'a TargetRef,
    /// 时间源
    pub source: &'a TimeSource,
    /// Track 的时间缩放
    pub time_scale: f64,
    /// 各指令是否已结束（按位置索引）
    pub ended: &'a [bool],
}

impl ExecContext<'_> {
    /// 创建指令计时器，时长按 Track 的时间缩放换算
    ///
    /// 非正时长按 0 处理，首次推进即完成。
    fn timer(&self, time: f64) -> VirtualClock {
        VirtualClock::new((time / self.time_scale).max(0.0), self.source.clone())
    }
}

/// 指令运行时状态
#[derive(Debug, Clone, Default)]
struct RunState {
    has_started: bool,
    has_ended: bool,
    start_value: Option<Value>,
    last_value: Option<Value>,
    last_image: Option<Image>,
    timer: Option<VirtualClock>,
    tween: Option<TweenTrack>,
}

impl RunState {
    /// 首次执行时启动计时器，返回是否为首次
    fn begin(&mut self, ctx: &ExecContext<'_>, time: f64) -> bool {
        if self.has_started {
            return false;
        }
        self.has_started = true;
        self.timer = Some(ctx.timer(time));
        true
    }

    /// 当前进度（0..1），到达 1 时返回 `Step::Ended`
    fn alpha(&self) -> (f64, Step) {
        let alpha = self.timer.as_ref().map_or(1.0, VirtualClock::progress);
        let step = if alpha >= 1.0 {
            Step::Ended
        } else {
            Step::Pending
        };
        (alpha, step)
    }

    /// 增量式推进：返回本帧相对上一帧的标量增量
    fn scalar_delta(&mut self, total: f64, eased: f64) -> f64 {
        let current = total * eased;
        let previous = self
            .last_value
            .and_then(|value| value.as_scalar())
            .unwrap_or(0.0);
        self.last_value = Some(Value::Scalar(current));
        current - previous
    }

    /// 增量式推进：返回本帧相对上一帧的向量增量
    fn vector_delta(&mut self, total: Vec2, eased: f64) -> Vec2 {
        let current = total * eased;
        let previous = self
            .last_value
            .and_then(|value| value.as_vector())
            .unwrap_or_default();
        self.last_value = Some(Value::Vector(current));
        current - previous
    }
}

/// 运行时指令
#[derive(Debug, Clone)]
pub struct Instruction {
    kind: InstructionKind,
    waits_on: Vec<usize>,
    state: RunState,
}

impl Instruction {
    /// 创建指令
    ///
    /// `waits_on` 为 delay 类指令解析后的绝对索引（见 `InstructionKind::dependencies`）。
    pub fn new(kind: InstructionKind, waits_on: Vec<usize>) -> Self {
        Self {
            kind,
            waits_on,
            state: RunState::default(),
        }
    }

    pub fn kind(&self) -> &InstructionKind {
        &self.kind
    }

    pub fn category(&self) -> Category {
        self.kind.category()
    }

    pub fn has_started(&self) -> bool {
        self.state.has_started
    }

    pub fn has_ended(&self) -> bool {
        self.state.has_ended
    }

    /// 起始值快照（绝对式指令）
    pub fn start_value(&self) -> Option<Value> {
        self.state.start_value
    }

    /// 回到未开始状态
    pub fn reset(&mut self) {
        self.state = RunState::default();
    }

    /// 暂停计时
    pub fn pause(&mut self) {
        if let Some(timer) = &mut self.state.timer {
            timer.pause();
        }
        if let Some(tween) = &mut self.state.tween {
            tween.pause();
        }
    }

    /// 恢复计时
    pub fn unpause(&mut self) -> AnimResult<()> {
        if let Some(timer) = &mut self.state.timer {
            timer.unpause();
        }
        if let Some(tween) = &mut self.state.tween {
            tween.unpause()?;
        }
        Ok(())
    }

    /// 推进一步
    ///
    /// 并发指令在首次执行时只启动计时并快照起始值，返回 `Pending`；
    /// 之后每次执行按进度写入目标。已结束的指令不会再次执行。
    pub fn execute(&mut self, ctx: &ExecContext<'_>) -> AnimResult<Step> {
        if self.state.has_ended {
            return Ok(Step::Ended);
        }

        let state = &mut self.state;
        let step = match &self.kind {
            InstructionKind::Wait { time } => {
                state.begin(ctx, *time);
                match &state.timer {
                    Some(timer) if !timer.is_expired() => Step::Pending,
                    _ => Step::Ended,
                }
            }

            InstructionKind::Delay { .. } | InstructionKind::DelayRel { .. } => {
                state.has_started = true;
                let done = self
                    .waits_on
                    .iter()
                    .all(|&index| ctx.ended.get(index).copied().unwrap_or(true));
                if done { Step::Ended } else { Step::Pending }
            }

            InstructionKind::MoveBy { offset } => {
                state.has_started = true;
                let mut target = ctx.target.borrow_mut();
                let position = target.position();
                target.set_position(position + *offset);
                Step::Ended
            }

            InstructionKind::MoveTo { anchor, target } => {
                state.has_started = true;
                ctx.target.borrow_mut().move_rect(*anchor, *target)?;
                Step::Ended
            }

            InstructionKind::SlideBy {
                offset,
                time,
                easing,
            } => {
                if state.begin(ctx, *time) {
                    state.start_value = Some(Value::Vector(ctx.target.borrow().position()));
                    state.last_value = Some(Value::Vector(Vec2::zero()));
                    return Ok(Step::Pending);
                }
                let (alpha, step) = state.alpha();
                let delta = state.vector_delta(*offset, easing.apply(alpha));
                let mut target = ctx.target.borrow_mut();
                let position = target.position();
                target.set_position(position + delta);
                step
            }

            InstructionKind::SlideTo {
                anchor,
                target: goal,
                time,
                easing,
            } => {
                if state.begin(ctx, *time) {
                    state.start_value = Some(ctx.target.borrow().rect().anchor(*anchor));
                    return Ok(Step::Pending);
                }
                let (alpha, step) = state.alpha();
                let value = interpolate(state.start_value, goal, *easing, alpha, anchor)?;
                ctx.target.borrow_mut().move_rect(*anchor, value)?;
                step
            }

            InstructionKind::RotateBy { angle } => {
                state.has_started = true;
                let mut target = ctx.target.borrow_mut();
                let current = target.angle();
                target.set_angle(current + angle);
                Step::Ended
            }

            InstructionKind::RotateTo { angle } => {
                state.has_started = true;
                ctx.target.borrow_mut().set_angle(*angle);
                Step::Ended
            }

            InstructionKind::RotateByOverTime {
                angle,
                time,
                easing,
            } => {
                if state.begin(ctx, *time) {
                    state.start_value = Some(Value::Scalar(ctx.target.borrow().angle()));
                    state.last_value = Some(Value::Scalar(0.0));
                    return Ok(Step::Pending);
                }
                let (alpha, step) = state.alpha();
                let delta = state.scalar_delta(*angle, easing.apply(alpha));
                let mut target = ctx.target.borrow_mut();
                let current = target.angle();
                target.set_angle(current + delta);
                step
            }

            InstructionKind::RotateToOverTime {
                angle,
                time,
                easing,
            } => {
                if state.begin(ctx, *time) {
                    state.start_value = Some(Value::Scalar(ctx.target.borrow().angle()));
                    return Ok(Step::Pending);
                }
                let (alpha, step) = state.alpha();
                let start = state.start_value.and_then(|v| v.as_scalar()).unwrap_or(0.0);
                let angle = start + (angle - start) * easing.apply(alpha);
                ctx.target.borrow_mut().set_angle(angle);
                step
            }

            InstructionKind::SwitchImage {
                source,
                index,
                anchor,
                colorkey,
            } => {
                state.has_started = true;
                let mut target = ctx.target.borrow_mut();
                let image = lookup_image(&*target, source, *index)?;
                apply_image(&mut *target, image, *anchor, *colorkey)?;
                Step::Ended
            }

            InstructionKind::ImageGradient {
                source,
                target_index,
                time,
                easing,
                anchor,
                colorkey,
            } => {
                if state.begin(ctx, *time) {
                    // 提前检查序列与目标帧，避免在动画中途才失败
                    lookup_image(&*ctx.target.borrow(), source, *target_index)?;
                    return Ok(Step::Pending);
                }
                let (alpha, step) = state.alpha();
                let picked = (*target_index as f64 * easing.apply(alpha)).floor();
                let frame = picked.clamp(0.0, *target_index as f64) as usize;

                let mut target = ctx.target.borrow_mut();
                let image = lookup_image(&*target, source, frame)?;
                if state.last_image.as_ref() != Some(&image) {
                    state.last_image = Some(image.clone());
                    apply_image(&mut *target, image, *anchor, *colorkey)?;
                }
                step
            }

            InstructionKind::TweenProperty {
                property,
                goal,
                time,
                easing,
            } => {
                if !state.has_started {
                    state.has_started = true;
                    let info = TweenInfo::new(*easing, (time / ctx.time_scale).max(0.0));
                    let mut tween = TweenTrack::new(
                        ctx.target.clone(),
                        info,
                        Goal::single(property.clone(), *goal),
                        ctx.source.clone(),
                    );
                    tween.play()?;
                    state.tween = Some(tween);
                    return Ok(Step::Pending);
                }
                match &mut state.tween {
                    Some(tween) => {
                        tween.update()?;
                        if tween.has_finished() {
                            Step::Ended
                        } else {
                            Step::Pending
                        }
                    }
                    None => Step::Ended,
                }
            }

            InstructionKind::SetOpacity { target } => {
                state.has_started = true;
                ctx.target.borrow_mut().set_opacity(*target);
                Step::Ended
            }

            InstructionKind::OpacityGradient {
                target: goal,
                time,
                easing,
            } => {
                if state.begin(ctx, *time) {
                    state.start_value = Some(Value::Scalar(ctx.target.borrow().opacity()));
                    return Ok(Step::Pending);
                }
                let (alpha, step) = state.alpha();
                let start = state.start_value.and_then(|v| v.as_scalar()).unwrap_or(1.0);
                let opacity = start + (goal - start) * easing.apply(alpha);
                ctx.target.borrow_mut().set_opacity(opacity);
                step
            }

            InstructionKind::Passthrough { .. } => {
                state.has_started = true;
                Step::Ended
            }
        };

        if step == Step::Ended {
            self.state.has_ended = true;
        }
        Ok(step)
    }
}

/// 绝对式插值：`lerp(start, goal, easing(alpha))`
fn interpolate(
    start: Option<Value>,
    goal: &Value,
    easing: Easing,
    alpha: f64,
    anchor: &Anchor,
) -> Result<Value, PropertyError> {
    let mismatch = |actual: Value| PropertyError::InterpolationTypeMismatch {
        property: format!("rect.{}", anchor),
        expected: goal.kind(),
        actual: actual.kind(),
    };
    let start = start.unwrap_or(*goal);
    start
        .lerp(goal, easing.apply(alpha))
        .ok_or_else(|| mismatch(start))
}

/// 从目标的图像序列中取一帧
fn lookup_image(target: &dyn Animatable, source: &str, index: usize) -> Result<Image, PropertyError> {
    let images = target
        .image_source(source)
        .ok_or_else(|| PropertyError::ImageSourceNotFound {
            source_name: source.to_string(),
        })?;
    images
        .get(index)
        .cloned()
        .ok_or_else(|| PropertyError::ImageIndexOutOfRange {
            source_name: source.to_string(),
            index,
            len: images.len(),
        })
}

/// 替换图像，可选保持锚点位置，并同步枢轴的原始图像与颜色键
fn apply_image(
    target: &mut dyn Animatable,
    image: Image,
    anchor: Option<Anchor>,
    colorkey: Option<Color>,
) -> Result<(), PropertyError> {
    let preserved = anchor.map(|anchor| (anchor, target.rect().anchor(anchor)));

    if let Some(pivot) = target.pivot_mut() {
        pivot.original_image = Some(image.clone());
        if colorkey.is_some() {
            pivot.colorkey = colorkey;
        }
    }
    target.set_image(image);

    if let Some((anchor, value)) = preserved {
        target.move_rect(anchor, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::clock::ManualTime;
    use crate::sprite::Sprite;

    struct Harness {
        sprite: Rc<RefCell<Sprite>>,
        target: TargetRef,
        time: ManualTime,
        source: TimeSource,
    }

    impl Harness {
        fn new(sprite: Sprite) -> Self {
            let sprite = Rc::new(RefCell::new(sprite));
            let target: TargetRef = sprite.clone();
            let time = ManualTime::new();
            let source = time.source();
            Self {
                sprite,
                target,
                time,
                source,
            }
        }

        fn run(&self, instruction: &mut Instruction) -> Step {
            let ctx = ExecContext {
                target: &self.target,
                source: &self.source,
                time_scale: 1.0,
                ended: &[],
            };
            instruction.execute(&ctx).unwrap()
        }
    }

    fn frames() -> Vec<Image> {
        (0..4)
            .map(|i| Image::new(format!("frame{}", i), 10.0, 10.0 + i as f64 * 10.0))
            .collect()
    }

    #[test]
    fn test_instant_move_by() {
        let h = Harness::new(Sprite::new(Vec2::new(1.0, 1.0), Vec2::new(2.0, 2.0)));
        let mut move_by = Instruction::new(
            InstructionKind::MoveBy {
                offset: Vec2::new(10.0, 0.0),
            },
            Vec::new(),
        );
        assert_eq!(h.run(&mut move_by), Step::Ended);
        assert!(move_by.has_started() && move_by.has_ended());
        assert_eq!(h.sprite.borrow().position(), Vec2::new(11.0, 1.0));

        // 已结束的指令不会再次执行
        assert_eq!(h.run(&mut move_by), Step::Ended);
        assert_eq!(h.sprite.borrow().position(), Vec2::new(11.0, 1.0));
    }

    #[test]
    fn test_slide_to_is_absolute() {
        let h = Harness::new(Sprite::new(Vec2::zero(), Vec2::new(2.0, 2.0)));
        let mut slide = Instruction::new(
            InstructionKind::SlideTo {
                anchor: Anchor::CenterX,
                target: Value::Scalar(100.0),
                time: 1.0,
                easing: Easing::Linear,
            },
            Vec::new(),
        );

        assert_eq!(h.run(&mut slide), Step::Pending);
        assert_eq!(slide.start_value(), Some(Value::Scalar(0.0)));

        h.time.advance(0.25);
        assert_eq!(h.run(&mut slide), Step::Pending);
        assert_eq!(h.sprite.borrow().position(), Vec2::new(25.0, 0.0));

        h.time.advance(1.0);
        assert_eq!(h.run(&mut slide), Step::Ended);
        assert_eq!(h.sprite.borrow().position(), Vec2::new(100.0, 0.0));
    }

    #[test]
    fn test_rotate_over_time_is_delta_based() {
        let h = Harness::new(Sprite::new(Vec2::zero(), Vec2::new(2.0, 2.0)));
        let mut rotate = Instruction::new(
            InstructionKind::RotateByOverTime {
                angle: 90.0,
                time: 1.0,
                easing: Easing::Linear,
            },
            Vec::new(),
        );
        h.run(&mut rotate);
        h.time.advance(0.5);
        h.run(&mut rotate);
        // 中途被其他指令修改的角度会被保留
        h.sprite.borrow_mut().set_angle(100.0);
        h.time.advance(0.5);
        assert_eq!(h.run(&mut rotate), Step::Ended);
        assert_eq!(h.sprite.borrow().angle(), 145.0);
    }

    #[test]
    fn test_zero_duration_completes_on_first_advance() {
        let h = Harness::new(Sprite::new(Vec2::zero(), Vec2::new(2.0, 2.0)));
        let mut fade = Instruction::new(
            InstructionKind::OpacityGradient {
                target: 0.0,
                time: 0.0,
                easing: Easing::Linear,
            },
            Vec::new(),
        );
        assert_eq!(h.run(&mut fade), Step::Pending);
        assert_eq!(h.run(&mut fade), Step::Ended);
        assert_eq!(h.sprite.borrow().opacity(), 0.0);
    }

    #[test]
    fn test_switch_image_preserves_anchor() {
        let h = Harness::new(
            Sprite::new(Vec2::new(50.0, 50.0), Vec2::new(10.0, 10.0))
                .with_pivot(Vec2::zero())
                .with_source("walk", frames()),
        );
        let mut switch = Instruction::new(
            InstructionKind::SwitchImage {
                source: "walk".to_string(),
                index: 3,
                anchor: Some(Anchor::MidBottom),
                colorkey: Some(Color::rgb(255, 0, 255)),
            },
            Vec::new(),
        );
        assert_eq!(h.run(&mut switch), Step::Ended);

        let sprite = h.sprite.borrow();
        assert_eq!(sprite.image().map(|i| i.key.as_str()), Some("frame3"));
        assert_eq!(
            sprite.rect().anchor(Anchor::MidBottom),
            Value::Vector(Vec2::new(50.0, 55.0))
        );
        assert_eq!(sprite.rect().height, 40.0);
        let pivot = sprite.pivot().unwrap();
        assert_eq!(
            pivot.original_image.as_ref().map(|i| i.key.as_str()),
            Some("frame3")
        );
        assert_eq!(pivot.colorkey, Some(Color::rgb(255, 0, 255)));
    }

    #[test]
    fn test_switch_image_errors() {
        let h = Harness::new(
            Sprite::new(Vec2::zero(), Vec2::new(10.0, 10.0)).with_source("walk", frames()),
        );
        let ctx = ExecContext {
            target: &h.target,
            source: &h.source,
            time_scale: 1.0,
            ended: &[],
        };

        let mut missing = Instruction::new(
            InstructionKind::SwitchImage {
                source: "run".to_string(),
                index: 0,
                anchor: None,
                colorkey: None,
            },
            Vec::new(),
        );
        assert!(missing.execute(&ctx).is_err());

        let mut out_of_range = Instruction::new(
            InstructionKind::SwitchImage {
                source: "walk".to_string(),
                index: 9,
                anchor: None,
                colorkey: None,
            },
            Vec::new(),
        );
        assert!(matches!(
            out_of_range.execute(&ctx),
            Err(crate::error::AnimError::Property(
                PropertyError::ImageIndexOutOfRange { index: 9, len: 4, .. }
            ))
        ));
    }

    #[test]
    fn test_image_gradient_picks_floor_frame() {
        let h = Harness::new(
            Sprite::new(Vec2::zero(), Vec2::new(10.0, 10.0)).with_source("walk", frames()),
        );
        let mut gradient = Instruction::new(
            InstructionKind::ImageGradient {
                source: "walk".to_string(),
                target_index: 3,
                time: 1.0,
                easing: Easing::Linear,
                anchor: None,
                colorkey: None,
            },
            Vec::new(),
        );
        let key = |h: &Harness| h.sprite.borrow().image().map(|i| i.key.clone());

        h.run(&mut gradient);
        assert_eq!(key(&h), None);

        h.time.advance(0.5);
        h.run(&mut gradient);
        assert_eq!(key(&h).as_deref(), Some("frame1"));

        h.time.advance(0.25);
        h.run(&mut gradient);
        assert_eq!(key(&h).as_deref(), Some("frame2"));

        h.time.advance(0.25);
        assert_eq!(h.run(&mut gradient), Step::Ended);
        assert_eq!(key(&h).as_deref(), Some("frame3"));
    }

    #[test]
    fn test_delay_waits_on_dependencies() {
        let h = Harness::new(Sprite::new(Vec2::zero(), Vec2::zero()));
        let mut delay = Instruction::new(InstructionKind::Delay { index: vec![0] }, vec![0]);
        let mut ended = [false, false];
        {
            let ctx = ExecContext {
                target: &h.target,
                source: &h.source,
                time_scale: 1.0,
                ended: &ended,
            };
            assert_eq!(delay.execute(&ctx).unwrap(), Step::Pending);
        }
        ended[0] = true;
        let ctx = ExecContext {
            target: &h.target,
            source: &h.source,
            time_scale: 1.0,
            ended: &ended,
        };
        assert_eq!(delay.execute(&ctx).unwrap(), Step::Ended);
    }

    #[test]
    fn test_tween_property_uses_inner_tween() {
        let h = Harness::new(Sprite::new(Vec2::zero(), Vec2::zero()).with_value("scale", 1.0));
        let mut tween = Instruction::new(
            InstructionKind::TweenProperty {
                property: "scale".into(),
                goal: Value::Scalar(3.0),
                time: 1.0,
                easing: Easing::Linear,
            },
            Vec::new(),
        );
        assert_eq!(h.run(&mut tween), Step::Pending);
        h.time.advance(0.5);
        assert_eq!(h.run(&mut tween), Step::Pending);
        assert_eq!(h.sprite.borrow().value("scale"), Some(Value::Scalar(2.0)));
        h.time.advance(0.5);
        assert_eq!(h.run(&mut tween), Step::Ended);
        assert_eq!(h.sprite.borrow().value("scale"), Some(Value::Scalar(3.0)));
    }

    #[test]
    fn test_reset() {
        let h = Harness::new(Sprite::new(Vec2::zero(), Vec2::zero()));
        let mut wait = Instruction::new(InstructionKind::Wait { time: 0.5 }, Vec::new());
        h.run(&mut wait);
        h.time.advance(1.0);
        assert_eq!(h.run(&mut wait), Step::Ended);

        wait.reset();
        assert!(!wait.has_started());
        assert!(!wait.has_ended());
        assert_eq!(h.run(&mut wait), Step::Pending);
    }
}
