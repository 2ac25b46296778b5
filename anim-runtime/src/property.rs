//! # Property 模块
//!
//! 动画目标接口与属性访问。
//!
//! ## 核心概念
//!
//! - `Animatable`: 可动画对象接口，由宿主的对象类型实现
//! - `TargetRef`: 共享的目标句柄（`Rc<RefCell<dyn Animatable>>`）
//! - `Property`: 由点分路径（如 `"rect.centery"`）解析出的属性
//!
//! 位置类属性有专门的读写语义：移动包围盒锚点会重新推导对象的真实位置，
//! 而设置 `position` 则直接移动原点。

use std::cell::RefCell;
use std::rc::Rc;

use serde::Deserialize;

use crate::error::PropertyError;
use crate::geometry::{Anchor, Image, Pivot, Rect, Vec2};
use crate::value::{Value, ValueKind};

/// 共享的动画目标
pub type TargetRef = Rc<RefCell<dyn Animatable>>;

/// 可动画对象接口
///
/// 指令只通过这些成员读写目标。
///
/// ## 实现示例
///
/// ```rust,ignore
/// impl Animatable for Card {
///     fn position(&self) -> Vec2 { self.pos }
///     fn set_position(&mut self, position: Vec2) {
///         self.pos = position;
///         self.rect.set_center(position.round());
///     }
///     fn rect(&self) -> Rect { self.rect }
///     fn angle(&self) -> f64 { self.angle }
///     fn set_angle(&mut self, angle: f64) { self.angle = angle; }
///     fn image(&self) -> Option<&Image> { self.image.as_ref() }
///     fn set_image(&mut self, image: Image) { self.image = Some(image); }
/// }
/// ```
pub trait Animatable {
    /// 位置（有枢轴时为枢轴原点）
    fn position(&self) -> Vec2;

    /// 设置位置
    fn set_position(&mut self, position: Vec2);

    /// 真实位置（有枢轴时为旋转后的位置）
    fn true_position(&self) -> Vec2 {
        self.position()
    }

    /// 设置真实位置
    fn set_true_position(&mut self, position: Vec2) {
        self.set_position(position);
    }

    /// 包围盒
    fn rect(&self) -> Rect;

    /// 移动包围盒锚点
    ///
    /// 默认实现：移动包围盒后以其中心作为新的真实位置。
    fn move_rect(&mut self, anchor: Anchor, value: Value) -> Result<(), PropertyError> {
        let mut rect = self.rect();
        rect.set_anchor(anchor, value)?;
        self.set_true_position(rect.center());
        Ok(())
    }

    /// 旋转角度（度）
    fn angle(&self) -> f64;

    /// 设置旋转角度
    fn set_angle(&mut self, angle: f64);

    /// 不透明度 (0.0 - 1.0)
    fn opacity(&self) -> f64 {
        1.0
    }

    /// 设置不透明度
    fn set_opacity(&mut self, _opacity: f64) {}

    /// 当前显示的图像
    fn image(&self) -> Option<&Image>;

    /// 替换显示的图像
    fn set_image(&mut self, image: Image);

    /// 命名图像序列（帧动画来源）
    fn image_source(&self, _name: &str) -> Option<&[Image]> {
        None
    }

    /// 旋转枢轴
    fn pivot_mut(&mut self) -> Option<&mut Pivot> {
        None
    }

    /// 读取自定义属性
    fn get_property(&self, _path: &str) -> Option<Value> {
        None
    }

    /// 设置自定义属性
    ///
    /// # 返回
    /// - `true`: 设置成功
    /// - `false`: 属性不存在
    fn set_property(&mut self, _path: &str, _value: Value) -> bool {
        false
    }
}

/// 坐标轴
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
}

/// 可读写的属性
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub enum Property {
    /// 位置
    Position,
    /// 真实位置
    TruePosition,
    /// 位置的单个分量
    PositionAxis(Axis),
    /// 包围盒锚点
    Anchor(Anchor),
    /// 旋转角度
    Angle,
    /// 不透明度
    Opacity,
    /// 自定义属性
    Named(String),
}

impl Property {
    /// 解析点分路径
    ///
    /// 未识别的路径作为自定义属性，访问时再由目标决定是否存在。
    pub fn parse(path: &str) -> Self {
        let path = path.trim();
        match path {
            "position" | "pos" => return Property::Position,
            "true_position" => return Property::TruePosition,
            "position.x" | "pos.x" => return Property::PositionAxis(Axis::X),
            "position.y" | "pos.y" => return Property::PositionAxis(Axis::Y),
            "angle" | "rotation" => return Property::Angle,
            "opacity" | "alpha" => return Property::Opacity,
            _ => {}
        }

        let anchor_name = path.strip_prefix("rect.").unwrap_or(path);
        match anchor_name.parse::<Anchor>() {
            Ok(anchor) => Property::Anchor(anchor),
            Err(_) => Property::Named(path.to_string()),
        }
    }

    /// 属性的值类型（自定义属性由目标决定）
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Property::Position | Property::TruePosition => Some(ValueKind::Vector),
            Property::PositionAxis(_) | Property::Angle | Property::Opacity => {
                Some(ValueKind::Scalar)
            }
            Property::Anchor(anchor) => Some(anchor.kind()),
            Property::Named(_) => None,
        }
    }

    /// 读取属性
    pub fn get(&self, target: &dyn Animatable) -> Result<Value, PropertyError> {
        let value = match self {
            Property::Position => Value::Vector(target.position()),
            Property::TruePosition => Value::Vector(target.true_position()),
            Property::PositionAxis(Axis::X) => Value::Scalar(target.position().x),
            Property::PositionAxis(Axis::Y) => Value::Scalar(target.position().y),
            Property::Anchor(anchor) => target.rect().anchor(*anchor),
            Property::Angle => Value::Scalar(target.angle()),
            Property::Opacity => Value::Scalar(target.opacity()),
            Property::Named(path) => {
                target
                    .get_property(path)
                    .ok_or_else(|| PropertyError::PropertyNotFound { path: path.clone() })?
            }
        };
        Ok(value)
    }

    /// 设置属性
    pub fn set(&self, target: &mut dyn Animatable, value: Value) -> Result<(), PropertyError> {
        self.check_kind(target, &value)?;

        match (self, value) {
            (Property::Position, Value::Vector(v)) => target.set_position(v),
            (Property::TruePosition, Value::Vector(v)) => target.set_true_position(v),
            (Property::PositionAxis(axis), Value::Scalar(s)) => {
                let mut position = target.position();
                match axis {
                    Axis::X => position.x = s,
                    Axis::Y => position.y = s,
                }
                target.set_position(position);
            }
            (Property::Anchor(anchor), value) => target.move_rect(*anchor, value)?,
            (Property::Angle, Value::Scalar(s)) => target.set_angle(s),
            (Property::Opacity, Value::Scalar(s)) => target.set_opacity(s),
            (Property::Named(path), value) => {
                if !target.set_property(path, value) {
                    return Err(PropertyError::PropertyNotFound { path: path.clone() });
                }
            }
            // check_kind 已排除其余组合
            _ => {}
        }
        Ok(())
    }

    fn check_kind(&self, target: &dyn Animatable, value: &Value) -> Result<(), PropertyError> {
        let expected = match self.kind() {
            Some(kind) => kind,
            None => self.get(target)?.kind(),
        };
        if expected != value.kind() {
            return Err(PropertyError::InterpolationTypeMismatch {
                property: self.to_string(),
                expected,
                actual: value.kind(),
            });
        }
        Ok(())
    }
}

impl From<String> for Property {
    fn from(path: String) -> Self {
        Property::parse(&path)
    }
}

impl From<&str> for Property {
    fn from(path: &str) -> Self {
        Property::parse(path)
    }
}

impl std::fmt::Display for Property {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Property::Position => write!(f, "position"),
            Property::TruePosition => write!(f, "true_position"),
            Property::PositionAxis(Axis::X) => write!(f, "position.x"),
            Property::PositionAxis(Axis::Y) => write!(f, "position.y"),
            Property::Anchor(anchor) => write!(f, "rect.{}", anchor),
            Property::Angle => write!(f, "angle"),
            Property::Opacity => write!(f, "opacity"),
            Property::Named(path) => write!(f, "{}", path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sprite::Sprite;

    fn sprite() -> Sprite {
        Sprite::new(Vec2::new(50.0, 50.0), Vec2::new(20.0, 10.0)).with_value("x", 0.0)
    }

    #[test]
    fn test_parse() {
        assert_eq!(Property::parse("position"), Property::Position);
        assert_eq!(Property::parse("position.y"), Property::PositionAxis(Axis::Y));
        assert_eq!(Property::parse("rect.centery"), Property::Anchor(Anchor::CenterY));
        assert_eq!(Property::parse("topleft"), Property::Anchor(Anchor::TopLeft));
        assert_eq!(Property::parse("alpha"), Property::Opacity);
        assert_eq!(
            Property::parse("stats.speed"),
            Property::Named("stats.speed".to_string())
        );
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for path in ["position", "position.x", "rect.midtop", "angle", "opacity", "x"] {
            assert_eq!(Property::parse(path).to_string().as_str(), path);
        }
    }

    #[test]
    fn test_get_set_anchor() {
        let mut target = sprite();
        let left = Property::parse("rect.left");
        assert_eq!(left.get(&target).unwrap(), Value::Scalar(40.0));

        left.set(&mut target, Value::Scalar(0.0)).unwrap();
        assert_eq!(target.position(), Vec2::new(10.0, 50.0));
        assert_eq!(target.rect().x, 0.0);
    }

    #[test]
    fn test_get_set_position_axis() {
        let mut target = sprite();
        let y = Property::parse("position.y");
        y.set(&mut target, Value::Scalar(80.0)).unwrap();
        assert_eq!(target.position(), Vec2::new(50.0, 80.0));
        assert_eq!(target.rect().center(), Vec2::new(50.0, 80.0));
    }

    #[test]
    fn test_named() {
        let mut target = sprite();
        let x = Property::parse("x");
        x.set(&mut target, Value::Scalar(3.0)).unwrap();
        assert_eq!(x.get(&target).unwrap(), Value::Scalar(3.0));

        let missing = Property::parse("missing");
        assert!(matches!(
            missing.get(&target),
            Err(PropertyError::PropertyNotFound { .. })
        ));
        assert!(matches!(
            missing.set(&mut target, Value::Scalar(1.0)),
            Err(PropertyError::PropertyNotFound { .. })
        ));
    }

    #[test]
    fn test_type_mismatch() {
        let mut target = sprite();
        let err = Property::Position
            .set(&mut target, Value::Scalar(1.0))
            .unwrap_err();
        assert!(matches!(
            err,
            PropertyError::InterpolationTypeMismatch {
                expected: ValueKind::Vector,
                actual: ValueKind::Scalar,
                ..
            }
        ));

        let err = Property::parse("x")
            .set(&mut target, Value::from((1.0, 1.0)))
            .unwrap_err();
        assert!(matches!(err, PropertyError::InterpolationTypeMismatch { .. }));
    }
}
