//! # Instruction 模块
//!
//! 时间轴指令：声明式描述与运行时执行。
//!
//! ## 指令分类
//!
//! - 阻塞（`wait`、`delay`、`delay_rel`）：未结束前，Track 不会启动后续指令
//! - 并发（`slide_*`、`*_over_time`、`*_gradient`、`tween_property`）：启动后与其他指令并行推进
//! - 即时（`move_*`、`rotate_by/to`、`switch_image`、`set_opacity`）：启动即结束
//!
//! ## 描述格式
//!
//! 每条指令是一个带 `type` 字段的 JSON 对象：
//!
//! ```json
//! [
//!     {"type": "wait", "time": 1.0},
//!     {"type": "slide_by", "offset": [100, 0], "time": 0.5, "easing": "quad_ease_out"},
//!     {"type": "delay_rel", "index": -1}
//! ]
//! ```
//!
//! 未知的 `type` 不会导致加载失败，而是记录警告并作为空指令立即结束。

mod execute;

pub use execute::{ExecContext, Instruction, Step};

use serde::{Deserialize, Deserializer};
use tracing::warn;

use crate::easing::Easing;
use crate::error::DescriptorError;
use crate::geometry::{Anchor, Color, Vec2};
use crate::property::Property;
use crate::value::Value;

/// 指令分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// 阻塞：结束前不推进游标
    Blocking,
    /// 并发：启动后每帧推进
    Concurrent,
    /// 即时：启动即结束
    Instant,
}

fn default_anchor() -> Anchor {
    Anchor::Center
}

/// 接受单个值或数组
fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        One(T),
        Many(Vec<T>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
    })
}

/// 指令描述
///
/// 时长单位为秒，角度单位为度，不透明度取值 0.0 - 1.0。
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InstructionKind {
    /// 等待指定时长
    Wait { time: f64 },

    /// 等待指定的（绝对位置）指令结束
    Delay {
        #[serde(deserialize_with = "one_or_many")]
        index: Vec<usize>,
    },

    /// 等待指定的（相对位置）指令结束
    DelayRel {
        #[serde(deserialize_with = "one_or_many")]
        index: Vec<isize>,
    },

    /// 位置平移
    MoveBy { offset: Vec2 },

    /// 把锚点移动到目标值
    MoveTo {
        #[serde(default = "default_anchor", alias = "dynamic_anchor")]
        anchor: Anchor,
        target: Value,
    },

    /// 在时长内平移（增量式）
    SlideBy {
        offset: Vec2,
        time: f64,
        #[serde(default, alias = "easing_style")]
        easing: Easing,
    },

    /// 在时长内把锚点滑动到目标值
    SlideTo {
        #[serde(default = "default_anchor", alias = "dynamic_anchor")]
        anchor: Anchor,
        target: Value,
        time: f64,
        #[serde(default, alias = "easing_style")]
        easing: Easing,
    },

    /// 旋转指定角度
    #[serde(alias = "rotate")]
    RotateBy { angle: f64 },

    /// 旋转到指定角度
    RotateTo { angle: f64 },

    /// 在时长内旋转指定角度（增量式）
    #[serde(alias = "rotate_over_time")]
    RotateByOverTime {
        angle: f64,
        time: f64,
        #[serde(default, alias = "easing_style")]
        easing: Easing,
    },

    /// 在时长内旋转到指定角度
    RotateToOverTime {
        angle: f64,
        time: f64,
        #[serde(default, alias = "easing_style")]
        easing: Easing,
    },

    /// 切换为图像序列中的某一帧
    SwitchImage {
        source: String,
        index: usize,
        #[serde(default, alias = "dynamic_anchor")]
        anchor: Option<Anchor>,
        #[serde(default)]
        colorkey: Option<Color>,
    },

    /// 在时长内从第 0 帧播放到 `target_index` 帧
    ImageGradient {
        source: String,
        target_index: usize,
        time: f64,
        #[serde(default, alias = "easing_style")]
        easing: Easing,
        #[serde(default, alias = "dynamic_anchor")]
        anchor: Option<Anchor>,
        #[serde(default)]
        colorkey: Option<Color>,
    },

    /// 补间任意属性
    TweenProperty {
        property: Property,
        goal: Value,
        time: f64,
        #[serde(default, alias = "easing_style")]
        easing: Easing,
    },

    /// 设置不透明度
    #[serde(alias = "set_alpha")]
    SetOpacity { target: f64 },

    /// 在时长内过渡到目标不透明度
    #[serde(alias = "alpha_gradient")]
    OpacityGradient {
        target: f64,
        time: f64,
        #[serde(default, alias = "easing_style")]
        easing: Easing,
    },

    /// 未知类型，立即结束
    #[serde(skip)]
    Passthrough { type_name: String },
}

/// 各类型（含别名）的必需参数
const REQUIRED_PARAMS: &[(&str, &[&str])] = &[
    ("wait", &["time"]),
    ("delay", &["index"]),
    ("delay_rel", &["index"]),
    ("move_by", &["offset"]),
    ("move_to", &["target"]),
    ("slide_by", &["offset", "time"]),
    ("slide_to", &["target", "time"]),
    ("rotate_by", &["angle"]),
    ("rotate", &["angle"]),
    ("rotate_to", &["angle"]),
    ("rotate_by_over_time", &["angle", "time"]),
    ("rotate_over_time", &["angle", "time"]),
    ("rotate_to_over_time", &["angle", "time"]),
    ("switch_image", &["source", "index"]),
    ("image_gradient", &["source", "target_index", "time"]),
    ("tween_property", &["property", "goal", "time"]),
    ("set_opacity", &["target"]),
    ("set_alpha", &["target"]),
    ("opacity_gradient", &["target", "time"]),
    ("alpha_gradient", &["target", "time"]),
];

/// 查询指令类型的必需参数，未知类型返回 `None`
pub fn required_params(type_name: &str) -> Option<&'static [&'static str]> {
    REQUIRED_PARAMS
        .iter()
        .find(|(name, _)| *name == type_name)
        .map(|(_, params)| *params)
}

/// 是否为已知指令类型（含别名）
pub fn is_known_type(type_name: &str) -> bool {
    required_params(type_name).is_some()
}

/// 解析单条指令描述
///
/// 按顺序检查：对象、`type`、必需参数、缓动函数名、参数类型、锚点与目标值类型。
pub fn parse_descriptor(
    index: usize,
    descriptor: &serde_json::Value,
) -> Result<InstructionKind, DescriptorError> {
    let object = descriptor
        .as_object()
        .ok_or(DescriptorError::NotAnObject { index })?;

    let type_name = match object.get("type") {
        None => return Err(DescriptorError::MissingType { index }),
        Some(serde_json::Value::String(name)) => name.as_str(),
        Some(other) => {
            return Err(DescriptorError::InvalidParameter {
                index,
                instruction: other.to_string(),
                message: "'type' 必须是字符串".to_string(),
            });
        }
    };

    let Some(required) = required_params(type_name) else {
        warn!(index, type_name, "未知指令类型，按空指令处理");
        return Ok(InstructionKind::Passthrough {
            type_name: type_name.to_string(),
        });
    };

    if let Some(param) = required.iter().find(|param| !object.contains_key(**param)) {
        return Err(DescriptorError::MissingParameter {
            index,
            instruction: type_name.to_string(),
            param: param.to_string(),
        });
    }

    for key in ["easing", "easing_style"] {
        if let Some(serde_json::Value::String(name)) = object.get(key) {
            name.parse::<Easing>()?;
        }
    }

    let kind = InstructionKind::deserialize(descriptor).map_err(|e| {
        DescriptorError::InvalidParameter {
            index,
            instruction: type_name.to_string(),
            message: e.to_string(),
        }
    })?;

    kind.validate(index)?;
    Ok(kind)
}

/// 解析整个指令列表，并检查 delay 引用
pub fn parse_descriptors(
    descriptors: &[serde_json::Value],
) -> Result<Vec<InstructionKind>, DescriptorError> {
    let kinds = descriptors
        .iter()
        .enumerate()
        .map(|(index, descriptor)| parse_descriptor(index, descriptor))
        .collect::<Result<Vec<_>, _>>()?;

    for (index, kind) in kinds.iter().enumerate() {
        kind.dependencies(index, kinds.len())?;
    }
    Ok(kinds)
}

impl InstructionKind {
    /// 规范类型名
    pub fn type_name(&self) -> &str {
        match self {
            InstructionKind::Wait { .. } => "wait",
            InstructionKind::Delay { .. } => "delay",
            InstructionKind::DelayRel { .. } => "delay_rel",
            InstructionKind::MoveBy { .. } => "move_by",
            InstructionKind::MoveTo { .. } => "move_to",
            InstructionKind::SlideBy { .. } => "slide_by",
            InstructionKind::SlideTo { .. } => "slide_to",
            InstructionKind::RotateBy { .. } => "rotate_by",
            InstructionKind::RotateTo { .. } => "rotate_to",
            InstructionKind::RotateByOverTime { .. } => "rotate_by_over_time",
            InstructionKind::RotateToOverTime { .. } => "rotate_to_over_time",
            InstructionKind::SwitchImage { .. } => "switch_image",
            InstructionKind::ImageGradient { .. } => "image_gradient",
            InstructionKind::TweenProperty { .. } => "tween_property",
            InstructionKind::SetOpacity { .. } => "set_opacity",
            InstructionKind::OpacityGradient { .. } => "opacity_gradient",
            InstructionKind::Passthrough { type_name } => type_name,
        }
    }

    /// 指令分类
    pub fn category(&self) -> Category {
        match self {
            InstructionKind::Wait { .. }
            | InstructionKind::Delay { .. }
            | InstructionKind::DelayRel { .. } => Category::Blocking,

            InstructionKind::SlideBy { .. }
            | InstructionKind::SlideTo { .. }
            | InstructionKind::RotateByOverTime { .. }
            | InstructionKind::RotateToOverTime { .. }
            | InstructionKind::ImageGradient { .. }
            | InstructionKind::TweenProperty { .. }
            | InstructionKind::OpacityGradient { .. } => Category::Concurrent,

            InstructionKind::MoveBy { .. }
            | InstructionKind::MoveTo { .. }
            | InstructionKind::RotateBy { .. }
            | InstructionKind::RotateTo { .. }
            | InstructionKind::SwitchImage { .. }
            | InstructionKind::SetOpacity { .. }
            | InstructionKind::Passthrough { .. } => Category::Instant,
        }
    }

    /// 时长（仅计时类指令）
    pub fn duration(&self) -> Option<f64> {
        match self {
            InstructionKind::Wait { time }
            | InstructionKind::SlideBy { time, .. }
            | InstructionKind::SlideTo { time, .. }
            | InstructionKind::RotateByOverTime { time, .. }
            | InstructionKind::RotateToOverTime { time, .. }
            | InstructionKind::ImageGradient { time, .. }
            | InstructionKind::TweenProperty { time, .. }
            | InstructionKind::OpacityGradient { time, .. } => Some(*time),
            _ => None,
        }
    }

    /// 解析 delay 类指令等待的绝对索引
    ///
    /// 只能等待位于自身之前的指令：自身或之后的指令在 delay 结束前不会启动。
    pub fn dependencies(&self, index: usize, count: usize) -> Result<Vec<usize>, DescriptorError> {
        match self {
            InstructionKind::Delay { index: targets } => targets
                .iter()
                .map(|&target| {
                    if target < index {
                        Ok(target)
                    } else {
                        Err(DescriptorError::InvalidIndex {
                            index,
                            target,
                            count,
                        })
                    }
                })
                .collect(),
            InstructionKind::DelayRel { index: offsets } => offsets
                .iter()
                .map(|&offset| {
                    let target = index as isize + offset;
                    if target >= 0 && (target as usize) < index {
                        Ok(target as usize)
                    } else {
                        Err(DescriptorError::InvalidRelativeIndex {
                            index,
                            offset,
                            count,
                        })
                    }
                })
                .collect(),
            _ => Ok(Vec::new()),
        }
    }

    fn validate(&self, index: usize) -> Result<(), DescriptorError> {
        let invalid = |message: String| DescriptorError::InvalidParameter {
            index,
            instruction: self.type_name().to_string(),
            message,
        };

        match self {
            InstructionKind::MoveTo { anchor, target }
            | InstructionKind::SlideTo { anchor, target, .. } => {
                if anchor.kind() != target.kind() {
                    return Err(invalid(format!(
                        "锚点 '{}' 需要{}，目标值为{}",
                        anchor,
                        anchor.kind(),
                        target.kind()
                    )));
                }
            }
            InstructionKind::TweenProperty { property, goal, .. } => {
                if let Some(kind) = property.kind() {
                    if kind != goal.kind() {
                        return Err(invalid(format!(
                            "属性 '{}' 需要{}，目标值为{}",
                            property,
                            kind,
                            goal.kind()
                        )));
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn parse(value: serde_json::Value) -> Result<InstructionKind, DescriptorError> {
        parse_descriptor(0, &value)
    }

    #[test]
    fn test_parse_wait() {
        let kind = parse(json!({"type": "wait", "time": 1})).unwrap();
        assert_eq!(kind, InstructionKind::Wait { time: 1.0 });
        assert_eq!(kind.category(), Category::Blocking);
    }

    #[test]
    fn test_parse_slide_with_defaults() {
        let kind = parse(json!({"type": "slide_to", "target": [10, 20], "time": 0.5})).unwrap();
        assert_eq!(
            kind,
            InstructionKind::SlideTo {
                anchor: Anchor::Center,
                target: Value::Vector(Vec2::new(10.0, 20.0)),
                time: 0.5,
                easing: Easing::Linear,
            }
        );
        assert_eq!(kind.category(), Category::Concurrent);
    }

    #[test]
    fn test_parse_aliases() {
        let kind = parse(json!({
            "type": "rotate_over_time",
            "angle": 90,
            "time": 1,
            "easing_style": "quad_ease_in"
        }))
        .unwrap();
        assert_eq!(
            kind,
            InstructionKind::RotateByOverTime {
                angle: 90.0,
                time: 1.0,
                easing: Easing::QuadIn,
            }
        );

        let kind = parse(json!({
            "type": "switch_image",
            "source": "walk",
            "index": 2,
            "dynamic_anchor": "midbottom",
            "colorkey": [0, 0, 0]
        }))
        .unwrap();
        assert_eq!(
            kind,
            InstructionKind::SwitchImage {
                source: "walk".to_string(),
                index: 2,
                anchor: Some(Anchor::MidBottom),
                colorkey: Some(Color::rgb(0, 0, 0)),
            }
        );

        let kind = parse(json!({"type": "set_alpha", "target": 0.5})).unwrap();
        assert_eq!(kind, InstructionKind::SetOpacity { target: 0.5 });
        assert_eq!(kind.type_name(), "set_opacity");
    }

    #[test]
    fn test_parse_delay_single_or_many() {
        let kind = parse(json!({"type": "delay", "index": 1})).unwrap();
        assert_eq!(kind, InstructionKind::Delay { index: vec![1] });
        let kind = parse(json!({"type": "delay_rel", "index": [-1, -2]})).unwrap();
        assert_eq!(kind, InstructionKind::DelayRel { index: vec![-1, -2] });
    }

    #[test]
    fn test_unknown_type_is_passthrough() {
        let kind = parse(json!({"type": "play_sound", "file": "boom.ogg"})).unwrap();
        assert_eq!(
            kind,
            InstructionKind::Passthrough {
                type_name: "play_sound".to_string()
            }
        );
        assert_eq!(kind.category(), Category::Instant);
    }

    #[test]
    fn test_structural_errors() {
        assert_eq!(
            parse(json!([1, 2])),
            Err(DescriptorError::NotAnObject { index: 0 })
        );
        assert_eq!(
            parse(json!({"time": 1})),
            Err(DescriptorError::MissingType { index: 0 })
        );
        assert_eq!(
            parse(json!({"type": "slide_by", "offset": [1, 1]})),
            Err(DescriptorError::MissingParameter {
                index: 0,
                instruction: "slide_by".to_string(),
                param: "time".to_string(),
            })
        );
    }

    #[test]
    fn test_unknown_easing() {
        assert_eq!(
            parse(json!({"type": "slide_by", "offset": [1, 1], "time": 1, "easing": "wobble"})),
            Err(DescriptorError::UnknownEasing {
                name: "wobble".to_string()
            })
        );
    }

    #[test]
    fn test_invalid_parameter() {
        let err = parse(json!({"type": "wait", "time": "soon"})).unwrap_err();
        assert!(matches!(err, DescriptorError::InvalidParameter { .. }));

        let err = parse(json!({"type": "move_to", "anchor": "left", "target": [1, 2]})).unwrap_err();
        assert!(matches!(err, DescriptorError::InvalidParameter { .. }));

        let err = parse(json!({
            "type": "tween_property",
            "property": "position",
            "goal": 3,
            "time": 1
        }))
        .unwrap_err();
        assert!(matches!(err, DescriptorError::InvalidParameter { .. }));
    }

    #[test]
    fn test_dependencies() {
        let delay = InstructionKind::Delay { index: vec![0, 1] };
        assert_eq!(delay.dependencies(2, 3), Ok(vec![0, 1]));
        assert_eq!(
            delay.dependencies(1, 3),
            Err(DescriptorError::InvalidIndex {
                index: 1,
                target: 1,
                count: 3
            })
        );

        let rel = InstructionKind::DelayRel { index: vec![-1] };
        assert_eq!(rel.dependencies(2, 3), Ok(vec![1]));
        assert_eq!(
            rel.dependencies(0, 3),
            Err(DescriptorError::InvalidRelativeIndex {
                index: 0,
                offset: -1,
                count: 3
            })
        );
    }

    #[test]
    fn test_parse_descriptors_checks_references() {
        let descriptors = vec![
            json!({"type": "wait", "time": 1}),
            json!({"type": "delay_rel", "index": 1}),
        ];
        assert!(matches!(
            parse_descriptors(&descriptors),
            Err(DescriptorError::InvalidRelativeIndex { index: 1, .. })
        ));
    }
}
