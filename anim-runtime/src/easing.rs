//! # Easing 模块
//!
//! 缓动函数库，把归一化进度 (0..1) 映射为缓动后的进度。
//!
//! 函数本身不做限幅：区间外的 `t` 会被外推。需要端点不溢出的调用方
//! （指令、补间）负责在调用前把 `t` 限制在 [0, 1]。
//!
//! `Flip` 与 `Mirror` 是通用的值重映射，不保证 `f(0)=0, f(1)=1`。

use std::f64::consts::PI;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::DescriptorError;

/// 线性插值
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// 线性
pub fn linear(t: f64) -> f64 {
    t
}

/// 翻转：`1 - t`
pub fn flip(t: f64) -> f64 {
    1.0 - t
}

/// 二次缓入
pub fn quad_in(t: f64) -> f64 {
    t * t
}

/// 二次缓出
pub fn quad_out(t: f64) -> f64 {
    1.0 - (1.0 - t) * (1.0 - t)
}

/// 三次缓入
pub fn cubic_in(t: f64) -> f64 {
    t * t * t
}

/// 三次缓出
pub fn cubic_out(t: f64) -> f64 {
    flip(cubic_in(flip(t)))
}

/// 平滑步进：在二次缓入与二次缓出之间按 `t` 插值
pub fn smoothstep(t: f64) -> f64 {
    lerp(quad_in(t), quad_out(t), t)
}

/// 镜像：0.5 处折返
pub fn mirror(t: f64) -> f64 {
    if t < 0.5 { t * 2.0 } else { flip(t) * 2.0 }
}

fn quad_in_out(t: f64) -> f64 {
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

fn cubic_in_out(t: f64) -> f64 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

fn elastic_out(t: f64) -> f64 {
    if t == 0.0 {
        0.0
    } else if t == 1.0 {
        1.0
    } else {
        let c4 = (2.0 * PI) / 3.0;
        2.0_f64.powf(-10.0 * t) * ((t * 10.0 - 0.75) * c4).sin() + 1.0
    }
}

fn bounce_out(t: f64) -> f64 {
    let n1 = 7.5625;
    let d1 = 2.75;

    if t < 1.0 / d1 {
        n1 * t * t
    } else if t < 2.0 / d1 {
        let t = t - 1.5 / d1;
        n1 * t * t + 0.75
    } else if t < 2.5 / d1 {
        let t = t - 2.25 / d1;
        n1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / d1;
        n1 * t * t + 0.984375
    }
}

/// 缓动函数
///
/// 描述中以名字引用（如 `"quad_ease_out"`），Rust 代码可直接传入 `Custom` 函数。
#[derive(Debug, Clone, Copy, Default)]
pub enum Easing {
    /// 线性（匀速）
    #[default]
    Linear,
    /// 二次缓入
    QuadIn,
    /// 二次缓出
    QuadOut,
    /// 二次缓入缓出
    QuadInOut,
    /// 三次缓入
    CubicIn,
    /// 三次缓出
    CubicOut,
    /// 三次缓入缓出
    CubicInOut,
    /// 正弦缓入
    SineIn,
    /// 正弦缓出
    SineOut,
    /// 正弦缓入缓出
    SineInOut,
    /// 弹性缓出
    ElasticOut,
    /// 弹跳缓出
    BounceOut,
    /// 平滑步进
    Smoothstep,
    /// 镜像（非端点保持）
    Mirror,
    /// 翻转（非端点保持）
    Flip,
    /// 自定义函数
    Custom(fn(f64) -> f64),
}

impl Easing {
    /// 计算缓动值（不限幅）
    pub fn apply(&self, t: f64) -> f64 {
        match self {
            Easing::Linear => linear(t),
            Easing::QuadIn => quad_in(t),
            Easing::QuadOut => quad_out(t),
            Easing::QuadInOut => quad_in_out(t),
            Easing::CubicIn => cubic_in(t),
            Easing::CubicOut => cubic_out(t),
            Easing::CubicInOut => cubic_in_out(t),
            Easing::SineIn => 1.0 - (t * PI / 2.0).cos(),
            Easing::SineOut => (t * PI / 2.0).sin(),
            Easing::SineInOut => -((PI * t).cos() - 1.0) / 2.0,
            Easing::ElasticOut => elastic_out(t),
            Easing::BounceOut => bounce_out(t),
            Easing::Smoothstep => smoothstep(t),
            Easing::Mirror => mirror(t),
            Easing::Flip => flip(t),
            Easing::Custom(f) => f(t),
        }
    }

    /// 规范名称
    pub fn name(&self) -> &'static str {
        match self {
            Easing::Linear => "linear",
            Easing::QuadIn => "quad_ease_in",
            Easing::QuadOut => "quad_ease_out",
            Easing::QuadInOut => "quad_ease_in_out",
            Easing::CubicIn => "cubic_ease_in",
            Easing::CubicOut => "cubic_ease_out",
            Easing::CubicInOut => "cubic_ease_in_out",
            Easing::SineIn => "sine_ease_in",
            Easing::SineOut => "sine_ease_out",
            Easing::SineInOut => "sine_ease_in_out",
            Easing::ElasticOut => "elastic_ease_out",
            Easing::BounceOut => "bounce_ease_out",
            Easing::Smoothstep => "smoothstep",
            Easing::Mirror => "mirror",
            Easing::Flip => "flip",
            Easing::Custom(_) => "custom",
        }
    }

    /// 是否保证 `f(0)=0, f(1)=1`
    pub fn preserves_endpoints(&self) -> bool {
        !matches!(self, Easing::Mirror | Easing::Flip | Easing::Custom(_))
    }

    /// 按名字查找，接受规范名与简写（`quad_out` 等）
    pub fn from_name(name: &str) -> Option<Self> {
        let easing = match name {
            "linear" => Easing::Linear,
            "quad_ease_in" | "quad_in" => Easing::QuadIn,
            "quad_ease_out" | "quad_out" => Easing::QuadOut,
            "quad_ease_in_out" | "quad_in_out" => Easing::QuadInOut,
            "cubic_ease_in" | "cubic_in" => Easing::CubicIn,
            "cubic_ease_out" | "cubic_out" => Easing::CubicOut,
            "cubic_ease_in_out" | "cubic_in_out" => Easing::CubicInOut,
            "sine_ease_in" | "sine_in" => Easing::SineIn,
            "sine_ease_out" | "sine_out" => Easing::SineOut,
            "sine_ease_in_out" | "sine_in_out" => Easing::SineInOut,
            "elastic_ease_out" | "elastic_out" => Easing::ElasticOut,
            "bounce_ease_out" | "bounce_out" => Easing::BounceOut,
            "smoothstep" => Easing::Smoothstep,
            "mirror" => Easing::Mirror,
            "flip" => Easing::Flip,
            _ => return None,
        };
        Some(easing)
    }
}

impl PartialEq for Easing {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Easing::Custom(a), Easing::Custom(b)) => std::ptr::fn_addr_eq(*a, *b),
            (Easing::Custom(_), _) | (_, Easing::Custom(_)) => false,
            _ => self.name() == other.name(),
        }
    }
}

impl FromStr for Easing {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| DescriptorError::UnknownEasing {
            name: s.to_string(),
        })
    }
}

impl From<fn(f64) -> f64> for Easing {
    fn from(f: fn(f64) -> f64) -> Self {
        Easing::Custom(f)
    }
}

impl<'de> Deserialize<'de> for Easing {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

impl Serialize for Easing {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}
