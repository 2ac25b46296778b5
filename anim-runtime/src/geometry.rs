//! # Geometry 模块
//!
//! 动画目标使用的几何与图像描述类型：二维向量、带命名锚点的包围盒、
//! 图像描述、颜色键与旋转枢轴。
//!
//! 图像只是描述（键 + 尺寸），像素由宿主的渲染层负责。

use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PropertyError;
use crate::value::{Value, ValueKind};

/// 二维向量
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    /// 创建新的向量
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// 零向量
    pub const fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    /// 线性插值
    pub fn lerp(self, other: Self, t: f64) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }

    /// 逐分量四舍五入
    pub fn round(self) -> Self {
        Self::new(self.x.round(), self.y.round())
    }

    /// 按角度（度）旋转
    pub fn rotate(self, degrees: f64) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }

    /// 与另一向量的距离
    pub fn distance(self, other: Self) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

impl From<[f64; 2]> for Vec2 {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Vec2> for [f64; 2] {
    fn from(v: Vec2) -> Self {
        [v.x, v.y]
    }
}

impl From<(f64, f64)> for Vec2 {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl Add for Vec2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Vec2 {
    fn sub_assign(&mut self, rhs: Self) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<f64> for Vec2 {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Vec2 {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

/// 包围盒锚点
///
/// 九个二维锚点加六个标量边/中线。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Anchor {
    TopLeft,
    MidTop,
    TopRight,
    MidLeft,
    Center,
    MidRight,
    BottomLeft,
    MidBottom,
    BottomRight,
    Left,
    Right,
    Top,
    Bottom,
    CenterX,
    CenterY,
}

impl Anchor {
    /// 锚点对应的值类型
    pub fn kind(&self) -> ValueKind {
        match self {
            Anchor::Left
            | Anchor::Right
            | Anchor::Top
            | Anchor::Bottom
            | Anchor::CenterX
            | Anchor::CenterY => ValueKind::Scalar,
            _ => ValueKind::Vector,
        }
    }

    /// 锚点名称
    pub fn name(&self) -> &'static str {
        match self {
            Anchor::TopLeft => "topleft",
            Anchor::MidTop => "midtop",
            Anchor::TopRight => "topright",
            Anchor::MidLeft => "midleft",
            Anchor::Center => "center",
            Anchor::MidRight => "midright",
            Anchor::BottomLeft => "bottomleft",
            Anchor::MidBottom => "midbottom",
            Anchor::BottomRight => "bottomright",
            Anchor::Left => "left",
            Anchor::Right => "right",
            Anchor::Top => "top",
            Anchor::Bottom => "bottom",
            Anchor::CenterX => "centerx",
            Anchor::CenterY => "centery",
        }
    }

    /// 锚点在包围盒中的相对位置（0..1）
    ///
    /// 标量锚点只有一个分量有意义。
    fn fraction(&self) -> (f64, f64) {
        match self {
            Anchor::TopLeft => (0.0, 0.0),
            Anchor::MidTop => (0.5, 0.0),
            Anchor::TopRight => (1.0, 0.0),
            Anchor::MidLeft => (0.0, 0.5),
            Anchor::Center => (0.5, 0.5),
            Anchor::MidRight => (1.0, 0.5),
            Anchor::BottomLeft => (0.0, 1.0),
            Anchor::MidBottom => (0.5, 1.0),
            Anchor::BottomRight => (1.0, 1.0),
            Anchor::Left => (0.0, 0.0),
            Anchor::Right => (1.0, 0.0),
            Anchor::Top => (0.0, 0.0),
            Anchor::Bottom => (0.0, 1.0),
            Anchor::CenterX => (0.5, 0.0),
            Anchor::CenterY => (0.0, 0.5),
        }
    }
}

impl FromStr for Anchor {
    type Err = PropertyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let anchor = match s {
            "topleft" => Anchor::TopLeft,
            "midtop" => Anchor::MidTop,
            "topright" => Anchor::TopRight,
            "midleft" => Anchor::MidLeft,
            "center" => Anchor::Center,
            "midright" => Anchor::MidRight,
            "bottomleft" => Anchor::BottomLeft,
            "midbottom" => Anchor::MidBottom,
            "bottomright" => Anchor::BottomRight,
            "left" => Anchor::Left,
            "right" => Anchor::Right,
            "top" => Anchor::Top,
            "bottom" => Anchor::Bottom,
            "centerx" => Anchor::CenterX,
            "centery" => Anchor::CenterY,
            _ => {
                return Err(PropertyError::PropertyNotFound {
                    path: s.to_string(),
                });
            }
        };
        Ok(anchor)
    }
}

impl std::fmt::Display for Anchor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// 轴向包围盒
///
/// `(x, y)` 为左上角。
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// 创建包围盒
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// 以中心点与尺寸创建
    pub fn from_center(center: Vec2, size: Vec2) -> Self {
        Self::new(
            center.x - size.x / 2.0,
            center.y - size.y / 2.0,
            size.x,
            size.y,
        )
    }

    /// 尺寸
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    /// 中心点
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// 移动使中心点落在指定位置
    pub fn set_center(&mut self, center: Vec2) {
        self.x = center.x - self.width / 2.0;
        self.y = center.y - self.height / 2.0;
    }

    /// 读取锚点
    pub fn anchor(&self, anchor: Anchor) -> Value {
        let (fx, fy) = anchor.fraction();
        let x = self.x + self.width * fx;
        let y = self.y + self.height * fy;
        match anchor {
            Anchor::Left | Anchor::Right | Anchor::CenterX => Value::Scalar(x),
            Anchor::Top | Anchor::Bottom | Anchor::CenterY => Value::Scalar(y),
            _ => Value::Vector(Vec2::new(x, y)),
        }
    }

    /// 移动包围盒使锚点落在指定值上（尺寸不变）
    pub fn set_anchor(&mut self, anchor: Anchor, value: Value) -> Result<(), PropertyError> {
        let (fx, fy) = anchor.fraction();
        match (anchor.kind(), value) {
            (ValueKind::Vector, Value::Vector(v)) => {
                self.x = v.x - self.width * fx;
                self.y = v.y - self.height * fy;
                Ok(())
            }
            (ValueKind::Scalar, Value::Scalar(s)) => {
                match anchor {
                    Anchor::Left | Anchor::Right | Anchor::CenterX => {
                        self.x = s - self.width * fx;
                    }
                    _ => self.y = s - self.height * fy,
                }
                Ok(())
            }
            (expected, value) => Err(PropertyError::InterpolationTypeMismatch {
                property: format!("rect.{}", anchor),
                expected,
                actual: value.kind(),
            }),
        }
    }
}

/// 图像描述
///
/// 由键（资源名）与像素尺寸组成。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub key: String,
    pub size: Vec2,
}

impl Image {
    /// 创建图像描述
    pub fn new(key: impl Into<String>, width: f64, height: f64) -> Self {
        Self {
            key: key.into(),
            size: Vec2::new(width, height),
        }
    }
}

/// RGBA 颜色（用作颜色键）
///
/// 描述中写作 `[r, g, b]` 或 `[r, g, b, a]`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "[u8; 4]")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// 不透明颜色
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
}

impl TryFrom<Vec<u8>> for Color {
    type Error = String;

    fn try_from(v: Vec<u8>) -> Result<Self, Self::Error> {
        match v.as_slice() {
            [r, g, b] => Ok(Self::rgb(*r, *g, *b)),
            [r, g, b, a] => Ok(Self {
                r: *r,
                g: *g,
                b: *b,
                a: *a,
            }),
            _ => Err(format!("颜色需要 3 或 4 个分量，实际 {}", v.len())),
        }
    }
}

impl From<Color> for [u8; 4] {
    fn from(c: Color) -> Self {
        [c.r, c.g, c.b, c.a]
    }
}

/// 旋转枢轴
///
/// 对象绕 `origin - offset` 旋转：真实位置为 `origin - offset.rotate(angle)`。
/// 同时记录未旋转的原始图像与颜色键，供渲染层重新生成旋转后的图像。
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Pivot {
    pub origin: Vec2,
    pub offset: Vec2,
    pub angle: f64,
    pub original_image: Option<Image>,
    pub colorkey: Option<Color>,
}

impl Pivot {
    /// 创建枢轴
    pub fn new(origin: Vec2, offset: Vec2) -> Self {
        Self {
            origin,
            offset,
            ..Default::default()
        }
    }

    /// 旋转后的真实位置
    pub fn position(&self) -> Vec2 {
        self.origin - self.offset.rotate(self.angle)
    }

    /// 平移原点使真实位置落在指定值上
    pub fn set_position(&mut self, position: Vec2) {
        let delta = position - self.position();
        self.origin += delta;
    }
}
