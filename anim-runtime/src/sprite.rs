//! # Sprite 模块
//!
//! `Animatable` 的参考实现。
//!
//! - 设置位置或角度后，包围盒以四舍五入后的真实位置为中心
//! - 直接移动包围盒锚点时保留设置的包围盒，真实位置取其中心
//! - 有枢轴时 `position` 为枢轴原点，旋转会带动真实位置
//! - 替换图像时包围盒绕中心缩放

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::PropertyError;
use crate::geometry::{Anchor, Image, Pivot, Rect, Vec2};
use crate::property::Animatable;
use crate::value::Value;

/// 精灵
#[derive(Debug, Clone, PartialEq)]
pub struct Sprite {
    position: Vec2,
    pivot: Option<Pivot>,
    rect: Rect,
    image: Option<Image>,
    angle: f64,
    opacity: f64,
    sources: BTreeMap<String, Vec<Image>>,
    values: BTreeMap<String, Value>,
}

impl Sprite {
    /// 以位置与包围盒尺寸创建
    pub fn new(position: Vec2, size: Vec2) -> Self {
        let mut sprite = Self {
            position,
            pivot: None,
            rect: Rect::from_center(position, size),
            image: None,
            angle: 0.0,
            opacity: 1.0,
            sources: BTreeMap::new(),
            values: BTreeMap::new(),
        };
        sprite.align_rect();
        sprite
    }

    /// 设置初始图像（包围盒随之调整尺寸）
    pub fn with_image(mut self, image: Image) -> Self {
        self.set_image(image);
        self
    }

    /// 绕 `position - offset` 旋转的枢轴
    pub fn with_pivot(mut self, offset: Vec2) -> Self {
        let mut pivot = Pivot::new(self.position, offset);
        pivot.angle = self.angle;
        pivot.original_image = self.image.clone();
        self.pivot = Some(pivot);
        self.align_rect();
        self
    }

    /// 注册图像序列
    pub fn with_source(mut self, name: impl Into<String>, images: Vec<Image>) -> Self {
        self.sources.insert(name.into(), images);
        self
    }

    /// 注册自定义属性
    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// 枢轴
    pub fn pivot(&self) -> Option<&Pivot> {
        self.pivot.as_ref()
    }

    /// 自定义属性
    pub fn value(&self, name: &str) -> Option<Value> {
        self.values.get(name).copied()
    }

    /// 导出当前状态
    pub fn snapshot(&self) -> SpriteSnapshot {
        SpriteSnapshot {
            position: self.position(),
            true_position: self.true_position(),
            rect: self.rect,
            angle: self.angle,
            opacity: self.opacity,
            image: self.image.as_ref().map(|image| image.key.clone()),
            values: self.values.clone(),
        }
    }

    fn align_rect(&mut self) {
        self.rect.set_center(self.true_position().round());
    }
}

impl Animatable for Sprite {
    fn position(&self) -> Vec2 {
        match &self.pivot {
            Some(pivot) => pivot.origin,
            None => self.position,
        }
    }

    fn set_position(&mut self, position: Vec2) {
        match &mut self.pivot {
            Some(pivot) => pivot.origin = position,
            None => self.position = position,
        }
        self.align_rect();
    }

    fn true_position(&self) -> Vec2 {
        match &self.pivot {
            Some(pivot) => pivot.position(),
            None => self.position,
        }
    }

    fn set_true_position(&mut self, position: Vec2) {
        match &mut self.pivot {
            Some(pivot) => pivot.set_position(position),
            None => self.position = position,
        }
        self.align_rect();
    }

    fn rect(&self) -> Rect {
        self.rect
    }

    fn move_rect(&mut self, anchor: Anchor, value: Value) -> Result<(), PropertyError> {
        let mut rect = self.rect;
        rect.set_anchor(anchor, value)?;
        let center = rect.center();
        match &mut self.pivot {
            Some(pivot) => pivot.set_position(center),
            None => self.position = center,
        }
        self.rect = rect;
        Ok(())
    }

    fn angle(&self) -> f64 {
        self.angle
    }

    fn set_angle(&mut self, angle: f64) {
        self.angle = angle;
        if let Some(pivot) = &mut self.pivot {
            pivot.angle = angle;
        }
        self.align_rect();
    }

    fn opacity(&self) -> f64 {
        self.opacity
    }

    fn set_opacity(&mut self, opacity: f64) {
        self.opacity = opacity.clamp(0.0, 1.0);
    }

    fn image(&self) -> Option<&Image> {
        self.image.as_ref()
    }

    fn set_image(&mut self, image: Image) {
        let center = self.rect.center();
        self.rect.width = image.size.x;
        self.rect.height = image.size.y;
        self.rect.set_center(center);
        self.image = Some(image);
    }

    fn image_source(&self, name: &str) -> Option<&[Image]> {
        self.sources.get(name).map(Vec::as_slice)
    }

    fn pivot_mut(&mut self) -> Option<&mut Pivot> {
        self.pivot.as_mut()
    }

    fn get_property(&self, path: &str) -> Option<Value> {
        self.value(path)
    }

    fn set_property(&mut self, path: &str, value: Value) -> bool {
        match self.values.get_mut(path) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}

/// 精灵状态快照
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpriteSnapshot {
    pub position: Vec2,
    pub true_position: Vec2,
    pub rect: Rect,
    pub angle: f64,
    pub opacity: f64,
    pub image: Option<String>,
    pub values: BTreeMap<String, Value>,
}
