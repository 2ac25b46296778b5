//! # Library 模块
//!
//! 命名动画库：从 JSON 加载 `名称 → 指令描述列表`，按需实例化为 Track。
//!
//! ## 文件格式
//!
//! ```json
//! {
//!     "bounce": [
//!         {"type": "slide_by", "offset": [0, -20], "time": 0.2, "easing": "quad_ease_out"},
//!         {"type": "slide_by", "offset": [0, 20], "time": 0.2, "easing": "quad_ease_in"}
//!     ]
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, warn};

use crate::clock::TimeSource;
use crate::error::{AnimError, AnimResult};
use crate::instruction::{InstructionKind, parse_descriptors};
use crate::property::TargetRef;
use crate::track::Track;

/// 命名动画（已校验的指令描述列表）
#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    name: String,
    instructions: Vec<InstructionKind>,
}

impl Animation {
    /// 由已解析的指令创建
    pub fn new(name: impl Into<String>, instructions: Vec<InstructionKind>) -> Self {
        Self {
            name: name.into(),
            instructions,
        }
    }

    /// 由 JSON 指令描述创建
    pub fn from_descriptors(
        name: impl Into<String>,
        descriptors: &[serde_json::Value],
    ) -> AnimResult<Self> {
        let name = name.into();
        let instructions = parse_descriptors(descriptors).map_err(|error| {
            AnimError::InvalidAnimation {
                name: name.clone(),
                error,
            }
        })?;
        Ok(Self { name, instructions })
    }

    /// 实例化为绑定到目标的 Track
    pub fn load(&self, target: TargetRef, source: TimeSource) -> AnimResult<Track> {
        Ok(Track::load(target, source, self.instructions.clone())?.with_name(&self.name))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instructions(&self) -> &[InstructionKind] {
        &self.instructions
    }
}

/// 动画库
#[derive(Debug, Clone, Default)]
pub struct AnimationLibrary {
    animations: BTreeMap<String, Animation>,
}

impl AnimationLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 JSON 文本加载，合并进当前库
    ///
    /// 任一动画无效则整体失败，库保持不变。
    ///
    /// # 返回
    /// 本次加载的动画数量
    pub fn load_json(&mut self, text: &str) -> AnimResult<usize> {
        let raw: BTreeMap<String, Vec<serde_json::Value>> = serde_json::from_str(text)?;
        let parsed = raw
            .iter()
            .map(|(name, descriptors)| Animation::from_descriptors(name.as_str(), descriptors))
            .collect::<AnimResult<Vec<_>>>()?;

        let count = parsed.len();
        for animation in parsed {
            self.insert(animation);
        }
        Ok(count)
    }

    /// 从文件加载
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> AnimResult<usize> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let count = self.load_json(&text)?;
        debug!(path = %path.display(), count, "动画库加载完成");
        Ok(count)
    }

    /// 添加动画，同名动画会被替换
    pub fn insert(&mut self, animation: Animation) {
        if let Some(previous) = self.animations.insert(animation.name.clone(), animation) {
            warn!(name = %previous.name, "动画被重新定义，旧定义已替换");
        }
    }

    /// 按名称查找
    pub fn get(&self, name: &str) -> Option<&Animation> {
        let animation = self.animations.get(name);
        if animation.is_none() {
            warn!(name, "动画未找到");
        }
        animation
    }

    /// 按名称实例化 Track
    pub fn instantiate(&self, name: &str, target: TargetRef, source: TimeSource) -> AnimResult<Track> {
        self.animations
            .get(name)
            .ok_or_else(|| AnimError::AnimationNotFound {
                name: name.to_string(),
            })?
            .load(target, source)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.animations.contains_key(name)
    }

    /// 所有动画名称（有序）
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.animations.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.animations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.animations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::io::Write;
    use std::rc::Rc;

    use super::*;
    use crate::clock::ManualTime;
    use crate::error::DescriptorError;
    use crate::geometry::Vec2;
    use crate::sprite::Sprite;

    const LIBRARY: &str = r#"{
        "nudge": [{"type": "move_by", "offset": [5, 0]}],
        "fade": [
            {"type": "wait", "time": 0.5},
            {"type": "alpha_gradient", "target": 0, "time": 1}
        ]
    }"#;

    #[test]
    fn test_load_json() {
        let mut library = AnimationLibrary::new();
        assert_eq!(library.load_json(LIBRARY).unwrap(), 2);
        assert_eq!(library.names().collect::<Vec<_>>(), vec!["fade", "nudge"]);
        assert_eq!(library.get("fade").unwrap().instructions().len(), 2);
        assert!(library.get("missing").is_none());
    }

    #[test]
    fn test_redefinition_replaces() {
        let mut library = AnimationLibrary::new();
        library.load_json(LIBRARY).unwrap();
        library
            .load_json(r#"{"nudge": [{"type": "move_by", "offset": [1, 1]}, {"type": "wait", "time": 1}]}"#)
            .unwrap();
        assert_eq!(library.len(), 2);
        assert_eq!(library.get("nudge").unwrap().instructions().len(), 2);
    }

    #[test]
    fn test_invalid_animation_leaves_library_unchanged() {
        let mut library = AnimationLibrary::new();
        let err = library
            .load_json(r#"{"a": [{"type": "wait", "time": 1}], "b": [{"type": "wait"}]}"#)
            .unwrap_err();
        assert!(matches!(
            err,
            AnimError::InvalidAnimation {
                ref name,
                error: DescriptorError::MissingParameter { .. },
            } if name == "b"
        ));
        assert!(library.is_empty());
    }

    #[test]
    fn test_malformed_json() {
        let mut library = AnimationLibrary::new();
        assert!(matches!(
            library.load_json("{not json"),
            Err(AnimError::Json(_))
        ));
    }

    #[test]
    fn test_instantiate() {
        let mut library = AnimationLibrary::new();
        library.load_json(LIBRARY).unwrap();
        let sprite = Rc::new(RefCell::new(Sprite::new(Vec2::zero(), Vec2::zero())));
        let time = ManualTime::new();

        let mut track = library
            .instantiate("nudge", sprite.clone(), time.source())
            .unwrap();
        assert_eq!(track.name(), "nudge");
        track.play().unwrap();
        assert_eq!(sprite.borrow().snapshot().position, Vec2::new(5.0, 0.0));

        assert!(matches!(
            library.instantiate("missing", sprite, time.source()),
            Err(AnimError::AnimationNotFound { .. })
        ));
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(LIBRARY.as_bytes()).unwrap();

        let mut library = AnimationLibrary::new();
        assert_eq!(library.load_file(file.path()).unwrap(), 2);
        assert!(library.contains("fade"));

        assert!(matches!(
            library.load_file("/nonexistent/animations.json"),
            Err(AnimError::Io(_))
        ));
    }
}
