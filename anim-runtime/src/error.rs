//! # Error 模块
//!
//! 定义 anim-runtime 中使用的错误类型。

use thiserror::Error;

use crate::value::ValueKind;

/// 指令描述错误
///
/// 在构建 Track（或加载动画库）时产生，指向具体的指令位置。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DescriptorError {
    /// 描述不是 JSON 对象
    #[error("第 {index} 条指令：描述必须是对象")]
    NotAnObject { index: usize },

    /// 缺少 `type` 字段
    #[error("第 {index} 条指令：缺少 'type' 字段")]
    MissingType { index: usize },

    /// 未知的指令类型（仅用于诊断，加载时会降级为空指令）
    #[error("第 {index} 条指令：未知指令类型 '{type_name}'")]
    UnknownInstructionType { index: usize, type_name: String },

    /// 缺少必需参数
    #[error("第 {index} 条指令：'{instruction}' 缺少参数 '{param}'")]
    MissingParameter {
        index: usize,
        instruction: String,
        param: String,
    },

    /// 无效的参数值
    #[error("第 {index} 条指令：'{instruction}' 的参数无效 - {message}")]
    InvalidParameter {
        index: usize,
        instruction: String,
        message: String,
    },

    /// 未知的缓动函数
    #[error("未知缓动函数 '{name}'")]
    UnknownEasing { name: String },

    /// delay 引用的绝对索引无效（必须指向之前的指令）
    #[error("第 {index} 条指令：delay 引用的索引 {target} 无效（只能等待之前的指令，共 {count} 条）")]
    InvalidIndex {
        index: usize,
        target: usize,
        count: usize,
    },

    /// delay_rel 的相对偏移无效（必须指向之前的指令）
    #[error("第 {index} 条指令：相对偏移 {offset} 无效（只能等待之前的指令，共 {count} 条）")]
    InvalidRelativeIndex {
        index: usize,
        offset: isize,
        count: usize,
    },
}

/// 属性访问错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PropertyError {
    /// 属性路径无法解析
    #[error("属性 '{path}' 不存在")]
    PropertyNotFound { path: String },

    /// 值类型与属性不匹配
    #[error("属性 '{property}' 类型不匹配：期望 {expected}，实际 {actual}")]
    InterpolationTypeMismatch {
        property: String,
        expected: ValueKind,
        actual: ValueKind,
    },

    /// 图像序列不存在
    #[error("图像序列 '{source_name}' 不存在")]
    ImageSourceNotFound { source_name: String },

    /// 图像索引越界
    #[error("图像序列 '{source_name}' 索引 {index} 越界（长度 {len}）")]
    ImageIndexOutOfRange {
        source_name: String,
        index: usize,
        len: usize,
    },
}

/// anim-runtime 统一错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnimError {
    /// 指令描述错误
    #[error("指令描述错误: {0}")]
    Descriptor(#[from] DescriptorError),

    /// 属性访问错误
    #[error("属性错误: {0}")]
    Property(#[from] PropertyError),

    /// 动画库中找不到动画
    #[error("动画 '{name}' 未找到")]
    AnimationNotFound { name: String },

    /// 动画库中的某个动画描述无效
    #[error("动画 '{name}' 无效: {error}")]
    InvalidAnimation {
        name: String,
        error: DescriptorError,
    },

    /// JSON 解析失败
    #[error("JSON 解析失败: {0}")]
    Json(String),

    /// 文件读取失败
    #[error("文件读取失败: {0}")]
    Io(String),
}

impl From<serde_json::Error> for AnimError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e.to_string())
    }
}

impl From<std::io::Error> for AnimError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

/// Result 类型别名
pub type AnimResult<T> = Result<T, AnimError>;
