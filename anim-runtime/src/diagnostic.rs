//! # 诊断模块
//!
//! 提供指令描述与动画库文件的静态检查，不依赖 IO 或运行时。
//!
//! ## 设计原则
//!
//! - 纯函数 API，可在无 IO 环境下运行
//! - 诊断分级：Error（必须修复）、Warn（建议修复）、Info（信息提示）
//! - 复用指令解析逻辑，不重复实现校验规则
//! - 与加载不同，检查不会在第一个错误处停止

use std::collections::BTreeMap;

use crate::instruction::{InstructionKind, parse_descriptor};

/// 诊断级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagnosticLevel {
    /// 信息提示
    Info,
    /// 警告（建议修复）
    Warn,
    /// 错误（必须修复）
    Error,
}

impl std::fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warn => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// 诊断条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// 诊断级别
    pub level: DiagnosticLevel,
    /// 动画 ID
    pub animation_id: String,
    /// 指令序号（如果可定位，从 0 开始）
    pub index: Option<usize>,
    /// 诊断消息
    pub message: String,
    /// 诊断详情（可选，如原始描述）
    pub detail: Option<String>,
}

impl Diagnostic {
    /// 创建错误诊断
    pub fn error(animation_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Error, animation_id, message)
    }

    /// 创建警告诊断
    pub fn warn(animation_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Warn, animation_id, message)
    }

    /// 创建信息诊断
    pub fn info(animation_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Info, animation_id, message)
    }

    fn new(
        level: DiagnosticLevel,
        animation_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            level,
            animation_id: animation_id.into(),
            index: None,
            message: message.into(),
            detail: None,
        }
    }

    /// 设置指令序号
    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// 设置详情
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.level, self.animation_id)?;
        if let Some(index) = self.index {
            write!(f, "#{}", index)?;
        }
        write!(f, ": {}", self.message)?;
        if let Some(detail) = &self.detail {
            write!(f, "\n  | {}", detail)?;
        }
        Ok(())
    }
}

/// 诊断结果
#[derive(Debug, Clone, Default)]
pub struct DiagnosticResult {
    /// 诊断条目列表
    pub diagnostics: Vec<Diagnostic>,
}

impl DiagnosticResult {
    /// 创建空结果
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加诊断
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// 合并另一个结果
    pub fn merge(&mut self, other: DiagnosticResult) {
        self.diagnostics.extend(other.diagnostics);
    }

    /// 获取错误数量
    pub fn error_count(&self) -> usize {
        self.count(DiagnosticLevel::Error)
    }

    /// 获取警告数量
    pub fn warn_count(&self) -> usize {
        self.count(DiagnosticLevel::Warn)
    }

    fn count(&self, level: DiagnosticLevel) -> usize {
        self.diagnostics.iter().filter(|d| d.level == level).count()
    }

    /// 是否有错误
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// 按级别过滤
    pub fn filter_by_level(&self, min_level: DiagnosticLevel) -> Vec<&Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.level >= min_level)
            .collect()
    }
}

/// 检查一个动画的指令描述列表
///
/// 报告：未知类型（Warn）、缺少 `type` / 缺少或无效参数 / 未知缓动 /
/// 无效 delay 引用（Error）、非正时长（Info）。
pub fn check_descriptors(animation_id: &str, descriptors: &[serde_json::Value]) -> DiagnosticResult {
    let mut result = DiagnosticResult::new();
    let count = descriptors.len();

    for (index, descriptor) in descriptors.iter().enumerate() {
        let kind = match parse_descriptor(index, descriptor) {
            Ok(kind) => kind,
            Err(e) => {
                result.push(
                    Diagnostic::error(animation_id, e.to_string())
                        .with_index(index)
                        .with_detail(descriptor.to_string()),
                );
                continue;
            }
        };

        if let InstructionKind::Passthrough { type_name } = &kind {
            result.push(
                Diagnostic::warn(
                    animation_id,
                    format!("未知指令类型 '{}'，运行时将被忽略", type_name),
                )
                .with_index(index),
            );
            continue;
        }

        if let Err(e) = kind.dependencies(index, count) {
            result.push(Diagnostic::error(animation_id, e.to_string()).with_index(index));
        }

        if let Some(time) = kind.duration() {
            if time <= 0.0 {
                result.push(
                    Diagnostic::info(
                        animation_id,
                        format!("时长 {} 不大于 0，首次推进即完成", time),
                    )
                    .with_index(index),
                );
            }
        }
    }

    result
}

/// 检查动画库 JSON 文本
///
/// 诊断的动画 ID 为 `source_id:动画名`。
pub fn check_library_json(source_id: &str, text: &str) -> DiagnosticResult {
    let mut result = DiagnosticResult::new();

    let raw: BTreeMap<String, Vec<serde_json::Value>> = match serde_json::from_str(text) {
        Ok(raw) => raw,
        Err(e) => {
            result.push(Diagnostic::error(source_id, format!("JSON 解析失败: {}", e)));
            return result;
        }
    };

    if raw.is_empty() {
        result.push(Diagnostic::info(source_id, "动画库为空"));
    }

    for (name, descriptors) in &raw {
        if descriptors.is_empty() {
            result.push(Diagnostic::info(
                format!("{}:{}", source_id, name),
                "动画不包含任何指令",
            ));
        }
        result.merge(check_descriptors(
            &format!("{}:{}", source_id, name),
            descriptors,
        ));
    }

    result
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn render(result: &DiagnosticResult) -> String {
        result
            .diagnostics
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::error("intro", "出错了").with_index(3);
        assert_eq!(diag.to_string(), "[ERROR] intro#3: 出错了");

        let diag = Diagnostic::warn("intro", "注意").with_detail("原始描述");
        assert_eq!(diag.to_string(), "[WARN] intro: 注意\n  | 原始描述");
    }

    #[test]
    fn test_check_descriptors() {
        let descriptors = vec![
            json!({"type": "wait", "time": 0}),
            json!({"type": "play_sound"}),
            json!({"type": "wait"}),
            json!({"type": "delay", "index": 5}),
        ];
        let result = check_descriptors("intro", &descriptors);

        assert_eq!(result.error_count(), 2);
        assert_eq!(result.warn_count(), 1);
        insta::assert_snapshot!(render(&result), @r#"
        [INFO] intro#0: 时长 0 不大于 0，首次推进即完成
        [WARN] intro#1: 未知指令类型 'play_sound'，运行时将被忽略
        [ERROR] intro#2: 第 2 条指令：'wait' 缺少参数 'time'
          | {"type":"wait"}
        [ERROR] intro#3: 第 3 条指令：delay 引用的索引 5 无效（只能等待之前的指令，共 4 条）
        "#);
    }

    #[test]
    fn test_check_unknown_easing() {
        let descriptors = vec![json!({
            "type": "slide_by",
            "offset": [1, 0],
            "time": 1,
            "easing": "wobble"
        })];
        let result = check_descriptors("intro", &descriptors);
        assert_eq!(result.error_count(), 1);
        assert_eq!(result.diagnostics[0].message, "未知缓动函数 'wobble'");
    }

    #[test]
    fn test_clean_descriptors() {
        let descriptors = vec![
            json!({"type": "slide_to", "target": [1, 0], "time": 1}),
            json!({"type": "delay_rel", "index": -1}),
        ];
        assert!(check_descriptors("ok", &descriptors).is_empty());
    }

    #[test]
    fn test_check_library_json() {
        let text = r#"{
            "empty": [],
            "broken": [{"type": "move_to", "anchor": "left", "target": [0, 0]}]
        }"#;
        let result = check_library_json("anims.json", text);
        assert!(result.has_errors());
        assert_eq!(result.filter_by_level(DiagnosticLevel::Error).len(), 1);
        assert_eq!(
            result.diagnostics[0].animation_id,
            "anims.json:broken".to_string()
        );
        assert_eq!(result.diagnostics[1].level, DiagnosticLevel::Info);

        let result = check_library_json("bad.json", "[1, 2");
        assert_eq!(result.error_count(), 1);
        assert!(result.diagnostics[0].message.starts_with("JSON 解析失败"));
    }
}
