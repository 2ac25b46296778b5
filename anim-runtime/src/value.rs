//! # Value 模块
//!
//! 可插值的属性值：标量或二维向量。

use serde::{Deserialize, Serialize};

use crate::geometry::Vec2;

/// 值类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// 标量
    Scalar,
    /// 二维向量
    Vector,
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scalar => write!(f, "标量"),
            Self::Vector => write!(f, "二维向量"),
        }
    }
}

/// 属性值
///
/// 描述中标量写作数字，向量写作 `[x, y]`。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Scalar(f64),
    Vector(Vec2),
}

impl Value {
    /// 值类型
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Scalar(_) => ValueKind::Scalar,
            Value::Vector(_) => ValueKind::Vector,
        }
    }

    /// 标量值
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar(s) => Some(*s),
            Value::Vector(_) => None,
        }
    }

    /// 向量值
    pub fn as_vector(&self) -> Option<Vec2> {
        match self {
            Value::Vector(v) => Some(*v),
            Value::Scalar(_) => None,
        }
    }

    /// 线性插值，类型不一致时返回 `None`
    pub fn lerp(&self, other: &Value, t: f64) -> Option<Value> {
        match (self, other) {
            (Value::Scalar(a), Value::Scalar(b)) => Some(Value::Scalar(a + (b - a) * t)),
            (Value::Vector(a), Value::Vector(b)) => Some(Value::Vector(a.lerp(*b, t))),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Scalar(v)
    }
}

impl From<Vec2> for Value {
    fn from(v: Vec2) -> Self {
        Value::Vector(v)
    }
}

impl From<(f64, f64)> for Value {
    fn from(v: (f64, f64)) -> Self {
        Value::Vector(v.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lerp() {
        let a = Value::Scalar(0.0);
        let b = Value::Scalar(10.0);
        assert_eq!(a.lerp(&b, 0.25), Some(Value::Scalar(2.5)));

        let a = Value::from((0.0, 0.0));
        let b = Value::from((10.0, -10.0));
        assert_eq!(a.lerp(&b, 0.5), Some(Value::from((5.0, -5.0))));
    }

    #[test]
    fn test_lerp_mismatch() {
        assert_eq!(Value::Scalar(0.0).lerp(&Value::from((1.0, 1.0)), 0.5), None);
    }

    #[test]
    fn test_deserialize() {
        let v: Value = serde_json::from_str("5").unwrap();
        assert_eq!(v, Value::Scalar(5.0));
        let v: Value = serde_json::from_str("[1, 2.5]").unwrap();
        assert_eq!(v, Value::Vector(Vec2::new(1.0, 2.5)));
        assert!(serde_json::from_str::<Value>("\"x\"").is_err());
    }
}
