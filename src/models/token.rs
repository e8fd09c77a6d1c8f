use serde::{Deserialize, Serialize};

/// 屏幕坐标点，序列化为 `[x, y]`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Point(pub f32, pub f32);

impl Point {
    pub fn y(&self) -> f32 {
        self.1
    }
}

/// OCR 返回的四边形包围框，顶点顺序由 OCR 引擎决定
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(transparent)]
pub struct Quad(pub [Point; 4]);

impl Quad {
    /// 由左上角和右下角构造轴对齐的包围框
    pub fn from_rect(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Quad([
            Point(left, top),
            Point(right, top),
            Point(right, bottom),
            Point(left, bottom),
        ])
    }

    pub fn min_y(&self) -> f32 {
        self.0.iter().map(Point::y).fold(f32::INFINITY, f32::min)
    }

    pub fn max_y(&self) -> f32 {
        self.0.iter().map(Point::y).fold(f32::NEG_INFINITY, f32::max)
    }

    /// `other` 是否位于本框的下一行
    ///
    /// 只比较纵坐标：`other` 的最小 Y 严格大于本框的最大 Y 即成立，
    /// 不要求水平方向重叠。
    pub fn is_followed_by(&self, other: &Quad) -> bool {
        other.min_y() > self.max_y()
    }
}

/// 一个 OCR 识别出的文本片段
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Token {
    /// 识别文本
    pub text: String,
    /// 置信度（0-1）
    pub confidence: f32,
    /// 包围框
    pub quad: Quad,
}

impl Token {
    pub fn new(text: &str, confidence: f32, quad: Quad) -> Self {
        Self {
            text: text.to_string(),
            confidence,
            quad,
        }
    }
}

/// 一次轮询得到的全部 Token
///
/// Token 顺序即 OCR 返回顺序，核心逻辑假定它是自上而下、自左而右的阅读顺序，
/// 但不会重新排序。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Snapshot {
    pub tokens: Vec<Token>,
}

impl Snapshot {
    /// 丢弃置信度低于阈值的 Token，等于阈值的保留
    pub fn from_recognized(raw: Vec<Token>, confidence_threshold: f32) -> Self {
        let tokens = raw
            .into_iter()
            .filter(|token| token.confidence >= confidence_threshold)
            .collect();
        Self { tokens }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Quad::from_rect(0.0, 30.0, 50.0, 40.0), true)]
    #[case(Quad::from_rect(500.0, 21.0, 600.0, 30.0), true)]
    #[case(Quad::from_rect(0.0, 20.0, 50.0, 30.0), false)]
    #[case(Quad::from_rect(0.0, 15.0, 50.0, 25.0), false)]
    #[case(Quad::from_rect(0.0, 0.0, 50.0, 5.0), false)]
    fn test_next_line_predicate(#[case] candidate: Quad, #[case] expected: bool) {
        let trigger = Quad::from_rect(0.0, 10.0, 100.0, 20.0);
        assert_eq!(trigger.is_followed_by(&candidate), expected);
    }

    #[test]
    fn test_quad_extremes_ignore_vertex_order() {
        let quad = Quad([Point(5.0, 12.0), Point(1.0, 30.0), Point(9.0, 7.0), Point(3.0, 18.0)]);
        assert_eq!(quad.min_y(), 7.0);
        assert_eq!(quad.max_y(), 30.0);
    }

    #[test]
    fn test_confidence_filter_keeps_threshold_value() {
        let quad = Quad::default();
        let raw = vec![
            Token::new("low", 0.59, quad),
            Token::new("exact", 0.6, quad),
            Token::new("high", 0.95, quad),
        ];
        let snapshot = Snapshot::from_recognized(raw, 0.6);
        let texts: Vec<_> = snapshot.tokens().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["exact", "high"]);
    }

    #[test]
    fn test_snapshot_wire_format() {
        let json = r#"[{"text":"你好","confidence":0.9,"quad":[[0,0],[10,0],[10,5],[0,5]]}]"#;
        let snapshot: Snapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.tokens()[0].quad.max_y(), 5.0);
    }
}
