use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::config::LabelConfig;
use crate::models::Color;

static LINE_WIDTH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)px").expect("line width pattern is valid"));

/// Checked in order; the first word found in the prompt wins
pub const PALETTE: [(&str, Color); 6] = [
    ("blue", Color::new(0x3b, 0x82, 0xf6)),
    ("green", Color::new(0x16, 0xa3, 0x4a)),
    ("yellow", Color::new(0xca, 0x8a, 0x04)),
    ("purple", Color::new(0x93, 0x33, 0xea)),
    ("orange", Color::new(0xea, 0x58, 0x0c)),
    ("red", Color::new(0xdc, 0x26, 0x26)),
];

pub const DEFAULT_COLOR: Color = Color::new(0xdc, 0x26, 0x26);
pub const DEFAULT_LINE_WIDTH: u32 = 4;
/// Widest stroke a prompt can ask for
pub const MAX_LINE_WIDTH: u32 = 64;
pub const AROUND_RADIUS_SCALE: f32 = 1.3;

const LABEL_SUPPRESSORS: [&str; 2] = ["no label", "no numbers"];
const ANNOTATE_WORDS: [&str; 8] = [
    "face", "circle", "box", "rectangle", "mark", "highlight", "detect", "outline",
];
const DESCRIBE_WORDS: [&str; 2] = ["describe", "what"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    Circle,
    Rectangle,
}

/// How detections are drawn, derived once per request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderDirective {
    pub color: Color,
    pub line_width: u32,
    pub shape: Shape,
    pub radius_scale: f32,
    pub show_labels: bool,
    pub max_labeled_count: usize,
}

impl RenderDirective {
    /// Labels are drawn only when enabled and the set is small enough
    pub fn labels_for(&self, count: usize) -> bool {
        self.show_labels && count <= self.max_labeled_count
    }
}

impl Default for RenderDirective {
    fn default() -> Self {
        Self {
            color: DEFAULT_COLOR,
            line_width: DEFAULT_LINE_WIDTH,
            shape: Shape::Rectangle,
            radius_scale: 1.0,
            show_labels: true,
            max_labeled_count: LabelConfig::default().object_cap,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Annotate,
    Describe,
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Faces,
    Objects,
}

impl Target {
    pub fn noun(&self) -> &'static str {
        match self {
            Target::Faces => "face",
            Target::Objects => "object",
        }
    }
}

/// Everything read out of one prompt
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub intent: Intent,
    pub target: Target,
    pub directive: RenderDirective,
}

/// Keyword-driven reading of a free-text prompt. Never fails; anything it
/// does not recognize falls back to defaults.
pub fn interpret(prompt: &str, labels: &LabelConfig) -> Instruction {
    let text = prompt.to_lowercase();

    let target = if text.contains("face") {
        Target::Faces
    } else {
        Target::Objects
    };

    let intent = if ANNOTATE_WORDS.iter().any(|w| text.contains(w)) {
        Intent::Annotate
    } else if DESCRIBE_WORDS.iter().any(|w| text.contains(w)) {
        Intent::Describe
    } else {
        Intent::Unsupported
    };

    let color = PALETTE
        .iter()
        .find(|(word, _)| text.contains(word))
        .map(|&(_, color)| color)
        .unwrap_or(DEFAULT_COLOR);

    let shape = if text.contains("circle") {
        Shape::Circle
    } else {
        Shape::Rectangle
    };

    let radius_scale = if text.contains("around") {
        AROUND_RADIUS_SCALE
    } else {
        1.0
    };

    let show_labels = !LABEL_SUPPRESSORS.iter().any(|p| text.contains(p));
    let max_labeled_count = match target {
        Target::Faces => labels.face_cap,
        Target::Objects => labels.object_cap,
    };

    Instruction {
        intent,
        target,
        directive: RenderDirective {
            color,
            line_width: parse_line_width(&text),
            shape,
            radius_scale,
            show_labels,
            max_labeled_count,
        },
    }
}

/// Shorthand for `interpret(..).directive` with default label caps
pub fn parse_directive(prompt: &str) -> RenderDirective {
    interpret(prompt, &LabelConfig::default()).directive
}

fn parse_line_width(text: &str) -> u32 {
    LINE_WIDTH_RE
        .captures(text)
        .and_then(|caps| caps[1].parse::<u32>().ok())
        .map(|width| width.clamp(1, MAX_LINE_WIDTH))
        .unwrap_or(DEFAULT_LINE_WIDTH)
}
