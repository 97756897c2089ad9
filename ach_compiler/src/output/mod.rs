//! Compiled script objects
//!
//! Evaluating `achievement(...)`, `leaderboard(...)` and the rich presence
//! builtins produces the objects defined here. They own fully lowered
//! triggers and values and serialize through a [`SerializationContext`].

mod achievement;
mod rich_presence;

pub use achievement::{Achievement, Leaderboard};
pub use rich_presence::{RichPresence, RichPresenceDisplay, RichPresenceMacro};

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a value is displayed by leaderboards and rich presence macros
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ValueFormat {
    #[default]
    Value,
    Score,
    Frames,
    Seconds,
    Centiseconds,
    Minutes,
    SecondsAsMinutes,
    Float1,
    Float2,
    Float3,
    Float4,
    Float5,
    Float6,
    Fixed1,
    Fixed2,
    Fixed3,
    Tens,
    Hundreds,
    Thousands,
    Unsigned,
    Other,
}

impl ValueFormat {
    pub const ALL: [ValueFormat; 21] = [
        Self::Value,
        Self::Score,
        Self::Frames,
        Self::Seconds,
        Self::Centiseconds,
        Self::Minutes,
        Self::SecondsAsMinutes,
        Self::Float1,
        Self::Float2,
        Self::Float3,
        Self::Float4,
        Self::Float5,
        Self::Float6,
        Self::Fixed1,
        Self::Fixed2,
        Self::Fixed3,
        Self::Tens,
        Self::Hundreds,
        Self::Thousands,
        Self::Unsigned,
        Self::Other,
    ];

    /// Name accepted by the `format` parameter in scripts
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Value => "value",
            Self::Score => "score",
            Self::Frames => "time",
            Self::Seconds => "seconds",
            Self::Centiseconds => "centiseconds",
            Self::Minutes => "minutes",
            Self::SecondsAsMinutes => "seconds_as_minutes",
            Self::Float1 => "float1",
            Self::Float2 => "float2",
            Self::Float3 => "float3",
            Self::Float4 => "float4",
            Self::Float5 => "float5",
            Self::Float6 => "float6",
            Self::Fixed1 => "fixed1",
            Self::Fixed2 => "fixed2",
            Self::Fixed3 => "fixed3",
            Self::Tens => "tens",
            Self::Hundreds => "hundreds",
            Self::Thousands => "thousands",
            Self::Unsigned => "unsigned",
            Self::Other => "other",
        }
    }

    /// Name written into leaderboard and rich presence definitions
    pub fn serialized_name(self) -> &'static str {
        match self {
            Self::Value => "VALUE",
            Self::Score => "SCORE",
            Self::Frames => "TIME",
            Self::Seconds => "SECS",
            Self::Centiseconds => "MILLISECS",
            Self::Minutes => "MINUTES",
            Self::SecondsAsMinutes => "SECS_AS_MINS",
            Self::Float1 => "FLOAT1",
            Self::Float2 => "FLOAT2",
            Self::Float3 => "FLOAT3",
            Self::Float4 => "FLOAT4",
            Self::Float5 => "FLOAT5",
            Self::Float6 => "FLOAT6",
            Self::Fixed1 => "FIXED1",
            Self::Fixed2 => "FIXED2",
            Self::Fixed3 => "FIXED3",
            Self::Tens => "TENS",
            Self::Hundreds => "HUNDREDS",
            Self::Thousands => "THOUSANDS",
            Self::Unsigned => "UNSIGNED",
            Self::Other => "OTHER",
        }
    }

    /// Accepts script names, plus `frames` as an alias of `time`
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        if lower == "frames" {
            return Some(Self::Frames);
        }
        Self::ALL.iter().copied().find(|format| format.as_str() == lower)
    }
}

impl fmt::Display for ValueFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Objects produced while evaluating statements, drained after each
/// top-level statement group
#[derive(Debug, Default, Clone)]
pub struct OutputCollector {
    pub achievements: Vec<Achievement>,
    pub leaderboards: Vec<Leaderboard>,
    pub displays: Vec<RichPresenceDisplay>,
}

impl OutputCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.achievements.is_empty() && self.leaderboards.is_empty() && self.displays.is_empty()
    }

    pub fn take(&mut self) -> OutputCollector {
        std::mem::take(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_format_names() {
        assert_eq!(ValueFormat::from_name("time"), Some(ValueFormat::Frames));
        assert_eq!(ValueFormat::from_name("FRAMES"), Some(ValueFormat::Frames));
        assert_eq!(ValueFormat::from_name("seconds"), Some(ValueFormat::Seconds));
        assert_eq!(ValueFormat::from_name("bogus"), None);
        assert_eq!(ValueFormat::Seconds.serialized_name(), "SECS");
        for format in ValueFormat::ALL {
            assert_eq!(ValueFormat::from_name(format.as_str()), Some(format));
        }
    }

    #[test]
    fn test_collector_take_empties() {
        let mut collector = OutputCollector::new();
        collector.displays.push(RichPresenceDisplay {
            condition: None,
            text: "Playing".into(),
            macros: Vec::new(),
        });
        let taken = collector.take();
        assert!(collector.is_empty());
        assert_eq!(taken.displays.len(), 1);
    }
}
