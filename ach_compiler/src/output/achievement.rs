use super::ValueFormat;
use crate::requirements::{
    render_trigger, render_value, serialize_leaderboard, serialize_trigger, SerializationContext,
    SerializationResult, SoftwareVersion, Trigger, Value,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: u32,
    pub title: String,
    pub description: String,
    pub points: u32,
    pub badge: String,
    pub trigger: Trigger,
    /// Line of the `achievement` call
    pub line: u32,
}

impl Achievement {
    pub fn serialize(&self, context: &SerializationContext) -> SerializationResult<String> {
        serialize_trigger(&self.trigger, context)
    }

    /// Script-like rendering of the trigger
    pub fn render(&self) -> String {
        render_trigger(&self.trigger)
    }

    pub fn min_version(&self) -> SoftwareVersion {
        self.trigger.min_version()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leaderboard {
    pub id: u32,
    pub title: String,
    pub description: String,
    pub start: Trigger,
    pub cancel: Trigger,
    pub submit: Trigger,
    pub value: Value,
    pub format: ValueFormat,
    pub lower_is_better: bool,
    pub line: u32,
}

impl Leaderboard {
    pub fn serialize(&self, context: &SerializationContext) -> SerializationResult<String> {
        serialize_leaderboard(&self.start, &self.cancel, &self.submit, &self.value, context)
    }

    pub fn render(&self) -> String {
        format!(
            "start: {}\ncancel: {}\nsubmit: {}\nvalue: {}",
            render_trigger(&self.start),
            render_trigger(&self.cancel),
            render_trigger(&self.submit),
            render_value(&self.value)
        )
    }

    pub fn min_version(&self) -> SoftwareVersion {
        self.start
            .min_version()
            .max(self.cancel.min_version())
            .max(self.submit.min_version())
            .max(self.value.min_version())
    }
}
