use super::ValueFormat;
use crate::requirements::{
    serialize_trigger, serialize_value, SerializationContext, SerializationResult, Trigger, Value,
};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::rc::Rc;

/// A value inserted into display text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichPresenceMacro {
    pub name: String,
    pub format: ValueFormat,
    pub value: Value,
}

/// One display line. Text placeholders `{0}`, `{1}`... refer to `macros`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichPresenceDisplay {
    /// `None` for the default display
    pub condition: Option<Trigger>,
    pub text: String,
    pub macros: Vec<RichPresenceMacro>,
}

impl RichPresenceDisplay {
    fn serialize_text(&self, context: &SerializationContext) -> SerializationResult<String> {
        let mut text = self.text.clone();
        for (index, value_macro) in self.macros.iter().enumerate() {
            let reference = format!(
                "@{}({})",
                value_macro.name,
                serialize_value(&value_macro.value, context)?
            );
            text = text.replace(&format!("{{{}}}", index), &reference);
        }
        Ok(text)
    }
}

/// The rich presence script assembled from every display statement
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RichPresence {
    pub displays: Vec<Rc<RichPresenceDisplay>>,
}

impl RichPresence {
    pub fn new(displays: Vec<Rc<RichPresenceDisplay>>) -> Self {
        Self { displays }
    }

    pub fn is_empty(&self) -> bool {
        self.displays.is_empty()
    }

    /// `Format:` blocks for each distinct macro, then the `Display:` block
    /// with conditional lines first and the default line last
    pub fn serialize(&self, context: &SerializationContext) -> SerializationResult<String> {
        let mut out = String::new();
        let mut formats: Vec<(&str, ValueFormat)> = Vec::new();
        for display in &self.displays {
            for value_macro in &display.macros {
                if !formats.iter().any(|(name, _)| *name == value_macro.name) {
                    formats.push((&value_macro.name, value_macro.format));
                }
            }
        }
        for (name, format) in formats {
            let _ = write!(
                out,
                "Format:{}\nFormatType={}\n\n",
                name,
                format.serialized_name()
            );
        }

        out.push_str("Display:\n");
        let mut default_text = None;
        for display in &self.displays {
            let text = display.serialize_text(context)?;
            match &display.condition {
                Some(condition) => {
                    let _ = writeln!(out, "?{}?{}", serialize_trigger(condition, context)?, text);
                }
                None => default_text = Some(text),
            }
        }
        if let Some(text) = default_text {
            out.push_str(&text);
            out.push('\n');
        }
        Ok(out)
    }
}
