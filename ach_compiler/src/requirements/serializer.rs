//! Versioned text encoding of requirements
//!
//! The output is read directly by the runtime client, so sigils, separators,
//! hex case and widths are fixed.

use super::error::{SerializationError, SerializationResult};
use super::field::{Field, FieldType};
use super::group::{RequirementGroup, Trigger, Value};
use super::requirement::{Requirement, RequirementOperator, RequirementType};
use super::version::SoftwareVersion;
use crate::config::constants::compile_time::serialization::*;
use crate::config::runtime::SerializationPreferences;
use std::fmt::Write;

/// Address width and target runtime used while encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerializationContext {
    /// Hex digits written for addresses
    pub address_width: usize,
    /// Oldest runtime the output must load in. `None` targets the oldest
    /// runtime that supports the constructs actually used.
    pub min_version: Option<SoftwareVersion>,
}

impl Default for SerializationContext {
    fn default() -> Self {
        Self {
            address_width: DEFAULT_ADDRESS_WIDTH,
            min_version: None,
        }
    }
}

impl SerializationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_address_width(mut self, width: usize) -> Self {
        self.address_width = width.clamp(1, MAX_ADDRESS_WIDTH);
        self
    }

    pub fn with_min_version(mut self, version: SoftwareVersion) -> Self {
        self.min_version = Some(version);
        self
    }

    pub fn from_preferences(preferences: &SerializationPreferences) -> Self {
        let context = Self::new().with_address_width(preferences.address_width);
        match SoftwareVersion::parse(&preferences.target_version) {
            Some(version) => context.with_min_version(version),
            None => context,
        }
    }

    /// Version the output is written for, given what it needs
    fn effective_version(&self, required: SoftwareVersion) -> SerializationResult<SoftwareVersion> {
        match self.min_version {
            Some(target) if target < required => Err(SerializationError::UnsupportedVersion {
                required,
                target,
            }),
            Some(target) => Ok(target),
            None => Ok(required),
        }
    }
}

pub fn serialize_field(field: &Field, context: &SerializationContext, out: &mut String) {
    match field.kind {
        FieldType::Value => {
            let _ = write!(out, "{}", field.value as i32);
        }
        FieldType::Float => {
            out.push('f');
            out.push_str(&format_float(field.float));
        }
        FieldType::Recall => out.push_str("{recall}"),
        _ => {
            out.push_str(field.kind.prefix());
            if field.size.is_float() {
                out.push('f');
            } else {
                out.push_str("0x");
            }
            out.push_str(field.size.sigil());
            let _ = write!(
                out,
                "{:0width$x}",
                field.value,
                width = context.address_width
            );
        }
    }
}

/// Floats always carry a decimal point so a following hit count stays
/// unambiguous
fn format_float(value: f32) -> String {
    let text = value.to_string();
    if text.contains('.') || text.contains("inf") || text.contains("NaN") {
        text
    } else {
        format!("{}.0", text)
    }
}

pub fn serialize_requirement(
    requirement: &Requirement,
    context: &SerializationContext,
    out: &mut String,
) {
    if let Some(sigil) = requirement.kind.sigil() {
        out.push(sigil);
        out.push(':');
    }

    serialize_field(&requirement.left, context, out);

    if requirement.operator != RequirementOperator::None {
        out.push_str(requirement.operator.as_str());
        serialize_field(&requirement.right, context, out);
    }

    if requirement.hit_count > 0 {
        let _ = write!(out, ".{}.", requirement.hit_count);
    }
}

pub fn serialize_group(group: &RequirementGroup, context: &SerializationContext, out: &mut String) {
    for (index, requirement) in group.requirements.iter().enumerate() {
        if index > 0 {
            out.push(REQUIREMENT_SEPARATOR);
        }
        serialize_requirement(requirement, context, out);
    }
}

fn check_terminals<'a>(
    groups: impl Iterator<Item = &'a RequirementGroup>,
) -> SerializationResult<()> {
    for (index, group) in groups.enumerate() {
        if !group.has_terminal() {
            return Err(SerializationError::MissingTerminal { group: index });
        }
    }
    Ok(())
}

/// Core group followed by `S`-prefixed alternative groups
pub fn serialize_trigger(
    trigger: &Trigger,
    context: &SerializationContext,
) -> SerializationResult<String> {
    context.effective_version(trigger.min_version())?;
    check_terminals(trigger.groups())?;

    let mut out = String::new();
    serialize_group(&trigger.core, context, &mut out);
    for alt in &trigger.alts {
        out.push(GROUP_SEPARATOR);
        serialize_group(alt, context, &mut out);
    }
    Ok(out)
}

/// Value groups joined by `$`, in the legacy format when the targeted
/// runtime cannot read the value in the measured format
pub fn serialize_value(value: &Value, context: &SerializationContext) -> SerializationResult<String> {
    let version = context.effective_version(value.min_version())?;
    check_terminals(value.groups.iter())?;

    let modern = value.modern_min_version();
    let legacy = version < modern;
    if legacy && !value.is_legacy_compatible() {
        return Err(SerializationError::UnsupportedVersion {
            required: modern,
            target: version,
        });
    }

    let mut out = String::new();
    for (index, group) in value.groups.iter().enumerate() {
        if index > 0 {
            out.push(VALUE_SEPARATOR);
        }
        if legacy {
            serialize_legacy_group(group, context, &mut out);
        } else {
            serialize_group(group, context, &mut out);
        }
    }
    Ok(out)
}

fn serialize_legacy_group(group: &RequirementGroup, context: &SerializationContext, out: &mut String) {
    for (index, requirement) in group.requirements.iter().enumerate() {
        if index > 0 {
            out.push(REQUIREMENT_SEPARATOR);
        }
        let negative = requirement.kind == RequirementType::SubSource;

        if requirement.left.kind == FieldType::Value {
            let sign = if negative { "-" } else { "" };
            let _ = write!(out, "v{}{}", sign, requirement.left.value);
            continue;
        }

        serialize_field(&requirement.left, context, out);
        let factor = match requirement.operator {
            RequirementOperator::Multiply => requirement.right.value as i64,
            _ => 1,
        };
        match (negative, factor) {
            (false, 1) => {}
            (false, f) => {
                let _ = write!(out, "*{}", f);
            }
            (true, f) => {
                let _ = write!(out, "*-{}", f);
            }
        }
    }
}

/// `STA:...::CAN:...::SUB:...::VAL:...`
pub fn serialize_leaderboard(
    start: &Trigger,
    cancel: &Trigger,
    submit: &Trigger,
    value: &Value,
    context: &SerializationContext,
) -> SerializationResult<String> {
    Ok(format!(
        "STA:{}{sep}CAN:{}{sep}SUB:{}{sep}VAL:{}",
        serialize_trigger(start, context)?,
        serialize_trigger(cancel, context)?,
        serialize_trigger(submit, context)?,
        serialize_value(value, context)?,
        sep = LEADERBOARD_SEPARATOR
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requirements::field::FieldSize;
    use assert_matches::assert_matches;

    fn byte(address: u32) -> Field {
        Field::memory(FieldSize::Byte, address)
    }

    fn requirement_text(requirement: Requirement) -> String {
        let mut out = String::new();
        serialize_requirement(&requirement, &SerializationContext::new(), &mut out);
        out
    }

    #[test]
    fn test_field_encoding() {
        let context = SerializationContext::new();
        let text = |field: Field| {
            let mut out = String::new();
            serialize_field(&field, &context, &mut out);
            out
        };
        assert_eq!(text(byte(0x1234)), "0xH001234");
        assert_eq!(text(Field::memory(FieldSize::Word, 0x1234)), "0x 001234");
        assert_eq!(
            text(byte(0xABCD).with_kind(FieldType::PreviousValue)),
            "d0xH00abcd"
        );
        assert_eq!(
            text(Field::memory(FieldSize::Float, 0x10).with_kind(FieldType::BinaryCodedDecimal)),
            "bfF000010"
        );
        assert_eq!(text(Field::signed(-2)), "-2");
        assert_eq!(text(Field::float(2.0)), "f2.0");
        assert_eq!(text(Field::float(4.5)), "f4.5");
        assert_eq!(text(Field::recall()), "{recall}");
    }

    #[test]
    fn test_requirement_encoding() {
        let r = Requirement::new(byte(0x1234), RequirementOperator::Equal, Field::value(6));
        assert_eq!(requirement_text(r), "0xH001234=6");
        assert_eq!(
            requirement_text(r.with_kind(RequirementType::ResetIf).with_hit_count(3)),
            "R:0xH001234=6.3."
        );
        assert_eq!(
            requirement_text(Requirement::operand(RequirementType::AddSource, byte(1))),
            "A:0xH000001"
        );
    }

    #[test]
    fn test_trigger_with_alts_and_address_width() {
        let core = RequirementGroup::new(vec![Requirement::new(
            byte(0x10),
            RequirementOperator::Equal,
            Field::value(1),
        )]);
        let alt = RequirementGroup::new(vec![Requirement::new(
            Field::memory(FieldSize::Bit6, 0x20),
            RequirementOperator::Equal,
            Field::value(0),
        )]);
        let trigger = Trigger::new(core, vec![alt]);
        let context = SerializationContext::new().with_address_width(4);
        assert_eq!(
            serialize_trigger(&trigger, &context).unwrap(),
            "0xH0010=1S0xS0020=0"
        );
    }

    #[test]
    fn test_version_gating() {
        let trigger = Trigger::new(
            RequirementGroup::new(vec![
                Requirement::new(byte(1), RequirementOperator::Equal, Field::value(1))
                    .with_kind(RequirementType::OrNext),
                Requirement::new(byte(2), RequirementOperator::Equal, Field::value(1)),
            ]),
            vec![],
        );
        let old = SerializationContext::new().with_min_version(SoftwareVersion::V0_77);
        assert_matches!(
            serialize_trigger(&trigger, &old),
            Err(SerializationError::UnsupportedVersion { .. })
        );
        let current = SerializationContext::new().with_min_version(SoftwareVersion::V1_0);
        assert!(serialize_trigger(&trigger, &current).is_ok());
    }

    #[test]
    fn test_missing_terminal_is_rejected() {
        let trigger = Trigger::new(
            RequirementGroup::new(vec![Requirement::operand(
                RequirementType::AddSource,
                byte(1),
            )]),
            vec![],
        );
        assert_matches!(
            serialize_trigger(&trigger, &SerializationContext::new()),
            Err(SerializationError::MissingTerminal { group: 0 })
        );
    }

    #[test]
    fn test_value_down_levels_to_legacy_format() {
        let value = Value::new(vec![RequirementGroup::new(vec![
            Requirement {
                operator: RequirementOperator::Multiply,
                right: Field::value(10),
                ..Requirement::operand(RequirementType::AddSource, byte(1))
            },
            Requirement::operand(RequirementType::SubSource, byte(2)),
            Requirement::operand(RequirementType::Measured, byte(3)),
        ])]);

        let legacy = serialize_value(&value, &SerializationContext::new()).unwrap();
        assert_eq!(legacy, "0xH000001*10_0xH000002*-1_0xH000003");

        // Measured values exist at 0.77 but scaled terms do not
        let at_measured = serialize_value(
            &value,
            &SerializationContext::new().with_min_version(SoftwareVersion::V0_77),
        )
        .unwrap();
        assert_eq!(at_measured, legacy);

        let modern = serialize_value(
            &value,
            &SerializationContext::new().with_min_version(SoftwareVersion::V0_78),
        )
        .unwrap();
        assert_eq!(modern, "A:0xH000001*10_B:0xH000002_M:0xH000003");
    }
}
