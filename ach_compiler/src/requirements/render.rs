//! Decompiled rendering of requirement structures
//!
//! Produces script-like text (`byte(0x001234) == 6`) for diffing compiled
//! output against a stored definition. Hit-count wrappers are built from the
//! chain structure itself.

use super::field::{Field, FieldType};
use super::group::{RequirementEx, RequirementGroup, Trigger, Value};
use super::requirement::{Requirement, RequirementOperator, RequirementType};

pub fn render_field(field: &Field) -> String {
    render_field_at(field, None)
}

/// Render a field whose address is offset from a pointer expression
fn render_field_at(field: &Field, pointer: Option<&str>) -> String {
    let address = match pointer {
        Some(base) if field.value == 0 => base.to_string(),
        Some(base) => format!("{} + 0x{:06X}", base, field.value),
        None => format!("0x{:06X}", field.value),
    };
    let read = format!("{}({})", field.size.function_name(), address);
    match field.kind {
        FieldType::Value => (field.value as i32).to_string(),
        FieldType::Float => format!("{:?}", field.float),
        FieldType::Recall => "recall()".to_string(),
        FieldType::MemoryAddress => read,
        FieldType::PreviousValue => format!("prev({})", read),
        FieldType::PriorValue => format!("prior({})", read),
        FieldType::BinaryCodedDecimal => format!("bcd({})", read),
        FieldType::Invert => format!("~{}", read),
    }
}

fn render_modifier_operand(field: &Field, operator: RequirementOperator) -> String {
    match (operator, field.kind) {
        (RequirementOperator::BitwiseAnd | RequirementOperator::BitwiseXor, FieldType::Value) => {
            format!("0x{:X}", field.value)
        }
        _ => render_field(field),
    }
}

/// A requirement's left side with its combining modifier applied
fn render_operand(requirement: &Requirement, pointer: Option<&str>) -> String {
    let left = render_field_at(&requirement.left, pointer);
    if requirement.operator.is_modifier() {
        format!(
            "{} {} {}",
            left,
            requirement.operator.as_str(),
            render_modifier_operand(&requirement.right, requirement.operator)
        )
    } else {
        left
    }
}

fn comparison_symbol(operator: RequirementOperator) -> &'static str {
    match operator {
        RequirementOperator::Equal => "==",
        other => other.as_str(),
    }
}

/// Renders one condition (everything up to an AddHits/SubHits boundary or
/// the terminal requirement)
#[derive(Default)]
struct ConditionBuilder {
    accumulator: String,
    pointer: Option<String>,
    logic: Option<(String, RequirementType)>,
    reset_next: Option<String>,
}

impl ConditionBuilder {
    fn push_value_term(&mut self, requirement: &Requirement) {
        let term = render_operand(requirement, self.pointer.take().as_deref());
        let negative = requirement.kind == RequirementType::SubSource;
        if self.accumulator.is_empty() {
            if negative {
                self.accumulator = format!("-{}", term);
            } else {
                self.accumulator = term;
            }
        } else {
            let sign = if negative { '-' } else { '+' };
            self.accumulator = format!("{} {} {}", self.accumulator, sign, term);
        }
    }

    fn comparison(&mut self, requirement: &Requirement) -> String {
        let mut left = render_field_at(&requirement.left, self.pointer.take().as_deref());
        if !self.accumulator.is_empty() {
            left = format!("{} + {}", std::mem::take(&mut self.accumulator), left);
        }
        let text = if requirement.operator.is_comparison() {
            format!(
                "{} {} {}",
                left,
                comparison_symbol(requirement.operator),
                render_field(&requirement.right)
            )
        } else if requirement.operator.is_modifier() {
            format!(
                "{} {} {}",
                left,
                requirement.operator.as_str(),
                render_modifier_operand(&requirement.right, requirement.operator)
            )
        } else {
            left
        };
        wrap_hits(text, requirement.hit_count)
    }

    fn combine(&mut self, condition: String) -> String {
        let condition = match self.reset_next.take() {
            Some(reset) => format!("{} && never({})", condition, reset),
            None => condition,
        };
        match self.logic.take() {
            Some((previous, RequirementType::AndNext)) => format!("{} && {}", previous, condition),
            Some((previous, _)) => format!("({} || {})", previous, condition),
            None => condition,
        }
    }

    fn push(&mut self, requirement: &Requirement) -> Option<String> {
        match requirement.kind {
            RequirementType::AddAddress => {
                self.pointer = Some(render_operand(requirement, self.pointer.take().as_deref()));
                None
            }
            RequirementType::AddSource | RequirementType::SubSource => {
                self.push_value_term(requirement);
                None
            }
            RequirementType::Remember => {
                self.push_value_term(&requirement.with_kind(RequirementType::AddSource));
                self.accumulator = format!("remember({})", self.accumulator);
                None
            }
            RequirementType::AndNext | RequirementType::OrNext => {
                let condition = self.comparison(requirement);
                let combined = self.combine(condition);
                self.logic = Some((combined, requirement.kind));
                None
            }
            RequirementType::ResetNextIf => {
                self.reset_next = Some(self.comparison(requirement));
                None
            }
            _ => {
                let condition = self.comparison(requirement);
                Some(self.combine(condition))
            }
        }
    }
}

fn wrap_hits(text: String, hit_count: u32) -> String {
    match hit_count {
        0 => text,
        1 => format!("once({})", text),
        n => format!("repeated({}, {})", n, text),
    }
}

fn wrap_flag(text: String, kind: RequirementType) -> String {
    match kind {
        RequirementType::ResetIf => format!("never({})", text),
        RequirementType::PauseIf => format!("unless({})", text),
        RequirementType::Trigger => format!("trigger_when({})", text),
        RequirementType::Measured => format!("measured({})", text),
        RequirementType::MeasuredPercent => format!("measured({}, format=\"percent\")", text),
        RequirementType::MeasuredIf => format!("measured_if({})", text),
        _ => text,
    }
}

/// Render one resolved chain
pub fn render_chain(chain: &RequirementEx) -> String {
    let has_tally = chain
        .requirements
        .iter()
        .any(|r| matches!(r.kind, RequirementType::AddHits | RequirementType::SubHits));
    let mut tallied: Vec<String> = Vec::new();
    let mut builder = ConditionBuilder::default();
    let mut terminal_text = String::new();
    let mut terminal: Option<Requirement> = None;
    let mut target = 0;

    for requirement in &chain.requirements {
        let mut requirement = *requirement;
        match requirement.kind {
            RequirementType::AddHits | RequirementType::SubHits => {
                let kind = requirement.kind;
                requirement.kind = RequirementType::None;
                let text = builder.push(&requirement).unwrap_or_default();
                builder = ConditionBuilder::default();
                if kind == RequirementType::SubHits {
                    tallied.push(format!("deduct({})", text));
                } else {
                    tallied.push(text);
                }
            }
            _ => {
                // The terminal's hit target belongs to the whole tally
                if has_tally && !requirement.kind.is_combining() {
                    target = requirement.hit_count;
                    requirement.hit_count = 0;
                }
                if let Some(text) = builder.push(&requirement) {
                    terminal_text = text;
                    terminal = Some(requirement);
                }
            }
        }
    }

    let Some(terminal) = terminal else {
        return format!("/* incomplete: {} */", builder.accumulator);
    };

    let text = if has_tally {
        tallied.push(terminal_text);
        format!("tally({}, {})", target, tallied.join(", "))
    } else {
        terminal_text
    };

    wrap_flag(text, terminal.kind)
}

pub fn render_group(group: &RequirementGroup) -> String {
    if group.is_empty() {
        return "true".to_string();
    }
    group
        .chains()
        .iter()
        .map(render_chain)
        .collect::<Vec<_>>()
        .join(" && ")
}

pub fn render_trigger(trigger: &Trigger) -> String {
    let core = render_group(&trigger.core);
    if trigger.alts.is_empty() {
        return core;
    }
    let alts = trigger
        .alts
        .iter()
        .map(|alt| {
            let text = render_group(alt);
            if alt.chains().len() > 1 {
                format!("({})", text)
            } else {
                text
            }
        })
        .collect::<Vec<_>>()
        .join(" || ");
    if trigger.core.is_empty() {
        alts
    } else {
        format!("{} && ({})", core, alts)
    }
}

fn render_value_group(group: &RequirementGroup) -> String {
    let mut builder = ConditionBuilder::default();
    let mut text = String::new();
    for requirement in &group.requirements {
        match requirement.kind {
            RequirementType::Measured if !requirement.operator.is_comparison() => {
                let mut plain = *requirement;
                plain.kind = RequirementType::None;
                text = builder.comparison(&plain);
            }
            _ => {
                if let Some(rendered) = builder.push(requirement) {
                    text = rendered;
                }
            }
        }
    }
    text
}

pub fn render_value(value: &Value) -> String {
    match value.groups.as_slice() {
        [single] => render_value_group(single),
        groups => format!(
            "max_of({})",
            groups
                .iter()
                .map(render_value_group)
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requirements::deserializer::{parse_trigger, parse_value};
    use crate::requirements::field::FieldSize;

    fn trigger_text(serialized: &str) -> String {
        render_trigger(&parse_trigger(serialized).unwrap())
    }

    #[test]
    fn test_render_simple_comparison() {
        assert_eq!(trigger_text("0xH001234=6"), "byte(0x001234) == 6");
        assert_eq!(
            trigger_text("d0xH001234!=0x 000010"),
            "prev(byte(0x001234)) != word(0x000010)"
        );
        assert_eq!(
            render_field(&Field::memory(FieldSize::Byte, 1).with_kind(FieldType::BinaryCodedDecimal)),
            "bcd(byte(0x000001))"
        );
    }

    #[test]
    fn test_render_flags_and_hits() {
        assert_eq!(
            trigger_text("R:0xH000001=1_0xH000002=2.5."),
            "never(byte(0x000001) == 1) && repeated(5, byte(0x000002) == 2)"
        );
        assert_eq!(
            trigger_text("P:0xH000001=1.1."),
            "unless(once(byte(0x000001) == 1))"
        );
    }

    #[test]
    fn test_render_add_source_and_logic() {
        assert_eq!(
            trigger_text("A:0xH000001*2_0xH000002=6"),
            "byte(0x000001) * 2 + byte(0x000002) == 6"
        );
        assert_eq!(
            trigger_text("N:0xH000001=1_0xH000002=2"),
            "byte(0x000001) == 1 && byte(0x000002) == 2"
        );
        assert_eq!(
            trigger_text("O:0xH000001=1_0xH000002=2"),
            "(byte(0x000001) == 1 || byte(0x000002) == 2)"
        );
    }

    #[test]
    fn test_render_pointer_chain() {
        assert_eq!(
            trigger_text("I:0xX000010_0xH000004=3"),
            "byte(dword(0x000010) + 0x000004) == 3"
        );
    }

    #[test]
    fn test_render_tally_from_structure() {
        assert_eq!(
            trigger_text("C:0xH000001=1_D:0xH000002=1_0xH000003=1.10."),
            "tally(10, byte(0x000001) == 1, deduct(byte(0x000002) == 1), byte(0x000003) == 1)"
        );
    }

    #[test]
    fn test_render_alts_and_values() {
        assert_eq!(
            trigger_text("0xH000001=1S0xH000002=2S0xH000003=3"),
            "byte(0x000001) == 1 && (byte(0x000002) == 2 || byte(0x000003) == 3)"
        );
        let value = parse_value("A:0xH000001*2_M:0xH000002$M:0xX000004").unwrap();
        assert_eq!(
            render_value(&value),
            "max_of(byte(0x000001) * 2 + byte(0x000002), dword(0x000004))"
        );
    }
}
