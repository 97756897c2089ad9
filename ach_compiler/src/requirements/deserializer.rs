//! Decoding of serialized requirements
//!
//! Groups are read sequentially rather than split on `S`, since `S` is also
//! the bit-6 size sigil inside a memory reference.

use super::error::{SerializationError, SerializationResult};
use super::field::{Field, FieldSize, FieldType};
use super::group::{RequirementGroup, Trigger, Value};
use super::requirement::{Requirement, RequirementOperator, RequirementType};
use crate::config::constants::compile_time::serialization::*;

/// Cursor over serialized text
struct Reader<'a> {
    text: &'a str,
    position: usize,
}

impl<'a> Reader<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, position: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.position..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.text.len()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.position += ch.len_utf8();
        Some(ch)
    }

    fn eat(&mut self, expected: &str) -> bool {
        if self.rest().starts_with(expected) {
            self.position += expected.len();
            true
        } else {
            false
        }
    }

    fn take_while(&mut self, predicate: impl Fn(char) -> bool) -> &'a str {
        let start = self.position;
        while let Some(ch) = self.peek() {
            if !predicate(ch) {
                break;
            }
            self.position += ch.len_utf8();
        }
        &self.text[start..self.position]
    }

    fn error(&self, message: &str) -> SerializationError {
        SerializationError::invalid_format(message, self.position)
    }
}

pub fn parse_field(text: &str) -> SerializationResult<Field> {
    let mut reader = Reader::new(text);
    let field = read_field(&mut reader)?;
    if !reader.is_at_end() {
        return Err(reader.error("Unexpected text after field"));
    }
    Ok(field)
}

fn read_field(reader: &mut Reader<'_>) -> SerializationResult<Field> {
    if reader.eat("{recall}") {
        return Ok(Field::recall());
    }

    let start = reader.position;
    let kind = match (reader.peek(), reader.peek_at(1)) {
        (Some(prefix), Some('0' | 'f')) => match FieldType::from_prefix(prefix) {
            Some(kind) => {
                reader.bump();
                kind
            }
            None => FieldType::MemoryAddress,
        },
        _ => FieldType::MemoryAddress,
    };

    if reader.eat("0x") || reader.eat("0X") {
        let size = match reader.peek() {
            Some(ch) if ch.is_ascii_hexdigit() => FieldSize::Word,
            Some(ch) => {
                reader.bump();
                FieldSize::from_integer_sigil(ch).ok_or_else(|| {
                    SerializationError::InvalidField {
                        text: reader.text[start..reader.position].to_string(),
                    }
                })?
            }
            None => return Err(reader.error("Missing memory size")),
        };
        let address = read_address(reader)?;
        return Ok(Field::memory(size, address).with_kind(kind));
    }

    if reader.peek() == Some('f') {
        if let Some(size) = reader.peek_at(1).and_then(FieldSize::from_float_sigil) {
            reader.bump();
            reader.bump();
            let address = read_address(reader)?;
            return Ok(Field::memory(size, address).with_kind(kind));
        }
        if kind != FieldType::MemoryAddress {
            return Err(SerializationError::InvalidField {
                text: reader.text[start..reader.position].to_string(),
            });
        }
        reader.bump();
        let number_start = reader.position;
        reader.eat("-");
        reader.take_while(|c| c.is_ascii_digit());
        // A '.' not followed by a digit starts a hit count
        if reader.peek() == Some('.') && reader.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            reader.bump();
            reader.take_while(|c| c.is_ascii_digit());
        }
        let number = &reader.text[number_start..reader.position];
        return number
            .parse::<f32>()
            .map(Field::float)
            .map_err(|_| SerializationError::InvalidField {
                text: number.to_string(),
            });
    }

    if kind != FieldType::MemoryAddress {
        return Err(reader.error("Prefix must be followed by a memory reference"));
    }

    if reader.peek() == Some('h') {
        reader.bump();
        let digits = reader.take_while(|c| c.is_ascii_hexdigit());
        return u32::from_str_radix(digits, 16)
            .map(Field::value)
            .map_err(|_| SerializationError::InvalidField {
                text: digits.to_string(),
            });
    }

    let negative = reader.eat("-");
    let digits = reader.take_while(|c| c.is_ascii_digit());
    let value: i64 = digits.parse().map_err(|_| SerializationError::InvalidField {
        text: reader.text[start..reader.position].to_string(),
    })?;
    let value = if negative { -value } else { value };
    if value < i32::MIN as i64 || value > u32::MAX as i64 {
        return Err(SerializationError::InvalidField {
            text: value.to_string(),
        });
    }
    Ok(Field::value(value as u32))
}

fn read_address(reader: &mut Reader<'_>) -> SerializationResult<u32> {
    let digits = reader.take_while(|c| c.is_ascii_hexdigit());
    if digits.is_empty() || digits.len() > MAX_ADDRESS_WIDTH {
        return Err(SerializationError::InvalidAddress {
            text: digits.to_string(),
        });
    }
    u32::from_str_radix(digits, 16).map_err(|_| SerializationError::InvalidAddress {
        text: digits.to_string(),
    })
}

fn read_operator(reader: &mut Reader<'_>) -> RequirementOperator {
    // Two-character operators first
    for operator in [
        RequirementOperator::NotEqual,
        RequirementOperator::LessThanOrEqual,
        RequirementOperator::GreaterThanOrEqual,
    ] {
        if reader.eat(operator.as_str()) {
            return operator;
        }
    }
    for operator in RequirementOperator::ALL {
        if reader.eat(operator.as_str()) {
            return operator;
        }
    }
    RequirementOperator::None
}

fn read_requirement(reader: &mut Reader<'_>) -> SerializationResult<Requirement> {
    let mut kind = RequirementType::None;
    if let (Some(flag), Some(':')) = (reader.peek(), reader.peek_at(1)) {
        kind = RequirementType::from_sigil(flag)
            .ok_or_else(|| reader.error(&format!("Unknown requirement flag '{}'", flag)))?;
        reader.bump();
        reader.bump();
    }

    let left = read_field(reader)?;
    let operator = read_operator(reader);
    let right = if operator == RequirementOperator::None {
        Field::value(0)
    } else {
        read_field(reader)?
    };

    let mut hit_count = 0;
    if reader.peek() == Some('.') {
        reader.bump();
        let digits = reader.take_while(|c| c.is_ascii_digit());
        hit_count = digits
            .parse()
            .map_err(|_| reader.error("Malformed hit count"))?;
        if !reader.eat(".") {
            return Err(reader.error("Unterminated hit count"));
        }
    }

    Ok(Requirement {
        kind,
        left,
        operator,
        right,
        hit_count,
    })
}

/// Read requirements up to a group boundary (`S`, `$`, `::` or end)
fn read_group(reader: &mut Reader<'_>) -> SerializationResult<RequirementGroup> {
    let mut requirements = Vec::new();
    loop {
        match reader.peek() {
            None | Some(GROUP_SEPARATOR) | Some(VALUE_SEPARATOR) => break,
            _ if reader.rest().starts_with(LEADERBOARD_SEPARATOR) => break,
            _ => {}
        }
        requirements.push(read_requirement(reader)?);
        if reader.peek() == Some(REQUIREMENT_SEPARATOR) {
            reader.bump();
        }
    }
    Ok(RequirementGroup::new(requirements))
}

pub fn parse_requirement(text: &str) -> SerializationResult<Requirement> {
    let mut reader = Reader::new(text);
    let requirement = read_requirement(&mut reader)?;
    if !reader.is_at_end() {
        return Err(reader.error("Unexpected text after requirement"));
    }
    Ok(requirement)
}

pub fn parse_trigger(text: &str) -> SerializationResult<Trigger> {
    let mut reader = Reader::new(text);
    let trigger = read_trigger(&mut reader)?;
    if !reader.is_at_end() {
        return Err(reader.error("Unexpected text after trigger"));
    }
    Ok(trigger)
}

fn read_trigger(reader: &mut Reader<'_>) -> SerializationResult<Trigger> {
    let core = read_group(reader)?;
    let mut alts = Vec::new();
    while reader.peek() == Some(GROUP_SEPARATOR) {
        reader.bump();
        alts.push(read_group(reader)?);
    }
    Ok(Trigger::new(core, alts))
}

/// Parse a value in either the measured or the legacy format
pub fn parse_value(text: &str) -> SerializationResult<Value> {
    let mut groups = Vec::new();
    for (index, part) in text.split(VALUE_SEPARATOR).enumerate() {
        let group = if part.contains(':') {
            let mut reader = Reader::new(part);
            let group = read_group(&mut reader)?;
            if !reader.is_at_end() {
                return Err(reader.error("Unexpected text in value"));
            }
            group
        } else {
            parse_legacy_group(part).map_err(|error| match error {
                SerializationError::InvalidFormat { message, .. } => {
                    SerializationError::InvalidFormat {
                        message: format!("value group {}: {}", index, message),
                        position: 0,
                    }
                }
                other => other,
            })?
        };
        groups.push(group);
    }
    Ok(Value::new(groups))
}

fn parse_legacy_group(text: &str) -> SerializationResult<RequirementGroup> {
    let terms: Vec<&str> = text.split(REQUIREMENT_SEPARATOR).collect();
    let mut requirements = Vec::with_capacity(terms.len());

    for (index, term) in terms.iter().enumerate() {
        let is_last = index + 1 == terms.len();

        let requirement = if let Some(constant) = term.strip_prefix('v') {
            let (negative, digits) = match constant.strip_prefix('-') {
                Some(digits) => (true, digits),
                None => (false, constant),
            };
            let value: u32 = digits.parse().map_err(|_| SerializationError::InvalidField {
                text: term.to_string(),
            })?;
            let kind = if negative {
                RequirementType::SubSource
            } else {
                RequirementType::AddSource
            };
            Requirement::operand(kind, Field::value(value))
        } else {
            let (field_text, factor) = match term.split_once('*') {
                Some((field, factor)) => {
                    let factor: i64 = factor.parse().map_err(|_| SerializationError::InvalidField {
                        text: term.to_string(),
                    })?;
                    (field, factor)
                }
                None => (*term, 1),
            };
            let field = parse_field(field_text)?;
            let kind = if factor < 0 {
                RequirementType::SubSource
            } else {
                RequirementType::AddSource
            };
            let magnitude = factor.unsigned_abs();
            if magnitude == 1 {
                Requirement::operand(kind, field)
            } else {
                Requirement {
                    operator: RequirementOperator::Multiply,
                    right: Field::value(magnitude as u32),
                    ..Requirement::operand(kind, field)
                }
            }
        };

        if is_last {
            if requirement.kind != RequirementType::AddSource
                || requirement.operator != RequirementOperator::None
            {
                return Err(SerializationError::invalid_format(
                    "Last legacy term must be an unscaled positive value",
                    0,
                ));
            }
            requirements.push(requirement.with_kind(RequirementType::Measured));
        } else {
            requirements.push(requirement);
        }
    }

    Ok(RequirementGroup::new(requirements))
}

/// Leaderboard parts in `STA`, `CAN`, `SUB`, `VAL` order
pub fn parse_leaderboard(text: &str) -> SerializationResult<(Trigger, Trigger, Trigger, Value)> {
    let mut start = None;
    let mut cancel = None;
    let mut submit = None;
    let mut value = None;

    for part in text.split(LEADERBOARD_SEPARATOR) {
        let (tag, body) = match (part.get(..4), part.get(4..)) {
            (Some(tag), Some(body)) => (tag, body),
            _ => (part, ""),
        };
        match tag {
            "STA:" => start = Some(parse_trigger(body)?),
            "CAN:" => cancel = Some(parse_trigger(body)?),
            "SUB:" => submit = Some(parse_trigger(body)?),
            "VAL:" => value = Some(parse_value(body)?),
            _ => {
                return Err(SerializationError::invalid_format(
                    &format!("Unknown leaderboard part '{}'", part),
                    0,
                ))
            }
        }
    }

    match (start, cancel, submit, value) {
        (Some(start), Some(cancel), Some(submit), Some(value)) => Ok((start, cancel, submit, value)),
        _ => Err(SerializationError::invalid_format(
            "Leaderboard requires STA, CAN, SUB and VAL parts",
            0,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requirements::serializer::*;
    use crate::requirements::version::SoftwareVersion;
    use assert_matches::assert_matches;

    fn byte(address: u32) -> Field {
        Field::memory(FieldSize::Byte, address)
    }

    #[test]
    fn test_parse_fields() {
        assert_eq!(parse_field("0xH001234").unwrap(), byte(0x1234));
        assert_eq!(
            parse_field("0x 001234").unwrap(),
            Field::memory(FieldSize::Word, 0x1234)
        );
        assert_eq!(
            parse_field("0x1234").unwrap(),
            Field::memory(FieldSize::Word, 0x1234)
        );
        assert_eq!(
            parse_field("d0xS0000ff").unwrap(),
            Field::memory(FieldSize::Bit6, 0xff).with_kind(FieldType::PreviousValue)
        );
        assert_eq!(
            parse_field("~fB000010").unwrap(),
            Field::memory(FieldSize::BigEndianFloat, 0x10).with_kind(FieldType::Invert)
        );
        assert_eq!(parse_field("-2").unwrap(), Field::signed(-2));
        assert_eq!(parse_field("h1F").unwrap(), Field::value(0x1f));
        assert_eq!(parse_field("f1.5").unwrap(), Field::float(1.5));
        assert_eq!(parse_field("{recall}").unwrap(), Field::recall());
        assert_matches!(
            parse_field("0xZ1234"),
            Err(SerializationError::InvalidField { .. })
        );
    }

    #[test]
    fn test_parse_requirement_with_hits() {
        let requirement = parse_requirement("R:0xH001234=6.3.").unwrap();
        assert_eq!(requirement.kind, RequirementType::ResetIf);
        assert_eq!(requirement.operator, RequirementOperator::Equal);
        assert_eq!(requirement.right, Field::value(6));
        assert_eq!(requirement.hit_count, 3);

        let float = parse_requirement("fF000010>f1.5.2.").unwrap();
        assert_eq!(float.right, Field::float(1.5));
        assert_eq!(float.hit_count, 2);
    }

    #[test]
    fn test_trigger_with_bit6_sigil() {
        let trigger = parse_trigger("0xS000010=1S0xH000020=2_0xS000030=0").unwrap();
        assert_eq!(trigger.core.len(), 1);
        assert_eq!(trigger.alts.len(), 1);
        assert_eq!(trigger.alts[0].len(), 2);
        assert_eq!(trigger.core.requirements[0].left.size, FieldSize::Bit6);
    }

    #[test]
    fn test_round_trip_every_flag_size_and_operator() {
        let context = SerializationContext::new().with_min_version(SoftwareVersion::V1_3);
        for kind in RequirementType::ALL {
            for size in FieldSize::ALL_MEMORY {
                for operator in RequirementOperator::ALL {
                    let requirement = Requirement {
                        kind,
                        left: Field::memory(size, 0x12ab),
                        operator,
                        right: Field::value(17),
                        hit_count: 4,
                    };
                    let trigger = Trigger::new(
                        RequirementGroup::new(vec![requirement, Requirement::always_true()]),
                        vec![],
                    );
                    let text = serialize_trigger(&trigger, &context).unwrap();
                    assert_eq!(parse_trigger(&text).unwrap(), trigger, "{}", text);
                }
            }
        }
    }

    #[test]
    fn test_round_trip_field_kinds() {
        let context = SerializationContext::new();
        let kinds = [
            FieldType::MemoryAddress,
            FieldType::PreviousValue,
            FieldType::PriorValue,
            FieldType::BinaryCodedDecimal,
            FieldType::Invert,
        ];
        let mut fields: Vec<Field> = kinds.iter().map(|k| byte(0x40).with_kind(*k)).collect();
        fields.extend([
            Field::signed(-7),
            Field::value(u32::MAX - 1),
            Field::float(-0.25),
            Field::float(3.0),
            Field::recall(),
        ]);
        for field in fields {
            let mut text = String::new();
            serialize_field(&field, &context, &mut text);
            let parsed = parse_field(&text).unwrap();
            assert_eq!(parsed, field, "{}", text);
            assert_eq!(parsed.kind, field.kind);
        }
    }

    #[test]
    fn test_round_trip_values_and_leaderboards() {
        let value = Value::new(vec![
            RequirementGroup::new(vec![
                Requirement {
                    operator: RequirementOperator::Multiply,
                    right: Field::value(3),
                    ..Requirement::operand(RequirementType::SubSource, byte(1))
                },
                Requirement::operand(RequirementType::AddSource, Field::value(5)),
                Requirement::operand(RequirementType::Measured, byte(2)),
            ]),
            RequirementGroup::new(vec![Requirement::operand(
                RequirementType::Measured,
                Field::memory(FieldSize::DWord, 8),
            )]),
        ]);

        for context in [
            SerializationContext::new(),
            SerializationContext::new().with_min_version(SoftwareVersion::V0_78),
        ] {
            let text = serialize_value(&value, &context).unwrap();
            assert_eq!(parse_value(&text).unwrap(), value, "{}", text);
        }

        let trigger = Trigger::new(
            RequirementGroup::new(vec![Requirement::new(
                byte(3),
                RequirementOperator::Equal,
                Field::value(1),
            )]),
            vec![],
        );
        let text = serialize_leaderboard(
            &trigger,
            &trigger,
            &trigger,
            &value,
            &SerializationContext::new(),
        )
        .unwrap();
        assert!(text.starts_with("STA:0xH000003=1::CAN:"));
        let (start, _, _, parsed_value) = parse_leaderboard(&text).unwrap();
        assert_eq!(start, trigger);
        assert_eq!(parsed_value, value);
    }

    /// Every known runtime at or above the minimum reads back what it was
    /// given; older runtimes are refused with the version they lack
    fn assert_version_sweep<T, S, P>(item: &T, required: SoftwareVersion, serialize: S, parse: P)
    where
        T: PartialEq + std::fmt::Debug,
        S: Fn(&T, &SerializationContext) -> SerializationResult<String>,
        P: Fn(&str) -> SerializationResult<T>,
    {
        for version in SoftwareVersion::KNOWN {
            let context = SerializationContext::new().with_min_version(version);
            let result = serialize(item, &context);
            if version >= required {
                let text = result.unwrap_or_else(|e| panic!("{} at {}: {}", required, version, e));
                assert_eq!(&parse(&text).unwrap(), item, "{} at {}", text, version);
            } else {
                assert_matches!(
                    result,
                    Err(SerializationError::UnsupportedVersion { required: r, target })
                        if r == required && target == version,
                    "{:?} at {}",
                    item,
                    version
                );
            }
        }
    }

    #[test]
    fn test_trigger_round_trip_across_versions() {
        let mut triggers: Vec<Trigger> = RequirementType::ALL
            .iter()
            .map(|&kind| {
                let requirement = Requirement {
                    kind,
                    ..Requirement::new(byte(0x20), RequirementOperator::Equal, Field::value(3))
                };
                Trigger::new(
                    RequirementGroup::new(vec![requirement, Requirement::always_true()]),
                    vec![],
                )
            })
            .collect();
        triggers.extend(RequirementOperator::ALL.iter().map(|&operator| {
            let requirement = Requirement {
                operator,
                right: Field::value(2),
                ..Requirement::operand(RequirementType::AddSource, byte(0x30))
            };
            Trigger::new(
                RequirementGroup::new(vec![requirement, Requirement::always_true()]),
                vec![RequirementGroup::new(vec![Requirement::new(
                    Field::memory(FieldSize::BitCount, 0x40),
                    RequirementOperator::GreaterThanOrEqual,
                    Field::value(1),
                )])],
            )
        }));

        for trigger in &triggers {
            assert_version_sweep(trigger, trigger.min_version(), serialize_trigger, parse_trigger);
        }
    }

    #[test]
    fn test_value_round_trip_across_versions() {
        let scaled = Value::new(vec![RequirementGroup::new(vec![
            Requirement {
                operator: RequirementOperator::Multiply,
                right: Field::value(4),
                ..Requirement::operand(RequirementType::AddSource, byte(1))
            },
            Requirement::operand(RequirementType::SubSource, byte(2)),
            Requirement::operand(RequirementType::Measured, Field::memory(FieldSize::Word, 3)),
        ])]);
        let conditional = Value::new(vec![RequirementGroup::new(vec![
            Requirement {
                kind: RequirementType::MeasuredIf,
                ..Requirement::new(byte(4), RequirementOperator::Equal, Field::value(1))
            },
            Requirement::operand(RequirementType::Measured, byte(5)),
        ])]);
        assert!(scaled.is_legacy_compatible());
        assert!(!conditional.is_legacy_compatible());

        for value in [&scaled, &conditional] {
            assert_version_sweep(value, value.min_version(), serialize_value, parse_value);
        }
    }

    #[test]
    fn test_malformed_input() {
        assert_matches!(
            parse_trigger("0xH001234=6.3"),
            Err(SerializationError::InvalidFormat { .. })
        );
        assert_matches!(
            parse_trigger("X:0xH001234=6"),
            Err(SerializationError::InvalidFormat { .. })
        );
        assert!(parse_leaderboard("STA:0=1::VAL:0xH1").is_err());
    }
}
