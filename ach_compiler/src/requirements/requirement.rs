//! Single requirement conditions
use super::field::{Field, FieldType};
use super::version::SoftwareVersion;
use serde::{Deserialize, Serialize};

/// Requirement flag selecting combining or terminal semantics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequirementType {
    None,
    ResetIf,
    PauseIf,
    AddSource,
    SubSource,
    AddHits,
    SubHits,
    AndNext,
    OrNext,
    Measured,
    MeasuredPercent,
    MeasuredIf,
    AddAddress,
    Trigger,
    ResetNextIf,
    Remember,
}

impl RequirementType {
    pub const ALL: [RequirementType; 16] = [
        Self::None,
        Self::ResetIf,
        Self::PauseIf,
        Self::AddSource,
        Self::SubSource,
        Self::AddHits,
        Self::SubHits,
        Self::AndNext,
        Self::OrNext,
        Self::Measured,
        Self::MeasuredPercent,
        Self::MeasuredIf,
        Self::AddAddress,
        Self::Trigger,
        Self::ResetNextIf,
        Self::Remember,
    ];

    /// Flag character written before `:`
    pub fn sigil(self) -> Option<char> {
        match self {
            Self::None => None,
            Self::ResetIf => Some('R'),
            Self::PauseIf => Some('P'),
            Self::AddSource => Some('A'),
            Self::SubSource => Some('B'),
            Self::AddHits => Some('C'),
            Self::SubHits => Some('D'),
            Self::AndNext => Some('N'),
            Self::OrNext => Some('O'),
            Self::Measured => Some('M'),
            Self::MeasuredPercent => Some('G'),
            Self::MeasuredIf => Some('Q'),
            Self::AddAddress => Some('I'),
            Self::Trigger => Some('T'),
            Self::ResetNextIf => Some('Z'),
            Self::Remember => Some('K'),
        }
    }

    pub fn from_sigil(sigil: char) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.sigil() == Some(sigil))
    }

    /// Combining kinds modify the next requirement instead of standing alone
    pub fn is_combining(self) -> bool {
        matches!(
            self,
            Self::AddSource
                | Self::SubSource
                | Self::AddHits
                | Self::SubHits
                | Self::AndNext
                | Self::OrNext
                | Self::AddAddress
                | Self::ResetNextIf
                | Self::Remember
        )
    }

    /// Kinds whose requirement accumulates a value rather than a condition
    pub fn is_value_modifier(self) -> bool {
        matches!(
            self,
            Self::AddSource | Self::SubSource | Self::AddAddress | Self::Remember
        )
    }

    pub fn is_measured(self) -> bool {
        matches!(self, Self::Measured | Self::MeasuredPercent)
    }

    pub fn min_version(self) -> SoftwareVersion {
        match self {
            Self::AndNext | Self::AddAddress => SoftwareVersion::V0_76,
            Self::Measured => SoftwareVersion::V0_77,
            Self::OrNext | Self::SubHits | Self::MeasuredIf | Self::Trigger => {
                SoftwareVersion::V0_78
            }
            Self::ResetNextIf | Self::MeasuredPercent => SoftwareVersion::V1_0,
            Self::Remember => SoftwareVersion::V1_3,
            _ => SoftwareVersion::V0_30,
        }
    }

    /// Script function that produces this flag
    pub fn function_name(self) -> &'static str {
        match self {
            Self::None => "",
            Self::ResetIf => "never",
            Self::PauseIf => "unless",
            Self::AddSource => "+",
            Self::SubSource => "-",
            Self::AddHits => "tally",
            Self::SubHits => "deduct",
            Self::AndNext => "&&",
            Self::OrNext => "||",
            Self::Measured | Self::MeasuredPercent => "measured",
            Self::MeasuredIf => "when",
            Self::AddAddress => "pointer",
            Self::Trigger => "trigger_when",
            Self::ResetNextIf => "never",
            Self::Remember => "remember",
        }
    }
}

/// Comparison or combining operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequirementOperator {
    None,
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Multiply,
    Divide,
    BitwiseAnd,
    BitwiseXor,
    Modulus,
    Add,
    Subtract,
}

impl RequirementOperator {
    pub const ALL: [RequirementOperator; 13] = [
        Self::Equal,
        Self::NotEqual,
        Self::LessThan,
        Self::LessThanOrEqual,
        Self::GreaterThan,
        Self::GreaterThanOrEqual,
        Self::Multiply,
        Self::Divide,
        Self::BitwiseAnd,
        Self::BitwiseXor,
        Self::Modulus,
        Self::Add,
        Self::Subtract,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::BitwiseAnd => "&",
            Self::BitwiseXor => "^",
            Self::Modulus => "%",
            Self::Add => "+",
            Self::Subtract => "-",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Equal
                | Self::NotEqual
                | Self::LessThan
                | Self::LessThanOrEqual
                | Self::GreaterThan
                | Self::GreaterThanOrEqual
        )
    }

    pub fn is_modifier(self) -> bool {
        !self.is_comparison() && self != Self::None
    }

    /// Operator for `!(a op b)`
    pub fn opposite(self) -> Self {
        match self {
            Self::Equal => Self::NotEqual,
            Self::NotEqual => Self::Equal,
            Self::LessThan => Self::GreaterThanOrEqual,
            Self::LessThanOrEqual => Self::GreaterThan,
            Self::GreaterThan => Self::LessThanOrEqual,
            Self::GreaterThanOrEqual => Self::LessThan,
            other => other,
        }
    }

    /// Operator for `b op a` equivalent to `a op b`
    pub fn reversed(self) -> Self {
        match self {
            Self::LessThan => Self::GreaterThan,
            Self::LessThanOrEqual => Self::GreaterThanOrEqual,
            Self::GreaterThan => Self::LessThan,
            Self::GreaterThanOrEqual => Self::LessThanOrEqual,
            other => other,
        }
    }

    pub fn min_version(self) -> SoftwareVersion {
        match self {
            Self::Multiply | Self::Divide | Self::BitwiseAnd => SoftwareVersion::V0_78,
            Self::BitwiseXor => SoftwareVersion::V1_1,
            Self::Modulus | Self::Add | Self::Subtract => SoftwareVersion::V1_3,
            _ => SoftwareVersion::V0_30,
        }
    }

    /// Apply a comparison to two known values
    pub fn compare(self, left: f64, right: f64) -> Option<bool> {
        match self {
            Self::Equal => Some(left == right),
            Self::NotEqual => Some(left != right),
            Self::LessThan => Some(left < right),
            Self::LessThanOrEqual => Some(left <= right),
            Self::GreaterThan => Some(left > right),
            Self::GreaterThanOrEqual => Some(left >= right),
            _ => None,
        }
    }
}

/// One condition of a requirement group
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    pub kind: RequirementType,
    pub left: Field,
    pub operator: RequirementOperator,
    pub right: Field,
    /// 0 means the condition must hold on the current frame
    pub hit_count: u32,
}

impl Requirement {
    pub fn new(left: Field, operator: RequirementOperator, right: Field) -> Self {
        Self {
            kind: RequirementType::None,
            left,
            operator,
            right,
            hit_count: 0,
        }
    }

    /// A requirement with no operator, used by value modifiers and measured values
    pub fn operand(kind: RequirementType, left: Field) -> Self {
        Self {
            kind,
            left,
            operator: RequirementOperator::None,
            right: Field::value(0),
            hit_count: 0,
        }
    }

    pub fn always_true() -> Self {
        Self::new(Field::value(1), RequirementOperator::Equal, Field::value(1))
    }

    pub fn always_false() -> Self {
        Self::new(Field::value(0), RequirementOperator::Equal, Field::value(1))
    }

    pub fn with_kind(self, kind: RequirementType) -> Self {
        Self { kind, ..self }
    }

    pub fn with_hit_count(self, hit_count: u32) -> Self {
        Self { hit_count, ..self }
    }

    /// Statically resolve the requirement when possible
    pub fn evaluate(&self) -> Option<bool> {
        if !self.operator.is_comparison() {
            return None;
        }

        let result = if let (Some(left), Some(right)) =
            (self.left.constant_value(), self.right.constant_value())
        {
            self.operator.compare(left, right)
        } else if self.left.is_memory_reference() && self.left == self.right {
            Some(matches!(
                self.operator,
                RequirementOperator::Equal
                    | RequirementOperator::LessThanOrEqual
                    | RequirementOperator::GreaterThanOrEqual
            ))
        } else if self.right.kind == FieldType::Value && self.left.is_memory_reference() {
            self.evaluate_against_range()
        } else {
            None
        };

        // A condition needing several frames cannot be settled by one look
        match result {
            Some(_) if self.hit_count > 1 => None,
            other => other,
        }
    }

    /// Comparisons that are decided by the operand's value range
    fn evaluate_against_range(&self) -> Option<bool> {
        let max = self.left.max_value() as u64;
        let value = self.right.value as u64;
        if self.left.size.is_float() {
            return None;
        }
        match self.operator {
            RequirementOperator::GreaterThan if value >= max => Some(false),
            RequirementOperator::GreaterThanOrEqual if value == 0 => Some(true),
            RequirementOperator::LessThan if value == 0 => Some(false),
            RequirementOperator::LessThanOrEqual if value >= max => Some(true),
            RequirementOperator::Equal if value > max => Some(false),
            RequirementOperator::NotEqual if value > max => Some(true),
            _ => None,
        }
    }

    pub fn min_version(&self) -> SoftwareVersion {
        let mut version = self
            .kind
            .min_version()
            .max(self.operator.min_version())
            .max(self.left.min_version());
        if self.operator != RequirementOperator::None {
            version = version.max(self.right.min_version());
        }
        version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requirements::field::FieldSize;

    fn byte(address: u32) -> Field {
        Field::memory(FieldSize::Byte, address)
    }

    #[test]
    fn test_evaluate_constants() {
        assert_eq!(Requirement::always_true().evaluate(), Some(true));
        assert_eq!(Requirement::always_false().evaluate(), Some(false));
    }

    #[test]
    fn test_evaluate_same_memory_reference() {
        let same = |op| Requirement::new(byte(0x1234), op, byte(0x1234)).evaluate();
        assert_eq!(same(RequirementOperator::Equal), Some(true));
        assert_eq!(same(RequirementOperator::GreaterThanOrEqual), Some(true));
        assert_eq!(same(RequirementOperator::LessThanOrEqual), Some(true));
        assert_eq!(same(RequirementOperator::NotEqual), Some(false));
        assert_eq!(same(RequirementOperator::LessThan), Some(false));

        let delta = Requirement::new(
            byte(0x1234),
            RequirementOperator::Equal,
            byte(0x1234).with_kind(FieldType::PreviousValue),
        );
        assert_eq!(delta.evaluate(), None);
    }

    #[test]
    fn test_hit_count_forces_unknown() {
        let requirement = Requirement::always_true().with_hit_count(3);
        assert_eq!(requirement.evaluate(), None);
        assert_eq!(
            Requirement::always_true().with_hit_count(1).evaluate(),
            Some(true)
        );
    }

    #[test]
    fn test_range_evaluation() {
        let r = Requirement::new(byte(1), RequirementOperator::GreaterThan, Field::value(255));
        assert_eq!(r.evaluate(), Some(false));
        let r = Requirement::new(byte(1), RequirementOperator::Equal, Field::value(7));
        assert_eq!(r.evaluate(), None);
    }

    #[test]
    fn test_large_constants_compare_unsigned() {
        let compare = |left: u32, op, right: u32| {
            Requirement::new(Field::value(left), op, Field::value(right)).evaluate()
        };
        assert_eq!(compare(1, RequirementOperator::LessThan, 0x8000_0000), Some(true));
        assert_eq!(compare(0xFFFF_FFFF, RequirementOperator::GreaterThan, 1), Some(true));
        assert_eq!(compare(0x8000_0000, RequirementOperator::GreaterThan, 0x7FFF_FFFF), Some(true));
        assert_eq!(Field::value(0xFFFF_FFFF).constant_value(), Some(4_294_967_295.0));
    }

    #[test]
    fn test_operator_inversions() {
        for op in RequirementOperator::ALL.iter().filter(|op| op.is_comparison()) {
            assert_eq!(op.opposite().opposite(), *op);
            assert_eq!(op.reversed().reversed(), *op);
        }
        assert_eq!(
            RequirementOperator::LessThan.opposite(),
            RequirementOperator::GreaterThanOrEqual
        );
    }

    #[test]
    fn test_min_version_folds_parts() {
        let r = Requirement::new(
            Field::memory(FieldSize::Float, 4),
            RequirementOperator::Equal,
            Field::value(1),
        )
        .with_kind(RequirementType::AndNext);
        assert_eq!(r.min_version(), SoftwareVersion::V1_0);
        assert_eq!(
            RequirementType::from_sigil('Z'),
            Some(RequirementType::ResetNextIf)
        );
    }
}
