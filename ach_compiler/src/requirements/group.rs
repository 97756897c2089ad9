//! Requirement groups, triggers and values
use super::requirement::{Requirement, RequirementType};
use super::version::SoftwareVersion;
use serde::{Deserialize, Serialize};

/// An ordered run of requirements forming one clause
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequirementGroup {
    pub requirements: Vec<Requirement>,
}

impl RequirementGroup {
    pub fn new(requirements: Vec<Requirement>) -> Self {
        Self { requirements }
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.requirements.len()
    }

    pub fn min_version(&self) -> SoftwareVersion {
        self.requirements
            .iter()
            .map(Requirement::min_version)
            .max()
            .unwrap_or(SoftwareVersion::V0_30)
    }

    /// Combining runs resolved against their terminal requirement
    pub fn chains(&self) -> Vec<RequirementEx> {
        RequirementEx::combine(&self.requirements)
    }

    /// Every combining requirement must be followed by a terminal one
    pub fn has_terminal(&self) -> bool {
        self.requirements
            .last()
            .map_or(true, |last| !last.kind.is_combining())
    }
}

/// A combining run together with the terminal requirement it feeds
#[derive(Debug, Clone, PartialEq)]
pub struct RequirementEx {
    pub requirements: Vec<Requirement>,
}

impl RequirementEx {
    /// Split a flat list at terminal requirements. A trailing run with no
    /// terminal is returned as its own incomplete chain.
    pub fn combine(requirements: &[Requirement]) -> Vec<RequirementEx> {
        let mut chains = Vec::new();
        let mut current = Vec::new();
        for requirement in requirements {
            current.push(*requirement);
            if !requirement.kind.is_combining() {
                chains.push(RequirementEx {
                    requirements: std::mem::take(&mut current),
                });
            }
        }
        if !current.is_empty() {
            chains.push(RequirementEx {
                requirements: current,
            });
        }
        chains
    }

    pub fn terminal(&self) -> Option<&Requirement> {
        self.requirements.last().filter(|r| !r.kind.is_combining())
    }

    pub fn is_complete(&self) -> bool {
        self.terminal().is_some()
    }

    /// Statically resolve a chain made of a single plain condition
    pub fn evaluate(&self) -> Option<bool> {
        match self.requirements.as_slice() {
            [single] if single.kind == RequirementType::None => single.evaluate(),
            _ => None,
        }
    }
}

/// One core group plus alternative groups OR'd together by the runtime
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub core: RequirementGroup,
    pub alts: Vec<RequirementGroup>,
}

impl Trigger {
    pub fn new(core: RequirementGroup, alts: Vec<RequirementGroup>) -> Self {
        Self { core, alts }
    }

    pub fn groups(&self) -> impl Iterator<Item = &RequirementGroup> {
        std::iter::once(&self.core).chain(self.alts.iter())
    }

    pub fn min_version(&self) -> SoftwareVersion {
        self.groups()
            .map(RequirementGroup::min_version)
            .max()
            .unwrap_or(SoftwareVersion::V0_30)
    }

    pub fn requirement_count(&self) -> usize {
        self.groups().map(RequirementGroup::len).sum()
    }
}

/// A computed number: the runtime reports the largest of the group values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Value {
    pub groups: Vec<RequirementGroup>,
}

impl Value {
    pub fn new(groups: Vec<RequirementGroup>) -> Self {
        Self { groups }
    }

    /// Oldest runtime able to read the value. Plain scaled sums fall back
    /// to the legacy format, which only depends on the memory sizes read.
    pub fn min_version(&self) -> SoftwareVersion {
        if self.is_legacy_compatible() {
            return self
                .groups
                .iter()
                .flat_map(|group| group.requirements.iter())
                .map(|r| r.left.min_version())
                .max()
                .unwrap_or(SoftwareVersion::V0_30);
        }
        self.modern_min_version()
    }

    /// Oldest runtime able to read the value in the measured format
    pub fn modern_min_version(&self) -> SoftwareVersion {
        self.groups
            .iter()
            .map(RequirementGroup::min_version)
            .max()
            .unwrap_or(SoftwareVersion::V0_30)
            .max(SoftwareVersion::V0_77)
    }

    /// True when every group is a plain sum of optionally scaled terms,
    /// which older runtimes can read in the legacy `term*factor` format
    pub fn is_legacy_compatible(&self) -> bool {
        use super::field::FieldType;
        use super::requirement::RequirementOperator;

        let plain_operand = |r: &Requirement| {
            r.hit_count == 0
                && (r.left.is_memory_reference() || r.left.kind == FieldType::Value)
                && r.left.kind != FieldType::Invert
        };

        !self.groups.is_empty()
            && self.groups.iter().all(|group| {
                let Some((last, terms)) = group.requirements.split_last() else {
                    return false;
                };
                let terms_ok = terms.iter().all(|r| {
                    plain_operand(r)
                        && matches!(
                            r.kind,
                            RequirementType::AddSource | RequirementType::SubSource
                        )
                        && match r.operator {
                            RequirementOperator::None => true,
                            RequirementOperator::Multiply => {
                                r.left.is_memory_reference()
                                    && r.right.kind == FieldType::Value
                                    && r.right.value > 1
                                    && r.right.value <= i32::MAX as u32
                            }
                            _ => false,
                        }
                });
                terms_ok
                    && last.kind == RequirementType::Measured
                    && last.operator == RequirementOperator::None
                    && plain_operand(last)
                    && (last.left.is_memory_reference() || last.left.value <= i32::MAX as u32)
                    && terms
                        .iter()
                        .all(|r| r.left.kind != FieldType::Value || r.left.value <= i32::MAX as u32)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requirements::field::{Field, FieldSize};
    use crate::requirements::requirement::RequirementOperator;

    fn byte_eq(address: u32, value: u32) -> Requirement {
        Requirement::new(
            Field::memory(FieldSize::Byte, address),
            RequirementOperator::Equal,
            Field::value(value),
        )
    }

    #[test]
    fn test_combine_splits_at_terminals() {
        let requirements = vec![
            Requirement::operand(RequirementType::AddSource, Field::memory(FieldSize::Byte, 1)),
            byte_eq(2, 3),
            byte_eq(4, 5).with_kind(RequirementType::AndNext),
            byte_eq(6, 7).with_kind(RequirementType::ResetIf),
        ];
        let chains = RequirementEx::combine(&requirements);
        assert_eq!(chains.len(), 2);
        assert_eq!(chains[0].requirements.len(), 2);
        assert_eq!(
            chains[1].terminal().map(|r| r.kind),
            Some(RequirementType::ResetIf)
        );
    }

    #[test]
    fn test_group_without_terminal_is_detected() {
        let group = RequirementGroup::new(vec![byte_eq(1, 1).with_kind(RequirementType::AndNext)]);
        assert!(!group.has_terminal());
        assert!(!group.chains()[0].is_complete());
    }

    #[test]
    fn test_legacy_compatibility() {
        let value = Value::new(vec![RequirementGroup::new(vec![
            Requirement {
                operator: RequirementOperator::Multiply,
                right: Field::value(2),
                ..Requirement::operand(RequirementType::AddSource, Field::memory(FieldSize::Byte, 1))
            },
            Requirement::operand(RequirementType::Measured, Field::memory(FieldSize::Word, 2)),
        ])]);
        assert!(value.is_legacy_compatible());

        let conditional = Value::new(vec![RequirementGroup::new(vec![byte_eq(1, 2)
            .with_kind(RequirementType::Measured)])]);
        assert!(!conditional.is_legacy_compatible());
    }

    #[test]
    fn test_trigger_min_version() {
        let trigger = Trigger::new(
            RequirementGroup::new(vec![byte_eq(1, 1)]),
            vec![RequirementGroup::new(vec![
                byte_eq(2, 2).with_kind(RequirementType::OrNext),
                byte_eq(3, 3),
            ])],
        );
        assert_eq!(trigger.min_version(), SoftwareVersion::V0_78);
        assert_eq!(trigger.requirement_count(), 3);
    }
}
