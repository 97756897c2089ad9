//! Requirement operands
//!
//! A [`Field`] is either a view of memory (current, previous, prior, BCD
//! decoded or inverted), a literal integer or float, or the value stored by
//! the last `Remember` requirement.

use super::version::SoftwareVersion;
use serde::{Deserialize, Serialize};

/// How many bytes are read and how they are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldSize {
    /// Constants have no size
    None,
    Bit0,
    Bit1,
    Bit2,
    Bit3,
    Bit4,
    Bit5,
    Bit6,
    Bit7,
    LowNibble,
    HighNibble,
    Byte,
    Word,
    TByte,
    DWord,
    BigEndianWord,
    BigEndianTByte,
    BigEndianDWord,
    BitCount,
    Float,
    BigEndianFloat,
    MBF32,
    LittleEndianMBF32,
    Double32,
    BigEndianDouble32,
}

impl FieldSize {
    pub const ALL_MEMORY: [FieldSize; 24] = [
        Self::Bit0,
        Self::Bit1,
        Self::Bit2,
        Self::Bit3,
        Self::Bit4,
        Self::Bit5,
        Self::Bit6,
        Self::Bit7,
        Self::LowNibble,
        Self::HighNibble,
        Self::Byte,
        Self::Word,
        Self::TByte,
        Self::DWord,
        Self::BigEndianWord,
        Self::BigEndianTByte,
        Self::BigEndianDWord,
        Self::BitCount,
        Self::Float,
        Self::BigEndianFloat,
        Self::MBF32,
        Self::LittleEndianMBF32,
        Self::Double32,
        Self::BigEndianDouble32,
    ];

    /// Size sigil written after `0x` (integer sizes) or `f` (float sizes)
    pub fn sigil(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Bit0 => "M",
            Self::Bit1 => "N",
            Self::Bit2 => "O",
            Self::Bit3 => "P",
            Self::Bit4 => "Q",
            Self::Bit5 => "R",
            Self::Bit6 => "S",
            Self::Bit7 => "T",
            Self::LowNibble => "L",
            Self::HighNibble => "U",
            Self::Byte => "H",
            Self::Word => " ",
            Self::TByte => "W",
            Self::DWord => "X",
            Self::BigEndianWord => "I",
            Self::BigEndianTByte => "J",
            Self::BigEndianDWord => "G",
            Self::BitCount => "K",
            Self::Float => "F",
            Self::BigEndianFloat => "B",
            Self::MBF32 => "M",
            Self::LittleEndianMBF32 => "L",
            Self::Double32 => "H",
            Self::BigEndianDouble32 => "I",
        }
    }

    pub fn from_integer_sigil(sigil: char) -> Option<Self> {
        Self::ALL_MEMORY
            .iter()
            .copied()
            .filter(|size| !size.is_float())
            .find(|size| size.sigil().starts_with(sigil))
    }

    pub fn from_float_sigil(sigil: char) -> Option<Self> {
        Self::ALL_MEMORY
            .iter()
            .copied()
            .filter(|size| size.is_float())
            .find(|size| size.sigil().starts_with(sigil))
    }

    pub fn is_float(self) -> bool {
        matches!(
            self,
            Self::Float
                | Self::BigEndianFloat
                | Self::MBF32
                | Self::LittleEndianMBF32
                | Self::Double32
                | Self::BigEndianDouble32
        )
    }

    pub fn is_big_endian(self) -> bool {
        matches!(
            self,
            Self::BigEndianWord
                | Self::BigEndianTByte
                | Self::BigEndianDWord
                | Self::BigEndianFloat
                | Self::BigEndianDouble32
        )
    }

    /// Largest value a read of this size can produce
    pub fn max_value(self) -> u32 {
        match self {
            Self::None => u32::MAX,
            Self::Bit0
            | Self::Bit1
            | Self::Bit2
            | Self::Bit3
            | Self::Bit4
            | Self::Bit5
            | Self::Bit6
            | Self::Bit7 => 1,
            Self::LowNibble | Self::HighNibble => 0x0F,
            Self::Byte => 0xFF,
            Self::Word | Self::BigEndianWord => 0xFFFF,
            Self::TByte | Self::BigEndianTByte => 0xFF_FFFF,
            Self::BitCount => 8,
            _ => u32::MAX,
        }
    }

    /// Number of bytes touched by a read
    pub fn byte_size(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Word | Self::BigEndianWord => 2,
            Self::TByte | Self::BigEndianTByte => 3,
            Self::DWord
            | Self::BigEndianDWord
            | Self::Float
            | Self::BigEndianFloat
            | Self::MBF32
            | Self::LittleEndianMBF32
            | Self::Double32
            | Self::BigEndianDouble32 => 4,
            _ => 1,
        }
    }

    pub fn min_version(self) -> SoftwareVersion {
        match self {
            Self::TByte => SoftwareVersion::V0_73,
            Self::BitCount => SoftwareVersion::V0_77,
            Self::BigEndianWord
            | Self::BigEndianTByte
            | Self::BigEndianDWord
            | Self::Float
            | Self::MBF32 => SoftwareVersion::V1_0,
            Self::BigEndianFloat | Self::LittleEndianMBF32 => SoftwareVersion::V1_1,
            Self::Double32 | Self::BigEndianDouble32 => SoftwareVersion::V1_3,
            _ => SoftwareVersion::V0_30,
        }
    }

    /// Script function that reads this size
    pub fn function_name(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Bit0 => "bit0",
            Self::Bit1 => "bit1",
            Self::Bit2 => "bit2",
            Self::Bit3 => "bit3",
            Self::Bit4 => "bit4",
            Self::Bit5 => "bit5",
            Self::Bit6 => "bit6",
            Self::Bit7 => "bit7",
            Self::LowNibble => "low4",
            Self::HighNibble => "high4",
            Self::Byte => "byte",
            Self::Word => "word",
            Self::TByte => "tbyte",
            Self::DWord => "dword",
            Self::BigEndianWord => "word_be",
            Self::BigEndianTByte => "tbyte_be",
            Self::BigEndianDWord => "dword_be",
            Self::BitCount => "bitcount",
            Self::Float => "float",
            Self::BigEndianFloat => "float_be",
            Self::MBF32 => "mbf32",
            Self::LittleEndianMBF32 => "mbf32_le",
            Self::Double32 => "double32",
            Self::BigEndianDouble32 => "double32_be",
        }
    }

    pub fn from_function_name(name: &str) -> Option<Self> {
        Self::ALL_MEMORY
            .iter()
            .copied()
            .find(|size| size.function_name() == name)
    }

    /// Bit size for `bit(index, address)`
    pub fn bit(index: u32) -> Option<Self> {
        match index {
            0 => Some(Self::Bit0),
            1 => Some(Self::Bit1),
            2 => Some(Self::Bit2),
            3 => Some(Self::Bit3),
            4 => Some(Self::Bit4),
            5 => Some(Self::Bit5),
            6 => Some(Self::Bit6),
            7 => Some(Self::Bit7),
            _ => None,
        }
    }
}

/// Operand kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    MemoryAddress,
    Value,
    PreviousValue,
    PriorValue,
    BinaryCodedDecimal,
    Invert,
    Float,
    Recall,
}

impl FieldType {
    /// Prefix written before `0x`
    pub fn prefix(self) -> &'static str {
        match self {
            Self::PreviousValue => "d",
            Self::PriorValue => "p",
            Self::BinaryCodedDecimal => "b",
            Self::Invert => "~",
            _ => "",
        }
    }

    pub fn from_prefix(prefix: char) -> Option<Self> {
        match prefix {
            'd' => Some(Self::PreviousValue),
            'p' => Some(Self::PriorValue),
            'b' => Some(Self::BinaryCodedDecimal),
            '~' => Some(Self::Invert),
            _ => None,
        }
    }

    pub fn is_memory_reference(self) -> bool {
        matches!(
            self,
            Self::MemoryAddress
                | Self::PreviousValue
                | Self::PriorValue
                | Self::BinaryCodedDecimal
                | Self::Invert
        )
    }

    pub fn min_version(self) -> SoftwareVersion {
        match self {
            Self::PriorValue | Self::BinaryCodedDecimal => SoftwareVersion::V0_76,
            Self::Invert => SoftwareVersion::V0_78,
            Self::Float => SoftwareVersion::V1_0,
            Self::Recall => SoftwareVersion::V1_3,
            _ => SoftwareVersion::V0_30,
        }
    }
}

/// A typed, sized requirement operand
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Field {
    pub kind: FieldType,
    pub size: FieldSize,
    /// Address for memory references, the value for integer constants
    pub value: u32,
    /// The value for float constants
    pub float: f32,
}

impl Field {
    pub fn memory(size: FieldSize, address: u32) -> Self {
        Self {
            kind: FieldType::MemoryAddress,
            size,
            value: address,
            float: 0.0,
        }
    }

    pub fn value(value: u32) -> Self {
        Self {
            kind: FieldType::Value,
            size: FieldSize::None,
            value,
            float: 0.0,
        }
    }

    /// Integer constant stored in two's complement
    pub fn signed(value: i64) -> Self {
        Self::value(value as i32 as u32)
    }

    pub fn float(value: f32) -> Self {
        Self {
            kind: FieldType::Float,
            size: FieldSize::None,
            value: 0,
            float: value,
        }
    }

    pub fn recall() -> Self {
        Self {
            kind: FieldType::Recall,
            size: FieldSize::None,
            value: 0,
            float: 0.0,
        }
    }

    /// Same address and size viewed another way
    pub fn with_kind(self, kind: FieldType) -> Self {
        Self { kind, ..self }
    }

    pub fn is_memory_reference(&self) -> bool {
        self.kind.is_memory_reference()
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.kind, FieldType::Value | FieldType::Float)
    }

    /// Largest value this operand can hold
    pub fn max_value(&self) -> u32 {
        match self.kind {
            FieldType::Value => self.value,
            FieldType::Float | FieldType::Recall => u32::MAX,
            FieldType::BinaryCodedDecimal => bcd_max(self.size),
            _ => self.size.max_value(),
        }
    }

    pub fn byte_size(&self) -> u32 {
        self.size.byte_size()
    }

    /// Numeric value of a constant operand. Integer constants are unsigned, like memory reads.
    pub fn constant_value(&self) -> Option<f64> {
        match self.kind {
            FieldType::Value => Some(self.value as f64),
            FieldType::Float => Some(self.float as f64),
            _ => None,
        }
    }

    pub fn min_version(&self) -> SoftwareVersion {
        self.kind.min_version().max(self.size.min_version())
    }
}

fn bcd_max(size: FieldSize) -> u32 {
    match size.byte_size() {
        1 if size.max_value() == 0xFF => 99,
        1 if size.max_value() == 0x0F => 9,
        2 => 9_999,
        3 => 999_999,
        4 => 99_999_999,
        _ => size.max_value(),
    }
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        match (self.kind, other.kind) {
            (FieldType::Value, FieldType::Value) => self.value == other.value,
            (FieldType::Float, FieldType::Float) => self.float == other.float,
            (FieldType::Value, FieldType::Float) | (FieldType::Float, FieldType::Value) => {
                self.constant_value() == other.constant_value()
            }
            (FieldType::Recall, FieldType::Recall) => true,
            _ => self.kind == other.kind && self.size == other.size && self.value == other.value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_value_and_byte_size_follow_size() {
        assert_eq!(FieldSize::Bit3.max_value(), 1);
        assert_eq!(FieldSize::HighNibble.max_value(), 15);
        assert_eq!(FieldSize::TByte.max_value(), 0xFFFFFF);
        assert_eq!(FieldSize::BigEndianTByte.byte_size(), 3);
        assert_eq!(FieldSize::Double32.byte_size(), 4);
        assert_eq!(Field::memory(FieldSize::Byte, 0x10).max_value(), 255);
        assert_eq!(
            Field::memory(FieldSize::Byte, 0x10)
                .with_kind(FieldType::BinaryCodedDecimal)
                .max_value(),
            99
        );
    }

    #[test]
    fn test_constant_equality_ignores_size() {
        let a = Field::value(6);
        let b = Field {
            size: FieldSize::Byte,
            ..Field::value(6)
        };
        assert_eq!(a, b);
        assert_eq!(Field::float(6.0), Field::value(6));
        assert_ne!(Field::float(6.5), Field::value(6));
    }

    #[test]
    fn test_memory_equality_uses_type_and_size() {
        let byte = Field::memory(FieldSize::Byte, 0x1234);
        assert_eq!(byte, Field::memory(FieldSize::Byte, 0x1234));
        assert_ne!(byte, Field::memory(FieldSize::Word, 0x1234));
        assert_ne!(byte, byte.with_kind(FieldType::PreviousValue));
    }

    #[test]
    fn test_sigil_lookup() {
        assert_eq!(FieldSize::from_integer_sigil('H'), Some(FieldSize::Byte));
        assert_eq!(FieldSize::from_integer_sigil(' '), Some(FieldSize::Word));
        assert_eq!(FieldSize::from_integer_sigil('M'), Some(FieldSize::Bit0));
        assert_eq!(FieldSize::from_float_sigil('M'), Some(FieldSize::MBF32));
        assert_eq!(FieldSize::from_float_sigil('I'), Some(FieldSize::BigEndianDouble32));
        assert_eq!(FieldSize::from_function_name("tbyte_be"), Some(FieldSize::BigEndianTByte));
    }
}
