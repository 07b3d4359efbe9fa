//! Constant pool decoding.

use super::{ClassAnalysisError, Reader};

/// One constant-pool entry. Only the shapes the extractor consumes carry
/// their payload; numeric constants keep their bits for completeness.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class { name: u16 },
    Str { value: u16 },
    FieldRef { class: u16, name_and_type: u16 },
    MethodRef { class: u16, name_and_type: u16 },
    InterfaceMethodRef { class: u16, name_and_type: u16 },
    NameAndType { name: u16, descriptor: u16 },
    MethodHandle { kind: u8, reference: u16 },
    MethodType { descriptor: u16 },
    Dynamic { bootstrap: u16, name_and_type: u16 },
    InvokeDynamic { bootstrap: u16, name_and_type: u16 },
    Module { name: u16 },
    Package { name: u16 },
    /// Second slot of a `Long`/`Double`; never referenced by a valid class.
    Unusable,
}

impl Constant {
    fn kind(&self) -> &'static str {
        match self {
            Constant::Utf8(_) => "Utf8",
            Constant::Integer(_) => "Integer",
            Constant::Float(_) => "Float",
            Constant::Long(_) => "Long",
            Constant::Double(_) => "Double",
            Constant::Class { .. } => "Class",
            Constant::Str { .. } => "String",
            Constant::FieldRef { .. } => "Fieldref",
            Constant::MethodRef { .. } => "Methodref",
            Constant::InterfaceMethodRef { .. } => "InterfaceMethodref",
            Constant::NameAndType { .. } => "NameAndType",
            Constant::MethodHandle { .. } => "MethodHandle",
            Constant::MethodType { .. } => "MethodType",
            Constant::Dynamic { .. } => "Dynamic",
            Constant::InvokeDynamic { .. } => "InvokeDynamic",
            Constant::Module { .. } => "Module",
            Constant::Package { .. } => "Package",
            Constant::Unusable => "unusable slot",
        }
    }
}

/// The decoded constant pool, indexed 1-based as in the class format.
#[derive(Debug)]
pub struct ConstantPool {
    entries: Vec<Constant>,
}

impl ConstantPool {
    /// Decode the pool from the cursor, which must be positioned at the
    /// `constant_pool_count` field.
    pub(crate) fn parse(reader: &mut Reader<'_>) -> Result<Self, ClassAnalysisError> {
        let count = reader.u16("constant pool count")?;
        let mut entries = Vec::with_capacity(count.saturating_sub(1) as usize);

        while entries.len() + 1 < count as usize {
            let tag = reader.u8("constant pool tag")?;
            let constant = match tag {
                1 => {
                    let len = reader.u16("Utf8 length")? as usize;
                    let raw = reader.bytes(len, "Utf8 bytes")?;
                    let text = std::str::from_utf8(raw)
                        .map_err(|_| ClassAnalysisError::InvalidUtf8)?;
                    Constant::Utf8(text.to_string())
                }
                3 => Constant::Integer(reader.u32("Integer")? as i32),
                4 => Constant::Float(f32::from_bits(reader.u32("Float")?)),
                5 => Constant::Long(reader.u64("Long")? as i64),
                6 => Constant::Double(f64::from_bits(reader.u64("Double")?)),
                7 => Constant::Class {
                    name: reader.u16("Class name index")?,
                },
                8 => Constant::Str {
                    value: reader.u16("String value index")?,
                },
                9 => Constant::FieldRef {
                    class: reader.u16("Fieldref class")?,
                    name_and_type: reader.u16("Fieldref name-and-type")?,
                },
                10 => Constant::MethodRef {
                    class: reader.u16("Methodref class")?,
                    name_and_type: reader.u16("Methodref name-and-type")?,
                },
                11 => Constant::InterfaceMethodRef {
                    class: reader.u16("InterfaceMethodref class")?,
                    name_and_type: reader.u16("InterfaceMethodref name-and-type")?,
                },
                12 => Constant::NameAndType {
                    name: reader.u16("NameAndType name")?,
                    descriptor: reader.u16("NameAndType descriptor")?,
                },
                15 => Constant::MethodHandle {
                    kind: reader.u8("MethodHandle kind")?,
                    reference: reader.u16("MethodHandle reference")?,
                },
                16 => Constant::MethodType {
                    descriptor: reader.u16("MethodType descriptor")?,
                },
                17 => Constant::Dynamic {
                    bootstrap: reader.u16("Dynamic bootstrap")?,
                    name_and_type: reader.u16("Dynamic name-and-type")?,
                },
                18 => Constant::InvokeDynamic {
                    bootstrap: reader.u16("InvokeDynamic bootstrap")?,
                    name_and_type: reader.u16("InvokeDynamic name-and-type")?,
                },
                19 => Constant::Module {
                    name: reader.u16("Module name index")?,
                },
                20 => Constant::Package {
                    name: reader.u16("Package name index")?,
                },
                other => return Err(ClassAnalysisError::UnknownPoolTag(other)),
            };

            let double_width = matches!(constant, Constant::Long(_) | Constant::Double(_));
            entries.push(constant);
            if double_width {
                entries.push(Constant::Unusable);
            }
        }

        Ok(Self { entries })
    }

    /// Look up an entry by its 1-based pool index.
    pub fn get(&self, index: u16) -> Result<&Constant, ClassAnalysisError> {
        if index == 0 {
            return Err(ClassAnalysisError::BadPoolIndex { index });
        }
        self.entries
            .get(index as usize - 1)
            .ok_or(ClassAnalysisError::BadPoolIndex { index })
    }

    /// Resolve a `Utf8` entry.
    pub fn utf8(&self, index: u16) -> Result<&str, ClassAnalysisError> {
        match self.get(index)? {
            Constant::Utf8(text) => Ok(text),
            other => Err(ClassAnalysisError::UnexpectedConstant {
                index,
                expected: "Utf8",
                found: other.kind(),
            }),
        }
    }

    /// Resolve a `Class` entry to its internal name (`a/b/C`).
    pub fn class_name(&self, index: u16) -> Result<&str, ClassAnalysisError> {
        match self.get(index)? {
            Constant::Class { name } => self.utf8(*name),
            other => Err(ClassAnalysisError::UnexpectedConstant {
                index,
                expected: "Class",
                found: other.kind(),
            }),
        }
    }

    /// Resolve a `NameAndType` entry to `(name, descriptor)`.
    pub fn name_and_type(&self, index: u16) -> Result<(&str, &str), ClassAnalysisError> {
        match self.get(index)? {
            Constant::NameAndType { name, descriptor } => {
                Ok((self.utf8(*name)?, self.utf8(*descriptor)?))
            }
            other => Err(ClassAnalysisError::UnexpectedConstant {
                index,
                expected: "NameAndType",
                found: other.kind(),
            }),
        }
    }

    /// Iterate all entries with their 1-based indices.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &Constant)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(idx, c)| (idx as u16 + 1, c))
    }
}
