//! Class traversal: decode once, replay through a visitor.

use super::descriptor;
use super::pool::{Constant, ConstantPool};
use super::{ClassAnalysisError, Reader};

/// Callback interface over a decoded class.
///
/// All names are internal (`a/b/C`) form. Every method has a no-op default
/// so implementations only override what they consume.
pub trait ClassVisitor {
    /// The class being decoded.
    fn visit_class(&mut self, _name: &str, _access_flags: u16) {}

    /// The direct superclass (absent only for `java/lang/Object`).
    fn visit_superclass(&mut self, _name: &str) {}

    /// One directly implemented interface.
    fn visit_interface(&mut self, _name: &str) {}

    /// A declared field, with its type descriptor.
    fn visit_field(&mut self, _name: &str, _descriptor: &str) {}

    /// A declared method, with its full descriptor.
    fn visit_method(&mut self, _name: &str, _descriptor: &str) {}

    /// Any class referenced from signatures, attributes, instructions, or
    /// the constant pool.
    fn visit_type_ref(&mut self, _name: &str) {}

    /// A field or method reference, with the owning class.
    fn visit_member_ref(&mut self, _owner: &str, _name: &str, _descriptor: &str) {}

    /// An annotation by its type descriptor (`Lcom/x/Anno;`).
    fn visit_annotation(&mut self, _type_descriptor: &str) {}
}

fn emit_descriptor<V: ClassVisitor>(visitor: &mut V, text: &str) {
    let mut names = Vec::new();
    descriptor::referenced_classes(text, &mut names);
    for name in names {
        visitor.visit_type_ref(&name);
    }
}

/// Emit a class reference, unwrapping array "class names" like
/// `[Ljava/lang/String;` to their element type.
fn emit_class<V: ClassVisitor>(visitor: &mut V, name: &str) {
    if name.starts_with('[') {
        emit_descriptor(visitor, name);
    } else {
        visitor.visit_type_ref(name);
    }
}

/// Decode one class file and replay it through `visitor`.
///
/// Declarations come first (class, superclass, interfaces, fields, methods),
/// followed by attribute-carried references (signatures, thrown exceptions,
/// try/catch types, local variables, annotations, inner classes) and finally
/// the constant-pool references that cover instruction operands.
///
/// # Errors
///
/// Returns [`ClassAnalysisError`] on any malformed structure; analysis of
/// the class is not retried.
pub fn parse_class<V: ClassVisitor>(data: &[u8], visitor: &mut V) -> Result<(), ClassAnalysisError> {
    let mut reader = Reader::new(data);

    let magic = reader.u32("magic")?;
    if magic != 0xCAFE_BABE {
        return Err(ClassAnalysisError::BadMagic(magic));
    }
    reader.u16("minor version")?;
    reader.u16("major version")?;

    let pool = ConstantPool::parse(&mut reader)?;

    let access_flags = reader.u16("access flags")?;
    let this_class = reader.u16("this class")?;
    visitor.visit_class(pool.class_name(this_class)?, access_flags);

    let super_class = reader.u16("super class")?;
    if super_class != 0 {
        visitor.visit_superclass(pool.class_name(super_class)?);
    }

    let interface_count = reader.u16("interface count")?;
    for _ in 0..interface_count {
        let idx = reader.u16("interface index")?;
        visitor.visit_interface(pool.class_name(idx)?);
    }

    let field_count = reader.u16("field count")?;
    for _ in 0..field_count {
        reader.u16("field access flags")?;
        let name = pool.utf8(reader.u16("field name")?)?;
        let desc = pool.utf8(reader.u16("field descriptor")?)?;
        visitor.visit_field(name, desc);
        emit_descriptor(visitor, desc);
        parse_attributes(&mut reader, &pool, visitor)?;
    }

    let method_count = reader.u16("method count")?;
    for _ in 0..method_count {
        reader.u16("method access flags")?;
        let name = pool.utf8(reader.u16("method name")?)?;
        let desc = pool.utf8(reader.u16("method descriptor")?)?;
        visitor.visit_method(name, desc);
        emit_descriptor(visitor, desc);
        parse_attributes(&mut reader, &pool, visitor)?;
    }

    parse_attributes(&mut reader, &pool, visitor)?;

    // The pool sweep covers everything instructions can touch: `new`,
    // `checkcast`, class literals, and field/method operands all go through
    // Class and member-ref constants.
    for (_, constant) in pool.iter() {
        match constant {
            Constant::Class { name } => {
                emit_class(visitor, pool.utf8(*name)?);
            }
            Constant::FieldRef {
                class,
                name_and_type,
            }
            | Constant::MethodRef {
                class,
                name_and_type,
            }
            | Constant::InterfaceMethodRef {
                class,
                name_and_type,
            } => {
                let owner = pool.class_name(*class)?;
                let (name, desc) = pool.name_and_type(*name_and_type)?;
                visitor.visit_member_ref(owner, name, desc);
                emit_class(visitor, owner);
                emit_descriptor(visitor, desc);
            }
            Constant::MethodType { descriptor } => {
                emit_descriptor(visitor, pool.utf8(*descriptor)?);
            }
            // Dynamic call sites reach their types via NameAndType.
            Constant::NameAndType { descriptor, .. } => {
                emit_descriptor(visitor, pool.utf8(*descriptor)?);
            }
            _ => {}
        }
    }

    Ok(())
}

fn parse_attributes<V: ClassVisitor>(
    reader: &mut Reader<'_>,
    pool: &ConstantPool,
    visitor: &mut V,
) -> Result<(), ClassAnalysisError> {
    let count = reader.u16("attribute count")?;
    for _ in 0..count {
        let name_index = reader.u16("attribute name")?;
        let length = reader.u32("attribute length")? as usize;
        let name = pool.utf8(name_index)?;
        let body = reader.bytes(length, "attribute body")?;
        let mut body = Reader::new(body);

        match name {
            "Signature" => {
                let sig = pool.utf8(body.u16("signature index")?)?;
                emit_descriptor(visitor, sig);
            }
            "Exceptions" => {
                let thrown = body.u16("thrown exception count")?;
                for _ in 0..thrown {
                    let idx = body.u16("thrown exception index")?;
                    emit_class(visitor, pool.class_name(idx)?);
                }
            }
            "Code" => parse_code(&mut body, pool, visitor)?,
            "InnerClasses" => {
                let entries = body.u16("inner class count")?;
                for _ in 0..entries {
                    let inner = body.u16("inner class info")?;
                    let outer = body.u16("outer class info")?;
                    body.u16("inner name")?;
                    body.u16("inner access flags")?;
                    if inner != 0 {
                        emit_class(visitor, pool.class_name(inner)?);
                    }
                    if outer != 0 {
                        emit_class(visitor, pool.class_name(outer)?);
                    }
                }
            }
            "LocalVariableTable" | "LocalVariableTypeTable" => {
                let entries = body.u16("local variable count")?;
                for _ in 0..entries {
                    body.u16("local variable start")?;
                    body.u16("local variable length")?;
                    body.u16("local variable name")?;
                    let desc = body.u16("local variable descriptor")?;
                    body.u16("local variable slot")?;
                    emit_descriptor(visitor, pool.utf8(desc)?);
                }
            }
            "RuntimeVisibleAnnotations" | "RuntimeInvisibleAnnotations" => {
                let entries = body.u16("annotation count")?;
                for _ in 0..entries {
                    parse_annotation(&mut body, pool, visitor)?;
                }
            }
            "RuntimeVisibleParameterAnnotations" | "RuntimeInvisibleParameterAnnotations" => {
                let params = body.u8("annotated parameter count")?;
                for _ in 0..params {
                    let entries = body.u16("annotation count")?;
                    for _ in 0..entries {
                        parse_annotation(&mut body, pool, visitor)?;
                    }
                }
            }
            // Everything else carries no type references we track.
            _ => {}
        }
    }
    Ok(())
}

fn parse_code<V: ClassVisitor>(
    body: &mut Reader<'_>,
    pool: &ConstantPool,
    visitor: &mut V,
) -> Result<(), ClassAnalysisError> {
    body.u16("max stack")?;
    body.u16("max locals")?;
    let code_length = body.u32("code length")? as usize;
    // Instruction operands resolve through the constant pool; the sweep in
    // `parse_class` picks them up, so the raw bytecode is skipped here.
    body.skip(code_length, "bytecode")?;

    let handlers = body.u16("exception table length")?;
    for _ in 0..handlers {
        body.u16("handler start")?;
        body.u16("handler end")?;
        body.u16("handler target")?;
        let catch_type = body.u16("catch type")?;
        // catch_type 0 is a catch-all (finally); nothing to record.
        if catch_type != 0 {
            emit_class(visitor, pool.class_name(catch_type)?);
        }
    }

    parse_attributes(body, pool, visitor)
}

fn parse_annotation<V: ClassVisitor>(
    body: &mut Reader<'_>,
    pool: &ConstantPool,
    visitor: &mut V,
) -> Result<(), ClassAnalysisError> {
    let type_descriptor = pool.utf8(body.u16("annotation type")?)?;
    visitor.visit_annotation(type_descriptor);
    emit_descriptor(visitor, type_descriptor);

    let pairs = body.u16("annotation element count")?;
    for _ in 0..pairs {
        body.u16("annotation element name")?;
        parse_element_value(body, pool, visitor)?;
    }
    Ok(())
}

fn parse_element_value<V: ClassVisitor>(
    body: &mut Reader<'_>,
    pool: &ConstantPool,
    visitor: &mut V,
) -> Result<(), ClassAnalysisError> {
    let tag = body.u8("element value tag")?;
    match tag {
        b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b's' => {
            body.u16("element constant index")?;
        }
        b'e' => {
            let type_name = body.u16("enum type index")?;
            body.u16("enum constant index")?;
            emit_descriptor(visitor, pool.utf8(type_name)?);
        }
        b'c' => {
            let class_info = body.u16("class info index")?;
            emit_descriptor(visitor, pool.utf8(class_info)?);
        }
        b'@' => parse_annotation(body, pool, visitor)?,
        b'[' => {
            let values = body.u16("array element count")?;
            for _ in 0..values {
                parse_element_value(body, pool, visitor)?;
            }
        }
        other => return Err(ClassAnalysisError::UnknownAnnotationTag(other)),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::testutil::ClassFileBuilder;
    use super::*;

    #[derive(Default)]
    struct Recording {
        class: Option<String>,
        superclass: Option<String>,
        interfaces: Vec<String>,
        fields: Vec<(String, String)>,
        methods: Vec<(String, String)>,
        type_refs: Vec<String>,
        member_refs: Vec<(String, String)>,
        annotations: Vec<String>,
    }

    impl ClassVisitor for Recording {
        fn visit_class(&mut self, name: &str, _access_flags: u16) {
            self.class = Some(name.to_string());
        }
        fn visit_superclass(&mut self, name: &str) {
            self.superclass = Some(name.to_string());
        }
        fn visit_interface(&mut self, name: &str) {
            self.interfaces.push(name.to_string());
        }
        fn visit_field(&mut self, name: &str, descriptor: &str) {
            self.fields.push((name.to_string(), descriptor.to_string()));
        }
        fn visit_method(&mut self, name: &str, descriptor: &str) {
            self.methods.push((name.to_string(), descriptor.to_string()));
        }
        fn visit_type_ref(&mut self, name: &str) {
            self.type_refs.push(name.to_string());
        }
        fn visit_member_ref(&mut self, owner: &str, name: &str, _descriptor: &str) {
            self.member_refs.push((owner.to_string(), name.to_string()));
        }
        fn visit_annotation(&mut self, type_descriptor: &str) {
            self.annotations.push(type_descriptor.to_string());
        }
    }

    #[test]
    fn declarations_are_replayed() {
        let mut builder = ClassFileBuilder::new("com/x/Widget", "java/lang/Object");
        builder.add_interface("java/io/Serializable");
        builder.add_field("items", "Ljava/util/List;");
        builder.add_method("run", "(Lcom/y/Input;)V");
        let bytes = builder.build();

        let mut recording = Recording::default();
        parse_class(&bytes, &mut recording).unwrap();

        assert_eq!(recording.class.as_deref(), Some("com/x/Widget"));
        assert_eq!(recording.superclass.as_deref(), Some("java/lang/Object"));
        assert_eq!(recording.interfaces, vec!["java/io/Serializable"]);
        assert_eq!(
            recording.fields,
            vec![("items".to_string(), "Ljava/util/List;".to_string())]
        );
        assert_eq!(
            recording.methods,
            vec![("run".to_string(), "(Lcom/y/Input;)V".to_string())]
        );
        assert!(recording.type_refs.iter().any(|n| n == "java/util/List"));
        assert!(recording.type_refs.iter().any(|n| n == "com/y/Input"));
    }

    #[test]
    fn member_refs_surface_owner_and_descriptor_types() {
        let mut builder = ClassFileBuilder::new("com/x/Caller", "java/lang/Object");
        builder.add_method_ref("com/z/Service", "lookup", "(Ljava/lang/String;)Lcom/z/Handle;");
        let bytes = builder.build();

        let mut recording = Recording::default();
        parse_class(&bytes, &mut recording).unwrap();

        assert!(recording
            .member_refs
            .contains(&("com/z/Service".to_string(), "lookup".to_string())));
        assert!(recording.type_refs.iter().any(|n| n == "com/z/Service"));
        assert!(recording.type_refs.iter().any(|n| n == "com/z/Handle"));
        assert!(recording.type_refs.iter().any(|n| n == "java/lang/String"));
    }

    #[test]
    fn thrown_exceptions_are_type_refs() {
        let mut builder = ClassFileBuilder::new("com/x/Thrower", "java/lang/Object");
        builder.add_method_with_exceptions("fail", "()V", &["com/x/err/Boom"]);
        let bytes = builder.build();

        let mut recording = Recording::default();
        parse_class(&bytes, &mut recording).unwrap();
        assert!(recording.type_refs.iter().any(|n| n == "com/x/err/Boom"));
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut recording = Recording::default();
        let err = parse_class(&[0xDE, 0xAD, 0xBE, 0xEF, 0, 0], &mut recording).unwrap_err();
        assert!(matches!(err, ClassAnalysisError::BadMagic(0xDEAD_BEEF)));
    }

    #[test]
    fn truncated_class_is_rejected() {
        let builder = ClassFileBuilder::new("com/x/Cut", "java/lang/Object");
        let mut bytes = builder.build();
        bytes.truncate(bytes.len() - 3);

        let mut recording = Recording::default();
        assert!(matches!(
            parse_class(&bytes, &mut recording),
            Err(ClassAnalysisError::Truncated { .. })
        ));
    }
}
