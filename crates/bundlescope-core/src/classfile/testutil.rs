//! Hand-assembled class files for tests.

/// Builds minimal, structurally valid class bytes without a compiler.
///
/// Indices are handed out in insertion order; `build` assembles the final
/// byte vector.
pub(crate) struct ClassFileBuilder {
    constants: Vec<Vec<u8>>,
    this_class: u16,
    super_class: u16,
    interfaces: Vec<u16>,
    fields: Vec<(u16, u16)>,
    methods: Vec<(u16, u16, Vec<u8>)>,
}

impl ClassFileBuilder {
    pub(crate) fn new(this_class: &str, super_class: &str) -> Self {
        let mut builder = Self {
            constants: Vec::new(),
            this_class: 0,
            super_class: 0,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
        };
        builder.this_class = builder.class(this_class);
        builder.super_class = builder.class(super_class);
        builder
    }

    fn push(&mut self, encoded: Vec<u8>) -> u16 {
        self.constants.push(encoded);
        self.constants.len() as u16
    }

    pub(crate) fn utf8(&mut self, text: &str) -> u16 {
        let mut encoded = vec![1];
        encoded.extend_from_slice(&(text.len() as u16).to_be_bytes());
        encoded.extend_from_slice(text.as_bytes());
        self.push(encoded)
    }

    pub(crate) fn class(&mut self, internal_name: &str) -> u16 {
        let name = self.utf8(internal_name);
        let mut encoded = vec![7];
        encoded.extend_from_slice(&name.to_be_bytes());
        self.push(encoded)
    }

    fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name = self.utf8(name);
        let descriptor = self.utf8(descriptor);
        let mut encoded = vec![12];
        encoded.extend_from_slice(&name.to_be_bytes());
        encoded.extend_from_slice(&descriptor.to_be_bytes());
        self.push(encoded)
    }

    /// Add a `Methodref` constant, as an invoke instruction would create.
    pub(crate) fn add_method_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        let owner = self.class(owner);
        let name_and_type = self.name_and_type(name, descriptor);
        let mut encoded = vec![10];
        encoded.extend_from_slice(&owner.to_be_bytes());
        encoded.extend_from_slice(&name_and_type.to_be_bytes());
        self.push(encoded)
    }

    pub(crate) fn add_interface(&mut self, internal_name: &str) {
        let idx = self.class(internal_name);
        self.interfaces.push(idx);
    }

    pub(crate) fn add_field(&mut self, name: &str, descriptor: &str) {
        let name = self.utf8(name);
        let descriptor = self.utf8(descriptor);
        self.fields.push((name, descriptor));
    }

    pub(crate) fn add_method(&mut self, name: &str, descriptor: &str) {
        let name = self.utf8(name);
        let descriptor = self.utf8(descriptor);
        self.methods.push((name, descriptor, Vec::new()));
    }

    /// Add a method carrying an `Exceptions` attribute with the given
    /// thrown class names.
    pub(crate) fn add_method_with_exceptions(
        &mut self,
        name: &str,
        descriptor: &str,
        thrown: &[&str],
    ) {
        let attr_name = self.utf8("Exceptions");
        let indices: Vec<u16> = thrown.iter().map(|t| self.class(t)).collect();

        let mut body = Vec::new();
        body.extend_from_slice(&(indices.len() as u16).to_be_bytes());
        for idx in &indices {
            body.extend_from_slice(&idx.to_be_bytes());
        }

        let mut attr = Vec::new();
        attr.extend_from_slice(&attr_name.to_be_bytes());
        attr.extend_from_slice(&(body.len() as u32).to_be_bytes());
        attr.extend_from_slice(&body);

        let name = self.utf8(name);
        let descriptor = self.utf8(descriptor);
        self.methods.push((name, descriptor, attr));
    }

    pub(crate) fn build(self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&0xCAFE_BABEu32.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes()); // minor
        out.extend_from_slice(&52u16.to_be_bytes()); // major (Java 8)

        out.extend_from_slice(&(self.constants.len() as u16 + 1).to_be_bytes());
        for constant in &self.constants {
            out.extend_from_slice(constant);
        }

        out.extend_from_slice(&0x0021u16.to_be_bytes()); // ACC_PUBLIC | ACC_SUPER
        out.extend_from_slice(&self.this_class.to_be_bytes());
        out.extend_from_slice(&self.super_class.to_be_bytes());

        out.extend_from_slice(&(self.interfaces.len() as u16).to_be_bytes());
        for idx in &self.interfaces {
            out.extend_from_slice(&idx.to_be_bytes());
        }

        out.extend_from_slice(&(self.fields.len() as u16).to_be_bytes());
        for (name, descriptor) in &self.fields {
            out.extend_from_slice(&0x0002u16.to_be_bytes()); // ACC_PRIVATE
            out.extend_from_slice(&name.to_be_bytes());
            out.extend_from_slice(&descriptor.to_be_bytes());
            out.extend_from_slice(&0u16.to_be_bytes()); // no attributes
        }

        out.extend_from_slice(&(self.methods.len() as u16).to_be_bytes());
        for (name, descriptor, attr) in &self.methods {
            out.extend_from_slice(&0x0001u16.to_be_bytes()); // ACC_PUBLIC
            out.extend_from_slice(&name.to_be_bytes());
            out.extend_from_slice(&descriptor.to_be_bytes());
            if attr.is_empty() {
                out.extend_from_slice(&0u16.to_be_bytes());
            } else {
                out.extend_from_slice(&1u16.to_be_bytes());
                out.extend_from_slice(attr);
            }
        }

        out.extend_from_slice(&0u16.to_be_bytes()); // no class attributes
        out
    }
}
