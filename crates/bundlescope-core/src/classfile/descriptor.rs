//! Descriptor and signature scanning.
//!
//! Field and method descriptors (`(Ljava/util/List;I)Lcom/x/Y;`) and the
//! generic signature grammar (`Ljava/util/Map<TK;Lcom/x/V;>.Entry;`) both
//! reduce, for the extractor's purposes, to the set of class names they
//! mention. One scanner handles both forms.

/// Append every class named by `descriptor` to `out`, as internal
/// (`a/b/C`) names.
///
/// Generic signatures are accepted as well: type arguments contribute their
/// own names, type variables (`TT;`) contribute nothing, and inner-class
/// suffixes (`Louter/A<*>.B;`) contribute both `outer/A` and `outer/A$B`.
pub fn referenced_classes(descriptor: &str, out: &mut Vec<String>) {
    let bytes = descriptor.as_bytes();
    let mut i = 0;
    // Most recent class type at the current bracket depth, kept so a
    // `.Inner` continuation can be attached to the right outer name.
    let mut enclosing: Option<String> = None;
    let mut stack: Vec<Option<String>> = Vec::new();

    while i < bytes.len() {
        match bytes[i] {
            b'L' => {
                let start = i + 1;
                let mut end = start;
                while end < bytes.len() && !matches!(bytes[end], b';' | b'<' | b'.' | b':') {
                    end += 1;
                }
                // A token ending at ':' is a formal type-parameter name
                // (e.g. `<Lhs:Ljava/lang/Object;>`), not a class type.
                if end > start && bytes.get(end) != Some(&b':') {
                    let name = &descriptor[start..end];
                    out.push(name.to_string());
                    enclosing = Some(name.to_string());
                }
                i = end;
            }
            b'.' => {
                // Inner-class continuation of the enclosing class type.
                let start = i + 1;
                let mut end = start;
                while end < bytes.len() && !matches!(bytes[end], b';' | b'<' | b'.') {
                    end += 1;
                }
                if end > start {
                    if let Some(outer) = enclosing.take() {
                        let nested = format!("{outer}${}", &descriptor[start..end]);
                        out.push(nested.clone());
                        enclosing = Some(nested);
                    }
                }
                i = end;
            }
            b'<' => {
                stack.push(enclosing.take());
                i += 1;
            }
            b'>' => {
                enclosing = stack.pop().flatten();
                i += 1;
            }
            b'T' => {
                // Either a type-variable use (`TT;`, contributes nothing) or
                // a formal parameter name that happens to start with 'T'
                // (`TKey:...`); in the latter case the bound after ':' is
                // scanned normally.
                let mut end = i + 1;
                while end < bytes.len() && !matches!(bytes[end], b';' | b':' | b'<' | b'.') {
                    end += 1;
                }
                if bytes.get(end) == Some(&b';') {
                    end += 1;
                }
                i = end;
            }
            _ => i += 1,
        }
    }
}

/// Convenience wrapper returning a fresh vector.
pub fn classes_in(descriptor: &str) -> Vec<String> {
    let mut out = Vec::new();
    referenced_classes(descriptor, &mut out);
    out
}
