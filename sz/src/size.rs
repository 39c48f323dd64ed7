//! Size metric for leaf members.
//!
//! A cheap proxy for declaration footprint: identifier lengths plus the byte
//! lengths of the signature blob and, for methods, the encoded body. Identifier
//! lengths are UTF-16 code units.

use sz_metadata::{FieldDefinition, MethodDefinition, PropertyDefinition};

pub fn name_length(name: &str) -> u64 {
    name.encode_utf16().count() as u64
}

pub fn field_size(field: &FieldDefinition) -> u64 {
    name_length(&field.name) + field.signature_len as u64
}

pub fn property_size(property: &PropertyDefinition) -> u64 {
    name_length(&property.name) + property.signature_len as u64
}

pub fn method_size(method: &MethodDefinition) -> u64 {
    let parameter_names = method
        .parameter_names
        .iter()
        .map(|name| name_length(name))
        .sum::<u64>();
    let body = method.body_len.unwrap_or(0) as u64;
    name_length(&method.name) + method.signature_len as u64 + parameter_names + body
}
