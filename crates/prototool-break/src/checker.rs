//! Compatibility diff of two compiled descriptor sets.
//!
//! Types are matched by fully-qualified name across the whole set,
//! fields by number, enum values and rpcs by name. Failure locations
//! come from the current (`to`) side's source info where the element
//! still exists, and from the enclosing declaration otherwise.

use std::collections::HashMap;

use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, EnumDescriptorProto, FieldDescriptorProto, FileDescriptorProto,
    FileDescriptorSet, MethodDescriptorProto, ServiceDescriptorProto,
};
use prototool_core::{sort_failures, Failure, Severity};

use crate::source_info::{
    SourceInfoIndex, ENUM_VALUE, FILE_ENUM_TYPE, FILE_MESSAGE_TYPE, FILE_SERVICE, MESSAGE_ENUM_TYPE,
    MESSAGE_FIELD, MESSAGE_NESTED_TYPE, SERVICE_METHOD,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct BreakOptions {
    /// Check beta packages too; they are exempt from removal checks
    /// by default.
    pub include_beta: bool,
    /// Permit non-beta files to depend on beta files.
    pub allow_beta_deps: bool,
}

/// Compare `from` (baseline) against `to` (current), returning one
/// failure per incompatibility in stable order.
pub fn check(
    from: &FileDescriptorSet,
    to: &FileDescriptorSet,
    options: &BreakOptions,
) -> Vec<Failure> {
    let from_index = TypeIndex::build(from);
    let to_index = TypeIndex::build(to);
    let mut checker = Checker {
        to_index: &to_index,
        options,
        source_info: HashMap::new(),
        failures: Vec::new(),
    };

    checker.check_files(&from_index);
    checker.check_messages(&from_index);
    checker.check_enums(&from_index);
    checker.check_services(&from_index);
    checker.check_beta_deps();

    sort_failures(&mut checker.failures);
    checker.failures
}

/// `package.vNbetaN` or a literal `beta` component marks a package
/// as beta.
pub fn is_beta_package(package: &str) -> bool {
    if package.is_empty() {
        return false;
    }
    let components: Vec<&str> = package.split('.').collect();
    if components.iter().any(|c| *c == "beta") {
        return true;
    }
    components
        .last()
        .is_some_and(|last| is_beta_version_component(last))
}

fn is_beta_version_component(s: &str) -> bool {
    let Some(rest) = s.strip_prefix('v') else {
        return false;
    };
    let Some((major, beta)) = rest.split_once("beta") else {
        return false;
    };
    !major.is_empty()
        && major.chars().all(|c| c.is_ascii_digit())
        && !beta.is_empty()
        && beta.chars().all(|c| c.is_ascii_digit())
}

struct MessageEntry<'a> {
    file: &'a FileDescriptorProto,
    desc: &'a DescriptorProto,
    path: Vec<i32>,
}

struct EnumEntry<'a> {
    file: &'a FileDescriptorProto,
    desc: &'a EnumDescriptorProto,
    path: Vec<i32>,
}

struct ServiceEntry<'a> {
    file: &'a FileDescriptorProto,
    desc: &'a ServiceDescriptorProto,
    path: Vec<i32>,
}

struct TypeIndex<'a> {
    files: HashMap<&'a str, &'a FileDescriptorProto>,
    messages: HashMap<String, MessageEntry<'a>>,
    enums: HashMap<String, EnumEntry<'a>>,
    services: HashMap<String, ServiceEntry<'a>>,
}

impl<'a> TypeIndex<'a> {
    fn build(set: &'a FileDescriptorSet) -> Self {
        let mut index = TypeIndex {
            files: HashMap::new(),
            messages: HashMap::new(),
            enums: HashMap::new(),
            services: HashMap::new(),
        };
        for file in &set.file {
            index.files.insert(file.name(), file);
            let package = file.package().to_string();
            for (i, message) in file.message_type.iter().enumerate() {
                index.add_message(
                    file,
                    &package,
                    message,
                    vec![FILE_MESSAGE_TYPE, i as i32],
                );
            }
            for (i, decl) in file.enum_type.iter().enumerate() {
                index.add_enum(file, &package, decl, vec![FILE_ENUM_TYPE, i as i32]);
            }
            for (i, service) in file.service.iter().enumerate() {
                let fq = join_fq(&package, service.name());
                index.services.insert(
                    fq,
                    ServiceEntry {
                        file,
                        desc: service,
                        path: vec![FILE_SERVICE, i as i32],
                    },
                );
            }
        }
        index
    }

    fn add_message(
        &mut self,
        file: &'a FileDescriptorProto,
        scope: &str,
        message: &'a DescriptorProto,
        path: Vec<i32>,
    ) {
        let fq = join_fq(scope, message.name());
        for (i, nested) in message.nested_type.iter().enumerate() {
            let mut nested_path = path.clone();
            nested_path.extend([MESSAGE_NESTED_TYPE, i as i32]);
            self.add_message(file, &fq, nested, nested_path);
        }
        for (i, decl) in message.enum_type.iter().enumerate() {
            let mut enum_path = path.clone();
            enum_path.extend([MESSAGE_ENUM_TYPE, i as i32]);
            self.add_enum(file, &fq, decl, enum_path);
        }
        self.messages.insert(fq, MessageEntry { file, desc: message, path });
    }

    fn add_enum(
        &mut self,
        file: &'a FileDescriptorProto,
        scope: &str,
        decl: &'a EnumDescriptorProto,
        path: Vec<i32>,
    ) {
        let fq = join_fq(scope, decl.name());
        self.enums.insert(fq, EnumEntry { file, desc: decl, path });
    }

    fn is_map_entry(&self, type_name: &str) -> bool {
        self.messages
            .get(type_name.trim_start_matches('.'))
            .is_some_and(|e| e.desc.options.as_ref().is_some_and(|o| o.map_entry()))
    }
}

struct Checker<'a> {
    to_index: &'a TypeIndex<'a>,
    options: &'a BreakOptions,
    source_info: HashMap<String, SourceInfoIndex>,
    failures: Vec<Failure>,
}

impl<'a> Checker<'a> {
    fn fail(
        &mut self,
        rule: &str,
        file: &str,
        location: (usize, usize),
        message: String,
        severity: Severity,
    ) {
        self.failures.push(
            Failure::new(file, location.0, location.1, message)
                .with_rule(rule)
                .with_severity(severity),
        );
    }

    /// Location of a descriptor path in a `to`-side file.
    fn locate(&mut self, file: &FileDescriptorProto, path: &[i32]) -> (usize, usize) {
        let index = self
            .source_info
            .entry(file.name().to_string())
            .or_insert_with(|| SourceInfoIndex::build(file));
        index.lookup_or_enclosing(path)
    }

    fn check_files(&mut self, from_index: &TypeIndex<'_>) {
        for (name, file) in &from_index.files {
            if self.to_index.files.contains_key(name) {
                continue;
            }
            let beta = is_beta_package(file.package());
            if beta && !self.options.include_beta {
                continue;
            }
            self.fail(
                "FILE_NOT_DELETED",
                name,
                (1, 1),
                format!("file {name:?} was deleted"),
                Severity::Error,
            );
        }

        for (name, from_file) in &from_index.files {
            if let Some(to_file) = self.to_index.files.get(name) {
                if from_file.package() != to_file.package() {
                    self.fail(
                        "FILE_SAME_PACKAGE",
                        name,
                        (1, 1),
                        format!(
                            "package changed from {:?} to {:?}",
                            from_file.package(),
                            to_file.package()
                        ),
                        Severity::Warning,
                    );
                }
            }
        }
    }

    fn check_messages(&mut self, from_index: &TypeIndex<'_>) {
        for (fq, from_entry) in &from_index.messages {
            let is_map_entry = from_entry
                .desc
                .options
                .as_ref()
                .is_some_and(|o| o.map_entry());
            match self.to_index.messages.get(fq) {
                None => {
                    // Map entry messages come and go with their map
                    // fields; the field check reports those.
                    if is_map_entry {
                        continue;
                    }
                    if is_beta_package(from_entry.file.package()) && !self.options.include_beta {
                        continue;
                    }
                    let (file, location) = self.removed_site(from_entry);
                    self.fail(
                        "MESSAGE_NOT_DELETED",
                        &file,
                        location,
                        format!("message {fq:?} was deleted"),
                        Severity::Error,
                    );
                }
                Some(to_entry) => {
                    self.check_message_fields(fq, from_index, from_entry, to_entry);
                }
            }
        }
    }

    fn removed_site(&mut self, from_entry: &MessageEntry<'_>) -> (String, (usize, usize)) {
        let to_file = self.to_index.files.get(from_entry.file.name()).copied();
        match to_file {
            Some(file) => (file.name().to_string(), (1, 1)),
            None => (from_entry.file.name().to_string(), (1, 1)),
        }
    }

    fn check_message_fields(
        &mut self,
        fq: &str,
        from_index: &TypeIndex<'_>,
        from_entry: &MessageEntry<'_>,
        to_entry: &MessageEntry<'_>,
    ) {
        let from_syntax_proto2 = from_entry.file.syntax.as_deref().unwrap_or("proto2") == "proto2";
        let to_fields: HashMap<i32, (usize, &FieldDescriptorProto)> = to_entry
            .desc
            .field
            .iter()
            .enumerate()
            .map(|(i, f)| (f.number(), (i, f)))
            .collect();
        let from_numbers: Vec<i32> = from_entry.desc.field.iter().map(|f| f.number()).collect();

        for from_field in &from_entry.desc.field {
            let number = from_field.number();
            match to_fields.get(&number) {
                None => {
                    if field_number_reserved(to_entry.desc, number) {
                        continue;
                    }
                    let location = self.locate(to_entry.file, &to_entry.path);
                    let file = to_entry.file.name().to_string();
                    self.fail(
                        "FIELD_NOT_DELETED",
                        &file,
                        location,
                        format!(
                            "field {} ({}) of message {fq:?} was deleted without reserving its number",
                            number,
                            from_field.name()
                        ),
                        Severity::Error,
                    );
                }
                Some((to_i, to_field)) => {
                    let mut field_path = to_entry.path.clone();
                    field_path.extend([MESSAGE_FIELD, *to_i as i32]);
                    self.check_field(fq, from_index, from_field, to_field, to_entry.file, &field_path);
                }
            }
        }

        // Newly added proto2 required fields break existing writers.
        if from_syntax_proto2 {
            for (i, to_field) in to_entry.desc.field.iter().enumerate() {
                if !from_numbers.contains(&to_field.number())
                    && to_field.label() == Label::Required
                {
                    let mut field_path = to_entry.path.clone();
                    field_path.extend([MESSAGE_FIELD, i as i32]);
                    let location = self.locate(to_entry.file, &field_path);
                    let file = to_entry.file.name().to_string();
                    self.fail(
                        "FIELD_NO_NEW_REQUIRED",
                        &file,
                        location,
                        format!(
                            "new required field {:?} added to message {fq:?}",
                            to_field.name()
                        ),
                        Severity::Error,
                    );
                }
            }
        }
    }

    fn check_field(
        &mut self,
        message_fq: &str,
        from_index: &TypeIndex<'_>,
        from_field: &FieldDescriptorProto,
        to_field: &FieldDescriptorProto,
        to_file: &FileDescriptorProto,
        field_path: &[i32],
    ) {
        let file = to_file.name().to_string();
        let location = self.locate(to_file, field_path);

        if from_field.name() != to_field.name() {
            self.fail(
                "FIELD_SAME_NAME",
                &file,
                location,
                format!(
                    "field {} of message {message_fq:?} changed name from {:?} to {:?}",
                    from_field.number(),
                    from_field.name(),
                    to_field.name()
                ),
                Severity::Warning,
            );
        }

        if from_field.label() != to_field.label() {
            self.fail(
                "FIELD_SAME_LABEL",
                &file,
                location,
                format!(
                    "field {} of message {message_fq:?} changed label from {:?} to {:?}",
                    from_field.number(),
                    from_field.label(),
                    to_field.label()
                ),
                Severity::Error,
            );
        }

        let from_map = field_is_map(from_index, from_field);
        let to_map = field_is_map(self.to_index, to_field);
        if from_map != to_map {
            self.fail(
                "FIELD_SAME_TYPE",
                &file,
                location,
                format!(
                    "field {} of message {message_fq:?} changed between map and repeated message",
                    from_field.number()
                ),
                Severity::Error,
            );
            return;
        }

        if !types_compatible(from_field, to_field) {
            self.fail(
                "FIELD_SAME_TYPE",
                &file,
                location,
                format!(
                    "field {} of message {message_fq:?} changed type from {} to {}",
                    from_field.number(),
                    type_display(from_field),
                    type_display(to_field)
                ),
                Severity::Error,
            );
        }
    }

    fn check_enums(&mut self, from_index: &TypeIndex<'_>) {
        for (fq, from_entry) in &from_index.enums {
            match self.to_index.enums.get(fq) {
                None => {
                    if is_beta_package(from_entry.file.package()) && !self.options.include_beta {
                        continue;
                    }
                    let file = match self.to_index.files.get(from_entry.file.name()) {
                        Some(f) => f.name().to_string(),
                        None => from_entry.file.name().to_string(),
                    };
                    self.fail(
                        "ENUM_NOT_DELETED",
                        &file,
                        (1, 1),
                        format!("enum {fq:?} was deleted"),
                        Severity::Error,
                    );
                }
                Some(to_entry) => self.check_enum_values(fq, from_entry, to_entry),
            }
        }
    }

    fn check_enum_values(
        &mut self,
        fq: &str,
        from_entry: &EnumEntry<'_>,
        to_entry: &EnumEntry<'_>,
    ) {
        let to_values: HashMap<&str, (usize, i32)> = to_entry
            .desc
            .value
            .iter()
            .enumerate()
            .map(|(i, v)| (v.name(), (i, v.number())))
            .collect();

        for from_value in &from_entry.desc.value {
            match to_values.get(from_value.name()) {
                None => {
                    if enum_number_reserved(to_entry.desc, from_value.number())
                        || to_entry
                            .desc
                            .reserved_name
                            .iter()
                            .any(|n| n == from_value.name())
                    {
                        continue;
                    }
                    let location = self.locate(to_entry.file, &to_entry.path);
                    let file = to_entry.file.name().to_string();
                    self.fail(
                        "ENUM_VALUE_NOT_DELETED",
                        &file,
                        location,
                        format!(
                            "enum value {:?} of enum {fq:?} was deleted without being reserved",
                            from_value.name()
                        ),
                        Severity::Error,
                    );
                }
                Some((to_i, to_number)) => {
                    if from_value.number() != *to_number {
                        let mut value_path = to_entry.path.clone();
                        value_path.extend([ENUM_VALUE, *to_i as i32]);
                        let location = self.locate(to_entry.file, &value_path);
                        let file = to_entry.file.name().to_string();
                        self.fail(
                            "ENUM_VALUE_SAME_NUMBER",
                            &file,
                            location,
                            format!(
                                "enum value {:?} of enum {fq:?} changed number from {} to {}",
                                from_value.name(),
                                from_value.number(),
                                to_number
                            ),
                            Severity::Error,
                        );
                    }
                }
            }
        }
    }

    fn check_services(&mut self, from_index: &TypeIndex<'_>) {
        for (fq, from_entry) in &from_index.services {
            match self.to_index.services.get(fq) {
                None => {
                    if is_beta_package(from_entry.file.package()) && !self.options.include_beta {
                        continue;
                    }
                    let file = match self.to_index.files.get(from_entry.file.name()) {
                        Some(f) => f.name().to_string(),
                        None => from_entry.file.name().to_string(),
                    };
                    self.fail(
                        "SERVICE_NOT_DELETED",
                        &file,
                        (1, 1),
                        format!("service {fq:?} was deleted"),
                        Severity::Error,
                    );
                }
                Some(to_entry) => self.check_rpcs(fq, from_entry, to_entry),
            }
        }
    }

    fn check_rpcs(
        &mut self,
        fq: &str,
        from_entry: &ServiceEntry<'_>,
        to_entry: &ServiceEntry<'_>,
    ) {
        let to_methods: HashMap<&str, (usize, &MethodDescriptorProto)> = to_entry
            .desc
            .method
            .iter()
            .enumerate()
            .map(|(i, m)| (m.name(), (i, m)))
            .collect();

        for from_method in &from_entry.desc.method {
            let Some((to_i, to_method)) = to_methods.get(from_method.name()) else {
                let location = self.locate(to_entry.file, &to_entry.path);
                let file = to_entry.file.name().to_string();
                self.fail(
                    "RPC_NOT_DELETED",
                    &file,
                    location,
                    format!("rpc {:?} of service {fq:?} was deleted", from_method.name()),
                    Severity::Error,
                );
                continue;
            };

            let mut method_path = to_entry.path.clone();
            method_path.extend([SERVICE_METHOD, *to_i as i32]);
            let location = self.locate(to_entry.file, &method_path);
            let file = to_entry.file.name().to_string();

            let checks = [
                (
                    "RPC_SAME_REQUEST_TYPE",
                    normalize_type(from_method.input_type()),
                    normalize_type(to_method.input_type()),
                ),
                (
                    "RPC_SAME_RESPONSE_TYPE",
                    normalize_type(from_method.output_type()),
                    normalize_type(to_method.output_type()),
                ),
            ];
            for (rule, from_type, to_type) in checks {
                if from_type != to_type {
                    self.fail(
                        rule,
                        &file,
                        location,
                        format!(
                            "rpc {:?} of service {fq:?} changed type from {from_type:?} to {to_type:?}",
                            from_method.name()
                        ),
                        Severity::Error,
                    );
                }
            }

            if from_method.client_streaming() != to_method.client_streaming() {
                self.fail(
                    "RPC_SAME_CLIENT_STREAMING",
                    &file,
                    location,
                    format!(
                        "rpc {:?} of service {fq:?} changed client streaming",
                        from_method.name()
                    ),
                    Severity::Error,
                );
            }
            if from_method.server_streaming() != to_method.server_streaming() {
                self.fail(
                    "RPC_SAME_SERVER_STREAMING",
                    &file,
                    location,
                    format!(
                        "rpc {:?} of service {fq:?} changed server streaming",
                        from_method.name()
                    ),
                    Severity::Error,
                );
            }
        }
    }

    /// A non-beta file depending on a beta file couples stable
    /// consumers to an unstable schema.
    fn check_beta_deps(&mut self) {
        if self.options.allow_beta_deps {
            return;
        }
        for (name, file) in &self.to_index.files {
            if is_beta_package(file.package()) {
                continue;
            }
            for dep in &file.dependency {
                let Some(dep_file) = self.to_index.files.get(dep.as_str()) else {
                    continue;
                };
                if is_beta_package(dep_file.package()) {
                    self.fail(
                        "FILE_NO_BETA_DEPS",
                        name,
                        (1, 1),
                        format!("non-beta file {name:?} imports beta file {dep:?}"),
                        Severity::Error,
                    );
                }
            }
        }
    }
}

fn field_is_map(index: &TypeIndex<'_>, field: &FieldDescriptorProto) -> bool {
    field.r#type() == Type::Message
        && field.label() == Label::Repeated
        && index.is_map_entry(field.type_name())
}

fn join_fq(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{scope}.{name}")
    }
}

fn normalize_type(name: &str) -> String {
    name.trim_start_matches('.').to_string()
}

fn field_number_reserved(message: &DescriptorProto, number: i32) -> bool {
    // Message reserved ranges are end-exclusive.
    message
        .reserved_range
        .iter()
        .any(|r| number >= r.start() && number < r.end())
}

fn enum_number_reserved(decl: &EnumDescriptorProto, number: i32) -> bool {
    // Enum reserved ranges are end-inclusive.
    decl.reserved_range
        .iter()
        .any(|r| number >= r.start() && number <= r.end())
}

/// Wire-compatible scalar groups: varint integers (and bool), the
/// zigzag pair, and the fixed-width pairs.
fn types_compatible(from: &FieldDescriptorProto, to: &FieldDescriptorProto) -> bool {
    let from_type = from.r#type();
    let to_type = to.r#type();
    if from_type == to_type {
        return match from_type {
            Type::Message | Type::Enum | Type::Group => {
                normalize_type(from.type_name()) == normalize_type(to.type_name())
            }
            _ => true,
        };
    }
    const VARINT: [Type; 5] = [
        Type::Int32,
        Type::Int64,
        Type::Uint32,
        Type::Uint64,
        Type::Bool,
    ];
    const ZIGZAG: [Type; 2] = [Type::Sint32, Type::Sint64];
    const FIXED32: [Type; 2] = [Type::Fixed32, Type::Sfixed32];
    const FIXED64: [Type; 2] = [Type::Fixed64, Type::Sfixed64];
    for group in [&VARINT[..], &ZIGZAG[..], &FIXED32[..], &FIXED64[..]] {
        if group.contains(&from_type) && group.contains(&to_type) {
            return true;
        }
    }
    false
}

fn type_display(field: &FieldDescriptorProto) -> String {
    match field.r#type() {
        Type::Message | Type::Enum | Type::Group => normalize_type(field.type_name()),
        other => format!("{other:?}").to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, number: i32, r#type: Type) -> FieldDescriptorProto {
        FieldDescriptorProto {
            name: Some(name.to_string()),
            number: Some(number),
            label: Some(Label::Optional as i32),
            r#type: Some(r#type as i32),
            ..Default::default()
        }
    }

    fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
        DescriptorProto {
            name: Some(name.to_string()),
            field: fields,
            ..Default::default()
        }
    }

    fn file(name: &str, package: &str, messages: Vec<DescriptorProto>) -> FileDescriptorProto {
        FileDescriptorProto {
            name: Some(name.to_string()),
            package: Some(package.to_string()),
            syntax: Some("proto3".to_string()),
            message_type: messages,
            ..Default::default()
        }
    }

    fn set(files: Vec<FileDescriptorProto>) -> FileDescriptorSet {
        FileDescriptorSet { file: files }
    }

    fn check_sets(from: &FileDescriptorSet, to: &FileDescriptorSet) -> Vec<Failure> {
        check(from, to, &BreakOptions::default())
    }

    #[test]
    fn identical_sets_have_no_failures() {
        let s = set(vec![file(
            "a.proto",
            "pkg.v1",
            vec![message("M", vec![field("a", 1, Type::String)])],
        )]);
        assert!(check_sets(&s, &s).is_empty());
    }

    #[test]
    fn changed_field_type_is_breaking() {
        let from = set(vec![file(
            "a.proto",
            "pkg.v1",
            vec![message("M", vec![field("a", 1, Type::String)])],
        )]);
        let to = set(vec![file(
            "a.proto",
            "pkg.v1",
            vec![message("M", vec![field("a", 1, Type::Int32)])],
        )]);
        let failures = check_sets(&from, &to);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].rule_id.as_deref(), Some("FIELD_SAME_TYPE"));
        assert_eq!(failures[0].severity, Severity::Error);
    }

    #[test]
    fn varint_promotions_are_compatible() {
        let from = set(vec![file(
            "a.proto",
            "pkg.v1",
            vec![message("M", vec![field("a", 1, Type::Int32)])],
        )]);
        let to = set(vec![file(
            "a.proto",
            "pkg.v1",
            vec![message("M", vec![field("a", 1, Type::Int64)])],
        )]);
        assert!(check_sets(&from, &to).is_empty());

        let to_sint = set(vec![file(
            "a.proto",
            "pkg.v1",
            vec![message("M", vec![field("a", 1, Type::Sint32)])],
        )]);
        assert_eq!(check_sets(&from, &to_sint).len(), 1);
    }

    #[test]
    fn added_optional_field_is_compatible() {
        let from = set(vec![file(
            "a.proto",
            "pkg.v1",
            vec![message("M", vec![field("a", 1, Type::String)])],
        )]);
        let to = set(vec![file(
            "a.proto",
            "pkg.v1",
            vec![message(
                "M",
                vec![field("a", 1, Type::String), field("b", 2, Type::Int64)],
            )],
        )]);
        assert!(check_sets(&from, &to).is_empty());
    }

    #[test]
    fn removed_field_requires_reservation() {
        let from = set(vec![file(
            "a.proto",
            "pkg.v1",
            vec![message(
                "M",
                vec![field("a", 1, Type::String), field("b", 2, Type::Int64)],
            )],
        )]);
        let to = set(vec![file(
            "a.proto",
            "pkg.v1",
            vec![message("M", vec![field("a", 1, Type::String)])],
        )]);
        let failures = check_sets(&from, &to);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].rule_id.as_deref(), Some("FIELD_NOT_DELETED"));

        let mut reserved_msg = message("M", vec![field("a", 1, Type::String)]);
        reserved_msg
            .reserved_range
            .push(prost_types::descriptor_proto::ReservedRange {
                start: Some(2),
                end: Some(3),
            });
        let to_reserved = set(vec![file("a.proto", "pkg.v1", vec![reserved_msg])]);
        assert!(check_sets(&from, &to_reserved).is_empty());
    }

    #[test]
    fn field_rename_is_reported_not_breaking() {
        let from = set(vec![file(
            "a.proto",
            "pkg.v1",
            vec![message("M", vec![field("a", 1, Type::String)])],
        )]);
        let to = set(vec![file(
            "a.proto",
            "pkg.v1",
            vec![message("M", vec![field("renamed", 1, Type::String)])],
        )]);
        let failures = check_sets(&from, &to);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].rule_id.as_deref(), Some("FIELD_SAME_NAME"));
        assert_eq!(failures[0].severity, Severity::Warning);
    }

    #[test]
    fn label_change_is_breaking() {
        let from = set(vec![file(
            "a.proto",
            "pkg.v1",
            vec![message("M", vec![field("a", 1, Type::String)])],
        )]);
        let mut repeated = field("a", 1, Type::String);
        repeated.label = Some(Label::Repeated as i32);
        let to = set(vec![file("a.proto", "pkg.v1", vec![message("M", vec![repeated])])]);
        let failures = check_sets(&from, &to);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].rule_id.as_deref(), Some("FIELD_SAME_LABEL"));
    }

    #[test]
    fn deleted_message_and_beta_exemption() {
        let from = set(vec![
            file("a.proto", "pkg.v1", vec![message("M", vec![])]),
            file("b.proto", "pkg.v1beta1", vec![message("B", vec![])]),
        ]);
        let to = set(vec![
            file("a.proto", "pkg.v1", vec![]),
            file("b.proto", "pkg.v1beta1", vec![]),
        ]);
        let failures = check_sets(&from, &to);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].rule_id.as_deref(), Some("MESSAGE_NOT_DELETED"));

        let with_beta = check(
            &from,
            &to,
            &BreakOptions {
                include_beta: true,
                allow_beta_deps: false,
            },
        );
        assert_eq!(with_beta.len(), 2);
    }

    #[test]
    fn enum_value_rules() {
        let make_enum = |values: Vec<(&str, i32)>| EnumDescriptorProto {
            name: Some("E".to_string()),
            value: values
                .into_iter()
                .map(|(n, num)| prost_types::EnumValueDescriptorProto {
                    name: Some(n.to_string()),
                    number: Some(num),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };
        let mut from_file = file("a.proto", "pkg.v1", vec![]);
        from_file.enum_type = vec![make_enum(vec![("E_INVALID", 0), ("E_ONE", 1)])];
        let mut to_file = file("a.proto", "pkg.v1", vec![]);
        to_file.enum_type = vec![make_enum(vec![("E_INVALID", 0), ("E_ONE", 2)])];

        let failures = check_sets(&set(vec![from_file.clone()]), &set(vec![to_file]));
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].rule_id.as_deref(), Some("ENUM_VALUE_SAME_NUMBER"));

        let mut to_removed = file("a.proto", "pkg.v1", vec![]);
        to_removed.enum_type = vec![make_enum(vec![("E_INVALID", 0)])];
        let failures = check_sets(&set(vec![from_file]), &set(vec![to_removed]));
        assert_eq!(failures.len(), 1);
        assert_eq!(
            failures[0].rule_id.as_deref(),
            Some("ENUM_VALUE_NOT_DELETED")
        );
    }

    #[test]
    fn rpc_streaming_and_type_changes() {
        let make_service = |streaming: bool, response: &str| ServiceDescriptorProto {
            name: Some("S".to_string()),
            method: vec![MethodDescriptorProto {
                name: Some("Get".to_string()),
                input_type: Some(".pkg.v1.Req".to_string()),
                output_type: Some(response.to_string()),
                server_streaming: Some(streaming),
                ..Default::default()
            }],
            ..Default::default()
        };
        let types = vec![message("Req", vec![]), message("Resp", vec![]), message("Other", vec![])];
        let mut from_file = file("a.proto", "pkg.v1", types.clone());
        from_file.service = vec![make_service(false, ".pkg.v1.Resp")];
        let mut to_file = file("a.proto", "pkg.v1", types.clone());
        to_file.service = vec![make_service(true, ".pkg.v1.Resp")];

        let failures = check_sets(&set(vec![from_file.clone()]), &set(vec![to_file]));
        assert_eq!(failures.len(), 1);
        assert_eq!(
            failures[0].rule_id.as_deref(),
            Some("RPC_SAME_SERVER_STREAMING")
        );

        let mut to_other = file("a.proto", "pkg.v1", types);
        to_other.service = vec![make_service(false, ".pkg.v1.Other")];
        let failures = check_sets(&set(vec![from_file]), &set(vec![to_other]));
        assert_eq!(failures.len(), 1);
        assert_eq!(
            failures[0].rule_id.as_deref(),
            Some("RPC_SAME_RESPONSE_TYPE")
        );
    }

    #[test]
    fn beta_dependency_detection() {
        let mut stable = file("a.proto", "pkg.v1", vec![]);
        stable.dependency = vec!["b.proto".to_string()];
        let beta = file("b.proto", "pkg.v1beta1", vec![]);
        let s = set(vec![stable, beta]);

        let failures = check_sets(&s, &s);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].rule_id.as_deref(), Some("FILE_NO_BETA_DEPS"));

        let allowed = check(
            &s,
            &s,
            &BreakOptions {
                include_beta: false,
                allow_beta_deps: true,
            },
        );
        assert!(allowed.is_empty());
    }

    #[test]
    fn beta_package_detection() {
        assert!(is_beta_package("uber.trip.v1beta1"));
        assert!(is_beta_package("uber.beta.trip"));
        assert!(!is_beta_package("uber.trip.v1"));
        assert!(!is_beta_package("uber.betatrip.v1"));
    }
}
