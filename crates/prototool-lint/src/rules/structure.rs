use std::collections::HashMap;

use prost_types::{DescriptorProto, FileDescriptorSet};
use prototool_lang::ast::{File, NodeKind, Syntax};

use crate::registry::{CheckContext, Group, Rule};

const UBER_UP: &[Group] = &[Group::Uber1, Group::Uber2];

pub fn rules() -> Vec<Rule> {
    vec![
        Rule {
            id: "SYNTAX_PROTO3",
            purpose: "Files must declare syntax proto3.",
            groups: UBER_UP,
            check_ast: Some(syntax_proto3),
            check_descriptors: None,
            fix: None,
        },
        Rule {
            id: "IMPORTS_NOT_PUBLIC",
            purpose: "Public imports are not allowed.",
            groups: UBER_UP,
            check_ast: Some(imports_not_public),
            check_descriptors: None,
            fix: None,
        },
        Rule {
            id: "IMPORTS_NOT_WEAK",
            purpose: "Weak imports are not allowed.",
            groups: UBER_UP,
            check_ast: Some(imports_not_weak),
            check_descriptors: None,
            fix: None,
        },
        Rule {
            id: "FILE_OPTIONS_REQUIRE_GO_PACKAGE",
            purpose: "Files must set option go_package.",
            groups: UBER_UP,
            check_ast: Some(require_go_package),
            check_descriptors: None,
            fix: None,
        },
        Rule {
            id: "FILE_OPTIONS_REQUIRE_JAVA_MULTIPLE_FILES",
            purpose: "Files must set option java_multiple_files.",
            groups: UBER_UP,
            check_ast: Some(require_java_multiple_files),
            check_descriptors: None,
            fix: None,
        },
        Rule {
            id: "FILE_OPTIONS_REQUIRE_JAVA_OUTER_CLASSNAME",
            purpose: "Files must set option java_outer_classname.",
            groups: UBER_UP,
            check_ast: Some(require_java_outer_classname),
            check_descriptors: None,
            fix: None,
        },
        Rule {
            id: "FILE_OPTIONS_REQUIRE_JAVA_PACKAGE",
            purpose: "Files must set option java_package.",
            groups: UBER_UP,
            check_ast: Some(require_java_package),
            check_descriptors: None,
            fix: None,
        },
        Rule {
            id: "REQUEST_RESPONSE_TYPES_UNIQUE",
            purpose: "Each RPC must have its own request and response message.",
            groups: UBER_UP,
            check_ast: Some(request_response_types_unique),
            check_descriptors: None,
            fix: None,
        },
        Rule {
            id: "REQUEST_RESPONSE_TYPES_IN_SAME_FILE",
            purpose: "RPC request and response messages must be defined in the same file as the service.",
            groups: UBER_UP,
            check_ast: None,
            check_descriptors: Some(request_response_types_in_same_file),
            fix: None,
        },
    ]
}

fn syntax_proto3(ctx: &mut CheckContext<'_>, file: &File) {
    if file.syntax != Syntax::Proto3 {
        match &file.syntax_span {
            Some(span) => ctx.fail_at_token(span.start, "syntax must be proto3"),
            None => ctx.fail(1, 1, "syntax must be proto3"),
        }
    }
}

fn imports_not_public(ctx: &mut CheckContext<'_>, file: &File) {
    for import in &file.imports {
        if import.kind == prototool_lang::ast::ImportKind::Public {
            ctx.fail_at_token(
                import.span.start,
                format!("import {:?} must not be public", import.path),
            );
        }
    }
}

fn imports_not_weak(ctx: &mut CheckContext<'_>, file: &File) {
    for import in &file.imports {
        if import.kind == prototool_lang::ast::ImportKind::Weak {
            ctx.fail_at_token(
                import.span.start,
                format!("import {:?} must not be weak", import.path),
            );
        }
    }
}

fn require_file_option(ctx: &mut CheckContext<'_>, file: &File, name: &str) {
    if !file.options.iter().any(|o| o.name == name) {
        ctx.fail(1, 1, format!("file does not set option {name}"));
    }
}

fn require_go_package(ctx: &mut CheckContext<'_>, file: &File) {
    require_file_option(ctx, file, "go_package");
}

fn require_java_multiple_files(ctx: &mut CheckContext<'_>, file: &File) {
    require_file_option(ctx, file, "java_multiple_files");
}

fn require_java_outer_classname(ctx: &mut CheckContext<'_>, file: &File) {
    require_file_option(ctx, file, "java_outer_classname");
}

fn require_java_package(ctx: &mut CheckContext<'_>, file: &File) {
    require_file_option(ctx, file, "java_package");
}

fn request_response_types_unique(ctx: &mut CheckContext<'_>, file: &File) {
    let mut seen: HashMap<String, String> = HashMap::new();
    for (_, node) in file.arena.iter() {
        if let NodeKind::Rpc(rpc) = &node.kind {
            for (type_name, what) in [
                (&rpc.request_type, "request"),
                (&rpc.response_type, "response"),
            ] {
                let key = type_name.trim_start_matches('.').to_string();
                match seen.get(&key) {
                    Some(user) => {
                        ctx.fail_at_token(
                            rpc.name_token,
                            format!("{what} type {key:?} is already used by rpc {user:?}"),
                        );
                    }
                    None => {
                        seen.insert(key, rpc.name.clone());
                    }
                }
            }
        }
    }
}

/// Resolve where each rpc request/response type is defined using the
/// compiled descriptors (which include all transitive imports) and
/// require the defining file to be the service's own file.
fn request_response_types_in_same_file(
    ctx: &mut CheckContext<'_>,
    file: &File,
    descriptors: &FileDescriptorSet,
) {
    let mut defined_in: HashMap<String, String> = HashMap::new();
    for fdp in &descriptors.file {
        let package = fdp.package.clone().unwrap_or_default();
        for message in &fdp.message_type {
            collect_message_names(&package, message, fdp.name(), &mut defined_in);
        }
    }

    let package = file.package.as_ref().map(|p| p.name.as_str()).unwrap_or("");
    let own_file = descriptors
        .file
        .iter()
        .find(|fdp| {
            fdp.package.as_deref().unwrap_or("") == package
                && file_basename(fdp.name()) == file_basename(&file.name)
        })
        .map(|fdp| fdp.name().to_string());
    let Some(own_file) = own_file else {
        return;
    };

    for (_, node) in file.arena.iter() {
        if let NodeKind::Rpc(rpc) = &node.kind {
            for type_name in [&rpc.request_type, &rpc.response_type] {
                let fq = resolve_fq(package, type_name);
                if let Some(defining) = defined_in.get(&fq) {
                    if defining != &own_file {
                        ctx.fail_at_token(
                            rpc.name_token,
                            format!("type {fq:?} is defined in {defining:?}, not in the service's file"),
                        );
                    }
                }
            }
        }
    }
}

fn collect_message_names(
    scope: &str,
    message: &DescriptorProto,
    file_name: &str,
    out: &mut HashMap<String, String>,
) {
    let fq = if scope.is_empty() {
        message.name().to_string()
    } else {
        format!("{scope}.{}", message.name())
    };
    out.insert(fq.clone(), file_name.to_string());
    for nested in &message.nested_type {
        collect_message_names(&fq, nested, file_name, out);
    }
}

fn resolve_fq(package: &str, type_name: &str) -> String {
    if let Some(stripped) = type_name.strip_prefix('.') {
        return stripped.to_string();
    }
    if package.is_empty() {
        type_name.to_string()
    } else {
        format!("{package}.{type_name}")
    }
}

fn file_basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
