use prototool_lang::ast::{File, NodeKind};

use crate::registry::{CheckContext, Group, Rule};

use super::{is_camel_case, is_capitalized, is_lower_snake_case, is_upper_snake_case, to_upper_snake};

const GOOGLE_UP: &[Group] = &[Group::Google, Group::Uber1, Group::Uber2];
const UBER_UP: &[Group] = &[Group::Uber1, Group::Uber2];
const UBER2_ONLY: &[Group] = &[Group::Uber2];

pub fn rules() -> Vec<Rule> {
    vec![
        Rule {
            id: "PACKAGE_IS_DECLARED",
            purpose: "Files must declare a package.",
            groups: GOOGLE_UP,
            check_ast: Some(package_is_declared),
            check_descriptors: None,
            fix: None,
        },
        Rule {
            id: "PACKAGE_LOWER_SNAKE_CASE",
            purpose: "Package components must be lower_snake_case.",
            groups: GOOGLE_UP,
            check_ast: Some(package_lower_snake_case),
            check_descriptors: None,
            fix: None,
        },
        Rule {
            id: "PACKAGE_MAJOR_BETA_VERSIONED",
            purpose: "Packages must end in a major or beta version component such as v1 or v1beta1.",
            groups: UBER2_ONLY,
            check_ast: Some(package_major_beta_versioned),
            check_descriptors: None,
            fix: None,
        },
        Rule {
            id: "MESSAGE_NAMES_CAPITALIZED",
            purpose: "Message names must start with an uppercase letter.",
            groups: GOOGLE_UP,
            check_ast: Some(message_names_capitalized),
            check_descriptors: None,
            fix: None,
        },
        Rule {
            id: "MESSAGE_NAMES_CAMEL_CASE",
            purpose: "Message names must be CamelCase.",
            groups: GOOGLE_UP,
            check_ast: Some(message_names_camel_case),
            check_descriptors: None,
            fix: None,
        },
        Rule {
            id: "MESSAGE_FIELD_NAMES_LOWER_SNAKE_CASE",
            purpose: "Field names must be lower_snake_case.",
            groups: GOOGLE_UP,
            check_ast: Some(field_names_lower_snake_case),
            check_descriptors: None,
            fix: None,
        },
        Rule {
            id: "ENUM_NAMES_CAPITALIZED",
            purpose: "Enum names must start with an uppercase letter.",
            groups: GOOGLE_UP,
            check_ast: Some(enum_names_capitalized),
            check_descriptors: None,
            fix: None,
        },
        Rule {
            id: "ENUM_NAMES_CAMEL_CASE",
            purpose: "Enum names must be CamelCase.",
            groups: GOOGLE_UP,
            check_ast: Some(enum_names_camel_case),
            check_descriptors: None,
            fix: None,
        },
        Rule {
            id: "ENUM_VALUE_NAMES_UPPER_SNAKE_CASE",
            purpose: "Enum value names must be UPPER_SNAKE_CASE.",
            groups: GOOGLE_UP,
            check_ast: Some(enum_value_names_upper_snake_case),
            check_descriptors: None,
            fix: None,
        },
        Rule {
            id: "ENUM_FIELD_PREFIXES",
            purpose: "Enum value names must be prefixed with the UPPER_SNAKE_CASE enum name.",
            groups: UBER_UP,
            check_ast: Some(enum_field_prefixes),
            check_descriptors: None,
            fix: None,
        },
        Rule {
            id: "ENUM_ZERO_VALUES_INVALID",
            purpose: "Enum zero values must be named <ENUM_NAME>_INVALID.",
            groups: UBER_UP,
            check_ast: Some(enum_zero_values_invalid),
            check_descriptors: None,
            fix: None,
        },
        Rule {
            id: "SERVICE_NAMES_CAPITALIZED",
            purpose: "Service names must start with an uppercase letter.",
            groups: GOOGLE_UP,
            check_ast: Some(service_names_capitalized),
            check_descriptors: None,
            fix: None,
        },
        Rule {
            id: "SERVICE_NAMES_CAMEL_CASE",
            purpose: "Service names must be CamelCase.",
            groups: GOOGLE_UP,
            check_ast: Some(service_names_camel_case),
            check_descriptors: None,
            fix: None,
        },
        Rule {
            id: "RPC_NAMES_CAPITALIZED",
            purpose: "RPC names must start with an uppercase letter.",
            groups: GOOGLE_UP,
            check_ast: Some(rpc_names_capitalized),
            check_descriptors: None,
            fix: None,
        },
        Rule {
            id: "RPC_NAMES_CAMEL_CASE",
            purpose: "RPC names must be CamelCase.",
            groups: GOOGLE_UP,
            check_ast: Some(rpc_names_camel_case),
            check_descriptors: None,
            fix: None,
        },
        Rule {
            id: "ONEOF_NAMES_LOWER_SNAKE_CASE",
            purpose: "Oneof names must be lower_snake_case.",
            groups: UBER_UP,
            check_ast: Some(oneof_names_lower_snake_case),
            check_descriptors: None,
            fix: None,
        },
    ]
}

fn package_is_declared(ctx: &mut CheckContext<'_>, file: &File) {
    if file.package.is_none() {
        ctx.fail(1, 1, "file does not declare a package");
    }
}

fn package_lower_snake_case(ctx: &mut CheckContext<'_>, file: &File) {
    let Some(package) = &file.package else {
        return;
    };
    for component in package.name.split('.') {
        if !is_lower_snake_case(component) {
            ctx.fail_at_token(
                package.span.start,
                format!("package component {component:?} is not lower_snake_case"),
            );
        }
    }
}

fn package_major_beta_versioned(ctx: &mut CheckContext<'_>, file: &File) {
    let Some(package) = &file.package else {
        return;
    };
    let last = package.name.rsplit('.').next().unwrap_or("");
    if !is_version_component(last) {
        ctx.fail_at_token(
            package.span.start,
            format!("package {:?} must end in a version component such as v1 or v1beta1", package.name),
        );
    }
}

fn is_version_component(s: &str) -> bool {
    let Some(rest) = s.strip_prefix('v') else {
        return false;
    };
    match rest.split_once("beta") {
        Some((major, beta)) => {
            !major.is_empty()
                && major.chars().all(|c| c.is_ascii_digit())
                && !beta.is_empty()
                && beta.chars().all(|c| c.is_ascii_digit())
        }
        None => !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()),
    }
}

fn for_each_message(ctx: &mut CheckContext<'_>, file: &File, f: fn(&mut CheckContext<'_>, &str, usize)) {
    for (_, node) in file.arena.iter() {
        if let NodeKind::Message(m) = &node.kind {
            f(ctx, &m.name, m.name_token);
        }
    }
}

fn message_names_capitalized(ctx: &mut CheckContext<'_>, file: &File) {
    for_each_message(ctx, file, |ctx, name, token| {
        if !is_capitalized(name) {
            ctx.fail_at_token(token, format!("message name {name:?} is not capitalized"));
        }
    });
}

fn message_names_camel_case(ctx: &mut CheckContext<'_>, file: &File) {
    for_each_message(ctx, file, |ctx, name, token| {
        if !is_camel_case(name) {
            ctx.fail_at_token(token, format!("message name {name:?} is not CamelCase"));
        }
    });
}

fn field_names_lower_snake_case(ctx: &mut CheckContext<'_>, file: &File) {
    for (_, node) in file.arena.iter() {
        if let NodeKind::Field(field) = &node.kind {
            // Group fields carry the capitalized group name.
            if field.group.is_some() {
                continue;
            }
            if !is_lower_snake_case(&field.name) {
                ctx.fail_at_token(
                    field.name_token,
                    format!("field name {:?} is not lower_snake_case", field.name),
                );
            }
        }
    }
}

fn enum_names_capitalized(ctx: &mut CheckContext<'_>, file: &File) {
    for (_, node) in file.arena.iter() {
        if let NodeKind::Enum(e) = &node.kind {
            if !is_capitalized(&e.name) {
                ctx.fail_at_token(e.name_token, format!("enum name {:?} is not capitalized", e.name));
            }
        }
    }
}

fn enum_names_camel_case(ctx: &mut CheckContext<'_>, file: &File) {
    for (_, node) in file.arena.iter() {
        if let NodeKind::Enum(e) = &node.kind {
            if !is_camel_case(&e.name) {
                ctx.fail_at_token(e.name_token, format!("enum name {:?} is not CamelCase", e.name));
            }
        }
    }
}

fn enum_value_names_upper_snake_case(ctx: &mut CheckContext<'_>, file: &File) {
    for (_, node) in file.arena.iter() {
        if let NodeKind::Enum(e) = &node.kind {
            for value in e.values() {
                if !is_upper_snake_case(&value.name) {
                    ctx.fail_at_token(
                        value.name_token,
                        format!("enum value name {:?} is not UPPER_SNAKE_CASE", value.name),
                    );
                }
            }
        }
    }
}

fn enum_field_prefixes(ctx: &mut CheckContext<'_>, file: &File) {
    for (_, node) in file.arena.iter() {
        if let NodeKind::Enum(e) = &node.kind {
            let prefix = format!("{}_", to_upper_snake(&e.name));
            for value in e.values() {
                if !value.name.starts_with(&prefix) {
                    ctx.fail_at_token(
                        value.name_token,
                        format!("enum value name {:?} is not prefixed with {prefix:?}", value.name),
                    );
                }
            }
        }
    }
}

fn enum_zero_values_invalid(ctx: &mut CheckContext<'_>, file: &File) {
    for (_, node) in file.arena.iter() {
        if let NodeKind::Enum(e) = &node.kind {
            let expected = format!("{}_INVALID", to_upper_snake(&e.name));
            for value in e.values() {
                if value.number == 0 && value.name != expected {
                    ctx.fail_at_token(
                        value.name_token,
                        format!("enum zero value must be named {expected:?}, found {:?}", value.name),
                    );
                }
            }
        }
    }
}

fn service_names_capitalized(ctx: &mut CheckContext<'_>, file: &File) {
    for (_, node) in file.arena.iter() {
        if let NodeKind::Service(s) = &node.kind {
            if !is_capitalized(&s.name) {
                ctx.fail_at_token(s.name_token, format!("service name {:?} is not capitalized", s.name));
            }
        }
    }
}

fn service_names_camel_case(ctx: &mut CheckContext<'_>, file: &File) {
    for (_, node) in file.arena.iter() {
        if let NodeKind::Service(s) = &node.kind {
            if !is_camel_case(&s.name) {
                ctx.fail_at_token(s.name_token, format!("service name {:?} is not CamelCase", s.name));
            }
        }
    }
}

fn rpc_names_capitalized(ctx: &mut CheckContext<'_>, file: &File) {
    for (_, node) in file.arena.iter() {
        if let NodeKind::Rpc(r) = &node.kind {
            if !is_capitalized(&r.name) {
                ctx.fail_at_token(r.name_token, format!("rpc name {:?} is not capitalized", r.name));
            }
        }
    }
}

fn rpc_names_camel_case(ctx: &mut CheckContext<'_>, file: &File) {
    for (_, node) in file.arena.iter() {
        if let NodeKind::Rpc(r) = &node.kind {
            if !is_camel_case(&r.name) {
                ctx.fail_at_token(r.name_token, format!("rpc name {:?} is not CamelCase", r.name));
            }
        }
    }
}

fn oneof_names_lower_snake_case(ctx: &mut CheckContext<'_>, file: &File) {
    for (_, node) in file.arena.iter() {
        if let NodeKind::Oneof(o) = &node.kind {
            if !is_lower_snake_case(&o.name) {
                ctx.fail_at_token(o.name_token, format!("oneof name {:?} is not lower_snake_case", o.name));
            }
        }
    }
}
