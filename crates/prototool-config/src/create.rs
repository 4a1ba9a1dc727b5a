use std::path::Path;

use crate::model::Config;

/// Derive the package for a new `.proto` at `path` from the config's
/// create rules. The deepest matching `directory` wins; the package
/// is its `name` plus the remaining directory components.
pub fn derive_package(config: &Config, path: &Path) -> String {
    let file_dir = path.parent().unwrap_or(Path::new(""));
    let rel = file_dir.strip_prefix(&config.dir).unwrap_or(file_dir);
    let rel_components: Vec<String> = rel
        .components()
        .map(|c| sanitize(&c.as_os_str().to_string_lossy()))
        .collect();

    let mut best: Option<(usize, &str)> = None;
    for rule in &config.create_packages {
        let rule_components: Vec<&str> = if rule.directory == "." {
            Vec::new()
        } else {
            rule.directory.split('/').filter(|c| !c.is_empty()).collect()
        };
        if rule_components.len() > rel_components.len() {
            continue;
        }
        let matches = rule_components
            .iter()
            .zip(rel_components.iter())
            .all(|(a, b)| a == b);
        if matches && best.map_or(true, |(depth, _)| rule_components.len() >= depth) {
            best = Some((rule_components.len(), &rule.name));
        }
    }

    match best {
        Some((depth, base)) => {
            let mut parts = vec![base.to_string()];
            parts.extend(rel_components.into_iter().skip(depth));
            parts.join(".")
        }
        None if rel_components.is_empty() => "proto".to_string(),
        None => rel_components.join("."),
    }
}

/// Render the initial contents for a new `.proto` file: optional
/// configured header, syntax declaration, package, and the standard
/// file options derived from the package.
pub fn scaffold_file(config: &Config, path: &Path, package: &str) -> std::io::Result<String> {
    let mut out = String::new();

    if let Some(header) = &config.lint.file_header {
        let raw = std::fs::read_to_string(&header.path)?;
        if header.is_commented {
            out.push_str(&raw);
        } else {
            for line in raw.lines() {
                if line.is_empty() {
                    out.push_str("//\n");
                } else {
                    out.push_str("// ");
                    out.push_str(line);
                    out.push('\n');
                }
            }
        }
        if !out.ends_with('\n') {
            out.push('\n');
        }
        out.push('\n');
    }

    out.push_str("syntax = \"proto3\";\n\n");
    out.push_str(&format!("package {package};\n\n"));

    let last = package.rsplit('.').next().unwrap_or(package);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    out.push_str(&format!("option go_package = \"{last}pb\";\n"));
    out.push_str("option java_multiple_files = true;\n");
    out.push_str(&format!(
        "option java_outer_classname = \"{}Proto\";\n",
        upper_camel_case(&stem)
    ));
    out.push_str(&format!("option java_package = \"com.{package}\";\n"));
    Ok(out)
}

fn sanitize(component: &str) -> String {
    component.replace('-', "_").to_lowercase()
}

fn upper_camel_case(s: &str) -> String {
    s.split(|c: char| c == '_' || c == '-' || c == '.')
        .filter(|p| !p.is_empty())
        .map(|p| {
            let mut chars = p.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CreatePackage;
    use std::path::PathBuf;

    fn config_with_rules(dir: &str, rules: Vec<(&str, &str)>) -> Config {
        let mut config = Config::default_for(Path::new(dir));
        config.create_packages = rules
            .into_iter()
            .map(|(directory, name)| CreatePackage {
                directory: directory.to_string(),
                name: name.to_string(),
            })
            .collect();
        config
    }

    #[test]
    fn dot_rule_prefixes_base_package() {
        let config = config_with_rules("/repo", vec![(".", "uber")]);
        assert_eq!(
            derive_package(&config, &PathBuf::from("/repo/a/b.proto")),
            "uber.a"
        );
        assert_eq!(
            derive_package(&config, &PathBuf::from("/repo/top.proto")),
            "uber"
        );
    }

    #[test]
    fn deepest_directory_rule_wins() {
        let config = config_with_rules(
            "/repo",
            vec![(".", "bar"), ("idl/code.uber", "uber")],
        );
        assert_eq!(
            derive_package(&config, &PathBuf::from("/repo/idl/code.uber/a/b/c.proto")),
            "uber.a.b"
        );
        assert_eq!(
            derive_package(&config, &PathBuf::from("/repo/other/x.proto")),
            "bar.other"
        );
    }

    #[test]
    fn no_rules_falls_back_to_path_components() {
        let config = config_with_rules("/repo", vec![]);
        assert_eq!(
            derive_package(&config, &PathBuf::from("/repo/a/b/c.proto")),
            "a.b"
        );
        assert_eq!(
            derive_package(&config, &PathBuf::from("/repo/top.proto")),
            "proto"
        );
    }

    #[test]
    fn scaffold_contains_package_and_options() {
        let config = config_with_rules("/repo", vec![(".", "uber")]);
        let content =
            scaffold_file(&config, &PathBuf::from("/repo/a/user_event.proto"), "uber.a").unwrap();
        assert!(content.starts_with("syntax = \"proto3\";\n"));
        assert!(content.contains("package uber.a;\n"));
        assert!(content.contains("option java_outer_classname = \"UserEventProto\";\n"));
        assert!(content.contains("option go_package = \"apb\";\n"));
    }
}
