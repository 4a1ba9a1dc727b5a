use std::collections::{BTreeMap, BTreeSet};

use clap::{Args, Subcommand};
use prost_types::FileDescriptorSet;
use prototool_core::Failure;

use crate::commands::{DirArgs, GlobalFlags};
use crate::ops;

#[derive(Subcommand)]
pub enum InspectCommands {
    /// List all packages in the compiled schema
    Packages(DirArgs),
    /// List the packages a package depends on
    PackageDeps(NameArgs),
    /// List the packages that import a package
    PackageImporters(NameArgs),
}

#[derive(Args)]
pub struct NameArgs {
    #[command(flatten)]
    pub dir: DirArgs,
    /// The package to inspect
    #[arg(long)]
    pub name: String,
}

pub async fn run(command: InspectCommands, flags: &GlobalFlags) -> anyhow::Result<Vec<Failure>> {
    let dir = match &command {
        InspectCommands::Packages(args) => args.dir_or_file.clone(),
        InspectCommands::PackageDeps(args) | InspectCommands::PackageImporters(args) => {
            args.dir.dir_or_file.clone()
        }
    };
    let workspace = ops::discover_input(dir.as_deref(), flags)?;
    let results = ops::compile_workspace(flags, &workspace).await?;
    let failures: Vec<Failure> = results.iter().flat_map(|r| r.failures.clone()).collect();
    if !failures.is_empty() {
        return Ok(failures);
    }
    let set = ops::merged_descriptor_set(&results);

    match command {
        InspectCommands::Packages(_) => {
            for package in packages(&set) {
                println!("{package}");
            }
        }
        InspectCommands::PackageDeps(args) => {
            for dep in package_deps(&set, &args.name)? {
                println!("{dep}");
            }
        }
        InspectCommands::PackageImporters(args) => {
            for importer in package_importers(&set, &args.name)? {
                println!("{importer}");
            }
        }
    }
    Ok(Vec::new())
}

fn packages(set: &FileDescriptorSet) -> BTreeSet<String> {
    set.file.iter().map(|f| f.package().to_string()).collect()
}

/// Map of file name to its package, and package to its files.
fn package_files(set: &FileDescriptorSet) -> BTreeMap<String, Vec<&prost_types::FileDescriptorProto>> {
    let mut map: BTreeMap<String, Vec<&prost_types::FileDescriptorProto>> = BTreeMap::new();
    for file in &set.file {
        map.entry(file.package().to_string()).or_default().push(file);
    }
    map
}

fn package_deps(set: &FileDescriptorSet, name: &str) -> anyhow::Result<BTreeSet<String>> {
    let by_package = package_files(set);
    let Some(files) = by_package.get(name) else {
        anyhow::bail!("package {name:?} not found");
    };
    let file_packages: BTreeMap<&str, &str> = set
        .file
        .iter()
        .map(|f| (f.name(), f.package()))
        .collect();
    let mut deps = BTreeSet::new();
    for file in files {
        for dep in &file.dependency {
            if let Some(package) = file_packages.get(dep.as_str()) {
                if *package != name {
                    deps.insert(package.to_string());
                }
            }
        }
    }
    Ok(deps)
}

fn package_importers(set: &FileDescriptorSet, name: &str) -> anyhow::Result<BTreeSet<String>> {
    if !set.file.iter().any(|f| f.package() == name) {
        anyhow::bail!("package {name:?} not found");
    }
    let target_files: BTreeSet<&str> = set
        .file
        .iter()
        .filter(|f| f.package() == name)
        .map(|f| f.name())
        .collect();
    let mut importers = BTreeSet::new();
    for file in &set.file {
        if file.package() == name {
            continue;
        }
        if file
            .dependency
            .iter()
            .any(|d| target_files.contains(d.as_str()))
        {
            importers.insert(file.package().to_string());
        }
    }
    Ok(importers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost_types::FileDescriptorProto;

    fn file(name: &str, package: &str, deps: Vec<&str>) -> FileDescriptorProto {
        FileDescriptorProto {
            name: Some(name.to_string()),
            package: Some(package.to_string()),
            dependency: deps.into_iter().map(String::from).collect(),
            ..Default::default()
        }
    }

    fn sample() -> FileDescriptorSet {
        FileDescriptorSet {
            file: vec![
                file("a.proto", "pkg.a", vec![]),
                file("b.proto", "pkg.b", vec!["a.proto"]),
                file("c.proto", "pkg.c", vec!["a.proto", "b.proto"]),
            ],
        }
    }

    #[test]
    fn packages_are_sorted_and_deduplicated() {
        let set = sample();
        let all: Vec<String> = packages(&set).into_iter().collect();
        assert_eq!(all, vec!["pkg.a", "pkg.b", "pkg.c"]);
    }

    #[test]
    fn deps_and_importers() {
        let set = sample();
        let deps: Vec<String> = package_deps(&set, "pkg.c").unwrap().into_iter().collect();
        assert_eq!(deps, vec!["pkg.a", "pkg.b"]);

        let importers: Vec<String> = package_importers(&set, "pkg.a")
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(importers, vec!["pkg.b", "pkg.c"]);

        assert!(package_deps(&set, "missing").is_err());
    }
}
