use crate::model::DEFAULT_PROTOC_VERSION;

/// Template for `config init`. Lines starting with the `{V}` marker
/// hold optional settings: the marker becomes `#` by default and is
/// stripped entirely when uncommenting.
const TEMPLATE: &str = r#"# Paths to exclude when searching for Protobuf files.
{V}excludes:
{V}  - path/to/a
{V}  - path/to/b/file.proto

# Protoc directives.
protoc:
  # The Protobuf version to use from the official releases.
  # You probably want to set this to make your builds completely reproducible.
  version: {VERSION}

  # Additional paths to include with -I to protoc.
  # By default, the directory of the config file is included.
  {V}includes:
  {V}  - ../../vendor/github.com/grpc-ecosystem/grpc-gateway/third_party/googleapis

  # If not set, compile will fail if there are unused imports.
  # Setting this will ignore unused imports.
  {V}allow_unused_imports: true

# Create directives.
{V}create:
  # List of mappings from relative directory to base package.
  # This affects how packages are generated with create.
  {V}packages:
    # A file created "a/b/foo.proto" under the current directory will have package "bar.a.b".
    {V}- directory: .
    {V}  name: bar
    # A file created "idl/code.uber/a/b/c.proto" will have package "uber.a.b".
    {V}- directory: idl/code.uber
    {V}  name: uber

# Lint directives.
{V}lint:
  # The lint group to use.
  # The default group is "uber1".
  # Run prototool lint --list-all-lint-groups to see all available lint groups.
  # Setting this value will result in lint.rules.no_default being ignored.
  {V}group: uber2

  # Linter files to ignore.
  {V}ignores:
  {V}  - id: RPC_NAMES_CAMEL_CASE
  {V}    files:
  {V}      - path/to/foo.proto
  {V}      - path/to/bar.proto

  # Linter rules.
  # Run prototool lint --list-all-linters to see all available linters.
  {V}rules:
    # Determines whether or not to include the default set of linters.
    # This value is ignored if lint.group is set.
    {V}no_default: true

    # The specific linters to add.
    {V}add:
    {V}  - ENUM_NAMES_CAMEL_CASE
    {V}  - ENUM_NAMES_CAPITALIZED

    # The specific linters to remove.
    {V}remove:
    {V}  - SYNTAX_PROTO3

  # The path to the file header for all Protobuf files.
  # If is_commented is set, the file is assumed to already have comments
  # and is added directly; otherwise "// " is added before every line.
  {V}file_header:
  {V}  path: path/to/protobuf_file_header.txt
  {V}  is_commented: true

# Code generation directives.
{V}generate:
  # Options that will apply to all plugins of type go.
  {V}go_options:
    # The base import path. This should be the go path of the config file directory.
    {V}import_path: uber.com/foo/bar.git/idl

  # Plugin overrides and outputs.
  {V}plugins:
    {V}- name: gogo
    {V}  type: gogo
    {V}  flags: plugins=grpc
    {V}  output: ../../.gen/proto/go
    {V}- name: descriptor_set
    {V}  output: descriptors
    {V}  file_suffix: bin
    {V}  include_imports: true
"#;

/// Render the initial `prototool.yaml`. With `uncomment` every
/// optional stanza is active; otherwise only `protoc.version` is.
pub fn generate(protoc_version: Option<&str>, uncomment: bool) -> String {
    let version = protoc_version.unwrap_or(DEFAULT_PROTOC_VERSION);
    let marker = if uncomment { "" } else { "#" };
    TEMPLATE
        .replace("{VERSION}", version)
        .replace("{V}", marker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ConfigDocument;

    #[test]
    fn commented_template_parses_with_only_version() {
        let rendered = generate(None, false);
        let doc: ConfigDocument = serde_yaml::from_str(&rendered).unwrap();
        assert_eq!(doc.protoc.version.as_deref(), Some(DEFAULT_PROTOC_VERSION));
        assert!(doc.excludes.is_empty());
        assert!(doc.lint.group.is_none());
    }

    #[test]
    fn uncommented_template_is_a_valid_config() {
        let rendered = generate(Some("3.11.4"), true);
        let doc: ConfigDocument = serde_yaml::from_str(&rendered).unwrap();
        assert_eq!(doc.protoc.version.as_deref(), Some("3.11.4"));
        assert_eq!(doc.lint.group.as_deref(), Some("uber2"));
        assert_eq!(doc.generate.plugins.len(), 2);
        assert_eq!(doc.excludes.len(), 2);
    }
}
