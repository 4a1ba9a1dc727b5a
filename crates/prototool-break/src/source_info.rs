use std::collections::HashMap;

use prost_types::FileDescriptorProto;

/// Lookup from descriptor paths (per `SourceCodeInfo.Location.path`)
/// to 1-based source positions, built from the source info protoc
/// emits under `--include_source_info`.
pub struct SourceInfoIndex {
    locations: HashMap<Vec<i32>, (usize, usize)>,
}

impl SourceInfoIndex {
    pub fn build(file: &FileDescriptorProto) -> Self {
        let mut locations = HashMap::new();
        if let Some(info) = &file.source_code_info {
            for location in &info.location {
                // Spans are [start_line, start_col, ...], zero-based.
                if location.span.len() >= 2 {
                    locations.insert(
                        location.path.clone(),
                        (
                            location.span[0] as usize + 1,
                            location.span[1] as usize + 1,
                        ),
                    );
                }
            }
        }
        Self { locations }
    }

    pub fn lookup(&self, path: &[i32]) -> Option<(usize, usize)> {
        self.locations.get(path).copied()
    }

    /// Position for `path`, walking up to enclosing paths when the
    /// exact one is missing, and falling back to the file start.
    pub fn lookup_or_enclosing(&self, path: &[i32]) -> (usize, usize) {
        let mut prefix = path.to_vec();
        loop {
            if let Some(found) = self.lookup(&prefix) {
                return found;
            }
            if prefix.len() < 2 {
                return (1, 1);
            }
            prefix.truncate(prefix.len() - 2);
        }
    }
}

// Field numbers of the descriptor.proto messages, used to build
// source-info paths.
pub const FILE_MESSAGE_TYPE: i32 = 4;
pub const FILE_ENUM_TYPE: i32 = 5;
pub const FILE_SERVICE: i32 = 6;
pub const MESSAGE_FIELD: i32 = 2;
pub const MESSAGE_NESTED_TYPE: i32 = 3;
pub const MESSAGE_ENUM_TYPE: i32 = 4;
pub const ENUM_VALUE: i32 = 2;
pub const SERVICE_METHOD: i32 = 2;
