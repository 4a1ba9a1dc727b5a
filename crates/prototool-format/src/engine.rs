use std::path::Path;

use prototool_lang::{lex, parse};
use similar::TextDiff;
use tracing::debug;

use crate::error::FormatError;
use crate::printer::{print_with, PrintOptions};

/// The canonical form of `source`. With `fix` set and a configured
/// header, everything before the syntax declaration is replaced by
/// the header.
pub fn canonical(
    display_path: &str,
    source: &str,
    file_header: Option<&str>,
    fix: bool,
) -> Result<String, FormatError> {
    let stream = lex(display_path, source)?;
    let file = parse(display_path, &stream)?;
    let options = PrintOptions {
        file_header: if fix { file_header } else { None },
    };
    debug!(file = display_path, fix, "formatting");
    Ok(print_with(&file, &stream, &options))
}

/// Unified diff between original and formatted contents.
pub fn render_diff(path: &str, original: &str, formatted: &str) -> String {
    let diff = TextDiff::from_lines(original, formatted);
    diff.unified_diff()
        .context_radius(3)
        .header(&format!("a/{path}"), &format!("b/{path}"))
        .to_string()
}

/// Atomic write: temp file in the target directory, then rename.
pub fn write_atomic(path: &Path, contents: &str) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let temp = tempfile::NamedTempFile::new_in(dir)?;
    std::fs::write(temp.path(), contents)?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(src: &str) -> String {
        canonical("test.proto", src, None, false).unwrap()
    }

    #[test]
    fn normalizes_syntax_spacing() {
        assert_eq!(fmt("syntax=\"proto3\";\n"), "syntax = \"proto3\";\n");
    }

    #[test]
    fn diff_shows_insertion_of_spaces() {
        let original = "syntax=\"proto3\";\n";
        let formatted = fmt(original);
        let diff = render_diff("idl/bar.proto", original, &formatted);
        assert!(diff.contains("-syntax=\"proto3\";"));
        assert!(diff.contains("+syntax = \"proto3\";"));
    }

    #[test]
    fn canonical_layout_of_a_full_file() {
        let src = r#"syntax = "proto3";
package uber.trip.v1;
import "a.proto";
import "b.proto";
option java_package = "com.uber.trip.v1";
// A trip.
message Trip {
  string id=1;
  repeated string tags = 2 [deprecated=true];
  oneof payment {
    string card = 3;
  }
}
enum TripStatus {
  TRIP_STATUS_INVALID = 0;
}
"#;
        let formatted = fmt(src);
        let expected = r#"syntax = "proto3";

package uber.trip.v1;

import "a.proto";
import "b.proto";

option java_package = "com.uber.trip.v1";

// A trip.
message Trip {
  string id = 1;
  repeated string tags = 2 [deprecated = true];
  oneof payment {
    string card = 3;
  }
}

enum TripStatus {
  TRIP_STATUS_INVALID = 0;
}
"#;
        assert_eq!(formatted, expected);
    }

    #[test]
    fn formatting_is_idempotent() {
        let src = r#"// header note

syntax = "proto3";
package a.b.v1;

/* block
 * comment
 */
message M {
  // doc
  string a = 1; // trailing

  int64 b = 2;
  message Inner {}
  reserved 3, 5 to 9;
  reserved "old";
}

service S {
  rpc Get(M) returns (M) {
    option idempotency_level = NO_SIDE_EFFECTS;
  }
}
"#;
        let once = fmt(src);
        let twice = fmt(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn comments_survive_formatting() {
        let src = "syntax = \"proto3\";\n\n// keep me\nmessage M {\n  // and me\n  string a = 1; // me too\n}\n";
        let formatted = fmt(src);
        assert!(formatted.contains("// keep me"));
        assert!(formatted.contains("// and me"));
        assert!(formatted.contains("// me too"));
    }

    #[test]
    fn empty_bodies_collapse() {
        let formatted = fmt("syntax = \"proto3\";\nmessage Empty {\n}\n");
        assert!(formatted.contains("message Empty {}\n"));
    }

    #[test]
    fn file_header_fix_replaces_preamble() {
        let src = "// stale header\nsyntax = \"proto3\";\nmessage M {}\n";
        let header = "// Copyright 2019 Uber Technologies, Inc.";
        let formatted = canonical("test.proto", src, Some(header), true).unwrap();
        assert!(formatted.starts_with("// Copyright 2019 Uber Technologies, Inc.\n\nsyntax"));
        assert!(!formatted.contains("stale"));
    }

    #[test]
    fn proto2_groups_round_trip() {
        let src = "syntax = \"proto2\";\nmessage L {\n  optional group Details = 2 {\n    optional string note = 1;\n  }\n}\n";
        let once = fmt(src);
        assert!(once.contains("optional group Details = 2 {"));
        assert_eq!(once, fmt(&once));
    }
}
