use prototool_format::canonical;
use prototool_lang::lex;

const CORPUS: &[&str] = &[
    "syntax=\"proto3\";\n",
    "syntax = \"proto3\";\npackage a.v1;\nmessage M{string a=1;int64 b=2;}\n",
    r#"syntax = "proto3";

package uber.trip.v1;

import "google/protobuf/timestamp.proto";

option java_package = "com.uber.trip.v1";

// A trip.
message Trip {
  string id = 1; // primary key

  // Legs of the trip.
  repeated Leg legs = 2;
  map<string, int64> counters = 3;
  reserved 4, 6 to 10;

  oneof payment {
    string card_token = 11;
  }

  message Leg {
    string start = 1;
  }
}

enum TripStatus {
  TRIP_STATUS_INVALID = 0;
}

service TripService {
  rpc GetTrip(GetTripRequest) returns (GetTripResponse) {
    option idempotency_level = NO_SIDE_EFFECTS;
  }
}

message GetTripRequest {}

message GetTripResponse {}
"#,
    "syntax = \"proto2\";\nmessage L {\n  required int32 id = 1;\n  optional group Payload = 2 {\n    optional bytes data = 1;\n  }\n  extensions 100 to max;\n}\n",
    "// file comment\n\nsyntax = \"proto3\";\n\n/* block\n * comment\n */\nmessage M {\n  string a = 1;\n\n  int64 b = 2;\n}\n// trailing\n",
];

#[test]
fn formatting_is_idempotent_over_the_corpus() {
    for (i, src) in CORPUS.iter().enumerate() {
        let once = canonical("corpus.proto", src, None, false)
            .unwrap_or_else(|e| panic!("corpus {i}: {e}"));
        let twice = canonical("corpus.proto", &once, None, false)
            .unwrap_or_else(|e| panic!("corpus {i} reformat: {e}"));
        assert_eq!(once, twice, "corpus file {i} is not idempotent:\n{once}");
    }
}

#[test]
fn formatted_output_always_lexes_and_ends_with_newline() {
    for src in CORPUS {
        let formatted = canonical("corpus.proto", src, None, false).unwrap();
        assert!(formatted.ends_with('\n'));
        assert!(!formatted.ends_with("\n\n"));
        lex("corpus.proto", &formatted).unwrap();
    }
}

#[test]
fn line_comments_survive() {
    for src in CORPUS {
        let formatted = canonical("corpus.proto", src, None, false).unwrap();
        for line in src.lines() {
            let trimmed = line.trim();
            if let Some(comment) = trimmed.strip_prefix("// ") {
                assert!(
                    formatted.contains(comment),
                    "comment {comment:?} lost in:\n{formatted}"
                );
            }
        }
    }
}
