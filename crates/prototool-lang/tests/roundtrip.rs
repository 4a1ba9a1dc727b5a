use prototool_lang::{lex, parse};

const CORPUS: &[&str] = &[
    // Minimal proto3.
    "syntax = \"proto3\";\n",
    // Realistic service file.
    r#"syntax = "proto3";

package uber.trip.v1;

import "google/protobuf/timestamp.proto";

option go_package = "tripv1pb";
option java_multiple_files = true;
option java_outer_classname = "TripProto";
option java_package = "com.uber.trip.v1";

// A single trip taken by a rider.
message Trip {
  string id = 1;
  google.protobuf.Timestamp started_at = 2;
  repeated Leg legs = 3;
  map<string, int64> counters = 4;
  reserved 5, 6 to 10;
  reserved "fare_cents";

  oneof payment {
    string card_token = 11;
    bytes cash_receipt = 12;
  }

  message Leg {
    string start_address = 1;
    string end_address = 2;
  }
}

enum TripStatus {
  TRIP_STATUS_INVALID = 0;
  TRIP_STATUS_ACTIVE = 1;
  TRIP_STATUS_COMPLETED = 2 [deprecated = true];
}

service TripService {
  // Fetch one trip.
  rpc GetTrip(GetTripRequest) returns (GetTripResponse);
  rpc WatchTrips(stream WatchTripsRequest) returns (stream WatchTripsResponse);
}

message GetTripRequest {
  string id = 1;
}

message GetTripResponse {
  Trip trip = 1;
}

message WatchTripsRequest {}

message WatchTripsResponse {
  Trip trip = 1;
}
"#,
    // proto2 constructs: groups, extensions, required.
    r#"syntax = "proto2";

package legacy;

message Record {
  required int32 id = 1;
  optional string name = 2 [default = "unknown"];
  optional group Payload = 3 {
    optional bytes data = 1;
  }
  extensions 100 to max;
}

extend Record {
  optional string annotation = 100;
}
"#,
    // Custom options, aggregates, weird spacing.
    "syntax = \"proto3\";\noption (my.file_opt) = { a: 1 b: \"two\" };\nmessage M { string f = 1 [(validate.rules).string = { min_len: 1 }, deprecated = true]; }\n",
    // Comment-heavy file.
    "// leading file comment\n\nsyntax = \"proto3\"; // trailing\n\n/* block */\nmessage M {\n  // field doc\n  string a = 1;\n}\n// trailing file comment\n",
];

#[test]
fn token_concatenation_reproduces_every_corpus_file() {
    for (i, src) in CORPUS.iter().enumerate() {
        let stream = lex("corpus.proto", src).unwrap_or_else(|e| panic!("corpus {i}: {e}"));
        assert_eq!(&stream.source(), src, "corpus file {i} did not round-trip");
    }
}

#[test]
fn every_corpus_file_parses() {
    for (i, src) in CORPUS.iter().enumerate() {
        let stream = lex("corpus.proto", src).unwrap();
        parse("corpus.proto", &stream).unwrap_or_else(|e| panic!("corpus {i}: {e}"));
    }
}

#[test]
fn arena_parents_are_consistent() {
    let stream = lex("corpus.proto", CORPUS[1]).unwrap();
    let file = parse("corpus.proto", &stream).unwrap();
    for (id, node) in file.arena.iter() {
        if let Some(parent) = node.parent {
            assert!(parent < file.arena.len());
            assert_ne!(parent, id);
        }
    }
    // Top-level nodes have no parent.
    for &id in &file.top_level {
        assert!(file.arena.get(id).parent.is_none());
    }
}
