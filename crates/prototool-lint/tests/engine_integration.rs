use std::path::{Path, PathBuf};

use prototool_config::Config;
use prototool_core::Failure;
use prototool_lang::{lex, parse};
use prototool_lint::engine::LintInput;

fn lint_with_config(src: &str, config: &Config) -> Vec<Failure> {
    let stream = lex("test.proto", src).unwrap();
    let file = parse("test.proto", &stream).unwrap();
    let input = LintInput {
        display_path: "test.proto".to_string(),
        abs_path: PathBuf::from("/work/test.proto"),
        file: &file,
        stream: &stream,
        descriptors: None,
        config,
    };
    prototool_lint::run(&[input]).unwrap()
}

fn uber2_config() -> Config {
    let mut config = Config::default_for(Path::new("/work"));
    config.lint.group = Some("uber2".to_string());
    config
}

const CLEAN_UBER2: &str = r#"syntax = "proto3";

package uber.trip.v1;

option go_package = "tripv1pb";
option java_multiple_files = true;
option java_outer_classname = "TripProto";
option java_package = "com.uber.trip.v1";

// A trip taken by a rider.
message Trip {
  string id = 1;

  oneof payment_method {
    string card_token = 2;
  }
}

// Status of a trip.
enum TripStatus {
  TRIP_STATUS_INVALID = 0;
  TRIP_STATUS_ACTIVE = 1;
}

// Operations over trips.
service TripService {
  // Fetch one trip by id.
  rpc GetTrip(GetTripRequest) returns (GetTripResponse);
}

// Request for TripService.GetTrip.
message GetTripRequest {
  string id = 1;
}

// Response for TripService.GetTrip.
message GetTripResponse {
  Trip trip = 1;
}
"#;

#[test]
fn clean_uber2_file_has_no_failures() {
    let failures = lint_with_config(CLEAN_UBER2, &uber2_config());
    assert!(failures.is_empty(), "unexpected failures: {failures:?}");
}

#[test]
fn uber2_flags_missing_comments_that_uber1_allows() {
    let src = r#"syntax = "proto3";

package uber.trip.v1;

option go_package = "tripv1pb";
option java_multiple_files = true;
option java_outer_classname = "TripProto";
option java_package = "com.uber.trip.v1";

message Trip {
  string id = 1;
}
"#;
    let mut uber1 = Config::default_for(Path::new("/work"));
    uber1.lint.group = Some("uber1".to_string());
    let uber1_failures = lint_with_config(src, &uber1);
    assert!(
        uber1_failures
            .iter()
            .all(|f| f.rule_id.as_deref() != Some("MESSAGES_HAVE_COMMENTS")),
        "uber1 should not require comments: {uber1_failures:?}"
    );

    let uber2_failures = lint_with_config(src, &uber2_config());
    assert!(uber2_failures
        .iter()
        .any(|f| f.rule_id.as_deref() == Some("MESSAGES_HAVE_COMMENTS")));
    // uber2 also wants a versioned-or-beta package; uber.trip.v1 passes.
    assert!(uber2_failures
        .iter()
        .all(|f| f.rule_id.as_deref() != Some("PACKAGE_MAJOR_BETA_VERSIONED")));
}

#[test]
fn naming_violations_point_at_the_offending_token() {
    let src = "syntax = \"proto3\";\nmessage trip_record {\n  string BadName = 1;\n}\n";
    let mut config = Config::default_for(Path::new("/work"));
    config.lint.group = Some("google".to_string());
    let failures = lint_with_config(src, &config);

    let message_failure = failures
        .iter()
        .find(|f| f.rule_id.as_deref() == Some("MESSAGE_NAMES_CAPITALIZED"))
        .unwrap();
    assert_eq!((message_failure.line, message_failure.column), (2, 9));

    let field_failure = failures
        .iter()
        .find(|f| f.rule_id.as_deref() == Some("MESSAGE_FIELD_NAMES_LOWER_SNAKE_CASE"))
        .unwrap();
    assert_eq!((field_failure.line, field_failure.column), (3, 10));
}
