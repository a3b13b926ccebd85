use std::str::FromStr;

use insta::assert_snapshot;
use test_case::test_case;

use super::*;

#[test_case("Friendly.Bard")]
#[test_case("friendly_bard")]
#[test_case("FRIENDLY--BARD")]
#[test_case("friendly-bard")]
#[test_case("Friendly-._Bard")]
fn canonicalize_is_case_and_separator_insensitive(input: &str) {
    assert_eq!(canonicalize_name(input), "friendly-bard");
    assert_eq!(PackageName::from_str(input).unwrap().as_ref(), "friendly-bard");
    assert_eq!(ExtraName::from_str(input).unwrap().as_ref(), "friendly-bard");
}

#[test_case("Friendly.Bard")]
#[test_case("__init__")]
#[test_case("a..b__c--d")]
#[test_case("ÄÖÜ_x")]
#[test_case("")]
fn canonicalize_is_idempotent(input: &str) {
    let once = canonicalize_name(input);
    assert_eq!(canonicalize_name(&once), once);
}

#[test]
fn canonicalize_accepts_names_the_validators_reject() {
    assert_eq!(canonicalize_name("_private_"), "-private-");
    assert_eq!(canonicalize_name("Has Space"), "has space");
    assert!(PackageName::from_str("_private_").is_err());
    assert!(PackageName::from_str("Has Space").is_err());
}

#[test]
fn normalize_owned() {
    let inputs = [
        "friendly-bard",
        "Friendly-Bard",
        "FRIENDLY-BARD",
        "friendly.bard",
        "friendly_bard",
        "friendly--bard",
        "friendly-.bard",
        "FrIeNdLy-._.-bArD",
    ];
    for input in inputs {
        assert_eq!(
            validated_owned_name(input.to_string()).unwrap(),
            "friendly-bard"
        );
        assert_eq!(validated_name(input).unwrap(), canonicalize_name(input));
    }
}

#[test]
fn unchanged() {
    let unchanged = ["friendly-bard", "1okay", "okay2"];
    for input in unchanged {
        assert_eq!(validated_name(input).unwrap(), input);
        assert_eq!(validated_owned_name(input.to_string()).unwrap(), input);
    }
}

#[test]
fn failures() {
    let failures = [
        " starts-with-space",
        "-starts-with-dash",
        "ends-with-dash-",
        "ends-with-space ",
        "includes!invalid-char",
        "space in middle",
        "alpha-α",
    ];
    for input in failures {
        assert!(validated_name(input).is_err());
        assert_eq!(
            validated_owned_name(input.to_string()).unwrap_err().as_str(),
            input
        );
    }
}

#[test]
fn invalid_name_message() {
    let err = PackageName::from_str("-bad").unwrap_err();
    assert_eq!(err.as_str(), "-bad");
    assert_snapshot!(
        err,
        @r#"Not a valid package or extra name: "-bad". Names must start and end with a letter or digit and may only contain -, _, ., and alphanumeric characters."#
    );
}

#[test]
fn dist_info_name() {
    let name = PackageName::from_str("Friendly.Bard").unwrap();
    assert_eq!(name.as_dist_info_name(), "friendly_bard");
    let name = PackageName::from_str("numpy").unwrap();
    assert_eq!(name.as_dist_info_name(), "numpy");
}

#[test]
fn serde_round_trip() {
    let name: PackageName = serde_json::from_str(r#""Friendly_Bard""#).unwrap();
    assert_eq!(name.as_str(), "friendly-bard");
    assert_eq!(serde_json::to_string(&name).unwrap(), r#""friendly-bard""#);

    let extra: ExtraName = serde_json::from_str(r#""Dev.Tools""#).unwrap();
    assert_eq!(extra.as_str(), "dev-tools");
    assert!(serde_json::from_str::<ExtraName>(r#""-dev""#).is_err());
}
