use std::collections::HashMap;
use std::str::FromStr;

use indoc::indoc;
use test_case::test_case;
use tracing_test::traced_test;

use phosphorus_normalize::ExtraName;
use phosphorus_pep440::{Operator, VersionClauseBuildErrorKind};

use crate::marker::{
    BooleanOperator, Marker, MarkerAtom, MarkerEnvironment, MarkerEvaluationError, MarkerNode,
    MarkerValues, MarkerVariable, MissingMarkerValue,
};

fn env() -> MarkerEnvironment {
    MarkerEnvironment {
        implementation_name: "cpython".to_string(),
        implementation_version: "3.12.1".to_string(),
        os_name: "posix".to_string(),
        platform_machine: "x86_64".to_string(),
        platform_python_implementation: "CPython".to_string(),
        platform_release: "6.5.0-14-generic".to_string(),
        platform_system: "Linux".to_string(),
        platform_version: "#14-Ubuntu SMP PREEMPT_DYNAMIC".to_string(),
        python_full_version: "3.12.1".to_string(),
        python_version: "3.12".to_string(),
        sys_platform: "linux".to_string(),
    }
}

fn evaluate(marker: &str) -> bool {
    Marker::from_str(marker).unwrap().evaluate(&env(), None).unwrap()
}

fn atom(variable: MarkerVariable, operator: Operator, value: &str) -> MarkerNode {
    MarkerNode::Atom(MarkerAtom {
        variable,
        operator,
        value: value.to_string(),
    })
}

#[test]
fn and_binds_tighter_than_or() {
    let marker = Marker::from_str(
        "python_version == '3.12' and os_name == 'posix' or sys_platform == 'linux'",
    )
    .unwrap();
    let expected = Marker::or(vec![
        MarkerNode::Group(Marker::and(vec![
            atom(MarkerVariable::PythonVersion, Operator::Equal, "3.12"),
            atom(MarkerVariable::OsName, Operator::Equal, "posix"),
        ])),
        atom(MarkerVariable::SysPlatform, Operator::Equal, "linux"),
    ]);
    assert_eq!(marker, expected);
    assert_eq!(
        marker.to_string(),
        "(python_version == '3.12' and os_name == 'posix') or sys_platform == 'linux'"
    );
}

#[test]
fn nested_parentheses() {
    let marker = Marker::from_str(
        r#"python_version == "2.7" and (sys_platform == "win32" or (os_name == "linux" and implementation_name == 'cpython'))"#,
    )
    .unwrap();
    assert_eq!(marker.boolean(), Some(BooleanOperator::And));
    let expected = Marker::and(vec![
        atom(MarkerVariable::PythonVersion, Operator::Equal, "2.7"),
        MarkerNode::Group(Marker::or(vec![
            atom(MarkerVariable::SysPlatform, Operator::Equal, "win32"),
            MarkerNode::Group(Marker::and(vec![
                atom(MarkerVariable::OsName, Operator::Equal, "linux"),
                atom(MarkerVariable::ImplementationName, Operator::Equal, "cpython"),
            ])),
        ])),
    ]);
    assert_eq!(marker, expected);
}

#[test]
fn constructors_collapse_trivial_groups() {
    let posix = atom(MarkerVariable::OsName, Operator::Equal, "posix");
    let linux = atom(MarkerVariable::SysPlatform, Operator::Equal, "linux");

    assert_eq!(Marker::and(Vec::new()), Marker::empty());
    assert_eq!(Marker::or(vec![posix.clone()]), Marker::from(posix.clone()));
    assert_eq!(
        Marker::and(vec![
            MarkerNode::Group(Marker::empty()),
            MarkerNode::Group(Marker::from(posix.clone())),
            linux.clone(),
        ]),
        Marker::and(vec![posix.clone(), linux.clone()])
    );

    for marker in [
        Marker::and(Vec::new()),
        Marker::and(vec![posix.clone()]),
        Marker::or(vec![MarkerNode::Group(Marker::and(vec![posix.clone()])), linux.clone()]),
        Marker::and(vec![
            MarkerNode::Group(Marker::or(vec![posix.clone(), linux.clone()])),
            MarkerNode::Group(Marker::and(vec![linux.clone(), posix.clone()])),
        ]),
    ] {
        assert_eq!(Marker::from_str(&marker.to_string()).unwrap(), marker, "{marker}");
    }
}

#[test]
fn single_parenthesized_atom() {
    let marker = Marker::from_str("  ( os_name == 'nt' ) ").unwrap();
    assert_eq!(marker.boolean(), None);
    assert_eq!(
        marker.markers(),
        [atom(MarkerVariable::OsName, Operator::Equal, "nt")]
    );
    assert_eq!(marker.to_string(), "os_name == 'nt'");
}

#[test_case(""; "empty")]
#[test_case("   "; "whitespace")]
fn empty_marker_is_true(input: &str) {
    let marker = Marker::from_str(input).unwrap();
    assert!(marker.is_empty());
    assert_eq!(marker.to_string(), "");
    // Not even the environment is consulted.
    let nothing: HashMap<MarkerVariable, String> = HashMap::new();
    assert!(marker.evaluate(&nothing, None).unwrap());
}

#[test]
fn legacy_dotted_names() {
    let marker = Marker::from_str("os.name == 'posix' and platform.machine == 'x86_64'").unwrap();
    assert_eq!(
        marker.to_string(),
        "os_name == 'posix' and platform_machine == 'x86_64'"
    );
    assert!(marker.evaluate(&env(), None).unwrap());
}

#[test]
fn swapped_operands_keep_operator() {
    let marker = Marker::from_str("'3.8' <= python_version").unwrap();
    assert_eq!(
        marker.markers(),
        [atom(MarkerVariable::PythonVersion, Operator::LessThanEqual, "3.8")]
    );
    // Read as `python_version <= '3.8'`.
    assert!(!marker.evaluate(&env(), None).unwrap());
}

#[test]
fn double_quotes_when_needed() {
    let marker = Marker::from_str(r#"platform_version == "it's""#).unwrap();
    assert_eq!(marker.to_string(), r#"platform_version == "it's""#);
}

#[test_case("python_version >= '3.8'", true)]
#[test_case("python_version < '3.8'", false)]
#[test_case("python_version > '3.9'", true; "compared as versions not strings")]
#[test_case("python_full_version == '3.12.*'", true)]
#[test_case("python_full_version != '3.12.*'", false)]
#[test_case("python_version ~= '3.10'", true)]
#[test_case("implementation_version >= '3.12.0'", true)]
#[test_case("sys_platform == 'linux'", true)]
#[test_case("sys_platform != 'linux'", false)]
#[test_case("os_name == 'posix' and sys_platform == 'win32'", false)]
#[test_case("os_name == 'nt' or sys_platform == 'linux'", true)]
fn evaluation(marker: &str, expected: bool) {
    assert_eq!(evaluate(marker), expected, "{marker}");
}

#[test]
fn in_checks_environment_value_within_literal() {
    assert!(evaluate("sys_platform in 'linux darwin'"));
    assert!(!evaluate("sys_platform in 'win32 cygwin'"));
    // The environment value is the needle, the literal the haystack.
    assert!(!evaluate("platform_machine in 'x86'"));
}

#[test]
fn not_in_is_negation_of_in() {
    for literal in ["linux darwin", "win32", "lin", ""] {
        let in_marker = format!("sys_platform in '{literal}'");
        let not_in_marker = format!("sys_platform not in '{literal}'");
        assert_eq!(evaluate(&in_marker), !evaluate(&not_in_marker), "{literal}");
    }
    assert!(evaluate("sys_platform not in 'win32 cygwin'"));
}

#[test]
#[traced_test]
fn lexicographic_comparison_warns() {
    assert!(evaluate("platform_release >= '5'"));
    assert!(logs_contain("lexicographically"));
}

#[test]
fn unsupported_operator() {
    let marker = Marker::from_str("os_name ~= 'posix'").unwrap();
    let err = marker.evaluate(&env(), None).unwrap_err();
    assert!(matches!(
        err,
        MarkerEvaluationError::UnsupportedOperator {
            variable: MarkerVariable::OsName,
            operator: Operator::TildeEqual,
        }
    ));
    insta::assert_snapshot!(err, @"Cannot compare `os_name` with `~=`");
}

#[test]
fn invalid_version_clause() {
    let marker = Marker::from_str("python_version ~= '3'").unwrap();
    let err = marker.evaluate(&env(), None).unwrap_err();
    let (atom, err) = match err {
        MarkerEvaluationError::InvalidClause { atom, err } => (atom, err),
        other => panic!("expected an invalid clause, got {other:?}"),
    };
    assert_eq!(atom, "python_version ~= '3'");
    assert_eq!(err.kind(), &VersionClauseBuildErrorKind::CompatibleRelease);
}

#[test]
fn short_circuit_skips_invalid_comparisons() {
    assert!(evaluate("os_name == 'posix' or os_name ~= 'posix'"));
    assert!(!evaluate("os_name == 'nt' and os_name ~= 'posix'"));
}

#[test]
fn extra_is_canonicalized() {
    let marker = Marker::from_str("extra == 'Dev_Tools'").unwrap();
    assert_eq!(marker.to_string(), "extra == 'dev-tools'");

    let extra = ExtraName::from_str("dev.tools").unwrap();
    assert!(marker.evaluate(&env(), Some(&extra)).unwrap());
    assert!(!marker.evaluate(&env(), None).unwrap());
}

#[test]
fn missing_value() {
    let partial: HashMap<MarkerVariable, String> =
        HashMap::from([(MarkerVariable::OsName, "posix".to_string())]);
    let marker = Marker::from_str("os_name == 'posix' and sys_platform == 'linux'").unwrap();
    let err = marker.evaluate(&partial, None).unwrap_err();
    assert!(matches!(
        err,
        MarkerEvaluationError::MissingValue(MissingMarkerValue {
            variable: MarkerVariable::SysPlatform
        })
    ));
}

#[test]
fn closure_provider() {
    let provider = |variable: MarkerVariable| match variable {
        MarkerVariable::PythonVersion => Some("3.7".to_string()),
        _ => None,
    };
    assert_eq!(
        provider.value(MarkerVariable::PythonVersion).unwrap(),
        "3.7"
    );
    let marker = Marker::from_str("python_version < '3.8'").unwrap();
    assert!(marker.evaluate(&provider, None).unwrap());
}

#[test]
fn environment_from_json() {
    let json = r#"{
        "implementation_name": "pypy",
        "implementation_version": "7.3.13",
        "os_name": "posix",
        "platform_machine": "arm64",
        "platform_python_implementation": "PyPy",
        "platform_release": "23.1.0",
        "platform_system": "Darwin",
        "platform_version": "Darwin Kernel Version 23.1.0",
        "python_full_version": "3.10.13",
        "python_version": "3.10",
        "sys_platform": "darwin"
    }"#;
    let environment: MarkerEnvironment = serde_json::from_str(json).unwrap();
    assert_eq!(environment.get(MarkerVariable::SysPlatform), Some("darwin"));
    assert_eq!(environment.get(MarkerVariable::Extra), None);
    assert!(
        Marker::from_str("implementation_name == 'pypy' and python_version < '3.11'")
            .unwrap()
            .evaluate(&environment, None)
            .unwrap()
    );
}

#[test]
fn serde_as_string() {
    let marker = Marker::from_str("os_name == 'nt' or extra == 'win'").unwrap();
    let json = serde_json::to_string(&marker).unwrap();
    assert_eq!(json, r#""os_name == 'nt' or extra == 'win'""#);
    assert_eq!(serde_json::from_str::<Marker>(&json).unwrap(), marker);
}

#[test]
fn error_two_literals() {
    let err = Marker::from_str("'posix' == 'posix'").unwrap_err();
    assert_eq!(
        err.to_string(),
        indoc! {"
            Expected a marker variable and a string
            'posix' == 'posix'
            ^^^^^^^^^^^^^^^^^^"
        }
    );
}

#[test]
fn error_unknown_variable() {
    let err = Marker::from_str("python_implementation == 'cpython'").unwrap_err();
    assert_eq!(
        err.to_string(),
        indoc! {"
            Expected a marker variable or a quoted string, found 'p'
            python_implementation == 'cpython'
            ^"
        }
    );
}

#[test]
fn error_missing_closing_parenthesis() {
    let err = Marker::from_str("os_name == 'nt' and (sys_platform == 'win32'").unwrap_err();
    assert_eq!(
        err.to_string(),
        indoc! {"
            Missing closing parenthesis (expected ')', found end of input)
            os_name == 'nt' and (sys_platform == 'win32'
                                ^"
        }
    );
}

#[test]
fn error_unterminated_string() {
    let err = Marker::from_str("os_name == 'nt").unwrap_err();
    assert_eq!(
        err.to_string(),
        indoc! {"
            Expected a marker variable or a quoted string, found '''
            os_name == 'nt
                       ^"
        }
    );
}
