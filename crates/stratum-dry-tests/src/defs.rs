// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Definition sources used across the test suites.

use stratum_schema::{parse_definition, ConfigDefinition};

/// Two-field definition: a plain string and an int defaulting to 0.
pub const SIMPLE_DEF: &str = "\
namespace=test
stringval string
intval int default=0
";

/// Definition exercising every field category.
pub const NESTED_DEF: &str = r#"
namespace=test
version=1
# scalars
stringval string default="foo"
intval int default=0 range=[-100,100]
boolval bool default=false
doubleval double default=1.5
enumval enum { FOO, BAR } default=FOO

simple.name string default="simplename"
simple.gender enum { MALE, FEMALE } default=MALE

stringarr[] string
nestedarr[].foo string
nestedarr[].bar int default=3
leafmap{} long
innermap{}.foo int default=1
"#;

/// Parsed [`SIMPLE_DEF`] named `simple`.
#[allow(clippy::expect_used)]
pub fn simple_schema() -> ConfigDefinition {
    parse_definition("simple", SIMPLE_DEF).expect("SIMPLE_DEF parses")
}

/// Parsed [`NESTED_DEF`] named `nested`.
#[allow(clippy::expect_used)]
pub fn nested_schema() -> ConfigDefinition {
    parse_definition("nested", NESTED_DEF).expect("NESTED_DEF parses")
}
