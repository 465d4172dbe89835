// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Sample documents.

use serde_json::json;
use stratum_payload::Document;

/// Document for [`crate::SIMPLE_DEF`] setting only `stringval`.
pub fn simple_document() -> Document {
    json!({"stringval": "abcde"})
}

/// Document for [`crate::NESTED_DEF`] touching every category, plus one
/// field the schema does not declare.
pub fn nested_document() -> Document {
    json!({
        "stringval": "some\"quotes\\\"instring",
        "intval": 42,
        "simple": {"name": "myname"},
        "stringarr": ["a", "b"],
        "nestedarr": [{"foo": "x"}, {"foo": "y", "bar": 7}],
        "leafmap": {"k1": 1, "k2": 2},
        "innermap": {"bar": {"foo": 5}, "baz": {}},
        "undeclared": "ignored",
    })
}
