// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Override merge of payload trees.
//!
//! Leaves in the source replace the destination's, structs merge
//! recursively, arrays concatenate (destination first) and maps take the
//! union with source entries overwriting. The merge is neither symmetric nor
//! idempotent for arrays.

use stratum_schema::FieldDef;

use crate::builder::{ArrayBuilder, ArrayMode, Element, MapBuilder, PayloadBuilder, PayloadNode};

impl<'s> PayloadBuilder<'s> {
    /// Merge `source` into `self` with override semantics and return `self`.
    ///
    /// Nodes created in `self` take their schema from `self`'s binding when
    /// it declares the field, otherwise from `source`. A source node whose
    /// shape differs from the destination node replaces it outright.
    pub fn merge_override(&mut self, source: &PayloadBuilder<'s>) -> &mut Self {
        if self.entries.is_some() {
            // Keyed builders are struct maps: source entries overwrite.
            for (key, node) in source.fields.iter() {
                self.fields.insert(key, node.clone());
            }
            return self;
        }
        for (name, node) in source.fields.iter() {
            match node {
                PayloadNode::Leaf(_) => {
                    self.fields.insert(name, node.clone());
                }
                PayloadNode::Struct(src) => {
                    let fresh = match self.schema.and_then(|def| def.field(name)) {
                        Some(FieldDef::Struct(child)) => Self::from_schema(Some(child)),
                        Some(FieldDef::StructMap(child)) => Self::keyed(child),
                        _ => src.empty_like(),
                    };
                    match self
                        .fields
                        .get_or_insert_with(name, move || PayloadNode::Struct(fresh))
                    {
                        PayloadNode::Struct(dst) => {
                            dst.merge_override(src);
                        }
                        other => *other = node.clone(),
                    }
                }
                PayloadNode::Array(src) => {
                    let element = self.complex_element(name).unwrap_or(src.element);
                    match self
                        .fields
                        .get_or_insert_with(name, || PayloadNode::Array(ArrayBuilder::new(name, element)))
                    {
                        PayloadNode::Array(dst) => dst.concat(src),
                        other => *other = node.clone(),
                    }
                }
                PayloadNode::Map(src) => {
                    let element = self.complex_element(name).unwrap_or(src.element);
                    match self
                        .fields
                        .get_or_insert_with(name, || PayloadNode::Map(MapBuilder::new(name, element)))
                    {
                        PayloadNode::Map(dst) => dst.union(src),
                        other => *other = node.clone(),
                    }
                }
            }
        }
        self
    }
}

impl<'s> ArrayBuilder<'s> {
    fn concat(&mut self, source: &ArrayBuilder<'s>) {
        if source.elements.is_empty() {
            return;
        }
        self.elements.extend(source.elements.iter().cloned());
        if self.mode == ArrayMode::Unset {
            self.mode = source.mode;
        }
        if matches!(self.element, Element::Unbound) {
            self.element = source.element;
        }
    }
}

impl<'s> MapBuilder<'s> {
    fn union(&mut self, source: &MapBuilder<'s>) {
        for (key, node) in &source.entries {
            self.entries.insert(key.clone(), node.clone());
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use stratum_schema::parse_definition;

    #[test]
    fn leaves_are_replaced_and_untouched_leaves_survive() {
        let mut dst = PayloadBuilder::new();
        dst.set_field("a", "1").unwrap().set_field("b", "2").unwrap();
        let mut src = PayloadBuilder::new();
        src.set_field("b", "20").unwrap().set_field("c", "30").unwrap();
        dst.merge_override(&src);
        assert_eq!(dst.resolve(), json!({"a": "1", "b": "20", "c": "30"}));
    }

    #[test]
    fn structs_merge_recursively() {
        let mut dst = PayloadBuilder::new();
        dst.get_object("s").unwrap().set_field("x", "1").unwrap();
        let mut src = PayloadBuilder::new();
        src.get_object("s").unwrap().set_field("y", "2").unwrap();
        src.get_object("t").unwrap().set_field("z", "3").unwrap();
        dst.merge_override(&src);
        assert_eq!(
            dst.resolve(),
            json!({"s": {"x": "1", "y": "2"}, "t": {"z": "3"}})
        );
    }

    #[test]
    fn merge_is_not_symmetric() {
        let mut a = PayloadBuilder::new();
        a.set_field("k", "a").unwrap();
        let mut b = PayloadBuilder::new();
        b.set_field("k", "b").unwrap();
        let ab = a.clone().merge_override(&b).resolve();
        let ba = b.clone().merge_override(&a).resolve();
        assert_ne!(ab, ba);
    }

    #[test]
    fn shape_change_replaces_destination_node() {
        let mut dst = PayloadBuilder::new();
        dst.set_field("n", "leaf").unwrap();
        let mut src = PayloadBuilder::new();
        src.get_array("n").unwrap().append("x").unwrap();
        dst.merge_override(&src);
        assert_eq!(dst.resolve(), json!({"n": ["x"]}));
    }

    #[test]
    fn bound_destination_rebinds_created_nodes() {
        let def = parse_definition("m", "nested[].v int\ns.name string\n").unwrap();
        let mut dst = PayloadBuilder::bound(&def);
        let mut src = PayloadBuilder::new();
        src.get_array("nested")
            .unwrap()
            .append_struct()
            .unwrap()
            .set_field("v", "1")
            .unwrap();
        src.get_object("s").unwrap().set_field("name", "n").unwrap();
        dst.merge_override(&src);
        let arr = dst.get_array("nested").unwrap();
        assert!(arr.append("leaf").is_err());
        assert!(arr.append_struct().unwrap().set_field("v", "x").is_err());
        assert!(dst.get_object("s").unwrap().schema().is_some());
    }

    #[test]
    fn struct_map_entries_built_as_objects_are_overwritten_per_key() {
        let def = parse_definition("maps", "innermap{}.foo int\ninnermap{}.bar int\n").unwrap();
        let mut dst = PayloadBuilder::bound(&def);
        let entries = dst.get_object("innermap").unwrap();
        entries.get_object("a").unwrap().set_field("foo", "1").unwrap();
        entries.get_object("b").unwrap().set_field("bar", "2").unwrap();
        let mut src = PayloadBuilder::bound(&def);
        src.get_object("innermap")
            .unwrap()
            .get_object("a")
            .unwrap()
            .set_field("bar", "3")
            .unwrap();
        dst.merge_override(&src);
        assert_eq!(
            dst.resolve(),
            json!({"innermap": {"a": {"bar": "3"}, "b": {"bar": "2"}}})
        );
    }
}
