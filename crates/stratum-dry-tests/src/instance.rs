// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Typed instance for [`crate::NESTED_DEF`], laid out the way a code
//! generator would emit it: one value struct and one builder per struct
//! level, leaf setters in a shared [`SetterTable`].

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::LazyLock;

use stratum_payload::{
    parse_bool, parse_f64, parse_leaf, BindError, ConfigInstance, InstanceBuilder, SetterTable,
};

/// Values of `enumval`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Enumval {
    /// `FOO`
    #[default]
    Foo,
    /// `BAR`
    Bar,
}

impl FromStr for Enumval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FOO" => Ok(Self::Foo),
            "BAR" => Ok(Self::Bar),
            other => Err(format!("unknown enumval '{other}'")),
        }
    }
}

/// Values of `simple.gender`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Gender {
    /// `MALE`
    #[default]
    Male,
    /// `FEMALE`
    Female,
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MALE" => Ok(Self::Male),
            "FEMALE" => Ok(Self::Female),
            other => Err(format!("unknown gender '{other}'")),
        }
    }
}

/// `simple` struct.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Simple {
    /// `simple.name`
    pub name: String,
    /// `simple.gender`
    pub gender: Gender,
}

/// Element of `nestedarr`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Nested {
    /// `nestedarr[].foo`
    pub foo: String,
    /// `nestedarr[].bar`
    pub bar: i32,
}

/// Entry of `innermap`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Inner {
    /// `innermap{}.foo`
    pub foo: i32,
}

/// Typed `test.nested` configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NestedConfig {
    /// `stringval`
    pub stringval: String,
    /// `intval`
    pub intval: i32,
    /// `boolval`
    pub boolval: bool,
    /// `doubleval`
    pub doubleval: f64,
    /// `enumval`
    pub enumval: Enumval,
    /// `simple`
    pub simple: Simple,
    /// `stringarr`
    pub stringarr: Vec<String>,
    /// `nestedarr`
    pub nestedarr: Vec<Nested>,
    /// `leafmap`
    pub leafmap: BTreeMap<String, i64>,
    /// `innermap`
    pub innermap: BTreeMap<String, Inner>,
}

fn required<T>(field: &str, value: Option<T>) -> Result<T, BindError> {
    value.ok_or_else(|| BindError::MissingField(field.to_owned()))
}

/// Builder for [`NestedConfig`].
#[derive(Debug, Default)]
pub struct NestedConfigBuilder {
    stringval: Option<String>,
    intval: Option<i32>,
    boolval: Option<bool>,
    doubleval: Option<f64>,
    enumval: Option<Enumval>,
    simple: SimpleBuilder,
    stringarr: Vec<String>,
    nestedarr: Vec<NestedBuilder>,
    leafmap: BTreeMap<String, i64>,
    innermap: BTreeMap<String, InnerBuilder>,
}

static ROOT_SETTERS: LazyLock<SetterTable<NestedConfigBuilder>> = LazyLock::new(|| {
    SetterTable::<NestedConfigBuilder>::new()
        .with("stringval", |b, v| {
            b.stringval = Some(v.to_owned());
            Ok(())
        })
        .with("intval", |b, v| {
            b.intval = Some(parse_leaf("intval", v)?);
            Ok(())
        })
        .with("boolval", |b, v| {
            b.boolval = Some(parse_bool("boolval", v)?);
            Ok(())
        })
        .with("doubleval", |b, v| {
            b.doubleval = Some(parse_f64("doubleval", v)?);
            Ok(())
        })
        .with("enumval", |b, v| {
            b.enumval = Some(parse_leaf("enumval", v)?);
            Ok(())
        })
});

impl InstanceBuilder for NestedConfigBuilder {
    fn set_leaf(&mut self, name: &str, value: &str) -> Result<(), BindError> {
        ROOT_SETTERS.set(self, name, value)
    }

    fn push_leaf(&mut self, name: &str, value: &str) -> Result<(), BindError> {
        match name {
            "stringarr" => {
                self.stringarr.push(value.to_owned());
                Ok(())
            }
            _ => Err(BindError::UnknownField(name.to_owned())),
        }
    }

    fn put_leaf(&mut self, name: &str, key: &str, value: &str) -> Result<(), BindError> {
        match name {
            "leafmap" => {
                self.leafmap.insert(key.to_owned(), parse_leaf(name, value)?);
                Ok(())
            }
            _ => Err(BindError::UnknownField(name.to_owned())),
        }
    }

    fn child(&mut self, name: &str) -> Result<&mut dyn InstanceBuilder, BindError> {
        match name {
            "simple" => {
                let child: &mut dyn InstanceBuilder = &mut self.simple;
                Ok(child)
            }
            _ => Err(BindError::UnknownField(name.to_owned())),
        }
    }

    fn push_child(&mut self, name: &str) -> Result<&mut dyn InstanceBuilder, BindError> {
        match name {
            "nestedarr" => {
                self.nestedarr.push(NestedBuilder::default());
                self.nestedarr
                    .last_mut()
                    .map(|child| child as &mut dyn InstanceBuilder)
                    .ok_or_else(|| BindError::UnknownField(name.to_owned()))
            }
            _ => Err(BindError::UnknownField(name.to_owned())),
        }
    }

    fn put_child(&mut self, name: &str, key: &str) -> Result<&mut dyn InstanceBuilder, BindError> {
        match name {
            "innermap" => {
                let child: &mut dyn InstanceBuilder =
                    self.innermap.entry(key.to_owned()).or_default();
                Ok(child)
            }
            _ => Err(BindError::UnknownField(name.to_owned())),
        }
    }
}

impl ConfigInstance for NestedConfig {
    type Builder = NestedConfigBuilder;
    const NAME: &'static str = "nested";
    const NAMESPACE: &'static str = "test";

    fn build(b: NestedConfigBuilder) -> Result<Self, BindError> {
        Ok(Self {
            stringval: required("stringval", b.stringval)?,
            intval: required("intval", b.intval)?,
            boolval: required("boolval", b.boolval)?,
            doubleval: required("doubleval", b.doubleval)?,
            enumval: required("enumval", b.enumval)?,
            simple: b.simple.build()?,
            stringarr: b.stringarr,
            nestedarr: b
                .nestedarr
                .into_iter()
                .map(NestedBuilder::build)
                .collect::<Result<_, _>>()?,
            leafmap: b.leafmap,
            innermap: b
                .innermap
                .into_iter()
                .map(|(key, inner)| inner.build().map(|value| (key, value)))
                .collect::<Result<_, _>>()?,
        })
    }
}

/// Builder for [`Simple`].
#[derive(Debug, Default)]
pub struct SimpleBuilder {
    name: Option<String>,
    gender: Option<Gender>,
}

static SIMPLE_SETTERS: LazyLock<SetterTable<SimpleBuilder>> = LazyLock::new(|| {
    SetterTable::<SimpleBuilder>::new()
        .with("name", |b, v| {
            b.name = Some(v.to_owned());
            Ok(())
        })
        .with("gender", |b, v| {
            b.gender = Some(parse_leaf("gender", v)?);
            Ok(())
        })
});

impl SimpleBuilder {
    fn build(self) -> Result<Simple, BindError> {
        Ok(Simple {
            name: required("simple.name", self.name)?,
            gender: required("simple.gender", self.gender)?,
        })
    }
}

impl InstanceBuilder for SimpleBuilder {
    fn set_leaf(&mut self, name: &str, value: &str) -> Result<(), BindError> {
        SIMPLE_SETTERS.set(self, name, value)
    }
}

/// Builder for [`Nested`].
#[derive(Debug, Default)]
pub struct NestedBuilder {
    foo: Option<String>,
    bar: Option<i32>,
}

static NESTED_SETTERS: LazyLock<SetterTable<NestedBuilder>> = LazyLock::new(|| {
    SetterTable::<NestedBuilder>::new()
        .with("foo", |b, v| {
            b.foo = Some(v.to_owned());
            Ok(())
        })
        .with("bar", |b, v| {
            b.bar = Some(parse_leaf("bar", v)?);
            Ok(())
        })
});

impl NestedBuilder {
    fn build(self) -> Result<Nested, BindError> {
        Ok(Nested {
            foo: required("nestedarr[].foo", self.foo)?,
            bar: required("nestedarr[].bar", self.bar)?,
        })
    }
}

impl InstanceBuilder for NestedBuilder {
    fn set_leaf(&mut self, name: &str, value: &str) -> Result<(), BindError> {
        NESTED_SETTERS.set(self, name, value)
    }
}

/// Builder for [`Inner`].
#[derive(Debug, Default)]
pub struct InnerBuilder {
    foo: Option<i32>,
}

static INNER_SETTERS: LazyLock<SetterTable<InnerBuilder>> = LazyLock::new(|| {
    SetterTable::<InnerBuilder>::new().with("foo", |b, v| {
        b.foo = Some(parse_leaf("foo", v)?);
        Ok(())
    })
});

impl InnerBuilder {
    fn build(self) -> Result<Inner, BindError> {
        Ok(Inner {
            foo: required("innermap{}.foo", self.foo)?,
        })
    }
}

impl InstanceBuilder for InnerBuilder {
    fn set_leaf(&mut self, name: &str, value: &str) -> Result<(), BindError> {
        INNER_SETTERS.set(self, name, value)
    }
}
