//! Decoded result shapes for each entity group.
//!
//! Most groups come back as open field bags because the set of fields a
//! server returns depends on its version and on `output` parameters. History
//! records are fixed: `clock`, `value` and `itemid`, all strings on the wire.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::ops::Deref;
use thiserror::Error;

/// Open-ended record keyed by field name.
pub type FieldBag = Map<String, Value>;

macro_rules! field_bag_entity {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub FieldBag);

        impl $name {
            pub fn get(&self, field: &str) -> Option<&Value> {
                self.0.get(field)
            }

            pub fn get_str(&self, field: &str) -> Option<&str> {
                self.0.get(field).and_then(Value::as_str)
            }

            pub fn into_inner(self) -> FieldBag {
                self.0
            }
        }

        impl Deref for $name {
            type Target = FieldBag;

            fn deref(&self) -> &FieldBag {
                &self.0
            }
        }

        impl From<FieldBag> for $name {
            fn from(fields: FieldBag) -> Self {
                $name(fields)
            }
        }
    };
}

field_bag_entity!(
    /// Result of `host.*` calls.
    Host
);
field_bag_entity!(
    /// Result of `hostgroup.*` calls.
    HostGroup
);
field_bag_entity!(
    /// Result of `hostinterface.*` calls.
    HostInterface
);
field_bag_entity!(
    /// Result of `graph.*` calls.
    Graph
);
field_bag_entity!(
    /// Result of `user.*` calls.
    User
);
field_bag_entity!(
    /// Fallback record for groups registered without a dedicated shape.
    Record
);

/// One history sample. Extra fields sent by newer servers (`ns`) are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "validation", derive(schemars::JsonSchema))]
pub struct HistoryItem {
    pub clock: String,
    pub value: String,
    pub itemid: String,
}

#[derive(Debug, Error)]
pub enum ShapeError {
    #[error("result does not fit shape: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("result failed schema validation: {}", .0.join("; "))]
    Schema(Vec<String>),
}

/// The decoded form a group's results are parsed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Host,
    HostGroup,
    HostInterface,
    Graph,
    User,
    History,
    Record,
}

impl Shape {
    pub fn name(&self) -> &'static str {
        match self {
            Shape::Host => "host",
            Shape::HostGroup => "hostgroup",
            Shape::HostInterface => "hostinterface",
            Shape::Graph => "graph",
            Shape::User => "user",
            Shape::History => "history",
            Shape::Record => "record",
        }
    }

    /// Decodes a raw result payload into this shape's collection.
    pub fn decode(self, result: Value) -> Result<EntityCollection, ShapeError> {
        let collection = match self {
            Shape::Host => EntityCollection::Hosts(serde_json::from_value(result)?),
            Shape::HostGroup => EntityCollection::HostGroups(serde_json::from_value(result)?),
            Shape::HostInterface => {
                EntityCollection::HostInterfaces(serde_json::from_value(result)?)
            }
            Shape::Graph => EntityCollection::Graphs(serde_json::from_value(result)?),
            Shape::User => EntityCollection::Users(serde_json::from_value(result)?),
            Shape::History => {
                #[cfg(feature = "validation")]
                crate::validate::validate_history(&result)?;
                EntityCollection::History(serde_json::from_value(result)?)
            }
            Shape::Record => EntityCollection::Records(serde_json::from_value(result)?),
        };
        Ok(collection)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded result, tagged by the shape it was decoded as.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EntityCollection {
    Hosts(Vec<Host>),
    HostGroups(Vec<HostGroup>),
    HostInterfaces(Vec<HostInterface>),
    Graphs(Vec<Graph>),
    Users(Vec<User>),
    History(Vec<HistoryItem>),
    Records(Vec<Record>),
}

impl EntityCollection {
    pub fn shape(&self) -> Shape {
        match self {
            EntityCollection::Hosts(_) => Shape::Host,
            EntityCollection::HostGroups(_) => Shape::HostGroup,
            EntityCollection::HostInterfaces(_) => Shape::HostInterface,
            EntityCollection::Graphs(_) => Shape::Graph,
            EntityCollection::Users(_) => Shape::User,
            EntityCollection::History(_) => Shape::History,
            EntityCollection::Records(_) => Shape::Record,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            EntityCollection::Hosts(v) => v.len(),
            EntityCollection::HostGroups(v) => v.len(),
            EntityCollection::HostInterfaces(v) => v.len(),
            EntityCollection::Graphs(v) => v.len(),
            EntityCollection::Users(v) => v.len(),
            EntityCollection::History(v) => v.len(),
            EntityCollection::Records(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Entity types with a fixed group name, used to narrow an
/// [`EntityCollection`] to a concrete `Vec`.
pub trait Entity: Sized {
    const GROUP: &'static str;
    const SHAPE: Shape;

    /// Returns the collection back unchanged when it holds another shape.
    fn from_collection(collection: EntityCollection) -> Result<Vec<Self>, EntityCollection>;
}

macro_rules! impl_entity {
    ($ty:ty, $group:literal, $shape:ident, $variant:ident) => {
        impl Entity for $ty {
            const GROUP: &'static str = $group;
            const SHAPE: Shape = Shape::$shape;

            fn from_collection(
                collection: EntityCollection,
            ) -> Result<Vec<Self>, EntityCollection> {
                match collection {
                    EntityCollection::$variant(items) => Ok(items),
                    other => Err(other),
                }
            }
        }
    };
}

impl_entity!(Host, "host", Host, Hosts);
impl_entity!(HostGroup, "hostgroup", HostGroup, HostGroups);
impl_entity!(HostInterface, "hostinterface", HostInterface, HostInterfaces);
impl_entity!(Graph, "graph", Graph, Graphs);
impl_entity!(User, "user", User, Users);
impl_entity!(HistoryItem, "history", History, History);
