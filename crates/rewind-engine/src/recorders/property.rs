//! Named properties of arbitrary host objects.
//!
//! A host object exposes properties by name through [`PropertyHost`]. The
//! [`PropertyRegistry`] maps each [`PropertyKind`] to a recorder
//! constructor, so callers decide explicitly which kinds can be recorded.
//!
//! ```
//! use rewind_engine::prelude::*;
//! use rewind_engine::recorders::property::{PropertyHost, PropertyRegistry, PropertyValue};
//!
//! #[derive(Default)]
//! struct Door {
//!     open: bool,
//! }
//!
//! impl PropertyHost for Door {
//!     fn property(&self, name: &str) -> Option<PropertyValue> {
//!         (name == "open").then_some(PropertyValue::Bool(self.open))
//!     }
//!
//!     fn set_property(&mut self, name: &str, value: PropertyValue) -> bool {
//!         match (name, value) {
//!             ("open", PropertyValue::Bool(open)) => {
//!                 self.open = open;
//!                 true
//!             }
//!             _ => false,
//!         }
//!     }
//! }
//!
//! let door = live(Door::default());
//! let registry = PropertyRegistry::with_defaults();
//! let mut timeline = Timeline::default();
//! let id = timeline.spawn("door", false).unwrap();
//! timeline.attach_boxed(id, registry.create(door.clone(), "open").unwrap()).unwrap();
//!
//! timeline.tick_fixed().unwrap();
//! door.borrow_mut().open = true;
//! timeline.tick_fixed().unwrap();
//!
//! timeline.pause();
//! timeline.seek(0);
//! assert!(!door.borrow().open);
//! ```

use std::collections::HashMap;
use std::marker::PhantomData;

use rewind_core::prelude::*;
use serde::{Deserialize, Serialize};

use crate::host::{Live, Vec2, Vec3};
use crate::recorders::variable::TimeValue;

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// The kinds of property that can be recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyKind {
    Bool,
    Int,
    Float,
    Vec2,
    Vec3,
    Text,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Vec2(Vec2),
    Vec3(Vec3),
    Text(String),
}

impl PropertyValue {
    pub fn kind(&self) -> PropertyKind {
        match self {
            Self::Bool(_) => PropertyKind::Bool,
            Self::Int(_) => PropertyKind::Int,
            Self::Float(_) => PropertyKind::Float,
            Self::Vec2(_) => PropertyKind::Vec2,
            Self::Vec3(_) => PropertyKind::Vec3,
            Self::Text(_) => PropertyKind::Text,
        }
    }
}

/// A Rust type stored in one [`PropertyValue`] variant.
pub trait PropertyType: Snapshot {
    const KIND: PropertyKind;

    fn from_value(value: PropertyValue) -> Option<Self>;

    fn into_value(self) -> PropertyValue;
}

macro_rules! property_type {
    ($ty:ty, $variant:ident) => {
        impl PropertyType for $ty {
            const KIND: PropertyKind = PropertyKind::$variant;

            fn from_value(value: PropertyValue) -> Option<Self> {
                match value {
                    PropertyValue::$variant(inner) => Some(inner),
                    _ => None,
                }
            }

            fn into_value(self) -> PropertyValue {
                PropertyValue::$variant(self)
            }
        }
    };
}

property_type!(bool, Bool);
property_type!(i64, Int);
property_type!(f64, Float);
property_type!(Vec2, Vec2);
property_type!(Vec3, Vec3);
property_type!(String, Text);

// ---------------------------------------------------------------------------
// PropertyHost
// ---------------------------------------------------------------------------

/// A host object exposing named properties.
pub trait PropertyHost {
    /// Current value of `name`, `None` if there is no such property.
    fn property(&self, name: &str) -> Option<PropertyValue>;

    /// Write `name`. Returns `false` if the property does not exist or
    /// `value` has the wrong kind.
    fn set_property(&mut self, name: &str, value: PropertyValue) -> bool;

    /// Called after playback wrote `name`, e.g. to refresh derived state.
    fn on_property_rewind(&mut self, name: &str) {
        let _ = name;
    }
}

// ---------------------------------------------------------------------------
// PropertyProbe
// ---------------------------------------------------------------------------

/// Records one property of type `V`.
pub struct PropertyProbe<V> {
    host: Live<dyn PropertyHost>,
    name: String,
    _value: PhantomData<V>,
}

impl<V: PropertyType> PropertyProbe<V> {
    pub fn new(host: Live<dyn PropertyHost>, name: impl Into<String>) -> Self {
        Self {
            host,
            name: name.into(),
            _value: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn write(&mut self, value: &V, notify: bool) {
        let mut host = self.host.borrow_mut();
        if host.set_property(&self.name, value.clone().into_value()) && notify {
            host.on_property_rewind(&self.name);
        }
    }
}

impl<V: PropertyType> Recordable for PropertyProbe<V> {
    type Snapshot = TimeValue<V>;

    fn configure(&mut self) -> Result<(), RewindError> {
        match self.host.borrow().property(&self.name) {
            Some(value) if value.kind() == V::KIND => Ok(()),
            Some(value) => Err(RewindError::InvalidConfig {
                reason: format!(
                    "property '{}' is {:?}, recorder expects {:?}",
                    self.name,
                    value.kind(),
                    V::KIND
                ),
            }),
            None => Err(RewindError::MissingDependency {
                recorder: format!("property:{}", self.name),
                dependency: format!("property '{}'", self.name),
            }),
        }
    }

    fn read(&self, snapshot: &mut TimeValue<V>) {
        // A vanished property records the default, never a stale leased value.
        snapshot.0 = self
            .host
            .borrow()
            .property(&self.name)
            .and_then(V::from_value)
            .unwrap_or_default();
    }

    fn apply(&mut self, snapshot: &TimeValue<V>) {
        self.write(&snapshot.0, false);
    }

    fn resume(&mut self, snapshot: &TimeValue<V>) {
        self.write(&snapshot.0, true);
    }

    fn apply_frame(&mut self, _frame: Frame, snapshot: &TimeValue<V>) {
        self.write(&snapshot.0, true);
    }
}

// ---------------------------------------------------------------------------
// PropertyRegistry
// ---------------------------------------------------------------------------

/// Builds a recorder for the property `name` of a host.
pub type PropertyConstructor = fn(Live<dyn PropertyHost>, String) -> Box<dyn Recorder>;

fn construct<V: PropertyType>(host: Live<dyn PropertyHost>, name: String) -> Box<dyn Recorder> {
    let label = format!("property:{name}");
    Box::new(SnapshotRecorder::new(label, PropertyProbe::<V>::new(host, name)))
}

/// Maps property kinds to recorder constructors.
#[derive(Debug, Default, Clone)]
pub struct PropertyRegistry {
    constructors: HashMap<PropertyKind, PropertyConstructor>,
}

impl PropertyRegistry {
    /// A registry with no kinds registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in kind registered.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(PropertyKind::Bool, construct::<bool>);
        registry.register(PropertyKind::Int, construct::<i64>);
        registry.register(PropertyKind::Float, construct::<f64>);
        registry.register(PropertyKind::Vec2, construct::<Vec2>);
        registry.register(PropertyKind::Vec3, construct::<Vec3>);
        registry.register(PropertyKind::Text, construct::<String>);
        registry
    }

    /// Register or replace the constructor for `kind`.
    pub fn register(&mut self, kind: PropertyKind, constructor: PropertyConstructor) {
        self.constructors.insert(kind, constructor);
    }

    pub fn supports(&self, kind: PropertyKind) -> bool {
        self.constructors.contains_key(&kind)
    }

    /// Build an unattached recorder for `host`'s property `name`.
    ///
    /// # Errors
    ///
    /// [`RewindError::MissingDependency`] if the host has no such property,
    /// [`RewindError::InvalidConfig`] if its kind is not registered.
    pub fn create(
        &self,
        host: Live<dyn PropertyHost>,
        name: &str,
    ) -> Result<Box<dyn Recorder>, RewindError> {
        let kind = host
            .borrow()
            .property(name)
            .map(|value| value.kind())
            .ok_or_else(|| RewindError::MissingDependency {
                recorder: format!("property:{name}"),
                dependency: format!("property '{name}'"),
            })?;
        let constructor = self
            .constructors
            .get(&kind)
            .ok_or_else(|| RewindError::InvalidConfig {
                reason: format!("no recorder registered for {kind:?} property '{name}'"),
            })?;
        Ok(constructor(host, name.to_owned()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
