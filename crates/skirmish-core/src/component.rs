//! Typed component values
//!
//! Components are immutable records keyed by a globally unique
//! [`ComponentId`]. Payloads live in the closed [`ComponentData`] union; the
//! [`ComponentKind`] trait maps each payload struct to its variant so callers
//! get a typed result (or an explicit wrong-type error) instead of a cast.

use crate::{ComponentId, Error, Result, TeamId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Type tag of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ComponentType {
    Name,
    Team,
    Position,
    Health,
    Charge,
    Deployable,
}

impl ComponentType {
    /// All component types, in tag order
    pub const ALL: [ComponentType; 6] = [
        ComponentType::Name,
        ComponentType::Team,
        ComponentType::Position,
        ComponentType::Health,
        ComponentType::Charge,
        ComponentType::Deployable,
    ];

    /// Get the string tag used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentType::Name => "Name",
            ComponentType::Team => "Team",
            ComponentType::Position => "Position",
            ComponentType::Health => "Health",
            ComponentType::Charge => "Charge",
            ComponentType::Deployable => "Deployable",
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ComponentType::ALL
            .into_iter()
            .find(|ty| ty.as_str() == s)
            .ok_or_else(|| Error::UnknownComponentType(s.to_string()))
    }
}

/// Display name of a unit or object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Name {
    pub name: String,
}

impl Name {
    /// Create a name component
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Team membership
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub team: TeamId,
}

impl Team {
    /// Create a team membership component
    pub fn new(team: u8) -> Self {
        Self {
            team: TeamId::new(team),
        }
    }
}

/// Grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    /// Create a position at `(x, y)`
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Hit points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub current: i32,
    pub max: i32,
}

impl Health {
    /// Full health
    pub fn full(max: i32) -> Self {
        Self { current: max, max }
    }

    /// Whether any health remains
    pub fn is_alive(&self) -> bool {
        self.current > 0
    }
}

/// Ability charge meter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Charge {
    pub current: u32,
    pub max: u32,
}

impl Charge {
    /// No charge accumulated yet
    pub fn empty(max: u32) -> Self {
        Self { current: 0, max }
    }

    /// Whether the charge has reached its maximum
    pub fn is_full(&self) -> bool {
        self.current >= self.max
    }
}

/// Marks a unit that waits in its team's hanger until deployed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Deployable {
    pub deployed: bool,
}

/// Component payload, tagged by component type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComponentData {
    Name(Name),
    Team(Team),
    Position(Position),
    Health(Health),
    Charge(Charge),
    Deployable(Deployable),
}

impl ComponentData {
    /// Get the type tag of this payload
    pub fn component_type(&self) -> ComponentType {
        match self {
            ComponentData::Name(_) => ComponentType::Name,
            ComponentData::Team(_) => ComponentType::Team,
            ComponentData::Position(_) => ComponentType::Position,
            ComponentData::Health(_) => ComponentType::Health,
            ComponentData::Charge(_) => ComponentType::Charge,
            ComponentData::Deployable(_) => ComponentType::Deployable,
        }
    }
}

/// A payload struct that corresponds to exactly one [`ComponentData`] variant
pub trait ComponentKind: Sized + Into<ComponentData> {
    /// The type tag of this payload
    const TYPE: ComponentType;

    /// Borrow the payload if `data` holds this kind
    fn from_data(data: &ComponentData) -> Option<&Self>;
}

macro_rules! component_kind {
    ($($kind:ident),* $(,)?) => {
        $(
            impl ComponentKind for $kind {
                const TYPE: ComponentType = ComponentType::$kind;

                fn from_data(data: &ComponentData) -> Option<&Self> {
                    match data {
                        ComponentData::$kind(inner) => Some(inner),
                        _ => None,
                    }
                }
            }

            impl From<$kind> for ComponentData {
                fn from(value: $kind) -> Self {
                    ComponentData::$kind(value)
                }
            }
        )*
    };
}

component_kind!(Name, Team, Position, Health, Charge, Deployable);

/// An immutable component value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    id: ComponentId,
    data: ComponentData,
}

impl Component {
    /// Create a new component
    pub fn new(id: ComponentId, data: impl Into<ComponentData>) -> Self {
        Self {
            id,
            data: data.into(),
        }
    }

    /// Get the component id
    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// Get the type tag
    pub fn component_type(&self) -> ComponentType {
        self.data.component_type()
    }

    /// Get the untyped payload
    pub fn data(&self) -> &ComponentData {
        &self.data
    }

    /// Get the payload as `T`
    pub fn get<T: ComponentKind>(&self) -> Result<&T> {
        T::from_data(&self.data).ok_or(Error::WrongComponentType {
            component: self.id,
            expected: T::TYPE,
            found: self.component_type(),
        })
    }

    /// Check whether the payload is of kind `T`
    pub fn is<T: ComponentKind>(&self) -> bool {
        self.component_type() == T::TYPE
    }

    /// Produce a new value with the same id and type carrying `data`
    pub fn updated(&self, data: impl Into<ComponentData>) -> Result<Component> {
        let data = data.into();
        let found = data.component_type();
        if found != self.component_type() {
            return Err(Error::ComponentTypeChanged {
                component: self.id,
                expected: self.component_type(),
                found,
            });
        }
        Ok(Component { id: self.id, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_access() {
        let component = Component::new(ComponentId::new(1), Name::new("Falcon"));

        assert_eq!(component.get::<Name>().map(|n| n.name.as_str()), Ok("Falcon"));
        assert!(component.is::<Name>());
        assert_eq!(
            component.get::<Health>(),
            Err(Error::WrongComponentType {
                component: ComponentId::new(1),
                expected: ComponentType::Health,
                found: ComponentType::Name,
            })
        );
    }

    #[test]
    fn test_meter_predicates() {
        assert!(Health::full(3).is_alive());
        assert!(!Health { current: 0, max: 3 }.is_alive());
        assert!(!Charge::empty(2).is_full());
        assert!(Charge { current: 2, max: 2 }.is_full());
    }

    #[test]
    fn test_updated_keeps_identity() {
        let health = Component::new(ComponentId::new(3), Health::full(10));
        let hurt = health
            .updated(Health { current: 4, max: 10 })
            .expect("same type");

        assert_eq!(hurt.id(), health.id());
        assert_eq!(hurt.get::<Health>().map(|h| h.current), Ok(4));
        // Original is untouched
        assert_eq!(health.get::<Health>().map(|h| h.current), Ok(10));
    }

    #[test]
    fn test_updated_rejects_type_change() {
        let health = Component::new(ComponentId::new(3), Health::full(10));
        let err = health.updated(Name::new("oops")).unwrap_err();
        assert!(matches!(err, Error::ComponentTypeChanged { .. }));
    }

    #[test]
    fn test_component_type_tags() {
        for ty in ComponentType::ALL {
            assert_eq!(ty.as_str().parse::<ComponentType>(), Ok(ty));
        }
        assert_eq!(
            "Shield".parse::<ComponentType>(),
            Err(Error::UnknownComponentType("Shield".to_string()))
        );
    }

    #[test]
    fn test_component_ron() {
        let component = Component::new(ComponentId::new(2), Team::new(1));
        let text = ron::to_string(&component).expect("serialize");
        let back: Component = ron::from_str(&text).expect("deserialize");
        assert_eq!(back, component);
    }
}
