//! Tagged records: the on-wire shape of changes and components
//!
//! A [`ChangeRecord`] carries the numeric change-kind tag and, depending on
//! the kind, an entity id, a component id, a component record or a
//! timestamp. A [`ComponentRecord`] keeps the component payload as opaque
//! bytes next to its type tag, so the change log never needs to know the
//! payload layout.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use skirmish_core::{
    Change, ChangeKind, Component, ComponentData, ComponentId, ComponentType, EntityId, Timestamp,
};

/// A component as sent over the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentRecord {
    pub id: ComponentId,
    /// Component type name, e.g. `"Health"`
    pub type_tag: String,
    /// bincode-encoded payload
    pub data: Vec<u8>,
}

impl ComponentRecord {
    /// Encode a component
    pub fn from_component(component: &Component) -> Result<Self> {
        let data = match component.data() {
            ComponentData::Name(v) => payload_bytes(v),
            ComponentData::Team(v) => payload_bytes(v),
            ComponentData::Position(v) => payload_bytes(v),
            ComponentData::Health(v) => payload_bytes(v),
            ComponentData::Charge(v) => payload_bytes(v),
            ComponentData::Deployable(v) => payload_bytes(v),
        }?;
        Ok(Self {
            id: component.id(),
            type_tag: component.component_type().as_str().to_string(),
            data,
        })
    }

    /// Decode back into a component
    pub fn to_component(&self) -> Result<Component> {
        let ty: ComponentType = self
            .type_tag
            .parse()
            .map_err(|_| Error::UnknownComponentType(self.type_tag.clone()))?;
        let data = match ty {
            ComponentType::Name => payload::<skirmish_core::Name>(&self.data),
            ComponentType::Team => payload::<skirmish_core::Team>(&self.data),
            ComponentType::Position => payload::<skirmish_core::Position>(&self.data),
            ComponentType::Health => payload::<skirmish_core::Health>(&self.data),
            ComponentType::Charge => payload::<skirmish_core::Charge>(&self.data),
            ComponentType::Deployable => payload::<skirmish_core::Deployable>(&self.data),
        }?;
        Ok(Component::new(self.id, data))
    }
}

fn payload_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serialize(value).map_err(|e| Error::Encode(e.to_string()))
}

fn payload<T: DeserializeOwned + Into<ComponentData>>(bytes: &[u8]) -> Result<ComponentData> {
    bincode::deserialize::<T>(bytes)
        .map(Into::into)
        .map_err(|e| Error::Decode(e.to_string()))
}

/// A change as sent over the wire
///
/// Fields a kind does not use are left empty, and must stay empty to decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Numeric [`ChangeKind`] tag
    pub kind: u8,
    #[serde(default)]
    pub entity: Option<EntityId>,
    #[serde(default)]
    pub component_id: Option<ComponentId>,
    #[serde(default)]
    pub component: Option<ComponentRecord>,
    #[serde(default)]
    pub at: Option<Timestamp>,
}

impl ChangeRecord {
    fn empty(kind: ChangeKind) -> Self {
        Self {
            kind: kind.tag(),
            entity: None,
            component_id: None,
            component: None,
            at: None,
        }
    }

    /// Encode a change
    pub fn from_change(change: &Change) -> Result<Self> {
        let mut record = Self::empty(change.kind());
        match change {
            Change::StartGame => {}
            Change::CreateEntity { entity } | Change::DestroyEntity { entity } => {
                record.entity = Some(*entity);
            }
            Change::AttachComponent { entity, component } => {
                record.entity = Some(*entity);
                record.component = Some(ComponentRecord::from_component(component)?);
            }
            Change::DetachComponent { entity, component } => {
                record.entity = Some(*entity);
                record.component_id = Some(*component);
            }
            Change::UpdateComponent { component } => {
                record.component = Some(ComponentRecord::from_component(component)?);
            }
            Change::EndTurn { at } => {
                record.at = Some(*at);
            }
        }
        Ok(record)
    }

    /// Decode back into a change
    ///
    /// Unknown kind tags, missing required fields and fields the kind does
    /// not use are errors, never skipped.
    pub fn to_change(&self) -> Result<Change> {
        let kind = ChangeKind::from_tag(self.kind).ok_or(Error::UnknownChangeKind(self.kind))?;
        self.check_unused(kind)?;
        let change = match kind {
            ChangeKind::StartGame => Change::start_game(),
            ChangeKind::CreateEntity => Change::create_entity(self.entity(kind)?),
            ChangeKind::DestroyEntity => Change::destroy_entity(self.entity(kind)?),
            ChangeKind::AttachComponent => {
                Change::attach(self.entity(kind)?, self.component(kind)?)
            }
            ChangeKind::DetachComponent => {
                let component = self.component_id.ok_or(Error::MissingField {
                    kind,
                    field: "component_id",
                })?;
                Change::detach(self.entity(kind)?, component)
            }
            ChangeKind::UpdateComponent => Change::update(self.component(kind)?),
            ChangeKind::EndTurn => Change::end_turn(self.at.ok_or(Error::MissingField {
                kind,
                field: "at",
            })?),
        };
        Ok(change)
    }

    fn check_unused(&self, kind: ChangeKind) -> Result<()> {
        let (entity, component_id, component, at) = match kind {
            ChangeKind::StartGame => (false, false, false, false),
            ChangeKind::CreateEntity | ChangeKind::DestroyEntity => (true, false, false, false),
            ChangeKind::AttachComponent => (true, false, true, false),
            ChangeKind::DetachComponent => (true, true, false, false),
            ChangeKind::UpdateComponent => (false, false, true, false),
            ChangeKind::EndTurn => (false, false, false, true),
        };
        let unused = [
            ("entity", !entity && self.entity.is_some()),
            ("component_id", !component_id && self.component_id.is_some()),
            ("component", !component && self.component.is_some()),
            ("at", !at && self.at.is_some()),
        ];
        match unused.iter().find(|(_, set)| *set) {
            Some((field, _)) => Err(Error::Decode(format!(
                "{} record carries unused field `{}`",
                kind, field
            ))),
            None => Ok(()),
        }
    }

    fn entity(&self, kind: ChangeKind) -> Result<EntityId> {
        self.entity.ok_or(Error::MissingField {
            kind,
            field: "entity",
        })
    }

    fn component(&self, kind: ChangeKind) -> Result<Component> {
        self.component
            .as_ref()
            .ok_or(Error::MissingField {
                kind,
                field: "component",
            })?
            .to_component()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use skirmish_core::{Charge, Health, Name, Position};

    #[test]
    fn test_component_record_keeps_type_tag() {
        let component = Component::new(ComponentId(4), Health::full(12));
        let record = ComponentRecord::from_component(&component).unwrap();
        assert_eq!(record.type_tag, "Health");
        assert_eq!(record.id, ComponentId(4));
        assert_eq!(record.to_component().unwrap(), component);
    }

    #[test]
    fn test_position_payload() {
        let position = Component::new(ComponentId(2), Position::new(-3, 7));
        let record = ComponentRecord::from_component(&position).unwrap();
        assert_eq!(record.type_tag, "Position");
        assert_eq!(record.to_component().unwrap(), position);
    }

    #[test]
    fn test_truncated_payload() {
        let mut record =
            ComponentRecord::from_component(&Component::new(ComponentId(1), Name::new("Falcon")))
                .unwrap();
        record.data.truncate(3);
        assert!(matches!(record.to_component(), Err(Error::Decode(_))));
    }

    #[test]
    fn test_unknown_component_type() {
        let record = ComponentRecord {
            id: ComponentId(1),
            type_tag: "Mana".to_string(),
            data: Vec::new(),
        };
        assert!(matches!(
            record.to_component(),
            Err(Error::UnknownComponentType(tag)) if tag == "Mana"
        ));
    }

    #[test]
    fn test_record_fields_by_kind() {
        let at = Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap();

        let record = ChangeRecord::from_change(&Change::end_turn(at)).unwrap();
        assert_eq!(record.kind, 6);
        assert_eq!(record.at, Some(at));
        assert!(record.entity.is_none());

        let record = ChangeRecord::from_change(&Change::detach(EntityId(3), ComponentId(9))).unwrap();
        assert_eq!(record.kind, 4);
        assert_eq!(record.entity, Some(EntityId(3)));
        assert_eq!(record.component_id, Some(ComponentId(9)));
        assert!(record.component.is_none());

        let update = Change::update(Component::new(ComponentId(2), Charge::empty(5)));
        let record = ChangeRecord::from_change(&update).unwrap();
        assert_eq!(record.to_change().unwrap(), update);
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let record = ChangeRecord {
            kind: 7,
            ..ChangeRecord::from_change(&Change::start_game()).unwrap()
        };
        assert!(matches!(record.to_change(), Err(Error::UnknownChangeKind(7))));
    }

    #[test]
    fn test_missing_field_is_rejected() {
        let mut record = ChangeRecord::from_change(&Change::create_entity(EntityId(1))).unwrap();
        record.entity = None;
        assert!(matches!(
            record.to_change(),
            Err(Error::MissingField {
                kind: ChangeKind::CreateEntity,
                field: "entity"
            })
        ));

        let mut record = ChangeRecord::from_change(&Change::attach(
            EntityId(1),
            Component::new(ComponentId(1), Name::new("a")),
        ))
        .unwrap();
        record.component = None;
        assert!(matches!(
            record.to_change(),
            Err(Error::MissingField {
                field: "component",
                ..
            })
        ));
    }

    #[test]
    fn test_unused_field_is_rejected() {
        let mut record = ChangeRecord::from_change(&Change::start_game()).unwrap();
        record.entity = Some(EntityId(1));
        assert!(matches!(
            record.to_change(),
            Err(Error::Decode(msg)) if msg.contains("`entity`")
        ));

        let at = Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap();
        let mut record =
            ChangeRecord::from_change(&Change::detach(EntityId(1), ComponentId(2))).unwrap();
        record.at = Some(at);
        assert!(matches!(
            record.to_change(),
            Err(Error::Decode(msg)) if msg.contains("`at`")
        ));

        let mut record = ChangeRecord::from_change(&Change::update(Component::new(
            ComponentId(2),
            Health::full(3),
        )))
        .unwrap();
        record.component_id = Some(ComponentId(2));
        assert!(matches!(record.to_change(), Err(Error::Decode(_))));
    }
}
