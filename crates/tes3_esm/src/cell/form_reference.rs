//! Placed object references inside a cell

use binrw::{BinRead, BinWrite};
use derive_more::derive::{Deref, From};

use crate::{
    error::{Error, Result},
    field::{push_field, take_once, Field},
    scalar_field, string_field, struct_field,
    subrecord::Subrecord,
    tag,
};

scalar_field!(
    /// Reference number, unique within the plugin that created it
    ReferenceId(u32),
    tag::FRMR
);

string_field!(
    /// Id of the placed base object
    ObjectId,
    tag::NAME
);

scalar_field!(
    /// Reference blocked
    ReferenceBlocked(u8),
    tag::UNAM
);

scalar_field!(
    /// Uniform scale
    Scale(f32),
    tag::XSCL
);

string_field!(
    /// NPC that owns the object
    OwnerNpc,
    tag::ANAM
);

string_field!(
    /// Global variable controlling ownership
    OwnerGlobal,
    tag::BNAM
);

string_field!(
    /// Faction that owns the object
    OwnerFaction,
    tag::CNAM
);

scalar_field!(
    /// Faction rank required to use the object
    FactionRank(u32),
    tag::INDX
);

string_field!(
    /// Creature soul trapped in a soul gem
    Soul,
    tag::XSOL
);

scalar_field!(
    /// Remaining enchantment charge
    EnchantmentCharge(f32),
    tag::XCHG
);

scalar_field!(
    /// Health for weapons and armor, uses for tools, time remaining for lights
    Condition(u32),
    tag::INTV
);

impl Condition {
    /// The same bits read as a float, used by lights
    pub fn as_f32(&self) -> f32 {
        f32::from_bits(self.0)
    }
}

scalar_field!(
    /// Gold value
    GoldValue(u32),
    tag::NAM9
);

string_field!(
    /// Cell that a door leads to, empty for exteriors
    DestinationCellName,
    tag::DNAM
);

scalar_field!(
    /// Lock level
    LockLevel(u32),
    tag::FLTV
);

string_field!(
    /// Key that opens the lock
    KeyId,
    tag::KNAM
);

string_field!(
    /// Trap spell
    TrapId,
    tag::TNAM
);

scalar_field!(
    /// Reference disabled marker
    ReferenceDisabled(u8),
    tag::ZNAM
);

/// Position and rotation in world space
#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[brw(little)]
pub struct Transform {
    pub position: [f32; 3],
    pub rotation: [f32; 3],
}

/// Where the reference is placed
#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Default, Deref, From)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[brw(little)]
pub struct Placement(pub Transform);
struct_field!(Placement, tag::DATA, 24);

/// Where a door teleports to
#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Default, Deref, From)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[brw(little)]
pub struct TravelDestination(pub Transform);
struct_field!(TravelDestination, tag::DODT, 24);

/// A placed object: the `FRMR` group of a cell
///
/// The id and object are required, every other field appears at most once.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FormReference {
    pub id: ReferenceId,
    pub object: ObjectId,
    pub blocked: Option<ReferenceBlocked>,
    pub scale: Option<Scale>,
    pub owner: Option<OwnerNpc>,
    pub owner_global: Option<OwnerGlobal>,
    pub faction: Option<OwnerFaction>,
    pub faction_rank: Option<FactionRank>,
    pub soul: Option<Soul>,
    pub charge: Option<EnchantmentCharge>,
    pub condition: Option<Condition>,
    pub value: Option<GoldValue>,
    pub destination: Option<TravelDestination>,
    pub destination_cell: Option<DestinationCellName>,
    pub lock_level: Option<LockLevel>,
    pub key: Option<KeyId>,
    pub trap: Option<TrapId>,
    pub disabled: Option<ReferenceDisabled>,
    pub placement: Option<Placement>,
}

impl FormReference {
    pub fn new(id: u32, object: ObjectId) -> Self {
        FormReference {
            id: ReferenceId(id),
            object,
            ..Default::default()
        }
    }

    /// Parse the group starting at `subrecords[0]`, which must be `FRMR`.
    ///
    /// Subrecords are consumed while their tag belongs to a form reference and has not been seen
    /// yet in this group. The first other tag, a repeated tag or a second `FRMR` ends the group
    /// without being consumed. Returns the reference and the number of subrecords consumed.
    pub fn parse(subrecords: &[Subrecord]) -> Result<(FormReference, usize)> {
        let first = subrecords.first().ok_or(Error::MissingField {
            record: tag::CELL,
            tag: tag::FRMR,
        })?;
        let id = ReferenceId::from_subrecord(first)?;

        let mut object = None;
        let mut reference = FormReference {
            id,
            ..Default::default()
        };

        let mut consumed = 1;
        for subrecord in &subrecords[1..] {
            let accepted = match subrecord.tag {
                tag::NAME => take_once(&mut object, subrecord)?,
                tag::UNAM => take_once(&mut reference.blocked, subrecord)?,
                tag::XSCL => take_once(&mut reference.scale, subrecord)?,
                tag::ANAM => take_once(&mut reference.owner, subrecord)?,
                tag::BNAM => take_once(&mut reference.owner_global, subrecord)?,
                tag::CNAM => take_once(&mut reference.faction, subrecord)?,
                tag::INDX => take_once(&mut reference.faction_rank, subrecord)?,
                tag::XSOL => take_once(&mut reference.soul, subrecord)?,
                tag::XCHG => take_once(&mut reference.charge, subrecord)?,
                tag::INTV => take_once(&mut reference.condition, subrecord)?,
                tag::NAM9 => take_once(&mut reference.value, subrecord)?,
                tag::DODT => take_once(&mut reference.destination, subrecord)?,
                tag::DNAM => take_once(&mut reference.destination_cell, subrecord)?,
                tag::FLTV => take_once(&mut reference.lock_level, subrecord)?,
                tag::KNAM => take_once(&mut reference.key, subrecord)?,
                tag::TNAM => take_once(&mut reference.trap, subrecord)?,
                tag::ZNAM => take_once(&mut reference.disabled, subrecord)?,
                tag::DATA => take_once(&mut reference.placement, subrecord)?,
                _ => false,
            };
            if !accepted {
                break;
            }
            consumed += 1;
        }

        reference.object = object.ok_or(Error::MissingField {
            record: tag::FRMR,
            tag: tag::NAME,
        })?;

        Ok((reference, consumed))
    }

    /// Subrecords in the order the game writes them
    pub fn to_subrecords(&self) -> Result<Vec<Subrecord>> {
        let mut out = vec![self.id.to_subrecord()?, self.object.to_subrecord()?];
        push_field(&mut out, &self.blocked)?;
        push_field(&mut out, &self.scale)?;
        push_field(&mut out, &self.owner)?;
        push_field(&mut out, &self.owner_global)?;
        push_field(&mut out, &self.faction)?;
        push_field(&mut out, &self.faction_rank)?;
        push_field(&mut out, &self.soul)?;
        push_field(&mut out, &self.charge)?;
        push_field(&mut out, &self.condition)?;
        push_field(&mut out, &self.value)?;
        push_field(&mut out, &self.destination)?;
        push_field(&mut out, &self.destination_cell)?;
        push_field(&mut out, &self.lock_level)?;
        push_field(&mut out, &self.key)?;
        push_field(&mut out, &self.trap)?;
        push_field(&mut out, &self.disabled)?;
        push_field(&mut out, &self.placement)?;
        Ok(out)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn frmr(id: u32) -> Subrecord {
        Subrecord::new(tag::FRMR, id.to_le_bytes().to_vec())
    }

    fn name(value: &str) -> Subrecord {
        Subrecord::new(tag::NAME, value.as_bytes().to_vec())
    }

    #[test]
    fn parse_minimal_reference() -> Result<()> {
        let subrecords = vec![frmr(1), name("lantern_01")];

        let (reference, consumed) = FormReference::parse(&subrecords)?;
        assert_eq!(consumed, 2);
        assert_eq!(reference, FormReference::new(1, ObjectId::new("lantern_01")));
        assert_eq!(reference.to_subrecords()?, subrecords);

        Ok(())
    }

    #[test]
    fn stops_before_unknown_tag() -> Result<()> {
        let subrecords = vec![
            frmr(7),
            name("chest_small_01"),
            Subrecord::new(tag::FLTV, 50u32.to_le_bytes().to_vec()),
            Subrecord::new(tag::KNAM, b"key_arrille\0".to_vec()),
            Subrecord::new(tag::NAM0, 3u32.to_le_bytes().to_vec()),
            frmr(8),
        ];

        let (reference, consumed) = FormReference::parse(&subrecords)?;
        assert_eq!(consumed, 4);
        assert_eq!(reference.lock_level, Some(LockLevel(50)));
        assert_eq!(reference.key, Some(KeyId::terminated("key_arrille")));

        Ok(())
    }

    #[test]
    fn stops_at_next_reference() -> Result<()> {
        let subrecords = vec![frmr(1), name("a"), frmr(2), name("b")];

        let (first, consumed) = FormReference::parse(&subrecords)?;
        assert_eq!((first.id, consumed), (ReferenceId(1), 2));

        let (second, consumed) = FormReference::parse(&subrecords[2..])?;
        assert_eq!((second.id, consumed), (ReferenceId(2), 2));

        Ok(())
    }

    #[test]
    fn repeated_field_ends_group() -> Result<()> {
        let scale = Subrecord::new(tag::XSCL, 2.0f32.to_le_bytes().to_vec());
        let subrecords = vec![frmr(1), name("a"), scale.clone(), scale];

        let (reference, consumed) = FormReference::parse(&subrecords)?;
        assert_eq!(consumed, 3);
        assert_eq!(reference.scale, Some(Scale(2.0)));

        Ok(())
    }

    #[test]
    fn full_reference_write_order() -> Result<()> {
        let mut position = vec![];
        for v in [1.0f32, 2.0, 3.0, 0.0, 0.0, 1.5] {
            position.extend_from_slice(&v.to_le_bytes());
        }

        let subrecords = vec![
            frmr(3),
            name("misc_soulgem_grand"),
            Subrecord::new(tag::UNAM, vec![1]),
            Subrecord::new(tag::XSCL, 1.25f32.to_le_bytes().to_vec()),
            Subrecord::new(tag::ANAM, b"fargoth\0".to_vec()),
            Subrecord::new(tag::BNAM, b"hasbeenpaid\0".to_vec()),
            Subrecord::new(tag::CNAM, b"Hlaalu\0".to_vec()),
            Subrecord::new(tag::INDX, 2u32.to_le_bytes().to_vec()),
            Subrecord::new(tag::XSOL, b"golden saint\0".to_vec()),
            Subrecord::new(tag::XCHG, 40.0f32.to_le_bytes().to_vec()),
            Subrecord::new(tag::INTV, 100u32.to_le_bytes().to_vec()),
            Subrecord::new(tag::NAM9, 1u32.to_le_bytes().to_vec()),
            Subrecord::new(tag::ZNAM, vec![0]),
            Subrecord::new(tag::DATA, position),
        ];

        let (reference, consumed) = FormReference::parse(&subrecords)?;
        assert_eq!(consumed, subrecords.len());
        assert_eq!(
            reference.faction,
            Some(OwnerFaction::terminated("Hlaalu"))
        );
        assert_eq!(reference.placement.map(|p| p.position), Some([1.0, 2.0, 3.0]));
        assert_eq!(reference.to_subrecords()?, subrecords);

        Ok(())
    }

    #[test]
    fn missing_object_name() {
        let subrecords = vec![frmr(1), Subrecord::new(tag::XSCL, 1.0f32.to_le_bytes().to_vec())];
        assert!(matches!(
            FormReference::parse(&subrecords),
            Err(Error::MissingField { tag: missing, .. }) if missing == tag::NAME
        ));
    }

    #[test]
    fn condition_as_float() {
        assert_eq!(Condition(1.5f32.to_bits()).as_f32(), 1.5);
    }
}
