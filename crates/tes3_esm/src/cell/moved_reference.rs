//! References that have moved from the cell they were placed in

use binrw::{BinRead, BinWrite};

use crate::{
    cell::form_reference::FormReference,
    error::{Error, Result},
    field::{push_field, take_once, Field},
    scalar_field, string_field, struct_field,
    subrecord::Subrecord,
    tag,
};

scalar_field!(
    /// Id of the reference that moved
    MovedReferenceId(u32),
    tag::MVRF
);

string_field!(
    /// Interior cell the reference moved to
    DestinationCell,
    tag::CNAM
);

/// Exterior cell the reference moved to
#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[brw(little)]
pub struct DestinationGrid {
    pub x: i32,
    pub y: i32,
}
struct_field!(DestinationGrid, tag::CNDT, 8);

/// An `MVRF` group
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MovedReference {
    pub id: MovedReferenceId,
    pub cell: Option<DestinationCell>,
    pub grid: Option<DestinationGrid>,
    pub reference: Option<FormReference>,
}

impl MovedReference {
    pub fn new(id: u32) -> Self {
        MovedReference {
            id: MovedReferenceId(id),
            ..Default::default()
        }
    }

    /// Parse the group starting at `subrecords[0]`, which must be `MVRF`.
    ///
    /// Follows the same rules as [`FormReference::parse`], with the form reference itself
    /// accepted once as a nested group. A `FRMR` that is the very last subrecord is left for the
    /// caller.
    pub fn parse(subrecords: &[Subrecord]) -> Result<(MovedReference, usize)> {
        let mut moved = MovedReference::default();
        let Some(first) = subrecords.first() else {
            return Err(Error::MissingField {
                record: tag::CELL,
                tag: tag::MVRF,
            });
        };
        moved.id = MovedReferenceId::from_subrecord(first)?;

        let mut consumed = 1;
        while let Some(subrecord) = subrecords.get(consumed) {
            match subrecord.tag {
                tag::CNAM if take_once(&mut moved.cell, subrecord)? => consumed += 1,
                tag::CNDT if take_once(&mut moved.grid, subrecord)? => consumed += 1,
                tag::FRMR if moved.reference.is_none() && consumed + 1 < subrecords.len() => {
                    let (reference, used) = FormReference::parse(&subrecords[consumed..])?;
                    moved.reference = Some(reference);
                    consumed += used;
                }
                _ => break,
            }
        }

        Ok((moved, consumed))
    }

    pub fn to_subrecords(&self) -> Result<Vec<Subrecord>> {
        let mut out = vec![self.id.to_subrecord()?];
        push_field(&mut out, &self.cell)?;
        push_field(&mut out, &self.grid)?;
        if let Some(reference) = &self.reference {
            out.extend(reference.to_subrecords()?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::cell::form_reference::ObjectId;

    fn u32_sub(tag: crate::tag::Tag, value: u32) -> Subrecord {
        Subrecord::new(tag, value.to_le_bytes().to_vec())
    }

    #[test]
    fn parse_moved_with_reference() -> Result<()> {
        #[rustfmt::skip]
        let subrecords = vec![
            u32_sub(tag::MVRF, 0x0100_0002),
            Subrecord::new(tag::CNDT, vec![
                0xFD, 0xFF, 0xFF, 0xFF,
                0x05, 0x00, 0x00, 0x00,
            ]),
            u32_sub(tag::FRMR, 0x0100_0002),
            Subrecord::new(tag::NAME, b"guar".to_vec()),
            u32_sub(tag::FRMR, 9),
            Subrecord::new(tag::NAME, b"rock".to_vec()),
        ];

        let (moved, consumed) = MovedReference::parse(&subrecords)?;
        assert_eq!(consumed, 4);
        assert_eq!(moved.grid, Some(DestinationGrid { x: -3, y: 5 }));
        assert_eq!(
            moved.reference,
            Some(FormReference::new(0x0100_0002, ObjectId::new("guar")))
        );
        assert_eq!(moved.to_subrecords()?, subrecords[..4].to_vec());

        Ok(())
    }

    #[test]
    fn parse_moved_without_reference() -> Result<()> {
        let subrecords = vec![
            u32_sub(tag::MVRF, 4),
            Subrecord::new(tag::CNAM, b"Balmora, Guild of Mages\0".to_vec()),
            Subrecord::new(tag::CNAM, b"Vivec\0".to_vec()),
        ];

        let (moved, consumed) = MovedReference::parse(&subrecords)?;
        assert_eq!(consumed, 2);
        assert_eq!(
            moved.cell,
            Some(DestinationCell::terminated("Balmora, Guild of Mages"))
        );
        assert_eq!(moved.reference, None);

        Ok(())
    }

    #[test]
    fn trailing_id_is_left_for_the_cell() -> Result<()> {
        let subrecords = vec![u32_sub(tag::MVRF, 4), u32_sub(tag::FRMR, 4)];

        let (moved, consumed) = MovedReference::parse(&subrecords)?;
        assert_eq!(consumed, 1);
        assert_eq!(moved, MovedReference::new(4));

        Ok(())
    }
}
