use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

/// A named column of an inspection sheet.
///
/// Every field carries the placeholder token used for it in report templates,
/// so the same enum drives both row lookups and the template sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Field {
    InspectionId,
    UserName,
    TrainNo,
    Location,
    CarBody,
    SectionName,
    SubsystemName,
    SerialNumber,
    Subcomponent,
    Condition,
    DefectType,
    Remarks,
    ImageUrl,
    ImageId,
}

impl Field {
    pub const ALL: [Field; 14] = [
        Field::InspectionId,
        Field::UserName,
        Field::TrainNo,
        Field::Location,
        Field::CarBody,
        Field::SectionName,
        Field::SubsystemName,
        Field::SerialNumber,
        Field::Subcomponent,
        Field::Condition,
        Field::DefectType,
        Field::Remarks,
        Field::ImageUrl,
        Field::ImageId,
    ];

    /// The ten fields printed in a report line, in column order.
    pub const PRESENTATION: [Field; 10] = [
        Field::Location,
        Field::CarBody,
        Field::UserName,
        Field::SectionName,
        Field::SubsystemName,
        Field::SerialNumber,
        Field::Subcomponent,
        Field::Condition,
        Field::DefectType,
        Field::Remarks,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::InspectionId => "InspectionId",
            Field::UserName => "UserName",
            Field::TrainNo => "TrainNo",
            Field::Location => "Location",
            Field::CarBody => "CarBody",
            Field::SectionName => "SectionName",
            Field::SubsystemName => "SubsystemName",
            Field::SerialNumber => "SerialNumber",
            Field::Subcomponent => "Subcomponent",
            Field::Condition => "Condition",
            Field::DefectType => "DefectType",
            Field::Remarks => "Remarks",
            Field::ImageUrl => "ImageUrl",
            Field::ImageId => "ImageId",
        }
    }

    /// Template marker for this field, e.g. `{{Car Body}}`.
    pub fn token(self) -> &'static str {
        match self {
            Field::InspectionId => "{{Inspection ID}}",
            Field::UserName => "{{UserName}}",
            Field::TrainNo => "{{trainNo}}",
            Field::Location => "{{Location}}",
            Field::CarBody => "{{Car Body}}",
            Field::SectionName => "{{Section Name}}",
            Field::SubsystemName => "{{Subsystem Name}}",
            Field::SerialNumber => "{{Serial Number}}",
            Field::Subcomponent => "{{Subcomponent}}",
            Field::Condition => "{{Condition}}",
            Field::DefectType => "{{Defect Type}}",
            Field::Remarks => "{{Remarks}}",
            Field::ImageUrl => "{{Image URL}}",
            Field::ImageId => "{{Image ID}}",
        }
    }

    fn default_position(self) -> usize {
        match self {
            Field::InspectionId => 2,
            Field::UserName => 5,
            Field::TrainNo => 7,
            Field::Location => 8,
            Field::CarBody => 11,
            Field::SectionName => 13,
            Field::SubsystemName => 15,
            Field::SerialNumber => 16,
            Field::Subcomponent => 18,
            Field::Condition => 19,
            Field::DefectType => 20,
            Field::Remarks => 21,
            Field::ImageId => 23,
            Field::ImageUrl => 27,
        }
    }
}

impl Display for Field {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .into_iter()
            .find(|field| field.name() == s)
            .ok_or_else(|| SchemaError::UnknownField(s.to_string()))
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("unknown field `{0}`")]
    UnknownField(String),

    #[error("column {position} is mapped to both {first} and {second}")]
    DuplicatePosition {
        position: usize,
        first: Field,
        second: Field,
    },

    #[error("column position of {0} must be 1 or greater")]
    InvalidPosition(Field),
}

/// Maps sheet fields to 1-based column positions.
///
/// Positions are unique within a schema. Functional and visual inspection
/// sheets share the same field set, so one schema type serves both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, usize>",
    into = "BTreeMap<String, usize>"
)]
pub struct ColumnSchema {
    positions: BTreeMap<Field, usize>,
}

impl ColumnSchema {
    pub fn new(positions: impl IntoIterator<Item = (Field, usize)>) -> Result<Self, SchemaError> {
        let mut by_field = BTreeMap::new();
        let mut by_position: BTreeMap<usize, Field> = BTreeMap::new();

        for (field, position) in positions {
            if position == 0 {
                return Err(SchemaError::InvalidPosition(field));
            }
            if let Some(&first) = by_position.get(&position) {
                if first != field {
                    return Err(SchemaError::DuplicatePosition {
                        position,
                        first,
                        second: field,
                    });
                }
            }
            if let Some(previous) = by_field.insert(field, position) {
                by_position.remove(&previous);
            }
            by_position.insert(position, field);
        }

        Ok(Self {
            positions: by_field,
        })
    }

    /// 1-based column of `field`.
    pub fn position_of(&self, field: Field) -> Result<usize, SchemaError> {
        self.positions
            .get(&field)
            .copied()
            .ok_or_else(|| SchemaError::UnknownField(field.name().to_string()))
    }

    /// 0-based cell index of `field`, for indexing into a row.
    pub fn index_of(&self, field: Field) -> Result<usize, SchemaError> {
        self.position_of(field).map(|position| position - 1)
    }

    /// Tokens of every mapped field, in field order.
    pub fn tokens(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.positions.keys().map(|field| field.token())
    }

    /// Right-most mapped column, i.e. the row width needed to read every field.
    pub fn widest_column(&self) -> usize {
        self.positions.values().copied().max().unwrap_or(0)
    }
}

impl Default for ColumnSchema {
    fn default() -> Self {
        Self {
            positions: Field::ALL
                .into_iter()
                .map(|field| (field, field.default_position()))
                .collect(),
        }
    }
}

impl TryFrom<BTreeMap<String, usize>> for ColumnSchema {
    type Error = SchemaError;

    fn try_from(map: BTreeMap<String, usize>) -> Result<Self, Self::Error> {
        let positions = map
            .into_iter()
            .map(|(name, position)| Ok((name.parse::<Field>()?, position)))
            .collect::<Result<Vec<_>, SchemaError>>()?;
        ColumnSchema::new(positions)
    }
}

impl From<ColumnSchema> for BTreeMap<String, usize> {
    fn from(schema: ColumnSchema) -> Self {
        schema
            .positions
            .into_iter()
            .map(|(field, position)| (field.name().to_string(), position))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_schema_matches_sheet_layout() {
        let schema = ColumnSchema::default();
        assert_eq!(schema.position_of(Field::TrainNo), Ok(7));
        assert_eq!(schema.position_of(Field::InspectionId), Ok(2));
        assert_eq!(schema.position_of(Field::ImageId), Ok(23));
        assert_eq!(schema.position_of(Field::ImageUrl), Ok(27));
        assert_eq!(schema.index_of(Field::Location), Ok(7));
        assert_eq!(schema.widest_column(), 27);
    }

    #[test]
    fn missing_field_is_unknown() {
        let schema = ColumnSchema::new([(Field::TrainNo, 1), (Field::InspectionId, 2)]).unwrap();
        assert_eq!(
            schema.position_of(Field::Remarks),
            Err(SchemaError::UnknownField("Remarks".to_string()))
        );
    }

    #[test]
    fn rejects_shared_positions() {
        let err = ColumnSchema::new([(Field::TrainNo, 3), (Field::Location, 3)]).unwrap_err();
        assert_eq!(
            err,
            SchemaError::DuplicatePosition {
                position: 3,
                first: Field::TrainNo,
                second: Field::Location,
            }
        );
    }

    #[test]
    fn rejects_zero_position() {
        assert_eq!(
            ColumnSchema::new([(Field::Remarks, 0)]),
            Err(SchemaError::InvalidPosition(Field::Remarks))
        );
    }

    #[test]
    fn remapping_a_field_frees_its_old_column() {
        let schema = ColumnSchema::new([
            (Field::TrainNo, 3),
            (Field::TrainNo, 4),
            (Field::Location, 3),
        ])
        .unwrap();
        assert_eq!(schema.position_of(Field::TrainNo), Ok(4));
        assert_eq!(schema.position_of(Field::Location), Ok(3));
    }

    #[test]
    fn parses_from_named_map() {
        let json = r#"{"TrainNo": 1, "InspectionId": 4}"#;
        let schema: ColumnSchema = serde_json::from_str(json).unwrap();
        assert_eq!(schema.position_of(Field::InspectionId), Ok(4));

        let bad = r#"{"Wheel": 1}"#;
        assert!(serde_json::from_str::<ColumnSchema>(bad).is_err());
    }

    #[test]
    fn tokens_cover_every_mapped_field() {
        let tokens: Vec<_> = ColumnSchema::default().tokens().collect();
        assert_eq!(tokens.len(), 14);
        assert!(tokens.contains(&"{{trainNo}}"));
        assert!(tokens.contains(&"{{Image URL}}"));
    }
}
