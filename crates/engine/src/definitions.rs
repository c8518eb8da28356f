//! The module contains `Definition`, the catalog entry assets point at.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use uuid::Uuid;

use crate::{EngineError, util::parse_uuid};

/// Canonical description of a holdable unit (a currency, a stock, a coin).
///
/// The abbreviation is unique across the catalog, compared case-insensitively.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Definition {
    pub id: Uuid,
    pub name: String,
    pub abbreviation: String,
    pub suffix: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Definition {
    pub fn new(name: String, abbreviation: String, suffix: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            abbreviation,
            suffix,
            created_at: now,
            updated_at: now,
        }
    }

    /// Search rank against a lower-cased term: lower is better.
    ///
    /// `None` means the definition does not match at all.
    pub(crate) fn search_rank(&self, term: &str) -> Option<u8> {
        let abbreviation = self.abbreviation.to_lowercase();
        let name = self.name.to_lowercase();
        if !abbreviation.contains(term) && !name.contains(term) {
            return None;
        }
        let rank = if abbreviation == term {
            1
        } else if abbreviation.starts_with(term) {
            2
        } else if name == term {
            3
        } else if name.starts_with(term) {
            4
        } else {
            5
        };
        Some(rank)
    }
}

pub(crate) fn abbreviation_key(abbreviation: &str) -> String {
    abbreviation.trim().to_lowercase()
}

/// Lower-cased copy of the name that search filters on. SQLite `LIKE`
/// only folds ASCII case, so the folding happens here.
pub(crate) fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "definitions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub abbreviation: String,
    pub abbreviation_key: String,
    pub name_key: String,
    pub suffix: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::assets::Entity")]
    Assets,
}

impl Related<super::assets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Definition> for ActiveModel {
    fn from(definition: &Definition) -> Self {
        Self {
            id: ActiveValue::Set(definition.id.to_string()),
            name: ActiveValue::Set(definition.name.clone()),
            abbreviation: ActiveValue::Set(definition.abbreviation.clone()),
            abbreviation_key: ActiveValue::Set(abbreviation_key(&definition.abbreviation)),
            name_key: ActiveValue::Set(name_key(&definition.name)),
            suffix: ActiveValue::Set(definition.suffix.clone()),
            created_at: ActiveValue::Set(definition.created_at),
            updated_at: ActiveValue::Set(definition.updated_at),
        }
    }
}

impl TryFrom<Model> for Definition {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "definition")?,
            name: model.name,
            abbreviation: model.abbreviation,
            suffix: model.suffix,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(name: &str, abbreviation: &str) -> Definition {
        Definition::new(name.to_string(), abbreviation.to_string(), String::new())
    }

    #[test]
    fn rank_orders_match_kinds() {
        assert_eq!(def("Bitcoin", "BT").search_rank("bt"), Some(1));
        assert_eq!(def("Bitcoin", "BTC").search_rank("bt"), Some(2));
        assert_eq!(def("bt", "XYZ").search_rank("bt"), Some(3));
        assert_eq!(def("Bitcoin Thing", "XBT").search_rank("bit"), Some(4));
        assert_eq!(def("Wrapped Bitcoin", "WBT").search_rank("bitcoin"), Some(5));
    }

    #[test]
    fn keys_fold_non_ascii_case() {
        assert_eq!(name_key(" Éther "), "éther");
        assert_eq!(abbreviation_key("ÉTH"), "éth");
        assert_eq!(def("Éther", "ETH").search_rank("éther"), Some(3));
    }

    #[test]
    fn rank_none_without_match() {
        assert_eq!(def("Euro", "EUR").search_rank("btc"), None);
    }
}
