use chrono::Utc;
use sea_orm::{
    Condition, DatabaseTransaction, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait, prelude::*,
};
use uuid::Uuid;

use crate::{
    Caller, Definition, DefinitionNew, EngineError, Page, ResultEngine, assets,
    definitions::{self, abbreviation_key},
};

use super::{Engine, map_unique_violation, normalize_required_name, with_tx};

struct NormalizedDefinition {
    name: String,
    abbreviation: String,
    suffix: String,
}

fn normalize_definition(cmd: DefinitionNew) -> ResultEngine<NormalizedDefinition> {
    Ok(NormalizedDefinition {
        name: normalize_required_name(&cmd.name, "definition name")?,
        abbreviation: normalize_required_name(&cmd.abbreviation, "abbreviation")?,
        suffix: cmd.suffix.trim().to_string(),
    })
}

impl Engine {
    async fn abbreviation_taken(
        &self,
        db: &DatabaseTransaction,
        abbreviation: &str,
        except: Option<Uuid>,
    ) -> ResultEngine<bool> {
        let mut query = definitions::Entity::find()
            .filter(definitions::Column::AbbreviationKey.eq(abbreviation_key(abbreviation)));
        if let Some(id) = except {
            query = query.filter(definitions::Column::Id.ne(id.to_string()));
        }
        Ok(query.one(db).await?.is_some())
    }

    /// Adds a definition to the catalog.
    pub async fn new_definition(
        &self,
        caller: &Caller,
        cmd: DefinitionNew,
    ) -> ResultEngine<Definition> {
        let cmd = normalize_definition(cmd)?;
        with_tx!(self, caller, |db_tx| {
            if self.abbreviation_taken(&db_tx, &cmd.abbreviation, None).await? {
                return Err(EngineError::ExistingKey(cmd.abbreviation));
            }
            let definition = Definition::new(cmd.name, cmd.abbreviation, cmd.suffix);
            let model: definitions::ActiveModel = (&definition).into();
            model
                .insert(&db_tx)
                .await
                .map_err(|err| map_unique_violation(err, &definition.abbreviation))?;
            Ok(definition)
        })
    }

    /// Rewrites a definition. The abbreviation may stay the same but must not
    /// collide with a different definition.
    pub async fn update_definition(
        &self,
        caller: &Caller,
        definition_id: Uuid,
        cmd: DefinitionNew,
    ) -> ResultEngine<Definition> {
        let cmd = normalize_definition(cmd)?;
        with_tx!(self, caller, |db_tx| {
            let model = self.require_definition(&db_tx, definition_id).await?;
            if self
                .abbreviation_taken(&db_tx, &cmd.abbreviation, Some(definition_id))
                .await?
            {
                return Err(EngineError::ExistingKey(cmd.abbreviation));
            }
            let mut definition = Definition::try_from(model)?;
            definition.name = cmd.name;
            definition.abbreviation = cmd.abbreviation;
            definition.suffix = cmd.suffix;
            definition.updated_at = Utc::now();

            let active: definitions::ActiveModel = (&definition).into();
            active
                .update(&db_tx)
                .await
                .map_err(|err| map_unique_violation(err, &definition.abbreviation))?;
            Ok(definition)
        })
    }

    /// Removes a definition that no asset references.
    pub async fn delete_definition(
        &self,
        caller: &Caller,
        definition_id: Uuid,
    ) -> ResultEngine<()> {
        with_tx!(self, caller, |db_tx| {
            let model = self.require_definition(&db_tx, definition_id).await?;
            let references = assets::Entity::find()
                .filter(assets::Column::DefinitionId.eq(model.id.clone()))
                .count(&db_tx)
                .await?;
            if references > 0 {
                return Err(EngineError::ExistingKey(format!(
                    "definition {} is referenced by {references} asset(s)",
                    model.abbreviation
                )));
            }
            definitions::Entity::delete_by_id(model.id).exec(&db_tx).await?;
            Ok(())
        })
    }

    pub async fn definition(
        &self,
        caller: &Caller,
        definition_id: Uuid,
    ) -> ResultEngine<Definition> {
        with_tx!(self, caller, |db_tx| {
            let model = self.require_definition(&db_tx, definition_id).await?;
            Definition::try_from(model)
        })
    }

    /// Case-insensitive lookup by abbreviation.
    pub async fn definition_by_abbreviation(
        &self,
        caller: &Caller,
        abbreviation: &str,
    ) -> ResultEngine<Definition> {
        let abbreviation = normalize_required_name(abbreviation, "abbreviation")?;
        with_tx!(self, caller, |db_tx| {
            let model = definitions::Entity::find()
                .filter(definitions::Column::AbbreviationKey.eq(abbreviation_key(&abbreviation)))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound(abbreviation.clone()))?;
            Definition::try_from(model)
        })
    }

    /// The catalog ordered by name.
    pub async fn definitions(&self, caller: &Caller, page: Page) -> ResultEngine<Vec<Definition>> {
        with_tx!(self, caller, |db_tx| {
            definitions::Entity::find()
                .order_by_asc(definitions::Column::Name)
                .offset(page.offset)
                .limit(page.limit)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Definition::try_from)
                .collect()
        })
    }

    /// Substring search over name and abbreviation, ranked: exact abbreviation,
    /// abbreviation prefix, exact name, name prefix, anything else. Ties are
    /// broken alphabetically by name.
    pub async fn search_definitions(
        &self,
        caller: &Caller,
        term: &str,
        page: Page,
    ) -> ResultEngine<Vec<Definition>> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return Err(EngineError::Validation(
                "search term must not be empty".to_string(),
            ));
        }
        with_tx!(self, caller, |db_tx| {
            let models = definitions::Entity::find()
                .filter(
                    Condition::any()
                        .add(definitions::Column::AbbreviationKey.contains(&term))
                        .add(definitions::Column::NameKey.contains(&term)),
                )
                .all(&db_tx)
                .await?;

            let mut ranked = Vec::with_capacity(models.len());
            for model in models {
                let definition = Definition::try_from(model)?;
                if let Some(rank) = definition.search_rank(&term) {
                    ranked.push((rank, definition.name.to_lowercase(), definition));
                }
            }
            ranked.sort_by(|a, b| (a.0, &a.1).cmp(&(b.0, &b.1)));

            Ok(ranked
                .into_iter()
                .map(|(_, _, definition)| definition)
                .skip(page.offset as usize)
                .take(page.limit as usize)
                .collect())
        })
    }
}
