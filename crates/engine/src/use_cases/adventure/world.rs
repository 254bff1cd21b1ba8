//! Building the live world of a game instance from authored content.

use std::collections::HashMap;

use playbymail_domain::{
    Account, Character, CharacterInstance, CreatureInstance, GameInstance, ItemInstance,
    ItemPlacement, LocationId, LocationInstance, LocationInstanceId,
};

use crate::infrastructure::persistence::Model;
use crate::infrastructure::ports::RepoError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorldSummary {
    pub locations: usize,
    pub items: usize,
    pub creatures: usize,
}

/// Create location, item and creature instances for a fresh game instance.
///
/// Does nothing when the instance already has locations.
pub async fn initialize_world(
    model: &mut Model,
    instance: &GameInstance,
) -> Result<WorldSummary, RepoError> {
    if !model.list_location_instances(instance.id()).await?.is_empty() {
        return Ok(WorldSummary::default());
    }

    let now = model.now();
    let game_id = instance.game_id();
    let mut summary = WorldSummary::default();

    let mut location_instances: HashMap<LocationId, LocationInstanceId> = HashMap::new();
    for location in model.list_locations(game_id).await? {
        let live = LocationInstance::new(game_id, instance.id(), location.id, now);
        model.create_location_instance(&live).await?;
        location_instances.insert(location.id, live.id);
        summary.locations += 1;
    }

    let live_location = |location_id: LocationId| {
        location_instances.get(&location_id).copied().ok_or_else(|| {
            RepoError::constraint(format!(
                "placement refers to location {} outside game {}",
                location_id, game_id
            ))
        })
    };

    for placement in model.list_item_placements(game_id).await? {
        let at = live_location(placement.location_id)?;
        for _ in 0..placement.initial_count.max(0) {
            let item = ItemInstance::new(
                game_id,
                instance.id(),
                placement.item_id,
                ItemPlacement::AtLocation(at),
                now,
            );
            model.create_item_instance(&item).await?;
            summary.items += 1;
        }
    }

    let creatures: HashMap<_, _> = model
        .list_creatures(game_id)
        .await?
        .into_iter()
        .map(|creature| (creature.id, creature))
        .collect();
    for placement in model.list_creature_placements(game_id).await? {
        let at = live_location(placement.location_id)?;
        let creature = creatures.get(&placement.creature_id).ok_or_else(|| {
            RepoError::not_found("Creature", placement.creature_id)
        })?;
        for _ in 0..placement.initial_count.max(0) {
            let live = CreatureInstance::new(game_id, instance.id(), creature, at, now);
            model.create_creature_instance(&live).await?;
            summary.creatures += 1;
        }
    }

    tracing::info!(
        game_instance_id = %instance.id(),
        locations = summary.locations,
        items = summary.items,
        creatures = summary.creatures,
        "World initialized"
    );
    Ok(summary)
}

/// A character placed in a game instance.
#[derive(Debug, Clone)]
pub struct JoinedCharacter {
    pub character: Character,
    pub instance: CharacterInstance,
    /// False when the account already had a character instance here.
    pub created: bool,
}

/// Give an account its adventure character in this instance, at the starting location.
pub async fn join_character(
    model: &mut Model,
    instance: &GameInstance,
    account: &Account,
) -> Result<JoinedCharacter, RepoError> {
    let now = model.now();
    let character = match model
        .find_character_for_account(instance.game_id(), account.id)
        .await?
    {
        Some(character) => character,
        None => {
            let character = Character::new(instance.game_id(), account.id, &account.name, now);
            model.create_character(&character).await?;
            character
        }
    };

    if let Some(existing) = model
        .find_character_instance_for_account(instance.id(), account.id)
        .await?
    {
        return Ok(JoinedCharacter {
            character,
            instance: existing,
            created: false,
        });
    }

    let start = model
        .find_starting_location_instance(instance.id())
        .await?
        .ok_or_else(|| {
            RepoError::constraint(format!(
                "game instance {} has no starting location",
                instance.id()
            ))
        })?;

    let config = instance.game_config();
    let live = CharacterInstance::new(
        instance.id(),
        &character,
        start.id,
        config.starting_health(),
        config.inventory_capacity(),
        now,
    );
    model.create_character_instance(&live).await?;

    tracing::info!(
        game_instance_id = %instance.id(),
        character_instance_id = %live.id,
        account_id = %account.id,
        "Character joined"
    );
    Ok(JoinedCharacter {
        character,
        instance: live,
        created: true,
    })
}

#[cfg(test)]
mod tests {
    use crate::test_fixtures::{test_db, WorldBuilder};

    use super::*;

    #[tokio::test]
    async fn world_is_built_once_from_placements() {
        let db = test_db().await;
        let mut model = db.model().await;
        let world = WorldBuilder::new("Caves").with_players(0).seed(&mut model).await;

        let locations = model.list_location_instances(world.instance.id()).await.unwrap();
        assert_eq!(locations.len(), 5);
        assert_eq!(
            model.list_items_at_location(world.start.id).await.unwrap().len(),
            5
        );
        assert_eq!(
            model
                .list_creature_instances(world.instance.id())
                .await
                .unwrap()
                .len(),
            1
        );

        let again = initialize_world(&mut model, &world.instance).await.unwrap();
        assert_eq!(again, WorldSummary::default());
    }

    #[tokio::test]
    async fn joining_twice_reuses_the_character_instance() {
        let db = test_db().await;
        let mut model = db.model().await;
        let world = WorldBuilder::new("Caves").with_players(1).seed(&mut model).await;
        let player = &world.characters[0];

        let joined = join_character(&mut model, &world.instance, &player.account)
            .await
            .unwrap();
        assert!(!joined.created);
        assert_eq!(joined.instance.id, player.instance.id);
        assert_eq!(joined.instance.current_location_instance_id, world.start.id);
        assert_eq!(joined.instance.inventory_capacity, 10);
    }
}
