//! World seeder for the "Caves" test adventure.
//!
//! Builds authored content, one game instance and any number of joined players
//! inside the caller's transaction. The live world is created the same way the
//! subscription job creates it, through `initialize_world` and `join_character`.
//!
//! Layout:
//!
//! ```text
//!   Hall <-- Entrance (start) --> Tower        Vault (unreachable)
//!                 |
//!                 v
//!              Cellar (Rat)
//! ```
//!
//! Sword, Dagger, Cloak, Ring and Rock all lie at the Entrance.

use playbymail_domain::{
    Account, AccountUser, Character, CharacterInstance, Creature, CreaturePlacement,
    EquipmentSlot, Game, GameConfig, GameInstance, GameSubscription, GameType, Item,
    ItemInstanceId, ItemPlacementTemplate, Location, LocationInstance, LocationLink,
    SubscriptionType,
};

use crate::infrastructure::persistence::Model;
use crate::use_cases::adventure::{initialize_world, join_character};
use crate::use_cases::turn_sheets::SheetRecipient;

const PLAYER_NAMES: &[&str] = &["Ada", "Bram", "Cleo", "Dov", "Esme", "Finn"];

const EXITS: &[(&str, &str)] = &[
    ("Hall", "West arch"),
    ("Cellar", "Trapdoor"),
    ("Tower", "Spiral stair"),
];

const ITEMS: &[(&str, Option<EquipmentSlot>, bool)] = &[
    ("Sword", Some(EquipmentSlot::Weapon), true),
    ("Dagger", Some(EquipmentSlot::Weapon), true),
    ("Cloak", Some(EquipmentSlot::Clothing), true),
    ("Ring", Some(EquipmentSlot::Jewelry), true),
    ("Rock", None, false),
];

// =============================================================================
// WorldBuilder
// =============================================================================

pub struct WorldBuilder {
    name: String,
    players: usize,
    start: bool,
    config: GameConfig,
}

impl WorldBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            players: 1,
            start: true,
            config: GameConfig::default(),
        }
    }

    pub fn with_players(mut self, players: usize) -> Self {
        self.players = players;
        self
    }

    /// Leave the instance in `created`. The world is still initialized.
    pub fn unstarted(mut self) -> Self {
        self.start = false;
        self
    }

    pub fn with_config(mut self, config: GameConfig) -> Self {
        self.config = config;
        self
    }

    /// Write everything through `model`. Nothing is committed.
    pub async fn seed(self, model: &mut Model) -> SeededWorld {
        let now = model.now();
        let game = Game::new(&self.name, GameType::Adventure, now)
            .with_description("A damp cave system under the hill.");
        model.create_game(&game).await.expect("create game");

        let entrance = Location::new(game.id, "Entrance")
            .with_description("Daylight fades behind you.")
            .as_starting_location();
        model.create_location(&entrance).await.expect("create location");

        for (name, link_name) in EXITS {
            let location = Location::new(game.id, *name);
            model.create_location(&location).await.expect("create location");
            let link = LocationLink::new(game.id, entrance.id, location.id, *link_name);
            model.create_location_link(&link).await.expect("create link");
        }
        model
            .create_location(&Location::new(game.id, "Vault"))
            .await
            .expect("create location");

        for (name, slot, equippable) in ITEMS {
            let mut item = Item::new(game.id, *name);
            if *equippable {
                item = item.equippable(*slot);
            }
            model.create_item(&item).await.expect("create item");
            model
                .create_item_placement(&ItemPlacementTemplate::new(game.id, item.id, entrance.id, 1))
                .await
                .expect("create item placement");
        }

        let rat = Creature::new(game.id, "Rat", 4);
        model.create_creature(&rat).await.expect("create creature");
        let cellar = model
            .list_locations(game.id)
            .await
            .expect("list locations")
            .into_iter()
            .find(|l| l.name == "Cellar")
            .expect("cellar");
        model
            .create_creature_placement(&CreaturePlacement::new(game.id, rat.id, cellar.id, 1))
            .await
            .expect("create creature placement");

        let mut instance = GameInstance::new(game.id, self.config, now);
        model
            .create_game_instance(&instance)
            .await
            .expect("create game instance");
        initialize_world(model, &instance)
            .await
            .expect("initialize world");
        if self.start {
            instance.start(now).expect("start instance");
            model
                .update_game_instance(&instance)
                .await
                .expect("update game instance");
        }

        let start = model
            .find_starting_location_instance(instance.id())
            .await
            .expect("find start")
            .expect("starting location instance");

        let mut characters = Vec::with_capacity(self.players);
        for i in 0..self.players {
            let name = PLAYER_NAMES
                .get(i)
                .map(|n| n.to_string())
                .unwrap_or_else(|| format!("Player {}", i + 1));
            characters.push(seed_player(model, &game, &instance, &name).await);
        }

        SeededWorld {
            game,
            instance,
            start,
            characters,
        }
    }
}

async fn seed_player(
    model: &mut Model,
    game: &Game,
    instance: &GameInstance,
    name: &str,
) -> SeededCharacter {
    let now = model.now();
    let account = Account::new(name, now);
    model.create_account(&account).await.expect("create account");
    let user = AccountUser::new(
        account.id,
        format!("{}@example.com", name.replace(' ', ".")),
        name,
        now,
    );
    model
        .create_account_user(&user)
        .await
        .expect("create account user");

    let mut subscription = GameSubscription::new(game.id, account.id, SubscriptionType::Player, now);
    subscription
        .activate(Some(instance.id()), now)
        .expect("activate subscription");
    model
        .create_subscription(&subscription)
        .await
        .expect("create subscription");

    let joined = join_character(model, instance, &account)
        .await
        .expect("join character");

    SeededCharacter {
        account,
        user,
        subscription,
        character: joined.character,
        instance: joined.instance,
    }
}

// =============================================================================
// Seeded handles
// =============================================================================

#[derive(Debug, Clone)]
pub struct SeededWorld {
    pub game: Game,
    pub instance: GameInstance,
    pub start: LocationInstance,
    pub characters: Vec<SeededCharacter>,
}

impl SeededWorld {
    /// The live instance of the named item still lying at the Entrance.
    pub async fn item_at_start(&self, model: &mut Model, name: &str) -> ItemInstanceId {
        model
            .list_items_at_location(self.start.id)
            .await
            .expect("list items")
            .into_iter()
            .find(|placed| placed.item.name == name)
            .map(|placed| placed.instance.id())
            .unwrap_or_else(|| panic!("no {} at the start", name))
    }

    /// The live instance of a location by its authored name.
    pub async fn location(&self, model: &mut Model, name: &str) -> LocationInstance {
        let location = model
            .list_locations(self.game.id)
            .await
            .expect("list locations")
            .into_iter()
            .find(|l| l.name == name)
            .unwrap_or_else(|| panic!("no location {}", name));
        model
            .list_location_instances(self.instance.id())
            .await
            .expect("list location instances")
            .into_iter()
            .find(|li| li.location_id == location.id)
            .unwrap_or_else(|| panic!("{} was not instantiated", name))
    }
}

#[derive(Debug, Clone)]
pub struct SeededCharacter {
    pub account: Account,
    pub user: AccountUser,
    pub subscription: GameSubscription,
    pub character: Character,
    pub instance: CharacterInstance,
}

impl SeededCharacter {
    pub fn recipient(&self) -> SheetRecipient {
        SheetRecipient {
            character: self.character.clone(),
            account: self.account.clone(),
            user: self.user.clone(),
        }
    }
}
