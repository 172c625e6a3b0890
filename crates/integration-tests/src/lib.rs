//! Shared fixtures for the integration tests: the full service stack over
//! private in-memory SQLite databases, exactly as the binary wires it.

use std::sync::Arc;

use domains::{ItemType, KvStore, PointsStore, RedeemList, RedeemOption, StoreCatalog, StoreItem};
use services::accounts::AccountDirectory;
use services::automod::Automod;
use services::identity::IdentityResolver;
use services::ledger::Ledger;
use services::moderation::ModerationService;
use services::session::Sessions;
use services::storefront::Storefront;
use services::storefront::{REDEEMS_KEY, STORE_CATALOG_KEY};
use storage_adapters::sqlite::{SqliteKvStore, SqlitePointsStore};
use uuid::Uuid;

pub struct Harness {
    pub kv: Arc<dyn KvStore>,
    pub points: Arc<dyn PointsStore>,
    pub identity: Arc<IdentityResolver>,
    pub ledger: Arc<Ledger>,
    pub automod: Arc<Automod>,
    pub moderation: Arc<ModerationService>,
    pub storefront: Arc<Storefront>,
    pub accounts: Arc<AccountDirectory>,
    pub sessions: Arc<Sessions>,
    pub owner: Uuid,
}

pub async fn harness() -> Harness {
    let kv: Arc<dyn KvStore> =
        Arc::new(SqliteKvStore::connect_in_memory().await.expect("kv store"));
    let points: Arc<dyn PointsStore> =
        Arc::new(SqlitePointsStore::connect_in_memory().await.expect("points store"));
    let owner = Uuid::new_v4();

    let identity = Arc::new(IdentityResolver::new(kv.clone()));
    let ledger = Arc::new(Ledger::new(points.clone(), kv.clone(), owner));
    let automod = Arc::new(Automod::new(kv.clone(), points.clone(), owner));
    let moderation = Arc::new(ModerationService::new(kv.clone(), points.clone(), owner));
    let accounts = Arc::new(AccountDirectory::new(kv.clone(), points.clone()));
    let storefront = Arc::new(Storefront::new(kv.clone(), ledger.clone(), accounts.clone()));
    let sessions = Arc::new(Sessions::new(kv.clone()));

    Harness {
        kv,
        points,
        identity,
        ledger,
        automod,
        moderation,
        storefront,
        accounts,
        sessions,
        owner,
    }
}

/// Seeds a small catalog: one 60-ember avatar halo, one 40-ember message
/// trail, one 100-ember TTS redeem.
pub async fn seed_catalog(kv: &dyn KvStore) {
    let catalog = StoreCatalog {
        items: vec![
            StoreItem {
                id: "halo_cinder".into(),
                name: "Cinder Halo".into(),
                cost: 60,
                item_type: ItemType::AvatarDecoration,
                css_class: "halo-cinder".into(),
                requires_input: false,
            },
            StoreItem {
                id: "trail_embers".into(),
                name: "Ember Trail".into(),
                cost: 40,
                item_type: ItemType::MessageDecoration,
                css_class: "trail-embers".into(),
                requires_input: false,
            },
        ],
    };
    kv.put(STORE_CATALOG_KEY, &serde_json::to_string(&catalog).unwrap(), None)
        .await
        .unwrap();

    let redeems = RedeemList {
        options: vec![RedeemOption {
            id: "tts_message".into(),
            name: "TTS Message".into(),
            cost: 100,
            requires_input: true,
        }],
    };
    kv.put(REDEEMS_KEY, &serde_json::to_string(&redeems).unwrap(), None)
        .await
        .unwrap();
}
