//! Seeds a fresh database with a starter store catalog, redeem list, and
//! word lists. Run once against the configured database url.

use domains::{ItemType, KvStore, RedeemList, RedeemOption, StoreCatalog, StoreItem};
use services::automod::FLAGGED_WORDS_KEY;
use services::storefront::{REDEEMS_KEY, STORE_CATALOG_KEY};
use storage_adapters::sqlite::SqliteKvStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();
    let cfg = configs::AppConfig::load()?;
    let kv = SqliteKvStore::connect(&cfg.database.url).await?;

    let catalog = StoreCatalog {
        items: vec![
            StoreItem {
                id: "halo_cinder".into(),
                name: "Cinder Halo".into(),
                cost: 600,
                item_type: ItemType::AvatarDecoration,
                css_class: "halo-cinder".into(),
                requires_input: false,
            },
            StoreItem {
                id: "halo_frost".into(),
                name: "Frost Halo".into(),
                cost: 600,
                item_type: ItemType::AvatarDecoration,
                css_class: "halo-frost".into(),
                requires_input: false,
            },
            StoreItem {
                id: "trail_embers".into(),
                name: "Ember Trail".into(),
                cost: 400,
                item_type: ItemType::MessageDecoration,
                css_class: "trail-embers".into(),
                requires_input: false,
            },
        ],
    };
    kv.put(STORE_CATALOG_KEY, &serde_json::to_string(&catalog)?, None).await?;

    let redeems = RedeemList {
        options: vec![
            RedeemOption {
                id: "tts_message".into(),
                name: "TTS Message".into(),
                cost: 100,
                requires_input: true,
            },
            RedeemOption {
                id: "spooky_sound".into(),
                name: "Spooky Sound".into(),
                cost: 50,
                requires_input: false,
            },
        ],
    };
    kv.put(REDEEMS_KEY, &serde_json::to_string(&redeems)?, None).await?;

    // Operators maintain the banned list themselves; ship only the meme
    // list as a starting point.
    kv.put(FLAGGED_WORDS_KEY, "skibidi\nrizz\ngyatt", None).await?;

    tracing::info!("seeded store catalog, redeems, and word lists");
    Ok(())
}
