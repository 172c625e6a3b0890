//! # Storefront
//!
//! The cosmetic store and redeems, built on the ledger. Ownership is
//! checked before any charge; all spends go through the atomic conditional
//! debit. The storefront never mutates balances itself.

use std::sync::Arc;

use domains::{
    DomainError, EventType, ItemType, KvStore, RedeemList, Result, StoreCatalog,
};
use uuid::Uuid;

use crate::accounts::AccountDirectory;
use crate::kvjson::read_json;
use crate::ledger::Ledger;

pub const STORE_CATALOG_KEY: &str = "store_items";
pub const REDEEMS_KEY: &str = "redeems";

/// Reserved pseudo-item ids that clear a decoration slot without an
/// ownership check.
pub const UNEQUIP_AVATAR: &str = "unequip-avatar";
pub const UNEQUIP_MESSAGE: &str = "unequip-message";

#[derive(Debug, Clone)]
pub struct PurchaseReceipt {
    pub item_id: String,
    pub balance: i64,
    pub inventory: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct EquipOutcome {
    pub slot: ItemType,
    /// The payload now active in the slot; `None` after an unequip.
    pub equipped: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RedeemReceipt {
    pub redeem_id: String,
    pub cost: i64,
    pub balance: i64,
}

pub struct Storefront {
    kv: Arc<dyn KvStore>,
    ledger: Arc<Ledger>,
    accounts: Arc<AccountDirectory>,
}

impl Storefront {
    pub fn new(kv: Arc<dyn KvStore>, ledger: Arc<Ledger>, accounts: Arc<AccountDirectory>) -> Self {
        Self { kv, ledger, accounts }
    }

    pub async fn catalog(&self) -> Result<StoreCatalog> {
        Ok(read_json(&*self.kv, STORE_CATALOG_KEY).await?.unwrap_or_default())
    }

    pub async fn redeem_options(&self) -> Result<RedeemList> {
        Ok(read_json(&*self.kv, REDEEMS_KEY).await?.unwrap_or_default())
    }

    /// Buys a catalog item. The ownership pre-check re-reads the profile
    /// immediately before the debit; the debit itself is the atomic step.
    pub async fn purchase(&self, account_id: Uuid, item_id: &str) -> Result<PurchaseReceipt> {
        let catalog = self.catalog().await?;
        let item = catalog
            .items
            .iter()
            .find(|item| item.id == item_id)
            .ok_or_else(|| DomainError::NotFound("store item", item_id.to_string()))?;

        let mut profile = self.accounts.load_profile(account_id, None).await?;
        if profile.inventory.iter().any(|owned| owned == item_id) {
            return Err(DomainError::AlreadyOwned(item_id.to_string()));
        }

        let balance = self
            .ledger
            .debit_if_affordable(
                account_id,
                item.cost,
                EventType::Purchase,
                Some("store_purchase"),
                Some(item_id),
            )
            .await?;

        profile.inventory.push(item_id.to_string());
        self.accounts.save_profile(&profile).await?;
        Ok(PurchaseReceipt {
            item_id: item_id.to_string(),
            balance,
            inventory: profile.inventory,
        })
    }

    /// Equips an owned item into its declared slot, or clears a slot via
    /// the reserved unequip ids. Setting overwrites, never appends.
    pub async fn equip(&self, account_id: Uuid, item_id: &str) -> Result<EquipOutcome> {
        let mut profile = self.accounts.load_profile(account_id, None).await?;

        if item_id == UNEQUIP_AVATAR {
            profile.avatar_decoration = None;
            self.accounts.save_profile(&profile).await?;
            return Ok(EquipOutcome { slot: ItemType::AvatarDecoration, equipped: None });
        }
        if item_id == UNEQUIP_MESSAGE {
            profile.message_decoration = None;
            self.accounts.save_profile(&profile).await?;
            return Ok(EquipOutcome { slot: ItemType::MessageDecoration, equipped: None });
        }

        if !profile.inventory.iter().any(|owned| owned == item_id) {
            return Err(DomainError::Forbidden(format!("item not owned: {item_id}")));
        }
        let catalog = self.catalog().await?;
        let item = catalog
            .items
            .iter()
            .find(|item| item.id == item_id)
            .ok_or_else(|| DomainError::NotFound("store item", item_id.to_string()))?;

        let payload = item.css_class.clone();
        match item.item_type {
            ItemType::AvatarDecoration => profile.avatar_decoration = Some(payload.clone()),
            ItemType::MessageDecoration => profile.message_decoration = Some(payload.clone()),
        }
        self.accounts.save_profile(&profile).await?;
        Ok(EquipOutcome { slot: item.item_type, equipped: Some(payload) })
    }

    /// Charges a priced redeem through the atomic debit.
    pub async fn redeem(&self, account_id: Uuid, redeem_id: &str) -> Result<RedeemReceipt> {
        let options = self.redeem_options().await?;
        let option = options
            .options
            .iter()
            .find(|option| option.id == redeem_id)
            .ok_or_else(|| DomainError::NotFound("redeem", redeem_id.to_string()))?;

        let balance = self
            .ledger
            .debit_if_affordable(account_id, option.cost, EventType::Redeem, Some("redeem"), Some(redeem_id))
            .await?;
        Ok(RedeemReceipt { redeem_id: redeem_id.to_string(), cost: option.cost, balance })
    }
}
