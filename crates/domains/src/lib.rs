//! crates/domains/src/lib.rs
//!
//! The central domain models and interface definitions for the Emberhall
//! backend.

pub mod error;
pub mod models;
pub mod traits;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use traits::*;

#[cfg(test)]
mod tests {
    use super::models::*;
    use uuid::Uuid;

    #[test]
    fn platform_round_trips_through_wire_names() {
        for p in [Platform::Twitch, Platform::Youtube, Platform::Ember] {
            assert_eq!(p.as_str().parse::<Platform>().unwrap(), p);
        }
        assert!("discord".parse::<Platform>().is_err());
    }

    #[test]
    fn legacy_profile_maps_camel_case_fields() {
        let raw = r#"{
            "displayName": "Sable",
            "points": 500,
            "inventory": ["halo_cinder"],
            "avatarDecoration": "halo-cinder",
            "bonusSignInGiven": true
        }"#;
        let legacy: LegacyProfile = serde_json::from_str(raw).unwrap();
        let id = Uuid::new_v4();
        let profile = legacy.into_profile(id, "Wanderer");
        assert_eq!(profile.display_name, "Sable");
        assert_eq!(profile.inventory, vec!["halo_cinder".to_string()]);
        assert_eq!(profile.avatar_decoration.as_deref(), Some("halo-cinder"));
        assert!(profile.bonus_sign_in_granted);
        assert!(!profile.bonus_linked_accounts_granted);
        assert_eq!(profile.schema_version, PROFILE_SCHEMA_VERSION);
    }

    #[test]
    fn legacy_userdata_tolerates_missing_fields() {
        let raw = r#"{"users": {"ember:abc": {"points": 42}}}"#;
        let doc: LegacyUserdata = serde_json::from_str(raw).unwrap();
        let entry = &doc.users["ember:abc"];
        assert_eq!(entry.points, 42);
        assert!(entry.inventory.is_empty());
        assert!(entry.display_name.is_none());
    }

    #[test]
    fn moderation_doc_defaults_are_empty() {
        let doc: ModerationDoc = serde_json::from_str("{}").unwrap();
        assert!(doc.mods.is_empty());
        assert!(doc.bans.is_empty());
    }
}
