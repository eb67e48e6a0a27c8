use crate::{ClientError, SettingsClient};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

/// A settings entry with its value type and the value used when it is unset.
pub struct SettingKey<T> {
    pub name: &'static str,
    pub default: T,
}

pub const COMPACT_EPISODES: SettingKey<bool> = SettingKey {
    name: "compactEpisodes",
    default: false,
};

pub const EPISODES_DESCENDING_ORDER: SettingKey<bool> = SettingKey {
    name: "episodesDescendingOrder",
    default: true,
};

pub const SEARCHED_ITEMS: SettingKey<Vec<String>> = SettingKey {
    name: "searchedItems",
    default: Vec::new(),
};

/// Typed access on top of any [`SettingsClient`].
pub trait SettingsExt {
    /// Reads `key`, falling back to its default when unset or unreadable.
    fn load<T: DeserializeOwned + Clone>(&self, key: &SettingKey<T>) -> T;

    fn store<T: Serialize>(&self, key: &SettingKey<T>, value: &T) -> Result<(), ClientError>;
}

impl<C: SettingsClient + ?Sized> SettingsExt for C {
    fn load<T: DeserializeOwned + Clone>(&self, key: &SettingKey<T>) -> T {
        let Some(value) = self.get(key.name) else {
            return key.default.clone();
        };
        match serde_json::from_value(value) {
            Ok(value) => value,
            Err(error) => {
                debug!(key = key.name, %error, "unreadable setting, using default");
                key.default.clone()
            }
        }
    }

    fn store<T: Serialize>(&self, key: &SettingKey<T>, value: &T) -> Result<(), ClientError> {
        self.set(key.name, serde_json::to_value(value)?)
    }
}
