// 👤 Session & preferences
//
// The "login" only picks whose view this is (default payer, "(Me)" markers).
// It is not a security boundary: every person's password is derived from
// their name. The session is passed explicitly to whatever needs it.

use crate::error::{Result, SplitError};
use crate::store::KeyValueStore;
use log::warn;
use serde::{Deserialize, Serialize};

pub const CURRENT_USER_KEY: &str = "expense_current_user";
pub const LOGGED_IN_KEY: &str = "expense_is_logged_in";
pub const THEME_KEY: &str = "expense_theme";

/// Password that unlocks `name`'s view
pub fn password_for(name: &str) -> String {
    format!("{}@07", name)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    current_user: Option<String>,
}

impl Session {
    pub fn current_user(&self) -> Option<&str> {
        self.current_user.as_deref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.current_user.is_some()
    }

    pub fn is_current(&self, name: &str) -> bool {
        self.current_user() == Some(name)
    }

    pub fn login(&mut self, people: &[String], name: &str, password: &str) -> Result<()> {
        if !people.iter().any(|p| p == name) {
            return Err(SplitError::UnknownPerson(name.to_string()));
        }
        if password != password_for(name) {
            return Err(SplitError::LoginRejected(name.to_string()));
        }

        self.current_user = Some(name.to_string());
        Ok(())
    }

    pub fn logout(&mut self) {
        self.current_user = None;
    }

    /// Removing the logged-in person logs them out
    pub fn on_person_removed(&mut self, name: &str) {
        if self.is_current(name) {
            self.logout();
        }
    }

    /// Renaming the logged-in person keeps them logged in under the new name
    pub fn on_person_renamed(&mut self, old: &str, new: &str) {
        if self.is_current(old) {
            self.current_user = Some(new.to_string());
        }
    }

    // ========================================================================
    // PERSISTENCE
    // ========================================================================

    /// Markers are cosmetic: anything unreadable means logged out
    pub fn load(store: &dyn KeyValueStore) -> anyhow::Result<Self> {
        let logged_in = store.get(LOGGED_IN_KEY)?.as_deref() == Some("true");
        if !logged_in {
            return Ok(Session::default());
        }

        let current_user = store
            .get(CURRENT_USER_KEY)?
            .filter(|name| !name.trim().is_empty());

        Ok(Session { current_user })
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) -> anyhow::Result<()> {
        match &self.current_user {
            Some(name) => {
                store.set(CURRENT_USER_KEY, name)?;
                store.set(LOGGED_IN_KEY, "true")?;
            }
            None => {
                store.remove(CURRENT_USER_KEY)?;
                store.set(LOGGED_IN_KEY, "false")?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn load(store: &dyn KeyValueStore) -> anyhow::Result<Self> {
        Ok(match store.get(THEME_KEY)?.as_deref() {
            Some("dark") => Theme::Dark,
            Some("light") | None => Theme::Light,
            Some(other) => {
                warn!("Unknown theme '{}', using light", other);
                Theme::Light
            }
        })
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) -> anyhow::Result<()> {
        store.set(THEME_KEY, self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn people() -> Vec<String> {
        vec!["Pranjal".to_string(), "Vishal".to_string()]
    }

    #[test]
    fn test_login_with_derived_password() {
        let mut session = Session::default();
        assert!(!session.is_logged_in());

        assert_eq!(
            session.login(&people(), "Vishal", "wrong"),
            Err(SplitError::LoginRejected("Vishal".to_string()))
        );
        assert!(!session.is_logged_in());

        session.login(&people(), "Vishal", "Vishal@07").unwrap();
        assert_eq!(session.current_user(), Some("Vishal"));
        assert!(session.is_current("Vishal"));
    }

    #[test]
    fn test_login_unknown_person() {
        let mut session = Session::default();
        assert_eq!(
            session.login(&people(), "Zed", "Zed@07"),
            Err(SplitError::UnknownPerson("Zed".to_string()))
        );
    }

    #[test]
    fn test_roster_changes_follow_session() {
        let mut session = Session::default();
        session.login(&people(), "Pranjal", "Pranjal@07").unwrap();

        session.on_person_removed("Vishal");
        assert_eq!(session.current_user(), Some("Pranjal"));

        session.on_person_renamed("Pranjal", "Pranjal K.");
        assert_eq!(session.current_user(), Some("Pranjal K."));

        session.on_person_removed("Pranjal K.");
        assert!(!session.is_logged_in());
    }

    #[test]
    fn test_session_persistence() {
        let mut store = MemoryStore::new();
        assert_eq!(Session::load(&store).unwrap(), Session::default());

        let mut session = Session::default();
        session.login(&people(), "Pranjal", "Pranjal@07").unwrap();
        session.save(&mut store).unwrap();
        assert_eq!(store.get(LOGGED_IN_KEY).unwrap().as_deref(), Some("true"));
        assert_eq!(Session::load(&store).unwrap(), session);

        session.logout();
        session.save(&mut store).unwrap();
        assert_eq!(store.get(CURRENT_USER_KEY).unwrap(), None);
        assert_eq!(store.get(LOGGED_IN_KEY).unwrap().as_deref(), Some("false"));
        assert!(!Session::load(&store).unwrap().is_logged_in());
    }

    #[test]
    fn test_logged_in_flag_without_user_is_logged_out() {
        let mut store = MemoryStore::new();
        store.set(LOGGED_IN_KEY, "true").unwrap();
        assert!(!Session::load(&store).unwrap().is_logged_in());
    }

    #[test]
    fn test_theme_persistence() {
        let mut store = MemoryStore::new();
        assert_eq!(Theme::load(&store).unwrap(), Theme::Light);

        Theme::Dark.save(&mut store).unwrap();
        assert_eq!(Theme::load(&store).unwrap(), Theme::Dark);
        assert_eq!(Theme::Dark.toggled(), Theme::Light);

        store.set(THEME_KEY, "sepia").unwrap();
        assert_eq!(Theme::load(&store).unwrap(), Theme::Light);
    }
}
