// Allow dead code: API response structs have fields for completeness
#![allow(dead_code)]

use serde::{Deserialize, Serialize};

/// A hosted world instance owned by (or shared with) the account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Realm {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub expired: bool,
    #[serde(rename = "activeSlot", default)]
    pub active_slot: Option<u8>,
}

impl Realm {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            owner: None,
            state: None,
            expired: false,
            active_slot: None,
        }
    }

    /// Human-readable label used in prompts and error messages
    pub fn label(&self) -> String {
        if self.name.is_empty() {
            format!("#{}", self.id)
        } else {
            format!("{} (#{})", self.name, self.id)
        }
    }

    pub fn display_state(&self) -> &str {
        if self.expired {
            "EXPIRED"
        } else {
            self.state.as_deref().unwrap_or("UNKNOWN")
        }
    }
}

/// Response from the realms world listing endpoint
#[derive(Debug, Deserialize)]
pub struct RealmsResponse {
    #[serde(default)]
    pub servers: Vec<Realm>,
}

/// Response from the backup download endpoint
#[derive(Debug, Deserialize)]
pub struct BackupDownload {
    #[serde(rename = "downloadLink")]
    pub download_link: Option<String>,
    #[serde(rename = "resourcePackUrl")]
    pub resource_pack_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AuthResponse {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "selectedProfile")]
    pub selected_profile: Option<GameProfile>,
}

#[derive(Debug, Deserialize)]
pub struct GameProfile {
    pub id: String,
    pub name: String,
}

/// Error body returned by the authentication service
#[derive(Debug, Deserialize)]
pub struct AuthErrorBody {
    pub error: Option<String>,
    #[serde(rename = "errorMessage")]
    pub error_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_realms_response() {
        let json = r#"{"servers":[{
            "id":1234567,"remoteSubscriptionId":"aaaa","owner":"Alice","ownerUUID":"0123",
            "name":"MyWorld","motd":"hi","state":"OPEN","daysLeft":20,"expired":false,
            "expiredTrial":false,"worldType":"NORMAL","players":null,"maxPlayers":10,
            "minigameName":null,"minigameId":null,"minigameImage":null,"activeSlot":1,
            "slots":null,"member":false
        }]}"#;

        let resp: RealmsResponse =
            serde_json::from_str(json).expect("Failed to parse realms test JSON");
        assert_eq!(resp.servers.len(), 1);

        let realm = &resp.servers[0];
        assert_eq!(realm.id, 1234567);
        assert_eq!(realm.name, "MyWorld");
        assert_eq!(realm.owner.as_deref(), Some("Alice"));
        assert_eq!(realm.active_slot, Some(1));
        assert_eq!(realm.display_state(), "OPEN");
    }

    #[test]
    fn test_parse_empty_listing() {
        let resp: RealmsResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.servers.is_empty());
    }

    #[test]
    fn test_parse_auth_response_without_profile() {
        let json = r#"{"accessToken":"tok","clientToken":"ct","availableProfiles":[]}"#;
        let resp: AuthResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.access_token, "tok");
        assert!(resp.selected_profile.is_none());
    }

    #[test]
    fn test_label() {
        assert_eq!(Realm::new(7, "MyWorld").label(), "MyWorld (#7)");
        assert_eq!(Realm::new(7, "").label(), "#7");
    }
}
