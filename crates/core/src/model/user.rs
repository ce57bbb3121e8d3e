use serde::{Deserialize, Serialize};

use crate::model::ids::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default)]
    pub provinsi: String,
    #[serde(default)]
    pub kabupaten_kota: String,
    #[serde(default)]
    pub kecamatan: String,
    #[serde(default)]
    pub jalan: String,
}

/// Profile of the signed-in learner, as returned by the auth endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, alias = "_id")]
    pub id: Option<UserId>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub karang_taruna_name: Option<String>,
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub skill_level: Option<String>,
    #[serde(default, alias = "peranAnggota")]
    pub role: Option<String>,
}

impl UserProfile {
    /// Name used in greetings: the full name, else the username.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.username
        } else {
            &self.name
        }
    }
}
