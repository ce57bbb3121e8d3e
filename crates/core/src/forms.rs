//! Sign-in and sign-up form validation.
//!
//! Validation runs before any network call; every failing field gets an
//! inline message in the app's language.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

pub const MIN_PASSWORD_LEN: usize = 6;

/// Field-keyed validation messages, in the order the form shows the fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    entries: Vec<(&'static str, String)>,
}

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-field error, used when the backend rejects a submitted form.
    #[must_use]
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.insert(field, message);
        errors
    }

    /// Records a message for `field`; the first message for a field wins.
    pub fn insert(&mut self, field: &'static str, message: impl Into<String>) {
        if self.get(field).is_none() {
            self.entries.push((field, message.into()));
        }
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, message)| message.as_str())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.entries.iter().map(|(field, msg)| (*field, msg.as_str()))
    }

    fn into_result<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, message) in self.iter() {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}

static EMAIL_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\S+@\S+\.\S+").expect("email pattern should compile"));

/// Loose `something@something.something` check. The pattern is unanchored,
/// so any matching substring is enough.
#[must_use]
pub fn looks_like_email(raw: &str) -> bool {
    EMAIL_SHAPE.is_match(raw)
}

//
// ─── LOGIN ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Default)]
pub struct LoginDraft {
    pub email: String,
    pub password: String,
}

/// Credentials that passed client-side validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginDraft {
    /// # Errors
    ///
    /// Returns `FieldErrors` when the email or password is missing.
    pub fn validate(self) -> Result<LoginForm, FieldErrors> {
        let mut errors = FieldErrors::new();
        let email = self.email.trim().to_owned();
        if email.is_empty() {
            errors.insert("email", "Email wajib diisi");
        }
        if self.password.is_empty() {
            errors.insert("password", "Password wajib diisi");
        }
        errors.into_result(LoginForm {
            email,
            password: self.password,
        })
    }
}

//
// ─── REGISTRATION ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Default)]
pub struct RegistrationDraft {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub karang_taruna_name: String,
    pub provinsi: String,
    pub kabupaten_kota: String,
    pub kecamatan: String,
    pub jalan: String,
    pub phone: String,
    pub interests: Vec<String>,
    pub skill_level: String,
    pub peran_anggota: String,
}

/// Registration payload that passed client-side validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub karang_taruna_name: String,
    pub provinsi: String,
    pub kabupaten_kota: String,
    pub kecamatan: String,
    pub jalan: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub interests: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peran_anggota: Option<String>,
}

fn required(errors: &mut FieldErrors, field: &'static str, value: &str, message: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.insert(field, message);
    }
    trimmed.to_owned()
}

fn optional(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

impl RegistrationDraft {
    /// # Errors
    ///
    /// Returns `FieldErrors` with one message per invalid field.
    pub fn validate(self) -> Result<Registration, FieldErrors> {
        let mut errors = FieldErrors::new();

        let name = required(&mut errors, "name", &self.name, "Nama lengkap wajib diisi");
        let username = required(&mut errors, "username", &self.username, "Username wajib diisi");
        let email = required(&mut errors, "email", &self.email, "Email wajib diisi");
        if !email.is_empty() && !looks_like_email(&email) {
            errors.insert("email", "Format email tidak valid");
        }

        if self.password.is_empty() {
            errors.insert("password", "Password wajib diisi");
        } else if self.password.chars().count() < MIN_PASSWORD_LEN {
            errors.insert("password", "Password minimal 6 karakter");
        }
        if self.password != self.confirm_password {
            errors.insert("confirmPassword", "Password tidak sama");
        }

        let karang_taruna_name = required(
            &mut errors,
            "karangTarunaName",
            &self.karang_taruna_name,
            "Nama karang taruna wajib diisi",
        );
        let provinsi = required(&mut errors, "provinsi", &self.provinsi, "Provinsi wajib diisi");
        let kabupaten_kota = required(
            &mut errors,
            "kabupatenKota",
            &self.kabupaten_kota,
            "Kabupaten/Kota wajib diisi",
        );
        let kecamatan = required(&mut errors, "kecamatan", &self.kecamatan, "Kecamatan wajib diisi");
        let jalan = required(&mut errors, "jalan", &self.jalan, "Jalan wajib diisi");

        let mut interests: Vec<String> = Vec::with_capacity(self.interests.len());
        for interest in self.interests {
            let interest = interest.trim().to_owned();
            if !interest.is_empty() && !interests.contains(&interest) {
                interests.push(interest);
            }
        }

        errors.into_result(Registration {
            name,
            username,
            email,
            password: self.password,
            karang_taruna_name,
            provinsi,
            kabupaten_kota,
            kecamatan,
            jalan,
            phone: optional(self.phone),
            interests,
            skill_level: optional(self.skill_level),
            peran_anggota: optional(self.peran_anggota),
        })
    }
}
