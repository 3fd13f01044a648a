//! Display colours — named colour roles with defaults and per-key overrides.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Named colour roles the renderer paints with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ColorRole {
    Date,
    Channel,
    User,
    Text,
    DateSep,
    DateSepBack,
    Background,
}

impl ColorRole {
    pub const ALL: [ColorRole; 7] = [
        ColorRole::Date,
        ColorRole::Channel,
        ColorRole::User,
        ColorRole::Text,
        ColorRole::DateSep,
        ColorRole::DateSepBack,
        ColorRole::Background,
    ];

    /// Wire name of the role in `/state` responses.
    pub fn key(self) -> &'static str {
        match self {
            ColorRole::Date => "date",
            ColorRole::Channel => "channel",
            ColorRole::User => "user",
            ColorRole::Text => "text",
            ColorRole::DateSep => "dateSep",
            ColorRole::DateSepBack => "dateSepBack",
            ColorRole::Background => "background",
        }
    }

    /// Case-insensitive lookup; `_` and `-` are ignored so `date_sep`,
    /// `datesep` and `dateSep` all resolve to the same role.
    pub fn from_key(key: &str) -> Option<Self> {
        let normalized: String = key
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        ColorRole::ALL
            .into_iter()
            .find(|role| role.key().eq_ignore_ascii_case(&normalized))
    }
}

/// The full colour set used for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayConfig {
    pub date: String,
    pub channel: String,
    pub user: String,
    pub text: String,
    pub date_sep: String,
    pub date_sep_back: String,
    pub background: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            date: "#999".into(),
            channel: "#000".into(),
            user: "#000".into(),
            text: "#000".into(),
            date_sep: "#fff".into(),
            date_sep_back: "#608081".into(),
            background: "#fff".into(),
        }
    }
}

impl DisplayConfig {
    pub fn get(&self, role: ColorRole) -> &str {
        match role {
            ColorRole::Date => &self.date,
            ColorRole::Channel => &self.channel,
            ColorRole::User => &self.user,
            ColorRole::Text => &self.text,
            ColorRole::DateSep => &self.date_sep,
            ColorRole::DateSepBack => &self.date_sep_back,
            ColorRole::Background => &self.background,
        }
    }

    fn slot(&mut self, role: ColorRole) -> &mut String {
        match role {
            ColorRole::Date => &mut self.date,
            ColorRole::Channel => &mut self.channel,
            ColorRole::User => &mut self.user,
            ColorRole::Text => &mut self.text,
            ColorRole::DateSep => &mut self.date_sep,
            ColorRole::DateSepBack => &mut self.date_sep_back,
            ColorRole::Background => &mut self.background,
        }
    }

    /// Shallow merge: every role present in `overrides` wins, the rest stay.
    pub fn merge(&mut self, overrides: &DisplayOverrides) {
        for (role, color) in overrides.iter() {
            *self.slot(role) = color.to_string();
        }
    }

    pub fn merged(&self, overrides: &DisplayOverrides) -> Self {
        let mut out = self.clone();
        out.merge(overrides);
        out
    }
}

/// A partial set of colour roles, as returned by `/state`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayOverrides {
    colors: BTreeMap<ColorRole, String>,
}

impl DisplayOverrides {
    /// Empty colours are ignored.
    pub fn insert(&mut self, role: ColorRole, color: impl Into<String>) {
        let color = color.into();
        if !color.trim().is_empty() {
            self.colors.insert(role, color.trim().to_string());
        }
    }

    pub fn get(&self, role: ColorRole) -> Option<&str> {
        self.colors.get(&role).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ColorRole, &str)> {
        self.colors.iter().map(|(role, color)| (*role, color.as_str()))
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Parse a `role:colour[,role:colour...]` spec such as
    /// `date:#999,dateSepBack:#608081`. Fields and colours are trimmed and
    /// lower-cased; pairs that are malformed or name an unknown role are skipped.
    pub fn parse_spec(spec: &str) -> Self {
        let mut out = Self::default();
        for pair in spec.split(',') {
            let parts: Vec<&str> = pair.split(':').collect();
            if parts.len() != 2 {
                continue;
            }
            let field = parts[0].trim().to_lowercase();
            let color = parts[1].trim().to_lowercase();
            if field.is_empty() || color.is_empty() {
                continue;
            }
            if let Some(role) = ColorRole::from_key(&field) {
                out.insert(role, color);
            }
        }
        out
    }
}

impl<'de> Deserialize<'de> for DisplayOverrides {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
        let mut out = Self::default();
        // Aliases first, so an exact wire key always has the last word
        let (exact, aliases): (Vec<_>, Vec<_>) = raw
            .iter()
            .filter_map(|(key, value)| Some((key, ColorRole::from_key(key)?, value.as_str()?)))
            .partition(|(key, role, _)| key.as_str() == role.key());
        for (_, role, color) in aliases.into_iter().chain(exact) {
            out.insert(role, color);
        }
        Ok(out)
    }
}
