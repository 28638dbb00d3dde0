//! Named point locations drawn as markers over the climate data.

use crate::{ClimateError, ClimateResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A labelled point in native grid coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedLocation {
    /// Stable identifier; built-in locations without one get a slug of their name
    #[serde(default)]
    pub id: String,
    pub name: String,
    /// Easting in metres
    pub x: f64,
    /// Northing in metres
    pub y: f64,
    #[serde(default)]
    pub category: String,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub is_custom: bool,
}

fn default_visible() -> bool {
    true
}

impl NamedLocation {
    /// Create a user-defined location with a fresh identifier.
    pub fn custom(name: impl Into<String>, x: f64, y: f64, category: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            x,
            y,
            category: category.into(),
            visible: true,
            is_custom: true,
        }
    }

    fn matches(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle) || self.category.to_lowercase().contains(needle)
    }
}

fn slug(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Built-in reference locations plus the user's custom ones.
#[derive(Debug, Clone, Default)]
pub struct LocationSet {
    builtin: Vec<NamedLocation>,
    custom: Vec<NamedLocation>,
}

impl LocationSet {
    pub fn new(builtin: Vec<NamedLocation>, custom: Vec<NamedLocation>) -> Self {
        let builtin = builtin
            .into_iter()
            .map(|mut loc| {
                loc.is_custom = false;
                if loc.id.is_empty() {
                    loc.id = slug(&loc.name);
                }
                loc
            })
            .collect();
        let custom = custom
            .into_iter()
            .map(|mut loc| {
                loc.is_custom = true;
                if loc.id.is_empty() {
                    loc.id = Uuid::new_v4().to_string();
                }
                loc
            })
            .collect();
        Self { builtin, custom }
    }

    /// Built-in locations first, in document order, then custom ones.
    pub fn all(&self) -> impl Iterator<Item = &NamedLocation> {
        self.builtin.iter().chain(self.custom.iter())
    }

    pub fn visible(&self) -> impl Iterator<Item = &NamedLocation> {
        self.all().filter(|loc| loc.visible)
    }

    pub fn custom(&self) -> &[NamedLocation] {
        &self.custom
    }

    pub fn len(&self) -> usize {
        self.builtin.len() + self.custom.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Case-insensitive substring search over name and category.
    /// An empty query returns everything.
    pub fn search(&self, query: &str) -> Vec<&NamedLocation> {
        let needle = query.trim().to_lowercase();
        self.all()
            .filter(|loc| needle.is_empty() || loc.matches(&needle))
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<&NamedLocation> {
        self.all().find(|loc| loc.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut NamedLocation> {
        self.builtin
            .iter_mut()
            .chain(self.custom.iter_mut())
            .find(|loc| loc.id == id)
    }

    /// Set visibility; returns the new state, or `None` for an unknown id.
    pub fn set_visible(&mut self, id: &str, visible: bool) -> Option<bool> {
        let loc = self.get_mut(id)?;
        loc.visible = visible;
        Some(visible)
    }

    pub fn toggle_visible(&mut self, id: &str) -> Option<bool> {
        let loc = self.get_mut(id)?;
        loc.visible = !loc.visible;
        Some(loc.visible)
    }

    pub fn add_custom(&mut self, location: NamedLocation) -> ClimateResult<&NamedLocation> {
        if location.name.trim().is_empty() {
            return Err(ClimateError::invalid_parameter("name", "location name is empty"));
        }
        if !location.x.is_finite() || !location.y.is_finite() {
            return Err(ClimateError::invalid_parameter(
                "x,y",
                "location coordinates must be finite",
            ));
        }
        let mut location = location;
        location.is_custom = true;
        if location.id.is_empty() {
            location.id = Uuid::new_v4().to_string();
        }
        self.custom.push(location);
        Ok(&self.custom[self.custom.len() - 1])
    }

    /// Remove a custom location. Built-in locations cannot be removed.
    pub fn remove_custom(&mut self, id: &str) -> ClimateResult<NamedLocation> {
        if self.builtin.iter().any(|loc| loc.id == id) {
            return Err(ClimateError::invalid_parameter(
                "id",
                format!("'{}' is a built-in location", id),
            ));
        }
        let index = self
            .custom
            .iter()
            .position(|loc| loc.id == id)
            .ok_or_else(|| ClimateError::invalid_parameter("id", format!("no location '{}'", id)))?;
        Ok(self.custom.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builtin() -> Vec<NamedLocation> {
        serde_json::from_str(
            r#"[{"name":"Woolhampton","x":457000,"y":166000,"category":"Village"},
                {"name":"Edinburgh","x":325000,"y":673000,"category":"City"}]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_builtin_defaults() {
        let set = LocationSet::new(builtin(), vec![]);
        let wool = set.get("woolhampton").unwrap();
        assert!(wool.visible);
        assert!(!wool.is_custom);
    }

    #[test]
    fn test_search_and_visibility() {
        let mut set = LocationSet::new(builtin(), vec![]);
        assert_eq!(set.search("city").len(), 1);
        assert_eq!(set.search("  ").len(), 2);

        assert_eq!(set.toggle_visible("edinburgh"), Some(false));
        assert_eq!(set.visible().count(), 1);
        assert_eq!(set.set_visible("nowhere", true), None);
    }

    #[test]
    fn test_add_and_remove_custom() {
        let mut set = LocationSet::new(builtin(), vec![]);
        let id = set
            .add_custom(NamedLocation::custom("Garden", 400_000.0, 200_000.0, "Custom"))
            .unwrap()
            .id
            .clone();
        assert_eq!(set.custom().len(), 1);

        assert!(set.remove_custom("woolhampton").is_err());
        assert_eq!(set.remove_custom(&id).unwrap().name, "Garden");
        assert!(set.custom().is_empty());
    }

    #[test]
    fn test_add_rejects_empty_name() {
        let mut set = LocationSet::default();
        assert!(set.add_custom(NamedLocation::custom(" ", 0.0, 0.0, "")).is_err());
    }
}
