//! Room label to display category mapping
//!
//! The map is fully enumerated up front and read-only afterwards. Looking up
//! a label that is not in the map is a configuration error: defaulting it
//! would silently merge unrelated rooms.

use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::types::DisplayCategory;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq)]
pub struct RoomCategories {
    map: BTreeMap<String, DisplayCategory>,
}

impl RoomCategories {
    pub fn new<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map = entries
            .into_iter()
            .map(|(room, category)| (room.into(), DisplayCategory::new(category)))
            .collect();
        Self { map }
    }

    /// Clinic layout: numbered exam and field rooms share a category each
    pub fn clinic_defaults() -> Self {
        let mut entries: Vec<(String, &str)> = Vec::new();
        for i in 1..=12 {
            entries.push((format!("Exam{}", i), "Exam"));
        }
        for i in 1..=5 {
            entries.push((format!("Field{}", i), "Field"));
        }
        for (room, category) in [
            ("IOLMaster", "IOLMaster"),
            ("Lensometer", "Lensometer"),
            ("Admin", "Admin"),
            ("Checkout", "Checkout"),
            ("CheckoutReturn", "Checkout"),
            ("IPW2", "IPW"),
            ("IPW9", "IPW"),
            ("Treatment", "Treatment"),
            ("NoSignal", "NoSignal"),
        ] {
            entries.push((room.to_string(), category));
        }
        Self::new(entries)
    }

    pub fn category(&self, room: &str) -> PipelineResult<&DisplayCategory> {
        self.map
            .get(room)
            .ok_or_else(|| PipelineError::UnmappedRoom { room: room.to_string() })
    }

    /// Fail on the first non-null label missing from the map
    pub fn check_labels<'a, I>(&self, labels: I) -> PipelineResult<()>
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        labels.into_iter().flatten().try_for_each(|room| self.category(room).map(|_| ()))
    }

    /// All distinct categories, sorted
    pub fn categories(&self) -> Vec<&DisplayCategory> {
        let set: BTreeSet<&DisplayCategory> = self.map.values().collect();
        set.into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl Default for RoomCategories {
    fn default() -> Self {
        Self::clinic_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clinic_defaults_group_rooms() {
        let rooms = RoomCategories::clinic_defaults();
        assert_eq!(rooms.category("Exam3").unwrap().as_str(), "Exam");
        assert_eq!(rooms.category("Exam12").unwrap().as_str(), "Exam");
        assert_eq!(rooms.category("CheckoutReturn").unwrap().as_str(), "Checkout");
        assert_eq!(rooms.category("IPW9").unwrap(), rooms.category("IPW2").unwrap());
        assert_eq!(rooms.len(), 26);
    }

    #[test]
    fn test_unknown_room_is_configuration_error() {
        let rooms = RoomCategories::clinic_defaults();
        let err = rooms.category("Cafeteria").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_categories_sorted_and_distinct() {
        let rooms = RoomCategories::new([("B1", "Beta"), ("A1", "Alpha"), ("A2", "Alpha")]);
        let names: Vec<&str> = rooms.categories().iter().map(|c| c.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Beta"]);
    }

    #[test]
    fn test_check_labels_skips_nulls_and_rejects_unknown() {
        let rooms = RoomCategories::clinic_defaults();
        assert!(rooms.check_labels([Some("Exam1"), None, Some("NoSignal")]).is_ok());

        let err = rooms.check_labels([Some("Exam1"), Some("Basement")]).unwrap_err();
        assert!(matches!(err, PipelineError::UnmappedRoom { ref room } if room == "Basement"));
    }
}
