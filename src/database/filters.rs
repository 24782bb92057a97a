use std::collections::HashMap;

use super::{error::ValidationErrors, schema::Id};
use crate::error::Error;

pub type QueryParams = HashMap<String, String>;

/// `?tags=1,2&ingredients=3`: a recipe matches when it carries any of the
/// listed tags and any of the listed ingredients.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub tags: Option<Vec<Id>>,
    pub ingredients: Option<Vec<Id>>,
}

impl RecipeFilter {
    pub fn from_query(params: &QueryParams) -> Result<Self, Error> {
        let mut errors = ValidationErrors::new();
        let mut read = |key: &str| match params.get(key).map(|value| parse_id_list(value)) {
            Some(Ok(ids)) if ids.is_empty() => None,
            Some(Ok(ids)) => Some(ids),
            Some(Err(_)) => {
                errors.add(key, "Expected a comma-separated list of ids.");
                None
            }
            None => None,
        };

        let filter = Self {
            tags: read("tags"),
            ingredients: read("ingredients"),
        };

        errors.into_result()?;
        Ok(filter)
    }

    pub fn matches(&self, tags: &[Id], ingredients: &[Id]) -> bool {
        let any_of = |wanted: &Option<Vec<Id>>, present: &[Id]| match wanted {
            Some(wanted) => wanted.iter().any(|id| present.contains(id)),
            None => true,
        };

        any_of(&self.tags, tags) && any_of(&self.ingredients, ingredients)
    }
}

/// `?assigned_only=1` keeps only entries used by at least one recipe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttributeFilter {
    pub assigned_only: bool,
}

impl AttributeFilter {
    pub fn from_query(params: &QueryParams) -> Result<Self, Error> {
        let assigned_only = match params.get("assigned_only").map(|value| value.trim()) {
            None | Some("") => false,
            Some(value) => value
                .parse::<i64>()
                .map(|value| value != 0)
                .map_err(|_| Error::field("assigned_only", "A valid integer is required."))?,
        };

        Ok(Self { assigned_only })
    }
}

/// Parses `"1,2, 3"`. Empty segments are skipped, anything else must be an id.
pub fn parse_id_list(value: &str) -> Result<Vec<Id>, std::num::ParseIntError> {
    let mut ids: Vec<Id> = vec![];

    for segment in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let id = segment.parse::<Id>()?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> QueryParams {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn id_lists_parse_and_deduplicate() {
        assert_eq!(parse_id_list("1,2,3").unwrap(), vec![1, 2, 3]);
        assert_eq!(parse_id_list(" 4 , 4,5,").unwrap(), vec![4, 5]);
        assert!(parse_id_list("").unwrap().is_empty());
        assert!(parse_id_list("1,x").is_err());
    }

    #[test]
    fn recipe_filter_reads_both_lists() {
        let filter =
            RecipeFilter::from_query(&params(&[("tags", "1,2"), ("ingredients", "7")])).unwrap();

        assert_eq!(filter.tags, Some(vec![1, 2]));
        assert_eq!(filter.ingredients, Some(vec![7]));
    }

    #[test]
    fn empty_lists_do_not_filter() {
        let filter = RecipeFilter::from_query(&params(&[("tags", "")])).unwrap();
        assert_eq!(filter, RecipeFilter::default());
    }

    #[test]
    fn malformed_lists_are_field_errors() {
        let error = RecipeFilter::from_query(&params(&[("ingredients", "a,b")])).unwrap_err();
        let body = serde_json::to_value(&error.body).unwrap();

        assert!(body.get("ingredients").is_some());
        assert!(body.get("tags").is_none());
    }

    #[test]
    fn matching_needs_one_hit_per_list() {
        let filter = RecipeFilter {
            tags: Some(vec![1, 2]),
            ingredients: Some(vec![9]),
        };

        assert!(filter.matches(&[2], &[9, 10]));
        assert!(!filter.matches(&[2], &[10]));
        assert!(!filter.matches(&[], &[9]));
        assert!(RecipeFilter::default().matches(&[], &[]));
    }

    #[test]
    fn assigned_only_flag() {
        let on = AttributeFilter::from_query(&params(&[("assigned_only", "1")])).unwrap();
        let off = AttributeFilter::from_query(&params(&[("assigned_only", "0")])).unwrap();
        let absent = AttributeFilter::from_query(&params(&[])).unwrap();

        assert!(on.assigned_only);
        assert!(!off.assigned_only);
        assert!(!absent.assigned_only);
        assert!(AttributeFilter::from_query(&params(&[("assigned_only", "yes")])).is_err());
    }
}
