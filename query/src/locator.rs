use serde::{Deserialize, Serialize};
use storage::catalog::CatalogStore;
use thiserror::Error;
use wayfinder_core::error::{ErrorCode, WayfinderError};
use wayfinder_core::model::Location;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductMatch {
    pub product_id: u64,
    pub product_name: String,
    pub location_id: u64,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LocateError {
    #[error("invalid query: product query must not be empty")]
    EmptyQuery,
    #[error("product '{0}' not found")]
    NotFound(String),
}

impl WayfinderError for LocateError {
    fn error_code(&self) -> ErrorCode {
        match self {
            LocateError::EmptyQuery => ErrorCode::InvalidArgument,
            LocateError::NotFound(_) => ErrorCode::NotFound,
        }
    }
}

/// Case-insensitive substring matching over product names.
pub struct ProductLocator<'a> {
    catalog: &'a CatalogStore,
}

impl<'a> ProductLocator<'a> {
    pub fn new(catalog: &'a CatalogStore) -> Self {
        Self { catalog }
    }

    /// First product, in storage order, whose name contains the query.
    pub fn locate(&self, query: &str) -> Result<ProductMatch, LocateError> {
        let needle = normalize(query)?;
        self.catalog
            .products()
            .iter()
            .find(|p| p.name.to_lowercase().contains(&needle))
            .map(|p| ProductMatch {
                product_id: p.id,
                product_name: p.name.clone(),
                location_id: p.location_id,
            })
            .ok_or_else(|| LocateError::NotFound(query.trim().to_string()))
    }

    /// Every matching product in storage order; empty when nothing matches.
    pub fn locate_all(&self, query: &str) -> Result<Vec<ProductMatch>, LocateError> {
        let needle = normalize(query)?;
        Ok(self
            .catalog
            .products()
            .iter()
            .filter(|p| p.name.to_lowercase().contains(&needle))
            .map(|p| ProductMatch {
                product_id: p.id,
                product_name: p.name.clone(),
                location_id: p.location_id,
            })
            .collect())
    }

    /// Locations relevant to a free-text question: the location name and the
    /// query contain one another, or the location sells a product whose name
    /// and the query contain one another. Storage order, no duplicates.
    pub fn matching_locations(&self, query: &str) -> Result<Vec<&'a Location>, LocateError> {
        let needle = normalize(query)?;
        let overlaps = |name: &str| {
            let name = name.to_lowercase();
            !name.is_empty() && (name.contains(&needle) || needle.contains(&name))
        };

        Ok(self
            .catalog
            .locations()
            .iter()
            .filter(|location| {
                overlaps(&location.name)
                    || self
                        .catalog
                        .products_at(location.id)
                        .any(|p| overlaps(&p.name))
            })
            .collect())
    }
}

fn normalize(query: &str) -> Result<String, LocateError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(LocateError::EmptyQuery);
    }
    Ok(trimmed.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayfinder_core::model::Product;

    fn catalog() -> CatalogStore {
        CatalogStore::new(
            vec![
                Location::new(0, "Entrance", "Main doors"),
                Location::new(1, "Produce", "Fruit"),
                Location::new(2, "Shoe Line", "Footwear"),
            ],
            vec![
                Product::new(10, "Organic Bananas", "", 1.99, 1),
                Product::new(11, "Banana Bread", "", 3.49, 0),
                Product::new(12, "Running Shoes", "", 59.0, 2),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_locate_is_case_insensitive_substring() {
        let catalog = catalog();
        let locator = ProductLocator::new(&catalog);

        let found = locator.locate("banana").unwrap();
        assert_eq!(found.product_name, "Organic Bananas");
        assert_eq!(found.location_id, 1);

        let found = locator.locate("  ORGANIC bananas ").unwrap();
        assert_eq!(found.product_id, 10);
    }

    #[test]
    fn test_locate_missing_and_empty() {
        let catalog = catalog();
        let locator = ProductLocator::new(&catalog);

        assert_eq!(
            locator.locate("nonexistent item"),
            Err(LocateError::NotFound("nonexistent item".to_string()))
        );
        assert_eq!(locator.locate("   "), Err(LocateError::EmptyQuery));
        assert_eq!(
            LocateError::EmptyQuery.error_code(),
            ErrorCode::InvalidArgument
        );
    }

    #[test]
    fn test_locate_all_keeps_storage_order() {
        let catalog = catalog();
        let locator = ProductLocator::new(&catalog);

        let ids: Vec<u64> = locator
            .locate_all("banana")
            .unwrap()
            .iter()
            .map(|m| m.product_id)
            .collect();
        assert_eq!(ids, vec![10, 11]);
        assert!(locator.locate_all("kiwi").unwrap().is_empty());
    }

    #[test]
    fn test_matching_locations_checks_both_directions() {
        let catalog = catalog();
        let locator = ProductLocator::new(&catalog);

        let names = |q: &str| -> Vec<String> {
            locator
                .matching_locations(q)
                .unwrap()
                .iter()
                .map(|l| l.name.clone())
                .collect()
        };

        assert_eq!(names("where is the shoe line"), vec!["Shoe Line"]);
        assert_eq!(names("banana"), vec!["Entrance", "Produce"]);
        assert_eq!(names("produce"), vec!["Produce"]);
        assert!(names("garden hose").is_empty());
    }
}
