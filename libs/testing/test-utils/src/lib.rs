//! Shared test utilities for domain testing
//!
//! - `TestMongo`: MongoDB container with automatic cleanup (feature: "mongo")
//! - `TestDataBuilder`: Deterministic test data generation (always available)
//! - `assertions`: Custom assertion helpers (always available)
//!
//! # Usage
//!
//! ```rust,no_run
//! use test_utils::{TestDataBuilder, TestMongo};
//!
//! #[tokio::test]
//! async fn my_mongo_test() {
//!     let mongo = TestMongo::new().await;
//!     let builder = TestDataBuilder::from_test_name("my_mongo_test");
//!     let db = mongo.database(&builder.database_name());
//!
//!     let subject = builder.subject();
//!     let product_name = builder.name("product", "main");
//! }
//! ```

use uuid::Uuid;

#[cfg(feature = "mongo")]
mod mongo;

#[cfg(feature = "mongo")]
pub use mongo::TestMongo;

/// Builder for test data with deterministic randomization
///
/// This ensures tests are reproducible by using seeded data.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Create from test name (generates seed from test name hash)
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("test_create_product");
    /// ```
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// Deterministic token subject for this test
    pub fn subject(&self) -> String {
        let bytes = self.seed.to_le_bytes();
        let mut uuid_bytes = [0u8; 16];
        uuid_bytes[..8].copy_from_slice(&bytes);
        uuid_bytes[8..16].copy_from_slice(&bytes);
        Uuid::from_bytes(uuid_bytes).to_string()
    }

    /// Generate a unique name for testing
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::new(7);
    /// assert_eq!(builder.name("product", "main"), "test-product-7-main");
    /// ```
    pub fn name(&self, prefix: &str, suffix: &str) -> String {
        format!("test-{}-{}-{}", prefix, self.seed, suffix)
    }

    /// Database name unique to this test, within MongoDB's length limit
    pub fn database_name(&self) -> String {
        format!("test_{:016x}", self.seed)
    }
}

/// Test assertion helpers
pub mod assertions {
    /// Assert that an optional value is Some
    pub fn assert_some<T>(value: Option<T>, context: &str) -> T {
        value.unwrap_or_else(|| panic!("{}: expected Some, got None", context))
    }

    /// Assert that values are strictly increasing
    pub fn assert_strictly_increasing<T: PartialOrd + std::fmt::Debug>(values: &[T], context: &str) {
        for pair in values.windows(2) {
            assert!(
                pair[0] < pair[1],
                "{}: expected {:?} < {:?}",
                context,
                pair[0],
                pair[1]
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_builder_deterministic() {
        let builder1 = TestDataBuilder::new(42);
        let builder2 = TestDataBuilder::new(42);

        assert_eq!(builder1.subject(), builder2.subject());
        assert_eq!(
            builder1.name("product", "test"),
            builder2.name("product", "test")
        );
    }

    #[test]
    fn test_data_builder_different_names() {
        let builder1 = TestDataBuilder::from_test_name("test1");
        let builder2 = TestDataBuilder::from_test_name("test2");

        assert_ne!(builder1.subject(), builder2.subject());
        assert_ne!(builder1.database_name(), builder2.database_name());
    }

    #[test]
    fn test_database_name_fits_limit() {
        let name = TestDataBuilder::new(u64::MAX).database_name();
        assert_eq!(name.len(), 21);
    }

    #[test]
    fn test_strictly_increasing() {
        assertions::assert_strictly_increasing(&[1, 2, 5], "ints");
    }

    #[test]
    #[should_panic(expected = "ints")]
    fn test_strictly_increasing_panics_on_repeat() {
        assertions::assert_strictly_increasing(&[1, 1], "ints");
    }
}
