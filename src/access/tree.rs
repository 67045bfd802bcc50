//! Category lookup table and the ancestor walk shared by both unlock flows.

use std::collections::HashMap;
use tracing::warn;

use crate::store::{Category, CategoryId, CategoryStore, StoreError};

/// Outcome of walking up a category chain looking for a password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainMatch {
    /// `ancestor` carries the submitted password. `recorded` holds the parent
    /// pointer followed at every unprotected node on the way.
    Matched {
        ancestor: CategoryId,
        recorded: Vec<CategoryId>,
    },
    /// The nearest protected ancestor has a different password.
    Mismatch { ancestor: CategoryId },
    /// The chain left the known category set (root reached or dangling parent).
    DeadLink { missing: CategoryId },
}

/// All categories keyed by id, loaded once per call.
#[derive(Debug, Clone, Default)]
pub struct CategoryTree {
    categories: HashMap<CategoryId, Category>,
}

impl CategoryTree {
    /// Load every category from the store.
    ///
    /// # Errors
    ///
    /// Returns the store error unchanged.
    pub async fn load(store: &dyn CategoryStore) -> Result<Self, StoreError> {
        Ok(Self::from_categories(store.list_all().await?))
    }

    #[must_use]
    pub fn from_categories(categories: impl IntoIterator<Item = Category>) -> Self {
        Self {
            categories: categories.into_iter().map(|c| (c.id, c)).collect(),
        }
    }

    #[must_use]
    pub fn get(&self, id: CategoryId) -> Option<&Category> {
        self.categories.get(&id)
    }

    #[must_use]
    pub fn as_map(&self) -> &HashMap<CategoryId, Category> {
        &self.categories
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Walk from `start` toward the root until a category with a password is
    /// found, then compare it with `password`.
    ///
    /// Unprotected nodes are skipped. The walk is bounded by the number of
    /// known categories, so a corrupted (cyclic) parent chain ends as a dead
    /// link instead of spinning.
    #[must_use]
    pub fn walk_ancestors(&self, start: CategoryId, password: &str) -> ChainMatch {
        let mut current = start;
        let mut recorded = Vec::new();

        for _ in 0..=self.categories.len() {
            let Some(category) = self.categories.get(&current) else {
                return ChainMatch::DeadLink { missing: current };
            };

            if !category.has_password() {
                current = category.parent_id;
                recorded.push(current);
                continue;
            }

            if category.password == password {
                return ChainMatch::Matched {
                    ancestor: category.id,
                    recorded,
                };
            }

            return ChainMatch::Mismatch {
                ancestor: category.id,
            };
        }

        warn!(start, "Category parent chain does not terminate");
        ChainMatch::DeadLink { missing: current }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn tree() -> CategoryTree {
        // 1 (root, "top") <- 2 ("") <- 3 ("") ; 4 (root, "") ; 5 -> 42 (dangling)
        CategoryTree::from_categories([
            Category::new(1, "top").with_password("top"),
            Category::new(2, "mid").with_parent(1),
            Category::new(3, "leaf").with_parent(2),
            Category::new(4, "open"),
            Category::new(5, "orphan").with_parent(42),
        ])
    }

    #[test]
    fn match_on_first_protected_node() {
        assert_eq!(
            tree().walk_ancestors(1, "top"),
            ChainMatch::Matched {
                ancestor: 1,
                recorded: vec![]
            }
        );
    }

    #[test]
    fn unprotected_nodes_record_their_parent_pointer() {
        assert_eq!(
            tree().walk_ancestors(3, "top"),
            ChainMatch::Matched {
                ancestor: 1,
                recorded: vec![2, 1]
            }
        );
    }

    #[test]
    fn nearest_protected_ancestor_decides() {
        assert_eq!(
            tree().walk_ancestors(3, "nope"),
            ChainMatch::Mismatch { ancestor: 1 }
        );
    }

    #[test]
    fn root_without_password_is_a_dead_link() {
        assert_eq!(
            tree().walk_ancestors(4, "anything"),
            ChainMatch::DeadLink { missing: 0 }
        );
        assert_eq!(
            tree().walk_ancestors(5, "anything"),
            ChainMatch::DeadLink { missing: 42 }
        );
        assert_eq!(
            tree().walk_ancestors(0, "anything"),
            ChainMatch::DeadLink { missing: 0 }
        );
    }

    #[test]
    fn cyclic_chain_terminates() {
        let tree = CategoryTree::from_categories([
            Category::new(1, "a").with_parent(2),
            Category::new(2, "b").with_parent(1),
        ]);
        assert!(matches!(
            tree.walk_ancestors(1, "x"),
            ChainMatch::DeadLink { .. }
        ));
    }

    #[tokio::test]
    async fn load_builds_the_map() -> Result<(), StoreError> {
        let store = MemoryStore::new()
            .with_category(Category::new(1, "a"))
            .with_category(Category::new(2, "b").with_parent(1));
        let tree = CategoryTree::load(&store).await?;
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.get(2).map(|c| c.parent_id), Some(1));
        assert!(tree.as_map().contains_key(&1));
        assert!(!tree.is_empty());
        Ok(())
    }
}
