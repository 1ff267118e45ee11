// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for catalog merging.

#[cfg(test)]
mod tests {
    use crate::catalog::*;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_merge_is_sorted_and_deduplicated() {
        let merged = merge_catalogs(
            names(&["cpu_usage"]),
            names(&["memory_usage", "cpu_usage"]),
        );
        assert_eq!(merged, names(&["cpu_usage", "memory_usage"]));
    }

    #[test]
    fn test_merge_is_commutative() {
        let a = names(&["up", "node_load1", "up"]);
        let b = names(&["container_cpu", "up"]);
        assert_eq!(
            merge_catalogs(a.clone(), b.clone()),
            merge_catalogs(b, a)
        );
    }

    #[test]
    fn test_merge_is_idempotent() {
        let a = names(&["b", "a", "c"]);
        let once = merge_catalogs(a.clone(), Vec::new());
        assert_eq!(merge_catalogs(once.clone(), a), once);
    }

    #[test]
    fn test_merge_of_empty_catalogs() {
        assert!(merge_catalogs(Vec::new(), Vec::new()).is_empty());
    }
}
