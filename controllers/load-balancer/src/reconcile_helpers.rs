//! Helper functions for common reconciliation patterns
//!
//! List arithmetic shared by the perimeter and load balancer reconcilers.

use std::collections::HashMap;

/// Insert and delete lists that turn `old` into `new`.
///
/// Both inputs are sorted and walked with two cursors; entries only in `new`
/// are inserts, entries only in `old` are deletes. Outputs are sorted.
pub fn sync_lists(old: &[String], new: &[String]) -> (Vec<String>, Vec<String>) {
    let mut old = old.to_vec();
    let mut new = new.to_vec();
    old.sort();
    new.sort();

    let (mut x, mut y) = (0, 0);
    let mut inserts = Vec::new();
    let mut deletes = Vec::new();
    while x < old.len() || y < new.len() {
        if y >= new.len() {
            deletes.push(old[x].clone());
            x += 1;
        } else if x >= old.len() {
            inserts.push(new[y].clone());
            y += 1;
        } else if old[x] < new[y] {
            deletes.push(old[x].clone());
            x += 1;
        } else if old[x] > new[y] {
            inserts.push(new[y].clone());
            y += 1;
        } else {
            x += 1;
            y += 1;
        }
    }
    (inserts, deletes)
}

/// Order-insensitive equality, counting duplicates
pub fn same_string_set(a: &[String], b: &[String]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut counts: HashMap<&str, i64> = HashMap::with_capacity(a.len());
    for item in a {
        *counts.entry(item.as_str()).or_default() += 1;
    }
    for item in b {
        match counts.get_mut(item.as_str()) {
            Some(count) if *count > 0 => *count -= 1,
            _ => return false,
        }
    }
    true
}
