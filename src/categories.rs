//! Life categories: the fixed default set and the user's pin/order layout.

use crate::models::CategoryConfig;
use crate::store::EntityStore;

/// Default category ids in their initial order
pub const DEFAULT_CATEGORIES: [&str; 17] = [
    "work",
    "college",
    "reading",
    "training",
    "media",
    "finances",
    "goals",
    "diet",
    "health",
    "leisure",
    "marriage",
    "relationship",
    "ideas",
    "travel",
    "studies",
    "devotional",
    "commitments",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

pub fn is_known(id: &str) -> bool {
    DEFAULT_CATEGORIES.contains(&id)
}

pub fn default_configs() -> EntityStore<CategoryConfig> {
    DEFAULT_CATEGORIES
        .iter()
        .enumerate()
        .map(|(order, id)| CategoryConfig {
            id: id.to_string(),
            is_pinned: false,
            order: order as i64,
        })
        .collect::<Vec<_>>()
        .into()
}

/// Seed the layout when a bundle has none; returns true if it did
pub fn ensure_defaults(configs: &mut EntityStore<CategoryConfig>) -> bool {
    if !configs.is_empty() {
        return false;
    }
    *configs = default_configs();
    true
}

fn sorted(configs: &EntityStore<CategoryConfig>) -> Vec<&CategoryConfig> {
    let mut all: Vec<&CategoryConfig> = configs.iter().collect();
    all.sort_by_key(|c| c.order);
    all
}

pub fn pinned(configs: &EntityStore<CategoryConfig>) -> Vec<&CategoryConfig> {
    sorted(configs).into_iter().filter(|c| c.is_pinned).collect()
}

pub fn unpinned(configs: &EntityStore<CategoryConfig>) -> Vec<&CategoryConfig> {
    sorted(configs).into_iter().filter(|c| !c.is_pinned).collect()
}

pub fn toggle_pin(configs: &mut EntityStore<CategoryConfig>, id: &str) -> bool {
    configs.update(id, |c| c.is_pinned = !c.is_pinned)
}

/// Swap `order` with the neighbor in the full sorted list. False at either end
/// or for an unknown id.
pub fn move_category(configs: &mut EntityStore<CategoryConfig>, id: &str, direction: Direction) -> bool {
    let order: Vec<(String, i64)> = sorted(configs)
        .iter()
        .map(|c| (c.id.clone(), c.order))
        .collect();
    let Some(index) = order.iter().position(|(cid, _)| cid == id) else {
        return false;
    };
    let neighbor = match direction {
        Direction::Up if index > 0 => index - 1,
        Direction::Down if index + 1 < order.len() => index + 1,
        _ => return false,
    };

    let (ref this_id, this_order) = order[index];
    let (ref other_id, other_order) = order[neighbor];
    configs.update(this_id, |c| c.order = other_order);
    configs.update(other_id, |c| c.order = this_order);
    true
}
