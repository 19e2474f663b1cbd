use serde::Serialize;

use crate::catalog::PageKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CatalogCard {
    pub key: &'static str,
    pub path: &'static str,
    pub title: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HomeSnapshot {
    pub cards: Vec<CatalogCard>,
}

/// Landing page: one card per walkthrough.
#[derive(Debug, Clone, Default)]
pub struct HomePage;

impl HomePage {
    pub fn new() -> Self {
        Self
    }

    pub fn snapshot(&self) -> HomeSnapshot {
        let cards = PageKind::all()
            .iter()
            .copied()
            .filter(|&k| k != PageKind::Home)
            .map(|k| CatalogCard {
                key: k.label(),
                path: k.path(),
                title: k.title(),
                description: k.description(),
            })
            .collect();
        HomeSnapshot { cards }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_every_walkthrough_once() {
        let snap = HomePage::new().snapshot();
        assert_eq!(snap.cards.len(), 8);
        assert!(snap.cards.iter().all(|c| c.path != "/"));
        assert!(snap.cards.iter().any(|c| c.path == "/ppo-visualization"));
    }
}
