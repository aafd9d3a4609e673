//! Item table: what can lie on the floor or sit in an inventory

use serde::{Deserialize, Serialize};

use crate::core::types::{ItemId, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    HealingPotion,
    Gold { amount: u32 },
}

impl ItemKind {
    pub fn name(&self) -> &'static str {
        match self {
            ItemKind::HealingPotion => "healing potion",
            ItemKind::Gold { .. } => "gold",
        }
    }

    pub fn is_healing(&self) -> bool {
        matches!(self, ItemKind::HealingPotion)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub kind: ItemKind,
}

/// An item lying on a floor tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloorItem {
    pub item: Item,
    pub pos: Position,
}

/// Bounded bag of items carried by an actor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Inventory {
    items: Vec<Item>,
    capacity: usize,
}

impl Inventory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::new(),
            capacity,
        }
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    /// Returns the item back when there is no room for it
    pub fn add(&mut self, item: Item) -> Result<(), Item> {
        if self.is_full() {
            return Err(item);
        }
        self.items.push(item);
        Ok(())
    }

    pub fn remove(&mut self, id: ItemId) -> Option<Item> {
        let index = self.items.iter().position(|i| i.id == id)?;
        Some(self.items.remove(index))
    }

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|i| i.id == id)
    }

    /// First healing item, in pickup order
    pub fn first_healing(&self) -> Option<ItemId> {
        self.items.iter().find(|i| i.kind.is_healing()).map(|i| i.id)
    }

    pub fn count_healing(&self) -> usize {
        self.items.iter().filter(|i| i.kind.is_healing()).count()
    }

    pub fn gold(&self) -> u32 {
        self.items
            .iter()
            .map(|i| match i.kind {
                ItemKind::Gold { amount } => amount,
                ItemKind::HealingPotion => 0,
            })
            .sum()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn potion(id: u32) -> Item {
        Item {
            id: ItemId(id),
            kind: ItemKind::HealingPotion,
        }
    }

    #[test]
    fn test_capacity_is_enforced() {
        let mut bag = Inventory::with_capacity(1);
        assert!(bag.add(potion(1)).is_ok());
        assert_eq!(bag.add(potion(2)), Err(potion(2)));
        assert_eq!(bag.len(), 1);
    }

    #[test]
    fn test_first_healing_skips_gold() {
        let mut bag = Inventory::with_capacity(4);
        bag.add(Item {
            id: ItemId(1),
            kind: ItemKind::Gold { amount: 5 },
        })
        .unwrap();
        bag.add(potion(2)).unwrap();
        assert_eq!(bag.first_healing(), Some(ItemId(2)));
        assert_eq!(bag.gold(), 5);
    }

    #[test]
    fn test_remove_missing_item() {
        let mut bag = Inventory::with_capacity(2);
        assert!(bag.remove(ItemId(9)).is_none());
    }
}
