//! Compilation-scoped registry of types keyed by generation-checked ids.
//!
//! Scopes register the types they declare and deregister them when they
//! are dropped. A `TypeId` that outlives its scope looks up to `None`
//! instead of aliasing whatever reuses the slot.

use super::static_type::StaticType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId {
    index: u32,
    generation: u32,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    type_: Option<StaticType>,
}

#[derive(Debug, Default)]
pub struct TypeRegistry {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        TypeRegistry::default()
    }

    pub fn register(&mut self, type_: StaticType) -> TypeId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.type_ = Some(type_);
            return TypeId {
                index,
                generation: slot.generation,
            };
        }

        self.slots.push(Slot {
            generation: 0,
            type_: Some(type_),
        });
        TypeId {
            index: (self.slots.len() - 1) as u32,
            generation: 0,
        }
    }

    pub fn lookup(&self, id: TypeId) -> Option<StaticType> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.type_.clone())
    }

    /// Removes `id`. Returns false when it was already stale.
    pub fn deregister(&mut self, id: TypeId) -> bool {
        match self.slots.get_mut(id.index as usize) {
            Some(slot) if slot.generation == id.generation && slot.type_.is_some() => {
                slot.type_ = None;
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(id.index);
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.type_.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
