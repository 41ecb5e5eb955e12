use crate::error::GraphError;
use crate::object::{Object, ObjectRef};

#[derive(Debug, Clone, PartialEq)]
pub struct IndirectObject {
    pub id: u32,
    pub generation: u32,
    pub payload: Object,
}

impl IndirectObject {
    pub fn reference(&self) -> ObjectRef {
        ObjectRef::new(self.id, self.generation)
    }
}

/// Arena of indirect objects. Ids start at 1, are handed out in creation order,
/// and are never reused.
#[derive(Debug, Clone, Default)]
pub struct ObjectGraph {
    // index = id - 1; `None` marks a reservation not yet filled.
    slots: Vec<Option<IndirectObject>>,
}

impl ObjectGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, payload: impl Into<Object>) -> ObjectRef {
        self.register_with_generation(payload, 0)
    }

    pub fn register_with_generation(&mut self, payload: impl Into<Object>, generation: u32) -> ObjectRef {
        let id = self.next_id();
        self.slots.push(Some(IndirectObject {
            id,
            generation,
            payload: payload.into(),
        }));
        ObjectRef::new(id, generation)
    }

    /// Allocates an id whose payload is supplied later through [`ObjectGraph::fill`].
    pub fn reserve(&mut self) -> ObjectRef {
        let id = self.next_id();
        self.slots.push(None);
        ObjectRef::new(id, 0)
    }

    pub fn fill(&mut self, reference: ObjectRef, payload: impl Into<Object>) -> Result<(), GraphError> {
        let slot = self.slot_mut(reference.id())?;
        if slot.is_some() {
            return Err(GraphError::AlreadyFilled(reference.id()));
        }
        *slot = Some(IndirectObject {
            id: reference.id(),
            generation: reference.generation(),
            payload: payload.into(),
        });
        Ok(())
    }

    pub fn resolve(&self, reference: ObjectRef) -> Result<&Object, GraphError> {
        self.get(reference.id()).map(|object| &object.payload)
    }

    pub fn get(&self, id: u32) -> Result<&IndirectObject, GraphError> {
        let index = (id as usize)
            .checked_sub(1)
            .ok_or(GraphError::UnknownObject(id))?;
        match self.slots.get(index) {
            Some(Some(object)) => Ok(object),
            Some(None) => Err(GraphError::Unfilled(id)),
            None => Err(GraphError::UnknownObject(id)),
        }
    }

    pub fn get_mut(&mut self, reference: ObjectRef) -> Result<&mut Object, GraphError> {
        let id = reference.id();
        match self.slot_mut(id)? {
            Some(object) => Ok(&mut object.payload),
            None => Err(GraphError::Unfilled(id)),
        }
    }

    pub fn contains(&self, reference: ObjectRef) -> bool {
        matches!(self.get(reference.id()), Ok(object) if object.generation == reference.generation())
    }

    /// Number of allocated ids, reservations included.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn highest_id(&self) -> u32 {
        self.slots.len() as u32
    }

    /// Filled objects in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &IndirectObject> {
        self.slots.iter().flatten()
    }

    /// Checks that every id is filled and every reference points at a registered object.
    pub fn validate(&self) -> Result<(), GraphError> {
        for (index, slot) in self.slots.iter().enumerate() {
            let Some(object) = slot else {
                return Err(GraphError::Unfilled(index as u32 + 1));
            };
            let mut dangling = None;
            object.payload.visit_references(&mut |target| {
                if dangling.is_none() && !self.contains(target) {
                    dangling = Some(target.id());
                }
            });
            if let Some(target) = dangling {
                return Err(GraphError::DanglingReference {
                    id: object.id,
                    target,
                });
            }
        }
        Ok(())
    }

    fn next_id(&self) -> u32 {
        self.slots.len() as u32 + 1
    }

    fn slot_mut(&mut self, id: u32) -> Result<&mut Option<IndirectObject>, GraphError> {
        let index = (id as usize)
            .checked_sub(1)
            .ok_or(GraphError::UnknownObject(id))?;
        self.slots
            .get_mut(index)
            .ok_or(GraphError::UnknownObject(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Dictionary;

    #[test]
    fn ids_are_sequential_from_one() {
        let mut graph = ObjectGraph::new();
        let a = graph.register(Object::Null);
        let b = graph.reserve();
        let c = graph.register(true);
        assert_eq!((a.id(), b.id(), c.id()), (1, 2, 3));
        assert_eq!(graph.highest_id(), 3);
    }

    #[test]
    fn forward_references_resolve_after_fill() {
        let mut graph = ObjectGraph::new();
        let page = graph.reserve();
        let pages = graph.register(Dictionary::new().with("Kids", vec![Object::Reference(page)]));
        assert_eq!(graph.validate(), Err(GraphError::Unfilled(page.id())));
        graph
            .fill(page, Dictionary::new().with("Parent", pages))
            .unwrap();
        graph.validate().unwrap();
        assert!(graph.resolve(page).unwrap().as_dict().unwrap().contains_key("Parent"));
        assert_eq!(
            graph.fill(page, Object::Null),
            Err(GraphError::AlreadyFilled(page.id()))
        );
    }

    #[test]
    fn dangling_reference_is_reported() {
        let mut graph = ObjectGraph::new();
        graph.register(Dictionary::new().with("Pages", ObjectRef::new(9, 0)));
        assert_eq!(
            graph.validate(),
            Err(GraphError::DanglingReference { id: 1, target: 9 })
        );
    }

    #[test]
    fn generation_mismatch_counts_as_dangling() {
        let mut graph = ObjectGraph::new();
        let target = graph.register_with_generation(Object::Null, 2);
        graph.register(Object::Reference(ObjectRef::new(target.id(), 0)));
        assert!(graph.contains(target));
        assert_eq!(
            graph.validate(),
            Err(GraphError::DanglingReference { id: 2, target: 1 })
        );
    }

    #[test]
    fn unknown_ids_fail_lookup() {
        let graph = ObjectGraph::new();
        assert_eq!(graph.get(0), Err(GraphError::UnknownObject(0)));
        assert_eq!(
            graph.resolve(ObjectRef::new(4, 0)),
            Err(GraphError::UnknownObject(4))
        );
    }
}
