//! In-memory world store with containment links and an event log.

use std::collections::BTreeMap;

use super::{ObjectId, ObjectSpec, Owner, World, WorldError, WorldObject, WorldResult};

/// What happened to an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorldEventKind {
    Create,
    Destroy,
    Transfer { from: Owner, to: Owner },
    PutIn { container: ObjectId, into: String },
    TakeOut { container: ObjectId, from: String },
}

impl WorldEventKind {
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Destroy => "DESTROY",
            Self::Transfer { .. } => "TRANSFER",
            Self::PutIn { .. } => "PUT_IN",
            Self::TakeOut { .. } => "TAKE_OUT",
        }
    }
}

/// One entry of the append-only world log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldEvent {
    /// Position in the log, starting at 1.
    pub id: u64,
    pub time: u64,
    pub object: ObjectId,
    /// The object's name when the event happened.
    pub name: String,
    pub kind: WorldEventKind,
}

impl std::fmt::Display for WorldEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{} (t{}) ", self.id, self.time)?;
        match &self.kind {
            WorldEventKind::Create => write!(f, "{} was created", self.name),
            WorldEventKind::Destroy => write!(f, "{} was destroyed", self.name),
            WorldEventKind::Transfer { from, to } => write!(f, "{} passed from {from} to {to}", self.name),
            WorldEventKind::PutIn { into, .. } => write!(f, "{} was put in {into}", self.name),
            WorldEventKind::TakeOut { from, .. } => write!(f, "{} was taken out of {from}", self.name),
        }
    }
}

/// A bounded grid world held entirely in memory.
///
/// Free objects occupy one grid cell each; cells are handed out row-major, so
/// the layout is a pure function of the operation history. Contained objects
/// have no position.
pub struct MemoryWorld {
    objects: BTreeMap<ObjectId, WorldObject>,
    containers: BTreeMap<ObjectId, ObjectId>,
    events: Vec<WorldEvent>,
    next_id: u64,
    width: i64,
    height: i64,
    time: u64,
}

impl Default for MemoryWorld {
    fn default() -> Self {
        Self::new(10, 10)
    }
}

impl MemoryWorld {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            objects: BTreeMap::new(),
            containers: BTreeMap::new(),
            events: Vec::new(),
            next_id: 1,
            width: i64::from(width.max(1)),
            height: i64::from(height.max(1)),
            time: 0,
        }
    }

    pub fn time(&self) -> u64 {
        self.time
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn log(&mut self, object: ObjectId, name: String, kind: WorldEventKind) {
        let id = self.events.len() as u64 + 1;
        tracing::debug!(%object, event = kind.as_label(), id, time = self.time, "world event");
        self.events.push(WorldEvent {
            id,
            time: self.time,
            object,
            name,
            kind,
        });
    }

    fn name_of(&self, id: ObjectId) -> String {
        self.objects
            .get(&id)
            .map_or_else(|| id.to_string(), |o| o.name.clone())
    }

    fn free_cell(&self) -> Option<(i64, i64)> {
        for y in 0..self.height {
            for x in 0..self.width {
                let taken = self.objects.values().any(|o| o.position == Some((x, y)));
                if !taken {
                    return Some((x, y));
                }
            }
        }
        None
    }

    fn free_cell_count(&self) -> usize {
        let taken = self.objects.values().filter(|o| o.position.is_some()).count();
        usize::try_from(self.width * self.height)
            .unwrap_or(usize::MAX)
            .saturating_sub(taken)
    }

    fn full(&self) -> WorldError {
        WorldError::Full {
            width: self.width,
            height: self.height,
        }
    }

    fn get_mut(&mut self, id: ObjectId) -> WorldResult<&mut WorldObject> {
        self.objects.get_mut(&id).ok_or(WorldError::NotFound { id })
    }

    fn ensure_exists(&self, id: ObjectId) -> WorldResult<()> {
        if self.objects.contains_key(&id) {
            Ok(())
        } else {
            Err(WorldError::NotFound { id })
        }
    }

    fn is_inside(&self, id: ObjectId, ancestor: ObjectId) -> bool {
        let mut current = id;
        while let Some(&parent) = self.containers.get(&current) {
            if parent == ancestor {
                return true;
            }
            current = parent;
        }
        false
    }
}

impl World for MemoryWorld {
    fn create_object(&mut self, spec: ObjectSpec) -> WorldResult<ObjectId> {
        if let Some(name) = &spec.name {
            if self.object_by_name(name).is_some() {
                return Err(WorldError::DuplicateName { name: name.clone() });
            }
        }
        let cell = self.free_cell().ok_or_else(|| self.full())?;
        let id = ObjectId(self.next_id);
        self.next_id += 1;

        let mut fallback = format!("object_{}", id.get());
        while self.object_by_name(&fallback).is_some() {
            fallback.push('_');
        }
        let object = spec.build(id, &fallback, Some(cell));
        tracing::info!(%id, name = %object.name, "object created");
        let name = object.name.clone();
        self.objects.insert(id, object);
        self.log(id, name, WorldEventKind::Create);
        Ok(id)
    }

    fn find_objects(&self, predicate: &dyn Fn(&WorldObject) -> bool) -> Vec<ObjectId> {
        self.objects
            .values()
            .filter(|o| predicate(o))
            .map(|o| o.id)
            .collect()
    }

    fn object(&self, id: ObjectId) -> Option<&WorldObject> {
        self.objects.get(&id)
    }

    fn object_by_name(&self, name: &str) -> Option<ObjectId> {
        let wanted = name.trim().to_lowercase();
        self.objects
            .values()
            .find(|o| o.name.to_lowercase() == wanted)
            .map(|o| o.id)
    }

    fn container_of(&self, id: ObjectId) -> Option<ObjectId> {
        self.containers.get(&id).copied()
    }

    fn contents_of(&self, id: ObjectId) -> Vec<ObjectId> {
        self.containers
            .iter()
            .filter(|&(_, &c)| c == id)
            .map(|(&o, _)| o)
            .collect()
    }

    fn set_owner(&mut self, id: ObjectId, owner: Owner) -> WorldResult<()> {
        let object = self.get_mut(id)?;
        let from = object.owner;
        if from == owner {
            return Ok(());
        }
        object.owner = owner;
        let name = object.name.clone();
        self.log(id, name, WorldEventKind::Transfer { from, to: owner });
        Ok(())
    }

    fn remove_object(&mut self, id: ObjectId) -> WorldResult<WorldObject> {
        self.ensure_exists(id)?;
        let parent = self.containers.get(&id).copied();
        if parent.is_none() {
            let spilled = self.contents_of(id).len();
            let freed = self.objects.get(&id).is_some_and(|o| o.position.is_some());
            if spilled > self.free_cell_count() + usize::from(freed) {
                return Err(self.full());
            }
        }
        let removed = self.objects.remove(&id).ok_or(WorldError::NotFound { id })?;
        self.containers.remove(&id);

        // Contents spill into whatever held the destroyed object.
        for child in self.contents_of(id) {
            match parent {
                Some(p) => {
                    self.containers.insert(child, p);
                }
                None => {
                    self.containers.remove(&child);
                    let cell = self.free_cell();
                    if let Some(obj) = self.objects.get_mut(&child) {
                        obj.position = cell;
                    }
                }
            }
        }
        self.log(id, removed.name.clone(), WorldEventKind::Destroy);
        Ok(removed)
    }

    fn put_into(&mut self, id: ObjectId, container: ObjectId) -> WorldResult<()> {
        self.ensure_exists(id)?;
        self.ensure_exists(container)?;
        if id == container {
            return Err(WorldError::Containment {
                object: id,
                container,
                reason: "an object cannot contain itself".into(),
            });
        }
        if self.is_inside(container, id) {
            return Err(WorldError::Containment {
                object: id,
                container,
                reason: "the container is already inside the object".into(),
            });
        }
        self.containers.insert(id, container);
        self.get_mut(id)?.position = None;
        let (name, into) = (self.name_of(id), self.name_of(container));
        self.log(id, name, WorldEventKind::PutIn { container, into });
        Ok(())
    }

    fn take_out_of_container(&mut self, id: ObjectId) -> WorldResult<ObjectId> {
        self.ensure_exists(id)?;
        if !self.containers.contains_key(&id) {
            return Err(WorldError::NotContained { id });
        }
        let cell = self.free_cell().ok_or_else(|| self.full())?;
        let container = self
            .containers
            .remove(&id)
            .ok_or(WorldError::NotContained { id })?;
        self.get_mut(id)?.position = Some(cell);
        let (name, from) = (self.name_of(id), self.name_of(container));
        self.log(id, name, WorldEventKind::TakeOut { container, from });
        Ok(container)
    }

    fn objects(&self) -> Vec<ObjectId> {
        self.objects.keys().copied().collect()
    }

    fn events(&self) -> &[WorldEvent] {
        &self.events
    }

    fn advance_clock(&mut self) {
        self.time += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world_with_box_and_ball() -> (MemoryWorld, ObjectId, ObjectId) {
        let mut world = MemoryWorld::default();
        let chest = world
            .create_object(ObjectSpec::default().named("chest").shape("box"))
            .unwrap();
        let ball = world
            .create_object(ObjectSpec::default().named("ball").shape("sphere").color("red"))
            .unwrap();
        (world, chest, ball)
    }

    #[test]
    fn create_fills_defaults_and_positions() {
        let mut world = MemoryWorld::default();
        let id = world.create_object(ObjectSpec::default()).unwrap();
        let obj = world.object(id).unwrap();
        assert_eq!(obj.shape, "lump");
        assert_eq!(obj.color, "grey");
        assert_eq!(obj.size, 5);
        assert_eq!(obj.material, "unknown");
        assert_eq!(obj.owner, Owner::World);
        assert_eq!(obj.position, Some((0, 0)));
        assert_eq!(obj.name, "object_1");

        let second = world.create_object(ObjectSpec::default()).unwrap();
        assert_eq!(world.object(second).unwrap().position, Some((1, 0)));
    }

    #[test]
    fn names_are_unique_case_insensitively() {
        let mut world = MemoryWorld::default();
        world.create_object(ObjectSpec::default().named("A")).unwrap();
        let err = world.create_object(ObjectSpec::default().named("a"));
        assert!(matches!(err, Err(WorldError::DuplicateName { .. })));
        assert!(world.object_by_name("a").is_some());
    }

    #[test]
    fn containment_round_trip() {
        let (mut world, chest, ball) = world_with_box_and_ball();
        world.put_into(ball, chest).unwrap();
        assert_eq!(world.container_of(ball), Some(chest));
        assert_eq!(world.contents_of(chest), vec![ball]);
        assert_eq!(world.object(ball).unwrap().position, None);

        assert_eq!(world.take_out_of_container(ball).unwrap(), chest);
        assert_eq!(world.container_of(ball), None);
        assert!(world.object(ball).unwrap().position.is_some());
    }

    #[test]
    fn containment_cycles_rejected() {
        let (mut world, chest, ball) = world_with_box_and_ball();
        world.put_into(ball, chest).unwrap();
        assert!(world.put_into(chest, ball).is_err());
        assert!(world.put_into(chest, chest).is_err());
    }

    #[test]
    fn depth_counts_nested_containers() {
        let (mut world, chest, ball) = world_with_box_and_ball();
        let crate_id = world
            .create_object(ObjectSpec::default().named("crate"))
            .unwrap();
        world.put_into(chest, crate_id).unwrap();
        world.put_into(ball, chest).unwrap();
        assert_eq!(world.containment_depth(ball), 2);
        assert_eq!(world.containment_depth(chest), 1);
        assert_eq!(world.containment_depth(crate_id), 0);
    }

    #[test]
    fn destroying_container_spills_contents() {
        let (mut world, chest, ball) = world_with_box_and_ball();
        world.put_into(ball, chest).unwrap();
        world.remove_object(chest).unwrap();
        assert_eq!(world.container_of(ball), None);
        assert!(world.object(ball).unwrap().position.is_some());
    }

    #[test]
    fn event_log_records_history() {
        let (mut world, chest, ball) = world_with_box_and_ball();
        world.set_owner(ball, Owner::Agent).unwrap();
        world.put_into(ball, chest).unwrap();
        let labels: Vec<_> = world.events().iter().map(|e| e.kind.as_label()).collect();
        assert_eq!(labels, vec!["CREATE", "CREATE", "TRANSFER", "PUT_IN"]);
        let ids: Vec<_> = world.events().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert_eq!(world.events()[3].to_string(), "#4 (t0) ball was put in chest");

        world.advance_clock();
        world.remove_object(ball).unwrap();
        let last = world.events().last().unwrap();
        assert_eq!(last.to_string(), "#5 (t1) ball was destroyed");
    }

    #[test]
    fn full_grid_refuses_placement() {
        let mut world = MemoryWorld::new(3, 1);
        let chest = world.create_object(ObjectSpec::default().named("chest")).unwrap();
        let first = world.create_object(ObjectSpec::default()).unwrap();
        let second = world.create_object(ObjectSpec::default()).unwrap();
        assert!(matches!(
            world.create_object(ObjectSpec::default()),
            Err(WorldError::Full { width: 3, height: 1 })
        ));
        assert_eq!(world.len(), 3);

        world.put_into(first, chest).unwrap();
        world.put_into(second, chest).unwrap();
        world.create_object(ObjectSpec::default()).unwrap();
        world.create_object(ObjectSpec::default()).unwrap();

        // No cell for a retrieved object: it stays where it was.
        assert!(matches!(world.take_out_of_container(first), Err(WorldError::Full { .. })));
        assert_eq!(world.container_of(first), Some(chest));

        // Destroying the chest would free one cell for two spilled objects.
        assert!(matches!(world.remove_object(chest), Err(WorldError::Full { .. })));
        assert!(world.object(chest).is_some());
        assert_eq!(world.contents_of(chest).len(), 2);
    }

    #[test]
    fn uncontained_objects_always_have_a_cell() {
        let (mut world, chest, ball) = world_with_box_and_ball();
        world.put_into(ball, chest).unwrap();
        assert!(world.object(ball).unwrap().describe().contains("inside a container"));
        world.take_out_of_container(ball).unwrap();
        let described = world.object(ball).unwrap().describe();
        assert!(described.contains(" at ("), "{described}");
    }

    #[test]
    fn find_objects_in_creation_order() {
        let (world, chest, ball) = world_with_box_and_ball();
        assert_eq!(world.find_objects(&|_: &WorldObject| true), vec![chest, ball]);
        assert_eq!(world.find_objects(&|o: &WorldObject| o.color == "red"), vec![ball]);
    }
}
