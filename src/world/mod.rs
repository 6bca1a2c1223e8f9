//! The object world the agent acts on.
//!
//! Objects carry a fixed, closed attribute schema (name, shape, color, size,
//! material, position, owner). Meaning expressions are compiled against this
//! schema, so anything outside it is rejected at teach time rather than
//! looked up at runtime.
//!
//! The [`World`] trait is the narrow contract the planner and execution
//! engine consume; [`MemoryWorld`] is the in-process implementation.

pub mod memory;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::{MemoryWorld, WorldEvent, WorldEventKind};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum WorldError {
    #[error("object not found: {id}")]
    #[diagnostic(
        code(lexagent::world::not_found),
        help("The object may have been destroyed. List objects with `what is` queries.")
    )]
    NotFound { id: ObjectId },

    #[error("an object named \"{name}\" already exists")]
    #[diagnostic(
        code(lexagent::world::duplicate_name),
        help("Object names are unique (case-insensitive). Pick another name with `as <name>`.")
    )]
    DuplicateName { name: String },

    #[error("cannot put {object} into {container}: {reason}")]
    #[diagnostic(
        code(lexagent::world::containment),
        help("An object cannot contain itself or one of its own containers.")
    )]
    Containment {
        object: ObjectId,
        container: ObjectId,
        reason: String,
    },

    #[error("{id} is not inside any container")]
    #[diagnostic(
        code(lexagent::world::not_contained),
        help("Only objects that were put into a container can be retrieved from one.")
    )]
    NotContained { id: ObjectId },

    #[error("the {width}x{height} world has no free cell")]
    #[diagnostic(
        code(lexagent::world::full),
        help("Destroy an object, put one in a container, or raise world_width / world_height in the config.")
    )]
    Full { width: i64, height: i64 },
}

pub type WorldResult<T> = std::result::Result<T, WorldError>;

// ---------------------------------------------------------------------------
// Object model
// ---------------------------------------------------------------------------

/// Stable identifier of a world object. Ids are allocated in creation order
/// and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub u64);

impl ObjectId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Who holds an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Owner {
    /// Unowned, lying around in the world.
    World,
    /// Held by the agent itself.
    Agent,
    /// Held by the person talking to the agent.
    User,
}

impl Owner {
    pub fn as_label(self) -> &'static str {
        match self {
            Self::World => "world",
            Self::Agent => "agent",
            Self::User => "user",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "world" | "nobody" => Some(Self::World),
            "agent" | "self" => Some(Self::Agent),
            "user" => Some(Self::User),
            _ => None,
        }
    }

    /// Phrase used in feedback ("I", "you", "nobody").
    pub fn subject_phrase(self) -> &'static str {
        match self {
            Self::World => "nobody",
            Self::Agent => "I",
            Self::User => "you",
        }
    }
}

impl std::fmt::Display for Owner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_label())
    }
}

pub const DEFAULT_SHAPE: &str = "lump";
pub const DEFAULT_COLOR: &str = "grey";
pub const DEFAULT_SIZE: i64 = 5;
pub const DEFAULT_MATERIAL: &str = "unknown";

/// A world object with the fixed attribute schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldObject {
    pub id: ObjectId,
    pub name: String,
    pub shape: String,
    pub color: String,
    pub size: i64,
    pub material: String,
    /// Grid cell. `None` exactly while the object sits inside a container.
    pub position: Option<(i64, i64)>,
    pub owner: Owner,
}

impl WorldObject {
    /// Attribute listing used by identity queries.
    pub fn describe(&self) -> String {
        let place = match self.position {
            Some((x, y)) => format!("at ({x}, {y})"),
            None => "inside a container".to_string(),
        };
        format!(
            "{} is a {} {} {} of size {} made of {}, {place}, held by {}",
            self.name,
            self.color,
            self.shape,
            self.id,
            self.size,
            self.material,
            self.owner
        )
    }
}

/// Attributes for a new object. Unset fields take the schema defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectSpec {
    pub name: Option<String>,
    pub shape: Option<String>,
    pub color: Option<String>,
    pub size: Option<i64>,
    pub material: Option<String>,
    pub owner: Option<Owner>,
}

impl ObjectSpec {
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn shape(mut self, shape: impl Into<String>) -> Self {
        self.shape = Some(shape.into());
        self
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn size(mut self, size: i64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn material(mut self, material: impl Into<String>) -> Self {
        self.material = Some(material.into());
        self
    }

    pub fn owner(mut self, owner: Owner) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Materialize these fields as an object, filling schema defaults.
    ///
    /// Used both by world implementations and by the planner to check a
    /// synthesized object against its description before creating it.
    pub fn build(&self, id: ObjectId, fallback_name: &str, position: Option<(i64, i64)>) -> WorldObject {
        WorldObject {
            id,
            name: self
                .name
                .clone()
                .unwrap_or_else(|| fallback_name.to_string()),
            shape: self.shape.clone().unwrap_or_else(|| DEFAULT_SHAPE.into()),
            color: self.color.clone().unwrap_or_else(|| DEFAULT_COLOR.into()),
            size: self.size.unwrap_or(DEFAULT_SIZE),
            material: self
                .material
                .clone()
                .unwrap_or_else(|| DEFAULT_MATERIAL.into()),
            position,
            owner: self.owner.unwrap_or(Owner::World),
        }
    }
}

// ---------------------------------------------------------------------------
// World contract
// ---------------------------------------------------------------------------

/// The object-world collaborator consumed by the planner and execution engine.
///
/// All listing methods return ids in ascending (creation) order so that
/// planning and query results are reproducible.
pub trait World {
    fn create_object(&mut self, spec: ObjectSpec) -> WorldResult<ObjectId>;

    fn find_objects(&self, predicate: &dyn Fn(&WorldObject) -> bool) -> Vec<ObjectId>;

    fn object(&self, id: ObjectId) -> Option<&WorldObject>;

    /// Case-insensitive lookup by unique name.
    fn object_by_name(&self, name: &str) -> Option<ObjectId>;

    /// The immediate container of `id`, if any.
    fn container_of(&self, id: ObjectId) -> Option<ObjectId>;

    fn contents_of(&self, id: ObjectId) -> Vec<ObjectId>;

    fn set_owner(&mut self, id: ObjectId, owner: Owner) -> WorldResult<()>;

    fn remove_object(&mut self, id: ObjectId) -> WorldResult<WorldObject>;

    /// Place `id` inside `container`, replacing any current container. A
    /// refused move leaves the world unchanged.
    fn put_into(&mut self, id: ObjectId, container: ObjectId) -> WorldResult<()>;

    /// Take `id` out of its container. Returns the former container.
    fn take_out_of_container(&mut self, id: ObjectId) -> WorldResult<ObjectId>;

    fn objects(&self) -> Vec<ObjectId>;

    /// The append-only event log, oldest first.
    fn events(&self) -> &[WorldEvent] {
        &[]
    }

    /// Number of containers between `id` and the open world.
    fn containment_depth(&self, id: ObjectId) -> usize {
        let mut depth = 0;
        let mut current = id;
        while let Some(parent) = self.container_of(current) {
            depth += 1;
            current = parent;
            // put_into rejects cycles, so this only trips on a broken store.
            if depth > self.objects().len() {
                break;
            }
        }
        depth
    }

    /// Called once per scheduler tick.
    fn advance_clock(&mut self) {}
}
