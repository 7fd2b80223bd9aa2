//! A minimal in-memory host ECS for black-box integration tests, in the
//! spirit of the ancestor codebase's `naia-test` `TestWorld`: a plain
//! `u64`-keyed entity handle and `HashMap`-backed component storage, with
//! no reflection or type erasure beyond what each test needs.

use std::collections::HashMap;

use replisim_core::authority::{DescriptorOwnership, PrimaryAuthority};
use replisim_core::{Attribute, Host};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TestEntity(pub u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Velocity {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Default)]
pub struct TestHost {
    next_id: u64,
    alive: HashMap<TestEntity, ()>,
    chunk_version: HashMap<TestEntity, u64>,
    positions: HashMap<TestEntity, Position>,
    velocities: HashMap<TestEntity, Velocity>,
    primary: HashMap<TestEntity, PrimaryAuthority>,
    ownership: HashMap<TestEntity, DescriptorOwnership>,
}

impl TestHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self, entity: TestEntity) -> Option<Position> {
        self.positions.get(&entity).copied()
    }

    pub fn velocity(&self, entity: TestEntity) -> Option<Velocity> {
        self.velocities.get(&entity).copied()
    }

    pub fn set_position(&mut self, entity: TestEntity, position: Position) {
        self.positions.insert(entity, position);
        self.bump_chunk(entity);
    }

    pub fn set_velocity(&mut self, entity: TestEntity, velocity: Velocity) {
        self.velocities.insert(entity, velocity);
        self.bump_chunk(entity);
    }

    fn bump_chunk(&mut self, entity: TestEntity) {
        *self.chunk_version.entry(entity).or_insert(0) += 1;
    }
}

impl Host for TestHost {
    type Entity = TestEntity;

    fn create_entity(&mut self) -> TestEntity {
        let entity = TestEntity(self.next_id);
        self.next_id += 1;
        self.alive.insert(entity, ());
        entity
    }

    fn destroy_entity(&mut self, entity: TestEntity) {
        self.alive.remove(&entity);
        self.positions.remove(&entity);
        self.velocities.remove(&entity);
    }

    fn is_alive(&self, entity: TestEntity) -> bool {
        self.alive.contains_key(&entity)
    }

    fn chunk_version(&self, entity: TestEntity) -> u64 {
        self.chunk_version.get(&entity).copied().unwrap_or(0)
    }
}

impl Attribute<PrimaryAuthority> for TestHost {
    fn get(&self, entity: TestEntity) -> Option<&PrimaryAuthority> {
        self.primary.get(&entity)
    }
    fn get_mut(&mut self, entity: TestEntity) -> Option<&mut PrimaryAuthority> {
        self.primary.get_mut(&entity)
    }
    fn set(&mut self, entity: TestEntity, value: PrimaryAuthority) {
        self.primary.insert(entity, value);
    }
    fn remove(&mut self, entity: TestEntity) -> Option<PrimaryAuthority> {
        self.primary.remove(&entity)
    }
}

impl Attribute<DescriptorOwnership> for TestHost {
    fn get(&self, entity: TestEntity) -> Option<&DescriptorOwnership> {
        self.ownership.get(&entity)
    }
    fn get_mut(&mut self, entity: TestEntity) -> Option<&mut DescriptorOwnership> {
        self.ownership.get_mut(&entity)
    }
    fn set(&mut self, entity: TestEntity, value: DescriptorOwnership) {
        self.ownership.insert(entity, value);
    }
    fn remove(&mut self, entity: TestEntity) -> Option<DescriptorOwnership> {
        self.ownership.remove(&entity)
    }
}
