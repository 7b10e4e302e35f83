//! YAML controller scenarios: a world, per-frame controller keyframes and
//! scheduled deletions, played through the standard modules.

use anyhow::{Context, bail};
use glam::{Quat, Vec3};
use handspace_common::{EntityId, EntityProperties, Hand, Marker, ObjectKind, Transform};
use handspace_dispatch::{DispatchConfig, Dispatcher, Slot};
use handspace_input::{ControllerSample, RawInput, SimHost};
use handspace_kernel::{World, WorldEvent};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectSpec {
    pub name: String,
    pub position: Vec3,
    #[serde(default)]
    pub radius: Option<f32>,
    #[serde(default)]
    pub kind: ObjectKind,
    #[serde(default)]
    pub markers: Vec<Marker>,
    #[serde(default)]
    pub locked: bool,
}

impl ObjectSpec {
    fn properties(&self) -> EntityProperties {
        let mut props = EntityProperties::named(&self.name)
            .at(self.position)
            .with_kind(self.kind);
        if let Some(radius) = self.radius {
            props = props.with_radius(radius);
        }
        for marker in &self.markers {
            props = props.with_marker(*marker);
        }
        props.locked = self.locked;
        props
    }
}

/// Controller state for one hand. A missing `position` means untracked.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HandKey {
    pub trigger: f32,
    pub secondary: f32,
    pub thumbstick: f32,
    pub position: Option<Vec3>,
    /// Point the controller aims at. Defaults to straight ahead (-Z).
    pub aim: Option<Vec3>,
}

impl HandKey {
    fn sample(&self) -> ControllerSample {
        let pose = self.position.map(|position| {
            let rotation = self
                .aim
                .and_then(|aim| (aim - position).try_normalize())
                .map(|dir| Quat::from_rotation_arc(Vec3::NEG_Z, dir))
                .unwrap_or(Quat::IDENTITY);
            Transform {
                position,
                rotation,
                ..Transform::default()
            }
        });
        ControllerSample {
            trigger: self.trigger,
            secondary: self.secondary,
            thumbstick: self.thumbstick,
            pose,
        }
    }
}

/// Hand states from `frame` on, until the next keyframe for that hand.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Keyframe {
    pub frame: u64,
    #[serde(default)]
    pub left: Option<HandKey>,
    #[serde(default)]
    pub right: Option<HandKey>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Deletion {
    pub frame: u64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    #[serde(default)]
    pub frames: Option<u64>,
    #[serde(default = "default_delta_time")]
    pub delta_time: f32,
    #[serde(default)]
    pub objects: Vec<ObjectSpec>,
    #[serde(default)]
    pub keyframes: Vec<Keyframe>,
    #[serde(default)]
    pub delete: Vec<Deletion>,
}

fn default_delta_time() -> f32 {
    1.0 / 90.0
}

/// What happened in one played frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameLine {
    pub frame: u64,
    pub owners: BTreeMap<Slot, String>,
    /// (object name, method) in call order.
    pub calls: Vec<(String, String)>,
    /// Hands that received a haptic pulse.
    pub haptics: Vec<Hand>,
    /// Avatar destinations.
    pub teleports: Vec<Vec3>,
    pub failures: usize,
}

impl Scenario {
    pub fn from_yaml_str(s: &str) -> anyhow::Result<Self> {
        let mut scenario: Scenario = serde_yaml::from_str(s).context("parsing scenario")?;
        scenario.keyframes.sort_by_key(|k| k.frame);
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        Self::from_yaml_str(&text).with_context(|| format!("loading scenario {}", path.display()))
    }

    fn validate(&self) -> anyhow::Result<()> {
        let mut seen = std::collections::BTreeSet::new();
        for object in &self.objects {
            if !seen.insert(object.name.as_str()) {
                bail!("duplicate object name {:?}", object.name);
            }
        }
        for deletion in &self.delete {
            if !seen.contains(deletion.name.as_str()) {
                bail!("deletion at frame {} names unknown object {:?}", deletion.frame, deletion.name);
            }
        }
        Ok(())
    }

    /// Explicit `frames`, or one past the last scheduled event.
    pub fn frame_count(&self) -> u64 {
        self.frames.unwrap_or_else(|| {
            let last_key = self.keyframes.iter().map(|k| k.frame);
            let last_delete = self.delete.iter().map(|d| d.frame);
            last_key.chain(last_delete).max().map_or(1, |f| f + 1)
        })
    }

    /// Controller input in effect at `frame`.
    pub fn input_at(&self, frame: u64) -> RawInput {
        let mut raw = RawInput::default();
        for hand in Hand::ALL {
            let key = self
                .keyframes
                .iter()
                .take_while(|k| k.frame <= frame)
                .filter_map(|k| match hand {
                    Hand::Left => k.left,
                    Hand::Right => k.right,
                })
                .last();
            if let Some(key) = key {
                *raw.hand_mut(hand) = key.sample();
            }
        }
        raw
    }

    pub fn deletions_at(&self, frame: u64) -> impl Iterator<Item = &str> {
        self.delete
            .iter()
            .filter(move |d| d.frame == frame)
            .map(|d| d.name.as_str())
    }

    fn build_world(&self) -> (World, BTreeMap<String, EntityId>) {
        let mut world = World::new();
        let ids = self
            .objects
            .iter()
            .map(|o| (o.name.clone(), world.spawn(o.properties())))
            .collect();
        (world, ids)
    }

    /// Drive `frames` frames (default [`Scenario::frame_count`]) through the
    /// standard modules.
    pub fn play(&self, config: &DispatchConfig, frames: Option<u64>) -> anyhow::Result<Vec<FrameLine>> {
        let (world, ids) = self.build_world();
        let names: BTreeMap<EntityId, String> =
            ids.iter().map(|(name, id)| (*id, name.clone())).collect();
        let mut host = SimHost::new(world, config.clone()).with_delta_time(self.delta_time);
        let mut dispatcher = Dispatcher::new();
        handspace_modules::register_standard(&mut dispatcher, config)?;

        let mut lines = Vec::new();
        for frame in 0..frames.unwrap_or_else(|| self.frame_count()) {
            for name in self.deletions_at(frame) {
                if let Some(id) = ids.get(name) {
                    tracing::debug!(object = name, frame, "deleting object");
                    host.world_mut().despawn(*id);
                }
            }
            host.set_input(self.input_at(frame));
            host.world_mut().drain_events();

            let report = dispatcher
                .tick(&mut host)
                .with_context(|| format!("frame {frame}"))?;
            let calls = host
                .world_mut()
                .drain_events()
                .into_iter()
                .filter_map(|event| match event {
                    WorldEvent::MethodCalled { id, method, .. } => {
                        let name = names.get(&id).cloned().unwrap_or_else(|| id.short());
                        Some((name, method))
                    }
                    _ => None,
                })
                .collect();
            let haptics = host.drain_haptics().into_iter().map(|p| p.hand).collect();
            lines.push(FrameLine {
                frame,
                owners: report.owners,
                calls,
                haptics,
                teleports: host.drain_teleports(),
                failures: report.failures.len(),
            });
        }
        dispatcher.shutdown(&mut host);
        Ok(lines)
    }
}
