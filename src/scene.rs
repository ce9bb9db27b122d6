//! Static scene construction: room, props, carpet, lights and the NLOS surface.
//!
//! Construction happens in two steps. [`SceneLayout::generate`] draws every
//! random choice up front and returns plain data, so a layout can be inspected
//! or reproduced from a seed. [`spawn_layout`] then turns the layout into Bevy
//! entities under the Z-up root.

use crate::shapes::{self, MeshData, QuadMesh, ShapeKind};
use crate::{DatasetError, Orientation};
use bevy::prelude::*;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashMap;
use std::f32::consts::PI;
use std::ops::RangeInclusive;

/// Luminous efficacy used to turn radiometric watts into lumens.
pub const LUMENS_PER_WATT: f32 = 683.0;

// ============================================================================
// Configuration
// ============================================================================

/// Closed box the scene sits in.
#[derive(Clone, Debug)]
pub struct RoomConfig {
    /// Height of the unscaled room cage (default: 7.0)
    pub height: f32,
    /// Object scale of the room (default: 10, 10, 7)
    pub scale: Vec3,
    /// Linear base color of walls, floor and ceiling
    pub color: [f32; 3],
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            height: 7.0,
            scale: Vec3::new(10.0, 10.0, 7.0),
            color: [0.8, 0.8, 0.8],
        }
    }
}

/// Random props scattered on the floor.
#[derive(Clone, Debug)]
pub struct PropConfig {
    /// Number of props (default: 10)
    pub count: usize,
    pub x_range: RangeInclusive<f32>,
    pub y_range: RangeInclusive<f32>,
    /// Smallest uniform scale (default: 0.5)
    pub min_scale: f32,
    /// Largest uniform scale (default: 0.9)
    pub max_size: f32,
}

impl Default for PropConfig {
    fn default() -> Self {
        Self {
            count: 10,
            x_range: -7.0..=7.0,
            y_range: -7.0..=7.0,
            min_scale: 0.5,
            max_size: 0.9,
        }
    }
}

/// Randomly placed lights.
#[derive(Clone, Debug)]
pub struct LightConfig {
    /// Number of lights (default: 10)
    pub count: usize,
    /// Lower corner of the placement box (default: -10, -10, 10)
    pub min: Vec3,
    /// Upper corner of the placement box (default: 10, 10, 15)
    pub max: Vec3,
    /// Radiant power range in watts (default: 50..=150)
    pub watts: RangeInclusive<f32>,
    /// Cut-off distance of each light
    pub range: f32,
    pub shadows_enabled: bool,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            count: 10,
            min: Vec3::new(-10.0, -10.0, 10.0),
            max: Vec3::new(10.0, 10.0, 15.0),
            watts: 50.0..=150.0,
            range: 80.0,
            shadows_enabled: true,
        }
    }
}

/// Solid-color carpet plane above the floor.
#[derive(Clone, Debug)]
pub struct CarpetConfig {
    /// Edge length of the unscaled plane (default: 20)
    pub size: f32,
    /// Height above the floor (default: 0.1)
    pub elevation: f32,
    /// Object scale (default: 14, 14, 1)
    pub scale: Vec3,
    pub red: RangeInclusive<f32>,
    pub green: RangeInclusive<f32>,
    pub blue: RangeInclusive<f32>,
    pub roughness: RangeInclusive<f32>,
}

impl Default for CarpetConfig {
    fn default() -> Self {
        Self {
            size: 20.0,
            elevation: 0.1,
            scale: Vec3::new(14.0, 14.0, 1.0),
            red: 0.3..=0.5,
            green: 0.1..=0.3,
            blue: 0.0..=0.2,
            roughness: 0.7..=0.9,
        }
    }
}

/// Relay surface the hidden scene is observed through.
#[derive(Clone, Debug)]
pub struct NlosSurfaceConfig {
    /// Edge length (default: 18)
    pub size: f32,
    /// Roughness of the diffuse part (default: 1.0)
    pub roughness: f32,
    /// Linear gray of the diffuse part (default: 0.8)
    pub diffuse: f32,
    /// Emission strength in W/m²/sr (default: 0.5)
    pub emission_strength: f32,
    /// Share of emission in the mix (default: 0.2)
    pub emission_mix: f32,
}

impl Default for NlosSurfaceConfig {
    fn default() -> Self {
        Self {
            size: 18.0,
            roughness: 1.0,
            diffuse: 0.8,
            emission_strength: 0.5,
            emission_mix: 0.2,
        }
    }
}

/// Everything the static scene is built from.
#[derive(Clone, Debug, Default)]
pub struct SceneConfig {
    pub room: RoomConfig,
    pub props: PropConfig,
    pub lights: LightConfig,
    pub carpet: CarpetConfig,
    pub nlos: NlosSurfaceConfig,
}

impl SceneConfig {
    /// Reject empty or inverted ranges
    pub fn validate(&self) -> Result<(), DatasetError> {
        let ranges = [
            ("props.x_range", &self.props.x_range),
            ("props.y_range", &self.props.y_range),
            ("lights.watts", &self.lights.watts),
            ("carpet.red", &self.carpet.red),
            ("carpet.green", &self.carpet.green),
            ("carpet.blue", &self.carpet.blue),
            ("carpet.roughness", &self.carpet.roughness),
        ];
        for (name, range) in ranges {
            if range.start() > range.end() {
                return Err(DatasetError::InvalidConfig(format!(
                    "{} is inverted: {:?}",
                    name, range
                )));
            }
        }
        if self.props.min_scale > self.props.max_size {
            return Err(DatasetError::InvalidConfig(format!(
                "prop scale range is inverted: {} > {}",
                self.props.min_scale, self.props.max_size
            )));
        }
        if !self.lights.min.cmple(self.lights.max).all() {
            return Err(DatasetError::InvalidConfig(
                "light placement box is inverted".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Materials
// ============================================================================

/// Surface families props are dressed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MaterialKind {
    Metal,
    Plastic,
    Wood,
    Glass,
    Stone,
}

impl MaterialKind {
    pub const ALL: [MaterialKind; 5] = [
        MaterialKind::Metal,
        MaterialKind::Plastic,
        MaterialKind::Wood,
        MaterialKind::Glass,
        MaterialKind::Stone,
    ];

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        *Self::ALL.choose(rng).unwrap_or(&MaterialKind::Stone)
    }
}

/// Resolved surface parameters, colors in linear RGBA.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MaterialSpec {
    pub kind: MaterialKind,
    pub base_color: [f32; 4],
    pub metallic: f32,
    pub roughness: f32,
    pub transmission: f32,
}

impl MaterialSpec {
    /// Draw a random material
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let kind = MaterialKind::random(rng);
        Self::for_kind(kind, rng)
    }

    /// Parameters of `kind`. Only plastic consumes randomness.
    pub fn for_kind<R: Rng + ?Sized>(kind: MaterialKind, rng: &mut R) -> Self {
        let (base_color, metallic, roughness, transmission) = match kind {
            MaterialKind::Metal => ([0.8, 0.8, 0.8, 1.0], 1.0, 0.2, 0.0),
            MaterialKind::Plastic => ([rng.gen(), rng.gen(), rng.gen(), 1.0], 0.0, 0.4, 0.0),
            MaterialKind::Wood => ([0.6, 0.3, 0.1, 1.0], 0.0, 0.7, 0.0),
            MaterialKind::Glass => ([1.0, 1.0, 1.0, 0.1], 0.0, 0.05, 1.0),
            MaterialKind::Stone => ([0.5, 0.5, 0.5, 1.0], 0.0, 0.8, 0.0),
        };
        Self {
            kind,
            base_color,
            metallic,
            roughness,
            transmission,
        }
    }

    pub fn to_standard_material(&self) -> StandardMaterial {
        let [r, g, b, a] = self.base_color;
        let alpha_mode = if a < 1.0 {
            AlphaMode::Blend
        } else {
            AlphaMode::Opaque
        };
        StandardMaterial {
            base_color: Color::linear_rgba(r, g, b, a),
            metallic: self.metallic,
            perceptual_roughness: self.roughness,
            specular_transmission: self.transmission,
            alpha_mode,
            ..default()
        }
    }
}

// ============================================================================
// Layout
// ============================================================================

/// One prop on the floor.
#[derive(Clone, Debug, PartialEq)]
pub struct PropPlacement {
    pub kind: ShapeKind,
    pub position: Vec3,
    pub rotation: Orientation,
    pub scale: f32,
    pub material: MaterialSpec,
}

/// One light in the room.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightPlacement {
    pub position: Vec3,
    pub watts: f32,
}

impl LightPlacement {
    pub fn lumens(&self) -> f32 {
        self.watts * LUMENS_PER_WATT
    }
}

/// The drawn carpet surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CarpetLayout {
    pub color: [f32; 3],
    pub roughness: f32,
}

/// Every random choice of the static scene.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneLayout {
    pub props: Vec<PropPlacement>,
    pub carpet: CarpetLayout,
    pub lights: Vec<LightPlacement>,
}

impl SceneLayout {
    /// Draw a layout. Props come first, then the carpet, then the lights.
    pub fn generate<R: Rng + ?Sized>(config: &SceneConfig, rng: &mut R) -> Self {
        let mut heights: HashMap<ShapeKind, f32> = HashMap::new();
        let props = (0..config.props.count)
            .map(|_| {
                let kind = ShapeKind::random(rng);
                let height = *heights
                    .entry(kind)
                    .or_insert_with(|| kind.build().size().z);
                let x = rng.gen_range(config.props.x_range.clone());
                let y = rng.gen_range(config.props.y_range.clone());
                // Rests on the unscaled height; scale is drawn afterwards
                let position = Vec3::new(x, y, height / 2.0);
                let rotation = Orientation::new(
                    rng.gen_range(0.0..=PI),
                    rng.gen_range(0.0..=PI),
                    rng.gen_range(0.0..=PI),
                );
                let scale = rng.gen_range(config.props.min_scale..=config.props.max_size);
                let material = MaterialSpec::random(rng);
                PropPlacement {
                    kind,
                    position,
                    rotation,
                    scale,
                    material,
                }
            })
            .collect();

        let carpet = CarpetLayout {
            color: [
                rng.gen_range(config.carpet.red.clone()),
                rng.gen_range(config.carpet.green.clone()),
                rng.gen_range(config.carpet.blue.clone()),
            ],
            roughness: rng.gen_range(config.carpet.roughness.clone()),
        };

        let lights = (0..config.lights.count)
            .map(|_| {
                let (min, max) = (config.lights.min, config.lights.max);
                let position = Vec3::new(
                    rng.gen_range(min.x..=max.x),
                    rng.gen_range(min.y..=max.y),
                    rng.gen_range(min.z..=max.z),
                );
                LightPlacement {
                    position,
                    watts: rng.gen_range(config.lights.watts.clone()),
                }
            })
            .collect();

        Self {
            props,
            carpet,
            lights,
        }
    }
}

/// What a spawned scene entity is.
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SceneElement {
    Room,
    Prop(ShapeKind),
    Carpet,
    Light,
    NlosSurface,
}

/// Unit room cage: a floor, four walls and a ceiling.
pub fn room_mesh(height: f32) -> MeshData {
    let cage = QuadMesh {
        positions: vec![
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(-1.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, height),
            Vec3::new(1.0, -1.0, height),
            Vec3::new(-1.0, -1.0, height),
            Vec3::new(-1.0, 1.0, height),
        ],
        quads: vec![
            [0, 1, 2, 3],
            [0, 4, 5, 1],
            [1, 5, 6, 2],
            [2, 6, 7, 3],
            [3, 7, 4, 0],
            [4, 5, 6, 7],
        ],
    };
    cage.to_flat_mesh_data()
}

/// Material of the NLOS relay surface: diffuse mixed with a faint glow.
pub fn nlos_surface_material(config: &NlosSurfaceConfig) -> StandardMaterial {
    let diffuse = config.diffuse * (1.0 - config.emission_mix);
    let glow = config.emission_strength * config.emission_mix * LUMENS_PER_WATT;
    StandardMaterial {
        base_color: Color::linear_rgb(diffuse, diffuse, diffuse),
        perceptual_roughness: config.roughness,
        emissive: LinearRgba::rgb(glow, glow, glow),
        ..default()
    }
}

/// Spawn the room, props, carpet, lights and NLOS surface as children of the
/// Z-up root.
pub fn spawn_layout(
    parent: &mut ChildBuilder,
    config: &SceneConfig,
    layout: &SceneLayout,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
) {
    let [r, g, b] = config.room.color;
    parent.spawn((
        Name::new("Room"),
        SceneElement::Room,
        Mesh3d(meshes.add(room_mesh(config.room.height).into_mesh())),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::linear_rgb(r, g, b),
            double_sided: true,
            cull_mode: None,
            ..default()
        })),
        Transform::from_scale(config.room.scale),
    ));

    let mut shape_meshes: HashMap<ShapeKind, Handle<Mesh>> = HashMap::new();
    for prop in &layout.props {
        let mesh = shape_meshes
            .entry(prop.kind)
            .or_insert_with(|| meshes.add(prop.kind.build().into_mesh()))
            .clone();
        parent.spawn((
            Name::new(prop.kind.name()),
            SceneElement::Prop(prop.kind),
            Mesh3d(mesh),
            MeshMaterial3d(materials.add(prop.material.to_standard_material())),
            Transform {
                translation: prop.position,
                rotation: prop.rotation.to_quat(),
                scale: Vec3::splat(prop.scale),
            },
        ));
    }

    let [r, g, b] = layout.carpet.color;
    parent.spawn((
        Name::new("Carpet"),
        SceneElement::Carpet,
        Mesh3d(meshes.add(shapes::plane(config.carpet.size).into_mesh())),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::linear_rgb(r, g, b),
            perceptual_roughness: layout.carpet.roughness,
            ..default()
        })),
        Transform::from_xyz(0.0, 0.0, config.carpet.elevation).with_scale(config.carpet.scale),
    ));

    for light in &layout.lights {
        parent.spawn((
            Name::new("Light"),
            SceneElement::Light,
            PointLight {
                intensity: light.lumens(),
                range: config.lights.range,
                shadows_enabled: config.lights.shadows_enabled,
                ..default()
            },
            Transform::from_translation(light.position),
        ));
    }

    parent.spawn((
        Name::new("NLOS Surface"),
        SceneElement::NlosSurface,
        Mesh3d(meshes.add(shapes::plane(config.nlos.size).into_mesh())),
        MeshMaterial3d(materials.add(nlos_surface_material(&config.nlos))),
        Transform::IDENTITY,
    ));

    info!(
        "Scene built: {} props, {} lights",
        layout.props.len(),
        layout.lights.len()
    );
}
