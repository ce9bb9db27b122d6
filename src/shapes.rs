//! Procedural prop geometry.
//!
//! Bevy ships mesh builders for the basic primitives but none of the mesh
//! modifiers the props need (twist, subdivision surface, boolean difference).
//! [`MeshData`] is a plain triangle soup that those operations work on before
//! it is turned into a Bevy [`Mesh`]. Every shape is built Z-up.

use bevy::math::primitives::{Cone, Cylinder, Plane3d, Sphere, Torus};
use bevy::prelude::*;
use bevy::render::mesh::{Indices, PrimitiveTopology, VertexAttributeValues};
use bevy::render::render_asset::RenderAssetUsages;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashMap;
use std::f32::consts::FRAC_PI_2;

/// Indexed triangle mesh with per-vertex normals.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Read positions, normals and indices out of a triangle-list mesh.
    ///
    /// Missing normals are recomputed and a mesh without an index buffer is
    /// indexed sequentially. Returns `None` without float3 positions.
    pub fn from_mesh(mesh: &Mesh) -> Option<Self> {
        let positions: Vec<Vec3> = match mesh.attribute(Mesh::ATTRIBUTE_POSITION)? {
            VertexAttributeValues::Float32x3(values) => {
                values.iter().copied().map(Vec3::from).collect()
            }
            _ => return None,
        };
        let indices: Vec<u32> = match mesh.indices() {
            Some(indices) => indices.iter().map(|i| i as u32).collect(),
            None => (0..positions.len() as u32).collect(),
        };
        let normals = match mesh.attribute(Mesh::ATTRIBUTE_NORMAL) {
            Some(VertexAttributeValues::Float32x3(values)) if values.len() == positions.len() => {
                values.iter().copied().map(Vec3::from).collect()
            }
            _ => Vec::new(),
        };

        let mut data = Self {
            positions,
            normals,
            indices,
        };
        if data.normals.is_empty() {
            data.recompute_normals();
        }
        Some(data)
    }

    /// Convert into a Bevy mesh
    pub fn into_mesh(self) -> Mesh {
        let positions: Vec<[f32; 3]> = self.positions.iter().map(|p| p.to_array()).collect();
        let normals: Vec<[f32; 3]> = self.normals.iter().map(|n| n.to_array()).collect();
        Mesh::new(
            PrimitiveTopology::TriangleList,
            RenderAssetUsages::default(),
        )
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
        .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, normals)
        .with_inserted_indices(Indices::U32(self.indices))
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Axis-aligned bounds, `None` for an empty mesh
    pub fn extent(&self) -> Option<(Vec3, Vec3)> {
        let first = *self.positions.first()?;
        Some(
            self.positions
                .iter()
                .fold((first, first), |(min, max), p| (min.min(*p), max.max(*p))),
        )
    }

    /// Bounding box size
    pub fn size(&self) -> Vec3 {
        self.extent()
            .map(|(min, max)| max - min)
            .unwrap_or(Vec3::ZERO)
    }

    /// Rotate positions and normals about the origin
    pub fn rotated(mut self, rotation: Quat) -> Self {
        for p in &mut self.positions {
            *p = rotation * *p;
        }
        for n in &mut self.normals {
            *n = rotation * *n;
        }
        self
    }

    /// Scale positions per axis and recompute normals
    pub fn scaled(mut self, scale: Vec3) -> Self {
        for p in &mut self.positions {
            *p *= scale;
        }
        self.recompute_normals();
        self
    }

    /// Move all positions by `offset`
    pub fn translated(mut self, offset: Vec3) -> Self {
        for p in &mut self.positions {
            *p += offset;
        }
        self
    }

    /// Twist about the Z axis, turning each vertex by `angle * z` radians.
    pub fn twisted(mut self, angle: f32) -> Self {
        for p in &mut self.positions {
            *p = Quat::from_rotation_z(angle * p.z) * *p;
        }
        self.recompute_normals();
        self
    }

    /// Flip winding and normals, turning the surface inside out
    pub fn inverted(mut self) -> Self {
        for tri in self.indices.chunks_exact_mut(3) {
            tri.swap(1, 2);
        }
        for n in &mut self.normals {
            *n = -*n;
        }
        self
    }

    /// Merge another mesh into this one
    pub fn append(&mut self, other: MeshData) {
        let offset = self.positions.len() as u32;
        self.positions.extend(other.positions);
        self.normals.extend(other.normals);
        self.indices.extend(other.indices.into_iter().map(|i| i + offset));
    }

    /// Subtract a solid that lies entirely inside `outer`.
    ///
    /// The difference of a closed solid and an enclosed one is the outer
    /// surface plus the inner surface facing inward.
    pub fn with_cavity(mut outer: MeshData, inner: MeshData) -> MeshData {
        outer.append(inner.inverted());
        outer
    }

    /// Area-weighted smooth normals from the current triangles
    pub fn recompute_normals(&mut self) {
        let mut normals = vec![Vec3::ZERO; self.positions.len()];
        for tri in self.indices.chunks_exact(3) {
            let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
            let face = (self.positions[b] - self.positions[a])
                .cross(self.positions[c] - self.positions[a]);
            normals[a] += face;
            normals[b] += face;
            normals[c] += face;
        }
        self.normals = normals.into_iter().map(|n| n.normalize_or_zero()).collect();
    }
}

// ============================================================================
// Subdivision surfaces
// ============================================================================

/// Closed mesh of quads, counter-clockwise seen from outside.
#[derive(Clone, Debug, PartialEq)]
pub struct QuadMesh {
    pub positions: Vec<Vec3>,
    pub quads: Vec<[u32; 4]>,
}

impl QuadMesh {
    /// Axis-aligned cube centered at the origin
    pub fn cube(size: f32) -> Self {
        let h = size / 2.0;
        let positions = vec![
            Vec3::new(-h, -h, -h),
            Vec3::new(h, -h, -h),
            Vec3::new(h, h, -h),
            Vec3::new(-h, h, -h),
            Vec3::new(-h, -h, h),
            Vec3::new(h, -h, h),
            Vec3::new(h, h, h),
            Vec3::new(-h, h, h),
        ];
        let quads = vec![
            [0, 3, 2, 1], // -Z
            [4, 5, 6, 7], // +Z
            [0, 1, 5, 4], // -Y
            [1, 2, 6, 5], // +X
            [2, 3, 7, 6], // +Y
            [3, 0, 4, 7], // -X
        ];
        Self { positions, quads }
    }

    /// One Catmull-Clark step. Every quad becomes four.
    pub fn subdivide(&self) -> Self {
        let vertex_count = self.positions.len();

        let face_points: Vec<Vec3> = self
            .quads
            .iter()
            .map(|q| q.iter().map(|&i| self.positions[i as usize]).sum::<Vec3>() / 4.0)
            .collect();

        // Faces adjacent to each undirected edge
        let mut edge_faces: HashMap<(u32, u32), Vec<usize>> = HashMap::new();
        for (f, quad) in self.quads.iter().enumerate() {
            for i in 0..4 {
                edge_faces
                    .entry(edge_key(quad[i], quad[(i + 1) % 4]))
                    .or_default()
                    .push(f);
            }
        }

        let mut edges: Vec<(u32, u32)> = edge_faces.keys().copied().collect();
        edges.sort_unstable();
        let edge_base = (vertex_count + face_points.len()) as u32;
        let edge_index: HashMap<(u32, u32), u32> = edges
            .iter()
            .enumerate()
            .map(|(i, e)| (*e, edge_base + i as u32))
            .collect();

        let edge_points: Vec<Vec3> = edges
            .iter()
            .map(|&(a, b)| {
                let midpoint = (self.positions[a as usize] + self.positions[b as usize]) / 2.0;
                match edge_faces[&(a, b)].as_slice() {
                    [f0, f1] => (midpoint * 2.0 + face_points[*f0] + face_points[*f1]) / 4.0,
                    _ => midpoint,
                }
            })
            .collect();

        // Accumulate adjacent face points and edge midpoints per vertex
        let mut face_sum = vec![Vec3::ZERO; vertex_count];
        let mut face_count = vec![0u32; vertex_count];
        for (f, quad) in self.quads.iter().enumerate() {
            for &v in quad {
                face_sum[v as usize] += face_points[f];
                face_count[v as usize] += 1;
            }
        }
        let mut edge_sum = vec![Vec3::ZERO; vertex_count];
        let mut edge_count = vec![0u32; vertex_count];
        for &(a, b) in &edges {
            let midpoint = (self.positions[a as usize] + self.positions[b as usize]) / 2.0;
            for v in [a as usize, b as usize] {
                edge_sum[v] += midpoint;
                edge_count[v] += 1;
            }
        }

        let mut positions: Vec<Vec3> = (0..vertex_count)
            .map(|v| {
                let p = self.positions[v];
                let n = face_count[v] as f32;
                if face_count[v] == 0 || edge_count[v] == 0 {
                    return p;
                }
                let f = face_sum[v] / n;
                let r = edge_sum[v] / edge_count[v] as f32;
                (f + r * 2.0 + p * (n - 3.0)) / n
            })
            .collect();
        positions.extend(face_points);
        positions.extend(edge_points);

        let mut quads = Vec::with_capacity(self.quads.len() * 4);
        for (f, quad) in self.quads.iter().enumerate() {
            let center = (vertex_count + f) as u32;
            for i in 0..4 {
                let prev = quad[(i + 3) % 4];
                let here = quad[i];
                let next = quad[(i + 1) % 4];
                quads.push([
                    here,
                    edge_index[&edge_key(here, next)],
                    center,
                    edge_index[&edge_key(prev, here)],
                ]);
            }
        }

        Self { positions, quads }
    }

    /// Apply `levels` subdivision steps
    pub fn subdivided(self, levels: u32) -> Self {
        (0..levels).fold(self, |mesh, _| mesh.subdivide())
    }

    /// Triangulate with smooth normals
    pub fn to_mesh_data(&self) -> MeshData {
        let indices = self
            .quads
            .iter()
            .flat_map(|&[a, b, c, d]| [a, b, c, a, c, d])
            .collect();
        let mut data = MeshData {
            positions: self.positions.clone(),
            normals: Vec::new(),
            indices,
        };
        data.recompute_normals();
        data
    }
}

fn edge_key(a: u32, b: u32) -> (u32, u32) {
    (a.min(b), a.max(b))
}

// ============================================================================
// Prop shapes
// ============================================================================

/// The prop shapes scattered on the floor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    TorusKnot,
    TwistedCylinder,
    Icosphere,
    SubdividedCube,
    BooleanObject,
    Cone,
    Torus,
    Monkey,
    UvSphere,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 9] = [
        ShapeKind::TorusKnot,
        ShapeKind::TwistedCylinder,
        ShapeKind::Icosphere,
        ShapeKind::SubdividedCube,
        ShapeKind::BooleanObject,
        ShapeKind::Cone,
        ShapeKind::Torus,
        ShapeKind::Monkey,
        ShapeKind::UvSphere,
    ];

    /// Pick one kind uniformly
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        *Self::ALL.choose(rng).unwrap_or(&ShapeKind::UvSphere)
    }

    /// Display name, also used as the entity name
    pub fn name(&self) -> &'static str {
        match self {
            ShapeKind::TorusKnot => "Torus Knot",
            ShapeKind::TwistedCylinder => "Twisted Cylinder",
            ShapeKind::Icosphere => "Icosphere",
            ShapeKind::SubdividedCube => "Subdivided Cube",
            ShapeKind::BooleanObject => "Boolean Object",
            ShapeKind::Cone => "Cone",
            ShapeKind::Torus => "Torus",
            ShapeKind::Monkey => "Suzanne",
            ShapeKind::UvSphere => "UV Sphere",
        }
    }

    /// Build the unscaled mesh, Z-up, centered at the origin
    pub fn build(&self) -> MeshData {
        match self {
            // No knot primitive in Bevy either; a thin torus stands in
            ShapeKind::TorusKnot => torus(2.0, 0.3),
            ShapeKind::TwistedCylinder => y_up(
                Cylinder::new(1.0, 2.0)
                    .mesh()
                    .resolution(32)
                    .segments(16)
                    .build(),
            )
            .twisted(FRAC_PI_2),
            ShapeKind::Icosphere => icosphere(1.0, 3),
            ShapeKind::SubdividedCube => QuadMesh::cube(2.0).subdivided(2).to_mesh_data(),
            ShapeKind::BooleanObject => MeshData::with_cavity(
                QuadMesh::cube(2.0).to_flat_mesh_data(),
                uv_sphere(1.0),
            ),
            ShapeKind::Cone => y_up(
                Cone {
                    radius: 1.0,
                    height: 2.0,
                }
                .mesh()
                .resolution(6)
                .build(),
            ),
            ShapeKind::Torus => torus(2.0, 0.4),
            ShapeKind::Monkey => monkey_head(),
            ShapeKind::UvSphere => uv_sphere(1.0),
        }
    }
}

impl QuadMesh {
    /// Triangulate with one normal per face, duplicating corner vertices
    pub fn to_flat_mesh_data(&self) -> MeshData {
        let mut data = MeshData::default();
        for &[a, b, c, d] in &self.quads {
            let corners = [a, b, c, d].map(|i| self.positions[i as usize]);
            let normal = (corners[1] - corners[0])
                .cross(corners[2] - corners[0])
                .normalize_or_zero();
            let base = data.positions.len() as u32;
            data.positions.extend(corners);
            data.normals.extend([normal; 4]);
            data.indices
                .extend([base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        data
    }
}

/// Convert a Bevy primitive (Y-up) into a Z-up mesh
fn y_up(mesh: Mesh) -> MeshData {
    MeshData::from_mesh(&mesh)
        .unwrap_or_default()
        .rotated(Quat::from_rotation_x(FRAC_PI_2))
}

/// Square in the XY plane facing +Z
pub fn plane(size: f32) -> MeshData {
    y_up(Plane3d::default().mesh().size(size, size).build())
}

fn torus(major_radius: f32, minor_radius: f32) -> MeshData {
    y_up(
        Torus {
            minor_radius,
            major_radius,
        }
        .mesh()
        .build(),
    )
}

fn uv_sphere(radius: f32) -> MeshData {
    y_up(Sphere::new(radius).mesh().uv(32, 16))
}

fn icosphere(radius: f32, subdivisions: u32) -> MeshData {
    let sphere = Sphere::new(radius);
    match sphere.mesh().ico(subdivisions) {
        Ok(mesh) => y_up(mesh),
        Err(_) => uv_sphere(radius),
    }
}

/// Rounded head with two ears and a muzzle, facing -Y.
fn monkey_head() -> MeshData {
    let mut head = uv_sphere(1.0).scaled(Vec3::new(1.0, 0.85, 0.95));
    for side in [-1.0, 1.0] {
        head.append(
            uv_sphere(0.4)
                .scaled(Vec3::new(1.0, 0.3, 0.9))
                .translated(Vec3::new(side * 1.1, 0.1, 0.25)),
        );
    }
    head.append(
        uv_sphere(0.55)
            .scaled(Vec3::new(1.1, 0.6, 0.6))
            .translated(Vec3::new(0.0, -0.7, -0.35)),
    );
    head
}
