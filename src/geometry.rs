use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Interleaved position + normal, as consumed by the material pipeline.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometry {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Geometry {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

const T: f32 = 1.618_034;

const ICOSAHEDRON_VERTICES: [[f32; 3]; 12] = [
    [-1.0, T, 0.0],
    [1.0, T, 0.0],
    [-1.0, -T, 0.0],
    [1.0, -T, 0.0],
    [0.0, -1.0, T],
    [0.0, 1.0, T],
    [0.0, -1.0, -T],
    [0.0, 1.0, -T],
    [T, 0.0, -1.0],
    [T, 0.0, 1.0],
    [-T, 0.0, -1.0],
    [-T, 0.0, 1.0],
];

const ICOSAHEDRON_FACES: [[usize; 3]; 20] = [
    [0, 11, 5],
    [0, 5, 1],
    [0, 1, 7],
    [0, 7, 10],
    [0, 10, 11],
    [1, 5, 9],
    [5, 11, 4],
    [11, 10, 2],
    [10, 7, 6],
    [7, 1, 8],
    [3, 9, 4],
    [3, 4, 2],
    [3, 2, 6],
    [3, 6, 8],
    [3, 8, 9],
    [4, 9, 5],
    [2, 4, 11],
    [6, 2, 10],
    [8, 6, 7],
    [9, 8, 1],
];

/// Vertex and index buffer sizes in bytes of `icosahedron(_, detail)`,
/// saturating at `u64::MAX`.
pub fn icosahedron_buffer_bytes(detail: u32) -> (u64, u64) {
    let cols = u128::from(detail) + 1;
    let faces = ICOSAHEDRON_FACES.len() as u128;
    let vertices = faces * (cols + 1) * (cols + 2) / 2;
    let indices = faces * cols * cols * 3;
    let bytes = |count: u128, size: usize| u64::try_from(count * size as u128).unwrap_or(u64::MAX);
    (
        bytes(vertices, std::mem::size_of::<Vertex>()),
        bytes(indices, std::mem::size_of::<u32>()),
    )
}

/// Icosahedron projected onto a sphere of `radius`. Each face is split
/// into `(detail + 1)²` triangles; normals point away from the centre.
pub fn icosahedron(radius: f32, detail: u32) -> Geometry {
    let cols = detail as usize + 1;
    let per_face_vertices = (cols + 1) * (cols + 2) / 2;
    let mut geometry = Geometry {
        vertices: Vec::with_capacity(per_face_vertices * ICOSAHEDRON_FACES.len()),
        indices: Vec::with_capacity(cols * cols * 3 * ICOSAHEDRON_FACES.len()),
    };
    for face in ICOSAHEDRON_FACES {
        let [a, b, c] = face.map(|index| Vec3::from_array(ICOSAHEDRON_VERTICES[index]));
        subdivide_face(&mut geometry, a, b, c, cols, radius);
    }
    geometry
}

fn subdivide_face(geometry: &mut Geometry, a: Vec3, b: Vec3, c: Vec3, cols: usize, radius: f32) {
    // rows[i][j]: row i walks from edge a-b towards c, j across the row
    let base = geometry.vertices.len() as u32;
    let mut row_start = Vec::with_capacity(cols + 1);
    for i in 0..=cols {
        row_start.push(geometry.vertices.len() as u32 - base);
        let t = i as f32 / cols as f32;
        let aj = a.lerp(c, t);
        let bj = b.lerp(c, t);
        let rows = cols - i;
        for j in 0..=rows {
            let point = if rows == 0 {
                aj
            } else {
                aj.lerp(bj, j as f32 / rows as f32)
            };
            let normal = point.normalize();
            geometry.vertices.push(Vertex {
                position: (normal * radius).to_array(),
                normal: normal.to_array(),
            });
        }
    }
    let at = |i: usize, j: usize| base + row_start[i] + j as u32;
    for i in 0..cols {
        for j in 0..2 * (cols - i) - 1 {
            let k = j / 2;
            if j % 2 == 0 {
                geometry.indices.extend([at(i, k + 1), at(i + 1, k), at(i, k)]);
            } else {
                geometry.indices.extend([at(i, k + 1), at(i + 1, k + 1), at(i + 1, k)]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_zero_is_the_plain_icosahedron() {
        let geometry = icosahedron(1.0, 0);
        assert_eq!(geometry.triangle_count(), 20);
        assert_eq!(geometry.vertices.len(), 60);
    }

    #[test]
    fn triangle_count_grows_quadratically() {
        for detail in [1, 2, 5] {
            let geometry = icosahedron(1.0, detail);
            let cols = detail as usize + 1;
            assert_eq!(geometry.triangle_count(), 20 * cols * cols);
            assert!(geometry.indices.iter().all(|&i| (i as usize) < geometry.vertices.len()));
        }
    }

    #[test]
    fn buffer_bytes_match_the_generated_mesh() {
        for detail in [0, 3] {
            let geometry = icosahedron(1.0, detail);
            let (vertex_bytes, index_bytes) = icosahedron_buffer_bytes(detail);
            assert_eq!(vertex_bytes as usize, geometry.vertices.len() * 24);
            assert_eq!(index_bytes as usize, geometry.indices.len() * 4);
        }
        let (vertex_bytes, index_bytes) = icosahedron_buffer_bytes(u32::MAX);
        assert_eq!(vertex_bytes, u64::MAX);
        assert_eq!(index_bytes, u64::MAX);
    }

    #[test]
    fn vertices_lie_on_the_sphere() {
        let geometry = icosahedron(2.0, 3);
        for vertex in &geometry.vertices {
            let position = Vec3::from_array(vertex.position);
            assert!((position.length() - 2.0).abs() < 1e-5);
            assert!((Vec3::from_array(vertex.normal) - position / 2.0).length() < 1e-5);
        }
    }

    #[test]
    fn triangles_face_outwards() {
        let geometry = icosahedron(1.0, 2);
        for triangle in geometry.indices.chunks(3) {
            let [a, b, c] = [triangle[0], triangle[1], triangle[2]]
                .map(|index| Vec3::from_array(geometry.vertices[index as usize].position));
            let normal = (b - a).cross(c - a);
            assert!(normal.dot(a + b + c) > 0.0);
        }
    }
}
