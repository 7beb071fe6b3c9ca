//! CPU rendition of the seed, flood and encode stages.
//!
//! Follows the WGSL kernels step for step (same seed placement, candidate order
//! and tie-breaking) so GPU output can be checked against it, plus an O(edges)
//! brute-force field that is exact by construction.

use crate::coords::Vec2;
use crate::stroke::Edge;

use super::config::jfa_steps;
use super::ctx::RasterTransform;
use super::encode::FAR_DISTANCE;
use super::DistanceField;

/// A resolved seed: raw raster position plus the edge's buffer index.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Seed {
    pub position: Vec2,
    pub edge: u32,
}

/// `size`² grid of optional seeds, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedMap {
    size: u32,
    seeds: Vec<Option<Seed>>,
}

impl SeedMap {
    pub fn empty(size: u32) -> Self {
        Self {
            size,
            seeds: vec![None; (size as usize) * (size as usize)],
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn at(&self, x: u32, y: u32) -> Option<Seed> {
        self.seeds[self.index(x, y)]
    }

    pub fn seeded_count(&self) -> usize {
        self.seeds.iter().filter(|s| s.is_some()).count()
    }

    fn index(&self, x: u32, y: u32) -> usize {
        (y * self.size + x) as usize
    }

    fn texel(&self, p: Vec2) -> Option<(u32, u32)> {
        let (x, y) = (p.x.floor(), p.y.floor());
        let size = self.size as f32;
        (x >= 0.0 && y >= 0.0 && x < size && y < size).then_some((x as u32, y as u32))
    }
}

#[inline]
fn texel_center(x: u32, y: u32) -> Vec2 {
    Vec2::new(x as f32 + 0.5, y as f32 + 0.5)
}

/// Distance from `p` to the segment `a`–`b` (clamped projection).
pub fn segment_distance(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len2 = ab.length_squared();
    let t = if len2 > 0.0 { ((p - a).dot(ab) / len2).clamp(0.0, 1.0) } else { 0.0 };
    (p - (a + ab * t)).length()
}

/// Scatters the start, midpoint and end of every edge. Later edges overwrite
/// earlier ones on shared texels.
pub fn seed_init(edges: &[Edge], transform: RasterTransform, size: u32) -> SeedMap {
    let mut map = SeedMap::empty(size);
    for (index, edge) in edges.iter().enumerate() {
        let a = transform.to_raster(edge.start());
        let b = transform.to_raster(edge.end());
        for p in [a, (a + b) * 0.5, b] {
            if let Some((x, y)) = map.texel(p) {
                let i = map.index(x, y);
                map.seeds[i] = Some(Seed { position: p, edge: index as u32 });
            }
        }
    }
    map
}

/// One flood pass at `step`.
pub fn flood_pass(src: &SeedMap, step: u32) -> SeedMap {
    let size = src.size as i64;
    let step = i64::from(step);
    let mut dst = SeedMap::empty(src.size);

    for y in 0..src.size {
        for x in 0..src.size {
            let here = texel_center(x, y);
            let mut best = src.at(x, y);
            let mut best_dist = best.map_or(f32::MAX, |s| (s.position - here).length_squared());

            for dy in -1i64..=1 {
                for dx in -1i64..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let qx = i64::from(x) + dx * step;
                    let qy = i64::from(y) + dy * step;
                    if qx < 0 || qy < 0 || qx >= size || qy >= size {
                        continue;
                    }
                    let Some(candidate) = src.at(qx as u32, qy as u32) else { continue };
                    let dist = (candidate.position - here).length_squared();
                    if dist < best_dist {
                        best_dist = dist;
                        best = Some(candidate);
                    }
                }
            }

            let i = dst.index(x, y);
            dst.seeds[i] = best;
        }
    }
    dst
}

/// Runs `passes` flood passes.
pub fn propagate(seeds: &SeedMap, passes: u32) -> SeedMap {
    jfa_steps(passes).fold(seeds.clone(), |map, step| flood_pass(&map, step))
}

/// Exact signed, normalized distance to each texel's resolved edge.
pub fn encode(nearest: &SeedMap, edges: &[Edge], transform: RasterTransform, spread: f32) -> DistanceField {
    let size = nearest.size;
    let mut values = Vec::with_capacity((size as usize) * (size as usize));
    for y in 0..size {
        for x in 0..size {
            let value = match nearest.at(x, y).and_then(|s| edges.get(s.edge as usize)) {
                Some(edge) => {
                    let a = transform.to_raster(edge.start());
                    let b = transform.to_raster(edge.end());
                    edge.inside_flag * segment_distance(texel_center(x, y), a, b) / spread
                }
                None => FAR_DISTANCE,
            };
            values.push(value);
        }
    }
    DistanceField::new(size, values).unwrap_or_else(|| unreachable!("field built with size² values"))
}

/// Seed, flood and encode in sequence.
pub fn distance_field(
    edges: &[Edge],
    transform: RasterTransform,
    size: u32,
    passes: u32,
    spread: f32,
) -> DistanceField {
    let seeds = seed_init(edges, transform, size);
    encode(&propagate(&seeds, passes), edges, transform, spread)
}

/// Distance to the nearest edge over all edges, signed by that edge's flag.
pub fn brute_force(edges: &[Edge], transform: RasterTransform, size: u32, spread: f32) -> DistanceField {
    let segments: Vec<(Vec2, Vec2, f32)> = edges
        .iter()
        .map(|e| (transform.to_raster(e.start()), transform.to_raster(e.end()), e.inside_flag))
        .collect();

    let mut values = Vec::with_capacity((size as usize) * (size as usize));
    for y in 0..size {
        for x in 0..size {
            let p = texel_center(x, y);
            let nearest = segments
                .iter()
                .map(|&(a, b, flag)| (segment_distance(p, a, b), flag))
                .min_by(|l, r| l.0.total_cmp(&r.0));
            values.push(match nearest {
                Some((d, flag)) => flag * d / spread,
                None => FAR_DISTANCE,
            });
        }
    }
    DistanceField::new(size, values).unwrap_or_else(|| unreachable!("field built with size² values"))
}
