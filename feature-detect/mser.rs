//! Maximally stable extremal regions.
//!
//! Pixels are flooded in increasing intensity order with a union-find; every
//! gray level at which a component grows or merges becomes a node of the
//! component tree. Stable nodes are those whose area changes least over
//! `delta` further levels.

use feature_core::{Raster, Region, RegionDetector};
use log::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const UNSET: u32 = u32::MAX;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MserDetector {
    pub delta: u8,
    pub min_area: usize,
    pub max_area: usize,
    pub max_variation: f32,
    pub min_diversity: f32,
}

impl Default for MserDetector {
    fn default() -> Self {
        Self {
            delta: 5,
            min_area: 60,
            max_area: 14400,
            max_variation: 0.25,
            min_diversity: 0.2,
        }
    }
}

#[derive(Debug)]
struct Node {
    level: u8,
    area: usize,
    parent: Option<usize>,
    children: Vec<usize>,
    /// Pixels that joined the component at this level
    own: Vec<u32>,
}

fn find(parent: &mut [u32], mut x: u32) -> u32 {
    while parent[x as usize] != x {
        let grand = parent[parent[x as usize] as usize];
        parent[x as usize] = grand;
        x = grand;
    }
    x
}

/// Component tree of the dark-to-bright flooding of `img`
fn component_tree(img: &Raster) -> Vec<Node> {
    let (w, h) = img.dimensions();
    let n = w * h;
    let mut buckets: Vec<Vec<u32>> = vec![Vec::new(); 256];
    for (i, &v) in img.data().iter().enumerate() {
        buckets[v as usize].push(i as u32);
    }

    let mut parent = vec![UNSET; n];
    let mut size = vec![0usize; n];
    let mut node_of: Vec<Option<usize>> = vec![None; n];
    let mut pending: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut stamp = vec![u16::MAX; n];
    let mut nodes: Vec<Node> = Vec::new();

    for (level, bucket) in buckets.iter().enumerate() {
        if bucket.is_empty() {
            continue;
        }
        for &p in bucket {
            parent[p as usize] = p;
            size[p as usize] = 1;

            let (x, y) = (p as usize % w, p as usize / w);
            let mut neighbours = [UNSET; 4];
            if x > 0 {
                neighbours[0] = p - 1;
            }
            if x + 1 < w {
                neighbours[1] = p + 1;
            }
            if y > 0 {
                neighbours[2] = p - w as u32;
            }
            if y + 1 < h {
                neighbours[3] = p + w as u32;
            }

            for q in neighbours {
                if q == UNSET || parent[q as usize] == UNSET {
                    continue;
                }
                let rp = find(&mut parent, p);
                let rq = find(&mut parent, q);
                if rp == rq {
                    continue;
                }
                for r in [rp, rq] {
                    if let Some(node) = node_of[r as usize].take() {
                        pending[r as usize].push(node);
                    }
                }
                let (big, small) = if size[rp as usize] >= size[rq as usize] { (rp, rq) } else { (rq, rp) };
                parent[small as usize] = big;
                size[big as usize] += size[small as usize];
                let moved = std::mem::take(&mut pending[small as usize]);
                pending[big as usize].extend(moved);
            }
        }

        for &p in bucket {
            let r = find(&mut parent, p) as usize;
            if stamp[r] != level as u16 {
                stamp[r] = level as u16;
                if let Some(node) = node_of[r].take() {
                    pending[r].push(node);
                }
                let idx = nodes.len();
                let children = std::mem::take(&mut pending[r]);
                for &c in &children {
                    nodes[c].parent = Some(idx);
                }
                nodes.push(Node {
                    level: level as u8,
                    area: size[r],
                    parent: None,
                    children,
                    own: Vec::new(),
                });
                node_of[r] = Some(idx);
            }
            if let Some(idx) = node_of[r] {
                nodes[idx].own.push(p);
            }
        }
    }
    nodes
}

impl MserDetector {
    /// Relative area growth over the next `delta` gray levels
    fn variation(&self, nodes: &[Node], i: usize) -> f32 {
        let target = nodes[i].level as u16 + self.delta as u16;
        let mut j = i;
        while let Some(p) = nodes[j].parent {
            if nodes[p].level as u16 > target {
                break;
            }
            j = p;
        }
        (nodes[j].area - nodes[i].area) as f32 / nodes[i].area as f32
    }

    fn stable_nodes(&self, nodes: &[Node]) -> Vec<usize> {
        let variations: Vec<f32> = (0..nodes.len()).map(|i| self.variation(nodes, i)).collect();

        let mut candidates: Vec<usize> = (0..nodes.len())
            .filter(|&i| {
                let node = &nodes[i];
                let Some(parent) = node.parent else {
                    // the whole image
                    return false;
                };
                let v = variations[i];
                node.area >= self.min_area
                    && node.area <= self.max_area
                    && v <= self.max_variation
                    && (nodes[parent].parent.is_none() || v < variations[parent])
                    && node.children.iter().all(|&c| v <= variations[c])
            })
            .collect();
        candidates.sort_by_key(|&i| nodes[i].area);

        let mut kept = vec![false; nodes.len()];
        for &i in &candidates {
            kept[i] = true;
        }
        for &i in &candidates {
            if !kept[i] {
                continue;
            }
            let mut ancestor = nodes[i].parent;
            while let Some(a) = ancestor {
                if kept[a] {
                    let diversity = (nodes[a].area - nodes[i].area) as f32 / nodes[a].area as f32;
                    if diversity < self.min_diversity {
                        if variations[i] < variations[a] {
                            kept[a] = false;
                        } else {
                            kept[i] = false;
                        }
                    }
                    break;
                }
                ancestor = nodes[a].parent;
            }
        }
        candidates.into_iter().filter(|&i| kept[i]).collect()
    }

    fn regions_of(&self, img: &Raster) -> Vec<Region> {
        let nodes = component_tree(img);
        let w = img.width() as u32;

        self.stable_nodes(&nodes)
            .into_iter()
            .map(|i| {
                let mut points = Vec::with_capacity(nodes[i].area);
                let mut stack = vec![i];
                while let Some(j) = stack.pop() {
                    points.extend(nodes[j].own.iter().map(|&p| (p % w, p / w)));
                    stack.extend(&nodes[j].children);
                }
                Region::new(points)
            })
            .collect()
    }
}

impl RegionDetector for MserDetector {
    fn name(&self) -> &'static str {
        "MSER"
    }

    fn detect_regions(&self, image: &Raster) -> Vec<Region> {
        let mut regions = self.regions_of(image);
        let bright = self.regions_of(&image.inverted());
        debug!("MSER: {} dark and {} bright regions", regions.len(), bright.len());
        regions.extend(bright);
        regions
    }
}
