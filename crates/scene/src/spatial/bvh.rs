use foundation::bounds::Aabb2;
use foundation::math::precision::stable_total_cmp_f64;

/// A deterministic bounding volume hierarchy (BVH) over `Aabb2` items.
///
/// Items carry a caller-defined `id` (typically an index into a side table).
///
/// Ordering contract:
/// - `query_aabb` returns ids in ascending order, without duplicates.
#[derive(Debug, Clone, Default)]
pub struct Bvh {
    nodes: Vec<Node>,
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        bounds: Aabb2,
        items: Vec<Item>,
    },
    Internal {
        bounds: Aabb2,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Item {
    pub id: usize,
    pub bounds: Aabb2,
}

impl Bvh {
    pub fn build(items: Vec<Item>) -> Self {
        let mut nodes = Vec::new();
        let mut items = items;
        if !items.is_empty() {
            let _root = build_node(&mut nodes, &mut items);
        }
        Self { nodes }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Query the BVH for items that intersect `query`.
    pub fn query_aabb(&self, query: &Aabb2) -> Vec<usize> {
        let mut hits: Vec<usize> = Vec::new();
        self.collect_aabb(query, &mut hits);
        hits.sort_unstable();
        hits.dedup();
        hits
    }

    /// Appends ids intersecting `query` to `out`, unsorted.
    pub fn collect_aabb(&self, query: &Aabb2, out: &mut Vec<usize>) {
        if self.nodes.is_empty() {
            return;
        }

        let mut stack: Vec<usize> = vec![0];
        while let Some(idx) = stack.pop() {
            match &self.nodes[idx] {
                Node::Leaf { bounds, items } => {
                    if !bounds.intersects(query) {
                        continue;
                    }
                    for item in items {
                        if item.bounds.intersects(query) {
                            out.push(item.id);
                        }
                    }
                }
                Node::Internal {
                    bounds,
                    left,
                    right,
                } => {
                    if !bounds.intersects(query) {
                        continue;
                    }
                    stack.push(*right);
                    stack.push(*left);
                }
            }
        }
    }
}

const LEAF_MAX: usize = 8;

fn build_node(nodes: &mut Vec<Node>, items: &mut [Item]) -> usize {
    let bounds = bounds_for_items(items);
    if items.len() <= LEAF_MAX {
        let idx = nodes.len();
        nodes.push(Node::Leaf {
            bounds,
            items: items.to_vec(),
        });
        return idx;
    }

    let axis = split_axis(&bounds);
    items.sort_by(|a, b| {
        let ca = a.bounds.center()[axis];
        let cb = b.bounds.center()[axis];
        stable_total_cmp_f64(ca, cb).then_with(|| a.id.cmp(&b.id))
    });

    let mid = items.len() / 2;
    let (left_items, right_items) = items.split_at_mut(mid);

    let idx = nodes.len();
    // Placeholder; will patch after children are built.
    nodes.push(Node::Leaf {
        bounds,
        items: Vec::new(),
    });

    let left = build_node(nodes, left_items);
    let right = build_node(nodes, right_items);

    nodes[idx] = Node::Internal {
        bounds,
        left,
        right,
    };
    idx
}

fn split_axis(bounds: &Aabb2) -> usize {
    // Deterministic tie-break: prefer X.
    if bounds.extent(0) >= bounds.extent(1) {
        0
    } else {
        1
    }
}

fn bounds_for_items(items: &[Item]) -> Aabb2 {
    let mut b = items[0].bounds;
    for item in &items[1..] {
        b = b.union(&item.bounds);
    }
    b
}
