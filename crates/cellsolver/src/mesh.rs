use geo::{Coord, LineString, Polygon};
use rstar::{primitives::GeomWithData, RTree};

/// Solver output: a flat polygon mesh.
///
/// Cell `c` is the ring `idx2vtx[cell2idx[c]..cell2idx[c + 1]]` (open,
/// counter-clockwise) and belongs to site `cell2site[c]`.  One site may own
/// several cells when its power cell is cut into pieces by a concave
/// boundary.  A boundary hole that falls inside a single cell becomes an
/// inner ring of that cell: ring `h` is `hidx2vtx[hole2idx[h]..hole2idx[h + 1]]`
/// and belongs to cell `hole2cell[h]`.  `wall2vtx` lists the edges separating
/// cells of different rooms.
#[derive(Clone, Debug, Default)]
pub struct CellMesh {
    pub vtx2xy: Vec<Coord<f64>>,
    pub cell2idx: Vec<usize>,
    pub idx2vtx: Vec<usize>,
    pub cell2site: Vec<usize>,
    pub hole2idx: Vec<usize>,
    pub hidx2vtx: Vec<usize>,
    pub hole2cell: Vec<usize>,
    pub wall2vtx: Vec<[usize; 2]>,
    /// Final site positions.
    pub site2xy: Vec<Coord<f64>>,
    /// Achieved area per room.
    pub room_area: Vec<f64>,
    /// Number of optimizer iterations performed.
    pub iterations: usize,
}

impl CellMesh {
    /// Number of cells.
    pub fn num_cells(&self) -> usize {
        self.cell2site.len()
    }

    /// Vertex ids of cell `c`.
    pub fn cell(&self, c: usize) -> &[usize] {
        &self.idx2vtx[self.cell2idx[c]..self.cell2idx[c + 1]]
    }

    /// Inner rings of cell `c`.
    pub fn cell_holes(&self, c: usize) -> impl Iterator<Item = &[usize]> + '_ {
        self.hole2cell
            .iter()
            .enumerate()
            .filter(move |&(_, &cell)| cell == c)
            .map(|(h, _)| &self.hidx2vtx[self.hole2idx[h]..self.hole2idx[h + 1]])
    }

    /// Cell `c` as a closed polygon, inner rings included.
    pub fn cell_polygon(&self, c: usize) -> Polygon<f64> {
        let ring = |ids: &[usize]| LineString::from(ids.iter().map(|&v| self.vtx2xy[v]).collect::<Vec<_>>());
        Polygon::new(ring(self.cell(c)), self.cell_holes(c).map(ring).collect())
    }

    /// Wall `w` as a pair of coordinates.
    pub fn wall(&self, w: usize) -> (Coord<f64>, Coord<f64>) {
        let [a, b] = self.wall2vtx[w];
        (self.vtx2xy[a], self.vtx2xy[b])
    }
}

/// Deduplicates vertices closer than `tolerance`, so that edges shared by
/// neighbouring cells reference the same vertex ids.
pub(crate) struct VertexPool {
    tree: RTree<GeomWithData<[f64; 2], usize>>,
    coords: Vec<Coord<f64>>,
    tolerance2: f64,
}

impl VertexPool {
    pub(crate) fn new(tolerance: f64) -> Self {
        Self { tree: RTree::new(), coords: Vec::new(), tolerance2: tolerance * tolerance }
    }

    pub(crate) fn insert(&mut self, c: Coord<f64>) -> usize {
        if let Some(hit) = self.tree.locate_within_distance([c.x, c.y], self.tolerance2).next() {
            return hit.data;
        }
        let id = self.coords.len();
        self.coords.push(c);
        self.tree.insert(GeomWithData::new([c.x, c.y], id));
        id
    }

    pub(crate) fn into_coords(self) -> Vec<Coord<f64>> {
        self.coords
    }
}

#[derive(Default)]
pub(crate) struct MeshBuilder {
    cell2idx: Vec<usize>,
    idx2vtx: Vec<usize>,
    cell2site: Vec<usize>,
    hole2idx: Vec<usize>,
    hidx2vtx: Vec<usize>,
    hole2cell: Vec<usize>,
    wall2vtx: Vec<[usize; 2]>,
}

/// Snap a ring into the pool; consecutive duplicates collapse.  `None` when
/// fewer than three distinct vertices remain.
fn snap_ring(pool: &mut VertexPool, ring: &[Coord<f64>]) -> Option<Vec<usize>> {
    let mut ids: Vec<usize> = Vec::with_capacity(ring.len());
    for &c in ring {
        let id = pool.insert(c);
        if ids.last() != Some(&id) {
            ids.push(id);
        }
    }
    while ids.len() > 1 && ids.first() == ids.last() {
        ids.pop();
    }
    (ids.len() >= 3).then_some(ids)
}

impl MeshBuilder {
    pub(crate) fn new() -> Self {
        Self { cell2idx: vec![0], hole2idx: vec![0], ..Default::default() }
    }

    /// Add a cell ring and return its index.
    pub(crate) fn push_cell(&mut self, pool: &mut VertexPool, site: usize, ring: &[Coord<f64>]) -> Option<usize> {
        let ids = snap_ring(pool, ring)?;
        self.idx2vtx.extend(ids);
        self.cell2idx.push(self.idx2vtx.len());
        self.cell2site.push(site);
        Some(self.cell2site.len() - 1)
    }

    /// Add an inner ring to `cell`.
    pub(crate) fn push_hole(&mut self, pool: &mut VertexPool, cell: usize, ring: &[Coord<f64>]) {
        if let Some(ids) = snap_ring(pool, ring) {
            self.hidx2vtx.extend(ids);
            self.hole2idx.push(self.hidx2vtx.len());
            self.hole2cell.push(cell);
        }
    }

    pub(crate) fn push_wall(&mut self, pool: &mut VertexPool, a: Coord<f64>, b: Coord<f64>) {
        let (ia, ib) = (pool.insert(a), pool.insert(b));
        if ia != ib {
            self.wall2vtx.push([ia.min(ib), ia.max(ib)]);
        }
    }

    pub(crate) fn finish(mut self, pool: VertexPool) -> CellMesh {
        self.wall2vtx.sort_unstable();
        self.wall2vtx.dedup();
        CellMesh {
            vtx2xy: pool.into_coords(),
            cell2idx: self.cell2idx,
            idx2vtx: self.idx2vtx,
            cell2site: self.cell2site,
            hole2idx: self.hole2idx,
            hidx2vtx: self.hidx2vtx,
            hole2cell: self.hole2cell,
            wall2vtx: self.wall2vtx,
            ..Default::default()
        }
    }
}
