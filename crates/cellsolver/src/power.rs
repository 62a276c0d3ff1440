use geo::{Coord, Rect};

/// A convex power cell.  Edge `k` runs from `vertices[k]` to
/// `vertices[(k + 1) % n]`; `tags[k]` is the neighbouring site that produced
/// it, or `None` for an edge of the bounding frame.
#[derive(Clone, Debug, Default)]
pub(crate) struct PowerCell {
    pub(crate) vertices: Vec<Coord<f64>>,
    pub(crate) tags: Vec<Option<usize>>,
}

impl PowerCell {
    fn frame(rect: &Rect<f64>) -> Self {
        let (min, max) = (rect.min(), rect.max());
        Self {
            vertices: vec![
                Coord { x: min.x, y: min.y },
                Coord { x: max.x, y: min.y },
                Coord { x: max.x, y: max.y },
                Coord { x: min.x, y: max.y },
            ],
            tags: vec![None; 4],
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.vertices.len() < 3
    }

    /// Keep the half-plane `x·n <= c`, tagging the new edge with `site`.
    fn cut(&mut self, n: Coord<f64>, c: f64, site: usize) {
        let f = |p: Coord<f64>| p.x * n.x + p.y * n.y - c;
        if self.vertices.iter().all(|&p| f(p) <= 0.0) {
            return;
        }

        let len = self.vertices.len();
        let mut vertices = Vec::with_capacity(len + 1);
        let mut tags = Vec::with_capacity(len + 1);
        for k in 0..len {
            let (a, b) = (self.vertices[k], self.vertices[(k + 1) % len]);
            let (fa, fb) = (f(a), f(b));
            let crossing = || {
                let t = fa / (fa - fb);
                Coord { x: a.x + t * (b.x - a.x), y: a.y + t * (b.y - a.y) }
            };
            match (fa <= 0.0, fb <= 0.0) {
                (true, true) => {
                    vertices.push(a);
                    tags.push(self.tags[k]);
                }
                (true, false) => {
                    vertices.push(a);
                    tags.push(self.tags[k]);
                    vertices.push(crossing());
                    tags.push(Some(site));
                }
                (false, true) => {
                    vertices.push(crossing());
                    tags.push(self.tags[k]);
                }
                (false, false) => {}
            }
        }
        self.vertices = vertices;
        self.tags = tags;
    }
}

/// Power cell of site `i` within `frame`.
pub(crate) fn power_cell(i: usize, sites: &[Coord<f64>], weights: &[f64], frame: &Rect<f64>) -> PowerCell {
    let mut cell = PowerCell::frame(frame);
    let p = sites[i];
    let pp = p.x * p.x + p.y * p.y;

    // Nearer sites usually cut more, so process them first.
    let mut order: Vec<usize> = (0..sites.len()).filter(|&j| j != i).collect();
    order.sort_by(|&a, &b| {
        let da = (sites[a].x - p.x).powi(2) + (sites[a].y - p.y).powi(2);
        let db = (sites[b].x - p.x).powi(2) + (sites[b].y - p.y).powi(2);
        da.total_cmp(&db)
    });

    for j in order {
        let q = sites[j];
        let n = Coord { x: q.x - p.x, y: q.y - p.y };
        if n.x == 0.0 && n.y == 0.0 {
            // Coincident sites: the lower index wins the whole cell.
            if j < i {
                cell.vertices.clear();
                cell.tags.clear();
                break;
            }
            continue;
        }
        let c = 0.5 * ((q.x * q.x + q.y * q.y) - pp - weights[j] + weights[i]);
        cell.cut(n, c, j);
        if cell.is_empty() {
            break;
        }
    }
    cell
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::area_centroid;

    fn unit_frame() -> Rect<f64> {
        Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 1.0 })
    }

    #[test]
    fn two_equal_sites_split_in_half() {
        let sites = [Coord { x: 0.25, y: 0.5 }, Coord { x: 0.75, y: 0.5 }];
        let cell = power_cell(0, &sites, &[0.0, 0.0], &unit_frame());
        let (area, centroid) = area_centroid(&cell.vertices);
        assert!((area - 0.5).abs() < 1e-12);
        assert!((centroid.x - 0.25).abs() < 1e-12);
        assert_eq!(cell.tags.iter().filter(|t| **t == Some(1)).count(), 1);
    }

    #[test]
    fn weight_moves_the_bisector() {
        let sites = [Coord { x: 0.25, y: 0.5 }, Coord { x: 0.75, y: 0.5 }];
        let light = power_cell(0, &sites, &[0.0, 0.0], &unit_frame());
        let heavy = power_cell(0, &sites, &[0.1, 0.0], &unit_frame());
        assert!(area_centroid(&heavy.vertices).0 > area_centroid(&light.vertices).0);
    }

    #[test]
    fn coincident_sites_keep_one_cell() {
        let sites = [Coord { x: 0.5, y: 0.5 }, Coord { x: 0.5, y: 0.5 }];
        assert!(!power_cell(0, &sites, &[0.0, 0.0], &unit_frame()).is_empty());
        assert!(power_cell(1, &sites, &[0.0, 0.0], &unit_frame()).is_empty());
    }
}
