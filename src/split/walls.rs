use ahash::AHashMap;
use geo::{Coord, Line, LineString};
use smallvec::SmallVec;

type Key = (u64, u64);

#[inline]
fn key(c: Coord<f64>) -> Key {
    (c.x.to_bits(), c.y.to_bits())
}

/// Join wall segments that meet end to end into polylines.
///
/// A chain runs until it reaches a junction (three or more walls), a dead
/// end, or closes on itself.  Endpoints must match exactly.
pub fn chain_walls(walls: &[Line<f64>]) -> Vec<LineString<f64>> {
    let mut incident: AHashMap<Key, SmallVec<[usize; 4]>> = AHashMap::new();
    for (i, wall) in walls.iter().enumerate() {
        if key(wall.start) == key(wall.end) {
            continue;
        }
        incident.entry(key(wall.start)).or_default().push(i);
        incident.entry(key(wall.end)).or_default().push(i);
    }
    let degree = |c: Coord<f64>| incident.get(&key(c)).map_or(0, |e| e.len());

    let mut used: Vec<bool> = walls.iter().map(|w| key(w.start) == key(w.end)).collect();
    let mut chains = Vec::new();

    for i in 0..walls.len() {
        if used[i] {
            continue;
        }
        let wall = walls[i];
        if degree(wall.start) != 2 {
            chains.push(walk(walls, &incident, &mut used, i, wall.start));
        } else if degree(wall.end) != 2 {
            chains.push(walk(walls, &incident, &mut used, i, wall.end));
        }
    }
    // what remains are closed loops
    for i in 0..walls.len() {
        if !used[i] {
            chains.push(walk(walls, &incident, &mut used, i, walls[i].start));
        }
    }
    chains
}

fn walk(
    walls: &[Line<f64>],
    incident: &AHashMap<Key, SmallVec<[usize; 4]>>,
    used: &mut [bool],
    first: usize,
    from: Coord<f64>,
) -> LineString<f64> {
    let mut coords = vec![from];
    let (mut current, mut at) = (first, from);
    loop {
        used[current] = true;
        let wall = walls[current];
        at = if key(wall.start) == key(at) { wall.end } else { wall.start };
        coords.push(at);

        let Some(edges) = incident.get(&key(at)) else { break };
        if edges.len() != 2 {
            break;
        }
        match edges.iter().find(|&&e| !used[e]) {
            Some(&next) => current = next,
            None => break,
        }
    }
    LineString::new(coords)
}
