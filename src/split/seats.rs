/// Distribute `sites` seed points over rooms in proportion to `sqrt(ratio)`.
///
/// Every room gets at least one seat when `sites >= ratios.len()`.  The
/// rounding remainder is handed out one seat at a time to the room with the
/// fewest seats, or taken from the room with the most.
pub fn allocate_seats(ratios: &[f64], sites: usize) -> Vec<usize> {
    if ratios.is_empty() {
        return Vec::new();
    }
    let weights: Vec<f64> = ratios.iter().map(|r| r.max(0.0).sqrt()).collect();
    let total: f64 = weights.iter().sum();
    let mut seats: Vec<usize> = if total > 0.0 {
        weights.iter().map(|w| (w / total * sites as f64).floor() as usize).collect()
    } else {
        vec![0; ratios.len()]
    };

    if sites >= ratios.len() {
        seats.iter_mut().filter(|s| **s == 0).for_each(|s| *s = 1);
    }

    let mut sum: usize = seats.iter().sum();
    while sum < sites {
        let i = argmin(&seats);
        seats[i] += 1;
        sum += 1;
    }
    while sum > sites {
        let i = argmax(&seats);
        if seats[i] <= 1 {
            break;
        }
        seats[i] -= 1;
        sum -= 1;
    }
    seats
}

fn argmin(values: &[usize]) -> usize {
    values.iter().enumerate().min_by_key(|(_, v)| **v).map_or(0, |(i, _)| i)
}

fn argmax(values: &[usize]) -> usize {
    values.iter().enumerate().max_by_key(|(_, v)| **v).map_or(0, |(i, _)| i)
}
