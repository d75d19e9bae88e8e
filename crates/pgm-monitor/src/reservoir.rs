use pgm_core::Rng;

/// Selects `k` of `n` weighted indices via the Efraimidis–Spirakis A-ExpJ algorithm,
/// backing the `cache_fraction` parameter of `extract_pdf` (§6): rather than materializing
/// every particle's value into the histogram, a monitor can cache a weighted subsample and
/// build the density estimate from that instead.
///
/// Every index gets a key `u_i^(1/w_i)` for `u_i ~ U(0,1)`; the `k` largest keys win. A
/// zero-weight index can never win (its key collapses to 0), matching the resampling
/// convention elsewhere in this crate that zero-weight particles are never selected.
pub fn weighted_sample_indices(weights: &[f64], k: usize, rng: &mut Rng) -> Vec<usize> {
    if k >= weights.len() {
        return (0..weights.len()).collect();
    }
    let mut keyed: Vec<(f64, usize)> = weights
        .iter()
        .enumerate()
        .map(|(i, &w)| {
            let key = if w > 0.0 { rng.unit().powf(1.0 / w) } else { 0.0 };
            (key, i)
        })
        .collect();
    keyed.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap());
    keyed.truncate(k);
    keyed.into_iter().map(|(_, i)| i).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requesting_all_or_more_returns_every_index() {
        let mut rng = Rng::from_seed(1);
        let weights = [1.0, 1.0, 1.0];
        let picked = weighted_sample_indices(&weights, 5, &mut rng);
        assert_eq!(picked.len(), 3);
    }

    #[test]
    fn subsample_has_requested_size_and_no_duplicates() {
        let mut rng = Rng::from_seed(2);
        let weights = vec![1.0; 20];
        let picked = weighted_sample_indices(&weights, 7, &mut rng);
        assert_eq!(picked.len(), 7);
        let mut sorted = picked.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), 7);
    }

    #[test]
    fn zero_weight_indices_are_never_selected() {
        let mut rng = Rng::from_seed(3);
        let mut weights = vec![0.0; 10];
        weights[3] = 1.0;
        weights[7] = 1.0;
        let picked = weighted_sample_indices(&weights, 2, &mut rng);
        assert!(picked.contains(&3));
        assert!(picked.contains(&7));
    }
}
