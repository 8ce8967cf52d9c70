use crate::stats::CommunityStats;
use crate::{Clustering, Network};
use rayon::prelude::*;

/// Entropy contribution of one community of a two-level encoding:
///
/// `-(cut/VOL) * log2(volume/VOL) + (volume/VOL) * log2(volume) - dlog2d_sum/VOL`
///
/// Communities (or networks) with no volume contribute nothing, so the logarithms
/// are never taken of zero.
pub fn community_entropy(volume: f64, cut: f64, dlog2d_sum: f64, total_volume: f64) -> f64 {
    if volume <= 0.0 || total_volume <= 0.0 {
        return 0.0;
    }

    let p = volume / total_volume;
    -(cut / total_volume) * p.log2() + p * volume.log2() - dlog2d_sum / total_volume
}

/// Two-dimensional structural entropy of `clustering` on `graph`, computed from scratch.
/// Lower is better. Defined as zero for a network without edge weight.
pub fn structural_entropy(graph: &Network, clustering: &impl Clustering) -> f64 {
    CommunityStats::from_clustering(graph, clustering).total_entropy()
}

/// Two-dimensional structural entropy of a network clustering.
/// Computed using parallelization; agrees with `structural_entropy` up to rounding.
pub fn par_structural_entropy<C: Clustering + Sync>(graph: &Network, clustering: &C) -> f64 {
    let total_volume = graph.total_volume();
    if total_volume <= 0.0 {
        return 0.0;
    }

    let num_clusters = clustering.num_clusters();

    // Create a number of chunks that is large relative to typical thread-counts
    let chunk_size = std::cmp::max(1, ((graph.nodes() as f64) / 64.0) as usize);
    let chunk_sums = (0..graph.nodes())
        .collect::<Vec<usize>>()
        .par_chunks(chunk_size)
        .map(|nodes| {
            // (volume, cut, dlog2d) per cluster
            let mut sums = vec![(0f64, 0f64, 0f64); num_clusters];
            for &i in nodes {
                let c_i = clustering.get(i);
                let entry = &mut sums[c_i];
                entry.0 += graph.degree(i);
                entry.2 += graph.weight(i);
                for (j, w) in graph.neighbors(i) {
                    if clustering.get(j) != c_i {
                        sums[c_i].1 += w;
                    }
                }
            }
            sums
        })
        .collect::<Vec<_>>();

    // Reduce serially to ensure deterministic order of adds
    let mut totals = vec![(0f64, 0f64, 0f64); num_clusters];
    for sums in chunk_sums {
        for (t, s) in totals.iter_mut().zip(sums) {
            t.0 += s.0;
            t.1 += s.1;
            t.2 += s.2;
        }
    }

    totals
        .into_iter()
        .map(|(volume, cut, dlog2d)| community_entropy(volume, cut, dlog2d, total_volume))
        .sum()
}

/// One-dimensional structural entropy: the Shannon entropy of the stationary
/// distribution `d_v / VOL` of a random walk on the network.
pub fn one_dimensional_entropy(graph: &Network) -> f64 {
    let total_volume = graph.total_volume();
    if total_volume <= 0.0 {
        return 0.0;
    }

    (0..graph.nodes())
        .map(|i| graph.degree(i) / total_volume)
        .filter(|&p| p > 0.0)
        .map(|p| -p * p.log2())
        .sum()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::SimpleClustering;
    use approx::assert_relative_eq;

    fn star() -> Network {
        Network::from_edges(5, (1..5).map(|leaf| (0, leaf, 1.0))).unwrap()
    }

    #[test]
    fn test_star_single_community() {
        let n = star();
        let c = SimpleClustering::init_same_cluster(5);
        // 1 + 0.5 * log2(4)
        assert_relative_eq!(structural_entropy(&n, &c), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_complete_graph_single_community() {
        let edges = (0..4).flat_map(|i| ((i + 1)..4).map(move |j| (i, j, 1.0)));
        let n = Network::from_edges(4, edges).unwrap();
        let c = SimpleClustering::init_same_cluster(4);
        assert_relative_eq!(structural_entropy(&n, &c), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_singletons_equal_one_dimensional() {
        let n = star();
        let c = SimpleClustering::init_different_clusters(5);
        assert_relative_eq!(structural_entropy(&n, &c), one_dimensional_entropy(&n), epsilon = 1e-12);
        assert_relative_eq!(one_dimensional_entropy(&n), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_parallel_matches_serial() {
        let n = star();
        let c = SimpleClustering::new_from_labels(&[0, 0, 0, 1, 1]);
        assert_relative_eq!(par_structural_entropy(&n, &c), structural_entropy(&n, &c), epsilon = 1e-12);
    }

    #[test]
    fn test_zero_volume() {
        assert_eq!(community_entropy(0.0, 0.0, 0.0, 10.0), 0.0);
        let n = Network::from_edges(3, std::iter::empty()).unwrap();
        let c = SimpleClustering::init_different_clusters(3);
        assert_eq!(structural_entropy(&n, &c), 0.0);
        assert_eq!(par_structural_entropy(&n, &c), 0.0);
        assert_eq!(one_dimensional_entropy(&n), 0.0);
    }
}
