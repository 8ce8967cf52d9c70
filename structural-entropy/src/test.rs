use crate::budget::{Budget, NeverCancel};
use crate::exhaustive::Exhaustive;
use crate::greedy::{GreedyMerge, GreedyOptions};
use crate::local_moving::{LocalMoving, MoveState, DEFAULT_EPSILON};
use crate::louvain::{Louvain, LouvainOptions};
use crate::objective::{one_dimensional_entropy, par_structural_entropy, structural_entropy};
use crate::{
    run_greedy_merge, run_local_search, total_entropy, Clustering, Error, LabeledNetworkBuilder, Method,
    Network, NetworkBuilder, SimpleClustering,
};
use approx::assert_relative_eq;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Generate a random network with `num_clusters` planted blocks of `nodes_per_cluster` nodes.
/// Node pairs inside a block are joined with probability `p_in`, other pairs with `p_out`.
/// A light ring through all nodes keeps the network connected.
fn gen_planted_network(
    rng: &mut impl Rng,
    num_clusters: usize,
    nodes_per_cluster: usize,
    p_in: f64,
    p_out: f64,
) -> (Network, SimpleClustering) {
    let total_nodes = num_clusters * nodes_per_cluster;
    let labels: Vec<usize> = (0..total_nodes).map(|i| i / nodes_per_cluster).collect();
    let true_clusters = SimpleClustering::new_from_labels(&labels);

    let mut builder = NetworkBuilder::new(total_nodes);
    for i in 0..total_nodes {
        for j in (i + 1)..total_nodes {
            let p = if labels[i] == labels[j] { p_in } else { p_out };
            if rng.gen_bool(p) {
                builder.add_edge(i, j, rng.gen_range(1.0..5.0)).unwrap();
            }
        }
        builder.add_edge(i, (i + 1) % total_nodes, 0.1).unwrap();
    }

    (builder.build().unwrap(), true_clusters)
}

/// Two heavy triangles joined by a single light edge.
fn two_triangles() -> Network {
    Network::from_edges(
        5,
        [(0, 1, 10.0), (1, 2, 10.0), (0, 2, 10.0), (3, 4, 10.0), (2, 3, 1.0)],
    )
    .unwrap()
}

fn check_partition(n: &Network, c: &SimpleClustering) {
    assert_eq!(c.nodes(), n.nodes());
    let sizes = c.cluster_sizes();
    assert_eq!(sizes.len(), c.num_clusters());
    assert!(sizes.iter().all(|&s| s > 0), "empty community in {sizes:?}");
    assert_eq!(sizes.iter().sum::<usize>(), n.nodes());
}

#[test]
fn two_triangles_optimizers_agree() {
    let n = two_triangles();
    let (best, best_entropy) = Exhaustive.solve(&n).unwrap();
    assert_relative_eq!(best_entropy, 1.463620418181125, epsilon = 1e-12);

    let louvain = run_local_search(&n).unwrap();
    insta::assert_debug_snapshot!(louvain.labels(), @r"
    [
        0,
        0,
        0,
        1,
        1,
    ]
    ");
    assert_eq!(louvain, best);

    let greedy = run_greedy_merge(&n, Some(2)).unwrap();
    assert_eq!(greedy.num_clusters(), 2);
    assert_eq!(greedy.get(0), greedy.get(1));
    assert_eq!(greedy.get(0), greedy.get(2));
    assert_eq!(greedy.get(3), greedy.get(4));
    assert_ne!(greedy.get(2), greedy.get(3));
    assert_relative_eq!(structural_entropy(&n, &greedy), best_entropy, epsilon = 1e-12);
}

#[test]
fn single_community_is_one_dimensional_entropy() {
    let star = Network::from_edges(5, (1..5).map(|leaf| (0, leaf, 1.0))).unwrap();
    let k4 = Network::from_edges(4, (0..4).flat_map(|i| ((i + 1)..4).map(move |j| (i, j, 1.0)))).unwrap();

    for n in [star, k4] {
        let whole = SimpleClustering::init_same_cluster(n.nodes());
        assert_relative_eq!(structural_entropy(&n, &whole), 2.0, epsilon = 1e-12);
        assert_relative_eq!(one_dimensional_entropy(&n), 2.0, epsilon = 1e-12);
    }
}

#[test]
fn greedy_cannot_join_components() {
    let n = Network::from_edges(4, [(0, 1, 1.0), (2, 3, 1.0)]).unwrap();
    let c = run_greedy_merge(&n, None).unwrap();
    assert_eq!(c.num_clusters(), 2);
    assert_eq!(c.get(0), c.get(1));
    assert_eq!(c.get(2), c.get(3));
    assert_relative_eq!(total_entropy(&n, &c).unwrap(), 1.0, epsilon = 1e-12);
}

#[test]
fn planted_partition() -> anyhow::Result<()> {
    let mut rng = ChaCha20Rng::seed_from_u64(0);
    let (n, truth) = gen_planted_network(&mut rng, 4, 12, 0.7, 0.02);

    let truth_entropy = total_entropy(&n, &truth)?;
    let singletons = total_entropy(&n, &SimpleClustering::init_different_clusters(n.nodes()))?;

    let louvain = run_local_search(&n)?;
    check_partition(&n, &louvain);
    let louvain_entropy = total_entropy(&n, &louvain)?;
    assert!(louvain_entropy < singletons);
    // local search may stop slightly above the planted partition
    assert!(louvain_entropy < 1.02 * truth_entropy);

    for k in 1..=6 {
        let greedy = run_greedy_merge(&n, Some(k))?;
        check_partition(&n, &greedy);
        assert_eq!(greedy.num_clusters(), k);
    }

    assert_relative_eq!(
        par_structural_entropy(&n, &louvain),
        louvain_entropy,
        max_relative = 1e-12
    );
    Ok(())
}

#[test]
fn heuristics_never_beat_exhaustive() -> anyhow::Result<()> {
    let mut rng = ChaCha20Rng::seed_from_u64(7);
    for _ in 0..5 {
        let (n, _) = gen_planted_network(&mut rng, 2, 4, 0.8, 0.2);
        let (_, best) = Exhaustive.solve(&n)?;

        for method in [
            Method::default(),
            Method::Greedy(GreedyOptions {
                stop_on_no_gain: true,
                ..GreedyOptions::default()
            }),
        ] {
            let c = method.run(&n)?;
            check_partition(&n, &c);
            assert!(total_entropy(&n, &c)? >= best - 1e-9);
        }
    }
    Ok(())
}

#[test]
fn moves_are_evaluated_exactly() {
    let mut rng = ChaCha20Rng::seed_from_u64(3);
    let (n, _) = gen_planted_network(&mut rng, 3, 6, 0.6, 0.1);
    let mut c = SimpleClustering::init_different_clusters(n.nodes());
    let mut state = MoveState::new(&n, &mut c);

    for _ in 0..200 {
        let node = rng.gen_range(0..n.nodes());
        let neighbors: Vec<usize> = n.neighbors(node).map(|(j, _)| j).collect();
        let target = state.clustering().get(neighbors[rng.gen_range(0..neighbors.len())]);

        let before = state.total_entropy();
        let delta = state.evaluate_move(node, target);
        state.apply_move(node, target);

        let after = structural_entropy(&n, state.clustering());
        assert_relative_eq!(state.total_entropy(), after, epsilon = 1e-9);
        assert_relative_eq!(before + delta, after, epsilon = 1e-9);

        // volume and membership are conserved
        let stats = state.stats();
        let volume: f64 = stats.active_communities().map(|k| stats.record(k).volume).sum();
        let size: usize = stats.active_communities().map(|k| stats.record(k).size).sum();
        assert_relative_eq!(volume, n.total_volume(), epsilon = 1e-9);
        assert_eq!(size, n.nodes());
    }
}

#[test]
fn converged_pass_is_fixed_point() {
    let mut rng = ChaCha20Rng::seed_from_u64(11);
    let (n, _) = gen_planted_network(&mut rng, 3, 10, 0.5, 0.05);

    let mut local_moving = LocalMoving::new(DEFAULT_EPSILON, None, Budget::unlimited());
    let mut c = SimpleClustering::init_different_clusters(n.nodes());
    assert!(local_moving.iterate(&n, &mut c, &NeverCancel).unwrap());

    let converged = c.clone();
    assert!(!local_moving.iterate(&n, &mut c, &NeverCancel).unwrap());
    assert_eq!(c, converged);

    // warm-starting from a local optimum changes nothing
    let mut louvain = Louvain::default();
    assert!(!louvain.iterate(&n, &mut c).unwrap());
    assert_eq!(c, converged);

    let triangles = two_triangles();
    let mut best = run_local_search(&triangles).unwrap();
    let before = best.clone();
    assert!(!louvain.iterate(&triangles, &mut best).unwrap());
    assert_eq!(best, before);

    // rerunning the multi-level optimizer reproduces its result
    let a = Louvain::new(LouvainOptions::default()).run(&n).unwrap();
    let b = Louvain::new(LouvainOptions::default()).run(&n).unwrap();
    assert_eq!(a, b);
}

#[test]
fn greedy_steps_track_entropy() {
    let mut rng = ChaCha20Rng::seed_from_u64(5);
    let (n, _) = gen_planted_network(&mut rng, 3, 5, 0.7, 0.05);

    let mut greedy = GreedyMerge::new(GreedyOptions {
        target_communities: Some(3),
        ..GreedyOptions::default()
    });
    let (c, steps) = greedy.run_dendrogram(&n, &NeverCancel).unwrap();
    assert_eq!(steps.len(), n.nodes() - 3);

    let start = structural_entropy(&n, &SimpleClustering::init_different_clusters(n.nodes()));
    let total_delta: f64 = steps.iter().map(|s| s.delta).sum();
    assert_relative_eq!(start + total_delta, structural_entropy(&n, &c), epsilon = 1e-9);
}

#[test]
fn empty_and_degenerate_networks() {
    let empty = Network::from_edges(0, std::iter::empty()).unwrap();
    assert_eq!(run_local_search(&empty), Err(Error::EmptyGraph));
    assert_eq!(run_greedy_merge(&empty, None), Err(Error::EmptyGraph));
    assert_eq!(
        total_entropy(&empty, &SimpleClustering::init_same_cluster(0)),
        Err(Error::EmptyGraph)
    );

    let zero = Network::from_edges(3, [(0, 1, 0.0), (1, 2, 0.0)]).unwrap();
    assert_eq!(zero.total_volume(), 0.0);
    for c in [run_local_search(&zero).unwrap(), run_greedy_merge(&zero, Some(1)).unwrap()] {
        assert_eq!(c.labels(), &[0, 1, 2]);
        assert_eq!(total_entropy(&zero, &c).unwrap(), 0.0);
    }
}

#[test]
fn invalid_arguments() {
    let n = two_triangles();
    assert_eq!(
        run_greedy_merge(&n, Some(0)),
        Err(Error::InvalidTargetCommunities { requested: 0, nodes: 5 })
    );
    assert_eq!(
        run_greedy_merge(&n, Some(6)),
        Err(Error::InvalidTargetCommunities { requested: 6, nodes: 5 })
    );
    assert_eq!(
        total_entropy(&n, &SimpleClustering::init_same_cluster(4)),
        Err(Error::LabelCountMismatch { labels: 4, nodes: 5 })
    );
}

#[test]
fn labeled_network_round_trip() -> anyhow::Result<()> {
    let mut builder = LabeledNetworkBuilder::new();
    for (a, b) in [("a", "b"), ("b", "c"), ("a", "c"), ("d", "e")] {
        builder.add_edge(a, b, 10.0);
    }
    builder.add_edge("c", "d", 1.0);
    let labeled = builder.build()?;

    let c = run_local_search(labeled.network())?;
    let partition = labeled.partition_map(&c)?;
    assert_eq!(partition["a"], partition["b"]);
    assert_eq!(partition["a"], partition["c"]);
    assert_eq!(partition["d"], partition["e"]);
    assert_ne!(partition["a"], partition["d"]);

    let back: SimpleClustering = labeled.clustering(&partition)?;
    assert_eq!(back, c);
    Ok(())
}
