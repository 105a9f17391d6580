use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::broad::{DynamicTree, ProxyId};
use crate::foundation::logging;
use crate::foundation::math::{vec2, Vec2};
use crate::geometry::aabb::AABB;
use crate::geometry::cast::RayCastInput;

fn random_box(rng: &mut StdRng) -> AABB {
    let lower = vec2(rng.gen_range(-50.0..50.0), rng.gen_range(-50.0..50.0));
    let size = vec2(rng.gen_range(0.1..4.0), rng.gen_range(0.1..4.0));
    AABB::new(lower, lower + size)
}

// Randomly create, destroy, move and enlarge proxies
fn churn(rng: &mut StdRng, tree: &mut DynamicTree, live: &mut Vec<ProxyId>, steps: usize) {
    for step in 0..steps {
        let roll: f32 = rng.gen();
        if live.is_empty() || roll < 0.4 {
            let category = 1u64 << rng.gen_range(0..4);
            let id = tree.create_proxy(random_box(rng), category, step as u64);
            live.push(id);
        } else if roll < 0.6 {
            let i = rng.gen_range(0..live.len());
            tree.destroy_proxy(live.swap_remove(i));
        } else if roll < 0.85 {
            let id = live[rng.gen_range(0..live.len())];
            tree.move_proxy(id, random_box(rng));
        } else {
            let id = live[rng.gen_range(0..live.len())];
            let grown = tree.fat_aabb(id).fattened(rng.gen_range(0.0..2.0));
            tree.enlarge_proxy(id, grown);
        }

        if step % 25 == 0 {
            tree.validate();
        }
    }
}

fn brute_force(tree: &DynamicTree, live: &[ProxyId], query: &AABB, mask_bits: u64) -> BTreeSet<ProxyId> {
    live.iter()
        .copied()
        .filter(|&id| tree.fat_aabb(id).overlaps(query) && (tree.get_category_bits(id) & mask_bits) != 0)
        .collect()
}

#[test]
fn test_random_churn_keeps_invariants() {
    logging::init();
    let mut rng = StdRng::seed_from_u64(7);
    let mut tree = DynamicTree::new();
    let mut live = Vec::new();

    churn(&mut rng, &mut tree, &mut live, 1000);
    tree.validate();
    assert_eq!(tree.proxy_count(), live.len());

    tree.rebuild(false);
    tree.validate_no_enlarged();

    churn(&mut rng, &mut tree, &mut live, 500);
    tree.rebuild(true);
    tree.validate_no_enlarged();
    assert_eq!(tree.proxy_count(), live.len());

    for id in live.drain(..) {
        tree.destroy_proxy(id);
    }
    tree.validate();
    assert_eq!(tree.node_count(), 0);
    assert!(tree.get_root_bounds().is_none());
}

#[test]
fn test_query_matches_brute_force() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut tree = DynamicTree::new();
    let mut live = Vec::new();
    churn(&mut rng, &mut tree, &mut live, 600);

    for round in 0..3 {
        for _ in 0..50 {
            let query = random_box(&mut rng).fattened(rng.gen_range(0.0..10.0));
            let mask_bits = if rng.gen_bool(0.5) { u64::MAX } else { 0b0101 };

            let mut found = BTreeSet::new();
            tree.query(&query, mask_bits, |id, _| {
                assert!(found.insert(id), "proxy reported twice");
                true
            });

            assert_eq!(found, brute_force(&tree, &live, &query, mask_bits));
        }

        // Same answers after either kind of rebuild
        tree.rebuild(round == 1);
    }
}

#[test]
fn test_area_ratio_improves_with_rebuild() {
    let mut rng = StdRng::seed_from_u64(3);
    let mut tree = DynamicTree::new();
    let mut live = Vec::new();
    churn(&mut rng, &mut tree, &mut live, 800);

    let before = tree.get_area_ratio();
    tree.rebuild(true);
    let after = tree.get_area_ratio();

    assert!(before > 0.0 && after > 0.0);
    assert!(after <= before * 1.5, "full rebuild degraded the tree: {before} -> {after}");
}

// Entry fraction of a ray into a box, by slabs
fn slab_entry(aabb: &AABB, p: Vec2, d: Vec2) -> Option<f32> {
    let mut t_min = 0.0f32;
    let mut t_max = f32::MAX;
    for axis in 0..2 {
        if d[axis].abs() < f32::EPSILON {
            if p[axis] < aabb.lower_bound[axis] || p[axis] > aabb.upper_bound[axis] {
                return None;
            }
            continue;
        }
        let t1 = (aabb.lower_bound[axis] - p[axis]) / d[axis];
        let t2 = (aabb.upper_bound[axis] - p[axis]) / d[axis];
        t_min = t_min.max(t1.min(t2));
        t_max = t_max.min(t1.max(t2));
    }
    (t_min <= t_max).then_some(t_min)
}

#[test]
fn test_ray_clipping_is_monotonic() {
    let mut rng = StdRng::seed_from_u64(11);
    let mut tree = DynamicTree::new();
    let mut live = Vec::new();
    churn(&mut rng, &mut tree, &mut live, 400);

    for _ in 0..40 {
        let origin = vec2(rng.gen_range(-60.0..60.0), rng.gen_range(-60.0..60.0));
        let translation = vec2(rng.gen_range(-100.0..100.0), rng.gen_range(-100.0..100.0));
        let input = RayCastInput::new(origin, translation, 1.0);

        let mut last_max = input.max_fraction;
        tree.ray_cast(&input, u64::MAX, |sub, id, _| {
            assert!(sub.max_fraction <= last_max, "interval grew");
            last_max = sub.max_fraction;

            let entry = slab_entry(&tree.fat_aabb(id).fattened(1e-3), sub.origin, sub.translation);
            let Some(entry) = entry else {
                panic!("visited a leaf the ray misses");
            };
            assert!(entry <= sub.max_fraction + 1e-4, "visited a leaf beyond the clip");

            // Clip at the box entry so later leaves must be closer
            if entry > 0.0 {
                entry
            } else {
                -1.0
            }
        });
    }
}

#[test]
fn test_proxy_lifecycle_round_trip() {
    let mut tree = DynamicTree::new();
    for i in 0..4 {
        let x = i as f32 * 2.0;
        tree.create_proxy(AABB::new(vec2(x, 0.0), vec2(x + 1.0, 1.0)), 1, i);
    }

    let proxies = tree.proxy_count();
    let bytes = tree.byte_count();

    let id = tree.create_proxy(AABB::new(vec2(20.0, 0.0), vec2(21.0, 1.0)), 1, 99);
    tree.destroy_proxy(id);

    assert_eq!(tree.proxy_count(), proxies);
    assert_eq!(tree.byte_count(), bytes);

    let reused = tree.create_proxy(AABB::new(vec2(30.0, 0.0), vec2(31.0, 1.0)), 1, 100);
    assert_eq!(reused.slot(), id.slot());
    assert!(!tree.contains(id));
    assert_eq!(tree.user_data(reused), 100);
    tree.validate();
}

#[test]
#[should_panic(expected = "invalid proxy id")]
fn test_stale_id_after_reuse_panics() {
    let mut tree = DynamicTree::new();
    let id = tree.create_proxy(AABB::new(vec2(0.0, 0.0), vec2(1.0, 1.0)), 1, 0);
    tree.destroy_proxy(id);
    let _reused = tree.create_proxy(AABB::new(vec2(0.0, 0.0), vec2(1.0, 1.0)), 1, 1);

    tree.move_proxy(id, AABB::new(vec2(5.0, 0.0), vec2(6.0, 1.0)));
}
