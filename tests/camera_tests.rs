//! Camera Positioning Integration Tests

use chrono::Utc;
use indexmap::IndexMap;
use knowledge_graph_layout::{
    CameraOptions, CameraPositioner, GraphNode, NodeId, Position3D,
};

fn nodes_for(positions: &IndexMap<NodeId, Position3D>) -> Vec<GraphNode> {
    positions
        .keys()
        .map(|id| GraphNode::new(id.as_str(), Utc::now()))
        .collect()
}

#[test]
fn single_small_node_is_framed_at_min_distance() {
    let positions: IndexMap<NodeId, Position3D> =
        [(NodeId::new("only"), Position3D::ZERO)].into_iter().collect();
    let nodes = vec![GraphNode::new("only", Utc::now()).with_radius(5.0)];

    let options = CameraOptions {
        padding: 1.3,
        fov: 75.0,
        min_distance: 20.0,
        max_distance: 300.0,
        ..CameraOptions::default()
    };

    let pose = CameraPositioner::default()
        .compute_pose(&nodes, &positions, None, &options)
        .unwrap();

    // The fit distance for such a small bounding sphere is below the
    // floor, so the clamp wins.
    assert!((pose.distance() - 20.0).abs() < 1e-6);
}

#[test]
fn distance_always_within_configured_bounds() {
    let spreads = [1.0, 50.0, 500.0, 5000.0];
    let options = CameraOptions::default();
    let positioner = CameraPositioner::default();

    for spread in spreads {
        let positions: IndexMap<NodeId, Position3D> = (0..8)
            .map(|i| {
                let sign = if i % 2 == 0 { -1.0 } else { 1.0 };
                (
                    NodeId::new(format!("n{i}")),
                    Position3D::new(
                        sign * spread,
                        sign * spread * 0.8,
                        sign * spread * 0.6,
                    ),
                )
            })
            .collect();
        let nodes = nodes_for(&positions);

        let pose = positioner
            .compute_pose(&nodes, &positions, None, &options)
            .unwrap();

        let distance = pose.distance();
        assert!(
            distance >= options.min_distance - 1e-9,
            "distance {distance} below min at spread {spread}"
        );
        assert!(
            distance <= options.max_distance + 1e-9,
            "distance {distance} above max at spread {spread}"
        );
    }
}

#[test]
fn prevent_close_up_enforces_diagonal_floor() {
    let positions: IndexMap<NodeId, Position3D> = [
        (NodeId::new("a"), Position3D::new(-40.0, -40.0, -40.0)),
        (NodeId::new("b"), Position3D::new(40.0, 40.0, 40.0)),
        (NodeId::new("c"), Position3D::new(40.0, -40.0, 40.0)),
    ]
    .into_iter()
    .collect();
    let nodes = nodes_for(&positions);

    let base = CameraOptions {
        padding: 1.0,
        fov: 170.0, // Absurdly wide: the raw fit distance collapses.
        min_distance: 1.0,
        max_distance: 10_000.0,
        maintain_orientation: false,
        ..CameraOptions::default()
    };
    let relaxed = CameraOptions {
        prevent_close_up: false,
        ..base
    };
    let strict = CameraOptions {
        prevent_close_up: true,
        ..base
    };

    let positioner = CameraPositioner::default();
    let relaxed_pose = positioner
        .compute_pose(&nodes, &positions, None, &relaxed)
        .unwrap();
    let strict_pose = positioner
        .compute_pose(&nodes, &positions, None, &strict)
        .unwrap();

    let diagonal = 80.0 * 3.0_f64.sqrt();
    assert!(strict_pose.distance() >= 0.8 * diagonal - 1e-9);
    assert!(strict_pose.distance() > relaxed_pose.distance());
}

#[test]
fn pose_always_looks_at_bounds_center_with_y_up() {
    let positions: IndexMap<NodeId, Position3D> = (0..5)
        .map(|i| {
            (
                NodeId::new(format!("n{i}")),
                Position3D::new(i as f64 * 30.0 + 100.0, 50.0, -20.0),
            )
        })
        .collect();
    let nodes = nodes_for(&positions);

    let pose = CameraPositioner::default()
        .compute_pose(&nodes, &positions, None, &CameraOptions::default())
        .unwrap();

    assert_eq!(pose.up, Position3D::new(0.0, 1.0, 0.0));
    assert_eq!(pose.target, Position3D::new(160.0, 50.0, -20.0));
    assert!(pose.far >= 3.0 * pose.distance() - 1e-9);
    assert!(pose.near > 0.0);
}
