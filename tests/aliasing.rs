mod common;

use common::SimulationBuilder;
use eincasm_core::{ChannelSpec, Declaration, Field};

fn parent_world() -> eincasm_core::Simulation {
    SimulationBuilder::new(3, 2)
        .with_channel("body", ChannelSpec::new().with_components(5))
        .with_subchannel("front", "body", vec![0, 1, 2])
        .with_subchannel("scattered", "body", vec![4, 1])
        .with_subchannel("front_tail", "front", vec![2])
        .build()
}

#[test]
fn test_subchannel_write_changes_exactly_its_components() {
    let mut sim = parent_world();
    sim.add_fn(Declaration::new("paint_front").writes(["front"]), |ctx| {
        let mut f = Field::zeros(ctx.shape(), 3);
        for (c, plane) in f.planes_mut().enumerate() {
            plane.fill(c as f32 + 1.0);
        }
        ctx.write("front", f)
    })
    .unwrap();
    sim.init_all_channels().unwrap();
    sim.update().unwrap();

    let body = sim.read("body").unwrap();
    for (c, expected) in [1.0, 2.0, 3.0, 0.0, 0.0].into_iter().enumerate() {
        assert!(
            body.plane(c).iter().all(|&v| v == expected),
            "component {c} should be {expected}"
        );
    }
}

#[test]
fn test_parent_write_visible_through_subchannels() {
    let mut sim = parent_world();
    let mut body = Field::zeros(sim.shape(), 5);
    for (c, plane) in body.planes_mut().enumerate() {
        plane.fill(10.0 * c as f32);
    }
    sim.write("body", &body).unwrap();

    let scattered = sim.read("scattered").unwrap();
    assert_eq!(scattered.components(), 2);
    assert!(scattered.plane(0).iter().all(|&v| v == 40.0));
    assert!(scattered.plane(1).iter().all(|&v| v == 10.0));

    // Nested sub-channel resolves through its parent to the root.
    let tail = sim.read("front_tail").unwrap();
    assert!(tail.as_slice().iter().all(|&v| v == 20.0));
}

#[test]
fn test_overlapping_aliases_share_storage() {
    let mut sim = parent_world();
    let shape = sim.shape();
    let mut scattered = Field::zeros(shape, 2);
    scattered.plane_mut(1).fill(-4.0);
    sim.write("scattered", &scattered).unwrap();
    // Component 1 of body is both front[1] and scattered[1].
    assert!(sim
        .read("front")
        .unwrap()
        .plane(1)
        .iter()
        .all(|&v| v == -4.0));
    assert_eq!(sim.substrate().total_planes(), 5);
}
