use eincasm_core::physics::{
    activate_flow_muscles, activate_mine_muscles, activate_port_muscles, grow_muscle_csa,
};
use eincasm_core::Field;
use eincasm_data::{Kernel, Shape};
use proptest::prelude::*;

const W: usize = 5;
const H: usize = 4;
const CELLS: usize = W * H;

fn shape() -> Shape {
    Shape::new(W, H)
}

fn field(components: usize, data: Vec<f32>) -> Field {
    Field::from_vec(shape(), components, data).unwrap()
}

fn values(n: usize, lo: f32, hi: f32) -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(lo..hi, n)
}

fn area(radii: &Field) -> f64 {
    radii.as_slice().iter().map(|&r| f64::from(r) * f64::from(r)).sum()
}

fn tol(total: f64) -> f64 {
    1e-4 * total.abs().max(1.0)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_growth_never_creates_mass(
        radii in values(3 * CELLS, -2.0, 2.0),
        deltas in values(3 * CELLS, -1.0, 1.0),
        capital in values(CELLS, 0.0, 10.0),
        cost in 0.0f32..1.0
    ) {
        let radii = field(3, radii);
        let deltas = field(3, deltas);
        let capital = field(1, capital);
        let before = capital.sum() + area(&radii);
        let out = grow_muscle_csa(&radii, &deltas, &capital, cost).unwrap();
        let after = out.capital.sum() + area(&out.radii);
        prop_assert!(after <= before + tol(before), "{} > {}", after, before);
        prop_assert!(out.capital.as_slice().iter().all(|&c| c >= 0.0));
    }

    #[test]
    fn test_flow_never_creates_capital(
        capital in values(CELLS, 0.0, 10.0),
        waste in values(CELLS, 0.0, 5.0),
        obstacle_mask in prop::collection::vec(prop::bool::weighted(0.2), CELLS),
        radii in values(5 * CELLS, -2.0, 2.0),
        acts in values(CELLS, -1.0, 1.0),
        cost in 0.0f32..0.5
    ) {
        let kernel = Kernel::von_neumann();
        let capital = field(1, capital);
        let waste = field(1, waste);
        let obstacles = field(1, obstacle_mask.iter().map(|&o| if o { 1.0 } else { 0.0 }).collect());
        let radii = field(5, radii);
        let acts = field(1, acts);
        let out = activate_flow_muscles(&capital, &waste, &obstacles, &radii, &acts, &kernel, cost).unwrap();
        prop_assert!(out.capital.sum() <= capital.sum() + tol(capital.sum()));
        prop_assert!(out.capital.as_slice().iter().all(|&c| c >= 0.0));
        prop_assert!(out.waste.as_slice().iter().all(|&w| w >= 0.0));
        // Waste only moves.
        prop_assert!((out.waste.sum() - waste.sum()).abs() <= tol(waste.sum()));
    }

    #[test]
    fn test_mining_moves_mass_and_prices_it_in_capital(
        capital in values(CELLS, 0.0, 10.0),
        obstacles in values(CELLS, 0.0, 3.0),
        waste in values(CELLS, 0.0, 3.0),
        radii in values(CELLS, -2.0, 2.0),
        acts in values(CELLS, -1.0, 1.0),
        cost in 0.05f32..1.0
    ) {
        let capital = field(1, capital);
        let obstacles = field(1, obstacles);
        let waste = field(1, waste);
        let out = activate_mine_muscles(&capital, &obstacles, &waste, &field(1, radii), &field(1, acts), cost).unwrap();
        let mass_before = obstacles.sum() + waste.sum();
        let mass_after = out.obstacles.sum() + out.waste.sum();
        prop_assert!((mass_after - mass_before).abs() <= tol(mass_before));
        // Capital pays cost per unit mined and is refunded per unit packed back.
        for i in 0..CELLS {
            let mined = out.waste.as_slice()[i] - waste.as_slice()[i];
            let spent = capital.as_slice()[i] - out.capital.as_slice()[i];
            prop_assert!((spent - mined * cost).abs() <= 1e-4, "cell {}: {} vs {}", i, spent, mined * cost);
        }
        for s in [&out.capital, &out.obstacles, &out.waste] {
            prop_assert!(s.as_slice().iter().all(|&v| v >= 0.0));
        }
    }

    #[test]
    fn test_eating_from_positive_ports_is_lossy(
        capital in values(CELLS, 0.0, 10.0),
        ports in values(CELLS, 0.0, 10.0),
        radii in values(CELLS, -2.0, 2.0),
        acts in values(CELLS, 0.0, 1.0),
        cost in 0.05f32..1.0
    ) {
        let capital = field(1, capital);
        let ports = field(1, ports);
        let out = activate_port_muscles(&capital, &ports, &field(1, radii), &field(1, acts), cost).unwrap();
        let before = capital.sum() + ports.sum();
        let after = out.capital.sum() + out.ports.sum();
        prop_assert!(after <= before + tol(before));
        prop_assert!(out.capital.as_slice().iter().all(|&c| c >= 0.0));
    }

    #[test]
    fn test_positive_port_exchange_credits_magnitude_and_debits_signed_cost(
        capital in values(CELLS, 0.0, 10.0),
        ports in values(CELLS, 0.0, 10.0),
        radii in values(CELLS, -2.0, 2.0),
        acts in values(CELLS, -1.0, 1.0),
        cost in 0.05f32..1.0
    ) {
        let capital = field(1, capital);
        let ports = field(1, ports);
        let out = activate_port_muscles(&capital, &ports, &field(1, radii), &field(1, acts), cost).unwrap();
        for i in 0..CELLS {
            let delta = ports.as_slice()[i] - out.ports.as_slice()[i];
            let gained = out.capital.as_slice()[i] - capital.as_slice()[i];
            let expected = delta.abs() - delta * cost;
            prop_assert!((gained - expected).abs() <= 1e-4, "cell {}: {} vs {}", i, gained, expected);
        }
    }
}
