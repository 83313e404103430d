//! Procedural initializers for obstacles and resource ports.

use crate::channel::InitContext;
use crate::config::{ObstaclesConfig, PortsConfig};
use crate::error::{Result, SimError};
use eincasm_data::{PortLayout, RegenFunc, Resource, Shape, NO_PORT};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// Obstacle initializer: layered value noise, 1.0 where it exceeds the threshold.
pub fn obstacles(
    config: ObstaclesConfig,
) -> impl FnMut(&mut InitContext<'_>) -> Result<Vec<f32>> + Send {
    move |ctx| {
        let seed: u64 = ctx.rng.gen();
        let shape = ctx.shape;
        let mut values = vec![0.0f32; ctx.components * shape.cells()];
        for (idx, v) in values.iter_mut().enumerate() {
            let (x, y) = shape.coords(idx % shape.cells());
            let noise = value_noise(
                x as f32 * config.noise_scale,
                y as f32 * config.noise_scale,
                seed,
            );
            if noise > config.threshold {
                *v = 1.0;
            }
        }
        ctx.metadata.insert("obstacle_threshold", config.threshold);
        Ok(values)
    }
}

/// Three octaves of smoothed hash noise, in `[0, 1]`.
#[must_use]
pub fn value_noise(x: f32, y: f32, seed: u64) -> f32 {
    let noise1 = hash_noise(x * 0.1, y * 0.1, seed) * 0.5;
    let noise2 = hash_noise(x * 0.05, y * 0.05, seed.wrapping_add(1)) * 0.3;
    let noise3 = hash_noise(x * 0.02, y * 0.02, seed.wrapping_add(2)) * 0.2;
    (noise1 + noise2 + noise3).clamp(0.0, 1.0)
}

fn hash_noise(x: f32, y: f32, seed: u64) -> f32 {
    let ix = x.floor() as i32;
    let iy = y.floor() as i32;
    let fx = x - x.floor();
    let fy = y - y.floor();
    let ux = fx * fx * (3.0 - 2.0 * fx);
    let uy = fy * fy * (3.0 - 2.0 * fy);
    let v00 = hash(ix, iy, seed);
    let v10 = hash(ix + 1, iy, seed);
    let v01 = hash(ix, iy + 1, seed);
    let v11 = hash(ix + 1, iy + 1, seed);
    let v0 = v00 + ux * (v10 - v00);
    let v1 = v01 + ux * (v11 - v01);
    v0 + uy * (v1 - v0)
}

fn hash(x: i32, y: i32, seed: u64) -> f32 {
    let n = (x.wrapping_mul(127) ^ y.wrapping_mul(311)) as u64 ^ seed;
    let n = n.wrapping_mul(0x517cc1b727220a95);
    let n = n ^ (n >> 32);
    (n & 0xFFFFFF) as f32 / 0xFFFFFF as f32
}

/// Port initializer. Each resource walks a Levy flight across the torus and
/// stamps its id on every site it visits; the layout lands in the channel's
/// metadata and tagged cells start at the resource's amplitude.
pub fn ports(
    config: PortsConfig,
) -> impl FnMut(&mut InitContext<'_>) -> Result<Vec<f32>> + Send {
    move |ctx| {
        if ctx.components != 1 {
            return Err(SimError::configuration(format!(
                "port channel '{}' must have one component",
                ctx.channel_id
            )));
        }
        let layout = levy_ports(&config, ctx.shape, ctx.rng);
        let values = layout
            .port_id_map
            .iter()
            .map(|&id| layout.resource(id).map_or(0.0, |r| r.amplitude))
            .collect();
        tracing::debug!(
            resources = layout.resources.len(),
            sizes = ?layout.port_sizes,
            "Ports placed"
        );
        ctx.metadata.ports = Some(layout);
        Ok(values)
    }
}

fn uniform(rng: &mut ChaCha8Rng, range: [f32; 2]) -> f32 {
    if range[0] < range[1] {
        rng.gen_range(range[0]..range[1])
    } else {
        range[0]
    }
}

/// Places `num_resources` resources by Levy flight. Later resources overwrite earlier ones where they cross.
#[must_use]
pub fn levy_ports(config: &PortsConfig, shape: Shape, rng: &mut ChaCha8Rng) -> PortLayout {
    let mut port_id_map = vec![NO_PORT; shape.cells()];
    let max_step = shape.width.max(shape.height) as f32;
    let mut resources = Vec::with_capacity(config.num_resources as usize);
    for id in 1..=config.num_resources {
        let alpha = uniform(rng, config.alpha_range);
        let frequency = uniform(rng, config.beta_range);
        let amplitude = uniform(rng, [config.min_regen_amp, config.max_regen_amp]);
        let phase = rng.gen_range(0.0..std::f32::consts::TAU);
        let [lo, hi] = config.num_sites_range;
        let sites = if lo < hi { rng.gen_range(lo..=hi) } else { lo };

        let mut x = rng.gen_range(0..shape.width) as f32;
        let mut y = rng.gen_range(0..shape.height) as f32;
        for _ in 0..sites {
            let cx = (x.floor() as i64).rem_euclid(shape.width as i64) as usize;
            let cy = (y.floor() as i64).rem_euclid(shape.height as i64) as usize;
            port_id_map[shape.index(cx, cy)] = id;
            // Pareto-distributed step length, minimum one cell.
            let u: f32 = rng.gen_range(f32::EPSILON..1.0);
            let step = u.powf(-1.0 / alpha).min(max_step);
            let angle = rng.gen_range(0.0..std::f32::consts::TAU);
            x = (x + step * angle.cos()).rem_euclid(shape.width as f32);
            y = (y + step * angle.sin()).rem_euclid(shape.height as f32);
        }

        resources.push(Resource {
            id,
            amplitude,
            alpha,
            regen: RegenFunc::Periodic {
                amplitude,
                frequency,
                phase,
            },
        });
    }
    PortLayout::new(port_id_map, resources)
}
