//! Pixel-material diagnostic probe, standing in for the "pixel-material
//! diagnostic probe" spec.md treats as an external collaborator. Fires `N`
//! independent `SampleT_maj` calls along a fixed ray through a chosen medium
//! and reports the mean transmittance and how often the callback fired —
//! a smoke test for the library, not a renderer.

use std::sync::Arc;

use clap::{Parser, ValueEnum};
use glam::{DAffine3, DVec3};
use pbr_media::medium::cuboid::CuboidMedium;
use pbr_media::medium::{CuboidKind, Ray};
use pbr_media::providers::cloud::CloudProvider;
use pbr_media::providers::uniform_grid::UniformGridProvider;
use pbr_media::spectrum::{ConstantSpectrum, SampledWavelengths};
use pbr_media::{HomogeneousMedium, Medium, ParamSet, ParamValue};
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum MediumKind {
    Homogeneous,
    CuboidGrid,
    Cloud,
    Vdb,
}

#[derive(Parser)]
#[command(about = "Drives SampleT_maj N times through a chosen medium and reports statistics")]
struct Opts {
    #[arg(long, value_enum, default_value = "homogeneous")]
    medium: MediumKind,

    #[arg(long, default_value_t = 0.5)]
    sigma_a: f64,

    #[arg(long, default_value_t = 0.5)]
    sigma_s: f64,

    #[arg(long, default_value_t = 0.0)]
    g: f64,

    #[arg(long = "t-max", default_value_t = 5.0)]
    t_max: f64,

    #[arg(long, default_value_t = 100_000)]
    samples: u64,

    #[arg(long, default_value_t = 1)]
    seed: u64,
}

fn build_medium(opts: &Opts) -> Medium {
    let sigma_a: Arc<dyn pbr_media::Spectrum> = Arc::new(ConstantSpectrum(opts.sigma_a));
    let sigma_s: Arc<dyn pbr_media::Spectrum> = Arc::new(ConstantSpectrum(opts.sigma_s));

    match opts.medium {
        MediumKind::Homogeneous => Medium::Homogeneous(HomogeneousMedium::new(
            sigma_a,
            sigma_s,
            Arc::new(ConstantSpectrum(0.0)),
            1.0,
            1.0,
            opts.g,
        )),
        MediumKind::CuboidGrid => {
            let params = ParamSet::new()
                .set("density", ParamValue::FloatArray(vec![1.0; 8]))
                .set("nx", ParamValue::Int(2))
                .set("ny", ParamValue::Int(2))
                .set("nz", ParamValue::Int(2));
            let provider = UniformGridProvider::from_params(&params)
                .expect("probe's hardcoded grid params are always valid");
            let cuboid = CuboidMedium::new(
                provider,
                sigma_a,
                sigma_s,
                1.0,
                opts.g,
                DAffine3::IDENTITY,
            );
            Medium::Cuboid(CuboidKind::UniformGrid(cuboid))
        }
        MediumKind::Cloud => {
            let provider = CloudProvider::new(
                pbr_media::Aabb::new(DVec3::splat(-1.0), DVec3::splat(1.0)),
                1.0,
                0.2,
                1.0,
            );
            let cuboid = CuboidMedium::new(
                provider,
                sigma_a,
                sigma_s,
                1.0,
                opts.g,
                DAffine3::IDENTITY,
            );
            Medium::Cuboid(CuboidKind::Cloud(cuboid))
        }
        MediumKind::Vdb => {
            log::warn!(
                "no --vdb-path given; synthesizing a single dense brick in place of a loaded grid"
            );
            use glam::IVec3;
            use pbr_media::providers::sparse_grid::{SparseFloatGrid, SparseGridProvider};
            let mut grid = SparseFloatGrid::empty(DVec3::ZERO, 1.0, IVec3::ZERO, IVec3::splat(7));
            grid.set_brick(IVec3::ZERO, Box::new([1.0f32; 512]));
            let provider = SparseGridProvider::new(grid, None, 0.0, 1.0, 1.0);
            let cuboid = CuboidMedium::new(
                provider,
                sigma_a,
                sigma_s,
                1.0,
                opts.g,
                DAffine3::IDENTITY,
            );
            Medium::Cuboid(CuboidKind::Vdb(cuboid))
        }
    }
}

fn main() {
    simple_logger::init().unwrap();

    let opts = Opts::parse();
    let medium = build_medium(&opts);
    let lambdas = SampledWavelengths::hero_at(550.0);
    let ray = Ray {
        o: DVec3::new(-2.0, 0.5, 0.5),
        d: DVec3::X,
        time: 0.0,
    };

    let mut rng = StdRng::seed_from_u64(opts.seed);
    let mut transmittance_sum = 0.0f64;
    let mut callback_count = 0u64;

    for _ in 0..opts.samples {
        let u = rng.gen::<f64>();
        let t = medium.sample_t_maj(ray, opts.t_max, u, &mut rng, &lambdas, |_sample| {
            callback_count += 1;
            true
        });
        transmittance_sum += t.average();
    }

    println!("medium:              {:?}", opts.medium);
    println!("samples:             {}", opts.samples);
    println!("mean transmittance:  {:.6}", transmittance_sum / opts.samples as f64);
    println!("scattering events:   {callback_count}");
    println!(
        "events per sample:   {:.4}",
        callback_count as f64 / opts.samples as f64
    );
}
