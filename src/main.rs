//! Renders a small built-in scene and writes it to a PNG.
//!
//! Usage: `rustshade [output.png] [width] [height]`

use std::process::ExitCode;

use rustshade::logging::{init_logging, LoggingConfig};
use rustshade::prelude::*;

const DEFAULT_OUTPUT: &str = "rustshade.png";
const DEFAULT_WIDTH: u32 = 960;
const DEFAULT_HEIGHT: u32 = 540;

fn build_scene(width: u32, height: u32) -> Result<Scene> {
    let config = RenderConfig {
        clear_color: Color::rgb(24, 26, 38),
        texture_mode: TextureMode::PerFragment,
        ssao: SsaoConfig {
            enabled: true,
            ..SsaoConfig::default()
        },
        ..RenderConfig::default()
    };
    let mut scene = Scene::new(width, height, config)?;

    scene
        .camera_mut()
        .transform_mut()
        .set_position(Vec3::new(4.5, 3.5, 7.0))
        .look_at(Vec3::new(0.0, 0.5, 0.0));

    let checker = Texture::checkerboard(256, 8, Color::rgb(210, 210, 200), Color::rgb(90, 95, 105))?;
    let ground = Geometry::plane("ground", 16.0, 16.0, 8).with_material(
        Material::new("checker")
            .with_diffuse(Color::WHITE)
            .with_texture(std::sync::Arc::new(checker)),
    );
    scene.add_geometry(ground);

    let mut crate_box = Geometry::cube("crate", 1.6).with_material(
        Material::new("crate")
            .with_diffuse(Color::rgb(196, 120, 64))
            .with_specular(Color::rgb(60, 60, 60), 16.0),
    );
    crate_box
        .transform_mut()
        .set_position_xyz(-1.2, 0.8, 0.4)
        .rotate_y(0.6);
    scene.add_geometry(crate_box);

    let mut ball = Geometry::sphere("ball", 1.0, 32, 20).with_material(
        Material::new("glossy")
            .with_diffuse(Color::rgb(70, 110, 230))
            .with_specular(Color::WHITE, 48.0),
    );
    ball.transform_mut().set_position_xyz(1.4, 1.0, -0.6);
    scene.add_geometry(ball);

    scene.add_light(
        Light::sun("sun", Vec3::new(-0.5, -1.0, -0.35))
            .with_color(Color::rgb(255, 244, 220), 1.0)
            .casting_shadows(),
    );
    scene.add_light(
        Light::point("fill", Vec3::new(3.0, 2.5, 3.0), 0.08).with_color(Color::rgb(140, 170, 255), 0.6),
    );

    Ok(scene)
}

fn parse_dimension(arg: Option<String>, default: u32) -> u32 {
    match arg.map(|s| s.parse::<u32>()) {
        Some(Ok(value)) => value,
        Some(Err(err)) => {
            log::warn!("ignoring invalid dimension ({err}), using {default}");
            default
        }
        None => default,
    }
}

fn main() -> ExitCode {
    init_logging(LoggingConfig::default());

    let mut args = std::env::args().skip(1);
    let output = args.next().unwrap_or_else(|| DEFAULT_OUTPUT.to_owned());
    let width = parse_dimension(args.next(), DEFAULT_WIDTH);
    let height = parse_dimension(args.next(), DEFAULT_HEIGHT);

    let mut scene = match build_scene(width, height) {
        Ok(scene) => scene,
        Err(err) => {
            log::error!("failed to build scene: {err}");
            return ExitCode::FAILURE;
        }
    };

    let stats = match scene.render_frame() {
        Ok(stats) => stats,
        Err(err) => {
            log::error!("render failed: {err}");
            return ExitCode::FAILURE;
        }
    };
    log::info!(
        "rendered {}x{} in {:?} ({} of {} triangles rasterized)",
        width,
        height,
        stats.frame_time,
        stats.triangles_rasterized,
        stats.triangles_submitted
    );

    if let Err(err) = scene.to_image().save(&output) {
        log::error!("failed to write {output}: {err}");
        return ExitCode::FAILURE;
    }
    log::info!("wrote {output}");
    ExitCode::SUCCESS
}
