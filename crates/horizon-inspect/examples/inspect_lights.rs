//! Horizon Inspect Lights Example
//!
//! Builds an inspector over two lights on a headless canvas, edits it, undoes
//! the edit and prints the control tree after each step.
//!
//! Run with: cargo run -p horizon-inspect --example inspect_lights

use horizon_inspect::prelude::*;
use horizon_inspect::{ControlTreeDebug, TreeFormatOptions};

#[derive(Debug, Clone, Copy, PartialEq, Default, ReflectEnum)]
enum Falloff {
    #[default]
    Linear,
    Quadratic,
}

#[derive(Default, Reflect)]
#[reflect(title = "name")]
struct Light {
    name: String,
    #[field(default = "1.000000", group = "Emission")]
    intensity: f32,
    #[field(group = "Emission")]
    falloff: Falloff,
    #[field(script = "UI[.[ slider { min = 0; max = 180; help = \"Cone angle\"; } ].]")]
    angle: f32,
    #[field(file_path, filter = "*.ies")]
    profiles: Vec<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let registry = InspectRegistry::with_defaults();
    let (mut canvas, log) = Canvas::headless();
    canvas.enable_undo();

    let key = share(Light {
        name: "Key".into(),
        intensity: 2.0,
        ..Light::default()
    });
    let fill = share(Light {
        name: "Fill".into(),
        intensity: 0.5,
        ..Light::default()
    });
    let lights = [as_instance(key.clone()), as_instance(fill.clone())];
    {
        let mut interp = Interpreter::new(&mut canvas, &registry);
        ReflectInterpreter::default().interpret(&mut interp, &lights);
    }
    canvas.realize(canvas.root());

    let debug = ControlTreeDebug::with_options(TreeFormatOptions::detailed());
    println!("{}", debug.format_canvas(&canvas));

    let Some(intensity) = canvas.find_child(canvas.root(), "intensity") else {
        eprintln!("no intensity editor was built");
        return;
    };
    canvas.edit(intensity, "3");
    println!(
        "after edit: key = {}, fill = {}",
        key.read().intensity,
        fill.read().intensity
    );

    canvas.undo();
    println!("after undo: editor shows {:?}", canvas.text(intensity));
    println!("{} platform handles live", log.live());
}
