//! Reference text served by the `get_docs` tool

pub const TOPICS: &[&str] = &["all", "setup", "animation", "color", "interaction"];

const SETUP: &str = "\
## Setup
Scenes are p5.js sketches in global mode. Define `setup()` and `draw()` at the top level.
Call `createCanvas(size, size)` exactly once inside `setup()`, using the size the scene was
generated for. Do not load external files, fonts or images; everything must be drawn in code.";

const ANIMATION: &str = "\
## Animation
`draw()` runs once per frame. Derive motion from `frameCount` or `millis()` so the scene
loops smoothly. Intensity 1-3 favours slow drift and long easing, 4-7 steady motion,
8-10 fast particles and rapid colour shifts. Keep per-frame work small so the widget stays
responsive.";

const COLOR: &str = "\
## Color
Use `colorMode(HSB, 360, 100, 100, 1)` for palettes that move smoothly. Redraw the
background every frame, or paint it with low alpha for trails. Prefer a palette of three to
five related hues that matches the subject's mood.";

const INTERACTION: &str = "\
## Interaction
The viewer forwards pointer events. Read `mouseX` and `mouseY` inside `draw()` for gentle
parallax and use `mousePressed()` for one-off effects. Scenes must still look complete when
nobody interacts with them.";

/// Documentation text for `topic`, or `None` for an unknown topic
pub fn lookup(topic: &str) -> Option<String> {
    let text = match topic {
        "setup" => SETUP.to_string(),
        "animation" => ANIMATION.to_string(),
        "color" => COLOR.to_string(),
        "interaction" => INTERACTION.to_string(),
        "all" => [SETUP, ANIMATION, COLOR, INTERACTION].join("\n\n"),
        _ => return None,
    };
    Some(text)
}
