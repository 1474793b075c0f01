use fluidconfig::DisplayMode;

/// Shared helpers for the visualisation passes.
///
/// Inputs: 0 velocity, 1 density, 2 image, 3 obstacles. Sampling goes through
/// `v_uv` so the target may have any size.
const DISPLAY_PRELUDE: &str = r"
const float TEMPERATURE_SCALE = 10.0;
const float VELOCITY_SCALE = 4.0;

vec4 velocity_here() { return texture(INPUT0, v_uv); }
vec4 density_here() { return texture(INPUT1, v_uv); }
vec4 image_here() { return texture(INPUT2, v_uv); }

float density_amount(vec4 density) {
    return dot(density.rgb, vec3(1.0 / 3.0));
}

vec3 temperature_colour(float temperature) {
    float t = clamp(temperature / TEMPERATURE_SCALE, -1.0, 1.0);
    vec3 hot = vec3(1.0, 0.35, 0.05);
    vec3 cold = vec3(0.05, 0.35, 1.0);
    return t >= 0.0 ? hot * t : cold * -t;
}

vec3 velocity_colour(vec2 velocity) {
    vec2 v = clamp(velocity / VELOCITY_SCALE, vec2(-1.0), vec2(1.0));
    return vec3(0.5 + 0.5 * v, 0.5);
}

void emit(vec3 colour) {
    vec3 shaded = colour;
    if (texture(INPUT3, v_uv).w > 0.0) {
        shaded = mix(shaded, vec3(0.5), 0.85);
    }
    out_value = vec4(clamp(shaded, vec3(0.0), vec3(1.0)), 1.0);
}
";

const TEMPERATURE: &str = r"
void main() {
    emit(temperature_colour(velocity_here().z));
}
";

const INK: &str = r"
void main() {
    emit(density_here().rgb);
}
";

const VELOCITY: &str = r"
void main() {
    emit(velocity_colour(velocity_here().xy));
}
";

const VELOCITY_DENSITY: &str = r"
void main() {
    vec4 density = density_here();
    vec3 flow = velocity_colour(velocity_here().xy);
    emit(mix(flow, density.rgb, clamp(density_amount(density), 0.0, 1.0)));
}
";

const TEMPERATURE_DENSITY: &str = r"
void main() {
    vec4 density = density_here();
    vec3 heat = temperature_colour(velocity_here().z);
    emit(heat + density.rgb * 0.5);
}
";

const SEPIA_DENSITY: &str = r"
void main() {
    float amount = clamp(density_amount(density_here()), 0.0, 1.0);
    vec3 paper = vec3(0.94, 0.86, 0.7);
    vec3 ink = vec3(0.27, 0.16, 0.07);
    emit(mix(paper, ink, amount));
}
";

const SIGNED_DENSITY: &str = r"
void main() {
    float amount = clamp(density_amount(density_here()), -1.0, 1.0);
    emit(amount >= 0.0 ? vec3(amount, 0.0, 0.0) : vec3(0.0, 0.0, -amount));
}
";

const DENSITY_TEST: &str = r"
void main() {
    emit(abs(density_here().rgb));
}
";

const IMAGE: &str = r"
void main() {
    vec3 picture = image_here().rgb;
    vec4 density = density_here();
    emit(picture + density.rgb * 0.25);
}
";

pub(crate) fn fragment_source(mode: DisplayMode) -> String {
    let body = match mode {
        DisplayMode::Temperature => TEMPERATURE,
        DisplayMode::Ink => INK,
        DisplayMode::Velocity => VELOCITY,
        DisplayMode::VelocityDensity => VELOCITY_DENSITY,
        DisplayMode::TemperatureDensity => TEMPERATURE_DENSITY,
        DisplayMode::SepiaDensity => SEPIA_DENSITY,
        DisplayMode::SignedDensity => SIGNED_DENSITY,
        DisplayMode::DensityTest => DENSITY_TEST,
        DisplayMode::Image => IMAGE,
    };
    format!("{DISPLAY_PRELUDE}{body}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluidconfig::IndexedMode;

    #[test]
    fn every_mode_has_a_distinct_shader() {
        let mut sources: Vec<String> = DisplayMode::ALL
            .iter()
            .map(|mode| fragment_source(*mode))
            .collect();
        for source in &sources {
            assert!(source.contains("emit("));
        }
        sources.sort();
        sources.dedup();
        assert_eq!(sources.len(), DisplayMode::ALL.len());
    }
}
