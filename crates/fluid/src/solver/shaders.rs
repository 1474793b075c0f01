//! Fragment bodies for the solver passes. Each is wrapped with the shared pass
//! header, which provides `params`, the `INPUTn` samplers and `fetchN` helpers.
//!
//! Cells are addressed with integer texel coordinates; row 0 is the top of the
//! grid, so a normalized `+y` velocity moves toward smaller rows. Every pass
//! copies obstacle cells through untouched.

/// Semi-Lagrangian backtrace.
///
/// Inputs: 0 velocity, 1 advected field, 2 obstacles.
/// `solver.y` scales the result (`xy` only when `flags.x == 1`, in which case
/// `solver.z` scales temperature and pressure is kept).
pub(crate) const ADVECT: &str = r"
bool is_obstacle(ivec2 cell) {
    return fetch2(cell).w > 0.0;
}

vec2 velocity_at(vec2 pos) {
    vec2 base = floor(pos);
    vec2 t = pos - base;
    ivec2 c = ivec2(base);
    vec2 v00 = fetch0(c).xy;
    vec2 v10 = fetch0(c + ivec2(1, 0)).xy;
    vec2 v01 = fetch0(c + ivec2(0, 1)).xy;
    vec2 v11 = fetch0(c + ivec2(1, 1)).xy;
    return mix(mix(v00, v10, t.x), mix(v01, v11, t.x), t.y);
}

vec4 field_at(vec2 pos, vec4 centre) {
    vec2 base = floor(pos);
    vec2 t = pos - base;
    ivec2 c = ivec2(base);
    ivec2 c10 = c + ivec2(1, 0);
    ivec2 c01 = c + ivec2(0, 1);
    ivec2 c11 = c + ivec2(1, 1);
    vec4 v00 = is_obstacle(c) ? centre : fetch1(c);
    vec4 v10 = is_obstacle(c10) ? centre : fetch1(c10);
    vec4 v01 = is_obstacle(c01) ? centre : fetch1(c01);
    vec4 v11 = is_obstacle(c11) ? centre : fetch1(c11);
    return mix(mix(v00, v10, t.x), mix(v01, v11, t.x), t.y);
}

void main() {
    ivec2 cell = current_cell();
    vec4 centre = fetch1(cell);
    if (is_obstacle(cell)) {
        out_value = centre;
        return;
    }

    float dt = params.solver.x;
    float h = params.grid.z;
    vec2 to_cells = vec2(1.0, -1.0) * dt / h;
    vec2 here = vec2(cell);

    vec2 local = fetch0(cell).xy;
    vec2 ahead = velocity_at(here - local * to_cells);
    vec2 displacement = clamp(-0.5 * (local + ahead) * to_cells, vec2(-1.0), vec2(1.0));
    vec4 value = field_at(here + displacement, centre);

    if (params.flags.x == 1) {
        out_value = vec4(value.xy * params.solver.y, value.z * params.solver.z, centre.w);
    } else {
        out_value = value * params.solver.y;
    }
}
";

/// Inputs: 0 velocity, 1 density, 2 obstacles.
pub(crate) const BUOYANCY: &str = r"
void main() {
    ivec2 cell = current_cell();
    vec4 velocity = fetch0(cell);
    if (fetch2(cell).w > 0.0) {
        out_value = velocity;
        return;
    }

    float density = dot(fetch1(cell).rgb, vec3(1.0 / 3.0));
    float excess = velocity.z - params.solver.w;
    float lift = excess * params.forces.x - density * params.forces.y;
    velocity.y += params.solver.x * lift;
    out_value = velocity;
}
";

/// Inputs: 0 velocity, 1 obstacles.
///
/// `flags.x` selects the impulse: -1 inert, 0 temperature, 1 velocity,
/// 2 velocity and temperature, 3 drag, 4 divergence burst. Cells inside the
/// radius that touch an obstacle take its velocity instead of the impulse.
pub(crate) const IMPULSE: &str = r"
void main() {
    ivec2 cell = current_cell();
    vec4 velocity = fetch0(cell);
    int mode = params.flags.x;
    if (mode < 0 || fetch1(cell).w > 0.0) {
        out_value = velocity;
        return;
    }

    vec2 offset = cell_to_normalized(cell) - params.source.xy;
    float dist = length(offset);
    float radius = params.forces.z;
    if (dist >= radius) {
        out_value = velocity;
        return;
    }

    vec2 solid_velocity = vec2(0.0);
    float solid_count = 0.0;
    for (int dy = -1; dy <= 1; ++dy) {
        for (int dx = -1; dx <= 1; ++dx) {
            if (dx == 0 && dy == 0) {
                continue;
            }
            vec4 neighbour = fetch1(cell + ivec2(dx, dy));
            if (neighbour.w > 0.0) {
                solid_velocity += neighbour.xy;
                solid_count += 1.0;
            }
        }
    }
    if (solid_count > 0.0) {
        velocity.xy = solid_velocity / solid_count;
        out_value = velocity;
        return;
    }

    if (mode == 0) {
        velocity.z += params.impulse.z;
    } else if (mode == 1) {
        velocity.xy += params.impulse.xy;
    } else if (mode == 2) {
        velocity.xyz += params.impulse.xyz;
    } else if (mode == 3) {
        vec2 moved = (params.source.xy - params.source.zw) * params.grid.xy * 0.5;
        velocity.xy += params.impulse.w * moved * params.grid.z / params.solver.x;
        velocity.z += params.impulse.z;
    } else if (mode == 4) {
        float falloff = 1.0 - dist / radius;
        vec2 direction = dist > 0.0 ? offset / dist : vec2(0.0);
        velocity.xy += direction * params.forces.w * falloff;
        velocity.z += params.impulse.z * falloff;
    }
    out_value = velocity;
}
";

/// One relaxation sweep of the pressure Poisson equation, stored in `w`.
///
/// Inputs: 0 velocity, 1 obstacles.
pub(crate) const JACOBI: &str = r"
void main() {
    ivec2 cell = current_cell();
    vec4 centre = fetch0(cell);
    if (fetch1(cell).w > 0.0) {
        out_value = centre;
        return;
    }

    ivec2 east = cell + ivec2(1, 0);
    ivec2 west = cell - ivec2(1, 0);
    ivec2 north = cell - ivec2(0, 1);
    ivec2 south = cell + ivec2(0, 1);

    vec4 e = fetch0(east);
    vec4 w = fetch0(west);
    vec4 n = fetch0(north);
    vec4 s = fetch0(south);

    bool solid_e = fetch1(east).w > 0.0;
    bool solid_w = fetch1(west).w > 0.0;
    bool solid_n = fetch1(north).w > 0.0;
    bool solid_s = fetch1(south).w > 0.0;

    float u_right = solid_e ? 0.0 : 0.5 * (centre.x + e.x);
    float u_left = solid_w ? 0.0 : 0.5 * (centre.x + w.x);
    float v_top = solid_n ? 0.0 : 0.5 * (centre.y + n.y);
    float v_bottom = solid_s ? 0.0 : 0.5 * (centre.y + s.y);

    float h = params.grid.z;
    float divergence = ((u_right - u_left) + (v_top - v_bottom)) / h;

    float p_e = solid_e ? centre.w : e.w;
    float p_w = solid_w ? centre.w : w.w;
    float p_n = solid_n ? centre.w : n.w;
    float p_s = solid_s ? centre.w : s.w;

    float pressure = 0.25 * (p_e + p_w + p_n + p_s - h * h * divergence);
    out_value = vec4(centre.xyz, pressure);
}
";

/// Subtracts the pressure gradient from velocity.
///
/// Inputs: 0 velocity, 1 obstacles.
pub(crate) const REMOVE_DIVERGENCE: &str = r"
void main() {
    ivec2 cell = current_cell();
    vec4 centre = fetch0(cell);
    if (fetch1(cell).w > 0.0) {
        out_value = centre;
        return;
    }

    ivec2 east = cell + ivec2(1, 0);
    ivec2 west = cell - ivec2(1, 0);
    ivec2 north = cell - ivec2(0, 1);
    ivec2 south = cell + ivec2(0, 1);

    vec4 solid_e = fetch1(east);
    vec4 solid_w = fetch1(west);
    vec4 solid_n = fetch1(north);
    vec4 solid_s = fetch1(south);

    float p_e = solid_e.w > 0.0 ? centre.w : fetch0(east).w;
    float p_w = solid_w.w > 0.0 ? centre.w : fetch0(west).w;
    float p_n = solid_n.w > 0.0 ? centre.w : fetch0(north).w;
    float p_s = solid_s.w > 0.0 ? centre.w : fetch0(south).w;

    float h = params.grid.z;
    vec2 velocity = centre.xy - vec2(p_e - p_w, p_n - p_s) / (2.0 * h);

    if (solid_e.w > 0.0) {
        velocity.x = solid_e.x;
    } else if (solid_w.w > 0.0) {
        velocity.x = solid_w.x;
    }
    if (solid_n.w > 0.0) {
        velocity.y = solid_n.y;
    } else if (solid_s.w > 0.0) {
        velocity.y = solid_s.y;
    }

    out_value = vec4(velocity, centre.zw);
}
";

/// Resamples input 0 across the whole target.
pub(crate) const FILL: &str = r"
void main() {
    out_value = texture(INPUT0, v_uv);
}
";
