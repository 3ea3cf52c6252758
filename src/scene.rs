//! Static description of the village scene.
//!
//! Every object placement is data: a model kind plus a world transform.
//! The renderer iterates the instance list without knowing anything about
//! huts or sheep. Only the UFO moves, so its transform is a function of
//! elapsed time rather than a table entry.

use glam::{Mat4, Vec3};

use crate::settings::RenderSettings;

/// Which OBJ model an instance draws.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModelKind {
    Ufo,
    Stall,
    Hut,
    Well,
    Fence,
    Sheep,
    Human,
}

/// All model kinds, in draw order.
pub const MODEL_KINDS: [ModelKind; 7] = [
    ModelKind::Ufo,
    ModelKind::Stall,
    ModelKind::Hut,
    ModelKind::Well,
    ModelKind::Fence,
    ModelKind::Sheep,
    ModelKind::Human,
];

/// A single placed model.
#[derive(Clone, Copy, Debug)]
pub struct Instance {
    pub kind: ModelKind,
    pub transform: Mat4,
}

// === Placement tables ===

const STALLS: [Vec3; 5] = [
    Vec3::new(10.5, 0.0, 11.0),
    Vec3::new(10.5, 0.0, 6.0),
    Vec3::new(10.5, 0.0, 1.0),
    Vec3::new(10.5, 0.0, -4.0),
    Vec3::new(10.5, 0.0, -9.0),
];

/// Western hut row, turned to face the village square.
const HUTS_ROTATED: [Vec3; 9] = [
    Vec3::new(-9.5, 0.0, -12.0),
    Vec3::new(-9.5, 0.0, -9.25),
    Vec3::new(-9.5, 0.0, -6.5),
    Vec3::new(-9.5, 0.0, -3.75),
    Vec3::new(-9.5, 0.0, -1.0),
    Vec3::new(-9.5, 0.0, 1.75),
    Vec3::new(-9.5, 0.0, 4.5),
    Vec3::new(-9.5, 0.0, 7.25),
    Vec3::new(-9.5, 0.0, 10.0),
];

const HUTS: [Vec3; 8] = [
    Vec3::new(-4.5, 0.0, -10.0),
    Vec3::new(-4.5, 0.0, -7.25),
    Vec3::new(-4.5, 0.0, -4.5),
    Vec3::new(-4.5, 0.0, -1.75),
    Vec3::new(-4.5, 0.0, 3.75),
    Vec3::new(-4.5, 0.0, 6.5),
    Vec3::new(-4.5, 0.0, 9.25),
    Vec3::new(-4.5, 0.0, 12.0),
];

const FENCES: [Vec3; 10] = [
    Vec3::new(1.0, 0.0, -8.0),
    Vec3::new(2.35, 0.0, -8.0),
    Vec3::new(3.70, 0.0, -8.0),
    Vec3::new(5.05, 0.0, -8.0),
    Vec3::new(6.4, 0.0, -8.0),
    Vec3::new(1.0, 0.0, 8.3),
    Vec3::new(2.35, 0.0, 8.3),
    Vec3::new(3.70, 0.0, 8.3),
    Vec3::new(5.05, 0.0, 8.3),
    Vec3::new(6.4, 0.0, 8.3),
];

/// North/south paddock sides, rotated 90 degrees. The gap between z = -1.75
/// and z = 2.30 on the eastern side is where the gate goes.
const FENCES_ROTATED: [Vec3; 22] = [
    Vec3::new(0.3, 0.0, -7.15),
    Vec3::new(0.3, 0.0, -5.8),
    Vec3::new(0.3, 0.0, -4.45),
    Vec3::new(0.3, 0.0, -3.10),
    Vec3::new(0.3, 0.0, -1.75),
    Vec3::new(0.3, 0.0, -0.4),
    Vec3::new(0.3, 0.0, 0.95),
    Vec3::new(0.3, 0.0, 2.30),
    Vec3::new(0.3, 0.0, 3.65),
    Vec3::new(0.3, 0.0, 5.0),
    Vec3::new(0.3, 0.0, 6.35),
    Vec3::new(0.3, 0.0, 7.7),
    Vec3::new(7.12, 0.0, -7.15),
    Vec3::new(7.12, 0.0, -5.8),
    Vec3::new(7.12, 0.0, -4.45),
    Vec3::new(7.12, 0.0, -3.10),
    Vec3::new(7.12, 0.0, -1.75),
    Vec3::new(7.12, 0.0, 2.30),
    Vec3::new(7.12, 0.0, 3.65),
    Vec3::new(7.12, 0.0, 5.0),
    Vec3::new(7.12, 0.0, 6.35),
    Vec3::new(7.12, 0.0, 7.7),
];

const SHEEP_INSIDE: [Vec3; 6] = [
    Vec3::new(10.0, 0.0, 8.7),
    Vec3::new(11.0, 0.0, 9.5),
    Vec3::new(11.0, 0.0, -5.5),
    Vec3::new(10.0, 0.0, -6.2),
    Vec3::new(11.0, 0.0, -10.5),
    Vec3::new(10.0, 0.0, -11.2),
];

const SHEEP_OUTSIDE: [Vec3; 15] = [
    Vec3::new(2.0, 0.0, 6.0),
    Vec3::new(3.0, 0.0, 7.0),
    Vec3::new(3.5, 0.0, 5.5),
    Vec3::new(5.5, 0.0, 7.5),
    Vec3::new(6.5, 0.0, 6.0),
    Vec3::new(3.5, 0.0, 4.0),
    Vec3::new(4.5, 0.0, 3.0),
    Vec3::new(2.0, 0.0, 4.0),
    Vec3::new(5.5, 0.0, -2.0),
    Vec3::new(1.0, 0.0, -5.0),
    Vec3::new(2.0, 0.0, -4.0),
    Vec3::new(2.5, 0.0, -5.5),
    Vec3::new(4.5, 0.0, -3.5),
    Vec3::new(5.5, 0.0, -5.0),
    Vec3::new(5.5, 0.0, -7.0),
];

/// Villagers lying around the square: (position, roll about local z in
/// degrees). All but the standing one at (1, 0, 0) are tipped onto the
/// ground with a 90 degree x-rotation.
const HUMANS_DOWN: [(Vec3, f32); 12] = [
    (Vec3::new(-6.0, 0.0, 8.0), 0.0),
    (Vec3::new(-8.0, 0.0, 8.0), -45.0),
    (Vec3::new(-8.0, 0.0, 6.5), 180.0),
    (Vec3::new(-6.0, 0.0, 6.5), 135.0),
    (Vec3::new(-6.0, 0.0, -6.5), 0.0),
    (Vec3::new(-8.0, 0.0, -6.5), -45.0),
    (Vec3::new(-8.0, 0.0, -8.0), 180.0),
    (Vec3::new(-6.0, 0.0, -8.0), 135.0),
    (Vec3::new(-6.0, 0.0, 1.5), 0.0),
    (Vec3::new(-8.0, 0.0, 1.5), -45.0),
    (Vec3::new(-8.0, 0.0, -1.5), 180.0),
    (Vec3::new(-6.0, 0.0, -1.5), 135.0),
];

/// Foliage quads lining the village on the north/south edges.
const VEGETATION: [Vec3; 18] = [
    Vec3::new(7.0, 2.5, 12.5),
    Vec3::new(5.0, 2.5, 12.4),
    Vec3::new(3.0, 2.5, 12.5),
    Vec3::new(0.0, 2.5, 12.4),
    Vec3::new(-3.0, 2.5, 12.5),
    Vec3::new(-6.0, 2.5, 12.4),
    Vec3::new(-9.0, 2.5, 12.5),
    Vec3::new(-12.0, 2.5, 12.4),
    Vec3::new(-14.0, 2.5, 12.5),
    Vec3::new(7.0, 2.5, -12.5),
    Vec3::new(5.0, 2.5, -12.4),
    Vec3::new(3.0, 2.5, -12.5),
    Vec3::new(0.0, 2.5, -12.4),
    Vec3::new(-3.0, 2.5, -12.5),
    Vec3::new(-6.0, 2.5, -12.4),
    Vec3::new(-9.0, 2.5, -12.5),
    Vec3::new(-12.0, 2.5, -12.4),
    Vec3::new(-14.0, 2.5, -12.5),
];

/// East/west edge foliage, rotated to face inward.
const VEGETATION_ROTATED: [Vec3; 18] = [
    Vec3::new(12.5, 2.5, 15.0),
    Vec3::new(12.4, 2.5, 13.0),
    Vec3::new(12.5, 2.5, 10.0),
    Vec3::new(12.4, 2.5, 7.0),
    Vec3::new(12.5, 2.5, 4.0),
    Vec3::new(12.4, 2.5, 1.0),
    Vec3::new(12.5, 2.5, -2.0),
    Vec3::new(12.4, 2.5, -5.0),
    Vec3::new(12.5, 2.5, -8.0),
    Vec3::new(-12.5, 2.5, 15.0),
    Vec3::new(-12.4, 2.5, 13.0),
    Vec3::new(-12.5, 2.5, 10.0),
    Vec3::new(-12.4, 2.5, 7.0),
    Vec3::new(-12.5, 2.5, 4.0),
    Vec3::new(-12.4, 2.5, 1.0),
    Vec3::new(-12.5, 2.5, -2.0),
    Vec3::new(-12.4, 2.5, -5.0),
    Vec3::new(-12.5, 2.5, -8.0),
];

// === Transform builders ===

fn place(position: Vec3, rotation: Mat4, scale: f32) -> Mat4 {
    Mat4::from_translation(position) * rotation * Mat4::from_scale(Vec3::splat(scale))
}

fn rot_y(degrees: f32) -> Mat4 {
    Mat4::from_rotation_y(degrees.to_radians())
}

/// World position of the UFO at time `t`: a circular orbit of radius 10 at
/// height 7, half a revolution per 2*pi seconds.
pub fn ufo_position(t: f32) -> Vec3 {
    Vec3::new(10.0 * (t / 2.0).cos(), 7.0, 10.0 * (t / 2.0).sin())
}

/// Transform for the parallax-mapped ground plane.
pub fn floor_transform() -> Mat4 {
    place(Vec3::ZERO, Mat4::from_rotation_x((-90.0_f32).to_radians()), 12.5)
}

/// All opaque model instances for the frame.
///
/// `gate_closed` selects between the two gate fence placements; `t` drives
/// the UFO orbit.
pub fn model_instances(settings: &RenderSettings, t: f32) -> Vec<Instance> {
    let mut out = Vec::with_capacity(100);
    let push = |out: &mut Vec<Instance>, kind, transform| {
        out.push(Instance { kind, transform });
    };

    push(&mut out, ModelKind::Ufo, place(ufo_position(t), Mat4::IDENTITY, 0.05));

    for p in STALLS {
        push(&mut out, ModelKind::Stall, place(p, Mat4::IDENTITY, 0.1));
    }
    for p in HUTS_ROTATED {
        push(&mut out, ModelKind::Hut, place(p, rot_y(180.0), 0.005));
    }
    for p in HUTS {
        push(&mut out, ModelKind::Hut, place(p, Mat4::IDENTITY, 0.005));
    }

    push(&mut out, ModelKind::Well, place(Vec3::new(4.0, 0.0, 0.0), Mat4::IDENTITY, 0.15));

    for p in FENCES {
        push(&mut out, ModelKind::Fence, place(p, Mat4::IDENTITY, 0.8));
    }
    for p in FENCES_ROTATED {
        push(&mut out, ModelKind::Fence, place(p, rot_y(90.0), 0.8));
    }
    for i in gate_instances(settings.gate_closed) {
        out.push(i);
    }

    for p in SHEEP_INSIDE {
        push(&mut out, ModelKind::Sheep, place(p, rot_y(-90.0), 0.6));
    }
    for (i, p) in SHEEP_OUTSIDE.into_iter().enumerate() {
        // Alternating left/right turns, widening down the flock
        let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
        let angle = 15.0 * sign * i as f32;
        push(&mut out, ModelKind::Sheep, place(p, rot_y(angle), 0.6));
    }

    // The lone standing villager
    push(
        &mut out,
        ModelKind::Human,
        place(
            Vec3::new(1.0, 0.0, 0.0),
            Mat4::from_rotation_x((-90.0_f32).to_radians()),
            0.009,
        ),
    );
    for (p, roll) in HUMANS_DOWN {
        let rotation = Mat4::from_rotation_x(90.0_f32.to_radians())
            * rot_y(180.0)
            * Mat4::from_rotation_z(roll.to_radians());
        push(&mut out, ModelKind::Human, place(p, rotation, 0.009));
    }

    out
}

/// The two gate fence segments, either swung open or latched shut.
pub fn gate_instances(closed: bool) -> [Instance; 2] {
    let seg = |position, rotation| Instance {
        kind: ModelKind::Fence,
        transform: place(position, rotation, 0.8),
    };
    if closed {
        [
            seg(Vec3::new(7.12, 0.0, 0.95), rot_y(90.0)),
            seg(Vec3::new(7.12, 0.0, -0.4), rot_y(90.0)),
        ]
    } else {
        [
            seg(Vec3::new(6.55, 0.0, 2.05), rot_y(45.0)),
            seg(Vec3::new(6.65, 0.0, -1.7), rot_y(-45.0)),
        ]
    }
}

/// World transforms for the alpha-tested foliage quads.
pub fn foliage_transforms() -> Vec<Mat4> {
    let mut out = Vec::with_capacity(VEGETATION.len() + VEGETATION_ROTATED.len());
    for p in VEGETATION {
        out.push(place(p, Mat4::IDENTITY, 7.0));
    }
    for p in VEGETATION_ROTATED {
        out.push(place(p, rot_y(90.0), 7.0));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_kind(instances: &[Instance], kind: ModelKind) -> usize {
        instances.iter().filter(|i| i.kind == kind).count()
    }

    #[test]
    fn test_instance_counts() {
        let settings = RenderSettings::default();
        let instances = model_instances(&settings, 0.0);
        assert_eq!(count_kind(&instances, ModelKind::Ufo), 1);
        assert_eq!(count_kind(&instances, ModelKind::Stall), 5);
        assert_eq!(count_kind(&instances, ModelKind::Hut), 17);
        assert_eq!(count_kind(&instances, ModelKind::Well), 1);
        // 10 straight + 22 rotated + 2 gate segments
        assert_eq!(count_kind(&instances, ModelKind::Fence), 34);
        assert_eq!(count_kind(&instances, ModelKind::Sheep), 21);
        assert_eq!(count_kind(&instances, ModelKind::Human), 13);
    }

    #[test]
    fn test_gate_variants_differ() {
        let open = gate_instances(false);
        let closed = gate_instances(true);
        for (a, b) in open.iter().zip(closed.iter()) {
            assert_ne!(a.transform, b.transform);
        }
        // Closed segments line up with the eastern fence row
        for seg in &closed {
            let t = seg.transform.w_axis;
            assert!((t.x - 7.12).abs() < 1e-6);
        }
    }

    #[test]
    fn test_ufo_orbit() {
        let p0 = ufo_position(0.0);
        assert!((p0 - Vec3::new(10.0, 7.0, 0.0)).length() < 1e-5);
        // Constant height and radius around the orbit
        for i in 0..16 {
            let p = ufo_position(i as f32 * 0.7);
            assert!((p.y - 7.0).abs() < 1e-6);
            let r = (p.x * p.x + p.z * p.z).sqrt();
            assert!((r - 10.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_foliage_count() {
        assert_eq!(foliage_transforms().len(), 36);
    }

    #[test]
    fn test_floor_lies_flat() {
        let m = floor_transform();
        // A quad normal of +z must map to +y after the x-rotation
        let n = m.transform_vector3(Vec3::Z).normalize();
        assert!((n - Vec3::Y).length() < 1e-5);
    }
}
