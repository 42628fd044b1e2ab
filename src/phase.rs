use crate::config;
use crate::tuning::ShadowTuning;

/// Named periods of the day/night cycle, in cycle order from progress 0.0.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimeOfDay {
    Dawn,
    Morning,
    Noon,
    Afternoon,
    Dusk,
    TwilightEvening,
    Night,
    Midnight,
    TwilightMorning,
}

impl TimeOfDay {
    pub fn label(self) -> &'static str {
        match self {
            TimeOfDay::Dawn => "Dawn",
            TimeOfDay::Morning => "Morning",
            TimeOfDay::Noon => "Noon",
            TimeOfDay::Afternoon => "Afternoon",
            TimeOfDay::Dusk => "Dusk",
            TimeOfDay::TwilightEvening => "Twilight (evening)",
            TimeOfDay::Night => "Night",
            TimeOfDay::Midnight => "Midnight",
            TimeOfDay::TwilightMorning => "Twilight (morning)",
        }
    }

    pub fn from_progress(cycle_progress: f32) -> Self {
        phase_at(normalize_progress(cycle_progress)).period
    }

    pub fn descriptor(self) -> &'static PhaseDescriptor {
        PHASES
            .iter()
            .find(|p| p.period == self)
            .unwrap_or(&PHASES[0])
    }
}

/// Length reference resolved against per-entity tuning.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Stretch {
    Zero,
    /// k * max_stretch
    Max(f32),
    /// k * min_stretch
    Min(f32),
}

impl Stretch {
    pub fn resolve(self, tuning: &ShadowTuning) -> f32 {
        match self {
            Stretch::Zero => 0.0,
            Stretch::Max(k) => k * tuning.max_stretch,
            Stretch::Min(k) => k * tuning.min_stretch,
        }
    }
}

/// How a channel evolves across its phase, over local `t` in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Curve<T> {
    Constant(T),
    Linear(T, T),
    /// `edge` at both ends, `floor` at the midpoint, parabolic in between.
    Trough { edge: T, floor: T },
}

impl<T: Copy> Curve<T> {
    pub fn sample(self, t: f32, resolve: impl Fn(T) -> f32) -> f32 {
        match self {
            Curve::Constant(v) => resolve(v),
            Curve::Linear(from, to) => {
                let from = resolve(from);
                let to = resolve(to);
                from + (to - from) * t
            }
            Curve::Trough { edge, floor } => {
                let edge = resolve(edge);
                let floor = resolve(floor);
                let u = 2.0 * t - 1.0;
                floor + (edge - floor) * u * u
            }
        }
    }
}

/// One contiguous slice of the cycle. Alpha is a fraction of `max_alpha`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhaseDescriptor {
    pub period: TimeOfDay,
    pub start: f32,
    pub end: f32,
    pub alpha: Curve<f32>,
    pub length: Curve<Stretch>,
    pub shear: Curve<f32>,
    pub scale_y: Curve<f32>,
}

impl PhaseDescriptor {
    pub fn span(&self) -> f32 {
        self.end - self.start
    }

    pub fn contains(&self, p: f32) -> bool {
        p >= self.start && p < self.end
    }

    pub fn local_t(&self, p: f32) -> f32 {
        ((p - self.start) / self.span()).clamp(0.0, 1.0)
    }

    /// Evaluate this phase's rule at local `t`, without the isometric override.
    pub fn sample(&self, t: f32, tuning: &ShadowTuning) -> PhaseTransform {
        let ident = |v: f32| v;
        PhaseTransform {
            period: self.period,
            alpha: self.alpha.sample(t, ident) * tuning.max_alpha,
            length_factor: self.length.sample(t, |s| s.resolve(tuning)),
            shear_x: self.shear.sample(t, ident),
            scale_y: self.scale_y.sample(t, ident),
        }
    }
}

const DARK: (Curve<f32>, Curve<Stretch>, Curve<f32>, Curve<f32>) = (
    Curve::Constant(0.0),
    Curve::Constant(Stretch::Zero),
    Curve::Constant(0.0),
    Curve::Constant(0.5),
);

/// The full cycle, ordered by `start`. Adjacent phases share boundary values,
/// and Morning/Afternoon, Dawn/Dusk, TwilightMorning/TwilightEvening mirror
/// each other around solar noon with the shear sign flipped.
pub static PHASES: [PhaseDescriptor; 9] = [
    PhaseDescriptor {
        period: TimeOfDay::Dawn,
        start: 0.0,
        end: 0.05,
        alpha: Curve::Linear(0.4, 1.0),
        length: Curve::Linear(Stretch::Max(0.7), Stretch::Max(0.6)),
        shear: Curve::Linear(1.1, 0.8),
        scale_y: Curve::Linear(0.35, 0.4),
    },
    PhaseDescriptor {
        period: TimeOfDay::Morning,
        start: 0.05,
        end: 0.35,
        alpha: Curve::Constant(1.0),
        length: Curve::Linear(Stretch::Max(0.6), Stretch::Min(2.0)),
        shear: Curve::Linear(0.8, 0.0),
        scale_y: Curve::Linear(0.4, 0.7),
    },
    PhaseDescriptor {
        period: TimeOfDay::Noon,
        start: 0.35,
        end: 0.55,
        alpha: Curve::Constant(1.0),
        length: Curve::Trough {
            edge: Stretch::Min(2.0),
            floor: Stretch::Min(1.0),
        },
        shear: Curve::Constant(0.0),
        scale_y: Curve::Constant(0.7),
    },
    PhaseDescriptor {
        period: TimeOfDay::Afternoon,
        start: 0.55,
        end: 0.72,
        alpha: Curve::Constant(1.0),
        length: Curve::Linear(Stretch::Min(2.0), Stretch::Max(0.6)),
        shear: Curve::Linear(0.0, -0.8),
        scale_y: Curve::Linear(0.7, 0.4),
    },
    PhaseDescriptor {
        period: TimeOfDay::Dusk,
        start: 0.72,
        end: 0.76,
        alpha: Curve::Linear(1.0, 0.4),
        length: Curve::Linear(Stretch::Max(0.6), Stretch::Max(0.7)),
        shear: Curve::Linear(-0.8, -1.1),
        scale_y: Curve::Linear(0.4, 0.35),
    },
    PhaseDescriptor {
        period: TimeOfDay::TwilightEvening,
        start: 0.76,
        end: 0.80,
        alpha: Curve::Linear(0.4, 0.0),
        length: Curve::Linear(Stretch::Max(0.7), Stretch::Max(0.8)),
        shear: Curve::Linear(-1.1, -1.2),
        scale_y: Curve::Linear(0.35, 0.3),
    },
    PhaseDescriptor {
        period: TimeOfDay::Night,
        start: 0.80,
        end: 0.92,
        alpha: DARK.0,
        length: DARK.1,
        shear: DARK.2,
        scale_y: DARK.3,
    },
    PhaseDescriptor {
        period: TimeOfDay::Midnight,
        start: 0.92,
        end: 0.97,
        alpha: DARK.0,
        length: DARK.1,
        shear: DARK.2,
        scale_y: DARK.3,
    },
    PhaseDescriptor {
        period: TimeOfDay::TwilightMorning,
        start: 0.97,
        end: 1.0,
        alpha: Curve::Linear(0.0, 0.4),
        length: Curve::Linear(Stretch::Max(0.8), Stretch::Max(0.7)),
        shear: Curve::Linear(1.2, 1.1),
        scale_y: Curve::Linear(0.3, 0.35),
    },
];

/// Geometry and visibility of a shadow at one instant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhaseTransform {
    pub period: TimeOfDay,
    pub alpha: f32,
    pub length_factor: f32,
    pub shear_x: f32,
    pub scale_y: f32,
}

impl PhaseTransform {
    pub fn is_visible(&self) -> bool {
        self.alpha >= config::VISIBILITY_EPSILON && self.length_factor >= config::VISIBILITY_EPSILON
    }
}

/// Wrap into `[0, 1)`. Non-finite input lands on the wrap point.
pub fn normalize_progress(cycle_progress: f32) -> f32 {
    if !cycle_progress.is_finite() {
        return 0.0;
    }
    let p = cycle_progress.rem_euclid(1.0);
    // rem_euclid of a tiny negative rounds up to exactly 1.0 in f32
    if p >= 1.0 {
        0.0
    } else {
        p
    }
}

fn phase_at(p: f32) -> &'static PhaseDescriptor {
    PHASES
        .iter()
        .find(|phase| phase.contains(p))
        .unwrap_or(&PHASES[PHASES.len() - 1])
}

/// Map a cycle position to the shadow's alpha, length and ground-plane skew.
///
/// `isometric` swaps Noon's top-down shadow for Afternoon's opening geometry,
/// which reads better under sprites drawn in isometric projection.
pub fn phase_transform(cycle_progress: f32, tuning: &ShadowTuning, isometric: bool) -> PhaseTransform {
    let p = normalize_progress(cycle_progress);
    let phase = phase_at(p);

    if isometric && phase.period == TimeOfDay::Noon {
        return PhaseTransform {
            period: TimeOfDay::Noon,
            alpha: tuning.max_alpha,
            length_factor: tuning.max_stretch * 0.6,
            shear_x: 0.0,
            scale_y: 0.4,
        };
    }

    phase.sample(phase.local_t(p), tuning)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn tuning() -> ShadowTuning {
        ShadowTuning {
            max_alpha: 0.5,
            max_stretch: 2.2,
            min_stretch: 0.15,
            blur_px: 2.0,
            pivot_y_offset: 0.0,
        }
    }

    fn assert_close(a: f32, b: f32, what: &str) {
        assert!((a - b).abs() < EPS, "{what}: {a} vs {b}");
    }

    #[test]
    fn phases_partition_the_cycle() {
        assert_eq!(PHASES[0].start, 0.0);
        assert_eq!(PHASES[PHASES.len() - 1].end, 1.0);
        for pair in PHASES.windows(2) {
            assert_eq!(pair[0].end, pair[1].start, "{:?}", pair[0].period);
            assert!(pair[0].span() > 0.0);
        }
    }

    #[test]
    fn boundaries_are_continuous() {
        let t = tuning();
        for i in 0..PHASES.len() {
            let here = &PHASES[i];
            let next = &PHASES[(i + 1) % PHASES.len()];
            let left = here.sample(1.0, &t);
            let right = next.sample(0.0, &t);

            assert_close(left.alpha, right.alpha, "alpha");
            if left.is_visible() || right.is_visible() {
                assert_close(left.length_factor, right.length_factor, "length");
                assert_close(left.shear_x, right.shear_x, "shear");
                assert_close(left.scale_y, right.scale_y, "scale_y");
            }
        }
    }

    #[test]
    fn evaluating_just_either_side_of_a_boundary_does_not_pop() {
        let t = tuning();
        for phase in PHASES.iter().skip(1) {
            let b = phase.start;
            let left = phase_transform(b - 1e-4, &t, false);
            let right = phase_transform(b, &t, false);
            assert!((left.alpha - right.alpha).abs() < 0.01, "{:?}", phase.period);
            if left.is_visible() && right.is_visible() {
                assert!((left.shear_x - right.shear_x).abs() < 0.01);
                assert!((left.length_factor - right.length_factor).abs() < 0.01);
                assert!((left.scale_y - right.scale_y).abs() < 0.01);
            }
        }
    }

    fn assert_mirrored(morning: TimeOfDay, evening: TimeOfDay) {
        let t = tuning();
        let a = morning.descriptor();
        let b = evening.descriptor();
        for i in 0..=20 {
            let local = i as f32 / 20.0;
            let m = a.sample(local, &t);
            let e = b.sample(1.0 - local, &t);
            assert_close(m.alpha, e.alpha, "alpha");
            assert_close(m.length_factor, e.length_factor, "length");
            assert_close(m.shear_x, -e.shear_x, "shear");
            assert_close(m.scale_y, e.scale_y, "scale_y");
        }
    }

    #[test]
    fn morning_and_afternoon_mirror_around_noon() {
        assert_mirrored(TimeOfDay::Morning, TimeOfDay::Afternoon);
    }

    #[test]
    fn dawn_and_dusk_mirror() {
        assert_mirrored(TimeOfDay::Dawn, TimeOfDay::Dusk);
    }

    #[test]
    fn twilights_mirror() {
        assert_mirrored(TimeOfDay::TwilightMorning, TimeOfDay::TwilightEvening);
    }

    #[test]
    fn night_and_midnight_are_invisible() {
        let t = tuning();
        let mut p = 0.80;
        while p < 0.97 {
            let pt = phase_transform(p, &t, false);
            assert_eq!(pt.alpha, 0.0, "p = {p}");
            assert!(!pt.is_visible());
            p += 0.0025;
        }
    }

    #[test]
    fn solar_noon_has_no_lean_and_shortest_shadow() {
        let pt = phase_transform(0.45, &tuning(), false);
        assert_eq!(pt.period, TimeOfDay::Noon);
        assert_eq!(pt.shear_x, 0.0);
        assert!(pt.length_factor >= 0.15 - EPS && pt.length_factor <= 0.30);
        assert!(pt.is_visible());

        let edge = phase_transform(0.36, &tuning(), false);
        assert!(edge.length_factor > pt.length_factor);
    }

    #[test]
    fn morning_shear_shrinks_toward_noon() {
        let t = tuning();
        let pt = phase_transform(0.10, &t, false);
        assert_eq!(pt.period, TimeOfDay::Morning);
        assert!(pt.shear_x > 0.0 && pt.shear_x < 0.8);

        let mut last = pt.shear_x;
        for step in 1..=20 {
            let p = 0.10 + step as f32 * 0.0124;
            let s = phase_transform(p, &t, false).shear_x;
            assert!(s < last, "p = {p}");
            last = s;
        }
    }

    #[test]
    fn midnight_draws_nothing() {
        let loud = ShadowTuning {
            max_alpha: 1.0,
            max_stretch: 10.0,
            min_stretch: 5.0,
            ..tuning()
        };
        let pt = phase_transform(0.93, &loud, false);
        assert_eq!(pt.period, TimeOfDay::Midnight);
        assert!(!pt.is_visible());
    }

    #[test]
    fn isometric_override_only_touches_noon() {
        let t = tuning();
        let noon = phase_transform(0.45, &t, true);
        assert_close(noon.length_factor, 2.2 * 0.6, "length");
        assert_eq!(noon.shear_x, 0.0);
        assert_eq!(noon.scale_y, 0.4);
        assert_eq!(noon.alpha, t.max_alpha);

        for p in [0.02, 0.2, 0.6, 0.74, 0.99] {
            assert_eq!(phase_transform(p, &t, true), phase_transform(p, &t, false));
        }
    }

    #[test]
    fn out_of_range_progress_wraps() {
        let t = tuning();
        assert_eq!(normalize_progress(1.0), 0.0);
        assert_eq!(normalize_progress(-1e-9), 0.0);
        assert_eq!(normalize_progress(f32::NAN), 0.0);
        assert_close(normalize_progress(1.25), 0.25, "wrap");
        let wrapped = phase_transform(1.10, &t, false);
        let plain = phase_transform(0.10, &t, false);
        assert_eq!(wrapped.period, plain.period);
        assert!((wrapped.shear_x - plain.shear_x).abs() < 1e-4);
        assert_eq!(TimeOfDay::from_progress(-0.02), TimeOfDay::TwilightMorning);
    }

    #[test]
    fn period_lookup_matches_clock_ranges() {
        let cases = [
            (0.0, TimeOfDay::Dawn),
            (0.05, TimeOfDay::Morning),
            (0.35, TimeOfDay::Noon),
            (0.55, TimeOfDay::Afternoon),
            (0.72, TimeOfDay::Dusk),
            (0.76, TimeOfDay::TwilightEvening),
            (0.80, TimeOfDay::Night),
            (0.92, TimeOfDay::Midnight),
            (0.97, TimeOfDay::TwilightMorning),
        ];
        for (p, expected) in cases {
            assert_eq!(TimeOfDay::from_progress(p), expected, "p = {p}");
        }
    }
}
