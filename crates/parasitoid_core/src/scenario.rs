//! The catalogue of textbook computations.
//!
//! Every scenario runs one computation with the textbook constants and returns
//! the figure a renderer draws plus any scalars the computation reports.
//! Colors, line styles and legend text come from explicit per-scenario tables.

use crate::figure::{Color, Figure, LineStyle, Panel, Series, Style};
use crate::integrator::{linspace, IntegrationMethod, Solution, Tolerances};
use crate::linearization::{jacobian, nicholson_bailey_jury, spectral_radius};
use crate::models::{
    ConstantAttack, FunctionalAttack, FunctionalResponse, HostMortality, HostRefuge, LarvalState,
    LogisticMap, MortalityAttack, NicholsonBailey, PlanarExample,
};
use crate::semi_discrete::{EggDelay, NumericalHostMortality, SemiDiscrete};
use crate::tracer::{Boundary, RootSettings, SweepCurve};
use crate::trajectory::{generate, iterate_map, Trajectory};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Initial census used by every host-parasitoid scenario.
const H0: f64 = 5.0;
const P0: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    LogisticMap,
    PlanarExample,
    NicholsonBailey,
    NicholsonBaileyJury,
    HostRefugeTrajectory,
    HostRefugeStability,
    VulnerablePeriodAttack,
    EggMaturationOde,
    HostMortalityExplicitOde,
    HostMortalityNumericalOde,
    EggDelayTrajectory,
    FunctionalResponseTrajectory,
    HostMortalityStability,
    HostMortalityTrajectories,
}

impl Scenario {
    pub const ALL: [Scenario; 14] = [
        Scenario::LogisticMap,
        Scenario::PlanarExample,
        Scenario::NicholsonBailey,
        Scenario::NicholsonBaileyJury,
        Scenario::HostRefugeTrajectory,
        Scenario::HostRefugeStability,
        Scenario::VulnerablePeriodAttack,
        Scenario::EggMaturationOde,
        Scenario::HostMortalityExplicitOde,
        Scenario::HostMortalityNumericalOde,
        Scenario::EggDelayTrajectory,
        Scenario::FunctionalResponseTrajectory,
        Scenario::HostMortalityStability,
        Scenario::HostMortalityTrajectories,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Scenario::LogisticMap => "logistic-map",
            Scenario::PlanarExample => "planar-example",
            Scenario::NicholsonBailey => "nicholson-bailey",
            Scenario::NicholsonBaileyJury => "nicholson-bailey-jury",
            Scenario::HostRefugeTrajectory => "host-refuge-trajectory",
            Scenario::HostRefugeStability => "host-refuge-stability",
            Scenario::VulnerablePeriodAttack => "vulnerable-period-attack",
            Scenario::EggMaturationOde => "egg-maturation-ode",
            Scenario::HostMortalityExplicitOde => "host-mortality-explicit-ode",
            Scenario::HostMortalityNumericalOde => "host-mortality-numerical-ode",
            Scenario::EggDelayTrajectory => "egg-delay-trajectory",
            Scenario::FunctionalResponseTrajectory => "functional-response-trajectory",
            Scenario::HostMortalityStability => "host-mortality-stability",
            Scenario::HostMortalityTrajectories => "host-mortality-trajectories",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Scenario::LogisticMap => "logistic map from six initial conditions",
            Scenario::PlanarExample => "two-variable example and eigenvalues at its fixed points",
            Scenario::NicholsonBailey => "Nicholson-Bailey trajectory",
            Scenario::NicholsonBaileyJury => "Jury functions of the Nicholson-Bailey equilibrium",
            Scenario::HostRefugeTrajectory => "host refuge trajectories, weak and strong refuge",
            Scenario::HostRefugeStability => "host refuge stability region in (R, alpha)",
            Scenario::VulnerablePeriodAttack => "constant and functional attack during the vulnerable period",
            Scenario::EggMaturationOde => "egg maturation delay during one vulnerable period",
            Scenario::HostMortalityExplicitOde => "closed-form host mortality ODE solution",
            Scenario::HostMortalityNumericalOde => "numerically integrated host mortality ODE",
            Scenario::EggDelayTrajectory => "semi-discrete egg maturation delay model",
            Scenario::FunctionalResponseTrajectory => "functional response model trajectory",
            Scenario::HostMortalityStability => "host mortality stability region in (R, z)",
            Scenario::HostMortalityTrajectories => "host mortality trajectories for three values of z",
        }
    }

    pub fn run(self, settings: &RunSettings) -> Result<Report> {
        settings.validate()?;
        log::info!("running scenario {}", self.name());
        let report = match self {
            Scenario::LogisticMap => logistic_map(),
            Scenario::PlanarExample => planar_example(),
            Scenario::NicholsonBailey => nicholson_bailey(),
            Scenario::NicholsonBaileyJury => nicholson_bailey_jury_functions(),
            Scenario::HostRefugeTrajectory => host_refuge_trajectory(),
            Scenario::HostRefugeStability => stability_region(&HOST_REFUGE_REGION, settings),
            Scenario::VulnerablePeriodAttack => vulnerable_period_attack(settings),
            Scenario::EggMaturationOde => egg_maturation_ode(settings),
            Scenario::HostMortalityExplicitOde => host_mortality_ode(settings, false),
            Scenario::HostMortalityNumericalOde => host_mortality_ode(settings, true),
            Scenario::EggDelayTrajectory => egg_delay_trajectory(settings),
            Scenario::FunctionalResponseTrajectory => functional_response_trajectory(),
            Scenario::HostMortalityStability => stability_region(&HOST_MORTALITY_REGION, settings),
            Scenario::HostMortalityTrajectories => host_mortality_trajectories(),
        };
        report.with_context(|| format!("scenario {} failed", self.name()))
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scenario {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        match Scenario::ALL.iter().find(|scenario| scenario.name() == wanted) {
            Some(scenario) => Ok(*scenario),
            None => bail!("Unknown scenario '{s}'. Run `list` to see the available names."),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    pub tolerances: Tolerances,
    pub roots: RootSettings,
    /// Number of `R` values in a stability-region sweep.
    pub sweep_samples: usize,
    /// Number of sample times across one vulnerable period.
    pub grid_points: usize,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            tolerances: Tolerances::default(),
            roots: RootSettings::default(),
            sweep_samples: 100,
            grid_points: 1000,
        }
    }
}

impl RunSettings {
    pub fn validate(&self) -> Result<()> {
        self.tolerances.validate()?;
        self.roots.validate()?;
        if self.sweep_samples == 0 {
            bail!("sweep_samples must be greater than zero.");
        }
        if self.grid_points < 2 {
            bail!("grid_points must be at least 2.");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedValue {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub figure: Figure,
    pub scalars: Vec<NamedValue>,
}

impl Report {
    fn new(figure: Figure) -> Self {
        Self {
            figure,
            scalars: Vec::new(),
        }
    }

    fn with_scalar(mut self, name: impl Into<String>, value: f64) -> Self {
        self.scalars.push(NamedValue {
            name: name.into(),
            value,
        });
        self
    }

    pub fn scalar(&self, name: &str) -> Option<f64> {
        self.scalars.iter().find(|s| s.name == name).map(|s| s.value)
    }
}

/// Legend and axis text of a two-variable trajectory figure.
struct PairLabels {
    time_axis: &'static str,
    value_axis: &'static str,
    first: &'static str,
    second: &'static str,
    legend_first: &'static str,
    legend_second: &'static str,
    orbit: &'static str,
    start: &'static str,
}

const PLANAR_LABELS: PairLabels = PairLabels {
    time_axis: "t",
    value_axis: "x_t, y_t",
    first: "x_t",
    second: "y_t",
    legend_first: "x_t",
    legend_second: "y_t",
    orbit: "(x_t,y_t)",
    start: "(x_0,y_0)",
};

const HOST_PARASITOID_LABELS: PairLabels = PairLabels {
    time_axis: "t (years)",
    value_axis: "H_t, P_t",
    first: "H_t",
    second: "P_t",
    legend_first: "Hosts",
    legend_second: "Parasitoids",
    orbit: "(H_t,P_t)",
    start: "(H_0,P_0)",
};

const NICHOLSON_BAILEY_LABELS: PairLabels = PairLabels {
    first: "H_t (hosts)",
    second: "P_t (parasitoids)",
    ..HOST_PARASITOID_LABELS
};

fn time_series_panel(title: &str, trajectory: &Trajectory, labels: &PairLabels) -> Panel {
    Panel::new(title, labels.time_axis, labels.value_axis)
        .with_series(Series::new(
            labels.legend_first,
            Style::trajectory(Color::Red),
            trajectory.indexed(0),
        ))
        .with_series(Series::new(
            labels.legend_second,
            Style::trajectory(Color::Blue),
            trajectory.indexed(1),
        ))
}

fn phase_panel(title: &str, trajectory: &Trajectory, labels: &PairLabels) -> Panel {
    let start = trajectory
        .first()
        .map(|s| vec![[s[0], s[1]]])
        .unwrap_or_default();
    Panel::new(title, labels.first, labels.second)
        .with_series(Series::new(
            labels.orbit,
            Style::trajectory(Color::Black),
            trajectory.phase(0, 1),
        ))
        .with_series(Series::new(labels.start, Style::point(Color::Green), start))
}

/// Time-series and phase-plane panels side by side.
fn trajectory_figure(title: &str, trajectory: &Trajectory, labels: &PairLabels) -> Figure {
    Figure::new(title)
        .with_panel(time_series_panel("Time Series Plot", trajectory, labels))
        .with_panel(phase_panel("Phase Plane Plot", trajectory, labels))
}

fn logistic_map() -> Result<Report> {
    const RUNS: [(f64, Color, &str); 6] = [
        (0.05, Color::Magenta, "x_0=.05"),
        (0.22, Color::Red, "x_0=.22"),
        (0.39, Color::Green, "x_0=.39"),
        (0.56, Color::Cyan, "x_0=.56"),
        (0.73, Color::Blue, "x_0=.73"),
        (0.90, Color::Black, "x_0=.90"),
    ];
    let map = LogisticMap::default();
    let mut panel = Panel::new("Trajectories of the Logistic Map", "t", "x_t").with_y_limits(0.0, 1.0);
    for (x0, color, label) in RUNS {
        let trajectory = iterate_map(map, &[x0], 10)?;
        panel = panel.with_series(Series::new(label, Style::trajectory(color), trajectory.indexed(0)));
    }
    Ok(Report::new(Figure::new("Logistic Map").with_panel(panel))
        .with_scalar("fixed_point", map.fixed_point()))
}

fn planar_example() -> Result<Report> {
    let trajectory = iterate_map(PlanarExample, &[5.0, 1.0], 150)?;
    let figure = trajectory_figure("Trajectory of 2D Example", &trajectory, &PLANAR_LABELS);
    let rho_1 = spectral_radius(&jacobian(&PlanarExample, 0.0, &PlanarExample::STABLE_FIXED_POINT))?;
    let rho_2 = spectral_radius(&jacobian(&PlanarExample, 0.0, &PlanarExample::UNSTABLE_FIXED_POINT))?;
    Ok(Report::new(figure)
        .with_scalar("rho_1", rho_1)
        .with_scalar("rho_2", rho_2))
}

fn nicholson_bailey() -> Result<Report> {
    let trajectory = iterate_map(NicholsonBailey::default(), &[H0, P0], 20)?;
    let title = "Trajectory of Nicholson-Bailey Model";
    let figure = Figure::new(title)
        .with_panel(time_series_panel(title, &trajectory, &NICHOLSON_BAILEY_LABELS))
        .with_panel(phase_panel(title, &trajectory, &NICHOLSON_BAILEY_LABELS));
    Ok(Report::new(figure))
}

/// Points on the `R` axis of the Jury plot.
const JURY_SAMPLES: usize = 10_000;

fn nicholson_bailey_jury_functions() -> Result<Report> {
    const CURVES: [(&str, Color); 3] = [
        ("Jury 1", Color::Black),
        ("Jury 2", Color::Red),
        ("Jury 3", Color::Blue),
    ];
    // R = 1 itself is a removable singularity of J2 and J3.
    let values: Vec<(f64, [f64; 3])> = linspace(1.0, 7.0, JURY_SAMPLES)
        .into_iter()
        .skip(1)
        .map(|r| (r, nicholson_bailey_jury(r)))
        .collect();

    let mut panel = Panel::new(
        "Stability Analysis of N-B Model",
        "R (viable eggs per adult host)",
        "Jury Functions",
    );
    for (index, (label, color)) in CURVES.into_iter().enumerate() {
        let points = values.iter().map(|(r, j)| [*r, j[index]]).collect();
        panel = panel.with_series(Series::new(label, Style::line(color, 5.0), points));
    }

    let [j1, j2, j3] = nicholson_bailey_jury(2.0);
    Ok(Report::new(Figure::new("Nicholson-Bailey Jury Functions").with_panel(panel))
        .with_scalar("jury_1_at_r_2", j1)
        .with_scalar("jury_2_at_r_2", j2)
        .with_scalar("jury_3_at_r_2", j3))
}

fn host_refuge_trajectory() -> Result<Report> {
    struct RefugeRun {
        alpha: f64,
        title: &'static str,
        note: &'static str,
        note_at: (f64, f64),
        y_limits: Option<[f64; 2]>,
    }
    const RUNS: [RefugeRun; 2] = [
        RefugeRun {
            alpha: 0.2,
            title: "Host Refuge Trajectories",
            note: "Weak Refuge - Limit Cycle (α = 0.2)",
            note_at: (0.01, 0.9),
            y_limits: Some([0.0, 75.0]),
        },
        RefugeRun {
            alpha: 0.4,
            title: "",
            note: "Strong Refuge - Stable (α = 0.4)",
            note_at: (0.2, 0.1),
            y_limits: None,
        },
    ];

    let mut figure = Figure::new("Host Refuge Trajectories");
    for run in RUNS {
        let trajectory = iterate_map(HostRefuge::with_alpha(run.alpha), &[H0, P0], 50)?;
        let mut panel = time_series_panel(run.title, &trajectory, &HOST_PARASITOID_LABELS)
            .annotate(run.note, run.note_at.0, run.note_at.1);
        panel.y_limits = run.y_limits;
        figure = figure.with_panel(panel);
    }
    Ok(Report::new(figure))
}

/// Axis text and region labels of a stability-region plot.
struct RegionLayout {
    boundary: Boundary,
    title: &'static str,
    y_label: &'static str,
    limit_label: &'static str,
    critical_label: &'static str,
    regions: [&'static str; 3],
}

const HOST_REFUGE_REGION: RegionLayout = RegionLayout {
    boundary: Boundary::HostRefuge,
    title: "Host Refuge Stability Region",
    y_label: "α (strength of host refuge)",
    limit_label: "α = 1/R",
    critical_label: "α = α*",
    regions: [
        "Bounded Oscillations",
        "Stable Equilibrium",
        "Unbounded Solutions",
    ],
};

const HOST_MORTALITY_REGION: RegionLayout = RegionLayout {
    boundary: Boundary::HostMortality,
    title: "Host Mortality Stability Region",
    y_label: "z = c_d/kc (relative strength of host mortality to parasitism)",
    limit_label: "z = ln(R)",
    critical_label: "z = z*",
    regions: [
        "No-Parasitoid Equilibrium",
        "Stable Coexistence",
        "Bounded Oscillations",
    ],
};

fn stability_region(layout: &RegionLayout, settings: &RunSettings) -> Result<Report> {
    let controls = linspace(1.01, 5.0, settings.sweep_samples);
    let curve: SweepCurve = layout
        .boundary
        .trace(&controls, &settings.roots)
        .context("Failed to trace the stability boundary.")?;

    let limit = controls
        .iter()
        .map(|&r| [r, layout.boundary.persistence_limit(r)])
        .collect();
    let mut panel = Panel::new(layout.title, "R (viable eggs per adult host)", layout.y_label)
        .with_series(Series::new(layout.limit_label, Style::line(Color::Black, 3.0), limit))
        .with_series(Series::new(
            layout.critical_label,
            Style::line(Color::Black, 3.0).dashed(LineStyle::DashDot),
            curve.pairs(),
        ));
    for (text, y) in layout.regions.iter().zip([0.5, 0.6, 0.7]) {
        panel = panel.annotate(*text, 0.5, y);
    }

    let unconverged = curve.points.iter().filter(|p| !p.converged).count();
    let worst = curve.points.iter().map(|p| p.residual).fold(0.0, f64::max);
    Ok(Report::new(Figure::new(layout.title).with_panel(panel))
        .with_scalar("unconverged_roots", unconverged as f64)
        .with_scalar("max_residual", worst))
}

/// Line styles of the two parameter values drawn on one vulnerable-period panel.
const PARAMETER_STYLES: [(LineStyle, f64); 2] = [(LineStyle::Solid, 4.0), (LineStyle::Dotted, 3.0)];

fn larval_series(
    panel: Panel,
    tag: &str,
    index: usize,
    times: &[f64],
    states: impl Iterator<Item = LarvalState>,
) -> Panel {
    let (line, width) = PARAMETER_STYLES[index];
    let (larvae, parasitized): (Vec<_>, Vec<_>) = times
        .iter()
        .zip(states)
        .map(|(&tau, s)| ([tau, s[0]], [tau, s[1]]))
        .unzip();
    panel
        .with_series(Series::new(
            format!("L(τ,t), {tag}"),
            Style::line(Color::Black, width).dashed(line),
            larvae,
        ))
        .with_series(Series::new(
            format!("I(τ,t), {tag}"),
            Style::line(Color::Red, width).dashed(line),
            parasitized,
        ))
}

const TAU_LABEL: &str = "τ (time in vulnerable period)";
const LARVAL_LABEL: &str = "L(τ,t) and I(τ,t)";

fn vulnerable_period_attack(settings: &RunSettings) -> Result<Report> {
    const ATTACK_RATES: [(f64, &str); 2] = [(0.1, "c = 0.1"), (1.0, "c = 1")];
    let r = 2.0;
    let tau = linspace(0.0, 1.0, settings.grid_points);
    let seed = [r * H0, 0.0, P0];

    let mut constant = Panel::new("Constant Attack", TAU_LABEL, LARVAL_LABEL);
    let mut functional = Panel::new("Functional Response Attack", TAU_LABEL, LARVAL_LABEL);
    for (index, (c, tag)) in ATTACK_RATES.into_iter().enumerate() {
        let model = ConstantAttack { c };
        constant = larval_series(constant, tag, index, &tau, tau.iter().map(|&t| model.explicit(seed, t)));
        let model = FunctionalAttack { c };
        functional = larval_series(functional, tag, index, &tau, tau.iter().map(|&t| model.explicit(seed, t)));
    }
    Ok(Report::new(
        Figure::new("Parasitism During the Vulnerable Period")
            .with_panel(constant)
            .with_panel(functional),
    ))
}

fn egg_maturation_ode(settings: &RunSettings) -> Result<Report> {
    const CURVES: [(&str, Color, LineStyle); 4] = [
        ("L(τ,t)", Color::Black, LineStyle::Solid),
        ("I(τ,t)", Color::Red, LineStyle::Solid),
        ("P_0(τ,t)", Color::Blue, LineStyle::Dotted),
        ("P_1(τ,t)", Color::Blue, LineStyle::Solid),
    ];
    let model = SemiDiscrete::new(
        EggDelay {
            cr: 10.0,
            ..EggDelay::default()
        },
        IntegrationMethod::DormandPrince45,
    )
    .with_tolerances(settings.tolerances);
    let solution = model.vulnerable_period([H0, P0], settings.grid_points)?;

    let mut panel = Panel::new("Egg Maturation Delay", TAU_LABEL, LARVAL_LABEL);
    for (index, (label, color, line)) in CURVES.into_iter().enumerate() {
        panel = panel.with_series(Series::new(
            label,
            Style::line(color, 5.0).dashed(line),
            solution.series(index),
        ));
    }
    Ok(Report::new(Figure::new("Egg Maturation Delay").with_panel(panel))
        .with_scalar("accepted_steps", solution.stats.accepted_steps as f64))
}

fn host_mortality_ode(settings: &RunSettings, numerical: bool) -> Result<Report> {
    const MORTALITY_RATES: [(f64, &str); 2] = [(0.1, "c_d = 0.1"), (1.0, "c_d = 1")];
    let (c, r) = (0.1, 2.0);
    let tau = linspace(0.0, 1.0, settings.grid_points);
    let seed: LarvalState = [r * H0, 0.0, P0];

    let mut panel = Panel::new("Constant Attack with Host Mortality", TAU_LABEL, LARVAL_LABEL);
    let mut worst = 0.0_f64;
    for (index, (cd, tag)) in MORTALITY_RATES.into_iter().enumerate() {
        let model = MortalityAttack { c, cd };
        if numerical {
            let solution: Solution = SemiDiscrete::new(
                NumericalHostMortality { c, cd, r, k: 1.0 },
                IntegrationMethod::DormandPrince45,
            )
            .with_tolerances(settings.tolerances)
            .vulnerable_period([H0, P0], settings.grid_points)?;
            let exact = model.explicit(seed, 1.0);
            let end = solution.final_state();
            for i in 0..2 {
                worst = worst.max((end[i] - exact[i]).abs() / exact[i].abs());
            }
            let states = solution.states.states().map(|s| [s[0], s[1], s[2]]);
            panel = larval_series(panel, tag, index, &solution.times, states);
        } else {
            panel = larval_series(panel, tag, index, &tau, tau.iter().map(|&t| model.explicit(seed, t)));
        }
    }

    let mut report = Report::new(Figure::new("Constant Attack with Host Mortality").with_panel(panel));
    if numerical {
        report = report.with_scalar("max_relative_error_at_t", worst);
    }
    Ok(report)
}

fn egg_delay_trajectory(settings: &RunSettings) -> Result<Report> {
    let mut model = SemiDiscrete::new(EggDelay::default(), IntegrationMethod::Rosenbrock23)
        .with_tolerances(settings.tolerances);
    let trajectory =
        generate(&mut model, &[H0, P0], 50).context("Egg delay trajectory aborted.")?;
    Ok(Report::new(trajectory_figure(
        "Trajectory of Egg Maturation Delay Model",
        &trajectory,
        &HOST_PARASITOID_LABELS,
    )))
}

fn functional_response_trajectory() -> Result<Report> {
    let trajectory = iterate_map(FunctionalResponse::default(), &[H0, P0], 50)?;
    Ok(Report::new(trajectory_figure(
        "Trajectory of Functional Response Model",
        &trajectory,
        &HOST_PARASITOID_LABELS,
    )))
}

fn host_mortality_trajectories() -> Result<Report> {
    const RUNS: [(f64, &str); 3] = [
        (0.8, "Trajectories of Host Mortality Model"),
        (0.5, ""),
        (0.23, ""),
    ];
    let mut figure = Figure::new("Trajectories of Host Mortality Model");
    for (z, title) in RUNS {
        let trajectory = iterate_map(HostMortality::with_z(z), &[H0, P0], 50)?;
        figure = figure.with_panel(
            time_series_panel(title, &trajectory, &HOST_PARASITOID_LABELS)
                .annotate(format!("z = {z}"), 0.8, 0.9),
        );
    }
    Ok(Report::new(figure))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_err_contains<T: std::fmt::Debug>(result: Result<T>, needle: &str) {
        let err = result.expect_err("expected error");
        let message = format!("{err:#}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    fn quick() -> RunSettings {
        RunSettings {
            grid_points: 50,
            sweep_samples: 20,
            ..RunSettings::default()
        }
    }

    #[test]
    fn names_parse_back() {
        for scenario in Scenario::ALL {
            assert_eq!(scenario.name().parse::<Scenario>().expect("parse"), scenario);
        }
        assert_eq!(
            "Host_Refuge_Stability".parse::<Scenario>().expect("parse"),
            Scenario::HostRefugeStability
        );
        assert_err_contains("lotka-volterra".parse::<Scenario>(), "Unknown scenario");
    }

    #[test]
    fn every_scenario_produces_a_figure() {
        let settings = quick();
        for scenario in Scenario::ALL {
            let report = scenario.run(&settings).expect("scenario runs");
            assert!(!report.figure.panels.is_empty(), "{scenario}");
            for panel in &report.figure.panels {
                assert!(!panel.series.is_empty(), "{scenario}");
                assert!(panel.series.iter().all(|s| !s.points.is_empty()), "{scenario}");
            }
        }
    }

    #[test]
    fn planar_example_reports_spectral_radii() {
        let report = Scenario::PlanarExample.run(&quick()).expect("report");
        let rho_1 = report.scalar("rho_1").expect("rho_1");
        let rho_2 = report.scalar("rho_2").expect("rho_2");
        assert!((rho_1 - 0.9375_f64.sqrt()).abs() < 1e-12);
        assert!(rho_2 > 1.0);
        let series = &report.figure.panels[0].series[0];
        assert_eq!(series.label, "x_t");
        assert_eq!(series.style.color, Color::Red);
        assert_eq!(series.points.len(), 151);
    }

    #[test]
    fn logistic_style_table_is_fixed() {
        let report = Scenario::LogisticMap.run(&quick()).expect("report");
        let panel = &report.figure.panels[0];
        let colors: Vec<Color> = panel.series.iter().map(|s| s.style.color).collect();
        assert_eq!(
            colors,
            vec![
                Color::Magenta,
                Color::Red,
                Color::Green,
                Color::Cyan,
                Color::Blue,
                Color::Black
            ]
        );
        assert_eq!(panel.series[0].label, "x_0=.05");
        assert_eq!(panel.y_limits, Some([0.0, 1.0]));
    }

    #[test]
    fn stability_regions_converge_everywhere() {
        for scenario in [Scenario::HostRefugeStability, Scenario::HostMortalityStability] {
            let report = scenario.run(&RunSettings::default()).expect("report");
            assert_eq!(report.scalar("unconverged_roots"), Some(0.0));
            assert!(report.scalar("max_residual").expect("residual") < 1e-6);
            assert_eq!(report.figure.panels[0].series[1].points.len(), 100);
            assert_eq!(report.figure.panels[0].annotations.len(), 3);
        }
    }

    #[test]
    fn numerical_mortality_matches_closed_form() {
        let report = Scenario::HostMortalityNumericalOde
            .run(&RunSettings::default())
            .expect("report");
        let error = report.scalar("max_relative_error_at_t").expect("error");
        assert!(error < 1e-6, "relative error {error}");
        assert_eq!(report.figure.panels[0].series.len(), 4);
    }

    #[test]
    fn jury_scenario_skips_singular_endpoint() {
        let report = Scenario::NicholsonBaileyJury.run(&quick()).expect("report");
        for series in &report.figure.panels[0].series {
            assert_eq!(series.points.len(), JURY_SAMPLES - 1);
            assert!(series.points.iter().all(|p| p[1].is_finite()));
        }
        let coarse = RunSettings { grid_points: 2, ..quick() };
        let again = Scenario::NicholsonBaileyJury.run(&coarse).expect("report");
        assert_eq!(again.figure.panels[0].series[0].points.len(), JURY_SAMPLES - 1);
        assert!(report.scalar("jury_3_at_r_2").expect("j3") < 0.0);
    }

    #[test]
    fn invalid_settings_fail_before_running() {
        let settings = RunSettings {
            grid_points: 1,
            ..RunSettings::default()
        };
        assert_err_contains(Scenario::EggMaturationOde.run(&settings), "grid_points");
    }
}
