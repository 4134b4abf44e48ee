//! Equations sidebar and status panel
//!
//! Displays the oscillator equations and the live integrator state using egui.

use egui::{Color32, Context, RichText};

use spring_sim::{PhysicsStatus, SpringSimulation};

/// An equation with its name and formula
pub struct Equation {
    pub name: &'static str,
    pub formula: &'static str,
    pub description: &'static str,
}

/// Draw the equations sidebar
pub fn draw_equations_sidebar(
    ctx: &Context,
    title: &str,
    equations: &[Equation],
    variables: &[(&str, &str)],
) {
    egui::SidePanel::right("equations_panel")
        .resizable(true)
        .default_width(280.0)
        .show(ctx, |ui| {
            ui.heading(RichText::new(title).color(Color32::LIGHT_BLUE));
            ui.separator();

            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.collapsing(RichText::new("📐 Equations").strong(), |ui| {
                    for eq in equations {
                        ui.group(|ui| {
                            ui.label(RichText::new(eq.name).strong().color(Color32::YELLOW));
                            ui.label(RichText::new(eq.formula).monospace().color(Color32::WHITE));
                            ui.label(RichText::new(eq.description).small().italics());
                        });
                        ui.add_space(4.0);
                    }
                });

                ui.add_space(8.0);

                ui.collapsing(RichText::new("📖 Variables").strong(), |ui| {
                    egui::Grid::new("variables_grid")
                        .num_columns(2)
                        .spacing([10.0, 4.0])
                        .show(ui, |ui| {
                            for (symbol, meaning) in variables {
                                ui.label(RichText::new(*symbol).monospace().color(Color32::LIGHT_GREEN));
                                ui.label(*meaning);
                                ui.end_row();
                            }
                        });
                });
            });
        });
}

/// Live readout of the simulation, drawn as a small floating window.
pub fn draw_status_window(ctx: &Context, sim: &SpringSimulation, paused: bool) {
    let params = sim.params();
    let stats = sim.stats();
    let (exact_x, exact_v) = sim.exact_state();

    egui::Window::new("GUI")
        .default_pos([12.0, 48.0])
        .resizable(false)
        .show(ctx, |ui| {
            egui::Grid::new("state_grid")
                .num_columns(2)
                .spacing([12.0, 2.0])
                .show(ui, |ui| {
                    let rows = [
                        ("frame", format!("{}", sim.frame())),
                        ("t", format!("{:.3}", sim.time())),
                        ("x", format!("{:+.6}", sim.position())),
                        ("v", format!("{:+.6}", sim.velocity())),
                        ("E", format!("{:.6}", sim.energy())),
                        ("|x - x_exact|", format!("{:.2e}", (sim.position() - exact_x).abs())),
                        ("|v - v_exact|", format!("{:.2e}", (sim.velocity() - exact_v).abs())),
                    ];
                    for (name, value) in rows {
                        ui.label(RichText::new(name).monospace().color(Color32::LIGHT_GREEN));
                        ui.label(RichText::new(value).monospace());
                        ui.end_row();
                    }
                });

            ui.separator();
            ui.label(format!(
                "c = {}  k = {}  M = {}  F = {}",
                params.damping, params.stiffness, params.mass, params.forcing
            ));
            ui.label(format!(
                "ζ = {:.4} ({}), x_eq = {:.4}",
                params.damping_ratio(),
                params.regime().label(),
                params.equilibrium()
            ));
            ui.label(format!("binding: {}", sim.policy().label()));

            ui.separator();
            ui.label(format!(
                "{} steps ({} rejected), {} newton failures",
                stats.accepted, stats.rejected, stats.newton_failures
            ));
            ui.label(format!(
                "{} f evals, {} J evals",
                stats.rhs_evals, stats.jacobian_evals
            ));

            ui.separator();
            match sim.status() {
                PhysicsStatus::Frozen(err) => {
                    ui.label(RichText::new("FROZEN").color(Color32::RED));
                    ui.label(RichText::new(err.to_string()).small());
                    ui.label("press R to restart");
                }
                PhysicsStatus::Running if paused => {
                    ui.label(RichText::new("PAUSED").color(Color32::YELLOW));
                }
                PhysicsStatus::Running => {
                    ui.label(RichText::new("RUNNING").color(Color32::GREEN));
                }
            }
        });
}

// ============================================================================
// Damped Spring Equations
// ============================================================================

pub const SPRING_EQUATIONS: &[Equation] = &[
    Equation {
        name: "Equation of Motion",
        formula: "M·x'' + c·x' + k·x = F",
        description: "Damped mass on a spring under constant force",
    },
    Equation {
        name: "First-Order System",
        formula: "y₀' = y₁\ny₁' = (F - c·y₁ - k·y₀) / M",
        description: "State y = (position, velocity)",
    },
    Equation {
        name: "Jacobian",
        formula: "∂f/∂y = [ 0      1    ]\n        [ -k/M  -c/M ]",
        description: "Exact; used by the Newton iteration",
    },
    Equation {
        name: "Equilibrium",
        formula: "x_eq = F / k",
        description: "Rest position for c > 0",
    },
    Equation {
        name: "Damping Ratio",
        formula: "ζ = c / (2·√(k·M))",
        description: "ζ < 1 under-, ζ = 1 critically, ζ > 1 overdamped",
    },
    Equation {
        name: "Mechanical Energy",
        formula: "E = ½·M·v² + ½·k·x²",
        description: "Constant when c = 0 and F = 0",
    },
];

pub const SPRING_VARIABLES: &[(&str, &str)] = &[
    ("x, y₀", "Position"),
    ("v, y₁", "Velocity"),
    ("M", "Mass"),
    ("c", "Damping coefficient"),
    ("k", "Spring stiffness"),
    ("F", "Constant external force"),
    ("ω₀", "Natural frequency √(k/M)"),
    ("ζ", "Damping ratio"),
];
