//! # Simulation Backends
//!
//! The stepping simulation the engine mirrors. The engine calls these from
//! its tick thread only, one call at a time, so implementations need `Send`
//! but not `Sync`.
//!
//! [`DemoBackend`] is a small analytic stand-in (particles oscillating
//! around lattice sites) used by the headless binary and the tests.

use atomify_core::ParticleState;

use crate::error::{BackendError, BackendResult};

/// A stepping particle simulation.
pub trait SimulationBackend: Send {
    /// Advances the simulation by one step. May block.
    ///
    /// # Errors
    ///
    /// Backend-specific failure; the engine reports it and skips the tick.
    fn step(&mut self) -> BackendResult<()>;

    /// Reads the current particle positions and types.
    ///
    /// # Errors
    ///
    /// Backend-specific failure, or inconsistent arrays.
    fn synchronize(&mut self) -> BackendResult<ParticleState>;

    /// Reinitializes the simulation to a named preset.
    ///
    /// # Errors
    ///
    /// [`BackendError::Reset`] if the preset is unknown or fails to load.
    fn reset(&mut self, preset: &str) -> BackendResult<()>;
}

impl<B: SimulationBackend + ?Sized> SimulationBackend for Box<B> {
    fn step(&mut self) -> BackendResult<()> {
        (**self).step()
    }

    fn synchronize(&mut self) -> BackendResult<ParticleState> {
        (**self).synchronize()
    }

    fn reset(&mut self, preset: &str) -> BackendResult<()> {
        (**self).reset(preset)
    }
}

/// Preset name for a box of three-site water molecules.
pub const PRESET_WATER: &str = "water";
/// Preset name for a single-species Lennard-Jones lattice.
pub const PRESET_LJ: &str = "lj";

/// Analytic demo simulation.
///
/// Each particle oscillates around its lattice site with a per-particle
/// phase. Types follow the preset: water is one type-1 oxygen and two
/// type-2 hydrogens per molecule, Lennard-Jones is all type 1.
#[derive(Clone, Debug)]
pub struct DemoBackend {
    preset: String,
    /// Lattice sites, xyz.
    sites: Vec<[f64; 3]>,
    /// LAMMPS-style integer types, one per site.
    types: Vec<i32>,
    steps: u64,
    amplitude: f64,
}

impl DemoBackend {
    /// Oscillation amplitude around each site.
    pub const DEFAULT_AMPLITUDE: f64 = 0.15;

    /// Creates a backend in the Lennard-Jones preset.
    #[must_use]
    pub fn new() -> Self {
        let (sites, types) = lj_lattice(3, 1.5);
        Self {
            preset: PRESET_LJ.to_string(),
            sites,
            types,
            steps: 0,
            amplitude: Self::DEFAULT_AMPLITUDE,
        }
    }

    /// Creates a backend already reset to `preset`.
    ///
    /// # Errors
    ///
    /// [`BackendError::Reset`] for an unknown preset.
    pub fn with_preset(preset: &str) -> BackendResult<Self> {
        let mut backend = Self::new();
        backend.reset(preset)?;
        Ok(backend)
    }

    /// Active preset name.
    #[must_use]
    pub fn preset(&self) -> &str {
        &self.preset
    }

    /// Steps taken since the last reset.
    #[must_use]
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Number of particles in the active preset.
    #[must_use]
    pub fn particle_count(&self) -> usize {
        self.types.len()
    }
}

impl Default for DemoBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationBackend for DemoBackend {
    fn step(&mut self) -> BackendResult<()> {
        self.steps += 1;
        Ok(())
    }

    #[allow(clippy::cast_precision_loss)]
    fn synchronize(&mut self) -> BackendResult<ParticleState> {
        let t = self.steps as f64 * 0.1;
        let mut xyz = Vec::with_capacity(self.sites.len() * 3);
        for (i, site) in self.sites.iter().enumerate() {
            let phase = t + i as f64;
            xyz.push(site[0] + self.amplitude * phase.sin());
            xyz.push(site[1] + self.amplitude * (phase * 1.3).cos());
            xyz.push(site[2] + self.amplitude * (phase * 0.7).sin());
        }
        Ok(ParticleState::from_flat(&xyz, &self.types)?)
    }

    fn reset(&mut self, preset: &str) -> BackendResult<()> {
        let (sites, types) = match preset {
            PRESET_WATER => water_box(2, 3.0),
            PRESET_LJ => lj_lattice(3, 1.5),
            other => {
                return Err(BackendError::Reset {
                    preset: other.to_string(),
                    reason: format!("unknown preset, expected `{PRESET_WATER}` or `{PRESET_LJ}`"),
                });
            }
        };

        tracing::debug!("demo backend reset to {} ({} particles)", preset, types.len());
        self.preset = preset.to_string();
        self.sites = sites;
        self.types = types;
        self.steps = 0;
        Ok(())
    }
}

#[allow(clippy::cast_precision_loss)]
fn grid(side: usize, spacing: f64) -> impl Iterator<Item = [f64; 3]> {
    (0..side).flat_map(move |x| {
        (0..side).flat_map(move |y| {
            (0..side).map(move |z| [x as f64 * spacing, y as f64 * spacing, z as f64 * spacing])
        })
    })
}

fn lj_lattice(side: usize, spacing: f64) -> (Vec<[f64; 3]>, Vec<i32>) {
    let sites: Vec<[f64; 3]> = grid(side, spacing).collect();
    let types = vec![1; sites.len()];
    (sites, types)
}

fn water_box(side: usize, spacing: f64) -> (Vec<[f64; 3]>, Vec<i32>) {
    let mut sites = Vec::new();
    let mut types = Vec::new();
    for [x, y, z] in grid(side, spacing) {
        sites.push([x, y, z]);
        types.push(1);
        sites.push([x + 0.76, y + 0.59, z]);
        types.push(2);
        sites.push([x - 0.76, y + 0.59, z]);
        types.push(2);
    }
    (sites, types)
}
