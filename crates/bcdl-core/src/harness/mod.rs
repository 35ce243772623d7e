// Test harness module
// Scripted backend and orchestrator simulator

pub mod scripted;
pub mod simulator;

pub use scripted::{BackendCall, Script, ScriptedBackend};
pub use simulator::{
    run_simulation, DeliveryMode, InvariantCheck, InvariantViolation, SimulationReport,
    SimulatorConfig,
};

/// Result of [`run_certification`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificationReport {
    /// All seeds and modes passed
    pub passed: bool,
    /// Violations across every run
    pub total_violations: usize,
    /// Seeds exercised per mode
    pub seeds_tested: u64,
}

/// Run the simulator over `seeds` seeds in every delivery mode
pub async fn run_certification(seeds: u64) -> CertificationReport {
    let mut total_violations = 0;

    for mode in [DeliveryMode::Incremental, DeliveryMode::Bulk, DeliveryMode::Both] {
        for seed in 0..seeds {
            let report = run_simulation(SimulatorConfig {
                seed,
                mode,
                sessions: 2,
                ..SimulatorConfig::default()
            })
            .await;
            if !report.passed() {
                tracing::warn!(seed, %mode, "certification run failed");
            }
            total_violations += report.violations.len();
        }
    }

    CertificationReport {
        passed: total_violations == 0,
        total_violations,
        seeds_tested: seeds,
    }
}
