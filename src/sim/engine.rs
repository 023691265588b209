//! Simulation engine coupling PV, battery, and GPUs on a single DC bus.

use tracing::debug;

use crate::config::{BatteryConfig, GpuConfig, SimulationConfig};
use crate::devices::battery::{self, BatteryStepResult};
use crate::devices::gpu;

use super::governor::Governor;
use super::types::{EngineState, StepInput, TimestepRecord};

/// Simulation engine owning the device configuration and governor.
///
/// Generic over `G: Governor` for static dispatch. The engine itself is
/// immutable; all evolving state lives in the [`EngineState`] threaded
/// through [`Engine::step`].
pub struct Engine<G: Governor> {
    simulation: SimulationConfig,
    battery: BatteryConfig,
    gpu: GpuConfig,
    governor: G,
}

/// Power split decided for one step before the record is assembled.
struct Allocation {
    served_w: f64,
    battery: BatteryStepResult,
}

impl<G: Governor> Engine<G> {
    /// Creates a new simulation engine.
    ///
    /// # Arguments
    ///
    /// * `simulation` - Timestep settings
    /// * `battery` - Battery parameters
    /// * `gpu` - GPU parameters
    /// * `governor` - Power governor deciding the GPU request
    pub fn new(
        simulation: SimulationConfig,
        battery: BatteryConfig,
        gpu: GpuConfig,
        governor: G,
    ) -> Self {
        Self {
            simulation,
            battery,
            gpu,
            governor,
        }
    }

    /// State every independent run starts from.
    pub fn initial_state(&self) -> EngineState {
        EngineState::initial(&self.battery)
    }

    /// Executes one simulation timestep.
    ///
    /// PV feeds the GPU request first. A shortfall is drawn from the battery
    /// (bounded by its instantaneous discharge capability) and recorded as
    /// unmet; otherwise leftover PV charges the battery (bounded by its
    /// charge capability) and any unserved request is recorded as
    /// curtailed. If PV plus battery cannot lift the GPUs to idle they are
    /// switched off for the step and the battery is not drained for nothing.
    ///
    /// # Returns
    ///
    /// The state for the next step and the record of this one.
    pub fn step(&self, state: EngineState, input: &StepInput) -> (EngineState, TimestepRecord) {
        let dt_hours = self.simulation.dt_hours();
        let gpu_max = gpu::max_power_w(&self.gpu);
        let pv = input.pv_bus_power_w.max(0.0);

        // 1. Governor
        let governor = self
            .governor
            .target_power(state.battery.soc, input.seconds_to_sunrise, state.governor);
        let requested = governor.power_w;

        // 2. PV first
        let pv_to_gpu = pv.min(requested);
        let deficit = requested - pv_to_gpu;

        // 3. Battery
        let (allocation, shortfall_is_unmet) = if deficit > 0.0 {
            let bounded = deficit.min(battery::max_discharge_power(state.battery, &self.battery));
            let discharge = battery::step(state.battery, -bounded, dt_hours, &self.battery);
            let supplied = pv_to_gpu + (-discharge.bus_power_w).max(0.0);
            let allocation = if self.brownout(supplied.min(gpu_max)) {
                debug!(
                    timestep = input.timestep,
                    supplied_w = supplied,
                    "supply below GPU idle, powering down"
                );
                self.charge_with(state, pv, 0.0, dt_hours)
            } else {
                Allocation {
                    served_w: supplied.min(gpu_max),
                    battery: discharge,
                }
            };
            (allocation, true)
        } else {
            let served = pv_to_gpu.min(gpu_max);
            let served = if self.brownout(served) { 0.0 } else { served };
            (self.charge_with(state, pv, served, dt_hours), false)
        };

        // 4. Shortfall attribution
        let served = allocation.served_w;
        let shortfall = (requested - served).max(0.0);
        let (curtailed, unmet) = if shortfall_is_unmet {
            (0.0, shortfall)
        } else {
            (shortfall, 0.0)
        };

        // 5. GPU throughput
        let utilization = if served > 0.0 {
            gpu::utilization_from_power(served, &self.gpu)
        } else {
            0.0
        };
        let flops_step = gpu::flops(utilization, self.simulation.dt_seconds(), &self.gpu);

        let bat = allocation.battery;
        let pv_curtailed = (pv - served.min(pv) - bat.bus_power_w.max(0.0)).max(0.0);

        let record = TimestepRecord {
            timestep: input.timestep,
            timestamp: input.timestamp,
            pv_bus_power_w: pv,
            gpu_requested_power_w: requested,
            gpu_served_power_w: served,
            battery_bus_power_w: bat.bus_power_w,
            soc: state.battery.soc,
            curtailed_power_w: curtailed,
            unmet_power_w: unmet,
            pv_curtailed_power_w: pv_curtailed,
            battery_losses_w: bat.losses_w,
            flops_step,
            utilization,
        };
        let next = EngineState {
            battery: bat.next_state(),
            governor,
        };
        (next, record)
    }

    /// Executes all inputs in order from `state` and returns every record.
    pub fn run(&self, state: EngineState, inputs: &[StepInput]) -> (EngineState, Vec<TimestepRecord>) {
        let mut state = state;
        let mut records = Vec::with_capacity(inputs.len());
        for input in inputs {
            let (next, record) = self.step(state, input);
            state = next;
            records.push(record);
        }
        (state, records)
    }

    /// Returns a reference to the battery configuration (for metric capacity queries).
    pub fn battery(&self) -> &BatteryConfig {
        &self.battery
    }

    pub fn gpu(&self) -> &GpuConfig {
        &self.gpu
    }

    /// Returns a reference to the simulation configuration.
    pub fn config(&self) -> &SimulationConfig {
        &self.simulation
    }

    fn brownout(&self, served_w: f64) -> bool {
        served_w < gpu::idle_power_w(&self.gpu)
    }

    /// Routes PV not consumed by the GPUs into the battery.
    fn charge_with(&self, state: EngineState, pv: f64, served_w: f64, dt_hours: f64) -> Allocation {
        let leftover = (pv - served_w).max(0.0);
        let charge = leftover.min(battery::max_charge_power(state.battery, &self.battery));
        Allocation {
            served_w,
            battery: battery::step(state.battery, charge, dt_hours, &self.battery),
        }
    }
}
