use stress_tunnel_core::prelude::DelegatedShutdownListener;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

/// CPU share of the whole machine above which the harness is considered to be interfering.
const HIGH_CPU_USAGE_PERCENT: f32 = 10.0;

/// Monitor the CPU usage of the runner itself and report high usage.
///
/// The harness should be close to idle while a probe is measuring latency. High usage won't stop
/// the run, a warning is logged so the user knows the results may be affected.
///
/// Usage is sampled every [sysinfo::MINIMUM_CPU_UPDATE_INTERVAL] until the listener sees a
/// shutdown.
pub(crate) fn start_monitor(mut shutdown_listener: DelegatedShutdownListener) {
    let spawned = std::thread::Builder::new()
        .name("monitor".to_string())
        .spawn(move || {
            let this_process_pid = Pid::from_u32(std::process::id());
            let mut sys = System::new();

            sys.refresh_cpu_all();
            let cpu_count = sys.cpus().len().max(1);

            loop {
                if shutdown_listener.should_shutdown() {
                    log::trace!("Monitor thread shutting down");
                    break;
                }

                sys.refresh_processes_specifics(
                    ProcessesToUpdate::Some(&[this_process_pid]),
                    true,
                    ProcessRefreshKind::nothing().with_cpu(),
                );

                let Some(process) = sys.process(this_process_pid) else {
                    log::warn!("Cannot read CPU usage of the runner, stopping the monitor");
                    break;
                };

                let usage = harness_usage_percent(process.cpu_usage(), cpu_count);
                if usage > HIGH_CPU_USAGE_PERCENT {
                    log::warn!(
                        "High CPU usage detected. The runner is using {usage:.2}% of the CPU, with {cpu_count} available cores"
                    );
                }

                std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
            }
        });

    if let Err(e) = spawned {
        log::warn!("Failed to start monitor thread: {e}");
    }
}

/// Convert sysinfo's per-core percentage into a share of the whole machine.
fn harness_usage_percent(process_usage: f32, cpu_count: usize) -> f32 {
    (process_usage / (cpu_count * 100) as f32) * 100.0
}
