//! Attach to the game process and run the trainer threads.

use std::path::Path;

use anyhow::{Context, Result};
use dojo_core::settings::Settings;

pub fn execute(config: Option<&Path>, process: &str) -> Result<()> {
    let settings = load_settings(config)?;
    run_attached(settings, process)
}

fn load_settings(config: Option<&Path>) -> Result<Settings> {
    let Some(path) = config else {
        return Ok(Settings::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading settings from {}", path.display()))?;
    let settings = serde_json::from_str(&text)
        .with_context(|| format!("parsing settings from {}", path.display()))?;
    Ok(settings)
}

#[cfg(target_os = "windows")]
fn run_attached(settings: Settings, process: &str) -> Result<()> {
    use std::sync::Arc;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use dojo_core::context::SharedContext;
    use dojo_core::input::ImmediateInputWriter;
    use dojo_core::memory::{GameMemory, ProcessHandle, ProcessMemory, find_game_process};
    use dojo_core::monitor::FrameMonitor;
    use tracing::{info, warn};

    let pid = find_game_process(process)
        .with_context(|| format!("locating game process '{process}'"))?;
    let handle = ProcessHandle::open(pid).context("opening game process")?;
    info!("attached to {process} (pid {pid})");

    let mem: Arc<dyn GameMemory> = Arc::new(ProcessMemory::new(handle));
    let ctx = Arc::new(SharedContext::new());

    // Feature switches derive from the configured settings; the GUI (or a
    // future hotkey layer) can flip them at runtime through the context.
    let any_trigger = settings.after_block.enabled
        || settings.on_wakeup.enabled
        || settings.after_hitstun.enabled
        || settings.after_airtech.enabled;
    ctx.features.auto_action.store(any_trigger, Ordering::Release);
    ctx.features
        .auto_airtech
        .store(settings.auto_airtech.enabled, Ordering::Release);
    ctx.features
        .auto_jump
        .store(settings.auto_jump.enabled, Ordering::Release);
    ctx.features.auto_block.store(true, Ordering::Release);
    ctx.features
        .adaptive_stance
        .store(settings.auto_block.adaptive_stance, Ordering::Release);
    ctx.features.frame_advantage.store(true, Ordering::Release);

    let monitor = FrameMonitor::new(Arc::clone(&ctx), Arc::clone(&mem), settings);
    let monitor_handle = monitor.spawn();
    let writer_handle = ImmediateInputWriter::new(Arc::clone(&ctx)).spawn();

    // Supervise: stop the threads when the game goes away, and report the
    // permanent netplay stop when it happens.
    let mut probe = [0u8; 4];
    let mut failures = 0u32;
    loop {
        std::thread::sleep(Duration::from_millis(500));

        if ctx.online.load(Ordering::Acquire) {
            warn!("netplay detected; trainer is inert for the rest of this game session");
        }
        if !ctx.monitor_running.load(Ordering::Acquire)
            && ctx.online.load(Ordering::Acquire)
        {
            break;
        }

        match mem.read_bytes(mem.base_address(), &mut probe) {
            Ok(()) => failures = 0,
            Err(_) => {
                failures += 1;
                if failures >= 6 {
                    info!("game process is gone, shutting down");
                    ctx.shutdown.store(true, Ordering::Release);
                    break;
                }
            }
        }
    }

    monitor_handle.join().ok();
    writer_handle.join().ok();
    Ok(())
}

#[cfg(not(target_os = "windows"))]
fn run_attached(_settings: Settings, _process: &str) -> Result<()> {
    anyhow::bail!("attaching to the game is only supported on Windows")
}
